mod encode {
    use flash_layout::error::Error;
    use flash_layout::{Record, RecordType, encode_record};
    use pretty_assertions::assert_eq;

    fn byte_sum(line: &str) -> u8 {
        hex::decode(&line[1..])
            .unwrap()
            .iter()
            .fold(0u8, |acc, &b| acc.wrapping_add(b))
    }

    #[test]
    fn known_records() {
        assert_eq!(
            Record::extended_linear_address(0x0001).encode().unwrap(),
            ":020000040001F9"
        );
        assert_eq!(Record::end_of_file().encode().unwrap(), ":00000001FF");
        assert_eq!(
            encode_record(0x1234, RecordType::Data, &[0xDE, 0xAD, 0xBE, 0xEF]).unwrap(),
            ":04123400DEADBEEF7E"
        );
        assert_eq!(
            Record::data(0x0FD0, &(0..16).collect::<Vec<u8>>())
                .encode()
                .unwrap(),
            ":100FD000000102030405060708090A0B0C0D0E0F99"
        );
    }

    #[test]
    fn checksum_sums_to_zero() {
        let payloads: [&[u8]; 4] = [&[], &[0xFF], &[0x80; 16], &[0xA5; 255]];

        for (i, payload) in payloads.iter().enumerate() {
            let address = (i as u16).wrapping_mul(0x4321);
            let line = encode_record(address, RecordType::Data, payload).unwrap();

            assert!(line.starts_with(':'));
            assert_eq!(line.len(), 1 + 2 * (5 + payload.len()));
            assert_eq!(line, line.to_uppercase());
            assert_eq!(byte_sum(&line), 0, "{line}");
        }
    }

    #[test]
    fn too_long() {
        assert_eq!(
            encode_record(0, RecordType::Data, &[0; 256]),
            Err(Error::RecordTooLong(256))
        );
    }
}

mod decode {
    use flash_layout::error::Error;
    use flash_layout::{Record, RecordType};
    use pretty_assertions::assert_eq;

    #[test]
    fn data_record() {
        assert_eq!(
            Record::decode(":04123400DEADBEEF7E\r\n").unwrap(),
            Record {
                address: 0x1234,
                record_type: RecordType::Data,
                data: vec![0xDE, 0xAD, 0xBE, 0xEF],
            }
        );
    }

    #[test]
    fn lower_case_digits() {
        let record = Record::decode(":020000040001f9").unwrap();

        assert_eq!(record, Record::extended_linear_address(1));
        assert_eq!(record.checksum(), 0xF9);
    }

    #[test]
    fn encoded_records_decode() {
        let record = Record::new(0xFFF0, RecordType::StartLinearAddress, &[0, 0, 0x12, 0x34]);
        let line = record.encode().unwrap();

        assert_eq!(Record::decode(&line).unwrap(), record);
    }

    #[test]
    fn malformed() {
        assert_eq!(
            Record::decode("04123400DEADBEEF7E"),
            Err(Error::MalformedRecord("missing start code"))
        );
        assert_eq!(
            Record::decode(":04123400DEADBEEF7"),
            Err(Error::MalformedRecord("invalid hex digits"))
        );
        assert_eq!(
            Record::decode(":0412"),
            Err(Error::MalformedRecord("record too short"))
        );
        assert_eq!(
            Record::decode(":05123400DEADBEEF7E"),
            Err(Error::MalformedRecord(
                "byte count does not match record length"
            ))
        );
        assert_eq!(
            Record::decode(":00000006FA"),
            Err(Error::UnknownRecordType(6))
        );
    }

    #[test]
    fn checksum_mismatch() {
        assert_eq!(
            Record::decode(":04123400DEADBEEF7F"),
            Err(Error::RecordChecksum {
                stored: 0x7F,
                computed: 0x7E,
            })
        );
    }
}
