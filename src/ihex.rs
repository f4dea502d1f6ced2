//! Intel HEX records.
//!
//! ```text
//! ':' BYTECOUNT ADDR_HI ADDR_LO TYPE DATA.. CHECKSUM
//! ```
//!
//! Every byte is written as two upper case hex digits. The checksum is the two's complement
//! of the sum of all preceding bytes, so the sum over the whole record is zero modulo 256.

use crate::error::Error;
use alloc::string::String;
use alloc::vec::Vec;

pub const START_CODE: char = ':';

/// Number of data bytes per data record emitted for the layout table.
pub const DATA_RECORD_LEN: usize = 16;

// byte count, address (2) and type
const RECORD_HEADER_LEN: usize = 4;
const MAX_DATA_LEN: usize = u8::MAX as usize;

#[derive(strum::FromRepr, strum::Display, Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum RecordType {
    Data = 0,
    EndOfFile = 1,
    ExtendedSegmentAddress = 2,
    StartSegmentAddress = 3,
    /// Payload is the upper 16 bits of the 32-bit address of the following data records.
    ExtendedLinearAddress = 4,
    StartLinearAddress = 5,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub address: u16,
    pub record_type: RecordType,
    pub data: Vec<u8>,
}

impl Record {
    pub fn new(address: u16, record_type: RecordType, data: &[u8]) -> Self {
        Self {
            address,
            record_type,
            data: data.to_vec(),
        }
    }

    pub fn data(address: u16, data: &[u8]) -> Self {
        Self::new(address, RecordType::Data, data)
    }

    /// Sets the upper 16 bits of the address for all following data records.
    pub fn extended_linear_address(upper: u16) -> Self {
        Self::new(0, RecordType::ExtendedLinearAddress, &upper.to_be_bytes())
    }

    pub fn end_of_file() -> Self {
        Self::new(0, RecordType::EndOfFile, &[])
    }

    /// The checksum byte of this record. Data beyond 255 bytes is not representable and is
    /// rejected by [`Record::encode`].
    pub fn checksum(&self) -> u8 {
        let sum = self
            .header_bytes()
            .iter()
            .chain(self.data.iter())
            .fold(0u8, |acc, &b| acc.wrapping_add(b));
        sum.wrapping_neg()
    }

    /// Renders the record as a single line without line terminator.
    pub fn encode(&self) -> Result<String, Error> {
        if self.data.len() > MAX_DATA_LEN {
            return Err(Error::RecordTooLong(self.data.len()));
        }

        let mut raw = Vec::with_capacity(RECORD_HEADER_LEN + self.data.len() + 1);
        raw.extend_from_slice(&self.header_bytes());
        raw.extend_from_slice(&self.data);
        raw.push(self.checksum());

        let mut line = String::with_capacity(1 + raw.len() * 2);
        line.push(START_CODE);
        line.push_str(&hex::encode_upper(raw));
        Ok(line)
    }

    /// Parses and validates a single record line. Surrounding whitespace is ignored.
    pub fn decode(line: &str) -> Result<Self, Error> {
        let digits = line
            .trim()
            .strip_prefix(START_CODE)
            .ok_or(Error::MalformedRecord("missing start code"))?;

        let raw = hex::decode(digits).map_err(|_| Error::MalformedRecord("invalid hex digits"))?;
        if raw.len() < RECORD_HEADER_LEN + 1 {
            return Err(Error::MalformedRecord("record too short"));
        }

        let byte_count = usize::from(raw[0]);
        if raw.len() != RECORD_HEADER_LEN + byte_count + 1 {
            return Err(Error::MalformedRecord("byte count does not match record length"));
        }

        let record_type =
            RecordType::from_repr(raw[3]).ok_or(Error::UnknownRecordType(raw[3]))?;
        let record = Record {
            address: u16::from_be_bytes([raw[1], raw[2]]),
            record_type,
            data: raw[RECORD_HEADER_LEN..RECORD_HEADER_LEN + byte_count].to_vec(),
        };

        let stored = raw[raw.len() - 1];
        let computed = record.checksum();
        if stored != computed {
            return Err(Error::RecordChecksum { stored, computed });
        }

        Ok(record)
    }

    fn header_bytes(&self) -> [u8; RECORD_HEADER_LEN] {
        let [hi, lo] = self.address.to_be_bytes();
        // the byte count wraps for oversized data, encode() rejects those records
        [self.data.len() as u8, hi, lo, self.record_type as u8]
    }
}

/// Encodes a single record line from its parts.
pub fn encode_record(
    address: u16,
    record_type: RecordType,
    data: &[u8],
) -> Result<String, Error> {
    Record::new(address, record_type, data).encode()
}
