use embedded_storage::nor_flash::ReadNorFlash;
use flash_layout::{
    HashType,
    RegionHash,
};
use flash_layout_tool::{
    Error,
    Firmware,
};
use pretty_assertions::assert_eq;

const PAGE_SIZE: usize = 4096;

#[test]
fn test_memory_image() {
    let firmware = Firmware::from_hex_file("tests/assets/firmware.hex").unwrap();
    let image = firmware.memory_image().unwrap();

    assert_eq!(image.len(), 4 * 16 + 2 * 16 + 16 + 1 + 16);
    assert_eq!(image.get(0x0003f), Some(0x3f));
    assert_eq!(image.get(0x1000), Some(0x00));
    assert_eq!(image.get(0x1003), Some(0x20));
    assert_eq!(image.get(0x0040), None);
    assert_eq!(image.read_c_string(0x1e00).as_deref(), Some("micro:bit v2.1.0"));
}

#[test]
fn test_read_as_flash() {
    let firmware = Firmware::from_hex_file("tests/assets/firmware.hex").unwrap();
    let mut image = firmware.memory_image().unwrap();

    assert_eq!(image.capacity(), 0x1f70);

    let mut buf = [0u8; 4];
    image.read(0x003e, &mut buf).unwrap();
    assert_eq!(buf, [0x3e, 0x3f, 0xff, 0xff]);

    assert!(image.read(0x1f6e, &mut buf).is_err());
}

#[test]
fn test_find_generated_table() {
    let firmware = Firmware::from_hex_file("tests/assets/firmware_with_layout.hex").unwrap();
    let (address, table) = firmware.find_layout_table(PAGE_SIZE).unwrap().unwrap();

    assert_eq!(address, 0x1fc0);
    assert_eq!(table.len(), 64);
    assert_eq!(table.header().num_regions, 3);
    assert_eq!(table.header().page_size(), 4096);

    let regions = table.regions();
    assert_eq!(regions.len(), 3);

    assert_eq!(regions[0].id, 1);
    assert_eq!(regions[0].start_address(12), 0x0);
    assert_eq!(regions[0].length, 0x1000);
    assert_eq!(regions[0].hash, RegionHash::None);

    assert_eq!(regions[1].id, 2);
    assert_eq!(regions[1].start_address(12), 0x1000);
    assert_eq!(regions[1].length, 0xf70);
    assert_eq!(regions[1].hash.hash_type(), HashType::Ptr);
    assert_eq!(regions[1].hash, RegionHash::Ptr(0x1e00));

    assert_eq!(regions[2].id, 3);
    assert_eq!(regions[2].start_address(12), 0x3000);
    assert_eq!(regions[2].length, 0x2000);

    let image = firmware.memory_image().unwrap();
    assert_eq!(image.read_c_string(0x1e00).as_deref(), Some("micro:bit v2.1.0"));
}

#[test]
fn test_no_table_in_plain_firmware() {
    let firmware = Firmware::from_hex_file("tests/assets/firmware.hex").unwrap();

    assert_eq!(firmware.find_layout_table(PAGE_SIZE).unwrap(), None);
}

#[test]
fn test_unterminated_string() {
    let firmware = Firmware::from_hex(":0400000041424344F2\n:00000001FF\n");
    let image = firmware.memory_image().unwrap();

    assert_eq!(image.read_c_string(0x0), None);
}

#[test]
fn test_invalid_record() {
    let firmware = Firmware::from_hex(":020000040000FA\n:10000000000102030405060708090A0B0C0D0E0F00\n");

    match firmware.memory_image() {
        Err(Error::InvalidRecord { line, source }) => {
            assert_eq!(line, 2);
            assert_eq!(
                source,
                flash_layout::Error::RecordChecksum {
                    stored: 0x00,
                    computed: 0x78,
                }
            );
        }
        other => panic!("Expected invalid record, got {other:?}"),
    }
}
