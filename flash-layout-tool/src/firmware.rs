use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use embedded_storage::nor_flash::{ErrorType, NorFlashErrorKind, ReadNorFlash};
use flash_layout::{LayoutPlan, LayoutTable, Record, RecordType};

use crate::error::Error;

/// Value of flash bytes not covered by any data record.
const ERASED: u8 = 0xFF;

/// A firmware in Intel HEX format, kept as its lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Firmware {
    lines: Vec<String>,
}

impl Firmware {
    /// Split hex content into lines. Line terminators and blank lines are dropped.
    pub fn from_hex(content: &str) -> Self {
        let lines = content
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        Self { lines }
    }

    /// Read the hex file at the given `path`.
    pub fn from_hex_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let content = fs::read_to_string(path)?;
        Ok(Self::from_hex(&content))
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Insert the records of the layout table in front of the two trailing records.
    pub fn with_layout_table(&self, plan: &LayoutPlan) -> Result<Self, Error> {
        Ok(Self {
            lines: plan.patch(self.lines.as_slice())?,
        })
    }

    /// Render the firmware with one record per line.
    pub fn to_hex(&self) -> String {
        let mut content = String::new();
        for line in &self.lines {
            content.push_str(line);
            content.push('\n');
        }
        content
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<(), Error> {
        for line in &self.lines {
            writeln!(writer, "{line}")?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write the firmware to a hex file at the given `path`.
    pub fn to_hex_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let file = fs::File::create(path)?;
        self.write_to(std::io::BufWriter::new(file))
    }

    /// Decode all records into the flash contents they describe.
    pub fn memory_image(&self) -> Result<MemoryImage, Error> {
        let mut image = MemoryImage::default();
        let mut base: u32 = 0;

        for (index, line) in self.lines.iter().enumerate() {
            let invalid = |source: flash_layout::Error| Error::InvalidRecord {
                line: index + 1,
                source,
            };
            let record = Record::decode(line).map_err(invalid)?;

            match record.record_type {
                RecordType::Data => {
                    for (offset, &byte) in record.data.iter().enumerate() {
                        let address =
                            base.wrapping_add(u32::from(record.address) + offset as u32);
                        image.bytes.insert(address, byte);
                    }
                }
                RecordType::ExtendedLinearAddress => {
                    base = u32::from(address_payload(&record).map_err(invalid)?) << 16;
                }
                RecordType::ExtendedSegmentAddress => {
                    base = u32::from(address_payload(&record).map_err(invalid)?) << 4;
                }
                RecordType::EndOfFile => break,
                RecordType::StartSegmentAddress | RecordType::StartLinearAddress => {}
            }
        }

        Ok(image)
    }

    /// Search the decoded flash contents for a layout table.
    pub fn find_layout_table(
        &self,
        page_size: usize,
    ) -> Result<Option<(u32, LayoutTable)>, Error> {
        let mut image = self.memory_image()?;
        Ok(flash_layout::find_layout_table(&mut image, page_size)?)
    }
}

fn address_payload(record: &Record) -> Result<u16, flash_layout::Error> {
    match record.data[..] {
        [hi, lo] => Ok(u16::from_be_bytes([hi, lo])),
        _ => Err(flash_layout::Error::MalformedRecord(
            "address record needs two data bytes",
        )),
    }
}

/// Sparse flash contents decoded from a hex firmware. Bytes without data read as erased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryImage {
    bytes: BTreeMap<u32, u8>,
}

impl MemoryImage {
    pub fn get(&self, address: u32) -> Option<u8> {
        self.bytes.get(&address).copied()
    }

    /// Number of bytes covered by data records.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Read a NUL terminated string, e.g. the one a `Ptr` region hash points to.
    pub fn read_c_string(&self, address: u32) -> Option<String> {
        let bytes = self
            .bytes
            .range(address..)
            .scan(address, |expected, (&at, &byte)| {
                let contiguous = at == *expected;
                *expected = expected.wrapping_add(1);
                (contiguous && byte != 0).then_some(byte)
            })
            .collect::<Vec<_>>();

        let end = address.checked_add(bytes.len() as u32)?;
        if self.get(end) != Some(0) {
            return None;
        }
        String::from_utf8(bytes).ok()
    }
}

impl ErrorType for MemoryImage {
    type Error = NorFlashErrorKind;
}

impl ReadNorFlash for MemoryImage {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        if offset as usize + bytes.len() > self.capacity() {
            return Err(NorFlashErrorKind::OutOfBounds);
        }

        for (index, byte) in bytes.iter_mut().enumerate() {
            *byte = self.get(offset + index as u32).unwrap_or(ERASED);
        }
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.bytes
            .last_key_value()
            .map_or(0, |(&address, _)| address as usize + 1)
    }
}
