//! The flash layout table.
//!
//! The table is a sequence of 16-byte rows, all integers little endian:
//!
//! ```text
//! 0x00  0x01  0x02  0x03  0x04  0x05  0x06  0x07  0x08 .. 0x0f
//! ID    HT    REG_PAGE    REG_LEN                 HASH_DATA
//! (additional regions)
//! MAGIC1                  VERSION     TABLE_LEN   NUM_REG     PSIZE_LOG2  MAGIC2
//! ```
//!
//! The header row comes last so that a reader can find the table by looking at the final
//! 16 bytes of every flash page.

use crate::error::Error;
use alloc::vec::Vec;
#[cfg(feature = "defmt")]
use defmt::trace;

pub const MAGIC1: u32 = 0x597F30FE;
pub const MAGIC2: u32 = 0xC1B1D79D;
pub const VERSION: u16 = 1;

/// Native page size of the nRF52 flash, log-2.
pub const NRF_PAGE_SIZE_LOG2: u16 = 12;
pub const NRF_PAGE_SIZE: u32 = 1 << NRF_PAGE_SIZE_LOG2;

pub const ENTRY_SIZE: usize = 16;
pub const HEADER_SIZE: usize = 16;
pub(crate) const TABLE_ALIGNMENT: usize = 16;

const PADDING: u8 = 0xFF;
const MAX_PAGE_SIZE_LOG2: u16 = 31;

/// Interpretation of the 8 hash bytes of a region entry.
#[derive(strum::FromRepr, strum::Display, Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[strum(serialize_all = "UPPERCASE")]
#[repr(u8)]
pub enum HashType {
    None = 0,
    Data = 1,
    Ptr = 2,
}

/// Typed hash payload of a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegionHash {
    /// No hash, stored as 8 zero bytes.
    None,
    /// 8 bytes of verbatim data.
    Data([u8; 8]),
    /// Pointer to a string in flash, stored as the address followed by 4 zero bytes.
    Ptr(u32),
}

impl RegionHash {
    /// Builds the payload from an untyped byte slice.
    ///
    /// `None` takes no bytes, `Data` exactly 8 and `Ptr` a 4 byte little endian address.
    pub fn new(hash_type: HashType, payload: &[u8]) -> Result<Self, Error> {
        let mismatch = || Error::HashPayload {
            hash_type,
            len: payload.len(),
        };

        match hash_type {
            HashType::None if payload.is_empty() => Ok(RegionHash::None),
            HashType::Data => payload
                .try_into()
                .map(RegionHash::Data)
                .map_err(|_| mismatch()),
            HashType::Ptr => payload
                .try_into()
                .map(|ptr| RegionHash::Ptr(u32::from_le_bytes(ptr)))
                .map_err(|_| mismatch()),
            HashType::None => Err(mismatch()),
        }
    }

    pub fn hash_type(&self) -> HashType {
        match self {
            RegionHash::None => HashType::None,
            RegionHash::Data(_) => HashType::Data,
            RegionHash::Ptr(_) => HashType::Ptr,
        }
    }

    fn to_bytes(self) -> [u8; 8] {
        match self {
            RegionHash::None => [0; 8],
            RegionHash::Data(data) => data,
            RegionHash::Ptr(ptr) => {
                let mut raw = [0; 8];
                raw[..4].copy_from_slice(&ptr.to_le_bytes());
                raw
            }
        }
    }

    fn from_bytes(hash_type: HashType, raw: &[u8]) -> Self {
        match hash_type {
            HashType::None => RegionHash::None,
            HashType::Data => {
                let mut data = [0; 8];
                data.copy_from_slice(&raw[..8]);
                RegionHash::Data(data)
            }
            HashType::Ptr => RegionHash::Ptr(read_u32(raw, 0)),
        }
    }
}

/// A single region entry of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Region {
    pub id: u8,
    /// Start address divided by the page size.
    pub page: u16,
    /// Length in bytes.
    pub length: u32,
    pub hash: RegionHash,
}

impl Region {
    pub fn start_address(&self, page_size_log2: u16) -> u32 {
        u32::from(self.page) << page_size_log2
    }

    fn to_bytes(self) -> [u8; ENTRY_SIZE] {
        let mut raw = [0u8; ENTRY_SIZE];
        raw[0] = self.id;
        raw[1] = self.hash.hash_type() as u8;
        raw[2..4].copy_from_slice(&self.page.to_le_bytes());
        raw[4..8].copy_from_slice(&self.length.to_le_bytes());
        raw[8..16].copy_from_slice(&self.hash.to_bytes());
        raw
    }

    fn from_bytes(raw: &[u8]) -> Result<Self, Error> {
        let hash_type =
            HashType::from_repr(raw[1]).ok_or(Error::InvalidTable("unknown hash type"))?;

        Ok(Region {
            id: raw[0],
            page: read_u16(raw, 2),
            length: read_u32(raw, 4),
            hash: RegionHash::from_bytes(hash_type, &raw[8..16]),
        })
    }
}

/// The trailing header row of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TableHeader {
    pub version: u16,
    /// Length of the table in bytes, excluding the header itself.
    pub table_len: u16,
    pub num_regions: u16,
    pub page_size_log2: u16,
}

impl TableHeader {
    /// Decodes the header from the final 16 bytes of a table, checking both magic numbers and
    /// the version.
    pub fn from_bytes(raw: &[u8; HEADER_SIZE]) -> Result<Self, Error> {
        if read_u32(raw, 0) != MAGIC1 || read_u32(raw, 12) != MAGIC2 {
            return Err(Error::InvalidTable("bad magic"));
        }

        let header = TableHeader {
            version: read_u16(raw, 4),
            table_len: read_u16(raw, 6),
            num_regions: read_u16(raw, 8),
            page_size_log2: read_u16(raw, 10),
        };

        if header.version != VERSION {
            return Err(Error::InvalidTable("unsupported version"));
        }
        if header.page_size_log2 > MAX_PAGE_SIZE_LOG2 {
            return Err(Error::InvalidTable("page size out of range"));
        }

        Ok(header)
    }

    pub fn page_size(&self) -> u32 {
        1 << self.page_size_log2
    }

    /// Length of the whole table including the header.
    pub fn total_len(&self) -> usize {
        usize::from(self.table_len) + HEADER_SIZE
    }

    fn to_bytes(self) -> [u8; HEADER_SIZE] {
        let mut raw = [0u8; HEADER_SIZE];
        raw[0..4].copy_from_slice(&MAGIC1.to_le_bytes());
        raw[4..6].copy_from_slice(&self.version.to_le_bytes());
        raw[6..8].copy_from_slice(&self.table_len.to_le_bytes());
        raw[8..10].copy_from_slice(&self.num_regions.to_le_bytes());
        raw[10..12].copy_from_slice(&self.page_size_log2.to_le_bytes());
        raw[12..16].copy_from_slice(&MAGIC2.to_le_bytes());
        raw
    }
}

/// Accumulates region entries. Consumed by [`LayoutBuilder::finalize`], so a table can only be
/// finalized once and never be extended afterwards.
#[derive(Debug, Clone)]
pub struct LayoutBuilder {
    data: Vec<u8>,
    regions: Vec<Region>,
    page_size_log2: u16,
}

impl Default for LayoutBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutBuilder {
    /// Creates a builder for the nRF52 flash with 4k pages.
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            regions: Vec::new(),
            page_size_log2: NRF_PAGE_SIZE_LOG2,
        }
    }

    pub fn with_page_size_log2(page_size_log2: u16) -> Result<Self, Error> {
        if page_size_log2 > MAX_PAGE_SIZE_LOG2 {
            return Err(Error::InvalidPageSize);
        }

        Ok(Self {
            page_size_log2,
            ..Self::new()
        })
    }

    pub fn page_size(&self) -> u32 {
        1 << self.page_size_log2
    }

    pub fn num_regions(&self) -> usize {
        self.regions.len()
    }

    /// Appends a region. `start_address` has to be aligned to the page size.
    pub fn add_region(
        &mut self,
        id: u8,
        start_address: u32,
        length: u32,
        hash: RegionHash,
    ) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        trace!(
            "add_region: id {} @{:#08x} len {:#x} hash {}",
            id, start_address, length, hash
        );

        #[cfg(feature = "debug-logs")]
        println!(
            "  LayoutBuilder: add_region {} @{:#08x} len {:#x} {:?}",
            id, start_address, length, hash
        );

        if !start_address.is_multiple_of(self.page_size()) {
            return Err(Error::Alignment {
                id,
                address: start_address,
                page_size: self.page_size(),
            });
        }

        let page = u16::try_from(start_address >> self.page_size_log2).map_err(|_| {
            Error::PageOutOfRange {
                id,
                address: start_address,
            }
        })?;

        // the padded table length and the region count are both u16 header fields
        if self.data.len() + ENTRY_SIZE > usize::from(u16::MAX) {
            return Err(Error::TableTooLarge);
        }

        let region = Region {
            id,
            page,
            length,
            hash,
        };
        self.data.extend_from_slice(&region.to_bytes());
        self.regions.push(region);

        Ok(())
    }

    /// Pads the region rows with 0xFF to the next 16 byte boundary and appends the header.
    pub fn finalize(self) -> LayoutTable {
        let LayoutBuilder {
            mut data,
            regions,
            page_size_log2,
        } = self;

        let padded_len = data.len().next_multiple_of(TABLE_ALIGNMENT);
        data.resize(padded_len, PADDING);

        // add_region keeps the padded length and the region count within u16
        let header = TableHeader {
            version: VERSION,
            table_len: padded_len as u16,
            num_regions: regions.len() as u16,
            page_size_log2,
        };
        data.extend_from_slice(&header.to_bytes());

        #[cfg(feature = "defmt")]
        trace!(
            "finalize: {} regions, {} bytes",
            header.num_regions,
            data.len()
        );

        #[cfg(feature = "debug-logs")]
        println!(
            "  LayoutBuilder: finalize {} regions, {} bytes",
            header.num_regions,
            data.len()
        );

        LayoutTable {
            data,
            header,
            regions,
        }
    }
}

/// A finalized, immutable layout table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutTable {
    data: Vec<u8>,
    header: TableHeader,
    regions: Vec<Region>,
}

impl LayoutTable {
    /// Decodes a complete table, header included.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() < HEADER_SIZE || !bytes.len().is_multiple_of(TABLE_ALIGNMENT) {
            return Err(Error::InvalidTable("length is not a multiple of 16"));
        }

        let (rows, raw_header) = bytes.split_at(bytes.len() - HEADER_SIZE);
        let mut header_bytes = [0u8; HEADER_SIZE];
        header_bytes.copy_from_slice(raw_header);
        let header = TableHeader::from_bytes(&header_bytes)?;

        if usize::from(header.table_len) != rows.len() {
            return Err(Error::InvalidTable("table length does not match header"));
        }
        if usize::from(header.num_regions) * ENTRY_SIZE > rows.len() {
            return Err(Error::InvalidTable("region count exceeds table length"));
        }

        let regions = rows
            .chunks_exact(ENTRY_SIZE)
            .take(usize::from(header.num_regions))
            .map(Region::from_bytes)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(LayoutTable {
            data: bytes.to_vec(),
            header,
            regions,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Length in bytes including the header. Always a multiple of 16.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn header(&self) -> &TableHeader {
        &self.header
    }

    /// Regions in insertion order.
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }
}

fn read_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}
