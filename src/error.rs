use crate::layout::HashType;
use thiserror::Error;

/// Errors that can occur while building, placing, encoding or locating a flash layout table.
/// All of them are deterministic consequences of the input, retrying without changing the
/// input will fail the same way.
#[derive(Error, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// A region has to start on a flash page boundary.
    #[error("region {id} starts at {address:#x}, which is not aligned to the {page_size} byte page size")]
    Alignment { id: u8, address: u32, page_size: u32 },

    /// The hash payload does not have the shape required by the hash type.
    #[error("hash type {hash_type} does not accept a {len} byte payload")]
    HashPayload { hash_type: HashType, len: usize },

    /// The region start page does not fit the 16-bit page number field.
    #[error("region {id} starts at {address:#x}, beyond the addressable page range")]
    PageOutOfRange { id: u8, address: u32 },

    /// The region count or the table length no longer fits the 16-bit header fields.
    #[error("layout table too large")]
    TableTooLarge,

    /// The page size has to be a power of two that fits into 32 bits.
    #[error("invalid page size")]
    InvalidPageSize,

    /// The computed table location collides with the filesystem.
    #[error(
        "flash layout table at {layout_address:#07x}..{layout_end:#07x} overlaps with filesystem at {fs_start:#07x}"
    )]
    Overlap {
        layout_address: u64,
        layout_end: u64,
        fs_start: u32,
    },

    /// A region derived from the linker symbols ends before it starts.
    #[error("region {0} ends before it starts")]
    InvalidRegion(&'static str),

    /// A required linker symbol was not resolved.
    #[error("missing symbol: {0}")]
    MissingSymbol(&'static str),

    /// The firmware needs at least the two trailer records.
    #[error("firmware has no trailer records")]
    MissingTrailer,

    /// Records carry at most 255 data bytes.
    #[error("record data too long: {0} bytes")]
    RecordTooLong(usize),

    /// The line is not a well formed hex record.
    #[error("malformed record: {0}")]
    MalformedRecord(&'static str),

    /// The record checksum does not match its contents.
    #[error("record checksum mismatch: stored {stored:#04x}, computed {computed:#04x}")]
    RecordChecksum { stored: u8, computed: u8 },

    /// The record type byte is not one of the known record types.
    #[error("unknown record type {0:#04x}")]
    UnknownRecordType(u8),

    /// The bytes do not form a valid layout table.
    #[error("invalid layout table: {0}")]
    InvalidTable(&'static str),

    /// The internal error value is returned from the provided flash
    #[error("internal flash error")]
    FlashError,
}
