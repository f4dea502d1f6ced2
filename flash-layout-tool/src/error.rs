use thiserror::Error;

/// Errors that can occur while reading the linker map, reading or writing hex firmware, or
/// building and placing the flash layout table.
#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    Layout(#[from] flash_layout::Error),

    #[error("invalid address '{value}' in map file line {line}")]
    InvalidAddress { line: usize, value: String },

    #[error("invalid record in firmware line {line}: {source}")]
    InvalidRecord {
        line: usize,
        source: flash_layout::Error,
    },
}
