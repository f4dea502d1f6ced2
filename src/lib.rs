#![doc = include_str!("../README.md")]
#![cfg_attr(not(target_arch = "x86_64"), no_std)]

pub mod error;
pub mod ihex;
pub mod layout;
pub mod patch;
pub mod plan;
pub mod platform;
pub mod symbols;

extern crate alloc;

pub use error::Error;
pub use ihex::{Record, RecordType, encode_record};
pub use layout::{
    HashType, LayoutBuilder, LayoutTable, NRF_PAGE_SIZE, NRF_PAGE_SIZE_LOG2, Region, RegionHash,
    TableHeader,
};
pub use patch::{compute_layout_address, patch};
pub use plan::LayoutPlan;
pub use platform::find_layout_table;
pub use symbols::{FirmwareRegions, FlashRegion, Symbols};
