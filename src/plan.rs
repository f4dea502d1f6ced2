use crate::error::Error;
use crate::layout::{LayoutBuilder, LayoutTable, RegionHash};
use crate::patch::{compute_layout_address, patch};
use crate::symbols::{FirmwareRegions, Symbols};
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

pub const REGION_ID_SOFTDEVICE: u8 = 1;
pub const REGION_ID_MICROPYTHON: u8 = 2;
pub const REGION_ID_FILESYSTEM: u8 = 3;

/// The finalized layout table of a MicroPython firmware together with its flash address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutPlan {
    pub regions: FirmwareRegions,
    pub table: LayoutTable,
    pub layout_address: u32,
}

impl LayoutPlan {
    /// Builds the table with the SoftDevice, MicroPython and filesystem regions and places it
    /// behind the MicroPython image.
    pub fn new(symbols: &Symbols, page_size_log2: u16) -> Result<Self, Error> {
        let regions = symbols.regions()?;
        let mut builder = LayoutBuilder::with_page_size_log2(page_size_log2)?;

        builder.add_region(
            REGION_ID_SOFTDEVICE,
            regions.softdevice.start,
            regions.softdevice.len(),
            RegionHash::None,
        )?;
        builder.add_region(
            REGION_ID_MICROPYTHON,
            regions.micropython.start,
            regions.micropython.len(),
            RegionHash::Ptr(regions.version_string),
        )?;
        builder.add_region(
            REGION_ID_FILESYSTEM,
            regions.filesystem.start,
            regions.filesystem.len(),
            RegionHash::None,
        )?;

        let page_size = builder.page_size();
        let table = builder.finalize();
        let layout_address = compute_layout_address(
            regions.micropython.end,
            regions.filesystem.start,
            table.len(),
            page_size,
        )?;

        Ok(Self {
            regions,
            table,
            layout_address,
        })
    }

    /// First address after the table, always the end of a page.
    pub fn layout_end(&self) -> u32 {
        // compute_layout_address keeps the whole table below the filesystem
        self.layout_address + self.table.len() as u32
    }

    /// Splices the table into the lines of a hex firmware.
    pub fn patch<L: AsRef<str>>(&self, firmware: &[L]) -> Result<Vec<String>, Error> {
        patch(firmware, self.table.as_bytes(), self.layout_address)
    }
}

impl fmt::Display for LayoutPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = [
            ("SoftDevice", self.regions.softdevice.start, self.regions.softdevice.end),
            ("MicroPython", self.regions.micropython.start, self.regions.micropython.end),
            ("Layout table", self.layout_address, self.layout_end()),
            ("Filesystem", self.regions.filesystem.start, self.regions.filesystem.end),
        ];

        for (name, start, end) in rows {
            writeln!(f, "{:13} 0x{:05x}..0x{:05x}", name, start, end)?;
        }

        Ok(())
    }
}
