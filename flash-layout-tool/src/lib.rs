//! Adds a flash layout table to MicroPython hex firmware for the micro:bit, and finds it
//! again.
//!
//! The addresses of the SoftDevice, MicroPython and the filesystem are taken from the linker
//! map file of the MicroPython build.

pub mod error;
pub mod firmware;
pub mod map;

pub use error::Error;
pub use firmware::{Firmware, MemoryImage};
pub use flash_layout::{LayoutPlan, NRF_PAGE_SIZE_LOG2};
pub use map::SymbolMap;

/// Build the layout table for the regions in `map` and insert it into `firmware`.
///
/// Returns the plan, for reporting, together with the patched firmware.
pub fn add_layout_table(
    firmware: &Firmware,
    map: &SymbolMap,
    page_size_log2: u16,
) -> Result<(LayoutPlan, Firmware), Error> {
    let symbols = map.symbols()?;
    let plan = LayoutPlan::new(&symbols, page_size_log2)?;
    let patched = firmware.with_layout_table(&plan)?;
    Ok((plan, patched))
}
