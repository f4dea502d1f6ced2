//! Placement of the layout table in flash and splicing of its records into a hex firmware.

use crate::error::Error;
use crate::ihex::{DATA_RECORD_LEN, Record};
use alloc::string::{String, ToString};
use alloc::vec::Vec;
#[cfg(feature = "defmt")]
use defmt::trace;

/// Number of records at the end of the firmware that stay at the end, usually the
/// extended linear address reset and the end of file record.
pub const TRAILER_LEN: usize = 2;

/// Computes the address of the layout table.
///
/// The table is right aligned against the end of the page following `mp_end`, so that its
/// last byte is the last byte of that page. If that would overlap the MicroPython image the
/// table moves on by whole pages. A table reaching into the filesystem is an error.
pub fn compute_layout_address(
    mp_end: u32,
    fs_start: u32,
    table_len: usize,
    page_size: u32,
) -> Result<u32, Error> {
    if page_size == 0 {
        return Err(Error::InvalidPageSize);
    }

    let mp_end64 = u64::from(mp_end);
    let page_size = u64::from(page_size);
    let table_len = table_len as u64;

    let mut layout_end = mp_end64 - mp_end64 % page_size + page_size;
    while layout_end < mp_end64 + table_len {
        layout_end += page_size;
    }
    let layout_address = layout_end - table_len;

    #[cfg(feature = "defmt")]
    trace!(
        "compute_layout_address: mp_end {:#08x} -> {:#08x}",
        mp_end, layout_address
    );

    #[cfg(feature = "debug-logs")]
    println!(
        "  compute_layout_address: mp_end {:#08x} -> {:#08x}",
        mp_end, layout_address
    );

    if layout_address >= u64::from(fs_start) {
        return Err(Error::Overlap {
            layout_address,
            layout_end,
            fs_start,
        });
    }

    // below fs_start, so it fits
    Ok(layout_address as u32)
}

/// Inserts the layout table into the lines of a hex firmware.
///
/// All lines but the last [`TRAILER_LEN`] are copied unchanged, followed by an extended linear
/// address record and one data record per 16 bytes of `table`. The trailer lines are appended
/// last, verbatim, whatever they contain.
pub fn patch<L: AsRef<str>>(
    firmware: &[L],
    table: &[u8],
    layout_address: u32,
) -> Result<Vec<String>, Error> {
    if firmware.len() < TRAILER_LEN {
        return Err(Error::MissingTrailer);
    }

    #[cfg(feature = "defmt")]
    trace!(
        "patch: {} lines, {} table bytes @{:#08x}",
        firmware.len(),
        table.len(),
        layout_address
    );

    #[cfg(feature = "debug-logs")]
    println!(
        "  patch: {} lines, {} table bytes @{:#08x}",
        firmware.len(),
        table.len(),
        layout_address
    );

    let (head, trailer) = firmware.split_at(firmware.len() - TRAILER_LEN);
    let mut lines = Vec::with_capacity(
        firmware.len() + 1 + table.len().div_ceil(DATA_RECORD_LEN),
    );
    lines.extend(head.iter().map(|line| line.as_ref().to_string()));

    let mut upper = upper_half(layout_address);
    lines.push(Record::extended_linear_address(upper).encode()?);

    for (index, chunk) in table.chunks(DATA_RECORD_LEN).enumerate() {
        let address = u32::try_from(index * DATA_RECORD_LEN)
            .ok()
            .and_then(|offset| layout_address.checked_add(offset))
            .ok_or(Error::InvalidTable("table extends beyond the 32-bit address space"))?;

        // only reached by tables crossing a 64k boundary
        if upper_half(address) != upper {
            upper = upper_half(address);
            lines.push(Record::extended_linear_address(upper).encode()?);
        }

        lines.push(Record::data(address as u16, chunk).encode()?);
    }

    lines.extend(trailer.iter().map(|line| line.as_ref().to_string()));

    Ok(lines)
}

fn upper_half(address: u32) -> u16 {
    (address >> 16) as u16
}
