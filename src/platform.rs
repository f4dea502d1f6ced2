use crate::error::Error;
use crate::layout::{HEADER_SIZE, LayoutTable, TableHeader};
use alloc::vec;
#[cfg(feature = "defmt")]
use defmt::trace;
use embedded_storage::nor_flash::ReadNorFlash;

/// Searches the flash for a layout table, starting with the highest page.
///
/// A table always ends on the last byte of a page, so only the final 16 bytes of every page
/// have to be checked for the header. Returns the address of the first byte of the table.
///
/// All reads start at 16 byte aligned offsets, the flash `READ_SIZE` must divide 16.
pub fn find_layout_table<F: ReadNorFlash>(
    flash: &mut F,
    page_size: usize,
) -> Result<Option<(u32, LayoutTable)>, Error> {
    if !page_size.is_power_of_two() || page_size < HEADER_SIZE {
        return Err(Error::InvalidPageSize);
    }

    let pages = flash.capacity() / page_size;
    for page in (0..pages).rev() {
        let page_end = (page + 1) * page_size;

        #[cfg(feature = "defmt")]
        trace!("find_layout_table: page end @{:#08x}", page_end);

        let mut raw_header = [0u8; HEADER_SIZE];
        read(flash, page_end - HEADER_SIZE, &mut raw_header)?;

        let Ok(header) = TableHeader::from_bytes(&raw_header) else {
            continue;
        };

        let table_len = header.total_len();
        if table_len > page_end {
            continue;
        }

        let address = page_end - table_len;
        let mut raw_table = vec![0u8; table_len];
        read(flash, address, &mut raw_table)?;

        match LayoutTable::from_bytes(&raw_table) {
            Ok(table) => {
                #[cfg(feature = "debug-logs")]
                println!(
                    "  find_layout_table: found {} regions @{:#08x}",
                    table.regions().len(),
                    address
                );

                return Ok(Some((address as u32, table)));
            }
            Err(_) => continue,
        }
    }

    Ok(None)
}

fn read<F: ReadNorFlash>(flash: &mut F, offset: usize, bytes: &mut [u8]) -> Result<(), Error> {
    let offset = u32::try_from(offset).map_err(|_| Error::FlashError)?;
    flash.read(offset, bytes).map_err(|_| Error::FlashError)
}
