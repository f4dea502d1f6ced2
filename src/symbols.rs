use crate::error::Error;

pub const SOFTDEVICE_START: &str = "_binary_softdevice_bin_start";
pub const ISR_VECTOR: &str = "__isr_vector";
pub const ETEXT: &str = "__etext";
pub const DATA_START: &str = "__data_start__";
pub const DATA_END: &str = "__data_end__";
pub const FS_START: &str = "_fs_start";
pub const FS_END: &str = "_fs_end";
pub const VERSION_STRING: &str = "microbit_version_string";

/// All linker symbols needed to lay out the flash.
pub const REQUIRED_SYMBOLS: [&str; 8] = [
    SOFTDEVICE_START,
    ISR_VECTOR,
    ETEXT,
    DATA_START,
    DATA_END,
    FS_START,
    FS_END,
    VERSION_STRING,
];

/// Resolved addresses of the linker symbols in [`REQUIRED_SYMBOLS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Symbols {
    pub softdevice_start: u32,
    pub isr_vector: u32,
    pub etext: u32,
    pub data_start: u32,
    pub data_end: u32,
    pub fs_start: u32,
    pub fs_end: u32,
    pub version_string: u32,
}

impl Symbols {
    /// Looks up every required symbol, failing on the first one that is missing.
    pub fn resolve<F>(mut lookup: F) -> Result<Self, Error>
    where
        F: FnMut(&str) -> Option<u32>,
    {
        let mut get = |name: &'static str| lookup(name).ok_or(Error::MissingSymbol(name));

        Ok(Self {
            softdevice_start: get(SOFTDEVICE_START)?,
            isr_vector: get(ISR_VECTOR)?,
            etext: get(ETEXT)?,
            data_start: get(DATA_START)?,
            data_end: get(DATA_END)?,
            fs_start: get(FS_START)?,
            fs_end: get(FS_END)?,
            version_string: get(VERSION_STRING)?,
        })
    }

    /// Derives the flash regions.
    ///
    /// The SoftDevice ends where the vector table of MicroPython starts. MicroPython ends after
    /// its text and the initializers of the data section, which are stored right behind it.
    pub fn regions(&self) -> Result<FirmwareRegions, Error> {
        let data_len = self
            .data_end
            .checked_sub(self.data_start)
            .ok_or(Error::InvalidRegion("data"))?;
        let mp_end = self
            .etext
            .checked_add(data_len)
            .ok_or(Error::InvalidRegion("MicroPython"))?;

        Ok(FirmwareRegions {
            softdevice: FlashRegion::new("SoftDevice", self.softdevice_start, self.isr_vector)?,
            micropython: FlashRegion::new("MicroPython", self.isr_vector, mp_end)?,
            filesystem: FlashRegion::new("Filesystem", self.fs_start, self.fs_end)?,
            version_string: self.version_string,
        })
    }
}

/// A half open address range `start..end`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlashRegion {
    pub start: u32,
    pub end: u32,
}

impl FlashRegion {
    fn new(name: &'static str, start: u32, end: u32) -> Result<Self, Error> {
        if end < start {
            return Err(Error::InvalidRegion(name));
        }
        Ok(Self { start, end })
    }

    pub const fn len(&self) -> u32 {
        self.end - self.start
    }

    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FirmwareRegions {
    pub softdevice: FlashRegion,
    pub micropython: FlashRegion,
    pub filesystem: FlashRegion,
    /// Address of the MicroPython version string, stored as the hash of the MicroPython region.
    pub version_string: u32,
}
