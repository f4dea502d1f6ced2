use std::collections::HashMap;
use std::fs;
use std::path::Path;

use flash_layout::Symbols;

use crate::error::Error;

/// Everything before this line is about archive members and memory regions.
const MEMORY_MAP_MARKER: &str = "Linker script and memory map";
const SYMBOL_LINE_PREFIX: &str = "0x00";

/// Symbol addresses read from a GNU ld map file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolMap {
    symbols: HashMap<String, u32>,
}

impl SymbolMap {
    /// Parse the content of a map file.
    ///
    /// Within the memory map section every line starting with an address is recorded under
    /// the name in its second column, later lines overriding earlier ones. Lines of input
    /// sections record their size as the name, which never collides with a symbol.
    pub fn from_map(content: &str) -> Result<Self, Error> {
        let mut symbols = HashMap::new();
        let mut in_memory_map = false;

        for (index, line) in content.lines().enumerate() {
            let line = line.trim();

            if line == MEMORY_MAP_MARKER {
                in_memory_map = true;
                continue;
            }
            if !in_memory_map || !line.starts_with(SYMBOL_LINE_PREFIX) {
                continue;
            }

            let mut fields = line.split_whitespace();
            let (Some(address), Some(name)) = (fields.next(), fields.next()) else {
                continue;
            };

            symbols.insert(name.to_string(), parse_address(address, index + 1)?);
        }

        Ok(Self { symbols })
    }

    /// Parse the map file at the given `path`.
    pub fn from_map_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let content = fs::read_to_string(path)?;
        Self::from_map(&content)
    }

    pub fn get(&self, name: &str) -> Option<u32> {
        self.symbols.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Resolve all symbols needed for the flash layout.
    pub fn symbols(&self) -> Result<Symbols, Error> {
        Ok(Symbols::resolve(|name| self.get(name))?)
    }
}

fn parse_address(value: &str, line: usize) -> Result<u32, Error> {
    let invalid = || Error::InvalidAddress {
        line,
        value: value.to_string(),
    };

    let digits = value.strip_prefix("0x").ok_or_else(invalid)?;
    let address = u64::from_str_radix(digits, 16).map_err(|_| invalid())?;
    u32::try_from(address).map_err(|_| invalid())
}
