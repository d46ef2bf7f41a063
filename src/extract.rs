//! Register table extraction
//!
//! A register table is anchored at a cell holding the register keyword
//! (`Addr` by default). Relative to the anchor at `(row, col)`:
//!
//! ```text
//!            col     col+1   col+2        ...   col+16
//! row        Addr    0x01    Description
//! row+1              15      14           ...   0        <- bit numbers
//! row+2              EN_VCM  EN_TX        TX_SEL<13:0>   <- names, may be merged
//! row+3              1       0            ...   0        <- per-bit defaults
//! ```
//!
//! A name that is merged across several bit columns is one multi-bit field.
//! Defaults are still authored per physical bit column, so a merged field's
//! default is rebuilt from the individual bit cells.

use std::collections::HashSet;

use crate::{
    configs::LayoutConfig,
    grid::{Grid, MergedRegions, Region},
    map::Field,
    meaning::Meanings,
};

/// Characters removed from raw field names
const STRIPPED: &[char] = &['<', '>', ':', '(', ')', '\''];

/// Prefix of Verilog-style constant names such as `1'b0`
const VERILOG_BIT: &str = "1'b";

/// The raw content of one register table
#[derive(Clone, Debug, PartialEq)]
pub struct RegisterTable {
    /// Anchor row
    pub row: usize,
    /// Anchor column
    pub col: usize,
    /// Address text as found on the sheet
    pub address: String,
    /// Register description
    pub description: String,
    /// Fields in scan order, bit 15 first
    pub fields: Vec<Field>,
}

/// Extracts register tables from one grid
///
/// Borrowing the merged-region index and the meaning lookup lets a single
/// pass over the grid serve every anchor.
pub struct FieldExtractor<'a, G: ?Sized> {
    grid: &'a G,
    config: &'a LayoutConfig,
    merged: &'a MergedRegions,
    meanings: &'a Meanings,
}

impl<'a, G: Grid + ?Sized> FieldExtractor<'a, G> {
    /// Creates an extractor over `grid`
    pub fn new(
        grid: &'a G,
        config: &'a LayoutConfig,
        merged: &'a MergedRegions,
        meanings: &'a Meanings,
    ) -> Self {
        FieldExtractor {
            grid,
            config,
            merged,
            meanings,
        }
    }

    /// Extracts the register table anchored at `(row, addr_col)`
    ///
    /// Returns `None` if the table has no address or yields no fields.
    pub fn extract(&self, row: usize, addr_col: usize) -> Option<RegisterTable> {
        let address = self.grid.cell(row, addr_col + 1).text().into_owned();
        if address.is_empty() {
            log::debug!("anchor at ({}, {}) has no address", row, addr_col);
            return None;
        }
        let description = self.grid.cell(row, addr_col + 2).text().into_owned();

        let fields = self.fields(row, addr_col);
        if fields.is_empty() {
            log::warn!(
                "register {} at ({}, {}) has no fields, skipping",
                address,
                row,
                addr_col
            );
            return None;
        }

        log::debug!(
            "register {} ({}) at ({}, {}): {} fields",
            address,
            description,
            row,
            addr_col,
            fields.len()
        );

        Some(RegisterTable {
            row,
            col: addr_col,
            address,
            description,
            fields,
        })
    }

    /// Extracts the fields of the table anchored at `(row, addr_col)`
    pub fn fields(&self, row: usize, addr_col: usize) -> Vec<Field> {
        let bit_row = row + self.config.bit_row_offset;
        let name_row = row + self.config.name_row_offset;

        let mut fields: Vec<Field> = Vec::new();
        let mut seen_regions: HashSet<Region> = HashSet::new();

        for col in addr_col + 1..=addr_col + self.config.bit_window.min(32) {
            let Some(bit) = self.bit_number(bit_row, col) else {
                continue;
            };

            let span = self.merged.get(name_row, col);
            let (raw_name, upper, lower) = match span {
                Some(span) => {
                    if !seen_regions.insert(span.region) {
                        continue;
                    }

                    let (upper, lower) = self.region_bits(&span.region, addr_col);
                    let (master_row, master_col) = span.region.master();
                    let mut name = self.grid.cell(master_row, master_col).text();
                    if name.is_empty() {
                        name = self.grid.cell(name_row, col).text();
                    }
                    (name, upper, lower)
                }
                None => (self.grid.cell(name_row, col).text(), bit, bit),
            };

            if raw_name.is_empty() {
                continue;
            }

            let name = normalize_name(&raw_name, upper, lower, span.is_some());
            if fields.iter().any(|field| field.name == name) {
                log::debug!("duplicate field {} in column {}, skipping", name, col);
                continue;
            }

            let default = match span {
                Some(_) => self.merged_default(row, addr_col, upper, lower),
                None => self.bit_default(row, col),
            };
            let meaning = self.meanings.describe(&raw_name, upper, lower);

            let field = Field::new(name, upper, lower, default, meaning);
            log::trace!(
                "field {} [{}:{}] default {}",
                field.name,
                field.upper_bit,
                field.lower_bit,
                field.default_value
            );
            fields.push(field);
        }

        fields
    }

    /// The bit number printed above `col`, if it is a usable integer
    fn bit_number(&self, bit_row: usize, col: usize) -> Option<u8> {
        let bit = self.grid.cell(bit_row, col).as_integer()?;
        match u8::try_from(bit) {
            Ok(bit) if bit <= crate::codec::MSB => Some(bit),
            _ => {
                log::debug!("bit number {} at ({}, {}) out of range", bit, bit_row, col);
                None
            }
        }
    }

    /// `(upper, lower)` covered by a merged region's columns
    fn region_bits(&self, region: &Region, addr_col: usize) -> (u8, u8) {
        // Columns left of the window clamp to the top bit, right of it to 0.
        let bit = |col: usize| match self.config.bit_of_column(addr_col, col) {
            Some(bit) => bit,
            None if col <= addr_col => self.config.top_bit(),
            None => 0,
        };

        let (upper, lower) = (bit(region.min_col), bit(region.max_col));
        if upper < lower {
            (lower, upper)
        } else {
            (upper, lower)
        }
    }

    /// Default of the single bit in column `col`, 0 if unreadable
    fn bit_default(&self, row: usize, col: usize) -> u32 {
        let default_row = row + self.config.default_row_offset;

        self.grid
            .cell(default_row, col)
            .as_integer()
            .and_then(|value| u32::try_from(value).ok())
            .unwrap_or(0)
    }

    /// Default of a merged field, rebuilt from each bit's own default cell
    fn merged_default(&self, row: usize, addr_col: usize, upper: u8, lower: u8) -> u32 {
        let value = (lower..=upper).fold(0u64, |value, bit| {
            let col = self.config.column_of_bit(addr_col, bit);
            let bit_value = u64::from(self.bit_default(row, col));
            value | (bit_value << (bit - lower))
        });

        value as u32
    }
}

/// Turns a raw sheet name into a field identifier
///
/// Strips `<>:()'` and whitespace, maps `1'bX` to `BITX`, and replaces an
/// empty or purely numeric result with a position-based name: `BIT_<bit>` for
/// a single bit, `FIELD_<upper>_<lower>` for a merged span.
pub fn normalize_name(raw: &str, upper: u8, lower: u8, merged: bool) -> String {
    let raw = raw.trim();
    let strip = |text: &str| {
        text.chars()
            .filter(|c| !STRIPPED.contains(c) && !c.is_whitespace())
            .collect::<String>()
    };

    let name = match raw.strip_prefix(VERILOG_BIT) {
        Some(value) => format!("BIT{}", strip(value)),
        None => strip(raw),
    };

    if name.is_empty() || name.chars().all(|c| c.is_ascii_digit()) {
        if merged {
            format!("FIELD_{}_{}", upper, lower)
        } else {
            format!("BIT_{}", upper)
        }
    } else {
        name
    }
}
