//! Layout configuration for register sheets
//!
//! This module houses the datastructure that describes where the extractor
//! expects things to be on a sheet. The defaults match the house layout the
//! extractor was written for; a config is only needed if a sheet deviates
//! from it.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
/// Sheet layout configuration
pub struct LayoutConfig {
    /// Cell text that marks the top-left corner of a register table.
    ///
    /// Defaults to `"Addr"`.
    pub register_anchor: String,
    /// Cell text that marks the description column of a meaning table.
    ///
    /// Defaults to `"Meaning"`.
    pub meaning_anchor: String,
    /// Name-column text that starts a new meaning table and therefore ends
    /// the one being read.
    ///
    /// Defaults to `"Name"`.
    pub name_header: String,
    /// How many columns to the left of the meaning column the name column
    /// sits.
    ///
    /// Defaults to `4`.
    pub meaning_name_offset: usize,
    /// Row offset, relative to the anchor, of the bit-number row.
    pub bit_row_offset: usize,
    /// Row offset, relative to the anchor, of the field-name row.
    pub name_row_offset: usize,
    /// Row offset, relative to the anchor, of the default-value row.
    pub default_row_offset: usize,
    /// Number of bit columns to the right of the anchor. Columns run MSB to
    /// LSB, so the first column holds bit `bit_window - 1`.
    ///
    /// Defaults to `16` and must not exceed 32.
    pub bit_window: usize,
    /// Insert a single placeholder register when a sheet yields none.
    ///
    /// Defaults to `true`.
    pub placeholder_register: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            register_anchor: "Addr".into(),
            meaning_anchor: "Meaning".into(),
            name_header: "Name".into(),
            meaning_name_offset: 4,
            bit_row_offset: 1,
            name_row_offset: 2,
            default_row_offset: 3,
            bit_window: 16,
            placeholder_register: true,
        }
    }
}

impl LayoutConfig {
    /// Highest bit number the layout can describe
    pub fn top_bit(&self) -> u8 {
        (self.bit_window.clamp(1, 32) - 1) as u8
    }

    /// Bit number encoded by column `col` of a table anchored at `addr_col`
    ///
    /// Returns `None` for columns outside the bit window.
    pub fn bit_of_column(&self, addr_col: usize, col: usize) -> Option<u8> {
        let offset = col.checked_sub(addr_col + 1)?;
        if offset >= self.bit_window.min(32) {
            return None;
        }

        Some(self.top_bit() - offset as u8)
    }

    /// Column holding bit `bit` of a table anchored at `addr_col`
    ///
    /// Bits above [`top_bit`](Self::top_bit) map to the first column.
    pub fn column_of_bit(&self, addr_col: usize, bit: u8) -> usize {
        addr_col + 1 + self.top_bit().saturating_sub(bit) as usize
    }
}
