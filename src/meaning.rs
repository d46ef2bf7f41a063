//! Field descriptions from "Meaning" tables
//!
//! Register sheets keep human-readable field descriptions in separate
//! Name/Meaning tables that can sit anywhere on the sheet. Every table is
//! located by its `Meaning` header; the matching name column is a fixed number
//! of columns to the left of it.

use std::collections::HashMap;

use crate::{
    configs::LayoutConfig,
    grid::{self, Grid},
};

/// Rows inspected when deciding whether a blank row ends a table
const LOOKAHEAD: usize = 3;

/// Blank rows within the lookahead that end a table
const BLANK_ROWS_TO_END: usize = 2;

/// Field name → description lookup, merged from all meaning tables
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Meanings {
    entries: HashMap<String, String>,
}

impl Meanings {
    /// Collects every meaning table of `grid`
    ///
    /// When the same name appears in several tables, the table found last in
    /// row-major order wins.
    pub fn collect<G: Grid + ?Sized>(grid: &G, config: &LayoutConfig) -> Self {
        let mut meanings = Meanings::default();

        for (table, (row, col)) in grid::scan(grid, &config.meaning_anchor).enumerate() {
            let Some(name_col) = col.checked_sub(config.meaning_name_offset) else {
                log::debug!(
                    "meaning table #{} at ({}, {}) has no room for a name column",
                    table + 1,
                    row,
                    col
                );
                continue;
            };

            let found = meanings.read_table(grid, config, row + 1, name_col, col);
            log::debug!(
                "meaning table #{} at ({}, {}): {} entries",
                table + 1,
                row,
                col,
                found
            );
        }

        meanings
    }

    /// Reads one table body starting at `first_row`, returns the entry count
    fn read_table<G: Grid + ?Sized>(
        &mut self,
        grid: &G,
        config: &LayoutConfig,
        first_row: usize,
        name_col: usize,
        meaning_col: usize,
    ) -> usize {
        let rows = grid.rows();
        let blank = |row: usize| {
            grid.cell(row, name_col).is_empty() && grid.cell(row, meaning_col).is_empty()
        };

        let mut found = 0;
        for row in first_row..rows {
            let name = grid.cell(row, name_col);
            let meaning = grid.cell(row, meaning_col);

            if !name.is_empty() && !meaning.is_empty() {
                let name = name.text();
                if name == config.name_header.as_str() {
                    break;
                }

                log::trace!("meaning {} = {}", name, meaning.text());
                self.entries
                    .insert(name.into_owned(), meaning.text().into_owned());
                found += 1;
            } else if blank(row) {
                let blanks = (row..rows.min(row + LOOKAHEAD))
                    .filter(|&row| blank(row))
                    .count();
                if blanks >= BLANK_ROWS_TO_END {
                    break;
                }
            }
        }

        found
    }

    /// Adds or replaces one description
    pub fn insert(&mut self, name: impl Into<String>, meaning: impl Into<String>) {
        self.entries.insert(name.into(), meaning.into());
    }

    /// Looks up the description of a raw field name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Describes a field, synthesizing a description on lookup miss
    ///
    /// The synthesized form is `"<name> bits U:L"`, or `"<name> bit U"` for a
    /// single bit.
    pub fn describe(&self, name: &str, upper: u8, lower: u8) -> String {
        match self.get(name) {
            Some(meaning) => meaning.to_owned(),
            None if upper == lower => format!("{} bit {}", name, upper),
            None => format!("{} bits {}:{}", name, upper, lower),
        }
    }

    /// Number of known descriptions
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no description was collected
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::grid::Sheet;

    fn table(sheet: &mut Sheet, row: usize, col: usize, entries: &[(&str, &str)]) {
        sheet.set(row, col, "Name").set(row, col + 4, "Meaning");
        for (i, (name, meaning)) in entries.iter().enumerate() {
            sheet.set(row + 1 + i, col, *name).set(row + 1 + i, col + 4, *meaning);
        }
    }

    #[test]
    fn collects_single_table() {
        let mut sheet = Sheet::new();
        table(&mut sheet, 0, 0, &[("EN_VCM", "Enable VCM"), ("EN_TX", "Enable TX")]);

        let meanings = Meanings::collect(&sheet, &LayoutConfig::default());

        assert_eq!(meanings.len(), 2);
        assert_eq!(meanings.get("EN_TX"), Some("Enable TX"));
    }

    #[test]
    fn stops_at_next_header() {
        let mut sheet = Sheet::new();
        table(&mut sheet, 0, 1, &[("A", "first")]);
        // A second table directly below, with its header in the name column
        // but no Meaning anchor of its own.
        sheet.set(2, 1, "Name").set(2, 5, "Desc").set(3, 1, "B").set(3, 5, "second");

        let meanings = Meanings::collect(&sheet, &LayoutConfig::default());

        assert_eq!(meanings.get("A"), Some("first"));
        assert_eq!(meanings.get("B"), None);
    }

    #[test]
    fn single_blank_row_does_not_end_table() {
        let mut sheet = Sheet::new();
        table(&mut sheet, 0, 0, &[("A", "first")]);
        sheet.set(3, 0, "B").set(3, 4, "second");

        let meanings = Meanings::collect(&sheet, &LayoutConfig::default());

        assert_eq!(meanings.get("B"), Some("second"));
    }

    #[test]
    fn two_blank_rows_end_table() {
        let mut sheet = Sheet::new();
        table(&mut sheet, 0, 0, &[("A", "first")]);
        sheet.set(4, 0, "B").set(4, 4, "second");

        let meanings = Meanings::collect(&sheet, &LayoutConfig::default());

        assert_eq!(meanings.get("B"), None);
    }

    #[test]
    fn half_filled_rows_are_skipped() {
        let mut sheet = Sheet::new();
        table(&mut sheet, 0, 0, &[("A", "first")]);
        sheet.set(2, 0, "orphan").set(3, 4, "no name").set(4, 0, "B").set(4, 4, "second");

        let meanings = Meanings::collect(&sheet, &LayoutConfig::default());

        assert_eq!(meanings.get("orphan"), None);
        assert_eq!(meanings.get("B"), Some("second"));
    }

    #[test]
    fn later_tables_overwrite_earlier() {
        let mut sheet = Sheet::new();
        table(&mut sheet, 0, 0, &[("A", "old")]);
        table(&mut sheet, 10, 6, &[("A", "new")]);

        let meanings = Meanings::collect(&sheet, &LayoutConfig::default());

        assert_eq!(meanings.get("A"), Some("new"));
    }

    #[test]
    fn anchor_too_close_to_edge_is_skipped() {
        let mut sheet = Sheet::new();
        sheet.set(0, 2, "Meaning").set(1, 2, "text");

        let meanings = Meanings::collect(&sheet, &LayoutConfig::default());

        assert!(meanings.is_empty());
    }

    #[test]
    fn describe_falls_back() {
        let mut meanings = Meanings::default();
        meanings.insert("EN_TX", "Enable TX");

        assert_eq!(meanings.describe("EN_TX", 14, 14), "Enable TX");
        assert_eq!(meanings.describe("EN_RX", 13, 13), "EN_RX bit 13");
        assert_eq!(meanings.describe("TX_SEL<13:0>", 13, 0), "TX_SEL<13:0> bits 13:0");
    }
}
