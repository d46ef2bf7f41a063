//! Spreadsheet grid abstraction
//!
//! The extractor does not read workbook files itself. It needs exactly two
//! things from whatever spreadsheet library sits in front of it: the value of
//! a cell at `(row, col)` and the list of merged rectangular regions. The
//! [`Grid`] trait captures that. [`Sheet`] is an in-memory implementation that
//! can also be deserialized from a JSON dump of a worksheet.
//!
//! All coordinates are 0-based, and region bounds are inclusive.

use std::{borrow::Cow, collections::HashMap, iter::FusedIterator};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

static EMPTY: Cell = Cell::Empty;

/// The value of one spreadsheet cell
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Cell {
    /// Blank cell
    Empty,
    /// Numeric cell
    Number(f64),
    /// Text cell, untrimmed
    Text(String),
}

impl Cell {
    /// Returns the trimmed text of the cell
    ///
    /// Whole numbers are rendered without a fractional part, so a numeric
    /// `1.0` reads as `"1"`. Blank cells yield an empty string.
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            Cell::Empty => Cow::Borrowed(""),
            Cell::Text(text) => Cow::Borrowed(text.trim()),
            Cell::Number(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
                Cow::Owned(format!("{}", *value as i64))
            }
            Cell::Number(value) => Cow::Owned(format!("{}", value)),
        }
    }

    /// Returns `true` for blank cells and cells holding only whitespace
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(text) => text.trim().is_empty(),
            Cell::Number(value) => value.is_nan(),
        }
    }

    /// Interprets the cell as an integer
    ///
    /// Accepts whole numbers and text holding a decimal integer. Anything
    /// else, including fractional numbers, yields `None`.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Cell::Empty => None,
            Cell::Number(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
                Some(*value as i64)
            }
            Cell::Number(_) => None,
            Cell::Text(text) => text.trim().parse().ok(),
        }
    }
}

impl Default for Cell {
    fn default() -> Self {
        Cell::Empty
    }
}

impl From<&str> for Cell {
    fn from(text: &str) -> Self {
        Cell::Text(text.into())
    }
}

impl From<String> for Cell {
    fn from(text: String) -> Self {
        Cell::Text(text)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Number(value as f64)
    }
}

impl From<u32> for Cell {
    fn from(value: u32) -> Self {
        Cell::Number(value as f64)
    }
}

/// A merged rectangular cell region
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "[usize; 4]", into = "[usize; 4]"))]
pub struct Region {
    /// First row
    pub min_row: usize,
    /// First column
    pub min_col: usize,
    /// Last row, inclusive
    pub max_row: usize,
    /// Last column, inclusive
    pub max_col: usize,
}

impl Region {
    /// Creates a region from its inclusive bounds
    pub fn new(min_row: usize, min_col: usize, max_row: usize, max_col: usize) -> Self {
        Region {
            min_row,
            min_col,
            max_row,
            max_col,
        }
    }

    /// The top-left cell, which holds the region's value
    pub fn master(&self) -> (usize, usize) {
        (self.min_row, self.min_col)
    }

    /// Returns `true` if `(row, col)` lies within the region
    pub fn contains(&self, row: usize, col: usize) -> bool {
        (self.min_row..=self.max_row).contains(&row) && (self.min_col..=self.max_col).contains(&col)
    }
}

impl From<[usize; 4]> for Region {
    fn from([min_row, min_col, max_row, max_col]: [usize; 4]) -> Self {
        Region::new(min_row, min_col, max_row, max_col)
    }
}

impl From<Region> for [usize; 4] {
    fn from(region: Region) -> Self {
        [region.min_row, region.min_col, region.max_row, region.max_col]
    }
}

/// Read access to a 2D spreadsheet grid
pub trait Grid {
    /// Number of rows
    fn rows(&self) -> usize;

    /// Number of columns
    fn cols(&self) -> usize;

    /// The cell at `(row, col)`; out-of-range coordinates read as blank
    fn cell(&self, row: usize, col: usize) -> &Cell;

    /// The merged regions of the grid
    fn merged_regions(&self) -> &[Region];
}

/// An in-memory worksheet
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Sheet {
    /// Cells, row by row. Rows may have different lengths.
    #[cfg_attr(feature = "serde", serde(default))]
    pub cells: Vec<Vec<Cell>>,
    /// Merged regions as `[min_row, min_col, max_row, max_col]`
    #[cfg_attr(feature = "serde", serde(default))]
    pub merged: Vec<Region>,
}

impl Sheet {
    /// Creates an empty sheet
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sheet from rows of cells
    pub fn from_rows(cells: Vec<Vec<Cell>>) -> Self {
        Sheet {
            cells,
            merged: Vec::new(),
        }
    }

    /// Sets the cell at `(row, col)`, growing the sheet as needed
    pub fn set(&mut self, row: usize, col: usize, value: impl Into<Cell>) -> &mut Self {
        if self.cells.len() <= row {
            self.cells.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.cells[row];
        if cells.len() <= col {
            cells.resize_with(col + 1, Cell::default);
        }
        cells[col] = value.into();

        self
    }

    /// Writes `values` into consecutive columns of `row`, starting at `col`
    pub fn set_row<I>(&mut self, row: usize, col: usize, values: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<Cell>,
    {
        for (i, value) in values.into_iter().enumerate() {
            self.set(row, col + i, value);
        }

        self
    }

    /// Adds a merged region
    pub fn merge(
        &mut self,
        min_row: usize,
        min_col: usize,
        max_row: usize,
        max_col: usize,
    ) -> &mut Self {
        self.merged.push(Region::new(min_row, min_col, max_row, max_col));
        self
    }
}

#[cfg(feature = "serde")]
impl Sheet {
    /// Parses a worksheet dump
    pub fn from_json(json: &str) -> Result<Self, crate::Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a worksheet dump from a file
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, crate::Error> {
        let path = path.as_ref();
        let sheet = Self::from_json(&std::fs::read_to_string(path)?)?;
        log::debug!(
            "loaded sheet {} ({} rows, {} merged regions)",
            path.display(),
            sheet.rows(),
            sheet.merged.len()
        );

        Ok(sheet)
    }
}

impl Grid for Sheet {
    fn rows(&self) -> usize {
        self.cells.len()
    }

    fn cols(&self) -> usize {
        self.cells.iter().map(Vec::len).max().unwrap_or(0)
    }

    fn cell(&self, row: usize, col: usize) -> &Cell {
        self.cells
            .get(row)
            .and_then(|cells| cells.get(col))
            .unwrap_or(&EMPTY)
    }

    fn merged_regions(&self) -> &[Region] {
        &self.merged
    }
}

/// Iterator over the cells whose trimmed text equals a literal
///
/// Created by [`scan`]. Yields `(row, col)` in row-major order.
pub struct Scan<'g, G: ?Sized> {
    grid: &'g G,
    literal: &'g str,
    rows: usize,
    cols: usize,
    row: usize,
    col: usize,
}

impl<G: Grid + ?Sized> Iterator for Scan<'_, G> {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        while self.row < self.rows {
            while self.col < self.cols {
                let (row, col) = (self.row, self.col);
                self.col += 1;

                if let Cell::Text(text) = self.grid.cell(row, col) {
                    if text.trim() == self.literal {
                        return Some((row, col));
                    }
                }
            }
            self.row += 1;
            self.col = 0;
        }

        None
    }
}

impl<G: Grid + ?Sized> FusedIterator for Scan<'_, G> {}

/// Finds every cell of `grid` whose trimmed text is exactly `literal`
///
/// Only text cells match, so a numeric cell never matches a literal like
/// `"1"`.
pub fn scan<'g, G: Grid + ?Sized>(grid: &'g G, literal: &'g str) -> Scan<'g, G> {
    Scan {
        grid,
        literal,
        rows: grid.rows(),
        cols: grid.cols(),
        row: 0,
        col: 0,
    }
}

/// Where a coordinate sits within a merged region
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Span {
    /// The region covering the coordinate
    pub region: Region,
    /// `true` if the coordinate is the region's top-left cell
    pub is_master: bool,
}

/// Coordinate index over a grid's merged regions
///
/// Coordinates outside every region are simply absent. Overlapping regions
/// are not supported: the region indexed last wins.
#[derive(Clone, Debug, Default)]
pub struct MergedRegions {
    spans: HashMap<(usize, usize), Span>,
}

impl MergedRegions {
    /// Indexes every coordinate covered by `regions`
    pub fn new<'r, I>(regions: I) -> Self
    where
        I: IntoIterator<Item = &'r Region>,
    {
        let mut spans = HashMap::new();

        for region in regions {
            for row in region.min_row..=region.max_row {
                for col in region.min_col..=region.max_col {
                    let is_master = (row, col) == region.master();
                    spans.insert(
                        (row, col),
                        Span {
                            region: *region,
                            is_master,
                        },
                    );
                }
            }
        }

        MergedRegions { spans }
    }

    /// Indexes the merged regions of `grid`
    pub fn of<G: Grid + ?Sized>(grid: &G) -> Self {
        Self::new(grid.merged_regions())
    }

    /// Looks up the region covering `(row, col)`
    pub fn get(&self, row: usize, col: usize) -> Option<&Span> {
        self.spans.get(&(row, col))
    }

    /// Number of indexed coordinates
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// Returns `true` if no coordinate is covered
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sheet() -> Sheet {
        let mut sheet = Sheet::new();
        sheet
            .set(0, 1, "Addr")
            .set(0, 4, " Addr ")
            .set(2, 0, "Address")
            .set(3, 2, "Addr")
            .set(3, 3, 1.0);
        sheet
    }

    #[test]
    fn scan_is_row_major_and_exact() {
        let sheet = sheet();

        let hits: Vec<_> = scan(&sheet, "Addr").collect();

        assert_eq!(hits, vec![(0, 1), (0, 4), (3, 2)]);
    }

    #[test]
    fn scan_ignores_numbers_and_finishes() {
        let sheet = sheet();
        let mut hits = scan(&sheet, "1");

        assert_eq!(hits.next(), None);
        assert_eq!(hits.next(), None);
        assert_eq!(scan(&Sheet::new(), "Addr").count(), 0);
    }

    #[test]
    fn cell_text_and_integers() {
        assert_eq!(Cell::Number(3.0).text(), "3");
        assert_eq!(Cell::Number(0.5).text(), "0.5");
        assert_eq!(Cell::from("  EN_TX ").text(), "EN_TX");
        assert_eq!(Cell::Number(7.0).as_integer(), Some(7));
        assert_eq!(Cell::from(" 12 ").as_integer(), Some(12));
        assert_eq!(Cell::Number(1.5).as_integer(), None);
        assert_eq!(Cell::from("x").as_integer(), None);
        assert!(Cell::from("   ").is_empty());
        assert!(Cell::Number(f64::NAN).is_empty());
    }

    #[test]
    fn out_of_range_cells_are_blank() {
        let sheet = sheet();

        assert_eq!(sheet.cell(100, 100), &Cell::Empty);
        assert_eq!(sheet.rows(), 4);
        assert_eq!(sheet.cols(), 5);
    }

    #[test]
    fn merged_regions_cover_every_cell() {
        let regions = [Region::new(2, 3, 2, 6), Region::new(5, 0, 6, 1)];

        let merged = MergedRegions::new(&regions);

        assert_eq!(merged.len(), 8);
        assert!(merged.get(2, 3).unwrap().is_master);
        assert!(!merged.get(2, 6).unwrap().is_master);
        assert_eq!(merged.get(6, 1).unwrap().region, regions[1]);
        assert!(merged.get(2, 7).is_none());
    }

    #[test]
    fn overlapping_regions_last_wins() {
        let regions = [Region::new(0, 0, 0, 3), Region::new(0, 2, 0, 5)];

        let merged = MergedRegions::new(&regions);

        assert_eq!(merged.get(0, 2).unwrap().region, regions[1]);
        assert_eq!(merged.get(0, 1).unwrap().region, regions[0]);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn sheet_from_json() {
        let sheet = Sheet::from_json(
            r#"{ "cells": [["Addr", "0x01", null], [null, 15, 14.0]], "merged": [[1, 1, 1, 2]] }"#,
        )
        .unwrap();

        assert_eq!(sheet.cell(0, 0), &Cell::from("Addr"));
        assert_eq!(sheet.cell(0, 2), &Cell::Empty);
        assert_eq!(sheet.cell(1, 1).as_integer(), Some(15));
        assert_eq!(sheet.merged_regions(), &[Region::new(1, 1, 1, 2)]);
    }
}
