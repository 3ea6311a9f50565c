//! Cell index with precomputed row lookups.
//!
//! Built once per model. Detectors and the tracer look cells up by key and walk
//! rows left to right, so both are O(1) / O(row) instead of scanning the whole
//! workbook.

use super::address::{CellAddress, CellKey};
use super::cell::Cell;
use indexmap::IndexMap;
use std::collections::{BTreeMap, HashMap};

/// Every cell of the model, real and virtual, in insertion order.
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct CellIndex {
    cells: IndexMap<CellKey, Cell>,
    /// Columns present per (sheet, row), sorted
    rows: HashMap<String, BTreeMap<u32, Vec<u32>>>,
}

impl CellIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a cell. Returns the displaced cell if the key was already present.
    pub fn insert(&mut self, cell: Cell) -> Option<Cell> {
        let key = cell.key.clone();
        let previous = self.cells.insert(key.clone(), cell);
        if previous.is_none() {
            let cols = self
                .rows
                .entry(key.sheet)
                .or_default()
                .entry(key.address.row)
                .or_default();
            if let Err(pos) = cols.binary_search(&key.address.col) {
                cols.insert(pos, key.address.col);
            }
        }
        previous
    }

    #[must_use]
    pub fn get(&self, key: &CellKey) -> Option<&Cell> {
        self.cells.get(key)
    }

    pub(crate) fn get_mut(&mut self, key: &CellKey) -> Option<&mut Cell> {
        self.cells.get_mut(key)
    }

    /// Look a cell up without building a key.
    #[must_use]
    pub fn at(&self, sheet: &str, address: CellAddress) -> Option<&Cell> {
        self.cells.get(&CellKey::new(sheet, address))
    }

    #[must_use]
    pub fn contains(&self, key: &CellKey) -> bool {
        self.cells.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cell> {
        self.cells.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &CellKey> {
        self.cells.keys()
    }

    /// Cells of one row, left to right.
    pub fn row<'a>(&'a self, sheet: &'a str, row: u32) -> impl Iterator<Item = &'a Cell> + 'a {
        self.rows
            .get(sheet)
            .and_then(|rows| rows.get(&row))
            .into_iter()
            .flatten()
            .filter_map(move |col| self.at(sheet, CellAddress::new(row, *col)))
    }

    /// Populated row numbers of a sheet, ascending.
    pub fn rows_of<'a>(&'a self, sheet: &str) -> impl Iterator<Item = u32> + 'a {
        self.rows
            .get(sheet)
            .into_iter()
            .flat_map(|rows| rows.keys().copied())
    }

    /// Rightmost populated column of a row.
    #[must_use]
    pub fn max_col(&self, sheet: &str, row: u32) -> Option<u32> {
        self.rows
            .get(sheet)
            .and_then(|rows| rows.get(&row))
            .and_then(|cols| cols.last().copied())
    }
}
