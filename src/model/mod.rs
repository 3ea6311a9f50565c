//! Normalized spreadsheet model.
//!
//! The [`ModelBuilder`](crate::builder::ModelBuilder) turns a raw
//! [`Workbook`] into a [`SpreadsheetModel`]: a [`CellIndex`] holding every
//! cell (virtual cells of merged regions included) and a
//! [`DependencyGraph`] whose edges point from precedent to dependent.
//! Both are read-only once built, so detectors may share them freely.
//!
//! ```ignore
//! let model = ModelBuilder::new(config.builder.clone()).build(&workbook)?;
//! let f4 = CellKey::parse("Plan!F4").unwrap();
//! for dependent in model.graph.dependents(&f4) {
//!     println!("{dependent}");
//! }
//! ```

mod address;
mod cell;
mod graph;
mod index;
mod issue;
mod reference;
mod workbook;

pub use address::*;
pub use cell::*;
pub use graph::*;
pub use index::*;
pub use issue::*;
pub use reference::*;
pub use workbook::*;

use indexmap::IndexMap;

/// Output of the model builder.
#[derive(Debug, Clone, Default)]
pub struct SpreadsheetModel {
    pub index: CellIndex,
    pub graph: DependencyGraph,
    /// Sheet names in workbook order
    pub sheets: Vec<String>,
    /// Valid merged regions per sheet
    pub merged: IndexMap<String, Vec<CellRange>>,
    /// Input items skipped during the build
    pub issues: Vec<BuildIssue>,
    /// Hash of the workbook this model was built from
    pub content_hash: u64,
}

impl SpreadsheetModel {
    #[must_use]
    pub fn get(&self, key: &CellKey) -> Option<&Cell> {
        self.index.get(key)
    }

    #[must_use]
    pub fn cell(&self, sheet: &str, address: CellAddress) -> Option<&Cell> {
        self.index.at(sheet, address)
    }

    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.iter().map(String::as_str)
    }

    #[must_use]
    pub fn has_sheet(&self, name: &str) -> bool {
        self.sheets.iter().any(|s| s == name)
    }

    /// Merged regions of a sheet.
    #[must_use]
    pub fn merged_regions(&self, sheet: &str) -> &[CellRange] {
        self.merged.get(sheet).map_or(&[], Vec::as_slice)
    }

    /// Real (non-virtual) cells, in index order.
    pub fn real_cells(&self) -> impl Iterator<Item = &Cell> {
        self.index.iter().filter(|c| !c.is_virtual())
    }
}
