//! Trait definitions for diff computation strategies.
//!
//! Each kind of change between two versions (cells, risks, structure) is
//! computed by its own [`ChangeComputer`], so the engine stays a thin
//! orchestrator and each computer can be tested alone.

use super::matching::RowMap;
use super::result::ChangeCategory;
use crate::model::SpreadsheetModel;
use crate::risk::RiskReport;

/// One analyzed version of a workbook.
#[derive(Debug, Clone, Copy)]
pub struct DiffSide<'a> {
    pub model: &'a SpreadsheetModel,
    pub report: &'a RiskReport,
}

impl<'a> DiffSide<'a> {
    #[must_use]
    pub const fn new(model: &'a SpreadsheetModel, report: &'a RiskReport) -> Self {
        Self { model, report }
    }
}

/// Trait for computing a specific type of change between two versions.
pub trait ChangeComputer: Send + Sync {
    /// The type of changes this computer produces.
    type ChangeSet;

    /// Compute changes between the old and new version given the row mapping.
    fn compute(&self, old: &DiffSide<'_>, new: &DiffSide<'_>, rows: &RowMap) -> Self::ChangeSet;

    /// Name of this computer for logging.
    fn name(&self) -> &str;
}

/// Formula and input changes.
#[derive(Debug, Clone, Default)]
pub struct CellChangeSet {
    pub logic: Vec<ChangeCategory>,
    pub input: Vec<ChangeCategory>,
}

impl CellChangeSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.logic.is_empty() && self.input.is_empty()
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.logic.len() + self.input.len()
    }
}

/// Risks that disappeared or appeared.
#[derive(Debug, Clone, Default)]
pub struct RiskChangeSet {
    pub resolved: Vec<ChangeCategory>,
    pub introduced: Vec<ChangeCategory>,
}

impl RiskChangeSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty() && self.introduced.is_empty()
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.resolved.len() + self.introduced.len()
    }
}

/// Sheet and row additions and removals.
#[derive(Debug, Clone, Default)]
pub struct StructuralChangeSet {
    pub sheets_added: Vec<ChangeCategory>,
    pub sheets_removed: Vec<ChangeCategory>,
    pub rows_added: Vec<ChangeCategory>,
    pub rows_deleted: Vec<ChangeCategory>,
}

impl StructuralChangeSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.sheets_added.len()
            + self.sheets_removed.len()
            + self.rows_added.len()
            + self.rows_deleted.len()
    }
}
