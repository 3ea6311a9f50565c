//! Version matching and diffing of two analyzed workbooks.
//!
//! Rows are matched by user-chosen key columns rather than by position, so a
//! row inserted mid-sheet shows up as one added row instead of a cascade of
//! spurious edits below it.
//!
//! # Architecture
//!
//! - [`keys`]: composite row keys and their uniqueness
//! - [`match_rows`]: exact key → row matching with an optional fuzzy pass
//! - [`ChangeComputer`](traits::ChangeComputer): one computer per kind of
//!   change, in the [`changes`] module
//! - [`DiffEngine`]: validates settings, maps rows, runs the computers
//!
//! # Example
//!
//! ```ignore
//! use sheet_audit::diff::{DiffEngine, DiffSide};
//!
//! let engine = DiffEngine::new(config.matching.clone());
//! let result = engine.compare(
//!     &DiffSide::new(&old.model, &old.report),
//!     &DiffSide::new(&new.model, &new.report),
//! )?;
//! for warning in &result.warnings {
//!     eprintln!("{warning}");
//! }
//! ```

pub mod changes;
mod engine;
pub mod keys;
mod matching;
mod result;
pub mod traits;

pub use engine::DiffEngine;
pub use keys::{KeyUniqueness, KeyUniquenessWarning, RowKey, Version};
pub use matching::{match_rows, RowMap, RowMapping};
pub use result::{ChangeCategory, ChangeKind, ChangeSeverity, DiffResult, DiffSummary};
pub use traits::{
    CellChangeSet, ChangeComputer, DiffSide, RiskChangeSet, StructuralChangeSet,
};
