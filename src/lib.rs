//! **Structural risk analysis for spreadsheet financial models.**
//!
//! `sheet-audit` takes a pre-parsed workbook (cells, formulas and merged
//! regions per sheet), builds a cell-level dependency graph, and reports the
//! structural risks that make a financial model fragile: numbers typed into
//! formulas, circular references, rows whose formulas break their pattern,
//! links to other files, error sentinels and merged-cell hazards. Each risk
//! is labelled with the row and column headers a reviewer would read, scored
//! by how much of the model it reaches, and rolled into a health score.
//!
//! Reading the workbook file itself is left to the caller.
//!
//! ## Modules
//!
//! - **[`builder`]**: turns a [`Workbook`] into a [`SpreadsheetModel`]: cell
//!   index, virtual fill of merged regions, and the dependency graph.
//! - **[`risk`]**: the detector registry, alert compression, labeling and
//!   triage, driven by the [`RiskEngine`].
//! - **[`trace`]**: precedents, dependents, terminal drivers, causal trees and
//!   the diffusion / dominance profile of every literal.
//! - **[`diff`]**: key-column row matching between two versions and change
//!   classification, driven by the [`DiffEngine`].
//! - **[`pipeline`]**: one-call analysis, comparison, and result caching.
//! - **[`config`]**: thresholds, presets and `.sheet-audit.yaml` files.
//!
//! ## Analyzing a workbook
//!
//! ```no_run
//! use sheet_audit::{analyze, AuditConfig, Workbook};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut workbook = Workbook::new();
//!     workbook
//!         .add_sheet("Plan")
//!         .value("A4", "Unit price")
//!         .value("F4", 201.26)
//!         .formula("F8", "=F4*1.1");
//!
//!     let analysis = analyze(&workbook, &AuditConfig::default())?;
//!     println!("health score: {}", analysis.report.health_score);
//!     for alert in &analysis.report.alerts {
//!         println!("[{}] {} at {}", alert.severity, alert.kind, alert.qualified_location());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Comparing two versions
//!
//! ```no_run
//! use sheet_audit::{analyze, compare, AuditConfig, Workbook};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AuditConfig::builder().key_columns("Plan", &["A"]).build();
//!     let old = analyze(&Workbook::from_json_file("v1.json".as_ref())?, &config)?;
//!     let new = analyze(&Workbook::from_json_file("v2.json".as_ref())?, &config)?;
//!
//!     let diff = compare(&old, &new, &config.matching)?;
//!     println!("score {} -> {} ({:+})", diff.old_score, diff.new_score, diff.score_delta);
//!     for change in &diff.changes {
//!         println!("{change}");
//!     }
//!     Ok(())
//! }
//! ```

// Lint to discourage unwrap() in production code - prefer explicit error handling
#![warn(clippy::unwrap_used)]
#![allow(
    // Cell counts and scores are converted between usize and f64 freely;
    // all values are bounded by the cell cap
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::too_many_lines,
    clippy::unused_self,
    // `old`/`new`, `row`/`rows` are clear in context
    clippy::similar_names
)]

pub mod builder;
pub mod config;
pub mod diff;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod risk;
pub mod trace;
pub mod utils;

// Re-export main types for convenience
pub use builder::ModelBuilder;
pub use config::{
    AuditConfig, AuditConfigBuilder, BuilderConfig, CacheConfig, ConfigError, ConfigPreset,
    DetectionConfig, ImpactConfig, LabelingConfig, MatchingConfig, Validatable,
};
pub use diff::{ChangeCategory, ChangeKind, ChangeSeverity, DiffEngine, DiffResult, RowMapping};
pub use error::{AuditError, Result};
pub use model::{
    Cell, CellAddress, CellKey, CellRange, CellValue, DependencyGraph, SpreadsheetModel, Workbook,
};
pub use pipeline::{
    analyze, analyze_cached, analyze_with_labeler, compare, Analysis, AnalysisCache,
};
pub use risk::{RiskAlert, RiskCategory, RiskEngine, RiskKind, RiskReport, Severity};
pub use trace::{CausalNode, DependencyTracer, LiteralImpact, Prescription};
