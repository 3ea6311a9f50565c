//! Structural risk detection.
//!
//! A [`RiskEngine`] runs a registry of [`Detector`]s over a built
//! [`SpreadsheetModel`](crate::model::SpreadsheetModel) and post-processes
//! their findings in a fixed order:
//!
//! 1. impact: each alert counts the cells downstream of it
//! 2. compression: touching alerts of the same kind and key fold together
//! 3. labeling: row and column labels from the sheet, with optional recovery
//! 4. triage: business category, quantitative score, health score
//!
//! A failing detector never aborts the run; the report is flagged as partial
//! and lists the failure.

pub mod alert;
pub mod compress;
pub mod detectors;
pub mod engine;
pub mod labeling;
pub mod triage;

pub use alert::{Likelihood, RiskAlert, RiskCategory, RiskDetails, RiskKind, Severity};
pub use compress::{compress_alerts, format_location};
pub use detectors::{default_detectors, DetectionContext, Detector};
pub use engine::{DetectionOutcome, DetectorFailure, RiskEngine, RiskReport};
pub use labeling::{
    fallback_label, is_poor_quality_label, CachingLabelSource, HeuristicLabeler, LabelRequest,
    LabelSource, Labeler, Neighborhood,
};
pub use triage::{health_score, triage, ReviewProgress, ReviewState, TriageCounts};
