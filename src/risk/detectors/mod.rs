//! Structural risk detectors.
//!
//! Each detector is an independent heuristic over the read-only model. None
//! of them mutate the model, so the engine may run them in parallel.

mod circular;
mod cross_sheet;
mod external_link;
mod formula_error;
mod hardcode;
mod merged;
mod row_pattern;
mod value_conflict;

pub use circular::CircularReferenceDetector;
pub use cross_sheet::CrossSheetFanOutDetector;
pub use external_link::ExternalLinkDetector;
pub use formula_error::FormulaErrorDetector;
pub use hardcode::HiddenHardcodeDetector;
pub use merged::MergedCellDetector;
pub use row_pattern::RowPatternDetector;
pub use value_conflict::ValueConflictDetector;

use super::alert::{RiskAlert, RiskKind};
use super::labeling::HeuristicLabeler;
use crate::config::DetectionConfig;
use crate::error::{AuditError, DetectorErrorKind, Result};
use crate::model::{Cell, SpreadsheetModel};

/// Everything a detector may read.
#[derive(Clone, Copy)]
pub struct DetectionContext<'a> {
    pub model: &'a SpreadsheetModel,
    pub config: &'a DetectionConfig,
    pub labels: &'a HeuristicLabeler,
}

impl<'a> DetectionContext<'a> {
    pub const fn new(
        model: &'a SpreadsheetModel,
        config: &'a DetectionConfig,
        labels: &'a HeuristicLabeler,
    ) -> Self {
        Self {
            model,
            config,
            labels,
        }
    }

    /// Real cells carrying a formula. Virtual cells only mirror their anchor
    /// and would report the same finding again.
    pub fn formula_cells(&self) -> impl Iterator<Item = (&'a Cell, &'a str)> + 'a {
        self.model
            .real_cells()
            .filter_map(|cell| cell.formula.as_deref().map(|f| (cell, f)))
    }
}

/// A single structural-risk heuristic.
pub trait Detector: Send + Sync {
    /// Name used in logs and failure reports.
    fn name(&self) -> &str;

    /// Kind of alert this detector emits.
    fn kind(&self) -> RiskKind;

    /// Scan the model.
    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vec<RiskAlert>>;
}

/// Every built-in detector, in reporting order.
#[must_use]
pub fn default_detectors() -> Vec<Box<dyn Detector>> {
    vec![
        Box::new(FormulaErrorDetector),
        Box::new(CircularReferenceDetector),
        Box::new(ExternalLinkDetector),
        Box::new(HiddenHardcodeDetector),
        Box::new(RowPatternDetector),
        Box::new(ValueConflictDetector),
        Box::new(MergedCellDetector),
        Box::new(CrossSheetFanOutDetector),
    ]
}

/// Reject a ratio threshold outside `(0, 1]`.
pub(crate) fn require_ratio(detector: &str, field: &str, value: f64) -> Result<()> {
    if value > 0.0 && value <= 1.0 {
        return Ok(());
    }
    Err(AuditError::detector(
        format!("running {detector}"),
        DetectorErrorKind::Failed {
            detector: detector.to_string(),
            location: "configuration".to_string(),
            reason: format!("{field} must be within (0, 1], got {value}"),
        },
    ))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::builder::ModelBuilder;
    use crate::config::{BuilderConfig, LabelingConfig};
    use crate::model::Workbook;

    pub fn build(workbook: &Workbook) -> SpreadsheetModel {
        ModelBuilder::new(BuilderConfig::default())
            .build(workbook)
            .unwrap()
    }

    pub fn run(detector: &dyn Detector, model: &SpreadsheetModel) -> Vec<RiskAlert> {
        run_with(detector, model, &DetectionConfig::default())
    }

    pub fn run_with(
        detector: &dyn Detector,
        model: &SpreadsheetModel,
        config: &DetectionConfig,
    ) -> Vec<RiskAlert> {
        let labels = HeuristicLabeler::from_config(&LabelingConfig::default());
        detector
            .detect(&DetectionContext::new(model, config, &labels))
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_covers_every_detectable_kind() {
        let kinds: Vec<RiskKind> = default_detectors().iter().map(|d| d.kind()).collect();
        for kind in RiskKind::detectable() {
            assert!(kinds.contains(kind), "{kind} has no detector");
        }
        assert_eq!(kinds.len(), RiskKind::detectable().len());
    }

    #[test]
    fn test_require_ratio() {
        assert!(require_ratio("x", "majority", 0.7).is_ok());
        assert!(require_ratio("x", "majority", 1.0).is_ok());
        assert!(require_ratio("x", "majority", 0.0).is_err());
        assert!(require_ratio("x", "majority", 1.5).is_err());
    }
}
