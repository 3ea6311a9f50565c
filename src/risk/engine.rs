//! Risk engine: runs the detectors and post-processes their findings.

use super::alert::{RiskAlert, RiskCategory, RiskKind, Severity};
use super::compress::compress_alerts;
use super::detectors::{default_detectors, DetectionContext, Detector};
use super::labeling::{HeuristicLabeler, LabelSource, Labeler};
use super::triage::{health_score, triage, TriageCounts};
use crate::config::AuditConfig;
use crate::model::{CellKey, SpreadsheetModel};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// A detector that failed; the rest of the run still completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorFailure {
    pub detector: String,
    pub message: String,
}

/// Raw detector output before post-processing.
#[derive(Debug, Clone, Default)]
pub struct DetectionOutcome {
    pub alerts: Vec<RiskAlert>,
    pub failures: Vec<DetectorFailure>,
}

/// Ordered risk list with its aggregate score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskReport {
    /// Severity descending, then sheet, row and column
    pub alerts: Vec<RiskAlert>,
    pub health_score: u32,
    /// True when at least one detector failed
    pub partial: bool,
    pub failures: Vec<DetectorFailure>,
    pub triage_counts: TriageCounts,
}

impl Default for RiskReport {
    fn default() -> Self {
        Self {
            alerts: Vec::new(),
            health_score: 100,
            partial: false,
            failures: Vec::new(),
            triage_counts: TriageCounts::default(),
        }
    }
}

impl RiskReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.alerts.is_empty() && !self.partial
    }

    pub fn of_kind(&self, kind: RiskKind) -> impl Iterator<Item = &RiskAlert> {
        self.alerts.iter().filter(move |a| a.kind == kind)
    }

    pub fn in_category(&self, category: RiskCategory) -> impl Iterator<Item = &RiskAlert> {
        self.alerts
            .iter()
            .filter(move |a| a.category == Some(category))
    }

    /// Alerts at or above `severity`.
    #[must_use]
    pub fn count_at_least(&self, severity: Severity) -> usize {
        self.alerts.iter().filter(|a| a.severity >= severity).count()
    }
}

/// Runs a registry of detectors against a model.
pub struct RiskEngine {
    detectors: Vec<Box<dyn Detector>>,
}

impl Default for RiskEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RiskEngine {
    /// Engine with every built-in detector.
    #[must_use]
    pub fn new() -> Self {
        Self {
            detectors: default_detectors(),
        }
    }

    /// Engine with no detectors.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            detectors: Vec::new(),
        }
    }

    /// Register an additional detector after the existing ones.
    #[must_use]
    pub fn with_detector(mut self, detector: Box<dyn Detector>) -> Self {
        self.detectors.push(detector);
        self
    }

    pub fn detector_names(&self) -> impl Iterator<Item = &str> {
        self.detectors.iter().map(|d| d.name())
    }

    /// Run every enabled detector. A failing detector is recorded and skipped.
    #[must_use]
    pub fn detect(
        &self,
        model: &SpreadsheetModel,
        config: &AuditConfig,
        labels: &HeuristicLabeler,
    ) -> DetectionOutcome {
        let ctx = DetectionContext::new(model, &config.detection, labels);
        let enabled: Vec<&dyn Detector> = self
            .detectors
            .iter()
            .map(AsRef::as_ref)
            .filter(|d| config.detection.is_enabled(d.kind()))
            .collect();

        let run = |detector: &&dyn Detector| {
            let started = Instant::now();
            let result = detector.detect(&ctx);
            tracing::debug!(
                detector = detector.name(),
                alerts = result.as_ref().map_or(0, Vec::len),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "detector finished"
            );
            (detector.name().to_string(), result)
        };
        // indexed parallel collect keeps registry order
        let results: Vec<_> = if config.detection.parallel {
            enabled.par_iter().map(run).collect()
        } else {
            enabled.iter().map(run).collect()
        };

        let mut outcome = DetectionOutcome::default();
        for (detector, result) in results {
            match result {
                Ok(alerts) => outcome.alerts.extend(alerts),
                Err(err) => {
                    tracing::warn!(detector = %detector, error = %err, "detector failed, continuing without it");
                    outcome.failures.push(DetectorFailure {
                        detector,
                        message: err.to_string(),
                    });
                }
            }
        }
        outcome
    }

    /// Detect, then score impact, compress, label and triage.
    #[must_use]
    pub fn analyze(
        &self,
        model: &SpreadsheetModel,
        config: &AuditConfig,
        recovery: Option<&dyn LabelSource>,
    ) -> RiskReport {
        let mut labeler = Labeler::new(&config.labeling);
        if let Some(source) = recovery {
            labeler = labeler.with_recovery(&config.labeling, source);
        }

        let DetectionOutcome {
            mut alerts,
            failures,
        } = self.detect(model, config, labeler.heuristic());
        let detected = alerts.len();

        assign_impact(model, &mut alerts);
        let mut alerts = compress_alerts(alerts);
        labeler.label_alerts(&model.index, &mut alerts);
        triage(&mut alerts);
        sort_alerts(&mut alerts);

        let report = RiskReport {
            health_score: health_score(&alerts),
            partial: !failures.is_empty(),
            triage_counts: TriageCounts::from_alerts(&alerts),
            alerts,
            failures,
        };
        tracing::info!(
            detected,
            reported = report.alerts.len(),
            health = report.health_score,
            partial = report.partial,
            "risk analysis finished"
        );
        report
    }
}

/// Set each alert's impact to the number of cells downstream of its cells.
pub fn assign_impact(model: &SpreadsheetModel, alerts: &mut [RiskAlert]) {
    for alert in alerts.iter_mut() {
        let keys: Vec<CellKey> = alert
            .cells
            .iter()
            .map(|a| CellKey::new(alert.sheet.clone(), *a))
            .collect();
        alert.impact_count = model.graph.union_descendants(keys.iter()).len();
    }
}

/// Severity descending, then sheet, row and column.
pub fn sort_alerts(alerts: &mut [RiskAlert]) {
    alerts.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| a.sheet.cmp(&b.sheet))
            .then_with(|| a.anchor().cmp(&b.anchor()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ModelBuilder;
    use crate::error::{AuditError, DetectorErrorKind, Result};
    use crate::model::Workbook;

    struct Broken;

    impl Detector for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn kind(&self) -> RiskKind {
            RiskKind::MergedCellRisk
        }

        fn detect(&self, _ctx: &DetectionContext<'_>) -> Result<Vec<RiskAlert>> {
            Err(AuditError::detector(
                "running broken",
                DetectorErrorKind::Failed {
                    detector: "broken".to_string(),
                    location: "Plan!A1".to_string(),
                    reason: "synthetic failure".to_string(),
                },
            ))
        }
    }

    fn workbook() -> Workbook {
        let mut wb = Workbook::new();
        wb.add_sheet("Plan")
            .value("A4", "Revenue")
            .value("F4", 201.26)
            .formula("F8", "=F4*1.1")
            .formula("F9", "=F8*1.1")
            .formula_with_value("F10", "=Gone!A1", "#REF!");
        wb
    }

    fn model() -> SpreadsheetModel {
        ModelBuilder::new(AuditConfig::default().builder)
            .build(&workbook())
            .unwrap()
    }

    #[test]
    fn test_failing_detector_marks_report_partial() {
        let engine = RiskEngine::new().with_detector(Box::new(Broken));
        let report = engine.analyze(&model(), &AuditConfig::default(), None);
        assert!(report.partial);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].detector, "broken");
        assert!(report.of_kind(RiskKind::FormulaError).count() == 1);
    }

    #[test]
    fn test_sequential_and_parallel_agree() {
        let model = model();
        let parallel = AuditConfig::default();
        let sequential = AuditConfig::builder().parallel(false).build();
        let a = RiskEngine::new().analyze(&model, &parallel, None);
        let b = RiskEngine::new().analyze(&model, &sequential, None);
        assert_eq!(a.alerts, b.alerts);
        assert_eq!(a.health_score, b.health_score);
    }

    #[test]
    fn test_report_is_ordered_and_scored() {
        let report = RiskEngine::new().analyze(&model(), &AuditConfig::default(), None);
        assert_eq!(report.alerts[0].kind, RiskKind::FormulaError);
        let severities: Vec<Severity> = report.alerts.iter().map(|a| a.severity).collect();
        let mut sorted = severities.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(severities, sorted);

        let hardcode = report.of_kind(RiskKind::HiddenHardcode).next().unwrap();
        assert_eq!(hardcode.location, "F8, F9");
        // F8 feeds F9; union of downstream cells
        assert_eq!(hardcode.impact_count, 1);
        assert!(report.health_score < 100);
    }

    #[test]
    fn test_disabled_detectors_do_not_run() {
        let config = AuditConfig::builder()
            .enabled_detectors(vec![RiskKind::FormulaError])
            .build();
        let report = RiskEngine::new().analyze(&model(), &config, None);
        assert!(report.alerts.iter().all(|a| a.kind == RiskKind::FormulaError));
        assert_eq!(report.triage_counts.fatal_error, 1);
    }
}
