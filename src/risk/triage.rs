//! Business-impact triage and health scoring.
//!
//! Triage sorts alerts into three tiers: fatal errors, integrity risks and
//! structural debt. It then scores each one as
//! `category weight × impact × error probability`. The health score folds
//! every alert into a single 30-100 number.

use super::alert::{RiskAlert, RiskCategory, RiskDetails, RiskKind, Severity};
use super::labeling::is_fallback_label;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Starting health score.
const HEALTH_MAX: f64 = 100.0;
/// The health score never drops below this.
const HEALTH_FLOOR: f64 = 30.0;

/// Severity implied by a quantitative risk score.
#[must_use]
pub fn severity_for_score(score: f64) -> Severity {
    if score >= 50.0 {
        Severity::Critical
    } else if score >= 20.0 {
        Severity::High
    } else if score >= 5.0 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Row labels whose hidden hardcodes carry more than one distinct literal.
fn inconsistent_labels(alerts: &[RiskAlert]) -> HashSet<String> {
    let mut values: HashMap<&str, HashSet<&str>> = HashMap::new();
    for alert in alerts {
        let (RiskKind::HiddenHardcode, RiskDetails::HiddenHardcode { value, .. }) =
            (&alert.kind, &alert.details)
        else {
            continue;
        };
        let Some(label) = alert.row_label.as_deref() else {
            continue;
        };
        if is_fallback_label(label) {
            continue;
        }
        values.entry(label).or_default().insert(value.as_str());
    }
    values
        .into_iter()
        .filter(|(_, v)| v.len() > 1)
        .map(|(label, _)| label.to_string())
        .collect()
}

/// Category of a single alert, given the set of inconsistent hardcode labels.
fn category_of(alert: &RiskAlert, inconsistent: &HashSet<String>) -> (RiskKind, RiskCategory) {
    match alert.kind {
        RiskKind::CircularReference | RiskKind::ExternalLink | RiskKind::FormulaError => {
            (alert.kind, RiskCategory::FatalError)
        }
        RiskKind::InconsistentFormula if alert.impact_count == 0 => {
            (alert.kind, RiskCategory::StructuralDebt)
        }
        RiskKind::InconsistentFormula | RiskKind::ValueConflict | RiskKind::InconsistentValue => {
            (alert.kind, RiskCategory::IntegrityRisk)
        }
        RiskKind::HiddenHardcode
            if alert
                .row_label
                .as_ref()
                .is_some_and(|label| inconsistent.contains(label)) =>
        {
            (RiskKind::InconsistentValue, RiskCategory::IntegrityRisk)
        }
        RiskKind::HiddenHardcode | RiskKind::MergedCellRisk | RiskKind::CrossSheetFanOut => {
            (alert.kind, RiskCategory::StructuralDebt)
        }
    }
}

fn error_probability(alert: &RiskAlert) -> f64 {
    match &alert.details {
        RiskDetails::InconsistentFormula { likelihood, .. } => likelihood.error_probability(),
        _ => 1.0,
    }
}

/// Assign category, risk score and triage severity to every alert.
///
/// Hidden hardcodes whose labelled peers disagree are re-kinded as
/// [`RiskKind::InconsistentValue`]. Labels must already be resolved.
pub fn triage(alerts: &mut [RiskAlert]) {
    let inconsistent = inconsistent_labels(alerts);
    for alert in alerts.iter_mut() {
        let (kind, category) = category_of(alert, &inconsistent);
        alert.kind = kind;
        alert.category = Some(category);

        let raw = category.weight() * alert.impact_count as f64 * error_probability(alert);
        alert.risk_score = (raw * 10.0).round() / 10.0;
        alert.triage_severity = Some(severity_for_score(alert.risk_score));
    }
}

/// Aggregate health score (30-100). Uncategorized alerts count as structural debt.
#[must_use]
pub fn health_score(alerts: &[RiskAlert]) -> u32 {
    let penalty: f64 = alerts
        .iter()
        .map(|a| {
            let category = a.category.unwrap_or(RiskCategory::StructuralDebt);
            a.severity.penalty() * category.health_multiplier()
        })
        .sum();
    (HEALTH_MAX - penalty).max(HEALTH_FLOOR) as u32
}

/// Alerts per triage tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageCounts {
    pub fatal_error: usize,
    pub integrity_risk: usize,
    pub structural_debt: usize,
}

impl TriageCounts {
    #[must_use]
    pub fn from_alerts(alerts: &[RiskAlert]) -> Self {
        let mut counts = Self::default();
        for alert in alerts {
            match alert.category {
                Some(RiskCategory::FatalError) => counts.fatal_error += 1,
                Some(RiskCategory::IntegrityRisk) => counts.integrity_risk += 1,
                Some(RiskCategory::StructuralDebt) | None => counts.structural_debt += 1,
            }
        }
        counts
    }

    #[must_use]
    pub const fn total(&self) -> usize {
        self.fatal_error + self.integrity_risk + self.structural_debt
    }

    #[must_use]
    pub const fn get(&self, category: RiskCategory) -> usize {
        match category {
            RiskCategory::FatalError => self.fatal_error,
            RiskCategory::IntegrityRisk => self.integrity_risk,
            RiskCategory::StructuralDebt => self.structural_debt,
        }
    }
}

/// Which alerts a reviewer has already looked at, by [`RiskAlert::id`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewState {
    reviewed: HashSet<String>,
}

impl ReviewState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an alert reviewed. Returns false if it already was.
    pub fn mark_reviewed(&mut self, alert: &RiskAlert) -> bool {
        self.reviewed.insert(alert.id())
    }

    /// Clear the reviewed mark. Returns false if it was not set.
    pub fn unmark(&mut self, alert: &RiskAlert) -> bool {
        self.reviewed.remove(&alert.id())
    }

    #[must_use]
    pub fn is_reviewed(&self, alert: &RiskAlert) -> bool {
        self.reviewed.contains(&alert.id())
    }

    /// Progress over `alerts`. The current score only counts unreviewed alerts.
    #[must_use]
    pub fn progress(&self, alerts: &[RiskAlert]) -> ReviewProgress {
        let unreviewed: Vec<RiskAlert> = alerts
            .iter()
            .filter(|a| !self.is_reviewed(a))
            .cloned()
            .collect();
        let total = alerts.len();
        let reviewed = total - unreviewed.len();
        let initial_score = health_score(alerts);
        let current_score = health_score(&unreviewed);
        ReviewProgress {
            total,
            reviewed,
            unreviewed: unreviewed.len(),
            percentage: if total == 0 {
                100.0
            } else {
                reviewed as f64 / total as f64 * 100.0
            },
            initial_score,
            current_score,
            improvement: i64::from(current_score) - i64::from(initial_score),
        }
    }
}

/// Snapshot of review progress.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReviewProgress {
    pub total: usize,
    pub reviewed: usize,
    pub unreviewed: usize,
    pub percentage: f64,
    pub initial_score: u32,
    pub current_score: u32,
    pub improvement: i64,
}
