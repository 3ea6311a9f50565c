//! Risk change computer implementation.

use crate::diff::result::{ChangeCategory, ChangeKind, ChangeSeverity};
use crate::diff::traits::{ChangeComputer, DiffSide, RiskChangeSet};
use crate::diff::RowMap;
use crate::model::CellAddress;
use crate::risk::RiskAlert;
use indexmap::IndexMap;

/// Computes risks that disappeared (improvements) or appeared (regressions).
///
/// Alerts are identified by `kind|sheet|anchor`. Old anchors are moved to
/// their new row through the row mapping first, so a risk that only moved
/// with its row is neither resolved nor introduced.
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskChangeComputer;

impl RiskChangeComputer {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn signature(alert: &RiskAlert, anchor: Option<CellAddress>) -> String {
    match (alert.anchor(), anchor) {
        (None, _) => format!("{:?}|{}|{}", alert.kind, alert.sheet, alert.location),
        (Some(_), Some(at)) => format!("{:?}|{}|{at}", alert.kind, alert.sheet),
        // row did not survive; never equal to a new-side signature
        (Some(at), None) => format!("{:?}|{}|gone:{at}", alert.kind, alert.sheet),
    }
}

fn translated(alert: &RiskAlert, rows: &RowMap) -> Option<CellAddress> {
    let anchor = alert.anchor()?;
    rows.translate(&alert.sheet, anchor.row)
        .map(|row| CellAddress::new(row, anchor.col))
}

fn change(alert: &RiskAlert, severity: ChangeSeverity, verb: &str) -> ChangeCategory {
    ChangeCategory {
        kind: ChangeKind::Risk,
        severity,
        sheet: alert.sheet.clone(),
        location: alert.location.clone(),
        old_value: None,
        new_value: None,
        description: format!("{} {verb} at {}: {}", alert.kind, alert.qualified_location(), alert.description),
    }
}

impl ChangeComputer for RiskChangeComputer {
    type ChangeSet = RiskChangeSet;

    fn compute(&self, old: &DiffSide<'_>, new: &DiffSide<'_>, rows: &RowMap) -> RiskChangeSet {
        let old_alerts: IndexMap<String, &RiskAlert> = old
            .report
            .alerts
            .iter()
            .map(|a| (signature(a, translated(a, rows)), a))
            .collect();
        let new_alerts: IndexMap<String, &RiskAlert> = new
            .report
            .alerts
            .iter()
            .map(|a| (signature(a, a.anchor()), a))
            .collect();

        let mut changes = RiskChangeSet::new();
        for (sig, alert) in &old_alerts {
            if !new_alerts.contains_key(sig) {
                let mut resolved = change(alert, ChangeSeverity::Info, "resolved");
                resolved.old_value = Some(alert.severity.to_string());
                changes.resolved.push(resolved);
            }
        }
        for (sig, alert) in &new_alerts {
            if !old_alerts.contains_key(sig) {
                let mut introduced = change(alert, ChangeSeverity::Warning, "introduced");
                introduced.new_value = Some(alert.severity.to_string());
                changes.introduced.push(introduced);
            }
        }
        changes
    }

    fn name(&self) -> &'static str {
        "risks"
    }
}
