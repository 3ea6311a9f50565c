use super::{DetectionContext, Detector};
use crate::error::Result;
use crate::risk::alert::{RiskAlert, RiskDetails, RiskKind, Severity};

/// Formulas pulling from more distinct sheets than the configured fan-out.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossSheetFanOutDetector;

impl Detector for CrossSheetFanOutDetector {
    fn name(&self) -> &str {
        "cross-sheet-fanout"
    }

    fn kind(&self) -> RiskKind {
        RiskKind::CrossSheetFanOut
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vec<RiskAlert>> {
        let mut alerts = Vec::new();
        for (cell, formula) in ctx.formula_cells() {
            let mut sheets: Vec<String> = Vec::new();
            for reference in cell.references.iter().filter(|r| !r.is_external()) {
                let target = reference.target_sheet(cell.sheet());
                if target != cell.sheet() && !sheets.iter().any(|s| s == target) {
                    sheets.push(target.to_string());
                }
            }
            if sheets.len() <= ctx.config.cross_sheet_fanout {
                continue;
            }
            alerts.push(RiskAlert::new(
                RiskKind::CrossSheetFanOut,
                Severity::Low,
                cell.sheet(),
                cell.address(),
                format!(
                    "Formula reads {} other sheets: {}",
                    sheets.len(),
                    sheets.join(", ")
                ),
                RiskDetails::CrossSheetFanOut {
                    formula: formula.to_string(),
                    sheets,
                },
            ));
        }
        Ok(alerts)
    }
}
