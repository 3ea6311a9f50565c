use super::{DetectionContext, Detector};
use crate::builder::formula::{numeric_literals, tokenize};
use crate::error::Result;
use crate::model::format_number;
use crate::risk::alert::{RiskAlert, RiskDetails, RiskKind, Severity};

/// Numeric literals typed into formulas.
///
/// Allow-listed constants are ignored. A formula whose literals are all
/// universally common (0, 1, 12 by default) is Low; anything else is High.
#[derive(Debug, Clone, Copy, Default)]
pub struct HiddenHardcodeDetector;

impl Detector for HiddenHardcodeDetector {
    fn name(&self) -> &str {
        "hidden-hardcode"
    }

    fn kind(&self) -> RiskKind {
        RiskKind::HiddenHardcode
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vec<RiskAlert>> {
        let mut alerts = Vec::new();
        for (cell, formula) in ctx.formula_cells() {
            let literals: Vec<f64> = numeric_literals(&tokenize(formula))
                .into_iter()
                .filter(|v| !ctx.config.is_allowed(*v))
                .collect();
            let Some(&first) = literals.first() else {
                continue;
            };

            let uncommon = literals.iter().copied().find(|v| !ctx.config.is_common(*v));
            let (severity, shown) = match uncommon {
                Some(v) => (Severity::High, v),
                None => (Severity::Low, first),
            };
            let value = format_number(shown);
            alerts.push(RiskAlert::new(
                RiskKind::HiddenHardcode,
                severity,
                cell.sheet(),
                cell.address(),
                format!("Hardcoded value '{value}' in formula"),
                RiskDetails::HiddenHardcode {
                    formula: formula.to_string(),
                    value,
                    values: literals.iter().map(|v| format_number(*v)).collect(),
                },
            ));
        }
        Ok(alerts)
    }
}
