use super::{DetectionContext, Detector};
use crate::error::Result;
use crate::model::describe_error;
use crate::risk::alert::{RiskAlert, RiskDetails, RiskKind, Severity};

/// Cells showing an error sentinel such as `#REF!` or `#DIV/0!`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormulaErrorDetector;

impl Detector for FormulaErrorDetector {
    fn name(&self) -> &str {
        "formula-error"
    }

    fn kind(&self) -> RiskKind {
        RiskKind::FormulaError
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vec<RiskAlert>> {
        let alerts = ctx
            .model
            .real_cells()
            .filter_map(|cell| {
                let code = cell.value.error_code()?;
                let description = describe_error(code);
                Some(RiskAlert::new(
                    RiskKind::FormulaError,
                    Severity::Critical,
                    cell.sheet(),
                    cell.address(),
                    format!("{code}: {description}"),
                    RiskDetails::FormulaError {
                        code: code.to_string(),
                        description: description.to_string(),
                        formula: cell.formula.clone(),
                    },
                ))
            })
            .collect();
        Ok(alerts)
    }
}
