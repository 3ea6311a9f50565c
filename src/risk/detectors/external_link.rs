use super::{DetectionContext, Detector};
use crate::error::Result;
use crate::risk::alert::{RiskAlert, RiskDetails, RiskKind, Severity};
use regex::Regex;
use std::sync::LazyLock;

static WORKBOOK_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]").expect("static regex"));

/// Formulas reading another workbook (`='[Budget.xlsx]Sheet1'!A5`).
///
/// Plain cross-sheet references are not external.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExternalLinkDetector;

impl Detector for ExternalLinkDetector {
    fn name(&self) -> &str {
        "external-link"
    }

    fn kind(&self) -> RiskKind {
        RiskKind::ExternalLink
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vec<RiskAlert>> {
        let mut alerts = Vec::new();
        for (cell, formula) in ctx.formula_cells() {
            let mut files: Vec<String> = Vec::new();
            for name in cell
                .references
                .iter()
                .filter_map(|r| r.workbook.clone())
                .chain(
                    WORKBOOK_NAME
                        .captures_iter(formula)
                        .map(|c| c[1].to_string()),
                )
            {
                if !files.contains(&name) {
                    files.push(name);
                }
            }
            if files.is_empty() {
                continue;
            }
            alerts.push(RiskAlert::new(
                RiskKind::ExternalLink,
                Severity::Medium,
                cell.sheet(),
                cell.address(),
                format!("Formula references external file: {}", files.join(", ")),
                RiskDetails::ExternalLink {
                    formula: formula.to_string(),
                    files,
                },
            ));
        }
        Ok(alerts)
    }
}
