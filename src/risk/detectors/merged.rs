use super::{DetectionContext, Detector};
use crate::error::Result;
use crate::risk::alert::{RiskAlert, RiskDetails, RiskKind, Severity};

/// Formula ranges that touch a merged region.
///
/// Aggregates over a merged block count the anchor's value once per virtual
/// coordinate in the reading tool but once in the spreadsheet, so results
/// silently diverge when the layout changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergedCellDetector;

impl Detector for MergedCellDetector {
    fn name(&self) -> &str {
        "merged-cell"
    }

    fn kind(&self) -> RiskKind {
        RiskKind::MergedCellRisk
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vec<RiskAlert>> {
        let mut alerts = Vec::new();
        for (cell, formula) in ctx.formula_cells() {
            let mut ranges = Vec::new();
            let mut regions = Vec::new();
            for reference in cell
                .references
                .iter()
                .filter(|r| r.is_range() && !r.is_external())
            {
                let target = reference.target_sheet(cell.sheet());
                let range = reference.range();
                let touched: Vec<String> = ctx
                    .model
                    .merged_regions(target)
                    .iter()
                    .filter(|region| region.overlaps(&range))
                    .map(ToString::to_string)
                    .collect();
                if touched.is_empty() {
                    continue;
                }
                ranges.push(reference.text.clone());
                for region in touched {
                    if !regions.contains(&region) {
                        regions.push(region);
                    }
                }
            }
            if ranges.is_empty() {
                continue;
            }
            alerts.push(RiskAlert::new(
                RiskKind::MergedCellRisk,
                Severity::Medium,
                cell.sheet(),
                cell.address(),
                format!(
                    "Formula range {} overlaps merged region {}",
                    ranges.join(", "),
                    regions.join(", ")
                ),
                RiskDetails::MergedCellRisk {
                    formula: formula.to_string(),
                    ranges,
                    merged_regions: regions,
                },
            ));
        }
        Ok(alerts)
    }
}
