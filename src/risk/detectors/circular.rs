use super::{DetectionContext, Detector};
use crate::error::Result;
use crate::model::CellKey;
use crate::risk::alert::{RiskAlert, RiskDetails, RiskKind, Severity};

/// Cells named in a cycle description before it is abbreviated.
const SHOWN_CYCLE_CELLS: usize = 5;

/// Simple cycles in the dependency graph.
///
/// One Critical alert per cycle up to the configured cap, plus a single
/// workbook-wide summary when more cycles exist.
#[derive(Debug, Clone, Copy, Default)]
pub struct CircularReferenceDetector;

fn describe_cycle(cycle: &[CellKey]) -> String {
    let home = cycle.first().map(|k| k.sheet.as_str()).unwrap_or_default();
    let mut text = cycle
        .iter()
        .take(SHOWN_CYCLE_CELLS)
        .map(|k| {
            if k.sheet == home {
                k.address.to_string()
            } else {
                k.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" → ");
    if cycle.len() > SHOWN_CYCLE_CELLS {
        text.push_str(&format!(" ... ({} cells total)", cycle.len()));
    }
    text
}

impl Detector for CircularReferenceDetector {
    fn name(&self) -> &str {
        "circular-reference"
    }

    fn kind(&self) -> RiskKind {
        RiskKind::CircularReference
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vec<RiskAlert>> {
        let report = ctx.model.graph.simple_cycles(ctx.config.max_reported_cycles);

        let mut alerts: Vec<RiskAlert> = report
            .cycles
            .iter()
            .filter_map(|cycle| {
                let first = cycle.first()?;
                Some(RiskAlert::new(
                    RiskKind::CircularReference,
                    Severity::Critical,
                    &first.sheet,
                    first.address,
                    format!("Circular reference detected: {}", describe_cycle(cycle)),
                    RiskDetails::CircularReference {
                        cycle: cycle.iter().map(ToString::to_string).collect(),
                    },
                ))
            })
            .collect();

        if report.is_truncated() {
            let shown = report.cycles.len();
            let total = if report.exhaustive {
                report.total.to_string()
            } else {
                format!("{}+", report.total)
            };
            tracing::warn!(
                cycles = report.total,
                reported = shown,
                exhaustive = report.exhaustive,
                "circular references truncated"
            );
            alerts.push(RiskAlert::workbook_wide(
                RiskKind::CircularReference,
                Severity::Critical,
                format!("{total} circular references detected (showing first {shown})"),
                RiskDetails::CircularSummary {
                    total: report.total,
                    reported: shown,
                    exhaustive: report.exhaustive,
                },
            ));
        }
        Ok(alerts)
    }
}
