use super::{require_ratio, DetectionContext, Detector};
use crate::error::Result;
use crate::model::{format_number, Cell};
use crate::risk::alert::{RiskAlert, RiskDetails, RiskKind, Severity};
use indexmap::IndexMap;

/// Typed-in values that disagree with the majority under the same row label.
///
/// `Tax rate: 0.3, 0.3, 0.3, 0.35, 0.3` means someone updated most cells and
/// missed one. Values compare at two decimal places.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueConflictDetector;

fn cents(value: f64) -> i64 {
    (value * 100.0).round() as i64
}

impl Detector for ValueConflictDetector {
    fn name(&self) -> &str {
        "value-conflict"
    }

    fn kind(&self) -> RiskKind {
        RiskKind::ValueConflict
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vec<RiskAlert>> {
        let config = ctx.config;
        require_ratio(self.name(), "value_conflict_majority", config.value_conflict_majority)?;

        let index = &ctx.model.index;
        let mut by_label: IndexMap<String, IndexMap<i64, Vec<&Cell>>> = IndexMap::new();
        for cell in ctx.model.real_cells() {
            let Some(value) = cell.input_number() else {
                continue;
            };
            let Some(label) = ctx.labels.row_label(index, cell.sheet(), cell.address()) else {
                continue;
            };
            by_label
                .entry(label)
                .or_default()
                .entry(cents(value))
                .or_default()
                .push(cell);
        }

        let mut alerts = Vec::new();
        for (label, values) in &by_label {
            let total: usize = values.values().map(Vec::len).sum();
            if values.len() < 2 || total < config.value_conflict_min_cells {
                continue;
            }
            let Some((&expected, consistent)) = values
                .iter()
                .map(|(v, cells)| (v, cells.len()))
                .reduce(|best, next| if next.1 > best.1 { next } else { best })
            else {
                continue;
            };
            if (consistent as f64) < total as f64 * config.value_conflict_majority {
                continue;
            }

            let expected_value = expected as f64 / 100.0;
            for (&key, cells) in values {
                if key == expected {
                    continue;
                }
                let value = key as f64 / 100.0;
                for cell in cells {
                    alerts.push(RiskAlert::new(
                        RiskKind::ValueConflict,
                        Severity::High,
                        cell.sheet(),
                        cell.address(),
                        format!(
                            "Value {} differs from {consistent} other cells with label '{label}' \
                             (expected {})",
                            format_number(value),
                            format_number(expected_value)
                        ),
                        RiskDetails::ValueConflict {
                            label: label.clone(),
                            value,
                            expected_value,
                            matching_cells: consistent,
                            total_cells: total,
                        },
                    ));
                }
            }
        }
        Ok(alerts)
    }
}
