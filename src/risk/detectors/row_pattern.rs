use super::{require_ratio, DetectionContext, Detector};
use crate::builder::relative_pattern;
use crate::error::Result;
use crate::model::Cell;
use crate::risk::alert::{Likelihood, RiskAlert, RiskDetails, RiskKind, Severity};
use indexmap::IndexMap;

/// Formulas that break their row's relative-reference pattern.
///
/// Catches drag-fill mistakes: `=B5*C5` copied across a row renders as
/// `RC[-3]*RC[-2]` everywhere except the one cell someone retyped.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowPatternDetector;

impl Detector for RowPatternDetector {
    fn name(&self) -> &str {
        "row-pattern"
    }

    fn kind(&self) -> RiskKind {
        RiskKind::InconsistentFormula
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vec<RiskAlert>> {
        let config = ctx.config;
        require_ratio(self.name(), "row_pattern_majority", config.row_pattern_majority)?;

        let index = &ctx.model.index;
        let mut alerts = Vec::new();
        for sheet in ctx.model.sheet_names() {
            for row in index.rows_of(sheet) {
                let cells: Vec<(&Cell, &str)> = index
                    .row(sheet, row)
                    .filter(|c| !c.is_virtual())
                    .filter_map(|c| c.formula.as_deref().map(|f| (c, f)))
                    .collect();
                let total = cells.len();
                if total < config.row_pattern_min_cells.max(2) {
                    continue;
                }

                let mut patterns: IndexMap<String, Vec<(&Cell, &str)>> = IndexMap::new();
                for (cell, formula) in cells {
                    patterns
                        .entry(relative_pattern(formula, cell.address()))
                        .or_default()
                        .push((cell, formula));
                }
                if patterns.len() < 2 {
                    continue;
                }

                // first-seen pattern wins ties
                let Some((dominant, consistent)) = patterns
                    .iter()
                    .map(|(p, members)| (p.clone(), members.len()))
                    .reduce(|best, next| if next.1 > best.1 { next } else { best })
                else {
                    continue;
                };
                if (consistent as f64) < total as f64 * config.row_pattern_majority {
                    continue;
                }

                let disagreeing = total - consistent;
                let percentage = (disagreeing as f64 / total as f64 * 100.0).round();
                let (severity, likelihood, description) =
                    if disagreeing >= config.row_pattern_high_threshold {
                        (
                            Severity::High,
                            Likelihood::LikelyError,
                            format!(
                                "{disagreeing} of {total} formulas in this row ({percentage:.0}%) \
                                 break the pattern shared by the other {consistent} cells"
                            ),
                        )
                    } else {
                        (
                            Severity::Low,
                            Likelihood::LikelyIntentional,
                            format!(
                                "Formula pattern differs from the other {consistent} cells in \
                                 this row; likely intentional, worth a check"
                            ),
                        )
                    };

                tracing::debug!(sheet, row, total, disagreeing, "row pattern break");
                for (pattern, members) in &patterns {
                    if *pattern == dominant {
                        continue;
                    }
                    for (cell, formula) in members {
                        alerts.push(RiskAlert::new(
                            RiskKind::InconsistentFormula,
                            severity,
                            sheet,
                            cell.address(),
                            description.clone(),
                            RiskDetails::InconsistentFormula {
                                formula: (*formula).to_string(),
                                pattern: pattern.clone(),
                                dominant_pattern: dominant.clone(),
                                row,
                                row_formula_cells: total,
                                disagreeing_cells: disagreeing,
                                likelihood,
                            },
                        ));
                    }
                }
            }
        }
        Ok(alerts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectionConfig;
    use crate::model::{column_to_letters, Workbook};
    use crate::risk::detectors::test_support::{build, run, run_with};

    /// Row 5 of 50 drag-filled `=<col>4*2` formulas with `broken` columns retyped.
    fn fifty_cell_row(broken: &[u32]) -> Workbook {
        let mut wb = Workbook::new();
        let sheet = wb.add_sheet("Plan");
        for col in 1..=50 {
            let letters = column_to_letters(col);
            sheet.value(&format!("{letters}4"), f64::from(col));
            let formula = if broken.contains(&col) {
                format!("={letters}3*2")
            } else {
                format!("={letters}4*2")
            };
            sheet.formula(&format!("{letters}5"), &formula);
        }
        wb
    }

    #[test]
    fn test_single_break_is_low() {
        let alerts = run(&RowPatternDetector, &build(&fifty_cell_row(&[17])));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].location, "Q5");
        assert_eq!(alerts[0].severity, Severity::Low);
        assert!(alerts[0].description.contains("other 49 cells"));
    }

    #[test]
    fn test_two_breaks_are_high_with_count() {
        let alerts = run(&RowPatternDetector, &build(&fifty_cell_row(&[10, 30])));
        assert_eq!(alerts.len(), 2);
        insta::allow_duplicates! {
            for alert in &alerts {
                assert_eq!(alert.severity, Severity::High);
                insta::assert_snapshot!(
                    alert.description,
                    @"2 of 50 formulas in this row (4%) break the pattern shared by the other 48 cells"
                );
            }
        }
    }

    #[test]
    fn test_no_dominant_pattern_is_silent() {
        let mut wb = Workbook::new();
        wb.add_sheet("Plan")
            .formula("B1", "=A1+1")
            .formula("C1", "=A1*3")
            .formula("D1", "=SUM(A2:A9)");
        assert!(run(&RowPatternDetector, &build(&wb)).is_empty());
    }

    #[test]
    fn test_short_rows_are_skipped() {
        let mut wb = Workbook::new();
        wb.add_sheet("Plan").formula("B1", "=A1+1").formula("C1", "=A2*3");
        assert!(run(&RowPatternDetector, &build(&wb)).is_empty());
    }

    #[test]
    fn test_invalid_majority_fails() {
        let config = DetectionConfig {
            row_pattern_majority: 0.0,
            ..DetectionConfig::default()
        };
        let labels =
            crate::risk::labeling::HeuristicLabeler::from_config(&Default::default());
        let model = build(&fifty_cell_row(&[]));
        let ctx = DetectionContext::new(&model, &config, &labels);
        assert!(RowPatternDetector.detect(&ctx).is_err());
        assert!(run_with(&RowPatternDetector, &model, &DetectionConfig::default()).is_empty());
    }
}
