//! Version diff engine implementation.

use super::changes::{CellChangeComputer, RiskChangeComputer, StructuralChangeComputer};
use super::keys::{parse_key_columns, row_keys, KeyUniqueness, KeyUniquenessWarning, Version};
use super::matching::{match_rows, RowMap, RowMapping};
use super::result::{ChangeCategory, DiffResult};
use super::traits::{ChangeComputer, DiffSide};
use crate::config::MatchingConfig;
use crate::error::{AuditError, MatchingErrorKind, Result};
use std::time::Instant;

/// Compares two analyzed versions of a workbook.
///
/// Rows of sheets with configured key columns are matched by composite key;
/// every other sheet present in both versions is compared in place.
#[derive(Debug, Clone, Default)]
pub struct DiffEngine {
    config: MatchingConfig,
}

impl DiffEngine {
    #[must_use]
    pub const fn new(config: MatchingConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &MatchingConfig {
        &self.config
    }

    fn validate(&self) -> Result<()> {
        let thresholds = [Some(self.config.min_uniqueness), self.config.fuzzy_threshold];
        if let Some(bad) = thresholds
            .into_iter()
            .flatten()
            .find(|t| !(0.0..=1.0).contains(t))
        {
            return Err(AuditError::matching(
                "validating matching settings",
                MatchingErrorKind::InvalidThreshold(bad),
            ));
        }
        if let Some((sheet, _)) = self.config.key_columns.iter().find(|(_, cols)| cols.is_empty()) {
            return Err(AuditError::matching(
                "validating matching settings",
                MatchingErrorKind::NoKeyColumns(sheet.clone()),
            ));
        }
        Ok(())
    }

    fn uniqueness_warning(
        &self,
        sheet: &str,
        version: Version,
        keys: &[super::keys::RowKey],
    ) -> Option<KeyUniquenessWarning> {
        let uniqueness = KeyUniqueness::measure(keys, self.config.max_duplicate_samples);
        (uniqueness.uniqueness < self.config.min_uniqueness).then(|| KeyUniquenessWarning {
            sheet: sheet.to_string(),
            version,
            uniqueness,
        })
    }

    /// Match rows of every sheet, collecting uniqueness warnings.
    fn map_rows(
        &self,
        old: &DiffSide<'_>,
        new: &DiffSide<'_>,
        warnings: &mut Vec<KeyUniquenessWarning>,
    ) -> Result<(RowMap, Vec<RowMapping>)> {
        let mut rows = RowMap::new();
        let mut mappings = Vec::new();

        for (sheet, columns) in &self.config.key_columns {
            let (in_old, in_new) = (old.model.has_sheet(sheet), new.model.has_sheet(sheet));
            if !in_old && !in_new {
                return Err(AuditError::matching(
                    "building row keys",
                    MatchingErrorKind::UnknownSheet(sheet.clone()),
                ));
            }
            let columns = parse_key_columns(columns)?;
            let old_keys = row_keys(old.model, sheet, &columns);
            let new_keys = row_keys(new.model, sheet, &columns);
            warnings.extend(self.uniqueness_warning(sheet, Version::Old, &old_keys));
            warnings.extend(self.uniqueness_warning(sheet, Version::New, &new_keys));

            let sheet_mappings = match_rows(sheet, &old_keys, &new_keys, self.config.fuzzy_threshold);
            tracing::debug!(
                sheet = %sheet,
                old_rows = old_keys.len(),
                new_rows = new_keys.len(),
                matched = sheet_mappings.iter().filter(|m| m.is_matched()).count(),
                "rows matched"
            );
            rows.insert_keyed(sheet, &sheet_mappings);
            mappings.extend(sheet_mappings);
        }

        for sheet in new.model.sheet_names() {
            if !rows.is_keyed(sheet) && old.model.has_sheet(sheet) {
                rows.insert_identity(sheet);
            }
        }
        Ok((rows, mappings))
    }

    /// Compare `old` against `new`.
    ///
    /// # Errors
    ///
    /// Fails when the matching settings are invalid, a key column is not a
    /// column letter, or a keyed sheet exists in neither version. Non-unique
    /// keys are reported as warnings on the result, not as errors.
    pub fn compare(&self, old: &DiffSide<'_>, new: &DiffSide<'_>) -> Result<DiffResult> {
        let start = Instant::now();
        self.validate()?;

        let mut result = DiffResult::new(old.report.health_score, new.report.health_score);
        let (rows, mappings) = self.map_rows(old, new, &mut result.warnings)?;
        for warning in &result.warnings {
            tracing::warn!(sheet = %warning.sheet, version = %warning.version, "{warning}");
        }

        let cells = CellChangeComputer::new().compute(old, new, &rows);
        let risks = RiskChangeComputer::new().compute(old, new, &rows);
        let structure = StructuralChangeComputer::new(&mappings).compute(old, new, &rows);

        let mut changes: Vec<ChangeCategory> =
            Vec::with_capacity(cells.total() + risks.total() + structure.total());
        changes.extend(cells.logic);
        changes.extend(cells.input);
        changes.extend(risks.introduced);
        changes.extend(risks.resolved);
        changes.extend(structure.sheets_removed);
        changes.extend(structure.sheets_added);
        changes.extend(structure.rows_deleted);
        changes.extend(structure.rows_added);
        // stable: keeps computer order within a severity
        changes.sort_by(|a, b| b.severity.cmp(&a.severity));

        result.changes = changes;
        result.row_mappings = mappings;
        result.calculate_summary();

        tracing::info!(
            changes = result.summary.total_changes,
            logic = result.summary.logic_changes,
            inputs = result.summary.input_updates,
            score_delta = result.score_delta,
            warnings = result.warnings.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "diff complete"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ModelBuilder;
    use crate::config::BuilderConfig;
    use crate::diff::ChangeKind;
    use crate::model::{SpreadsheetModel, Workbook};
    use crate::risk::RiskReport;
    use indexmap::IndexMap;

    fn build(wb: &Workbook) -> SpreadsheetModel {
        ModelBuilder::new(BuilderConfig::default()).build(wb).unwrap()
    }

    fn keyed(sheet: &str, cols: &[&str]) -> MatchingConfig {
        let mut key_columns = IndexMap::new();
        key_columns.insert(sheet.to_string(), cols.iter().map(|c| (*c).to_string()).collect());
        MatchingConfig {
            key_columns,
            ..MatchingConfig::default()
        }
    }

    #[test]
    fn test_unknown_sheet_is_rejected() {
        let model = SpreadsheetModel::default();
        let report = RiskReport::default();
        let side = DiffSide::new(&model, &report);
        let err = DiffEngine::new(keyed("Nowhere", &["A"]))
            .compare(&side, &side)
            .unwrap_err();
        assert!(matches!(
            err,
            AuditError::Matching {
                source: MatchingErrorKind::UnknownSheet(ref sheet),
                ..
            } if sheet == "Nowhere"
        ));
    }

    #[test]
    fn test_invalid_threshold_is_rejected() {
        let model = SpreadsheetModel::default();
        let report = RiskReport::default();
        let side = DiffSide::new(&model, &report);
        let config = MatchingConfig {
            fuzzy_threshold: Some(1.5),
            ..MatchingConfig::default()
        };
        assert!(DiffEngine::new(config).compare(&side, &side).is_err());
    }

    #[test]
    fn test_duplicate_keys_warn() {
        let mut wb = Workbook::new();
        wb.add_sheet("Plan")
            .value("A2", "Sales")
            .value("A3", "Sales")
            .value("A4", "Rent");
        let model = build(&wb);
        let report = RiskReport::default();
        let side = DiffSide::new(&model, &report);
        let result = DiffEngine::new(keyed("Plan", &["A"])).compare(&side, &side).unwrap();
        assert_eq!(result.warnings.len(), 2);
        assert_eq!(result.warnings[0].uniqueness.duplicates, vec!["sales"]);
        // the repeated row stays unmatched on both sides
        assert_eq!(result.summary.rows_matched, 2);
    }

    #[test]
    fn test_changes_sorted_by_severity() {
        let mut old = Workbook::new();
        old.add_sheet("Plan").value("A1", 1.0).formula("B1", "=A1*2");
        let mut new = Workbook::new();
        new.add_sheet("Plan").value("A1", 2.0).formula("B1", "=A1*3");
        new.add_sheet("Notes").value("A1", "hello");
        let (old, new) = (build(&old), build(&new));
        let (old_report, new_report) = (
            RiskReport {
                health_score: 90,
                ..RiskReport::default()
            },
            RiskReport::default(),
        );
        let result = DiffEngine::default()
            .compare(&DiffSide::new(&old, &old_report), &DiffSide::new(&new, &new_report))
            .unwrap();
        let kinds: Vec<ChangeKind> = result.changes.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![ChangeKind::Logic, ChangeKind::Input, ChangeKind::Structural]);
        assert_eq!(result.score_delta, 10);
        assert!(result.is_improved());
    }
}
