//! Structural change computer implementation.

use crate::diff::matching::RowMapping;
use crate::diff::result::{ChangeCategory, ChangeKind, ChangeSeverity};
use crate::diff::traits::{ChangeComputer, DiffSide, StructuralChangeSet};
use crate::diff::RowMap;

/// Computes added and removed sheets, and rows added or deleted on keyed
/// sheets.
///
/// Row changes come from the row mappings handed over at construction, since
/// the [`RowMap`] only keeps matched pairs.
#[derive(Debug, Clone, Default)]
pub struct StructuralChangeComputer {
    mappings: Vec<RowMapping>,
}

impl StructuralChangeComputer {
    #[must_use]
    pub fn new(mappings: &[RowMapping]) -> Self {
        Self {
            mappings: mappings.to_vec(),
        }
    }
}

fn structural(severity: ChangeSeverity, sheet: &str, location: String, description: String) -> ChangeCategory {
    ChangeCategory {
        kind: ChangeKind::Structural,
        severity,
        sheet: sheet.to_string(),
        location,
        old_value: None,
        new_value: None,
        description,
    }
}

impl ChangeComputer for StructuralChangeComputer {
    type ChangeSet = StructuralChangeSet;

    fn compute(&self, old: &DiffSide<'_>, new: &DiffSide<'_>, _rows: &RowMap) -> StructuralChangeSet {
        let mut changes = StructuralChangeSet::new();

        for sheet in new.model.sheet_names().filter(|s| !old.model.has_sheet(s)) {
            changes.sheets_added.push(structural(
                ChangeSeverity::Info,
                sheet,
                sheet.to_string(),
                format!("Sheet '{sheet}' added"),
            ));
        }
        for sheet in old.model.sheet_names().filter(|s| !new.model.has_sheet(s)) {
            changes.sheets_removed.push(structural(
                ChangeSeverity::Warning,
                sheet,
                sheet.to_string(),
                format!("Sheet '{sheet}' removed"),
            ));
        }

        for mapping in &self.mappings {
            match (mapping.old_row, mapping.new_row) {
                (None, Some(row)) => changes.rows_added.push(structural(
                    ChangeSeverity::Info,
                    &mapping.sheet,
                    format!("Row {row}"),
                    format!("Row '{}' added at row {row}", mapping.key),
                )),
                (Some(row), None) => changes.rows_deleted.push(structural(
                    ChangeSeverity::Info,
                    &mapping.sheet,
                    format!("Row {row}"),
                    format!("Row '{}' removed from row {row}", mapping.key),
                )),
                _ => {}
            }
        }
        changes
    }

    fn name(&self) -> &'static str {
        "structure"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ModelBuilder;
    use crate::config::BuilderConfig;
    use crate::diff::keys::{normalize_key, RowKey};
    use crate::diff::match_rows;
    use crate::model::Workbook;
    use crate::risk::RiskReport;

    fn key(row: u32, text: &str) -> RowKey {
        RowKey {
            row,
            display: text.to_string(),
            normalized: normalize_key(text),
        }
    }

    #[test]
    fn test_sheets_and_rows() {
        let mut old = Workbook::new();
        old.add_sheet("Plan").value("A1", 1.0);
        old.add_sheet("Scratch").value("A1", 1.0);
        let mut new = Workbook::new();
        new.add_sheet("Plan").value("A1", 1.0);
        new.add_sheet("Inputs").value("A1", 1.0);
        let builder = ModelBuilder::new(BuilderConfig::default());
        let (old, new) = (builder.build(&old).unwrap(), builder.build(&new).unwrap());
        let report = RiskReport::default();

        let mappings = match_rows(
            "Plan",
            &[key(2, "X"), key(3, "Y")],
            &[key(2, "X"), key(3, "W")],
            None,
        );
        let changes = StructuralChangeComputer::new(&mappings).compute(
            &DiffSide::new(&old, &report),
            &DiffSide::new(&new, &report),
            &RowMap::new(),
        );
        assert_eq!(changes.sheets_added[0].sheet, "Inputs");
        assert_eq!(changes.sheets_removed[0].sheet, "Scratch");
        assert_eq!(changes.sheets_removed[0].severity, ChangeSeverity::Warning);
        assert_eq!(changes.rows_added[0].location, "Row 3");
        assert!(changes.rows_deleted[0].description.contains("'Y'"));
        assert_eq!(changes.total(), 4);
    }
}
