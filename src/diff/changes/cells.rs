//! Cell change computer implementation.

use crate::builder::{relative_pattern, tokenize, TokenKind};
use crate::diff::result::{ChangeCategory, ChangeKind, ChangeSeverity};
use crate::diff::traits::{CellChangeSet, ChangeComputer, DiffSide};
use crate::diff::RowMap;
use crate::model::{Cell, CellAddress, SpreadsheetModel};
use std::collections::BTreeSet;

/// Computes formula (logic) and typed-in value (input) changes.
///
/// Rows of keyed sheets are compared through the row mapping over the union
/// of their populated columns; other sheets present in both versions are
/// compared address by address. Virtual cells are skipped so an edit to a
/// merged anchor is reported once.
#[derive(Debug, Clone, Copy, Default)]
pub struct CellChangeComputer;

impl CellChangeComputer {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn real_cell<'m>(model: &'m SpreadsheetModel, sheet: &str, address: CellAddress) -> Option<&'m Cell> {
    model.cell(sheet, address).filter(|c| !c.is_virtual())
}

fn value_text(cell: Option<&Cell>) -> String {
    cell.map(|c| c.value.display_string()).unwrap_or_default()
}

fn columns(model: &SpreadsheetModel, sheet: &str, row: u32, into: &mut BTreeSet<u32>) {
    into.extend(
        model
            .index
            .row(sheet, row)
            .filter(|c| !c.is_virtual())
            .map(|c| c.key.address.col),
    );
}

/// Token kinds and text with every reference blanked out.
fn skeleton(formula: &str) -> Vec<(TokenKind, String)> {
    tokenize(formula)
        .into_iter()
        .map(|t| match t.kind {
            TokenKind::Reference => (t.kind, String::new()),
            kind => (kind, t.text),
        })
        .collect()
}

/// Every dependency of `old`, followed through the row mapping, lands on the
/// dependency of `new` in the same position. Rows the mapping does not track
/// are expected to move with the formula cell itself.
fn same_targets(old: &Cell, new: &Cell, rows: &RowMap) -> bool {
    let shift = i64::from(new.key.address.row) - i64::from(old.key.address.row);
    old.oversize_ranges == new.oversize_ranges
        && old.dependencies.len() == new.dependencies.len()
        && old.dependencies.iter().zip(&new.dependencies).all(|(before, after)| {
            before.sheet == after.sheet
                && before.address.col == after.address.col
                && match rows.translate(&before.sheet, before.address.row) {
                    Some(row) => row == after.address.row,
                    None => i64::from(after.address.row) - i64::from(before.address.row) == shift,
                }
        })
}

/// A formula whose references merely followed moved rows is not rewritten.
/// One whose relative form survived but whose references now land on other
/// rows is.
fn formula_rewritten(old: &Cell, before: &str, new: &Cell, after: &str, rows: &RowMap) -> bool {
    if before == after {
        return false;
    }
    if relative_pattern(before, old.address()) == relative_pattern(after, new.address()) {
        return !same_targets(old, new, rows);
    }
    skeleton(before) != skeleton(after) || !same_targets(old, new, rows)
}

/// An input update when the displayed values differ.
fn value_change(
    sheet: &str,
    location: CellAddress,
    old: Option<&Cell>,
    new: Option<&Cell>,
    calculated: bool,
) -> Option<ChangeCategory> {
    let (before, after) = (value_text(old), value_text(new));
    if before == after {
        return None;
    }
    let description = if calculated {
        format!("Value at {sheet}!{location} changed from '{before}' to '{after}' under an unchanged formula")
    } else {
        format!("Input at {sheet}!{location} changed from '{before}' to '{after}'")
    };
    Some(ChangeCategory {
        kind: ChangeKind::Input,
        severity: ChangeSeverity::Normal,
        sheet: sheet.to_string(),
        location: location.to_string(),
        description,
        old_value: old.map(|_| before),
        new_value: new.map(|_| after),
    })
}

fn compare_cells(
    sheet: &str,
    old_at: CellAddress,
    old: Option<&Cell>,
    new_at: CellAddress,
    new: Option<&Cell>,
    rows: &RowMap,
    changes: &mut CellChangeSet,
) {
    let old_formula = old.and_then(|c| c.formula.as_deref());
    let new_formula = new.and_then(|c| c.formula.as_deref());
    let location = if new.is_some() { new_at } else { old_at };

    let logic = |description: String, before: Option<&str>, after: Option<&str>| ChangeCategory {
        kind: ChangeKind::Logic,
        severity: ChangeSeverity::Critical,
        sheet: sheet.to_string(),
        location: location.to_string(),
        old_value: before.map(str::to_string),
        new_value: after.map(str::to_string),
        description,
    };

    match (old.zip(old_formula), new.zip(new_formula)) {
        (Some((old_cell, before)), Some((new_cell, after))) => {
            if formula_rewritten(old_cell, before, new_cell, after, rows) {
                changes.logic.push(logic(
                    format!("Formula changed at {sheet}!{location}: {before} → {after}"),
                    Some(before),
                    Some(after),
                ));
            } else {
                changes.input.extend(value_change(sheet, location, old, new, true));
            }
        }
        (Some((_, before)), None) => {
            let description = match new {
                Some(cell) => format!(
                    "Formula at {sheet}!{location} replaced by the value {}",
                    cell.value.display_string()
                ),
                None => format!("Formula removed at {sheet}!{location}"),
            };
            let after = new.map(|c| c.value.display_string());
            changes.logic.push(logic(description, Some(before), after.as_deref()));
        }
        (None, Some((_, after))) => {
            changes.logic.push(logic(
                format!("Formula added at {sheet}!{location}: {after}"),
                old.map(|c| c.value.display_string()).as_deref(),
                Some(after),
            ));
        }
        (None, None) => {
            changes.input.extend(value_change(sheet, location, old, new, false));
        }
    }
}

impl CellChangeComputer {
    fn compare_keyed(&self, sheet: &str, old: &SpreadsheetModel, new: &SpreadsheetModel, rows: &RowMap, changes: &mut CellChangeSet) {
        for (old_row, new_row) in rows.pairs(sheet) {
            let mut cols = BTreeSet::new();
            columns(old, sheet, old_row, &mut cols);
            columns(new, sheet, new_row, &mut cols);
            for col in cols {
                let (old_at, new_at) = (CellAddress::new(old_row, col), CellAddress::new(new_row, col));
                compare_cells(
                    sheet,
                    old_at,
                    real_cell(old, sheet, old_at),
                    new_at,
                    real_cell(new, sheet, new_at),
                    rows,
                    changes,
                );
            }
        }
    }

    fn compare_in_place(
        &self,
        sheet: &str,
        old: &SpreadsheetModel,
        new: &SpreadsheetModel,
        map: &RowMap,
        changes: &mut CellChangeSet,
    ) {
        let mut rows: BTreeSet<u32> = old.index.rows_of(sheet).collect();
        rows.extend(new.index.rows_of(sheet));
        for row in rows {
            let mut cols = BTreeSet::new();
            columns(old, sheet, row, &mut cols);
            columns(new, sheet, row, &mut cols);
            for col in cols {
                let at = CellAddress::new(row, col);
                compare_cells(sheet, at, real_cell(old, sheet, at), at, real_cell(new, sheet, at), map, changes);
            }
        }
    }
}

impl ChangeComputer for CellChangeComputer {
    type ChangeSet = CellChangeSet;

    fn compute(&self, old: &DiffSide<'_>, new: &DiffSide<'_>, rows: &RowMap) -> CellChangeSet {
        let mut changes = CellChangeSet::new();
        for sheet in new.model.sheet_names().filter(|s| old.model.has_sheet(s)) {
            if rows.is_keyed(sheet) {
                self.compare_keyed(sheet, old.model, new.model, rows, &mut changes);
            } else {
                self.compare_in_place(sheet, old.model, new.model, rows, &mut changes);
            }
        }
        changes
    }

    fn name(&self) -> &'static str {
        "cells"
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

    fn build(wb: &Workbook) -> SpreadsheetModel {
        ModelBuilder::new(BuilderConfig::default()).build(wb).unwrap()
    }

    fn key(row: u32, text: &str) -> RowKey {
        RowKey {
            row,
            display: text.to_string(),
            normalized: normalize_key(text),
        }
    }

    #[test]
    fn test_same_address_comparison() {
        let mut old = Workbook::new();
        old.add_sheet("Plan")
            .value("A1", 10.0)
            .formula("B1", "=A1*2")
            .formula("C1", "=A1*3");
        let mut new = Workbook::new();
        new.add_sheet("Plan")
            .value("A1", 12.0)
            .formula("B1", "=A1*2")
            .value("C1", 36.0);
        let (old, new) = (build(&old), build(&new));
        let report = RiskReport::default();
        let mut rows = RowMap::new();
        rows.insert_identity("Plan");

        let changes = CellChangeComputer::new().compute(
            &DiffSide::new(&old, &report),
            &DiffSide::new(&new, &report),
            &rows,
        );
        assert_eq!(changes.input.len(), 1);
        assert_eq!(changes.input[0].location, "A1");
        assert_eq!(changes.input[0].new_value.as_deref(), Some("12"));
        assert_eq!(changes.logic.len(), 1);
        assert_eq!(changes.logic[0].location, "C1");
        assert_eq!(changes.logic[0].severity, ChangeSeverity::Critical);
    }

    #[test]
    fn test_keyed_rows_ignore_shifted_references() {
        let mut old = Workbook::new();
        old.add_sheet("Plan")
            .value("A2", "Sales")
            .value("B2", 100.0)
            .formula("C2", "=B2*2");
        let mut new = Workbook::new();
        new.add_sheet("Plan")
            .value("A2", "Rent")
            .value("B2", 5.0)
            .value("A3", "Sales")
            .value("B3", 100.0)
            .formula("C3", "=B3*2");
        let (old, new) = (build(&old), build(&new));
        let report = RiskReport::default();
        let mut rows = RowMap::new();
        rows.insert_keyed(
            "Plan",
            &match_rows("Plan", &[key(2, "Sales")], &[key(2, "Rent"), key(3, "Sales")], None),
        );

        let changes = CellChangeComputer::new().compute(
            &DiffSide::new(&old, &report),
            &DiffSide::new(&new, &report),
            &rows,
        );
        assert!(changes.is_empty(), "{changes:?}");
    }

    #[test]
    fn test_references_follow_moved_rows() {
        // Cost moves down one row; Margin's "=B2-B3" becomes "=B2-B4"
        let mut old = Workbook::new();
        old.add_sheet("Plan")
            .value("A2", "Revenue")
            .value("B2", 10.0)
            .value("A3", "Cost")
            .value("B3", 4.0)
            .value("A4", "Margin")
            .formula("B4", "=B2-B3");
        let mut new = Workbook::new();
        new.add_sheet("Plan")
            .value("A2", "Revenue")
            .value("B2", 10.0)
            .value("A3", "Tax")
            .value("B3", 1.0)
            .value("A4", "Cost")
            .value("B4", 4.0)
            .value("A5", "Margin")
            .formula("B5", "=B2-B4");
        let (old, new) = (build(&old), build(&new));
        let report = RiskReport::default();
        let mut rows = RowMap::new();
        rows.insert_keyed(
            "Plan",
            &match_rows(
                "Plan",
                &[key(2, "Revenue"), key(3, "Cost"), key(4, "Margin")],
                &[key(2, "Revenue"), key(3, "Tax"), key(4, "Cost"), key(5, "Margin")],
                None,
            ),
        );
        let compute = |rows: &RowMap| {
            CellChangeComputer::new().compute(
                &DiffSide::new(&old, &report),
                &DiffSide::new(&new, &report),
                rows,
            )
        };
        assert!(compute(&rows).is_empty());

        // pointing at a different row is a rewrite
        let mut wrong = RowMap::new();
        wrong.insert_keyed(
            "Plan",
            &match_rows("Plan", &[key(4, "Margin")], &[key(5, "Margin")], None),
        );
        let changes = compute(&wrong);
        assert_eq!(changes.logic.len(), 1);
        assert_eq!(changes.logic[0].location, "B5");
    }
}
