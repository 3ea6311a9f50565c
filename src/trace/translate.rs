//! Formula rendering with labels in place of addresses.
//!
//! `=F12*F13` reads as `=[Unit Price]*[Quantity]`, which makes a wrong
//! operator (`Price + Cost`) obvious at a glance.

use crate::builder::{tokenize, TokenKind};
use crate::model::{CellKey, SpreadsheetModel};
use crate::risk::labeling::HeuristicLabeler;

/// Replace single-cell references of `formula` (written on `sheet`) with
/// their labels.
///
/// Same-sheet references render as `[row @ col]`, `[row]`, `[col]` or `[A1]`;
/// other sheets as `[Sheet:row @ col]` and so on, or `[Sheet!A1]` without a
/// label. Ranges, external references and cells missing from the model keep
/// their original text.
#[must_use]
pub fn translate_formula(
    model: &SpreadsheetModel,
    labels: &HeuristicLabeler,
    sheet: &str,
    formula: &str,
) -> String {
    let mut out = String::from("=");
    for token in tokenize(formula) {
        match token.kind {
            TokenKind::Reference => {
                let label = token
                    .reference()
                    .filter(|r| !r.is_range() && !r.is_external())
                    .and_then(|r| {
                        let key = CellKey::new(r.target_sheet(sheet), r.range().start);
                        model.get(&key)?;
                        Some(reference_label(model, labels, sheet, &key))
                    });
                out.push_str(label.as_deref().unwrap_or(&token.text));
            }
            TokenKind::Text => {
                out.push('"');
                out.push_str(&token.text.replace('"', "\"\""));
                out.push('"');
            }
            _ => out.push_str(&token.text),
        }
    }
    out
}

fn reference_label(
    model: &SpreadsheetModel,
    labels: &HeuristicLabeler,
    current: &str,
    key: &CellKey,
) -> String {
    let row = labels.row_label(&model.index, &key.sheet, key.address);
    let col = labels.col_label(&model.index, &key.sheet, key.address);
    let text = match (row, col) {
        (Some(row), Some(col)) => Some(format!("{row} @ {col}")),
        (Some(one), None) | (None, Some(one)) => Some(one),
        (None, None) => None,
    };
    match (text, key.sheet == current) {
        (Some(text), true) => format!("[{text}]"),
        (Some(text), false) => format!("[{}:{text}]", key.sheet),
        (None, true) => format!("[{}]", key.address),
        (None, false) => format!("[{key}]"),
    }
}
