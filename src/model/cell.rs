//! Cell values and normalized cells.

use super::address::{CellAddress, CellKey, CellRange};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Standard spreadsheet error sentinels with their meaning.
pub const ERROR_SENTINELS: &[(&str, &str)] = &[
    ("#REF!", "Reference to deleted cell or sheet"),
    ("#DIV/0!", "Division by zero"),
    ("#VALUE!", "Wrong type of argument or operand"),
    ("#NAME?", "Unrecognized function or name"),
    ("#N/A", "Value not available"),
    ("#NUM!", "Invalid numeric value"),
    ("#NULL!", "Incorrect range operator"),
];

/// Raw value of a cell as read from the workbook.
///
/// Deserializes from plain JSON: numbers, booleans, `null`, ISO date-times and
/// strings. Strings equal to an error sentinel are turned into
/// [`CellValue::Error`] by [`CellValue::normalize`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
    Text(String),
    Error(String),
}

impl CellValue {
    /// Reclassify exact error sentinels and blank text.
    #[must_use]
    pub fn normalize(self) -> Self {
        match self {
            Self::Text(text) if text.trim().is_empty() => Self::Empty,
            Self::Text(text) if ERROR_SENTINELS.iter().any(|(code, _)| *code == text) => {
                Self::Error(text)
            }
            other => other,
        }
    }

    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// The error sentinel this value carries or contains, if any.
    #[must_use]
    pub fn error_code(&self) -> Option<&'static str> {
        let text = match self {
            Self::Error(code) | Self::Text(code) => code.as_str(),
            _ => return None,
        };
        ERROR_SENTINELS
            .iter()
            .find(|(code, _)| text.contains(code))
            .map(|(code, _)| *code)
    }

    /// Human-readable rendering used in labels and change reports.
    #[must_use]
    pub fn display_string(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Number(n) => format_number(*n),
            Self::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            Self::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            Self::Text(s) | Self::Error(s) => s.clone(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_string())
    }
}

/// Canonical text form of a number, so `201.26` and `201.260` compare equal.
#[must_use]
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        // collapse -0
        return "0".to_string();
    }
    format!("{value}")
}

/// Description of an error sentinel.
#[must_use]
pub fn describe_error(code: &str) -> &'static str {
    ERROR_SENTINELS
        .iter()
        .find(|(c, _)| *c == code)
        .map_or("Unknown error", |(_, description)| *description)
}

/// A normalized cell in the model.
///
/// Non-anchor cells of a merged region are virtual: they mirror the anchor's
/// value, formula and dependencies and point back to it through `anchor`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub key: CellKey,
    pub value: CellValue,
    pub formula: Option<String>,
    /// References exactly as written in the formula
    pub references: Vec<super::Reference>,
    /// Cells this cell reads, after range expansion
    pub dependencies: Vec<CellKey>,
    /// Ranges too large to expand, kept whole
    pub oversize_ranges: Vec<String>,
    /// The formula's target is computed at runtime (INDIRECT, OFFSET, ...)
    pub is_dynamic: bool,
    pub is_merged: bool,
    pub merged_range: Option<CellRange>,
    /// Anchor of the merged region, set only on virtual cells
    pub anchor: Option<CellAddress>,
}

impl Cell {
    /// Create a plain cell with no formula.
    #[must_use]
    pub fn new(key: CellKey, value: CellValue) -> Self {
        Self {
            key,
            value,
            formula: None,
            references: Vec::new(),
            dependencies: Vec::new(),
            oversize_ranges: Vec::new(),
            is_dynamic: false,
            is_merged: false,
            merged_range: None,
            anchor: None,
        }
    }

    #[must_use]
    pub fn sheet(&self) -> &str {
        &self.key.sheet
    }

    #[must_use]
    pub const fn address(&self) -> CellAddress {
        self.key.address
    }

    #[must_use]
    pub const fn has_formula(&self) -> bool {
        self.formula.is_some()
    }

    /// Synthetic cell produced by virtual fill.
    #[must_use]
    pub const fn is_virtual(&self) -> bool {
        self.anchor.is_some()
    }

    /// Numeric value of a cell that holds a typed-in number.
    #[must_use]
    pub fn input_number(&self) -> Option<f64> {
        if self.has_formula() {
            return None;
        }
        self.value.as_number()
    }

    /// Copy the anchor's content onto another coordinate of its merged region.
    #[must_use]
    pub fn virtual_copy(&self, address: CellAddress, region: CellRange) -> Self {
        Self {
            key: CellKey::new(self.key.sheet.clone(), address),
            value: self.value.clone(),
            formula: self.formula.clone(),
            references: self.references.clone(),
            dependencies: self.dependencies.clone(),
            oversize_ranges: self.oversize_ranges.clone(),
            is_dynamic: self.is_dynamic,
            is_merged: true,
            merged_range: Some(region),
            anchor: Some(self.key.address),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_deserialization() {
        let values: Vec<CellValue> =
            serde_json::from_str(r#"[201.26, "Revenue", true, null, "2024-04-01T00:00:00"]"#)
                .unwrap();
        assert_eq!(values[0], CellValue::Number(201.26));
        assert_eq!(values[1], CellValue::Text("Revenue".to_string()));
        assert_eq!(values[2], CellValue::Bool(true));
        assert_eq!(values[3], CellValue::Empty);
        assert!(matches!(values[4], CellValue::DateTime(_)));
    }

    #[test]
    fn test_normalize_error_sentinel() {
        let value = CellValue::Text("#REF!".to_string()).normalize();
        assert!(value.is_error());
        assert_eq!(value.error_code(), Some("#REF!"));
        assert_eq!(CellValue::Text("  ".to_string()).normalize(), CellValue::Empty);
        assert_eq!(CellValue::Number(3.0).error_code(), None);
    }

    #[test]
    fn test_error_code_inside_text() {
        let value = CellValue::Text("Error: #DIV/0! in total".to_string());
        assert_eq!(value.error_code(), Some("#DIV/0!"));
        assert_eq!(describe_error("#DIV/0!"), "Division by zero");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(201.26), "201.26");
        assert_eq!(format_number(12.0), "12");
        assert_eq!(format_number(-0.0), "0");
    }

    #[test]
    fn test_virtual_copy_points_to_anchor() {
        let anchor = Cell {
            formula: Some("=A1*2".to_string()),
            ..Cell::new(
                CellKey::new("Plan", CellAddress::new(1, 2)),
                CellValue::Number(4.0),
            )
        };
        let region = CellRange::parse("B1:C2").unwrap();
        let copy = anchor.virtual_copy(CellAddress::new(2, 3), region);
        assert!(copy.is_virtual());
        assert!(copy.is_merged);
        assert_eq!(copy.anchor, Some(CellAddress::new(1, 2)));
        assert_eq!(copy.formula.as_deref(), Some("=A1*2"));
        assert_eq!(copy.key.to_string(), "Plan!C2");
    }
}
