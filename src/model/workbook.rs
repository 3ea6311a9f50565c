//! Pre-parsed workbook input.
//!
//! Reading the actual spreadsheet file is left to the caller; this is the
//! shape the model builder consumes.

use super::cell::CellValue;
use crate::error::{ErrorContext, Result};
use crate::utils::hash_fields;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A workbook snapshot: sheets in tab order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

/// One worksheet's non-empty cells and merged regions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    #[serde(default)]
    pub cells: Vec<RawCell>,
    /// Merged regions in A1 notation, e.g. `"B2:D2"`
    #[serde(default)]
    pub merged: Vec<String>,
}

/// A cell as read from the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCell {
    pub address: String,
    #[serde(default)]
    pub value: CellValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
}

impl Workbook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON snapshot.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON snapshot from disk.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::error::AuditError::io(path, e))?;
        Self::from_json_str(&content)
            .with_context(|| format!("loading snapshot {}", path.display()))
    }

    /// Add a sheet, returning it for chaining cell insertion.
    pub fn add_sheet(&mut self, name: impl Into<String>) -> &mut Sheet {
        self.sheets.push(Sheet {
            name: name.into(),
            ..Sheet::default()
        });
        let last = self.sheets.len() - 1;
        &mut self.sheets[last]
    }

    #[must_use]
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// Total raw cells across sheets.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.sheets.iter().map(|s| s.cells.len()).sum()
    }

    /// Hash of every sheet name, cell and merged region.
    #[must_use]
    pub fn content_hash(&self) -> u64 {
        let mut fields: Vec<String> = Vec::with_capacity(self.cell_count() * 3 + self.sheets.len());
        for sheet in &self.sheets {
            fields.push(format!("sheet:{}", sheet.name));
            for cell in &sheet.cells {
                fields.push(cell.address.clone());
                fields.push(value_fingerprint(&cell.value));
                fields.push(cell.formula.clone().unwrap_or_default());
            }
            for region in &sheet.merged {
                fields.push(format!("merged:{region}"));
            }
        }
        hash_fields(&fields)
    }
}

fn value_fingerprint(value: &CellValue) -> String {
    match value {
        CellValue::Empty => "e:".to_string(),
        CellValue::Number(n) => format!("n:{n}"),
        CellValue::Bool(b) => format!("b:{b}"),
        CellValue::DateTime(dt) => format!("d:{dt}"),
        CellValue::Text(s) => format!("t:{s}"),
        CellValue::Error(s) => format!("x:{s}"),
    }
}

impl Sheet {
    /// Append a plain value.
    pub fn value(&mut self, address: &str, value: impl Into<CellValue>) -> &mut Self {
        self.cells.push(RawCell {
            address: address.to_string(),
            value: value.into(),
            formula: None,
        });
        self
    }

    /// Append a formula cell with no cached value.
    pub fn formula(&mut self, address: &str, formula: &str) -> &mut Self {
        self.cells.push(RawCell {
            address: address.to_string(),
            value: CellValue::Empty,
            formula: Some(formula.to_string()),
        });
        self
    }

    /// Append a formula cell with its cached value.
    pub fn formula_with_value(
        &mut self,
        address: &str,
        formula: &str,
        value: impl Into<CellValue>,
    ) -> &mut Self {
        self.cells.push(RawCell {
            address: address.to_string(),
            value: value.into(),
            formula: Some(formula.to_string()),
        });
        self
    }

    /// Declare a merged region.
    pub fn merge(&mut self, region: &str) -> &mut Self {
        self.merged.push(region.to_string());
        self
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_str() {
        let json = r#"{
            "sheets": [{
                "name": "Plan",
                "cells": [
                    {"address": "A4", "value": "Unit price"},
                    {"address": "F4", "value": 201.26},
                    {"address": "F8", "formula": "=F4*2"}
                ],
                "merged": ["A1:C1"]
            }]
        }"#;
        let workbook = Workbook::from_json_str(json).unwrap();
        assert_eq!(workbook.cell_count(), 3);
        let plan = workbook.sheet("Plan").unwrap();
        assert_eq!(plan.cells[2].value, CellValue::Empty);
        assert_eq!(plan.merged, vec!["A1:C1".to_string()]);
    }

    #[test]
    fn test_invalid_json_is_build_error() {
        let err = Workbook::from_json_str("{\"sheets\": 3}").unwrap_err();
        assert!(err.to_string().contains("Failed to build model"), "{err}");
    }

    #[test]
    fn test_content_hash_changes_with_content() {
        let mut a = Workbook::new();
        a.add_sheet("Plan").value("F4", 201.26).formula("F8", "=F4*2");
        let mut b = a.clone();
        assert_eq!(a.content_hash(), b.content_hash());

        b.sheets[0].cells[0].value = CellValue::Number(201.27);
        assert_ne!(a.content_hash(), b.content_hash());

        let mut c = a.clone();
        c.sheets[0].merge("A1:B1");
        assert_ne!(a.content_hash(), c.content_hash());
    }
}
