//! Composite row keys.
//!
//! A row is identified by the values of one or more user-chosen key columns
//! (`Department|Account`), not by its position, so inserting a row does not
//! shift every row below it out of alignment.

use crate::error::{AuditError, MatchingErrorKind, Result};
use crate::model::{column_from_letters, CellAddress, SpreadsheetModel};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// Separator between the parts of a composite key.
pub const KEY_SEPARATOR: &str = "|";

/// Key of one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowKey {
    pub row: u32,
    /// Key as written, parts trimmed
    pub display: String,
    /// Lower-cased, whitespace-collapsed form used for matching
    pub normalized: String,
}

/// Lower-case, collapse runs of whitespace and trim.
#[must_use]
pub fn normalize_key(key: &str) -> String {
    key.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Resolve key column letters to column numbers.
pub fn parse_key_columns(columns: &[String]) -> Result<Vec<u32>> {
    columns
        .iter()
        .map(|letters| {
            column_from_letters(letters.trim()).ok_or_else(|| {
                AuditError::matching(
                    "resolving key columns",
                    MatchingErrorKind::InvalidKeyColumn(letters.clone()),
                )
            })
        })
        .collect()
}

/// Composite key of `row`, or `None` when every key cell is empty.
#[must_use]
pub fn composite_key(
    model: &SpreadsheetModel,
    sheet: &str,
    row: u32,
    columns: &[u32],
) -> Option<RowKey> {
    let parts: Vec<String> = columns
        .iter()
        .map(|&col| {
            model
                .cell(sheet, CellAddress::new(row, col))
                .map(|c| c.value.display_string().trim().to_string())
                .unwrap_or_default()
        })
        .collect();
    if parts.iter().all(String::is_empty) {
        return None;
    }
    let display = parts.join(KEY_SEPARATOR);
    Some(RowKey {
        row,
        normalized: normalize_key(&display),
        display,
    })
}

/// Keys of every keyed row of `sheet`, top to bottom.
#[must_use]
pub fn row_keys(model: &SpreadsheetModel, sheet: &str, columns: &[u32]) -> Vec<RowKey> {
    let mut rows: Vec<u32> = model.index.rows_of(sheet).collect();
    rows.sort_unstable();
    rows.into_iter()
        .filter_map(|row| composite_key(model, sheet, row, columns))
        .collect()
}

/// How well a set of keys identifies rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyUniqueness {
    pub total: usize,
    pub unique: usize,
    /// `unique / total`, 1.0 for an empty sheet
    pub uniqueness: f64,
    /// Sample of keys seen more than once
    pub duplicates: Vec<String>,
}

impl KeyUniqueness {
    #[must_use]
    pub fn measure(keys: &[RowKey], max_samples: usize) -> Self {
        let mut counts: IndexMap<&str, usize> = IndexMap::new();
        for key in keys {
            *counts.entry(key.normalized.as_str()).or_default() += 1;
        }
        let total = keys.len();
        let unique = counts.len();
        Self {
            total,
            unique,
            uniqueness: if total == 0 { 1.0 } else { unique as f64 / total as f64 },
            duplicates: counts
                .iter()
                .filter(|(_, &n)| n > 1)
                .take(max_samples)
                .map(|(k, _)| (*k).to_string())
                .collect(),
        }
    }

    #[must_use]
    pub fn is_unique(&self) -> bool {
        self.unique == self.total
    }
}

/// Which side of a comparison a finding belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Version {
    Old,
    New,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Old => "old",
            Self::New => "new",
        })
    }
}

/// Key columns that do not identify rows uniquely.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyUniquenessWarning {
    pub sheet: String,
    pub version: Version,
    pub uniqueness: KeyUniqueness,
}

impl fmt::Display for KeyUniquenessWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Key columns on '{}' ({} version) are {:.1}% unique ({} of {} rows); duplicate keys: {}. \
             Rows with a repeated key are matched on their first occurrence only; add a key column \
             to disambiguate.",
            self.sheet,
            self.version,
            self.uniqueness.uniqueness * 100.0,
            self.uniqueness.unique,
            self.uniqueness.total,
            self.uniqueness.duplicates.join(", ")
        )
    }
}
