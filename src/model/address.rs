//! A1-notation addresses, ranges and sheet-qualified cell keys.

use crate::error::{AuditError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest column index (`XFD`).
pub const MAX_COL: u32 = 16_384;
/// Largest row index.
pub const MAX_ROW: u32 = 1_048_576;

/// Convert a 1-based column index to letters (`1` → `A`, `28` → `AB`).
#[must_use]
pub fn column_to_letters(mut col: u32) -> String {
    let mut letters = Vec::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        letters.push(b'A' + rem as u8);
        col = (col - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Convert column letters to a 1-based index. Case-insensitive, `$` is ignored.
#[must_use]
pub fn column_from_letters(letters: &str) -> Option<u32> {
    let letters = letters.trim_start_matches('$');
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let mut col: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        col = col * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
    }
    (col <= MAX_COL).then_some(col)
}

/// Parse a row number, rejecting zero and values past the sheet bound.
#[must_use]
pub fn row_from_digits(digits: &str) -> Option<u32> {
    let digits = digits.trim_start_matches('$');
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits
        .parse::<u32>()
        .ok()
        .filter(|row| (1..=MAX_ROW).contains(row))
}

/// A single cell coordinate. Ordered row-major (row, then column).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
pub struct CellAddress {
    /// 1-based row
    pub row: u32,
    /// 1-based column
    pub col: u32,
}

impl CellAddress {
    /// Create an address from a 1-based row and column.
    #[must_use]
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Parse `A1`, `$A$1` or `a1`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let split = s
            .char_indices()
            .find(|(i, c)| c.is_ascii_digit() || (*c == '$' && *i > 0))
            .map(|(i, _)| i)?;
        let (letters, digits) = s.split_at(split);
        let col = column_from_letters(letters)?;
        let row = row_from_digits(digits)?;
        Some(Self { row, col })
    }

    /// Column letters of this address.
    #[must_use]
    pub fn column_letters(&self) -> String {
        column_to_letters(self.col)
    }

    /// Shift by a row/column offset, returning `None` when it leaves the sheet.
    #[must_use]
    pub fn offset(&self, rows: i64, cols: i64) -> Option<Self> {
        let row = i64::from(self.row) + rows;
        let col = i64::from(self.col) + cols;
        if (1..=i64::from(MAX_ROW)).contains(&row) && (1..=i64::from(MAX_COL)).contains(&col) {
            Some(Self::new(row as u32, col as u32))
        } else {
            None
        }
    }

    /// Whether `other` touches this cell, diagonals included.
    #[must_use]
    pub const fn is_adjacent(&self, other: &Self) -> bool {
        self.row.abs_diff(other.row) <= 1 && self.col.abs_diff(other.col) <= 1
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_to_letters(self.col), self.row)
    }
}

impl FromStr for CellAddress {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| AuditError::invalid_address(s))
    }
}

/// A rectangular block of cells, normalized so `start` is top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct CellRange {
    pub start: CellAddress,
    pub end: CellAddress,
}

impl CellRange {
    /// Create a range from two corners in any order.
    #[must_use]
    pub fn new(a: CellAddress, b: CellAddress) -> Self {
        Self {
            start: CellAddress::new(a.row.min(b.row), a.col.min(b.col)),
            end: CellAddress::new(a.row.max(b.row), a.col.max(b.col)),
        }
    }

    /// A range covering one cell.
    #[must_use]
    pub const fn single(address: CellAddress) -> Self {
        Self {
            start: address,
            end: address,
        }
    }

    /// Parse `A1:B3` or a single `A1`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.split_once(':') {
            Some((a, b)) => Some(Self::new(CellAddress::parse(a)?, CellAddress::parse(b)?)),
            None => CellAddress::parse(s).map(Self::single),
        }
    }

    /// Number of cells covered.
    #[must_use]
    pub const fn size(&self) -> u64 {
        let rows = (self.end.row - self.start.row + 1) as u64;
        let cols = (self.end.col - self.start.col + 1) as u64;
        rows * cols
    }

    #[must_use]
    pub const fn is_single(&self) -> bool {
        self.start.row == self.end.row && self.start.col == self.end.col
    }

    #[must_use]
    pub const fn contains(&self, address: &CellAddress) -> bool {
        address.row >= self.start.row
            && address.row <= self.end.row
            && address.col >= self.start.col
            && address.col <= self.end.col
    }

    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.start.row <= other.end.row
            && other.start.row <= self.end.row
            && self.start.col <= other.end.col
            && other.start.col <= self.end.col
    }

    /// Iterate every cell, row-major.
    pub fn cells(&self) -> impl Iterator<Item = CellAddress> + '_ {
        (self.start.row..=self.end.row).flat_map(move |row| {
            (self.start.col..=self.end.col).map(move |col| CellAddress::new(row, col))
        })
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single() {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}

impl FromStr for CellRange {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| AuditError::invalid_range(s))
    }
}

/// An inclusive span of columns such as `A:D`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpan {
    pub start: u32,
    pub end: u32,
}

impl ColumnSpan {
    /// Parse `A:D` or a single column `C`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let (a, b) = s.trim().split_once(':').unwrap_or((s.trim(), s.trim()));
        let (a, b) = (column_from_letters(a)?, column_from_letters(b)?);
        Some(Self {
            start: a.min(b),
            end: a.max(b),
        })
    }

    #[must_use]
    pub const fn contains(&self, col: u32) -> bool {
        col >= self.start && col <= self.end
    }
}

/// A cell identified by sheet and address, displayed as `Sheet!A1`.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
pub struct CellKey {
    pub sheet: String,
    pub address: CellAddress,
}

impl CellKey {
    #[must_use]
    pub fn new(sheet: impl Into<String>, address: CellAddress) -> Self {
        Self {
            sheet: sheet.into(),
            address,
        }
    }

    /// Parse `Sheet!A1` or `'My Sheet'!A1`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let (sheet, address) = s.rsplit_once('!')?;
        let sheet = sheet
            .strip_prefix('\'')
            .and_then(|rest| rest.strip_suffix('\''))
            .map_or_else(|| sheet.to_string(), |quoted| quoted.replace("''", "'"));
        if sheet.is_empty() {
            return None;
        }
        Some(Self::new(sheet, CellAddress::parse(address)?))
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}", self.sheet, self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letters() {
        assert_eq!(column_to_letters(1), "A");
        assert_eq!(column_to_letters(26), "Z");
        assert_eq!(column_to_letters(27), "AA");
        assert_eq!(column_to_letters(MAX_COL), "XFD");
        assert_eq!(column_from_letters("xfd"), Some(MAX_COL));
        assert_eq!(column_from_letters("XFE"), None);
        assert_eq!(column_from_letters("A1"), None);
    }

    #[test]
    fn test_parse_address() {
        assert_eq!(CellAddress::parse("F4"), Some(CellAddress::new(4, 6)));
        assert_eq!(CellAddress::parse("$F$4"), Some(CellAddress::new(4, 6)));
        assert_eq!(CellAddress::parse("F$4"), Some(CellAddress::new(4, 6)));
        assert_eq!(CellAddress::parse("F0"), None);
        assert_eq!(CellAddress::parse("4F"), None);
        assert_eq!(CellAddress::parse(""), None);
        assert!("ZZZ0".parse::<CellAddress>().is_err());
    }

    #[test]
    fn test_range_normalizes_corners() {
        let range = CellRange::parse("C5:A1").unwrap();
        assert_eq!(range.to_string(), "A1:C5");
        assert_eq!(range.size(), 15);
        assert!(range.contains(&CellAddress::new(3, 2)));
        assert!(!range.contains(&CellAddress::new(6, 1)));
        assert_eq!(range.cells().count(), 15);
        assert_eq!(CellRange::parse("B2").unwrap().to_string(), "B2");
    }

    #[test]
    fn test_range_overlap() {
        let a = CellRange::parse("A1:B2").unwrap();
        assert!(a.overlaps(&CellRange::parse("B2:C3").unwrap()));
        assert!(!a.overlaps(&CellRange::parse("C1:D2").unwrap()));
    }

    #[test]
    fn test_cell_key_roundtrip() {
        let key = CellKey::parse("'Q1 ''Plan'''!B7").unwrap();
        assert_eq!(key.sheet, "Q1 'Plan'");
        assert_eq!(key.address, CellAddress::new(7, 2));
        assert_eq!(CellKey::parse("Plan!F4").unwrap().to_string(), "Plan!F4");
        assert!(CellKey::parse("F4").is_none());
    }

    #[test]
    fn test_adjacency_includes_diagonals() {
        let f4 = CellAddress::new(4, 6);
        assert!(f4.is_adjacent(&CellAddress::new(5, 7)));
        assert!(!f4.is_adjacent(&CellAddress::new(6, 6)));
    }

    #[test]
    fn test_column_span() {
        let span = ColumnSpan::parse("d:b").unwrap();
        assert_eq!((span.start, span.end), (2, 4));
        assert!(span.contains(3));
        assert_eq!(ColumnSpan::parse("C").map(|s| s.start), Some(3));
        assert!(ColumnSpan::parse("A-D").is_none());
    }
}
