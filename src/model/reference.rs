//! Parsed formula references (`A1`, `Sheet!A1:B5`, `'My Sheet'!C:C`, `[Book.xlsx]Data!$B$2`).

use super::address::{column_from_letters, row_from_digits, CellAddress, CellRange, MAX_COL, MAX_ROW};
use serde::{Deserialize, Serialize};

/// One corner of a reference. A missing row means a whole-column reference,
/// a missing column a whole-row reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RefPoint {
    pub row: Option<u32>,
    pub col: Option<u32>,
    pub row_absolute: bool,
    pub col_absolute: bool,
}

impl RefPoint {
    /// Parse `A1`, `$A$1`, `A`, `$A`, `1` or `$1`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let bytes = s.as_bytes();
        let mut i = 0;
        let col_absolute = bytes.first() == Some(&b'$');
        if col_absolute {
            i += 1;
        }
        let letters_start = i;
        while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
            i += 1;
        }
        let letters = &s[letters_start..i];
        let row_absolute = bytes.get(i) == Some(&b'$');
        if row_absolute {
            i += 1;
        }
        let digits = &s[i..];

        let col = if letters.is_empty() {
            None
        } else {
            Some(column_from_letters(letters)?)
        };
        let row = if digits.is_empty() {
            None
        } else {
            Some(row_from_digits(digits)?)
        };

        match (col, row) {
            (None, None) => None,
            // `$1` alone is a row marker, not a column marker
            (None, Some(_)) => Some(Self {
                row,
                col,
                row_absolute: col_absolute || row_absolute,
                col_absolute: false,
            }),
            (Some(_), None) if row_absolute => None,
            _ => Some(Self {
                row,
                col,
                row_absolute,
                col_absolute,
            }),
        }
    }

    const fn is_cell(&self) -> bool {
        self.row.is_some() && self.col.is_some()
    }

    /// Relative (R1C1-style) rendering as seen from `origin`.
    fn relative_to(&self, origin: CellAddress) -> String {
        let mut out = String::new();
        if let Some(row) = self.row {
            out.push_str(&axis("R", row, origin.row, self.row_absolute));
        }
        if let Some(col) = self.col {
            out.push_str(&axis("C", col, origin.col, self.col_absolute));
        }
        out
    }
}

fn axis(prefix: &str, value: u32, origin: u32, absolute: bool) -> String {
    if absolute {
        return format!("{prefix}{value}");
    }
    let offset = i64::from(value) - i64::from(origin);
    if offset == 0 {
        prefix.to_string()
    } else {
        format!("{prefix}[{offset}]")
    }
}

/// A reference as written in a formula.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    /// External workbook name from a `[Book.xlsx]` prefix
    pub workbook: Option<String>,
    /// Explicit sheet qualifier
    pub sheet: Option<String>,
    pub start: RefPoint,
    pub end: Option<RefPoint>,
    /// Original text of the reference
    pub text: String,
}

impl Reference {
    /// Parse a reference token. Returns `None` for text that is not a reference.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let (qualifier, target) = split_qualifier(text)?;
        let (workbook, sheet) = match qualifier {
            Some(q) => split_workbook(&q),
            None => (None, None),
        };

        let (start, end) = match target.split_once(':') {
            Some((a, b)) => {
                let (a, b) = (RefPoint::parse(a)?, RefPoint::parse(b)?);
                let same_shape = a.row.is_some() == b.row.is_some() && a.col.is_some() == b.col.is_some();
                if !same_shape {
                    return None;
                }
                (a, Some(b))
            }
            None => {
                let point = RefPoint::parse(target)?;
                if !point.is_cell() {
                    return None;
                }
                (point, None)
            }
        };

        Some(Self {
            workbook,
            sheet,
            start,
            end,
            text: text.to_string(),
        })
    }

    /// Whether the reference points into another workbook.
    #[must_use]
    pub const fn is_external(&self) -> bool {
        self.workbook.is_some()
    }

    /// Whether more than one cell may be referenced.
    #[must_use]
    pub const fn is_range(&self) -> bool {
        self.end.is_some()
    }

    /// Sheet the reference resolves to when written on `current`.
    #[must_use]
    pub fn target_sheet<'a>(&'a self, current: &'a str) -> &'a str {
        self.sheet.as_deref().unwrap_or(current)
    }

    /// Block of cells covered. Whole-column and whole-row references span the sheet.
    #[must_use]
    pub fn range(&self) -> CellRange {
        let end = self.end.unwrap_or(self.start);
        let corner = |p: &RefPoint, row_default: u32, col_default: u32| {
            CellAddress::new(p.row.unwrap_or(row_default), p.col.unwrap_or(col_default))
        };
        CellRange::new(corner(&self.start, 1, 1), corner(&end, MAX_ROW, MAX_COL))
    }

    /// Relative rendering from `origin`, with the qualifier kept verbatim.
    #[must_use]
    pub fn relative_to(&self, origin: CellAddress) -> String {
        let mut out = String::new();
        if let Some(workbook) = &self.workbook {
            out.push('[');
            out.push_str(workbook);
            out.push(']');
        }
        if let Some(sheet) = &self.sheet {
            out.push_str(sheet);
            out.push('!');
        }
        out.push_str(&self.start.relative_to(origin));
        if let Some(end) = &self.end {
            out.push(':');
            out.push_str(&end.relative_to(origin));
        }
        out
    }
}

/// Split `Sheet!A1` into its qualifier and target, honouring quoted sheet names.
fn split_qualifier(text: &str) -> Option<(Option<String>, &str)> {
    if let Some(rest) = text.strip_prefix('\'') {
        let mut name = String::new();
        let mut chars = rest.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            if c == '\'' {
                if matches!(chars.peek(), Some((_, '\''))) {
                    name.push('\'');
                    chars.next();
                    continue;
                }
                let target = rest[i + 1..].strip_prefix('!')?;
                return Some((Some(name), target));
            }
            name.push(c);
        }
        return None;
    }
    match text.rsplit_once('!') {
        Some((sheet, target)) if !sheet.is_empty() => Some((Some(sheet.to_string()), target)),
        Some(_) => None,
        None => Some((None, text)),
    }
}

/// Split `[Book.xlsx]Sheet` into workbook and sheet.
fn split_workbook(qualifier: &str) -> (Option<String>, Option<String>) {
    if let Some(rest) = qualifier.strip_prefix('[') {
        if let Some((book, sheet)) = rest.split_once(']') {
            let sheet = (!sheet.is_empty()).then(|| sheet.to_string());
            return (Some(book.to_string()), sheet);
        }
    }
    (None, Some(qualifier.to_string()))
}
