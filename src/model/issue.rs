//! Recoverable input problems recorded during a build.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What went wrong with a skipped input item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildIssueKind {
    /// A cell address could not be parsed
    MalformedAddress,
    /// A merged region could not be parsed
    MalformedRegion,
    /// A merged region overlaps one declared earlier
    OverlappingRegion,
    /// The same address appears twice on a sheet
    DuplicateCell,
    /// A formula could not be tokenized into anything meaningful
    UnparsableFormula,
    /// Rows past the configured per-sheet cap were dropped
    RowLimit,
}

impl fmt::Display for BuildIssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MalformedAddress => "malformed address",
            Self::MalformedRegion => "malformed merged region",
            Self::OverlappingRegion => "overlapping merged region",
            Self::DuplicateCell => "duplicate cell",
            Self::UnparsableFormula => "unparsable formula",
            Self::RowLimit => "row limit",
        };
        f.write_str(name)
    }
}

/// A skipped input item and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildIssue {
    pub kind: BuildIssueKind,
    pub sheet: String,
    /// Address, region or row the issue concerns
    pub location: String,
    pub message: String,
}

impl BuildIssue {
    pub fn new(
        kind: BuildIssueKind,
        sheet: impl Into<String>,
        location: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            sheet: sheet.into(),
            location: location.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for BuildIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}!{}: {}", self.kind, self.sheet, self.location, self.message)
    }
}
