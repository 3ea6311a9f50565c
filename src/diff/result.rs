//! Diff result types.

use super::keys::KeyUniquenessWarning;
use super::matching::RowMapping;
use serde::Serialize;
use std::fmt;

/// What kind of change was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ChangeKind {
    /// A formula was added, removed or rewritten
    Logic,
    /// A typed-in value changed
    Input,
    /// A risk appeared or disappeared
    Risk,
    /// Sheets or rows were added or removed
    Structural,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Logic => "Logic change",
            Self::Input => "Input update",
            Self::Risk => "Risk change",
            Self::Structural => "Structural change",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ChangeSeverity {
    Info,
    Normal,
    Warning,
    Critical,
}

impl fmt::Display for ChangeSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "Info",
            Self::Normal => "Normal",
            Self::Warning => "Warning",
            Self::Critical => "Critical",
        })
    }
}

/// One change between the two versions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeCategory {
    pub kind: ChangeKind,
    pub severity: ChangeSeverity,
    pub sheet: String,
    /// Cell in the new version (old version for removals), or a row / sheet description
    pub location: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub description: String,
}

impl fmt::Display for ChangeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.kind, self.description)
    }
}

/// Change counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub total_changes: usize,
    pub logic_changes: usize,
    pub input_updates: usize,
    pub risks_resolved: usize,
    pub risks_introduced: usize,
    pub structural_changes: usize,
    pub rows_matched: usize,
    pub rows_added: usize,
    pub rows_deleted: usize,
}

/// Result of comparing two analyzed versions of a model.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiffResult {
    pub old_score: u32,
    pub new_score: u32,
    /// `new_score - old_score`
    pub score_delta: i64,
    /// Row matches of every keyed sheet
    pub row_mappings: Vec<RowMapping>,
    /// Severity descending, then kind
    pub changes: Vec<ChangeCategory>,
    pub warnings: Vec<KeyUniquenessWarning>,
    pub summary: DiffSummary,
}

impl DiffResult {
    #[must_use]
    pub fn new(old_score: u32, new_score: u32) -> Self {
        Self {
            old_score,
            new_score,
            score_delta: i64::from(new_score) - i64::from(old_score),
            ..Self::default()
        }
    }

    /// Recount the summary from the changes and mappings.
    pub fn calculate_summary(&mut self) {
        let count = |kind: ChangeKind| self.changes.iter().filter(|c| c.kind == kind).count();
        let risks = self.changes.iter().filter(|c| c.kind == ChangeKind::Risk);
        let resolved = risks
            .clone()
            .filter(|c| c.severity == ChangeSeverity::Info)
            .count();
        self.summary = DiffSummary {
            total_changes: self.changes.len(),
            logic_changes: count(ChangeKind::Logic),
            input_updates: count(ChangeKind::Input),
            risks_resolved: resolved,
            risks_introduced: risks.count() - resolved,
            structural_changes: count(ChangeKind::Structural),
            rows_matched: self.row_mappings.iter().filter(|m| m.is_matched()).count(),
            rows_added: self.row_mappings.iter().filter(|m| m.is_added()).count(),
            rows_deleted: self.row_mappings.iter().filter(|m| m.is_deleted()).count(),
        };
    }

    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    #[must_use]
    pub const fn is_improved(&self) -> bool {
        self.score_delta > 0
    }

    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        self.score_delta < 0
    }

    pub fn changes_of(&self, kind: ChangeKind) -> impl Iterator<Item = &ChangeCategory> {
        self.changes.iter().filter(move |c| c.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(kind: ChangeKind, severity: ChangeSeverity) -> ChangeCategory {
        ChangeCategory {
            kind,
            severity,
            sheet: "Plan".to_string(),
            location: "F8".to_string(),
            old_value: None,
            new_value: None,
            description: String::new(),
        }
    }

    #[test]
    fn test_score_delta_direction() {
        assert!(DiffResult::new(70, 85).is_improved());
        assert!(DiffResult::new(85, 70).is_degraded());
        assert_eq!(DiffResult::new(85, 70).score_delta, -15);
        assert!(!DiffResult::new(80, 80).has_changes());
    }

    #[test]
    fn test_summary_counts() {
        let mut result = DiffResult::new(80, 80);
        result.changes = vec![
            change(ChangeKind::Logic, ChangeSeverity::Critical),
            change(ChangeKind::Input, ChangeSeverity::Normal),
            change(ChangeKind::Risk, ChangeSeverity::Info),
            change(ChangeKind::Risk, ChangeSeverity::Warning),
            change(ChangeKind::Risk, ChangeSeverity::Warning),
        ];
        result.calculate_summary();
        assert_eq!(result.summary.total_changes, 5);
        assert_eq!(result.summary.logic_changes, 1);
        assert_eq!(result.summary.risks_resolved, 1);
        assert_eq!(result.summary.risks_introduced, 2);
        assert_eq!(result.changes_of(ChangeKind::Risk).count(), 3);
    }
}
