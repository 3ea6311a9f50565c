//! Risk findings and their classification.

use crate::model::CellAddress;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Period-only column labels such as `2024-04`, `FY2024`, `Q1` or `Jan 2024`.
static PERIOD_ONLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4}-\d{2}|\d{2}-\d{4}|FY\s*\d{4}|Q\d|[A-Z][a-z]{2}\s+\d{4})$")
        .expect("static regex")
});

/// Row labels longer than this are shown without their column label.
const LONG_ROW_LABEL: usize = 30;

/// Severity reported by a detector.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }

    /// Health-score points deducted per alert before category weighting.
    #[must_use]
    pub const fn penalty(&self) -> f64 {
        match self {
            Self::Critical => 5.0,
            Self::High => 4.0,
            Self::Medium => 3.0,
            Self::Low => 1.0,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type of structural risk.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
pub enum RiskKind {
    /// Numeric literal typed into a formula
    HiddenHardcode,
    CircularReference,
    /// Formula breaking its row's relative pattern
    InconsistentFormula,
    /// Typed-in values disagreeing under the same row label
    ValueConflict,
    /// Formula reading another workbook
    ExternalLink,
    /// Cell showing an error sentinel
    FormulaError,
    /// Formula range touching a merged region
    MergedCellRisk,
    /// Formula reading many other sheets
    CrossSheetFanOut,
    /// Hidden hardcode whose labelled peers carry different literals (set by triage)
    InconsistentValue,
}

impl RiskKind {
    /// Kinds produced directly by a detector.
    #[must_use]
    pub const fn detectable() -> &'static [Self] {
        &[
            Self::HiddenHardcode,
            Self::CircularReference,
            Self::InconsistentFormula,
            Self::ValueConflict,
            Self::ExternalLink,
            Self::FormulaError,
            Self::MergedCellRisk,
            Self::CrossSheetFanOut,
        ]
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::HiddenHardcode => "Hidden Hardcode",
            Self::CircularReference => "Circular Reference",
            Self::InconsistentFormula => "Inconsistent Formula",
            Self::ValueConflict => "Value Conflict",
            Self::ExternalLink => "External Link",
            Self::FormulaError => "Formula Error",
            Self::MergedCellRisk => "Merged Cell Risk",
            Self::CrossSheetFanOut => "Cross-Sheet Fan-Out",
            Self::InconsistentValue => "Inconsistent Value",
        }
    }
}

impl fmt::Display for RiskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Business-impact tier assigned by triage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskCategory {
    /// The model is broken or uncomputable
    FatalError,
    /// The model runs, but logic or values look wrong
    IntegrityRisk,
    /// Works now, hard to maintain
    StructuralDebt,
}

impl RiskCategory {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::FatalError => "Fatal Error",
            Self::IntegrityRisk => "Integrity Risk",
            Self::StructuralDebt => "Structural Debt",
        }
    }

    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::FatalError => "The model is broken or uncomputable",
            Self::IntegrityRisk => "The model runs, but logic or values seem wrong",
            Self::StructuralDebt => "Works correctly now, but hard to maintain",
        }
    }

    /// Weight in the quantitative risk score.
    #[must_use]
    pub const fn weight(&self) -> f64 {
        match self {
            Self::FatalError => 1.0,
            Self::IntegrityRisk => 0.7,
            Self::StructuralDebt => 0.3,
        }
    }

    /// Multiplier applied to severity penalties in the health score.
    #[must_use]
    pub const fn health_multiplier(&self) -> f64 {
        match self {
            Self::FatalError => 1.0,
            Self::IntegrityRisk => 0.5,
            Self::StructuralDebt => 0.1,
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether a row-pattern break looks accidental.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Likelihood {
    /// Several cells disagree with the row
    LikelyError,
    /// A lone cell differs, probably on purpose
    LikelyIntentional,
}

impl Likelihood {
    #[must_use]
    pub const fn error_probability(&self) -> f64 {
        match self {
            Self::LikelyError => 1.0,
            Self::LikelyIntentional => 0.3,
        }
    }
}

/// Kind-specific evidence attached to an alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RiskDetails {
    HiddenHardcode {
        formula: String,
        /// First offending literal, canonical text form
        value: String,
        values: Vec<String>,
    },
    CircularReference {
        /// Cells on the cycle as `Sheet!A1`
        cycle: Vec<String>,
    },
    CircularSummary {
        total: usize,
        reported: usize,
        /// False when enumeration stopped early, so `total` is a lower bound
        exhaustive: bool,
    },
    InconsistentFormula {
        formula: String,
        pattern: String,
        dominant_pattern: String,
        row: u32,
        row_formula_cells: usize,
        disagreeing_cells: usize,
        likelihood: Likelihood,
    },
    ValueConflict {
        label: String,
        value: f64,
        expected_value: f64,
        matching_cells: usize,
        total_cells: usize,
    },
    ExternalLink {
        formula: String,
        files: Vec<String>,
    },
    FormulaError {
        code: String,
        description: String,
        formula: Option<String>,
    },
    MergedCellRisk {
        formula: String,
        /// Ranges in the formula that touch merged regions
        ranges: Vec<String>,
        merged_regions: Vec<String>,
    },
    CrossSheetFanOut {
        formula: String,
        sheets: Vec<String>,
    },
}

/// A detected risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAlert {
    pub kind: RiskKind,
    /// Severity as reported by the detector
    pub severity: Severity,
    pub sheet: String,
    /// `F4`, `F4, F5`, `F4:F8`, or `Multiple`
    pub location: String,
    /// Member cells, row-major (empty for workbook-wide alerts)
    pub cells: Vec<CellAddress>,
    pub description: String,
    pub details: RiskDetails,
    pub row_label: Option<String>,
    pub col_label: Option<String>,
    pub category: Option<RiskCategory>,
    /// Distinct cells downstream of the alert's cells
    pub impact_count: usize,
    /// Occurrences folded into this alert
    pub instance_count: usize,
    /// `category weight × impact × error probability`
    pub risk_score: f64,
    /// Severity implied by `risk_score`
    pub triage_severity: Option<Severity>,
}

impl RiskAlert {
    /// Alert on a single cell.
    pub fn new(
        kind: RiskKind,
        severity: Severity,
        sheet: impl Into<String>,
        cell: CellAddress,
        description: impl Into<String>,
        details: RiskDetails,
    ) -> Self {
        Self {
            kind,
            severity,
            sheet: sheet.into(),
            location: cell.to_string(),
            cells: vec![cell],
            description: description.into(),
            details,
            row_label: None,
            col_label: None,
            category: None,
            impact_count: 0,
            instance_count: 1,
            risk_score: 0.0,
            triage_severity: None,
        }
    }

    /// Workbook-wide alert without a cell.
    pub fn workbook_wide(
        kind: RiskKind,
        severity: Severity,
        description: impl Into<String>,
        details: RiskDetails,
    ) -> Self {
        Self {
            sheet: "Multiple".to_string(),
            location: "Multiple".to_string(),
            cells: Vec::new(),
            ..Self::new(kind, severity, "", CellAddress::new(1, 1), description, details)
        }
    }

    /// First (top-left) cell.
    #[must_use]
    pub fn anchor(&self) -> Option<CellAddress> {
        self.cells.first().copied()
    }

    /// `Sheet!F4`
    #[must_use]
    pub fn qualified_location(&self) -> String {
        format!("{}!{}", self.sheet, self.location)
    }

    /// Stable identifier used for review tracking.
    #[must_use]
    pub fn id(&self) -> String {
        format!("{}_{}_{:?}", self.sheet, self.location, self.kind)
    }

    /// Effective severity: the triage severity when present, otherwise the detector's.
    #[must_use]
    pub fn effective_severity(&self) -> Severity {
        self.triage_severity.unwrap_or(self.severity)
    }

    /// Human-readable context built from the row and column labels.
    #[must_use]
    pub fn context_display(&self) -> String {
        match (&self.row_label, &self.col_label) {
            (Some(row), Some(col)) => {
                let (row_lower, col_lower) = (row.to_lowercase(), col.to_lowercase());
                let redundant = row_lower.contains(&col_lower) || col_lower.contains(&row_lower);
                if redundant
                    || PERIOD_ONLY.is_match(col.trim())
                    || row.chars().count() > LONG_ROW_LABEL
                {
                    row.clone()
                } else {
                    format!("{row} @ {col}")
                }
            }
            (Some(row), None) => row.clone(),
            (None, Some(col)) => col.clone(),
            (None, None) => String::new(),
        }
    }
}

impl fmt::Display for RiskAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} at {}: {}",
            self.severity,
            self.kind,
            self.qualified_location(),
            self.description
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(row: Option<&str>, col: Option<&str>) -> RiskAlert {
        let mut alert = RiskAlert::new(
            RiskKind::HiddenHardcode,
            Severity::High,
            "Plan",
            CellAddress::new(4, 6),
            "Hardcoded value '201.26' in formula",
            RiskDetails::HiddenHardcode {
                formula: "=E4*201.26".to_string(),
                value: "201.26".to_string(),
                values: vec!["201.26".to_string()],
            },
        );
        alert.row_label = row.map(ToString::to_string);
        alert.col_label = col.map(ToString::to_string);
        alert
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::Medium > Severity::Low);
    }

    #[test]
    fn test_context_display_rules() {
        assert_eq!(alert(Some("Revenue"), Some("Actual")).context_display(), "Revenue @ Actual");
        assert_eq!(alert(Some("Revenue 2024"), Some("2024")).context_display(), "Revenue 2024");
        assert_eq!(alert(Some("Revenue"), Some("2024-04")).context_display(), "Revenue");
        assert_eq!(alert(Some("Revenue"), Some("FY 2024")).context_display(), "Revenue");
        assert_eq!(alert(None, Some("Q3")).context_display(), "Q3");
        assert_eq!(alert(None, None).context_display(), "");
        let long = "Depreciation of leased equipment (straight line)";
        assert_eq!(alert(Some(long), Some("Actual")).context_display(), long);
    }

    #[test]
    fn test_display_and_id() {
        let a = alert(None, None);
        insta::assert_snapshot!(a.to_string(), @"[High] Hidden Hardcode at Plan!F4: Hardcoded value '201.26' in formula");
        assert_eq!(a.id(), "Plan_F4_HiddenHardcode");
    }

    #[test]
    fn test_workbook_wide_alert_has_no_cells() {
        let a = RiskAlert::workbook_wide(
            RiskKind::CircularReference,
            Severity::Critical,
            "150 circular references detected (showing first 100)",
            RiskDetails::CircularSummary {
                total: 150,
                reported: 100,
                exhaustive: true,
            },
        );
        assert!(a.anchor().is_none());
        assert_eq!(a.qualified_location(), "Multiple!Multiple");
    }
}
