//! Configuration types for sheet-audit.
//!
//! Every threshold the detectors, tracer and matcher use is a product choice
//! rather than a correctness requirement, so all of them live here.

use crate::risk::RiskKind;
use crate::utils::content_hash;
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::defaults::{
    DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_CACHE_TTL_SECS, DEFAULT_MAX_CELLS,
    DEFAULT_MAX_RANGE_EXPANSION, DEFAULT_MAX_REPORTED_CYCLES, DEFAULT_MAX_ROWS,
    DEFAULT_TIMEOUT_SECS,
};

// ============================================================================
// Unified Configuration
// ============================================================================

/// Top-level configuration for an analysis run.
///
/// Can be built in code, loaded from a `.sheet-audit.yaml` file, or both
/// (with [`AuditConfig::merge`] layering explicit settings over the file).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AuditConfig {
    /// Model building limits
    pub builder: BuilderConfig,
    /// Risk detector thresholds
    pub detection: DetectionConfig,
    /// Row/column label resolution
    pub labeling: LabelingConfig,
    /// Literal impact scoring
    pub impact: ImpactConfig,
    /// Row matching between versions
    pub matching: MatchingConfig,
    /// Analysis result caching
    pub cache: CacheConfig,
}

impl AuditConfig {
    /// Create a new `AuditConfig` with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an `AuditConfig` builder.
    pub fn builder() -> AuditConfigBuilder {
        AuditConfigBuilder::default()
    }

    /// Stable hash of the active configuration.
    ///
    /// Two configurations with the same fingerprint produce identical analysis
    /// results for the same workbook, which makes it usable as a cache key.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        let serialized = serde_json::to_vec(self).unwrap_or_default();
        content_hash(&serialized)
    }
}

// ============================================================================
// Builder for AuditConfig
// ============================================================================

/// Builder for constructing `AuditConfig` with fluent API.
#[derive(Debug, Default)]
#[must_use]
pub struct AuditConfigBuilder {
    config: AuditConfig,
}

impl AuditConfigBuilder {
    /// Set the parse timeout in seconds.
    pub const fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.builder.timeout_secs = secs;
        self
    }

    /// Set the hard cap on non-empty cells.
    pub const fn max_cells(mut self, max: usize) -> Self {
        self.config.builder.max_cells = max;
        self
    }

    /// Set the per-sheet row cap.
    pub const fn max_rows(mut self, max: u32) -> Self {
        self.config.builder.max_rows = max;
        self
    }

    /// Set the literal allow-list for hidden hardcode detection.
    pub fn allowed_constants(mut self, constants: Vec<f64>) -> Self {
        self.config.detection.allowed_constants = constants;
        self
    }

    /// Set the number of disagreeing cells that makes a row-pattern break High.
    pub const fn row_pattern_high_threshold(mut self, cells: usize) -> Self {
        self.config.detection.row_pattern_high_threshold = cells;
        self
    }

    /// Set the number of external sheets a formula may touch before it is flagged.
    pub const fn cross_sheet_fanout(mut self, sheets: usize) -> Self {
        self.config.detection.cross_sheet_fanout = sheets;
        self
    }

    /// Restrict the detectors that run.
    pub fn enabled_detectors(mut self, kinds: Vec<RiskKind>) -> Self {
        self.config.detection.enabled_detectors = kinds;
        self
    }

    /// Run detectors in parallel.
    pub const fn parallel(mut self, parallel: bool) -> Self {
        self.config.detection.parallel = parallel;
        self
    }

    /// Restrict label scanning to a column range such as `"A:D"`.
    pub fn label_columns(mut self, range: impl Into<String>) -> Self {
        self.config.labeling.label_columns = Some(range.into());
        self
    }

    /// Enable or disable external label recovery.
    pub const fn label_recovery(mut self, enabled: bool) -> Self {
        self.config.labeling.recovery_enabled = enabled;
        self
    }

    /// Set the key columns used to match rows of `sheet` across versions.
    pub fn key_columns(mut self, sheet: impl Into<String>, columns: &[&str]) -> Self {
        self.config.matching.key_columns.insert(
            sheet.into(),
            columns.iter().map(|c| (*c).to_string()).collect(),
        );
        self
    }

    /// Enable fuzzy key matching for unmatched rows.
    pub const fn fuzzy_threshold(mut self, threshold: f64) -> Self {
        self.config.matching.fuzzy_threshold = Some(threshold);
        self
    }

    /// Enable or disable result caching.
    pub const fn cache(mut self, enabled: bool) -> Self {
        self.config.cache.enabled = enabled;
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> AuditConfig {
        self.config
    }
}

// ============================================================================
// Model Builder Configuration
// ============================================================================

/// Limits guarding the model builder against pathological inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct BuilderConfig {
    /// Wall-clock budget for building the model, in seconds
    pub timeout_secs: u64,
    /// Maximum number of non-empty cells across all sheets
    pub max_cells: usize,
    /// Maximum number of rows read per sheet
    pub max_rows: u32,
    /// Ranges larger than this are kept as a single dependency without per-cell edges
    pub max_range_expansion: u64,
    /// Functions whose target is computed at runtime
    pub dynamic_functions: Vec<String>,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_cells: DEFAULT_MAX_CELLS,
            max_rows: DEFAULT_MAX_ROWS,
            max_range_expansion: DEFAULT_MAX_RANGE_EXPANSION,
            dynamic_functions: vec![
                "INDIRECT".to_string(),
                "OFFSET".to_string(),
                "ADDRESS".to_string(),
            ],
        }
    }
}

impl BuilderConfig {
    /// Timeout as a `Duration`.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Whether `function` (case-insensitive) is a dynamic-indirection function.
    #[must_use]
    pub fn is_dynamic_function(&self, function: &str) -> bool {
        self.dynamic_functions
            .iter()
            .any(|f| f.eq_ignore_ascii_case(function))
    }
}

// ============================================================================
// Detection Configuration
// ============================================================================

/// Thresholds for the structural risk detectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DetectionConfig {
    /// Numeric literals that are never reported as hidden hardcodes
    pub allowed_constants: Vec<f64>,
    /// Literals common enough that a hardcode of them is only Low severity
    pub common_literals: Vec<f64>,
    /// Minimum formula cells in a row before the row pattern is checked
    pub row_pattern_min_cells: usize,
    /// Share of the row the dominant pattern must hold (0.0-1.0)
    pub row_pattern_majority: f64,
    /// Disagreeing cells at which a row-pattern break becomes High
    pub row_pattern_high_threshold: usize,
    /// Minimum cells sharing a label before values are compared
    pub value_conflict_min_cells: usize,
    /// Share the dominant value must hold under one label (0.0-1.0)
    pub value_conflict_majority: f64,
    /// Distinct external sheets a formula may reference before it is flagged
    pub cross_sheet_fanout: usize,
    /// Maximum circular references reported individually
    pub max_reported_cycles: usize,
    /// Detectors to run (empty means none)
    pub enabled_detectors: Vec<RiskKind>,
    /// Run detectors in parallel
    pub parallel: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            allowed_constants: Vec::new(),
            common_literals: vec![0.0, 1.0, 12.0],
            row_pattern_min_cells: 3,
            row_pattern_majority: 0.7,
            row_pattern_high_threshold: 2,
            value_conflict_min_cells: 3,
            value_conflict_majority: 0.7,
            cross_sheet_fanout: 2,
            max_reported_cycles: DEFAULT_MAX_REPORTED_CYCLES,
            enabled_detectors: RiskKind::detectable().to_vec(),
            parallel: true,
        }
    }
}

impl DetectionConfig {
    /// Whether `value` is on the allow-list.
    #[must_use]
    pub fn is_allowed(&self, value: f64) -> bool {
        contains_value(&self.allowed_constants, value)
    }

    /// Whether `value` is one of the universally common literals.
    #[must_use]
    pub fn is_common(&self, value: f64) -> bool {
        contains_value(&self.common_literals, value)
    }

    /// Whether the detector for `kind` should run.
    #[must_use]
    pub fn is_enabled(&self, kind: RiskKind) -> bool {
        self.enabled_detectors.contains(&kind)
    }
}

fn contains_value(values: &[f64], value: f64) -> bool {
    values.iter().any(|v| (v - value).abs() < f64::EPSILON)
}

// ============================================================================
// Labeling Configuration
// ============================================================================

/// Controls how human-readable row and column labels are resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct LabelingConfig {
    /// Column range scanned for row labels, e.g. `"A:D"` (default: all columns left of the cell)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_columns: Option<String>,
    /// Rows scanned upward when no label is found to the left
    pub max_rows_up: u32,
    /// Header rows scanned for period column labels
    pub header_rows: u32,
    /// Consult the external label recovery source when one is supplied
    pub recovery_enabled: bool,
    /// Risk kinds for which recovery is attempted
    pub recovery_kinds: Vec<RiskKind>,
}

impl Default for LabelingConfig {
    fn default() -> Self {
        Self {
            label_columns: None,
            max_rows_up: 3,
            header_rows: 20,
            recovery_enabled: true,
            recovery_kinds: vec![
                RiskKind::HiddenHardcode,
                RiskKind::InconsistentFormula,
                RiskKind::InconsistentValue,
                RiskKind::ValueConflict,
            ],
        }
    }
}

// ============================================================================
// Impact Configuration
// ============================================================================

/// Weights and prescription thresholds for literal impact scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ImpactConfig {
    /// Weight of normalized diffusion in the combined score
    pub diffusion_weight: f64,
    /// Weight of normalized dominance in the combined score
    pub dominance_weight: f64,
    /// Diffusion above which centralization is prescribed
    pub centralization_diffusion: usize,
    /// Dominance above which driver decomposition is prescribed
    pub decomposition_dominance: usize,
    /// Distinct literals in one row that make it volatile
    pub volatility_distinct: usize,
}

impl Default for ImpactConfig {
    fn default() -> Self {
        Self {
            diffusion_weight: 0.5,
            dominance_weight: 0.5,
            centralization_diffusion: 3,
            decomposition_dominance: 50,
            volatility_distinct: 3,
        }
    }
}

// ============================================================================
// Matching Configuration
// ============================================================================

/// Row matching between two versions of a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct MatchingConfig {
    /// Key columns per sheet, e.g. `{"Plan": ["A", "B"]}`
    pub key_columns: IndexMap<String, Vec<String>>,
    /// Key uniqueness (0.0-1.0) below which a warning is raised
    pub min_uniqueness: f64,
    /// Similarity (0.0-1.0) for fuzzy matching of leftover rows (disabled when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuzzy_threshold: Option<f64>,
    /// Maximum duplicate keys listed in a uniqueness warning
    pub max_duplicate_samples: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            key_columns: IndexMap::new(),
            min_uniqueness: 1.0,
            fuzzy_threshold: None,
            max_duplicate_samples: 10,
        }
    }
}

impl MatchingConfig {
    /// Key columns configured for `sheet`, if any.
    #[must_use]
    pub fn keys_for(&self, sheet: &str) -> Option<&[String]> {
        self.key_columns
            .get(sheet)
            .map(Vec::as_slice)
            .filter(|cols| !cols.is_empty())
    }
}

// ============================================================================
// Cache Configuration
// ============================================================================

/// Analysis result cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether cached results are used
    pub enabled: bool,
    /// Maximum cached analyses
    pub max_entries: usize,
    /// Time-to-live of a cached analysis, in seconds
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }
}

impl CacheConfig {
    /// Time-to-live as a `Duration`.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}
