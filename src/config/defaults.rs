//! Default values and named presets for sheet-audit.

use super::types::{AuditConfig, BuilderConfig, DetectionConfig, MatchingConfig};

// ============================================================================
// Default Constants
// ============================================================================

/// Seconds allowed for building a model.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Non-empty cells accepted before the build fails.
pub const DEFAULT_MAX_CELLS: usize = 100_000;

/// Rows read per sheet.
pub const DEFAULT_MAX_ROWS: u32 = 10_000;

/// Largest range expanded into per-cell edges.
pub const DEFAULT_MAX_RANGE_EXPANSION: u64 = 1_000;

/// Circular references reported individually before summarizing.
pub const DEFAULT_MAX_REPORTED_CYCLES: usize = 100;

/// Cached analyses kept in memory.
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 32;

/// Cache time-to-live (1 hour).
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

// ============================================================================
// Configuration Presets
// ============================================================================

/// Named configuration presets for common use cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigPreset {
    /// Balanced settings suitable for most models
    Default,
    /// Flags more: fewer common literals, tighter fan-out and pattern thresholds
    Strict,
    /// Flags less: generous allow-list, fuzzy row matching
    Lenient,
    /// Raised limits for very large workbooks
    LargeWorkbook,
}

impl ConfigPreset {
    /// Get the preset name as a string.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Strict => "strict",
            Self::Lenient => "lenient",
            Self::LargeWorkbook => "large-workbook",
        }
    }

    /// Parse a preset from a string name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "default" | "balanced" => Some(Self::Default),
            "strict" | "audit" => Some(Self::Strict),
            "lenient" | "permissive" | "loose" => Some(Self::Lenient),
            "large-workbook" | "large" => Some(Self::LargeWorkbook),
            _ => None,
        }
    }

    /// Get a description of this preset.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Default => "Balanced thresholds suitable for most financial models",
            Self::Strict => "Reports every literal except 0 and 1 at high severity",
            Self::Lenient => "Tolerates common constants and loosely keyed rows",
            Self::LargeWorkbook => "Raised cell, row and time limits for very large models",
        }
    }

    /// Get all available presets.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Default, Self::Strict, Self::Lenient, Self::LargeWorkbook]
    }
}

impl std::fmt::Display for ConfigPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Preset Implementations
// ============================================================================

impl AuditConfig {
    /// Create an `AuditConfig` from a named preset.
    #[must_use]
    pub fn from_preset(preset: ConfigPreset) -> Self {
        match preset {
            ConfigPreset::Default => Self::default(),
            ConfigPreset::Strict => Self::strict_preset(),
            ConfigPreset::Lenient => Self::lenient_preset(),
            ConfigPreset::LargeWorkbook => Self::large_workbook_preset(),
        }
    }

    /// Strict preset.
    ///
    /// - Only 0 and 1 count as common literals
    /// - A single foreign sheet reference is fan-out
    /// - Any two-cell row-pattern break is High
    #[must_use]
    pub fn strict_preset() -> Self {
        Self {
            detection: DetectionConfig {
                common_literals: vec![0.0, 1.0],
                cross_sheet_fanout: 1,
                row_pattern_majority: 0.6,
                value_conflict_majority: 0.6,
                ..DetectionConfig::default()
            },
            ..Self::default()
        }
    }

    /// Lenient preset.
    ///
    /// - Allow-lists the usual unit and percentage constants
    /// - Tolerates up to four foreign sheets per formula
    /// - Fuzzy-matches rows whose keys were lightly edited
    #[must_use]
    pub fn lenient_preset() -> Self {
        Self {
            detection: DetectionConfig {
                allowed_constants: vec![0.0, 1.0, 12.0, 100.0, 1000.0],
                cross_sheet_fanout: 4,
                row_pattern_high_threshold: 3,
                ..DetectionConfig::default()
            },
            matching: MatchingConfig {
                min_uniqueness: 0.95,
                fuzzy_threshold: Some(0.85),
                ..MatchingConfig::default()
            },
            ..Self::default()
        }
    }

    /// Large-workbook preset.
    ///
    /// - Ten times the cell and row caps, five minutes of build time
    /// - Smaller range expansion to keep the graph bounded
    #[must_use]
    pub fn large_workbook_preset() -> Self {
        Self {
            builder: BuilderConfig {
                timeout_secs: 300,
                max_cells: DEFAULT_MAX_CELLS * 10,
                max_rows: DEFAULT_MAX_ROWS * 10,
                max_range_expansion: 500,
                ..BuilderConfig::default()
            },
            ..Self::default()
        }
    }
}
