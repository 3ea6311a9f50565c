//! Configuration validation for sheet-audit.

use super::types::{
    AuditConfig, BuilderConfig, CacheConfig, DetectionConfig, ImpactConfig, LabelingConfig,
    MatchingConfig,
};
use crate::model::{column_from_letters, ColumnSpan};

// ============================================================================
// Configuration Error
// ============================================================================

/// Error type for configuration validation.
#[derive(Debug, Clone)]
pub struct ConfigError {
    /// The field that failed validation
    pub field: String,
    /// Description of the validation error
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Validation Trait
// ============================================================================

/// Trait for validatable configuration types.
pub trait Validatable {
    /// Validate the configuration, returning any errors found.
    fn validate(&self) -> Vec<ConfigError>;

    /// Check if the configuration is valid.
    fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

fn check_ratio(errors: &mut Vec<ConfigError>, field: &str, value: f64) {
    if !(0.0..=1.0).contains(&value) {
        errors.push(ConfigError::new(
            field,
            format!("Must be between 0.0 and 1.0, got {value}"),
        ));
    }
}

fn check_positive(errors: &mut Vec<ConfigError>, field: &str, value: u64) {
    if value == 0 {
        errors.push(ConfigError::new(field, "Must be greater than 0"));
    }
}

// ============================================================================
// Validation Implementations
// ============================================================================

impl Validatable for AuditConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        errors.extend(self.builder.validate());
        errors.extend(self.detection.validate());
        errors.extend(self.labeling.validate());
        errors.extend(self.impact.validate());
        errors.extend(self.matching.validate());
        errors.extend(self.cache.validate());
        errors
    }
}

impl Validatable for BuilderConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        check_positive(&mut errors, "builder.timeout_secs", self.timeout_secs);
        check_positive(&mut errors, "builder.max_cells", self.max_cells as u64);
        check_positive(&mut errors, "builder.max_rows", u64::from(self.max_rows));
        check_positive(
            &mut errors,
            "builder.max_range_expansion",
            self.max_range_expansion,
        );
        errors
    }
}

impl Validatable for DetectionConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        check_ratio(
            &mut errors,
            "detection.row_pattern_majority",
            self.row_pattern_majority,
        );
        check_ratio(
            &mut errors,
            "detection.value_conflict_majority",
            self.value_conflict_majority,
        );
        if self.row_pattern_min_cells < 2 {
            errors.push(ConfigError::new(
                "detection.row_pattern_min_cells",
                format!(
                    "A row pattern needs at least 2 cells, got {}",
                    self.row_pattern_min_cells
                ),
            ));
        }
        check_positive(
            &mut errors,
            "detection.row_pattern_high_threshold",
            self.row_pattern_high_threshold as u64,
        );
        check_positive(
            &mut errors,
            "detection.max_reported_cycles",
            self.max_reported_cycles as u64,
        );
        if let Some(bad) = self
            .allowed_constants
            .iter()
            .chain(&self.common_literals)
            .find(|v| !v.is_finite())
        {
            errors.push(ConfigError::new(
                "detection.allowed_constants",
                format!("Constants must be finite numbers, got {bad}"),
            ));
        }
        errors
    }
}

impl Validatable for LabelingConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if let Some(range) = &self.label_columns {
            if ColumnSpan::parse(range).is_none() {
                errors.push(ConfigError::new(
                    "labeling.label_columns",
                    format!("Invalid column range '{range}'. Expected e.g. A:D"),
                ));
            }
        }
        errors
    }
}

impl Validatable for ImpactConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        check_ratio(&mut errors, "impact.diffusion_weight", self.diffusion_weight);
        check_ratio(&mut errors, "impact.dominance_weight", self.dominance_weight);
        if self.diffusion_weight + self.dominance_weight <= 0.0 {
            errors.push(ConfigError::new(
                "impact",
                "At least one of diffusion_weight and dominance_weight must be positive",
            ));
        }
        check_positive(
            &mut errors,
            "impact.volatility_distinct",
            self.volatility_distinct as u64,
        );
        errors
    }
}

impl Validatable for MatchingConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        check_ratio(&mut errors, "matching.min_uniqueness", self.min_uniqueness);
        if let Some(threshold) = self.fuzzy_threshold {
            check_ratio(&mut errors, "matching.fuzzy_threshold", threshold);
        }
        for (sheet, columns) in &self.key_columns {
            if columns.is_empty() {
                errors.push(ConfigError::new(
                    format!("matching.key_columns.{sheet}"),
                    "At least one key column is required",
                ));
            }
            for column in columns {
                if column_from_letters(column).is_none() {
                    errors.push(ConfigError::new(
                        format!("matching.key_columns.{sheet}"),
                        format!("Invalid column '{column}'. Expected a letter such as A or BC"),
                    ));
                }
            }
        }
        errors
    }
}

impl Validatable for CacheConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if self.enabled {
            check_positive(&mut errors, "cache.max_entries", self.max_entries as u64);
        }
        errors
    }
}
