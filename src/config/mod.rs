//! Configuration module for sheet-audit.
//!
//! This module provides a unified configuration system with:
//! - Type-safe configuration structures
//! - Validation for all configuration values
//! - Named presets for common use cases
//! - YAML config file loading and discovery
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use sheet_audit::config::{AuditConfig, ConfigPreset};
//!
//! // Use defaults
//! let config = AuditConfig::default();
//!
//! // Use a preset
//! let config = AuditConfig::from_preset(ConfigPreset::Strict);
//!
//! // Use builder
//! let config = AuditConfig::builder()
//!     .allowed_constants(vec![100.0])
//!     .key_columns("Plan", &["A", "B"])
//!     .build();
//!
//! // Load from file
//! use sheet_audit::config::file::load_or_default;
//! let (config, loaded_from) = load_or_default(None, None);
//! ```
//!
//! # Configuration File
//!
//! Place a `.sheet-audit.yaml` file next to the workbook snapshot, in the
//! working directory, or in `~/.config/sheet-audit/`:
//!
//! ```yaml
//! detection:
//!   allowed_constants: [100, 1000]
//!   cross_sheet_fanout: 3
//! matching:
//!   key_columns:
//!     Plan: [A, B]
//! ```

mod defaults;
pub mod file;
mod types;
mod validation;

pub use defaults::{
    ConfigPreset, DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_CACHE_TTL_SECS, DEFAULT_MAX_CELLS,
    DEFAULT_MAX_RANGE_EXPANSION, DEFAULT_MAX_REPORTED_CYCLES, DEFAULT_MAX_ROWS,
    DEFAULT_TIMEOUT_SECS,
};
pub use types::{
    AuditConfig, AuditConfigBuilder, BuilderConfig, CacheConfig, DetectionConfig, ImpactConfig,
    LabelingConfig, MatchingConfig,
};
pub use validation::{ConfigError, Validatable};

pub use file::{
    discover_config_file, generate_example_config, load_config_file, load_or_default,
    ConfigFileError,
};

/// Generate a JSON Schema for the `AuditConfig` configuration format.
///
/// This schema documents all configuration options that can be set in
/// `.sheet-audit.yaml` config files. It can be used by editors for
/// validation and autocompletion.
#[must_use]
pub fn generate_json_schema() -> String {
    let schema = schemars::schema_for!(AuditConfig);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_schema_lists_sections() {
        let schema = generate_json_schema();
        assert!(schema.contains("\"builder\""));
        assert!(schema.contains("\"key_columns\""));
    }
}
