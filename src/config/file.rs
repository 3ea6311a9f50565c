//! Configuration file loading and discovery.
//!
//! A model usually travels with its settings, so the directory holding the
//! workbook snapshot is searched before the working directory and the user's
//! config directory.

use super::types::AuditConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ============================================================================
// Configuration File Discovery
// ============================================================================

/// Config file names, in lookup order within a directory.
const CONFIG_FILE_NAMES: &[&str] = &[".sheet-audit.yaml", ".sheet-audit.yml", "sheet-audit.yaml"];

/// Locate the config file for an analysis.
///
/// Lookup order: the explicit path (when it exists), the directory of
/// `workbook`, the current directory, then `<config dir>/sheet-audit/`.
#[must_use]
pub fn discover_config_file(explicit_path: Option<&Path>, workbook: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path.filter(|p| p.is_file()) {
        return Some(path.to_path_buf());
    }

    let beside_workbook = workbook
        .and_then(Path::parent)
        .map(|dir| if dir.as_os_str().is_empty() { Path::new(".") } else { dir });
    let candidates = beside_workbook
        .map(Path::to_path_buf)
        .into_iter()
        .chain(std::env::current_dir().ok())
        .chain(dirs::config_dir().map(|dir| dir.join("sheet-audit")));

    for dir in candidates {
        if let Some(path) = config_in_dir(&dir) {
            tracing::debug!(path = %path.display(), "config file discovered");
            return Some(path);
        }
    }
    None
}

fn config_in_dir(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

// ============================================================================
// Configuration File Loading
// ============================================================================

/// Error type for config file operations.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

impl From<ConfigFileError> for crate::error::AuditError {
    fn from(err: ConfigFileError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Load an `AuditConfig` from a YAML file.
pub fn load_config_file(path: &Path) -> Result<AuditConfig, ConfigFileError> {
    if !path.exists() {
        return Err(ConfigFileError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)?;
    let config: AuditConfig = serde_yaml::from_str(&content)?;
    Ok(config)
}

/// Load the discovered config file, or the defaults when there is none or it
/// fails to load.
#[must_use]
pub fn load_or_default(
    explicit_path: Option<&Path>,
    workbook: Option<&Path>,
) -> (AuditConfig, Option<PathBuf>) {
    discover_config_file(explicit_path, workbook).map_or_else(
        || (AuditConfig::default(), None),
        |path| match load_config_file(&path) {
            Ok(config) => (config, Some(path)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                (AuditConfig::default(), None)
            }
        },
    )
}

// ============================================================================
// Configuration Merging
// ============================================================================

impl AuditConfig {
    /// Merge another config into this one, with `other` taking precedence
    /// wherever it differs from the defaults.
    pub fn merge(&mut self, other: &Self) {
        let defaults = Self::default();

        if other.builder != defaults.builder {
            self.builder = other.builder.clone();
        }
        if other.detection != defaults.detection {
            self.detection = other.detection.clone();
        }

        if other.labeling.label_columns.is_some() {
            self.labeling
                .label_columns
                .clone_from(&other.labeling.label_columns);
        }
        if !other.labeling.recovery_enabled {
            self.labeling.recovery_enabled = false;
        }
        if other.labeling.max_rows_up != defaults.labeling.max_rows_up {
            self.labeling.max_rows_up = other.labeling.max_rows_up;
        }

        if other.impact != defaults.impact {
            self.impact = other.impact.clone();
        }

        // Key columns are additive per sheet
        for (sheet, columns) in &other.matching.key_columns {
            self.matching
                .key_columns
                .insert(sheet.clone(), columns.clone());
        }
        if other.matching.fuzzy_threshold.is_some() {
            self.matching.fuzzy_threshold = other.matching.fuzzy_threshold;
        }
        if (other.matching.min_uniqueness - defaults.matching.min_uniqueness).abs() > f64::EPSILON {
            self.matching.min_uniqueness = other.matching.min_uniqueness;
        }

        if !other.cache.enabled {
            self.cache.enabled = false;
        }
    }

    /// Load from file and merge explicit overrides on top.
    #[must_use]
    pub fn from_file_with_overrides(
        config_path: Option<&Path>,
        overrides: &Self,
    ) -> (Self, Option<PathBuf>) {
        let (mut config, loaded_from) = load_or_default(config_path, None);
        config.merge(overrides);
        (config, loaded_from)
    }

    /// Settings for analyzing the snapshot at `workbook`: a config file next
    /// to it wins over one in the working or user config directory.
    #[must_use]
    pub fn for_workbook(workbook: &Path) -> (Self, Option<PathBuf>) {
        load_or_default(None, Some(workbook))
    }
}

// ============================================================================
// Example Config Generation
// ============================================================================

/// Generate an example config file content.
#[must_use]
pub fn generate_example_config() -> String {
    let example = AuditConfig::default();
    format!(
        r"# sheet-audit configuration
# Place this file as .sheet-audit.yaml next to the workbook, or in ~/.config/sheet-audit/

{}
",
        serde_yaml::to_string(&example).unwrap_or_default()
    )
}

// ============================================================================
// Tests
// ============================================================================
