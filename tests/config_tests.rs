//! Configuration file, preset and validation tests.

use sheet_audit::analyze;
use sheet_audit::config::{
    generate_json_schema, load_config_file, AuditConfig, ConfigPreset, Validatable,
};
use sheet_audit::model::Workbook;
use sheet_audit::risk::RiskKind;
use std::path::PathBuf;
use tempfile::TempDir;

fn write_config(dir: &TempDir, yaml: &str) -> PathBuf {
    let path = dir.path().join(".sheet-audit.yaml");
    std::fs::write(&path, yaml).expect("write config");
    path
}

#[test]
fn file_settings_change_detection() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_config(
        &dir,
        "detection:\n  allowed_constants: [1.1]\ncache:\n  enabled: false\n",
    );
    let config = load_config_file(&path).expect("config should load");
    assert!(config.is_valid());
    assert!(!config.cache.enabled);

    let mut wb = Workbook::new();
    wb.add_sheet("Plan").value("A1", 10.0).formula("B1", "=A1*1.1");
    let default_run = analyze(&wb, &AuditConfig::default()).expect("analysis");
    let configured_run = analyze(&wb, &config).expect("analysis");
    assert_eq!(default_run.report.of_kind(RiskKind::HiddenHardcode).count(), 1);
    assert_eq!(configured_run.report.of_kind(RiskKind::HiddenHardcode).count(), 0);
}

#[test]
fn explicit_settings_override_the_file() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_config(
        &dir,
        "matching:\n  key_columns:\n    Plan: [A]\n  fuzzy_threshold: 0.8\n",
    );
    let overrides = AuditConfig::builder()
        .key_columns("Costs", &["B", "C"])
        .fuzzy_threshold(0.9)
        .build();

    let (config, loaded_from) = AuditConfig::from_file_with_overrides(Some(&path), &overrides);
    assert_eq!(loaded_from, Some(path));
    assert!(config.matching.keys_for("Plan").is_some());
    assert_eq!(config.matching.keys_for("Costs").map(<[String]>::len), Some(2));
    assert_eq!(config.matching.fuzzy_threshold, Some(0.9));
}

#[test]
fn invalid_file_values_are_reported_per_field() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_config(
        &dir,
        "builder:\n  max_cells: 0\nmatching:\n  min_uniqueness: 1.5\n  key_columns:\n    Plan: []\n",
    );
    let config = load_config_file(&path).expect("well-formed yaml loads");
    let mut fields: Vec<String> = config.validate().into_iter().map(|e| e.field).collect();
    fields.sort();
    assert_eq!(
        fields,
        vec![
            "builder.max_cells",
            "matching.key_columns.Plan",
            "matching.min_uniqueness"
        ]
    );
}

#[test]
fn every_preset_is_valid_and_named() {
    for preset in ConfigPreset::all() {
        let config = AuditConfig::from_preset(*preset);
        assert!(config.is_valid(), "{preset}: {:?}", config.validate());
        assert_eq!(ConfigPreset::from_name(preset.name()), Some(*preset));
        assert!(!preset.description().is_empty());
    }
}

#[test]
fn json_schema_is_valid_json() {
    let schema: serde_json::Value =
        serde_json::from_str(&generate_json_schema()).expect("schema is JSON");
    let properties = schema["properties"].as_object().expect("top-level properties");
    for section in ["builder", "detection", "labeling", "impact", "matching", "cache"] {
        assert!(properties.contains_key(section), "missing {section}");
    }
}
