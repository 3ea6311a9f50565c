//! Pipeline integration tests.
//!
//! These tests exercise the full load → analyze → compare pipeline, the
//! analysis cache, and error paths with snapshot files written to disk.

use sheet_audit::config::AuditConfig;
use sheet_audit::error::AuditError;
use sheet_audit::model::Workbook;
use sheet_audit::risk::RiskKind;
use sheet_audit::{analyze, analyze_cached, compare, AnalysisCache};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

// ============================================================================
// Test Fixtures
// ============================================================================

const PLAN_V1: &str = r#"{
    "sheets": [{
        "name": "Plan",
        "cells": [
            {"address": "A1", "value": "Line item"},
            {"address": "B1", "value": "FY24"},
            {"address": "A2", "value": "Revenue"},
            {"address": "B2", "value": 1000},
            {"address": "A3", "value": "Cost"},
            {"address": "B3", "formula": "=B2*0.6", "value": 600},
            {"address": "A4", "value": "Margin"},
            {"address": "B4", "formula": "=B2-B3", "value": 400}
        ]
    }]
}"#;

const PLAN_V2: &str = r#"{
    "sheets": [{
        "name": "Plan",
        "cells": [
            {"address": "A1", "value": "Line item"},
            {"address": "B1", "value": "FY24"},
            {"address": "A2", "value": "Revenue"},
            {"address": "B2", "value": 1200},
            {"address": "A3", "value": "Cost ratio"},
            {"address": "B3", "value": 0.6},
            {"address": "A4", "value": "Cost"},
            {"address": "B4", "formula": "=B2*B3", "value": 720},
            {"address": "A5", "value": "Margin"},
            {"address": "B5", "formula": "=B2-B4", "value": 480}
        ]
    }]
}"#;

fn write_snapshot(dir: &TempDir, name: &str, json: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, json).expect("write snapshot");
    path
}

fn load(path: &Path) -> Workbook {
    Workbook::from_json_file(path).expect("snapshot should load")
}

// ============================================================================
// Load Stage Tests
// ============================================================================

mod load_stage {
    use super::*;

    #[test]
    fn load_snapshot_from_disk() {
        let dir = TempDir::new().expect("temp dir");
        let path = write_snapshot(&dir, "v1.json", PLAN_V1);
        let workbook = load(&path);

        assert_eq!(workbook.sheets.len(), 1);
        assert_eq!(workbook.cell_count(), 8);
    }

    #[test]
    fn missing_snapshot_is_io_error() {
        let err = Workbook::from_json_file(Path::new("/nonexistent/model.json")).unwrap_err();
        assert!(matches!(err, AuditError::Io { .. }), "{err}");
    }

    #[test]
    fn malformed_snapshot_names_the_file() {
        let dir = TempDir::new().expect("temp dir");
        let path = write_snapshot(&dir, "broken.json", "{\"sheets\": [");
        let err = Workbook::from_json_file(&path).unwrap_err();
        assert!(err.to_string().contains("broken.json"), "{err}");
    }
}

// ============================================================================
// Analysis Stage Tests
// ============================================================================

mod analysis_stage {
    use super::*;

    #[test]
    fn analyze_reports_hardcoded_ratio() {
        let dir = TempDir::new().expect("temp dir");
        let workbook = load(&write_snapshot(&dir, "v1.json", PLAN_V1));
        let analysis = analyze(&workbook, &AuditConfig::default()).expect("analysis");

        let hardcodes: Vec<_> = analysis.report.of_kind(RiskKind::HiddenHardcode).collect();
        assert_eq!(hardcodes.len(), 1);
        assert_eq!(hardcodes[0].location, "B3");
        assert_eq!(hardcodes[0].row_label.as_deref(), Some("Cost"));
        assert!(analysis.health_score() < 100);
        assert!(!analysis.report.partial);
    }

    #[test]
    fn empty_workbook_fails() {
        let err = analyze(&Workbook::new(), &AuditConfig::default()).unwrap_err();
        assert!(matches!(err, AuditError::Build { .. }));
    }

    #[test]
    fn cell_limit_is_a_resource_error() {
        let dir = TempDir::new().expect("temp dir");
        let workbook = load(&write_snapshot(&dir, "v1.json", PLAN_V1));
        let config = AuditConfig::builder().max_cells(4).build();
        let err = analyze(&workbook, &config).unwrap_err();
        assert!(err.is_resource_limit());
        let cause = std::error::Error::source(&err).expect("limit detail").to_string();
        assert!(cause.contains("builder.max_cells"), "{cause}");
    }
}

// ============================================================================
// Cache Tests
// ============================================================================

mod cache {
    use super::*;

    #[test]
    fn unchanged_workbook_is_served_from_cache() {
        let dir = TempDir::new().expect("temp dir");
        let workbook = load(&write_snapshot(&dir, "v1.json", PLAN_V1));
        let config = AuditConfig::default();
        let cache = AnalysisCache::new(&config.cache);

        let first = analyze_cached(&workbook, &config, &cache).expect("analysis");
        let second = analyze_cached(&workbook, &config, &cache).expect("analysis");
        assert!(Arc::ptr_eq(&first, &second));

        let stats = cache.stats();
        assert_eq!(stats.lookups, 2);
        assert_eq!(stats.hits, 1);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn edited_workbook_or_config_misses() {
        let config = AuditConfig::default();
        let cache = AnalysisCache::new(&config.cache);
        let v1 = Workbook::from_json_str(PLAN_V1).expect("v1");
        let v2 = Workbook::from_json_str(PLAN_V2).expect("v2");

        analyze_cached(&v1, &config, &cache).expect("analysis");
        analyze_cached(&v2, &config, &cache).expect("analysis");
        let strict = AuditConfig::builder().cross_sheet_fanout(1).build();
        analyze_cached(&v1, &strict, &cache).expect("analysis");

        assert_eq!(cache.stats().hits, 0);
        assert_eq!(cache.len(), 3);
    }
}

// ============================================================================
// Compare Stage Tests
// ============================================================================

mod compare_stage {
    use super::*;
    use sheet_audit::diff::ChangeKind;

    #[test]
    fn extracting_an_assumption_resolves_the_hardcode() {
        let dir = TempDir::new().expect("temp dir");
        let config = AuditConfig::builder().key_columns("Plan", &["A"]).build();
        let old = analyze(&load(&write_snapshot(&dir, "v1.json", PLAN_V1)), &config).expect("v1");
        let new = analyze(&load(&write_snapshot(&dir, "v2.json", PLAN_V2)), &config).expect("v2");

        let diff = compare(&old, &new, &config.matching).expect("diff");

        assert_eq!(diff.summary.risks_resolved, 1);
        assert_eq!(diff.summary.risks_introduced, 0);
        assert!(diff.is_improved());
        assert_eq!(diff.summary.rows_added, 1);

        // Cost moved from row 3 to row 4 and its formula was rewritten
        let logic: Vec<_> = diff.changes_of(ChangeKind::Logic).collect();
        assert_eq!(logic.len(), 1);
        assert_eq!(logic[0].location, "B4");
        // Margin moved from row 4 to row 5 with the same logic, only its
        // calculated value follows the new revenue
        let inputs: Vec<_> = diff.changes_of(ChangeKind::Input).collect();
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[0].location, "B2");
        assert_eq!(inputs[0].old_value.as_deref(), Some("1000"));
        assert_eq!(inputs[0].new_value.as_deref(), Some("1200"));
        assert_eq!(inputs[1].location, "B5");
        assert_eq!(inputs[1].old_value.as_deref(), Some("400"));
        assert_eq!(inputs[1].new_value.as_deref(), Some("480"));
    }

    #[test]
    fn change_listing_is_stable() {
        let mut before = Workbook::new();
        before.add_sheet("Plan").value("A1", 1.0).formula("B1", "=A1*2");
        let mut after = Workbook::new();
        after.add_sheet("Plan").value("A1", 2.0).formula("B1", "=A1+2");
        let config = AuditConfig::default();
        let old = analyze(&before, &config).expect("old");
        let new = analyze(&after, &config).expect("new");

        let diff = compare(&old, &new, &config.matching).expect("diff");
        let listing: Vec<String> = diff.changes.iter().map(ToString::to_string).collect();
        insta::assert_snapshot!(listing.join("\n"), @r"
        [Critical] Logic change: Formula changed at Plan!B1: =A1*2 → =A1+2
        [Normal] Input update: Input at Plan!A1 changed from '1' to '2'
        ");
    }
}
