//! Property-based tests for addresses, formulas and alert compression.
//!
//! Ensures the parsers handle arbitrary input without panicking, and that
//! key invariants hold across random inputs.

use proptest::prelude::*;
use sheet_audit::builder::{relative_pattern, tokenize, TokenKind};
use sheet_audit::model::{
    column_from_letters, column_to_letters, CellAddress, CellKey, CellRange, Reference, MAX_COL,
    MAX_ROW,
};
use sheet_audit::risk::{compress_alerts, RiskAlert, RiskDetails, RiskKind, Severity};
use std::collections::HashSet;

fn hardcode_at(address: CellAddress) -> RiskAlert {
    RiskAlert::new(
        RiskKind::HiddenHardcode,
        Severity::High,
        "Plan",
        address,
        "Hardcoded value '1.1' in formula",
        RiskDetails::HiddenHardcode {
            formula: "=A1*1.1".to_string(),
            value: "1.1".to_string(),
            values: vec!["1.1".to_string()],
        },
    )
}

proptest! {
    // 1000 cases because address checks are fast and benefit from broad coverage.
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn address_roundtrip(row in 1..=MAX_ROW, col in 1..=MAX_COL) {
        let address = CellAddress::new(row, col);
        let text = address.to_string();
        prop_assert_eq!(CellAddress::parse(&text), Some(address));
        prop_assert_eq!(CellAddress::parse(&text.to_lowercase()), Some(address));
        prop_assert_eq!(CellAddress::parse(&format!("${}${}", column_to_letters(col), row)), Some(address));
    }

    #[test]
    fn column_letters_roundtrip(col in 1..=MAX_COL) {
        prop_assert_eq!(column_from_letters(&column_to_letters(col)), Some(col));
    }

    #[test]
    fn address_parse_doesnt_panic(s in "\\PC{0,40}") {
        if let Some(address) = CellAddress::parse(&s) {
            prop_assert!((1..=MAX_ROW).contains(&address.row));
            prop_assert!((1..=MAX_COL).contains(&address.col));
        }
        let _ = CellRange::parse(&s);
        let _ = CellKey::parse(&s);
        let _ = Reference::parse(&s);
    }

    #[test]
    fn cell_key_roundtrip(sheet in "[A-Za-z][A-Za-z0-9 _]{0,15}", row in 1..=MAX_ROW, col in 1..=MAX_COL) {
        let key = CellKey::new(sheet, CellAddress::new(row, col));
        prop_assert_eq!(CellKey::parse(&key.to_string()), Some(key));
    }

    #[test]
    fn range_is_normalized(r1 in 1u32..500, c1 in 1u32..50, r2 in 1u32..500, c2 in 1u32..50) {
        let range = CellRange::new(CellAddress::new(r1, c1), CellAddress::new(r2, c2));
        prop_assert!(range.start.row <= range.end.row);
        prop_assert!(range.start.col <= range.end.col);
        prop_assert_eq!(range.size(), u64::from(r1.abs_diff(r2) + 1) * u64::from(c1.abs_diff(c2) + 1));
        prop_assert!(range.contains(&CellAddress::new(r1, c1)));
        prop_assert!(range.contains(&CellAddress::new(r2, c2)));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn tokenizer_doesnt_panic(formula in "=\\PC{0,120}") {
        let tokens = tokenize(&formula);
        for token in tokens.iter().filter(|t| t.kind == TokenKind::Reference) {
            let _ = token.reference();
        }
        let _ = relative_pattern(&formula, CellAddress::new(8, 6));
    }

    #[test]
    fn relative_pattern_is_translation_invariant(
        row in 1u32..100,
        col in 1u32..20,
        dr in 0u32..50,
        dc in 0u32..10,
        k in 2u32..99,
    ) {
        // a formula and its copy shifted by (dr, dc) share a pattern
        let target = CellAddress::new(row, col);
        let origin = CellAddress::new(row + 3, col + 1);
        let moved_target = CellAddress::new(row + dr, col + dc);
        let moved_origin = CellAddress::new(row + 3 + dr, col + 1 + dc);
        prop_assert_eq!(
            relative_pattern(&format!("={target}*{k}"), origin),
            relative_pattern(&format!("={moved_target}*{k}"), moved_origin)
        );
    }

    #[test]
    fn compression_keeps_every_instance_and_only_merges_neighbours(
        cells in prop::collection::hash_set((1u32..30, 1u32..8), 1..40)
    ) {
        let alerts: Vec<RiskAlert> = cells
            .iter()
            .map(|&(row, col)| hardcode_at(CellAddress::new(row, col)))
            .collect();
        let compressed = compress_alerts(alerts);

        let total: usize = compressed.iter().map(|a| a.instance_count).sum();
        prop_assert_eq!(total, cells.len());

        let mut covered = HashSet::new();
        for alert in &compressed {
            for cell in &alert.cells {
                prop_assert!(covered.insert(*cell), "cell {} in two alerts", cell);
            }
            // every member of a merged alert touches another member
            if alert.cells.len() > 1 {
                for cell in &alert.cells {
                    prop_assert!(alert.cells.iter().any(|other| other != cell && other.is_adjacent(cell)));
                }
            }
        }
        // separate alerts never touch
        for (i, a) in compressed.iter().enumerate() {
            for b in &compressed[i + 1..] {
                for cell in &a.cells {
                    prop_assert!(b.cells.iter().all(|other| !other.is_adjacent(cell)));
                }
            }
        }
    }
}
