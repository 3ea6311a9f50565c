//! Row matching between two versions of a sheet.

use super::keys::RowKey;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use strsim::normalized_levenshtein;

/// Where a row of the old version went in the new one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowMapping {
    pub sheet: String,
    /// `None` for a row added in the new version
    pub old_row: Option<u32>,
    /// `None` for a row deleted from the old version
    pub new_row: Option<u32>,
    /// Composite key as written
    pub key: String,
    /// 1.0 for an exact key match, the similarity for a fuzzy one
    pub confidence: f64,
}

impl RowMapping {
    #[must_use]
    pub const fn is_matched(&self) -> bool {
        self.old_row.is_some() && self.new_row.is_some()
    }

    #[must_use]
    pub const fn is_added(&self) -> bool {
        self.old_row.is_none()
    }

    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.new_row.is_none()
    }

    #[must_use]
    pub fn is_fuzzy(&self) -> bool {
        self.is_matched() && self.confidence < 1.0
    }
}

/// Match old rows to new rows by key.
///
/// Exact matches go through a key → row map. With duplicate keys the first
/// occurrence on each side wins and later rows stay unmatched. When
/// `fuzzy_threshold` is set, leftover rows are paired greedily by key
/// similarity. Output lists old rows in order (matched or deleted), then
/// added rows in order.
#[must_use]
pub fn match_rows(
    sheet: &str,
    old: &[RowKey],
    new: &[RowKey],
    fuzzy_threshold: Option<f64>,
) -> Vec<RowMapping> {
    let mut new_by_key: HashMap<&str, usize> = HashMap::with_capacity(new.len());
    for (i, key) in new.iter().enumerate() {
        new_by_key.entry(key.normalized.as_str()).or_insert(i);
    }

    let mut claimed = vec![false; new.len()];
    let mut seen_old: HashSet<&str> = HashSet::with_capacity(old.len());
    let mut pairs: Vec<Option<(usize, f64)>> = vec![None; old.len()];
    let mut repeated = vec![false; old.len()];
    for (i, key) in old.iter().enumerate() {
        if !seen_old.insert(key.normalized.as_str()) {
            repeated[i] = true;
            continue;
        }
        if let Some(&j) = new_by_key.get(key.normalized.as_str()) {
            claimed[j] = true;
            pairs[i] = Some((j, 1.0));
        }
    }

    if let Some(threshold) = fuzzy_threshold {
        let exact = pairs.iter().filter(|p| p.is_some()).count();
        for (i, key) in old.iter().enumerate() {
            if pairs[i].is_some() || repeated[i] {
                continue;
            }
            let best = new
                .iter()
                .enumerate()
                .filter(|(j, _)| !claimed[*j])
                .map(|(j, candidate)| (j, normalized_levenshtein(&key.normalized, &candidate.normalized)))
                .filter(|(_, similarity)| *similarity >= threshold)
                .max_by(|a, b| a.1.total_cmp(&b.1).then_with(|| b.0.cmp(&a.0)));
            if let Some((j, similarity)) = best {
                claimed[j] = true;
                pairs[i] = Some((j, similarity));
            }
        }
        let fuzzy = pairs.iter().filter(|p| p.is_some()).count() - exact;
        tracing::debug!(sheet, exact, fuzzy, threshold, "fuzzy row matching finished");
    }

    let mut mappings: Vec<RowMapping> = old
        .iter()
        .zip(&pairs)
        .map(|(key, pair)| RowMapping {
            sheet: sheet.to_string(),
            old_row: Some(key.row),
            new_row: pair.map(|(j, _)| new[j].row),
            key: key.display.clone(),
            confidence: pair.map_or(0.0, |(_, c)| c),
        })
        .collect();
    mappings.extend(
        new.iter()
            .zip(&claimed)
            .filter(|(_, &taken)| !taken)
            .map(|(key, _)| RowMapping {
                sheet: sheet.to_string(),
                old_row: None,
                new_row: Some(key.row),
                key: key.display.clone(),
                confidence: 0.0,
            }),
    );
    mappings
}

/// Old-row → new-row translation for every sheet of a comparison.
///
/// Sheets without key columns map rows to themselves when the sheet exists
/// in both versions.
#[derive(Debug, Clone, Default)]
pub struct RowMap {
    keyed: HashMap<String, HashMap<u32, u32>>,
    identity: HashSet<String>,
}

impl RowMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the mappings of a keyed sheet.
    pub fn insert_keyed(&mut self, sheet: &str, mappings: &[RowMapping]) {
        let rows = self.keyed.entry(sheet.to_string()).or_default();
        for mapping in mappings {
            if let (Some(old), Some(new)) = (mapping.old_row, mapping.new_row) {
                rows.insert(old, new);
            }
        }
    }

    /// Compare `sheet` address by address.
    pub fn insert_identity(&mut self, sheet: &str) {
        self.identity.insert(sheet.to_string());
    }

    #[must_use]
    pub fn is_keyed(&self, sheet: &str) -> bool {
        self.keyed.contains_key(sheet)
    }

    /// Row of the new version holding what `old_row` held, if it survived.
    #[must_use]
    pub fn translate(&self, sheet: &str, old_row: u32) -> Option<u32> {
        match self.keyed.get(sheet) {
            Some(rows) => rows.get(&old_row).copied(),
            None => self.identity.contains(sheet).then_some(old_row),
        }
    }

    /// Matched `(old_row, new_row)` pairs of a keyed sheet, in old-row order.
    #[must_use]
    pub fn pairs(&self, sheet: &str) -> Vec<(u32, u32)> {
        let mut pairs: Vec<(u32, u32)> = self
            .keyed
            .get(sheet)
            .map(|rows| rows.iter().map(|(&o, &n)| (o, n)).collect())
            .unwrap_or_default();
        pairs.sort_unstable();
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::keys::normalize_key;

    fn keys(rows: &[(u32, &str)]) -> Vec<RowKey> {
        rows.iter()
            .map(|&(row, text)| RowKey {
                row,
                display: text.to_string(),
                normalized: normalize_key(text),
            })
            .collect()
    }

    fn summary(mappings: &[RowMapping]) -> Vec<(String, Option<u32>, Option<u32>)> {
        mappings
            .iter()
            .map(|m| (m.key.clone(), m.old_row, m.new_row))
            .collect()
    }

    #[test]
    fn test_inserted_row_does_not_shift_matches() {
        let old = keys(&[(2, "X"), (3, "Y"), (4, "Z")]);
        let new = keys(&[(2, "X"), (3, "W"), (4, "Y"), (5, "Z")]);
        let mappings = match_rows("Plan", &old, &new, None);
        assert_eq!(
            summary(&mappings),
            vec![
                ("X".to_string(), Some(2), Some(2)),
                ("Y".to_string(), Some(3), Some(4)),
                ("Z".to_string(), Some(4), Some(5)),
                ("W".to_string(), None, Some(3)),
            ]
        );
        assert!(mappings[3].is_added());
        assert!(mappings.iter().take(3).all(|m| m.confidence == 1.0));
    }

    #[test]
    fn test_deleted_and_duplicate_rows() {
        let old = keys(&[(2, "A"), (3, "B"), (4, "A")]);
        let new = keys(&[(2, "A")]);
        let mappings = match_rows("Plan", &old, &new, None);
        assert_eq!(mappings[0].new_row, Some(2));
        assert!(mappings[1].is_deleted());
        // second "A" loses to the first
        assert!(mappings[2].is_deleted());
    }

    #[test]
    fn test_fuzzy_pass_pairs_leftovers() {
        let old = keys(&[(2, "Marketing expenses"), (3, "Rent")]);
        let new = keys(&[(2, "Marketing expense"), (3, "Rent")]);
        let exact = match_rows("Plan", &old, &new, None);
        assert_eq!(exact.iter().filter(|m| m.is_matched()).count(), 1);

        let fuzzy = match_rows("Plan", &old, &new, Some(0.8));
        assert_eq!(fuzzy.len(), 2);
        assert!(fuzzy[0].is_fuzzy());
        assert_eq!(fuzzy[0].new_row, Some(2));
        assert!(fuzzy[0].confidence > 0.9);
    }

    #[test]
    fn test_row_map_translation() {
        let old = keys(&[(2, "X"), (3, "Y")]);
        let new = keys(&[(5, "Y"), (6, "X")]);
        let mut map = RowMap::new();
        map.insert_keyed("Plan", &match_rows("Plan", &old, &new, None));
        map.insert_identity("Notes");
        assert_eq!(map.translate("Plan", 2), Some(6));
        assert_eq!(map.translate("Plan", 9), None);
        assert_eq!(map.translate("Notes", 9), Some(9));
        assert_eq!(map.translate("Gone", 1), None);
        assert_eq!(map.pairs("Plan"), vec![(2, 6), (3, 5)]);
    }
}
