//! Folding of repeated findings into grouped alerts.
//!
//! Alerts of the same kind and grouping key merge only when they touch: each
//! member must be an 8-neighbour (row and column gap of at most one) of
//! another member. Occurrences further apart stay separate so the layout of
//! the model is not hidden.

use super::alert::{RiskAlert, RiskDetails, RiskKind};
use crate::model::CellAddress;
use indexmap::IndexMap;
use std::collections::HashMap;

/// What alerts must share before they may merge.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum GroupKey {
    Hardcode { sheet: String, value: String },
    ExternalLink { sheet: String },
    RowPattern { sheet: String, row: u32 },
    Conflict { kind: RiskKind, sheet: String },
    /// Never merged
    Unique(usize),
}

fn group_key(position: usize, alert: &RiskAlert) -> GroupKey {
    let sheet = alert.sheet.clone();
    let Some(anchor) = alert.anchor() else {
        return GroupKey::Unique(position);
    };
    match (&alert.kind, &alert.details) {
        (RiskKind::HiddenHardcode, RiskDetails::HiddenHardcode { value, .. }) => {
            GroupKey::Hardcode {
                sheet,
                value: value.clone(),
            }
        }
        (RiskKind::ExternalLink, _) => GroupKey::ExternalLink { sheet },
        (RiskKind::InconsistentFormula, _) => GroupKey::RowPattern {
            sheet,
            row: anchor.row,
        },
        (RiskKind::ValueConflict | RiskKind::InconsistentValue, _) => GroupKey::Conflict {
            kind: alert.kind,
            sheet,
        },
        _ => GroupKey::Unique(position),
    }
}

/// Location text for a cluster: `F4`, `F4, F5` or `F4:F8`.
#[must_use]
pub fn format_location(cells: &[CellAddress]) -> String {
    match cells {
        [] => "Multiple".to_string(),
        [one] => one.to_string(),
        [a, b] => format!("{a}, {b}"),
        [first, .., last] => format!("{first}:{last}"),
    }
}

fn find(parent: &mut Vec<usize>, x: usize) -> usize {
    if parent[x] != x {
        parent[x] = find(parent, parent[x]); // path compression
    }
    parent[x]
}

fn union(parent: &mut Vec<usize>, rank: &mut [u8], a: usize, b: usize) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        if rank[ra] < rank[rb] {
            parent[ra] = rb;
        } else if rank[ra] > rank[rb] {
            parent[rb] = ra;
        } else {
            parent[rb] = ra;
            rank[ra] += 1;
        }
    }
}

/// Split group members (indices into `alerts`) into touching clusters.
fn clusters(alerts: &[RiskAlert], members: &[usize]) -> Vec<Vec<usize>> {
    let mut parent: Vec<usize> = (0..members.len()).collect();
    let mut rank = vec![0u8; members.len()];

    let mut at: HashMap<CellAddress, usize> = HashMap::with_capacity(members.len());
    for (i, &m) in members.iter().enumerate() {
        for cell in &alerts[m].cells {
            at.entry(*cell).or_insert(i);
        }
    }
    for (i, &m) in members.iter().enumerate() {
        for cell in &alerts[m].cells {
            for dr in -1i64..=1 {
                for dc in -1i64..=1 {
                    let neighbour = cell
                        .offset(dr, dc)
                        .and_then(|n| at.get(&n).copied());
                    if let Some(j) = neighbour {
                        union(&mut parent, &mut rank, i, j);
                    }
                }
            }
        }
    }

    let mut by_root: IndexMap<usize, Vec<usize>> = IndexMap::new();
    for (i, &m) in members.iter().enumerate() {
        let root = find(&mut parent, i);
        by_root.entry(root).or_default().push(m);
    }
    by_root.into_values().collect()
}

fn merge(mut group: Vec<RiskAlert>) -> Option<RiskAlert> {
    if group.len() <= 1 {
        return group.pop();
    }
    group.sort_by_key(|a| a.anchor());
    let count = group.len();
    let severity = group.iter().map(|a| a.severity).max()?;
    let impact_count = group.iter().map(|a| a.impact_count).sum();
    let instance_count = group.iter().map(|a| a.instance_count).sum();
    let mut cells: Vec<CellAddress> = group.iter().flat_map(|a| a.cells.iter().copied()).collect();
    cells.sort_unstable();
    cells.dedup();

    let mut first = group.swap_remove(0);
    first.description = match (&first.kind, &first.details) {
        (RiskKind::HiddenHardcode, RiskDetails::HiddenHardcode { value, .. }) => {
            format!("Hardcoded value '{value}' ({count} instances)")
        }
        (RiskKind::ExternalLink, _) => format!("External link detected ({count} instances)"),
        (RiskKind::InconsistentFormula, _) => format!("{} ({count} instances)", first.description),
        (RiskKind::ValueConflict | RiskKind::InconsistentValue, _) => {
            format!("Conflicting values detected ({count} instances)")
        }
        (kind, _) => format!("{kind} ({count} instances)"),
    };
    first.severity = severity;
    first.location = format_location(&cells);
    first.cells = cells;
    first.impact_count = impact_count;
    first.instance_count = instance_count;
    Some(first)
}

/// Merge touching alerts that share a grouping key.
///
/// Hidden hardcodes group by sheet and value, external links by sheet,
/// row-pattern breaks by sheet and row, value conflicts by sheet. Other kinds
/// pass through untouched. Impact and instance counts of merged alerts are
/// summed.
#[must_use]
pub fn compress_alerts(alerts: Vec<RiskAlert>) -> Vec<RiskAlert> {
    let before = alerts.len();
    let mut groups: IndexMap<GroupKey, Vec<usize>> = IndexMap::new();
    for (i, alert) in alerts.iter().enumerate() {
        groups.entry(group_key(i, alert)).or_default().push(i);
    }

    let plan: Vec<Vec<usize>> = groups
        .values()
        .flat_map(|members| clusters(&alerts, members))
        .collect();

    let mut slots: Vec<Option<RiskAlert>> = alerts.into_iter().map(Some).collect();
    let compressed: Vec<RiskAlert> = plan
        .into_iter()
        .filter_map(|cluster| {
            let group: Vec<RiskAlert> = cluster.into_iter().filter_map(|i| slots[i].take()).collect();
            merge(group)
        })
        .collect();

    tracing::debug!(before, after = compressed.len(), "alerts compressed");
    compressed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::alert::Severity;

    fn hardcode(addr: &str, value: &str, impact: usize) -> RiskAlert {
        let mut alert = RiskAlert::new(
            RiskKind::HiddenHardcode,
            Severity::High,
            "Plan",
            CellAddress::parse(addr).unwrap(),
            format!("Hardcoded value '{value}' in formula"),
            RiskDetails::HiddenHardcode {
                formula: format!("=A1*{value}"),
                value: value.to_string(),
                values: vec![value.to_string()],
            },
        );
        alert.impact_count = impact;
        alert
    }

    #[test]
    fn test_adjacent_occurrences_merge_with_summed_counts() {
        let alerts = vec![
            hardcode("F8", "201.26", 2),
            hardcode("F9", "201.26", 1),
            hardcode("F10", "201.26", 0),
        ];
        let out = compress_alerts(alerts);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].location, "F8:F10");
        assert_eq!(out[0].instance_count, 3);
        assert_eq!(out[0].impact_count, 3);
        assert_eq!(out[0].description, "Hardcoded value '201.26' (3 instances)");
    }

    #[test]
    fn test_distant_occurrences_stay_separate() {
        let alerts = vec![hardcode("F4", "201.26", 0), hardcode("F24", "201.26", 0)];
        let out = compress_alerts(alerts);
        assert_eq!(out.len(), 2);
        let alerts = vec![hardcode("F4", "201.26", 0), hardcode("BN4", "201.26", 0)];
        assert_eq!(compress_alerts(alerts).len(), 2);
    }

    #[test]
    fn test_diagonal_neighbours_merge_but_values_do_not_mix() {
        let alerts = vec![
            hardcode("B2", "5", 0),
            hardcode("C3", "5", 0),
            hardcode("B3", "7", 0),
        ];
        let out = compress_alerts(alerts);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].location, "B2, C3");
        assert_eq!(out[1].location, "B3");
    }

    #[test]
    fn test_chain_links_through_middle_member() {
        // B2 and B4 touch only through B3, listed last
        let alerts = vec![hardcode("B2", "5", 0), hardcode("B4", "5", 0), hardcode("B3", "5", 0)];
        let out = compress_alerts(alerts);
        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0].cells,
            vec![CellAddress::new(2, 2), CellAddress::new(3, 2), CellAddress::new(4, 2)]
        );
    }

    #[test]
    fn test_unique_kinds_pass_through() {
        let error = |addr: &str| {
            RiskAlert::new(
                RiskKind::FormulaError,
                Severity::Critical,
                "Plan",
                CellAddress::parse(addr).unwrap(),
                "#REF!: Reference to deleted cell or sheet",
                RiskDetails::FormulaError {
                    code: "#REF!".to_string(),
                    description: "Reference to deleted cell or sheet".to_string(),
                    formula: None,
                },
            )
        };
        assert_eq!(compress_alerts(vec![error("A1"), error("A2")]).len(), 2);
    }

    #[test]
    fn test_format_location() {
        let a = CellAddress::new(4, 6);
        let b = CellAddress::new(5, 6);
        assert_eq!(format_location(&[a]), "F4");
        assert_eq!(format_location(&[a, b]), "F4, F5");
        assert_eq!(format_location(&[a, b, CellAddress::new(6, 6)]), "F4:F6");
    }
}
