//! Merged-region parsing and virtual fill.

use super::Deadline;
use crate::error::{AuditError, Result};
use crate::model::{BuildIssue, BuildIssueKind, CellIndex, CellKey, CellRange, Sheet};

/// Parse a sheet's merged regions, recording and skipping malformed or
/// overlapping ones.
pub(super) fn parse_regions(sheet: &Sheet, issues: &mut Vec<BuildIssue>) -> Vec<CellRange> {
    let mut regions: Vec<CellRange> = Vec::new();
    for text in &sheet.merged {
        let Some(region) = CellRange::parse(text) else {
            tracing::warn!(sheet = %sheet.name, region = %text, "skipping malformed merged region");
            issues.push(BuildIssue::new(
                BuildIssueKind::MalformedRegion,
                &sheet.name,
                text,
                "expected a range such as B2:D2",
            ));
            continue;
        };
        if let Some(existing) = regions.iter().find(|r| r.overlaps(&region)) {
            tracing::warn!(sheet = %sheet.name, region = %text, "skipping overlapping merged region");
            issues.push(BuildIssue::new(
                BuildIssueKind::OverlappingRegion,
                &sheet.name,
                text,
                format!("overlaps {existing}"),
            ));
            continue;
        }
        regions.push(region);
    }
    regions
}

/// Materialize a virtual cell at every non-anchor coordinate of each region.
///
/// Must run before dependency extraction so a formula pointing anywhere inside
/// a region resolves to a cell carrying the anchor's content. A region that
/// could push the index past `max_cells` fails before any of its cells are
/// created. Returns the number of virtual cells created.
pub(super) fn virtual_fill(
    index: &mut CellIndex,
    sheet: &str,
    regions: &[CellRange],
    max_cells: usize,
    deadline: &Deadline,
) -> Result<usize> {
    let mut created = 0;
    for region in regions.iter().filter(|r| !r.is_single()) {
        let anchor_key = CellKey::new(sheet, region.start);
        let Some(anchor) = index.get_mut(&anchor_key) else {
            tracing::debug!(sheet, region = %region, "merged region has an empty anchor");
            continue;
        };
        anchor.is_merged = true;
        anchor.merged_range = Some(*region);
        let anchor = anchor.clone();

        let projected = (index.len() as u64).saturating_add(region.size() - 1);
        if projected > max_cells as u64 {
            tracing::warn!(sheet, region = %region, cells = projected, limit = max_cells, "merged region exceeds the cell limit");
            return Err(AuditError::cell_limit(
                usize::try_from(projected).unwrap_or(usize::MAX),
                max_cells,
            ));
        }

        for address in region.cells().filter(|a| *a != region.start) {
            deadline.check()?;
            if index.insert(anchor.virtual_copy(address, *region)).is_some() {
                tracing::debug!(sheet, cell = %address, "hidden content under merged region replaced");
            }
            created += 1;
        }
    }
    Ok(created)
}
