//! Model builder: raw workbook → cell index + dependency graph.
//!
//! The build runs in four passes:
//!
//! 1. Load cells, skipping (and recording) malformed addresses, duplicates and
//!    rows past the per-sheet cap. The total cell count is capped.
//! 2. Virtual fill of merged regions.
//! 3. Dependency extraction for every formula cell, virtual ones included.
//! 4. Graph construction: one edge per dependency that exists in the index.
//!
//! A wall-clock deadline is checked between cells in passes 1 to 4, and
//! virtual cells count toward the total cell cap.

pub mod fill;
pub mod formula;
pub mod references;

use crate::config::BuilderConfig;
use crate::error::{AuditError, BuildErrorKind, Result};
use crate::model::{
    BuildIssue, BuildIssueKind, Cell, CellAddress, CellIndex, CellKey, DependencyGraph,
    SpreadsheetModel, Workbook,
};
use indexmap::IndexMap;
use std::time::{Duration, Instant};

pub use formula::{tokenize, Token, TokenKind};
pub use references::{extract, relative_pattern, Extraction};

/// Builds a [`SpreadsheetModel`] from a [`Workbook`].
#[derive(Debug, Clone, Default)]
pub struct ModelBuilder {
    config: BuilderConfig,
}

struct Deadline {
    started: Instant,
    limit: Duration,
}

impl Deadline {
    fn start(limit: Duration) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    fn check(&self) -> Result<()> {
        let elapsed = self.started.elapsed();
        if elapsed >= self.limit {
            return Err(AuditError::timeout(elapsed, self.limit));
        }
        Ok(())
    }
}

impl ModelBuilder {
    #[must_use]
    pub const fn new(config: BuilderConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Build the model.
    ///
    /// Malformed input is skipped and recorded in [`SpreadsheetModel::issues`].
    /// Fails only on an empty workbook or when a resource limit is hit.
    pub fn build(&self, workbook: &Workbook) -> Result<SpreadsheetModel> {
        if workbook.sheets.is_empty() {
            return Err(AuditError::build(
                "building model",
                BuildErrorKind::EmptyWorkbook,
            ));
        }

        let deadline = Deadline::start(self.config.timeout());
        let mut issues = Vec::new();
        let mut index = CellIndex::new();

        self.load_cells(workbook, &mut index, &mut issues, &deadline)?;

        let mut merged = IndexMap::new();
        let mut virtual_cells = 0;
        for sheet in &workbook.sheets {
            let regions = fill::parse_regions(sheet, &mut issues);
            virtual_cells += fill::virtual_fill(
                &mut index,
                &sheet.name,
                &regions,
                self.config.max_cells,
                &deadline,
            )?;
            merged.insert(sheet.name.clone(), regions);
        }

        self.extract_dependencies(&mut index, &mut issues, &deadline)?;
        let graph = build_graph(&index, &deadline)?;

        tracing::info!(
            sheets = workbook.sheets.len(),
            cells = index.len(),
            virtual_cells,
            edges = graph.edge_count(),
            issues = issues.len(),
            elapsed_ms = deadline.started.elapsed().as_millis() as u64,
            "model built"
        );

        Ok(SpreadsheetModel {
            index,
            graph,
            sheets: workbook.sheets.iter().map(|s| s.name.clone()).collect(),
            merged,
            issues,
            content_hash: workbook.content_hash(),
        })
    }

    fn load_cells(
        &self,
        workbook: &Workbook,
        index: &mut CellIndex,
        issues: &mut Vec<BuildIssue>,
        deadline: &Deadline,
    ) -> Result<()> {
        for sheet in &workbook.sheets {
            let mut skipped_rows: Vec<u32> = Vec::new();

            for raw in &sheet.cells {
                deadline.check()?;

                let Some(address) = CellAddress::parse(&raw.address) else {
                    tracing::warn!(sheet = %sheet.name, address = %raw.address, "skipping malformed cell address");
                    issues.push(BuildIssue::new(
                        BuildIssueKind::MalformedAddress,
                        &sheet.name,
                        &raw.address,
                        "expected A1 notation",
                    ));
                    continue;
                };
                if address.row > self.config.max_rows {
                    skipped_rows.push(address.row);
                    continue;
                }

                let formula = raw
                    .formula
                    .as_deref()
                    .map(str::trim)
                    .filter(|f| !f.is_empty() && *f != "=")
                    .map(|f| {
                        if f.starts_with('=') {
                            f.to_string()
                        } else {
                            format!("={f}")
                        }
                    });
                let value = raw.value.clone().normalize();
                if value.is_empty() && formula.is_none() {
                    continue;
                }

                let key = CellKey::new(&sheet.name, address);
                if index.contains(&key) {
                    issues.push(BuildIssue::new(
                        BuildIssueKind::DuplicateCell,
                        &sheet.name,
                        address.to_string(),
                        "address appears more than once, keeping the first",
                    ));
                    continue;
                }
                if index.len() >= self.config.max_cells {
                    return Err(AuditError::cell_limit(index.len() + 1, self.config.max_cells));
                }

                index.insert(Cell {
                    formula,
                    ..Cell::new(key, value)
                });
            }

            if let (Some(first), count) = (skipped_rows.iter().min(), skipped_rows.len()) {
                tracing::warn!(sheet = %sheet.name, cells = count, limit = self.config.max_rows, "rows past the limit skipped");
                issues.push(BuildIssue::new(
                    BuildIssueKind::RowLimit,
                    &sheet.name,
                    format!("row {first}+"),
                    format!(
                        "{count} cells beyond row {} skipped; raise builder.max_rows to include them",
                        self.config.max_rows
                    ),
                ));
            }
        }
        Ok(())
    }

    fn extract_dependencies(
        &self,
        index: &mut CellIndex,
        issues: &mut Vec<BuildIssue>,
        deadline: &Deadline,
    ) -> Result<()> {
        let formula_cells: Vec<(CellKey, String, bool)> = index
            .iter()
            .filter_map(|c| {
                c.formula
                    .as_ref()
                    .map(|f| (c.key.clone(), f.clone(), c.is_virtual()))
            })
            .collect();

        for (key, formula, is_virtual) in formula_cells {
            deadline.check()?;
            let extraction = extract(&key.sheet, &formula, &self.config);

            if !extraction.balanced && !is_virtual {
                tracing::warn!(cell = %key, formula = %formula, "formula has unbalanced parentheses");
                issues.push(BuildIssue::new(
                    BuildIssueKind::UnparsableFormula,
                    &key.sheet,
                    key.address.to_string(),
                    format!("unbalanced parentheses in {formula}"),
                ));
            }

            if let Some(cell) = index.get_mut(&key) {
                cell.references = extraction.references;
                cell.dependencies = extraction.dependencies;
                cell.oversize_ranges = extraction.oversize_ranges;
                cell.is_dynamic = extraction.is_dynamic;
            }
        }
        Ok(())
    }
}

/// One node per cell, one edge per dependency whose target cell exists.
fn build_graph(index: &CellIndex, deadline: &Deadline) -> Result<DependencyGraph> {
    let mut graph = DependencyGraph::new();
    for cell in index.iter() {
        graph.add_node(&cell.key);
    }
    for cell in index.iter().filter(|c| !c.dependencies.is_empty()) {
        deadline.check()?;
        for dependency in cell.dependencies.iter().filter(|d| index.contains(d)) {
            graph.add_edge(dependency, &cell.key);
        }
    }
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CellValue;

    fn plan(build: impl FnOnce(&mut crate::model::Sheet)) -> Workbook {
        let mut workbook = Workbook::new();
        build(workbook.add_sheet("Plan"));
        workbook
    }

    #[test]
    fn test_empty_workbook_fails() {
        let err = ModelBuilder::default().build(&Workbook::new()).unwrap_err();
        assert!(err.to_string().contains("Failed to build model"));
    }

    #[test]
    fn test_edges_point_precedent_to_dependent() {
        let workbook = plan(|s| {
            s.value("F4", 201.26).formula("F8", "=F4*2").formula("F9", "=Z99+1");
        });
        let model = ModelBuilder::default().build(&workbook).unwrap();
        let f4 = CellKey::parse("Plan!F4").unwrap();
        let f8 = CellKey::parse("Plan!F8").unwrap();
        assert_eq!(model.graph.dependents(&f4), vec![&f8]);
        // Z99 does not exist, so F9 has a dependency but no edge
        let f9 = CellKey::parse("Plan!F9").unwrap();
        assert_eq!(model.get(&f9).unwrap().dependencies.len(), 1);
        assert_eq!(model.graph.in_degree(&f9), 0);
    }

    #[test]
    fn test_malformed_input_is_recorded_not_fatal() {
        let workbook = plan(|s| {
            s.value("A1", 1.0).value("1A", 2.0).value("A1", 3.0).formula("B1", "=SUM(A1");
        });
        let model = ModelBuilder::default().build(&workbook).unwrap();
        let kinds: Vec<BuildIssueKind> = model.issues.iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![
                BuildIssueKind::MalformedAddress,
                BuildIssueKind::DuplicateCell,
                BuildIssueKind::UnparsableFormula
            ]
        );
        assert_eq!(
            model.cell("Plan", CellAddress::new(1, 1)).unwrap().value,
            CellValue::Number(1.0)
        );
    }

    #[test]
    fn test_cell_limit() {
        let workbook = plan(|s| {
            s.value("A1", 1.0).value("A2", 2.0).value("A3", 3.0);
        });
        let builder = ModelBuilder::new(BuilderConfig {
            max_cells: 2,
            ..BuilderConfig::default()
        });
        let err = builder.build(&workbook).unwrap_err();
        assert!(err.is_resource_limit());
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn test_cell_limit_counts_virtual_cells() {
        let workbook = plan(|s| {
            s.value("A1", "Header").merge("A1:Z2000");
        });
        let builder = ModelBuilder::new(BuilderConfig {
            max_cells: 100,
            ..BuilderConfig::default()
        });
        let err = builder.build(&workbook).unwrap_err();
        assert!(matches!(
            err,
            AuditError::Resource {
                source: crate::error::ResourceErrorKind::CellLimitExceeded { limit: 100, .. },
                ..
            }
        ));
    }

    #[test]
    fn test_timeout() {
        let workbook = plan(|s| {
            s.value("A1", 1.0);
        });
        let builder = ModelBuilder::new(BuilderConfig {
            timeout_secs: 0,
            ..BuilderConfig::default()
        });
        let err = builder.build(&workbook).unwrap_err();
        assert!(matches!(
            err,
            AuditError::Resource {
                source: crate::error::ResourceErrorKind::TimeoutExceeded { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_graph_pass_checks_deadline() {
        let source = CellKey::parse("Plan!A1").unwrap();
        let mut index = CellIndex::new();
        index.insert(Cell::new(source.clone(), CellValue::Number(1.0)));
        index.insert(Cell {
            dependencies: vec![source],
            ..Cell::new(CellKey::parse("Plan!B1").unwrap(), CellValue::Empty)
        });

        let open = Deadline::start(Duration::from_secs(60));
        assert_eq!(build_graph(&index, &open).unwrap().edge_count(), 1);
        let expired = Deadline::start(Duration::ZERO);
        assert!(build_graph(&index, &expired).unwrap_err().is_resource_limit());
    }

    #[test]
    fn test_row_limit_skips_and_records() {
        let workbook = plan(|s| {
            s.value("A1", 1.0).value("A11", 2.0).value("B12", 3.0);
        });
        let builder = ModelBuilder::new(BuilderConfig {
            max_rows: 10,
            ..BuilderConfig::default()
        });
        let model = builder.build(&workbook).unwrap();
        assert_eq!(model.index.len(), 1);
        assert_eq!(model.issues.len(), 1);
        assert_eq!(model.issues[0].kind, BuildIssueKind::RowLimit);
        assert!(model.issues[0].message.contains("2 cells"));
    }

    #[test]
    fn test_formula_without_equals_is_normalized() {
        let workbook = plan(|s| {
            s.value("A1", 1.0).formula("B1", "A1+1");
        });
        let model = ModelBuilder::default().build(&workbook).unwrap();
        let b1 = model.cell("Plan", CellAddress::new(1, 2)).unwrap();
        assert_eq!(b1.formula.as_deref(), Some("=A1+1"));
        assert_eq!(b1.dependencies.len(), 1);
    }
}
