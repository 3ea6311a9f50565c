//! Input factors: the leaves a calculation can be traced back to.

use crate::model::{Cell, CellAddress, CellKey, CellRange, SpreadsheetModel};
use crate::risk::labeling::{is_poor_quality_label, HeuristicLabeler};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// `=A10`, `=Sheet1!A10`, `='Sheet Name'!$A$10`
static SIMPLE_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^=\s*(?:'[^']+'!|[^!'\s]+!)?\$?[A-Za-z]{1,3}\$?\d+\s*$").expect("static regex")
});

/// Dependents that make an unlabelled input worth reporting.
const IMPORTANT_DEPENDENTS: usize = 5;

/// Neighbours to the right checked when classifying a series.
const SERIES_PROBE: i64 = 3;

/// Columns scanned in each direction for the extent of a series.
const SERIES_SCAN: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FactorKind {
    /// A single assumption
    Scalar,
    /// A row of period values
    Series,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Factor {
    pub key: CellKey,
    pub label: String,
    pub kind: FactorKind,
    /// Extent of the row for series factors
    pub series_range: Option<CellRange>,
    pub dependents: usize,
}

fn is_candidate(cell: &Cell) -> bool {
    cell.formula
        .as_deref()
        .map_or(true, |f| SIMPLE_REFERENCE.is_match(f))
}

fn occupied(model: &SpreadsheetModel, sheet: &str, address: Option<CellAddress>) -> bool {
    address
        .and_then(|a| model.cell(sheet, a))
        .is_some_and(|c| c.has_formula() || !c.value.is_empty())
}

fn classify(model: &SpreadsheetModel, cell: &Cell) -> FactorKind {
    let neighbours = (1..=SERIES_PROBE)
        .filter(|&dc| occupied(model, cell.sheet(), cell.address().offset(0, dc)))
        .count();
    if neighbours >= 2 {
        FactorKind::Series
    } else {
        FactorKind::Scalar
    }
}

fn series_range(model: &SpreadsheetModel, cell: &Cell) -> CellRange {
    let origin = cell.address();
    let extend = |step: i64| {
        let mut edge = origin;
        for _ in 0..SERIES_SCAN {
            let next = edge.offset(0, step);
            if !occupied(model, cell.sheet(), next) {
                break;
            }
            if let Some(next) = next {
                edge = next;
            }
        }
        edge
    };
    CellRange::new(extend(-1), extend(1))
}

/// Find the model's input factors.
///
/// A factor is a cell without a formula (or with a bare reference such as
/// `=Inputs!B2`) that feeds at least one other cell and either carries a
/// usable row label or has five or more direct dependents. Unlabelled factors
/// are named `[No Label] (A1)`.
#[must_use]
pub fn detect_factors(model: &SpreadsheetModel, labels: &HeuristicLabeler) -> Vec<Factor> {
    let mut factors: Vec<Factor> = model
        .real_cells()
        .filter(|c| is_candidate(c))
        .filter_map(|cell| {
            let dependents = model.graph.out_degree(&cell.key);
            if dependents == 0 {
                return None;
            }
            let label = labels
                .row_label(&model.index, cell.sheet(), cell.address())
                .filter(|l| !is_poor_quality_label(l));
            let label = match label {
                Some(label) => label,
                None if dependents >= IMPORTANT_DEPENDENTS => {
                    format!("[No Label] ({})", cell.address())
                }
                None => return None,
            };
            let kind = classify(model, cell);
            Some(Factor {
                key: cell.key.clone(),
                label,
                kind,
                series_range: (kind == FactorKind::Series).then(|| series_range(model, cell)),
                dependents,
            })
        })
        .collect();
    factors.sort_by(|a, b| {
        a.key
            .sheet
            .cmp(&b.key.sheet)
            .then_with(|| a.key.address.cmp(&b.key.address))
    });
    tracing::debug!(factors = factors.len(), "factors detected");
    factors
}
