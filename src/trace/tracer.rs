//! Graph queries over a built model.

use super::factors::Factor;
use super::translate::translate_formula;
use crate::error::{AuditError, Result};
use crate::model::{CellKey, SpreadsheetModel};
use crate::risk::labeling::HeuristicLabeler;
use serde::Serialize;
use std::collections::HashSet;

/// Read-only view answering dependency questions about one model.
#[derive(Clone, Copy)]
pub struct DependencyTracer<'a> {
    model: &'a SpreadsheetModel,
    labels: &'a HeuristicLabeler,
}

/// Why a causal-tree branch was not expanded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum StopReason {
    /// The cell is an input factor
    Factor,
    /// The cell shows an error sentinel
    FormulaError(String),
    /// The formula computes its target at runtime
    DynamicReference,
    /// The cell already appears on the path from the root
    Circular,
    /// The depth limit was reached
    DepthLimit,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Factor => f.write_str("Input factor"),
            Self::FormulaError(code) => write!(f, "Formula error: {code}"),
            Self::DynamicReference => f.write_str("Dynamic reference (INDIRECT/OFFSET/ADDRESS)"),
            Self::Circular => f.write_str("Circular reference detected"),
            Self::DepthLimit => f.write_str("Depth limit reached"),
        }
    }
}

/// One node of a causal tree: a cell and the cells it is computed from.
#[derive(Debug, Clone, Serialize)]
pub struct CausalNode {
    pub key: CellKey,
    pub label: String,
    pub formula: Option<String>,
    /// Formula with references replaced by labels
    pub formula_readable: Option<String>,
    pub depth: usize,
    pub is_factor: bool,
    pub children: Vec<CausalNode>,
    /// Set when the node was not expanded although it has precedents
    pub stopped: Option<StopReason>,
}

impl CausalNode {
    /// Nodes in the subtree, this one included.
    #[must_use]
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(Self::size).sum::<usize>()
    }

    /// Whether the branch ends at a node that cannot be decomposed.
    #[must_use]
    pub fn is_untraceable(&self) -> bool {
        matches!(
            self.stopped,
            Some(StopReason::FormulaError(_) | StopReason::DynamicReference | StopReason::Circular)
        )
    }
}

impl<'a> DependencyTracer<'a> {
    #[must_use]
    pub const fn new(model: &'a SpreadsheetModel, labels: &'a HeuristicLabeler) -> Self {
        Self { model, labels }
    }

    /// Cells `key` reads directly.
    #[must_use]
    pub fn precedents(&self, key: &CellKey) -> Vec<&'a CellKey> {
        self.model.graph.precedents(key)
    }

    /// Cells that read `key` directly.
    #[must_use]
    pub fn dependents(&self, key: &CellKey) -> Vec<&'a CellKey> {
        self.model.graph.dependents(key)
    }

    #[must_use]
    pub fn descendants(&self, key: &CellKey) -> Vec<&'a CellKey> {
        self.model.graph.descendants(key)
    }

    #[must_use]
    pub fn ancestors(&self, key: &CellKey) -> Vec<&'a CellKey> {
        self.model.graph.ancestors(key)
    }

    /// Terminal calculations fed by `key`: downstream cells nothing else reads.
    ///
    /// The start cell counts as its own driver when it has no dependents.
    /// Dynamic cells carry no edges, so tracing stops at them.
    #[must_use]
    pub fn trace_to_drivers(&self, key: &CellKey) -> Vec<&'a CellKey> {
        let graph = &self.model.graph;
        let Some(start) = self.model.get(key).map(|c| &c.key) else {
            return Vec::new();
        };
        let mut drivers: Vec<&CellKey> = graph
            .descendants(key)
            .into_iter()
            .filter(|k| graph.out_degree(k) == 0)
            .collect();
        if graph.out_degree(key) == 0 {
            drivers.push(start);
        }
        drivers
    }

    /// Label of a cell, falling back to `[No Label] (A1)`.
    #[must_use]
    pub fn label_of(&self, key: &CellKey) -> String {
        self.labels
            .row_label(&self.model.index, &key.sheet, key.address)
            .unwrap_or_else(|| format!("[No Label] ({})", key.address))
    }

    /// Expand `key` into the tree of cells it is computed from.
    ///
    /// The root sits at depth 0; children are expanded while their depth is
    /// below `max_depth`. Branches stop at factors, error cells, dynamic
    /// formulas and cells already on the path.
    pub fn build_causal_tree(
        &self,
        key: &CellKey,
        factors: &[Factor],
        max_depth: usize,
    ) -> Result<CausalNode> {
        if self.model.get(key).is_none() {
            return Err(AuditError::validation(format!(
                "cell {key} is not in the model"
            )));
        }
        let factor_keys: HashSet<&CellKey> = factors.iter().map(|f| &f.key).collect();
        let mut path = HashSet::new();
        Ok(self.expand(key, &factor_keys, 0, max_depth, &mut path))
    }

    fn expand<'k>(
        &self,
        key: &'k CellKey,
        factors: &HashSet<&CellKey>,
        depth: usize,
        max_depth: usize,
        path: &mut HashSet<&'k CellKey>,
    ) -> CausalNode
    where
        'a: 'k,
    {
        let cell = self.model.get(key);
        let formula = cell.and_then(|c| c.formula.clone());
        let mut node = CausalNode {
            key: key.clone(),
            label: self.label_of(key),
            formula_readable: formula
                .as_deref()
                .map(|f| translate_formula(self.model, self.labels, &key.sheet, f)),
            formula,
            depth,
            is_factor: factors.contains(key),
            children: Vec::new(),
            stopped: None,
        };

        let precedents = self.precedents(key);
        if let Some(code) = cell.and_then(|c| c.value.error_code()) {
            node.stopped = Some(StopReason::FormulaError(code.to_string()));
        } else if cell.is_some_and(|c| c.is_dynamic) {
            node.stopped = Some(StopReason::DynamicReference);
        } else if path.contains(key) {
            node.stopped = Some(StopReason::Circular);
        } else if precedents.is_empty() {
            // leaf
        } else if node.is_factor && depth > 0 {
            node.stopped = Some(StopReason::Factor);
        } else if depth >= max_depth {
            node.stopped = Some(StopReason::DepthLimit);
        } else {
            path.insert(key);
            node.children = precedents
                .into_iter()
                .map(|p| self.expand(p, factors, depth + 1, max_depth, path))
                .collect();
            path.remove(key);
        }
        node
    }
}
