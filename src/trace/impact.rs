//! Impact profile of every literal value in the workbook.
//!
//! Two failure modes pull in opposite directions. A value pasted into fifty
//! formulas has high diffusion but may drive nothing else; a single input
//! cell feeding the whole P&L has diffusion 1 and huge dominance. The
//! combined score normalizes both metrics by their workbook maximum and
//! weights them, so neither profile is ranked away.

use crate::builder::formula::{numeric_literals, tokenize};
use crate::config::{DetectionConfig, ImpactConfig};
use crate::model::{format_number, CellKey, SpreadsheetModel};
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Volatility {
    Low,
    /// A row holding this literal mixes several distinct literals
    High,
}

/// Suggested remedy for a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Prescription {
    /// Varying values in one row suggest scenarios; move them to a scenario table
    ScenarioPlanning,
    /// The value drives a large part of the model; break it into named drivers
    DriverDecomposition,
    /// The value is scattered; define it once and reference it
    Centralization,
    BasicRefactoring,
}

impl Prescription {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ScenarioPlanning => "Scenario Planning",
            Self::DriverDecomposition => "Driver Decomposition",
            Self::Centralization => "Centralization",
            Self::BasicRefactoring => "Basic Refactoring",
        }
    }
}

impl fmt::Display for Prescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Impact metrics for one distinct literal value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiteralImpact {
    pub value: f64,
    /// Canonical text form, e.g. `201.26`
    pub text: String,
    /// Cells holding the literal, as an input or inside a formula
    pub occurrences: Vec<CellKey>,
    /// Number of occurrences
    pub diffusion: usize,
    /// Distinct cells downstream of any occurrence
    pub dominance: usize,
    pub volatility: Volatility,
    pub combined_score: f64,
    pub prescription: Prescription,
}

#[derive(Default)]
struct Accumulator {
    value: f64,
    occurrences: IndexSet<CellKey>,
    formula_rows: Vec<(String, u32)>,
}

fn prescribe(config: &ImpactConfig, diffusion: usize, dominance: usize, volatility: Volatility) -> Prescription {
    if volatility == Volatility::High {
        Prescription::ScenarioPlanning
    } else if dominance > config.decomposition_dominance {
        Prescription::DriverDecomposition
    } else if diffusion > config.centralization_diffusion {
        Prescription::Centralization
    } else {
        Prescription::BasicRefactoring
    }
}

fn normalized(value: usize, max: usize) -> f64 {
    if max == 0 {
        0.0
    } else {
        value as f64 / max as f64
    }
}

/// Profile every non-allow-listed literal, highest combined score first.
///
/// Occurrences are typed-in numbers and numeric literals inside formulas; a
/// cell counts once per distinct literal. Virtual cells of merged regions are
/// not counted. Volatility looks at formula literals only: a row of typed-in
/// period values is data, not scenario logic.
#[must_use]
pub fn literal_impacts(
    model: &SpreadsheetModel,
    detection: &DetectionConfig,
    config: &ImpactConfig,
) -> Vec<LiteralImpact> {
    let mut literals: IndexMap<String, Accumulator> = IndexMap::new();
    let mut row_literals: HashMap<(String, u32), IndexSet<String>> = HashMap::new();

    let mut record = |value: f64, cell_key: &CellKey, in_formula: bool| {
        if detection.is_allowed(value) {
            return;
        }
        let text = format_number(value);
        let row = (cell_key.sheet.clone(), cell_key.address.row);
        if in_formula {
            row_literals.entry(row.clone()).or_default().insert(text.clone());
        }
        let entry = literals.entry(text).or_insert_with(|| Accumulator {
            value,
            ..Accumulator::default()
        });
        entry.occurrences.insert(cell_key.clone());
        if in_formula {
            entry.formula_rows.push(row);
        }
    };

    for cell in model.real_cells() {
        match (&cell.formula, cell.input_number()) {
            (Some(formula), _) => {
                for value in numeric_literals(&tokenize(formula)) {
                    record(value, &cell.key, true);
                }
            }
            (None, Some(value)) => record(value, &cell.key, false),
            (None, None) => {}
        }
    }

    let mut impacts: Vec<LiteralImpact> = literals
        .into_iter()
        .map(|(text, acc)| {
            let volatile = acc.formula_rows.iter().any(|row| {
                row_literals
                    .get(row)
                    .is_some_and(|distinct| distinct.len() >= config.volatility_distinct)
            });
            let volatility = if volatile { Volatility::High } else { Volatility::Low };
            let occurrences: Vec<CellKey> = acc.occurrences.into_iter().collect();
            LiteralImpact {
                value: acc.value,
                text,
                diffusion: occurrences.len(),
                dominance: model.graph.union_descendants(occurrences.iter()).len(),
                occurrences,
                volatility,
                combined_score: 0.0,
                prescription: Prescription::BasicRefactoring,
            }
        })
        .collect();

    let max_diffusion = impacts.iter().map(|i| i.diffusion).max().unwrap_or(0);
    let max_dominance = impacts.iter().map(|i| i.dominance).max().unwrap_or(0);
    for impact in &mut impacts {
        impact.combined_score = config.diffusion_weight * normalized(impact.diffusion, max_diffusion)
            + config.dominance_weight * normalized(impact.dominance, max_dominance);
        impact.prescription = prescribe(config, impact.diffusion, impact.dominance, impact.volatility);
    }
    rank(&mut impacts);

    tracing::debug!(
        literals = impacts.len(),
        max_diffusion,
        max_dominance,
        "literal impact computed"
    );
    impacts
}

/// Combined score descending; ties by dominance, diffusion, then value.
pub fn rank(impacts: &mut [LiteralImpact]) {
    impacts.sort_by(|a, b| {
        b.combined_score
            .partial_cmp(&a.combined_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.dominance.cmp(&a.dominance))
            .then_with(|| b.diffusion.cmp(&a.diffusion))
            .then_with(|| a.value.total_cmp(&b.value))
    });
}

/// Impact of one literal, looked up by value.
#[must_use]
pub fn impact_of(impacts: &[LiteralImpact], value: f64) -> Option<&LiteralImpact> {
    let text = format_number(value);
    impacts.iter().find(|i| i.text == text)
}
