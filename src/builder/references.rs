//! Dependency extraction from formulas.

use super::formula::{functions, is_balanced, tokenize, Token, TokenKind};
use crate::config::BuilderConfig;
use crate::model::{CellAddress, CellKey, Reference};
use std::collections::HashSet;

/// Everything the builder learns from one formula.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub references: Vec<Reference>,
    /// Expanded cell dependencies, in formula order without duplicates
    pub dependencies: Vec<CellKey>,
    /// Ranges kept whole because they exceed the expansion cap
    pub oversize_ranges: Vec<String>,
    pub is_dynamic: bool,
    pub balanced: bool,
}

/// Extract references and dependencies from a formula written on `sheet`.
///
/// External-workbook references are kept as references but never become
/// dependencies. A formula calling a dynamic function (INDIRECT, OFFSET, ...)
/// is flagged and gets no dependencies at all: its real target is unknown.
#[must_use]
pub fn extract(sheet: &str, formula: &str, config: &BuilderConfig) -> Extraction {
    let tokens = tokenize(formula);
    let is_dynamic = functions(&tokens).any(|f| config.is_dynamic_function(f));
    let references: Vec<Reference> = tokens.iter().filter_map(Token::reference).collect();

    let mut extraction = Extraction {
        is_dynamic,
        balanced: is_balanced(&tokens),
        ..Extraction::default()
    };

    if !is_dynamic {
        let mut seen = HashSet::new();
        for reference in references.iter().filter(|r| !r.is_external()) {
            let target = reference.target_sheet(sheet);
            let range = reference.range();
            if range.size() > config.max_range_expansion {
                tracing::debug!(
                    sheet,
                    reference = %reference.text,
                    cells = range.size(),
                    "range too large to expand, keeping it whole"
                );
                extraction
                    .oversize_ranges
                    .push(format!("{target}!{range}"));
                continue;
            }
            for address in range.cells() {
                let key = CellKey::new(target, address);
                if seen.insert(key.clone()) {
                    extraction.dependencies.push(key);
                }
            }
        }
    }

    extraction.references = references;
    extraction
}

/// Position-independent rendering of a formula as seen from `origin`.
///
/// References become relative R1C1 notation, so `=F4*2` in F8 and `=G4*2`
/// in G8 both render as `R[-4]C*2`.
#[must_use]
pub fn relative_pattern(formula: &str, origin: CellAddress) -> String {
    let mut pattern = String::new();
    for token in tokenize(formula) {
        match token.kind {
            TokenKind::Reference => match token.reference() {
                Some(reference) => pattern.push_str(&reference.relative_to(origin)),
                None => pattern.push_str(&token.text),
            },
            TokenKind::Text => {
                pattern.push('"');
                pattern.push_str(&token.text);
                pattern.push('"');
            }
            _ => pattern.push_str(&token.text),
        }
    }
    pattern
}
