//! Dependency tracing and impact analysis.
//!
//! - [`DependencyTracer`]: precedents, dependents, transitive closures,
//!   terminal drivers and causal trees
//! - [`literal_impacts`]: diffusion / dominance / volatility per literal
//! - [`detect_factors`]: input cells a calculation decomposes into
//! - [`translate_formula`]: formulas rendered with labels

mod factors;
mod impact;
mod tracer;
mod translate;

pub use factors::{detect_factors, Factor, FactorKind};
pub use impact::{impact_of, literal_impacts, rank, LiteralImpact, Prescription, Volatility};
pub use tracer::{CausalNode, DependencyTracer, StopReason};
pub use translate::translate_formula;
