//! Change computer implementations.
//!
//! One [`ChangeComputer`](super::ChangeComputer) per kind of change: cells
//! (logic and input), risks, and structure.

mod cells;
mod risks;
mod structure;

pub use cells::CellChangeComputer;
pub use risks::RiskChangeComputer;
pub use structure::StructuralChangeComputer;
