//! Shared utilities.

mod hash;
mod logging;

pub use hash::{content_hash, hash_fields};
pub use logging::init_tracing;
