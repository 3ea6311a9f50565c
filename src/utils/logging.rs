//! Tracing subscriber setup for binaries, benches and tests.
//!
//! The library itself only emits events; installing a subscriber is left to
//! whoever embeds it.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a global `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// `sheet_audit=debug` when `verbose` is set and `sheet_audit=warn` otherwise.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing(verbose: bool) -> bool {
    let fallback = if verbose {
        "sheet_audit=debug"
    } else {
        "sheet_audit=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_is_idempotent() {
        let _ = init_tracing(false);
        assert!(!init_tracing(true));
    }
}
