//! Logging setup.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "info";

/// Installs a compact `tracing` subscriber filtered by `RUST_LOG`
/// (default `info`).
///
/// Returns `Err` if a global subscriber is already installed; callers
/// that may run more than once (tests) can ignore it.
pub fn init_tracing() -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().compact())
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_twice_reports_error_instead_of_panicking() {
        let _ = init_tracing();
        assert!(init_tracing().is_err());
    }
}
