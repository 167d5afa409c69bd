//! Logging setup.
//!
//! Report output goes to stdout, so log lines are always written to stderr.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "warn";

/// Initializes the global subscriber. `verbose` raises the default level to `debug`.
pub fn init_stderr_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { DEFAULT_FILTER };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .init();
}
