//! Operational diagnostics via `tracing`, kept off stdout.
//!
//! Stdout belongs to the simulated event log, so diagnostics go to stderr.
//! Verbosity comes from `RUST_LOG`, defaulting to warnings only.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn";

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_names(true)
        .try_init();
}
