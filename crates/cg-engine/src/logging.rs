//! Structured logging setup, matching the teacher's `tracing-subscriber`
//! initialization in its agent/app binaries.

use tracing_subscriber::EnvFilter;

/// Initialize the global `tracing` subscriber at `level` (an `EnvFilter`
/// directive such as `"info"` or `"cg_engine=debug,cg_dataset=warn"`).
/// Safe to call more than once (e.g. from repeated test setup) — later
/// calls are ignored.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
