//! Telemetry helpers for structured logging and tracing.

use tracing_subscriber::EnvFilter;

/// Initialize tracing from `RUST_LOG`. Users can install their own
/// subscriber; this helper only installs a default fmt subscriber if none
/// is set.
pub fn init_tracing() {
    install(EnvFilter::from_default_env());
}

/// Initialize tracing from `RUST_LOG`, falling back to `default_directive`
/// (for example `"prometheus_throttle=debug"`) when the variable is unset or
/// cannot be parsed.
pub fn init_tracing_with_default(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    install(filter);
}

fn install(filter: EnvFilter) {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init();
}
