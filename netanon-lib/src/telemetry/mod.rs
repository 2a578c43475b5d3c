//! Ambient logging setup. No OpenTelemetry/Prometheus surface — this crate reports via
//! structured `tracing` events only (see `stats::Sampler`).

use tracing_subscriber::EnvFilter;

/// Installs a global `tracing` subscriber. `RUST_LOG` takes precedence if set; otherwise
/// falls back to `level` (one of `debug|info|warn|error`, matching the configured or
/// CLI-overridden log level).
pub fn init_tracing(level: &str, show_target: bool) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(show_target)
        .init();
}
