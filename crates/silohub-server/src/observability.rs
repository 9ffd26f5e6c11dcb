//! Tracing setup for the silohub binary.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::LoggingConfig;

/// Installs the global subscriber with the filter from
/// [`filter_for`]. Safe to call more than once; later calls are
/// no-ops.
pub fn init_tracing(logging: &LoggingConfig) {
    let _ = tracing_subscriber::registry()
        .with(filter_for(logging))
        .with(fmt::layer())
        .try_init();
}

/// Builds the log filter for a run.
///
/// An explicit `RUST_LOG` wins over `logging.level` so operators can
/// raise verbosity per target without editing silohub.toml.
pub fn filter_for(logging: &LoggingConfig) -> EnvFilter {
    build_filter(std::env::var("RUST_LOG").ok().as_deref(), logging)
}

fn build_filter(rust_log: Option<&str>, logging: &LoggingConfig) -> EnvFilter {
    match rust_log {
        Some(spec) if !spec.trim().is_empty() => EnvFilter::new(spec),
        _ => EnvFilter::new(&logging.level),
    }
}
