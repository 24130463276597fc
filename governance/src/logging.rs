//! Structured logging initialisation.
//!
//! Two output formats: human-readable lines for development, and
//! newline-delimited JSON for log aggregation. The filter level can be
//! overridden at runtime via `RUST_LOG`; otherwise the configured level
//! string is used (e.g. `"info"`, `"debug,covote_governance=trace"`).

use crate::config::GovernanceConfig;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialise the global tracing subscriber from the engine config.
///
/// # Panics
///
/// Panics if a global subscriber has already been set (i.e. this function
/// was called twice in the same process).
pub fn init_logging(config: &GovernanceConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));

    if config.log_format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
