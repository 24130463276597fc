//! Engine configuration with TOML file support.

use crate::error::GovernanceError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for the governance engine.
///
/// Can be loaded from a TOML file via [`GovernanceConfig::from_toml_file`]
/// or built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GovernanceConfig {
    /// How long a proposal accepts votes, in seconds from creation.
    #[serde(default = "default_voting_window_secs")]
    pub voting_window_secs: u64,

    /// Interval between expiration sweeps, in seconds.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Whether cancellation is allowed only while no vote is on record.
    #[serde(default = "default_true")]
    pub cancel_requires_no_votes: bool,

    /// Whether a proposal with zero votes at its deadline becomes
    /// `Expired` rather than `Rejected`.
    #[serde(default = "default_true")]
    pub expire_when_no_votes: bool,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl GovernanceConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, GovernanceError> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| GovernanceError::Config(format!("read config file: {e}")))?;
        toml::from_str(&raw).map_err(|e| GovernanceError::Config(format!("parse config: {e}")))
    }
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            voting_window_secs: default_voting_window_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            cancel_requires_no_votes: true,
            expire_when_no_votes: true,
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_voting_window_secs() -> u64 {
    7 * 24 * 60 * 60
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_fills_defaults() {
        let config: GovernanceConfig =
            toml::from_str("voting_window_secs = 3600\n").unwrap();
        assert_eq!(config.voting_window_secs, 3_600);
        assert_eq!(config.sweep_interval_secs, 60);
        assert!(config.cancel_requires_no_votes);
        assert!(config.expire_when_no_votes);
        assert_eq!(config.log_format, "human");
    }
}
