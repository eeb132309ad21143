//! Configuration for record construction

use serde::{Deserialize, Serialize};

/// Record construction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Per-transaction record limits
    pub handle: HandleConfig,

    /// Replay harness output
    pub replay: ReplayConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "record-core".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            handle: HandleConfig::default(),
            replay: ReplayConfig::default(),
        }
    }
}

/// Limits applied while handling one user transaction
///
/// Changing `max_preceding_records` shifts the timestamps of scheduled
/// children, so historical streams only replay under the value in force
/// when they were produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleConfig {
    /// Maximum preceding records per user transaction (limited requests only)
    pub max_preceding_records: u64,

    /// Maximum following records per user transaction
    pub max_following_records: u64,
}

impl Default for HandleConfig {
    fn default() -> Self {
        Self {
            max_preceding_records: 3,
            max_following_records: 50,
        }
    }
}

/// Replay harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Include sidecar records in output
    pub emit_sidecars: bool,

    /// Pretty-print JSON output
    pub pretty: bool,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            emit_sidecars: true,
            pretty: false,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(value) = std::env::var("RECORDS_MAX_PRECEDING") {
            config.handle.max_preceding_records = parse_limit("RECORDS_MAX_PRECEDING", &value)?;
        }

        if let Ok(value) = std::env::var("RECORDS_MAX_FOLLOWING") {
            config.handle.max_following_records = parse_limit("RECORDS_MAX_FOLLOWING", &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check limits are usable
    pub fn validate(&self) -> crate::Result<()> {
        if self.handle.max_following_records == 0 {
            return Err(crate::Error::Config(
                "max_following_records must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_limit(var: &str, value: &str) -> crate::Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|e| crate::Error::Config(format!("Invalid {}={:?}: {}", var, value, e)))
}
