//! Configuration types

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// Default bound on a single remote call.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(5);

/// Gateway configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArnoldbConfig {
    /// Upper bound for every remote store call, in milliseconds.
    pub remote_timeout_ms: u64,
    /// Run a full schema build before serving the first request.
    pub build_on_startup: bool,
    /// Emit logs as JSON lines instead of human-readable text.
    pub log_json: bool,
}

impl Default for ArnoldbConfig {
    fn default() -> Self {
        Self {
            remote_timeout_ms: DEFAULT_REMOTE_TIMEOUT.as_millis() as u64,
            build_on_startup: false,
            log_json: false,
        }
    }
}

impl ArnoldbConfig {
    /// Create from environment variables with fallback to defaults.
    ///
    /// Environment variables:
    /// - `ARNOLDB_REMOTE_TIMEOUT_MS`: bound on each remote call (default: 5000)
    /// - `ARNOLDB_BUILD_ON_STARTUP`: "true" or "1" to warm the schema cache (default: false)
    /// - `ARNOLDB_LOG_JSON`: "true" or "1" for JSON logs (default: false)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            remote_timeout_ms: std::env::var("ARNOLDB_REMOTE_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.remote_timeout_ms),
            build_on_startup: std::env::var("ARNOLDB_BUILD_ON_STARTUP")
                .map(|s| s == "true" || s == "1")
                .unwrap_or(defaults.build_on_startup),
            log_json: std::env::var("ARNOLDB_LOG_JSON")
                .map(|s| s == "true" || s == "1")
                .unwrap_or(defaults.log_json),
        }
    }

    /// Load a TOML file. Every key is required.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            reason: format!("{}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: ArnoldbConfig = toml::from_str(contents).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Override the remote timeout.
    pub fn with_remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_timeout_ms)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.remote_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "remote_timeout_ms".to_string(),
                value: self.remote_timeout_ms.to_string(),
                reason: "remote_timeout_ms must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}
