//! Configuration management
//!
//! TOML configuration with environment-variable overrides and sensible
//! defaults, covering the store connection and the write-side retry
//! budget. Connection parameters themselves are an external concern; this
//! module only carries them to the Redis layer.

use crate::mutator::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Backing store connection
    #[serde(default)]
    pub store: StoreConfig,

    /// Write-side check-and-set retry budget
    #[serde(default)]
    pub write: WriteConfig,
}

/// Backing store connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Store URL (e.g. "redis://localhost:6379")
    #[serde(default = "default_url")]
    pub url: String,

    /// Maximum concurrent in-flight commands
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    /// Timeout for establishing a connection, in milliseconds
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,

    /// Per-command timeout, in milliseconds
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
}

/// Check-and-set retry settings for catalog registration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WriteConfig {
    /// Retries after the first check-and-set attempt
    #[serde(default = "default_cas_retries")]
    pub cas_retries: u32,

    /// Delay before the first retry, in milliseconds
    #[serde(default = "default_cas_initial_delay_ms")]
    pub cas_initial_delay_ms: u64,

    /// Ceiling on the backoff delay, in milliseconds
    #[serde(default = "default_cas_max_delay_ms")]
    pub cas_max_delay_ms: u64,
}

fn default_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}
fn default_pool_size() -> u32 {
    16
}
fn default_connection_timeout_ms() -> u64 {
    5_000
}
fn default_command_timeout_ms() -> u64 {
    2_000
}
fn default_cas_retries() -> u32 {
    5
}
fn default_cas_initial_delay_ms() -> u64 {
    10
}
fn default_cas_max_delay_ms() -> u64 {
    1_000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            pool_size: default_pool_size(),
            connection_timeout_ms: default_connection_timeout_ms(),
            command_timeout_ms: default_command_timeout_ms(),
        }
    }
}

impl Default for WriteConfig {
    fn default() -> Self {
        Self {
            cas_retries: default_cas_retries(),
            cas_initial_delay_ms: default_cas_initial_delay_ms(),
            cas_max_delay_ms: default_cas_max_delay_ms(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path, e))?;

        toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config file {}: {}", path, e))
    }

    /// Load from a TOML file, then apply environment overrides
    pub fn from_file_with_env(path: &str) -> Result<Self, String> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Defaults plus environment overrides only
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("RILL_STORE_URL") {
            self.store.url = url;
        }
        if let Ok(size) = std::env::var("RILL_POOL_SIZE") {
            if let Ok(n) = size.parse() {
                self.store.pool_size = n;
            }
        }
        if let Ok(timeout) = std::env::var("RILL_COMMAND_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse() {
                self.store.command_timeout_ms = ms;
            }
        }
        if let Ok(retries) = std::env::var("RILL_CAS_RETRIES") {
            if let Ok(n) = retries.parse() {
                self.write.cas_retries = n;
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.store.url.is_empty() {
            return Err("Store URL cannot be empty".to_string());
        }
        if self.store.pool_size == 0 {
            return Err("Pool size must be greater than 0".to_string());
        }
        if self.store.command_timeout_ms == 0 {
            return Err("Command timeout must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Retry policy derived from the write section
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.write.cas_retries,
            initial_delay: Duration::from_millis(self.write.cas_initial_delay_ms),
            max_delay: Duration::from_millis(self.write.cas_max_delay_ms),
            ..RetryPolicy::default()
        }
    }
}
