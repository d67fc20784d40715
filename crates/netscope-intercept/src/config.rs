//! Interceptor configuration.
//!
//! Configuration comes from defaults overridden by environment variables:
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | NETSCOPE_LOG_CAPACITY | 100 | Entries kept by the log store |
//! | NETSCOPE_START_PAUSED | false | Start with recording paused |
//! | NETSCOPE_TIMEOUT_SECS | 30 | Request timeout of the reqwest transports |
//! | NETSCOPE_USER_AGENT | netscope/<version> | User-Agent of the reqwest transports |
//!
//! Malformed values are ignored with a warning and the default is kept.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use netscope_core::defaults;

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Validation error: {0}")]
    Validation(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

impl From<ConfigError> for netscope_core::Error {
    fn from(e: ConfigError) -> Self {
        netscope_core::Error::Config(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterceptConfig {
    /// Maximum number of entries kept by the log store.
    pub capacity: usize,
    /// Whether the store starts paused.
    pub start_paused: bool,
    /// Request timeout in seconds for the reqwest transports.
    pub timeout_secs: u64,
    /// User-Agent sent by the reqwest transports.
    pub user_agent: String,
}

impl Default for InterceptConfig {
    fn default() -> Self {
        Self {
            capacity: defaults::LOG_CAPACITY,
            start_paused: false,
            timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
            user_agent: defaults::USER_AGENT.to_string(),
        }
    }
}

impl InterceptConfig {
    /// Load configuration from environment variables over the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(defaults::ENV_LOG_CAPACITY) {
            match raw.trim().parse::<usize>() {
                Ok(capacity) => config.capacity = capacity,
                Err(_) => warn!(
                    var = defaults::ENV_LOG_CAPACITY,
                    value = %raw,
                    "Ignoring malformed value"
                ),
            }
        }

        if let Some(raw) = lookup(defaults::ENV_START_PAUSED) {
            match raw.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => config.start_paused = true,
                "0" | "false" | "no" | "off" | "" => config.start_paused = false,
                _ => warn!(
                    var = defaults::ENV_START_PAUSED,
                    value = %raw,
                    "Ignoring malformed value"
                ),
            }
        }

        if let Some(raw) = lookup(defaults::ENV_TIMEOUT_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(secs) => config.timeout_secs = secs,
                Err(_) => warn!(
                    var = defaults::ENV_TIMEOUT_SECS,
                    value = %raw,
                    "Ignoring malformed value"
                ),
            }
        }

        if let Some(raw) = lookup(defaults::ENV_USER_AGENT) {
            if !raw.trim().is_empty() {
                config.user_agent = raw;
            }
        }

        config
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.capacity == 0 {
            return Err(ConfigError::Validation(
                "capacity must be at least 1".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::Validation(
                "user_agent cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
