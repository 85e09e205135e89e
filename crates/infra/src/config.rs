//! Configuration loading and representation.
//!
//! Every setting has a default and can be overridden through a
//! `STOCKLEDGER_*` environment variable.

use std::time::Duration;

use thiserror::Error;

use stockledger_inventory::ReversalPolicy;
use stockledger_observability::LogFormat;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://stockledger.db";
pub const IN_MEMORY_DATABASE_URL: &str = "sqlite::memory:";

pub const ENV_DATABASE_URL: &str = "STOCKLEDGER_DATABASE_URL";
pub const ENV_MAX_CONNECTIONS: &str = "STOCKLEDGER_MAX_CONNECTIONS";
pub const ENV_BUSY_TIMEOUT_MS: &str = "STOCKLEDGER_BUSY_TIMEOUT_MS";
pub const ENV_REVERSAL_POLICY: &str = "STOCKLEDGER_REVERSAL_POLICY";
pub const ENV_LOG_FORMAT: &str = "STOCKLEDGER_LOG_FORMAT";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(key: &'static str, reason: impl ToString) -> Self {
        Self::Invalid {
            key,
            reason: reason.to_string(),
        }
    }
}

/// Store and engine settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub database_url: String,
    /// Upper bound for the connection pool. Ignored for in-memory databases,
    /// which always use exactly one connection.
    pub max_connections: u32,
    /// How long SQLite waits on a locked database before failing.
    pub busy_timeout: Duration,
    pub reversal_policy: ReversalPolicy,
    pub log_format: LogFormat,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: 4,
            busy_timeout: Duration::from_millis(5_000),
            reversal_policy: ReversalPolicy::default(),
            log_format: LogFormat::default(),
        }
    }
}

impl StoreConfig {
    /// Private, process-local database (tests, dry runs).
    pub fn in_memory() -> Self {
        Self::default().with_database_url(IN_MEMORY_DATABASE_URL)
    }

    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = url.into();
        self
    }

    pub fn with_reversal_policy(mut self, policy: ReversalPolicy) -> Self {
        self.reversal_policy = policy;
        self
    }

    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_DATABASE_URL) {
            if url.trim().is_empty() {
                return Err(ConfigError::invalid(ENV_DATABASE_URL, "must not be empty"));
            }
            config.database_url = url.trim().to_string();
        }

        if let Some(raw) = lookup(ENV_MAX_CONNECTIONS) {
            let max: u32 = raw
                .trim()
                .parse()
                .map_err(|e| ConfigError::invalid(ENV_MAX_CONNECTIONS, e))?;
            if max == 0 {
                return Err(ConfigError::invalid(ENV_MAX_CONNECTIONS, "must be at least 1"));
            }
            config.max_connections = max;
        }

        if let Some(raw) = lookup(ENV_BUSY_TIMEOUT_MS) {
            let ms: u64 = raw
                .trim()
                .parse()
                .map_err(|e| ConfigError::invalid(ENV_BUSY_TIMEOUT_MS, e))?;
            config.busy_timeout = Duration::from_millis(ms);
        }

        if let Some(raw) = lookup(ENV_REVERSAL_POLICY) {
            config.reversal_policy = raw
                .parse()
                .map_err(|e| ConfigError::invalid(ENV_REVERSAL_POLICY, e))?;
        }

        if let Some(raw) = lookup(ENV_LOG_FORMAT) {
            config.log_format = raw
                .parse()
                .map_err(|e| ConfigError::invalid(ENV_LOG_FORMAT, e))?;
        }

        Ok(config)
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
    }
}
