//! Environment-driven store configuration.
//!
//! # Responsibility
//! - Resolve backend name, database location, page ceiling and connect
//!   retry policy from `GRANTBOOK_*` environment variables.
//!
//! # Invariants
//! - Missing variables fall back to defaults; malformed ones are errors.
//! - `max_limit` is always at least 1.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_BACKEND: &str = "GRANTBOOK_BACKEND";
pub const ENV_DB_URL: &str = "GRANTBOOK_DB_URL";
pub const ENV_MAX_LIMIT: &str = "GRANTBOOK_MAX_LIMIT";
pub const ENV_CONNECT_RETRIES: &str = "GRANTBOOK_CONNECT_RETRIES";
pub const ENV_RETRY_BACKOFF_MS: &str = "GRANTBOOK_RETRY_BACKOFF_MS";

pub const DEFAULT_BACKEND: &str = "sqlite";
pub const DEFAULT_MAX_LIMIT: u32 = 100;
pub const DEFAULT_CONNECT_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, value, reason } => {
                write!(f, "invalid {key} '{value}': {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

/// Database location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseUrl {
    Memory,
    File(PathBuf),
}

impl DatabaseUrl {
    /// Parses `:memory:`, `sqlite::memory:`, `sqlite:<path>` or a bare path.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let trimmed = value.trim();
        let path = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
        if path.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: ENV_DB_URL,
                value: value.to_string(),
                reason: "database path cannot be empty".to_string(),
            });
        }
        if path == ":memory:" {
            return Ok(Self::Memory);
        }
        Ok(Self::File(PathBuf::from(path)))
    }
}

impl Display for DatabaseUrl {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => write!(f, "sqlite::memory:"),
            Self::File(path) => write!(f, "sqlite:{}", path.display()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Registry name the store is registered under.
    pub backend: String,
    pub database: DatabaseUrl,
    /// Upper bound for `limit` in find operations.
    pub max_limit: u32,
    /// Extra connect attempts after the first failure.
    pub connect_retries: u32,
    /// Base delay between connect attempts; multiplied by the attempt number.
    pub retry_backoff: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: DEFAULT_BACKEND.to_string(),
            database: DatabaseUrl::Memory,
            max_limit: DEFAULT_MAX_LIMIT,
            connect_retries: DEFAULT_CONNECT_RETRIES,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

impl StoreConfig {
    /// Loads configuration from process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(backend) = lookup(ENV_BACKEND) {
            let backend = backend.trim();
            if !backend.is_empty() {
                config.backend = backend.to_ascii_lowercase();
            }
        }
        if let Some(url) = lookup(ENV_DB_URL) {
            config.database = DatabaseUrl::parse(&url)?;
        }
        if let Some(value) = lookup(ENV_MAX_LIMIT) {
            let max_limit = parse_u32(ENV_MAX_LIMIT, &value)?;
            if max_limit == 0 {
                return Err(ConfigError::InvalidValue {
                    key: ENV_MAX_LIMIT,
                    value,
                    reason: "must be at least 1".to_string(),
                });
            }
            config.max_limit = max_limit;
        }
        if let Some(value) = lookup(ENV_CONNECT_RETRIES) {
            config.connect_retries = parse_u32(ENV_CONNECT_RETRIES, &value)?;
        }
        if let Some(value) = lookup(ENV_RETRY_BACKOFF_MS) {
            config.retry_backoff =
                Duration::from_millis(u64::from(parse_u32(ENV_RETRY_BACKOFF_MS, &value)?));
        }

        Ok(config)
    }
}

fn parse_u32(key: &'static str, value: &str) -> Result<u32, ConfigError> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|err| ConfigError::InvalidValue {
            key,
            value: value.to_string(),
            reason: err.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, DatabaseUrl, StoreConfig, DEFAULT_MAX_LIMIT};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    fn config_from(pairs: &[(&str, &str)]) -> Result<StoreConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        StoreConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.max_limit, DEFAULT_MAX_LIMIT);
        assert_eq!(config.database, DatabaseUrl::Memory);
    }

    #[test]
    fn reads_all_known_keys() {
        let config = config_from(&[
            ("GRANTBOOK_BACKEND", " SQLite "),
            ("GRANTBOOK_DB_URL", "sqlite:/var/lib/grantbook.db"),
            ("GRANTBOOK_MAX_LIMIT", "25"),
            ("GRANTBOOK_CONNECT_RETRIES", "0"),
            ("GRANTBOOK_RETRY_BACKOFF_MS", "50"),
        ])
        .unwrap();
        assert_eq!(config.backend, "sqlite");
        assert_eq!(
            config.database,
            DatabaseUrl::File(PathBuf::from("/var/lib/grantbook.db"))
        );
        assert_eq!(config.max_limit, 25);
        assert_eq!(config.connect_retries, 0);
        assert_eq!(config.retry_backoff, Duration::from_millis(50));
    }

    #[test]
    fn rejects_malformed_or_zero_limit() {
        let malformed = config_from(&[("GRANTBOOK_MAX_LIMIT", "lots")]).unwrap_err();
        assert!(malformed.to_string().contains("GRANTBOOK_MAX_LIMIT"));
        assert!(config_from(&[("GRANTBOOK_MAX_LIMIT", "0")]).is_err());
    }

    #[test]
    fn database_url_variants() {
        assert_eq!(DatabaseUrl::parse(":memory:").unwrap(), DatabaseUrl::Memory);
        assert_eq!(
            DatabaseUrl::parse("sqlite::memory:").unwrap(),
            DatabaseUrl::Memory
        );
        assert_eq!(
            DatabaseUrl::parse("data/accounts.db").unwrap(),
            DatabaseUrl::File(PathBuf::from("data/accounts.db"))
        );
        assert!(DatabaseUrl::parse("sqlite:").is_err());
        assert_eq!(DatabaseUrl::Memory.to_string(), "sqlite::memory:");
    }
}
