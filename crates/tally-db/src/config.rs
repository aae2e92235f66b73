//! Engine configuration.
//!
//! Loaded from environment variables with fallback to defaults.
//!
//! | Variable                    | Default                         |
//! |-----------------------------|---------------------------------|
//! | `TALLY_DB_PATH`             | `tally.db`                      |
//! | `TALLY_DB_MAX_CONNECTIONS`  | `5`                             |
//! | `TALLY_DB_BUSY_TIMEOUT_MS`  | `5000`                          |
//! | `TALLY_LOG`                 | `info,tally=debug,sqlx=warn`    |

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::pool::DbConfig;

/// Default tracing directive when neither `RUST_LOG` nor `TALLY_LOG` is set.
pub const DEFAULT_LOG_FILTER: &str = "info,tally=debug,sqlx=warn";

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Pool size
    pub max_connections: u32,

    /// How long a writer waits for the database lock, in milliseconds
    pub busy_timeout_ms: u64,

    /// `tracing_subscriber::EnvFilter` directive
    pub log_filter: String,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which returns a variable's value
    /// if set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = AppConfig {
            database_path: lookup("TALLY_DB_PATH")
                .unwrap_or_else(|| "tally.db".to_string())
                .into(),

            max_connections: lookup("TALLY_DB_MAX_CONNECTIONS")
                .unwrap_or_else(|| "5".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("TALLY_DB_MAX_CONNECTIONS".to_string()))?,

            busy_timeout_ms: lookup("TALLY_DB_BUSY_TIMEOUT_MS")
                .unwrap_or_else(|| "5000".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("TALLY_DB_BUSY_TIMEOUT_MS".to_string()))?,

            log_filter: lookup("TALLY_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        };

        if config.max_connections == 0 {
            return Err(ConfigError::InvalidValue("TALLY_DB_MAX_CONNECTIONS".to_string()));
        }

        Ok(config)
    }

    /// Pool configuration for this environment.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path.clone())
            .max_connections(self.max_connections)
            .busy_timeout(Duration::from_millis(self.busy_timeout_ms))
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.database_path, PathBuf::from("tally.db"));
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.busy_timeout_ms, 5000);
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_overrides_reach_db_config() {
        let config = AppConfig::from_lookup(lookup(&[
            ("TALLY_DB_PATH", "/var/lib/tally/shop.db"),
            ("TALLY_DB_MAX_CONNECTIONS", "12"),
            ("TALLY_DB_BUSY_TIMEOUT_MS", "250"),
        ]))
        .unwrap();

        let db = config.db_config();
        assert_eq!(db.database_path, PathBuf::from("/var/lib/tally/shop.db"));
        assert_eq!(db.max_connections, 12);
        assert_eq!(db.busy_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_malformed_values_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("TALLY_DB_MAX_CONNECTIONS", "many")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref key) if key == "TALLY_DB_MAX_CONNECTIONS"));

        assert!(AppConfig::from_lookup(lookup(&[("TALLY_DB_MAX_CONNECTIONS", "0")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("TALLY_DB_BUSY_TIMEOUT_MS", "-1")])).is_err());
    }
}
