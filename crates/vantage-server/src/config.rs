//! Server configuration from environment variables.
//!
//! - `VANTAGE_DB_PATH`: SQLite database file (default `vantage.db`);
//!   `:memory:` selects the in-memory store
//! - `VANTAGE_PORT`: listen port (default `8080`)
//! - `VANTAGE_QUEUE_INTERVAL_MS`: queue consumer wake-up interval (default `1000`)
//! - `VANTAGE_LOCK_TIMEOUT_MS`: lock wait and SQLite busy timeout (default `30000`)

use std::str::FromStr;
use std::time::Duration;

/// Database path that selects the in-memory store.
pub const IN_MEMORY: &str = ":memory:";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub db_path: String,
    pub port: u16,
    pub queue_interval: Duration,
    pub lock_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            db_path: "vantage.db".to_string(),
            port: 8080,
            queue_interval: Duration::from_millis(1000),
            lock_timeout: Duration::from_millis(30_000),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable source; unset variables
    /// keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = ServerConfig::default();
        Ok(ServerConfig {
            db_path: lookup("VANTAGE_DB_PATH").unwrap_or(defaults.db_path),
            port: parse(&lookup, "VANTAGE_PORT")?.unwrap_or(defaults.port),
            queue_interval: parse(&lookup, "VANTAGE_QUEUE_INTERVAL_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.queue_interval),
            lock_timeout: parse(&lookup, "VANTAGE_LOCK_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.lock_timeout),
        })
    }

    pub fn in_memory(&self) -> bool {
        self.db_path == IN_MEMORY
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}
