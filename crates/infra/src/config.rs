//! Runtime configuration, loaded from environment variables with defaults.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// HTTP listen address.
    pub bind_addr: SocketAddr,

    /// PostgreSQL connection string. In-memory stores are used when absent.
    pub database_url: Option<String>,

    pub db_max_connections: u32,

    pub db_acquire_timeout: Duration,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {0}")]
    InvalidValue(String),
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup (the process environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        fn parsed<T: std::str::FromStr>(
            lookup: &impl Fn(&str) -> Option<String>,
            key: &str,
            default: &str,
        ) -> Result<T, ConfigError> {
            lookup(key)
                .unwrap_or_else(|| default.to_string())
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        }

        let db_max_connections: u32 = parsed(&lookup, "WAREFLOW_DB_MAX_CONNECTIONS", "10")?;
        if db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("WAREFLOW_DB_MAX_CONNECTIONS".to_string()));
        }

        Ok(Self {
            bind_addr: parsed(&lookup, "WAREFLOW_BIND_ADDR", "0.0.0.0:8080")?,
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            db_max_connections,
            db_acquire_timeout: Duration::from_secs(parsed(
                &lookup,
                "WAREFLOW_DB_ACQUIRE_TIMEOUT_SECS",
                "5",
            )?),
        })
    }

    /// Connect a pool when a database URL is configured.
    pub async fn connect(&self) -> Result<Option<PgPool>, sqlx::Error> {
        let Some(url) = &self.database_url else {
            return Ok(None);
        };
        let pool = PgPoolOptions::new()
            .max_connections(self.db_max_connections)
            .acquire_timeout(self.db_acquire_timeout)
            .connect(url)
            .await?;
        info!(max_connections = self.db_max_connections, "connected to postgres");
        Ok(Some(pool))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let cfg = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(cfg.database_url, None);
        assert_eq!(cfg.db_max_connections, 10);
        assert_eq!(cfg.db_acquire_timeout, Duration::from_secs(5));
    }

    #[test]
    fn values_are_read_from_the_lookup() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("WAREFLOW_BIND_ADDR", "127.0.0.1:9000"),
            ("DATABASE_URL", "postgres://localhost/wareflow"),
            ("WAREFLOW_DB_MAX_CONNECTIONS", "3"),
            ("WAREFLOW_DB_ACQUIRE_TIMEOUT_SECS", "1"),
        ]))
        .unwrap();
        assert_eq!(cfg.bind_addr.port(), 9000);
        assert_eq!(cfg.database_url.as_deref(), Some("postgres://localhost/wareflow"));
        assert_eq!(cfg.db_max_connections, 3);
        assert_eq!(cfg.db_acquire_timeout, Duration::from_secs(1));
    }

    #[test]
    fn bad_values_name_the_variable() {
        let err = AppConfig::from_lookup(lookup(&[("WAREFLOW_DB_MAX_CONNECTIONS", "lots")])).unwrap_err();
        assert_eq!(err, ConfigError::InvalidValue("WAREFLOW_DB_MAX_CONNECTIONS".to_string()));

        let err = AppConfig::from_lookup(lookup(&[("WAREFLOW_BIND_ADDR", "nowhere")])).unwrap_err();
        assert_eq!(err, ConfigError::InvalidValue("WAREFLOW_BIND_ADDR".to_string()));
    }

    #[test]
    fn blank_database_url_means_in_memory() {
        let cfg = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "  ")])).unwrap();
        assert!(cfg.database_url.is_none());
    }
}
