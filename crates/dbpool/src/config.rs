//! Pool configuration.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Configuration for a managed data source.
///
/// Immutable once handed to [`Pool::new`](crate::pool::Pool::new); the pool
/// keeps its own copy and never mutates it. Validation happens at a single
/// boundary ([`PoolConfig::validate`]) before any resource is allocated.
///
/// When the URL, driver, or validation query are only partially specified,
/// sensible defaults are calculated from what is present (see
/// [`PoolConfig::driver`] and [`PoolConfig::validation_query`]).
#[derive(Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PoolConfig {
    /// Connection URL, e.g. `postgres://db-host:5432/app`.
    pub url: String,

    /// Username for authenticating to the database.
    pub username: Option<String>,

    /// Password, or a reference resolvable by the backend (vault key etc.).
    pub password: Option<String>,

    /// Connections opened eagerly at startup and kept as a floor.
    pub min_pool_size: u32,

    /// Upper bound on total connections (leased + idle).
    pub max_pool_size: u32,

    /// How long an acquisition may wait for a free connection.
    pub connection_wait_timeout: Duration,

    /// Idle connections older than this are discarded on checkout.
    pub idle_timeout: Duration,

    /// Bounded grace period for in-flight leases during shutdown.
    pub shutdown_grace: Duration,

    /// Probe statement for health checks. Defaults per driver when unset.
    pub validation_query: Option<String>,

    /// Passthrough options handed verbatim to the connection backend.
    pub properties: HashMap<String, String>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            username: None,
            password: None,
            min_pool_size: 1,
            max_pool_size: 10,
            connection_wait_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            shutdown_grace: Duration::from_secs(5),
            validation_query: None,
            properties: HashMap::new(),
        }
    }
}

impl PoolConfig {
    /// Create a configuration with default sizing for the given URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Set the username.
    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set the password.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the minimum pool size.
    #[must_use]
    pub fn min_pool_size(mut self, min: u32) -> Self {
        self.min_pool_size = min;
        self
    }

    /// Set the maximum pool size.
    #[must_use]
    pub fn max_pool_size(mut self, max: u32) -> Self {
        self.max_pool_size = max;
        self
    }

    /// Set the acquisition timeout.
    #[must_use]
    pub fn connection_wait_timeout(mut self, timeout: Duration) -> Self {
        self.connection_wait_timeout = timeout;
        self
    }

    /// Set the idle discard timeout.
    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the shutdown grace period.
    #[must_use]
    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Set an explicit validation query.
    #[must_use]
    pub fn validation_query(mut self, query: impl Into<String>) -> Self {
        self.validation_query = Some(query.into());
        self
    }

    /// Add a passthrough backend property.
    #[must_use]
    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Validate the configuration.
    ///
    /// Called by the pool before any resource allocation; all configuration
    /// failures surface here rather than on first use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::MissingUrl);
        }
        if self.max_pool_size == 0 {
            return Err(ConfigError::ZeroMaxConnections);
        }
        if self.min_pool_size > self.max_pool_size {
            return Err(ConfigError::MinExceedsMax {
                min: self.min_pool_size,
                max: self.max_pool_size,
            });
        }
        Ok(())
    }

    /// Derive the driver from the URL scheme.
    ///
    /// JDBC-style `jdbc:postgresql://…` URLs are recognized alongside plain
    /// `postgres://…` ones. Returns `None` for unknown schemes; the backend
    /// may still accept the URL.
    #[must_use]
    pub fn driver(&self) -> Option<Driver> {
        let url = self.url.strip_prefix("jdbc:").unwrap_or(&self.url);
        let scheme = url.split(':').next().unwrap_or_default();
        match scheme.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Some(Driver::Postgres),
            "mysql" | "mariadb" => Some(Driver::MySql),
            "sqlite" => Some(Driver::Sqlite),
            "mssql" | "sqlserver" => Some(Driver::SqlServer),
            "oracle" => Some(Driver::Oracle),
            _ => None,
        }
    }

    /// The validation query to probe connections with.
    ///
    /// Falls back to a per-driver default when not configured explicitly:
    /// `SELECT 1 FROM DUAL` for Oracle, `SELECT 1` everywhere else.
    #[must_use]
    pub fn effective_validation_query(&self) -> &str {
        if let Some(query) = self.validation_query.as_deref() {
            return query;
        }
        match self.driver() {
            Some(Driver::Oracle) => "SELECT 1 FROM DUAL",
            _ => "SELECT 1",
        }
    }
}

// Manual Debug so credentials never land in logs.
impl fmt::Debug for PoolConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("min_pool_size", &self.min_pool_size)
            .field("max_pool_size", &self.max_pool_size)
            .field("connection_wait_timeout", &self.connection_wait_timeout)
            .field("idle_timeout", &self.idle_timeout)
            .field("shutdown_grace", &self.shutdown_grace)
            .field("validation_query", &self.validation_query)
            .field("properties", &self.properties)
            .finish()
    }
}

/// Database driver families recognized from connection URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Driver {
    /// PostgreSQL.
    Postgres,
    /// MySQL or MariaDB.
    MySql,
    /// SQLite.
    Sqlite,
    /// Microsoft SQL Server.
    SqlServer,
    /// Oracle.
    Oracle,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_defaults_with_url() {
        let config = PoolConfig::new("postgres://localhost/app");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_url() {
        let config = PoolConfig::default();
        assert!(matches!(config.validate(), Err(ConfigError::MissingUrl)));

        let config = PoolConfig::new("   ");
        assert!(matches!(config.validate(), Err(ConfigError::MissingUrl)));
    }

    #[test]
    fn test_validate_rejects_min_over_max() {
        let config = PoolConfig::new("postgres://localhost/app")
            .min_pool_size(8)
            .max_pool_size(4);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MinExceedsMax { min: 8, max: 4 })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_max() {
        let config = PoolConfig::new("postgres://localhost/app")
            .min_pool_size(0)
            .max_pool_size(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroMaxConnections)
        ));
    }

    #[test]
    fn test_driver_from_scheme() {
        let cases = [
            ("postgres://h/db", Some(Driver::Postgres)),
            ("jdbc:postgresql://h/db", Some(Driver::Postgres)),
            ("mysql://h/db", Some(Driver::MySql)),
            ("sqlite::memory:", Some(Driver::Sqlite)),
            ("mssql://h/db", Some(Driver::SqlServer)),
            ("oracle:thin:@h:1521/db", Some(Driver::Oracle)),
            ("bolt://h/db", None),
        ];
        for (url, driver) in cases {
            assert_eq!(PoolConfig::new(url).driver(), driver, "url: {url}");
        }
    }

    #[test]
    fn test_validation_query_defaults_per_driver() {
        let config = PoolConfig::new("postgres://h/db");
        assert_eq!(config.effective_validation_query(), "SELECT 1");

        let config = PoolConfig::new("oracle:thin:@h:1521/db");
        assert_eq!(config.effective_validation_query(), "SELECT 1 FROM DUAL");

        let config = PoolConfig::new("postgres://h/db").validation_query("SELECT version()");
        assert_eq!(config.effective_validation_query(), "SELECT version()");
    }

    #[test]
    fn test_builder_fluent() {
        let config = PoolConfig::new("mysql://h/db")
            .username("app")
            .password("secret")
            .min_pool_size(2)
            .max_pool_size(20)
            .connection_wait_timeout(Duration::from_millis(250))
            .property("ssl-mode", "require");

        assert_eq!(config.min_pool_size, 2);
        assert_eq!(config.max_pool_size, 20);
        assert_eq!(config.connection_wait_timeout, Duration::from_millis(250));
        assert_eq!(config.properties.get("ssl-mode").map(String::as_str), Some("require"));
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = PoolConfig::new("postgres://h/db").password("hunter2");
        let printed = format!("{config:?}");
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("<redacted>"));
    }
}
