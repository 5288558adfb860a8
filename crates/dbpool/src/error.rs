//! Pool and configuration error types.

use std::time::Duration;

use thiserror::Error;

/// Boxed error type for failures originating in the connection backend.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors detected while validating or binding pool configuration.
///
/// Configuration errors are fatal: they are raised before any pool
/// resource is allocated and abort startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No connection URL was supplied.
    #[error("data source URL is required")]
    MissingUrl,

    /// Minimum pool size exceeds the maximum.
    #[error("min-pool-size {min} exceeds max-pool-size {max}")]
    MinExceedsMax {
        /// Configured minimum.
        min: u32,
        /// Configured maximum.
        max: u32,
    },

    /// The pool must be allowed at least one connection.
    #[error("max-pool-size must be greater than 0")]
    ZeroMaxConnections,

    /// A configuration property could not be parsed.
    #[error("invalid value for {key}: {value}")]
    InvalidValue {
        /// Property key, including its `datasources.<name>.` prefix.
        key: String,
        /// The rejected value.
        value: String,
    },
}

/// Errors returned by pool operations.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Invalid configuration, surfaced before any resource allocation.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No connection became available within the acquisition timeout.
    ///
    /// Recoverable: the caller owns retry/backoff policy.
    #[error("connection pool exhausted: no connection available within {timeout:?}")]
    Exhausted {
        /// The acquisition timeout that elapsed.
        timeout: Duration,
    },

    /// The pool has been shut down; no new work may be issued.
    #[error("connection pool is closed")]
    Closed,

    /// A connection was checked in twice. Programming error.
    #[error("connection released twice")]
    DoubleRelease,

    /// The underlying driver failed to open or probe a connection.
    #[error("connection backend error: {0}")]
    Backend(#[source] BoxError),
}

impl PoolError {
    /// Whether the caller may reasonably retry the failed operation.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}
