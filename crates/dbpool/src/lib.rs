//! # dbpool
//!
//! Lifecycle-managed connection pool adapter for async database backends.
//!
//! This crate is the layer between a hosting container and a database
//! driver: it owns pool construction and teardown, leases connections
//! through an RAII guard, and publishes health and occupancy. The driver
//! itself stays external, behind the [`ConnectionFactory`] seam.
//!
//! ## Lifecycle
//!
//! Configuration is validated once, at a single boundary, before any
//! resource exists. Construction is eager: the minimum connection floor is
//! opened up front so startup failures surface at startup, and a partial
//! warm-up is rolled back completely. Shutdown drains in-flight leases for
//! a bounded grace period, closes everything exactly once, and logs (never
//! propagates) close failures.
//!
//! ## Example
//!
//! ```rust,ignore
//! use dbpool::{Pool, PoolConfig};
//! use std::time::Duration;
//!
//! let config = PoolConfig::new("postgres://db:5432/app")
//!     .username("app")
//!     .min_pool_size(2)
//!     .max_pool_size(10)
//!     .connection_wait_timeout(Duration::from_secs(5));
//!
//! let pool = Pool::new(config, driver_factory).await?;
//!
//! {
//!     let conn = pool.get().await?;
//!     // Use the connection; it returns to the pool when the scope ends.
//! }
//!
//! println!("{:?}", pool.status());
//! pool.close().await;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod health;
pub mod lifecycle;
pub mod pool;

#[cfg(test)]
mod test_support;

// Configuration
pub use config::{Driver, PoolConfig};

// Error types
pub use error::{BoxError, ConfigError, PoolError};

// Pool types
pub use pool::{Pool, PoolMetrics, PoolStats, PooledConnection};

// Backend seam
pub use lifecycle::{ConnectionFactory, ConnectionMetadata, ManagedConnection};

// Health reporting
pub use health::{HealthResult, HealthStatus};
