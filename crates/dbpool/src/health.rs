//! Health reporting for managed pools.
//!
//! Two surfaces: [`Pool::status`](crate::pool::Pool::status) is the
//! non-blocking occupancy snapshot, and [`Pool::health`] is the active
//! indicator an observability sink polls on an interval. The active probe
//! leases a connection and runs the backend's liveness check, so it is
//! bounded by the pool's acquisition timeout.

use std::collections::BTreeMap;
use std::fmt;

use crate::pool::Pool;

/// Overall verdict of a health probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// The data source answered its liveness probe.
    Up,
    /// The probe failed; details carry the error.
    Down,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => f.write_str("UP"),
            Self::Down => f.write_str("DOWN"),
        }
    }
}

/// Outcome of probing one data source.
#[derive(Debug, Clone)]
pub struct HealthResult {
    /// Name of the probed data source.
    pub name: String,
    /// Probe verdict.
    pub status: HealthStatus,
    /// Free-form details: occupancy counts, or the failure cause.
    pub details: BTreeMap<String, String>,
}

impl HealthResult {
    fn new(name: &str, status: HealthStatus) -> Self {
        Self {
            name: name.to_string(),
            status,
            details: BTreeMap::new(),
        }
    }

    fn detail(mut self, key: &str, value: impl ToString) -> Self {
        self.details.insert(key.to_string(), value.to_string());
        self
    }

    /// Whether the probe reported [`HealthStatus::Up`].
    #[must_use]
    pub fn is_up(&self) -> bool {
        self.status == HealthStatus::Up
    }
}

impl Pool {
    /// Actively probe the data source.
    ///
    /// Leases a connection, runs the backend liveness check, and reports
    /// [`HealthStatus::Up`] with occupancy details, or
    /// [`HealthStatus::Down`] carrying the failure. Never panics and never
    /// blocks longer than the acquisition timeout.
    pub async fn health(&self, name: &str) -> HealthResult {
        if self.is_closed() {
            return HealthResult::new(name, HealthStatus::Down).detail("error", "pool is closed");
        }

        let lease = match self.get().await {
            Ok(lease) => lease,
            Err(err) => {
                tracing::debug!(datasource = name, error = %err, "health probe could not lease");
                return HealthResult::new(name, HealthStatus::Down).detail("error", err);
            }
        };

        let result = match lease.ping().await {
            Ok(()) => {
                let stats = self.status();
                HealthResult::new(name, HealthStatus::Up)
                    .detail("active", stats.active)
                    .detail("idle", stats.idle)
                    .detail("total", stats.total)
                    .detail("validation-query", self.config().effective_validation_query())
            }
            Err(err) => {
                tracing::warn!(datasource = name, error = %err, "health probe failed");
                HealthResult::new(name, HealthStatus::Down).detail("error", err)
            }
        };
        drop(lease);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolConfig;
    use crate::test_support::MockFactory;

    fn config() -> PoolConfig {
        PoolConfig::new("postgres://localhost/health")
            .min_pool_size(1)
            .max_pool_size(2)
            .connection_wait_timeout(std::time::Duration::from_millis(100))
    }

    #[tokio::test]
    async fn test_healthy_pool_reports_up() {
        let pool = Pool::new(config(), MockFactory::new()).await.unwrap();

        let result = pool.health("default").await;
        assert!(result.is_up());
        assert_eq!(result.name, "default");
        assert_eq!(result.details.get("validation-query").map(String::as_str), Some("SELECT 1"));
        // The probe lease was returned before the snapshot-free exit.
        assert_eq!(pool.status().active, 0);
    }

    #[tokio::test]
    async fn test_failing_ping_reports_down() {
        let factory = MockFactory::new().with_failing_pings();
        let pool = Pool::new(config(), factory).await.unwrap();

        let result = pool.health("default").await;
        assert_eq!(result.status, HealthStatus::Down);
        assert!(result.details.contains_key("error"));
    }

    #[tokio::test]
    async fn test_closed_pool_reports_down_without_leasing() {
        let pool = Pool::new(config(), MockFactory::new()).await.unwrap();
        pool.close().await;

        let result = pool.health("default").await;
        assert_eq!(result.status, HealthStatus::Down);
        assert_eq!(result.details.get("error").map(String::as_str), Some("pool is closed"));
    }
}
