//! The connection pool adapter.
//!
//! [`Pool`] owns exactly one underlying pool resource: it opens the minimum
//! connection floor eagerly at construction, hands out [`PooledConnection`]
//! leases bounded by a semaphore, and tears everything down exactly once on
//! [`Pool::close`]. The actual wire protocol lives behind the
//! [`ConnectionFactory`] seam.

use std::collections::{HashSet, VecDeque};
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::lifecycle::{ConnectionFactory, ConnectionMetadata, ManagedConnection};

/// Interval at which shutdown re-checks for outstanding leases.
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A lifecycle-managed connection pool.
///
/// Cloning is cheap and all clones share the same underlying pool. Leases
/// are returned automatically when dropped, on every exit path.
///
/// # Example
///
/// ```rust,ignore
/// use dbpool::{Pool, PoolConfig};
///
/// let config = PoolConfig::new("postgres://db:5432/app")
///     .min_pool_size(2)
///     .max_pool_size(10);
///
/// let pool = Pool::new(config, factory).await?;
///
/// let conn = pool.get().await?;
/// // Use connection; returned to the pool on drop.
///
/// pool.close().await;
/// ```
#[derive(Clone)]
pub struct Pool {
    inner: Arc<PoolInner>,
}

pub(crate) struct PoolInner {
    /// Pool configuration, never mutated after construction.
    config: PoolConfig,

    /// Backend seam that opens and validates connections.
    factory: Arc<dyn ConnectionFactory>,

    /// Bounds total connections (leased + being created).
    semaphore: Arc<Semaphore>,

    /// Idle connections, most recently returned at the back.
    idle: Mutex<VecDeque<IdleConnection>>,

    /// Ids of currently outstanding leases. Guards against double check-in.
    active: Mutex<HashSet<u64>>,

    /// Whether the pool has been shut down.
    closed: AtomicBool,

    /// Whether shutdown has finished reaping returned connections.
    /// Set under the `idle` lock so check-ins cannot race the final sweep.
    terminated: AtomicBool,

    /// Counter for generating connection ids.
    next_connection_id: AtomicU64,

    /// Callers currently blocked in `get`.
    waiting: AtomicUsize,

    /// When the pool was created.
    created_at: Instant,

    /// Pool metrics.
    metrics: Mutex<PoolMetricsInner>,
}

struct IdleConnection {
    connection: Arc<dyn ManagedConnection>,
    metadata: ConnectionMetadata,
}

/// Keeps the waiter count honest on every exit path, including a `get`
/// future dropped mid-wait.
struct WaitingGuard<'a>(&'a AtomicUsize);

impl<'a> WaitingGuard<'a> {
    fn register(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Internal metrics tracking.
#[derive(Debug, Default)]
struct PoolMetricsInner {
    connections_created: u64,
    connections_closed: u64,
    checkouts_successful: u64,
    checkouts_failed: u64,
}

impl Pool {
    /// Create a pool, opening `min_pool_size` connections eagerly.
    ///
    /// Validation failures and backend failures both surface here, before
    /// the pool is handed to anyone. If the warm-up fails partway, every
    /// connection opened so far is closed again; no partial pool survives.
    pub async fn new<F: ConnectionFactory>(
        config: PoolConfig,
        factory: F,
    ) -> Result<Self, PoolError> {
        Self::from_shared(config, Arc::new(factory)).await
    }

    /// Like [`Pool::new`], for an already-shared factory.
    pub async fn from_shared(
        config: PoolConfig,
        factory: Arc<dyn ConnectionFactory>,
    ) -> Result<Self, PoolError> {
        config.validate()?;

        let inner = Arc::new(PoolInner {
            semaphore: Arc::new(Semaphore::new(config.max_pool_size as usize)),
            config,
            factory,
            idle: Mutex::new(VecDeque::new()),
            active: Mutex::new(HashSet::new()),
            closed: AtomicBool::new(false),
            terminated: AtomicBool::new(false),
            next_connection_id: AtomicU64::new(1),
            waiting: AtomicUsize::new(0),
            created_at: Instant::now(),
            metrics: Mutex::new(PoolMetricsInner::default()),
        });
        let pool = Self { inner };

        pool.warm_up().await?;

        tracing::info!(
            url = %pool.inner.config.url,
            min = pool.inner.config.min_pool_size,
            max = pool.inner.config.max_pool_size,
            "connection pool created"
        );
        Ok(pool)
    }

    /// Open the minimum connection floor, rolling back on failure.
    async fn warm_up(&self) -> Result<(), PoolError> {
        let mut opened = Vec::with_capacity(self.inner.config.min_pool_size as usize);
        for _ in 0..self.inner.config.min_pool_size {
            match self.inner.factory.create().await {
                Ok(connection) => opened.push(connection),
                Err(source) => {
                    for connection in opened {
                        if let Err(close_err) = connection.close().await {
                            tracing::warn!(error = %close_err, "error rolling back connection");
                        }
                        self.inner.metrics.lock().connections_closed += 1;
                    }
                    return Err(PoolError::Backend(source));
                }
            }
        }

        let mut idle = self.inner.idle.lock();
        let mut metrics = self.inner.metrics.lock();
        for connection in opened {
            metrics.connections_created += 1;
            idle.push_back(IdleConnection {
                connection,
                metadata: ConnectionMetadata::new(self.inner.next_connection_id()),
            });
        }
        Ok(())
    }

    /// Get a connection from the pool.
    ///
    /// Reuses a validated idle connection when one exists, opens a new one
    /// while under `max_pool_size`, and otherwise waits for a return. The
    /// whole operation is bounded by `connection_wait_timeout`; on expiry
    /// the caller gets [`PoolError::Exhausted`] and owns any retry policy.
    ///
    /// Cancellation-safe: the capacity permit and any half-acquired
    /// connection live inside the timed future, so dropping the future
    /// releases everything.
    pub async fn get(&self) -> Result<PooledConnection, PoolError> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(PoolError::Closed);
        }

        let timeout = self.inner.config.connection_wait_timeout;
        let result = {
            // Guarded so a cancelled `get` still decrements the counter.
            let _waiting = WaitingGuard::register(&self.inner.waiting);
            tokio::time::timeout(timeout, self.checkout()).await
        };

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(_) => Err(PoolError::Exhausted { timeout }),
        };
        match &outcome {
            Ok(lease) => {
                self.inner.metrics.lock().checkouts_successful += 1;
                tracing::trace!(connection_id = lease.metadata.id, "connection leased");
            }
            Err(err) => {
                self.inner.metrics.lock().checkouts_failed += 1;
                tracing::debug!(error = %err, "connection checkout failed");
            }
        }
        outcome
    }

    async fn checkout(&self) -> Result<PooledConnection, PoolError> {
        let permit = Arc::clone(&self.inner.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| PoolError::Closed)?;

        let (connection, metadata) = match self.take_idle().await {
            Some(pair) => pair,
            None => {
                let connection = self
                    .inner
                    .factory
                    .create()
                    .await
                    .map_err(PoolError::Backend)?;
                self.inner.metrics.lock().connections_created += 1;
                (
                    connection,
                    ConnectionMetadata::new(self.inner.next_connection_id()),
                )
            }
        };

        self.inner.active.lock().insert(metadata.id);
        Ok(PooledConnection {
            connection: Some(connection),
            metadata,
            pool: Arc::clone(&self.inner),
            _permit: permit,
        })
    }

    /// Pop idle connections until one passes the staleness and validity
    /// checks; discarded ones are closed along the way.
    async fn take_idle(&self) -> Option<(Arc<dyn ManagedConnection>, ConnectionMetadata)> {
        loop {
            let candidate = self.inner.idle.lock().pop_front()?;

            if candidate.metadata.idle_for() > self.inner.config.idle_timeout {
                self.discard(candidate.connection, "idle timeout").await;
                continue;
            }
            if !self
                .inner
                .factory
                .validate(candidate.connection.as_ref())
                .await
            {
                self.discard(candidate.connection, "failed validation").await;
                continue;
            }

            let mut metadata = candidate.metadata;
            metadata.touch();
            return Some((candidate.connection, metadata));
        }
    }

    async fn discard(&self, connection: Arc<dyn ManagedConnection>, reason: &str) {
        tracing::debug!(reason, "discarding pooled connection");
        if let Err(err) = connection.close().await {
            tracing::warn!(error = %err, "error closing discarded connection");
        }
        self.inner.metrics.lock().connections_closed += 1;
    }

    /// Shut the pool down.
    ///
    /// Waits up to `shutdown_grace` for outstanding leases to come back,
    /// closing idle connections, and connections returned while draining,
    /// as it goes. Close failures are logged and do not prevent
    /// completion; calling this more than once is a no-op, and every `get`
    /// issued after the first call fails with [`PoolError::Closed`].
    pub async fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        // Wake blocked acquirers; they observe `Closed`.
        self.inner.semaphore.close();

        let deadline = Instant::now() + self.inner.config.shutdown_grace;
        loop {
            self.reap_idle().await;
            let outstanding = self.inner.active.lock().len();
            if outstanding == 0 {
                break;
            }
            if Instant::now() >= deadline {
                tracing::warn!(outstanding, "shutdown grace period expired with leases in flight");
                break;
            }
            tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
        }

        // The flag flips under the idle lock, so any check-in either landed
        // in the queue before this point (the sweep below gets it) or
        // observes `terminated` and drops its connection.
        {
            let _idle = self.inner.idle.lock();
            self.inner.terminated.store(true, Ordering::Release);
        }
        self.reap_idle().await;

        tracing::info!(url = %self.inner.config.url, "connection pool closed");
    }

    /// Close everything currently in the idle queue.
    async fn reap_idle(&self) {
        let drained: Vec<IdleConnection> = {
            let mut idle = self.inner.idle.lock();
            idle.drain(..).collect()
        };
        for entry in drained {
            if let Err(err) = entry.connection.close().await {
                tracing::warn!(
                    connection_id = entry.metadata.id,
                    error = %err,
                    "error closing connection during shutdown"
                );
            }
            self.inner.metrics.lock().connections_closed += 1;
        }
    }

    /// Snapshot of the pool's current occupancy.
    ///
    /// Never blocks and has no side effects; safe to poll from an
    /// observability loop.
    #[must_use]
    pub fn status(&self) -> PoolStats {
        let idle = self.inner.idle.lock().len() as u32;
        let active = self.inner.active.lock().len() as u32;
        PoolStats {
            active,
            idle,
            total: active + idle,
            max: self.inner.config.max_pool_size,
            waiting: self.inner.waiting.load(Ordering::SeqCst) as u32,
        }
    }

    /// Cumulative pool counters since construction.
    #[must_use]
    pub fn metrics(&self) -> PoolMetrics {
        let inner = self.inner.metrics.lock();
        PoolMetrics {
            connections_created: inner.connections_created,
            connections_closed: inner.connections_closed,
            checkouts_successful: inner.checkouts_successful,
            checkouts_failed: inner.checkouts_failed,
            uptime: self.inner.created_at.elapsed(),
        }
    }

    /// Check if the pool is closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Get the pool configuration.
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }
}

impl PoolInner {
    fn next_connection_id(&self) -> u64 {
        self.next_connection_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Return a leased connection. Rejects ids that are not outstanding.
    pub(crate) fn checkin(
        &self,
        mut metadata: ConnectionMetadata,
        connection: Arc<dyn ManagedConnection>,
    ) -> Result<(), PoolError> {
        if !self.active.lock().remove(&metadata.id) {
            return Err(PoolError::DoubleRelease);
        }

        // Dead connections are dropped, not re-idled.
        if connection.is_closed() {
            self.metrics.lock().connections_closed += 1;
            return Ok(());
        }

        metadata.touch();
        let mut idle = self.idle.lock();
        if self.terminated.load(Ordering::Acquire) {
            // Shutdown already swept the queue; nothing will close this
            // connection for us, so drop it here.
            drop(idle);
            tracing::debug!(
                connection_id = metadata.id,
                "connection returned after shutdown completed; dropping"
            );
            self.metrics.lock().connections_closed += 1;
            return Ok(());
        }
        // While shutdown is draining, the reap loop closes whatever lands
        // here; before shutdown this is the ordinary return path.
        idle.push_back(IdleConnection {
            connection,
            metadata,
        });
        Ok(())
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("url", &self.inner.config.url)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

/// Occupancy snapshot returned by [`Pool::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Connections currently leased out.
    pub active: u32,
    /// Idle connections ready for lease.
    pub idle: u32,
    /// Total connections owned by the pool.
    pub total: u32,
    /// Maximum allowed connections.
    pub max: u32,
    /// Callers currently waiting in `get`.
    pub waiting: u32,
}

impl PoolStats {
    /// Leased share of the maximum, as a percentage.
    #[must_use]
    pub fn utilization(&self) -> f64 {
        if self.max == 0 {
            return 0.0;
        }
        (self.active as f64 / self.max as f64) * 100.0
    }

    /// Check if the pool is at capacity.
    #[must_use]
    pub fn is_at_capacity(&self) -> bool {
        self.total >= self.max
    }
}

/// Counters collected from the pool.
#[derive(Debug, Clone)]
pub struct PoolMetrics {
    /// Total connections opened since pool start.
    pub connections_created: u64,
    /// Total connections closed since pool start.
    pub connections_closed: u64,
    /// Successful leases.
    pub checkouts_successful: u64,
    /// Failed leases (timeouts, pool closed, backend errors).
    pub checkouts_failed: u64,
    /// Time since pool creation.
    pub uptime: Duration,
}

impl PoolMetrics {
    /// Checkout success rate (0.0 to 1.0).
    #[must_use]
    pub fn checkout_success_rate(&self) -> f64 {
        let total = self.checkouts_successful + self.checkouts_failed;
        if total == 0 {
            return 1.0;
        }
        self.checkouts_successful as f64 / total as f64
    }
}

/// A connection leased from the pool.
///
/// Dereferences to the backend connection. When dropped, the connection is
/// returned to the pool; this holds on every exit path, including panics
/// and cancelled futures. [`release`](PooledConnection::release) does the
/// same explicitly and reports check-in errors instead of logging them.
pub struct PooledConnection {
    connection: Option<Arc<dyn ManagedConnection>>,
    metadata: ConnectionMetadata,
    pool: Arc<PoolInner>,
    _permit: OwnedSemaphorePermit,
}

impl PooledConnection {
    /// Metadata for the leased connection.
    #[must_use]
    pub fn metadata(&self) -> &ConnectionMetadata {
        &self.metadata
    }

    /// The backend connection, shareable beyond the `Deref` borrow.
    // Only `release` vacates the slot, and it consumes the lease.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn backend(&self) -> &Arc<dyn ManagedConnection> {
        self.connection.as_ref().expect("lease already released")
    }

    /// Return the connection to the pool explicitly.
    ///
    /// Equivalent to dropping the lease, except check-in failures are
    /// returned to the caller rather than logged.
    pub fn release(mut self) -> Result<(), PoolError> {
        match self.connection.take() {
            Some(connection) => self.pool.checkin(self.metadata, connection),
            None => Err(PoolError::DoubleRelease),
        }
    }
}

impl Deref for PooledConnection {
    type Target = dyn ManagedConnection;

    fn deref(&self) -> &Self::Target {
        self.backend().as_ref()
    }
}

impl std::fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            tracing::trace!(connection_id = self.metadata.id, "returning connection to pool");
            if let Err(err) = self.pool.checkin(self.metadata, connection) {
                tracing::warn!(
                    connection_id = self.metadata.id,
                    error = %err,
                    "failed to return connection to pool"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::test_support::MockFactory;

    fn small_pool_config() -> PoolConfig {
        PoolConfig::new("postgres://localhost/test")
            .min_pool_size(2)
            .max_pool_size(5)
            .connection_wait_timeout(Duration::from_millis(100))
            .shutdown_grace(Duration::from_millis(50))
    }

    #[tokio::test]
    async fn test_warm_up_opens_min_connections() {
        let factory = Arc::new(MockFactory::new());
        let pool = Pool::new(small_pool_config(), Arc::clone(&factory))
            .await
            .unwrap();

        let stats = pool.status();
        assert_eq!(stats.active, 0);
        assert_eq!(stats.idle, 2);
        assert_eq!(stats.total, 2);
        assert_eq!(factory.created(), 2);
    }

    #[tokio::test]
    async fn test_invalid_config_allocates_nothing() {
        let factory = Arc::new(MockFactory::new());
        let config = PoolConfig::new("postgres://localhost/test")
            .min_pool_size(6)
            .max_pool_size(3);

        let err = Pool::new(config, Arc::clone(&factory)).await.unwrap_err();
        assert!(matches!(
            err,
            PoolError::Config(ConfigError::MinExceedsMax { min: 6, max: 3 })
        ));
        assert_eq!(factory.created(), 0);
    }

    #[tokio::test]
    async fn test_warm_up_failure_rolls_back() {
        let factory = Arc::new(MockFactory::new().fail_after(1));
        let config = small_pool_config().min_pool_size(3);

        let err = Pool::new(config, Arc::clone(&factory)).await.unwrap_err();
        assert!(matches!(err, PoolError::Backend(_)));
        // One connection opened before the failure, and it was closed again.
        assert_eq!(factory.created(), 1);
        assert_eq!(factory.closed(), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_and_recovery() {
        let factory = Arc::new(MockFactory::new());
        let pool = Pool::new(small_pool_config(), Arc::clone(&factory))
            .await
            .unwrap();

        let mut leases = Vec::new();
        for _ in 0..5 {
            leases.push(pool.get().await.unwrap());
        }
        assert_eq!(factory.created(), 5);
        assert!(pool.status().is_at_capacity());

        let err = pool.get().await.unwrap_err();
        assert!(matches!(
            err,
            PoolError::Exhausted { timeout } if timeout == Duration::from_millis(100)
        ));

        // Returning one connection lets the retry through.
        leases.pop();
        let lease = pool.get().await.unwrap();
        drop(lease);
        drop(leases);
    }

    #[tokio::test]
    async fn test_release_restores_stats() {
        let pool = Pool::new(small_pool_config(), MockFactory::new())
            .await
            .unwrap();
        let before = pool.status();

        let lease = pool.get().await.unwrap();
        let during = pool.status();
        assert_eq!(during.active, 1);
        assert_eq!(during.idle, 1);

        lease.release().unwrap();
        assert_eq!(pool.status(), before);
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_rejects_gets() {
        let factory = Arc::new(MockFactory::new());
        let pool = Pool::new(small_pool_config(), Arc::clone(&factory))
            .await
            .unwrap();

        pool.close().await;
        assert!(pool.is_closed());
        assert!(matches!(pool.get().await, Err(PoolError::Closed)));
        assert_eq!(factory.closed(), 2);

        // Second close must not error or double-close connections.
        pool.close().await;
        assert_eq!(factory.closed(), 2);
        assert_eq!(pool.status().total, 0);
    }

    #[tokio::test]
    async fn test_connection_returned_during_grace_is_closed() {
        let factory = Arc::new(MockFactory::new());
        let config = small_pool_config().shutdown_grace(Duration::from_secs(2));
        let pool = Pool::new(config, Arc::clone(&factory)).await.unwrap();

        let lease = pool.get().await.unwrap();
        let closer = tokio::spawn({
            let pool = pool.clone();
            async move { pool.close().await }
        });

        // Return the lease partway into the grace period.
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(lease);
        closer.await.unwrap();

        // The drain closed the idle floor and the late return alike.
        assert_eq!(factory.closed(), factory.created());
        assert_eq!(pool.status().total, 0);
    }

    #[tokio::test]
    async fn test_cancelled_get_does_not_leak_waiting_count() {
        let config = PoolConfig::new("postgres://localhost/test")
            .min_pool_size(1)
            .max_pool_size(1)
            .connection_wait_timeout(Duration::from_secs(5));
        let pool = Pool::new(config, MockFactory::new()).await.unwrap();

        let lease = pool.get().await.unwrap();
        let blocked = tokio::spawn({
            let pool = pool.clone();
            async move { pool.get().await }
        });

        // Let the task block on pool capacity, then cancel it mid-wait.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(pool.status().waiting, 1);
        blocked.abort();
        assert!(blocked.await.unwrap_err().is_cancelled());

        assert_eq!(pool.status().waiting, 0);
        drop(lease);
    }

    #[tokio::test]
    async fn test_close_with_lease_in_flight_respects_grace() {
        let pool = Pool::new(small_pool_config(), MockFactory::new())
            .await
            .unwrap();
        let lease = pool.get().await.unwrap();

        let started = Instant::now();
        pool.close().await;
        assert!(started.elapsed() >= Duration::from_millis(50));

        // Late return after shutdown is dropped, not re-idled.
        drop(lease);
        assert_eq!(pool.status().idle, 0);
    }

    #[tokio::test]
    async fn test_double_release_is_an_error() {
        let pool = Pool::new(small_pool_config(), MockFactory::new())
            .await
            .unwrap();

        let lease = pool.get().await.unwrap();
        let metadata = *lease.metadata();
        let connection = Arc::clone(lease.backend());
        lease.release().unwrap();

        let err = pool.inner.checkin(metadata, connection).unwrap_err();
        assert!(matches!(err, PoolError::DoubleRelease));
        // The first release went through; the pool is intact.
        assert_eq!(pool.status().idle, 2);
    }

    #[tokio::test]
    async fn test_stale_idle_connections_are_recycled() {
        let factory = Arc::new(MockFactory::new());
        let config = small_pool_config().idle_timeout(Duration::from_nanos(1));
        let pool = Pool::new(config, Arc::clone(&factory)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;

        let lease = pool.get().await.unwrap();
        // Both warm-up connections were stale; a fresh one was opened.
        assert_eq!(factory.created(), 3);
        assert_eq!(factory.closed(), 2);
        drop(lease);
    }

    #[tokio::test]
    async fn test_dead_connection_is_not_reidled() {
        let pool = Pool::new(small_pool_config(), MockFactory::new())
            .await
            .unwrap();

        let lease = pool.get().await.unwrap();
        lease.close().await.unwrap();
        drop(lease);

        let stats = pool.status();
        assert_eq!(stats.active, 0);
        assert_eq!(stats.idle, 1);
    }

    #[tokio::test]
    async fn test_metrics_track_checkouts() {
        let pool = Pool::new(small_pool_config(), MockFactory::new())
            .await
            .unwrap();

        let lease = pool.get().await.unwrap();
        drop(lease);
        let _holds: Vec<_> = {
            let mut held = Vec::new();
            for _ in 0..5 {
                held.push(pool.get().await.unwrap());
            }
            held
        };
        let _ = pool.get().await.unwrap_err();

        let metrics = pool.metrics();
        assert_eq!(metrics.checkouts_successful, 6);
        assert_eq!(metrics.checkouts_failed, 1);
        assert!(metrics.checkout_success_rate() > 0.85);
    }

    #[test]
    fn test_stats_utilization() {
        let stats = PoolStats {
            active: 5,
            idle: 5,
            total: 10,
            max: 20,
            waiting: 0,
        };
        assert!((stats.utilization() - 25.0).abs() < f64::EPSILON);
        assert!(!stats.is_at_capacity());
    }
}
