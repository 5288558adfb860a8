//! The seam between the pool and the external connection backend.
//!
//! The pool never speaks a database protocol itself. A backend library
//! implements [`ManagedConnection`] for its connection type and
//! [`ConnectionFactory`] to mint them; the pool owns everything else
//! (sizing, leasing, recycling, shutdown).

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::error::BoxError;

/// A live connection owned by the pool and leased to callers.
#[async_trait]
pub trait ManagedConnection: Send + Sync + 'static {
    /// Whether the underlying transport is known to be dead.
    fn is_closed(&self) -> bool;

    /// Run the backend's liveness probe (typically the validation query).
    async fn ping(&self) -> Result<(), BoxError>;

    /// Close the connection, releasing backend resources.
    async fn close(&self) -> Result<(), BoxError>;
}

/// Creates and validates connections on behalf of the pool.
#[async_trait]
pub trait ConnectionFactory: Send + Sync + 'static {
    /// Open a new connection.
    async fn create(&self) -> Result<Arc<dyn ManagedConnection>, BoxError>;

    /// Check whether an idle connection is still usable before re-lease.
    ///
    /// The default only rejects connections that report themselves closed.
    async fn validate(&self, conn: &dyn ManagedConnection) -> bool {
        !conn.is_closed()
    }
}

#[async_trait]
impl<T: ConnectionFactory> ConnectionFactory for Arc<T> {
    async fn create(&self) -> Result<Arc<dyn ManagedConnection>, BoxError> {
        (**self).create().await
    }

    async fn validate(&self, conn: &dyn ManagedConnection) -> bool {
        (**self).validate(conn).await
    }
}

/// Bookkeeping the pool attaches to every connection it owns.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionMetadata {
    /// Pool-unique connection id, for log correlation.
    pub id: u64,
    /// When the connection was opened.
    pub created_at: Instant,
    /// When the connection was last leased or returned.
    pub last_used_at: Instant,
}

impl ConnectionMetadata {
    pub(crate) fn new(id: u64) -> Self {
        let now = Instant::now();
        Self {
            id,
            created_at: now,
            last_used_at: now,
        }
    }

    pub(crate) fn touch(&mut self) {
        self.last_used_at = Instant::now();
    }

    /// How long the connection has been alive.
    #[must_use]
    pub fn age(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }

    /// How long since the connection was last used.
    #[must_use]
    pub fn idle_for(&self) -> std::time::Duration {
        self.last_used_at.elapsed()
    }
}
