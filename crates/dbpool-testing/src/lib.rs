//! # dbpool-testing
//!
//! In-memory mock backends for exercising `dbpool` without a database.
//!
//! [`MockFactory`] mints [`MockConnection`]s and counts every open and
//! close, so tests can assert on resource accounting (warm-up floors,
//! rollback on partial failure, shutdown draining). Failure injection
//! covers the two seams that matter: connection creation
//! ([`MockFactory::fail_after`]) and liveness probes
//! ([`MockFactory::with_failing_pings`]).

#![warn(missing_docs)]
#![deny(unsafe_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use dbpool::{BoxError, ConnectionFactory, ManagedConnection};

/// A connection that exists only as counters.
pub struct MockConnection {
    id: usize,
    closed: AtomicBool,
    fail_pings: bool,
    close_count: Arc<AtomicUsize>,
}

impl MockConnection {
    /// The creation index assigned by the factory.
    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }
}

#[async_trait]
impl ManagedConnection for MockConnection {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn ping(&self) -> Result<(), BoxError> {
        if self.fail_pings {
            return Err("mock ping failure".into());
        }
        if self.is_closed() {
            return Err("connection closed".into());
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), BoxError> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.close_count.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// A factory that mints [`MockConnection`]s and records what happened.
#[derive(Default)]
pub struct MockFactory {
    created: AtomicUsize,
    closed: Arc<AtomicUsize>,
    fail_after: Option<usize>,
    fail_pings: bool,
}

impl MockFactory {
    /// A factory whose connections always succeed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every `create` call after `n` successful ones.
    #[must_use]
    pub fn fail_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// Mint connections whose liveness probes always fail.
    #[must_use]
    pub fn with_failing_pings(mut self) -> Self {
        self.fail_pings = true;
        self
    }

    /// Connections successfully created so far.
    #[must_use]
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Connections closed so far.
    #[must_use]
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionFactory for MockFactory {
    async fn create(&self) -> Result<Arc<dyn ManagedConnection>, BoxError> {
        let id = self.created.load(Ordering::SeqCst);
        if let Some(limit) = self.fail_after {
            if id >= limit {
                return Err(format!("mock factory refused connection #{id}").into());
            }
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockConnection {
            id,
            closed: AtomicBool::new(false),
            fail_pings: self.fail_pings,
            close_count: Arc::clone(&self.closed),
        }))
    }
}
