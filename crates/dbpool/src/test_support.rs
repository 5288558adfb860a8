//! Mock backends for this crate's own test suites.
//!
//! Downstream crates use `dbpool-testing` instead; the unit tests here
//! need an in-crate copy because a dev-dependency back onto this crate
//! would test against a separately built library.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::BoxError;
use crate::lifecycle::{ConnectionFactory, ManagedConnection};

/// A connection that exists only as counters.
pub struct MockConnection {
    closed: AtomicBool,
    fail_pings: bool,
    close_count: Arc<AtomicUsize>,
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
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every `create` call after `n` successful ones.
    pub fn fail_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// Mint connections whose liveness probes always fail.
    pub fn with_failing_pings(mut self) -> Self {
        self.fail_pings = true;
        self
    }

    /// Connections successfully created so far.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Connections closed so far.
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
            closed: AtomicBool::new(false),
            fail_pings: self.fail_pings,
            close_count: Arc::clone(&self.closed),
        }))
    }
}
