//! Scriptable in-process connection factory.
//!
//! [`MockFactory`] stands in for a real driver in pool tests: sessions
//! are cheap values, open outcomes can be scripted call by call, and
//! every lifecycle step is recorded so tests can assert on it afterward.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mongo_driver_pool::Pool;
//! use mongo_testing::{MockFactory, fixtures};
//!
//! #[tokio::test]
//! async fn test_growth_failure() {
//!     let factory = Arc::new(MockFactory::new());
//!     let pool = Pool::new(Arc::clone(&factory), fixtures::elastic_options(2, 2, 4))
//!         .await
//!         .unwrap();
//!
//!     // The next open the pool issues will fail.
//!     factory.fail_opens(1);
//!     // ...
//! }
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use mongo_driver_pool::{ConnectionFactory, PoolTarget};
use parking_lot::Mutex;
use thiserror::Error;

/// Error produced by scripted factory failures.
#[derive(Debug, Error)]
pub enum MockError {
    /// An open refused by the test script.
    #[error("scripted open failure for session {0}")]
    OpenRefused(u64),

    /// Collection resolution denied by the test script.
    #[error("collection {0:?} is denied")]
    CollectionDenied(String),
}

/// One session minted by the mock factory.
#[derive(Debug)]
pub struct MockSession {
    /// Creation sequence number, unique per factory.
    pub serial: u64,
    /// Target the session was created for.
    pub target: PoolTarget,
}

/// Collection handle resolved by the mock factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCollection {
    /// Collection name as requested.
    pub name: String,
    /// Serial of the session it was resolved through.
    pub session_serial: u64,
}

enum OpenScript {
    Succeed,
    Refuse,
}

/// A connection factory whose behavior is driven by the test.
///
/// All scripting methods take `&self`, so a factory wrapped in an `Arc`
/// and handed to a pool can still be scripted afterward. Opens consume
/// the script front to back; once the script runs out, opens succeed.
#[derive(Default)]
pub struct MockFactory {
    open_latency: Duration,
    script: Mutex<VecDeque<OpenScript>>,
    denied: Mutex<Vec<String>>,
    created: AtomicU64,
    opened: AtomicU64,
    refused: AtomicU64,
    closed: Mutex<Vec<u64>>,
}

impl MockFactory {
    /// Create a factory whose opens all succeed instantly.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every open take `latency` before resolving.
    #[must_use]
    pub fn with_open_latency(mut self, latency: Duration) -> Self {
        self.open_latency = latency;
        self
    }

    /// Script the next `count` opens to fail.
    pub fn fail_opens(&self, count: usize) {
        let mut script = self.script.lock();
        script.extend(std::iter::repeat_with(|| OpenScript::Refuse).take(count));
    }

    /// Script the next `count` opens to succeed, ahead of any failures
    /// queued afterward.
    pub fn succeed_opens(&self, count: usize) {
        let mut script = self.script.lock();
        script.extend(std::iter::repeat_with(|| OpenScript::Succeed).take(count));
    }

    /// Deny resolution of the named collection from now on.
    pub fn deny_collection(&self, name: impl Into<String>) {
        self.denied.lock().push(name.into());
    }

    /// Number of sessions created so far.
    #[must_use]
    pub fn created(&self) -> u64 {
        self.created.load(Ordering::SeqCst)
    }

    /// Number of opens that succeeded.
    #[must_use]
    pub fn opened(&self) -> u64 {
        self.opened.load(Ordering::SeqCst)
    }

    /// Number of opens refused by the script.
    #[must_use]
    pub fn refused(&self) -> u64 {
        self.refused.load(Ordering::SeqCst)
    }

    /// Serials of closed sessions, in close order.
    #[must_use]
    pub fn closed(&self) -> Vec<u64> {
        self.closed.lock().clone()
    }

    /// Number of sessions closed so far.
    #[must_use]
    pub fn closed_count(&self) -> usize {
        self.closed.lock().len()
    }
}

#[async_trait]
impl ConnectionFactory for MockFactory {
    type Session = MockSession;
    type Collection = MockCollection;
    type Error = MockError;

    fn create(&self, target: &PoolTarget) -> Self::Session {
        let serial = self.created.fetch_add(1, Ordering::SeqCst);
        MockSession {
            serial,
            target: target.clone(),
        }
    }

    async fn open(&self, session: Self::Session) -> Result<Self::Session, Self::Error> {
        if !self.open_latency.is_zero() {
            tokio::time::sleep(self.open_latency).await;
        }
        let refuse = matches!(self.script.lock().pop_front(), Some(OpenScript::Refuse));
        if refuse {
            self.refused.fetch_add(1, Ordering::SeqCst);
            tracing::debug!(serial = session.serial, "mock open refused");
            return Err(MockError::OpenRefused(session.serial));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(session)
    }

    fn close(&self, session: Self::Session) {
        self.closed.lock().push(session.serial);
    }

    fn collection(
        &self,
        session: &Self::Session,
        name: &str,
    ) -> Result<Self::Collection, Self::Error> {
        if self.denied.lock().iter().any(|denied| denied == name) {
            return Err(MockError::CollectionDenied(name.to_string()));
        }
        Ok(MockCollection {
            name: name.to_string(),
            session_serial: session.serial,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn target() -> PoolTarget {
        mongo_driver_pool::PoolOptions::new().normalized().target()
    }

    #[tokio::test]
    async fn opens_succeed_without_script() {
        let factory = MockFactory::new();
        let session = factory.create(&target());
        let session = factory.open(session).await.unwrap();
        assert_eq!(session.serial, 0);
        assert_eq!(factory.opened(), 1);
        assert_eq!(factory.refused(), 0);
    }

    #[tokio::test]
    async fn script_is_consumed_front_to_back() {
        let factory = MockFactory::new();
        factory.succeed_opens(1);
        factory.fail_opens(1);

        let first = factory.create(&target());
        assert!(factory.open(first).await.is_ok());

        let second = factory.create(&target());
        let err = factory.open(second).await.unwrap_err();
        assert!(matches!(err, MockError::OpenRefused(1)));

        // Script exhausted: back to succeeding.
        let third = factory.create(&target());
        assert!(factory.open(third).await.is_ok());
    }

    #[tokio::test]
    async fn close_records_serials_in_order() {
        let factory = MockFactory::new();
        let a = factory.create(&target());
        let b = factory.create(&target());
        factory.close(b);
        factory.close(a);
        assert_eq!(factory.closed(), vec![1, 0]);
    }

    #[tokio::test]
    async fn denied_collection_is_refused() {
        let factory = MockFactory::new();
        factory.deny_collection("secrets");

        let session = factory.open(factory.create(&target())).await.unwrap();
        let err = factory.collection(&session, "secrets").unwrap_err();
        assert!(matches!(err, MockError::CollectionDenied(name) if name == "secrets"));

        let coll = factory.collection(&session, "orders").unwrap();
        assert_eq!(coll.name, "orders");
        assert_eq!(coll.session_serial, session.serial);
    }
}
