//! The boundary between the pool and the database driver.
//!
//! The pool never talks to a server itself; it drives a
//! [`ConnectionFactory`] that the embedding application implements on top
//! of its driver. The factory owns everything protocol-shaped: how a
//! session is constructed, how the network session is established, how it
//! is torn down, and how a named collection is resolved against it.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::PoolTarget;

/// Driver-side operations the pool needs.
///
/// Opening is split in two so the cheap, synchronous construction step is
/// separated from the suspension point: [`create`] builds an unopened
/// session handle, [`open`] establishes the network session. The pool
/// only ever awaits `open`; every other factory call completes inline.
///
/// A session returned from `open` must be indistinguishable from one that
/// has been in circulation for a while: the pool feeds freshly opened
/// sessions straight through its release protocol.
///
/// [`create`]: ConnectionFactory::create
/// [`open`]: ConnectionFactory::open
#[async_trait]
pub trait ConnectionFactory: Send + Sync + 'static {
    /// Opaque driver session for one live connection.
    type Session: Send + 'static;

    /// Collection-scoped handle resolved from a session.
    type Collection: Send + 'static;

    /// Error the driver reports from `open` and `collection`.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Construct an unopened session handle for `target`.
    fn create(&self, target: &PoolTarget) -> Self::Session;

    /// Establish the network session.
    ///
    /// Consumes the unopened handle and returns it ready for use. On
    /// error the creation attempt is over; the pool never retries it.
    async fn open(&self, session: Self::Session) -> Result<Self::Session, Self::Error>;

    /// Terminate a session, fire-and-forget.
    ///
    /// Called for surplus connections, on shutdown, and for connections
    /// released after shutdown began. Must not block; a driver that needs
    /// async teardown should hand the session to a background task.
    fn close(&self, session: Self::Session);

    /// Resolve a named collection against an open session.
    fn collection(
        &self,
        session: &Self::Session,
        name: &str,
    ) -> Result<Self::Collection, Self::Error>;
}

#[async_trait]
impl<T: ConnectionFactory> ConnectionFactory for Arc<T> {
    type Session = T::Session;
    type Collection = T::Collection;
    type Error = T::Error;

    fn create(&self, target: &PoolTarget) -> Self::Session {
        (**self).create(target)
    }

    async fn open(&self, session: Self::Session) -> Result<Self::Session, Self::Error> {
        (**self).open(session).await
    }

    fn close(&self, session: Self::Session) {
        (**self).close(session);
    }

    fn collection(
        &self,
        session: &Self::Session,
        name: &str,
    ) -> Result<Self::Collection, Self::Error> {
        (**self).collection(session, name)
    }
}
