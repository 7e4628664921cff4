//! Pool-owned connection and collection handles.
//!
//! Both handle types re-enter the pool's release protocol when dropped,
//! so a caller that forgets an explicit [`Pool::release`] cannot strand a
//! connection. An explicit release is still the primary return path; see
//! [`ReleaseTarget`] for the accepted argument shapes.
//!
//! [`Pool::release`]: crate::Pool::release

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::factory::ConnectionFactory;
use crate::pool::{Entry, PoolShared};

/// A live connection checked out of the pool.
///
/// Dereferences to the driver session. When dropped, the connection runs
/// back through the release protocol: it is handed to the oldest waiter,
/// re-admitted to the free list, closed as surplus, or closed outright if
/// the pool is shutting down.
pub struct PooledConnection<F: ConnectionFactory> {
    // Consumed exactly once, by release/detach/drop.
    entry: Option<Entry<F::Session>>,
    shared: Arc<PoolShared<F>>,
}

impl<F: ConnectionFactory> PooledConnection<F> {
    pub(crate) fn new(entry: Entry<F::Session>, shared: Arc<PoolShared<F>>) -> Self {
        Self {
            entry: Some(entry),
            shared,
        }
    }

    /// Pool-assigned identity of this connection.
    ///
    /// Stable for the connection's whole life, across any number of
    /// checkouts; the pool uses it for free-list membership checks.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.entry().id
    }

    /// Take the raw driver session out of the pool.
    ///
    /// The session will not return to the pool and the pool stops
    /// accounting for it; closing it becomes the caller's job. The pool's
    /// approximate active count self-corrects on later releases.
    #[must_use]
    pub fn detach(mut self) -> F::Session {
        // Entry is Some until one of release/detach/drop consumes it, and
        // each of those takes `self`.
        #[allow(clippy::expect_used)]
        let entry = self.entry.take().expect("connection already consumed");
        tracing::debug!(id = entry.id, "connection detached from pool");
        entry.session
    }

    pub(crate) fn into_parts(mut self) -> (Entry<F::Session>, Arc<PoolShared<F>>) {
        #[allow(clippy::expect_used)]
        let entry = self.entry.take().expect("connection already consumed");
        (entry, Arc::clone(&self.shared))
    }

    pub(crate) fn pool(&self) -> &Arc<PoolShared<F>> {
        &self.shared
    }

    fn entry(&self) -> &Entry<F::Session> {
        #[allow(clippy::expect_used)]
        self.entry.as_ref().expect("connection already consumed")
    }

    fn entry_mut(&mut self) -> &mut Entry<F::Session> {
        #[allow(clippy::expect_used)]
        self.entry.as_mut().expect("connection already consumed")
    }
}

impl<F: ConnectionFactory> Deref for PooledConnection<F> {
    type Target = F::Session;

    fn deref(&self) -> &Self::Target {
        &self.entry().session
    }
}

impl<F: ConnectionFactory> DerefMut for PooledConnection<F> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.entry_mut().session
    }
}

impl<F: ConnectionFactory> Drop for PooledConnection<F> {
    fn drop(&mut self) {
        if let Some(entry) = self.entry.take() {
            PoolShared::release_entry(&self.shared, entry);
        }
    }
}

impl<F: ConnectionFactory> fmt::Debug for PooledConnection<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("PooledConnection");
        match &self.entry {
            Some(entry) => s.field("id", &entry.id),
            None => s.field("id", &"<consumed>"),
        };
        s.finish_non_exhaustive()
    }
}

/// A collection-scoped handle that owns its underlying connection.
///
/// Produced by [`Pool::get_collection`]. Dereferences to the driver's
/// collection handle; releasing (or dropping) it releases the owning
/// connection, so for the pool the two handle shapes are interchangeable.
///
/// [`Pool::get_collection`]: crate::Pool::get_collection
pub struct Collection<F: ConnectionFactory> {
    inner: F::Collection,
    name: String,
    conn: PooledConnection<F>,
}

impl<F: ConnectionFactory> Collection<F> {
    pub(crate) fn new(inner: F::Collection, name: String, conn: PooledConnection<F>) -> Self {
        Self { inner, name, conn }
    }

    /// Collection name this handle was resolved for.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identity of the owning connection.
    #[must_use]
    pub fn connection_id(&self) -> u64 {
        self.conn.id()
    }

    /// Split into the driver collection handle and the owning connection.
    #[must_use]
    pub fn into_parts(self) -> (F::Collection, PooledConnection<F>) {
        (self.inner, self.conn)
    }
}

impl<F: ConnectionFactory> Deref for Collection<F> {
    type Target = F::Collection;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<F: ConnectionFactory> fmt::Debug for Collection<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .field("connection_id", &self.conn.id())
            .finish_non_exhaustive()
    }
}

/// Either handle shape accepted by [`Pool::release`].
///
/// A collection resolves to its owning connection before the release
/// state machine runs, which is what makes releasing a collection
/// behaviorally identical to releasing the connection itself.
///
/// [`Pool::release`]: crate::Pool::release
pub enum ReleaseTarget<F: ConnectionFactory> {
    /// A connection handle.
    Connection(PooledConnection<F>),
    /// A collection handle, standing in for its owning connection.
    Collection(Collection<F>),
}

impl<F: ConnectionFactory> ReleaseTarget<F> {
    /// Resolve to the owning connection.
    #[must_use]
    pub fn into_connection(self) -> PooledConnection<F> {
        match self {
            Self::Connection(conn) => conn,
            Self::Collection(collection) => collection.into_parts().1,
        }
    }
}

impl<F: ConnectionFactory> fmt::Debug for ReleaseTarget<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection(conn) => f.debug_tuple("Connection").field(conn).finish(),
            Self::Collection(collection) => f.debug_tuple("Collection").field(collection).finish(),
        }
    }
}

impl<F: ConnectionFactory> From<PooledConnection<F>> for ReleaseTarget<F> {
    fn from(conn: PooledConnection<F>) -> Self {
        Self::Connection(conn)
    }
}

impl<F: ConnectionFactory> From<Collection<F>> for ReleaseTarget<F> {
    fn from(collection: Collection<F>) -> Self {
        Self::Collection(collection)
    }
}
