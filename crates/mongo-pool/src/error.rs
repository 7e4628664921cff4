//! Pool error types.

use thiserror::Error;

/// Errors that can occur during pool operations.
///
/// Generic over the factory error type `E` so driver failures surface to
/// callers without being flattened into strings.
#[derive(Debug, Error)]
pub enum PoolError<E>
where
    E: std::error::Error,
{
    /// A connection failed to open during pool construction or growth.
    ///
    /// Opens are never retried: construction aborts (closing any siblings
    /// that already opened), and a growth slot is abandoned.
    #[error("failed to open connection: {0}")]
    Open(#[source] E),

    /// The pool has been destroyed.
    ///
    /// Returned to new acquisitions on a closed pool and to waiters that
    /// were still queued when [`Pool::destroy`] ran.
    ///
    /// [`Pool::destroy`]: crate::Pool::destroy
    #[error("pool is closed")]
    Closed,

    /// Resolving a collection name against an acquired connection failed.
    ///
    /// The connection itself was healthy enough to acquire and has already
    /// been returned to the pool.
    #[error("failed to resolve collection {name:?}: {source}")]
    Collection {
        /// Collection name that failed to resolve.
        name: String,
        /// Driver error reported by the factory.
        #[source]
        source: E,
    },
}

impl<E> PoolError<E>
where
    E: std::error::Error,
{
    /// Check whether this error reports a destroyed pool.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}
