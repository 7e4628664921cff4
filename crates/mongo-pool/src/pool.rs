//! Elastic connection pool.
//!
//! The pool keeps three pieces of state behind one lock: a free list of
//! ready connections, a FIFO queue of parked acquires, and an approximate
//! count of checked-out connections. All policy runs inside [`release`]:
//! a returning connection is handed to the oldest waiter, re-admitted to
//! the free list, closed as surplus, or closed because the pool is
//! draining. The elastic target size grows by half (capped at the
//! configured maximum) when the active count catches up with it, and
//! shrinks back toward the configured minimum when idle connections pile
//! up. Nothing resizes on a timer.
//!
//! [`release`]: Pool::release

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use futures_util::future::join_all;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::config::{PoolOptions, PoolTarget};
use crate::error::PoolError;
use crate::factory::ConnectionFactory;
use crate::handle::{Collection, PooledConnection, ReleaseTarget};
use crate::metrics::{PoolMetrics, PoolStatus};

/// A pooled session together with its pool-assigned identity.
pub(crate) struct Entry<S> {
    pub(crate) id: u64,
    pub(crate) session: S,
}

/// State shared between the pool, its handles, and growth tasks.
pub(crate) struct PoolShared<F: ConnectionFactory> {
    factory: F,
    options: PoolOptions,
    target: PoolTarget,
    state: Mutex<PoolState<F>>,
}

struct PoolState<F: ConnectionFactory> {
    free: VecDeque<Entry<F::Session>>,
    waiting: VecDeque<oneshot::Sender<PooledConnection<F>>>,
    /// Approximate count of checked-out connections. Only appended when a
    /// release feeds a waiter, and trimmed whenever the free list grows,
    /// so it can run behind the true number of outstanding handles. It is
    /// a capacity-accounting aid, not a connection registry.
    active: usize,
    target_size: usize,
    min_size: usize,
    max_size: usize,
    closing: bool,
    next_id: u64,
    metrics: PoolMetrics,
}

/// Side effects decided under the lock, performed after it is dropped.
///
/// Factory calls never run while the state lock is held; a slow or
/// reentrant factory must not be able to stall or deadlock the pool.
struct ReleaseOutcome<S> {
    close: Option<S>,
    open_delta: usize,
}

impl<S> ReleaseOutcome<S> {
    fn nothing() -> Self {
        Self {
            close: None,
            open_delta: 0,
        }
    }
}

impl<F: ConnectionFactory> PoolShared<F> {
    /// Feed a connection back through the release state machine.
    ///
    /// Branch order matters and is evaluated strictly: draining, waiter
    /// handoff (plus the grow policy), already-free no-op, then the
    /// keep-or-shed decision (plus the shrink policy).
    pub(crate) fn release_entry(shared: &Arc<Self>, entry: Entry<F::Session>) {
        let outcome = {
            let mut state = shared.state.lock();
            Self::run_release(shared, &mut state, entry)
        };
        Self::apply(shared, outcome);
    }

    /// Register a freshly opened session and route it through release, as
    /// if a caller had just returned it. Used by the initial fill and by
    /// growth tasks, so new connections serve parked waiters first.
    fn admit_session(shared: &Arc<Self>, session: F::Session) {
        let outcome = {
            let mut state = shared.state.lock();
            state.metrics.connections_opened += 1;
            let id = state.next_id;
            state.next_id += 1;
            tracing::debug!(id, "connection opened");
            Self::run_release(shared, &mut state, Entry { id, session })
        };
        Self::apply(shared, outcome);
    }

    fn run_release(
        shared: &Arc<Self>,
        state: &mut PoolState<F>,
        entry: Entry<F::Session>,
    ) -> ReleaseOutcome<F::Session> {
        // Draining: every connection that reaches release is closed,
        // never re-pooled, never handed to a waiter.
        if state.closing {
            tracing::debug!(id = entry.id, "pool draining, closing released connection");
            state.metrics.connections_closed += 1;
            return ReleaseOutcome {
                close: Some(entry.session),
                open_delta: 0,
            };
        }

        // Oldest live waiter gets the connection directly; it never
        // touches the free list on this path. Waiters that gave up
        // (dropped their acquire future) are skipped.
        let mut entry = entry;
        while let Some(waiter) = state.waiting.pop_front() {
            let id = entry.id;
            match waiter.send(PooledConnection::new(entry, Arc::clone(shared))) {
                Ok(()) => {
                    tracing::debug!(
                        id,
                        waiting = state.waiting.len(),
                        "connection handed to waiter"
                    );
                    if state.active < state.target_size {
                        state.active += 1;
                    }
                    let open_delta = Self::grow_policy(state);
                    return ReleaseOutcome {
                        close: None,
                        open_delta,
                    };
                }
                Err(conn) => entry = conn.into_parts().0,
            }
        }

        // Idempotent re-release: an id already on the free list stays
        // put and the duplicate is discarded.
        if state.free.iter().any(|pooled| pooled.id == entry.id) {
            tracing::trace!(id = entry.id, "connection already on free list");
            return ReleaseOutcome::nothing();
        }

        // Keep or shed. Enough idle connections already: this one is
        // surplus, and the target resizes down to the observed idle
        // capacity. Otherwise it joins the free list.
        if state.free.len() >= state.min_size {
            state.metrics.connections_closed += 1;
            if state.free.len() < state.target_size {
                state.metrics.shrinks += 1;
                tracing::debug!(
                    from = state.target_size,
                    to = state.free.len(),
                    "shrinking pool target"
                );
            }
            state.target_size = state.free.len();
            Self::trim_active(state);
            ReleaseOutcome {
                close: Some(entry.session),
                open_delta: 0,
            }
        } else {
            tracing::trace!(
                id = entry.id,
                available = state.free.len() + 1,
                "connection returned to free list"
            );
            state.free.push_back(entry);
            Self::trim_active(state);
            ReleaseOutcome::nothing()
        }
    }

    /// Grow the elastic target by half once the active count catches up
    /// with it: to `target + target / 2` when that stays under the
    /// maximum, else straight to the maximum. Returns how many opens to
    /// issue; the target is raised immediately, so it transiently exceeds
    /// the number of live connections while the opens are in flight.
    fn grow_policy(state: &mut PoolState<F>) -> usize {
        if state.active != state.target_size {
            return 0;
        }
        let grown = state.target_size + state.target_size / 2;
        if grown == state.target_size {
            return 0;
        }
        let next = if grown < state.max_size {
            grown
        } else if state.target_size < state.max_size {
            state.max_size
        } else {
            return 0;
        };
        let delta = next - state.target_size;
        tracing::debug!(from = state.target_size, to = next, "growing pool target");
        state.target_size = next;
        state.metrics.grows += 1;
        delta
    }

    /// Bound the approximate active count so that together with the free
    /// list it never exceeds the target, saturating at zero.
    fn trim_active(state: &mut PoolState<F>) {
        let budget = state.target_size.saturating_sub(state.free.len());
        if state.active > budget {
            state.active = budget;
        }
    }

    fn apply(shared: &Arc<Self>, outcome: ReleaseOutcome<F::Session>) {
        if let Some(session) = outcome.close {
            shared.factory.close(session);
        }
        if outcome.open_delta > 0 {
            Self::spawn_opens(shared, outcome.open_delta);
        }
    }

    /// Open `delta` new connections in the background. Each one re-enters
    /// the release protocol on success, so it lands in the free list or
    /// serves whichever waiter is oldest by then. Failed opens are
    /// counted and logged; there is no retry.
    fn spawn_opens(shared: &Arc<Self>, delta: usize) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(delta, "no async runtime available, pool growth skipped");
            return;
        };
        for _ in 0..delta {
            let shared = Arc::clone(shared);
            runtime.spawn(async move {
                let session = shared.factory.create(&shared.target);
                match shared.factory.open(session).await {
                    Ok(session) => Self::admit_session(&shared, session),
                    Err(error) => {
                        shared.state.lock().metrics.open_failures += 1;
                        tracing::error!(
                            error = %error,
                            "failed to open connection during pool growth"
                        );
                    }
                }
            });
        }
    }

    fn destroy(&self) {
        let (doomed, rejected) = {
            let mut state = self.state.lock();
            if state.closing {
                return;
            }
            state.closing = true;
            let doomed: Vec<Entry<F::Session>> = state.free.drain(..).collect();
            let rejected: Vec<_> = state.waiting.drain(..).collect();
            state.metrics.connections_closed += doomed.len() as u64;
            state.metrics.waiters_rejected += rejected.len() as u64;
            (doomed, rejected)
        };
        let closed = doomed.len();
        let waiters = rejected.len();
        for entry in doomed {
            self.factory.close(entry.session);
        }
        // Dropping the senders wakes every parked acquire with an error.
        drop(rejected);
        tracing::info!(closed, waiters, "connection pool destroyed");
    }
}

/// An elastic connection pool for a MongoDB-style document database.
///
/// The pool opens an initial set of connections up front, serves
/// [`acquire`] from the free list or a FIFO waiting queue, and resizes
/// its target capacity as a side effect of [`release`]. Dropping the
/// pool destroys it; outstanding handles remain valid and are closed as
/// they come back.
///
/// The pool is not `Clone`; share it across tasks behind an [`Arc`].
///
/// [`acquire`]: Pool::acquire
/// [`release`]: Pool::release
pub struct Pool<F: ConnectionFactory> {
    shared: Arc<PoolShared<F>>,
}

impl<F: ConnectionFactory> Pool<F> {
    /// Open `initial_size` connections and construct the pool.
    ///
    /// Options are normalized first (unset fields fall back to their
    /// defaults). The opens run concurrently; if any of them fails, every
    /// sibling that did open is closed and the first error is returned.
    /// Each opened connection is fed through the release protocol, so a
    /// configuration whose initial size exceeds its minimum sheds the
    /// surplus right away.
    pub async fn new(factory: F, options: PoolOptions) -> Result<Self, PoolError<F::Error>> {
        let options = options.normalized();
        let target = options.target();
        let initial = options.initial_size;
        tracing::debug!(%target, initial, "opening initial connections");

        let opens = (0..initial).map(|_| factory.open(factory.create(&target)));
        let mut sessions = Vec::with_capacity(initial);
        let mut failure = None;
        for result in join_all(opens).await {
            match result {
                Ok(session) => sessions.push(session),
                Err(error) if failure.is_none() => failure = Some(error),
                Err(_) => {}
            }
        }
        if let Some(error) = failure {
            // Startup is all-or-nothing: siblings that did open are not
            // allowed to outlive the failed fill.
            for session in sessions {
                factory.close(session);
            }
            return Err(PoolError::Open(error));
        }

        let shared = Arc::new(PoolShared {
            state: Mutex::new(PoolState {
                free: VecDeque::with_capacity(initial),
                waiting: VecDeque::new(),
                active: 0,
                target_size: initial,
                min_size: options.min_size,
                max_size: options.max_size,
                closing: false,
                next_id: 0,
                metrics: PoolMetrics::default(),
            }),
            factory,
            options,
            target,
        });
        for session in sessions {
            PoolShared::admit_session(&shared, session);
        }
        tracing::info!(target = %shared.target, size = initial, "connection pool initialized");
        Ok(Self { shared })
    }

    /// Check a connection out of the pool.
    ///
    /// Returns immediately when a free connection is available; otherwise
    /// the caller parks in the FIFO waiting queue until a release hands
    /// it a connection. There is no acquire timeout. Fails with
    /// [`PoolError::Closed`] once the pool is destroyed, including for
    /// callers that were already parked.
    pub async fn acquire(&self) -> Result<PooledConnection<F>, PoolError<F::Error>> {
        let rx = {
            let mut state = self.shared.state.lock();
            if state.closing {
                return Err(PoolError::Closed);
            }
            if let Some(entry) = state.free.pop_front() {
                state.metrics.acquires_immediate += 1;
                tracing::trace!(
                    id = entry.id,
                    available = state.free.len(),
                    "acquired connection from free list"
                );
                return Ok(PooledConnection::new(entry, Arc::clone(&self.shared)));
            }
            let (tx, rx) = oneshot::channel();
            state.waiting.push_back(tx);
            state.metrics.acquires_queued += 1;
            tracing::debug!(waiting = state.waiting.len(), "pool exhausted, caller parked");
            rx
        };
        rx.await.map_err(|_| PoolError::Closed)
    }

    /// Check out a connection and resolve `name` against it.
    ///
    /// The returned [`Collection`] owns the connection; releasing or
    /// dropping it releases the connection. If resolution fails, the
    /// connection goes straight back to the pool and the factory error is
    /// returned.
    pub async fn get_collection(&self, name: &str) -> Result<Collection<F>, PoolError<F::Error>> {
        let conn = self.acquire().await?;
        match self.shared.factory.collection(&conn, name) {
            Ok(inner) => Ok(Collection::new(inner, name.to_string(), conn)),
            Err(source) => Err(PoolError::Collection {
                name: name.to_string(),
                source,
            }),
        }
    }

    /// Return a connection (or a collection standing in for one) to the
    /// pool, running the release state machine.
    ///
    /// Returns `false` when the handle belongs to a different pool; the
    /// handle is still returned to its own pool in that case. Handles
    /// released twice are impossible by construction, and a connection
    /// whose id is somehow already on the free list is left untouched.
    pub fn release(&self, target: impl Into<ReleaseTarget<F>>) -> bool {
        let conn = target.into().into_connection();
        if !Arc::ptr_eq(conn.pool(), &self.shared) {
            // Dropping the handle routes it through its own pool.
            return false;
        }
        let (entry, _) = conn.into_parts();
        PoolShared::release_entry(&self.shared, entry);
        true
    }

    /// Destroy the pool: mark it closing, close every free connection,
    /// and reject every parked waiter. Idempotent. Connections that are
    /// checked out stay usable; they are closed when released.
    pub fn destroy(&self) {
        self.shared.destroy();
    }

    /// Whether the pool has been destroyed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closing
    }

    /// Current occupancy snapshot.
    #[must_use]
    pub fn status(&self) -> PoolStatus {
        let state = self.shared.state.lock();
        PoolStatus {
            available: state.free.len(),
            in_use: state.active,
            waiting: state.waiting.len(),
            target: state.target_size,
            max: state.max_size,
        }
    }

    /// Cumulative counters since the pool was created.
    #[must_use]
    pub fn metrics(&self) -> PoolMetrics {
        self.shared.state.lock().metrics
    }

    /// The normalized options this pool was built with.
    #[must_use]
    pub fn options(&self) -> &PoolOptions {
        &self.shared.options
    }
}

impl<F: ConnectionFactory> Drop for Pool<F> {
    fn drop(&mut self) {
        self.shared.destroy();
    }
}

impl<F: ConnectionFactory> fmt::Debug for Pool<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("target", &self.shared.target)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}
