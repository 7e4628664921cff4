//! Connection pool integration tests.
//!
//! These tests drive the pool against an in-process stub factory, so no
//! database server is required:
//!
//! ```bash
//! cargo test -p mongo-driver-pool --test integration
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use mongo_driver_pool::{ConnectionFactory, Pool, PoolOptions, PoolTarget};
use tokio_test::{assert_pending, assert_ready, task};

/// In-process stand-in for a driver: sessions are sequence numbers,
/// collections are strings, and lifecycle calls bump counters.
#[derive(Default)]
struct StubFactory {
    created: AtomicU64,
    closed: AtomicU64,
}

#[derive(Debug, thiserror::Error)]
#[error("stub refused to open")]
struct StubError;

#[async_trait]
impl ConnectionFactory for StubFactory {
    type Session = u64;
    type Collection = String;
    type Error = StubError;

    fn create(&self, _target: &PoolTarget) -> Self::Session {
        self.created.fetch_add(1, Ordering::SeqCst)
    }

    async fn open(&self, session: Self::Session) -> Result<Self::Session, Self::Error> {
        Ok(session)
    }

    fn close(&self, _session: Self::Session) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }

    fn collection(
        &self,
        session: &Self::Session,
        name: &str,
    ) -> Result<Self::Collection, Self::Error> {
        Ok(format!("{name}@{session}"))
    }
}

async fn stub_pool(
    initial: usize,
    min: usize,
    max: usize,
) -> (Pool<Arc<StubFactory>>, Arc<StubFactory>) {
    let factory = Arc::new(StubFactory::default());
    let pool = Pool::new(
        Arc::clone(&factory),
        PoolOptions::new()
            .initial_size(initial)
            .min_size(min)
            .max_size(max),
    )
    .await
    .expect("stub opens cannot fail");
    (pool, factory)
}

// =============================================================================
// Basic Pool Tests
// =============================================================================

#[tokio::test]
async fn test_pool_create_and_destroy() {
    let (pool, factory) = stub_pool(5, 5, 10).await;

    assert!(!pool.is_closed());

    let status = pool.status();
    assert_eq!(status.available, 5);
    assert_eq!(status.in_use, 0);
    assert_eq!(status.target, 5);
    assert_eq!(status.max, 10);

    pool.destroy();
    assert!(pool.is_closed());
    assert_eq!(pool.status().available, 0);
    assert_eq!(factory.closed.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn test_acquire_and_drop_returns_connection() {
    let (pool, factory) = stub_pool(2, 2, 4).await;

    let conn = pool.acquire().await.expect("free connection available");
    assert_eq!(pool.status().available, 1);

    // Drop the handle - it should return to the pool, not close.
    drop(conn);
    assert_eq!(pool.status().available, 2);
    assert_eq!(factory.closed.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_connection_reuse_keeps_identity() {
    let (pool, _factory) = stub_pool(1, 1, 2).await;

    let conn1 = pool.acquire().await.expect("first acquire");
    let id1 = conn1.id();
    drop(conn1);

    // The same connection comes back out.
    let conn2 = pool.acquire().await.expect("second acquire");
    assert_eq!(conn2.id(), id1);
}

#[tokio::test]
async fn test_get_collection_resolves_through_connection() {
    let (pool, _factory) = stub_pool(1, 1, 2).await;

    let coll = pool.get_collection("users").await.expect("collection resolves");
    assert_eq!(coll.name(), "users");
    assert_eq!(*coll, format!("users@{}", coll.connection_id()));

    // The collection owns the connection while it lives.
    assert_eq!(pool.status().available, 0);
    drop(coll);
    assert_eq!(pool.status().available, 1);
}

// =============================================================================
// Waiting Queue Tests
// =============================================================================

#[tokio::test]
async fn test_waiters_are_served_in_fifo_order() {
    let (pool, _factory) = stub_pool(1, 1, 1).await;

    let conn = pool.acquire().await.expect("drain the free list");

    let mut waiter_a = task::spawn(pool.acquire());
    assert_pending!(waiter_a.poll());
    let mut waiter_b = task::spawn(pool.acquire());
    assert_pending!(waiter_b.poll());
    assert_eq!(pool.status().waiting, 2);

    // First release goes to A, strictly before B.
    assert!(pool.release(conn));
    assert!(waiter_a.is_woken());
    assert_pending!(waiter_b.poll());
    let conn_a = assert_ready!(waiter_a.poll()).expect("waiter A served");

    // Second release goes to B.
    assert!(pool.release(conn_a));
    assert!(waiter_b.is_woken());
    let _conn_b = assert_ready!(waiter_b.poll()).expect("waiter B served");
}

#[tokio::test]
async fn test_handoff_bypasses_free_list() {
    let (pool, _factory) = stub_pool(1, 1, 1).await;

    let conn = pool.acquire().await.expect("drain the free list");
    let mut waiter = task::spawn(pool.acquire());
    assert_pending!(waiter.poll());

    assert!(pool.release(conn));
    // The connection went straight to the waiter.
    assert_eq!(pool.status().available, 0);
    let _conn = assert_ready!(waiter.poll()).expect("waiter served");
}

#[tokio::test]
async fn test_cancelled_waiter_is_skipped() {
    let (pool, _factory) = stub_pool(1, 1, 1).await;

    let conn = pool.acquire().await.expect("drain the free list");

    let mut gave_up = task::spawn(pool.acquire());
    assert_pending!(gave_up.poll());
    let mut patient = task::spawn(pool.acquire());
    assert_pending!(patient.poll());

    // The older waiter abandons its acquire before being served.
    drop(gave_up);

    assert!(pool.release(conn));
    let _conn = assert_ready!(patient.poll()).expect("surviving waiter served");
}

// =============================================================================
// Release Semantics
// =============================================================================

#[tokio::test]
async fn test_explicit_release_reports_ownership() {
    let (pool, factory) = stub_pool(1, 1, 2).await;
    let other = Pool::new(
        Arc::clone(&factory),
        PoolOptions::new().initial_size(1).min_size(1).max_size(2),
    )
    .await
    .expect("stub opens cannot fail");

    let conn = pool.acquire().await.expect("acquire");
    // A handle from another pool is not recognized, but still finds its
    // way home through its drop.
    assert!(!other.release(conn));
    assert_eq!(pool.status().available, 1);

    let conn = pool.acquire().await.expect("acquire again");
    assert!(pool.release(conn));
    assert_eq!(pool.status().available, 1);
}

#[tokio::test]
async fn test_releasing_collection_releases_connection() {
    let (pool, _factory) = stub_pool(1, 1, 2).await;

    let coll = pool.get_collection("orders").await.expect("collection resolves");
    assert_eq!(pool.status().available, 0);

    assert!(pool.release(coll));
    assert_eq!(pool.status().available, 1);
}

#[tokio::test]
async fn test_detached_connection_never_returns() {
    let (pool, factory) = stub_pool(2, 2, 4).await;

    let conn = pool.acquire().await.expect("acquire");
    let session = conn.detach();

    // The pool forgets the session; it is the caller's to close now.
    assert_eq!(pool.status().available, 1);
    assert_eq!(factory.closed.load(Ordering::SeqCst), 0);
    drop(session);
}

// =============================================================================
// Shutdown Tests
// =============================================================================

#[tokio::test]
async fn test_destroy_rejects_parked_waiters() {
    let (pool, _factory) = stub_pool(1, 1, 1).await;

    let _conn = pool.acquire().await.expect("drain the free list");
    let mut waiter = task::spawn(pool.acquire());
    assert_pending!(waiter.poll());

    pool.destroy();
    assert!(waiter.is_woken());
    let result = assert_ready!(waiter.poll());
    assert!(result.expect_err("waiter rejected").is_closed());
    assert_eq!(pool.metrics().waiters_rejected, 1);
}

#[tokio::test]
async fn test_acquire_after_destroy_fails_fast() {
    let (pool, _factory) = stub_pool(1, 1, 1).await;

    pool.destroy();
    let err = pool.acquire().await.expect_err("pool is closed");
    assert!(err.is_closed());
}

#[tokio::test]
async fn test_release_after_destroy_closes_connection() {
    let (pool, factory) = stub_pool(2, 2, 4).await;

    let conn = pool.acquire().await.expect("acquire");
    pool.destroy();
    assert_eq!(factory.closed.load(Ordering::SeqCst), 1);

    // The outstanding handle is recognized, then closed instead of pooled.
    assert!(pool.release(conn));
    assert_eq!(factory.closed.load(Ordering::SeqCst), 2);
    assert_eq!(pool.status().available, 0);
}

#[tokio::test]
async fn test_destroy_is_idempotent() {
    let (pool, factory) = stub_pool(2, 2, 4).await;

    pool.destroy();
    pool.destroy();
    assert_eq!(factory.closed.load(Ordering::SeqCst), 2);
    assert_eq!(pool.metrics().connections_closed, 2);
}

#[tokio::test]
async fn test_dropping_pool_closes_connections() {
    let factory = Arc::new(StubFactory::default());
    {
        let _pool = Pool::new(
            Arc::clone(&factory),
            PoolOptions::new().initial_size(3).min_size(3).max_size(6),
        )
        .await
        .expect("stub opens cannot fail");
    }
    assert_eq!(factory.closed.load(Ordering::SeqCst), 3);
}

// =============================================================================
// Metrics and Load
// =============================================================================

#[tokio::test]
async fn test_metrics_track_simple_traffic() {
    let (pool, _factory) = stub_pool(1, 1, 2).await;

    let conn = pool.acquire().await.expect("immediate acquire");
    let mut waiter = task::spawn(pool.acquire());
    assert_pending!(waiter.poll());
    assert!(pool.release(conn));
    let _conn = assert_ready!(waiter.poll()).expect("queued acquire");

    let metrics = pool.metrics();
    assert_eq!(metrics.connections_opened, 1);
    assert_eq!(metrics.acquires_immediate, 1);
    assert_eq!(metrics.acquires_queued, 1);
    assert!((metrics.immediate_hit_rate() - 0.5).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_concurrent_checkouts_stay_within_max() {
    let (pool, _factory) = stub_pool(2, 2, 4).await;
    let pool = Arc::new(pool);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let pool = Arc::clone(&pool);
        handles.push(tokio::spawn(async move {
            let conn = pool.acquire().await.expect("acquire under load");
            tokio::task::yield_now().await;
            drop(conn);
        }));
    }
    for handle in handles {
        handle.await.expect("task completed");
    }

    let status = pool.status();
    assert!(status.total() <= status.max, "pool exceeded its maximum: {status:?}");
    assert_eq!(status.waiting, 0);
}
