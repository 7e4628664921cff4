//! Elastic connection pooling example.
//!
//! This example runs the pool against a simulated in-process driver, so
//! it needs no database server. It walks through basic checkout,
//! collection handles, concurrent load (watch the target size grow and
//! then shed back down), and graceful shutdown.
//!
//! # Running
//!
//! ```bash
//! cargo run --example connection_pool
//! ```

// Allow common patterns in example code
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use mongo_driver_pool::{ConnectionFactory, Pool, PoolOptions, PoolTarget};
use tokio::time::Instant;

/// A pretend driver: opening a session just sleeps for a bit.
struct DemoFactory {
    latency: Duration,
    serial: AtomicU64,
}

struct DemoSession {
    serial: u64,
}

struct DemoCollection {
    #[allow(dead_code)]
    name: String,
}

#[derive(Debug, thiserror::Error)]
#[error("demo driver refused the connection")]
struct DemoError;

#[async_trait]
impl ConnectionFactory for DemoFactory {
    type Session = DemoSession;
    type Collection = DemoCollection;
    type Error = DemoError;

    fn create(&self, _target: &PoolTarget) -> Self::Session {
        DemoSession {
            serial: self.serial.fetch_add(1, Ordering::SeqCst),
        }
    }

    async fn open(&self, session: Self::Session) -> Result<Self::Session, Self::Error> {
        tokio::time::sleep(self.latency).await;
        Ok(session)
    }

    fn close(&self, _session: Self::Session) {}

    fn collection(
        &self,
        _session: &Self::Session,
        name: &str,
    ) -> Result<Self::Collection, Self::Error> {
        Ok(DemoCollection {
            name: name.to_string(),
        })
    }
}

type DemoPool = Pool<DemoFactory>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    println!("=== Elastic Connection Pool Example ===\n");

    // Configure the pool
    let options = PoolOptions::new()
        .host("127.0.0.1")
        .port(27017)
        .database("inventory")
        .initial_size(5)
        .min_size(2)
        .max_size(10);

    println!("Pool configuration:");
    println!("  Initial size: {}", options.initial_size);
    println!("  Min size: {}", options.min_size);
    println!("  Max size: {}", options.max_size);
    println!();

    let factory = DemoFactory {
        latency: Duration::from_millis(5),
        serial: AtomicU64::new(0),
    };
    let pool: Arc<DemoPool> = Arc::new(Pool::new(factory, options).await?);

    print_pool_status(&pool);

    // Example 1: Basic pool usage
    println!("\n1. Basic pool usage:");
    {
        let conn = pool.acquire().await?;
        println!("  Checked out connection {} (session serial {})", conn.id(), conn.serial);
        // Connection is automatically returned to pool when dropped
    }
    print_pool_status(&pool);

    // Example 2: Collection handles
    println!("\n2. Collection handles:");
    {
        let coll = pool.get_collection("products").await?;
        println!(
            "  Resolved collection {:?} through connection {}",
            coll.name(),
            coll.connection_id()
        );
        // Releasing the collection releases its connection
        assert!(pool.release(coll));
    }

    // Example 3: Concurrent usage
    println!("\n3. Concurrent pool usage (10 parallel checkouts):");
    let start = Instant::now();
    let mut handles = vec![];

    for _ in 0..10 {
        let pool: Arc<DemoPool> = Arc::clone(&pool);
        handles.push(tokio::spawn(async move {
            let _conn = pool.acquire().await?;
            // Simulate some work
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok::<_, mongo_driver_pool::PoolError<DemoError>>(())
        }));
    }

    let mut completed = 0;
    for handle in handles {
        if handle.await?.is_ok() {
            completed += 1;
        }
    }
    println!("  Completed {} checkouts in {:?}", completed, start.elapsed());
    print_pool_status(&pool);

    // Example 4: Sustained load makes the target size grow
    println!("\n4. Pool under load (20 concurrent holds):");
    let load_pool: Arc<DemoPool> = Arc::clone(&pool);
    let load_test = tokio::spawn(async move {
        let mut handles = vec![];
        for _ in 0..20 {
            let p: Arc<DemoPool> = Arc::clone(&load_pool);
            handles.push(tokio::spawn(async move {
                let _conn = p.acquire().await?;
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok::<_, mongo_driver_pool::PoolError<DemoError>>(())
            }));
        }
        for h in handles {
            let _ = h.await;
        }
    });

    // Monitor while the load runs
    for _ in 0..3 {
        tokio::time::sleep(Duration::from_millis(40)).await;
        print_pool_status(&pool);
    }
    load_test.await?;

    // Idle connections past the minimum are shed again
    print_pool_status(&pool);

    // Example 5: Final metrics
    println!("\n5. Final pool metrics:");
    print_pool_metrics(&pool);

    // Example 6: Graceful shutdown
    println!("\n6. Graceful shutdown:");
    pool.destroy();
    println!("  Pool closed: {}", pool.is_closed());

    Ok(())
}

fn print_pool_status(pool: &DemoPool) {
    let status = pool.status();
    println!(
        "  Status: {}/{} connections in use, {} waiting, target {} ({:.1}% utilization)",
        status.in_use,
        status.total(),
        status.waiting,
        status.target,
        status.utilization()
    );
}

fn print_pool_metrics(pool: &DemoPool) {
    let metrics = pool.metrics();
    println!("  Metrics:");
    println!("    Connections opened: {}", metrics.connections_opened);
    println!("    Connections closed: {}", metrics.connections_closed);
    println!("    Open failures: {}", metrics.open_failures);
    println!(
        "    Immediate hit rate: {:.2}%",
        metrics.immediate_hit_rate() * 100.0
    );
    println!("    Grows: {}, shrinks: {}", metrics.grows, metrics.shrinks);
    println!("    Waiters rejected: {}", metrics.waiters_rejected);
}
