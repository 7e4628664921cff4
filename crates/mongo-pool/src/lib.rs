//! # mongo-driver-pool
//!
//! Elastic connection pooling for MongoDB-style document databases.
//!
//! The pool keeps a set of live connections, serves acquisitions from it,
//! parks callers in a FIFO queue when every connection is checked out,
//! and resizes its target capacity in response to demand: the target
//! grows by half when releases keep landing on waiters, and shrinks back
//! toward the configured minimum when idle connections pile up. All
//! resize policy runs as a side effect of release; nothing happens on a
//! timer.
//!
//! The driver stays outside: applications implement [`ConnectionFactory`]
//! on top of whatever client library they use, and the pool only manages
//! handle lifecycle and queuing.
//!
//! ## Features
//!
//! - FIFO waiting queue with strict arrival-order service
//! - Elastic target sizing (grow by half under load, shed surplus at idle)
//! - Draining shutdown that closes idle connections and rejects waiters
//! - Collection-scoped handles resolved through a pooled connection
//! - Occupancy and lifetime counters for monitoring
//!
//! ## Example
//!
//! ```rust,ignore
//! use mongo_driver_pool::{Pool, PoolOptions};
//!
//! let options = PoolOptions::new()
//!     .host("db.internal")
//!     .database("inventory")
//!     .initial_size(5)
//!     .max_size(20);
//!
//! let pool = Pool::new(factory, options).await?;
//! let conn = pool.acquire().await?;
//! // Use connection...
//! // Connection automatically returned to pool on drop
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod factory;
pub mod handle;
pub mod metrics;
pub mod pool;

pub use config::{PoolOptions, PoolTarget};
pub use error::PoolError;
pub use factory::ConnectionFactory;
pub use handle::{Collection, PooledConnection, ReleaseTarget};
pub use metrics::{PoolMetrics, PoolStatus};
pub use pool::Pool;
