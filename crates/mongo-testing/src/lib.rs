//! # mongo-testing
//!
//! Test infrastructure for connection pool development.
//!
//! This crate provides a scriptable [`MockFactory`] that stands in for a
//! real database driver, plus pool fixtures, so pool behavior can be
//! tested without a server.
//!
//! ## Features
//!
//! - Scriptable open outcomes (fail the next N opens) and open latency
//! - Denied-collection scripting for resolution failures
//! - Full lifecycle recording: creations, opens, refusals, close order
//! - Option presets for fixed-size and elastic pools
//!
//! ## Example
//!
//! ```rust,ignore
//! use mongo_testing::fixtures;
//!
//! #[tokio::test]
//! async fn test_pool_grows() {
//!     let (pool, factory) = fixtures::mock_pool(fixtures::elastic_options(5, 5, 10))
//!         .await
//!         .unwrap();
//!
//!     // Drive the pool, then assert on factory.closed(), pool.metrics()...
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod fixtures;
pub mod mock;

pub use mock::{MockCollection, MockError, MockFactory, MockSession};
