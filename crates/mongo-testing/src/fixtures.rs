//! Pool fixtures for tests.

use std::sync::Arc;

use mongo_driver_pool::{Pool, PoolError, PoolOptions};

use crate::mock::{MockError, MockFactory};

/// Options for a fixed-size pool: initial, minimum and maximum all equal,
/// so the elastic policy never moves the target.
#[must_use]
pub fn fixed_options(size: usize) -> PoolOptions {
    PoolOptions::new()
        .initial_size(size)
        .min_size(size)
        .max_size(size)
}

/// Options for an elastic pool.
#[must_use]
pub fn elastic_options(initial: usize, min: usize, max: usize) -> PoolOptions {
    PoolOptions::new()
        .initial_size(initial)
        .min_size(min)
        .max_size(max)
}

/// Build a pool over a fresh mock factory, returning both so the test can
/// keep scripting the factory and assert on its records.
pub async fn mock_pool(
    options: PoolOptions,
) -> Result<(Pool<Arc<MockFactory>>, Arc<MockFactory>), PoolError<MockError>> {
    let factory = Arc::new(MockFactory::new());
    let pool = Pool::new(Arc::clone(&factory), options).await?;
    Ok((pool, factory))
}
