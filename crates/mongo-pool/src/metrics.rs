//! Pool observability snapshots.
//!
//! Both types here are plain copies taken under the pool lock, so every
//! snapshot is internally consistent even while the pool keeps moving.

/// Point-in-time occupancy of the pool.
#[derive(Debug, Clone, Copy)]
#[non_exhaustive]
pub struct PoolStatus {
    /// Number of idle connections available for checkout.
    pub available: usize,
    /// Approximate number of connections currently checked out.
    pub in_use: usize,
    /// Number of callers parked waiting for a connection.
    pub waiting: usize,
    /// Current elastic target size.
    pub target: usize,
    /// Hard ceiling the target can grow to.
    pub max: usize,
}

impl PoolStatus {
    /// Total connections the pool is currently accounting for.
    #[must_use]
    pub fn total(&self) -> usize {
        self.available + self.in_use
    }

    /// Share of tracked connections that are checked out, as a percentage.
    #[must_use]
    pub fn utilization(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        {
            self.in_use as f64 / total as f64 * 100.0
        }
    }
}

/// Cumulative counters since the pool was created.
#[derive(Debug, Clone, Copy, Default)]
#[non_exhaustive]
pub struct PoolMetrics {
    /// Connections opened successfully, including the initial fill.
    pub connections_opened: u64,
    /// Connections closed by the pool for any reason.
    pub connections_closed: u64,
    /// Connection opens that failed.
    pub open_failures: u64,
    /// Acquires served straight from the free list.
    pub acquires_immediate: u64,
    /// Acquires that had to park in the waiting queue.
    pub acquires_queued: u64,
    /// Parked waiters turned away by pool shutdown.
    pub waiters_rejected: u64,
    /// Times the elastic target grew.
    pub grows: u64,
    /// Times the elastic target shrank.
    pub shrinks: u64,
}

impl PoolMetrics {
    /// Fraction of acquires served without queueing.
    ///
    /// Returns `1.0` before any acquire has happened.
    #[must_use]
    pub fn immediate_hit_rate(&self) -> f64 {
        let total = self.acquires_immediate + self.acquires_queued;
        if total == 0 {
            return 1.0;
        }
        #[allow(clippy::cast_precision_loss)]
        {
            self.acquires_immediate as f64 / total as f64
        }
    }
}
