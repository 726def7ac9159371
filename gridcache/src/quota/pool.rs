//! Bounded pool for background quota work.
//!
//! Cache scans and eviction passes share one semaphore so housekeeping never
//! saturates the disk. The request path does not go through the pool.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::error::QuotaError;

/// Default number of concurrent scan and eviction tasks.
pub const DEFAULT_MAX_CONCURRENT_TASKS: usize = 4;

/// A semaphore-backed capacity limiter with in-flight accounting.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

#[derive(Debug)]
struct PoolInner {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl WorkerPool {
    /// Create a pool. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(PoolInner {
                semaphore: Arc::new(Semaphore::new(capacity)),
                capacity,
                in_flight: AtomicUsize::new(0),
                peak_in_flight: AtomicUsize::new(0),
            }),
        }
    }

    /// Wait for a permit.
    ///
    /// # Errors
    ///
    /// [`QuotaError::PoolClosed`] once [`close`](Self::close) was called.
    pub async fn acquire(&self) -> Result<WorkerPermit, QuotaError> {
        let permit = Arc::clone(&self.inner.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| QuotaError::PoolClosed)?;
        Ok(self.track(permit))
    }

    /// Take a permit if one is free right now.
    pub fn try_acquire(&self) -> Option<WorkerPermit> {
        let permit = Arc::clone(&self.inner.semaphore).try_acquire_owned().ok()?;
        Some(self.track(permit))
    }

    /// Refuse further permits. Waiters fail with [`QuotaError::PoolClosed`].
    pub fn close(&self) {
        self.inner.semaphore.close();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.semaphore.is_closed()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::Relaxed)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.inner.peak_in_flight.load(Ordering::Relaxed)
    }

    fn track(&self, permit: OwnedSemaphorePermit) -> WorkerPermit {
        let current = self.inner.in_flight.fetch_add(1, Ordering::Relaxed) + 1;
        self.inner
            .peak_in_flight
            .fetch_max(current, Ordering::Relaxed);

        WorkerPermit {
            _permit: permit,
            pool: Arc::clone(&self.inner),
        }
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENT_TASKS)
    }
}

/// Held while a task runs; releases its slot when dropped.
#[derive(Debug)]
pub struct WorkerPermit {
    _permit: OwnedSemaphorePermit,
    pool: Arc<PoolInner>,
}

impl Drop for WorkerPermit {
    fn drop(&mut self) {
        self.pool.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}
