// src/exec/pool.rs

//! Bounded worker pool for the CPU-bound lane.
//!
//! The pool is a fair semaphore: at most `capacity` slots are held at any
//! instant and waiters are served in the order they started waiting. A slot
//! is released when its [`PoolSlot`] is dropped, which also happens when the
//! future waiting for or holding it is cancelled.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::trace;

#[derive(Debug, Default)]
struct Counters {
    running: AtomicUsize,
    peak: AtomicUsize,
    queued: AtomicUsize,
}

#[derive(Debug, Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    queue_timeout: Option<Duration>,
    counters: Arc<Counters>,
}

/// A held pool slot. Dropping it frees the slot.
#[derive(Debug)]
pub struct PoolSlot {
    _permit: OwnedSemaphorePermit,
    counters: Arc<Counters>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotError {
    /// Waited `queue_timeout` without getting a slot.
    Timeout(Duration),
    Closed,
}

impl WorkerPool {
    /// `capacity` is clamped to at least 1.
    pub fn new(capacity: usize, queue_timeout: Option<Duration>) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            queue_timeout,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Wait (FIFO) for a free slot.
    pub async fn acquire(&self) -> Result<PoolSlot, SlotError> {
        let _queued = QueuedGuard::enter(&self.counters);
        let acquire = self.semaphore.clone().acquire_owned();

        let permit = match self.queue_timeout {
            Some(limit) => match tokio::time::timeout(limit, acquire).await {
                Ok(res) => res.map_err(|_| SlotError::Closed)?,
                Err(_) => return Err(SlotError::Timeout(limit)),
            },
            None => acquire.await.map_err(|_| SlotError::Closed)?,
        };

        let running = self.counters.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak.fetch_max(running, Ordering::SeqCst);
        trace!(running, capacity = self.capacity, "pool slot acquired");

        Ok(PoolSlot {
            _permit: permit,
            counters: self.counters.clone(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently held.
    pub fn running(&self) -> usize {
        self.counters.running.load(Ordering::SeqCst)
    }

    /// Highest number of slots ever held at once.
    pub fn peak(&self) -> usize {
        self.counters.peak.load(Ordering::SeqCst)
    }

    /// Requests currently waiting for a slot.
    pub fn queued(&self) -> usize {
        self.counters.queued.load(Ordering::SeqCst)
    }
}

impl Drop for PoolSlot {
    fn drop(&mut self) {
        let left = self.counters.running.fetch_sub(1, Ordering::SeqCst) - 1;
        trace!(running = left, "pool slot released");
    }
}

struct QueuedGuard<'a>(&'a Counters);

impl<'a> QueuedGuard<'a> {
    fn enter(counters: &'a Counters) -> Self {
        counters.queued.fetch_add(1, Ordering::SeqCst);
        Self(counters)
    }
}

impl Drop for QueuedGuard<'_> {
    fn drop(&mut self) {
        self.0.queued.fetch_sub(1, Ordering::SeqCst);
    }
}
