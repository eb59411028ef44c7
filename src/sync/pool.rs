// src/sync/pool.rs

//! Bounded-concurrency task pool with stable slot identities.
//!
//! Submitting blocks once `capacity` tasks are in flight; that wait is the
//! only backpressure in a sync run. Each running task owns one slot number in
//! `[0, capacity)`, which pins it to one row of the progress display.

use anyhow::{anyhow, Context, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;

/// A held permit plus slot number. Dropping it hands both back, whichever
/// way the task ended.
pub struct SlotLease {
    slot: usize,
    slots: Arc<Mutex<VecDeque<usize>>>,
    // dropped after the slot is back in the queue
    _permit: OwnedSemaphorePermit,
}

impl SlotLease {
    pub fn slot(&self) -> usize {
        self.slot
    }
}

impl Drop for SlotLease {
    fn drop(&mut self) {
        self.slots.lock().push_back(self.slot);
    }
}

pub struct WorkerPool {
    capacity: usize,
    semaphore: Arc<Semaphore>,
    slots: Arc<Mutex<VecDeque<usize>>>,
    tasks: JoinSet<()>,
}

impl WorkerPool {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        WorkerPool {
            capacity,
            semaphore: Arc::new(Semaphore::new(capacity)),
            slots: Arc::new(Mutex::new((0..capacity).collect())),
            tasks: JoinSet::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Wait for a free permit and take a slot with it.
    pub async fn acquire(&self) -> Result<SlotLease> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .context("Worker pool semaphore closed")?;
        let slot = self
            .slots
            .lock()
            .pop_front()
            .ok_or_else(|| anyhow!("No free slot despite a free permit"))?;
        Ok(SlotLease {
            slot,
            slots: self.slots.clone(),
            _permit: permit,
        })
    }

    /// Wait for capacity, then start `task` with its slot number and return
    /// without waiting for it to finish.
    pub async fn spawn<F, Fut>(&mut self, task: F) -> Result<()>
    where
        F: FnOnce(usize) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let lease = self.acquire().await?;
        let fut = task(lease.slot());
        self.tasks.spawn(async move {
            let _lease = lease;
            fut.await;
        });
        Ok(())
    }

    /// Wait for every submitted task. Returns how many of them panicked.
    pub async fn join(mut self) -> usize {
        let mut panicked = 0;
        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                log::error!("Worker task failed: {}", e);
                panicked += 1;
            }
        }
        panicked
    }
}
