use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{Error, Result};

/// A fixed number of slots shared by the units of one run.
#[derive(Clone, Debug)]
pub struct Pool {
    slots: Arc<Semaphore>,
    capacity: usize,
}

/// Held by a running unit; dropping it frees the slot.
#[derive(Debug)]
pub struct PoolSlot {
    _permit: OwnedSemaphorePermit,
}

impl Pool {
    /// Rejects a size of zero or one larger than the semaphore can track.
    pub fn new(capacity: usize) -> Result<Self> {
        let max = Semaphore::MAX_PERMITS.min(u32::MAX as usize);
        if capacity == 0 || capacity > max {
            return Err(Error::InvalidPoolSize { size: capacity, max });
        }
        Ok(Self { slots: Arc::new(Semaphore::new(capacity)), capacity })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }

    pub fn in_use(&self) -> usize {
        self.capacity - self.available()
    }

    /// Waits for a free slot. Waiters are served in arrival order.
    pub async fn acquire(&self) -> Result<PoolSlot> {
        let permit = self.slots.clone().acquire_owned().await.map_err(|_| Error::PoolClosed)?;
        Ok(PoolSlot { _permit: permit })
    }

    /// Resolves once every slot is free again.
    pub async fn join(&self) -> Result<()> {
        // capacity fits in u32, checked in new()
        let all = self.capacity as u32;
        let _permits = self.slots.acquire_many(all).await.map_err(|_| Error::PoolClosed)?;
        Ok(())
    }
}
