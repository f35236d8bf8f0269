//! Admission gate bounding the number of pipelines running at once.
//!
//! Requests over capacity are rejected immediately instead of queueing.

use sift_core::{AppError, AppResult};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Counting gate with a fixed number of slots.
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// A held admission slot. The slot returns to the gate when this is dropped.
#[derive(Debug)]
pub struct AdmissionSlot {
    _permit: OwnedSemaphorePermit,
}

impl AdmissionGate {
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Take a slot without waiting.
    ///
    /// # Errors
    /// Returns `AppError::Overloaded` when every slot is held.
    pub fn try_acquire(&self) -> AppResult<AdmissionSlot> {
        match Arc::clone(&self.semaphore).try_acquire_owned() {
            Ok(permit) => Ok(AdmissionSlot { _permit: permit }),
            Err(_) => {
                tracing::warn!(capacity = self.capacity, "admission rejected at capacity");
                Err(AppError::Overloaded(
                    "Too many concurrent queries; try again shortly.".to_string(),
                ))
            }
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently free.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}
