//! # Execution guard: single-flight per task key.
//!
//! Each key owns a one-permit [`Semaphore`]. [`ExecutionGuard::try_acquire`] never waits:
//! a held key yields `None` and the caller skips the tick (no queue, no backlog).
//!
//! ```text
//! try_acquire("A") → Some(permit)     // run
//! try_acquire("A") → None             // AlreadyRunning
//! drop(permit) / permit.release()
//! try_acquire("A") → Some(permit)
//! ```
//!
//! ## Rules
//! - At most one [`GuardPermit`] exists per key at any instant
//! - Release happens when the permit is dropped, so every exit path releases
//! - Keys are independent; there is no lock shared across keys

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Keyed async mutual exclusion.
#[derive(Default)]
pub struct ExecutionGuard {
    slots: Mutex<HashMap<Arc<str>, Arc<Semaphore>>>,
}

/// Proof of holding the guard for one key. Releases on drop.
#[derive(Debug)]
pub struct GuardPermit {
    key: Arc<str>,
    _permit: OwnedSemaphorePermit,
}

impl ExecutionGuard {
    /// Creates an empty guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tries to take the key without waiting.
    pub fn try_acquire(&self, key: &str) -> Option<GuardPermit> {
        let sem = self.slot(key);
        sem.try_acquire_owned().ok().map(|permit| GuardPermit {
            key: Arc::from(key),
            _permit: permit,
        })
    }

    /// True while some permit for `key` is alive.
    pub fn is_held(&self, key: &str) -> bool {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .get(key)
            .map(|sem| sem.available_permits() == 0)
            .unwrap_or(false)
    }

    fn slot(&self, key: &str) -> Arc<Semaphore> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(sem) = slots.get(key) {
            return Arc::clone(sem);
        }
        let sem = Arc::new(Semaphore::new(1));
        slots.insert(Arc::from(key), Arc::clone(&sem));
        sem
    }
}

impl GuardPermit {
    /// Key this permit guards.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Releases the key explicitly (same as dropping the permit).
    pub fn release(self) {}
}
