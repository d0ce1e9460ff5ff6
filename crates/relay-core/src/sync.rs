//! Poison-tolerant locking for the job registry and test doubles.

use std::sync::{Mutex, MutexGuard};

/// Extension trait for `Mutex` that recovers the guard from a poisoned lock.
///
/// The state guarded in this workspace is plain bookkeeping (maps of active
/// jobs, recorded calls), so a panic in another holder leaves nothing half
/// written that later readers could trip over.
pub trait IgnoreLock<T> {
    /// Lock the mutex, taking the inner guard if the lock is poisoned.
    fn lock_ignore_poison(&self) -> MutexGuard<'_, T>;
}

impl<T> IgnoreLock<T> for Mutex<T> {
    fn lock_ignore_poison(&self) -> MutexGuard<'_, T> {
        self.lock().unwrap_or_else(|poisoned| {
            tracing::debug!("Recovered guard from poisoned mutex");
            poisoned.into_inner()
        })
    }
}
