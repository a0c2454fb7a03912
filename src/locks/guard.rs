//! RAII lock guard implementation.

use super::handle::Lock;
use crate::error::Result;

/// RAII guard for a [`Lock`].
///
/// When dropped, the lock is released as the owner the guard was created
/// with. If that fails, a warning is logged but no panic occurs.
#[derive(Debug)]
pub struct LockGuard {
    lock: Lock,

    /// Owner used for the release.
    owner: String,

    /// Whether the lock has been released manually.
    released: bool,
}

impl LockGuard {
    pub(super) fn new(lock: Lock, owner: String) -> Self {
        Self {
            lock,
            owner,
            released: false,
        }
    }

    /// The guarded lock.
    pub fn lock(&self) -> &Lock {
        &self.lock
    }

    /// Manually release the lock.
    ///
    /// This is useful when you want to release the lock before the guard
    /// goes out of scope, and want to handle errors explicitly.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.lock.release(&self.owner)
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if !self.released
            && let Err(e) = self.lock.release(&self.owner)
        {
            tracing::warn!(key = self.lock.key(), error = %e, "failed to release lock on drop");
        }
    }
}
