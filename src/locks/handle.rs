//! The lock handle returned by a successful acquire.

use super::guard::LockGuard;
use super::manager::DEFAULT_OWNER;
use crate::error::{LockError, Result};
use crate::store::{LockRecord, LockStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// A handle to one lock record.
///
/// The handle keeps a snapshot of the record it was created from, but every
/// operation that depends on the record still existing reads through to the
/// store. Once the record is deleted (by [`release`](Lock::release) or by an
/// administrative clear) those operations fail with
/// [`LockError::AlreadyAbsent`], even if the key has since been acquired again.
#[derive(Debug)]
pub struct Lock {
    store: Arc<dyn LockStore>,
    record: LockRecord,
}

impl Lock {
    pub(super) fn new(store: Arc<dyn LockStore>, record: LockRecord) -> Self {
        Self { store, record }
    }

    /// The lock key. Does not check that the lock still exists.
    pub fn key(&self) -> &str {
        &self.record.key
    }

    /// The owner recorded at acquisition.
    pub fn owner(&self) -> &str {
        &self.record.owner
    }

    /// Validity in seconds from creation.
    pub fn timeout(&self) -> u64 {
        self.record.timeout
    }

    /// When the store created the record.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.record.creation_time
    }

    /// Identity of the record this handle is bound to.
    pub fn token(&self) -> Uuid {
        self.record.token
    }

    /// The record snapshot taken when the handle was created.
    pub fn record(&self) -> &LockRecord {
        &self.record
    }

    /// Whether the lock has reached its timeout.
    ///
    /// Advisory only: an expired lock is not removed and still blocks the key.
    ///
    /// # Errors
    ///
    /// * `LockError::AlreadyAbsent` - The record is gone
    pub fn is_expired(&self) -> Result<bool> {
        let current = self.current()?;
        Ok(current.is_expired_at(self.store.now()))
    }

    /// Release the lock, deleting its record.
    ///
    /// # Errors
    ///
    /// * `LockError::ModificationNotAllowed` - `owner` is not the recorded
    ///   owner; the lock is left in place
    /// * `LockError::AlreadyAbsent` - The record was already released or cleared
    pub fn release(&self, owner: &str) -> Result<()> {
        let current = self.current()?;

        if current.owner != owner {
            tracing::warn!(
                key = %current.key,
                owner = %current.owner,
                requested = owner,
                "refused release by non-owner"
            );
            return Err(LockError::ModificationNotAllowed {
                key: current.key,
                owner: current.owner,
                requested: owner.to_string(),
            });
        }

        if !self.store.delete_matching(&current)? {
            return Err(LockError::absent(&current.key));
        }

        tracing::debug!(key = %current.key, owner, "released lock");
        Ok(())
    }

    /// Release with [`DEFAULT_OWNER`].
    pub fn release_default(&self) -> Result<()> {
        self.release(DEFAULT_OWNER)
    }

    /// Wrap the lock in a guard that releases it as `owner` when dropped.
    pub fn into_guard(self, owner: impl Into<String>) -> LockGuard {
        LockGuard::new(self, owner.into())
    }

    /// The stored record, if it is still the one this handle is bound to.
    fn current(&self) -> Result<LockRecord> {
        match self.store.get(&self.record.key)? {
            Some(record) if record.token == self.record.token => Ok(record),
            _ => Err(LockError::absent(&self.record.key)),
        }
    }
}
