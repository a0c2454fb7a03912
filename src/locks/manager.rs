//! Lock acquisition and administrative clearing.

use super::handle::Lock;
use super::types::LockInfo;
use crate::error::{LockError, Result};
use crate::store::{Insert, LockRecord, LockStore, NewLock};
use std::sync::Arc;

/// Default validity of a lock, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 3600;

/// Owner recorded when the caller does not name one.
///
/// This is the literal string `"None"`, not an absence marker: a lock taken
/// with the default owner is released with the default owner.
pub const DEFAULT_OWNER: &str = "None";

/// Creates locks in a shared store.
///
/// Cloning a manager is cheap and the clones share the store.
#[derive(Debug, Clone)]
pub struct LockManager {
    store: Arc<dyn LockStore>,
}

impl LockManager {
    /// Create a manager over `store`.
    pub fn new(store: Arc<dyn LockStore>) -> Self {
        Self { store }
    }

    /// Acquire the lock named `key`.
    ///
    /// # Arguments
    ///
    /// * `key` - The resource name (non-empty)
    /// * `timeout` - Validity in seconds from creation (positive)
    /// * `owner` - Who is acquiring; only this owner may release
    ///
    /// # Returns
    ///
    /// * `Ok(Lock)` - The record was created
    /// * `Err(LockError::LockPresent)` - A live lock holds the key
    /// * `Err(LockError::StaleLock)` - An expired lock holds the key and must
    ///   be cleared first
    /// * `Err(LockError::UserError)` - Empty key or zero timeout
    pub fn acquire(&self, key: &str, timeout: u64, owner: &str) -> Result<Lock> {
        validate_key(key)?;
        if timeout == 0 {
            return Err(LockError::UserError(format!(
                "lock timeout for '{}' must be greater than 0",
                key
            )));
        }

        let request = NewLock {
            key: key.to_string(),
            owner: owner.to_string(),
            timeout,
            pid: Some(std::process::id()),
        };

        match self.store.insert_unique(request)? {
            Insert::Created(record) => {
                tracing::debug!(key, owner, timeout, token = %record.token, "acquired lock");
                Ok(Lock::new(Arc::clone(&self.store), record))
            }
            Insert::Conflict(existing) => Err(self.conflict(existing)),
        }
    }

    /// Acquire `key` with [`DEFAULT_TIMEOUT_SECS`] and [`DEFAULT_OWNER`].
    pub fn acquire_default(&self, key: &str) -> Result<Lock> {
        self.acquire(key, DEFAULT_TIMEOUT_SECS, DEFAULT_OWNER)
    }

    /// Bind a handle to the record currently stored under `key`.
    ///
    /// For callers that acquire in one process and release in another. The
    /// handle enforces the usual owner check on release.
    pub fn attach(&self, key: &str) -> Result<Lock> {
        validate_key(key)?;
        match self.store.get(key)? {
            Some(record) => Ok(Lock::new(Arc::clone(&self.store), record)),
            None => Err(LockError::absent(key)),
        }
    }

    /// Read the lock stored under `key`, if any.
    pub fn inspect(&self, key: &str) -> Result<Option<LockInfo>> {
        validate_key(key)?;
        let record = self.store.get(key)?;
        let now = self.store.now();
        Ok(record.map(|r| LockInfo::observe(r, now)))
    }

    /// Administrative operations that ignore ownership.
    pub fn admin(&self) -> LockAdmin<'_> {
        LockAdmin {
            store: self.store.as_ref(),
        }
    }

    fn conflict(&self, existing: LockRecord) -> LockError {
        let now = self.store.now();
        if existing.is_expired_at(now) {
            tracing::warn!(
                key = %existing.key,
                owner = %existing.owner,
                age = %existing.age_string(now),
                "expired lock blocks acquisition"
            );
            LockError::StaleLock {
                overdue_secs: existing.overdue_secs(now),
                key: existing.key,
                owner: existing.owner,
                timeout: existing.timeout,
            }
        } else {
            tracing::debug!(key = %existing.key, owner = %existing.owner, "lock is held");
            LockError::LockPresent {
                key: existing.key,
                owner: existing.owner,
            }
        }
    }
}

/// Unconditional operations for bootstrap and recovery.
///
/// Nothing here checks owners or expiry. Obtained through
/// [`LockManager::admin`] so routine code does not reach it by accident.
#[derive(Debug, Clone, Copy)]
pub struct LockAdmin<'a> {
    store: &'a dyn LockStore,
}

impl LockAdmin<'_> {
    /// Delete every lock. Returns how many were removed.
    ///
    /// Every outstanding [`Lock`] handle becomes invalid and reports
    /// `AlreadyAbsent` from then on.
    pub fn clear_all(&self) -> Result<usize> {
        let removed = self.store.delete_all()?;
        tracing::info!(removed, "cleared all locks");
        Ok(removed)
    }

    /// Delete the lock stored under `key`, whoever owns it.
    ///
    /// # Returns
    ///
    /// * `Ok(LockInfo)` - The removed lock (for audit purposes)
    /// * `Err(LockError::AlreadyAbsent)` - No lock under `key`, or it changed
    ///   while being cleared
    pub fn clear(&self, key: &str) -> Result<LockInfo> {
        validate_key(key)?;
        let record = self.store.get(key)?.ok_or_else(|| LockError::absent(key))?;
        let now = self.store.now();

        if !self.store.delete_matching(&record)? {
            return Err(LockError::absent(key));
        }

        let cleared = LockInfo::observe(record, now);
        tracing::info!(
            key,
            owner = %cleared.record.owner,
            was_expired = cleared.is_expired,
            "cleared lock"
        );
        Ok(cleared)
    }

    /// All locks, sorted by key.
    pub fn list(&self) -> Result<Vec<LockInfo>> {
        let now = self.store.now();
        let mut locks: Vec<LockInfo> = self
            .store
            .list()?
            .into_iter()
            .map(|record| LockInfo::observe(record, now))
            .collect();

        // Sort by key for consistent output
        locks.sort_by(|a, b| a.record.key.cmp(&b.record.key));
        Ok(locks)
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(LockError::UserError("lock key must not be empty".to_string()));
    }
    Ok(())
}
