//! In-process lock store.

use super::{Insert, LockRecord, LockStore, NewLock};
use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// A lock store backed by a map behind a single mutex.
///
/// Every operation holds the mutex for its whole duration, which makes each
/// one a transaction.
#[derive(Debug)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<String, LockRecord>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    /// Create an empty store on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store that reads time from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: Mutex::new(BTreeMap::new()),
            clock,
        }
    }

    fn records(&self) -> MutexGuard<'_, BTreeMap<String, LockRecord>> {
        // A panic mid-operation leaves the map itself consistent.
        self.records
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LockStore for MemoryStore {
    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn insert_unique(&self, lock: NewLock) -> Result<Insert> {
        let mut records = self.records();
        if let Some(existing) = records.get(&lock.key) {
            return Ok(Insert::Conflict(existing.clone()));
        }
        let record = lock.stamp(self.clock.now());
        records.insert(record.key.clone(), record.clone());
        Ok(Insert::Created(record))
    }

    fn get(&self, key: &str) -> Result<Option<LockRecord>> {
        Ok(self.records().get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.records().remove(key).is_some())
    }

    fn delete_matching(&self, record: &LockRecord) -> Result<bool> {
        let mut records = self.records();
        match records.get(&record.key) {
            Some(current) if current.token == record.token => {
                records.remove(&record.key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn delete_all(&self) -> Result<usize> {
        let mut records = self.records();
        let removed = records.len();
        records.clear();
        Ok(removed)
    }

    fn list(&self) -> Result<Vec<LockRecord>> {
        Ok(self.records().values().cloned().collect())
    }
}
