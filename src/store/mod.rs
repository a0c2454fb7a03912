//! Lock record stores.
//!
//! A store is the only shared state in keylock. It must make each operation
//! below atomic with respect to concurrent callers on the same store; the
//! manager relies on nothing else for mutual exclusion.
//!
//! Two adapters are provided:
//! - [`MemoryStore`]: a mutex-guarded map, shared between threads of one process.
//! - [`FileStore`]: one JSON file per key in a directory, shared between
//!   processes on the same host or filesystem.

mod file;
mod memory;
mod record;


pub use file::FileStore;
pub use memory::MemoryStore;
pub use record::{Insert, LockRecord, NewLock};

use crate::error::Result;
use chrono::{DateTime, Utc};
use std::fmt;

/// A transactional table of lock records keyed uniquely by `key`.
pub trait LockStore: Send + Sync + fmt::Debug {
    /// The store's notion of the current time.
    fn now(&self) -> DateTime<Utc>;

    /// Insert a record unless one with the same key exists.
    ///
    /// On conflict, returns the record currently holding the key.
    fn insert_unique(&self, lock: NewLock) -> Result<Insert>;

    /// Read the record stored under `key`.
    fn get(&self, key: &str) -> Result<Option<LockRecord>>;

    /// Delete the record under `key`. Returns `false` if there was none.
    fn delete(&self, key: &str) -> Result<bool>;

    /// Delete the record under `record.key` only if it is `record`
    /// (same token). Returns `false` if it was absent or replaced.
    fn delete_matching(&self, record: &LockRecord) -> Result<bool>;

    /// Delete every record. Returns how many were removed.
    fn delete_all(&self) -> Result<usize>;

    /// All records, in no particular order.
    fn list(&self) -> Result<Vec<LockRecord>>;
}
