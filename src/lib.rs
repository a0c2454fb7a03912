//! keylock: named locks over a shared record store.
//!
//! Processes that share a [`LockStore`] coordinate exclusive access to
//! resources identified by string keys. The store's unique-key insert is the
//! whole concurrency story: there is no lock server and no in-process mutex.
//!
//! ```
//! use std::sync::Arc;
//! use keylock::{LockError, LockManager, MemoryStore};
//!
//! let manager = LockManager::new(Arc::new(MemoryStore::new()));
//!
//! let lock = manager.acquire("calc-42", 60, "worker-1")?;
//! assert!(matches!(
//!     manager.acquire("calc-42", 60, "worker-2"),
//!     Err(LockError::LockPresent { .. })
//! ));
//!
//! lock.release("worker-1")?;
//! # Ok::<(), LockError>(())
//! ```

pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod exit_codes;
pub mod fs;
pub mod locks;
pub mod store;

pub use error::{ErrorKind, LockError, Result};
pub use locks::{
    DEFAULT_OWNER, DEFAULT_TIMEOUT_SECS, Lock, LockAdmin, LockGuard, LockInfo, LockManager,
};
pub use store::{FileStore, LockRecord, LockStore, MemoryStore};
