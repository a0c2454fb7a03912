//! Named locks over a shared record store.
//!
//! A lock is a record in a [`LockStore`](crate::store::LockStore) whose key is
//! the name of the protected resource. The store's unique-key insert is the
//! only source of mutual exclusion: [`LockManager`] holds no state of its own,
//! so any number of managers in any number of processes may share one store.
//!
//! # Lifecycle
//!
//! - `acquire` inserts a record and returns a [`Lock`] handle.
//! - A record whose age reaches its timeout is *expired*. Expiry is only a
//!   predicate: the record stays in place and keeps blocking the key.
//! - `Lock::release` deletes the record if the caller is the recorded owner.
//! - [`LockAdmin`] clears records unconditionally, for bootstrap and recovery.
//!
//! # Errors
//!
//! Acquiring a held key fails with `LockPresent`, or with `StaleLock` if the
//! holder has expired. Nothing is retried and nothing is stolen.

mod guard;
mod handle;
mod manager;
mod types;


// Re-export public API
pub use guard::LockGuard;
pub use handle::Lock;
pub use manager::{DEFAULT_OWNER, DEFAULT_TIMEOUT_SECS, LockAdmin, LockManager};
pub use types::LockInfo;
