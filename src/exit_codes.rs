//! Exit code constants for the keylock CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, missing store, refused without --force)
//! - 2: Internal error (store failure or stale lock)
//! - 3: Modification not allowed (owner mismatch on release)
//! - 4: Lock present (key held by a live lock)
//! - 5: Already absent (lock record vanished or was replaced)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or invalid local state.
pub const USER_ERROR: i32 = 1;

/// Internal error: the store failed, or an expired lock blocks the key.
pub const INTERNAL_ERROR: i32 = 2;

/// The caller is not the recorded owner of the lock.
pub const MODIFICATION_NOT_ALLOWED: i32 = 3;

/// The key is held by a live lock.
pub const LOCK_PRESENT: i32 = 4;

/// The lock record no longer exists.
pub const ALREADY_ABSENT: i32 = 5;
