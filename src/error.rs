//! Error types for keylock.
//!
//! Uses thiserror for derive macros. Every variant carries enough context to
//! print a user-actionable message without the caller re-reading the store.

use crate::exit_codes;
use thiserror::Error;

/// Classification of a [`LockError`].
///
/// Several variants can share a kind: a stale lock and a failing store are
/// both internal errors from the caller's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The key is held by a live lock.
    LockPresent,
    /// Stale lock in the way, or the store itself failed.
    Internal,
    /// The caller is not the recorded owner.
    ModificationNotAllowed,
    /// The lock record vanished between handle creation and use.
    AlreadyAbsent,
    /// Invalid arguments or local setup.
    User,
}

/// Main error type for lock operations.
#[derive(Error, Debug)]
pub enum LockError {
    /// A live lock already holds the key.
    #[error("lock '{key}' is held by '{owner}'")]
    LockPresent { key: String, owner: String },

    /// An expired lock still occupies the key and must be cleared first.
    #[error(
        "lock '{key}' held by '{owner}' expired {overdue_secs}s ago (timeout {timeout}s); clear it before acquiring"
    )]
    StaleLock {
        key: String,
        owner: String,
        timeout: u64,
        overdue_secs: i64,
    },

    /// The underlying store failed.
    #[error("lock store failure: {0}")]
    Store(String),

    /// Release attempted by someone other than the recorded owner.
    #[error("lock '{key}' is owned by '{owner}', not '{requested}'")]
    ModificationNotAllowed {
        key: String,
        owner: String,
        requested: String,
    },

    /// The lock record no longer exists (released, cleared, or replaced).
    #[error("lock '{key}' is already absent")]
    AlreadyAbsent { key: String },

    /// Invalid arguments or local setup.
    #[error("{0}")]
    UserError(String),
}

impl LockError {
    /// Returns the taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LockError::LockPresent { .. } => ErrorKind::LockPresent,
            LockError::StaleLock { .. } | LockError::Store(_) => ErrorKind::Internal,
            LockError::ModificationNotAllowed { .. } => ErrorKind::ModificationNotAllowed,
            LockError::AlreadyAbsent { .. } => ErrorKind::AlreadyAbsent,
            LockError::UserError(_) => ErrorKind::User,
        }
    }

    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::LockPresent => exit_codes::LOCK_PRESENT,
            ErrorKind::Internal => exit_codes::INTERNAL_ERROR,
            ErrorKind::ModificationNotAllowed => exit_codes::MODIFICATION_NOT_ALLOWED,
            ErrorKind::AlreadyAbsent => exit_codes::ALREADY_ABSENT,
            ErrorKind::User => exit_codes::USER_ERROR,
        }
    }

    pub(crate) fn absent(key: &str) -> Self {
        LockError::AlreadyAbsent {
            key: key.to_string(),
        }
    }
}

/// Result type alias for keylock operations.
pub type Result<T> = std::result::Result<T, LockError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_lock_and_store_failure_are_both_internal() {
        let stale = LockError::StaleLock {
            key: "k".to_string(),
            owner: "o".to_string(),
            timeout: 1,
            overdue_secs: 4,
        };
        let store = LockError::Store("disk full".to_string());

        assert_eq!(stale.kind(), ErrorKind::Internal);
        assert_eq!(store.kind(), ErrorKind::Internal);
        assert_eq!(stale.exit_code(), exit_codes::INTERNAL_ERROR);
        assert_eq!(store.exit_code(), exit_codes::INTERNAL_ERROR);
    }

    #[test]
    fn already_absent_is_distinct_from_store_failure() {
        let err = LockError::absent("TASK-001");
        assert_eq!(err.kind(), ErrorKind::AlreadyAbsent);
        assert_eq!(err.exit_code(), exit_codes::ALREADY_ABSENT);
    }

    #[test]
    fn lock_errors_have_correct_exit_codes() {
        let present = LockError::LockPresent {
            key: "k".to_string(),
            owner: "alice".to_string(),
        };
        assert_eq!(present.exit_code(), exit_codes::LOCK_PRESENT);

        let denied = LockError::ModificationNotAllowed {
            key: "k".to_string(),
            owner: "alice".to_string(),
            requested: "bob".to_string(),
        };
        assert_eq!(denied.exit_code(), exit_codes::MODIFICATION_NOT_ALLOWED);

        let user = LockError::UserError("bad argument".to_string());
        assert_eq!(user.exit_code(), exit_codes::USER_ERROR);
    }

    #[test]
    fn error_messages_are_descriptive() {
        let err = LockError::LockPresent {
            key: "TASK-001".to_string(),
            owner: "alice".to_string(),
        };
        assert_eq!(err.to_string(), "lock 'TASK-001' is held by 'alice'");

        let err = LockError::ModificationNotAllowed {
            key: "TASK-001".to_string(),
            owner: "alice".to_string(),
            requested: "bob".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "lock 'TASK-001' is owned by 'alice', not 'bob'"
        );

        let err = LockError::absent("TASK-001");
        assert_eq!(err.to_string(), "lock 'TASK-001' is already absent");
    }
}
