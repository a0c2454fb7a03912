//! Lock record structures and utilities.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A persisted lock record.
///
/// At most one record exists per `key` in a store at any instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    /// The resource identifier being protected.
    pub key: String,

    /// Free-form identifier of the acquiring party.
    pub owner: String,

    /// Validity duration in seconds, counted from `creation_time`.
    pub timeout: u64,

    /// When the store committed the record (RFC3339).
    pub creation_time: DateTime<Utc>,

    /// Identity of this particular record. A key cleared and acquired again
    /// gets a new token.
    pub token: Uuid,

    /// Process ID of the acquiring process (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
}

impl LockRecord {
    /// Time elapsed since the record was created.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.creation_time)
    }

    /// Whether `now - creation_time >= timeout`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.age(now).num_seconds() >= self.timeout_secs()
    }

    /// Seconds past expiry; negative while the lock is still live.
    pub fn overdue_secs(&self, now: DateTime<Utc>) -> i64 {
        self.age(now).num_seconds().saturating_sub(self.timeout_secs())
    }

    /// Format the age as a human-readable string.
    pub fn age_string(&self, now: DateTime<Utc>) -> String {
        let age = self.age(now);
        let seconds = age.num_seconds();
        let minutes = age.num_minutes();
        let hours = age.num_hours();
        let days = age.num_days();

        if days > 0 {
            format!("{}d {}h", days, hours % 24)
        } else if hours > 0 {
            format!("{}h {}m", hours, minutes % 60)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds % 60)
        } else {
            format!("{}s", seconds.max(0))
        }
    }

    fn timeout_secs(&self) -> i64 {
        i64::try_from(self.timeout).unwrap_or(i64::MAX)
    }
}

/// The fields a caller supplies when asking a store to create a record.
///
/// The store fills in `creation_time` and `token` at insert time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLock {
    pub key: String,
    pub owner: String,
    pub timeout: u64,
    pub pid: Option<u32>,
}

impl NewLock {
    /// Turn the request into a record committed at `now`.
    pub fn stamp(self, now: DateTime<Utc>) -> LockRecord {
        LockRecord {
            key: self.key,
            owner: self.owner,
            timeout: self.timeout,
            creation_time: now,
            token: Uuid::new_v4(),
            pid: self.pid,
        }
    }
}

/// Outcome of [`LockStore::insert_unique`](super::LockStore::insert_unique).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insert {
    /// The record was committed.
    Created(LockRecord),
    /// Another record already holds the key; this is that record.
    Conflict(LockRecord),
}
