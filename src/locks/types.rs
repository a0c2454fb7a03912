//! Lock information structures.

use crate::store::LockRecord;
use chrono::{DateTime, Utc};

/// A lock record as observed at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockInfo {
    /// The stored record.
    pub record: LockRecord,

    /// When the store was read.
    pub observed_at: DateTime<Utc>,

    /// Whether the lock had expired at `observed_at`.
    pub is_expired: bool,
}

impl LockInfo {
    pub(crate) fn observe(record: LockRecord, now: DateTime<Utc>) -> Self {
        let is_expired = record.is_expired_at(now);
        Self {
            record,
            observed_at: now,
            is_expired,
        }
    }

    /// Age of the lock at observation time, formatted for humans.
    pub fn age_string(&self) -> String {
        self.record.age_string(self.observed_at)
    }
}

impl std::fmt::Display for LockInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (owner: {}, age: {}, timeout: {}s{})",
            self.record.key,
            self.record.owner,
            self.age_string(),
            self.record.timeout,
            if self.is_expired { ", EXPIRED" } else { "" }
        )
    }
}
