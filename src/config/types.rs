//! Configuration defaults for keylock.

use crate::locks::{DEFAULT_OWNER, DEFAULT_TIMEOUT_SECS};

// Default value functions for serde
pub(crate) fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
pub(crate) fn default_owner() -> String {
    DEFAULT_OWNER.to_string()
}
pub(crate) fn default_true() -> bool {
    true
}
