//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};

/// Configuration for a keylock store.
///
/// This struct represents the contents of `<store>/config.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Timeout in seconds used by `acquire` when `--timeout` is not given.
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,

    /// Owner used by `acquire` and `release` when `--owner` is not given.
    #[serde(default = "default_owner")]
    pub default_owner: String,

    /// Whether state changes are appended to `events/events.ndjson`.
    #[serde(default = "default_true")]
    pub audit_events: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_timeout_secs: default_timeout_secs(),
            default_owner: default_owner(),
            audit_events: default_true(),
        }
    }
}
