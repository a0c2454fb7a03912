//! Audit event log for the keylock CLI.
//!
//! Every state change made through the CLI is appended to
//! `<store>/events/events.ndjson`, one JSON object per line.
//!
//! # Event Format
//!
//! - `ts`: RFC3339 timestamp
//! - `action`: `init`, `acquire`, `release`, `lock_clear` or `clear_all`
//! - `actor`: who ran the command (`user@HOST`)
//! - `key`: the lock key, for single-lock events
//! - `details`: freeform object with action-specific details
//!
//! The log is an audit trail, not part of the locking protocol: appends are
//! not atomic with the lock operation they describe.

use crate::context::StoreContext;
use crate::error::{LockError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;

/// Actions that can be logged as events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// Store initialized
    Init,
    /// Lock acquired
    Acquire,
    /// Lock released by its owner
    Release,
    /// Single lock cleared administratively
    LockClear,
    /// All locks cleared administratively
    ClearAll,
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventAction::Init => write!(f, "init"),
            EventAction::Acquire => write!(f, "acquire"),
            EventAction::Release => write!(f, "release"),
            EventAction::LockClear => write!(f, "lock_clear"),
            EventAction::ClearAll => write!(f, "clear_all"),
        }
    }
}

/// An event record for the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// RFC3339 timestamp when the event occurred.
    pub ts: DateTime<Utc>,

    /// The action that was performed.
    pub action: EventAction,

    /// The actor who performed the action (e.g., `user@HOST`).
    pub actor: String,

    /// Lock key for single-lock events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// Freeform details object with action-specific information.
    pub details: Value,
}

impl Event {
    /// Create a new event with the given action.
    ///
    /// The timestamp is set to the current time, and the actor is
    /// determined from the environment (USER@HOSTNAME).
    pub fn new(action: EventAction) -> Self {
        Self {
            ts: Utc::now(),
            action,
            actor: actor_string(),
            key: None,
            details: Value::Object(serde_json::Map::new()),
        }
    }

    /// Set the lock key for this event.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Set the details object for this event.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Serialize the event to a single-line JSON string.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| LockError::UserError(format!("failed to serialize event to JSON: {}", e)))
    }
}

/// `user@host` for the current process.
pub fn actor_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

/// Append an event to the store's events log.
///
/// The file and its directory are created if missing. Each append writes
/// exactly one line and syncs it to disk.
pub fn append_event(ctx: &StoreContext, event: &Event) -> Result<()> {
    let json_line = event.to_ndjson_line()?;

    let events_dir = ctx.events_dir();
    fs::create_dir_all(&events_dir).map_err(|e| {
        LockError::UserError(format!(
            "failed to create events directory '{}': {}",
            events_dir.display(),
            e
        ))
    })?;

    let events_file = ctx.events_file();
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&events_file)
        .map_err(|e| {
            LockError::UserError(format!(
                "failed to open events file '{}': {}",
                events_file.display(),
                e
            ))
        })?;

    writeln!(file, "{}", json_line).map_err(|e| {
        LockError::UserError(format!(
            "failed to write event to '{}': {}",
            events_file.display(),
            e
        ))
    })?;

    file.sync_all().map_err(|e| {
        LockError::UserError(format!(
            "failed to sync events file '{}': {}",
            events_file.display(),
            e
        ))
    })
}

/// Read every event in the store's log, oldest first.
pub fn read_events(ctx: &StoreContext) -> Result<Vec<Event>> {
    let events_file = ctx.events_file();
    if !events_file.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(&events_file).map_err(|e| {
        LockError::UserError(format!(
            "failed to read events file '{}': {}",
            events_file.display(),
            e
        ))
    })?;

    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str(line).map_err(|e| {
                LockError::UserError(format!("failed to parse event line: {}", e))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_event_creation() {
        let event = Event::new(EventAction::Init);

        assert_eq!(event.action, EventAction::Init);
        assert!(event.actor.contains('@'));
        assert!(event.key.is_none());
        let age = Utc::now().signed_duration_since(event.ts);
        assert!(age.num_minutes() < 1);
    }

    #[test]
    fn test_event_with_key_and_details() {
        let event = Event::new(EventAction::Acquire)
            .with_key("TASK-001")
            .with_details(json!({"owner": "alice", "timeout": 60}));

        assert_eq!(event.key.as_deref(), Some("TASK-001"));
        assert_eq!(event.details["owner"], "alice");
        assert_eq!(event.details["timeout"], 60);
    }

    #[test]
    fn test_event_serialization_is_single_line_snake_case() {
        let event = Event::new(EventAction::LockClear).with_key("job");
        let json_line = event.to_ndjson_line().unwrap();

        assert!(!json_line.contains('\n'));
        assert!(json_line.contains("\"lock_clear\""));
        let parsed: Event = serde_json::from_str(&json_line).unwrap();
        assert_eq!(parsed.action, EventAction::LockClear);
    }

    #[test]
    fn test_event_without_key_omits_field() {
        let json_line = Event::new(EventAction::ClearAll).to_ndjson_line().unwrap();
        let parsed: Value = serde_json::from_str(&json_line).unwrap();
        assert!(parsed.get("key").is_none());
    }

    #[test]
    fn test_event_action_display_matches_serde() {
        for action in [
            EventAction::Init,
            EventAction::Acquire,
            EventAction::Release,
            EventAction::LockClear,
            EventAction::ClearAll,
        ] {
            let serialized = serde_json::to_string(&action).unwrap();
            assert_eq!(serialized, format!("\"{}\"", action));
        }
    }

    #[test]
    fn test_append_and_read_events() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = StoreContext::at(temp_dir.path());

        assert!(read_events(&ctx).unwrap().is_empty());

        append_event(&ctx, &Event::new(EventAction::Init)).unwrap();
        append_event(&ctx, &Event::new(EventAction::Acquire).with_key("job")).unwrap();

        let content = fs::read_to_string(ctx.events_file()).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.ends_with('\n'));

        let events = read_events(&ctx).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].action, EventAction::Init);
        assert_eq!(events[1].action, EventAction::Acquire);
        assert_eq!(events[1].key.as_deref(), Some("job"));
    }
}
