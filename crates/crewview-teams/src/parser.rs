//! Parsers for team configs, task files and inbox files.
//!
//! Raw serde types use `#[serde(default)]` for forward compatibility with
//! unknown/added fields. Everything is resolved into the canonical types in
//! `types.rs` here, at the parse boundary.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::errors::TeamsError;
use crate::types::{InboxMessage, Task, TaskStatus, timestamp_from_value};

// =============================================================================
// Team config: <teams>/<team>/config.json
// =============================================================================

/// Parse a team config. The content is kept opaque but must be a JSON object.
pub fn parse_team_config(content: &str) -> Result<Value, TeamsError> {
    let value: Value = serde_json::from_str(content)?;
    if !value.is_object() {
        return Err(TeamsError::Json(serde::de::Error::custom(
            "team config must be a JSON object",
        )));
    }
    Ok(value)
}

// =============================================================================
// Task file: <tasks>/<team>/<id>.json
// =============================================================================

/// Raw task file (serde).
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawTask {
    id: Option<Value>,
    subject: String,
    status: Option<TaskStatus>,
    #[serde(rename = "createdAt")]
    created_at: Option<Value>,
    owner: Option<String>,
    #[serde(rename = "blockedBy")]
    blocked_by: Vec<Value>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a task file. `file_stem` is used as the id when the file has none.
pub fn parse_task(file_stem: &str, content: &str) -> Result<Task, TeamsError> {
    let raw: RawTask = serde_json::from_str(content)?;

    Ok(Task {
        id: raw
            .id
            .as_ref()
            .and_then(id_string)
            .unwrap_or_else(|| file_stem.to_string()),
        subject: raw.subject,
        status: raw.status.unwrap_or(TaskStatus::Pending),
        created_at: raw
            .created_at
            .as_ref()
            .and_then(timestamp_from_value)
            .map(|dt| dt.timestamp_millis()),
        owner: raw.owner.filter(|o| !o.is_empty()),
        blocked_by: raw.blocked_by.iter().filter_map(id_string).collect(),
        extra: raw.extra,
    })
}

// =============================================================================
// Inbox file: <teams>/<team>/inboxes/<agent>.json
// =============================================================================

/// Both inbox shapes seen on disk.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawInbox {
    List(Vec<InboxMessage>),
    Wrapped {
        #[serde(default)]
        messages: Vec<InboxMessage>,
    },
}

impl From<RawInbox> for Vec<InboxMessage> {
    fn from(raw: RawInbox) -> Self {
        match raw {
            RawInbox::List(messages) | RawInbox::Wrapped { messages } => messages,
        }
    }
}

/// Parse an inbox file into its message list.
pub fn parse_inbox(content: &str) -> Result<Vec<InboxMessage>, TeamsError> {
    let raw: RawInbox = serde_json::from_str(content)?;
    Ok(raw.into())
}
