//! Domain types for agent team state.
//!
//! These are the shapes pushed to observers and returned by the read
//! endpoints. Raw serde types for on-disk files are in `parser.rs`.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Status of a task as written by the agent process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Deleted,
    #[serde(other)]
    Unknown,
}

/// A unit of work owned by a team. Read-only from our side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub subject: String,
    pub status: TaskStatus,
    /// Creation time in epoch milliseconds. `None` sorts first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default)]
    pub blocked_by: Vec<String>,
    /// Fields we don't model (description, activeForm, ...), passed through.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Task {
    /// Blocked is an overlay on pending, not a status of its own.
    pub fn is_blocked(&self) -> bool {
        self.status == TaskStatus::Pending && !self.blocked_by.is_empty()
    }
}

/// A member entry from a team config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamMember {
    pub name: String,
    pub role: String,
}

/// Fully re-read state of one team. Never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    /// Directory name under the teams root.
    pub name: String,
    /// The config file as written, kept opaque.
    pub config: Value,
    /// Sorted by creation time ascending.
    pub tasks: Vec<Task>,
    pub last_updated: String,
}

impl Team {
    /// Members listed in the config, in config order.
    pub fn members(&self) -> Vec<TeamMember> {
        let Some(list) = self.config.get("members").and_then(Value::as_array) else {
            return Vec::new();
        };
        list.iter()
            .map(|m| {
                let field = |key: &str| m.get(key).and_then(Value::as_str).filter(|s| !s.is_empty());
                TeamMember {
                    name: field("name").unwrap_or("unknown").to_string(),
                    role: field("role")
                        .or_else(|| field("agentType"))
                        .unwrap_or("member")
                        .to_string(),
                }
            })
            .collect()
    }

    pub fn member_count(&self) -> usize {
        self.config
            .get("members")
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }

    /// Creation time from the config's `createdAt`, if present and parseable.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.config.get("createdAt").and_then(timestamp_from_value)
    }

    pub fn completed_tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
    }
}

/// Interpret a JSON timestamp: epoch milliseconds or an RFC 3339 string.
pub fn timestamp_from_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    }
}

/// Summary counters over a set of teams.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamStats {
    pub total_teams: usize,
    pub total_agents: usize,
    pub total_tasks: usize,
    pub pending_tasks: usize,
    pub in_progress_tasks: usize,
    pub completed_tasks: usize,
    pub deleted_tasks: usize,
    pub blocked_tasks: usize,
}

/// A team as it appears in the history listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub name: String,
    pub config: Value,
    pub task_count: usize,
    /// Filesystem birth time of the team directory, when the platform has one.
    pub created: Option<String>,
    pub last_modified: Option<String>,
}

/// Tail of one agent `.output` log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentOutput {
    /// File stem, usually the task id.
    pub id: String,
    pub file_name: String,
    /// Last lines of the log joined with `\n`.
    pub content: String,
    pub line_count: usize,
    pub modified_at: Option<String>,
}

/// One message from an agent inbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub read: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Derived natural-language summary stored with an archive record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSummary {
    pub overview: String,
    pub created: String,
    pub members: Vec<String>,
    pub accomplishments: Vec<String>,
    pub duration: String,
}

/// Immutable capture of a team written when its config disappears.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveRecord {
    pub team_name: String,
    pub archived_at: String,
    pub summary: TeamSummary,
    pub raw_data: Team,
}

/// Listing entry for an archive record (without the raw snapshot).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveEntry {
    pub filename: String,
    pub team_name: String,
    pub archived_at: String,
    pub summary: TeamSummary,
}

/// One recorded agent session under a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    pub message_count: usize,
    pub first_prompt: Option<String>,
    pub last_modified: Option<String>,
}

/// A project directory and its recorded sessions, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: String,
    pub sessions: Vec<SessionSummary>,
    pub last_activity: Option<String>,
}
