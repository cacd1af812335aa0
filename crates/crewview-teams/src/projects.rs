//! Session summaries from `<projects>/<project>/<session>.jsonl` transcripts.

use std::path::Path;
use std::time::SystemTime;

use serde_json::Value;

use crate::errors::TeamsError;
use crate::roots::DataRoots;
use crate::scanner::system_time_rfc3339;
use crate::types::{ProjectSummary, SessionSummary};

const PROMPT_PREVIEW_CHARS: usize = 120;

/// Text of a user entry: `message.content` as a string or as text blocks.
fn user_prompt(entry: &Value) -> Option<String> {
    if entry.get("type").and_then(Value::as_str) != Some("user") {
        return None;
    }
    let content = entry.get("message")?.get("content")?;
    let text = match content {
        Value::String(s) => s.clone(),
        Value::Array(blocks) => blocks
            .iter()
            .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|b| b.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(" "),
        _ => return None,
    };
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(text.chars().take(PROMPT_PREVIEW_CHARS).collect())
}

/// Summarise one transcript from its content.
pub fn summarize_session(id: &str, content: &str) -> SessionSummary {
    let mut message_count = 0;
    let mut first_prompt = None;

    for line in content.lines().filter(|l| !l.trim().is_empty()) {
        let Ok(entry) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        message_count += 1;
        if first_prompt.is_none() {
            first_prompt = user_prompt(&entry);
        }
    }

    SessionSummary {
        id: id.to_string(),
        message_count,
        first_prompt,
        last_modified: None,
    }
}

async fn summarize_project(id: &str, dir: &Path) -> Option<ProjectSummary> {
    let mut entries = tokio::fs::read_dir(dir).await.ok()?;
    let mut sessions: Vec<(Option<SystemTime>, SessionSummary)> = Vec::new();

    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if path.extension().is_none_or(|ext| ext != "jsonl") {
            continue;
        }
        let Some(session_id) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(
                    event = "teams.projects.session_read_failed",
                    path = %path.display(),
                    error = %e
                );
                continue;
            }
        };
        let modified = entry.metadata().await.ok().and_then(|m| m.modified().ok());
        let mut summary = summarize_session(session_id, &content);
        summary.last_modified = modified.map(system_time_rfc3339);
        sessions.push((modified, summary));
    }

    sessions.sort_by(|a, b| b.0.cmp(&a.0));
    let last_activity = sessions.first().and_then(|(_, s)| s.last_modified.clone());

    Some(ProjectSummary {
        id: id.to_string(),
        sessions: sessions.into_iter().map(|(_, s)| s).collect(),
        last_activity,
    })
}

/// Every project with its sessions, most recently active first.
pub async fn list_projects(roots: &DataRoots) -> Vec<ProjectSummary> {
    let mut entries = match tokio::fs::read_dir(&roots.projects).await {
        Ok(e) => e,
        Err(e) => {
            tracing::debug!(
                event = "teams.projects.read_dir_failed",
                path = %roots.projects.display(),
                error = %e
            );
            return Vec::new();
        }
    };

    let mut projects = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        let Ok(dir) = roots.project_dir(&name) else {
            continue;
        };
        if !entry.metadata().await.is_ok_and(|m| m.is_dir()) {
            continue;
        }
        if let Some(project) = summarize_project(&name, &dir).await {
            projects.push(project);
        }
    }

    // RFC 3339 strings in UTC compare chronologically.
    projects.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
    projects
}

/// One project's sessions. `Ok(None)` when the project directory is absent.
pub async fn read_project(
    roots: &DataRoots,
    project: &str,
) -> Result<Option<ProjectSummary>, TeamsError> {
    let dir = roots.project_dir(project)?;
    Ok(summarize_project(project, &dir).await)
}
