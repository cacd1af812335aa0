//! Snapshot reads of team configs, tasks and history.
//!
//! Every function here normalises missing or corrupt files to an empty or
//! `None` result. Only an invalid identifier is returned as an error.

use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, SecondsFormat, Utc};
use futures::future::join_all;
use serde_json::Value;

use crate::errors::TeamsError;
use crate::parser;
use crate::roots::DataRoots;
use crate::types::{HistoryEntry, Task, Team};

pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn system_time_rfc3339(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Read and parse a team's `config.json`.
///
/// Returns `Ok(None)` when the file is missing or malformed: a corrupt team
/// is treated as one that does not currently exist.
pub async fn read_team_config(roots: &DataRoots, team: &str) -> Result<Option<Value>, TeamsError> {
    let path = roots.team_config(team)?;
    let content = match tokio::fs::read_to_string(&path).await {
        Ok(c) => c,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    event = "teams.scanner.config_read_failed",
                    path = %path.display(),
                    error = %e
                );
            }
            return Ok(None);
        }
    };

    match parser::parse_team_config(&content) {
        Ok(config) => Ok(Some(config)),
        Err(e) => {
            tracing::warn!(
                event = "teams.scanner.config_parse_failed",
                path = %path.display(),
                error = %e
            );
            Ok(None)
        }
    }
}

async fn read_task_file(path: &Path) -> Option<Task> {
    let stem = path.file_stem()?.to_str()?.to_string();
    let content = match tokio::fs::read_to_string(path).await {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(
                event = "teams.scanner.task_read_failed",
                path = %path.display(),
                error = %e
            );
            return None;
        }
    };
    match parser::parse_task(&stem, &content) {
        Ok(task) => Some(task),
        Err(e) => {
            tracing::warn!(
                event = "teams.scanner.task_parse_failed",
                path = %path.display(),
                error = %e
            );
            None
        }
    }
}

/// Read every `*.json` task of a team, sorted by creation time ascending.
///
/// Files are read concurrently. A file that fails to read or parse is
/// logged and dropped; it never blocks the rest. Undated tasks sort first.
pub async fn read_tasks(roots: &DataRoots, team: &str) -> Result<Vec<Task>, TeamsError> {
    let dir = roots.team_tasks_dir(team)?;
    let mut entries = match tokio::fs::read_dir(&dir).await {
        Ok(e) => e,
        Err(e) => {
            tracing::debug!(
                event = "teams.scanner.tasks_dir_unreadable",
                path = %dir.display(),
                error = %e
            );
            return Ok(Vec::new());
        }
    };

    let mut paths = Vec::new();
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "json") {
                    paths.push(path);
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(
                    event = "teams.scanner.tasks_dir_iter_failed",
                    path = %dir.display(),
                    error = %e
                );
                break;
            }
        }
    }
    // Directory order is unspecified; fix it so equal timestamps sort stably.
    paths.sort();

    let mut tasks: Vec<Task> = join_all(paths.iter().map(|p| read_task_file(p)))
        .await
        .into_iter()
        .flatten()
        .collect();
    tasks.sort_by_key(|t| t.created_at.unwrap_or(0));
    Ok(tasks)
}

/// Read one team: config plus tasks. `Ok(None)` when the config is absent.
pub async fn read_team(roots: &DataRoots, team: &str) -> Result<Option<Team>, TeamsError> {
    let Some(config) = read_team_config(roots, team).await? else {
        return Ok(None);
    };
    let tasks = read_tasks(roots, team).await?;
    Ok(Some(Team {
        name: team.to_string(),
        config,
        tasks,
        last_updated: now_rfc3339(),
    }))
}

/// Names of the subdirectories of the teams root that pass validation.
async fn team_dir_names(roots: &DataRoots) -> Vec<(String, std::fs::Metadata)> {
    let mut entries = match tokio::fs::read_dir(&roots.teams).await {
        Ok(e) => e,
        Err(e) => {
            tracing::debug!(
                event = "teams.scanner.read_dir_failed",
                path = %roots.teams.display(),
                error = %e
            );
            return Vec::new();
        }
    };

    let mut names = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let Ok(metadata) = entry.metadata().await else {
            continue;
        };
        if !metadata.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if let Err(e) = crewview_paths::validate_name(&name, crewview_paths::NameKind::Identifier)
        {
            tracing::debug!(event = "teams.scanner.team_name_skipped", error = %e);
            continue;
        }
        names.push((name, metadata));
    }
    names.sort_by(|a, b| a.0.cmp(&b.0));
    names
}

/// All teams whose config currently parses, ordered by name.
///
/// A missing teams root yields an empty list.
pub async fn get_active_teams(roots: &DataRoots) -> Vec<Team> {
    let names = team_dir_names(roots).await;
    let reads = names.iter().map(|(name, _)| read_team(roots, name));

    join_all(reads)
        .await
        .into_iter()
        .filter_map(|result| match result {
            Ok(team) => team,
            Err(e) => {
                tracing::warn!(event = "teams.scanner.team_read_failed", error = %e);
                None
            }
        })
        .collect()
}

/// Teams with their directory birth/modify times, newest first.
pub async fn get_team_history(roots: &DataRoots) -> Vec<HistoryEntry> {
    let names = team_dir_names(roots).await;
    let mut history = Vec::new();

    for (name, metadata) in names {
        let Ok(Some(config)) = read_team_config(roots, &name).await else {
            continue;
        };
        let task_count = read_tasks(roots, &name).await.map_or(0, |t| t.len());
        history.push((
            metadata.modified().ok(),
            HistoryEntry {
                name,
                config,
                task_count,
                created: metadata.created().ok().map(system_time_rfc3339),
                last_modified: metadata.modified().ok().map(system_time_rfc3339),
            },
        ));
    }

    history.sort_by(|a, b| b.0.cmp(&a.0));
    history.into_iter().map(|(_, entry)| entry).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaskStatus;
    use std::fs;

    fn setup() -> (tempfile::TempDir, DataRoots) {
        let dir = tempfile::TempDir::new().unwrap();
        let roots = DataRoots::under(dir.path());
        (dir, roots)
    }

    fn write_config(roots: &DataRoots, team: &str, body: &str) {
        let team_dir = roots.teams.join(team);
        fs::create_dir_all(&team_dir).unwrap();
        fs::write(team_dir.join("config.json"), body).unwrap();
    }

    fn write_task(roots: &DataRoots, team: &str, file: &str, body: &str) {
        let dir = roots.tasks.join(team);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(file), body).unwrap();
    }

    #[tokio::test]
    async fn test_read_team_config_missing_is_none() {
        let (_dir, roots) = setup();
        assert!(read_team_config(&roots, "ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_team_config_corrupt_is_none() {
        let (_dir, roots) = setup();
        write_config(&roots, "bad", "not json");
        assert!(read_team_config(&roots, "bad").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_team_config_invalid_name_is_error() {
        let (_dir, roots) = setup();
        let err = read_team_config(&roots, "../etc").await.unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[tokio::test]
    async fn test_read_tasks_skips_corrupt_and_sorts() {
        let (_dir, roots) = setup();
        write_task(&roots, "alpha", "1.json", r#"{ "subject": "late", "createdAt": 3000 }"#);
        write_task(&roots, "alpha", "2.json", "{{{ corrupt");
        write_task(&roots, "alpha", "3.json", r#"{ "subject": "early", "createdAt": 1000 }"#);
        write_task(&roots, "alpha", "4.json", r#"{ "subject": "undated" }"#);
        write_task(&roots, "alpha", "notes.txt", "ignored");

        let tasks = read_tasks(&roots, "alpha").await.unwrap();
        let subjects: Vec<&str> = tasks.iter().map(|t| t.subject.as_str()).collect();
        assert_eq!(subjects, vec!["undated", "early", "late"]);
    }

    #[tokio::test]
    async fn test_read_tasks_missing_dir_is_empty() {
        let (_dir, roots) = setup();
        assert!(read_tasks(&roots, "alpha").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_active_teams() {
        let (_dir, roots) = setup();
        write_config(&roots, "team-beta", r#"{ "members": [] }"#);
        write_config(&roots, "team-alpha", r#"{ "members": [{ "name": "a" }] }"#);
        write_config(&roots, "broken", "nope");
        fs::create_dir_all(roots.teams.join("no-config")).unwrap();
        fs::write(roots.teams.join("stray.txt"), "hello").unwrap();
        write_task(&roots, "team-alpha", "1.json", r#"{ "subject": "s", "status": "completed" }"#);

        let teams = get_active_teams(&roots).await;
        let names: Vec<&str> = teams.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["team-alpha", "team-beta"]);
        assert_eq!(teams[0].tasks.len(), 1);
        assert_eq!(teams[0].tasks[0].status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn test_get_active_teams_missing_root() {
        let (_dir, roots) = setup();
        assert!(get_active_teams(&roots).await.is_empty());
    }

    #[tokio::test]
    async fn test_get_team_history_newest_first() {
        let (_dir, roots) = setup();
        write_config(&roots, "old", r#"{}"#);
        std::thread::sleep(std::time::Duration::from_millis(20));
        write_config(&roots, "new", r#"{}"#);
        // Touch the directory itself so its mtime is clearly newer.
        fs::write(roots.teams.join("new").join("marker"), "x").unwrap();

        let history = get_team_history(&roots).await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].name, "new");
        assert!(history[0].last_modified.is_some());
    }
}
