//! Archival of a team's final state when its config disappears.
//!
//! Records are written once as `{team}_{timestamp}.json` and never
//! rewritten or deleted here.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, SecondsFormat, Utc};
use tokio::io::AsyncWriteExt;

use crate::errors::TeamsError;
use crate::roots::DataRoots;
use crate::types::{ArchiveEntry, ArchiveRecord, Team, TeamSummary};

/// Completed tasks listed in a summary.
pub const MAX_ACCOMPLISHMENTS: usize = 10;

/// Build the human-readable summary stored with an archive record.
pub fn generate_team_summary(team: &Team, now: DateTime<Utc>) -> TeamSummary {
    let completed: Vec<_> = team.completed_tasks().collect();

    let overview = format!(
        "Team \"{}\" with {} members worked on {} tasks and completed {}.",
        team.name,
        team.member_count(),
        team.tasks.len(),
        completed.len()
    );

    let created_at = team.created_at();
    let created = created_at
        .map(|dt| {
            dt.with_timezone(&Local)
                .format("%-m/%-d/%Y, %-I:%M:%S %p")
                .to_string()
        })
        .unwrap_or_else(|| "Unknown".to_string());

    let members = team
        .members()
        .into_iter()
        .map(|m| format!("{} ({})", m.name, m.role))
        .collect();

    let accomplishments = completed
        .iter()
        .take(MAX_ACCOMPLISHMENTS)
        .map(|t| format!("✅ {}", t.subject))
        .collect();

    let duration = match created_at {
        Some(start) => {
            let minutes = ((now - start).num_milliseconds() as f64 / 60_000.0).round() as i64;
            format!("Active for {minutes} minutes")
        }
        None => "Unknown duration".to_string(),
    };

    TeamSummary {
        overview,
        created,
        members,
        accomplishments,
        duration,
    }
}

/// `{team}_{ISO-8601}.json` with colons replaced so the name is filesystem-safe.
pub fn archive_file_name(team: &str, at: DateTime<Utc>) -> String {
    let stamp = at
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace(':', "-");
    format!("{team}_{stamp}.json")
}

/// Write an archive record for `team`. Fails rather than overwrite.
pub async fn write_archive(
    roots: &DataRoots,
    team: &Team,
    now: DateTime<Utc>,
) -> Result<PathBuf, TeamsError> {
    tokio::fs::create_dir_all(&roots.archive).await?;

    let filename = archive_file_name(&team.name, now);
    let path = roots.archive_file(&filename)?;

    let record = ArchiveRecord {
        team_name: team.name.clone(),
        archived_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        summary: generate_team_summary(team, now),
        raw_data: team.clone(),
    };
    let body = serde_json::to_vec_pretty(&record)?;

    let mut file = match tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .await
    {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            return Err(TeamsError::ArchiveExists(filename));
        }
        Err(e) => return Err(e.into()),
    };
    file.write_all(&body).await?;
    file.flush().await?;

    tracing::info!(
        event = "teams.archive.written",
        team = %team.name,
        path = %path.display(),
        tasks = team.tasks.len()
    );
    Ok(path)
}

async fn read_record(path: &Path) -> Result<ArchiveRecord, TeamsError> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

/// List archive records newest first. Corrupt files are logged and skipped.
pub async fn list_archives(roots: &DataRoots) -> Vec<ArchiveEntry> {
    let mut entries = match tokio::fs::read_dir(&roots.archive).await {
        Ok(e) => e,
        Err(e) => {
            tracing::debug!(
                event = "teams.archive.read_dir_failed",
                path = %roots.archive.display(),
                error = %e
            );
            return Vec::new();
        }
    };

    let mut listing = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if path.extension().is_none_or(|ext| ext != "json") {
            continue;
        }
        let Some(filename) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        match read_record(&path).await {
            Ok(record) => listing.push(ArchiveEntry {
                filename,
                team_name: record.team_name,
                archived_at: record.archived_at,
                summary: record.summary,
            }),
            Err(e) => {
                tracing::warn!(
                    event = "teams.archive.parse_failed",
                    path = %path.display(),
                    error = %e
                );
            }
        }
    }

    listing.sort_by(|a, b| b.archived_at.cmp(&a.archived_at));
    listing
}

/// Fetch one record by exact filename. `Ok(None)` if missing or unreadable.
pub async fn read_archive(
    roots: &DataRoots,
    filename: &str,
) -> Result<Option<ArchiveRecord>, TeamsError> {
    let path = roots.archive_file(filename)?;
    match read_record(&path).await {
        Ok(record) => Ok(Some(record)),
        Err(TeamsError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => {
            tracing::warn!(
                event = "teams.archive.read_failed",
                path = %path.display(),
                error = %e
            );
            Ok(None)
        }
    }
}
