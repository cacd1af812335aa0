//! Agent inbox reads: `<teams>/<team>/inboxes/<agent>.json`.

use std::collections::BTreeMap;
use std::path::Path;

use crate::errors::TeamsError;
use crate::parser;
use crate::roots::DataRoots;
use crate::types::InboxMessage;

async fn read_inbox_file(path: &Path) -> Option<Vec<InboxMessage>> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(c) => c,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    event = "teams.inbox.read_failed",
                    path = %path.display(),
                    error = %e
                );
            }
            return None;
        }
    };
    match parser::parse_inbox(&content) {
        Ok(messages) => Some(messages),
        Err(e) => {
            tracing::warn!(
                event = "teams.inbox.parse_failed",
                path = %path.display(),
                error = %e
            );
            None
        }
    }
}

/// All inboxes of a team keyed by agent name.
///
/// A team without an inbox directory yields an empty map.
pub async fn read_team_inboxes(
    roots: &DataRoots,
    team: &str,
) -> Result<BTreeMap<String, Vec<InboxMessage>>, TeamsError> {
    let dir = roots.inboxes_dir(team)?;
    let mut inboxes = BTreeMap::new();

    let mut entries = match tokio::fs::read_dir(&dir).await {
        Ok(e) => e,
        Err(_) => return Ok(inboxes),
    };

    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if path.extension().is_none_or(|ext| ext != "json") {
            continue;
        }
        let Some(agent) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
            continue;
        };
        if let Some(messages) = read_inbox_file(&path).await {
            inboxes.insert(agent, messages);
        }
    }

    Ok(inboxes)
}

/// One agent's inbox. `Ok(None)` when the inbox file is absent or unreadable.
pub async fn read_agent_inbox(
    roots: &DataRoots,
    team: &str,
    agent: &str,
) -> Result<Option<Vec<InboxMessage>>, TeamsError> {
    let path = roots.inbox_file(team, agent)?;
    Ok(read_inbox_file(&path).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn setup() -> (tempfile::TempDir, DataRoots) {
        let dir = tempfile::TempDir::new().unwrap();
        let roots = DataRoots::under(dir.path());
        let inboxes = roots.teams.join("alpha").join("inboxes");
        fs::create_dir_all(&inboxes).unwrap();
        fs::write(
            inboxes.join("lead.json"),
            r#"[{ "from": "dev", "text": "done" }]"#,
        )
        .unwrap();
        fs::write(
            inboxes.join("dev.json"),
            r#"{ "messages": [{ "from": "lead", "text": "go" }, { "from": "lead", "text": "faster" }] }"#,
        )
        .unwrap();
        fs::write(inboxes.join("broken.json"), "nope").unwrap();
        (dir, roots)
    }

    #[tokio::test]
    async fn test_read_team_inboxes_both_shapes() {
        let (_dir, roots) = setup();
        let inboxes = read_team_inboxes(&roots, "alpha").await.unwrap();
        assert_eq!(inboxes.len(), 2);
        assert_eq!(inboxes["lead"].len(), 1);
        assert_eq!(inboxes["dev"].len(), 2);
    }

    #[tokio::test]
    async fn test_read_agent_inbox() {
        let (_dir, roots) = setup();
        let messages = read_agent_inbox(&roots, "alpha", "dev").await.unwrap().unwrap();
        assert_eq!(messages[1].text.as_deref(), Some("faster"));
        assert!(read_agent_inbox(&roots, "alpha", "ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_team_inboxes_empty() {
        let (_dir, roots) = setup();
        assert!(read_team_inboxes(&roots, "beta").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_agent_name() {
        let (_dir, roots) = setup();
        let err = read_agent_inbox(&roots, "alpha", "../../config")
            .await
            .unwrap_err();
        assert!(err.is_invalid_input());
    }
}
