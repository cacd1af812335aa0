use std::path::{Path, PathBuf};

pub mod confine;

pub use confine::{NameKind, resolve_within, validate_name};

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("home directory not found — set $HOME environment variable")]
    HomeNotFound,

    #[error("invalid identifier '{value}': {reason}")]
    InvalidIdentifier { value: String, reason: &'static str },

    #[error("path escapes its root: {path}")]
    OutsideRoot { path: String },
}

/// Path construction for the `~/.claude/` layout written by agent processes.
///
/// Use `resolve()` in production code and `from_dir()` in tests.
#[derive(Debug, Clone)]
pub struct ClaudePaths {
    claude_dir: PathBuf,
}

impl ClaudePaths {
    /// Resolve paths from the user's home directory (`~/.claude`).
    pub fn resolve() -> Result<Self, PathError> {
        let home = dirs::home_dir().ok_or(PathError::HomeNotFound)?;
        Ok(Self {
            claude_dir: home.join(".claude"),
        })
    }

    /// Create paths from an explicit base directory. Use in tests.
    pub fn from_dir(claude_dir: PathBuf) -> Self {
        Self { claude_dir }
    }

    pub fn claude_dir(&self) -> &Path {
        &self.claude_dir
    }

    /// Team configs and inboxes: `~/.claude/teams/<team>/`.
    pub fn teams_dir(&self) -> PathBuf {
        self.claude_dir.join("teams")
    }

    /// Task files: `~/.claude/tasks/<team>/<id>.json`.
    pub fn tasks_dir(&self) -> PathBuf {
        self.claude_dir.join("tasks")
    }

    /// Session transcripts: `~/.claude/projects/<project>/<session>.jsonl`.
    pub fn projects_dir(&self) -> PathBuf {
        self.claude_dir.join("projects")
    }

    /// Default location of agent `.output` logs (`$TMPDIR/claude`).
    pub fn default_outputs_dir() -> PathBuf {
        std::env::temp_dir().join("claude")
    }
}

/// Path construction for crewview's own `~/.crewview/` directory.
#[derive(Debug, Clone)]
pub struct CrewviewPaths {
    crewview_dir: PathBuf,
}

impl CrewviewPaths {
    pub fn resolve() -> Result<Self, PathError> {
        let home = dirs::home_dir().ok_or(PathError::HomeNotFound)?;
        Ok(Self {
            crewview_dir: home.join(".crewview"),
        })
    }

    pub fn from_dir(crewview_dir: PathBuf) -> Self {
        Self { crewview_dir }
    }

    pub fn crewview_dir(&self) -> &Path {
        &self.crewview_dir
    }

    pub fn user_config(&self) -> PathBuf {
        self.crewview_dir.join("config.toml")
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.crewview_dir.join("archive")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claude() -> ClaudePaths {
        ClaudePaths::from_dir(PathBuf::from("/home/user/.claude"))
    }

    #[test]
    fn test_resolve_returns_ok_when_home_set() {
        // HOME is set in CI and dev environments
        let paths = ClaudePaths::resolve().unwrap();
        assert!(paths.claude_dir().to_string_lossy().contains(".claude"));
    }

    #[test]
    fn test_claude_layout() {
        assert_eq!(claude().teams_dir(), PathBuf::from("/home/user/.claude/teams"));
        assert_eq!(claude().tasks_dir(), PathBuf::from("/home/user/.claude/tasks"));
        assert_eq!(
            claude().projects_dir(),
            PathBuf::from("/home/user/.claude/projects")
        );
    }

    #[test]
    fn test_crewview_layout() {
        let paths = CrewviewPaths::from_dir(PathBuf::from("/home/user/.crewview"));
        assert_eq!(
            paths.user_config(),
            PathBuf::from("/home/user/.crewview/config.toml")
        );
        assert_eq!(
            paths.archive_dir(),
            PathBuf::from("/home/user/.crewview/archive")
        );
    }

    #[test]
    fn test_default_outputs_dir_under_tmp() {
        assert!(ClaudePaths::default_outputs_dir().ends_with("claude"));
    }
}
