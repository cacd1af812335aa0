//! Error types for crewview-teams.

use crewview_paths::PathError;

#[derive(Debug, thiserror::Error)]
pub enum TeamsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid identifier '{value}': {reason}")]
    InvalidIdentifier { value: String, reason: String },

    #[error("archive already exists: {0}")]
    ArchiveExists(String),

    #[error("watcher error: {0}")]
    Watch(#[from] notify::Error),
}

impl From<PathError> for TeamsError {
    fn from(e: PathError) -> Self {
        match e {
            PathError::InvalidIdentifier { value, reason } => TeamsError::InvalidIdentifier {
                value,
                reason: reason.to_string(),
            },
            PathError::OutsideRoot { path } => TeamsError::InvalidIdentifier {
                value: path,
                reason: "resolves outside its root".to_string(),
            },
            PathError::HomeNotFound => {
                TeamsError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, e.to_string()))
            }
        }
    }
}

impl TeamsError {
    /// Whether this error was caused by caller-supplied input.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, TeamsError::InvalidIdentifier { .. })
    }
}
