use std::io;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use crewview_teams::TeamsError;

/// All error types for the crewview-server crate.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid config: {0}")]
    ConfigInvalid(String),

    #[error("cannot bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        source: io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("teams error: {0}")]
    Teams(TeamsError),
}

impl From<TeamsError> for ServerError {
    fn from(e: TeamsError) -> Self {
        if e.is_invalid_input() {
            ServerError::InvalidInput(e.to_string())
        } else {
            ServerError::Teams(e)
        }
    }
}

impl ServerError {
    /// Stable error code string for API bodies.
    pub fn error_code(&self) -> &'static str {
        match self {
            ServerError::InvalidInput(_) => "invalid_input",
            ServerError::NotFound(_) => "not_found",
            ServerError::ConfigInvalid(_) => "config_invalid",
            ServerError::Bind { .. } => "bind_failed",
            ServerError::Io(_) => "io_error",
            ServerError::Serde(_) => "serialization_error",
            ServerError::Teams(_) => "teams_error",
        }
    }

    /// Whether this error is caused by user input.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            ServerError::InvalidInput(_) | ServerError::NotFound(_) | ServerError::ConfigInvalid(_)
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(event = "server.api.request_failed", code = self.error_code(), error = %self);
        } else {
            tracing::debug!(event = "server.api.request_rejected", code = self.error_code(), error = %self);
        }
        let body = serde_json::json!({
            "error": self.to_string(),
            "code": self.error_code(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ServerError::NotFound("team 'alpha'".to_string());
        assert_eq!(err.to_string(), "not found: team 'alpha'");
        assert_eq!(err.error_code(), "not_found");
        assert!(err.is_user_error());
    }

    #[test]
    fn test_error_codes_and_status() {
        let cases: Vec<(ServerError, &str, StatusCode)> = vec![
            (
                ServerError::InvalidInput("x".to_string()),
                "invalid_input",
                StatusCode::BAD_REQUEST,
            ),
            (
                ServerError::NotFound("x".to_string()),
                "not_found",
                StatusCode::NOT_FOUND,
            ),
            (
                ServerError::ConfigInvalid("x".to_string()),
                "config_invalid",
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ServerError::Io(io::Error::other("disk")),
                "io_error",
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, code, status) in cases {
            assert_eq!(err.error_code(), code);
            assert_eq!(err.status_code(), status);
        }
    }

    #[test]
    fn test_invalid_identifier_maps_to_bad_request() {
        let teams_err = TeamsError::InvalidIdentifier {
            value: "../x".to_string(),
            reason: "contains '..'".to_string(),
        };
        let err: ServerError = teams_err.into();
        assert_eq!(err.error_code(), "invalid_input");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.is_user_error());
    }

    #[test]
    fn test_other_teams_errors_are_internal() {
        let teams_err = TeamsError::ArchiveExists("a.json".to_string());
        let err: ServerError = teams_err.into();
        assert_eq!(err.error_code(), "teams_error");
        assert!(!err.is_user_error());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: ServerError = io_err.into();
        assert_eq!(err.error_code(), "io_error");
        assert!(!err.is_user_error());
    }
}
