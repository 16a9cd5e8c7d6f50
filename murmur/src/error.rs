use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MurmurError {
    /// Social graph backend unreachable or answered with a non-success status.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Text generation returned nothing usable.
    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Database error: {0}")]
    Persistence(#[from] libsql::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid bootstrap settings. Fatal at startup only.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// A like/follow for the same (bot, target) pair was already recorded.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("LLM unavailable: {0}")]
    LlmUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl MurmurError {
    /// Whether the error came from an external collaborator rather than local state.
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            MurmurError::Transport(_)
                | MurmurError::Http(_)
                | MurmurError::Generation(_)
                | MurmurError::LlmUnavailable(_)
                | MurmurError::Embedding(_)
        )
    }
}

impl IntoResponse for MurmurError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            MurmurError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            MurmurError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            MurmurError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            MurmurError::LlmUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            _ => {
                tracing::error!(error = %self, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
            "code": status.as_u16()
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, MurmurError>;
