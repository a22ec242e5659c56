use crate::wheel::selection::{Event, Phase};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Plex error: {0}")]
    Plex(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Plex(msg) => {
                tracing::warn!("Plex error: {}", msg);
                (StatusCode::BAD_GATEWAY, msg)
            }
            AppError::Internal(ref e) => {
                tracing::error!("Internal error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Failures seen by the wheel client when talking to its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Server responded with status {0}")]
    Status(u16),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    /// Spinning needs at least one eligible item. Callers check
    /// `can_spin` first; reaching this is a bug in the caller.
    #[error("No eligible items to spin over")]
    NoEligibleItems,

    /// The wheel was configured to show zero candidates.
    #[error("Spins must show at least one candidate")]
    NoCandidateSlots,

    #[error("Cannot handle {event:?} while {phase:?}")]
    InvalidTransition { phase: Phase, event: Event },
}
