//! Custom error types for the tracker service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Request-scoped error taxonomy for the tracker service.
///
/// Recoverable conditions (identifier collisions, unparseable redirect
/// templates) are handled where they occur and never reach this type.
#[derive(Error, Debug)]
pub enum TrackerError {
    /// Malformed caller input: bad mode, bad outcome kind, missing id
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Unresolvable link UID or session
    #[error("Not found: {0}")]
    NotFound(String),

    /// Entry refused because the project is not live
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Missing or invalid editor credential on an admin endpoint
    #[error("Unauthorized")]
    Unauthorized,

    /// Callback for a session that already holds a terminal status
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error
    #[error("Internal server error")]
    InternalServerError,
}

impl IntoResponse for TrackerError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            TrackerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            TrackerError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            TrackerError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            TrackerError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            TrackerError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            TrackerError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for tracker results
pub type TrackerResult<T> = Result<T, TrackerError>;
