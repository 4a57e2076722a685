use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("already reviewed")]
    AlreadyReviewed,

    /// Mirrored ledger halves disagree. Should never happen while all pair
    /// mutations go through the reconciler; surfaced loudly, never repaired.
    #[error("ledger inconsistency: {0}")]
    LedgerInconsistency(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::InvalidTransition(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::AlreadyReviewed => (StatusCode::CONFLICT, "already reviewed".to_string()),
            AppError::LedgerInconsistency(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, format!("ledger inconsistency: {msg}"))
            }
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
