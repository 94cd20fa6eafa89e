use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::derivation::signals::Signal;

/// Failures raised by the progression core: catalog lookups, step transitions
/// and signal collection. None of these is fatal to the process.
#[derive(Debug, Error)]
pub enum ProgressionError {
    #[error("Stage {0} has no step flow")]
    StageNotFound(i16),

    #[error("Mentee {mentee_id} has not started stage {stage}")]
    RecordNotFound { mentee_id: Uuid, stage: i16 },

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Stage {stage} is already completed")]
    AlreadyCompleted { stage: i16 },

    #[error("Step '{step_id}' needs a value for '{field}' before it can advance")]
    MissingCollectedValue { step_id: String, field: String },

    #[error("Signal source '{signal}' failed: {reason}")]
    SignalSourceFailure { signal: Signal, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ProgressionError {
    /// True for the rejections a caller should answer by re-prompting the user.
    pub fn is_rejected_transition(&self) -> bool {
        matches!(
            self,
            ProgressionError::InvalidTransition(_)
                | ProgressionError::AlreadyCompleted { .. }
                | ProgressionError::MissingCollectedValue { .. }
        )
    }
}

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Forbidden")]
    Forbidden,

    #[error(transparent)]
    Progression(#[from] ProgressionError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Access denied".to_string(),
            ),
            AppError::Progression(e) => progression_status(e),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

fn progression_status(e: &ProgressionError) -> (StatusCode, &'static str, String) {
    match e {
        ProgressionError::StageNotFound(_) | ProgressionError::RecordNotFound { .. } => {
            (StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string())
        }
        ProgressionError::InvalidTransition(_) => {
            (StatusCode::CONFLICT, "INVALID_TRANSITION", e.to_string())
        }
        ProgressionError::AlreadyCompleted { .. } => {
            (StatusCode::CONFLICT, "ALREADY_COMPLETED", e.to_string())
        }
        ProgressionError::MissingCollectedValue { .. } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "MISSING_COLLECTED_VALUE",
            e.to_string(),
        ),
        ProgressionError::SignalSourceFailure { .. } => {
            tracing::error!("Signal source failure: {e}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "SIGNAL_SOURCE_FAILURE",
                e.to_string(),
            )
        }
        ProgressionError::Database(err) => {
            tracing::error!("Database error: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "A database error occurred".to_string(),
            )
        }
    }
}
