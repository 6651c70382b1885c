//! Request handlers

pub mod bulk;
pub mod health;
pub mod rules;
pub mod scheduled;
pub mod status;

use axum::http::StatusCode;
use axum::Json;
use sendlater_core::{FollowUpError, SchedulerError};
use serde::Serialize;

/// Error response body
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Map a scheduler error onto a response
pub fn scheduler_error(e: SchedulerError) -> (StatusCode, Json<ErrorResponse>) {
    let (status, code) = match &e {
        SchedulerError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        SchedulerError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
        SchedulerError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
        SchedulerError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    };

    (
        status,
        Json(ErrorResponse {
            error: code.to_string(),
            message: e.to_string(),
        }),
    )
}

/// Map a follow-up engine error onto a response
pub fn followup_error(e: FollowUpError) -> (StatusCode, Json<ErrorResponse>) {
    let (status, code) = match &e {
        FollowUpError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        FollowUpError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
        FollowUpError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
        FollowUpError::Scheduler(_) | FollowUpError::Other(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
        }
    };

    (
        status,
        Json(ErrorResponse {
            error: code.to_string(),
            message: e.to_string(),
        }),
    )
}

/// Map an internal error onto a response
pub fn internal_error(e: anyhow::Error) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "INTERNAL_ERROR".to_string(),
            message: e.to_string(),
        }),
    )
}
