//! Budget and auth signal handlers

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;

use super::{internal_error, ErrorResponse};
use crate::routes::AppState;

/// Daily budget response
#[derive(Debug, Serialize)]
pub struct BudgetResponse {
    pub count: i64,
    pub limit: i64,
    pub reset_date: NaiveDate,
}

/// GET /api/v1/budget
pub async fn budget(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BudgetResponse>, (StatusCode, Json<ErrorResponse>)> {
    let status = state.rate_limiter.status().await.map_err(internal_error)?;

    Ok(Json(BudgetResponse {
        count: status.count,
        limit: status.limit,
        reset_date: status.reset_date,
    }))
}

/// Auth signal response
#[derive(Debug, Serialize)]
pub struct AuthStatusResponse {
    pub needs_reauth: bool,
    pub reason: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// GET /api/v1/auth/status
pub async fn auth_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AuthStatusResponse>, (StatusCode, Json<ErrorResponse>)> {
    let status = state.auth_signal.status().await.map_err(internal_error)?;

    Ok(Json(AuthStatusResponse {
        needs_reauth: status.needs_reauth,
        reason: status.reason,
        updated_at: status.updated_at,
    }))
}

/// POST /api/v1/auth/clear
pub async fn clear_auth_signal(
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    state.auth_signal.clear().await.map_err(internal_error)?;
    Ok(StatusCode::NO_CONTENT)
}
