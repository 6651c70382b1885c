//! Scheduled email handlers

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use sendlater_storage::models::{Attachment, CreateWorkItem, WorkItem, WorkItemKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::{scheduler_error, ErrorResponse};
use crate::routes::AppState;

/// Request body for scheduling an email
#[derive(Debug, Deserialize)]
pub struct EnqueueRequest {
    pub to: String,
    pub cc: Option<String>,
    pub bcc: Option<String>,
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub scheduled_for: DateTime<Utc>,
    #[serde(default = "default_recurrence")]
    pub recurrence: String,
}

fn default_recurrence() -> String {
    "none".to_string()
}

/// Work item response
#[derive(Debug, Serialize)]
pub struct WorkItemResponse {
    pub id: Uuid,
    pub kind: String,
    pub to: String,
    pub cc: Option<String>,
    pub bcc: Option<String>,
    pub subject: String,
    pub body: String,
    pub scheduled_for: DateTime<Utc>,
    pub recurrence: String,
    pub status: String,
    pub last_error: Option<String>,
    pub error_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<WorkItem> for WorkItemResponse {
    fn from(item: WorkItem) -> Self {
        Self {
            id: item.id,
            kind: item.kind,
            to: item.to_address,
            cc: item.cc,
            bcc: item.bcc,
            subject: item.subject,
            body: item.body,
            scheduled_for: item.scheduled_for,
            recurrence: item.recurrence,
            status: item.status,
            last_error: item.last_error,
            error_code: item.error_code,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

/// POST /api/v1/scheduled
pub async fn enqueue(
    State(state): State<Arc<AppState>>,
    Json(request): Json<EnqueueRequest>,
) -> Result<(StatusCode, Json<WorkItemResponse>), (StatusCode, Json<ErrorResponse>)> {
    let input = CreateWorkItem {
        kind: WorkItemKind::ScheduledSend,
        to_address: request.to,
        cc: request.cc,
        bcc: request.bcc,
        subject: request.subject,
        body: request.body,
        attachments: request.attachments,
        scheduled_for: request.scheduled_for,
        recurrence: request.recurrence,
        followup_rule_id: None,
        followup_origin_id: None,
    };

    let item = state
        .scheduler
        .enqueue(input)
        .await
        .map_err(scheduler_error)?;

    Ok((StatusCode::CREATED, Json(item.into())))
}

/// GET /api/v1/scheduled
pub async fn list_pending(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<WorkItemResponse>>, (StatusCode, Json<ErrorResponse>)> {
    let items = state
        .scheduler
        .list_pending()
        .await
        .map_err(scheduler_error)?;

    Ok(Json(items.into_iter().map(Into::into).collect()))
}

/// DELETE /api/v1/scheduled/:id
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    let removed = state.scheduler.cancel(id).await.map_err(scheduler_error)?;

    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(scheduler_error(
            sendlater_core::SchedulerError::NotFound,
        ))
    }
}
