//! Follow-up rule handlers

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use sendlater_storage::models::{CreateFollowUpRule, FollowUpRule, TargetSelector};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::{followup_error, ErrorResponse};
use crate::routes::AppState;

/// Request body for creating a rule
#[derive(Debug, Deserialize)]
pub struct CreateRuleRequest {
    pub timing_days: i64,
    #[serde(default)]
    pub timing_hours: i64,
    #[serde(default = "default_true")]
    pub only_if_no_reply: bool,
    #[serde(default = "default_selector")]
    pub target_selector: TargetSelector,
    pub subject_template: String,
    #[serde(default)]
    pub body_template: String,
    #[serde(default = "default_true")]
    pub auto_stop_on_reply: bool,
    #[serde(default = "default_position")]
    pub sequence_position: i64,
}

fn default_true() -> bool {
    true
}

fn default_selector() -> TargetSelector {
    TargetSelector::All
}

fn default_position() -> i64 {
    1
}

/// Rule response
#[derive(Debug, Serialize)]
pub struct RuleResponse {
    pub id: Uuid,
    pub enabled: bool,
    pub timing_days: i64,
    pub timing_hours: i64,
    pub only_if_no_reply: bool,
    pub target_selector: TargetSelector,
    pub subject_template: String,
    pub body_template: String,
    pub auto_stop_on_reply: bool,
    pub sequence_position: i64,
    pub sent_count: i64,
    pub replied_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<FollowUpRule> for RuleResponse {
    fn from(rule: FollowUpRule) -> Self {
        let target_selector = rule.target_selector();
        Self {
            id: rule.id,
            enabled: rule.enabled,
            timing_days: rule.timing_days,
            timing_hours: rule.timing_hours,
            only_if_no_reply: rule.only_if_no_reply,
            target_selector,
            subject_template: rule.subject_template,
            body_template: rule.body_template,
            auto_stop_on_reply: rule.auto_stop_on_reply,
            sequence_position: rule.sequence_position,
            sent_count: rule.sent_count,
            replied_count: rule.replied_count,
            created_at: rule.created_at,
            updated_at: rule.updated_at,
        }
    }
}

/// POST /api/v1/rules
pub async fn create_rule(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateRuleRequest>,
) -> Result<(StatusCode, Json<RuleResponse>), (StatusCode, Json<ErrorResponse>)> {
    let input = CreateFollowUpRule {
        timing_days: request.timing_days,
        timing_hours: request.timing_hours,
        only_if_no_reply: request.only_if_no_reply,
        target_selector: request.target_selector,
        subject_template: request.subject_template,
        body_template: request.body_template,
        auto_stop_on_reply: request.auto_stop_on_reply,
        sequence_position: request.sequence_position,
    };

    let rule = state
        .engine
        .create_rule(input)
        .await
        .map_err(followup_error)?;

    Ok((StatusCode::CREATED, Json(rule.into())))
}

/// GET /api/v1/rules
pub async fn list_rules(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<RuleResponse>>, (StatusCode, Json<ErrorResponse>)> {
    let rules = state.engine.list_rules().await.map_err(followup_error)?;
    Ok(Json(rules.into_iter().map(Into::into).collect()))
}

/// POST /api/v1/rules/:id/toggle
pub async fn toggle_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<RuleResponse>, (StatusCode, Json<ErrorResponse>)> {
    let rule = state
        .engine
        .toggle_rule(id)
        .await
        .map_err(followup_error)?;

    Ok(Json(rule.into()))
}

/// DELETE /api/v1/rules/:id
pub async fn delete_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    state
        .engine
        .delete_rule(id)
        .await
        .map_err(followup_error)?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/history/:message_id/replied
pub async fn record_reply(
    State(state): State<Arc<AppState>>,
    Path(message_id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    let updated = state
        .engine
        .record_reply(&message_id)
        .await
        .map_err(followup_error)?;

    if updated {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(followup_error(sendlater_core::FollowUpError::NotFound))
    }
}
