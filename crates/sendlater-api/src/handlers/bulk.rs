//! Bulk send handlers

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use sendlater_core::{BulkOutcome, BulkTemplate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{internal_error, ErrorResponse};
use crate::routes::AppState;

/// Request body for a bulk send from an imported sheet
#[derive(Debug, Deserialize)]
pub struct BulkSendRequest {
    pub sheet_id: String,
    pub subject: String,
    #[serde(default)]
    pub body: String,
    pub cc: Option<String>,
    pub bcc: Option<String>,
}

/// Per-recipient result
#[derive(Debug, Serialize)]
pub struct BulkResultResponse {
    pub recipient: String,
    pub outcome: String,
    pub detail: Option<String>,
}

/// Bulk send report response
#[derive(Debug, Serialize)]
pub struct BulkReportResponse {
    pub sent: usize,
    pub failed: usize,
    pub skipped: usize,
    pub results: Vec<BulkResultResponse>,
}

/// POST /api/v1/bulk
pub async fn send_bulk(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BulkSendRequest>,
) -> Result<Json<BulkReportResponse>, (StatusCode, Json<ErrorResponse>)> {
    let template = BulkTemplate {
        subject: request.subject,
        body: request.body,
        cc: request.cc,
        bcc: request.bcc,
    };

    let report = state
        .bulk_sender
        .send_from_sheet(&request.sheet_id, &template)
        .await
        .map_err(internal_error)?;

    let results = report
        .results
        .iter()
        .map(|r| {
            let (outcome, detail) = match &r.outcome {
                BulkOutcome::Sent { message_id } => ("sent", Some(message_id.clone())),
                BulkOutcome::Failed { reason } => ("failed", Some(reason.clone())),
                BulkOutcome::BudgetExhausted => ("budget_exhausted", None),
            };
            BulkResultResponse {
                recipient: r.recipient.clone(),
                outcome: outcome.to_string(),
                detail,
            }
        })
        .collect();

    Ok(Json(BulkReportResponse {
        sent: report.sent(),
        failed: report.failed(),
        skipped: report.skipped(),
        results,
    }))
}
