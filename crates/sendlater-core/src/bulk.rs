//! Bulk sequential sends
//!
//! Many recipients from one template, sent one at a time with a
//! configurable inter-send delay. No retry semantics: a failed
//! recipient is recorded and the loop moves on. Shares the executor and
//! the daily budget with the scheduler; once the budget runs dry the
//! remaining recipients are skipped, since every further attempt that
//! day would be denied too.

use sendlater_storage::repository::SentMessageRepository;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::delivery::{DeliveryExecutor, Outcome, OutgoingMessage};
use crate::followup::{TemplateContext, TemplateRenderer};
use crate::mail::{AuthSignal, RowSource};
use crate::scheduled::RateLimiter;
use sendlater_common::types::{split_address_list, SourceChannel};

/// Row column holding the recipient address
const EMAIL_COLUMN: &str = "email";

/// Template applied to every row of a bulk send
#[derive(Debug, Clone)]
pub struct BulkTemplate {
    pub subject: String,
    pub body: String,
    pub cc: Option<String>,
    pub bcc: Option<String>,
}

/// Per-recipient outcome of a bulk send
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkOutcome {
    Sent { message_id: String },
    Failed { reason: String },
    BudgetExhausted,
}

/// One row's result
#[derive(Debug, Clone)]
pub struct BulkSendResult {
    pub recipient: String,
    pub outcome: BulkOutcome,
}

/// Full report of a bulk send
#[derive(Debug, Clone, Default)]
pub struct BulkReport {
    pub results: Vec<BulkSendResult>,
}

impl BulkReport {
    pub fn sent(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, BulkOutcome::Sent { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, BulkOutcome::Failed { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.outcome == BulkOutcome::BudgetExhausted)
            .count()
    }
}

/// Bulk sequential sender
pub struct BulkSender {
    executor: Arc<DeliveryExecutor>,
    rate_limiter: Arc<RateLimiter>,
    sent_messages: SentMessageRepository,
    row_source: Arc<dyn RowSource>,
    auth_signal: Arc<AuthSignal>,
    renderer: TemplateRenderer,
    inter_send_delay: Duration,
}

impl BulkSender {
    /// Create a new bulk sender
    pub fn new(
        executor: Arc<DeliveryExecutor>,
        rate_limiter: Arc<RateLimiter>,
        sent_messages: SentMessageRepository,
        row_source: Arc<dyn RowSource>,
        auth_signal: Arc<AuthSignal>,
        inter_send_delay: Duration,
    ) -> Self {
        Self {
            executor,
            rate_limiter,
            sent_messages,
            row_source,
            auth_signal,
            renderer: TemplateRenderer::new(),
            inter_send_delay,
        }
    }

    /// Fetch rows from an imported sheet and send to each
    pub async fn send_from_sheet(
        &self,
        sheet_id: &str,
        template: &BulkTemplate,
    ) -> anyhow::Result<BulkReport> {
        let rows = self.row_source.fetch_rows(sheet_id).await?;
        info!(sheet_id, rows = rows.len(), "Starting bulk send from sheet");
        self.send_rows(template, rows).await
    }

    /// Send the template to every row, sequentially
    pub async fn send_rows(
        &self,
        template: &BulkTemplate,
        rows: Vec<HashMap<String, String>>,
    ) -> anyhow::Result<BulkReport> {
        let mut report = BulkReport::default();
        let mut budget_exhausted = false;
        let total = rows.len();

        for (index, row) in rows.into_iter().enumerate() {
            let recipient = row
                .get(EMAIL_COLUMN)
                .map(|s| s.trim().to_string())
                .unwrap_or_default();

            if recipient.is_empty() {
                report.results.push(BulkSendResult {
                    recipient,
                    outcome: BulkOutcome::Failed {
                        reason: "missing recipient address".to_string(),
                    },
                });
                continue;
            }

            if budget_exhausted {
                report.results.push(BulkSendResult {
                    recipient,
                    outcome: BulkOutcome::BudgetExhausted,
                });
                continue;
            }

            if !self.rate_limiter.try_consume().await? {
                warn!(
                    remaining = total - index,
                    "Daily budget exhausted mid bulk send"
                );
                budget_exhausted = true;
                report.results.push(BulkSendResult {
                    recipient,
                    outcome: BulkOutcome::BudgetExhausted,
                });
                continue;
            }

            let ctx = TemplateContext::from_row(&recipient, &row);
            let subject = self.renderer.render(&template.subject, &ctx);
            let body = self.renderer.render(&template.body, &ctx);

            let message = OutgoingMessage {
                to: vec![recipient.clone()],
                cc: template
                    .cc
                    .as_deref()
                    .map(split_address_list)
                    .unwrap_or_default(),
                bcc: template
                    .bcc
                    .as_deref()
                    .map(split_address_list)
                    .unwrap_or_default(),
                subject: subject.clone(),
                body: body.clone(),
                attachments: vec![],
            };

            let outcome = match self.executor.send(&message).await {
                Outcome::Sent { message_id } => {
                    self.sent_messages
                        .create(sendlater_storage::models::CreateSentMessage {
                            message_id: Some(message_id.clone()),
                            to_address: recipient.clone(),
                            subject,
                            body,
                            sent_at: chrono::Utc::now(),
                            source_channel: SourceChannel::Bulk,
                            is_follow_up: false,
                            follow_up_origin_id: None,
                            followup_rule_id: None,
                            row_data: Some(json!(row)),
                        })
                        .await?;
                    BulkOutcome::Sent { message_id }
                }
                Outcome::AuthRequired { reason } => {
                    self.auth_signal.raise(&reason).await?;
                    warn!(%recipient, %reason, "Bulk send blocked on reauthentication");
                    BulkOutcome::Failed { reason }
                }
                Outcome::TransientFailure { reason } => {
                    warn!(%recipient, %reason, "Bulk send failed for recipient");
                    BulkOutcome::Failed { reason }
                }
            };

            report.results.push(BulkSendResult { recipient, outcome });

            if index + 1 < total && !self.inter_send_delay.is_zero() {
                tokio::time::sleep(self.inter_send_delay).await;
            }
        }

        info!(
            sent = report.sent(),
            failed = report.failed(),
            skipped = report.skipped(),
            "Bulk send finished"
        );

        Ok(report)
    }
}
