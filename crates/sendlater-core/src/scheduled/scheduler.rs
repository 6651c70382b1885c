//! Scheduler - owns the work store and drives the per-item state machine
//!
//! pending --(fire)--> firing --(budget denied)--> postponed (re-armed
//! for the next local midnight) --(sent, none)--> removed --(sent,
//! recurring)--> pending at the next occurrence --(auth/transient
//! failure)--> error, terminal until externally re-triggered.
//!
//! Budget is consumed before the transport call: a failed attempt still
//! counts against the day.

use chrono::{DateTime, Days, Local, LocalResult, NaiveTime, TimeZone, Utc};
use sendlater_common::types::{split_address_list, SourceChannel};
use sendlater_storage::db::DatabasePool;
use sendlater_storage::models::{CreateSentMessage, CreateWorkItem, WorkItem, WorkItemKind};
use sendlater_storage::repository::{
    FollowUpRuleRepository, SentMessageRepository, WorkItemRepository,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::rate_limiter::RateLimiter;
use super::recurrence::next_occurrence;
use super::trigger::TriggerSource;
use crate::delivery::{DeliveryExecutor, Outcome, OutgoingMessage};
use crate::mail::AuthSignal;

/// Reason codes recorded on terminally errored work items
pub mod error_codes {
    /// The mail API rejected our credentials; reauthentication needed
    pub const AUTH_REQUIRED: &str = "auth_required";
    /// Transient transport failure; not retried automatically
    pub const SEND_FAILED: &str = "send_failed";
}

/// Scheduler errors
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Work item not found")]
    NotFound,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Scheduler over the work store, budget, executor, and trigger source
pub struct Scheduler {
    work_items: WorkItemRepository,
    sent_messages: SentMessageRepository,
    rules: FollowUpRuleRepository,
    rate_limiter: Arc<RateLimiter>,
    executor: Arc<DeliveryExecutor>,
    triggers: Arc<TriggerSource>,
    auth_signal: Arc<AuthSignal>,
}

impl Scheduler {
    /// Create a new scheduler
    pub fn new(
        db: &DatabasePool,
        rate_limiter: Arc<RateLimiter>,
        executor: Arc<DeliveryExecutor>,
        triggers: Arc<TriggerSource>,
        auth_signal: Arc<AuthSignal>,
    ) -> Self {
        let pool = db.pool().clone();
        Self {
            work_items: WorkItemRepository::new(pool.clone()),
            sent_messages: SentMessageRepository::new(pool.clone()),
            rules: FollowUpRuleRepository::new(pool),
            rate_limiter,
            executor,
            triggers,
            auth_signal,
        }
    }

    /// Validate, persist, and arm a new work item. An instant already
    /// in the past fires as soon as possible.
    pub async fn enqueue(&self, input: CreateWorkItem) -> Result<WorkItem, SchedulerError> {
        if split_address_list(&input.to_address).is_empty() {
            return Err(SchedulerError::Validation(
                "Recipient is required".to_string(),
            ));
        }
        if input.subject.trim().is_empty() {
            return Err(SchedulerError::Validation(
                "Subject is required".to_string(),
            ));
        }

        let item = self.work_items.create(input).await?;
        self.triggers.arm(item.id, item.scheduled_for).await;

        info!(
            id = %item.id,
            kind = %item.kind,
            scheduled_for = %item.scheduled_for,
            "Work item enqueued"
        );

        Ok(item)
    }

    /// Disarm and remove a work item
    pub async fn cancel(&self, id: Uuid) -> Result<bool, SchedulerError> {
        self.triggers.disarm(id).await;
        let removed = self.work_items.remove(id).await?;
        if removed {
            info!(%id, "Work item cancelled");
        }
        Ok(removed)
    }

    /// Get a work item
    pub async fn get(&self, id: Uuid) -> Result<Option<WorkItem>, SchedulerError> {
        Ok(self.work_items.get(id).await?)
    }

    /// Items waiting on an armed trigger (pending and postponed)
    pub async fn list_pending(&self) -> Result<Vec<WorkItem>, SchedulerError> {
        Ok(self.work_items.list_armable().await?)
    }

    /// All items, including terminal error states kept for inspection
    pub async fn list_all(&self) -> Result<Vec<WorkItem>, SchedulerError> {
        Ok(self.work_items.all().await?)
    }

    /// Rebuild alarms from the store after a restart. Items caught
    /// mid-attempt by a crash are returned to `pending` first; delivery
    /// is at-least-once across crashes.
    pub async fn restore(&self) -> Result<usize, SchedulerError> {
        let recovered = self.work_items.reset_firing().await?;
        if recovered > 0 {
            warn!(count = recovered, "Recovered work items interrupted mid-attempt");
        }

        let items = self.work_items.list_armable().await?;
        for item in &items {
            self.triggers.arm(item.id, item.scheduled_for).await;
        }

        info!(count = items.len(), "Re-armed triggers from the work store");
        Ok(items.len())
    }

    /// React to a fired trigger. Idempotent under duplicate deliveries:
    /// unknown ids and items no longer in a fireable status are no-ops.
    pub async fn on_trigger_fired(&self, id: Uuid) -> Result<(), SchedulerError> {
        let Some(item) = self.work_items.get(id).await? else {
            debug!(%id, "Trigger fired for unknown work item, ignoring");
            return Ok(());
        };

        if !self.work_items.mark_firing(id).await? {
            debug!(%id, status = %item.status, "Work item not fireable, ignoring duplicate fire");
            return Ok(());
        }

        if !self.rate_limiter.try_consume().await? {
            let retry_at = next_local_midnight();
            self.work_items.mark_postponed(id, retry_at).await?;
            self.triggers.arm(id, retry_at).await;
            info!(%id, %retry_at, "Daily budget exhausted, work item postponed");
            return Ok(());
        }

        let message = resolve_message(&item);
        match self.executor.send(&message).await {
            Outcome::Sent { message_id } => {
                self.handle_sent(&item, &message_id).await?;
            }
            Outcome::AuthRequired { reason } => {
                self.auth_signal.raise(&reason).await?;
                self.work_items
                    .mark_error(id, error_codes::AUTH_REQUIRED, &reason)
                    .await?;
                warn!(%id, %reason, "Send blocked on reauthentication");
            }
            Outcome::TransientFailure { reason } => {
                if item.kind_enum() == Some(WorkItemKind::FollowupSend) {
                    // Dropped; the processed set keeps the rule from
                    // re-enqueueing this candidate every sweep
                    self.work_items.remove(id).await?;
                    warn!(%id, %reason, "Follow-up send failed, dropped");
                } else {
                    self.work_items
                        .mark_error(id, error_codes::SEND_FAILED, &reason)
                        .await?;
                    warn!(%id, %reason, "Send failed");
                }
            }
        }

        Ok(())
    }

    async fn handle_sent(&self, item: &WorkItem, message_id: &str) -> Result<(), SchedulerError> {
        let sent_at = Utc::now();
        let is_follow_up = item.kind_enum() == Some(WorkItemKind::FollowupSend);

        self.work_items.mark_sent(item.id, message_id, sent_at).await?;

        self.sent_messages
            .create(CreateSentMessage {
                message_id: Some(message_id.to_string()),
                to_address: item.to_address.clone(),
                subject: item.subject.clone(),
                body: item.body.clone(),
                sent_at,
                source_channel: if is_follow_up {
                    SourceChannel::Followup
                } else {
                    SourceChannel::Scheduled
                },
                is_follow_up,
                follow_up_origin_id: item.followup_origin_id.clone(),
                followup_rule_id: item.followup_rule_id,
                row_data: None,
            })
            .await?;

        if let Some(rule_id) = item.followup_rule_id {
            self.rules.increment_sent(rule_id).await?;
        }

        match next_occurrence(item.scheduled_for, item.recurrence_enum(), sent_at) {
            Some(next) => {
                self.work_items.reschedule(item.id, next).await?;
                self.triggers.arm(item.id, next).await;
                info!(id = %item.id, %next, %message_id, "Sent, recurring item re-armed");
            }
            None => {
                self.work_items.remove(item.id).await?;
                info!(id = %item.id, %message_id, "Sent");
            }
        }

        Ok(())
    }
}

/// Split the free-text recipient fields into the resolved message the
/// executor expects
fn resolve_message(item: &WorkItem) -> OutgoingMessage {
    OutgoingMessage {
        to: split_address_list(&item.to_address),
        cc: item.cc.as_deref().map(split_address_list).unwrap_or_default(),
        bcc: item.bcc.as_deref().map(split_address_list).unwrap_or_default(),
        subject: item.subject.clone(),
        body: item.body.clone(),
        attachments: item.attachments_vec(),
    }
}

/// Postpone target when the budget is exhausted
fn next_local_midnight() -> DateTime<Utc> {
    let today = Local::now().date_naive();
    let tomorrow = today.checked_add_days(Days::new(1)).unwrap_or(today);
    let midnight = tomorrow.and_time(NaiveTime::MIN);

    match midnight.and_local_timezone(Local) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        // Midnight falls in a DST gap; treat the naive instant as UTC
        LocalResult::None => Utc.from_utc_datetime(&midnight),
    }
}
