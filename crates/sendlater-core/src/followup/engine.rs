//! Follow-up rule engine
//!
//! On each periodic sweep, every enabled rule resolves its candidate
//! messages, filters them through the timing and reply gates, and
//! materializes immediate `followup_send` work items for the survivors.
//! A per-rule processed set caps each candidate at one attempt; one
//! rule's failure never aborts the sweep of the others.

use chrono::Utc;
use sendlater_storage::db::DatabasePool;
use sendlater_storage::models::{
    CreateFollowUpRule, CreateWorkItem, FollowUpRule, TargetSelector, WorkItemKind,
};
use sendlater_storage::repository::{
    FollowUpLogRepository, FollowUpRuleRepository, SentMessageRepository,
};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::template::{recipient_name_from, row_vars_from, TemplateContext, TemplateRenderer};
use crate::mail::MailHistory;
use crate::scheduled::{Scheduler, SchedulerError};

/// Provider query used when a rule targets all sent messages
const SENT_QUERY: &str = "in:sent";

/// Follow-up engine errors
#[derive(Error, Debug)]
pub enum FollowUpError {
    #[error("Rule not found")]
    NotFound,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Outcome of one sweep
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    pub rules_evaluated: usize,
    pub enqueued: usize,
    pub failed_rules: usize,
}

/// A prior sent message under evaluation
struct Candidate {
    id: String,
    to: String,
    subject: String,
    body: String,
    sent_at: chrono::DateTime<Utc>,
    is_follow_up: bool,
    row_vars: HashMap<String, String>,
}

/// Follow-up rule engine
pub struct FollowUpEngine {
    rules: FollowUpRuleRepository,
    sent_messages: SentMessageRepository,
    log: FollowUpLogRepository,
    history: Arc<dyn MailHistory>,
    scheduler: Arc<Scheduler>,
    renderer: TemplateRenderer,
    candidate_limit: usize,
}

impl FollowUpEngine {
    /// Create a new follow-up engine
    pub fn new(
        db: &DatabasePool,
        history: Arc<dyn MailHistory>,
        scheduler: Arc<Scheduler>,
        candidate_limit: usize,
    ) -> Self {
        let pool = db.pool().clone();
        Self {
            rules: FollowUpRuleRepository::new(pool.clone()),
            sent_messages: SentMessageRepository::new(pool.clone()),
            log: FollowUpLogRepository::new(pool),
            history,
            scheduler,
            renderer: TemplateRenderer::new(),
            candidate_limit,
        }
    }

    /// Create a rule
    pub async fn create_rule(
        &self,
        input: CreateFollowUpRule,
    ) -> Result<FollowUpRule, FollowUpError> {
        if input.timing_days < 0 || input.timing_hours < 0 {
            return Err(FollowUpError::Validation(
                "Timing must not be negative".to_string(),
            ));
        }
        if input.timing_days == 0 && input.timing_hours == 0 {
            return Err(FollowUpError::Validation(
                "Timing must be at least one hour".to_string(),
            ));
        }
        if input.subject_template.trim().is_empty() {
            return Err(FollowUpError::Validation(
                "Subject template is required".to_string(),
            ));
        }

        let rule = self.rules.create(input).await?;
        info!(id = %rule.id, "Follow-up rule created");
        Ok(rule)
    }

    /// Get a rule
    pub async fn get_rule(&self, id: Uuid) -> Result<Option<FollowUpRule>, FollowUpError> {
        Ok(self.rules.get(id).await?)
    }

    /// List all rules
    pub async fn list_rules(&self) -> Result<Vec<FollowUpRule>, FollowUpError> {
        Ok(self.rules.list().await?)
    }

    /// Flip a rule's enabled flag
    pub async fn toggle_rule(&self, id: Uuid) -> Result<FollowUpRule, FollowUpError> {
        let rule = self.rules.toggle(id).await?.ok_or(FollowUpError::NotFound)?;
        info!(id = %rule.id, enabled = rule.enabled, "Follow-up rule toggled");
        Ok(rule)
    }

    /// Delete a rule
    pub async fn delete_rule(&self, id: Uuid) -> Result<(), FollowUpError> {
        if !self.rules.delete(id).await? {
            return Err(FollowUpError::NotFound);
        }
        info!(%id, "Follow-up rule deleted");
        Ok(())
    }

    /// Record a reply to a sent message. Drives `has_replied` on the
    /// history record and credits the owning rule when the reply was to
    /// a message one of its follow-ups chased.
    pub async fn record_reply(&self, message_id: &str) -> Result<bool, FollowUpError> {
        let updated = self.sent_messages.mark_replied(message_id).await?;
        if !updated {
            return Ok(false);
        }

        for followup in self
            .sent_messages
            .list_followups_for_origin(message_id)
            .await?
        {
            if let Some(rule_id) = followup.followup_rule_id {
                self.rules.increment_replied(rule_id).await?;
            }
        }

        info!(%message_id, "Reply recorded");
        Ok(true)
    }

    /// Evaluate every enabled rule. Per-rule failures are isolated and
    /// reported, never propagated.
    pub async fn sweep(&self) -> Result<SweepReport, FollowUpError> {
        let rules = self.rules.list_enabled().await?;
        let mut report = SweepReport {
            rules_evaluated: rules.len(),
            ..Default::default()
        };

        for rule in rules {
            match self.evaluate_rule(&rule).await {
                Ok(enqueued) => report.enqueued += enqueued,
                Err(e) => {
                    report.failed_rules += 1;
                    warn!(rule_id = %rule.id, "Rule evaluation failed: {}", e);
                }
            }
        }

        info!(
            rules = report.rules_evaluated,
            enqueued = report.enqueued,
            failed = report.failed_rules,
            "Follow-up sweep finished"
        );

        Ok(report)
    }

    async fn evaluate_rule(&self, rule: &FollowUpRule) -> Result<usize, FollowUpError> {
        let candidates = self.resolve_candidates(rule).await?;
        let now = Utc::now();
        let mut enqueued = 0;

        for candidate in candidates {
            // Never chain follow-ups onto follow-ups
            if candidate.is_follow_up {
                continue;
            }
            if self.log.is_processed(rule.id, &candidate.id).await? {
                continue;
            }
            if now - candidate.sent_at < rule.timing() {
                continue;
            }

            // Reply state is re-read at evaluation time so a reply that
            // arrived between sweeps stops the follow-up
            let replied = self.sent_messages.has_replied(&candidate.id).await?;
            if (rule.only_if_no_reply || rule.auto_stop_on_reply) && replied {
                debug!(rule_id = %rule.id, candidate = %candidate.id, "Reply recorded, skipping");
                continue;
            }

            let ctx = TemplateContext {
                recipient_name: recipient_name_from(&candidate.to),
                original_subject: candidate.subject.clone(),
                original_message: candidate.body.clone(),
                row_vars: candidate.row_vars.clone(),
            };

            let input = CreateWorkItem {
                kind: WorkItemKind::FollowupSend,
                to_address: candidate.to.clone(),
                cc: None,
                bcc: None,
                subject: self.renderer.render(&rule.subject_template, &ctx),
                body: self.renderer.render(&rule.body_template, &ctx),
                attachments: vec![],
                scheduled_for: now,
                recurrence: "none".to_string(),
                followup_rule_id: Some(rule.id),
                followup_origin_id: Some(candidate.id.clone()),
            };

            let result = self.scheduler.enqueue(input).await;

            // Processed regardless of outcome, so a failed candidate is
            // not re-attempted on every subsequent tick
            self.log.mark_processed(rule.id, &candidate.id).await?;

            match result {
                Ok(item) => {
                    enqueued += 1;
                    debug!(rule_id = %rule.id, item_id = %item.id, "Follow-up enqueued");
                }
                Err(e) => {
                    warn!(rule_id = %rule.id, candidate = %candidate.id, "Failed to enqueue follow-up: {}", e);
                }
            }
        }

        Ok(enqueued)
    }

    async fn resolve_candidates(
        &self,
        rule: &FollowUpRule,
    ) -> Result<Vec<Candidate>, FollowUpError> {
        match rule.target_selector() {
            TargetSelector::Channel(channel) => {
                let records = self
                    .sent_messages
                    .list_by_channel(&channel.to_string(), self.candidate_limit as i64)
                    .await?;

                Ok(records
                    .into_iter()
                    .filter_map(|r| {
                        let id = r.message_id?;
                        Some(Candidate {
                            id,
                            to: r.to_address,
                            subject: r.subject,
                            body: r.body,
                            sent_at: r.sent_at,
                            is_follow_up: r.is_follow_up,
                            row_vars: row_vars_from(r.row_data.as_ref()),
                        })
                    })
                    .collect())
            }
            TargetSelector::All => self.from_history(SENT_QUERY).await,
            TargetSelector::Label(label) => {
                self.from_history(&format!("{} label:{}", SENT_QUERY, label))
                    .await
            }
            TargetSelector::Query(query) => self.from_history(&query).await,
        }
    }

    /// Resolve candidates through the history capability, enriched from
    /// the local sent log when the message is known there
    async fn from_history(&self, query: &str) -> Result<Vec<Candidate>, FollowUpError> {
        let entries = self.history.list_sent(query, self.candidate_limit).await?;
        let mut candidates = Vec::with_capacity(entries.len());

        for entry in entries {
            let local = self.sent_messages.get_by_message_id(&entry.id).await?;

            let candidate = match local {
                Some(record) => Candidate {
                    id: entry.id,
                    to: entry.to,
                    subject: entry.subject,
                    body: record.body,
                    sent_at: record.sent_at,
                    is_follow_up: record.is_follow_up,
                    row_vars: row_vars_from(record.row_data.as_ref()),
                },
                None => {
                    // The listing carries headers only; fetch the detail
                    // for the original message content
                    let body = match self.history.get_message(&entry.id).await {
                        Ok(Some(detail)) => detail.snippet,
                        Ok(None) => String::new(),
                        Err(e) => {
                            warn!(id = %entry.id, "Failed to fetch message detail: {}", e);
                            String::new()
                        }
                    };
                    Candidate {
                        id: entry.id,
                        to: entry.to,
                        subject: entry.subject,
                        body,
                        sent_at: entry.sent_at,
                        is_follow_up: false,
                        row_vars: HashMap::new(),
                    }
                }
            };

            candidates.push(candidate);
        }

        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::DeliveryExecutor;
    use crate::mail::{
        AuthSignal, HistoryEntry, MailTransport, MessageDetail, SendReceipt, TransportError,
    };
    use crate::scheduled::{RateLimiter, TriggerSource};
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use pretty_assertions::assert_eq;
    use sendlater_common::types::SourceChannel;
    use sendlater_storage::models::CreateSentMessage;
    use sendlater_storage::repository::{AuthStateRepository, BudgetRepository};
    use std::collections::VecDeque;
    use tokio::sync::Mutex;

    struct FakeTransport {
        outcomes: Mutex<VecDeque<Result<SendReceipt, TransportError>>>,
    }

    #[async_trait]
    impl MailTransport for FakeTransport {
        async fn send_raw(&self, _raw: &str) -> Result<SendReceipt, TransportError> {
            self.outcomes
                .lock()
                .await
                .pop_front()
                .unwrap_or(Ok(SendReceipt {
                    id: "m-out".to_string(),
                }))
        }
    }

    struct FakeHistory {
        entries: Vec<HistoryEntry>,
        details: HashMap<String, MessageDetail>,
        fail_query_containing: Option<String>,
    }

    #[async_trait]
    impl MailHistory for FakeHistory {
        async fn list_sent(&self, query: &str, _limit: usize) -> anyhow::Result<Vec<HistoryEntry>> {
            if let Some(needle) = &self.fail_query_containing {
                if query.contains(needle.as_str()) {
                    anyhow::bail!("history backend unavailable");
                }
            }
            Ok(self.entries.clone())
        }

        async fn get_message(&self, id: &str) -> anyhow::Result<Option<MessageDetail>> {
            Ok(self.details.get(id).cloned())
        }
    }

    struct Harness {
        db: DatabasePool,
        engine: FollowUpEngine,
        scheduler: Arc<Scheduler>,
        sent_messages: SentMessageRepository,
    }

    async fn harness(history: FakeHistory) -> Harness {
        let db = DatabasePool::in_memory().await.unwrap();
        let transport = Arc::new(FakeTransport {
            outcomes: Mutex::new(VecDeque::new()),
        });
        // The event receiver is dropped: these tests fire items by
        // calling the scheduler directly
        let (triggers, _events) = TriggerSource::new();
        let rate_limiter = Arc::new(RateLimiter::new(BudgetRepository::new(db.pool().clone())));
        let auth_signal = Arc::new(AuthSignal::new(AuthStateRepository::new(db.pool().clone())));

        let scheduler = Arc::new(Scheduler::new(
            &db,
            rate_limiter,
            Arc::new(DeliveryExecutor::new(transport)),
            Arc::new(triggers),
            auth_signal,
        ));

        let engine = FollowUpEngine::new(&db, Arc::new(history), scheduler.clone(), 25);
        let sent_messages = SentMessageRepository::new(db.pool().clone());

        Harness {
            db,
            engine,
            scheduler,
            sent_messages,
        }
    }

    fn entry(id: &str, to: &str, subject: &str, days_ago: i64) -> HistoryEntry {
        HistoryEntry {
            id: id.to_string(),
            to: to.to_string(),
            subject: subject.to_string(),
            sent_at: Utc::now() - ChronoDuration::days(days_ago),
        }
    }

    fn rule(days: i64) -> CreateFollowUpRule {
        CreateFollowUpRule {
            timing_days: days,
            timing_hours: 0,
            only_if_no_reply: true,
            target_selector: TargetSelector::All,
            subject_template: "Re: {{original_subject}}".to_string(),
            body_template: "Hi {{recipient_name}}, any thoughts on {{original_message}}?"
                .to_string(),
            auto_stop_on_reply: true,
            sequence_position: 1,
        }
    }

    #[tokio::test]
    async fn test_rule_validation() {
        let h = harness(FakeHistory {
            entries: vec![],
            details: HashMap::new(),
            fail_query_containing: None,
        })
        .await;

        let mut input = rule(0);
        let err = h.engine.create_rule(input.clone()).await.unwrap_err();
        assert!(matches!(err, FollowUpError::Validation(_)));

        input.timing_days = -1;
        let err = h.engine.create_rule(input.clone()).await.unwrap_err();
        assert!(matches!(err, FollowUpError::Validation(_)));

        input.timing_days = 3;
        input.subject_template = " ".to_string();
        let err = h.engine.create_rule(input).await.unwrap_err();
        assert!(matches!(err, FollowUpError::Validation(_)));
    }

    #[tokio::test]
    async fn test_sweep_enqueues_due_candidate() {
        let mut details = HashMap::new();
        details.insert(
            "m1".to_string(),
            MessageDetail {
                id: "m1".to_string(),
                to: "Ada <ada@x.com>".to_string(),
                subject: "Project kickoff".to_string(),
                snippet: "the proposal".to_string(),
                sent_at: Utc::now() - ChronoDuration::days(4),
            },
        );

        let h = harness(FakeHistory {
            entries: vec![entry("m1", "Ada <ada@x.com>", "Project kickoff", 4)],
            details,
            fail_query_containing: None,
        })
        .await;

        let rule = h.engine.create_rule(rule(3)).await.unwrap();
        let report = h.engine.sweep().await.unwrap();

        assert_eq!(report.rules_evaluated, 1);
        assert_eq!(report.enqueued, 1);
        assert_eq!(report.failed_rules, 0);

        let pending = h.scheduler.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        let item = &pending[0];
        assert_eq!(item.kind, "followup_send");
        assert_eq!(item.to_address, "Ada <ada@x.com>");
        assert_eq!(item.subject, "Re: Project kickoff");
        assert_eq!(item.body, "Hi Ada, any thoughts on the proposal?");
        assert_eq!(item.followup_rule_id, Some(rule.id));
        assert_eq!(item.followup_origin_id.as_deref(), Some("m1"));

        let log = FollowUpLogRepository::new(h.db.pool().clone());
        assert!(log.is_processed(rule.id, "m1").await.unwrap());
    }

    #[tokio::test]
    async fn test_sweep_dedups_across_sweeps() {
        let h = harness(FakeHistory {
            entries: vec![entry("m1", "ada@x.com", "Kickoff", 4)],
            details: HashMap::new(),
            fail_query_containing: None,
        })
        .await;

        h.engine.create_rule(rule(3)).await.unwrap();
        assert_eq!(h.engine.sweep().await.unwrap().enqueued, 1);
        assert_eq!(h.engine.sweep().await.unwrap().enqueued, 0);
        assert_eq!(h.scheduler.list_pending().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_not_due_candidate_stays_unprocessed() {
        let h = harness(FakeHistory {
            entries: vec![entry("m1", "ada@x.com", "Kickoff", 1)],
            details: HashMap::new(),
            fail_query_containing: None,
        })
        .await;

        let rule = h.engine.create_rule(rule(3)).await.unwrap();
        assert_eq!(h.engine.sweep().await.unwrap().enqueued, 0);

        // Not marked processed: a later sweep can still fire it once due
        let log = FollowUpLogRepository::new(h.db.pool().clone());
        assert!(!log.is_processed(rule.id, "m1").await.unwrap());
    }

    #[tokio::test]
    async fn test_auto_stop_on_reply_blocks_candidate() {
        let h = harness(FakeHistory {
            entries: vec![entry("m1", "ada@x.com", "Kickoff", 4)],
            details: HashMap::new(),
            fail_query_containing: None,
        })
        .await;

        h.sent_messages
            .create(CreateSentMessage {
                message_id: Some("m1".to_string()),
                to_address: "ada@x.com".to_string(),
                subject: "Kickoff".to_string(),
                body: "original".to_string(),
                sent_at: Utc::now() - ChronoDuration::days(4),
                source_channel: SourceChannel::Manual,
                is_follow_up: false,
                follow_up_origin_id: None,
                followup_rule_id: None,
                row_data: None,
            })
            .await
            .unwrap();
        h.sent_messages.mark_replied("m1").await.unwrap();

        let mut input = rule(3);
        input.only_if_no_reply = false;
        h.engine.create_rule(input).await.unwrap();

        assert_eq!(h.engine.sweep().await.unwrap().enqueued, 0);
        assert!(h.scheduler.list_pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reply_between_sweeps_never_double_fires() {
        let h = harness(FakeHistory {
            entries: vec![entry("m1", "ada@x.com", "Kickoff", 4)],
            details: HashMap::new(),
            fail_query_containing: None,
        })
        .await;

        h.sent_messages
            .create(CreateSentMessage {
                message_id: Some("m1".to_string()),
                to_address: "ada@x.com".to_string(),
                subject: "Kickoff".to_string(),
                body: "original".to_string(),
                sent_at: Utc::now() - ChronoDuration::days(4),
                source_channel: SourceChannel::Manual,
                is_follow_up: false,
                follow_up_origin_id: None,
                followup_rule_id: None,
                row_data: None,
            })
            .await
            .unwrap();

        h.engine.create_rule(rule(3)).await.unwrap();
        assert_eq!(h.engine.sweep().await.unwrap().enqueued, 1);

        h.sent_messages.mark_replied("m1").await.unwrap();
        assert_eq!(h.engine.sweep().await.unwrap().enqueued, 0);

        let followups: Vec<_> = h
            .scheduler
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .filter(|i| i.followup_origin_id.as_deref() == Some("m1"))
            .collect();
        assert_eq!(followups.len(), 1);
    }

    #[tokio::test]
    async fn test_replied_candidate_allowed_when_rules_permit() {
        let h = harness(FakeHistory {
            entries: vec![entry("m1", "ada@x.com", "Kickoff", 4)],
            details: HashMap::new(),
            fail_query_containing: None,
        })
        .await;

        h.sent_messages
            .create(CreateSentMessage {
                message_id: Some("m1".to_string()),
                to_address: "ada@x.com".to_string(),
                subject: "Kickoff".to_string(),
                body: "original".to_string(),
                sent_at: Utc::now() - ChronoDuration::days(4),
                source_channel: SourceChannel::Manual,
                is_follow_up: false,
                follow_up_origin_id: None,
                followup_rule_id: None,
                row_data: None,
            })
            .await
            .unwrap();
        h.sent_messages.mark_replied("m1").await.unwrap();

        let mut input = rule(3);
        input.only_if_no_reply = false;
        input.auto_stop_on_reply = false;
        h.engine.create_rule(input).await.unwrap();

        assert_eq!(h.engine.sweep().await.unwrap().enqueued, 1);
    }

    #[tokio::test]
    async fn test_rule_failure_is_isolated() {
        let h = harness(FakeHistory {
            entries: vec![entry("m1", "ada@x.com", "Kickoff", 4)],
            details: HashMap::new(),
            fail_query_containing: Some("boom".to_string()),
        })
        .await;

        let mut failing = rule(3);
        failing.target_selector = TargetSelector::Query("boom".to_string());
        h.engine.create_rule(failing).await.unwrap();
        h.engine.create_rule(rule(3)).await.unwrap();

        let report = h.engine.sweep().await.unwrap();
        assert_eq!(report.rules_evaluated, 2);
        assert_eq!(report.failed_rules, 1);
        assert_eq!(report.enqueued, 1);
    }

    #[tokio::test]
    async fn test_channel_selector_uses_local_history() {
        let h = harness(FakeHistory {
            entries: vec![],
            details: HashMap::new(),
            fail_query_containing: None,
        })
        .await;

        h.sent_messages
            .create(CreateSentMessage {
                message_id: Some("m9".to_string()),
                to_address: "ada@x.com".to_string(),
                subject: "Spring offer".to_string(),
                body: "bulk body".to_string(),
                sent_at: Utc::now() - ChronoDuration::days(5),
                source_channel: SourceChannel::Bulk,
                is_follow_up: false,
                follow_up_origin_id: None,
                followup_rule_id: None,
                row_data: Some(serde_json::json!({ "name": "Ada", "company": "Acme" })),
            })
            .await
            .unwrap();

        let mut input = rule(3);
        input.target_selector = TargetSelector::Channel(SourceChannel::Bulk);
        input.body_template = "Hello {{name}} at {{company}}".to_string();
        h.engine.create_rule(input).await.unwrap();

        assert_eq!(h.engine.sweep().await.unwrap().enqueued, 1);
        let pending = h.scheduler.list_pending().await.unwrap();
        assert_eq!(pending[0].body, "Hello Ada at Acme");
    }

    #[tokio::test]
    async fn test_followups_are_not_candidates() {
        let h = harness(FakeHistory {
            entries: vec![entry("m2", "ada@x.com", "Re: Kickoff", 4)],
            details: HashMap::new(),
            fail_query_containing: None,
        })
        .await;

        h.sent_messages
            .create(CreateSentMessage {
                message_id: Some("m2".to_string()),
                to_address: "ada@x.com".to_string(),
                subject: "Re: Kickoff".to_string(),
                body: "following up".to_string(),
                sent_at: Utc::now() - ChronoDuration::days(4),
                source_channel: SourceChannel::Followup,
                is_follow_up: true,
                follow_up_origin_id: Some("m1".to_string()),
                followup_rule_id: None,
                row_data: None,
            })
            .await
            .unwrap();

        h.engine.create_rule(rule(3)).await.unwrap();
        assert_eq!(h.engine.sweep().await.unwrap().enqueued, 0);
    }

    #[tokio::test]
    async fn test_sent_stats_bump_after_delivery() {
        let h = harness(FakeHistory {
            entries: vec![entry("m1", "ada@x.com", "Kickoff", 4)],
            details: HashMap::new(),
            fail_query_containing: None,
        })
        .await;

        let rule = h.engine.create_rule(rule(3)).await.unwrap();
        h.engine.sweep().await.unwrap();

        let pending = h.scheduler.list_pending().await.unwrap();
        h.scheduler.on_trigger_fired(pending[0].id).await.unwrap();

        let after = h.engine.get_rule(rule.id).await.unwrap().unwrap();
        assert_eq!(after.sent_count, 1);

        // The delivered follow-up is linked back to its origin
        let record = h
            .sent_messages
            .get_by_message_id("m-out")
            .await
            .unwrap()
            .unwrap();
        assert!(record.is_follow_up);
        assert_eq!(record.follow_up_origin_id.as_deref(), Some("m1"));
    }

    #[tokio::test]
    async fn test_record_reply_credits_rule() {
        let h = harness(FakeHistory {
            entries: vec![entry("m1", "ada@x.com", "Kickoff", 4)],
            details: HashMap::new(),
            fail_query_containing: None,
        })
        .await;

        h.sent_messages
            .create(CreateSentMessage {
                message_id: Some("m1".to_string()),
                to_address: "ada@x.com".to_string(),
                subject: "Kickoff".to_string(),
                body: "original".to_string(),
                sent_at: Utc::now() - ChronoDuration::days(4),
                source_channel: SourceChannel::Manual,
                is_follow_up: false,
                follow_up_origin_id: None,
                followup_rule_id: None,
                row_data: None,
            })
            .await
            .unwrap();

        let rule = h.engine.create_rule(rule(3)).await.unwrap();
        h.engine.sweep().await.unwrap();

        // Deliver the follow-up, then the original message gets a reply
        let pending = h.scheduler.list_pending().await.unwrap();
        h.scheduler.on_trigger_fired(pending[0].id).await.unwrap();

        assert!(h.engine.record_reply("m1").await.unwrap());
        assert!(!h.engine.record_reply("m-unknown").await.unwrap());

        let after = h.engine.get_rule(rule.id).await.unwrap().unwrap();
        assert_eq!(after.replied_count, 1);
        assert!(h.sent_messages.has_replied("m1").await.unwrap());
    }

    #[tokio::test]
    async fn test_toggle_and_delete_rule() {
        let h = harness(FakeHistory {
            entries: vec![entry("m1", "ada@x.com", "Kickoff", 4)],
            details: HashMap::new(),
            fail_query_containing: None,
        })
        .await;

        let rule = h.engine.create_rule(rule(3)).await.unwrap();
        assert!(rule.enabled);

        let toggled = h.engine.toggle_rule(rule.id).await.unwrap();
        assert!(!toggled.enabled);

        // Disabled rules are not swept
        let report = h.engine.sweep().await.unwrap();
        assert_eq!(report.rules_evaluated, 0);

        h.engine.delete_rule(rule.id).await.unwrap();
        assert!(matches!(
            h.engine.delete_rule(rule.id).await.unwrap_err(),
            FollowUpError::NotFound
        ));
    }
}
