//! Database models

use chrono::{DateTime, NaiveDate, Utc};
use sendlater_common::types::SourceChannel;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Kind of deferred work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkItemKind {
    ScheduledSend,
    FollowupSend,
}

impl std::fmt::Display for WorkItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkItemKind::ScheduledSend => write!(f, "scheduled_send"),
            WorkItemKind::FollowupSend => write!(f, "followup_send"),
        }
    }
}

impl std::str::FromStr for WorkItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled_send" => Ok(WorkItemKind::ScheduledSend),
            "followup_send" => Ok(WorkItemKind::FollowupSend),
            _ => Err(format!("Invalid work item kind: {}", s)),
        }
    }
}

/// Work item status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkItemStatus {
    Pending,
    Firing,
    Sent,
    Error,
    Postponed,
}

impl std::fmt::Display for WorkItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkItemStatus::Pending => write!(f, "pending"),
            WorkItemStatus::Firing => write!(f, "firing"),
            WorkItemStatus::Sent => write!(f, "sent"),
            WorkItemStatus::Error => write!(f, "error"),
            WorkItemStatus::Postponed => write!(f, "postponed"),
        }
    }
}

impl std::str::FromStr for WorkItemStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(WorkItemStatus::Pending),
            "firing" => Ok(WorkItemStatus::Firing),
            "sent" => Ok(WorkItemStatus::Sent),
            "error" => Ok(WorkItemStatus::Error),
            "postponed" => Ok(WorkItemStatus::Postponed),
            _ => Err(format!("Invalid work item status: {}", s)),
        }
    }
}

/// Recurrence policy for scheduled sends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recurrence {
    None,
    Daily,
    Weekly,
    Monthly,
}

impl std::fmt::Display for Recurrence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Recurrence::None => write!(f, "none"),
            Recurrence::Daily => write!(f, "daily"),
            Recurrence::Weekly => write!(f, "weekly"),
            Recurrence::Monthly => write!(f, "monthly"),
        }
    }
}

impl std::str::FromStr for Recurrence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Recurrence::None),
            "daily" => Ok(Recurrence::Daily),
            "weekly" => Ok(Recurrence::Weekly),
            "monthly" => Ok(Recurrence::Monthly),
            _ => Err(format!("Invalid recurrence: {}", s)),
        }
    }
}

/// Attachment carried in a work item payload. Content is kept base64
/// encoded end to end; the wire payload embeds it verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub mime_type: String,
    pub size: usize,
    pub content_b64: String,
}

/// Work item model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: Uuid,
    pub kind: String,
    pub to_address: String,
    pub cc: Option<String>,
    pub bcc: Option<String>,
    pub subject: String,
    pub body: String,
    pub attachments: serde_json::Value,
    pub scheduled_for: DateTime<Utc>,
    pub recurrence: String,
    pub status: String,
    pub last_error: Option<String>,
    pub error_code: Option<String>,
    pub message_id: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub followup_rule_id: Option<Uuid>,
    pub followup_origin_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkItem {
    /// Get status enum
    pub fn status_enum(&self) -> Option<WorkItemStatus> {
        self.status.parse().ok()
    }

    /// Get kind enum
    pub fn kind_enum(&self) -> Option<WorkItemKind> {
        self.kind.parse().ok()
    }

    /// Get recurrence enum; unknown frequency tokens are treated as
    /// non-recurring
    pub fn recurrence_enum(&self) -> Recurrence {
        self.recurrence.parse().unwrap_or(Recurrence::None)
    }

    /// Get attachments as a vector
    pub fn attachments_vec(&self) -> Vec<Attachment> {
        serde_json::from_value(self.attachments.clone()).unwrap_or_default()
    }
}

/// Create work item input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWorkItem {
    pub kind: WorkItemKind,
    pub to_address: String,
    pub cc: Option<String>,
    pub bcc: Option<String>,
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub scheduled_for: DateTime<Utc>,
    #[serde(default = "default_recurrence")]
    pub recurrence: String,
    pub followup_rule_id: Option<Uuid>,
    pub followup_origin_id: Option<String>,
}

fn default_recurrence() -> String {
    "none".to_string()
}

/// Daily budget singleton row
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DailyBudget {
    pub id: i64,
    pub count: i64,
    pub reset_date: NaiveDate,
    pub limit_value: i64,
    pub updated_at: DateTime<Utc>,
}

/// Which prior sent messages a follow-up rule targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum TargetSelector {
    All,
    Channel(SourceChannel),
    Label(String),
    Query(String),
}

impl TargetSelector {
    /// Storage representation: (kind, value)
    pub fn to_columns(&self) -> (&'static str, Option<String>) {
        match self {
            TargetSelector::All => ("all", None),
            TargetSelector::Channel(c) => ("channel", Some(c.to_string())),
            TargetSelector::Label(l) => ("label", Some(l.clone())),
            TargetSelector::Query(q) => ("query", Some(q.clone())),
        }
    }

    /// Rebuild from storage columns; malformed rows fall back to All
    pub fn from_columns(kind: &str, value: Option<&str>) -> Self {
        match (kind, value) {
            ("channel", Some(v)) => v
                .parse()
                .map(TargetSelector::Channel)
                .unwrap_or(TargetSelector::All),
            ("label", Some(v)) => TargetSelector::Label(v.to_string()),
            ("query", Some(v)) => TargetSelector::Query(v.to_string()),
            _ => TargetSelector::All,
        }
    }
}

/// Follow-up rule model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct FollowUpRule {
    pub id: Uuid,
    pub enabled: bool,
    pub timing_days: i64,
    pub timing_hours: i64,
    pub only_if_no_reply: bool,
    pub selector_kind: String,
    pub selector_value: Option<String>,
    pub subject_template: String,
    pub body_template: String,
    pub auto_stop_on_reply: bool,
    pub sequence_position: i64,
    pub sent_count: i64,
    pub replied_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FollowUpRule {
    /// Get the target selector
    pub fn target_selector(&self) -> TargetSelector {
        TargetSelector::from_columns(&self.selector_kind, self.selector_value.as_deref())
    }

    /// Time that must elapse after the original send before the rule fires
    pub fn timing(&self) -> chrono::Duration {
        chrono::Duration::days(self.timing_days) + chrono::Duration::hours(self.timing_hours)
    }
}

/// Create follow-up rule input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFollowUpRule {
    pub timing_days: i64,
    #[serde(default)]
    pub timing_hours: i64,
    #[serde(default = "default_true")]
    pub only_if_no_reply: bool,
    #[serde(default = "default_selector")]
    pub target_selector: TargetSelector,
    pub subject_template: String,
    pub body_template: String,
    #[serde(default = "default_true")]
    pub auto_stop_on_reply: bool,
    #[serde(default = "default_sequence_position")]
    pub sequence_position: i64,
}

fn default_true() -> bool {
    true
}

fn default_selector() -> TargetSelector {
    TargetSelector::All
}

fn default_sequence_position() -> i64 {
    1
}

/// Sent message history record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SentMessageRecord {
    pub id: Uuid,
    pub message_id: Option<String>,
    pub to_address: String,
    pub subject: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
    pub source_channel: String,
    pub has_replied: bool,
    pub is_follow_up: bool,
    pub follow_up_origin_id: Option<String>,
    pub followup_rule_id: Option<Uuid>,
    pub row_data: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl SentMessageRecord {
    /// Get source channel enum
    pub fn source_channel_enum(&self) -> Option<SourceChannel> {
        self.source_channel.parse().ok()
    }
}

/// Create sent message input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSentMessage {
    pub message_id: Option<String>,
    pub to_address: String,
    pub subject: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
    pub source_channel: SourceChannel,
    #[serde(default)]
    pub is_follow_up: bool,
    pub follow_up_origin_id: Option<String>,
    pub followup_rule_id: Option<Uuid>,
    pub row_data: Option<serde_json::Value>,
}

/// Durable reauthentication signal singleton row
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AuthState {
    pub id: i64,
    pub needs_reauth: bool,
    pub reason: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in ["pending", "firing", "sent", "error", "postponed"] {
            let parsed: WorkItemStatus = status.parse().unwrap();
            assert_eq!(parsed.to_string(), status);
        }
        assert!("done".parse::<WorkItemStatus>().is_err());
    }

    #[test]
    fn test_unknown_recurrence_is_non_recurring() {
        let item = WorkItem {
            id: Uuid::new_v4(),
            kind: "scheduled_send".to_string(),
            to_address: "a@x.com".to_string(),
            cc: None,
            bcc: None,
            subject: "Hi".to_string(),
            body: "Test".to_string(),
            attachments: serde_json::json!([]),
            scheduled_for: Utc::now(),
            recurrence: "fortnightly".to_string(),
            status: "pending".to_string(),
            last_error: None,
            error_code: None,
            message_id: None,
            sent_at: None,
            followup_rule_id: None,
            followup_origin_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(item.recurrence_enum(), Recurrence::None);
    }

    #[test]
    fn test_target_selector_columns_roundtrip() {
        let cases = [
            TargetSelector::All,
            TargetSelector::Channel(SourceChannel::Bulk),
            TargetSelector::Label("clients".to_string()),
            TargetSelector::Query("to:someone@example.com".to_string()),
        ];
        for selector in cases {
            let (kind, value) = selector.to_columns();
            assert_eq!(TargetSelector::from_columns(kind, value.as_deref()), selector);
        }
    }
}
