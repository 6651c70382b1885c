//! Sent message history repository

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{CreateSentMessage, SentMessageRecord};

/// Sent message history repository. Records are appended on successful
/// delivery and never deleted by this subsystem.
#[derive(Clone)]
pub struct SentMessageRepository {
    pool: SqlitePool,
}

impl SentMessageRepository {
    /// Create a new sent message repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append a history record
    pub async fn create(&self, input: CreateSentMessage) -> Result<SentMessageRecord, sqlx::Error> {
        let id = Uuid::new_v4();

        sqlx::query_as::<_, SentMessageRecord>(
            r#"
            INSERT INTO sent_messages (
                id, message_id, to_address, subject, body, sent_at,
                source_channel, is_follow_up, follow_up_origin_id,
                followup_rule_id, row_data, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.message_id)
        .bind(&input.to_address)
        .bind(&input.subject)
        .bind(&input.body)
        .bind(input.sent_at)
        .bind(input.source_channel.to_string())
        .bind(input.is_follow_up)
        .bind(&input.follow_up_origin_id)
        .bind(input.followup_rule_id)
        .bind(&input.row_data)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
    }

    /// Look up a record by the external mail API message id
    pub async fn get_by_message_id(
        &self,
        message_id: &str,
    ) -> Result<Option<SentMessageRecord>, sqlx::Error> {
        sqlx::query_as::<_, SentMessageRecord>(
            "SELECT * FROM sent_messages WHERE message_id = $1 ORDER BY sent_at DESC LIMIT 1",
        )
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Most recent records, newest first
    pub async fn list_recent(&self, limit: i64) -> Result<Vec<SentMessageRecord>, sqlx::Error> {
        sqlx::query_as::<_, SentMessageRecord>(
            "SELECT * FROM sent_messages ORDER BY sent_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    /// Most recent records for one source channel, newest first
    pub async fn list_by_channel(
        &self,
        channel: &str,
        limit: i64,
    ) -> Result<Vec<SentMessageRecord>, sqlx::Error> {
        sqlx::query_as::<_, SentMessageRecord>(
            r#"
            SELECT * FROM sent_messages
            WHERE source_channel = $1
            ORDER BY sent_at DESC
            LIMIT $2
            "#,
        )
        .bind(channel)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    /// Follow-up records whose origin is the given message
    pub async fn list_followups_for_origin(
        &self,
        origin_message_id: &str,
    ) -> Result<Vec<SentMessageRecord>, sqlx::Error> {
        sqlx::query_as::<_, SentMessageRecord>(
            r#"
            SELECT * FROM sent_messages
            WHERE is_follow_up = 1 AND follow_up_origin_id = $1
            ORDER BY sent_at ASC
            "#,
        )
        .bind(origin_message_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Record that the message has received a reply. Driven by the
    /// external reply-detection collaborator.
    pub async fn mark_replied(&self, message_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE sent_messages SET has_replied = 1 WHERE message_id = $1",
        )
        .bind(message_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Whether the message has a recorded reply; messages with no local
    /// record are treated as not replied
    pub async fn has_replied(&self, message_id: &str) -> Result<bool, sqlx::Error> {
        let row: Option<(bool,)> = sqlx::query_as(
            "SELECT has_replied FROM sent_messages WHERE message_id = $1 ORDER BY sent_at DESC LIMIT 1",
        )
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(replied,)| replied).unwrap_or(false))
    }
}
