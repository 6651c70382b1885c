//! Follow-up processed-set repository

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Persisted set of (rule, candidate message) pairs the follow-up
/// engine has already acted on
#[derive(Clone)]
pub struct FollowUpLogRepository {
    pool: SqlitePool,
}

impl FollowUpLogRepository {
    /// Create a new follow-up log repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Whether the rule already processed this candidate
    pub async fn is_processed(
        &self,
        rule_id: Uuid,
        message_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM followup_log WHERE rule_id = $1 AND message_id = $2",
        )
        .bind(rule_id)
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }

    /// Mark a candidate as processed for a rule; idempotent
    pub async fn mark_processed(
        &self,
        rule_id: Uuid,
        message_id: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO followup_log (rule_id, message_id, processed_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(rule_id)
        .bind(message_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Number of candidates processed for a rule
    pub async fn count_for_rule(&self, rule_id: Uuid) -> Result<i64, sqlx::Error> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM followup_log WHERE rule_id = $1")
                .bind(rule_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count.0)
    }
}
