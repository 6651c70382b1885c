//! Follow-up rule repository

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{CreateFollowUpRule, FollowUpRule};

/// Follow-up rule repository
#[derive(Clone)]
pub struct FollowUpRuleRepository {
    pool: SqlitePool,
}

impl FollowUpRuleRepository {
    /// Create a new rule repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new rule (enabled by default)
    pub async fn create(&self, input: CreateFollowUpRule) -> Result<FollowUpRule, sqlx::Error> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let (selector_kind, selector_value) = input.target_selector.to_columns();

        sqlx::query_as::<_, FollowUpRule>(
            r#"
            INSERT INTO followup_rules (
                id, enabled, timing_days, timing_hours, only_if_no_reply,
                selector_kind, selector_value, subject_template, body_template,
                auto_stop_on_reply, sequence_position, created_at, updated_at
            )
            VALUES ($1, 1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.timing_days)
        .bind(input.timing_hours)
        .bind(input.only_if_no_reply)
        .bind(selector_kind)
        .bind(&selector_value)
        .bind(&input.subject_template)
        .bind(&input.body_template)
        .bind(input.auto_stop_on_reply)
        .bind(input.sequence_position)
        .bind(now)
        .fetch_one(&self.pool)
        .await
    }

    /// Get a rule by id
    pub async fn get(&self, id: Uuid) -> Result<Option<FollowUpRule>, sqlx::Error> {
        sqlx::query_as::<_, FollowUpRule>("SELECT * FROM followup_rules WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// List all rules
    pub async fn list(&self) -> Result<Vec<FollowUpRule>, sqlx::Error> {
        sqlx::query_as::<_, FollowUpRule>(
            "SELECT * FROM followup_rules ORDER BY sequence_position ASC, created_at ASC",
        )
        .fetch_all(&self.pool)
        .await
    }

    /// List enabled rules in sweep order
    pub async fn list_enabled(&self) -> Result<Vec<FollowUpRule>, sqlx::Error> {
        sqlx::query_as::<_, FollowUpRule>(
            r#"
            SELECT * FROM followup_rules
            WHERE enabled = 1
            ORDER BY sequence_position ASC, created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    /// Flip a rule's enabled flag
    pub async fn toggle(&self, id: Uuid) -> Result<Option<FollowUpRule>, sqlx::Error> {
        sqlx::query_as::<_, FollowUpRule>(
            r#"
            UPDATE followup_rules SET
                enabled = NOT enabled,
                updated_at = $1
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Delete a rule
    pub async fn delete(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM followup_rules WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Bump the sent counter after a follow-up is delivered
    pub async fn increment_sent(&self, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE followup_rules SET
                sent_count = sent_count + 1,
                updated_at = $1
            WHERE id = $2
            "#,
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Bump the replied counter when a reply to a follow-up is recorded
    pub async fn increment_replied(&self, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE followup_rules SET
                replied_count = replied_count + 1,
                updated_at = $1
            WHERE id = $2
            "#,
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
