//! Work item repository

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{CreateWorkItem, WorkItem};

/// Work item repository
#[derive(Clone)]
pub struct WorkItemRepository {
    pool: SqlitePool,
}

impl WorkItemRepository {
    /// Create a new work item repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Persist a new work item in `pending` status
    pub async fn create(&self, input: CreateWorkItem) -> Result<WorkItem, sqlx::Error> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let attachments =
            serde_json::to_value(&input.attachments).unwrap_or_else(|_| serde_json::json!([]));

        sqlx::query_as::<_, WorkItem>(
            r#"
            INSERT INTO work_items (
                id, kind, to_address, cc, bcc, subject, body, attachments,
                scheduled_for, recurrence, status,
                followup_rule_id, followup_origin_id, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'pending', $11, $12, $13, $13)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.kind.to_string())
        .bind(&input.to_address)
        .bind(&input.cc)
        .bind(&input.bcc)
        .bind(&input.subject)
        .bind(&input.body)
        .bind(&attachments)
        .bind(input.scheduled_for)
        .bind(&input.recurrence)
        .bind(input.followup_rule_id)
        .bind(&input.followup_origin_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await
    }

    /// Get a work item by id
    pub async fn get(&self, id: Uuid) -> Result<Option<WorkItem>, sqlx::Error> {
        sqlx::query_as::<_, WorkItem>("SELECT * FROM work_items WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// All work items, oldest schedule first
    pub async fn all(&self) -> Result<Vec<WorkItem>, sqlx::Error> {
        sqlx::query_as::<_, WorkItem>("SELECT * FROM work_items ORDER BY scheduled_for ASC")
            .fetch_all(&self.pool)
            .await
    }

    /// List items by status
    pub async fn list_by_status(&self, status: &str) -> Result<Vec<WorkItem>, sqlx::Error> {
        sqlx::query_as::<_, WorkItem>(
            "SELECT * FROM work_items WHERE status = $1 ORDER BY scheduled_for ASC",
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await
    }

    /// Items that must hold an armed trigger (pending or postponed);
    /// used to rebuild alarms after a restart
    pub async fn list_armable(&self) -> Result<Vec<WorkItem>, sqlx::Error> {
        sqlx::query_as::<_, WorkItem>(
            r#"
            SELECT * FROM work_items
            WHERE status IN ('pending', 'postponed')
            ORDER BY scheduled_for ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    /// Guarded transition into `firing`. Returns false when the item is
    /// not in a fireable status, which makes duplicate trigger
    /// deliveries no-ops.
    pub async fn mark_firing(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE work_items SET
                status = 'firing',
                updated_at = $1
            WHERE id = $2 AND status IN ('pending', 'postponed')
            "#,
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Mark a work item as sent
    pub async fn mark_sent(
        &self,
        id: Uuid,
        message_id: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<Option<WorkItem>, sqlx::Error> {
        sqlx::query_as::<_, WorkItem>(
            r#"
            UPDATE work_items SET
                status = 'sent',
                message_id = $1,
                sent_at = $2,
                last_error = NULL,
                error_code = NULL,
                updated_at = $2
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(message_id)
        .bind(sent_at)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Mark a work item as terminally errored
    pub async fn mark_error(
        &self,
        id: Uuid,
        error_code: &str,
        error: &str,
    ) -> Result<Option<WorkItem>, sqlx::Error> {
        sqlx::query_as::<_, WorkItem>(
            r#"
            UPDATE work_items SET
                status = 'error',
                error_code = $1,
                last_error = $2,
                updated_at = $3
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(error_code)
        .bind(error)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Postpone a work item to a later instant (budget denied)
    pub async fn mark_postponed(
        &self,
        id: Uuid,
        retry_at: DateTime<Utc>,
    ) -> Result<Option<WorkItem>, sqlx::Error> {
        sqlx::query_as::<_, WorkItem>(
            r#"
            UPDATE work_items SET
                status = 'postponed',
                scheduled_for = $1,
                updated_at = $2
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(retry_at)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Return a recurring item to `pending` at its next occurrence
    pub async fn reschedule(
        &self,
        id: Uuid,
        next_occurrence: DateTime<Utc>,
    ) -> Result<Option<WorkItem>, sqlx::Error> {
        sqlx::query_as::<_, WorkItem>(
            r#"
            UPDATE work_items SET
                status = 'pending',
                scheduled_for = $1,
                message_id = NULL,
                sent_at = NULL,
                updated_at = $2
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(next_occurrence)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Return items interrupted mid-attempt to `pending`; used once at
    /// startup before alarms are rebuilt
    pub async fn reset_firing(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE work_items SET
                status = 'pending',
                updated_at = $1
            WHERE status = 'firing'
            "#,
        )
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Remove a work item
    pub async fn remove(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM work_items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
