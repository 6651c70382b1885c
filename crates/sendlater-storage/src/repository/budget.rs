//! Daily budget repository

use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;

use crate::models::DailyBudget;

/// Repository for the singleton daily budget row
#[derive(Clone)]
pub struct BudgetRepository {
    pool: SqlitePool,
}

impl BudgetRepository {
    /// Create a new budget repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Read the budget row
    pub async fn get(&self) -> Result<DailyBudget, sqlx::Error> {
        sqlx::query_as::<_, DailyBudget>("SELECT * FROM daily_budget WHERE id = 1")
            .fetch_one(&self.pool)
            .await
    }

    /// Advance the counter to the given calendar day, zeroing it when
    /// the stored day is stale. No-op when already current.
    pub async fn roll_to(&self, today: NaiveDate) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE daily_budget SET
                count = 0,
                reset_date = $1,
                updated_at = $2
            WHERE id = 1 AND reset_date <> $1
            "#,
        )
        .bind(today)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Increment the counter if it is below the limit. Returns whether
    /// a unit was consumed.
    pub async fn increment_if_below_limit(&self) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE daily_budget SET
                count = count + 1,
                updated_at = $1
            WHERE id = 1 AND count < limit_value
            "#,
        )
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Change the configured daily limit
    pub async fn set_limit(&self, limit: i64) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE daily_budget SET
                limit_value = $1,
                updated_at = $2
            WHERE id = 1
            "#,
        )
        .bind(limit)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
