//! Reauthentication signal repository

use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::AuthState;

/// Repository for the singleton reauthentication-needed row
#[derive(Clone)]
pub struct AuthStateRepository {
    pool: SqlitePool,
}

impl AuthStateRepository {
    /// Create a new auth state repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Read the signal
    pub async fn get(&self) -> Result<AuthState, sqlx::Error> {
        sqlx::query_as::<_, AuthState>("SELECT * FROM auth_state WHERE id = 1")
            .fetch_one(&self.pool)
            .await
    }

    /// Raise the needs-reauthentication signal
    pub async fn raise(&self, reason: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE auth_state SET
                needs_reauth = 1,
                reason = $1,
                updated_at = $2
            WHERE id = 1
            "#,
        )
        .bind(reason)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Clear the signal after successful reauthentication
    pub async fn clear(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE auth_state SET
                needs_reauth = 0,
                reason = NULL,
                updated_at = $1
            WHERE id = 1
            "#,
        )
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
