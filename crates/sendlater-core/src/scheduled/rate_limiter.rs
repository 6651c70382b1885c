//! Rate limiter - the rolling daily send budget
//!
//! One unit is consumed per dispatched send attempt, before the
//! transport call, so a failed attempt still counts against the day.
//! The counter rolls to the current local calendar day before every
//! read or increment.

use anyhow::Result;
use chrono::{Local, NaiveDate};
use sendlater_storage::repository::BudgetRepository;
use serde::Serialize;
use tracing::debug;

/// Snapshot of the daily budget
#[derive(Debug, Clone, Serialize)]
pub struct DailyBudgetStatus {
    pub count: i64,
    pub limit: i64,
    pub reset_date: NaiveDate,
}

/// Daily budget gate shared by the scheduler and the bulk sender
pub struct RateLimiter {
    budget: BudgetRepository,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(budget: BudgetRepository) -> Self {
        Self { budget }
    }

    /// Consume one send unit if the day's budget allows it
    pub async fn try_consume(&self) -> Result<bool> {
        self.try_consume_on(Local::now().date_naive()).await
    }

    /// Consume against an explicit calendar day
    pub async fn try_consume_on(&self, today: NaiveDate) -> Result<bool> {
        self.budget.roll_to(today).await?;
        let consumed = self.budget.increment_if_below_limit().await?;
        if !consumed {
            debug!(%today, "Daily send budget exhausted");
        }
        Ok(consumed)
    }

    /// Current budget state, rolled to today first
    pub async fn status(&self) -> Result<DailyBudgetStatus> {
        self.status_on(Local::now().date_naive()).await
    }

    /// Budget state against an explicit calendar day
    pub async fn status_on(&self, today: NaiveDate) -> Result<DailyBudgetStatus> {
        self.budget.roll_to(today).await?;
        let budget = self.budget.get().await?;
        Ok(DailyBudgetStatus {
            count: budget.count,
            limit: budget.limit_value,
            reset_date: budget.reset_date,
        })
    }

    /// Change the configured daily limit
    pub async fn configure_limit(&self, limit: i64) -> Result<()> {
        self.budget.set_limit(limit).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sendlater_storage::DatabasePool;

    async fn limiter() -> RateLimiter {
        let db = DatabasePool::in_memory().await.unwrap();
        RateLimiter::new(BudgetRepository::new(db.pool().clone()))
    }

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_limit_is_exact() {
        let limiter = limiter().await;
        limiter.configure_limit(3).await.unwrap();
        let today = day("2024-03-01");

        for _ in 0..3 {
            assert!(limiter.try_consume_on(today).await.unwrap());
        }
        assert!(!limiter.try_consume_on(today).await.unwrap());
        assert!(!limiter.try_consume_on(today).await.unwrap());

        let status = limiter.status_on(today).await.unwrap();
        assert_eq!(status.count, 3);
        assert_eq!(status.limit, 3);
    }

    #[tokio::test]
    async fn test_day_rollover_resets_counter() {
        let limiter = limiter().await;
        limiter.configure_limit(2).await.unwrap();

        let monday = day("2024-03-04");
        assert!(limiter.try_consume_on(monday).await.unwrap());
        assert!(limiter.try_consume_on(monday).await.unwrap());
        assert!(!limiter.try_consume_on(monday).await.unwrap());

        let tuesday = day("2024-03-05");
        assert!(limiter.try_consume_on(tuesday).await.unwrap());

        let status = limiter.status_on(tuesday).await.unwrap();
        assert_eq!(status.count, 1);
        assert_eq!(status.reset_date, tuesday);
    }

    #[tokio::test]
    async fn test_status_rolls_before_reading() {
        let limiter = limiter().await;
        let monday = day("2024-03-04");
        assert!(limiter.try_consume_on(monday).await.unwrap());

        let status = limiter.status_on(day("2024-03-05")).await.unwrap();
        assert_eq!(status.count, 0);
        assert_eq!(status.reset_date, day("2024-03-05"));
    }

    #[tokio::test]
    async fn test_default_limit_from_migration() {
        let limiter = limiter().await;
        let status = limiter.status_on(day("2024-03-01")).await.unwrap();
        assert_eq!(status.limit, 500);
        assert_eq!(status.count, 0);
    }
}
