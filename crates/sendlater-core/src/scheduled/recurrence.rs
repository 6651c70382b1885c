//! Recurrence arithmetic
//!
//! `advance` is one deterministic calendar step from the item's own
//! scheduled instant. Monthly steps clamp to the end of the target
//! month (Jan 31 + 1 month = Feb 28, or Feb 29 in leap years).
//!
//! `next_occurrence` steps until the result lies in the future:
//! occurrences missed while the process was suspended are dropped
//! rather than caught up (latest-occurrence-wins).

use chrono::{DateTime, Days, Months, Utc};
use sendlater_storage::models::Recurrence;

/// One calendar step; `None` for non-recurring items
pub fn advance(from: DateTime<Utc>, recurrence: Recurrence) -> Option<DateTime<Utc>> {
    match recurrence {
        Recurrence::None => None,
        Recurrence::Daily => from.checked_add_days(Days::new(1)),
        Recurrence::Weekly => from.checked_add_days(Days::new(7)),
        Recurrence::Monthly => from.checked_add_months(Months::new(1)),
    }
}

/// The next occurrence strictly after `now`
pub fn next_occurrence(
    from: DateTime<Utc>,
    recurrence: Recurrence,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let mut next = advance(from, recurrence)?;
    while next <= now {
        next = advance(next, recurrence)?;
    }
    Some(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn test_daily_advance() {
        assert_eq!(
            advance(ts("2024-01-15T09:00:00Z"), Recurrence::Daily),
            Some(ts("2024-01-16T09:00:00Z"))
        );
    }

    #[test]
    fn test_weekly_advance() {
        assert_eq!(
            advance(ts("2024-01-15T09:00:00Z"), Recurrence::Weekly),
            Some(ts("2024-01-22T09:00:00Z"))
        );
    }

    #[test]
    fn test_monthly_advance_clamps_to_month_end() {
        // 2024 is a leap year
        assert_eq!(
            advance(ts("2024-01-31T09:00:00Z"), Recurrence::Monthly),
            Some(ts("2024-02-29T09:00:00Z"))
        );
        assert_eq!(
            advance(ts("2023-01-31T09:00:00Z"), Recurrence::Monthly),
            Some(ts("2023-02-28T09:00:00Z"))
        );
        assert_eq!(
            advance(ts("2024-03-31T09:00:00Z"), Recurrence::Monthly),
            Some(ts("2024-04-30T09:00:00Z"))
        );
    }

    #[test]
    fn test_none_never_advances() {
        assert_eq!(advance(ts("2024-01-15T09:00:00Z"), Recurrence::None), None);
    }

    #[test]
    fn test_missed_occurrences_are_dropped() {
        let origin = ts("2024-01-01T09:00:00Z");
        let now = ts("2024-01-04T12:00:00Z");

        // Three daily occurrences were missed; only the next future one
        // is produced
        assert_eq!(
            next_occurrence(origin, Recurrence::Daily, now),
            Some(ts("2024-01-05T09:00:00Z"))
        );
    }

    #[test]
    fn test_future_occurrence_single_step() {
        let origin = ts("2024-01-01T09:00:00Z");
        let now = ts("2024-01-01T10:00:00Z");

        assert_eq!(
            next_occurrence(origin, Recurrence::Weekly, now),
            Some(ts("2024-01-08T09:00:00Z"))
        );
    }
}
