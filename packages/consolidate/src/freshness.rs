//! Decides whether the cached table can be served or must be rebuilt.
//!
//! The source reports are republished weekly, so a cache is stale once it
//! is a full week old, or when a new reporting week has started since it
//! was written.

use chrono::{DateTime, Datelike as _, Days, FixedOffset, TimeDelta, Weekday};

/// Why a cache must be rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReason {
    /// The caller asked for a refresh regardless of cache state.
    Forced,
    /// No table or no timestamp has been written yet.
    Missing,
    /// The table or timestamp exists but could not be read.
    Unreadable,
    /// The cache is at least `max_age` old.
    Expired {
        /// Whole days since the cache was written.
        age_days: i64,
    },
    /// Today starts a new reporting week and the cache predates it.
    NewWeek,
}

impl std::fmt::Display for StaleReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Forced => write!(f, "refresh forced"),
            Self::Missing => write!(f, "no cache present"),
            Self::Unreadable => write!(f, "cache unreadable"),
            Self::Expired { age_days } => write!(f, "cache is {age_days} days old"),
            Self::NewWeek => write!(f, "new reporting week started"),
        }
    }
}

/// Outcome of a freshness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// The cache may be served as is.
    Fresh,
    /// The cache must be rebuilt.
    Stale(StaleReason),
}

impl Freshness {
    /// Returns `true` if the cache must be rebuilt.
    #[must_use]
    pub const fn is_stale(self) -> bool {
        matches!(self, Self::Stale(_))
    }
}

/// Time-based invalidation rules for the consolidated cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
    /// A cache at least this old is always stale.
    pub max_age: TimeDelta,
    /// Day a new reporting week starts on.
    pub week_start: Weekday,
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self {
            max_age: TimeDelta::days(7),
            week_start: Weekday::Mon,
        }
    }
}

impl FreshnessPolicy {
    /// Evaluates a cache written at `cached_at` as seen at `now`.
    ///
    /// Calendar dates are compared in `now`'s offset.
    #[must_use]
    pub fn evaluate(
        &self,
        cached_at: DateTime<FixedOffset>,
        now: DateTime<FixedOffset>,
    ) -> Freshness {
        let age = now.signed_duration_since(cached_at);
        if age >= self.max_age {
            return Freshness::Stale(StaleReason::Expired {
                age_days: age.num_days(),
            });
        }

        let today = now.date_naive();
        if today.weekday() == self.week_start {
            let cached_date = cached_at.with_timezone(&now.timezone()).date_naive();
            if cached_date < self.most_recent_week_start(today) {
                return Freshness::Stale(StaleReason::NewWeek);
            }
        }

        Freshness::Fresh
    }

    /// Evaluates an optional timestamp; a missing one is always stale.
    #[must_use]
    pub fn should_refresh(
        &self,
        cached_at: Option<DateTime<FixedOffset>>,
        now: DateTime<FixedOffset>,
    ) -> bool {
        cached_at.is_none_or(|at| self.evaluate(at, now).is_stale())
    }

    fn most_recent_week_start(&self, today: chrono::NaiveDate) -> chrono::NaiveDate {
        let back = (7 + today.weekday().num_days_from_monday()
            - self.week_start.num_days_from_monday())
            % 7;
        today - Days::new(u64::from(back))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    // 2026-10-14 is a Wednesday, 2026-10-19 a Monday.
    const WEDNESDAY_NOON: &str = "2026-10-14T12:00:00-04:00";
    const MONDAY_NOON: &str = "2026-10-19T12:00:00-04:00";

    #[test]
    fn exactly_seven_days_is_stale() {
        let policy = FreshnessPolicy::default();
        let now = at(WEDNESDAY_NOON);
        let cached = at("2026-10-07T12:00:00-04:00");
        assert_eq!(
            policy.evaluate(cached, now),
            Freshness::Stale(StaleReason::Expired { age_days: 7 })
        );
    }

    #[test]
    fn one_second_short_of_seven_days_is_fresh() {
        let policy = FreshnessPolicy::default();
        let now = at(WEDNESDAY_NOON);
        let cached = at("2026-10-07T12:00:01-04:00");
        assert_eq!(policy.evaluate(cached, now), Freshness::Fresh);
    }

    #[test]
    fn same_day_cache_is_fresh() {
        let policy = FreshnessPolicy::default();
        let now = at(WEDNESDAY_NOON);
        assert!(!policy.should_refresh(Some(at("2026-10-14T08:30:00-04:00")), now));
    }

    #[test]
    fn missing_timestamp_is_stale() {
        let policy = FreshnessPolicy::default();
        assert!(policy.should_refresh(None, at(WEDNESDAY_NOON)));
    }

    #[test]
    fn monday_invalidates_last_weeks_cache() {
        let policy = FreshnessPolicy::default();
        let now = at(MONDAY_NOON);
        let saturday = at("2026-10-17T09:00:00-04:00");
        assert_eq!(
            policy.evaluate(saturday, now),
            Freshness::Stale(StaleReason::NewWeek)
        );
    }

    #[test]
    fn monday_keeps_a_cache_written_that_morning() {
        let policy = FreshnessPolicy::default();
        let now = at(MONDAY_NOON);
        let this_morning = at("2026-10-19T06:00:00-04:00");
        assert_eq!(policy.evaluate(this_morning, now), Freshness::Fresh);
    }

    #[test]
    fn compares_dates_in_the_current_offset() {
        let policy = FreshnessPolicy::default();
        let now = at(MONDAY_NOON);
        // Monday 02:00 UTC is still Sunday evening in New York.
        let sunday_evening = at("2026-10-19T02:00:00+00:00");
        assert_eq!(
            policy.evaluate(sunday_evening, now),
            Freshness::Stale(StaleReason::NewWeek)
        );
    }

    #[test]
    fn custom_week_start() {
        let policy = FreshnessPolicy {
            week_start: Weekday::Wed,
            ..FreshnessPolicy::default()
        };
        let now = at(WEDNESDAY_NOON);
        let tuesday = at("2026-10-13T12:00:00-04:00");
        assert!(policy.evaluate(tuesday, now).is_stale());
        assert!(!policy.evaluate(tuesday, at("2026-10-15T12:00:00-04:00")).is_stale());
    }
}
