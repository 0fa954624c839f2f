//! Calendar instants with a granularity.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use chrono::{Days, Months, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Resolution of a time point.
///
/// Time-off resources are tracked per day; points systems may record
/// several events within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// Whole calendar days.
    Day,
    /// Second resolution.
    Second,
}

/// A calendar instant.
///
/// Day-granular points are always normalized to midnight. Ordering and
/// equality compare the instant only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimePoint {
    at: NaiveDateTime,
    granularity: Granularity,
}

impl TimePoint {
    /// Creates a day-granular time point.
    #[must_use]
    pub fn day(date: NaiveDate) -> Self {
        Self {
            at: date.and_time(NaiveTime::MIN),
            granularity: Granularity::Day,
        }
    }

    /// Creates a day-granular time point from year, month and day.
    #[must_use]
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self::day)
    }

    /// Creates a second-granular time point.
    #[must_use]
    pub fn at(at: NaiveDateTime) -> Self {
        Self {
            at: at.with_nanosecond(0).unwrap_or(at),
            granularity: Granularity::Second,
        }
    }

    /// Returns the calendar date of this point.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.at.date()
    }

    /// Returns the full date-time of this point.
    #[must_use]
    pub fn datetime(&self) -> NaiveDateTime {
        self.at
    }

    /// Returns the granularity of this point.
    #[must_use]
    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Returns true if this point is strictly before `other`.
    #[must_use]
    pub fn is_before(&self, other: &Self) -> bool {
        self.at < other.at
    }

    /// Returns true if this point is strictly after `other`.
    #[must_use]
    pub fn is_after(&self, other: &Self) -> bool {
        self.at > other.at
    }

    /// Returns the day-granular point for the same calendar date.
    #[must_use]
    pub fn start_of_day(&self) -> Self {
        Self::day(self.date())
    }

    /// Adds (or subtracts, when negative) whole days.
    #[must_use]
    pub fn add_days(&self, days: i64) -> Self {
        let shifted = if days >= 0 {
            self.at.checked_add_days(Days::new(days.unsigned_abs()))
        } else {
            self.at.checked_sub_days(Days::new(days.unsigned_abs()))
        };
        Self {
            at: shifted.unwrap_or(if days >= 0 {
                NaiveDateTime::MAX
            } else {
                NaiveDateTime::MIN
            }),
            granularity: self.granularity,
        }
    }

    /// Adds whole months, clamping to the end of shorter months.
    #[must_use]
    pub fn add_months(&self, months: u32) -> Self {
        Self {
            at: self
                .at
                .checked_add_months(Months::new(months))
                .unwrap_or(NaiveDateTime::MAX),
            granularity: self.granularity,
        }
    }

    /// Returns the `YYYY-MM-DD` key of the calendar day.
    #[must_use]
    pub fn day_key(&self) -> String {
        self.date().format("%Y-%m-%d").to_string()
    }
}

impl From<NaiveDate> for TimePoint {
    fn from(date: NaiveDate) -> Self {
        Self::day(date)
    }
}

impl PartialEq for TimePoint {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at
    }
}

impl Eq for TimePoint {}

impl Hash for TimePoint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.at.hash(state);
    }
}

impl PartialOrd for TimePoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimePoint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.at.cmp(&other.at)
    }
}

impl std::fmt::Display for TimePoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.granularity {
            Granularity::Day => write!(f, "{}", self.at.format("%Y-%m-%d")),
            Granularity::Second => write!(f, "{}", self.at.format("%Y-%m-%dT%H:%M:%S")),
        }
    }
}
