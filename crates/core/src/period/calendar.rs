//! Periods and period configuration.

use chrono::{Datelike, Days, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::PeriodError;
use super::time_point::TimePoint;

/// The natural length of a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "unit", content = "count", rename_all = "lowercase")]
pub enum PeriodSpan {
    /// A whole number of calendar months.
    Months(u32),
    /// A whole number of days.
    Days(u32),
}

impl PeriodSpan {
    /// Returns the last day of a period of this span starting at `start`.
    fn end_from(self, start: NaiveDate) -> Option<NaiveDate> {
        let after = match self {
            Self::Months(n) => start.checked_add_months(Months::new(n))?,
            Self::Days(n) => start.checked_add_days(Days::new(u64::from(n)))?,
        };
        after.pred_opt()
    }
}

/// A closed-inclusive range of calendar days.
///
/// Both `start` and `end` are day-granular and belong to the period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
    /// First day of the period.
    pub start: TimePoint,
    /// Last day of the period.
    pub end: TimePoint,
    /// The shape used to derive following periods.
    pub span: PeriodSpan,
}

impl Period {
    /// Creates a period from explicit boundaries.
    pub fn new(start: NaiveDate, end: NaiveDate, span: PeriodSpan) -> Result<Self, PeriodError> {
        if start > end {
            return Err(PeriodError::InvalidRange { start, end });
        }
        Ok(Self {
            start: TimePoint::day(start),
            end: TimePoint::day(end),
            span,
        })
    }

    /// Creates a full-length period of `span` starting at `start`.
    pub fn from_span(start: NaiveDate, span: PeriodSpan) -> Result<Self, PeriodError> {
        let end = span.end_from(start).ok_or(PeriodError::OutOfRange)?;
        Self::new(start, end, span)
    }

    /// Returns the first calendar day.
    #[must_use]
    pub fn start_date(&self) -> NaiveDate {
        self.start.date()
    }

    /// Returns the last calendar day.
    #[must_use]
    pub fn end_date(&self) -> NaiveDate {
        self.end.date()
    }

    /// Returns true if the point falls on a day inside the period.
    #[must_use]
    pub fn contains(&self, point: &TimePoint) -> bool {
        self.contains_date(point.date())
    }

    /// Returns true if the date falls inside the period.
    #[must_use]
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.start_date() && date <= self.end_date()
    }

    /// Returns the immediately following period of the same shape.
    pub fn next_period(&self) -> Result<Self, PeriodError> {
        let start = self.end_date().succ_opt().ok_or(PeriodError::OutOfRange)?;
        Self::from_span(start, self.span)
    }

    /// Returns the immediately preceding period of the same shape.
    pub fn previous_period(&self) -> Result<Self, PeriodError> {
        let end = self.start_date().pred_opt().ok_or(PeriodError::OutOfRange)?;
        let start = match self.span {
            PeriodSpan::Months(n) => end
                .succ_opt()
                .and_then(|d| d.checked_sub_months(Months::new(n))),
            PeriodSpan::Days(n) => end.checked_sub_days(Days::new(u64::from(n).saturating_sub(1))),
        }
        .ok_or(PeriodError::OutOfRange)?;
        Self::new(start, end, self.span)
    }

    /// Closes the period early so that `last_day` is its final day.
    pub fn truncate_at(&self, last_day: NaiveDate) -> Result<Self, PeriodError> {
        if last_day > self.end_date() {
            return Err(PeriodError::InvalidRange {
                start: self.end_date(),
                end: last_day,
            });
        }
        Self::new(self.start_date(), last_day, self.span)
    }

    /// Opens the period late so that `first_day` is its first day.
    pub fn starting_at(&self, first_day: NaiveDate) -> Result<Self, PeriodError> {
        Self::new(first_day, self.end_date(), self.span)
    }

    /// Number of calendar days in the period.
    #[must_use]
    pub fn length_days(&self) -> i64 {
        (self.end_date() - self.start_date()).num_days() + 1
    }

    /// Number of days the period would cover at its natural length.
    #[must_use]
    pub fn natural_length_days(&self) -> i64 {
        Self::from_span(self.start_date(), self.span)
            .map_or_else(|_| self.length_days(), |p| p.length_days())
    }

    /// Fraction of the natural period this period covers, in `(0, 1]`.
    #[must_use]
    pub fn coverage_fraction(&self) -> Decimal {
        let natural = self.natural_length_days();
        if natural <= 0 {
            return Decimal::ONE;
        }
        (Decimal::from(self.length_days()) / Decimal::from(natural)).min(Decimal::ONE)
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// How a policy slices time into periods.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PeriodConfig {
    /// January 1 to December 31.
    #[default]
    CalendarYear,
    /// Twelve months starting on the 1st of `start_month`.
    FiscalYear {
        /// First month of the fiscal year (1-12).
        start_month: u32,
    },
    /// Twelve months starting on each hire anniversary.
    Anniversary,
    /// A trailing window of `days` days ending on the evaluation date.
    Rolling {
        /// Window length in days.
        days: u32,
    },
}

impl PeriodConfig {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), PeriodError> {
        match *self {
            Self::FiscalYear { start_month } if !(1..=12).contains(&start_month) => {
                Err(PeriodError::InvalidFiscalStartMonth(start_month))
            }
            Self::Rolling { days: 0 } => Err(PeriodError::EmptyRollingWindow),
            _ => Ok(()),
        }
    }

    /// Returns the natural span of periods produced by this configuration.
    #[must_use]
    pub fn span(&self) -> PeriodSpan {
        match *self {
            Self::CalendarYear | Self::FiscalYear { .. } | Self::Anniversary => {
                PeriodSpan::Months(12)
            }
            Self::Rolling { days } => PeriodSpan::Days(days),
        }
    }

    /// Returns false for rolling windows, which have no fixed boundary to
    /// reconcile at.
    #[must_use]
    pub fn has_boundaries(&self) -> bool {
        !matches!(self, Self::Rolling { .. })
    }

    /// Month in which accrual years start, used to anchor upfront grants.
    #[must_use]
    pub fn year_start_month(&self, hire_date: Option<NaiveDate>) -> u32 {
        match *self {
            Self::FiscalYear { start_month } => start_month,
            Self::Anniversary => hire_date.map_or(1, |d| d.month()),
            Self::CalendarYear | Self::Rolling { .. } => 1,
        }
    }

    /// Returns the period containing `date`.
    pub fn period_for(
        &self,
        date: NaiveDate,
        hire_date: Option<NaiveDate>,
    ) -> Result<Period, PeriodError> {
        self.validate()?;
        match *self {
            Self::CalendarYear => {
                let start = ymd(date.year(), 1, 1)?;
                Period::from_span(start, self.span())
            }
            Self::FiscalYear { start_month } => {
                let year = if date.month() >= start_month {
                    date.year()
                } else {
                    date.year() - 1
                };
                Period::from_span(ymd(year, start_month, 1)?, self.span())
            }
            Self::Anniversary => {
                let hire = hire_date.ok_or(PeriodError::MissingHireDate)?;
                if date < hire {
                    return Period::from_span(hire, self.span());
                }
                let mut years = date.year() - hire.year();
                let mut start = add_years(hire, years)?;
                if start > date {
                    years -= 1;
                    start = add_years(hire, years)?;
                }
                Period::from_span(start, self.span())
            }
            Self::Rolling { days } => {
                let start = date
                    .checked_sub_days(Days::new(u64::from(days) - 1))
                    .ok_or(PeriodError::OutOfRange)?;
                Period::new(start, date, self.span())
            }
        }
    }
}

fn ymd(year: i32, month: u32, day: u32) -> Result<NaiveDate, PeriodError> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or(PeriodError::OutOfRange)
}

fn add_years(date: NaiveDate, years: i32) -> Result<NaiveDate, PeriodError> {
    let months = u32::try_from(years)
        .ok()
        .and_then(|y| y.checked_mul(12))
        .ok_or(PeriodError::OutOfRange)?;
    date.checked_add_months(Months::new(months))
        .ok_or(PeriodError::OutOfRange)
}
