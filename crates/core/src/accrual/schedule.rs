//! Accrual events, frequencies and the schedule sum type.

use accrue_shared::types::{Amount, Unit};
use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::allocation::AllocationUtil;
use super::hours_worked::HoursWorkedAccrual;
use super::tenure::TenureAccrual;
use super::yearly::YearlyAccrual;
use crate::period::TimePoint;

/// Decimal places of a single accrual share.
pub const ACCRUAL_SCALE: u32 = 4;

/// A single computed entitlement occurrence. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccrualEvent {
    /// When the entitlement is earned.
    pub at: TimePoint,
    /// How much is earned.
    pub amount: Amount,
    /// Human readable origin.
    pub reason: String,
}

/// How often an annual rate is paid out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccrualFrequency {
    /// The whole annual quantity at the start of each accrual year.
    Upfront,
    /// One twelfth on the 1st of every month.
    #[default]
    Monthly,
    /// An equal share on every day of the calendar year.
    Daily,
}

impl AccrualFrequency {
    /// Returns the lowercase name of the frequency.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Upfront => "upfront",
            Self::Monthly => "monthly",
            Self::Daily => "daily",
        }
    }

    /// Generates events on `[from, to]`.
    ///
    /// `rate` returns the annual rate in effect on a date together with a
    /// label for the event reason.
    pub(crate) fn events<F>(
        self,
        year_start_month: u32,
        from: NaiveDate,
        to: NaiveDate,
        unit: Unit,
        rate: F,
    ) -> Vec<AccrualEvent>
    where
        F: Fn(NaiveDate) -> (Decimal, String),
    {
        if from > to {
            return Vec::new();
        }
        let mut events = Vec::new();
        let mut push = |date: NaiveDate, value: Decimal, label: String| {
            if value > Decimal::ZERO {
                events.push(AccrualEvent {
                    at: TimePoint::day(date),
                    amount: Amount::new(value, unit),
                    reason: format!("{} accrual: {label}", self.as_str()),
                });
            }
        };

        match self {
            Self::Upfront => {
                let mut year_start = accrual_year_start(from, year_start_month);
                while let Some(start) = year_start {
                    if start > to {
                        break;
                    }
                    let dated = start.max(from);
                    let (annual, label) = rate(dated);
                    push(dated, annual, label);
                    year_start = start.checked_add_months(Months::new(12));
                }
            }
            Self::Monthly => {
                let mut anchor = from.with_day(1).filter(|d| *d >= from).or_else(|| {
                    from.with_day(1)
                        .and_then(|d| d.checked_add_months(Months::new(1)))
                });
                while let Some(first) = anchor {
                    if first > to {
                        break;
                    }
                    let (annual, label) = rate(first);
                    let index = (first.month() + 12 - year_start_month) % 12;
                    let share =
                        AllocationUtil::share_at(annual, 12, index as usize, ACCRUAL_SCALE);
                    push(first, share, label);
                    anchor = first.checked_add_months(Months::new(1));
                }
            }
            Self::Daily => {
                for day in from.iter_days().take_while(|d| *d <= to) {
                    let (annual, label) = rate(day);
                    let share = AllocationUtil::share_at(
                        annual,
                        days_in_year(day.year()),
                        day.ordinal0() as usize,
                        ACCRUAL_SCALE,
                    );
                    push(day, share, label);
                }
            }
        }
        events
    }
}

impl std::fmt::Display for AccrualFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strategy producing entitlement events over a time range.
#[derive(Debug, Clone, PartialEq)]
pub enum AccrualSchedule {
    /// A fixed annual quantity.
    Yearly(YearlyAccrual),
    /// An annual quantity that grows with service years.
    Tenure(TenureAccrual),
    /// Earned from reported payroll hours.
    HoursWorked(HoursWorkedAccrual),
}

impl AccrualSchedule {
    /// Generates all events on the closed range `[from, to]`.
    #[must_use]
    pub fn generate(&self, from: TimePoint, to: TimePoint) -> Vec<AccrualEvent> {
        let (from, to) = (from.date(), to.date());
        match self {
            Self::Yearly(s) => s.generate(from, to),
            Self::Tenure(s) => s.generate(from, to),
            Self::HoursWorked(s) => s.generate(from, to),
        }
    }

    /// Sums all events on the closed range `[from, to]`.
    #[must_use]
    pub fn total(&self, from: TimePoint, to: TimePoint) -> Amount {
        Amount::sum(
            self.unit(),
            self.generate(from, to).into_iter().map(|e| e.amount),
        )
    }

    /// Returns true if future accruals are fully known in advance.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        match self {
            Self::Yearly(_) | Self::Tenure(_) => true,
            Self::HoursWorked(_) => false,
        }
    }

    /// Unit of the generated amounts.
    #[must_use]
    pub fn unit(&self) -> Unit {
        match self {
            Self::Yearly(s) => s.annual_quantity.unit,
            Self::Tenure(s) => s.unit,
            Self::HoursWorked(s) => s.unit,
        }
    }
}

/// First day of the accrual year containing `date`.
fn accrual_year_start(date: NaiveDate, year_start_month: u32) -> Option<NaiveDate> {
    let year = if date.month() >= year_start_month {
        date.year()
    } else {
        date.year() - 1
    };
    NaiveDate::from_ymd_opt(year, year_start_month, 1)
}

fn days_in_year(year: i32) -> usize {
    if NaiveDate::from_ymd_opt(year, 2, 29).is_some() {
        366
    } else {
        365
    }
}
