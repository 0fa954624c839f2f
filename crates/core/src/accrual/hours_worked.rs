//! Accrual earned from reported payroll hours.

use std::collections::BTreeMap;

use accrue_shared::types::{Amount, DEFAULT_HOURS_PER_DAY, Unit};
use chrono::{Datelike, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::error::AccrualError;
use super::schedule::{ACCRUAL_SCALE, AccrualEvent};
use crate::period::TimePoint;

/// One observed payroll record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoursWorkedRecord {
    /// Day the hours were reported for.
    pub date: NaiveDate,
    /// Hours worked.
    pub hours_worked: Decimal,
    /// External payroll reference.
    #[serde(default)]
    pub reference: Option<String>,
}

/// `granted_hours` earned for every `per_hours_worked` reported.
///
/// Non-deterministic: nothing is known about hours not yet reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoursWorkedAccrual {
    /// Hours granted per block.
    pub granted_hours: Decimal,
    /// Size of a block of worked hours.
    pub per_hours_worked: Decimal,
    /// Policy unit, hours or days.
    pub unit: Unit,
    /// Conversion factor from hours to days.
    pub hours_per_day: Decimal,
    /// Maximum accrued per calendar year, in the policy unit.
    pub max_per_year: Option<Decimal>,
    /// Observed payroll records.
    pub records: Vec<HoursWorkedRecord>,
}

impl HoursWorkedAccrual {
    /// Creates an accrual with no records.
    pub fn new(
        granted_hours: Decimal,
        per_hours_worked: Decimal,
        unit: Unit,
    ) -> Result<Self, AccrualError> {
        if granted_hours <= Decimal::ZERO || per_hours_worked <= Decimal::ZERO {
            return Err(AccrualError::NonPositiveRate);
        }
        if !matches!(unit, Unit::Hours | Unit::Days) {
            return Err(AccrualError::UnsupportedUnit(unit));
        }
        Ok(Self {
            granted_hours,
            per_hours_worked,
            unit,
            hours_per_day: DEFAULT_HOURS_PER_DAY,
            max_per_year: None,
            records: Vec::new(),
        })
    }

    /// Overrides the hours-to-days factor.
    #[must_use]
    pub fn with_hours_per_day(mut self, hours_per_day: Decimal) -> Self {
        if hours_per_day > Decimal::ZERO {
            self.hours_per_day = hours_per_day;
        }
        self
    }

    /// Caps the accrual of each calendar year.
    #[must_use]
    pub fn with_max_per_year(mut self, max: Decimal) -> Self {
        self.max_per_year = Some(max);
        self
    }

    /// Replaces the observed payroll records.
    #[must_use]
    pub fn with_records(mut self, mut records: Vec<HoursWorkedRecord>) -> Self {
        records.sort_by_key(|r| r.date);
        self.records = records;
        self
    }

    /// Amount earned for `hours_worked` before any yearly cap.
    #[must_use]
    pub fn earned_for(&self, hours_worked: Decimal) -> Decimal {
        let hours = hours_worked * self.granted_hours / self.per_hours_worked;
        let value = match self.unit {
            Unit::Days => hours / self.hours_per_day,
            _ => hours,
        };
        value.round_dp_with_strategy(ACCRUAL_SCALE, RoundingStrategy::MidpointNearestEven)
    }

    pub(crate) fn generate(&self, from: NaiveDate, to: NaiveDate) -> Vec<AccrualEvent> {
        // Running totals cover records before `from` so the yearly cap holds.
        let mut earned_in_year: BTreeMap<i32, Decimal> = BTreeMap::new();
        let mut events = Vec::new();

        for record in self.records.iter().take_while(|r| r.date <= to) {
            if record.hours_worked <= Decimal::ZERO {
                continue;
            }
            let running = earned_in_year.entry(record.date.year()).or_default();
            let mut value = self.earned_for(record.hours_worked);
            if let Some(max) = self.max_per_year {
                value = value.min((max - *running).max(Decimal::ZERO));
            }
            *running += value;

            if record.date >= from && value > Decimal::ZERO {
                events.push(AccrualEvent {
                    at: TimePoint::day(record.date),
                    amount: Amount::new(value, self.unit),
                    reason: format!(
                        "hours worked accrual: {} hours{}",
                        record.hours_worked.normalize(),
                        record
                            .reference
                            .as_deref()
                            .map(|r| format!(" ({r})"))
                            .unwrap_or_default()
                    ),
                });
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(d: NaiveDate, hours: Decimal) -> HoursWorkedRecord {
        HoursWorkedRecord {
            date: d,
            hours_worked: hours,
            reference: None,
        }
    }

    #[test]
    fn test_one_hour_per_thirty_in_hours() {
        let accrual = HoursWorkedAccrual::new(dec!(1), dec!(30), Unit::Hours)
            .unwrap()
            .with_records(vec![record(date(2025, 1, 10), dec!(60))]);
        let events = accrual.generate(date(2025, 1, 1), date(2025, 12, 31));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].amount, Amount::new(dec!(2), Unit::Hours));
    }

    #[test]
    fn test_converts_to_days() {
        let accrual = HoursWorkedAccrual::new(dec!(1), dec!(30), Unit::Days)
            .unwrap()
            .with_records(vec![record(date(2025, 1, 10), dec!(120))]);
        let events = accrual.generate(date(2025, 1, 1), date(2025, 1, 31));
        assert_eq!(events[0].amount, Amount::new(dec!(0.5), Unit::Days));
    }

    #[test]
    fn test_only_records_in_range() {
        let accrual = HoursWorkedAccrual::new(dec!(1), dec!(40), Unit::Hours)
            .unwrap()
            .with_records(vec![
                record(date(2025, 2, 1), dec!(40)),
                record(date(2025, 1, 1), dec!(40)),
                record(date(2025, 3, 1), dec!(40)),
            ]);
        let events = accrual.generate(date(2025, 1, 15), date(2025, 2, 28));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].at.date(), date(2025, 2, 1));
    }

    #[test]
    fn test_yearly_cap_counts_earlier_records() {
        let accrual = HoursWorkedAccrual::new(dec!(1), dec!(10), Unit::Hours)
            .unwrap()
            .with_max_per_year(dec!(5))
            .with_records(vec![
                record(date(2025, 1, 1), dec!(40)),
                record(date(2025, 2, 1), dec!(40)),
                record(date(2026, 1, 1), dec!(40)),
            ]);
        let feb = accrual.generate(date(2025, 2, 1), date(2025, 2, 28));
        assert_eq!(feb[0].amount.value, dec!(1));
        let next_year = accrual.generate(date(2026, 1, 1), date(2026, 12, 31));
        assert_eq!(next_year[0].amount.value, dec!(4));
    }

    #[test]
    fn test_rejects_invalid_configuration() {
        assert_eq!(
            HoursWorkedAccrual::new(dec!(0), dec!(30), Unit::Hours),
            Err(AccrualError::NonPositiveRate)
        );
        assert_eq!(
            HoursWorkedAccrual::new(dec!(1), dec!(30), Unit::Points),
            Err(AccrualError::UnsupportedUnit(Unit::Points))
        );
    }
}
