//! Property-based tests for accrual schedules.
//!
//! - Property 1: Mid-period hire proration
//! - Property 2: Full-year shares sum to the annual rate
//! - Property 3: Events stay inside the requested range

use accrue_shared::types::{Amount, Unit};
use chrono::{Datelike, NaiveDate};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::schedule::{AccrualFrequency, AccrualSchedule};
use super::yearly::YearlyAccrual;
use crate::period::TimePoint;

/// Any positive annual rate with up to 4 decimal places.
fn any_rate() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|n| Decimal::new(n, 4))
}

fn frequency() -> impl Strategy<Value = AccrualFrequency> {
    prop_oneof![
        Just(AccrualFrequency::Upfront),
        Just(AccrualFrequency::Monthly),
        Just(AccrualFrequency::Daily),
    ]
}

fn date_in(year: i32) -> impl Strategy<Value = NaiveDate> {
    (1u32..=12, 1u32..=28).prop_map(move |(m, d)| NaiveDate::from_ymd_opt(year, m, d).unwrap())
}

fn yearly(annual: Decimal, frequency: AccrualFrequency) -> AccrualSchedule {
    AccrualSchedule::Yearly(
        YearlyAccrual::new(Amount::new(annual, Unit::Days), frequency).unwrap(),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property 1: a hire on day `d` of month `m` accrues `A/12 * (13 - m)`
    /// when `d == 1`, else `A/12 * (12 - m)`, within one unit of the accrual
    /// scale.
    #[test]
    fn prop_mid_period_hire_proration(
        annual in any_rate(),
        hire in date_in(2025),
    ) {
        let schedule = yearly(annual, AccrualFrequency::Monthly);
        let year_end = TimePoint::from_ymd(2025, 12, 31).unwrap();
        let accrued = schedule.total(TimePoint::day(hire), year_end);

        let months = if hire.day() == 1 { 13 - hire.month() } else { 12 - hire.month() };
        let expected = annual * Decimal::from(months) / Decimal::from(12);
        prop_assert!(
            (accrued.value - expected).abs() <= Decimal::new(1, 4),
            "accrued {} expected {}", accrued.value, expected
        );
    }

    /// Property 2: every frequency pays exactly the annual rate over a full
    /// accrual year.
    #[test]
    fn prop_full_year_sums_to_annual(
        annual in any_rate(),
        frequency in frequency(),
        year in 2020i32..2030,
    ) {
        let schedule = yearly(annual, frequency);
        let total = schedule.total(
            TimePoint::from_ymd(year, 1, 1).unwrap(),
            TimePoint::from_ymd(year, 12, 31).unwrap(),
        );
        prop_assert_eq!(total.value, annual);
    }

    /// Property 3: generated events lie in `[from, to]`, are positive and are
    /// ordered by date.
    #[test]
    fn prop_events_inside_range(
        annual in any_rate(),
        frequency in frequency(),
        from in date_in(2025),
        to in date_in(2025),
    ) {
        prop_assume!(from <= to);
        let events = yearly(annual, frequency)
            .generate(TimePoint::day(from), TimePoint::day(to));
        for event in &events {
            prop_assert!(event.at.date() >= from && event.at.date() <= to);
            prop_assert!(event.amount.is_positive());
        }
        prop_assert!(events.windows(2).all(|w| w[0].at <= w[1].at));
    }
}
