//! Property-based tests for BalanceCalculator.
//!
//! - Property 1: Consume-ahead availability dominates consume-up-to-accrued
//! - Property 2: Accrued never exceeds entitlement for deterministic schedules
//! - Property 3: Reversing every consumption restores availability

use accrue_shared::types::{Amount, EntityId, PolicyId, Unit};
use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::balance::BalanceCalculator;
use super::reversal::ReversalService;
use super::transaction::Transaction;
use super::types::TransactionType;
use crate::accrual::{AccrualFrequency, AccrualSchedule, YearlyAccrual};
use crate::period::{Period, PeriodConfig, TimePoint};
use crate::policy::ConsumptionMode;

/// Strategy to generate annual rates (1.00 to 60.00 days).
fn annual_rate() -> impl Strategy<Value = Decimal> {
    (100i64..6_000i64).prop_map(|v| Decimal::new(v, 2))
}

/// Strategy to generate day-sized consumption amounts (0.5 to 3 days).
fn consumption_amount() -> impl Strategy<Value = Decimal> {
    (1i64..=6i64).prop_map(|halves| Decimal::new(halves * 5, 1))
}

fn day_in_2025() -> impl Strategy<Value = NaiveDate> {
    (1u32..=12, 1u32..=28).prop_map(|(m, d)| NaiveDate::from_ymd_opt(2025, m, d).unwrap())
}

fn frequency() -> impl Strategy<Value = AccrualFrequency> {
    prop_oneof![
        Just(AccrualFrequency::Upfront),
        Just(AccrualFrequency::Monthly),
        Just(AccrualFrequency::Daily),
    ]
}

fn period() -> Period {
    PeriodConfig::CalendarYear
        .period_for(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), None)
        .unwrap()
}

fn schedule(annual: Decimal, frequency: AccrualFrequency) -> AccrualSchedule {
    AccrualSchedule::Yearly(YearlyAccrual::new(Amount::new(annual, Unit::Days), frequency).unwrap())
}

fn history(entries: &[(NaiveDate, Decimal, bool)]) -> Vec<Transaction> {
    entries
        .iter()
        .map(|(day, amount, pending)| {
            let tx_type = if *pending {
                TransactionType::Pending
            } else {
                TransactionType::Consumption
            };
            Transaction::builder(
                EntityId::from_key("prop"),
                PolicyId::from_key("prop"),
                "pto",
                tx_type,
                TimePoint::day(*day),
                Amount::new(-*amount, Unit::Days),
            )
            .build()
            .unwrap()
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property 1: for the same history, consume-ahead availability is never
    /// below consume-up-to-accrued, and they match once accrual catches up
    /// with entitlement.
    #[test]
    fn prop_consume_ahead_dominates(
        annual in annual_rate(),
        frequency in frequency(),
        as_of in day_in_2025(),
        entries in prop::collection::vec((day_in_2025(), consumption_amount(), any::<bool>()), 0..8),
    ) {
        let txs = history(&entries);
        let schedule = schedule(annual, frequency);
        let balance = BalanceCalculator::calculate(
            &txs, &period(), Unit::Days, Some(&schedule), TimePoint::day(as_of), None,
        );
        let ahead = balance.available_with_mode(ConsumptionMode::ConsumeAhead);
        let accrued = balance.available_with_mode(ConsumptionMode::ConsumeUpToAccrued);
        prop_assert!(ahead >= accrued);
        prop_assert_eq!(
            ahead == accrued,
            balance.accrued_to_date == balance.total_entitlement
        );
    }

    /// Property 2: accrued to date never exceeds the full-period entitlement,
    /// and equals it at period end.
    #[test]
    fn prop_accrued_bounded_by_entitlement(
        annual in annual_rate(),
        frequency in frequency(),
        as_of in day_in_2025(),
    ) {
        let schedule = schedule(annual, frequency);
        let balance = BalanceCalculator::calculate(
            &[], &period(), Unit::Days, Some(&schedule), TimePoint::day(as_of), None,
        );
        prop_assert!(balance.accrued_to_date <= balance.total_entitlement);
        prop_assert_eq!(balance.total_entitlement.value, annual);

        let at_end = BalanceCalculator::calculate(
            &[], &period(), Unit::Days, Some(&schedule), period().end, None,
        );
        prop_assert_eq!(at_end.accrued_to_date, at_end.total_entitlement);
    }

    /// Property 3: reversing every transaction restores the untouched balance.
    #[test]
    fn prop_reversals_restore_balance(
        annual in annual_rate(),
        entries in prop::collection::vec((day_in_2025(), consumption_amount(), any::<bool>()), 1..8),
    ) {
        let mut txs = history(&entries);
        let reversals: Vec<Transaction> = txs
            .iter()
            .map(|tx| ReversalService::create_reversal(tx, &[], "undo").unwrap())
            .collect();
        txs.extend(reversals);

        let schedule = schedule(annual, AccrualFrequency::Monthly);
        let as_of = TimePoint::from_ymd(2025, 12, 31).unwrap();
        let reversed = BalanceCalculator::calculate(
            &txs, &period(), Unit::Days, Some(&schedule), as_of, None,
        );
        let untouched = BalanceCalculator::calculate(
            &[], &period(), Unit::Days, Some(&schedule), as_of, None,
        );
        prop_assert_eq!(reversed.total_consumed.value, Decimal::ZERO);
        prop_assert_eq!(reversed.pending.value, Decimal::ZERO);
        prop_assert_eq!(
            reversed.available_with_mode(ConsumptionMode::ConsumeAhead).value,
            untouched.available_with_mode(ConsumptionMode::ConsumeAhead).value
        );
    }
}
