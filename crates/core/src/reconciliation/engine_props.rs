//! Property-based tests for ReconciliationEngine.
//!
//! - Property 1: Carried plus expired equals the positive remaining balance
//! - Property 2: Every bucket together accounts for the positive balance
//! - Property 3: Processing is a pure function of its input

use accrue_shared::types::{Amount, EntityId, PolicyId, Unit};
use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::engine::ReconciliationEngine;
use super::types::ReconciliationInput;
use crate::ledger::{Balance, TransactionType};
use crate::period::{Period, PeriodConfig};
use crate::policy::{
    Policy, ReconciliationAction, ReconciliationRule, ReconciliationTrigger, ResourceType,
};

/// Strategy to generate quantities in quarter days (0 to 40.00).
fn quantity() -> impl Strategy<Value = Decimal> {
    (0i64..160i64).prop_map(|q| Decimal::new(q * 25, 2))
}

/// Strategy to generate signed adjustments (-10.00 to 10.00).
fn adjustment() -> impl Strategy<Value = Decimal> {
    (-40i64..40i64).prop_map(|q| Decimal::new(q * 25, 2))
}

fn optional_max() -> impl Strategy<Value = Option<Decimal>> {
    prop::option::of(quantity())
}

fn action() -> impl Strategy<Value = ReconciliationAction> {
    prop_oneof![
        optional_max().prop_map(|max_carryover| ReconciliationAction::Carryover { max_carryover }),
        Just(ReconciliationAction::Cap),
        Just(ReconciliationAction::Prorate),
    ]
}

fn ending() -> Period {
    PeriodConfig::CalendarYear
        .period_for(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), None)
        .unwrap()
}

fn policy(actions: Vec<ReconciliationAction>, max_balance: Option<Decimal>) -> Policy {
    let resource = ResourceType::new("pto", Unit::Days, true);
    let mut policy = Policy::new(PolicyId::from_key("prop"), "Prop PTO", &resource);
    policy.constraints.max_balance = max_balance;
    policy.reconciliation_rules = vec![ReconciliationRule {
        trigger: ReconciliationTrigger::PeriodEnd,
        actions,
    }];
    policy
}

fn balance(accrued: Decimal, consumed: Decimal, adjustments: Decimal) -> Balance {
    let mut balance = Balance::zero(ending(), Unit::Days);
    balance.accrued_to_date = Amount::new(accrued, Unit::Days);
    balance.total_entitlement = Amount::new(accrued, Unit::Days);
    balance.total_consumed = Amount::new(consumed, Unit::Days);
    balance.adjustments = Amount::new(adjustments, Unit::Days);
    balance
}

fn input(policy: &Policy, balance: Balance) -> ReconciliationInput<'_> {
    ReconciliationInput {
        entity_id: EntityId::from_key("prop"),
        policy_id: policy.id,
        policy,
        current_balance: balance,
        ending_period: ending(),
        next_period: ending().next_period().unwrap(),
        trigger: ReconciliationTrigger::PeriodEnd,
        next_policy_id: None,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property 1: with carryover followed by a terminal expire,
    /// `carried_over + expired == max(current_accrued, 0)`.
    #[test]
    fn prop_carry_plus_expire_conserves(
        accrued in quantity(),
        consumed in quantity(),
        adjustments in adjustment(),
        max in optional_max(),
    ) {
        let policy = policy(
            vec![
                ReconciliationAction::Carryover { max_carryover: max },
                ReconciliationAction::Expire,
            ],
            None,
        );
        let balance = balance(accrued, consumed, adjustments);
        let output = ReconciliationEngine::process(&input(&policy, balance)).unwrap();

        let positive = balance.current_accrued().max(Amount::zero(Unit::Days));
        prop_assert_eq!(output.summary.carried_over + output.summary.expired, positive);
        prop_assert!(output.summary.retained.is_zero());
        let written = Amount::sum(Unit::Days, output.transactions.iter().map(|t| t.delta));
        prop_assert_eq!(written, output.summary.carried_over);
    }

    /// Property 2: for any action list, the four buckets account for the
    /// positive balance exactly, and caps are the only negative rows.
    #[test]
    fn prop_buckets_account_for_balance(
        accrued in quantity(),
        consumed in quantity(),
        adjustments in adjustment(),
        actions in prop::collection::vec(action(), 0..4),
        expire in any::<bool>(),
        max_balance in optional_max(),
    ) {
        let mut actions = actions;
        if expire {
            actions.push(ReconciliationAction::Expire);
        }
        let policy = policy(actions, max_balance);
        let balance = balance(accrued, consumed, adjustments);
        let output = ReconciliationEngine::process(&input(&policy, balance)).unwrap();

        let positive = balance.current_accrued().max(Amount::zero(Unit::Days));
        prop_assert_eq!(output.summary.total(), positive);
        for tx in &output.transactions {
            match tx.tx_type {
                TransactionType::Reconciliation => prop_assert!(tx.delta.is_positive()),
                TransactionType::Adjustment => prop_assert!(tx.delta.is_negative()),
                other => prop_assert!(false, "unexpected {other}"),
            }
        }
    }

    /// Property 3: identical input yields byte-identical output.
    #[test]
    fn prop_process_is_idempotent(
        accrued in quantity(),
        consumed in quantity(),
        max in optional_max(),
    ) {
        let policy = policy(
            vec![
                ReconciliationAction::Carryover { max_carryover: max },
                ReconciliationAction::Expire,
            ],
            None,
        );
        let input = input(&policy, balance(accrued, consumed, Decimal::ZERO));
        let first = ReconciliationEngine::process(&input).unwrap();
        let second = ReconciliationEngine::process(&input).unwrap();
        prop_assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
