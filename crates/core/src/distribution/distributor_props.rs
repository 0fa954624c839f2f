//! Property-based tests for ConsumptionDistributor.
//!
//! - Property 1: Allocations plus shortfall equal the request
//! - Property 2: Without overdraft, allocated equals min(requested, available)
//! - Property 3: With overdraft, exactly the request is allocated
//! - Property 4: Day distribution books whole days only

use accrue_shared::types::{Amount, EntityId, PolicyId, Unit};
use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::distributor::ConsumptionDistributor;
use super::types::{PolicyBalance, ResourceBalance};
use crate::ledger::Balance;
use crate::period::PeriodConfig;
use crate::policy::{ApprovalConfig, ConsumptionMode};

/// Strategy to generate balances in quarter days (-5.00 to 20.00).
fn available() -> impl Strategy<Value = Decimal> {
    (-20i64..80i64).prop_map(|q| Decimal::new(q * 25, 2))
}

/// Strategy to generate positive requests in quarter days (0.25 to 30.00).
fn requested() -> impl Strategy<Value = Decimal> {
    (1i64..120i64).prop_map(|q| Decimal::new(q * 25, 2))
}

fn resource(balances: &[(Decimal, u32)]) -> ResourceBalance {
    let period = PeriodConfig::CalendarYear
        .period_for(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), None)
        .unwrap();
    let mut rb = ResourceBalance::new(EntityId::from_key("prop"), "pto", Unit::Days);
    for (index, (value, priority)) in balances.iter().enumerate() {
        let mut balance = Balance::zero(period, Unit::Days);
        balance.accrued_to_date = Amount::new(*value, Unit::Days);
        balance.total_entitlement = Amount::new(*value, Unit::Days);
        rb.policy_balances.push(PolicyBalance {
            policy_id: PolicyId::from_key(&format!("policy-{index}")),
            policy_name: format!("policy-{index}"),
            consumption_mode: ConsumptionMode::ConsumeAhead,
            is_unlimited: false,
            balance,
            priority: *priority,
            approval: ApprovalConfig::default(),
        });
    }
    rb
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property 1 and 2: without overdraft nothing is invented or lost.
    #[test]
    fn prop_conservation_without_overdraft(
        balances in prop::collection::vec((available(), 0u32..5), 0..5),
        request in requested(),
    ) {
        let rb = resource(&balances);
        let requested = Amount::new(request, Unit::Days);
        let dist = ConsumptionDistributor::distribute(&rb, requested, false).unwrap();

        prop_assert_eq!(dist.total_allocated() + dist.shortfall, requested);
        prop_assert_eq!(dist.total_allocated(), requested.min(rb.total_available()));
        prop_assert_eq!(dist.is_satisfiable, dist.shortfall.is_zero());
        for allocation in &dist.allocations {
            prop_assert!(allocation.amount.is_positive());
        }
    }

    /// Property 3: overdraft books exactly the request when any policy exists.
    #[test]
    fn prop_overdraft_allocates_request(
        balances in prop::collection::vec((available(), 0u32..5), 1..5),
        request in requested(),
    ) {
        let rb = resource(&balances);
        let requested = Amount::new(request, Unit::Days);
        let dist = ConsumptionDistributor::distribute(&rb, requested, true).unwrap();

        prop_assert!(dist.is_satisfiable);
        prop_assert_eq!(dist.total_allocated(), requested);
        prop_assert!(dist.shortfall.is_zero());
    }

    /// Property 4: every requested day is either booked whole or unallocated.
    #[test]
    fn prop_days_are_whole(
        balances in prop::collection::vec((available(), 0u32..5), 0..4),
        count in 1usize..10,
        allow_negative in any::<bool>(),
    ) {
        let rb = resource(&balances);
        let start = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let days: Vec<NaiveDate> = start.iter_days().take(count).collect();
        let per_day = Amount::new(Decimal::ONE, Unit::Days);
        let dist = ConsumptionDistributor::distribute_days(&rb, &days, per_day, allow_negative)
            .unwrap();

        prop_assert_eq!(dist.days.len() + dist.unallocated.len(), count);
        prop_assert!(dist.days.iter().all(|d| d.amount == per_day));
        let booked = Amount::sum(Unit::Days, dist.days.iter().map(|d| d.amount));
        prop_assert_eq!(booked + dist.shortfall, dist.requested);
    }
}
