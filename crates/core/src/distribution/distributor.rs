//! Multi-policy consumption distributor.

use accrue_shared::types::{Amount, AmountError};
use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::types::{
    Allocation, ConsumptionDistribution, DayAllocation, DayDistribution, PolicyBalance,
    ResourceBalance,
};
use crate::ledger::LedgerError;

/// Splits requests across an entity's prioritized policy balances.
pub struct ConsumptionDistributor;

impl ConsumptionDistributor {
    /// Allocates `requested` across policies in ascending priority.
    ///
    /// Policies with nothing available are skipped and unlimited policies
    /// absorb whatever remains. A leftover is booked against the first
    /// policy as an overdraft when `allow_negative`; otherwise it is
    /// reported as the shortfall. Insufficiency is never an error.
    pub fn distribute(
        resource_balance: &ResourceBalance,
        requested: Amount,
        allow_negative: bool,
    ) -> Result<ConsumptionDistribution, LedgerError> {
        ensure_unit(resource_balance, requested)?;
        let unit = requested.unit;
        let ordered = resource_balance.by_priority();

        let mut allocations: Vec<(&PolicyBalance, Amount)> = Vec::new();
        let mut remaining = requested;

        for pb in ordered.iter().copied() {
            if !remaining.is_positive() {
                break;
            }
            let take = if pb.is_unlimited {
                remaining
            } else {
                let available = pb.available();
                if !available.is_positive() {
                    continue;
                }
                remaining.min(available)
            };
            allocations.push((pb, take));
            remaining -= take;
        }

        let mut is_satisfiable = !remaining.is_positive();
        let mut shortfall = Amount::zero(unit);
        if !is_satisfiable {
            match ordered.first() {
                Some(&first) if allow_negative => {
                    match allocations
                        .iter_mut()
                        .find(|(pb, _)| pb.policy_id == first.policy_id)
                    {
                        Some((_, amount)) => *amount += remaining,
                        None => allocations.insert(0, (first, remaining)),
                    }
                    is_satisfiable = true;
                }
                _ => shortfall = remaining,
            }
        }

        Ok(ConsumptionDistribution {
            requested,
            allocations: allocations
                .into_iter()
                .map(|(pb, amount)| Allocation {
                    policy_id: pb.policy_id,
                    amount,
                    requires_approval: pb.approval.requires_approval_for(amount.value),
                })
                .collect(),
            is_satisfiable,
            shortfall,
        })
    }

    /// Assigns each requested day, whole, to the first policy that can
    /// cover `per_day`.
    ///
    /// Keeping a day on a single policy means one consumption row per day,
    /// which is what day-unique resources require.
    pub fn distribute_days(
        resource_balance: &ResourceBalance,
        days: &[NaiveDate],
        per_day: Amount,
        allow_negative: bool,
    ) -> Result<DayDistribution, LedgerError> {
        ensure_unit(resource_balance, per_day)?;
        let unit = per_day.unit;
        let ordered = resource_balance.by_priority();
        let mut available: Vec<Amount> = ordered.iter().map(|pb| pb.available()).collect();

        let mut booked: Vec<(NaiveDate, usize)> = Vec::new();
        let mut unallocated = Vec::new();
        for day in days {
            let slot = ordered
                .iter()
                .zip(&available)
                .position(|(pb, left)| pb.is_unlimited || *left >= per_day)
                .or_else(|| (allow_negative && !ordered.is_empty()).then_some(0));
            match slot {
                Some(index) => {
                    available[index] -= per_day;
                    booked.push((*day, index));
                }
                None => unallocated.push(*day),
            }
        }

        // Approval thresholds apply to each policy's share of the request.
        let mut shares = vec![Amount::zero(unit); ordered.len()];
        for (_, index) in &booked {
            shares[*index] += per_day;
        }

        let count = |n: usize| Amount::new(per_day.value * Decimal::from(n), unit);
        Ok(DayDistribution {
            requested: count(days.len()),
            days: booked
                .into_iter()
                .map(|(day, index)| DayAllocation {
                    day,
                    policy_id: ordered[index].policy_id,
                    amount: per_day,
                    requires_approval: ordered[index]
                        .approval
                        .requires_approval_for(shares[index].value),
                })
                .collect(),
            is_satisfiable: unallocated.is_empty(),
            shortfall: count(unallocated.len()),
            unallocated,
        })
    }
}

fn ensure_unit(resource_balance: &ResourceBalance, amount: Amount) -> Result<(), LedgerError> {
    if resource_balance.unit == amount.unit {
        Ok(())
    } else {
        Err(AmountError::UnitMismatch {
            expected: resource_balance.unit,
            actual: amount.unit,
        }
        .into())
    }
}
