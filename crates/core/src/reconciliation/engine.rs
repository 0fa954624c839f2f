//! Period-boundary reconciliation.
//!
//! The engine is a pure function of its input: it reads the ending balance,
//! walks the policy's actions for the trigger in declared order and returns
//! the transactions to append. Ids and idempotency keys derive from
//! `(entity, policy, ending period end, action index)`, so a replay yields
//! identical rows that the store rejects as duplicates.

use accrue_shared::types::{Amount, PolicyId};
use rust_decimal::{Decimal, RoundingStrategy};

use super::error::ReconciliationError;
use super::types::{ReconciliationInput, ReconciliationOutput, ReconciliationSummary};
use crate::accrual::ACCRUAL_SCALE;
use crate::ledger::{Transaction, TransactionType};
use crate::period::TimePoint;
use crate::policy::ReconciliationAction;

/// Applies reconciliation rules at period boundaries.
pub struct ReconciliationEngine;

impl ReconciliationEngine {
    /// Settles one policy for one entity.
    ///
    /// A non-positive `current_accrued` produces no transactions: negative
    /// balances are neither carried nor expired.
    pub fn process(
        input: &ReconciliationInput<'_>,
    ) -> Result<ReconciliationOutput, ReconciliationError> {
        let unit = input.policy.unit;
        if input.current_balance.unit() != unit {
            return Err(ReconciliationError::UnitMismatch {
                expected: unit,
                actual: input.current_balance.unit(),
            });
        }
        if input.next_period.start <= input.ending_period.end {
            return Err(ReconciliationError::InvalidPeriods {
                ending_end: input.ending_period.end_date(),
                next_start: input.next_period.start_date(),
            });
        }

        let mut summary = ReconciliationSummary::zero(unit);
        let mut transactions = Vec::new();
        let mut remaining = input.current_balance.current_accrued();
        if !remaining.is_positive() {
            return Ok(ReconciliationOutput {
                transactions,
                summary,
            });
        }

        let mut prorate_factor = Decimal::ONE;
        for (index, action) in input.policy.actions_for(input.trigger).enumerate() {
            match *action {
                ReconciliationAction::Carryover { max_carryover } => {
                    let carry = max_carryover.map_or(remaining, |max| {
                        let limit = (max * prorate_factor)
                            .round_dp_with_strategy(ACCRUAL_SCALE, RoundingStrategy::ToZero);
                        remaining.min(Amount::new(limit, unit))
                    });
                    if carry.is_positive() {
                        let target = input.next_policy_id.unwrap_or(input.policy_id);
                        transactions.push(Self::transaction(
                            input,
                            index,
                            action,
                            TransactionType::Reconciliation,
                            target,
                            input.next_period.start,
                            carry,
                            format!("Carryover from period ending {}", input.ending_period.end),
                        )?);
                        summary.carried_over += carry;
                        remaining -= carry;
                    }
                }
                ReconciliationAction::Expire => {
                    summary.expired += remaining;
                    remaining = Amount::zero(unit);
                }
                ReconciliationAction::Cap => {
                    let Some(max_balance) = input.policy.constraints.max_balance else {
                        continue;
                    };
                    let max = Amount::new(max_balance.max(Decimal::ZERO), unit);
                    if remaining > max {
                        let excess = remaining - max;
                        transactions.push(Self::transaction(
                            input,
                            index,
                            action,
                            TransactionType::Adjustment,
                            input.policy_id,
                            input.ending_period.end,
                            -excess,
                            format!("Balance capped at {max}"),
                        )?);
                        summary.capped += excess;
                        remaining = max;
                    }
                }
                ReconciliationAction::Prorate => {
                    prorate_factor = input.ending_period.coverage_fraction();
                }
            }
        }
        summary.retained = remaining;

        Ok(ReconciliationOutput {
            transactions,
            summary,
        })
    }

    /// Idempotency key of the transaction written by the action at `index`.
    #[must_use]
    pub fn idempotency_key(input: &ReconciliationInput<'_>, index: usize, kind: &str) -> String {
        format!(
            "reconcile:{}:{}:{}:{index}:{kind}",
            input.entity_id,
            input.policy_id,
            input.ending_period.end.day_key()
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn transaction(
        input: &ReconciliationInput<'_>,
        index: usize,
        action: &ReconciliationAction,
        tx_type: TransactionType,
        policy_id: PolicyId,
        effective_at: TimePoint,
        delta: Amount,
        reason: String,
    ) -> Result<Transaction, ReconciliationError> {
        let tx = Transaction::builder(
            input.entity_id,
            policy_id,
            input.policy.resource_type.clone(),
            tx_type,
            effective_at,
            delta.normalized(),
        )
        .reason(reason)
        .idempotency_key(Self::idempotency_key(input, index, action.kind()))
        .metadata("trigger", input.trigger.as_str())
        .metadata("action", action.kind())
        .metadata("source_policy_id", input.policy_id.to_string())
        .metadata("ending_period", input.ending_period.to_string())
        .build()?;
        Ok(tx)
    }
}
