//! Balance projection.
//!
//! A [`Balance`] is never stored. It is recomputed from the transactions of
//! one period and the policy's accrual schedule whenever it is needed.

use std::collections::HashMap;

use accrue_shared::types::{Amount, TransactionId, Unit};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::transaction::Transaction;
use super::types::TransactionType;
use crate::accrual::AccrualSchedule;
use crate::period::{Period, TimePoint};
use crate::policy::ConsumptionMode;

/// Balance of one policy over one period, as of some instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// The period the balance covers.
    pub period: Period,
    /// Entitlement earned so far.
    pub accrued_to_date: Amount,
    /// Entitlement for the whole period.
    pub total_entitlement: Amount,
    /// Approved use.
    pub total_consumed: Amount,
    /// Use awaiting approval.
    pub pending: Amount,
    /// Reconciliation and adjustment deltas.
    pub adjustments: Amount,
}

impl Balance {
    /// A balance with every component zero.
    #[must_use]
    pub fn zero(period: Period, unit: Unit) -> Self {
        Self {
            period,
            accrued_to_date: Amount::zero(unit),
            total_entitlement: Amount::zero(unit),
            total_consumed: Amount::zero(unit),
            pending: Amount::zero(unit),
            adjustments: Amount::zero(unit),
        }
    }

    /// Unit of the balance.
    #[must_use]
    pub fn unit(&self) -> Unit {
        self.accrued_to_date.unit
    }

    /// Earned minus consumed plus adjustments. Pending holds are ignored.
    #[must_use]
    pub fn current_accrued(&self) -> Amount {
        self.accrued_to_date - self.total_consumed + self.adjustments
    }

    /// What can still be requested under `mode`.
    #[must_use]
    pub fn available_with_mode(&self, mode: ConsumptionMode) -> Amount {
        let base = match mode {
            ConsumptionMode::ConsumeAhead => self.total_entitlement,
            ConsumptionMode::ConsumeUpToAccrued => self.accrued_to_date,
        };
        base - self.total_consumed - self.pending + self.adjustments
    }
}

/// Folds transactions and an accrual schedule into a [`Balance`].
pub struct BalanceCalculator;

impl BalanceCalculator {
    /// Computes the balance of `period` as of `as_of`.
    ///
    /// Transactions outside the period are ignored. Accrual starts at the
    /// later of the period start and `hire_date`. Stored grants act as a
    /// floor for the computed accrual, never as an addition to it.
    ///
    /// A reversal folds into the bucket of its original when the original
    /// is part of `transactions`: pending holds into `pending`, grants into
    /// the grant floor, reconciliations and adjustments into `adjustments`.
    /// Otherwise it restores consumption.
    ///
    /// # Panics
    ///
    /// Panics if a transaction or the schedule is not in `unit`.
    #[must_use]
    pub fn calculate(
        transactions: &[Transaction],
        period: &Period,
        unit: Unit,
        schedule: Option<&AccrualSchedule>,
        as_of: TimePoint,
        hire_date: Option<NaiveDate>,
    ) -> Balance {
        let mut balance = Balance::zero(*period, unit);
        let in_period: Vec<&Transaction> = transactions
            .iter()
            .filter(|tx| period.contains(&tx.effective_at))
            .collect();
        let types: HashMap<TransactionId, TransactionType> =
            in_period.iter().map(|tx| (tx.id, tx.tx_type)).collect();

        let mut grants = Amount::zero(unit);
        for tx in &in_period {
            let delta = tx.delta;
            match tx.tx_type {
                TransactionType::Grant => grants += delta,
                TransactionType::Consumption => balance.total_consumed -= delta,
                TransactionType::Pending => balance.pending -= delta,
                TransactionType::Reconciliation | TransactionType::Adjustment => {
                    balance.adjustments += delta;
                }
                TransactionType::Reversal => {
                    match tx.reference_id.and_then(|id| types.get(&id)) {
                        Some(TransactionType::Pending) => balance.pending -= delta,
                        Some(TransactionType::Grant) => grants += delta,
                        Some(TransactionType::Reconciliation | TransactionType::Adjustment) => {
                            balance.adjustments += delta;
                        }
                        _ => balance.total_consumed -= delta,
                    }
                }
            }
        }

        let accrual_start = hire_date.map_or(period.start, |hire| {
            period.start.max(TimePoint::day(hire))
        });
        let accrued_until = as_of.start_of_day().min(period.end);

        balance.accrued_to_date = match schedule {
            Some(schedule) if accrual_start <= accrued_until => {
                grants.max(schedule.total(accrual_start, accrued_until))
            }
            _ => grants,
        };

        balance.total_entitlement = match schedule {
            Some(schedule) if schedule.is_deterministic() && accrual_start <= period.end => {
                schedule
                    .total(accrual_start, period.end)
                    .max(balance.accrued_to_date)
            }
            _ => balance.accrued_to_date,
        };

        balance
    }
}
