//! Reconciliation inputs and outputs.

use accrue_shared::types::{Amount, EntityId, PolicyId, Unit};
use serde::{Deserialize, Serialize};

use crate::ledger::{Balance, Transaction};
use crate::period::Period;
use crate::policy::{Policy, ReconciliationTrigger};

/// Everything the engine needs to settle one policy at a boundary.
#[derive(Debug, Clone)]
pub struct ReconciliationInput<'a> {
    /// The entity.
    pub entity_id: EntityId,
    /// The policy being settled.
    pub policy_id: PolicyId,
    /// Its rules and constraints.
    pub policy: &'a Policy,
    /// Balance as of the last day of the ending period.
    pub current_balance: Balance,
    /// The period being closed.
    pub ending_period: Period,
    /// The period carryover lands in.
    pub next_period: Period,
    /// What fired the reconciliation.
    pub trigger: ReconciliationTrigger,
    /// Policy active in the next period; the same policy when absent.
    pub next_policy_id: Option<PolicyId>,
}

/// Totals of one reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    /// Moved into the next period.
    pub carried_over: Amount,
    /// Lapsed without a transaction.
    pub expired: Amount,
    /// Removed by the cap action.
    pub capped: Amount,
    /// Left untouched after all actions.
    pub retained: Amount,
}

impl ReconciliationSummary {
    /// A summary with every total zero.
    #[must_use]
    pub fn zero(unit: Unit) -> Self {
        Self {
            carried_over: Amount::zero(unit),
            expired: Amount::zero(unit),
            capped: Amount::zero(unit),
            retained: Amount::zero(unit),
        }
    }

    /// Sum of every bucket.
    #[must_use]
    pub fn total(&self) -> Amount {
        self.carried_over + self.expired + self.capped + self.retained
    }
}

/// Transactions to append atomically plus their summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationOutput {
    /// Transactions to append, in action order.
    pub transactions: Vec<Transaction>,
    /// Totals.
    pub summary: ReconciliationSummary,
}
