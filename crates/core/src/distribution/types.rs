//! Distribution inputs and outputs.

use accrue_shared::types::{Amount, EntityId, PolicyId, Unit};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ledger::Balance;
use crate::policy::{ApprovalConfig, ConsumptionMode};

/// One policy's balance, tagged with the assignment that grants it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyBalance {
    /// The policy.
    pub policy_id: PolicyId,
    /// Policy display name.
    pub policy_name: String,
    /// Availability rule of the policy.
    pub consumption_mode: ConsumptionMode,
    /// Unlimited policies absorb any remainder.
    pub is_unlimited: bool,
    /// Current balance.
    pub balance: Balance,
    /// Lower numbers are consumed first.
    pub priority: u32,
    /// Approval settings of the assignment.
    pub approval: ApprovalConfig,
}

impl PolicyBalance {
    /// What can still be requested from this policy.
    #[must_use]
    pub fn available(&self) -> Amount {
        self.balance.available_with_mode(self.consumption_mode)
    }
}

/// All of an entity's policy balances for one resource type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceBalance {
    /// The entity.
    pub entity_id: EntityId,
    /// The resource type.
    pub resource_type: String,
    /// Unit shared by every policy balance.
    pub unit: Unit,
    /// Per-policy balances.
    pub policy_balances: Vec<PolicyBalance>,
}

impl ResourceBalance {
    /// Creates an empty resource balance.
    #[must_use]
    pub fn new(entity_id: EntityId, resource_type: impl Into<String>, unit: Unit) -> Self {
        Self {
            entity_id,
            resource_type: resource_type.into(),
            unit,
            policy_balances: Vec::new(),
        }
    }

    /// Policy balances in ascending priority; ties keep insertion order.
    #[must_use]
    pub fn by_priority(&self) -> Vec<&PolicyBalance> {
        let mut sorted: Vec<&PolicyBalance> = self.policy_balances.iter().collect();
        sorted.sort_by_key(|pb| pb.priority);
        sorted
    }

    /// Sum of the positive availability of every limited policy.
    #[must_use]
    pub fn total_available(&self) -> Amount {
        Amount::sum(
            self.unit,
            self.policy_balances
                .iter()
                .filter(|pb| !pb.is_unlimited)
                .map(PolicyBalance::available)
                .filter(Amount::is_positive),
        )
    }

    /// Returns true if any policy is unlimited.
    #[must_use]
    pub fn has_unlimited(&self) -> bool {
        self.policy_balances.iter().any(|pb| pb.is_unlimited)
    }
}

/// Part of a request drawn from one policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    /// Source policy.
    pub policy_id: PolicyId,
    /// Amount drawn.
    pub amount: Amount,
    /// Whether the allocation needs approval.
    pub requires_approval: bool,
}

/// Result of splitting a requested amount across policies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumptionDistribution {
    /// The requested amount.
    pub requested: Amount,
    /// Allocations in priority order.
    pub allocations: Vec<Allocation>,
    /// Whether the whole request can be booked.
    pub is_satisfiable: bool,
    /// Part of the request that could not be allocated.
    pub shortfall: Amount,
}

impl ConsumptionDistribution {
    /// Sum of all allocations.
    #[must_use]
    pub fn total_allocated(&self) -> Amount {
        Amount::sum(self.requested.unit, self.allocations.iter().map(|a| a.amount))
    }

    /// Returns true if any allocation needs approval.
    #[must_use]
    pub fn requires_approval(&self) -> bool {
        self.allocations.iter().any(|a| a.requires_approval)
    }
}

/// One requested day booked against one policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayAllocation {
    /// The calendar day.
    pub day: NaiveDate,
    /// Source policy.
    pub policy_id: PolicyId,
    /// Amount drawn for the day.
    pub amount: Amount,
    /// Whether the policy's share of the request needs approval.
    pub requires_approval: bool,
}

/// Result of assigning whole days to policies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayDistribution {
    /// Total requested.
    pub requested: Amount,
    /// Booked days in request order.
    pub days: Vec<DayAllocation>,
    /// Days no policy could cover.
    pub unallocated: Vec<NaiveDate>,
    /// Whether every day can be booked.
    pub is_satisfiable: bool,
    /// Amount of the unallocated days.
    pub shortfall: Amount,
}

impl DayDistribution {
    /// Per-policy totals in first-use order.
    #[must_use]
    pub fn allocations(&self) -> Vec<Allocation> {
        let mut totals: Vec<Allocation> = Vec::new();
        for day in &self.days {
            match totals.iter_mut().find(|a| a.policy_id == day.policy_id) {
                Some(total) => total.amount += day.amount,
                None => totals.push(Allocation {
                    policy_id: day.policy_id,
                    amount: day.amount,
                    requires_approval: day.requires_approval,
                }),
            }
        }
        totals
    }
}
