//! Entities and their policy assignments.

use accrue_shared::types::{AssignmentId, EntityId, PolicyId};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::PolicyError;

/// A resource holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Entity identifier.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Start of service; anchors anniversary periods and tenure.
    #[serde(default)]
    pub hire_date: Option<NaiveDate>,
}

/// When allocations drawn from an assignment need sign-off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalConfig {
    /// Allocations need approval.
    #[serde(default)]
    pub requires_approval: bool,
    /// Allocations up to and including this amount are auto-approved.
    #[serde(default)]
    pub auto_approve_up_to: Option<Decimal>,
}

impl ApprovalConfig {
    /// Returns true if an allocation of `amount` needs approval.
    #[must_use]
    pub fn requires_approval_for(&self, amount: Decimal) -> bool {
        self.requires_approval && self.auto_approve_up_to.is_none_or(|limit| amount > limit)
    }
}

/// Links an entity to a policy over a date range.
///
/// Only `effective_to` changes after creation; a policy change closes one
/// assignment and opens another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyAssignment {
    /// Assignment identifier.
    pub id: AssignmentId,
    /// The entity.
    pub entity_id: EntityId,
    /// The policy.
    pub policy_id: PolicyId,
    /// First day the assignment applies.
    pub effective_from: NaiveDate,
    /// Last day the assignment applies; open-ended when absent.
    #[serde(default)]
    pub effective_to: Option<NaiveDate>,
    /// Lower numbers are consumed first.
    #[serde(default)]
    pub consumption_priority: u32,
    /// Approval settings.
    #[serde(default)]
    pub approval: ApprovalConfig,
}

impl PolicyAssignment {
    /// Opens an assignment starting on `effective_from`.
    #[must_use]
    pub fn new(
        entity_id: EntityId,
        policy_id: PolicyId,
        effective_from: NaiveDate,
        consumption_priority: u32,
    ) -> Self {
        Self {
            id: AssignmentId::new(),
            entity_id,
            policy_id,
            effective_from,
            effective_to: None,
            consumption_priority,
            approval: ApprovalConfig::default(),
        }
    }

    /// Sets the approval configuration.
    #[must_use]
    pub fn with_approval(mut self, approval: ApprovalConfig) -> Self {
        self.approval = approval;
        self
    }

    /// Closes the assignment so that `last_day` is its final day.
    pub fn close(&mut self, last_day: NaiveDate) -> Result<(), PolicyError> {
        if last_day < self.effective_from {
            return Err(PolicyError::InvalidAssignment(format!(
                "cannot close assignment {} on {last_day}, it starts on {}",
                self.id, self.effective_from
            )));
        }
        if let Some(existing) = self.effective_to
            && existing < last_day
        {
            return Err(PolicyError::InvalidAssignment(format!(
                "assignment {} already closed on {existing}",
                self.id
            )));
        }
        self.effective_to = Some(last_day);
        Ok(())
    }

    /// Returns true if the assignment applies on `date`.
    #[must_use]
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        date >= self.effective_from && self.effective_to.is_none_or(|end| date <= end)
    }
}
