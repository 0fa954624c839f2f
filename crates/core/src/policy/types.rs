//! Policy domain types.

use accrue_shared::types::{PolicyId, Unit};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::registry::ResourceType;
use crate::accrual::AccrualSchedule;
use crate::ledger::LedgerError;
use crate::period::{Period, PeriodConfig, PeriodError};

/// How much of the period's entitlement may be consumed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumptionMode {
    /// The full period entitlement, including accrual not yet earned.
    #[default]
    ConsumeAhead,
    /// Only what has been earned so far.
    ConsumeUpToAccrued,
}

/// Limits applied to balances and requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraints {
    /// Ceiling enforced by the `cap` reconciliation action.
    #[serde(default)]
    pub max_balance: Option<Decimal>,
    /// Smallest amount a single request may ask for.
    #[serde(default)]
    pub min_request: Option<Decimal>,
    /// Largest amount a single request may ask for.
    #[serde(default)]
    pub max_request: Option<Decimal>,
    /// Whether requests may overdraw the balance.
    #[serde(default)]
    pub allow_negative: bool,
}

impl Constraints {
    /// Checks a request total against the request bounds.
    pub fn validate_request(&self, requested: Decimal) -> Result<(), LedgerError> {
        if let Some(minimum) = self.min_request
            && requested < minimum
        {
            return Err(LedgerError::RequestBelowMinimum { requested, minimum });
        }
        if let Some(maximum) = self.max_request
            && requested > maximum
        {
            return Err(LedgerError::RequestAboveMaximum { requested, maximum });
        }
        Ok(())
    }
}

/// Event that fires a reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationTrigger {
    /// The period reached its last day.
    PeriodEnd,
    /// The entity moved to another policy mid-period.
    PolicyChange,
    /// The entity joined mid-period.
    EntityJoin,
    /// Run on demand.
    Manual,
}

impl ReconciliationTrigger {
    /// Returns the snake_case name of the trigger.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PeriodEnd => "period_end",
            Self::PolicyChange => "policy_change",
            Self::EntityJoin => "entity_join",
            Self::Manual => "manual",
        }
    }
}

impl std::fmt::Display for ReconciliationTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of a reconciliation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReconciliationAction {
    /// Move the remaining balance, up to `max_carryover`, into the next period.
    Carryover {
        /// Upper bound on the carried amount; unlimited when absent.
        #[serde(default)]
        max_carryover: Option<Decimal>,
    },
    /// Let whatever remains lapse.
    Expire,
    /// Clamp the remaining balance to `constraints.max_balance`.
    Cap,
    /// Scale later carryover limits by the covered fraction of the period.
    Prorate,
}

impl ReconciliationAction {
    /// Returns the snake_case name of the action.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Carryover { .. } => "carryover",
            Self::Expire => "expire",
            Self::Cap => "cap",
            Self::Prorate => "prorate",
        }
    }
}

/// Ordered actions fired by a trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationRule {
    /// When the rule fires.
    pub trigger: ReconciliationTrigger,
    /// Actions applied in declared order.
    pub actions: Vec<ReconciliationAction>,
}

/// A named rule set governing one resource pool.
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    /// Policy identifier.
    pub id: PolicyId,
    /// Display name.
    pub name: String,
    /// Resource type name.
    pub resource_type: String,
    /// Unit of every amount under this policy.
    pub unit: Unit,
    /// How time is sliced into periods.
    pub period_config: PeriodConfig,
    /// Availability rule.
    pub consumption_mode: ConsumptionMode,
    /// Balance and request limits.
    pub constraints: Constraints,
    /// Period-boundary rules.
    pub reconciliation_rules: Vec<ReconciliationRule>,
    /// Requests are always satisfiable.
    pub is_unlimited: bool,
    /// Copied from the resource type.
    pub unique_per_time_point: bool,
    /// Entitlement schedule, if any.
    pub accrual: Option<AccrualSchedule>,
}

impl Policy {
    /// Creates a policy for `resource` with default settings and no accrual.
    pub fn new(id: PolicyId, name: impl Into<String>, resource: &ResourceType) -> Self {
        Self {
            id,
            name: name.into(),
            resource_type: resource.name.clone(),
            unit: resource.unit,
            period_config: PeriodConfig::default(),
            consumption_mode: ConsumptionMode::default(),
            constraints: Constraints::default(),
            reconciliation_rules: Vec::new(),
            is_unlimited: false,
            unique_per_time_point: resource.unique_per_time_point,
            accrual: None,
        }
    }

    /// Actions of every rule matching `trigger`, in declared order.
    pub fn actions_for(
        &self,
        trigger: ReconciliationTrigger,
    ) -> impl Iterator<Item = &ReconciliationAction> {
        self.reconciliation_rules
            .iter()
            .filter(move |r| r.trigger == trigger)
            .flat_map(|r| r.actions.iter())
    }

    /// The period containing `date` for an entity hired on `hire_date`.
    pub fn period_for(
        &self,
        date: NaiveDate,
        hire_date: Option<NaiveDate>,
    ) -> Result<Period, PeriodError> {
        self.period_config.period_for(date, hire_date)
    }
}
