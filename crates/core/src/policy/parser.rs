//! Policy definitions and parsing into runtime policies.
//!
//! Definitions are the persisted JSON form. Parsing resolves the resource
//! type, validates the rule set and builds the accrual schedule for one
//! entity, so configuration errors surface here and never at transaction
//! time.

use accrue_shared::types::{Amount, DEFAULT_HOURS_PER_DAY, PolicyId, Unit};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::PolicyError;
use super::registry::ResourceRegistry;
use super::types::{
    ConsumptionMode, Constraints, Policy, ReconciliationAction, ReconciliationRule,
};
use crate::accrual::{
    AccrualFrequency, AccrualSchedule, HoursWorkedAccrual, HoursWorkedRecord, TenureAccrual,
    TenureTier, YearlyAccrual,
};
use crate::period::PeriodConfig;

/// Accrual section of a policy definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AccrualDefinition {
    /// Fixed annual quantity.
    Yearly {
        /// Quantity per accrual year.
        annual_quantity: Decimal,
        /// Payout frequency.
        #[serde(default)]
        frequency: AccrualFrequency,
    },
    /// Annual quantity from service-year tiers.
    Tenure {
        /// Tier ladder.
        tiers: Vec<TenureTier>,
        /// Payout frequency.
        #[serde(default)]
        frequency: AccrualFrequency,
    },
    /// Earned from payroll hours.
    HoursWorked {
        /// Hours granted per block.
        granted_hours: Decimal,
        /// Size of a block of worked hours.
        per_hours_worked: Decimal,
        /// Optional cap per calendar year.
        #[serde(default)]
        max_per_year: Option<Decimal>,
    },
}

/// Persisted form of a policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDefinition {
    /// Policy identifier.
    pub id: PolicyId,
    /// Display name.
    pub name: String,
    /// Registered resource type name.
    pub resource_type: String,
    /// Unit; must match the resource type.
    pub unit: Unit,
    /// Period configuration.
    #[serde(default)]
    pub period: PeriodConfig,
    /// Availability rule.
    #[serde(default)]
    pub consumption_mode: ConsumptionMode,
    /// Balance and request limits.
    #[serde(default)]
    pub constraints: Constraints,
    /// Period-boundary rules.
    #[serde(default)]
    pub reconciliation_rules: Vec<ReconciliationRule>,
    /// Requests are always satisfiable.
    #[serde(default)]
    pub is_unlimited: bool,
    /// Entitlement schedule.
    #[serde(default)]
    pub accrual: Option<AccrualDefinition>,
}

impl PolicyDefinition {
    /// Decodes a definition from JSON.
    pub fn from_json(json: &str) -> Result<Self, PolicyError> {
        serde_json::from_str(json).map_err(|e| PolicyError::Malformed(e.to_string()))
    }

    /// Checks everything that does not depend on a particular entity.
    pub fn validate(&self, registry: &ResourceRegistry) -> Result<(), PolicyError> {
        let resource = registry
            .get(&self.resource_type)
            .ok_or_else(|| PolicyError::UnknownResourceType(self.resource_type.clone()))?;
        if resource.unit != self.unit {
            return Err(PolicyError::UnitMismatch {
                resource_type: self.resource_type.clone(),
                expected: resource.unit,
                actual: self.unit,
            });
        }
        self.period.validate()?;
        for rule in &self.reconciliation_rules {
            validate_rule(rule)?;
        }
        Ok(())
    }
}

fn validate_rule(rule: &ReconciliationRule) -> Result<(), PolicyError> {
    let last = rule.actions.len().saturating_sub(1);
    for (index, action) in rule.actions.iter().enumerate() {
        match action {
            ReconciliationAction::Expire if index != last => {
                return Err(PolicyError::InvalidRule(format!(
                    "expire must be the last {} action",
                    rule.trigger
                )));
            }
            ReconciliationAction::Carryover {
                max_carryover: Some(max),
            } if *max < Decimal::ZERO => {
                return Err(PolicyError::InvalidRule(format!(
                    "max_carryover cannot be negative, got {max}"
                )));
            }
            _ => {}
        }
    }
    Ok(())
}

/// Builds runtime policies for one entity.
#[derive(Debug, Clone)]
pub struct PolicyParser<'a> {
    registry: &'a ResourceRegistry,
    hire_date: Option<NaiveDate>,
    hours_worked: Vec<HoursWorkedRecord>,
    hours_per_day: Decimal,
}

impl<'a> PolicyParser<'a> {
    /// Creates a parser backed by `registry`.
    #[must_use]
    pub fn new(registry: &'a ResourceRegistry) -> Self {
        Self {
            registry,
            hire_date: None,
            hours_worked: Vec::new(),
            hours_per_day: DEFAULT_HOURS_PER_DAY,
        }
    }

    /// Sets the entity's hire date.
    #[must_use]
    pub fn with_hire_date(mut self, hire_date: Option<NaiveDate>) -> Self {
        self.hire_date = hire_date;
        self
    }

    /// Sets the entity's observed payroll records.
    #[must_use]
    pub fn with_hours_worked(mut self, records: Vec<HoursWorkedRecord>) -> Self {
        self.hours_worked = records;
        self
    }

    /// Sets the hours-to-days conversion factor.
    #[must_use]
    pub fn with_hours_per_day(mut self, hours_per_day: Decimal) -> Self {
        self.hours_per_day = hours_per_day;
        self
    }

    /// Parses a definition into a runtime policy.
    pub fn parse(&self, definition: &PolicyDefinition) -> Result<Policy, PolicyError> {
        definition.validate(self.registry)?;
        let resource = self
            .registry
            .get(&definition.resource_type)
            .ok_or_else(|| PolicyError::UnknownResourceType(definition.resource_type.clone()))?;

        if definition.period == PeriodConfig::Anniversary && self.hire_date.is_none() {
            return Err(PolicyError::MissingHireDate(definition.name.clone()));
        }

        let accrual = definition
            .accrual
            .as_ref()
            .map(|a| self.build_accrual(definition, a))
            .transpose()?;

        let mut policy = Policy::new(definition.id, definition.name.clone(), resource);
        policy.period_config = definition.period;
        policy.consumption_mode = definition.consumption_mode;
        policy.constraints = definition.constraints;
        policy.reconciliation_rules.clone_from(&definition.reconciliation_rules);
        policy.is_unlimited = definition.is_unlimited;
        policy.accrual = accrual;
        Ok(policy)
    }

    /// Decodes and parses a JSON definition.
    pub fn parse_json(&self, json: &str) -> Result<Policy, PolicyError> {
        self.parse(&PolicyDefinition::from_json(json)?)
    }

    fn build_accrual(
        &self,
        definition: &PolicyDefinition,
        accrual: &AccrualDefinition,
    ) -> Result<AccrualSchedule, PolicyError> {
        let unit = definition.unit;
        let year_start_month = definition.period.year_start_month(self.hire_date);
        let schedule = match accrual {
            AccrualDefinition::Yearly {
                annual_quantity,
                frequency,
            } => AccrualSchedule::Yearly(
                YearlyAccrual::new(Amount::new(*annual_quantity, unit), *frequency)?
                    .with_year_start_month(year_start_month)?,
            ),
            AccrualDefinition::Tenure { tiers, frequency } => {
                let hire_date = self
                    .hire_date
                    .ok_or_else(|| PolicyError::MissingHireDate(definition.name.clone()))?;
                AccrualSchedule::Tenure(
                    TenureAccrual::new(tiers.clone(), unit, *frequency, hire_date)?
                        .with_year_start_month(year_start_month)?,
                )
            }
            AccrualDefinition::HoursWorked {
                granted_hours,
                per_hours_worked,
                max_per_year,
            } => {
                let mut schedule = HoursWorkedAccrual::new(*granted_hours, *per_hours_worked, unit)?
                    .with_hours_per_day(self.hours_per_day)
                    .with_records(self.hours_worked.clone());
                if let Some(max) = max_per_year {
                    schedule = schedule.with_max_per_year(*max);
                }
                AccrualSchedule::HoursWorked(schedule)
            }
        };
        Ok(schedule)
    }
}
