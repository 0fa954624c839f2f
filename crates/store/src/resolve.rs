//! Per-entity policy resolution.

use accrue_core::ledger::{Balance, BalanceCalculator};
use accrue_core::period::{Period, TimePoint};
use accrue_core::policy::{Entity, Policy, PolicyParser, ResourceRegistry};
use accrue_shared::types::{EntityId, PolicyId};
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::contract::LedgerView;
use crate::error::StoreError;

/// Turns stored policy definitions into runtime policies for one entity.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PolicyResolver<'a> {
    pub registry: &'a ResourceRegistry,
    pub hours_per_day: Decimal,
}

impl PolicyResolver<'_> {
    pub fn entity(view: &dyn LedgerView, id: EntityId) -> Result<Entity, StoreError> {
        view.entity(id)
            .ok_or_else(|| StoreError::NotFound(format!("entity {id}")))
    }

    pub fn policy(
        &self,
        view: &dyn LedgerView,
        entity: &Entity,
        id: PolicyId,
    ) -> Result<Policy, StoreError> {
        let definition = view
            .policy(id)
            .ok_or_else(|| StoreError::NotFound(format!("policy {id}")))?;
        let policy = PolicyParser::new(self.registry)
            .with_hire_date(entity.hire_date)
            .with_hours_worked(view.hours_worked(entity.id))
            .with_hours_per_day(self.hours_per_day)
            .parse(&definition)?;
        Ok(policy)
    }

    /// Balance of `policy` over `period`; nothing accrues before the
    /// assignment started or the entity was hired.
    pub fn balance(
        view: &dyn LedgerView,
        entity: &Entity,
        policy: &Policy,
        period: &Period,
        as_of: TimePoint,
        assigned_from: NaiveDate,
    ) -> Balance {
        let transactions = view.transactions(entity.id, policy.id);
        let accrues_from = entity
            .hire_date
            .map_or(assigned_from, |hire| hire.max(assigned_from));
        BalanceCalculator::calculate(
            &transactions,
            period,
            policy.unit,
            policy.accrual.as_ref(),
            as_of,
            Some(accrues_from),
        )
    }
}
