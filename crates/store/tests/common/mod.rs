//! Shared fixtures for store integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use accrue_core::accrual::AccrualFrequency;
use accrue_core::ledger::{Transaction, TransactionType};
use accrue_core::period::{PeriodConfig, TimePoint};
use accrue_core::policy::{
    AccrualDefinition, ApprovalConfig, ConsumptionMode, Constraints, Entity, PolicyAssignment,
    PolicyDefinition, ReconciliationAction, ReconciliationRule, ReconciliationTrigger,
    ResourceRegistry,
};
use accrue_shared::LedgerConfig;
use accrue_shared::types::{Amount, EntityId, PolicyId, Unit};
use accrue_store::{
    ConsumptionRequest, Directory, MemoryStore, ReconciliationRunner, RequestService,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn days(value: Decimal) -> Amount {
    Amount::new(value, Unit::Days)
}

/// Calendar-year PTO accruing `annual` days monthly, carrying over up to
/// `max_carryover` at period end and expiring the rest.
pub fn pto_policy(name: &str, annual: Decimal, max_carryover: Option<Decimal>) -> PolicyDefinition {
    PolicyDefinition {
        id: PolicyId::from_key(name),
        name: name.to_string(),
        resource_type: "pto".into(),
        unit: Unit::Days,
        period: PeriodConfig::CalendarYear,
        consumption_mode: ConsumptionMode::ConsumeAhead,
        constraints: Constraints::default(),
        reconciliation_rules: vec![ReconciliationRule {
            trigger: ReconciliationTrigger::PeriodEnd,
            actions: vec![
                ReconciliationAction::Carryover { max_carryover },
                ReconciliationAction::Expire,
            ],
        }],
        is_unlimited: false,
        accrual: Some(AccrualDefinition::Yearly {
            annual_quantity: annual,
            frequency: AccrualFrequency::Monthly,
        }),
    }
}

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub registry: Arc<ResourceRegistry>,
    pub alice: Entity,
}

impl Fixture {
    pub async fn new() -> Self {
        let registry = Arc::new(ResourceRegistry::with_defaults());
        let store = Arc::new(MemoryStore::with_registry(&registry));
        let alice = Entity {
            id: EntityId::from_key("alice"),
            name: "Alice".into(),
            hire_date: Some(date(2020, 1, 1)),
        };
        store.put_entity(alice.clone()).await.unwrap();
        Self {
            store,
            registry,
            alice,
        }
    }

    pub async fn assign(
        &self,
        policy: PolicyDefinition,
        from: NaiveDate,
        priority: u32,
        approval: ApprovalConfig,
    ) -> PolicyAssignment {
        let assignment =
            PolicyAssignment::new(self.alice.id, policy.id, from, priority).with_approval(approval);
        self.store.put_policy(policy).await.unwrap();
        self.store.put_assignment(assignment.clone()).await.unwrap();
        assignment
    }

    /// Assigns `policy` at priority zero without approval.
    pub async fn assign_from(&self, policy: PolicyDefinition, from: NaiveDate) -> PolicyAssignment {
        self.assign(policy, from, 0, ApprovalConfig::default()).await
    }

    pub fn requests(&self) -> RequestService<MemoryStore> {
        RequestService::new(
            Arc::clone(&self.store),
            Arc::clone(&self.registry),
            LedgerConfig::default(),
        )
    }

    pub fn runner(&self) -> ReconciliationRunner<MemoryStore> {
        ReconciliationRunner::new(
            Arc::clone(&self.store),
            Arc::clone(&self.registry),
            &LedgerConfig::default(),
        )
    }

    pub fn request(&self, key: &str, requested: &[NaiveDate]) -> ConsumptionRequest {
        ConsumptionRequest {
            entity_id: self.alice.id,
            resource_type: "pto".into(),
            days: requested.to_vec(),
            amount_per_day: Decimal::ONE,
            reason: "vacation".into(),
            idempotency_key: key.into(),
            submitted_on: requested.first().copied().unwrap_or(date(2025, 1, 1)),
        }
    }

    pub fn transaction(
        &self,
        policy: &str,
        tx_type: TransactionType,
        on: NaiveDate,
        value: Decimal,
        key: &str,
    ) -> Transaction {
        Transaction::builder(
            self.alice.id,
            PolicyId::from_key(policy),
            "pto",
            tx_type,
            TimePoint::day(on),
            days(value),
        )
        .idempotency_key(key)
        .build()
        .unwrap()
    }
}
