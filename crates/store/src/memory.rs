//! In-memory store.
//!
//! All state lives behind one `tokio::sync::RwLock`. Readers share the lock,
//! writers hold it exclusively. Batches and scoped transactions write to the
//! live state through a journal of undo steps; unless the batch commits, the
//! steps are replayed in reverse when the journal is dropped.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use accrue_core::accrual::HoursWorkedRecord;
use accrue_core::ledger::{LedgerError, ReversalService, Transaction, TransactionType};
use accrue_core::period::TimePoint;
use accrue_core::policy::{Entity, PolicyAssignment, PolicyDefinition, ResourceRegistry};
use accrue_shared::types::{AmountError, AssignmentId, EntityId, PolicyId, TransactionId, Unit};
use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;
use tracing::debug;

use crate::contract::{
    Directory, EntityLedgerStore, LedgerStore, LedgerView, RunRecord, TxScope,
};
use crate::error::{StoreError, UniqueConstraint};

type RunKey = (EntityId, PolicyId, NaiveDate);

/// One reversible write.
#[derive(Debug)]
enum Undo {
    Appended,
    Reversed(TransactionId),
    DayClaimed(UniqueConstraint),
    DayFreed(UniqueConstraint, TransactionId),
    UnitPinned(String),
    Run(RunKey),
    Assignment(AssignmentId, Option<PolicyAssignment>),
}

#[derive(Debug, Default)]
struct State {
    transactions: Vec<Transaction>,
    by_id: HashMap<TransactionId, usize>,
    keys: HashSet<String>,
    reversed: HashSet<TransactionId>,
    day_index: HashMap<UniqueConstraint, TransactionId>,
    units: HashMap<String, Unit>,
    entities: BTreeMap<EntityId, Entity>,
    policies: BTreeMap<PolicyId, PolicyDefinition>,
    assignments: BTreeMap<AssignmentId, PolicyAssignment>,
    hours_worked: HashMap<EntityId, Vec<HoursWorkedRecord>>,
    runs: BTreeMap<RunKey, RunRecord>,
}

impl State {
    fn day_constraint(tx: &Transaction, unique: &BTreeSet<String>) -> Option<UniqueConstraint> {
        (tx.is_unique_day_candidate() && unique.contains(&tx.resource_type)).then(|| {
            UniqueConstraint::EntityDay {
                entity_id: tx.entity_id,
                resource_type: tx.resource_type.clone(),
                day: tx.effective_at.date(),
            }
        })
    }

    fn get(&self, id: TransactionId) -> Option<&Transaction> {
        self.by_id.get(&id).and_then(|&i| self.transactions.get(i))
    }

    fn insert(
        &mut self,
        tx: Transaction,
        unique: &BTreeSet<String>,
        journal: &mut Vec<Undo>,
    ) -> Result<(), StoreError> {
        tx.validate()?;
        let pin_unit = match self.units.get(&tx.resource_type) {
            Some(&unit) if unit != tx.delta.unit => {
                return Err(LedgerError::from(AmountError::UnitMismatch {
                    expected: unit,
                    actual: tx.delta.unit,
                })
                .into());
            }
            Some(_) => false,
            None => true,
        };
        if self.by_id.contains_key(&tx.id) {
            return Err(StoreError::Backend(format!("duplicate transaction id {}", tx.id)));
        }
        if let Some(key) = tx.key()
            && self.keys.contains(key)
        {
            return Err(LedgerError::DuplicateIdempotencyKey(key.to_string()).into());
        }

        let mut freed = None;
        if tx.tx_type == TransactionType::Reversal {
            let original_id = tx.reference_id.ok_or(LedgerError::MissingReference)?;
            let original = self
                .get(original_id)
                .ok_or(LedgerError::TransactionNotFound(original_id))?;
            if original.tx_type == TransactionType::Reversal {
                return Err(LedgerError::CannotReverseReversal(original_id).into());
            }
            if self.reversed.contains(&original_id) {
                return Err(LedgerError::AlreadyReversed(original_id).into());
            }
            ReversalService::check_matches(&tx, original)?;
            freed = Self::day_constraint(original, unique).map(|c| (c, original_id));
        }

        let claimed = Self::day_constraint(&tx, unique);
        if let Some(constraint) = &claimed
            && self.day_index.contains_key(constraint)
        {
            return Err(StoreError::UniqueViolation(constraint.clone()));
        }

        if pin_unit {
            self.units.insert(tx.resource_type.clone(), tx.delta.unit);
            journal.push(Undo::UnitPinned(tx.resource_type.clone()));
        }
        if let Some((constraint, original_id)) = freed {
            if self.day_index.get(&constraint) == Some(&original_id) {
                self.day_index.remove(&constraint);
                journal.push(Undo::DayFreed(constraint, original_id));
            }
            self.reversed.insert(original_id);
            journal.push(Undo::Reversed(original_id));
        }
        if let Some(constraint) = claimed {
            self.day_index.insert(constraint.clone(), tx.id);
            journal.push(Undo::DayClaimed(constraint));
        }
        if let Some(key) = tx.key() {
            self.keys.insert(key.to_string());
        }
        self.by_id.insert(tx.id, self.transactions.len());
        self.transactions.push(tx);
        journal.push(Undo::Appended);
        Ok(())
    }

    fn undo(&mut self, step: Undo) {
        match step {
            Undo::Appended => {
                if let Some(tx) = self.transactions.pop() {
                    self.by_id.remove(&tx.id);
                    if let Some(key) = tx.key() {
                        self.keys.remove(key);
                    }
                }
            }
            Undo::Reversed(id) => {
                self.reversed.remove(&id);
            }
            Undo::DayClaimed(constraint) => {
                self.day_index.remove(&constraint);
            }
            Undo::DayFreed(constraint, id) => {
                self.day_index.insert(constraint, id);
            }
            Undo::UnitPinned(resource_type) => {
                self.units.remove(&resource_type);
            }
            Undo::Run(key) => {
                self.runs.remove(&key);
            }
            Undo::Assignment(id, previous) => match previous {
                Some(assignment) => {
                    self.assignments.insert(id, assignment);
                }
                None => {
                    self.assignments.remove(&id);
                }
            },
        }
    }

    fn insert_run(&mut self, record: RunRecord, journal: &mut Vec<Undo>) -> Result<(), StoreError> {
        let key = (record.entity_id, record.policy_id, record.period_end);
        if self.runs.contains_key(&key) {
            return Err(StoreError::UniqueViolation(UniqueConstraint::Run {
                entity_id: record.entity_id,
                policy_id: record.policy_id,
                period_end: record.period_end,
            }));
        }
        self.runs.insert(key, record);
        journal.push(Undo::Run(key));
        Ok(())
    }
}

impl LedgerView for State {
    fn transactions(&self, entity_id: EntityId, policy_id: PolicyId) -> Vec<Transaction> {
        self.transactions
            .iter()
            .filter(|tx| tx.entity_id == entity_id && tx.policy_id == policy_id)
            .cloned()
            .collect()
    }

    fn entity_transactions(
        &self,
        entity_id: EntityId,
        from: TimePoint,
        to: TimePoint,
    ) -> Vec<Transaction> {
        self.transactions
            .iter()
            .filter(|tx| tx.entity_id == entity_id && tx.effective_at >= from && tx.effective_at <= to)
            .cloned()
            .collect()
    }

    fn transaction(&self, id: TransactionId) -> Option<Transaction> {
        self.get(id).cloned()
    }

    fn key_exists(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    fn is_reversed(&self, id: TransactionId) -> bool {
        self.reversed.contains(&id)
    }

    fn entity(&self, id: EntityId) -> Option<Entity> {
        self.entities.get(&id).cloned()
    }

    fn policy(&self, id: PolicyId) -> Option<PolicyDefinition> {
        self.policies.get(&id).cloned()
    }

    fn assignment(&self, id: AssignmentId) -> Option<PolicyAssignment> {
        self.assignments.get(&id).cloned()
    }

    fn entity_assignments(&self, entity_id: EntityId) -> Vec<PolicyAssignment> {
        let mut assignments: Vec<PolicyAssignment> = self
            .assignments
            .values()
            .filter(|a| a.entity_id == entity_id)
            .cloned()
            .collect();
        assignments.sort_by_key(|a| (a.consumption_priority, a.effective_from, a.id));
        assignments
    }

    fn all_assignments(&self) -> Vec<PolicyAssignment> {
        self.assignments.values().cloned().collect()
    }

    fn hours_worked(&self, entity_id: EntityId) -> Vec<HoursWorkedRecord> {
        self.hours_worked.get(&entity_id).cloned().unwrap_or_default()
    }

    fn run_exists(&self, entity_id: EntityId, policy_id: PolicyId, period_end: NaiveDate) -> bool {
        self.runs.contains_key(&(entity_id, policy_id, period_end))
    }
}

/// Writes applied to the live state, rolled back on drop unless committed.
struct Staged<'a> {
    state: &'a mut State,
    unique: &'a BTreeSet<String>,
    journal: Vec<Undo>,
}

impl<'a> Staged<'a> {
    fn new(state: &'a mut State, unique: &'a BTreeSet<String>) -> Self {
        Self {
            state,
            unique,
            journal: Vec::new(),
        }
    }

    fn commit(mut self) {
        self.journal.clear();
    }
}

impl Drop for Staged<'_> {
    fn drop(&mut self) {
        while let Some(step) = self.journal.pop() {
            self.state.undo(step);
        }
    }
}

impl LedgerView for Staged<'_> {
    fn transactions(&self, entity_id: EntityId, policy_id: PolicyId) -> Vec<Transaction> {
        self.state.transactions(entity_id, policy_id)
    }

    fn entity_transactions(
        &self,
        entity_id: EntityId,
        from: TimePoint,
        to: TimePoint,
    ) -> Vec<Transaction> {
        self.state.entity_transactions(entity_id, from, to)
    }

    fn transaction(&self, id: TransactionId) -> Option<Transaction> {
        self.state.transaction(id)
    }

    fn key_exists(&self, key: &str) -> bool {
        self.state.key_exists(key)
    }

    fn is_reversed(&self, id: TransactionId) -> bool {
        self.state.is_reversed(id)
    }

    fn entity(&self, id: EntityId) -> Option<Entity> {
        self.state.entity(id)
    }

    fn policy(&self, id: PolicyId) -> Option<PolicyDefinition> {
        self.state.policy(id)
    }

    fn assignment(&self, id: AssignmentId) -> Option<PolicyAssignment> {
        self.state.assignment(id)
    }

    fn entity_assignments(&self, entity_id: EntityId) -> Vec<PolicyAssignment> {
        self.state.entity_assignments(entity_id)
    }

    fn all_assignments(&self) -> Vec<PolicyAssignment> {
        self.state.all_assignments()
    }

    fn hours_worked(&self, entity_id: EntityId) -> Vec<HoursWorkedRecord> {
        self.state.hours_worked(entity_id)
    }

    fn run_exists(&self, entity_id: EntityId, policy_id: PolicyId, period_end: NaiveDate) -> bool {
        self.state.run_exists(entity_id, policy_id, period_end)
    }
}

impl TxScope for Staged<'_> {
    fn insert(&mut self, tx: Transaction) -> Result<(), StoreError> {
        self.state.insert(tx, self.unique, &mut self.journal)
    }

    fn upsert_assignment(&mut self, assignment: PolicyAssignment) {
        let id = assignment.id;
        let previous = self.state.assignments.insert(id, assignment);
        self.journal.push(Undo::Assignment(id, previous));
    }

    fn insert_run(&mut self, record: RunRecord) -> Result<(), StoreError> {
        self.state.insert_run(record, &mut self.journal)
    }
}

/// In-process store for tests and one-shot tools.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
    unique_resources: Arc<BTreeSet<String>>,
}

impl MemoryStore {
    /// Creates an empty store without a day-uniqueness index. Each resource
    /// type keeps the unit of its first transaction.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store that checks units against `registry` and
    /// indexes days of its unique resource types.
    #[must_use]
    pub fn with_registry(registry: &ResourceRegistry) -> Self {
        let state = State {
            units: registry
                .iter()
                .map(|resource| (resource.name.clone(), resource.unit))
                .collect(),
            ..State::default()
        };
        Self {
            state: Arc::new(RwLock::new(state)),
            unique_resources: Arc::new(registry.unique_resources()),
        }
    }

    /// Number of stored transactions.
    pub async fn len(&self) -> usize {
        self.state.read().await.transactions.len()
    }

    /// Returns true if no transaction is stored.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.transactions.is_empty()
    }

    /// Every stored transaction in append order.
    pub async fn all_transactions(&self) -> Vec<Transaction> {
        self.state.read().await.transactions.clone()
    }

    /// Every stored run record.
    pub async fn runs(&self) -> Vec<RunRecord> {
        self.state.read().await.runs.values().cloned().collect()
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn append(&self, tx: Transaction) -> Result<(), StoreError> {
        self.append_batch(vec![tx]).await
    }

    async fn append_batch(&self, txs: Vec<Transaction>) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let mut staged = Staged::new(&mut state, &self.unique_resources);
        let count = txs.len();
        for tx in txs {
            staged.insert(tx)?;
        }
        staged.commit();
        debug!(count, "Appended transactions");
        Ok(())
    }

    async fn load(
        &self,
        entity_id: EntityId,
        policy_id: PolicyId,
    ) -> Result<Vec<Transaction>, StoreError> {
        Ok(self.state.read().await.transactions(entity_id, policy_id))
    }

    async fn load_range(
        &self,
        entity_id: EntityId,
        policy_id: PolicyId,
        from: TimePoint,
        to: TimePoint,
    ) -> Result<Vec<Transaction>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .entity_transactions(entity_id, from, to)
            .into_iter()
            .filter(|tx| tx.policy_id == policy_id)
            .collect())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.state.read().await.key_exists(key))
    }

    async fn view<R, F>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&dyn LedgerView) -> Result<R, StoreError> + Send,
        R: Send,
    {
        let state = self.state.read().await;
        f(&*state)
    }

    async fn with_tx<R, F>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut dyn TxScope) -> Result<R, StoreError> + Send,
        R: Send,
    {
        let mut state = self.state.write().await;
        let mut staged = Staged::new(&mut state, &self.unique_resources);
        let result = f(&mut staged)?;
        staged.commit();
        Ok(result)
    }
}

#[async_trait]
impl EntityLedgerStore for MemoryStore {
    async fn load_by_entity(
        &self,
        entity_id: EntityId,
        from: TimePoint,
        to: TimePoint,
    ) -> Result<Vec<Transaction>, StoreError> {
        Ok(self.state.read().await.entity_transactions(entity_id, from, to))
    }
}

#[async_trait]
impl Directory for MemoryStore {
    async fn put_policy(&self, policy: PolicyDefinition) -> Result<(), StoreError> {
        self.state.write().await.policies.insert(policy.id, policy);
        Ok(())
    }

    async fn put_entity(&self, entity: Entity) -> Result<(), StoreError> {
        self.state.write().await.entities.insert(entity.id, entity);
        Ok(())
    }

    async fn put_assignment(&self, assignment: PolicyAssignment) -> Result<(), StoreError> {
        self.state
            .write()
            .await
            .assignments
            .insert(assignment.id, assignment);
        Ok(())
    }

    async fn put_hours_worked(
        &self,
        entity_id: EntityId,
        records: Vec<HoursWorkedRecord>,
    ) -> Result<(), StoreError> {
        self.state
            .write()
            .await
            .hours_worked
            .insert(entity_id, records);
        Ok(())
    }

    async fn close_assignment(
        &self,
        id: AssignmentId,
        last_day: NaiveDate,
    ) -> Result<PolicyAssignment, StoreError> {
        let mut state = self.state.write().await;
        let assignment = state
            .assignments
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("assignment {id}")))?;
        assignment.close(last_day)?;
        Ok(assignment.clone())
    }

    async fn assignments_for(
        &self,
        entity_id: EntityId,
    ) -> Result<Vec<PolicyAssignment>, StoreError> {
        Ok(self.state.read().await.entity_assignments(entity_id))
    }

    async fn record_run(&self, record: RunRecord) -> Result<(), StoreError> {
        self.state.write().await.insert_run(record, &mut Vec::new())
    }

    async fn has_run(
        &self,
        entity_id: EntityId,
        policy_id: PolicyId,
        period_end: NaiveDate,
    ) -> Result<bool, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .run_exists(entity_id, policy_id, period_end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accrue_core::ledger::ReversalService;
    use accrue_shared::types::{Amount, Unit};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> TimePoint {
        TimePoint::from_ymd(2025, 3, d).unwrap()
    }

    fn consumption(entity: &str, policy: &str, d: u32, key: &str) -> Transaction {
        Transaction::builder(
            EntityId::from_key(entity),
            PolicyId::from_key(policy),
            "pto",
            TransactionType::Consumption,
            day(d),
            Amount::new(dec!(-1), Unit::Days),
        )
        .idempotency_key(key)
        .build()
        .unwrap()
    }

    fn grant(value: Decimal, key: &str) -> Transaction {
        Transaction::builder(
            EntityId::from_key("alice"),
            PolicyId::from_key("pto"),
            "pto",
            TransactionType::Grant,
            day(1),
            Amount::new(value, Unit::Days),
        )
        .idempotency_key(key)
        .build()
        .unwrap()
    }

    fn unique_store() -> MemoryStore {
        MemoryStore::with_registry(&ResourceRegistry::with_defaults())
    }

    fn unit_mismatch(expected: Unit, actual: Unit) -> StoreError {
        StoreError::Ledger(LedgerError::Amount(AmountError::UnitMismatch { expected, actual }))
    }

    #[tokio::test]
    async fn test_duplicate_idempotency_key_rejected() {
        let store = MemoryStore::new();
        store.append(grant(dec!(5), "g1")).await.unwrap();
        let err = store.append(grant(dec!(7), "g1")).await.unwrap_err();
        assert_eq!(
            err,
            StoreError::Ledger(LedgerError::DuplicateIdempotencyKey("g1".into()))
        );
        assert_eq!(store.len().await, 1);
        assert!(store.exists("g1").await.unwrap());
    }

    #[tokio::test]
    async fn test_batch_is_all_or_nothing() {
        let store = MemoryStore::new();
        let batch = vec![grant(dec!(1), "a"), grant(dec!(2), "b"), grant(dec!(3), "a")];
        assert!(store.append_batch(batch).await.is_err());
        assert!(store.is_empty().await);
        assert!(!store.exists("b").await.unwrap());
    }

    #[tokio::test]
    async fn test_day_index_rejects_second_booking() {
        let store = unique_store();
        store
            .append(consumption("alice", "pto", 3, "c1"))
            .await
            .unwrap();
        let err = store
            .append(consumption("alice", "pto-2", 3, "c2"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::UniqueViolation(UniqueConstraint::EntityDay { .. })
        ));
        // Another entity may book the same day.
        store.append(consumption("bob", "pto", 3, "c3")).await.unwrap();
    }

    #[tokio::test]
    async fn test_reversal_frees_the_day() {
        let store = unique_store();
        let original = consumption("alice", "pto", 3, "c1");
        store.append(original.clone()).await.unwrap();
        let reversal = ReversalService::create_reversal(&original, &[], "cancelled").unwrap();
        store.append(reversal.clone()).await.unwrap();
        store
            .append(consumption("alice", "pto", 3, "c2"))
            .await
            .unwrap();

        let err = store
            .append(
                Transaction::builder(
                    original.entity_id,
                    original.policy_id,
                    "pto",
                    TransactionType::Reversal,
                    original.effective_at,
                    -original.delta,
                )
                .reference(original.id)
                .idempotency_key("second-reversal")
                .build()
                .unwrap(),
            )
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::Ledger(LedgerError::AlreadyReversed(original.id)));
    }

    #[tokio::test]
    async fn test_reversing_a_reversal_rejected() {
        let store = MemoryStore::new();
        let original = grant(dec!(2), "g1");
        store.append(original.clone()).await.unwrap();
        let reversal = ReversalService::create_reversal(&original, &[], "typo").unwrap();
        store.append(reversal.clone()).await.unwrap();
        let err = store
            .append(
                Transaction::builder(
                    reversal.entity_id,
                    reversal.policy_id,
                    "pto",
                    TransactionType::Reversal,
                    reversal.effective_at,
                    -reversal.delta,
                )
                .reference(reversal.id)
                .build()
                .unwrap(),
            )
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::Ledger(LedgerError::CannotReverseReversal(reversal.id))
        );
    }

    #[tokio::test]
    async fn test_with_tx_rolls_back_on_error() {
        let store = MemoryStore::new();
        let result: Result<(), StoreError> = store
            .with_tx(|scope| {
                scope.insert(grant(dec!(1), "staged"))?;
                assert!(scope.key_exists("staged"));
                Err(StoreError::Backend("boom".into()))
            })
            .await;
        assert!(result.is_err());
        assert!(store.is_empty().await);

        store
            .with_tx(|scope| scope.insert(grant(dec!(1), "committed")))
            .await
            .unwrap();
        assert!(store.exists("committed").await.unwrap());
    }

    #[tokio::test]
    async fn test_load_range_filters_by_policy_and_time() {
        let store = MemoryStore::new();
        store
            .append_batch(vec![
                consumption("alice", "pto", 3, "a"),
                consumption("alice", "pto", 10, "b"),
                consumption("alice", "sick", 4, "c"),
            ])
            .await
            .unwrap();
        let entity = EntityId::from_key("alice");
        let loaded = store
            .load_range(entity, PolicyId::from_key("pto"), day(1), day(5))
            .await
            .unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].key(), Some("a"));
        assert_eq!(
            store.load_by_entity(entity, day(1), day(31)).await.unwrap().len(),
            3
        );
    }

    #[tokio::test]
    async fn test_close_assignment_and_runs() {
        let store = MemoryStore::new();
        let entity = EntityId::from_key("alice");
        let policy = PolicyId::from_key("pto");
        let from = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let assignment = PolicyAssignment::new(entity, policy, from, 1);
        store.put_assignment(assignment.clone()).await.unwrap();
        let closed = store
            .close_assignment(assignment.id, NaiveDate::from_ymd_opt(2025, 6, 30).unwrap())
            .await
            .unwrap();
        assert_eq!(closed.effective_to, NaiveDate::from_ymd_opt(2025, 6, 30));
        assert!(matches!(
            store.close_assignment(AssignmentId::new(), from).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(!store.has_run(entity, policy, from).await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_bookings_of_one_day_admit_one() {
        let store = unique_store();
        let attempts = (0..8).map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .append(consumption("alice", &format!("p{i}"), 3, &format!("k{i}")))
                    .await
            })
        });
        let results = futures::future::join_all(attempts).await;
        let ok = results.into_iter().filter(|r| matches!(r, Ok(Ok(())))).count();
        assert_eq!(ok, 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_foreign_unit_rejected() {
        let store = unique_store();
        let mut hours = consumption("alice", "pto", 3, "c1");
        hours.delta = Amount::new(dec!(-8), Unit::Hours);
        assert_eq!(
            store.append(hours).await.unwrap_err(),
            unit_mismatch(Unit::Days, Unit::Hours)
        );
        assert!(store.is_empty().await);
        // The day stays free for a booking in the right unit.
        store
            .append(consumption("alice", "pto", 3, "c1"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unregistered_resource_keeps_first_unit() {
        let store = MemoryStore::new();
        store.append(grant(dec!(5), "g1")).await.unwrap();
        let mut hours = grant(dec!(8), "g2");
        hours.delta = Amount::new(dec!(8), Unit::Hours);
        assert_eq!(
            store.append(hours).await.unwrap_err(),
            unit_mismatch(Unit::Days, Unit::Hours)
        );
    }

    #[tokio::test]
    async fn test_failed_batch_does_not_pin_unit() {
        let store = MemoryStore::new();
        let mut hours = grant(dec!(8), "h1");
        hours.delta = Amount::new(dec!(8), Unit::Hours);
        let batch = vec![hours, grant(dec!(1), "h1")];
        assert!(store.append_batch(batch).await.is_err());
        store.append(grant(dec!(5), "g1")).await.unwrap();
    }

    #[tokio::test]
    async fn test_reversal_must_mirror_original() {
        let store = unique_store();
        let original = consumption("alice", "pto", 3, "c1");
        store.append(original.clone()).await.unwrap();

        let cases: [(&str, fn(&mut Transaction)); 4] = [
            ("entity_id", |r| r.entity_id = EntityId::from_key("bob")),
            ("policy_id", |r| r.policy_id = PolicyId::from_key("sick")),
            ("resource_type", |r| r.resource_type = "sick".into()),
            ("delta", |r| r.delta = Amount::new(dec!(50), Unit::Days)),
        ];
        for (field, edit) in cases {
            let mut reversal =
                ReversalService::create_reversal(&original, &[], "cancelled").unwrap();
            edit(&mut reversal);
            assert_eq!(
                store.append(reversal).await.unwrap_err(),
                StoreError::Ledger(LedgerError::ReversalMismatch {
                    original_id: original.id,
                    field,
                }),
                "{field}"
            );
        }
        assert_eq!(store.len().await, 1);
        assert!(!store.view(|v| Ok(v.is_reversed(original.id))).await.unwrap());

        let reversal = ReversalService::create_reversal(&original, &[], "cancelled").unwrap();
        store.append(reversal).await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_batch_leaves_indexes_untouched() {
        let store = unique_store();
        let original = consumption("alice", "pto", 3, "c1");
        store.append(original.clone()).await.unwrap();

        let reversal = ReversalService::create_reversal(&original, &[], "cancelled").unwrap();
        let batch = vec![
            reversal,
            consumption("alice", "pto", 3, "c2"),
            consumption("alice", "pto", 4, "c1"),
        ];
        assert!(matches!(
            store.append_batch(batch).await,
            Err(StoreError::Ledger(LedgerError::DuplicateIdempotencyKey(_)))
        ));

        assert_eq!(store.all_transactions().await, vec![original.clone()]);
        assert!(!store.exists("c2").await.unwrap());
        assert!(!store.view(|v| Ok(v.is_reversed(original.id))).await.unwrap());
        assert!(matches!(
            store.append(consumption("alice", "pto", 3, "c3")).await,
            Err(StoreError::UniqueViolation(UniqueConstraint::EntityDay { .. }))
        ));
        store
            .append(consumption("alice", "pto", 4, "c2"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_with_tx_rolls_back_assignment_upserts() {
        let store = MemoryStore::new();
        let entity = EntityId::from_key("alice");
        let from = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let kept = PolicyAssignment::new(entity, PolicyId::from_key("pto"), from, 1);
        store.put_assignment(kept.clone()).await.unwrap();

        let result: Result<(), StoreError> = store
            .with_tx(|scope| {
                let mut closed = kept.clone();
                closed.effective_to = NaiveDate::from_ymd_opt(2025, 6, 30);
                scope.upsert_assignment(closed);
                scope.upsert_assignment(PolicyAssignment::new(
                    entity,
                    PolicyId::from_key("senior"),
                    from,
                    1,
                ));
                Err(StoreError::Backend("boom".into()))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(store.assignments_for(entity).await.unwrap(), vec![kept]);
    }
}
