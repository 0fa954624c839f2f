//! Store contract.
//!
//! Async traits cover single operations. Multi-step work that must see a
//! consistent ledger and commit atomically runs as a synchronous closure
//! over a [`TxScope`] inside [`LedgerStore::with_tx`].

use std::future::Future;

use accrue_core::accrual::HoursWorkedRecord;
use accrue_core::ledger::Transaction;
use accrue_core::period::TimePoint;
use accrue_core::policy::{Entity, PolicyAssignment, PolicyDefinition, ReconciliationTrigger};
use accrue_core::reconciliation::ReconciliationSummary;
use accrue_shared::types::{AssignmentId, EntityId, PolicyId, RunId, TransactionId};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::StoreError;

/// Record of one completed reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Run id.
    pub id: RunId,
    /// The entity.
    pub entity_id: EntityId,
    /// The reconciled policy.
    pub policy_id: PolicyId,
    /// Last day of the reconciled period.
    pub period_end: NaiveDate,
    /// What fired the run.
    pub trigger: ReconciliationTrigger,
    /// Totals.
    pub summary: ReconciliationSummary,
    /// Transactions written by the run.
    pub transaction_ids: Vec<TransactionId>,
}

/// Consistent read access to the ledger and directory.
pub trait LedgerView {
    /// All transactions of an entity under a policy, in append order.
    fn transactions(&self, entity_id: EntityId, policy_id: PolicyId) -> Vec<Transaction>;

    /// All transactions of an entity effective within `[from, to]`.
    fn entity_transactions(
        &self,
        entity_id: EntityId,
        from: TimePoint,
        to: TimePoint,
    ) -> Vec<Transaction>;

    /// Looks up a transaction by id.
    fn transaction(&self, id: TransactionId) -> Option<Transaction>;

    /// Returns true if a transaction with this idempotency key exists.
    fn key_exists(&self, key: &str) -> bool;

    /// Returns true if `id` has been reversed.
    fn is_reversed(&self, id: TransactionId) -> bool;

    /// Looks up an entity.
    fn entity(&self, id: EntityId) -> Option<Entity>;

    /// Looks up a policy definition.
    fn policy(&self, id: PolicyId) -> Option<PolicyDefinition>;

    /// Looks up an assignment.
    fn assignment(&self, id: AssignmentId) -> Option<PolicyAssignment>;

    /// Assignments of an entity ordered by priority.
    fn entity_assignments(&self, entity_id: EntityId) -> Vec<PolicyAssignment>;

    /// Every assignment.
    fn all_assignments(&self) -> Vec<PolicyAssignment>;

    /// Hours-worked records reported for an entity.
    fn hours_worked(&self, entity_id: EntityId) -> Vec<HoursWorkedRecord>;

    /// Returns true if the period ending `period_end` was reconciled.
    fn run_exists(&self, entity_id: EntityId, policy_id: PolicyId, period_end: NaiveDate) -> bool;
}

/// Staged write access inside [`LedgerStore::with_tx`].
///
/// Writes become visible to later reads in the same scope and are committed
/// only when the closure returns `Ok`.
pub trait TxScope: LedgerView {
    /// Appends one transaction, enforcing every store constraint.
    fn insert(&mut self, tx: Transaction) -> Result<(), StoreError>;

    /// Inserts or replaces an assignment.
    fn upsert_assignment(&mut self, assignment: PolicyAssignment);

    /// Stores a run record.
    fn insert_run(&mut self, record: RunRecord) -> Result<(), StoreError>;
}

/// Append-only transaction store.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Appends one transaction.
    async fn append(&self, tx: Transaction) -> Result<(), StoreError>;

    /// Appends all transactions or none.
    async fn append_batch(&self, txs: Vec<Transaction>) -> Result<(), StoreError>;

    /// All transactions of an entity under a policy.
    async fn load(
        &self,
        entity_id: EntityId,
        policy_id: PolicyId,
    ) -> Result<Vec<Transaction>, StoreError>;

    /// Transactions of an entity under a policy effective within `[from, to]`.
    async fn load_range(
        &self,
        entity_id: EntityId,
        policy_id: PolicyId,
        from: TimePoint,
        to: TimePoint,
    ) -> Result<Vec<Transaction>, StoreError>;

    /// Returns true if a transaction with this idempotency key exists.
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Runs `f` against a consistent read-only view.
    async fn view<R, F>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&dyn LedgerView) -> Result<R, StoreError> + Send,
        R: Send;

    /// Runs `f` under the exclusive write scope and commits its writes when
    /// it returns `Ok`.
    async fn with_tx<R, F>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut dyn TxScope) -> Result<R, StoreError> + Send,
        R: Send;
}

/// Entity-wide ledger reads.
#[async_trait]
pub trait EntityLedgerStore: LedgerStore {
    /// All transactions of an entity effective within `[from, to]`.
    async fn load_by_entity(
        &self,
        entity_id: EntityId,
        from: TimePoint,
        to: TimePoint,
    ) -> Result<Vec<Transaction>, StoreError>;
}

/// Entities, policies, assignments and run records.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Stores a policy definition.
    async fn put_policy(&self, policy: PolicyDefinition) -> Result<(), StoreError>;

    /// Stores an entity.
    async fn put_entity(&self, entity: Entity) -> Result<(), StoreError>;

    /// Stores an assignment.
    async fn put_assignment(&self, assignment: PolicyAssignment) -> Result<(), StoreError>;

    /// Stores hours-worked records for an entity.
    async fn put_hours_worked(
        &self,
        entity_id: EntityId,
        records: Vec<HoursWorkedRecord>,
    ) -> Result<(), StoreError>;

    /// Closes an assignment so that `last_day` is its final active day.
    async fn close_assignment(
        &self,
        id: AssignmentId,
        last_day: NaiveDate,
    ) -> Result<PolicyAssignment, StoreError>;

    /// Assignments of an entity ordered by priority.
    async fn assignments_for(
        &self,
        entity_id: EntityId,
    ) -> Result<Vec<PolicyAssignment>, StoreError>;

    /// Stores a run record.
    async fn record_run(&self, record: RunRecord) -> Result<(), StoreError>;

    /// Returns true if the period ending `period_end` was reconciled.
    async fn has_run(
        &self,
        entity_id: EntityId,
        policy_id: PolicyId,
        period_end: NaiveDate,
    ) -> Result<bool, StoreError>;
}

/// Awaits `fut` unless `token` is cancelled first.
///
/// A cancelled read returns [`StoreError::Cancelled`] and leaves no trace.
pub async fn cancellable<T, F>(token: &CancellationToken, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::select! {
        biased;
        () = token.cancelled() => Err(StoreError::Cancelled),
        result = fut => result,
    }
}
