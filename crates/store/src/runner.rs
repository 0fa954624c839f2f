//! Reconciliation runner.
//!
//! Computes ending balances, runs the engine and writes its output together
//! with a run record inside one write scope. A run record per
//! `(entity, policy, period end)` makes every pass safe to repeat.

use std::sync::Arc;

use accrue_core::period::{Period, PeriodError, TimePoint};
use accrue_core::policy::{
    Entity, Policy, PolicyAssignment, PolicyError, ReconciliationTrigger, ResourceRegistry,
};
use accrue_core::reconciliation::{ReconciliationEngine, ReconciliationInput};
use accrue_shared::LedgerConfig;
use accrue_shared::types::{AssignmentId, EntityId, PolicyId, RunId};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::contract::{LedgerStore, RunRecord, TxScope};
use crate::error::StoreError;
use crate::resolve::PolicyResolver;

/// An assignment the pass could not reconcile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunFailure {
    /// The assignment.
    pub assignment_id: AssignmentId,
    /// The entity.
    pub entity_id: EntityId,
    /// The policy.
    pub policy_id: PolicyId,
    /// Error code.
    pub code: &'static str,
    /// Error message.
    pub message: String,
}

/// Outcome of one [`ReconciliationRunner::run_due`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Runs completed in this pass.
    pub runs: Vec<RunRecord>,
    /// Assignments with nothing due or already reconciled.
    pub skipped: usize,
    /// Assignments that failed.
    pub failures: Vec<RunFailure>,
}

/// Drives the reconciliation engine against a store.
#[derive(Debug, Clone)]
pub struct ReconciliationRunner<S> {
    store: Arc<S>,
    registry: Arc<ResourceRegistry>,
    hours_per_day: Decimal,
}

impl<S: LedgerStore> ReconciliationRunner<S> {
    /// Creates a runner.
    #[must_use]
    pub fn new(store: Arc<S>, registry: Arc<ResourceRegistry>, config: &LedgerConfig) -> Self {
        Self {
            store,
            registry,
            hours_per_day: config.hours_per_day,
        }
    }

    fn resolver(&self) -> PolicyResolver<'_> {
        PolicyResolver {
            registry: &self.registry,
            hours_per_day: self.hours_per_day,
        }
    }

    /// Reconciles `ending_period` of one assignment.
    ///
    /// Returns `None` when the period was already reconciled.
    pub async fn reconcile(
        &self,
        entity: &Entity,
        assignment: &PolicyAssignment,
        ending_period: Period,
        trigger: ReconciliationTrigger,
    ) -> Result<Option<RunRecord>, StoreError> {
        let next_period = ending_period.next_period()?;
        self.store
            .with_tx(|scope| {
                let policy = self.resolver().policy(&*scope, entity, assignment.policy_id)?;
                Self::reconcile_in(
                    scope,
                    entity,
                    &policy,
                    Boundary {
                        assigned_from: assignment.effective_from,
                        ending: ending_period,
                        next: next_period,
                        trigger,
                        next_policy_id: None,
                    },
                )
            })
            .await
    }

    /// Reconciles every assignment whose previous period ended before
    /// `as_of`.
    ///
    /// Only the most recent ended period is considered. Failures are
    /// reported per assignment and do not stop the pass.
    pub async fn run_due(&self, as_of: NaiveDate) -> Result<RunReport, StoreError> {
        let assignments = self.store.view(|view| Ok(view.all_assignments())).await?;
        info!(%as_of, assignments = assignments.len(), "Starting reconciliation pass");

        let mut report = RunReport::default();
        for assignment in assignments {
            match self.reconcile_due(&assignment, as_of).await {
                Ok(Some(run)) => report.runs.push(run),
                Ok(None) => report.skipped += 1,
                Err(err) => {
                    let err = err.into_domain();
                    warn!(
                        assignment_id = %assignment.id,
                        entity_id = %assignment.entity_id,
                        policy_id = %assignment.policy_id,
                        error = %err,
                        "Reconciliation failed"
                    );
                    report.failures.push(RunFailure {
                        assignment_id: assignment.id,
                        entity_id: assignment.entity_id,
                        policy_id: assignment.policy_id,
                        code: err.error_code(),
                        message: err.to_string(),
                    });
                }
            }
        }

        info!(
            runs = report.runs.len(),
            skipped = report.skipped,
            failures = report.failures.len(),
            "Reconciliation pass finished"
        );
        Ok(report)
    }

    /// Moves an entity from one policy to another starting `effective_date`.
    ///
    /// Closes the old assignment the day before, opens the new one with the
    /// same priority and approval settings, and reconciles the shortened
    /// period with the `policy_change` trigger so that carryover lands on the
    /// new policy.
    pub async fn change_policy(
        &self,
        entity_id: EntityId,
        assignment_id: AssignmentId,
        new_policy_id: PolicyId,
        effective_date: NaiveDate,
    ) -> Result<(PolicyAssignment, Option<RunRecord>), StoreError> {
        self.store
            .with_tx(|scope| {
                let entity = PolicyResolver::entity(&*scope, entity_id)?;
                let mut old = scope
                    .assignment(assignment_id)
                    .filter(|a| a.entity_id == entity_id)
                    .ok_or_else(|| StoreError::NotFound(format!("assignment {assignment_id}")))?;
                let old_policy = self.resolver().policy(&*scope, &entity, old.policy_id)?;
                let new_policy = self.resolver().policy(&*scope, &entity, new_policy_id)?;
                if old_policy.resource_type != new_policy.resource_type {
                    return Err(PolicyError::InvalidAssignment(format!(
                        "cannot move from {} to {}: resource types differ",
                        old_policy.resource_type, new_policy.resource_type
                    ))
                    .into());
                }

                let last_day = effective_date.pred_opt().ok_or(PeriodError::OutOfRange)?;
                old.close(last_day)?;
                let opened = PolicyAssignment::new(
                    entity_id,
                    new_policy_id,
                    effective_date,
                    old.consumption_priority,
                )
                .with_approval(old.approval);
                scope.upsert_assignment(old.clone());
                scope.upsert_assignment(opened.clone());
                info!(
                    %entity_id,
                    from_policy = %old.policy_id,
                    to_policy = %new_policy_id,
                    %effective_date,
                    "Policy changed"
                );

                if !old_policy.period_config.has_boundaries() {
                    return Ok((opened, None));
                }
                let ending = old_policy
                    .period_for(last_day, entity.hire_date)?
                    .truncate_at(last_day)?;
                let next = new_policy
                    .period_for(effective_date, entity.hire_date)?
                    .starting_at(effective_date)?;
                let run = Self::reconcile_in(
                    scope,
                    &entity,
                    &old_policy,
                    Boundary {
                        assigned_from: old.effective_from,
                        ending,
                        next,
                        trigger: ReconciliationTrigger::PolicyChange,
                        next_policy_id: Some(new_policy_id),
                    },
                )?;
                Ok((opened, run))
            })
            .await
    }

    async fn reconcile_due(
        &self,
        assignment: &PolicyAssignment,
        as_of: NaiveDate,
    ) -> Result<Option<RunRecord>, StoreError> {
        self.store
            .with_tx(|scope| {
                let entity = PolicyResolver::entity(&*scope, assignment.entity_id)?;
                let policy = self.resolver().policy(&*scope, &entity, assignment.policy_id)?;
                if !policy.period_config.has_boundaries() {
                    debug!(policy_id = %policy.id, "Rolling window, nothing to reconcile");
                    return Ok(None);
                }

                let ending = policy.period_for(as_of, entity.hire_date)?.previous_period()?;
                let ending_end = ending.end_date();
                let covered = assignment.effective_from <= ending_end
                    && assignment.effective_to.is_none_or(|to| to >= ending_end);
                if ending_end >= as_of || !covered {
                    return Ok(None);
                }

                Self::reconcile_in(
                    scope,
                    &entity,
                    &policy,
                    Boundary {
                        assigned_from: assignment.effective_from,
                        ending,
                        next: ending.next_period()?,
                        trigger: ReconciliationTrigger::PeriodEnd,
                        next_policy_id: None,
                    },
                )
            })
            .await
    }

    fn reconcile_in(
        scope: &mut dyn TxScope,
        entity: &Entity,
        policy: &Policy,
        boundary: Boundary,
    ) -> Result<Option<RunRecord>, StoreError> {
        let period_end = boundary.ending.end_date();
        if scope.run_exists(entity.id, policy.id, period_end) {
            debug!(
                entity_id = %entity.id,
                policy_id = %policy.id,
                %period_end,
                "Period already reconciled"
            );
            return Ok(None);
        }

        let balance = PolicyResolver::balance(
            &*scope,
            entity,
            policy,
            &boundary.ending,
            TimePoint::day(period_end),
            boundary.assigned_from,
        );
        let input = ReconciliationInput {
            entity_id: entity.id,
            policy_id: policy.id,
            policy,
            current_balance: balance,
            ending_period: boundary.ending,
            next_period: boundary.next,
            trigger: boundary.trigger,
            next_policy_id: boundary.next_policy_id,
        };
        let output = ReconciliationEngine::process(&input)?;

        let transaction_ids = output.transactions.iter().map(|tx| tx.id).collect();
        for tx in output.transactions {
            scope.insert(tx).map_err(StoreError::into_domain)?;
        }
        let record = RunRecord {
            id: RunId::new(),
            entity_id: entity.id,
            policy_id: policy.id,
            period_end,
            trigger: boundary.trigger,
            summary: output.summary,
            transaction_ids,
        };
        scope.insert_run(record.clone())?;

        info!(
            entity_id = %entity.id,
            policy_id = %policy.id,
            %period_end,
            trigger = %boundary.trigger,
            carried_over = %output.summary.carried_over,
            expired = %output.summary.expired,
            "Period reconciled"
        );
        Ok(Some(record))
    }
}

struct Boundary {
    assigned_from: NaiveDate,
    ending: Period,
    next: Period,
    trigger: ReconciliationTrigger,
    next_policy_id: Option<PolicyId>,
}
