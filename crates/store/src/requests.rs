//! Consumption requests.
//!
//! A request names an entity, a resource type and the days it covers. The
//! service builds the entity's resource balance from its active assignments,
//! distributes the request across policies and books one transaction per
//! day and policy through the day-uniqueness wrapper. Allocations that need
//! approval are booked as pending holds.

use std::sync::Arc;

use accrue_core::distribution::{ConsumptionDistributor, PolicyBalance, ResourceBalance};
use accrue_core::ledger::{LedgerError, ReversalService, Transaction, TransactionType};
use accrue_core::period::TimePoint;
use accrue_core::policy::{Constraints, Entity, PolicyError, ResourceRegistry, ResourceType};
use accrue_shared::LedgerConfig;
use accrue_shared::types::{Amount, EntityId, PolicyId};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::contract::{LedgerStore, LedgerView, TxScope};
use crate::error::StoreError;
use crate::resolve::PolicyResolver;
use crate::unique_day::DayUniqueLedger;

const REQUEST_KEY: &str = "request";

/// A request to consume a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumptionRequest {
    /// The requesting entity.
    pub entity_id: EntityId,
    /// The resource type to consume.
    pub resource_type: String,
    /// Days covered by the request.
    pub days: Vec<NaiveDate>,
    /// Quantity consumed on each day.
    pub amount_per_day: Decimal,
    /// Free-text reason.
    #[serde(default)]
    pub reason: String,
    /// Caller supplied key identifying the request.
    pub idempotency_key: String,
    /// Date the request is made; balances accrue up to this day.
    pub submitted_on: NaiveDate,
}

/// Result of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Booked as consumption.
    Approved,
    /// At least one allocation is waiting for approval.
    PendingApproval,
    /// Not enough balance; nothing was booked.
    Insufficient,
}

/// Outcome of [`RequestService::submit`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestOutcome {
    /// The request key.
    pub request_key: String,
    /// Result of the request.
    pub status: RequestStatus,
    /// Booked transactions.
    pub transactions: Vec<Transaction>,
    /// Amount that could not be allocated.
    pub shortfall: Amount,
    /// Days left without a policy.
    pub unallocated: Vec<NaiveDate>,
}

/// Books, approves and cancels consumption requests.
#[derive(Debug, Clone)]
pub struct RequestService<S> {
    store: Arc<S>,
    ledger: DayUniqueLedger<S>,
    registry: Arc<ResourceRegistry>,
    config: LedgerConfig,
}

impl<S: LedgerStore> RequestService<S> {
    /// Creates a request service.
    #[must_use]
    pub fn new(store: Arc<S>, registry: Arc<ResourceRegistry>, config: LedgerConfig) -> Self {
        Self {
            ledger: DayUniqueLedger::new(Arc::clone(&store), &registry),
            store,
            registry,
            config,
        }
    }

    fn resolver(&self) -> PolicyResolver<'_> {
        PolicyResolver {
            registry: &self.registry,
            hours_per_day: self.config.hours_per_day,
        }
    }

    fn resource(&self, name: &str) -> Result<&ResourceType, StoreError> {
        self.registry
            .get(name)
            .ok_or_else(|| PolicyError::UnknownResourceType(name.to_string()).into())
    }

    /// Balances of every policy granting `resource_type` to an entity on
    /// `on`, accrued up to `as_of`.
    pub async fn resource_balance(
        &self,
        entity_id: EntityId,
        resource_type: &str,
        on: NaiveDate,
        as_of: NaiveDate,
    ) -> Result<ResourceBalance, StoreError> {
        let resource = self.resource(resource_type)?;
        self.store
            .view(|view| {
                let entity = PolicyResolver::entity(view, entity_id)?;
                self.build_balance(view, &entity, resource, (on, on), as_of)
                    .map(|(balance, _)| balance)
            })
            .await
    }

    /// Distributes and books a request.
    ///
    /// An unsatisfiable request books nothing and reports
    /// [`RequestStatus::Insufficient`].
    pub async fn submit(&self, request: ConsumptionRequest) -> Result<RequestOutcome, StoreError> {
        if request.days.is_empty() {
            return Err(LedgerError::EmptyRequest.into());
        }
        let resource = self.resource(&request.resource_type)?;
        let per_day = Amount::new(request.amount_per_day, resource.unit);
        if per_day.is_zero() {
            return Err(LedgerError::ZeroAmount.into());
        }
        if per_day.is_negative() {
            return Err(LedgerError::InvalidSign {
                tx_type: TransactionType::Consumption,
                delta: per_day,
            }
            .into());
        }

        self.store
            .with_tx(|scope| self.submit_in(scope, &request, resource, per_day))
            .await
    }

    /// Turns the pending holds of a request into consumption.
    pub async fn approve(
        &self,
        entity_id: EntityId,
        request_key: &str,
    ) -> Result<Vec<Transaction>, StoreError> {
        self.store
            .with_tx(|scope| {
                let booked = request_transactions(&*scope, entity_id, request_key);
                let pending: Vec<&Transaction> = booked
                    .iter()
                    .filter(|tx| tx.tx_type == TransactionType::Pending && !scope.is_reversed(tx.id))
                    .collect();
                if pending.is_empty() {
                    return Err(match booked.first() {
                        Some(tx) => LedgerError::NotPending(tx.id).into(),
                        None => StoreError::NotFound(format!("request {request_key}")),
                    });
                }

                let mut batch = Vec::with_capacity(pending.len() * 2);
                for hold in pending {
                    batch.push(ReversalService::create_reversal(hold, &[], "approved")?);
                    let key = hold.key().unwrap_or(request_key);
                    batch.push(
                        Transaction::builder(
                            hold.entity_id,
                            hold.policy_id,
                            hold.resource_type.clone(),
                            TransactionType::Consumption,
                            hold.effective_at,
                            hold.delta,
                        )
                        .reason(hold.reason.clone())
                        .idempotency_key(format!("{key}:approved"))
                        .metadata(REQUEST_KEY, request_key)
                        .metadata("approved_from", hold.id.to_string())
                        .build()?,
                    );
                }
                self.ledger.append_in(scope, batch.clone())?;
                info!(%entity_id, request_key, "Request approved");
                Ok(batch)
            })
            .await
    }

    /// Reverses every active booking of a request.
    pub async fn cancel(
        &self,
        entity_id: EntityId,
        request_key: &str,
        reason: &str,
    ) -> Result<Vec<Transaction>, StoreError> {
        self.store
            .with_tx(|scope| {
                let booked = request_transactions(&*scope, entity_id, request_key);
                let reversals = booked
                    .iter()
                    .filter(|tx| tx.tx_type.is_consumption_like() && !scope.is_reversed(tx.id))
                    .map(|tx| ReversalService::create_reversal(tx, &[], reason))
                    .collect::<Result<Vec<_>, _>>()?;
                if reversals.is_empty() {
                    return Err(StoreError::NotFound(format!("request {request_key}")));
                }
                self.ledger.append_in(scope, reversals.clone())?;
                info!(%entity_id, request_key, count = reversals.len(), "Request cancelled");
                Ok(reversals)
            })
            .await
    }

    fn submit_in(
        &self,
        scope: &mut dyn TxScope,
        request: &ConsumptionRequest,
        resource: &ResourceType,
        per_day: Amount,
    ) -> Result<RequestOutcome, StoreError> {
        let mut days = request.days.clone();
        days.sort_unstable();
        let (first, last) = match (days.first(), days.last()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => return Err(LedgerError::EmptyRequest.into()),
        };

        let entity = PolicyResolver::entity(&*scope, request.entity_id)?;
        let (balance, constraints) =
            self.build_balance(&*scope, &entity, resource, (first, last), request.submitted_on)?;
        let total = per_day.scale(Decimal::from(days.len()));
        constraints.validate_request(total.value)?;
        let allow_negative = constraints.allow_negative || self.config.default_allow_negative;

        let (bookings, shortfall, unallocated) = if resource.unique_per_time_point {
            let distribution =
                ConsumptionDistributor::distribute_days(&balance, &days, per_day, allow_negative)?;
            if !distribution.is_satisfiable {
                return Ok(insufficient(request, distribution.shortfall, distribution.unallocated));
            }
            let bookings = distribution
                .days
                .iter()
                .map(|d| (d.day, d.policy_id, d.amount, d.requires_approval))
                .collect::<Vec<_>>();
            (bookings, distribution.shortfall, Vec::new())
        } else {
            let distribution = ConsumptionDistributor::distribute(&balance, total, allow_negative)?;
            if !distribution.is_satisfiable {
                return Ok(insufficient(request, distribution.shortfall, Vec::new()));
            }
            let bookings = distribution
                .allocations
                .iter()
                .map(|a| (first, a.policy_id, a.amount, a.requires_approval))
                .collect::<Vec<_>>();
            (bookings, distribution.shortfall, Vec::new())
        };

        let transactions = bookings
            .into_iter()
            .map(|(day, policy_id, amount, requires_approval)| {
                booking(request, resource, day, policy_id, amount, requires_approval)
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.ledger.append_in(scope, transactions.clone())?;

        let status = if transactions
            .iter()
            .any(|tx| tx.tx_type == TransactionType::Pending)
        {
            RequestStatus::PendingApproval
        } else {
            RequestStatus::Approved
        };
        info!(
            entity_id = %request.entity_id,
            resource_type = %request.resource_type,
            request_key = %request.idempotency_key,
            days = days.len(),
            status = ?status,
            "Request booked"
        );
        Ok(RequestOutcome {
            request_key: request.idempotency_key.clone(),
            status,
            transactions,
            shortfall,
            unallocated,
        })
    }

    /// Builds the resource balance over `[first, last]` and returns it with
    /// the constraints of the highest-priority policy.
    fn build_balance(
        &self,
        view: &dyn LedgerView,
        entity: &Entity,
        resource: &ResourceType,
        (first, last): (NaiveDate, NaiveDate),
        as_of: NaiveDate,
    ) -> Result<(ResourceBalance, Constraints), StoreError> {
        let mut balance = ResourceBalance::new(entity.id, resource.name.clone(), resource.unit);
        let mut primary = None;

        for assignment in view.entity_assignments(entity.id) {
            if !assignment.is_active_on(first) || !assignment.is_active_on(last) {
                continue;
            }
            let policy = self.resolver().policy(view, entity, assignment.policy_id)?;
            if policy.resource_type != resource.name {
                continue;
            }
            let period = policy.period_for(last, entity.hire_date)?;
            if !period.contains_date(first) {
                return Err(LedgerError::RequestSpansPeriods.into());
            }
            let policy_balance = PolicyResolver::balance(
                view,
                entity,
                &policy,
                &period,
                TimePoint::day(as_of),
                assignment.effective_from,
            );
            primary.get_or_insert(policy.constraints);
            balance.policy_balances.push(PolicyBalance {
                policy_id: policy.id,
                policy_name: policy.name.clone(),
                consumption_mode: policy.consumption_mode,
                is_unlimited: policy.is_unlimited,
                balance: policy_balance,
                priority: assignment.consumption_priority,
                approval: assignment.approval,
            });
        }

        let constraints = primary.ok_or_else(|| LedgerError::NoActiveAssignment {
            entity_id: entity.id,
            resource_type: resource.name.clone(),
        })?;
        Ok((balance, constraints))
    }
}

fn booking(
    request: &ConsumptionRequest,
    resource: &ResourceType,
    day: NaiveDate,
    policy_id: PolicyId,
    amount: Amount,
    requires_approval: bool,
) -> Result<Transaction, LedgerError> {
    let tx_type = if requires_approval {
        TransactionType::Pending
    } else {
        TransactionType::Consumption
    };
    Transaction::builder(
        request.entity_id,
        policy_id,
        resource.name.clone(),
        tx_type,
        TimePoint::day(day),
        -amount,
    )
    .reason(request.reason.clone())
    .idempotency_key(format!("{}:{day}:{policy_id}", request.idempotency_key))
    .metadata(REQUEST_KEY, request.idempotency_key.clone())
    .build()
}

fn insufficient(
    request: &ConsumptionRequest,
    shortfall: Amount,
    unallocated: Vec<NaiveDate>,
) -> RequestOutcome {
    info!(
        entity_id = %request.entity_id,
        resource_type = %request.resource_type,
        request_key = %request.idempotency_key,
        %shortfall,
        "Request exceeds available balance"
    );
    RequestOutcome {
        request_key: request.idempotency_key.clone(),
        status: RequestStatus::Insufficient,
        transactions: Vec::new(),
        shortfall,
        unallocated,
    }
}

fn request_transactions(view: &dyn LedgerView, entity_id: EntityId, key: &str) -> Vec<Transaction> {
    view.entity_transactions(
        entity_id,
        TimePoint::day(NaiveDate::MIN),
        TimePoint::at(NaiveDateTime::MAX),
    )
    .into_iter()
    .filter(|tx| tx.metadata.get(REQUEST_KEY).and_then(|v| v.as_str()) == Some(key))
    .collect()
}
