//! Store error types.

use accrue_core::ledger::LedgerError;
use accrue_core::period::PeriodError;
use accrue_core::policy::PolicyError;
use accrue_core::reconciliation::ReconciliationError;
use accrue_shared::AppError;
use accrue_shared::types::{EntityId, PolicyId};
use chrono::NaiveDate;
use thiserror::Error;

/// A uniqueness constraint enforced by the store itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UniqueConstraint {
    /// Non-empty idempotency keys are globally unique.
    IdempotencyKey(String),
    /// One active consumption per entity, resource and day.
    EntityDay {
        /// The entity.
        entity_id: EntityId,
        /// The resource type.
        resource_type: String,
        /// The calendar day.
        day: NaiveDate,
    },
    /// One reconciliation run per entity, policy and period end.
    Run {
        /// The entity.
        entity_id: EntityId,
        /// The policy.
        policy_id: PolicyId,
        /// Last day of the reconciled period.
        period_end: NaiveDate,
    },
}

impl std::fmt::Display for UniqueConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IdempotencyKey(key) => write!(f, "idempotency_key({key})"),
            Self::EntityDay {
                entity_id,
                resource_type,
                day,
            } => write!(f, "entity_day({entity_id}, {resource_type}, {day})"),
            Self::Run {
                entity_id,
                policy_id,
                period_end,
            } => write!(f, "run({entity_id}, {policy_id}, {period_end})"),
        }
    }
}

/// Errors raised by stores and the services built on them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A ledger invariant was violated.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// A store-level uniqueness constraint rejected a write.
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(UniqueConstraint),

    /// Policy or assignment configuration is invalid.
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// Period arithmetic failed.
    #[error(transparent)]
    Period(#[from] PeriodError),

    /// Reconciliation input was rejected.
    #[error(transparent)]
    Reconciliation(#[from] ReconciliationError),

    /// A referenced record does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The operation was cancelled before it completed.
    #[error("Operation cancelled")]
    Cancelled,

    /// The backing storage failed.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Translates store constraint violations into the matching ledger error.
    #[must_use]
    pub fn into_domain(self) -> Self {
        match self {
            Self::UniqueViolation(UniqueConstraint::IdempotencyKey(key)) => {
                Self::Ledger(LedgerError::DuplicateIdempotencyKey(key))
            }
            Self::UniqueViolation(UniqueConstraint::EntityDay {
                entity_id,
                resource_type,
                day,
            }) => Self::Ledger(LedgerError::DuplicateDayConsumption {
                entity_id,
                resource_type,
                day,
            }),
            Self::Reconciliation(ReconciliationError::Ledger(err)) => Self::Ledger(err),
            other => other,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Ledger(err) => err.error_code(),
            Self::UniqueViolation(_) => "UNIQUE_VIOLATION",
            Self::Policy(err) => err.error_code(),
            Self::Period(_) => "INVALID_PERIOD",
            Self::Reconciliation(err) => err.error_code(),
            Self::NotFound(_) => "NOT_FOUND",
            Self::Cancelled => "CANCELLED",
            Self::Backend(_) => "STORAGE_ERROR",
        }
    }

    /// Returns true if repeating the operation may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Backend(_))
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err.into_domain() {
            StoreError::Ledger(
                err @ (LedgerError::TransactionNotFound(_) | LedgerError::NoActiveAssignment { .. }),
            ) => Self::NotFound(err.to_string()),
            StoreError::Ledger(
                err @ (LedgerError::DuplicateIdempotencyKey(_)
                | LedgerError::DuplicateDayConsumption { .. }
                | LedgerError::AlreadyReversed(_)),
            ) => Self::Conflict(err.to_string()),
            StoreError::Ledger(err) => Self::Validation(err.to_string()),
            err @ StoreError::UniqueViolation(_) => Self::Conflict(err.to_string()),
            StoreError::Policy(err) => Self::Configuration(err.to_string()),
            err @ (StoreError::Period(_) | StoreError::Reconciliation(_)) => {
                Self::BusinessRule(err.to_string())
            }
            StoreError::NotFound(what) => Self::NotFound(what),
            err @ (StoreError::Cancelled | StoreError::Backend(_)) => {
                Self::Storage(err.to_string())
            }
        }
    }
}
