//! Ledger error types for invariant and request errors.

use accrue_shared::types::{Amount, AmountError, EntityId, TransactionId};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use super::types::TransactionType;

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Transaction delta cannot be zero.
    #[error("Transaction amount cannot be zero")]
    ZeroAmount,

    /// The delta sign does not match the transaction type.
    #[error("A {tx_type} transaction cannot carry {delta}")]
    InvalidSign {
        /// The transaction type.
        tx_type: TransactionType,
        /// The offending delta.
        delta: Amount,
    },

    /// A reversal must reference the transaction it cancels.
    #[error("Reversal must reference the original transaction")]
    MissingReference,

    /// Amounts with different units were combined.
    #[error(transparent)]
    Amount(#[from] AmountError),

    // ========== Invariant Violations ==========
    /// The idempotency key was already used.
    #[error("Duplicate idempotency key: {0}")]
    DuplicateIdempotencyKey(String),

    /// The entity already consumes this resource on that day.
    #[error("Entity {entity_id} already has {resource_type} booked on {day}")]
    DuplicateDayConsumption {
        /// The entity.
        entity_id: EntityId,
        /// The resource type.
        resource_type: String,
        /// The calendar day.
        day: NaiveDate,
    },

    // ========== Reversal Errors ==========
    /// Transaction not found.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    /// The transaction already has a reversal.
    #[error("Transaction {0} is already reversed")]
    AlreadyReversed(TransactionId),

    /// Reversals cannot themselves be reversed.
    #[error("Transaction {0} is a reversal and cannot be reversed")]
    CannotReverseReversal(TransactionId),

    /// A reversal does not mirror the transaction it references.
    #[error("Reversal of {original_id} does not match the original {field}")]
    ReversalMismatch {
        /// The referenced transaction.
        original_id: TransactionId,
        /// The first field that differs.
        field: &'static str,
    },

    /// Only pending transactions can be approved.
    #[error("Transaction {0} is not pending")]
    NotPending(TransactionId),

    // ========== Request Errors ==========
    /// A request must cover at least one day and a positive amount.
    #[error("Request must cover at least one day with a positive amount")]
    EmptyRequest,

    /// Requested amount is below the policy minimum.
    #[error("Requested {requested} is below the minimum of {minimum}")]
    RequestBelowMinimum {
        /// Total requested.
        requested: Decimal,
        /// Policy minimum.
        minimum: Decimal,
    },

    /// Requested amount is above the policy maximum.
    #[error("Requested {requested} is above the maximum of {maximum}")]
    RequestAboveMaximum {
        /// Total requested.
        requested: Decimal,
        /// Policy maximum.
        maximum: Decimal,
    },

    /// Requested days fall into more than one period.
    #[error("Request days span more than one period")]
    RequestSpansPeriods,

    /// The entity has no active assignment for the resource.
    #[error("Entity {entity_id} has no active {resource_type} assignment")]
    NoActiveAssignment {
        /// The entity.
        entity_id: EntityId,
        /// The resource type.
        resource_type: String,
    },
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ZeroAmount => "ZERO_AMOUNT",
            Self::InvalidSign { .. } => "INVALID_SIGN",
            Self::MissingReference => "MISSING_REFERENCE",
            Self::Amount(_) => "UNIT_MISMATCH",
            Self::DuplicateIdempotencyKey(_) => "DUPLICATE_IDEMPOTENCY_KEY",
            Self::DuplicateDayConsumption { .. } => "DUPLICATE_DAY_CONSUMPTION",
            Self::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            Self::AlreadyReversed(_) => "ALREADY_REVERSED",
            Self::CannotReverseReversal(_) => "CANNOT_REVERSE_REVERSAL",
            Self::ReversalMismatch { .. } => "REVERSAL_MISMATCH",
            Self::NotPending(_) => "NOT_PENDING",
            Self::EmptyRequest => "EMPTY_REQUEST",
            Self::RequestBelowMinimum { .. } => "REQUEST_BELOW_MINIMUM",
            Self::RequestAboveMaximum { .. } => "REQUEST_ABOVE_MAXIMUM",
            Self::RequestSpansPeriods => "REQUEST_SPANS_PERIODS",
            Self::NoActiveAssignment { .. } => "NO_ACTIVE_ASSIGNMENT",
        }
    }

    /// Returns true if this error is retryable.
    ///
    /// Invariant violations reflect user intent and are never retried blindly.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn is_retryable(&self) -> bool {
        false
    }
}
