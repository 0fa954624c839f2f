//! Policy configuration errors.
//!
//! These are raised while parsing policy definitions and never at
//! transaction time.

use accrue_shared::types::Unit;
use thiserror::Error;

use crate::accrual::AccrualError;
use crate::period::PeriodError;

/// Errors raised while building policies and the resource registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// The resource type is not registered.
    #[error("Unknown resource type: {0}")]
    UnknownResourceType(String),

    /// The policy unit differs from its resource type's unit.
    #[error("Resource type {resource_type} is measured in {expected}, policy uses {actual}")]
    UnitMismatch {
        /// The resource type name.
        resource_type: String,
        /// Unit of the resource type.
        expected: Unit,
        /// Unit requested by the policy.
        actual: Unit,
    },

    /// A tenure schedule or anniversary period needs a hire date.
    #[error("Policy {0} requires a hire date")]
    MissingHireDate(String),

    /// The accrual schedule is invalid.
    #[error("Invalid accrual: {0}")]
    InvalidAccrual(#[from] AccrualError),

    /// A reconciliation rule is invalid.
    #[error("Invalid reconciliation rule: {0}")]
    InvalidRule(String),

    /// The period configuration is invalid.
    #[error("Invalid period: {0}")]
    InvalidPeriod(#[from] PeriodError),

    /// The definition could not be decoded.
    #[error("Malformed policy definition: {0}")]
    Malformed(String),

    /// A resource type was registered twice with different settings.
    #[error("Resource type {0} is already registered with different settings")]
    ConflictingResourceType(String),

    /// An assignment operation is not valid for its dates.
    #[error("Invalid assignment: {0}")]
    InvalidAssignment(String),
}

impl PolicyError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownResourceType(_) => "UNKNOWN_RESOURCE_TYPE",
            Self::UnitMismatch { .. } => "UNIT_MISMATCH",
            Self::MissingHireDate(_) => "MISSING_HIRE_DATE",
            Self::InvalidAccrual(_) => "INVALID_ACCRUAL",
            Self::InvalidRule(_) => "INVALID_RECONCILIATION_RULE",
            Self::InvalidPeriod(_) => "INVALID_PERIOD",
            Self::Malformed(_) => "MALFORMED_POLICY",
            Self::ConflictingResourceType(_) => "CONFLICTING_RESOURCE_TYPE",
            Self::InvalidAssignment(_) => "INVALID_ASSIGNMENT",
        }
    }

    /// Configuration errors never succeed on retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        false
    }
}
