//! Reconciliation error types.

use accrue_shared::types::Unit;
use chrono::NaiveDate;
use thiserror::Error;

use crate::ledger::LedgerError;

/// Errors raised by the reconciliation engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconciliationError {
    /// The balance is not in the policy unit.
    #[error("Balance is in {actual}, policy uses {expected}")]
    UnitMismatch {
        /// Policy unit.
        expected: Unit,
        /// Balance unit.
        actual: Unit,
    },

    /// The next period must start after the ending period.
    #[error("Next period starting {next_start} does not follow period ending {ending_end}")]
    InvalidPeriods {
        /// Last day of the ending period.
        ending_end: NaiveDate,
        /// First day of the next period.
        next_start: NaiveDate,
    },

    /// A generated transaction was rejected.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl ReconciliationError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnitMismatch { .. } => "RECONCILIATION_UNIT_MISMATCH",
            Self::InvalidPeriods { .. } => "RECONCILIATION_INVALID_PERIODS",
            Self::Ledger(e) => e.error_code(),
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Ledger(e) => e.is_retryable(),
            Self::UnitMismatch { .. } | Self::InvalidPeriods { .. } => false,
        }
    }
}
