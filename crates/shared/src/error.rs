//! Error surface shared by every Accrue crate.
//!
//! Layer-specific errors convert into [`AppError`] at crate boundaries so
//! callers outside the ledger see one code per failure class.

use thiserror::Error;

/// Result alias over [`AppError`].
pub type AppResult<T> = Result<T, AppError>;

/// Failure classes visible outside the ledger.
#[derive(Debug, Error)]
pub enum AppError {
    /// An entity, policy, assignment or transaction does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed input: bad amounts, units, dates or requests.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A ledger invariant would be broken.
    #[error("Business rule violation: {0}")]
    BusinessRule(String),

    /// Conflict (e.g., duplicate idempotency key or day already booked).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The backing store failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid policy or application configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Unexpected failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable SCREAMING_SNAKE code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::BusinessRule(_) => "BUSINESS_RULE_VIOLATION",
            Self::Conflict(_) => "CONFLICT",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns true if repeating the operation may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

impl From<crate::types::AmountError> for AppError {
    fn from(err: crate::types::AmountError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}
