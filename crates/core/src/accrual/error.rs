//! Accrual schedule error types.

use accrue_shared::types::Unit;
use thiserror::Error;

/// Errors raised while building accrual schedules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccrualError {
    /// Annual quantities and grant ratios must be positive.
    #[error("Accrual rate must be positive")]
    NonPositiveRate,

    /// Tenure schedules need at least one tier.
    #[error("Tenure schedule must define at least one tier")]
    EmptyTiers,

    /// Two tiers share the same threshold.
    #[error("Duplicate tenure tier for {0} years")]
    DuplicateTier(u32),

    /// Hours-worked accrual can only produce hours or days.
    #[error("Hours-worked accrual cannot produce {0}")]
    UnsupportedUnit(Unit),

    /// Accrual year start month must be 1-12.
    #[error("Accrual year start month must be between 1 and 12, got {0}")]
    InvalidYearStartMonth(u32),
}
