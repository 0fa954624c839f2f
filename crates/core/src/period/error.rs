//! Period error types.

use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised while building periods.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeriodError {
    /// Period start is after its end.
    #[error("Invalid period: start {start} is after end {end}")]
    InvalidRange {
        /// Start date.
        start: NaiveDate,
        /// End date.
        end: NaiveDate,
    },

    /// Fiscal year start month must be 1-12.
    #[error("Fiscal year start month must be between 1 and 12, got {0}")]
    InvalidFiscalStartMonth(u32),

    /// Rolling window must span at least one day.
    #[error("Rolling window must span at least one day")]
    EmptyRollingWindow,

    /// Anniversary periods need the entity hire date.
    #[error("Anniversary periods require a hire date")]
    MissingHireDate,

    /// Date arithmetic left the supported calendar range.
    #[error("Date out of supported range")]
    OutOfRange,
}
