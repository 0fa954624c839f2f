//! Common types used across the application.

pub mod amount;
pub mod id;

pub use amount::{Amount, AmountError, DEFAULT_HOURS_PER_DAY, Unit};
pub use id::*;
