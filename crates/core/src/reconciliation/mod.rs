//! Period-end reconciliation: carryover, expiry, caps and proration.

pub mod engine;
pub mod error;
pub mod types;

#[cfg(test)]
mod engine_props;

pub use engine::ReconciliationEngine;
pub use error::ReconciliationError;
pub use types::{ReconciliationInput, ReconciliationOutput, ReconciliationSummary};
