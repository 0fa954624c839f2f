//! Ledger storage and services for Accrue.
//!
//! This crate provides:
//! - The store contract (`LedgerStore`, `EntityLedgerStore`, `Directory`,
//!   `TxScope`)
//! - `MemoryStore`, an in-process store behind a `tokio` read/write lock
//! - `DayUniqueLedger`, which rejects a second booking of the same day
//! - `RequestService` for submitting, approving and cancelling requests
//! - `ReconciliationRunner` for period-end and policy-change reconciliation
//! - Snapshot loading for the reconciler binary

pub mod contract;
pub mod error;
pub mod memory;
pub mod requests;
mod resolve;
pub mod runner;
pub mod snapshot;
pub mod unique_day;

pub use contract::{
    Directory, EntityLedgerStore, LedgerStore, LedgerView, RunRecord, TxScope, cancellable,
};
pub use error::{StoreError, UniqueConstraint};
pub use memory::MemoryStore;
pub use requests::{ConsumptionRequest, RequestOutcome, RequestService, RequestStatus};
pub use runner::{ReconciliationRunner, RunFailure, RunReport};
pub use snapshot::{HoursWorkedEntry, LedgerSnapshot};
pub use unique_day::DayUniqueLedger;
