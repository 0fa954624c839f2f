//! Append-only ledger.
//!
//! This module implements:
//! - Immutable transactions and their sign rules
//! - Balance projection over a period
//! - Reversals
//! - Error types for ledger operations

pub mod balance;
pub mod error;
pub mod reversal;
pub mod transaction;
pub mod types;

#[cfg(test)]
mod balance_props;

pub use balance::{Balance, BalanceCalculator};
pub use error::LedgerError;
pub use reversal::{ReversalService, reversed_ids};
pub use transaction::{Transaction, TransactionBuilder};
pub use types::TransactionType;
