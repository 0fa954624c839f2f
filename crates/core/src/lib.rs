//! Core accounting logic for Accrue.
//!
//! This crate contains pure business logic with ZERO storage or runtime
//! dependencies. Every calculation is a function of its inputs: balances are
//! folded from transactions, accruals are generated from schedules and
//! reconciliation returns the rows to append.
//!
//! # Modules
//!
//! - `period` - Time points, period configurations and period arithmetic
//! - `accrual` - Accrual schedules and share allocation
//! - `policy` - Resource types, policies, assignments and JSON definitions
//! - `ledger` - Transactions, balance calculation and reversals
//! - `distribution` - Splitting consumption across prioritized policies
//! - `reconciliation` - Carryover, expiry and caps at period boundaries

pub mod accrual;
pub mod distribution;
pub mod ledger;
pub mod period;
pub mod policy;
pub mod reconciliation;
