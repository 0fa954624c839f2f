//! Shared types, errors, and configuration for Accrue.
//!
//! This crate provides common types used across all other crates:
//! - Amount types with decimal precision and unit tags
//! - Typed IDs for type-safe entity references
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, LedgerConfig, ReconcilerConfig};
pub use error::{AppError, AppResult};
