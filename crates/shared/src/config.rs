//! Application configuration management.

use std::path::PathBuf;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::types::DEFAULT_HOURS_PER_DAY;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Ledger behaviour configuration.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Reconciliation runner configuration.
    pub reconciler: ReconcilerConfig,
}

/// Ledger behaviour configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Working hours in one day, used for hours to days conversion.
    #[serde(default = "default_hours_per_day", with = "rust_decimal::serde::str")]
    pub hours_per_day: Decimal,
    /// Whether requests may overdraw when the policy does not say otherwise.
    #[serde(default)]
    pub default_allow_negative: bool,
}

fn default_hours_per_day() -> Decimal {
    DEFAULT_HOURS_PER_DAY
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            hours_per_day: default_hours_per_day(),
            default_allow_negative: false,
        }
    }
}

/// Reconciliation runner configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconcilerConfig {
    /// Path to the JSON ledger snapshot to reconcile.
    pub snapshot_path: PathBuf,
    /// Date to reconcile as of. Defaults to today when absent.
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
    /// Emit the resulting ledger transactions alongside the summaries.
    #[serde(default)]
    pub print_transactions: bool,
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("ACCRUE").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
