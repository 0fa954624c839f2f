//! Accrue reconciler
//!
//! Loads a ledger snapshot, runs one reconciliation pass as of the configured
//! date and prints each run as a JSON line on stdout.

use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use accrue_shared::AppConfig;
use accrue_store::{LedgerSnapshot, MemoryStore, ReconciliationRunner, RunReport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout stays machine readable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "accrue=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let as_of = config
        .reconciler
        .as_of
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let snapshot = LedgerSnapshot::load(&config.reconciler.snapshot_path)
        .await
        .with_context(|| {
            format!(
                "Failed to load snapshot {}",
                config.reconciler.snapshot_path.display()
            )
        })?;
    let registry = Arc::new(snapshot.registry()?);
    let store = Arc::new(snapshot.into_store(&registry).await?);
    info!(%as_of, "Snapshot loaded, reconciling");

    let runner = ReconciliationRunner::new(Arc::clone(&store), registry, &config.ledger);
    let report = runner.run_due(as_of).await?;

    print_report(&report, &store, config.reconciler.print_transactions).await?;

    if !report.failures.is_empty() {
        warn!(failures = report.failures.len(), "Some assignments failed");
    }
    Ok(())
}

async fn print_report(
    report: &RunReport,
    store: &MemoryStore,
    print_transactions: bool,
) -> anyhow::Result<()> {
    let written = if print_transactions {
        let ids: HashSet<_> = report
            .runs
            .iter()
            .flat_map(|run| run.transaction_ids.iter().copied())
            .collect();
        store
            .all_transactions()
            .await
            .into_iter()
            .filter(|tx| ids.contains(&tx.id))
            .collect()
    } else {
        Vec::new()
    };

    let mut out = std::io::stdout().lock();
    for run in &report.runs {
        writeln!(out, "{}", serde_json::to_string(run)?)?;
    }
    for failure in &report.failures {
        writeln!(out, "{}", serde_json::to_string(failure)?)?;
    }
    for tx in &written {
        writeln!(out, "{}", serde_json::to_string(tx)?)?;
    }
    Ok(())
}
