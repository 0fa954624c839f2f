//! Day-uniqueness wrapper.
//!
//! An entity cannot consume the same resource twice on one calendar day,
//! whichever policy the consumption is booked against. Only active
//! consumption and pending transactions of resource types flagged
//! `unique_per_time_point` take part; a reversed booking frees its day.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use accrue_core::ledger::{LedgerError, Transaction, TransactionType};
use accrue_core::period::TimePoint;
use accrue_core::policy::ResourceRegistry;
use accrue_shared::types::{EntityId, TransactionId};
use tracing::warn;

use crate::contract::{LedgerStore, TxScope};
use crate::error::StoreError;

/// Ledger wrapper enforcing one booking per entity, resource and day.
#[derive(Debug, Clone)]
pub struct DayUniqueLedger<S> {
    inner: Arc<S>,
    unique_resources: BTreeSet<String>,
}

impl<S> DayUniqueLedger<S> {
    /// Wraps `inner`, taking the unique resource types from `registry`.
    #[must_use]
    pub fn new(inner: Arc<S>, registry: &ResourceRegistry) -> Self {
        Self {
            inner,
            unique_resources: registry.unique_resources(),
        }
    }

    /// The wrapped store.
    #[must_use]
    pub fn inner(&self) -> &Arc<S> {
        &self.inner
    }

    /// Returns true if the uniqueness rule applies to `tx`.
    #[must_use]
    pub fn applies_to(&self, tx: &Transaction) -> bool {
        tx.is_unique_day_candidate() && self.unique_resources.contains(&tx.resource_type)
    }

    /// Rejects two bookings of the same day within one batch.
    pub fn check_batch(&self, txs: &[Transaction]) -> Result<(), LedgerError> {
        let reversed = reversed_in(txs);
        let mut seen: HashSet<(EntityId, String)> = HashSet::new();
        for tx in txs {
            if !self.applies_to(tx) || reversed.contains(&tx.id) {
                continue;
            }
            if !seen.insert((tx.entity_id, tx.day_key())) {
                return Err(duplicate(tx));
            }
        }
        Ok(())
    }

    /// Checks `txs` against the ledger visible in `scope` and appends them.
    ///
    /// Nothing is written when any transaction conflicts.
    pub fn append_in(
        &self,
        scope: &mut dyn TxScope,
        txs: Vec<Transaction>,
    ) -> Result<(), StoreError> {
        self.check_batch(&txs)?;
        let reversed = reversed_in(&txs);

        for tx in txs.iter().filter(|tx| self.applies_to(tx)) {
            if reversed.contains(&tx.id) {
                continue;
            }
            let date = tx.effective_at.date();
            let from = TimePoint::day(date);
            let to = date.and_hms_opt(23, 59, 59).map_or(from, TimePoint::at);
            let conflict = scope
                .entity_transactions(tx.entity_id, from, to)
                .into_iter()
                .find(|existing| {
                    existing.resource_type == tx.resource_type
                        && existing.is_unique_day_candidate()
                        && !scope.is_reversed(existing.id)
                        && !reversed.contains(&existing.id)
                });
            if let Some(existing) = conflict {
                warn!(
                    entity_id = %tx.entity_id,
                    resource_type = %tx.resource_type,
                    day = %date,
                    existing_id = %existing.id,
                    "Rejected second booking of a day"
                );
                return Err(duplicate(tx).into());
            }
        }

        for tx in txs {
            scope.insert(tx).map_err(StoreError::into_domain)?;
        }
        Ok(())
    }
}

impl<S: LedgerStore> DayUniqueLedger<S> {
    /// Appends one transaction.
    pub async fn append(&self, tx: Transaction) -> Result<(), StoreError> {
        self.append_batch(vec![tx]).await
    }

    /// Appends all transactions or none.
    pub async fn append_batch(&self, txs: Vec<Transaction>) -> Result<(), StoreError> {
        self.inner
            .with_tx(|scope| self.append_in(scope, txs))
            .await
    }
}

fn reversed_in(txs: &[Transaction]) -> HashSet<TransactionId> {
    txs.iter()
        .filter(|tx| tx.tx_type == TransactionType::Reversal)
        .filter_map(|tx| tx.reference_id)
        .collect()
}

fn duplicate(tx: &Transaction) -> LedgerError {
    LedgerError::DuplicateDayConsumption {
        entity_id: tx.entity_id,
        resource_type: tx.resource_type.clone(),
        day: tx.effective_at.date(),
    }
}
