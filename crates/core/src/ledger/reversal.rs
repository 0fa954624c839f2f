//! Reversal of ledger transactions.
//!
//! A reversal negates the original delta and shares its effective date, so
//! it folds into the same period as the original.

use std::collections::HashSet;

use accrue_shared::types::TransactionId;

use super::error::LedgerError;
use super::transaction::Transaction;
use super::types::TransactionType;

/// Stateless service for creating reversing transactions.
pub struct ReversalService;

impl ReversalService {
    /// Builds the reversal of `original`.
    ///
    /// `existing` is searched for an earlier reversal of the same original.
    /// The reversal is keyed `reversal:{original id}`, so a concurrent
    /// duplicate is also rejected by the store.
    pub fn create_reversal(
        original: &Transaction,
        existing: &[Transaction],
        reason: &str,
    ) -> Result<Transaction, LedgerError> {
        if original.tx_type == TransactionType::Reversal {
            return Err(LedgerError::CannotReverseReversal(original.id));
        }
        if reversed_ids(existing).contains(&original.id) {
            return Err(LedgerError::AlreadyReversed(original.id));
        }

        Transaction::builder(
            original.entity_id,
            original.policy_id,
            original.resource_type.clone(),
            TransactionType::Reversal,
            original.effective_at,
            -original.delta,
        )
        .reference(original.id)
        .reason(format!("Reversal of {}: {reason}", original.tx_type))
        .idempotency_key(Self::idempotency_key(original.id))
        .metadata("reversed_type", original.tx_type.as_str())
        .build()
    }

    /// Checks that `reversal` mirrors `original`: same entity, policy and
    /// resource, and the exact negation of its delta.
    pub fn check_matches(reversal: &Transaction, original: &Transaction) -> Result<(), LedgerError> {
        let field = if reversal.entity_id != original.entity_id {
            "entity_id"
        } else if reversal.policy_id != original.policy_id {
            "policy_id"
        } else if reversal.resource_type != original.resource_type {
            "resource_type"
        } else if reversal.delta != -original.delta {
            "delta"
        } else {
            return Ok(());
        };
        Err(LedgerError::ReversalMismatch {
            original_id: original.id,
            field,
        })
    }

    /// Idempotency key of the reversal of `original`.
    #[must_use]
    pub fn idempotency_key(original: TransactionId) -> String {
        format!("reversal:{original}")
    }
}

/// Ids of transactions reversed by a reversal in `transactions`.
#[must_use]
pub fn reversed_ids(transactions: &[Transaction]) -> HashSet<TransactionId> {
    transactions
        .iter()
        .filter(|tx| tx.tx_type == TransactionType::Reversal)
        .filter_map(|tx| tx.reference_id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::TimePoint;
    use accrue_shared::types::{Amount, EntityId, PolicyId, Unit};
    use rust_decimal_macros::dec;

    fn consumption() -> Transaction {
        Transaction::builder(
            EntityId::new(),
            PolicyId::new(),
            "pto",
            TransactionType::Consumption,
            TimePoint::from_ymd(2025, 4, 1).unwrap(),
            Amount::new(dec!(-1), Unit::Days),
        )
        .reason("Dentist")
        .build()
        .unwrap()
    }

    #[test]
    fn test_reversal_negates_and_references() {
        let original = consumption();
        let reversal = ReversalService::create_reversal(&original, &[], "cancelled").unwrap();
        assert_eq!(reversal.tx_type, TransactionType::Reversal);
        assert_eq!(reversal.delta, Amount::new(dec!(1), Unit::Days));
        assert_eq!(reversal.effective_at, original.effective_at);
        assert_eq!(reversal.reference_id, Some(original.id));
        assert_eq!(reversal.reason, "Reversal of consumption: cancelled");
        assert_eq!(reversal.metadata["reversed_type"], "consumption");
    }

    #[test]
    fn test_reversal_is_deterministic() {
        let original = consumption();
        let a = ReversalService::create_reversal(&original, &[], "x").unwrap();
        let b = ReversalService::create_reversal(&original, &[], "x").unwrap();
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn test_double_reversal_rejected() {
        let original = consumption();
        let reversal = ReversalService::create_reversal(&original, &[], "x").unwrap();
        let existing = vec![original.clone(), reversal.clone()];
        assert_eq!(
            ReversalService::create_reversal(&original, &existing, "again"),
            Err(LedgerError::AlreadyReversed(original.id))
        );
        assert_eq!(
            ReversalService::create_reversal(&reversal, &existing, "again"),
            Err(LedgerError::CannotReverseReversal(reversal.id))
        );
    }

    fn forged(original: &Transaction, edit: fn(&mut Transaction)) -> Transaction {
        let mut reversal = ReversalService::create_reversal(original, &[], "x").unwrap();
        edit(&mut reversal);
        reversal
    }

    #[test]
    fn test_created_reversal_matches_original() {
        let original = consumption();
        let reversal = ReversalService::create_reversal(&original, &[], "x").unwrap();
        assert_eq!(ReversalService::check_matches(&reversal, &original), Ok(()));
    }

    #[test]
    fn test_mismatched_reversal_fields() {
        let original = consumption();
        let cases: [(&str, fn(&mut Transaction)); 4] = [
            ("delta", |r| r.delta = Amount::new(dec!(50), Unit::Days)),
            ("entity_id", |r| r.entity_id = EntityId::new()),
            ("policy_id", |r| r.policy_id = PolicyId::new()),
            ("resource_type", |r| r.resource_type = "sick".into()),
        ];
        for (field, edit) in cases {
            let reversal = forged(&original, edit);
            assert_eq!(
                ReversalService::check_matches(&reversal, &original),
                Err(LedgerError::ReversalMismatch {
                    original_id: original.id,
                    field,
                }),
                "{field}"
            );
        }
    }

    #[test]
    fn test_reversed_ids() {
        let original = consumption();
        let reversal = ReversalService::create_reversal(&original, &[], "x").unwrap();
        let ids = reversed_ids(&[original.clone(), reversal]);
        assert!(ids.contains(&original.id));
        assert_eq!(ids.len(), 1);
    }
}
