//! The immutable ledger transaction.

use accrue_shared::types::{Amount, EntityId, PolicyId, TransactionId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::LedgerError;
use super::types::TransactionType;
use crate::period::TimePoint;

/// One immutable ledger row.
///
/// Transactions are never updated or deleted. Corrections are new
/// `Reversal` or `Adjustment` transactions referencing the original.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier.
    pub id: TransactionId,
    /// The resource holder.
    pub entity_id: EntityId,
    /// The policy the delta is booked against.
    pub policy_id: PolicyId,
    /// Resource type name.
    pub resource_type: String,
    /// When the delta takes effect.
    pub effective_at: TimePoint,
    /// Signed change to the balance.
    pub delta: Amount,
    /// Transaction kind.
    pub tx_type: TransactionType,
    /// Transaction this one refers to, e.g. the reversed original.
    #[serde(default)]
    pub reference_id: Option<TransactionId>,
    /// Human readable reason.
    #[serde(default)]
    pub reason: String,
    /// Globally unique when present.
    #[serde(default)]
    pub idempotency_key: Option<String>,
    /// Free-form context.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Transaction {
    /// Starts building a transaction.
    #[must_use]
    pub fn builder(
        entity_id: EntityId,
        policy_id: PolicyId,
        resource_type: impl Into<String>,
        tx_type: TransactionType,
        effective_at: TimePoint,
        delta: Amount,
    ) -> TransactionBuilder {
        TransactionBuilder {
            entity_id,
            policy_id,
            resource_type: resource_type.into(),
            tx_type,
            effective_at,
            delta,
            id: None,
            reference_id: None,
            reason: String::new(),
            idempotency_key: None,
            metadata: Map::new(),
        }
    }

    /// Checks the sign and reference rules of the transaction type.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.delta.is_zero() {
            return Err(LedgerError::ZeroAmount);
        }
        let sign_ok = match self.tx_type {
            TransactionType::Grant => self.delta.is_positive(),
            TransactionType::Consumption | TransactionType::Pending => self.delta.is_negative(),
            TransactionType::Reconciliation
            | TransactionType::Adjustment
            | TransactionType::Reversal => true,
        };
        if !sign_ok {
            return Err(LedgerError::InvalidSign {
                tx_type: self.tx_type,
                delta: self.delta,
            });
        }
        if self.tx_type == TransactionType::Reversal && self.reference_id.is_none() {
            return Err(LedgerError::MissingReference);
        }
        Ok(())
    }

    /// Returns true if the day-uniqueness rule applies to this transaction.
    #[must_use]
    pub fn is_unique_day_candidate(&self) -> bool {
        self.tx_type.is_consumption_like()
    }

    /// Returns the `resource:YYYY-MM-DD` key used for day uniqueness.
    #[must_use]
    pub fn day_key(&self) -> String {
        format!("{}:{}", self.resource_type, self.effective_at.day_key())
    }

    /// Returns the non-empty idempotency key.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.idempotency_key.as_deref().filter(|k| !k.is_empty())
    }
}

/// Builder for [`Transaction`].
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    entity_id: EntityId,
    policy_id: PolicyId,
    resource_type: String,
    tx_type: TransactionType,
    effective_at: TimePoint,
    delta: Amount,
    id: Option<TransactionId>,
    reference_id: Option<TransactionId>,
    reason: String,
    idempotency_key: Option<String>,
    metadata: Map<String, Value>,
}

impl TransactionBuilder {
    /// Sets an explicit identifier.
    #[must_use]
    pub fn id(mut self, id: TransactionId) -> Self {
        self.id = Some(id);
        self
    }

    /// References another transaction.
    #[must_use]
    pub fn reference(mut self, id: TransactionId) -> Self {
        self.reference_id = Some(id);
        self
    }

    /// Sets the reason.
    #[must_use]
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Sets the idempotency key. Empty keys are ignored.
    #[must_use]
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.idempotency_key = (!key.is_empty()).then_some(key);
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Validates and builds the transaction.
    ///
    /// Without an explicit id, keyed transactions get a deterministic id
    /// derived from the key so that replays produce identical rows.
    pub fn build(self) -> Result<Transaction, LedgerError> {
        let id = self.id.unwrap_or_else(|| {
            self.idempotency_key
                .as_deref()
                .map_or_else(TransactionId::new, TransactionId::from_key)
        });
        let tx = Transaction {
            id,
            entity_id: self.entity_id,
            policy_id: self.policy_id,
            resource_type: self.resource_type,
            effective_at: self.effective_at,
            delta: self.delta,
            tx_type: self.tx_type,
            reference_id: self.reference_id,
            reason: self.reason,
            idempotency_key: self.idempotency_key,
            metadata: self.metadata,
        };
        tx.validate()?;
        Ok(tx)
    }
}
