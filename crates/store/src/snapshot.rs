//! JSON ledger snapshots.

use std::path::Path;

use accrue_core::accrual::HoursWorkedRecord;
use accrue_core::ledger::Transaction;
use accrue_core::policy::{
    Entity, PolicyAssignment, PolicyDefinition, ResourceRegistry, ResourceType,
};
use accrue_shared::types::EntityId;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::contract::{Directory, LedgerStore};
use crate::error::StoreError;
use crate::memory::MemoryStore;

/// Payroll hours reported for one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoursWorkedEntry {
    /// The entity.
    pub entity_id: EntityId,
    /// Reported records.
    pub records: Vec<HoursWorkedRecord>,
}

/// Everything needed to rebuild a store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Resource types beyond the built-in defaults.
    #[serde(default)]
    pub resources: Vec<ResourceType>,
    /// Policy definitions.
    #[serde(default)]
    pub policies: Vec<PolicyDefinition>,
    /// Entities.
    #[serde(default)]
    pub entities: Vec<Entity>,
    /// Policy assignments.
    #[serde(default)]
    pub assignments: Vec<PolicyAssignment>,
    /// Ledger transactions in append order.
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    /// Payroll hours per entity.
    #[serde(default)]
    pub hours_worked: Vec<HoursWorkedEntry>,
}

impl LedgerSnapshot {
    /// Decodes a snapshot.
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        serde_json::from_str(json)
            .map_err(|e| StoreError::Backend(format!("invalid snapshot: {e}")))
    }

    /// Reads and decodes a snapshot file.
    pub async fn load(path: &Path) -> Result<Self, StoreError> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| StoreError::Backend(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    /// The default registry extended with the snapshot's resource types.
    pub fn registry(&self) -> Result<ResourceRegistry, StoreError> {
        let mut registry = ResourceRegistry::with_defaults();
        for resource in &self.resources {
            registry.register(resource.clone())?;
        }
        Ok(registry)
    }

    /// Loads the snapshot into a fresh [`MemoryStore`].
    ///
    /// Policy definitions are validated against `registry` first, and the
    /// transactions are appended as one batch.
    pub async fn into_store(self, registry: &ResourceRegistry) -> Result<MemoryStore, StoreError> {
        for policy in &self.policies {
            policy.validate(registry)?;
        }

        let store = MemoryStore::with_registry(registry);
        let counts = (
            self.policies.len(),
            self.entities.len(),
            self.assignments.len(),
            self.transactions.len(),
        );
        for policy in self.policies {
            store.put_policy(policy).await?;
        }
        for entity in self.entities {
            store.put_entity(entity).await?;
        }
        for assignment in self.assignments {
            store.put_assignment(assignment).await?;
        }
        for entry in self.hours_worked {
            store.put_hours_worked(entry.entity_id, entry.records).await?;
        }
        store.append_batch(self.transactions).await?;

        info!(
            policies = counts.0,
            entities = counts.1,
            assignments = counts.2,
            transactions = counts.3,
            "Snapshot loaded"
        );
        Ok(store)
    }
}
