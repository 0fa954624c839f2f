//! Explicit registry of resource types.

use std::collections::{BTreeMap, BTreeSet};

use accrue_shared::types::Unit;
use serde::{Deserialize, Serialize};

use super::error::PolicyError;

/// A kind of accruable resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceType {
    /// Registry key, e.g. `pto`.
    pub name: String,
    /// Unit every policy of this resource uses.
    pub unit: Unit,
    /// At most one active consumption per entity and calendar day.
    #[serde(default)]
    pub unique_per_time_point: bool,
}

impl ResourceType {
    /// Creates a resource type.
    pub fn new(name: impl Into<String>, unit: Unit, unique_per_time_point: bool) -> Self {
        Self {
            name: name.into(),
            unit,
            unique_per_time_point,
        }
    }
}

/// Resource types known to the process, built once at start-up and passed
/// by reference to parsing code.
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    resources: BTreeMap<String, ResourceType>,
}

impl ResourceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in resource types.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for resource in [
            ResourceType::new("pto", Unit::Days, true),
            ResourceType::new("sick", Unit::Days, true),
            ResourceType::new("floating_holiday", Unit::Days, true),
            ResourceType::new("points", Unit::Points, false),
            ResourceType::new("kudos", Unit::Points, false),
            ResourceType::new("learning_budget", Unit::Dollars, false),
        ] {
            registry.resources.insert(resource.name.clone(), resource);
        }
        registry
    }

    /// Registers a resource type. Re-registering an identical definition is
    /// a no-op.
    pub fn register(&mut self, resource: ResourceType) -> Result<(), PolicyError> {
        match self.resources.get(&resource.name) {
            Some(existing) if *existing == resource => Ok(()),
            Some(_) => Err(PolicyError::ConflictingResourceType(resource.name)),
            None => {
                self.resources.insert(resource.name.clone(), resource);
                Ok(())
            }
        }
    }

    /// Looks up a resource type by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ResourceType> {
        self.resources.get(name)
    }

    /// Returns the named resource type, registering a non-unique one in
    /// `unit` if it is missing.
    pub fn get_or_create(&mut self, name: &str, unit: Unit) -> Result<&ResourceType, PolicyError> {
        let resource = self
            .resources
            .entry(name.to_string())
            .or_insert_with(|| ResourceType::new(name, unit, false));
        if resource.unit != unit {
            return Err(PolicyError::UnitMismatch {
                resource_type: name.to_string(),
                expected: resource.unit,
                actual: unit,
            });
        }
        Ok(resource)
    }

    /// Names of resource types enforcing day uniqueness.
    #[must_use]
    pub fn unique_resources(&self) -> BTreeSet<String> {
        self.resources
            .values()
            .filter(|r| r.unique_per_time_point)
            .map(|r| r.name.clone())
            .collect()
    }

    /// Iterates over all registered resource types in name order.
    pub fn iter(&self) -> impl Iterator<Item = &ResourceType> {
        self.resources.values()
    }
}
