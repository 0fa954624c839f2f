//! Policies, assignments and the resource registry.

pub mod assignment;
pub mod error;
pub mod parser;
pub mod registry;
pub mod types;

pub use assignment::{ApprovalConfig, Entity, PolicyAssignment};
pub use error::PolicyError;
pub use parser::{AccrualDefinition, PolicyDefinition, PolicyParser};
pub use registry::{ResourceRegistry, ResourceType};
pub use types::{
    ConsumptionMode, Constraints, Policy, ReconciliationAction, ReconciliationRule,
    ReconciliationTrigger,
};
