//! Splitting consumption requests across prioritized policies.

pub mod distributor;
pub mod types;

#[cfg(test)]
mod distributor_props;

pub use distributor::ConsumptionDistributor;
pub use types::{
    Allocation, ConsumptionDistribution, DayAllocation, DayDistribution, PolicyBalance,
    ResourceBalance,
};
