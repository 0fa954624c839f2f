//! Accrual schedules.
//!
//! Accruals are never stored. They are regenerated from the schedule
//! definition whenever a balance is computed:
//! - [`YearlyAccrual`]: fixed annual quantity
//! - [`TenureAccrual`]: annual quantity looked up from service-year tiers
//! - [`HoursWorkedAccrual`]: earned from observed payroll records

pub mod allocation;
pub mod error;
pub mod hours_worked;
pub mod schedule;
pub mod tenure;
pub mod yearly;

#[cfg(test)]
mod accrual_props;

pub use allocation::AllocationUtil;
pub use error::AccrualError;
pub use hours_worked::{HoursWorkedAccrual, HoursWorkedRecord};
pub use schedule::{ACCRUAL_SCALE, AccrualEvent, AccrualFrequency, AccrualSchedule};
pub use tenure::{TenureAccrual, TenureTier};
pub use yearly::YearlyAccrual;
