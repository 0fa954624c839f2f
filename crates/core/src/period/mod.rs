//! Calendar points and accounting periods.
//!
//! - `TimePoint` - a calendar instant with day or second granularity
//! - `Period` - a closed-inclusive range of calendar days with a shape
//! - `PeriodConfig` - how a policy slices time into periods

pub mod calendar;
pub mod error;
pub mod time_point;

pub use calendar::{Period, PeriodConfig, PeriodSpan};
pub use error::PeriodError;
pub use time_point::{Granularity, TimePoint};
