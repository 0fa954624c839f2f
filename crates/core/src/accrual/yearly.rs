//! Fixed annual accrual.

use accrue_shared::types::Amount;
use chrono::NaiveDate;

use super::error::AccrualError;
use super::schedule::{AccrualEvent, AccrualFrequency};

/// A fixed annual quantity paid out at a frequency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearlyAccrual {
    /// Quantity earned over one full accrual year.
    pub annual_quantity: Amount,
    /// Payout frequency.
    pub frequency: AccrualFrequency,
    /// Month in which accrual years start (1-12).
    pub year_start_month: u32,
}

impl YearlyAccrual {
    /// Creates a yearly accrual anchored on calendar years.
    pub fn new(annual_quantity: Amount, frequency: AccrualFrequency) -> Result<Self, AccrualError> {
        if !annual_quantity.is_positive() {
            return Err(AccrualError::NonPositiveRate);
        }
        Ok(Self {
            annual_quantity,
            frequency,
            year_start_month: 1,
        })
    }

    /// Anchors accrual years on another month.
    pub fn with_year_start_month(mut self, month: u32) -> Result<Self, AccrualError> {
        if !(1..=12).contains(&month) {
            return Err(AccrualError::InvalidYearStartMonth(month));
        }
        self.year_start_month = month;
        Ok(self)
    }

    pub(crate) fn generate(&self, from: NaiveDate, to: NaiveDate) -> Vec<AccrualEvent> {
        let annual = self.annual_quantity.value;
        let label = format!("{} per year", self.annual_quantity.normalized());
        self.frequency.events(
            self.year_start_month,
            from,
            to,
            self.annual_quantity.unit,
            |_| (annual, label.clone()),
        )
    }
}
