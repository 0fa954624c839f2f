//! Tenure-tiered annual accrual.

use accrue_shared::types::Unit;
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::AccrualError;
use super::schedule::{AccrualEvent, AccrualFrequency};

/// One step of a tenure ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenureTier {
    /// Completed service years required for this tier.
    pub after_years: u32,
    /// Annual quantity granted once the tier applies.
    pub annual_days: Decimal,
}

/// Annual accrual whose rate is looked up from service years.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenureAccrual {
    /// Tiers sorted by ascending `after_years`.
    pub tiers: Vec<TenureTier>,
    /// Unit of the tier quantities.
    pub unit: Unit,
    /// Payout frequency.
    pub frequency: AccrualFrequency,
    /// Start of service.
    pub hire_date: NaiveDate,
    /// Month in which accrual years start (1-12).
    pub year_start_month: u32,
}

impl TenureAccrual {
    /// Creates a tenure accrual from unordered tiers.
    pub fn new(
        mut tiers: Vec<TenureTier>,
        unit: Unit,
        frequency: AccrualFrequency,
        hire_date: NaiveDate,
    ) -> Result<Self, AccrualError> {
        if tiers.is_empty() {
            return Err(AccrualError::EmptyTiers);
        }
        if tiers.iter().any(|t| t.annual_days < Decimal::ZERO) {
            return Err(AccrualError::NonPositiveRate);
        }
        tiers.sort_by_key(|t| t.after_years);
        if let Some(pair) = tiers.windows(2).find(|w| w[0].after_years == w[1].after_years) {
            return Err(AccrualError::DuplicateTier(pair[0].after_years));
        }
        Ok(Self {
            tiers,
            unit,
            frequency,
            hire_date,
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

    /// Completed service years on `date`.
    #[must_use]
    pub fn service_years(&self, date: NaiveDate) -> u32 {
        if date < self.hire_date {
            return 0;
        }
        let mut years = date.year() - self.hire_date.year();
        if (date.month(), date.day()) < (self.hire_date.month(), self.hire_date.day()) {
            years -= 1;
        }
        u32::try_from(years).unwrap_or(0)
    }

    /// The highest tier whose threshold is met on `date`.
    #[must_use]
    pub fn tier_on(&self, date: NaiveDate) -> Option<&TenureTier> {
        let years = self.service_years(date);
        self.tiers.iter().rev().find(|t| t.after_years <= years)
    }

    pub(crate) fn generate(&self, from: NaiveDate, to: NaiveDate) -> Vec<AccrualEvent> {
        self.frequency
            .events(self.year_start_month, from, to, self.unit, |date| {
                self.tier_on(date).map_or_else(
                    || (Decimal::ZERO, String::new()),
                    |tier| {
                        (
                            tier.annual_days,
                            format!("{}+ years tier", tier.after_years),
                        )
                    },
                )
            })
    }
}
