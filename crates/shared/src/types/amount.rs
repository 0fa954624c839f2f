//! Amount type with decimal precision and a unit tag.
//!
//! CRITICAL: Never use floating-point for balance calculations.
//! This type wraps `rust_decimal::Decimal` for arbitrary precision.

use std::cmp::Ordering;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of working hours in one day.
pub const DEFAULT_HOURS_PER_DAY: Decimal = Decimal::from_parts(8, 0, 0, false, 0);

/// Errors raised when building or combining amounts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    /// Two amounts with different units were combined.
    #[error("Unit mismatch: expected {expected}, got {actual}")]
    UnitMismatch {
        /// The unit of the left-hand side.
        expected: Unit,
        /// The unit of the right-hand side.
        actual: Unit,
    },

    /// The unit string is not recognised.
    #[error("Unknown unit: {0}")]
    UnknownUnit(String),

    /// The value string is not a valid decimal.
    #[error("Invalid amount value: {0}")]
    InvalidValue(String),

    /// No conversion exists between the two units.
    #[error("Cannot convert {from} to {to}")]
    NoConversion {
        /// Source unit.
        from: Unit,
        /// Target unit.
        to: Unit,
    },
}

/// Units supported by the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    /// Calendar or working days.
    Days,
    /// Working hours.
    Hours,
    /// Reward points.
    Points,
    /// Currency amounts.
    Dollars,
}

impl Unit {
    /// Returns the lowercase name of the unit.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Days => "days",
            Self::Hours => "hours",
            Self::Points => "points",
            Self::Dollars => "dollars",
        }
    }

    /// Converts a raw value from `self` into `target`.
    ///
    /// Only days and hours are inter-convertible.
    pub fn convert(
        self,
        value: Decimal,
        target: Self,
        hours_per_day: Decimal,
    ) -> Result<Decimal, AmountError> {
        match (self, target) {
            (from, to) if from == to => Ok(value),
            (Self::Hours, Self::Days) if !hours_per_day.is_zero() => Ok(value / hours_per_day),
            (Self::Days, Self::Hours) => Ok(value * hours_per_day),
            (from, to) => Err(AmountError::NoConversion { from, to }),
        }
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Unit {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "days" | "day" => Ok(Self::Days),
            "hours" | "hour" => Ok(Self::Hours),
            "points" | "point" => Ok(Self::Points),
            "dollars" | "dollar" | "usd" => Ok(Self::Dollars),
            _ => Err(AmountError::UnknownUnit(s.to_string())),
        }
    }
}

/// An exact quantity of some resource.
///
/// Arithmetic through the standard operators is unit-homogeneous: combining
/// two units is a programming error and panics. Use the `checked_*` variants
/// when the units come from untrusted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Amount {
    /// The exact decimal value.
    #[serde(with = "rust_decimal::serde::str")]
    pub value: Decimal,
    /// The unit of the value.
    pub unit: Unit,
}

impl Amount {
    /// Creates a new amount.
    #[must_use]
    pub const fn new(value: Decimal, unit: Unit) -> Self {
        Self { value, unit }
    }

    /// Creates a zero amount in the given unit.
    #[must_use]
    pub const fn zero(unit: Unit) -> Self {
        Self {
            value: Decimal::ZERO,
            unit,
        }
    }

    /// Parses an amount from its persisted string pair.
    pub fn parse(value: &str, unit: &str) -> Result<Self, AmountError> {
        let unit: Unit = unit.parse()?;
        let value: Decimal = value
            .trim()
            .parse()
            .map_err(|_| AmountError::InvalidValue(value.to_string()))?;
        Ok(Self { value, unit })
    }

    /// Returns true if the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    /// Returns true if the amount is strictly positive.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.value > Decimal::ZERO
    }

    /// Returns true if the amount is strictly negative.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.value < Decimal::ZERO
    }

    /// Adds two amounts, failing on unit mismatch.
    pub fn checked_add(self, other: Self) -> Result<Self, AmountError> {
        self.ensure_same_unit(other)?;
        Ok(Self::new(self.value + other.value, self.unit))
    }

    /// Subtracts two amounts, failing on unit mismatch.
    pub fn checked_sub(self, other: Self) -> Result<Self, AmountError> {
        self.ensure_same_unit(other)?;
        Ok(Self::new(self.value - other.value, self.unit))
    }

    /// Compares two amounts, failing on unit mismatch.
    pub fn try_cmp(&self, other: &Self) -> Result<Ordering, AmountError> {
        self.ensure_same_unit(*other)?;
        Ok(self.value.cmp(&other.value))
    }

    /// Returns the smaller of two amounts.
    ///
    /// # Panics
    ///
    /// Panics if the units differ.
    #[must_use]
    pub fn min(self, other: Self) -> Self {
        self.assert_same_unit(other);
        if other.value < self.value { other } else { self }
    }

    /// Returns the larger of two amounts.
    ///
    /// # Panics
    ///
    /// Panics if the units differ.
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        self.assert_same_unit(other);
        if other.value > self.value { other } else { self }
    }

    /// Multiplies the amount by a dimensionless factor.
    #[must_use]
    pub fn scale(self, factor: Decimal) -> Self {
        Self::new(self.value * factor, self.unit)
    }

    /// Converts the amount into another unit.
    pub fn convert_to(self, target: Unit, hours_per_day: Decimal) -> Result<Self, AmountError> {
        let value = self.unit.convert(self.value, target, hours_per_day)?;
        Ok(Self::new(value, target))
    }

    /// Sums amounts of one unit. An empty iterator yields zero.
    ///
    /// # Panics
    ///
    /// Panics if any amount is not in `unit`.
    pub fn sum<I>(unit: Unit, amounts: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        amounts.into_iter().fold(Self::zero(unit), |acc, a| acc + a)
    }

    /// Returns the value with trailing zeros removed, for display and storage.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self::new(self.value.normalize(), self.unit)
    }

    fn ensure_same_unit(self, other: Self) -> Result<(), AmountError> {
        if self.unit == other.unit {
            Ok(())
        } else {
            Err(AmountError::UnitMismatch {
                expected: self.unit,
                actual: other.unit,
            })
        }
    }

    fn assert_same_unit(self, other: Self) {
        assert!(
            self.unit == other.unit,
            "unit mismatch: {} vs {}",
            self.unit,
            other.unit
        );
    }
}

impl PartialOrd for Amount {
    /// Amounts in different units are unordered.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.try_cmp(other).ok()
    }
}

impl Add for Amount {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.assert_same_unit(rhs);
        Self::new(self.value + rhs.value, self.unit)
    }
}

impl Sub for Amount {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.assert_same_unit(rhs);
        Self::new(self.value - rhs.value, self.unit)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for Amount {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Neg for Amount {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.value, self.unit)
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.value.normalize(), self.unit)
    }
}
