//! Share allocation by cumulative rounding.
//!
//! Annual accrual rates are split into monthly or daily shares. Share `k` is
//! the difference between the rounded running totals after `k + 1` and `k`
//! recipients, so the shares of a full year always sum to the annual rate
//! exactly and any prefix of the shares stays within one unit of the exact
//! prorated amount.

use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;

/// Allocation utility for splitting annual rates into periodic shares.
pub struct AllocationUtil;

impl AllocationUtil {
    /// Allocate `total` equally across `count` recipients.
    ///
    /// Ensures the sum of allocations EXACTLY equals `total` rounded to
    /// `decimal_places`.
    ///
    /// # Example
    ///
    /// ```
    /// use rust_decimal_macros::dec;
    /// use accrue_core::accrual::AllocationUtil;
    ///
    /// // 10 days over 12 months
    /// let shares = AllocationUtil::allocate_equal(dec!(10), 12, 4);
    /// assert_eq!(shares.iter().sum::<rust_decimal::Decimal>(), dec!(10));
    /// assert_eq!(shares[0], dec!(0.8333));
    /// assert_eq!(shares[1], dec!(0.8334));
    /// ```
    #[must_use]
    pub fn allocate_equal(total: Decimal, count: usize, decimal_places: u32) -> Vec<Decimal> {
        (0..count)
            .map(|i| Self::share_at(total, count, i, decimal_places))
            .collect()
    }

    /// Returns the `index`-th share of [`allocate_equal`](Self::allocate_equal)
    /// without building the whole vector.
    #[must_use]
    pub fn share_at(total: Decimal, count: usize, index: usize, decimal_places: u32) -> Decimal {
        if count == 0 || index >= count {
            return Decimal::ZERO;
        }

        let running = |n: usize| {
            (total * Decimal::from(n as u64) / Decimal::from(count as u64))
                .round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointNearestEven)
        };
        running(index + 1) - running(index)
    }
}
