//! Ledger transaction classification.

use serde::{Deserialize, Serialize};

/// Kind of a ledger transaction.
///
/// The sign of the delta follows the kind: grants add, consumption and
/// pending holds subtract, reconciliation and adjustments go either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Stored one-time entitlement.
    Grant,
    /// Approved use of the resource.
    Consumption,
    /// Requested use awaiting approval.
    Pending,
    /// Written at a period boundary, e.g. carryover.
    Reconciliation,
    /// Manual or rule-driven correction.
    Adjustment,
    /// Cancels a previous transaction.
    Reversal,
}

impl TransactionType {
    /// Returns the snake_case name of the type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Grant => "grant",
            Self::Consumption => "consumption",
            Self::Pending => "pending",
            Self::Reconciliation => "reconciliation",
            Self::Adjustment => "adjustment",
            Self::Reversal => "reversal",
        }
    }

    /// Returns true for types that take a day off the resource.
    #[must_use]
    pub const fn is_consumption_like(self) -> bool {
        matches!(self, Self::Consumption | Self::Pending)
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
