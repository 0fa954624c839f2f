//! Typed IDs for type-safe entity references.
//!
//! Using typed IDs prevents accidentally passing an `EntityId` where a `PolicyId` is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Namespace for deterministic (v5) identifiers.
const ID_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_4a8e_2b3d_4e5f_9a0b_1c2d_3e4f_5a6b);

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new random ID using UUID v7 (time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Creates a deterministic ID from a stable key (UUID v5).
            ///
            /// The same key always yields the same ID, which keeps replayed
            /// writes byte-identical.
            #[must_use]
            pub fn from_key(key: &str) -> Self {
                Self(Uuid::new_v5(&ID_NAMESPACE, key.as_bytes()))
            }

            /// Returns the inner UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

typed_id!(EntityId, "Unique identifier for a resource holder (e.g. an employee).");
typed_id!(PolicyId, "Unique identifier for a policy.");
typed_id!(TransactionId, "Unique identifier for a ledger transaction.");
typed_id!(AssignmentId, "Unique identifier for a policy assignment.");
typed_id!(RunId, "Unique identifier for a reconciliation run record.");
