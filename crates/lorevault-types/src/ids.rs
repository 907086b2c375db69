//! Type-safe identifier wrappers around generated row ids.
//!
//! Every persisted entity has a strongly-typed ID to prevent accidental
//! mixing of identifiers at compile time. Row ids are produced by the
//! store's autoincrement column on insert, so the inner value is an
//! `i64` rather than an application-generated UUID. Actor identity
//! (players, submitters, approvers) is a [`uuid::Uuid`] and is not
//! wrapped here.

use serde::{Deserialize, Serialize};

/// Generates a newtype wrapper around `i64` with standard derives.
macro_rules! define_row_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Wrap a raw row id returned by the store.
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Return the inner `i64` value.
            pub const fn into_inner(self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_row_id! {
    /// Unique identifier for an entry (base identity row of a lore object).
    EntryId
}

define_row_id! {
    /// Unique identifier for one version of an entry's content.
    SubmissionId
}

define_row_id! {
    /// Unique identifier for an item specialization row.
    ItemId
}

define_row_id! {
    /// Unique identifier for a location specialization row.
    LocationId
}

define_row_id! {
    /// Unique identifier for a collection of items.
    CollectionId
}

define_row_id! {
    /// Unique identifier for a player identity row.
    ///
    /// Distinct from the player's in-game UUID, which is stable across
    /// storage backends; this is the local autoincrement key.
    PlayerRowId
}
