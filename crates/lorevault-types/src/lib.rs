//! Shared domain vocabulary for the Lorevault persistence layer.
//!
//! This crate holds the dialect-free types that cross the storage
//! boundary: strongly-typed row identifiers, the enumerations that encode
//! entry kinds and the submission approval workflow, and the draft
//! records callers hand to the manager when creating entities.
//!
//! Nothing here touches SQL or a driver. The `lorevault-db` crate owns
//! all persistence mechanics and maps these types to and from rows.
//!
//! # Modules
//!
//! - [`ids`] -- newtype wrappers around generated row ids
//! - [`enums`] -- entry kinds, workflow statuses, rarity, location kinds
//! - [`records`] -- draft (input) records for entity creation

pub mod enums;
pub mod ids;
pub mod records;

// Re-export primary types for convenience.
pub use enums::{ApprovalStatus, EntryType, LocationType, Rarity, SubmissionStatus};
pub use ids::{CollectionId, EntryId, ItemId, LocationId, PlayerRowId, SubmissionId};
pub use records::{CollectionDraft, EntryDraft, ItemDraft, LocationDraft};
