//! Enumeration types for the Lorevault persistence layer.
//!
//! Each enumeration persists as a short uppercase token in a TEXT column.
//! The `as_db_str` / `parse_db_str` pairs are the single source of truth
//! for that encoding; the row-mapping functions in `lorevault-db` go
//! through them so an unknown token surfaces as a decode error rather
//! than a silently misread row.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Entry kinds
// ---------------------------------------------------------------------------

/// The kind of lore object an entry identifies.
///
/// An entry owns at most one specialized record; which table that record
/// lives in is determined by this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntryType {
    /// A collectible or craftable item (specialized in the `item` table).
    Item,
    /// A named place in the world (specialized in the `location` table).
    Location,
    /// A city or settlement (spatial; specialized in the `location` table).
    City,
    /// A historical event with no specialized record.
    Event,
    /// A person of note with no specialized record.
    Character,
    /// Free-form lore with no specialized record.
    Lore,
}

impl EntryType {
    /// The token stored in the `entry.entry_type` column.
    pub const fn as_db_str(self) -> &'static str {
        match self {
            Self::Item => "ITEM",
            Self::Location => "LOCATION",
            Self::City => "CITY",
            Self::Event => "EVENT",
            Self::Character => "CHARACTER",
            Self::Lore => "LORE",
        }
    }

    /// Parse the stored token back into the enum.
    pub fn parse_db_str(s: &str) -> Option<Self> {
        match s {
            "ITEM" => Some(Self::Item),
            "LOCATION" => Some(Self::Location),
            "CITY" => Some(Self::City),
            "EVENT" => Some(Self::Event),
            "CHARACTER" => Some(Self::Character),
            "LORE" => Some(Self::Lore),
            _ => None,
        }
    }

    /// Whether entries of this type carry a `location` specialization.
    pub const fn is_spatial(self) -> bool {
        matches!(self, Self::Location | Self::City)
    }
}

// ---------------------------------------------------------------------------
// Submission workflow
// ---------------------------------------------------------------------------

/// Lifecycle status of a submission version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubmissionStatus {
    /// Written but not yet the authoritative version.
    Draft,
    /// The authoritative (approved, current) version.
    Active,
    /// Superseded by a newer approved version.
    Archived,
}

impl SubmissionStatus {
    /// The token stored in the `submission.status` column.
    pub const fn as_db_str(self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Active => "ACTIVE",
            Self::Archived => "ARCHIVED",
        }
    }

    /// Parse the stored token back into the enum.
    pub fn parse_db_str(s: &str) -> Option<Self> {
        match s {
            "DRAFT" => Some(Self::Draft),
            "ACTIVE" => Some(Self::Active),
            "ARCHIVED" => Some(Self::Archived),
            _ => None,
        }
    }
}

/// Moderation outcome for a submission version.
///
/// `Approved` is terminal for that version; a rejected or pending
/// submission can be superseded by a newer version at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApprovalStatus {
    /// Awaiting moderator review.
    Pending,
    /// Accepted as the entry's current version.
    Approved,
    /// Declined by a moderator.
    Rejected,
}

impl ApprovalStatus {
    /// The token stored in the `submission.approval_status` column.
    pub const fn as_db_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    /// Parse the stored token back into the enum.
    pub fn parse_db_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Item and location attributes
// ---------------------------------------------------------------------------

/// Display rarity of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rarity {
    /// Ordinary, freely obtainable.
    Common,
    /// Harder to find than common.
    Uncommon,
    /// Notable and scarce.
    Rare,
    /// Near-unique.
    Epic,
    /// One of a kind.
    Legendary,
}

impl Rarity {
    /// The token stored in the `item.rarity` column.
    pub const fn as_db_str(self) -> &'static str {
        match self {
            Self::Common => "COMMON",
            Self::Uncommon => "UNCOMMON",
            Self::Rare => "RARE",
            Self::Epic => "EPIC",
            Self::Legendary => "LEGENDARY",
        }
    }

    /// Parse the stored token back into the enum.
    pub fn parse_db_str(s: &str) -> Option<Self> {
        match s {
            "COMMON" => Some(Self::Common),
            "UNCOMMON" => Some(Self::Uncommon),
            "RARE" => Some(Self::Rare),
            "EPIC" => Some(Self::Epic),
            "LEGENDARY" => Some(Self::Legendary),
            _ => None,
        }
    }
}

/// Classification of a spatial entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocationType {
    /// A major settlement.
    City,
    /// A smaller settlement.
    Town,
    /// A single structure or point of interest.
    Landmark,
    /// A dungeon or hostile site.
    Dungeon,
    /// An unclassified named place.
    Other,
}

impl LocationType {
    /// The token stored in the `location.location_type` column.
    pub const fn as_db_str(self) -> &'static str {
        match self {
            Self::City => "CITY",
            Self::Town => "TOWN",
            Self::Landmark => "LANDMARK",
            Self::Dungeon => "DUNGEON",
            Self::Other => "OTHER",
        }
    }

    /// Parse the stored token back into the enum.
    pub fn parse_db_str(s: &str) -> Option<Self> {
        match s {
            "CITY" => Some(Self::City),
            "TOWN" => Some(Self::Town),
            "LANDMARK" => Some(Self::Landmark),
            "DUNGEON" => Some(Self::Dungeon),
            "OTHER" => Some(Self::Other),
            _ => None,
        }
    }
}
