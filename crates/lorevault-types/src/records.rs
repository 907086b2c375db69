//! Draft (input) records for entity creation.
//!
//! A draft carries everything the manager needs to create an entity in
//! one transaction: the entry identity fields, the optional specialized
//! record, and the initial submission content. Generated ids and
//! timestamps are filled in by the store, so drafts never carry them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enums::{EntryType, LocationType, Rarity};
use crate::ids::CollectionId;

/// Input for creating a new entry together with its first submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryDraft {
    /// The kind of lore object.
    pub entry_type: EntryType,
    /// Human-readable name (shown in search results).
    pub name: String,
    /// Longer free-form description.
    pub description: String,
    /// Serialized content body of the first submission version.
    pub content: String,
    /// Player who authored the first submission.
    pub submitter_id: Uuid,
}

/// Input for the item specialization of an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDraft {
    /// In-game material identifier (e.g. `DIAMOND_SWORD`).
    pub material: String,
    /// Display name rendered on the item.
    pub display_name: String,
    /// Display rarity tier.
    pub rarity: Rarity,
    /// Collection this item belongs to, if any.
    pub collection_id: Option<CollectionId>,
    /// Visual theme identifier, if any.
    pub theme_id: Option<String>,
    /// Free-form extra attributes, if any.
    pub custom_properties: Option<serde_json::Value>,
}

/// Input for the location specialization of an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationDraft {
    /// World the location belongs to.
    pub world: String,
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
    /// Classification of the place.
    pub location_type: LocationType,
}

/// Input for creating a named collection of items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionDraft {
    /// Collection name (unique).
    pub name: String,
    /// Longer free-form description.
    pub description: String,
    /// Visual theme identifier, if any.
    pub theme_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_draft_serde_roundtrip() {
        let draft = ItemDraft {
            material: "DIAMOND_SWORD".to_owned(),
            display_name: "Dawnbreaker".to_owned(),
            rarity: Rarity::Legendary,
            collection_id: Some(CollectionId::new(3)),
            theme_id: None,
            custom_properties: Some(serde_json::json!({"glow": true})),
        };
        let json = serde_json::to_string(&draft).ok();
        assert!(json.is_some());
        let back: Option<ItemDraft> = json.as_deref().and_then(|j| serde_json::from_str(j).ok());
        assert_eq!(back, Some(draft));
    }
}
