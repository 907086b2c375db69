//! Typed row records and their explicit column mappings.
//!
//! Every fetch goes through [`FromStoreRow`], a hand-written,
//! compile-checked mapping from a driver row to a typed record -- one
//! `try_get` per column, with every decode failure naming the offending
//! column. No reflection, no derive: the schema and these mappings are
//! reviewed together.
//!
//! Timestamps are stored as epoch milliseconds and booleans as 0/1
//! integers (see [`crate::query::SqlValue`]); the helpers here are the
//! other half of that encoding.

use chrono::{DateTime, TimeZone, Utc};
use sqlx::any::AnyRow;
use sqlx::Row;
use uuid::Uuid;

use lorevault_types::{
    ApprovalStatus, CollectionId, EntryId, EntryType, ItemId, LocationId, LocationType,
    PlayerRowId, Rarity, SubmissionId, SubmissionStatus,
};

use crate::error::StoreError;

/// Maps one driver row to a typed record.
pub trait FromStoreRow: Sized {
    /// Decode a row, field by field.
    fn from_store_row(row: &AnyRow) -> Result<Self, StoreError>;
}

// ---------------------------------------------------------------------------
// Column decode helpers
// ---------------------------------------------------------------------------

fn decode_err(column: &str, message: impl std::fmt::Display) -> StoreError {
    StoreError::RowDecode {
        column: column.to_owned(),
        message: message.to_string(),
    }
}

fn col_i64(row: &AnyRow, name: &str) -> Result<i64, StoreError> {
    row.try_get::<i64, _>(name).map_err(|e| decode_err(name, e))
}

fn col_opt_i64(row: &AnyRow, name: &str) -> Result<Option<i64>, StoreError> {
    row.try_get::<Option<i64>, _>(name)
        .map_err(|e| decode_err(name, e))
}

fn col_f64(row: &AnyRow, name: &str) -> Result<f64, StoreError> {
    row.try_get::<f64, _>(name).map_err(|e| decode_err(name, e))
}

fn col_text(row: &AnyRow, name: &str) -> Result<String, StoreError> {
    row.try_get::<String, _>(name)
        .map_err(|e| decode_err(name, e))
}

fn col_opt_text(row: &AnyRow, name: &str) -> Result<Option<String>, StoreError> {
    row.try_get::<Option<String>, _>(name)
        .map_err(|e| decode_err(name, e))
}

fn col_bool(row: &AnyRow, name: &str) -> Result<bool, StoreError> {
    Ok(col_i64(row, name)? != 0)
}

fn millis_to_datetime(column: &str, millis: i64) -> Result<DateTime<Utc>, StoreError> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| decode_err(column, format!("epoch millis out of range: {millis}")))
}

fn col_timestamp(row: &AnyRow, name: &str) -> Result<DateTime<Utc>, StoreError> {
    millis_to_datetime(name, col_i64(row, name)?)
}

fn col_opt_timestamp(row: &AnyRow, name: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
    col_opt_i64(row, name)?
        .map(|ms| millis_to_datetime(name, ms))
        .transpose()
}

fn col_uuid(row: &AnyRow, name: &str) -> Result<Uuid, StoreError> {
    let text = col_text(row, name)?;
    text.parse::<Uuid>().map_err(|e| decode_err(name, e))
}

fn col_opt_uuid(row: &AnyRow, name: &str) -> Result<Option<Uuid>, StoreError> {
    col_opt_text(row, name)?
        .map(|t| t.parse::<Uuid>().map_err(|e| decode_err(name, e)))
        .transpose()
}

fn col_opt_json(row: &AnyRow, name: &str) -> Result<Option<serde_json::Value>, StoreError> {
    col_opt_text(row, name)?
        .map(|t| serde_json::from_str(&t).map_err(|e| decode_err(name, e)))
        .transpose()
}

fn parse_token<T>(
    column: &str,
    token: &str,
    parse: impl FnOnce(&str) -> Option<T>,
) -> Result<T, StoreError> {
    parse(token).ok_or_else(|| decode_err(column, format!("unknown token: {token}")))
}

// ---------------------------------------------------------------------------
// Entry / Submission
// ---------------------------------------------------------------------------

/// A row from the `entry` table: the immutable identity of a lore object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRow {
    /// Generated row id.
    pub id: EntryId,
    /// The kind of lore object.
    pub entry_type: EntryType,
    /// Human-readable name.
    pub name: String,
    /// Longer free-form description.
    pub description: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl FromStoreRow for EntryRow {
    fn from_store_row(row: &AnyRow) -> Result<Self, StoreError> {
        let type_token = col_text(row, "entry_type")?;
        Ok(Self {
            id: EntryId::new(col_i64(row, "id")?),
            entry_type: parse_token("entry_type", &type_token, EntryType::parse_db_str)?,
            name: col_text(row, "name")?,
            description: col_text(row, "description")?,
            created_at: col_timestamp(row, "created_at")?,
            updated_at: col_timestamp(row, "updated_at")?,
        })
    }
}

/// A row from the `submission` table: one version of an entry's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRow {
    /// Generated row id.
    pub id: SubmissionId,
    /// Entry this version belongs to.
    pub entry_id: EntryId,
    /// Monotonically increasing version number within the entry.
    pub content_version: i64,
    /// Whether this is the entry's single authoritative version.
    pub is_current_version: bool,
    /// Lifecycle status.
    pub status: SubmissionStatus,
    /// Moderation outcome.
    pub approval_status: ApprovalStatus,
    /// Player who authored this version.
    pub submitter_id: Uuid,
    /// Moderator who approved or rejected it, if any.
    pub approver_id: Option<Uuid>,
    /// Serialized content body.
    pub content: String,
    /// When the version was approved, if it was.
    pub approved_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl FromStoreRow for SubmissionRow {
    fn from_store_row(row: &AnyRow) -> Result<Self, StoreError> {
        let status_token = col_text(row, "status")?;
        let approval_token = col_text(row, "approval_status")?;
        Ok(Self {
            id: SubmissionId::new(col_i64(row, "id")?),
            entry_id: EntryId::new(col_i64(row, "entry_id")?),
            content_version: col_i64(row, "content_version")?,
            is_current_version: col_bool(row, "is_current_version")?,
            status: parse_token("status", &status_token, SubmissionStatus::parse_db_str)?,
            approval_status: parse_token(
                "approval_status",
                &approval_token,
                ApprovalStatus::parse_db_str,
            )?,
            submitter_id: col_uuid(row, "submitter_id")?,
            approver_id: col_opt_uuid(row, "approver_id")?,
            content: col_text(row, "content")?,
            approved_at: col_opt_timestamp(row, "approved_at")?,
            created_at: col_timestamp(row, "created_at")?,
            updated_at: col_timestamp(row, "updated_at")?,
        })
    }
}

// ---------------------------------------------------------------------------
// Item / Location specializations
// ---------------------------------------------------------------------------

/// A row from the `item` table, one-to-one with an ITEM entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemRow {
    /// Generated row id.
    pub id: ItemId,
    /// Owning entry.
    pub entry_id: EntryId,
    /// In-game material identifier.
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

impl FromStoreRow for ItemRow {
    fn from_store_row(row: &AnyRow) -> Result<Self, StoreError> {
        let rarity_token = col_text(row, "rarity")?;
        Ok(Self {
            id: ItemId::new(col_i64(row, "id")?),
            entry_id: EntryId::new(col_i64(row, "entry_id")?),
            material: col_text(row, "material")?,
            display_name: col_text(row, "display_name")?,
            rarity: parse_token("rarity", &rarity_token, Rarity::parse_db_str)?,
            collection_id: col_opt_i64(row, "collection_id")?.map(CollectionId::new),
            theme_id: col_opt_text(row, "theme_id")?,
            custom_properties: col_opt_json(row, "custom_properties")?,
        })
    }
}

/// A row from the `location` table, one-to-one with a spatial entry.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationRow {
    /// Generated row id.
    pub id: LocationId,
    /// Owning entry.
    pub entry_id: EntryId,
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

impl FromStoreRow for LocationRow {
    fn from_store_row(row: &AnyRow) -> Result<Self, StoreError> {
        let type_token = col_text(row, "location_type")?;
        Ok(Self {
            id: LocationId::new(col_i64(row, "id")?),
            entry_id: EntryId::new(col_i64(row, "entry_id")?),
            world: col_text(row, "world")?,
            x: col_f64(row, "x")?,
            y: col_f64(row, "y")?,
            z: col_f64(row, "z")?,
            location_type: parse_token(
                "location_type",
                &type_token,
                LocationType::parse_db_str,
            )?,
        })
    }
}

// ---------------------------------------------------------------------------
// Collections and progress
// ---------------------------------------------------------------------------

/// A row from the `collection` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRow {
    /// Generated row id.
    pub id: CollectionId,
    /// Collection name (unique).
    pub name: String,
    /// Longer free-form description.
    pub description: String,
    /// Visual theme identifier, if any.
    pub theme_id: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl FromStoreRow for CollectionRow {
    fn from_store_row(row: &AnyRow) -> Result<Self, StoreError> {
        Ok(Self {
            id: CollectionId::new(col_i64(row, "id")?),
            name: col_text(row, "name")?,
            description: col_text(row, "description")?,
            theme_id: col_opt_text(row, "theme_id")?,
            created_at: col_timestamp(row, "created_at")?,
            updated_at: col_timestamp(row, "updated_at")?,
        })
    }
}

/// A row from the `collection_item` ordering table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionItemRow {
    /// Collection side of the pair.
    pub collection_id: CollectionId,
    /// Item side of the pair.
    pub item_id: ItemId,
    /// Position of the item within the collection.
    pub sequence_number: i64,
}

impl FromStoreRow for CollectionItemRow {
    fn from_store_row(row: &AnyRow) -> Result<Self, StoreError> {
        Ok(Self {
            collection_id: CollectionId::new(col_i64(row, "collection_id")?),
            item_id: ItemId::new(col_i64(row, "item_id")?),
            sequence_number: col_i64(row, "sequence_number")?,
        })
    }
}

/// A row from the `player_collection_progress` table.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressRow {
    /// Player the progress belongs to.
    pub player_id: Uuid,
    /// Collection being progressed.
    pub collection_id: CollectionId,
    /// Completion fraction in `[0.0, 1.0]`.
    pub progress: f64,
    /// When the collection was completed, if it was.
    pub completed_at: Option<DateTime<Utc>>,
    /// Last write time.
    pub updated_at: DateTime<Utc>,
}

impl FromStoreRow for ProgressRow {
    fn from_store_row(row: &AnyRow) -> Result<Self, StoreError> {
        Ok(Self {
            player_id: col_uuid(row, "player_id")?,
            collection_id: CollectionId::new(col_i64(row, "collection_id")?),
            progress: col_f64(row, "progress")?,
            completed_at: col_opt_timestamp(row, "completed_at")?,
            updated_at: col_timestamp(row, "updated_at")?,
        })
    }
}

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

/// A row from the `player` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRow {
    /// Generated row id.
    pub id: PlayerRowId,
    /// Stable in-game identity.
    pub uuid: Uuid,
    /// Current display name.
    pub name: String,
    /// First time this player was recorded.
    pub first_seen_at: DateTime<Utc>,
    /// Most recent time this player was recorded.
    pub last_seen_at: DateTime<Utc>,
}

impl FromStoreRow for PlayerRow {
    fn from_store_row(row: &AnyRow) -> Result<Self, StoreError> {
        Ok(Self {
            id: PlayerRowId::new(col_i64(row, "id")?),
            uuid: col_uuid(row, "uuid")?,
            name: col_text(row, "name")?,
            first_seen_at: col_timestamp(row, "first_seen_at")?,
            last_seen_at: col_timestamp(row, "last_seen_at")?,
        })
    }
}

/// A row from the `name_change_record` table: one historical name change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameChangeRow {
    /// Generated row id.
    pub id: i64,
    /// Player whose name changed.
    pub player_id: PlayerRowId,
    /// Name before the change.
    pub previous_name: String,
    /// Name after the change.
    pub new_name: String,
    /// When the change was recorded.
    pub changed_at: DateTime<Utc>,
}

impl FromStoreRow for NameChangeRow {
    fn from_store_row(row: &AnyRow) -> Result<Self, StoreError> {
        Ok(Self {
            id: col_i64(row, "id")?,
            player_id: PlayerRowId::new(col_i64(row, "player_id")?),
            previous_name: col_text(row, "previous_name")?,
            new_name: col_text(row, "new_name")?,
            changed_at: col_timestamp(row, "changed_at")?,
        })
    }
}

// ---------------------------------------------------------------------------
// Scalar projections
// ---------------------------------------------------------------------------

/// First column of an aggregate row, e.g. `SELECT COUNT(*)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CountRow(pub i64);

impl FromStoreRow for CountRow {
    fn from_store_row(row: &AnyRow) -> Result<Self, StoreError> {
        row.try_get::<i64, _>(0)
            .map(Self)
            .map_err(|e| decode_err("<count>", e))
    }
}

/// First text column of a catalog probe row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CatalogRow(pub String);

impl FromStoreRow for CatalogRow {
    fn from_store_row(row: &AnyRow) -> Result<Self, StoreError> {
        row.try_get::<String, _>(0)
            .map(Self)
            .map_err(|e| decode_err("<catalog>", e))
    }
}
