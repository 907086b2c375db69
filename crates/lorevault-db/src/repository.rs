//! Per-entity façades over the manager.
//!
//! Repositories are what domain code holds. Each one is a thin, cloneable
//! handle delegating to the shared [`LoreManager`]; none holds a
//! connection and none adds behavior beyond naming the slice of the
//! manager's surface its entity needs.

use std::sync::Arc;

use lorevault_types::{
    CollectionDraft, CollectionId, EntryDraft, EntryId, EntryType, ItemDraft, ItemId,
    LocationDraft, PlayerRowId, SubmissionId,
};
use uuid::Uuid;

use crate::error::StoreError;
use crate::manager::{CreatedEntry, LoreManager, Specialization};
use crate::rows::{
    CollectionItemRow, CollectionRow, EntryRow, ItemRow, LocationRow, NameChangeRow, PlayerRow,
    ProgressRow, SubmissionRow,
};

/// Entries and their versioned content.
#[derive(Clone)]
pub struct EntryRepository {
    manager: Arc<LoreManager>,
}

impl EntryRepository {
    /// Create a façade over `manager`.
    pub const fn new(manager: Arc<LoreManager>) -> Self {
        Self { manager }
    }

    /// Load an entry by id.
    pub async fn get_by_id(&self, id: EntryId) -> Result<Option<EntryRow>, StoreError> {
        self.manager.get_entry(id).await
    }

    /// All entries of one type, newest first.
    pub async fn get_all_by_type(
        &self,
        entry_type: EntryType,
    ) -> Result<Vec<EntryRow>, StoreError> {
        self.manager.get_entries_by_type(entry_type).await
    }

    /// Entries matching a keyword in name or description.
    pub async fn search(&self, keyword: &str) -> Result<Vec<EntryRow>, StoreError> {
        self.manager.search_entries(keyword).await
    }

    /// Number of entries of one type.
    pub async fn count_by_type(&self, entry_type: EntryType) -> Result<i64, StoreError> {
        self.manager.count_entries_by_type(entry_type).await
    }

    /// Create an entry and its first submission.
    pub async fn save(
        &self,
        draft: EntryDraft,
        specialization: Specialization,
    ) -> Result<CreatedEntry, StoreError> {
        self.manager.create_entry(draft, specialization).await
    }

    /// Submit a new content version for an entry.
    pub async fn submit_revision(
        &self,
        entry_id: EntryId,
        content: String,
        submitter_id: Uuid,
    ) -> Result<SubmissionRow, StoreError> {
        self.manager.update_entry(entry_id, content, submitter_id).await
    }

    /// Delete an entry and everything attached to it.
    pub async fn delete(&self, entry_id: EntryId) -> Result<bool, StoreError> {
        self.manager.delete_entry(entry_id).await
    }

    /// The entry's authoritative content version, if one is approved.
    pub async fn get_current_submission(
        &self,
        entry_id: EntryId,
    ) -> Result<Option<SubmissionRow>, StoreError> {
        self.manager.get_current_submission(entry_id).await
    }

    /// Every content version of an entry, newest first.
    pub async fn get_history(&self, entry_id: EntryId) -> Result<Vec<SubmissionRow>, StoreError> {
        self.manager.get_submission_history(entry_id).await
    }

    /// Approve a submission, making it current.
    pub async fn approve(
        &self,
        submission_id: SubmissionId,
        approver_id: Uuid,
    ) -> Result<SubmissionRow, StoreError> {
        self.manager.approve_submission(submission_id, approver_id).await
    }

    /// Reject a pending submission.
    pub async fn reject(
        &self,
        submission_id: SubmissionId,
        approver_id: Uuid,
    ) -> Result<SubmissionRow, StoreError> {
        self.manager.reject_submission(submission_id, approver_id).await
    }
}

/// Item records attached to entries.
#[derive(Clone)]
pub struct ItemRepository {
    manager: Arc<LoreManager>,
}

impl ItemRepository {
    /// Create a façade over `manager`.
    pub const fn new(manager: Arc<LoreManager>) -> Self {
        Self { manager }
    }

    /// Load the item record for an entry.
    pub async fn get_by_entry(&self, entry_id: EntryId) -> Result<Option<ItemRow>, StoreError> {
        self.manager.get_item_by_entry(entry_id).await
    }

    /// Insert or overwrite the item record for an entry.
    pub async fn save(&self, entry_id: EntryId, draft: &ItemDraft) -> Result<ItemRow, StoreError> {
        self.manager.save_item(entry_id, draft).await
    }
}

/// Location records attached to entries.
#[derive(Clone)]
pub struct LocationRepository {
    manager: Arc<LoreManager>,
}

impl LocationRepository {
    /// Create a façade over `manager`.
    pub const fn new(manager: Arc<LoreManager>) -> Self {
        Self { manager }
    }

    /// Load the location record for an entry.
    pub async fn get_by_entry(
        &self,
        entry_id: EntryId,
    ) -> Result<Option<LocationRow>, StoreError> {
        self.manager.get_location_by_entry(entry_id).await
    }

    /// Insert or overwrite the location record for an entry.
    pub async fn save(
        &self,
        entry_id: EntryId,
        draft: &LocationDraft,
    ) -> Result<LocationRow, StoreError> {
        self.manager.save_location(entry_id, draft).await
    }
}

/// Collections, membership, and per-player progress.
#[derive(Clone)]
pub struct CollectionRepository {
    manager: Arc<LoreManager>,
}

impl CollectionRepository {
    /// Create a façade over `manager`.
    pub const fn new(manager: Arc<LoreManager>) -> Self {
        Self { manager }
    }

    /// Create a collection.
    pub async fn create(&self, draft: &CollectionDraft) -> Result<CollectionRow, StoreError> {
        self.manager.create_collection(draft).await
    }

    /// Load a collection by id.
    pub async fn get_by_id(&self, id: CollectionId) -> Result<Option<CollectionRow>, StoreError> {
        self.manager.get_collection(id).await
    }

    /// All collections, alphabetical.
    pub async fn list(&self) -> Result<Vec<CollectionRow>, StoreError> {
        self.manager.list_collections().await
    }

    /// Put an item into a collection at a display position.
    pub async fn add_item(
        &self,
        collection_id: CollectionId,
        item_id: ItemId,
        sequence_number: i64,
    ) -> Result<(), StoreError> {
        self.manager
            .add_collection_item(collection_id, item_id, sequence_number)
            .await
    }

    /// A collection's membership in display order.
    pub async fn items(
        &self,
        collection_id: CollectionId,
    ) -> Result<Vec<CollectionItemRow>, StoreError> {
        self.manager.get_collection_items(collection_id).await
    }

    /// A player's progress through a collection.
    pub async fn get_progress(
        &self,
        player_id: Uuid,
        collection_id: CollectionId,
    ) -> Result<Option<ProgressRow>, StoreError> {
        self.manager.get_progress(player_id, collection_id).await
    }

    /// Record a player's progress; values are clamped to `[0.0, 1.0]`.
    pub async fn update_progress(
        &self,
        player_id: Uuid,
        collection_id: CollectionId,
        progress: f64,
    ) -> Result<ProgressRow, StoreError> {
        self.manager
            .update_progress(player_id, collection_id, progress)
            .await
    }

    /// Mark a collection finished for a player.
    pub async fn mark_completed(
        &self,
        player_id: Uuid,
        collection_id: CollectionId,
    ) -> Result<ProgressRow, StoreError> {
        self.manager.mark_completed(player_id, collection_id).await
    }
}

/// Player identity and name history.
#[derive(Clone)]
pub struct PlayerRepository {
    manager: Arc<LoreManager>,
}

impl PlayerRepository {
    /// Create a façade over `manager`.
    pub const fn new(manager: Arc<LoreManager>) -> Self {
        Self { manager }
    }

    /// Load a player by stable external id.
    pub async fn get(&self, uuid: Uuid) -> Result<Option<PlayerRow>, StoreError> {
        self.manager.get_player(uuid).await
    }

    /// Register a sighting, creating or updating the player row.
    pub async fn upsert(&self, uuid: Uuid, name: &str) -> Result<PlayerRow, StoreError> {
        self.manager.upsert_player(uuid, name).await
    }

    /// A player's name changes, newest first.
    pub async fn name_history(
        &self,
        player_id: PlayerRowId,
    ) -> Result<Vec<NameChangeRow>, StoreError> {
        self.manager.get_name_history(player_id).await
    }
}
