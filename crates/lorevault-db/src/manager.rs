//! Storage orchestrator.
//!
//! [`LoreManager`] composes the provider, executor, and schema setup
//! into the one surface through which domain code touches storage. It
//! is the sole writer of every table: repositories delegate here and
//! never hold connections. Versioned-entity workflows (entry creation,
//! submission approval) run inside single transactions so the
//! current-version invariant holds after every completed operation.

use std::sync::Arc;

use chrono::Utc;
use lorevault_types::{
    ApprovalStatus, CollectionDraft, CollectionId, EntryDraft, EntryId, EntryType, ItemDraft,
    ItemId, LocationDraft, PlayerRowId, SubmissionId, SubmissionStatus,
};
use uuid::Uuid;

use crate::config::{Dialect, StoreConfig};
use crate::error::StoreError;
use crate::executor::{
    execute_insert_on, execute_update_on, fetch_optional_on, QueryExecutor,
};
use crate::provider::StoreProvider;
use crate::query::{QueryBuilder, SqlValue};
use crate::rows::{
    CollectionItemRow, CollectionRow, CountRow, EntryRow, ItemRow, LocationRow, NameChangeRow,
    PlayerRow, ProgressRow, SubmissionRow,
};
use crate::schema::SchemaSetup;

/// Optional specialized record created alongside an entry.
#[derive(Debug, Clone)]
pub enum Specialization {
    /// No specialized record; the entry is content-only.
    None,
    /// Item record; requires [`EntryType::Item`].
    Item(ItemDraft),
    /// Location record; requires a spatial entry type.
    Location(LocationDraft),
}

/// Everything written by one [`LoreManager::create_entry`] call.
#[derive(Debug, Clone)]
pub struct CreatedEntry {
    /// The new identity row.
    pub entry: EntryRow,
    /// The initial content version (pending approval, not yet current).
    pub submission: SubmissionRow,
    /// Item record, when one was requested.
    pub item: Option<ItemRow>,
    /// Location record, when one was requested.
    pub location: Option<LocationRow>,
}

/// Orchestrates all storage access.
pub struct LoreManager {
    provider: Arc<StoreProvider>,
    executor: QueryExecutor,
    dialect: Dialect,
}

impl LoreManager {
    /// Connect to the store described by `config`.
    ///
    /// Establishes the pool only; call [`Self::ensure_schema`] before
    /// constructing repositories.
    pub async fn connect(config: StoreConfig) -> Result<Self, StoreError> {
        let provider = Arc::new(StoreProvider::connect(config).await?);
        let dialect = provider.dialect();
        let executor = QueryExecutor::new(Arc::clone(&provider));
        Ok(Self {
            provider,
            executor,
            dialect,
        })
    }

    /// Create every required table and index that is missing.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        SchemaSetup::new(Arc::clone(&self.provider))
            .initialize_tables()
            .await
    }

    /// Whether every required table exists. Never errors.
    pub async fn validate_schema(&self) -> bool {
        SchemaSetup::new(Arc::clone(&self.provider))
            .validate_schema()
            .await
    }

    /// Whether the store currently answers a liveness probe.
    pub async fn validate_connection(&self) -> bool {
        self.provider.validate().await
    }

    /// Rebuild the connection pool and probe it.
    ///
    /// Schema validation is deliberately not repeated here; the schema
    /// cannot have changed because the store went away.
    pub async fn reconnect(&self) -> Result<(), StoreError> {
        self.provider.reconnect().await?;
        if self.provider.validate().await {
            Ok(())
        } else {
            Err(StoreError::Connection {
                op: "manager.reconnect",
                message: String::from("store did not answer liveness probe after reconnect"),
            })
        }
    }

    /// Close the pool. Subsequent operations fail with connection errors.
    pub async fn close(&self) {
        self.provider.close().await;
    }

    // -----------------------------------------------------------------
    // Entries
    // -----------------------------------------------------------------

    /// Create an entry, its optional specialized record, and its first
    /// submission version in one transaction.
    ///
    /// The first submission starts `PENDING` and is not the current
    /// version until approved.
    pub async fn create_entry(
        &self,
        draft: EntryDraft,
        specialization: Specialization,
    ) -> Result<CreatedEntry, StoreError> {
        const OP: &str = "entry.create";
        check_specialization(&draft, &specialization)?;
        let dialect = self.dialect;
        self.executor
            .execute_transaction(OP, move |conn| {
                Box::pin(async move {
                    let now = Utc::now();
                    let entry_id = execute_insert_on(
                        conn,
                        OP,
                        QueryBuilder::insert_into(dialect, "entry")
                            .columns(&[
                                "entry_type",
                                "name",
                                "description",
                                "created_at",
                                "updated_at",
                            ])
                            .value(draft.entry_type.as_db_str())
                            .value(draft.name.as_str())
                            .value(draft.description.as_str())
                            .value(now)
                            .value(now),
                    )
                    .await?;

                    let (item, location) = match &specialization {
                        Specialization::None => (None, None),
                        Specialization::Item(item_draft) => {
                            execute_insert_on(
                                conn,
                                OP,
                                insert_item_query(dialect, entry_id, item_draft),
                            )
                            .await?;
                            let row = fetch_optional_on::<ItemRow>(
                                conn,
                                OP,
                                QueryBuilder::select(dialect, "item")
                                    .and_where("entry_id = ?", entry_id),
                            )
                            .await?
                            .ok_or_else(|| missing_after_write(OP, "item", entry_id))?;
                            (Some(row), None)
                        }
                        Specialization::Location(location_draft) => {
                            execute_insert_on(
                                conn,
                                OP,
                                insert_location_query(dialect, entry_id, location_draft),
                            )
                            .await?;
                            let row = fetch_optional_on::<LocationRow>(
                                conn,
                                OP,
                                QueryBuilder::select(dialect, "location")
                                    .and_where("entry_id = ?", entry_id),
                            )
                            .await?
                            .ok_or_else(|| missing_after_write(OP, "location", entry_id))?;
                            (None, Some(row))
                        }
                    };

                    let submission_id = execute_insert_on(
                        conn,
                        OP,
                        QueryBuilder::insert_into(dialect, "submission")
                            .columns(&[
                                "entry_id",
                                "content_version",
                                "is_current_version",
                                "status",
                                "approval_status",
                                "submitter_id",
                                "content",
                                "created_at",
                                "updated_at",
                            ])
                            .value(entry_id)
                            .value(1_i64)
                            .value(false)
                            .value(SubmissionStatus::Draft.as_db_str())
                            .value(ApprovalStatus::Pending.as_db_str())
                            .value(draft.submitter_id)
                            .value(draft.content.as_str())
                            .value(now)
                            .value(now),
                    )
                    .await?;

                    let entry = fetch_optional_on::<EntryRow>(
                        conn,
                        OP,
                        QueryBuilder::select(dialect, "entry").and_where("id = ?", entry_id),
                    )
                    .await?
                    .ok_or_else(|| missing_after_write(OP, "entry", entry_id))?;
                    let submission = fetch_optional_on::<SubmissionRow>(
                        conn,
                        OP,
                        QueryBuilder::select(dialect, "submission")
                            .and_where("id = ?", submission_id),
                    )
                    .await?
                    .ok_or_else(|| missing_after_write(OP, "submission", submission_id))?;

                    tracing::info!(
                        entry_id,
                        entry_type = entry.entry_type.as_db_str(),
                        "Entry created"
                    );
                    Ok(CreatedEntry {
                        entry,
                        submission,
                        item,
                        location,
                    })
                })
            })
            .await
    }

    /// Load an entry by id.
    pub async fn get_entry(&self, id: EntryId) -> Result<Option<EntryRow>, StoreError> {
        self.executor
            .fetch_optional(
                "entry.get",
                QueryBuilder::select(self.dialect, "entry").and_where("id = ?", id.into_inner()),
            )
            .await
    }

    /// All entries of one type, newest first.
    pub async fn get_entries_by_type(
        &self,
        entry_type: EntryType,
    ) -> Result<Vec<EntryRow>, StoreError> {
        self.executor
            .fetch_all(
                "entry.by_type",
                QueryBuilder::select(self.dialect, "entry")
                    .and_where("entry_type = ?", entry_type.as_db_str())
                    .order_by("created_at DESC"),
            )
            .await
    }

    /// Entries whose name or description contains `keyword`.
    pub async fn search_entries(&self, keyword: &str) -> Result<Vec<EntryRow>, StoreError> {
        let pattern = format!("%{keyword}%");
        self.executor
            .fetch_all(
                "entry.search",
                QueryBuilder::select(self.dialect, "entry")
                    .and_where_with(
                        "(name LIKE ? OR description LIKE ?)",
                        vec![pattern.clone().into(), pattern.into()],
                    )
                    .order_by("name"),
            )
            .await
    }

    /// Number of entries of one type.
    pub async fn count_entries_by_type(&self, entry_type: EntryType) -> Result<i64, StoreError> {
        let row = self
            .executor
            .fetch_optional::<CountRow>(
                "entry.count_by_type",
                QueryBuilder::select(self.dialect, "entry")
                    .columns(&["COUNT(*)"])
                    .and_where("entry_type = ?", entry_type.as_db_str()),
            )
            .await?;
        Ok(row.map_or(0, |r| r.0))
    }

    /// Insert a new submission version for an existing entry.
    ///
    /// The new version is `PENDING` and does not become current until
    /// approved; the previous current version keeps serving reads.
    pub async fn update_entry(
        &self,
        entry_id: EntryId,
        content: String,
        submitter_id: Uuid,
    ) -> Result<SubmissionRow, StoreError> {
        const OP: &str = "entry.update";
        let dialect = self.dialect;
        let raw_entry_id = entry_id.into_inner();
        self.executor
            .execute_transaction(OP, move |conn| {
                Box::pin(async move {
                    let entry = fetch_optional_on::<EntryRow>(
                        conn,
                        OP,
                        QueryBuilder::select(dialect, "entry").and_where("id = ?", raw_entry_id),
                    )
                    .await?;
                    if entry.is_none() {
                        return Err(StoreError::Validation {
                            op: OP,
                            message: format!("entry {raw_entry_id} does not exist"),
                        });
                    }
                    let latest = fetch_optional_on::<CountRow>(
                        conn,
                        OP,
                        QueryBuilder::select(dialect, "submission")
                            .columns(&["COALESCE(MAX(content_version), 0)"])
                            .and_where("entry_id = ?", raw_entry_id),
                    )
                    .await?
                    .map_or(0, |r| r.0);
                    let next_version = latest.saturating_add(1);

                    let now = Utc::now();
                    let submission_id = execute_insert_on(
                        conn,
                        OP,
                        QueryBuilder::insert_into(dialect, "submission")
                            .columns(&[
                                "entry_id",
                                "content_version",
                                "is_current_version",
                                "status",
                                "approval_status",
                                "submitter_id",
                                "content",
                                "created_at",
                                "updated_at",
                            ])
                            .value(raw_entry_id)
                            .value(next_version)
                            .value(false)
                            .value(SubmissionStatus::Draft.as_db_str())
                            .value(ApprovalStatus::Pending.as_db_str())
                            .value(submitter_id)
                            .value(content.as_str())
                            .value(now)
                            .value(now),
                    )
                    .await?;

                    fetch_optional_on::<SubmissionRow>(
                        conn,
                        OP,
                        QueryBuilder::select(dialect, "submission")
                            .and_where("id = ?", submission_id),
                    )
                    .await?
                    .ok_or_else(|| missing_after_write(OP, "submission", submission_id))
                })
            })
            .await
    }

    /// Delete an entry and everything attached to it.
    ///
    /// Children go first so foreign keys hold at every step. Returns
    /// whether an entry row was actually removed.
    pub async fn delete_entry(&self, entry_id: EntryId) -> Result<bool, StoreError> {
        const OP: &str = "entry.delete";
        let dialect = self.dialect;
        let raw_entry_id = entry_id.into_inner();
        self.executor
            .execute_transaction(OP, move |conn| {
                Box::pin(async move {
                    let item = fetch_optional_on::<ItemRow>(
                        conn,
                        OP,
                        QueryBuilder::select(dialect, "item")
                            .and_where("entry_id = ?", raw_entry_id),
                    )
                    .await?;
                    if let Some(item) = item {
                        execute_update_on(
                            conn,
                            OP,
                            QueryBuilder::delete_from(dialect, "collection_item")
                                .and_where("item_id = ?", item.id.into_inner()),
                        )
                        .await?;
                    }
                    execute_update_on(
                        conn,
                        OP,
                        QueryBuilder::delete_from(dialect, "item")
                            .and_where("entry_id = ?", raw_entry_id),
                    )
                    .await?;
                    execute_update_on(
                        conn,
                        OP,
                        QueryBuilder::delete_from(dialect, "location")
                            .and_where("entry_id = ?", raw_entry_id),
                    )
                    .await?;
                    execute_update_on(
                        conn,
                        OP,
                        QueryBuilder::delete_from(dialect, "submission")
                            .and_where("entry_id = ?", raw_entry_id),
                    )
                    .await?;
                    let affected = execute_update_on(
                        conn,
                        OP,
                        QueryBuilder::delete_from(dialect, "entry")
                            .and_where("id = ?", raw_entry_id),
                    )
                    .await?;
                    if affected > 0 {
                        tracing::info!(entry_id = raw_entry_id, "Entry deleted");
                    }
                    Ok(affected > 0)
                })
            })
            .await
    }

    // -----------------------------------------------------------------
    // Submissions
    // -----------------------------------------------------------------

    /// Load a submission by id.
    pub async fn get_submission(
        &self,
        id: SubmissionId,
    ) -> Result<Option<SubmissionRow>, StoreError> {
        self.executor
            .fetch_optional(
                "submission.get",
                QueryBuilder::select(self.dialect, "submission")
                    .and_where("id = ?", id.into_inner()),
            )
            .await
    }

    /// The authoritative submission for an entry, if one has been approved.
    pub async fn get_current_submission(
        &self,
        entry_id: EntryId,
    ) -> Result<Option<SubmissionRow>, StoreError> {
        self.executor
            .fetch_optional(
                "submission.current",
                QueryBuilder::select(self.dialect, "submission")
                    .and_where("entry_id = ?", entry_id.into_inner())
                    .and_where("is_current_version = ?", true),
            )
            .await
    }

    /// Every version of an entry's content, newest first.
    pub async fn get_submission_history(
        &self,
        entry_id: EntryId,
    ) -> Result<Vec<SubmissionRow>, StoreError> {
        self.executor
            .fetch_all(
                "submission.history",
                QueryBuilder::select(self.dialect, "submission")
                    .and_where("entry_id = ?", entry_id.into_inner())
                    .order_by("content_version DESC"),
            )
            .await
    }

    /// Approve a submission, making it the entry's current version.
    ///
    /// Idempotent: an already-approved submission is returned unchanged
    /// with no further writes. Otherwise, in one transaction, the
    /// current-version flag is cleared from every other submission of
    /// the entry and set on the target along with the audit fields. The
    /// final update must affect exactly one row; any other count marks
    /// an internal inconsistency and rolls everything back.
    pub async fn approve_submission(
        &self,
        submission_id: SubmissionId,
        approver_id: Uuid,
    ) -> Result<SubmissionRow, StoreError> {
        const OP: &str = "submission.approve";
        let raw_id = submission_id.into_inner();
        let existing = self
            .executor
            .fetch_optional::<SubmissionRow>(
                OP,
                QueryBuilder::select(self.dialect, "submission").and_where("id = ?", raw_id),
            )
            .await?
            .ok_or_else(|| StoreError::Validation {
                op: OP,
                message: format!("submission {raw_id} does not exist"),
            })?;
        if existing.approval_status == ApprovalStatus::Approved {
            tracing::debug!(submission_id = raw_id, "Submission already approved");
            return Ok(existing);
        }

        let dialect = self.dialect;
        let raw_entry_id = existing.entry_id.into_inner();
        self.executor
            .execute_transaction(OP, move |conn| {
                Box::pin(async move {
                    let now = Utc::now();
                    execute_update_on(
                        conn,
                        OP,
                        QueryBuilder::update(dialect, "submission")
                            .set("is_current_version", false)
                            .set("updated_at", now)
                            .and_where("entry_id = ?", raw_entry_id)
                            .and_where("is_current_version = ?", true)
                            .and_where("id != ?", raw_id),
                    )
                    .await?;

                    let affected = execute_update_on(
                        conn,
                        OP,
                        QueryBuilder::update(dialect, "submission")
                            .set("approval_status", ApprovalStatus::Approved.as_db_str())
                            .set("approver_id", approver_id)
                            .set("approved_at", now)
                            .set("status", SubmissionStatus::Active.as_db_str())
                            .set("is_current_version", true)
                            .set("updated_at", now)
                            .and_where("id = ?", raw_id)
                            .and_where_with(
                                "approval_status != ?",
                                vec![ApprovalStatus::Approved.as_db_str().into()],
                            ),
                    )
                    .await?;
                    if affected != 1 {
                        return Err(StoreError::Fatal {
                            op: OP,
                            message: format!(
                                "approval of submission {raw_id} affected {affected} rows, expected 1"
                            ),
                        });
                    }

                    let approved = fetch_optional_on::<SubmissionRow>(
                        conn,
                        OP,
                        QueryBuilder::select(dialect, "submission").and_where("id = ?", raw_id),
                    )
                    .await?
                    .ok_or_else(|| missing_after_write(OP, "submission", raw_id))?;
                    tracing::info!(
                        submission_id = raw_id,
                        entry_id = raw_entry_id,
                        version = approved.content_version,
                        "Submission approved"
                    );
                    Ok(approved)
                })
            })
            .await
    }

    /// Reject a pending submission.
    ///
    /// Idempotent for already-rejected submissions; rejecting an
    /// approved submission is a caller error.
    pub async fn reject_submission(
        &self,
        submission_id: SubmissionId,
        approver_id: Uuid,
    ) -> Result<SubmissionRow, StoreError> {
        const OP: &str = "submission.reject";
        let raw_id = submission_id.into_inner();
        let existing = self
            .executor
            .fetch_optional::<SubmissionRow>(
                OP,
                QueryBuilder::select(self.dialect, "submission").and_where("id = ?", raw_id),
            )
            .await?
            .ok_or_else(|| StoreError::Validation {
                op: OP,
                message: format!("submission {raw_id} does not exist"),
            })?;
        match existing.approval_status {
            ApprovalStatus::Rejected => return Ok(existing),
            ApprovalStatus::Approved => {
                return Err(StoreError::Validation {
                    op: OP,
                    message: format!("submission {raw_id} is already approved"),
                });
            }
            ApprovalStatus::Pending => {}
        }

        let now = Utc::now();
        self.executor
            .execute_update(
                OP,
                QueryBuilder::update(self.dialect, "submission")
                    .set("approval_status", ApprovalStatus::Rejected.as_db_str())
                    .set("approver_id", approver_id)
                    .set("updated_at", now)
                    .and_where("id = ?", raw_id),
            )
            .await?;
        self.executor
            .fetch_optional::<SubmissionRow>(
                OP,
                QueryBuilder::select(self.dialect, "submission").and_where("id = ?", raw_id),
            )
            .await?
            .ok_or_else(|| missing_after_write(OP, "submission", raw_id))
    }

    // -----------------------------------------------------------------
    // Specialized records
    // -----------------------------------------------------------------

    /// Load the item record attached to an entry.
    pub async fn get_item_by_entry(
        &self,
        entry_id: EntryId,
    ) -> Result<Option<ItemRow>, StoreError> {
        self.executor
            .fetch_optional(
                "item.by_entry",
                QueryBuilder::select(self.dialect, "item")
                    .and_where("entry_id = ?", entry_id.into_inner()),
            )
            .await
    }

    /// Insert or overwrite the item record for an entry.
    pub async fn save_item(
        &self,
        entry_id: EntryId,
        draft: &ItemDraft,
    ) -> Result<ItemRow, StoreError> {
        const OP: &str = "item.save";
        let raw_entry_id = entry_id.into_inner();
        self.executor
            .execute_update(
                OP,
                insert_item_query(self.dialect, raw_entry_id, draft).on_conflict_update(
                    &["entry_id"],
                    &[
                        "material",
                        "display_name",
                        "rarity",
                        "collection_id",
                        "theme_id",
                        "custom_properties",
                    ],
                ),
            )
            .await?;
        self.get_item_by_entry(entry_id)
            .await?
            .ok_or_else(|| missing_after_write(OP, "item", raw_entry_id))
    }

    /// Load the location record attached to an entry.
    pub async fn get_location_by_entry(
        &self,
        entry_id: EntryId,
    ) -> Result<Option<LocationRow>, StoreError> {
        self.executor
            .fetch_optional(
                "location.by_entry",
                QueryBuilder::select(self.dialect, "location")
                    .and_where("entry_id = ?", entry_id.into_inner()),
            )
            .await
    }

    /// Insert or overwrite the location record for an entry.
    pub async fn save_location(
        &self,
        entry_id: EntryId,
        draft: &LocationDraft,
    ) -> Result<LocationRow, StoreError> {
        const OP: &str = "location.save";
        let raw_entry_id = entry_id.into_inner();
        self.executor
            .execute_update(
                OP,
                insert_location_query(self.dialect, raw_entry_id, draft).on_conflict_update(
                    &["entry_id"],
                    &["world", "x", "y", "z", "location_type"],
                ),
            )
            .await?;
        self.get_location_by_entry(entry_id)
            .await?
            .ok_or_else(|| missing_after_write(OP, "location", raw_entry_id))
    }

    // -----------------------------------------------------------------
    // Collections
    // -----------------------------------------------------------------

    /// Create a collection.
    pub async fn create_collection(
        &self,
        draft: &CollectionDraft,
    ) -> Result<CollectionRow, StoreError> {
        const OP: &str = "collection.create";
        let now = Utc::now();
        let id = self
            .executor
            .execute_insert(
                OP,
                QueryBuilder::insert_into(self.dialect, "collection")
                    .columns(&["name", "description", "theme_id", "created_at", "updated_at"])
                    .value(draft.name.as_str())
                    .value(draft.description.as_str())
                    .value(draft.theme_id.clone())
                    .value(now)
                    .value(now),
            )
            .await?;
        self.get_collection(CollectionId::new(id))
            .await?
            .ok_or_else(|| missing_after_write(OP, "collection", id))
    }

    /// Load a collection by id.
    pub async fn get_collection(
        &self,
        id: CollectionId,
    ) -> Result<Option<CollectionRow>, StoreError> {
        self.executor
            .fetch_optional(
                "collection.get",
                QueryBuilder::select(self.dialect, "collection")
                    .and_where("id = ?", id.into_inner()),
            )
            .await
    }

    /// All collections, alphabetical.
    pub async fn list_collections(&self) -> Result<Vec<CollectionRow>, StoreError> {
        self.executor
            .fetch_all(
                "collection.list",
                QueryBuilder::select(self.dialect, "collection").order_by("name"),
            )
            .await
    }

    /// Put an item into a collection at `sequence_number`, moving it if
    /// it is already a member.
    pub async fn add_collection_item(
        &self,
        collection_id: CollectionId,
        item_id: ItemId,
        sequence_number: i64,
    ) -> Result<(), StoreError> {
        self.executor
            .execute_update(
                "collection.add_item",
                QueryBuilder::insert_into(self.dialect, "collection_item")
                    .columns(&["collection_id", "item_id", "sequence_number"])
                    .value(collection_id.into_inner())
                    .value(item_id.into_inner())
                    .value(sequence_number)
                    .on_conflict_update(
                        &["collection_id", "item_id"],
                        &["sequence_number"],
                    ),
            )
            .await?;
        Ok(())
    }

    /// A collection's membership in display order.
    pub async fn get_collection_items(
        &self,
        collection_id: CollectionId,
    ) -> Result<Vec<CollectionItemRow>, StoreError> {
        self.executor
            .fetch_all(
                "collection.items",
                QueryBuilder::select(self.dialect, "collection_item")
                    .and_where("collection_id = ?", collection_id.into_inner())
                    .order_by("sequence_number"),
            )
            .await
    }

    // -----------------------------------------------------------------
    // Progress
    // -----------------------------------------------------------------

    /// A player's progress through a collection, if any is recorded.
    pub async fn get_progress(
        &self,
        player_id: Uuid,
        collection_id: CollectionId,
    ) -> Result<Option<ProgressRow>, StoreError> {
        self.executor
            .fetch_optional(
                "progress.get",
                QueryBuilder::select(self.dialect, "player_collection_progress")
                    .and_where("player_id = ?", player_id)
                    .and_where("collection_id = ?", collection_id.into_inner()),
            )
            .await
    }

    /// Record a player's progress through a collection.
    ///
    /// The value is clamped to `[0.0, 1.0]`. The write is a single
    /// atomic upsert keyed on `(player_id, collection_id)`, so
    /// concurrent calls and retries converge instead of duplicating or
    /// double-counting; repeating a call with the same value is a no-op.
    pub async fn update_progress(
        &self,
        player_id: Uuid,
        collection_id: CollectionId,
        progress: f64,
    ) -> Result<ProgressRow, StoreError> {
        const OP: &str = "progress.update";
        let clamped = progress.clamp(0.0, 1.0);
        let now = Utc::now();
        self.executor
            .execute_update(
                OP,
                QueryBuilder::insert_into(self.dialect, "player_collection_progress")
                    .columns(&["player_id", "collection_id", "progress", "updated_at"])
                    .value(player_id)
                    .value(collection_id.into_inner())
                    .value(clamped)
                    .value(now)
                    .on_conflict_update(
                        &["player_id", "collection_id"],
                        &["progress", "updated_at"],
                    ),
            )
            .await?;
        self.get_progress(player_id, collection_id)
            .await?
            .ok_or_else(|| missing_after_write(OP, "progress", collection_id.into_inner()))
    }

    /// Mark a collection finished for a player: progress pinned to 1.0
    /// and the completion time recorded. Same atomic-upsert shape as
    /// [`Self::update_progress`].
    pub async fn mark_completed(
        &self,
        player_id: Uuid,
        collection_id: CollectionId,
    ) -> Result<ProgressRow, StoreError> {
        const OP: &str = "progress.complete";
        let now = Utc::now();
        self.executor
            .execute_update(
                OP,
                QueryBuilder::insert_into(self.dialect, "player_collection_progress")
                    .columns(&[
                        "player_id",
                        "collection_id",
                        "progress",
                        "completed_at",
                        "updated_at",
                    ])
                    .value(player_id)
                    .value(collection_id.into_inner())
                    .value(1.0_f64)
                    .value(now)
                    .value(now)
                    .on_conflict_update(
                        &["player_id", "collection_id"],
                        &["progress", "completed_at", "updated_at"],
                    ),
            )
            .await?;
        self.get_progress(player_id, collection_id)
            .await?
            .ok_or_else(|| missing_after_write(OP, "progress", collection_id.into_inner()))
    }

    // -----------------------------------------------------------------
    // Players
    // -----------------------------------------------------------------

    /// Load a player by stable external id.
    pub async fn get_player(&self, uuid: Uuid) -> Result<Option<PlayerRow>, StoreError> {
        self.executor
            .fetch_optional(
                "player.get",
                QueryBuilder::select(self.dialect, "player").and_where("uuid = ?", uuid),
            )
            .await
    }

    /// Register a sighting of a player: create the row on first sight,
    /// otherwise touch `last_seen_at`, and append a name-change record
    /// when the name differs from the stored one.
    pub async fn upsert_player(&self, uuid: Uuid, name: &str) -> Result<PlayerRow, StoreError> {
        const OP: &str = "player.upsert";
        let dialect = self.dialect;
        let name = name.to_owned();

        // Read the current row outside the transaction so the write below
        // can be a single atomic upsert keyed on the UNIQUE uuid column.
        // Two concurrent first sightings then converge on one row instead
        // of racing a read-then-insert.
        let existing = self
            .executor
            .fetch_optional::<PlayerRow>(
                OP,
                QueryBuilder::select(dialect, "player").and_where("uuid = ?", uuid),
            )
            .await?;
        let renamed_from = existing
            .filter(|player| player.name != name)
            .map(|player| (player.id, player.name));

        self.executor
            .execute_transaction(OP, move |conn| {
                Box::pin(async move {
                    let now = Utc::now();
                    if let Some((player_id, previous_name)) = renamed_from {
                        execute_insert_on(
                            conn,
                            OP,
                            QueryBuilder::insert_into(dialect, "name_change_record")
                                .columns(&["player_id", "previous_name", "new_name", "changed_at"])
                                .value(player_id.into_inner())
                                .value(previous_name.as_str())
                                .value(name.as_str())
                                .value(now),
                        )
                        .await?;
                        tracing::info!(
                            player = %uuid,
                            from = previous_name.as_str(),
                            to = name.as_str(),
                            "Player name change recorded"
                        );
                    }

                    // `first_seen_at` stays out of the conflict update set,
                    // so it keeps its original value on repeat sightings.
                    execute_update_on(
                        conn,
                        OP,
                        QueryBuilder::insert_into(dialect, "player")
                            .columns(&["uuid", "name", "first_seen_at", "last_seen_at"])
                            .value(uuid)
                            .value(name.as_str())
                            .value(now)
                            .value(now)
                            .on_conflict_update(&["uuid"], &["name", "last_seen_at"]),
                    )
                    .await?;

                    fetch_optional_on::<PlayerRow>(
                        conn,
                        OP,
                        QueryBuilder::select(dialect, "player").and_where("uuid = ?", uuid),
                    )
                    .await?
                    .ok_or_else(|| StoreError::Fatal {
                        op: OP,
                        message: format!("player {uuid} missing immediately after write"),
                    })
                })
            })
            .await
    }

    /// A player's name changes, newest first.
    pub async fn get_name_history(
        &self,
        player_id: PlayerRowId,
    ) -> Result<Vec<NameChangeRow>, StoreError> {
        self.executor
            .fetch_all(
                "player.name_history",
                QueryBuilder::select(self.dialect, "name_change_record")
                    .and_where("player_id = ?", player_id.into_inner())
                    .order_by("changed_at DESC"),
            )
            .await
    }
}

/// Reject drafts whose specialization contradicts the entry type.
fn check_specialization(
    draft: &EntryDraft,
    specialization: &Specialization,
) -> Result<(), StoreError> {
    const OP: &str = "entry.create";
    match specialization {
        Specialization::None => Ok(()),
        Specialization::Item(_) => {
            if draft.entry_type == EntryType::Item {
                Ok(())
            } else {
                Err(StoreError::Validation {
                    op: OP,
                    message: format!(
                        "item record requires an ITEM entry, got {}",
                        draft.entry_type.as_db_str()
                    ),
                })
            }
        }
        Specialization::Location(_) => {
            if draft.entry_type.is_spatial() {
                Ok(())
            } else {
                Err(StoreError::Validation {
                    op: OP,
                    message: format!(
                        "location record requires a spatial entry, got {}",
                        draft.entry_type.as_db_str()
                    ),
                })
            }
        }
    }
}

fn insert_item_query(dialect: Dialect, entry_id: i64, draft: &ItemDraft) -> QueryBuilder {
    let custom_properties = draft
        .custom_properties
        .as_ref()
        .map_or(SqlValue::Null, |v| SqlValue::Text(v.to_string()));
    QueryBuilder::insert_into(dialect, "item")
        .columns(&[
            "entry_id",
            "material",
            "display_name",
            "rarity",
            "collection_id",
            "theme_id",
            "custom_properties",
        ])
        .value(entry_id)
        .value(draft.material.as_str())
        .value(draft.display_name.as_str())
        .value(draft.rarity.as_db_str())
        .value(draft.collection_id.map(CollectionId::into_inner))
        .value(draft.theme_id.clone())
        .value(custom_properties)
}

fn insert_location_query(dialect: Dialect, entry_id: i64, draft: &LocationDraft) -> QueryBuilder {
    QueryBuilder::insert_into(dialect, "location")
        .columns(&["entry_id", "world", "x", "y", "z", "location_type"])
        .value(entry_id)
        .value(draft.world.as_str())
        .value(draft.x)
        .value(draft.y)
        .value(draft.z)
        .value(draft.location_type.as_db_str())
}

fn missing_after_write(op: &'static str, table: &str, id: i64) -> StoreError {
    StoreError::Fatal {
        op,
        message: format!("{table} row {id} missing immediately after write"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lorevault_types::Rarity;

    fn entry_draft(entry_type: EntryType) -> EntryDraft {
        EntryDraft {
            entry_type,
            name: String::from("Sunken Bell"),
            description: String::from("A bell from the drowned chapel."),
            content: String::from("{}"),
            submitter_id: Uuid::nil(),
        }
    }

    fn item_draft() -> ItemDraft {
        ItemDraft {
            material: String::from("BELL"),
            display_name: String::from("Sunken Bell"),
            rarity: Rarity::Rare,
            collection_id: None,
            theme_id: None,
            custom_properties: None,
        }
    }

    #[test]
    fn item_specialization_requires_item_entry() {
        let result = check_specialization(
            &entry_draft(EntryType::Lore),
            &Specialization::Item(item_draft()),
        );
        assert!(matches!(result, Err(StoreError::Validation { .. })));
        assert!(check_specialization(
            &entry_draft(EntryType::Item),
            &Specialization::Item(item_draft())
        )
        .is_ok());
    }

    #[test]
    fn location_specialization_requires_spatial_entry() {
        let draft = LocationDraft {
            world: String::from("overworld"),
            x: 0.0,
            y: 64.0,
            z: 0.0,
            location_type: lorevault_types::LocationType::Landmark,
        };
        let result = check_specialization(
            &entry_draft(EntryType::Item),
            &Specialization::Location(draft.clone()),
        );
        assert!(matches!(result, Err(StoreError::Validation { .. })));
        assert!(check_specialization(
            &entry_draft(EntryType::City),
            &Specialization::Location(draft)
        )
        .is_ok());
    }

    #[test]
    fn none_specialization_is_always_valid() {
        for entry_type in [EntryType::Item, EntryType::City, EntryType::Lore] {
            assert!(check_specialization(&entry_draft(entry_type), &Specialization::None).is_ok());
        }
    }

    #[test]
    fn item_insert_serializes_custom_properties() {
        let mut draft = item_draft();
        draft.custom_properties = Some(serde_json::json!({"glow": true}));
        let query = insert_item_query(Dialect::Embedded, 7, &draft);
        let params = query.into_parameters();
        assert!(params.contains(&SqlValue::Text(String::from("{\"glow\":true}"))));
    }
}
