//! Integration tests for the `lorevault-db` persistence layer.
//!
//! Most tests run against a throwaway embedded store in a temp
//! directory and need no external services. Tests against the
//! client/server dialect require a live MySQL instance and are marked
//! `#[ignore]`:
//!
//! ```bash
//! cargo test -p lorevault-db -- --ignored
//! ```

// Integration tests use expect/unwrap extensively for clarity -- panicking
// on failure is the correct behavior in test code.
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::items_after_statements,
    clippy::missing_panics_doc,
    clippy::too_many_lines,
    clippy::indexing_slicing,
    clippy::float_cmp
)]

use std::sync::Arc;

use lorevault_db::{
    CollectionRepository, EmbeddedConfig, EntryRepository, HealthMonitor, HealthMonitorConfig,
    HealthState, LoreManager, ServerConfig, Specialization, StoreConfig, StoreError,
};
use lorevault_types::{
    ApprovalStatus, CollectionDraft, EntryDraft, EntryType, ItemDraft, LocationDraft,
    LocationType, Rarity, SubmissionStatus,
};
use uuid::Uuid;

async fn setup_store() -> (Arc<LoreManager>, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let config = StoreConfig::Embedded(EmbeddedConfig::new(dir.path().join("lore.db")));
    let manager = LoreManager::connect(config).await.expect("connect store");
    manager.ensure_schema().await.expect("initialize schema");
    (Arc::new(manager), dir)
}

fn entry_draft(entry_type: EntryType, name: &str) -> EntryDraft {
    EntryDraft {
        entry_type,
        name: name.to_owned(),
        description: format!("{name} description"),
        content: format!("{{\"body\": \"{name}\"}}"),
        submitter_id: Uuid::new_v4(),
    }
}

fn item_draft() -> ItemDraft {
    ItemDraft {
        material: "GOLDEN_APPLE".to_owned(),
        display_name: "Apple of the First Orchard".to_owned(),
        rarity: Rarity::Epic,
        collection_id: None,
        theme_id: Some("orchard".to_owned()),
        custom_properties: Some(serde_json::json!({"glow": true, "stack": 1})),
    }
}

// =============================================================================
// Schema lifecycle
// =============================================================================

#[tokio::test]
async fn schema_validation_fails_before_initialization() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let config = StoreConfig::Embedded(EmbeddedConfig::new(dir.path().join("lore.db")));
    let manager = LoreManager::connect(config).await.expect("connect store");

    assert!(!manager.validate_schema().await);
    manager.ensure_schema().await.expect("initialize schema");
    assert!(manager.validate_schema().await);
}

#[tokio::test]
async fn schema_validation_fails_when_one_table_is_dropped() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("lore.db");
    let config = StoreConfig::Embedded(EmbeddedConfig::new(path.clone()));
    let manager = LoreManager::connect(config).await.expect("connect store");
    manager.ensure_schema().await.expect("initialize schema");
    assert!(manager.validate_schema().await);

    // Drop one required table behind the manager's back.
    use sqlx::Connection;
    let mut conn =
        sqlx::sqlite::SqliteConnection::connect(&format!("sqlite:{}", path.display()))
            .await
            .expect("open store file directly");
    sqlx::query("DROP TABLE player_collection_progress")
        .execute(&mut conn)
        .await
        .expect("drop table");
    conn.close().await.expect("close direct connection");

    assert!(!manager.validate_schema().await);
}

#[tokio::test]
async fn schema_initialization_is_idempotent() {
    let (manager, _dir) = setup_store().await;
    manager.ensure_schema().await.expect("second run");
    manager.ensure_schema().await.expect("third run");
    assert!(manager.validate_schema().await);
}

#[tokio::test]
async fn connection_probe_answers_on_live_store() {
    let (manager, _dir) = setup_store().await;
    assert!(manager.validate_connection().await);
    manager.reconnect().await.expect("reconnect live store");
    assert!(manager.validate_connection().await);
}

// =============================================================================
// Entries and specialized records
// =============================================================================

#[tokio::test]
async fn item_entry_round_trips_field_for_field() {
    let (manager, _dir) = setup_store().await;
    let draft = item_draft();
    let created = manager
        .create_entry(
            entry_draft(EntryType::Item, "Apple of the First Orchard"),
            Specialization::Item(draft.clone()),
        )
        .await
        .expect("create item entry");

    let item = created.item.expect("item record created");
    assert_eq!(item.material, draft.material);
    assert_eq!(item.display_name, draft.display_name);
    assert_eq!(item.rarity, draft.rarity);
    assert_eq!(item.collection_id, None);
    assert_eq!(item.theme_id, draft.theme_id);
    assert_eq!(item.custom_properties, draft.custom_properties);

    let reloaded = manager
        .get_item_by_entry(created.entry.id)
        .await
        .expect("reload item")
        .expect("item exists");
    assert_eq!(reloaded.id, item.id);
    assert_eq!(reloaded.custom_properties, draft.custom_properties);
}

#[tokio::test]
async fn item_with_null_custom_fields_round_trips() {
    let (manager, _dir) = setup_store().await;
    let draft = ItemDraft {
        theme_id: None,
        custom_properties: None,
        ..item_draft()
    };
    let created = manager
        .create_entry(
            entry_draft(EntryType::Item, "Plain Stone"),
            Specialization::Item(draft),
        )
        .await
        .expect("create item entry");

    let item = created.item.expect("item record created");
    assert_eq!(item.theme_id, None);
    assert_eq!(item.custom_properties, None);
}

#[tokio::test]
async fn location_entry_round_trips() {
    let (manager, _dir) = setup_store().await;
    let draft = LocationDraft {
        world: "overworld".to_owned(),
        x: 120.5,
        y: 64.0,
        z: -3000.25,
        location_type: LocationType::City,
    };
    let created = manager
        .create_entry(
            entry_draft(EntryType::City, "Port Meridian"),
            Specialization::Location(draft.clone()),
        )
        .await
        .expect("create city entry");

    let location = created.location.expect("location record created");
    assert_eq!(location.world, draft.world);
    assert_eq!(location.x, draft.x);
    assert_eq!(location.z, draft.z);
    assert_eq!(location.location_type, LocationType::City);
}

#[tokio::test]
async fn specialization_mismatch_is_rejected() {
    let (manager, _dir) = setup_store().await;
    let result = manager
        .create_entry(
            entry_draft(EntryType::Lore, "The Drowning of Meridian"),
            Specialization::Item(item_draft()),
        )
        .await;
    assert!(matches!(result, Err(StoreError::Validation { .. })));
}

#[tokio::test]
async fn search_and_count_find_created_entries() {
    let (manager, _dir) = setup_store().await;
    for name in ["Meridian Gate", "Meridian Docks", "Ashfall Keep"] {
        manager
            .create_entry(entry_draft(EntryType::Lore, name), Specialization::None)
            .await
            .expect("create entry");
    }

    let hits = manager.search_entries("Meridian").await.expect("search");
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|e| e.name.contains("Meridian")));

    let count = manager
        .count_entries_by_type(EntryType::Lore)
        .await
        .expect("count");
    assert_eq!(count, 3);
    let by_type = manager
        .get_entries_by_type(EntryType::Lore)
        .await
        .expect("list by type");
    assert_eq!(by_type.len(), 3);
}

#[tokio::test]
async fn delete_entry_cascades_to_children() {
    let (manager, _dir) = setup_store().await;
    let collection = manager
        .create_collection(&CollectionDraft {
            name: "Relics".to_owned(),
            description: "First-age relics".to_owned(),
            theme_id: None,
        })
        .await
        .expect("create collection");
    let created = manager
        .create_entry(
            entry_draft(EntryType::Item, "Relic Crown"),
            Specialization::Item(item_draft()),
        )
        .await
        .expect("create item entry");
    let item = created.item.expect("item record");
    manager
        .add_collection_item(collection.id, item.id, 1)
        .await
        .expect("add to collection");

    let deleted = manager.delete_entry(created.entry.id).await.expect("delete");
    assert!(deleted);

    assert!(manager
        .get_entry(created.entry.id)
        .await
        .expect("entry lookup")
        .is_none());
    assert!(manager
        .get_item_by_entry(created.entry.id)
        .await
        .expect("item lookup")
        .is_none());
    assert!(manager
        .get_submission_history(created.entry.id)
        .await
        .expect("history lookup")
        .is_empty());
    assert!(manager
        .get_collection_items(collection.id)
        .await
        .expect("membership lookup")
        .is_empty());

    // Deleting again reports nothing removed.
    assert!(!manager.delete_entry(created.entry.id).await.expect("redelete"));
}

// =============================================================================
// Versioning and approval
// =============================================================================

#[tokio::test]
async fn first_submission_starts_pending_and_not_current() {
    let (manager, _dir) = setup_store().await;
    let created = manager
        .create_entry(entry_draft(EntryType::Lore, "e1"), Specialization::None)
        .await
        .expect("create entry");

    assert_eq!(created.submission.content_version, 1);
    assert!(!created.submission.is_current_version);
    assert_eq!(created.submission.approval_status, ApprovalStatus::Pending);
    assert_eq!(created.submission.status, SubmissionStatus::Draft);
    assert!(manager
        .get_current_submission(created.entry.id)
        .await
        .expect("current lookup")
        .is_none());
}

#[tokio::test]
async fn approval_flips_current_version_across_revisions() {
    let (manager, _dir) = setup_store().await;
    let admin = Uuid::new_v4();
    let created = manager
        .create_entry(entry_draft(EntryType::City, "e1"), Specialization::None)
        .await
        .expect("create entry");

    let v1 = manager
        .approve_submission(created.submission.id, admin)
        .await
        .expect("approve v1");
    assert_eq!(v1.approval_status, ApprovalStatus::Approved);
    assert_eq!(v1.status, SubmissionStatus::Active);
    assert!(v1.is_current_version);
    assert_eq!(v1.approver_id, Some(admin));
    assert!(v1.approved_at.is_some());

    let v2 = manager
        .update_entry(created.entry.id, "{\"body\": \"revised\"}".to_owned(), admin)
        .await
        .expect("submit v2");
    assert_eq!(v2.content_version, 2);
    assert!(!v2.is_current_version);

    let approved_v2 = manager
        .approve_submission(v2.id, admin)
        .await
        .expect("approve v2");
    assert!(approved_v2.is_current_version);

    let history = manager
        .get_submission_history(created.entry.id)
        .await
        .expect("history");
    assert_eq!(history.len(), 2);
    let current: Vec<_> = history.iter().filter(|s| s.is_current_version).collect();
    assert_eq!(current.len(), 1);
    assert_eq!(current[0].id, v2.id);

    let current_row = manager
        .get_current_submission(created.entry.id)
        .await
        .expect("current lookup")
        .expect("current exists");
    assert_eq!(current_row.id, v2.id);
    assert_eq!(current_row.content, "{\"body\": \"revised\"}");
}

#[tokio::test]
async fn double_approval_is_idempotent() {
    let (manager, _dir) = setup_store().await;
    let admin = Uuid::new_v4();
    let created = manager
        .create_entry(entry_draft(EntryType::Lore, "e1"), Specialization::None)
        .await
        .expect("create entry");

    let first = manager
        .approve_submission(created.submission.id, admin)
        .await
        .expect("first approve");
    let second = manager
        .approve_submission(created.submission.id, Uuid::new_v4())
        .await
        .expect("second approve");

    // Audit fields are unchanged by the second call.
    assert_eq!(second.approver_id, first.approver_id);
    assert_eq!(second.approved_at, first.approved_at);
    assert_eq!(second.updated_at, first.updated_at);
    assert!(second.is_current_version);
}

#[tokio::test]
async fn rejection_records_reviewer_and_blocks_reapproval_of_approved() {
    let (manager, _dir) = setup_store().await;
    let admin = Uuid::new_v4();
    let created = manager
        .create_entry(entry_draft(EntryType::Lore, "e1"), Specialization::None)
        .await
        .expect("create entry");

    let rejected = manager
        .reject_submission(created.submission.id, admin)
        .await
        .expect("reject");
    assert_eq!(rejected.approval_status, ApprovalStatus::Rejected);
    assert_eq!(rejected.approver_id, Some(admin));
    assert!(!rejected.is_current_version);

    // Rejecting again is a no-op.
    let again = manager
        .reject_submission(created.submission.id, Uuid::new_v4())
        .await
        .expect("re-reject");
    assert_eq!(again.approver_id, Some(admin));

    // An approved revision cannot be rejected.
    let v2 = manager
        .update_entry(created.entry.id, "{}".to_owned(), admin)
        .await
        .expect("submit v2");
    manager.approve_submission(v2.id, admin).await.expect("approve v2");
    let result = manager.reject_submission(v2.id, admin).await;
    assert!(matches!(result, Err(StoreError::Validation { .. })));
}

#[tokio::test]
async fn approving_missing_submission_is_a_validation_error() {
    let (manager, _dir) = setup_store().await;
    let result = manager
        .approve_submission(lorevault_types::SubmissionId::new(99_999), Uuid::new_v4())
        .await;
    assert!(matches!(result, Err(StoreError::Validation { .. })));
}

// =============================================================================
// Collections and progress
// =============================================================================

#[tokio::test]
async fn collection_items_come_back_in_sequence_order() {
    let (manager, _dir) = setup_store().await;
    let collection = manager
        .create_collection(&CollectionDraft {
            name: "Bells of Meridian".to_owned(),
            description: "Every bell of the old city".to_owned(),
            theme_id: Some("bells".to_owned()),
        })
        .await
        .expect("create collection");

    let mut item_ids = Vec::new();
    for name in ["Third Bell", "First Bell", "Second Bell"] {
        let created = manager
            .create_entry(
                entry_draft(EntryType::Item, name),
                Specialization::Item(item_draft()),
            )
            .await
            .expect("create item");
        item_ids.push(created.item.expect("item record").id);
    }
    manager
        .add_collection_item(collection.id, item_ids[0], 3)
        .await
        .expect("add third");
    manager
        .add_collection_item(collection.id, item_ids[1], 1)
        .await
        .expect("add first");
    manager
        .add_collection_item(collection.id, item_ids[2], 2)
        .await
        .expect("add second");

    let members = manager
        .get_collection_items(collection.id)
        .await
        .expect("list members");
    let sequence: Vec<i64> = members.iter().map(|m| m.sequence_number).collect();
    assert_eq!(sequence, vec![1, 2, 3]);

    // Re-adding a member moves it instead of failing.
    manager
        .add_collection_item(collection.id, item_ids[0], 7)
        .await
        .expect("move member");
    let members = manager
        .get_collection_items(collection.id)
        .await
        .expect("list members again");
    assert_eq!(members.len(), 3);
    assert_eq!(members[2].sequence_number, 7);

    let listed = manager.list_collections().await.expect("list collections");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "Bells of Meridian");
}

#[tokio::test]
async fn progress_is_clamped_and_idempotent() {
    let (manager, _dir) = setup_store().await;
    let collection = manager
        .create_collection(&CollectionDraft {
            name: "Relics".to_owned(),
            description: String::new(),
            theme_id: None,
        })
        .await
        .expect("create collection");
    let player = Uuid::new_v4();

    let over = manager
        .update_progress(player, collection.id, 7.5)
        .await
        .expect("over-range update");
    assert_eq!(over.progress, 1.0);
    let under = manager
        .update_progress(player, collection.id, -0.5)
        .await
        .expect("under-range update");
    assert_eq!(under.progress, 0.0);

    // A retried call with the same value converges on the same row.
    let first = manager
        .update_progress(player, collection.id, 0.4)
        .await
        .expect("first update");
    let retried = manager
        .update_progress(player, collection.id, 0.4)
        .await
        .expect("retried update");
    assert_eq!(first.progress, 0.4);
    assert_eq!(retried.progress, 0.4);
}

#[tokio::test]
async fn mark_completed_pins_progress_and_records_time() {
    let (manager, _dir) = setup_store().await;
    let collection = manager
        .create_collection(&CollectionDraft {
            name: "Relics".to_owned(),
            description: String::new(),
            theme_id: None,
        })
        .await
        .expect("create collection");
    let player = Uuid::new_v4();

    // Works with no prior progress row.
    let done = manager
        .mark_completed(player, collection.id)
        .await
        .expect("mark completed");
    assert_eq!(done.progress, 1.0);
    assert!(done.completed_at.is_some());

    // And over an existing row.
    let other = Uuid::new_v4();
    manager
        .update_progress(other, collection.id, 0.3)
        .await
        .expect("partial progress");
    let done = manager
        .mark_completed(other, collection.id)
        .await
        .expect("mark completed over row");
    assert_eq!(done.progress, 1.0);
    assert!(done.completed_at.is_some());
}

#[tokio::test]
async fn racing_progress_updates_leave_exactly_one_row() {
    let (manager, _dir) = setup_store().await;
    let collection = manager
        .create_collection(&CollectionDraft {
            name: "Relics".to_owned(),
            description: String::new(),
            theme_id: None,
        })
        .await
        .expect("create collection");
    let player = Uuid::new_v4();

    let (a, b, c) = tokio::join!(
        manager.update_progress(player, collection.id, 0.5),
        manager.update_progress(player, collection.id, 0.5),
        manager.update_progress(player, collection.id, 0.8),
    );
    a.expect("first racer");
    b.expect("second racer");
    c.expect("third racer");

    let row = manager
        .get_progress(player, collection.id)
        .await
        .expect("progress lookup")
        .expect("exactly one row");
    assert!(row.progress == 0.5 || row.progress == 0.8);
}

// =============================================================================
// Players
// =============================================================================

#[tokio::test]
async fn player_upsert_tracks_name_changes() {
    let (manager, _dir) = setup_store().await;
    let uuid = Uuid::new_v4();

    let first = manager.upsert_player(uuid, "Aldric").await.expect("first sighting");
    assert_eq!(first.name, "Aldric");
    assert_eq!(first.first_seen_at, first.last_seen_at);

    // Same name: only the sighting time moves.
    let second = manager.upsert_player(uuid, "Aldric").await.expect("second sighting");
    assert_eq!(second.id, first.id);
    assert!(second.last_seen_at >= first.last_seen_at);
    assert!(manager
        .get_name_history(first.id)
        .await
        .expect("history")
        .is_empty());

    // New name: a change record is appended.
    let renamed = manager.upsert_player(uuid, "Aldric_II").await.expect("rename");
    assert_eq!(renamed.name, "Aldric_II");
    let history = manager.get_name_history(first.id).await.expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].previous_name, "Aldric");
    assert_eq!(history[0].new_name, "Aldric_II");

    let loaded = manager
        .get_player(uuid)
        .await
        .expect("player lookup")
        .expect("player exists");
    assert_eq!(loaded.name, "Aldric_II");
}

#[tokio::test]
async fn racing_first_sightings_converge_on_one_player_row() {
    let (manager, _dir) = setup_store().await;
    let uuid = Uuid::new_v4();

    let (a, b) = tokio::join!(
        manager.upsert_player(uuid, "Aldric"),
        manager.upsert_player(uuid, "Aldric"),
    );
    let a = a.expect("first racer");
    let b = b.expect("second racer");

    assert_eq!(a.id, b.id);
    let loaded = manager
        .get_player(uuid)
        .await
        .expect("player lookup")
        .expect("exactly one row");
    assert_eq!(loaded.id, a.id);
    assert_eq!(loaded.name, "Aldric");
}

// =============================================================================
// Repositories and health monitoring
// =============================================================================

#[tokio::test]
async fn repositories_delegate_to_one_manager() {
    let (manager, _dir) = setup_store().await;
    let entries = EntryRepository::new(Arc::clone(&manager));
    let collections = CollectionRepository::new(Arc::clone(&manager));
    let admin = Uuid::new_v4();

    let created = entries
        .save(entry_draft(EntryType::Lore, "Shared State"), Specialization::None)
        .await
        .expect("create via repository");
    let approved = entries
        .approve(created.submission.id, admin)
        .await
        .expect("approve via repository");
    assert!(approved.is_current_version);

    let collection = collections
        .create(&CollectionDraft {
            name: "Repo Collection".to_owned(),
            description: String::new(),
            theme_id: None,
        })
        .await
        .expect("create collection via repository");
    let progress = collections
        .update_progress(admin, collection.id, 0.25)
        .await
        .expect("progress via repository");
    assert_eq!(progress.progress, 0.25);

    // Both façades observe the same underlying store.
    let found = entries
        .get_by_id(created.entry.id)
        .await
        .expect("lookup")
        .expect("entry visible");
    assert_eq!(found.name, "Shared State");
}

#[tokio::test]
async fn health_monitor_stays_healthy_on_live_store() {
    let (manager, _dir) = setup_store().await;
    let monitor = HealthMonitor::new(
        Arc::clone(&manager),
        HealthMonitorConfig {
            check_interval_secs: 0,
            failure_backoff_secs: 0,
            log_throttle_secs: 60,
        },
    );
    let state = monitor.subscribe();
    let handle = monitor.spawn();

    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    assert_eq!(*state.borrow(), HealthState::Healthy);
    handle.abort();
}

// =============================================================================
// Client/server dialect (requires a live MySQL instance)
// =============================================================================

fn server_config() -> StoreConfig {
    StoreConfig::Server(ServerConfig {
        host: "localhost".to_owned(),
        port: 3306,
        database: "lorevault_test".to_owned(),
        user: "lorevault".to_owned(),
        password: "lorevault_dev".to_owned(),
        max_connections: 5,
        min_connections: 1,
        idle_timeout_secs: 60,
        acquire_timeout_secs: 5,
    })
}

#[tokio::test]
#[ignore = "requires live MySQL instance (docker compose up -d)"]
async fn server_dialect_schema_and_roundtrip() {
    let manager = LoreManager::connect(server_config())
        .await
        .expect("connect server store");
    manager.ensure_schema().await.expect("initialize schema");
    assert!(manager.validate_schema().await);

    let created = manager
        .create_entry(
            entry_draft(EntryType::Item, "Server Dialect Apple"),
            Specialization::Item(item_draft()),
        )
        .await
        .expect("create item entry");
    let reloaded = manager
        .get_item_by_entry(created.entry.id)
        .await
        .expect("reload item")
        .expect("item exists");
    assert_eq!(reloaded.display_name, "Apple of the First Orchard");

    manager.delete_entry(created.entry.id).await.expect("cleanup");
    manager.close().await;
}

#[tokio::test]
#[ignore = "requires live MySQL instance (docker compose up -d)"]
async fn server_dialect_index_creation_is_repeatable() {
    let manager = LoreManager::connect(server_config())
        .await
        .expect("connect server store");
    // Duplicate-index errors from the second run must be tolerated.
    manager.ensure_schema().await.expect("first run");
    manager.ensure_schema().await.expect("second run");
    manager.close().await;
}
