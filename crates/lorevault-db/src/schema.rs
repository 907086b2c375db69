//! Schema creation and validation.
//!
//! [`SchemaSetup`] owns the full logical schema: nine tables created in
//! dependency order so foreign keys always reference existing tables,
//! plus the secondary indexes the read paths rely on. Every statement
//! is `IF NOT EXISTS` (or tolerated as a duplicate), so initialization
//! is safe to run on every startup. There are no migrations; a store
//! whose tables do not match is reported by [`SchemaSetup::validate_schema`]
//! and left untouched.

use std::sync::Arc;

use crate::error::StoreError;
use crate::executor::QueryExecutor;
use crate::provider::StoreProvider;
use crate::query::SqlValue;
use crate::rows::CatalogRow;
use crate::schema_query::{ColumnType, SchemaQueryBuilder, TableBuilder};

/// Tables the layer requires, in dependency order.
pub const REQUIRED_TABLES: [&str; 9] = [
    "player",
    "name_change_record",
    "collection",
    "entry",
    "submission",
    "item",
    "location",
    "collection_item",
    "player_collection_progress",
];

/// Creates and validates the persistent schema.
pub struct SchemaSetup {
    executor: QueryExecutor,
    builder: SchemaQueryBuilder,
}

impl SchemaSetup {
    /// Create a setup bound to a connected provider.
    pub fn new(provider: Arc<StoreProvider>) -> Self {
        let builder = SchemaQueryBuilder::new(provider.dialect());
        Self {
            executor: QueryExecutor::new(provider),
            builder,
        }
    }

    /// Create every required table and index that does not exist yet.
    ///
    /// Idempotent: re-running against an initialized store is a no-op.
    pub async fn initialize_tables(&self) -> Result<(), StoreError> {
        for statement in self.table_statements() {
            self.executor.execute_ddl("schema.create_table", &statement).await?;
        }
        for statement in self.index_statements() {
            if let Err(error) = self.executor.execute_ddl("schema.create_index", &statement).await {
                // The server dialect has no CREATE INDEX IF NOT EXISTS;
                // an index that already exists is not a failure.
                if is_duplicate_index(&error) {
                    tracing::debug!(statement = %statement, "Index already exists");
                } else {
                    return Err(error);
                }
            }
        }
        tracing::info!(tables = REQUIRED_TABLES.len(), "Schema initialized");
        Ok(())
    }

    /// Whether every required table exists.
    ///
    /// Never errors: a probe failure counts as a missing table, since
    /// either way the store is not usable as-is.
    pub async fn validate_schema(&self) -> bool {
        let probe = self.builder.table_exists_query();
        for table in REQUIRED_TABLES {
            let found = self
                .executor
                .fetch_optional_raw::<CatalogRow>(
                    "schema.validate",
                    probe,
                    vec![SqlValue::Text(table.to_owned())],
                )
                .await;
            match found {
                Ok(Some(_)) => {}
                Ok(None) => {
                    tracing::warn!(table, "Required table missing");
                    return false;
                }
                Err(error) => {
                    tracing::warn!(table, error = %error, "Schema probe failed");
                    return false;
                }
            }
        }
        true
    }

    fn table_statements(&self) -> Vec<String> {
        vec![
            self.player_table().build(),
            self.name_change_table().build(),
            self.collection_table().build(),
            self.entry_table().build(),
            self.submission_table().build(),
            self.item_table().build(),
            self.location_table().build(),
            self.collection_item_table().build(),
            self.progress_table().build(),
        ]
    }

    fn index_statements(&self) -> Vec<String> {
        vec![
            self.builder
                .create_index("idx_player_name", "player", &["name"]),
            self.builder
                .create_index("idx_name_change_player", "name_change_record", &["player_id"]),
            self.builder
                .create_index("idx_entry_type", "entry", &["entry_type"]),
            self.builder
                .create_index("idx_entry_name", "entry", &["name"]),
            self.builder.create_index(
                "idx_submission_current",
                "submission",
                &["entry_id", "is_current_version"],
            ),
            self.builder
                .create_index("idx_item_collection", "item", &["collection_id"]),
        ]
    }

    fn player_table(&self) -> TableBuilder {
        self.builder
            .create_table("player")
            .column("id", ColumnType::AutoPrimaryKey, "")
            .column("uuid", ColumnType::VarChar(36), "NOT NULL")
            .column("name", ColumnType::VarChar(16), "NOT NULL")
            .column("first_seen_at", ColumnType::BigInt, "NOT NULL")
            .column("last_seen_at", ColumnType::BigInt, "NOT NULL")
            .unique(&["uuid"])
    }

    fn name_change_table(&self) -> TableBuilder {
        self.builder
            .create_table("name_change_record")
            .column("id", ColumnType::AutoPrimaryKey, "")
            .column("player_id", ColumnType::BigInt, "NOT NULL")
            .column("previous_name", ColumnType::VarChar(16), "NOT NULL")
            .column("new_name", ColumnType::VarChar(16), "NOT NULL")
            .column("changed_at", ColumnType::BigInt, "NOT NULL")
            .foreign_key("player_id", "player", "id")
    }

    fn collection_table(&self) -> TableBuilder {
        self.builder
            .create_table("collection")
            .column("id", ColumnType::AutoPrimaryKey, "")
            .column("name", ColumnType::VarChar(255), "NOT NULL")
            .column("description", ColumnType::Text, "NOT NULL")
            .column("theme_id", ColumnType::VarChar(64), "")
            .column("created_at", ColumnType::BigInt, "NOT NULL")
            .column("updated_at", ColumnType::BigInt, "NOT NULL")
    }

    fn entry_table(&self) -> TableBuilder {
        self.builder
            .create_table("entry")
            .column("id", ColumnType::AutoPrimaryKey, "")
            .column("entry_type", ColumnType::VarChar(32), "NOT NULL")
            .column("name", ColumnType::VarChar(255), "NOT NULL")
            .column("description", ColumnType::Text, "NOT NULL")
            .column("created_at", ColumnType::BigInt, "NOT NULL")
            .column("updated_at", ColumnType::BigInt, "NOT NULL")
    }

    fn submission_table(&self) -> TableBuilder {
        self.builder
            .create_table("submission")
            .column("id", ColumnType::AutoPrimaryKey, "")
            .column("entry_id", ColumnType::BigInt, "NOT NULL")
            .column("content_version", ColumnType::BigInt, "NOT NULL")
            .column("is_current_version", ColumnType::Boolean, "NOT NULL DEFAULT 0")
            .column("status", ColumnType::VarChar(16), "NOT NULL")
            .column("approval_status", ColumnType::VarChar(16), "NOT NULL")
            .column("submitter_id", ColumnType::VarChar(36), "NOT NULL")
            .column("approver_id", ColumnType::VarChar(36), "")
            .column("content", ColumnType::Text, "NOT NULL")
            .column("approved_at", ColumnType::BigInt, "")
            .column("created_at", ColumnType::BigInt, "NOT NULL")
            .column("updated_at", ColumnType::BigInt, "NOT NULL")
            .unique(&["entry_id", "content_version"])
            .foreign_key("entry_id", "entry", "id")
    }

    fn item_table(&self) -> TableBuilder {
        self.builder
            .create_table("item")
            .column("id", ColumnType::AutoPrimaryKey, "")
            .column("entry_id", ColumnType::BigInt, "NOT NULL")
            .column("material", ColumnType::VarChar(64), "NOT NULL")
            .column("display_name", ColumnType::VarChar(255), "NOT NULL")
            .column("rarity", ColumnType::VarChar(16), "NOT NULL")
            .column("collection_id", ColumnType::BigInt, "")
            .column("theme_id", ColumnType::VarChar(64), "")
            .column("custom_properties", ColumnType::Text, "")
            .unique(&["entry_id"])
            .foreign_key("entry_id", "entry", "id")
            .foreign_key("collection_id", "collection", "id")
    }

    fn location_table(&self) -> TableBuilder {
        self.builder
            .create_table("location")
            .column("id", ColumnType::AutoPrimaryKey, "")
            .column("entry_id", ColumnType::BigInt, "NOT NULL")
            .column("world", ColumnType::VarChar(64), "NOT NULL")
            .column("x", ColumnType::Double, "NOT NULL")
            .column("y", ColumnType::Double, "NOT NULL")
            .column("z", ColumnType::Double, "NOT NULL")
            .column("location_type", ColumnType::VarChar(16), "NOT NULL")
            .unique(&["entry_id"])
            .foreign_key("entry_id", "entry", "id")
    }

    fn collection_item_table(&self) -> TableBuilder {
        self.builder
            .create_table("collection_item")
            .column("collection_id", ColumnType::BigInt, "NOT NULL")
            .column("item_id", ColumnType::BigInt, "NOT NULL")
            .column("sequence_number", ColumnType::BigInt, "NOT NULL")
            .primary_key(&["collection_id", "item_id"])
            .foreign_key("collection_id", "collection", "id")
            .foreign_key("item_id", "item", "id")
    }

    fn progress_table(&self) -> TableBuilder {
        self.builder
            .create_table("player_collection_progress")
            .column("player_id", ColumnType::VarChar(36), "NOT NULL")
            .column("collection_id", ColumnType::BigInt, "NOT NULL")
            .column("progress", ColumnType::Double, "NOT NULL DEFAULT 0")
            .column("completed_at", ColumnType::BigInt, "")
            .column("updated_at", ColumnType::BigInt, "NOT NULL")
            .primary_key(&["player_id", "collection_id"])
            .foreign_key("collection_id", "collection", "id")
    }
}

/// Whether the error is the server dialect's duplicate-index complaint
/// (error 1061).
fn is_duplicate_index(error: &StoreError) -> bool {
    let message = error.to_string();
    message.contains("1061") || message.contains("Duplicate key name")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;

    #[test]
    fn required_tables_are_dependency_ordered() {
        let position = |name: &str| {
            REQUIRED_TABLES
                .iter()
                .position(|t| *t == name)
                .unwrap_or(usize::MAX)
        };
        assert!(position("player") < position("name_change_record"));
        assert!(position("entry") < position("submission"));
        assert!(position("entry") < position("item"));
        assert!(position("collection") < position("item"));
        assert!(position("item") < position("collection_item"));
        assert!(position("collection") < position("player_collection_progress"));
    }

    #[test]
    fn embedded_index_statements_are_idempotent() {
        let builder = SchemaQueryBuilder::new(Dialect::Embedded);
        let sql = builder.create_index("idx_entry_type", "entry", &["entry_type"]);
        assert_eq!(
            sql,
            "CREATE INDEX IF NOT EXISTS idx_entry_type ON entry (entry_type)"
        );
    }

    #[test]
    fn duplicate_index_detection() {
        let error = StoreError::Fatal {
            op: "schema.create_index",
            message: String::from("1061 (42000): Duplicate key name 'idx_entry_type'"),
        };
        assert!(is_duplicate_index(&error));
        let other = StoreError::Fatal {
            op: "schema.create_index",
            message: String::from("syntax error"),
        };
        assert!(!is_duplicate_index(&other));
    }
}
