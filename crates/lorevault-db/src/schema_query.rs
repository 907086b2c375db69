//! Dialect-specific DDL builder.
//!
//! Used only during schema setup. [`SchemaQueryBuilder`] hands out
//! [`TableBuilder`]s that render `CREATE TABLE IF NOT EXISTS` statements
//! and index statements in the active dialect; the logical schema the
//! setup module describes stays dialect-free.

use crate::dialect::Dialect;

/// Logical column types rendered per dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Generated 64-bit primary key (dialect-specific phrasing).
    AutoPrimaryKey,
    /// 64-bit integer (row references, epoch-millis timestamps).
    BigInt,
    /// 32-bit integer (version counters, sequence numbers).
    Integer,
    /// Double-precision float.
    Double,
    /// 0/1 flag (dialect-specific column type).
    Boolean,
    /// Unbounded text (content bodies, descriptions, JSON blobs).
    Text,
    /// Bounded text; required for indexed or unique string columns on
    /// the server dialect, harmless on the embedded one.
    VarChar(u16),
}

/// Entry point for DDL rendering.
#[derive(Debug, Clone, Copy)]
pub struct SchemaQueryBuilder {
    dialect: Dialect,
}

impl SchemaQueryBuilder {
    /// Create a builder for the active dialect.
    pub const fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// Begin a `CREATE TABLE IF NOT EXISTS` statement.
    pub fn create_table(&self, name: &str) -> TableBuilder {
        TableBuilder {
            dialect: self.dialect,
            name: name.to_owned(),
            columns: Vec::new(),
            constraints: Vec::new(),
        }
    }

    /// Render a `CREATE INDEX` statement over the given columns.
    ///
    /// The embedded dialect supports `IF NOT EXISTS`; the server dialect
    /// does not, so its statement is not idempotent on its own -- schema
    /// setup treats a duplicate-index error as success.
    pub fn create_index(&self, index_name: &str, table: &str, columns: &[&str]) -> String {
        let if_not_exists = if self.dialect.index_if_not_exists() {
            "IF NOT EXISTS "
        } else {
            ""
        };
        format!(
            "CREATE INDEX {if_not_exists}{index_name} ON {table} ({})",
            columns.join(", ")
        )
    }

    /// The dialect's autoincrement primary-key phrasing.
    ///
    /// Escape hatch for callers that assemble DDL outside
    /// [`TableBuilder`]; schema setup itself goes through
    /// [`ColumnType::AutoPrimaryKey`].
    pub const fn auto_increment_syntax(&self) -> &'static str {
        self.dialect.auto_increment_primary_key()
    }

    /// Catalog query probing for a table's existence
    /// (one positional parameter: the table name).
    pub const fn table_exists_query(&self) -> &'static str {
        self.dialect.table_exists_sql()
    }
}

/// Builder for one `CREATE TABLE` statement.
#[derive(Debug, Clone)]
pub struct TableBuilder {
    dialect: Dialect,
    name: String,
    columns: Vec<String>,
    constraints: Vec<String>,
}

impl TableBuilder {
    /// Append a column definition. `constraints` is a raw suffix such as
    /// `"NOT NULL"` or `"NOT NULL DEFAULT 0"`; pass `""` for a plain
    /// nullable column.
    #[must_use]
    pub fn column(mut self, name: &str, column_type: ColumnType, constraints: &str) -> Self {
        let rendered_type = match column_type {
            ColumnType::AutoPrimaryKey => self.dialect.auto_increment_primary_key().to_owned(),
            ColumnType::BigInt => String::from("BIGINT"),
            ColumnType::Integer => String::from("INTEGER"),
            ColumnType::Double => String::from("DOUBLE"),
            ColumnType::Boolean => self.dialect.boolean_type().to_owned(),
            ColumnType::Text => String::from("TEXT"),
            ColumnType::VarChar(len) => format!("VARCHAR({len})"),
        };
        let definition = if constraints.is_empty() {
            format!("{name} {rendered_type}")
        } else {
            format!("{name} {rendered_type} {constraints}")
        };
        self.columns.push(definition);
        self
    }

    /// Declare a composite primary key over the given columns.
    ///
    /// Not used together with [`ColumnType::AutoPrimaryKey`], which
    /// already carries its own key declaration.
    #[must_use]
    pub fn primary_key(mut self, columns: &[&str]) -> Self {
        self.constraints
            .push(format!("PRIMARY KEY ({})", columns.join(", ")));
        self
    }

    /// Declare a foreign key from `column` to `referenced_table(referenced_column)`.
    #[must_use]
    pub fn foreign_key(
        mut self,
        column: &str,
        referenced_table: &str,
        referenced_column: &str,
    ) -> Self {
        self.constraints.push(format!(
            "FOREIGN KEY ({column}) REFERENCES {referenced_table}({referenced_column})"
        ));
        self
    }

    /// Declare a unique constraint over the given columns.
    #[must_use]
    pub fn unique(mut self, columns: &[&str]) -> Self {
        self.constraints
            .push(format!("UNIQUE ({})", columns.join(", ")));
        self
    }

    /// Render the `CREATE TABLE IF NOT EXISTS` statement.
    pub fn build(self) -> String {
        let mut parts = self.columns;
        parts.extend(self.constraints);
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.name,
            parts.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_table_with_autoincrement() {
        let sql = SchemaQueryBuilder::new(Dialect::Embedded)
            .create_table("entry")
            .column("id", ColumnType::AutoPrimaryKey, "")
            .column("name", ColumnType::VarChar(255), "NOT NULL")
            .build();
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS entry \
             (id INTEGER PRIMARY KEY AUTOINCREMENT, name VARCHAR(255) NOT NULL)"
        );
    }

    #[test]
    fn server_table_with_autoincrement() {
        let sql = SchemaQueryBuilder::new(Dialect::Server)
            .create_table("entry")
            .column("id", ColumnType::AutoPrimaryKey, "")
            .column("is_current", ColumnType::Boolean, "NOT NULL DEFAULT 0")
            .build();
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS entry \
             (id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY, \
             is_current TINYINT(1) NOT NULL DEFAULT 0)"
        );
    }

    #[test]
    fn composite_primary_key_and_foreign_key() {
        let sql = SchemaQueryBuilder::new(Dialect::Embedded)
            .create_table("collection_item")
            .column("collection_id", ColumnType::BigInt, "NOT NULL")
            .column("item_id", ColumnType::BigInt, "NOT NULL")
            .column("sequence_number", ColumnType::Integer, "NOT NULL")
            .primary_key(&["collection_id", "item_id"])
            .foreign_key("collection_id", "collection", "id")
            .foreign_key("item_id", "item", "id")
            .build();
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS collection_item \
             (collection_id BIGINT NOT NULL, item_id BIGINT NOT NULL, \
             sequence_number INTEGER NOT NULL, \
             PRIMARY KEY (collection_id, item_id), \
             FOREIGN KEY (collection_id) REFERENCES collection(id), \
             FOREIGN KEY (item_id) REFERENCES item(id))"
        );
    }

    #[test]
    fn unique_constraint() {
        let sql = SchemaQueryBuilder::new(Dialect::Server)
            .create_table("submission")
            .column("entry_id", ColumnType::BigInt, "NOT NULL")
            .column("content_version", ColumnType::Integer, "NOT NULL")
            .unique(&["entry_id", "content_version"])
            .build();
        assert!(sql.contains("UNIQUE (entry_id, content_version)"));
    }

    #[test]
    fn index_if_not_exists_is_dialect_specific() {
        let embedded = SchemaQueryBuilder::new(Dialect::Embedded)
            .create_index("idx_entry_type", "entry", &["entry_type"]);
        assert_eq!(
            embedded,
            "CREATE INDEX IF NOT EXISTS idx_entry_type ON entry (entry_type)"
        );
        let server = SchemaQueryBuilder::new(Dialect::Server)
            .create_index("idx_entry_type", "entry", &["entry_type"]);
        assert_eq!(server, "CREATE INDEX idx_entry_type ON entry (entry_type)");
    }
}
