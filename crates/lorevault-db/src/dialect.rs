//! Dialect-specific SQL fragments.
//!
//! [`Dialect`] is defined in [`crate::config`]; this module gives it the
//! rendering hooks the builders need. Together with the builders and the
//! provider these are the only places allowed to branch on dialect --
//! every other component works with the identical builder interface.

pub use crate::config::Dialect;

impl Dialect {
    /// Column definition for a generated `BIGINT`-range primary key.
    ///
    /// The embedded store requires the exact phrase
    /// `INTEGER PRIMARY KEY AUTOINCREMENT` (its rowid alias); the server
    /// dialect uses `AUTO_INCREMENT`.
    pub const fn auto_increment_primary_key(self) -> &'static str {
        match self {
            Self::Embedded => "INTEGER PRIMARY KEY AUTOINCREMENT",
            Self::Server => "BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY",
        }
    }

    /// Column type for a boolean flag.
    ///
    /// The embedded store has no boolean type and stores 0/1 integers;
    /// the server dialect uses `TINYINT(1)`. Bound parameters encode
    /// booleans as integers so both representations read back the same.
    pub const fn boolean_type(self) -> &'static str {
        match self {
            Self::Embedded => "INTEGER",
            Self::Server => "TINYINT(1)",
        }
    }

    /// Render the insert-or-update-on-conflict clause appended to an
    /// INSERT statement.
    ///
    /// `conflict_columns` name the unique key that triggers the update;
    /// `update_columns` are overwritten from the attempted insert values.
    /// Neither dialect's form adds bound parameters, so the parameter
    /// list of the surrounding INSERT is unchanged.
    pub fn upsert_clause(self, conflict_columns: &[&str], update_columns: &[&str]) -> String {
        match self {
            Self::Embedded => {
                let assignments: Vec<String> = update_columns
                    .iter()
                    .map(|c| format!("{c} = excluded.{c}"))
                    .collect();
                format!(
                    "ON CONFLICT({}) DO UPDATE SET {}",
                    conflict_columns.join(", "),
                    assignments.join(", ")
                )
            }
            Self::Server => {
                // The conflict target is implicit: any unique key.
                let assignments: Vec<String> = update_columns
                    .iter()
                    .map(|c| format!("{c} = VALUES({c})"))
                    .collect();
                format!("ON DUPLICATE KEY UPDATE {}", assignments.join(", "))
            }
        }
    }

    /// Catalog query probing for a table's existence.
    ///
    /// Takes one positional parameter: the table name. Returns a row iff
    /// the table exists in the current database.
    pub const fn table_exists_sql(self) -> &'static str {
        match self {
            Self::Embedded => {
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?"
            }
            Self::Server => {
                "SELECT table_name FROM information_schema.tables \
                 WHERE table_schema = DATABASE() AND table_name = ?"
            }
        }
    }

    /// Whether `CREATE INDEX` supports `IF NOT EXISTS` in this dialect.
    ///
    /// The server dialect does not; schema setup compensates by treating
    /// a duplicate-index error as success.
    pub const fn index_if_not_exists(self) -> bool {
        matches!(self, Self::Embedded)
    }
}
