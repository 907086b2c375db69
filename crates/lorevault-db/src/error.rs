//! Error types for the persistence layer.
//!
//! Every failure crossing the crate boundary is a [`StoreError`]; raw
//! [`sqlx`] errors never escape. The [`classify`] function is the single
//! place a driver error is inspected and sorted into the taxonomy, so the
//! executor's retry loop and every caller agree on what is retryable.

use sqlx::error::ErrorKind;

/// Errors that can occur in the persistence layer.
///
/// Each variant carries the name of the operation that failed so callers
/// can log meaningfully without re-deriving context.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store is unreachable or the connection is invalid.
    #[error("connection failure during {op}: {message}")]
    Connection {
        /// Operation that was being performed.
        op: &'static str,
        /// Driver-level detail.
        message: String,
    },

    /// A required table is missing or a statement referenced an unknown
    /// object.
    #[error("schema error during {op}: {message}")]
    Schema {
        /// Operation that was being performed.
        op: &'static str,
        /// Driver-level detail.
        message: String,
    },

    /// A unique, foreign-key, not-null, or check constraint was violated.
    #[error("constraint violation during {op}: {message}")]
    Constraint {
        /// Operation that was being performed.
        op: &'static str,
        /// Driver-level detail.
        message: String,
    },

    /// The caller supplied malformed input; nothing was executed.
    #[error("invalid input for {op}: {message}")]
    Validation {
        /// Operation that was rejected.
        op: &'static str,
        /// What was wrong with the input.
        message: String,
    },

    /// A retryable failure (pool timeout, dropped connection, busy
    /// store). The executor retries these with bounded linear backoff
    /// before surfacing them.
    #[error("transient failure during {op}: {message}")]
    Transient {
        /// Operation that was being performed.
        op: &'static str,
        /// Driver-level detail.
        message: String,
    },

    /// An internal invariant was broken (e.g. an approve touched a row
    /// count other than one). The enclosing transaction is rolled back.
    #[error("fatal inconsistency during {op}: {message}")]
    Fatal {
        /// Operation that detected the inconsistency.
        op: &'static str,
        /// Description of the broken invariant.
        message: String,
    },

    /// A fetched row could not be mapped to its typed record.
    #[error("row decode failure on column {column}: {message}")]
    RowDecode {
        /// Column that failed to decode.
        column: String,
        /// Decode detail.
        message: String,
    },

    /// The resolved settings are unusable (bad path, bad URL parts).
    #[error("configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Whether the executor may retry the failed operation.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// Sort a raw driver error into the [`StoreError`] taxonomy.
///
/// Pool exhaustion, I/O drops, deadlocks, lock waits, and a busy embedded
/// store are transient. Constraint violations keep their own variant so
/// callers can distinguish "duplicate" from "broken". A statement naming
/// a missing table is a schema error. Anything else from the database is
/// a fatal internal error: the builders produced that SQL, so a malformed
/// statement is a bug in this crate, not in the caller.
pub fn classify(op: &'static str, error: sqlx::Error) -> StoreError {
    match error {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::WorkerCrashed => {
            StoreError::Transient {
                op,
                message: error.to_string(),
            }
        }
        sqlx::Error::Io(e) => StoreError::Transient {
            op,
            message: e.to_string(),
        },
        sqlx::Error::Database(db) => classify_database(op, &*db),
        sqlx::Error::ColumnDecode { index, source } => StoreError::RowDecode {
            column: index,
            message: source.to_string(),
        },
        sqlx::Error::Decode(e) => StoreError::RowDecode {
            column: String::from("<unknown>"),
            message: e.to_string(),
        },
        sqlx::Error::Configuration(e) => StoreError::Config(e.to_string()),
        other => StoreError::Connection {
            op,
            message: other.to_string(),
        },
    }
}

/// Classify an error reported by the database itself.
fn classify_database(op: &'static str, db: &dyn sqlx::error::DatabaseError) -> StoreError {
    match db.kind() {
        ErrorKind::UniqueViolation
        | ErrorKind::ForeignKeyViolation
        | ErrorKind::NotNullViolation
        | ErrorKind::CheckViolation => {
            return StoreError::Constraint {
                op,
                message: db.message().to_owned(),
            };
        }
        _ => {}
    }

    let message = db.message().to_owned();
    let code = db.code().map(|c| c.into_owned()).unwrap_or_default();

    // MySQL: 1205 lock wait timeout, 1213 deadlock, 2006/2013 lost
    // connection. SQLite: SQLITE_BUSY / SQLITE_LOCKED surface as
    // "database is locked".
    let transient_code = matches!(code.as_str(), "1205" | "1213" | "2006" | "2013");
    if transient_code || message.contains("database is locked") {
        return StoreError::Transient { op, message };
    }

    // MySQL 1146 "table doesn't exist", SQLite "no such table".
    if code == "1146" || message.contains("no such table") {
        return StoreError::Schema { op, message };
    }

    StoreError::Fatal { op, message }
}
