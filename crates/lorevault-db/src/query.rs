//! Fluent, dialect-neutral builder for parameterized DML statements.
//!
//! Call sites chain builder methods and never see SQL dialect
//! differences; [`QueryBuilder::build`] renders the statement text and
//! [`QueryBuilder::into_parameters`] yields the bound values in the
//! exact order their placeholders appear. Both supported dialects use
//! positional `?` placeholders, so ordering is the whole contract.
//!
//! Parameters are attached to the fragment that introduces them (a VALUES
//! tuple, a SET assignment, a WHERE condition) and reassembled in render
//! order, so the caller's method-call order can never desynchronize
//! placeholders from values.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::dialect::Dialect;

/// A positional bound value.
///
/// The closed set of scalar shapes the wire supports. Timestamps travel
/// as epoch milliseconds and booleans as 0/1 integers so both dialects
/// store and read identical representations.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL.
    Null,
    /// 64-bit integer (also carries booleans and epoch-millis timestamps).
    Int(i64),
    /// Double-precision float.
    Float(f64),
    /// UTF-8 text.
    Text(String),
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<Uuid> for SqlValue {
    fn from(v: Uuid) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Int(v.timestamp_millis())
    }
}

impl<T: Into<Self>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Statement verb selected by the first builder call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verb {
    Select,
    Insert,
    Update,
    Delete,
}

/// Fluent builder producing one parameterized statement.
///
/// Construct via [`QueryBuilder::new`] with the active dialect, chain
/// clause methods, then hand the builder to the executor. A builder
/// describes exactly one statement; clauses that do not apply to the
/// chosen verb are ignored at render time.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    dialect: Dialect,
    verb: Verb,
    table: String,
    projection: Vec<String>,
    joins: Vec<String>,
    columns: Vec<String>,
    values: Vec<SqlValue>,
    sets: Vec<(String, SqlValue)>,
    wheres: Vec<(String, Vec<SqlValue>)>,
    order_by: Vec<String>,
    limit: Option<u64>,
    upsert: Option<String>,
}

impl QueryBuilder {
    fn start(dialect: Dialect, verb: Verb, table: &str) -> Self {
        Self {
            dialect,
            verb,
            table: table.to_owned(),
            projection: Vec::new(),
            joins: Vec::new(),
            columns: Vec::new(),
            values: Vec::new(),
            sets: Vec::new(),
            wheres: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            upsert: None,
        }
    }

    /// Begin a SELECT from `table`.
    pub fn select(dialect: Dialect, table: &str) -> Self {
        Self::start(dialect, Verb::Select, table)
    }

    /// Begin an INSERT into `table`.
    pub fn insert_into(dialect: Dialect, table: &str) -> Self {
        Self::start(dialect, Verb::Insert, table)
    }

    /// Begin an UPDATE of `table`.
    pub fn update(dialect: Dialect, table: &str) -> Self {
        Self::start(dialect, Verb::Update, table)
    }

    /// Begin a DELETE from `table`.
    pub fn delete_from(dialect: Dialect, table: &str) -> Self {
        Self::start(dialect, Verb::Delete, table)
    }

    /// Project the given columns (SELECT only). Defaults to `*`.
    #[must_use]
    pub fn columns(mut self, columns: &[&str]) -> Self {
        match self.verb {
            Verb::Select => {
                self.projection = columns.iter().map(|c| (*c).to_owned()).collect();
            }
            _ => {
                self.columns = columns.iter().map(|c| (*c).to_owned()).collect();
            }
        }
        self
    }

    /// Append one VALUES tuple entry (INSERT only). Call once per column,
    /// in the same order as [`Self::columns`].
    #[must_use]
    pub fn value(mut self, value: impl Into<SqlValue>) -> Self {
        self.values.push(value.into());
        self
    }

    /// Append a SET assignment (UPDATE only).
    #[must_use]
    pub fn set(mut self, column: &str, value: impl Into<SqlValue>) -> Self {
        self.sets.push((column.to_owned(), value.into()));
        self
    }

    /// AND a condition containing exactly one `?` placeholder.
    #[must_use]
    pub fn and_where(mut self, condition: &str, value: impl Into<SqlValue>) -> Self {
        self.wheres.push((condition.to_owned(), vec![value.into()]));
        self
    }

    /// AND a condition with an arbitrary number of `?` placeholders.
    #[must_use]
    pub fn and_where_with(mut self, condition: &str, values: Vec<SqlValue>) -> Self {
        self.wheres.push((condition.to_owned(), values));
        self
    }

    /// AND a condition that binds nothing (e.g. `approver_id IS NULL`).
    #[must_use]
    pub fn and_where_raw(mut self, condition: &str) -> Self {
        self.wheres.push((condition.to_owned(), Vec::new()));
        self
    }

    /// Append a raw JOIN clause (SELECT only).
    #[must_use]
    pub fn join(mut self, clause: &str) -> Self {
        self.joins.push(clause.to_owned());
        self
    }

    /// Append an ORDER BY term such as `"created_at DESC"`.
    #[must_use]
    pub fn order_by(mut self, term: &str) -> Self {
        self.order_by.push(term.to_owned());
        self
    }

    /// Cap the number of returned rows (SELECT only).
    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Turn this INSERT into an atomic insert-or-update.
    ///
    /// On a conflict against the unique key formed by `conflict_columns`,
    /// the columns in `update_columns` are overwritten from the attempted
    /// insert. This is the race-safe alternative to read-then-write for
    /// keyed counters such as collection progress.
    #[must_use]
    pub fn on_conflict_update(
        mut self,
        conflict_columns: &[&str],
        update_columns: &[&str],
    ) -> Self {
        self.upsert = Some(self.dialect.upsert_clause(conflict_columns, update_columns));
        self
    }

    /// Render the statement text.
    pub fn build(&self) -> String {
        match self.verb {
            Verb::Select => self.build_select(),
            Verb::Insert => self.build_insert(),
            Verb::Update => self.build_update(),
            Verb::Delete => self.build_delete(),
        }
    }

    /// Consume the builder, yielding bound values in placeholder order.
    ///
    /// Render order is VALUES tuple, then SET assignments, then WHERE
    /// conditions -- matching [`Self::build`] exactly.
    pub fn into_parameters(self) -> Vec<SqlValue> {
        let mut params = self.values;
        params.extend(self.sets.into_iter().map(|(_, v)| v));
        for (_, values) in self.wheres {
            params.extend(values);
        }
        params
    }

    fn build_select(&self) -> String {
        let projection = if self.projection.is_empty() {
            String::from("*")
        } else {
            self.projection.join(", ")
        };
        let mut sql = format!("SELECT {projection} FROM {}", self.table);
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }
        self.push_where(&mut sql);
        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(", "));
        }
        if let Some(limit) = self.limit {
            sql.push_str(" LIMIT ");
            sql.push_str(&limit.to_string());
        }
        sql
    }

    fn build_insert(&self) -> String {
        let placeholders: Vec<&str> = self.values.iter().map(|_| "?").collect();
        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            self.columns.join(", "),
            placeholders.join(", ")
        );
        if let Some(upsert) = &self.upsert {
            sql.push(' ');
            sql.push_str(upsert);
        }
        sql
    }

    fn build_update(&self) -> String {
        let assignments: Vec<String> = self.sets.iter().map(|(c, _)| format!("{c} = ?")).collect();
        let mut sql = format!("UPDATE {} SET {}", self.table, assignments.join(", "));
        self.push_where(&mut sql);
        sql
    }

    fn build_delete(&self) -> String {
        let mut sql = format!("DELETE FROM {}", self.table);
        self.push_where(&mut sql);
        sql
    }

    fn push_where(&self, sql: &mut String) {
        if self.wheres.is_empty() {
            return;
        }
        let conditions: Vec<&str> = self.wheres.iter().map(|(c, _)| c.as_str()).collect();
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
}
