//! Asynchronous query execution with bounded retry.
//!
//! [`QueryExecutor`] runs built queries against the provider's pool,
//! binds parameters positionally, maps rows through [`FromStoreRow`],
//! and retries transient failures (pool timeout, dropped connection,
//! busy store) with linear backoff before surfacing a terminal error.
//! Non-transient failures -- constraint violations, malformed SQL --
//! surface immediately.
//!
//! Connections are pool-managed, so every exit path (success, mapping
//! failure, SQL error) releases the connection when the handle drops.
//! [`QueryExecutor::execute_transaction`] commits on success, rolls back
//! and rethrows on any error, and hands the connection back with
//! auto-commit restored; statements inside a transaction are not
//! individually retried -- a transient failure mid-transaction fails the
//! whole transaction so the caller decides whether to rerun it.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use sqlx::any::AnyArguments;
use sqlx::query::Query;
use sqlx::{Any, AnyConnection, AnyPool};

use crate::error::{classify, StoreError};
use crate::provider::StoreProvider;
use crate::query::{QueryBuilder, SqlValue};
use crate::rows::FromStoreRow;

/// Maximum attempts for a transiently failing statement.
const MAX_ATTEMPTS: u32 = 3;

/// Linear backoff step between attempts (step, 2x step, ...).
const RETRY_BACKOFF: Duration = Duration::from_millis(200);

/// Bind a parameter list to a query in positional order.
fn bind_params<'q>(
    mut query: Query<'q, Any, AnyArguments<'q>>,
    params: &'q [SqlValue],
) -> Query<'q, Any, AnyArguments<'q>> {
    for value in params {
        query = match value {
            SqlValue::Null => query.bind(Option::<String>::None),
            SqlValue::Int(v) => query.bind(*v),
            SqlValue::Float(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.as_str()),
        };
    }
    query
}

/// Whether the error is retryable and attempts remain.
async fn backoff_or_give_up(
    op: &'static str,
    attempt: u32,
    error: &StoreError,
) -> bool {
    if !error.is_transient() || attempt >= MAX_ATTEMPTS {
        return false;
    }
    tracing::warn!(op, attempt, error = %error, "Transient store failure, retrying");
    tokio::time::sleep(RETRY_BACKOFF.saturating_mul(attempt)).await;
    true
}

/// Executes built queries against the provider's connection pool.
#[derive(Clone)]
pub struct QueryExecutor {
    provider: Arc<StoreProvider>,
}

impl QueryExecutor {
    /// Create an executor bound to a provider.
    pub const fn new(provider: Arc<StoreProvider>) -> Self {
        Self { provider }
    }

    async fn pool(&self) -> AnyPool {
        self.provider.pool().await
    }

    /// Run a SELECT expected to return at most one row.
    pub async fn fetch_optional<R: FromStoreRow>(
        &self,
        op: &'static str,
        query: QueryBuilder,
    ) -> Result<Option<R>, StoreError> {
        let sql = query.build();
        let params = query.into_parameters();
        let mut attempt: u32 = 1;
        loop {
            let pool = self.pool().await;
            match bind_params(sqlx::query(&sql), &params)
                .fetch_optional(&pool)
                .await
            {
                Ok(row) => {
                    return row.as_ref().map(R::from_store_row).transpose();
                }
                Err(e) => {
                    let error = classify(op, e);
                    if !backoff_or_give_up(op, attempt, &error).await {
                        return Err(error);
                    }
                    attempt = attempt.saturating_add(1);
                }
            }
        }
    }

    /// Run a SELECT returning all matching rows.
    pub async fn fetch_all<R: FromStoreRow>(
        &self,
        op: &'static str,
        query: QueryBuilder,
    ) -> Result<Vec<R>, StoreError> {
        let sql = query.build();
        let params = query.into_parameters();
        let mut attempt: u32 = 1;
        loop {
            let pool = self.pool().await;
            match bind_params(sqlx::query(&sql), &params).fetch_all(&pool).await {
                Ok(rows) => {
                    return rows.iter().map(R::from_store_row).collect();
                }
                Err(e) => {
                    let error = classify(op, e);
                    if !backoff_or_give_up(op, attempt, &error).await {
                        return Err(error);
                    }
                    attempt = attempt.saturating_add(1);
                }
            }
        }
    }

    /// Run an UPDATE or DELETE, returning the number of affected rows.
    pub async fn execute_update(
        &self,
        op: &'static str,
        query: QueryBuilder,
    ) -> Result<u64, StoreError> {
        let sql = query.build();
        let params = query.into_parameters();
        self.execute_with_retry(op, &sql, &params)
            .await
            .map(|r| r.rows_affected())
    }

    /// Run an INSERT, returning the generated row id.
    pub async fn execute_insert(
        &self,
        op: &'static str,
        query: QueryBuilder,
    ) -> Result<i64, StoreError> {
        let sql = query.build();
        let params = query.into_parameters();
        let result = self.execute_with_retry(op, &sql, &params).await?;
        result.last_insert_id().ok_or_else(|| StoreError::Fatal {
            op,
            message: String::from("insert reported no generated id"),
        })
    }

    /// Run a raw parameterless DDL statement (schema setup only).
    pub(crate) async fn execute_ddl(&self, op: &'static str, sql: &str) -> Result<(), StoreError> {
        self.execute_with_retry(op, sql, &[]).await.map(|_| ())
    }

    /// Run a raw parameterized SELECT returning at most one row
    /// (catalog probes during schema validation).
    pub(crate) async fn fetch_optional_raw<R: FromStoreRow>(
        &self,
        op: &'static str,
        sql: &str,
        params: Vec<SqlValue>,
    ) -> Result<Option<R>, StoreError> {
        let pool = self.pool().await;
        let row = bind_params(sqlx::query(sql), &params)
            .fetch_optional(&pool)
            .await
            .map_err(|e| classify(op, e))?;
        row.as_ref().map(R::from_store_row).transpose()
    }

    async fn execute_with_retry(
        &self,
        op: &'static str,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<sqlx::any::AnyQueryResult, StoreError> {
        let mut attempt: u32 = 1;
        loop {
            let pool = self.pool().await;
            match bind_params(sqlx::query(sql), params).execute(&pool).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    let error = classify(op, e);
                    if !backoff_or_give_up(op, attempt, &error).await {
                        return Err(error);
                    }
                    attempt = attempt.saturating_add(1);
                }
            }
        }
    }

    /// Run `work` inside one transaction.
    ///
    /// The closure receives the transaction's connection; every
    /// statement it issues joins the same transaction. Commit happens
    /// only if the closure returns `Ok`; any error rolls the
    /// transaction back and is rethrown unchanged. Auto-commit is
    /// restored before the connection returns to the pool on every
    /// path (the driver rolls back on drop if commit was not reached).
    pub async fn execute_transaction<T, F>(
        &self,
        op: &'static str,
        work: F,
    ) -> Result<T, StoreError>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut AnyConnection) -> BoxFuture<'c, Result<T, StoreError>> + Send,
    {
        let pool = self.pool().await;
        let mut tx = pool.begin().await.map_err(|e| classify(op, e))?;
        match work(&mut *tx).await {
            Ok(value) => {
                tx.commit().await.map_err(|e| classify(op, e))?;
                tracing::debug!(op, "Transaction committed");
                Ok(value)
            }
            Err(error) => {
                if let Err(rollback_error) = tx.rollback().await {
                    tracing::warn!(
                        op,
                        error = %rollback_error,
                        "Rollback failed after transaction error"
                    );
                }
                Err(error)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Connection-scoped execution (inside a transaction)
// ---------------------------------------------------------------------------

/// Run a SELECT on a specific connection, expecting at most one row.
pub(crate) async fn fetch_optional_on<R: FromStoreRow>(
    conn: &mut AnyConnection,
    op: &'static str,
    query: QueryBuilder,
) -> Result<Option<R>, StoreError> {
    let sql = query.build();
    let params = query.into_parameters();
    let row = bind_params(sqlx::query(&sql), &params)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| classify(op, e))?;
    row.as_ref().map(R::from_store_row).transpose()
}

/// Run an UPDATE or DELETE on a specific connection.
pub(crate) async fn execute_update_on(
    conn: &mut AnyConnection,
    op: &'static str,
    query: QueryBuilder,
) -> Result<u64, StoreError> {
    let sql = query.build();
    let params = query.into_parameters();
    let result = bind_params(sqlx::query(&sql), &params)
        .execute(&mut *conn)
        .await
        .map_err(|e| classify(op, e))?;
    Ok(result.rows_affected())
}

/// Run an INSERT on a specific connection, returning the generated id.
pub(crate) async fn execute_insert_on(
    conn: &mut AnyConnection,
    op: &'static str,
    query: QueryBuilder,
) -> Result<i64, StoreError> {
    let sql = query.build();
    let params = query.into_parameters();
    let result = bind_params(sqlx::query(&sql), &params)
        .execute(&mut *conn)
        .await
        .map_err(|e| classify(op, e))?;
    result.last_insert_id().ok_or_else(|| StoreError::Fatal {
        op,
        message: String::from("insert reported no generated id"),
    })
}
