//! Read-only SQL over a store.
//!
//! Two layers keep ad-hoc queries from mutating data:
//! - a prefix gate: the statement must start with SELECT or WITH
//! - execution on a connection with `PRAGMA query_only = ON`, so writes
//!   hidden behind a CTE or a second statement fail inside SQLite
//!
//! Queries without a LIMIT get one appended.

use std::sync::Arc;

use sqlx::pool::PoolConnection;
use sqlx::{Column as _, Executor, Sqlite, SqlitePool, Statement};
use tracing::{info, warn};

use crate::domain::error::{AppError, Result};
use crate::domain::tabular::Value;
use crate::domain::tool_results::{QueryOutcome, Record};
use crate::infrastructure::db::table_io::{column_names, decode_value};
use crate::infrastructure::db::StoreRegistry;

/// Statement prefixes accepted by the gate
const READ_PREFIXES: [&str; 2] = ["SELECT", "WITH"];

/// Rows returned by a read-only query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Rows as ordered JSON objects
    pub fn to_records(&self) -> Vec<Record> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().map(Value::to_json))
                    .collect()
            })
            .collect()
    }
}

/// Reject anything that does not start with SELECT or WITH (case-insensitive)
pub fn check_read_prefix(query: &str) -> Result<()> {
    let upper = query.trim().to_uppercase();
    if READ_PREFIXES.iter().any(|prefix| upper.starts_with(prefix)) {
        Ok(())
    } else {
        Err(AppError::UnsafeQuery(
            "only SELECT and WITH queries are allowed".to_string(),
        ))
    }
}

/// Append ` LIMIT n` unless the text already mentions LIMIT anywhere
pub fn apply_row_limit(query: &str, limit: u32) -> String {
    let trimmed = query.trim().trim_end_matches(';').trim_end();
    if trimmed.to_uppercase().contains("LIMIT") {
        trimmed.to_string()
    } else {
        format!("{} LIMIT {}", trimmed, limit)
    }
}

/// A pooled connection in `query_only` mode.
///
/// Unless the mode was switched back, the connection is closed on drop
/// instead of returning to the pool. This covers callers whose future is
/// dropped mid-query.
struct ReadOnlyConnection {
    conn: PoolConnection<Sqlite>,
    restored: bool,
}

impl ReadOnlyConnection {
    async fn enter(pool: &SqlitePool) -> Result<Self> {
        let conn = pool
            .acquire()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to acquire connection: {}", e)))?;
        let mut guard = Self {
            conn,
            restored: false,
        };

        sqlx::query("PRAGMA query_only = ON")
            .execute(&mut *guard.conn)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to enter read-only mode: {}", e)))?;
        Ok(guard)
    }

    async fn leave(mut self) {
        match sqlx::query("PRAGMA query_only = OFF")
            .execute(&mut *self.conn)
            .await
        {
            Ok(_) => self.restored = true,
            Err(e) => warn!(error = %e, "Failed to leave read-only mode, closing connection"),
        }
    }
}

impl Drop for ReadOnlyConnection {
    fn drop(&mut self) {
        if !self.restored {
            self.conn.close_on_drop();
        }
    }
}

/// Run `sql` on a pooled connection switched to query-only mode
pub async fn fetch_read_only(pool: &SqlitePool, sql: &str) -> Result<ResultSet> {
    let mut guard = ReadOnlyConnection::enter(pool).await?;
    let outcome = fetch_rows(&mut guard.conn, sql).await;
    guard.leave().await;
    outcome
}

async fn fetch_rows(conn: &mut PoolConnection<Sqlite>, sql: &str) -> Result<ResultSet> {
    let rows = sqlx::query(sql)
        .fetch_all(&mut **conn)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Query execution failed: {}", e)))?;

    let columns = match rows.first() {
        Some(first) => column_names(first),
        // no rows to read names from; ask the prepared statement
        None => (&mut **conn)
            .prepare(sql)
            .await
            .map(|statement| {
                statement
                    .columns()
                    .iter()
                    .map(|c| c.name().to_string())
                    .collect()
            })
            .unwrap_or_default(),
    };

    let rows = rows
        .iter()
        .map(|row| {
            (0..columns.len())
                .map(|i| decode_value(row, i))
                .collect::<Result<Vec<Value>>>()
        })
        .collect::<Result<Vec<Vec<Value>>>>()?;

    Ok(ResultSet { columns, rows })
}

/// Gated, limited query execution against named stores
pub struct QueryGateway {
    registry: Arc<StoreRegistry>,
    default_limit: u32,
}

impl QueryGateway {
    pub fn new(registry: Arc<StoreRegistry>, default_limit: u32) -> Self {
        Self {
            registry,
            default_limit,
        }
    }

    pub async fn execute(
        &self,
        query: &str,
        store_name: &str,
        limit: Option<u32>,
    ) -> Result<QueryOutcome> {
        let store = self.registry.get(store_name).await?;
        check_read_prefix(query)?;

        let executed = apply_row_limit(query, limit.unwrap_or(self.default_limit));
        let result = fetch_read_only(store.pool(), &executed).await?;

        info!(
            store = store_name,
            rows = result.row_count(),
            "Executed query"
        );

        Ok(QueryOutcome {
            store: store_name.to_string(),
            row_count: result.row_count(),
            data: result.to_records(),
            columns: result.columns,
            query: executed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tabular::{Column, ScalarKind, TabularData};
    use crate::infrastructure::db::table_io::{replace_table, row_count};
    use crate::infrastructure::db::StoreRegistryConfig;

    #[test]
    fn test_prefix_gate() {
        assert!(check_read_prefix("  select * from t").is_ok());
        assert!(check_read_prefix("With x AS (SELECT 1) SELECT * FROM x").is_ok());
        assert!(matches!(
            check_read_prefix("DROP TABLE t"),
            Err(AppError::UnsafeQuery(_))
        ));
        assert!(matches!(
            check_read_prefix("INSERT INTO t VALUES (1)"),
            Err(AppError::UnsafeQuery(_))
        ));
    }

    #[test]
    fn test_row_limit() {
        assert_eq!(apply_row_limit("SELECT * FROM t;", 5), "SELECT * FROM t LIMIT 5");
        assert_eq!(
            apply_row_limit("select * from t limit 2", 5),
            "select * from t limit 2"
        );
    }

    async fn seeded() -> (tempfile::TempDir, QueryGateway, Arc<StoreRegistry>) {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(StoreRegistry::new(StoreRegistryConfig::new(dir.path())));
        let store = registry.get_or_create("default").await.unwrap();
        let data = TabularData::new(vec![Column::new(
            "n",
            ScalarKind::Integer,
            (1..=10).map(Value::Integer).collect(),
        )])
        .unwrap();
        replace_table(store.pool(), "numbers", &data).await.unwrap();
        let gateway = QueryGateway::new(registry.clone(), 100);
        (dir, gateway, registry)
    }

    #[tokio::test]
    async fn test_execute_applies_limit() {
        let (_dir, gateway, _) = seeded().await;

        let outcome = gateway
            .execute("SELECT * FROM numbers", "default", Some(5))
            .await
            .unwrap();
        assert_eq!(outcome.row_count, 5);
        assert_eq!(outcome.query, "SELECT * FROM numbers LIMIT 5");

        let outcome = gateway
            .execute("SELECT * FROM numbers LIMIT 2", "default", Some(5))
            .await
            .unwrap();
        assert_eq!(outcome.row_count, 2);
    }

    #[tokio::test]
    async fn test_empty_result_keeps_columns() {
        let (_dir, gateway, _) = seeded().await;
        let outcome = gateway
            .execute("SELECT n AS value FROM numbers WHERE n > 100", "default", None)
            .await
            .unwrap();
        assert_eq!(outcome.row_count, 0);
        assert_eq!(outcome.columns, vec!["value"]);
    }

    #[tokio::test]
    async fn test_cte_wrapped_delete_refused() {
        let (_dir, gateway, registry) = seeded().await;

        // carries its own LIMIT so nothing is appended
        let result = gateway
            .execute(
                "WITH doomed AS (SELECT n FROM numbers LIMIT 3) DELETE FROM numbers WHERE n IN (SELECT n FROM doomed)",
                "default",
                None,
            )
            .await;
        assert!(matches!(result, Err(AppError::DatabaseError(_))));

        let store = registry.get("default").await.unwrap();
        assert_eq!(row_count(store.pool(), "numbers").await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_second_statement_cannot_write() {
        let (_dir, _gateway, registry) = seeded().await;
        let store = registry.get("default").await.unwrap();

        let result = fetch_read_only(store.pool(), "SELECT 1; DELETE FROM numbers").await;
        assert!(result.is_err());
        assert_eq!(row_count(store.pool(), "numbers").await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_connection_writable_after_query() {
        let (_dir, gateway, registry) = seeded().await;
        gateway
            .execute("SELECT 1", "default", None)
            .await
            .unwrap();

        let store = registry.get("default").await.unwrap();
        sqlx::query("DELETE FROM numbers WHERE n = 1")
            .execute(store.pool())
            .await
            .unwrap();
        assert_eq!(row_count(store.pool(), "numbers").await.unwrap(), 9);
    }

    #[tokio::test]
    async fn test_abandoned_read_only_connection_not_reused() {
        let (_dir, _gateway, registry) = seeded().await;
        let store = registry.get("default").await.unwrap();

        // dropped without leaving read-only mode, as a cancelled query would be
        let guard = ReadOnlyConnection::enter(store.pool()).await.unwrap();
        drop(guard);

        sqlx::query("DELETE FROM numbers WHERE n = 1")
            .execute(store.pool())
            .await
            .unwrap();
        assert_eq!(row_count(store.pool(), "numbers").await.unwrap(), 9);
    }

    #[tokio::test]
    async fn test_cancelled_query_leaves_pool_writable() {
        let (_dir, _gateway, registry) = seeded().await;
        let store = registry.get("default").await.unwrap();

        let mut query = Box::pin(fetch_read_only(
            store.pool(),
            "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c) SELECT x FROM c",
        ));
        let cancelled =
            tokio::time::timeout(std::time::Duration::from_millis(50), &mut query).await;
        assert!(cancelled.is_err());
        drop(query);

        sqlx::query("DELETE FROM numbers WHERE n = 2")
            .execute(store.pool())
            .await
            .unwrap();
        assert_eq!(row_count(store.pool(), "numbers").await.unwrap(), 9);
    }

    #[tokio::test]
    async fn test_unknown_store() {
        let (_dir, gateway, _) = seeded().await;
        let err = gateway
            .execute("SELECT 1", "ghost_store", None)
            .await
            .unwrap_err();
        assert_eq!(err, AppError::UnknownStore("ghost_store".to_string()));
    }
}
