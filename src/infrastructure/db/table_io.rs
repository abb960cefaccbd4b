// ============================================================
// TABLE I/O
// ============================================================
// Persisting TabularData into a store and reading rows back out

use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Column as _, Row, Sqlite, SqliteConnection, SqlitePool, TypeInfo, ValueRef};
use tracing::debug;

use crate::domain::error::{AppError, Result};
use crate::domain::tabular::{Column, ScalarKind, TabularData, Value, TEMPORAL_FORMAT};
use crate::domain::tool_results::Record;
use crate::infrastructure::loaders::inference::parse_temporal;

/// Quote an identifier for SQLite, doubling embedded quotes
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Replace `table` with the given data inside one transaction
pub async fn replace_table(pool: &SqlitePool, table: &str, data: &TabularData) -> Result<()> {
    if data.column_count() == 0 {
        return Err(AppError::ValidationError(format!(
            "Cannot create table '{}' without columns",
            table
        )));
    }

    let quoted = quote_ident(table);
    let column_defs: Vec<String> = data
        .columns()
        .iter()
        .map(|c| format!("{} {}", quote_ident(&c.name), c.kind.sql_type()))
        .collect();
    let placeholders = vec!["?"; data.column_count()].join(", ");
    let insert_sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quoted,
        data.columns()
            .iter()
            .map(|c| quote_ident(&c.name))
            .collect::<Vec<_>>()
            .join(", "),
        placeholders
    );

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to begin transaction: {}", e)))?;

    sqlx::query(&format!("DROP TABLE IF EXISTS {}", quoted))
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to drop table '{}': {}", table, e)))?;

    sqlx::query(&format!("CREATE TABLE {} ({})", quoted, column_defs.join(", ")))
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(format!("Failed to create table '{}': {}", table, e))
        })?;

    for (index, row) in data.rows().enumerate() {
        let mut query = sqlx::query(&insert_sql);
        for value in row {
            query = bind_value(query, value);
        }
        query.execute(&mut *tx).await.map_err(|e| {
            AppError::DatabaseError(format!("Failed to insert row {}: {}", index + 1, e))
        })?;
    }

    tx.commit()
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to commit table '{}': {}", table, e)))?;

    debug!(table, rows = data.row_count(), "Replaced table");
    Ok(())
}

fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &Value,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Null => query.bind(Option::<String>::None),
        Value::Integer(v) => query.bind(*v),
        Value::Float(v) if v.is_nan() => query.bind(Option::<f64>::None),
        Value::Float(v) => query.bind(*v),
        Value::Text(v) => query.bind(v.clone()),
        Value::Boolean(v) => query.bind(*v),
        Value::Temporal(v) => query.bind(v.format(TEMPORAL_FORMAT).to_string()),
    }
}

/// User tables in the catalog, ordered by name
pub async fn catalog_tables(conn: &mut SqliteConnection) -> Result<Vec<String>> {
    sqlx::query_scalar::<_, String>(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(conn)
    .await
    .map_err(|e| AppError::DatabaseError(format!("Failed to list tables: {}", e)))
}

pub async fn table_exists(pool: &SqlitePool, table: &str) -> Result<bool> {
    let found: Option<i64> =
        sqlx::query_scalar("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(table)
            .fetch_optional(pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to look up table: {}", e)))?;
    Ok(found.is_some())
}

/// Fail with `UnknownTable` unless the catalog lists `table`
pub async fn ensure_table(pool: &SqlitePool, table: &str) -> Result<()> {
    if table_exists(pool, table).await? {
        Ok(())
    } else {
        Err(AppError::UnknownTable(table.to_string()))
    }
}

/// `(name, declared type)` for each column, in table order
pub async fn table_columns(pool: &SqlitePool, table: &str) -> Result<Vec<(String, String)>> {
    let rows = sqlx::query(&format!("PRAGMA table_info({})", quote_ident(table)))
        .fetch_all(pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to read table schema: {}", e)))?;

    rows.iter()
        .map(|row| -> Result<(String, String)> {
            let name: String = row.try_get("name")?;
            let declared: String = row.try_get("type")?;
            Ok((name, declared))
        })
        .collect()
}

pub async fn row_count(pool: &SqlitePool, table: &str) -> Result<i64> {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", quote_ident(table)))
        .fetch_one(pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to count rows: {}", e)))
}

/// Read a whole table back, restoring kinds from the declared column types
pub async fn load_table(pool: &SqlitePool, table: &str) -> Result<TabularData> {
    let schema = table_columns(pool, table).await?;
    let rows = sqlx::query(&format!("SELECT * FROM {}", quote_ident(table)))
        .fetch_all(pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to read table '{}': {}", table, e)))?;

    let mut columns = Vec::with_capacity(schema.len());
    for (index, (name, declared)) in schema.into_iter().enumerate() {
        let kind = ScalarKind::from_sql_type(&declared);
        let values = rows
            .iter()
            .map(|row| decode_typed(row, index, kind))
            .collect::<Result<Vec<_>>>()?;
        // all-missing columns are persisted as TEXT
        let kind = if !values.is_empty() && values.iter().all(Value::is_null) {
            ScalarKind::Null
        } else {
            kind
        };
        columns.push(Column::new(name, kind, values));
    }

    TabularData::new(columns)
}

/// Decode a cell by its runtime storage class
pub fn decode_value(row: &SqliteRow, index: usize) -> Result<Value> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let storage = raw.type_info().name().to_string();

    let value = match storage.as_str() {
        "INTEGER" => Value::Integer(row.try_get::<i64, _>(index)?),
        "REAL" => Value::Float(row.try_get::<f64, _>(index)?),
        "BLOB" => {
            let bytes: Vec<u8> = row.try_get(index)?;
            Value::Text(String::from_utf8_lossy(&bytes).into_owned())
        }
        _ => Value::Text(row.try_get::<String, _>(index)?),
    };
    Ok(value)
}

/// Decode a cell and coerce it to the column's declared kind
fn decode_typed(row: &SqliteRow, index: usize, kind: ScalarKind) -> Result<Value> {
    let value = decode_value(row, index)?;
    Ok(match (kind, value) {
        (ScalarKind::Boolean, Value::Integer(v)) => Value::Boolean(v != 0),
        (ScalarKind::Float, Value::Integer(v)) => Value::Float(v as f64),
        (ScalarKind::Temporal, Value::Text(text)) => match parse_temporal(&text) {
            Some(dt) => Value::Temporal(dt),
            None => Value::Text(text),
        },
        (_, value) => value,
    })
}

pub fn column_names(row: &SqliteRow) -> Vec<String> {
    row.columns().iter().map(|c| c.name().to_string()).collect()
}

/// One row as an ordered JSON object
pub fn row_to_record(row: &SqliteRow) -> Result<Record> {
    let mut record = Record::new();
    for (index, column) in row.columns().iter().enumerate() {
        record.insert(column.name().to_string(), decode_value(row, index)?.to_json());
    }
    Ok(record)
}
