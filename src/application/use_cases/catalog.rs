//! Table listing and description.
//!
//! Both read the SQLite catalog directly; the per-store bookkeeping set is
//! never consulted here.

use std::sync::Arc;

use indexmap::IndexMap;
use sqlx::Row;

use crate::application::use_cases::query_gateway::fetch_read_only;
use crate::domain::error::{AppError, Result};
use crate::domain::tabular::ScalarKind;
use crate::domain::tool_results::{ColumnDescription, NumericRange, TableDescription, TableList};
use crate::infrastructure::db::table_io::{
    catalog_tables, decode_value, ensure_table, quote_ident, row_count, table_columns,
};
use crate::infrastructure::db::StoreRegistry;

/// Rows included in a table description
pub const SAMPLE_ROWS: usize = 5;

pub struct CatalogService {
    registry: Arc<StoreRegistry>,
}

impl CatalogService {
    pub fn new(registry: Arc<StoreRegistry>) -> Self {
        Self { registry }
    }

    pub async fn list_tables(&self, store_name: &str) -> Result<TableList> {
        let store = self.registry.get(store_name).await?;
        let mut conn = store
            .pool()
            .acquire()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to acquire connection: {}", e)))?;

        Ok(TableList {
            store: store_name.to_string(),
            tables: catalog_tables(&mut conn).await?,
        })
    }

    pub async fn describe_table(&self, table: &str, store_name: &str) -> Result<TableDescription> {
        let store = self.registry.get(store_name).await?;
        let pool = store.pool();
        ensure_table(pool, table).await?;

        let schema = table_columns(pool, table).await?;
        let quoted = quote_ident(table);

        let sample = fetch_read_only(
            pool,
            &format!("SELECT * FROM {} LIMIT {}", quoted, SAMPLE_ROWS),
        )
        .await?;

        let mut numeric_statistics = IndexMap::new();
        for (name, declared) in &schema {
            if !ScalarKind::from_sql_type(declared).is_numeric() {
                continue;
            }
            let column = quote_ident(name);
            let row = sqlx::query(&format!(
                "SELECT MIN({c}), MAX({c}), AVG({c}) FROM {t}",
                c = column,
                t = quoted
            ))
            .fetch_one(pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to summarise column '{}': {}", name, e))
            })?;

            let avg: Option<f64> = row.try_get(2)?;
            numeric_statistics.insert(
                name.clone(),
                NumericRange {
                    min: decode_value(&row, 0)?.to_json(),
                    max: decode_value(&row, 1)?.to_json(),
                    avg: avg.map(round2),
                },
            );
        }

        Ok(TableDescription {
            store: store_name.to_string(),
            table: table.to_string(),
            row_count: row_count(pool, table).await?,
            columns: schema
                .into_iter()
                .map(|(name, declared_type)| ColumnDescription {
                    name,
                    declared_type,
                })
                .collect(),
            sample_data: sample.to_records(),
            numeric_statistics,
        })
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tabular::{Column, TabularData, Value};
    use crate::infrastructure::db::table_io::replace_table;
    use crate::infrastructure::db::StoreRegistryConfig;

    async fn catalog_with_sales() -> (tempfile::TempDir, CatalogService) {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(StoreRegistry::new(StoreRegistryConfig::new(dir.path())));
        let store = registry.get_or_create("default").await.unwrap();
        let data = TabularData::new(vec![
            Column::new(
                "qty",
                ScalarKind::Integer,
                (1..=7).map(Value::Integer).collect(),
            ),
            Column::new(
                "price",
                ScalarKind::Float,
                vec![
                    Value::Float(1.0),
                    Value::Float(2.0),
                    Value::Null,
                    Value::Float(2.0),
                    Value::Null,
                    Value::Null,
                    Value::Null,
                ],
            ),
            Column::new(
                "note",
                ScalarKind::Text,
                (0..7).map(|i| Value::Text(format!("n{}", i))).collect(),
            ),
        ])
        .unwrap();
        replace_table(store.pool(), "sales", &data).await.unwrap();
        replace_table(store.pool(), "archive", &data).await.unwrap();
        (dir, CatalogService::new(registry))
    }

    #[tokio::test]
    async fn test_list_tables_ordered() {
        let (_dir, catalog) = catalog_with_sales().await;
        let list = catalog.list_tables("default").await.unwrap();
        assert_eq!(list.tables, vec!["archive", "sales"]);
    }

    #[tokio::test]
    async fn test_describe_table() {
        let (_dir, catalog) = catalog_with_sales().await;
        let description = catalog.describe_table("sales", "default").await.unwrap();

        assert_eq!(description.row_count, 7);
        assert_eq!(description.sample_data.len(), SAMPLE_ROWS);
        assert_eq!(description.columns[2].declared_type, "TEXT");
        assert!(!description.numeric_statistics.contains_key("note"));

        let qty = &description.numeric_statistics["qty"];
        assert_eq!(qty.min, serde_json::json!(1));
        assert_eq!(qty.max, serde_json::json!(7));
        assert_eq!(qty.avg, Some(4.0));

        let price = &description.numeric_statistics["price"];
        assert_eq!(price.avg, Some(1.67));
    }

    #[tokio::test]
    async fn test_describe_unknown_table() {
        let (_dir, catalog) = catalog_with_sales().await;
        let err = catalog.describe_table("ghost", "default").await.unwrap_err();
        assert_eq!(err, AppError::UnknownTable("ghost".to_string()));
    }
}
