use std::sync::Arc;

use tracing::info;

use crate::domain::error::{AppError, Result};
use crate::domain::tool_results::ClearOutcome;
use crate::infrastructure::db::table_io::{catalog_tables, quote_ident};
use crate::infrastructure::db::StoreRegistry;

/// Empties stores
pub struct MaintenanceService {
    registry: Arc<StoreRegistry>,
}

impl MaintenanceService {
    pub fn new(registry: Arc<StoreRegistry>) -> Self {
        Self { registry }
    }

    /// Drop every table the catalog lists, in one transaction
    pub async fn clear(&self, store_name: &str) -> Result<ClearOutcome> {
        let store = self.registry.get(store_name).await?;

        let mut tx = store
            .pool()
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to begin transaction: {}", e)))?;

        let tables = catalog_tables(&mut tx).await?;
        for table in &tables {
            sqlx::query(&format!("DROP TABLE IF EXISTS {}", quote_ident(table)))
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(format!("Failed to drop table '{}': {}", table, e))
                })?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to commit: {}", e)))?;
        store.forget_tables().await;

        info!(store = store_name, dropped = tables.len(), "Cleared store");

        Ok(ClearOutcome {
            message: format!("Dropped {} tables from store '{}'", tables.len(), store_name),
            store: store_name.to_string(),
            deleted_tables: tables,
        })
    }
}
