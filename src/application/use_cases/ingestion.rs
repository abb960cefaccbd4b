use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::info;

use crate::domain::error::{AppError, Result};
use crate::domain::tool_results::{ImportOutcome, ImportStatistics};
use crate::infrastructure::db::table_io::replace_table;
use crate::infrastructure::db::StoreRegistry;
use crate::infrastructure::loaders::{load_file, LoadOptions};

/// Parameters of one import
#[derive(Debug, Clone, Deserialize)]
pub struct ImportRequest {
    pub file_path: PathBuf,
    #[serde(default)]
    pub table_name: Option<String>,
    #[serde(default)]
    pub store_name: Option<String>,
    #[serde(default)]
    pub sheet_name: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
}

impl ImportRequest {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            table_name: None,
            store_name: None,
            sheet_name: None,
            encoding: None,
        }
    }

    pub fn table(mut self, name: impl Into<String>) -> Self {
        self.table_name = Some(name.into());
        self
    }

    pub fn store(mut self, name: impl Into<String>) -> Self {
        self.store_name = Some(name.into());
        self
    }

    pub fn sheet(mut self, name: impl Into<String>) -> Self {
        self.sheet_name = Some(name.into());
        self
    }

    pub fn encoding(mut self, label: impl Into<String>) -> Self {
        self.encoding = Some(label.into());
        self
    }
}

/// Table name derived from a file stem: spaces and hyphens become underscores
pub fn table_name_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().replace([' ', '-'], "_"))
        .unwrap_or_default()
}

/// Loads files and replaces the matching table in a store
pub struct IngestionService {
    registry: Arc<StoreRegistry>,
    default_store: String,
}

impl IngestionService {
    pub fn new(registry: Arc<StoreRegistry>, default_store: impl Into<String>) -> Self {
        Self {
            registry,
            default_store: default_store.into(),
        }
    }

    pub async fn import(&self, request: ImportRequest) -> Result<ImportOutcome> {
        let path = request.file_path.clone();
        if !path.exists() {
            return Err(AppError::FileNotFound(path.display().to_string()));
        }

        let table = match request.table_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => table_name_from_path(&path),
        };
        if table.is_empty() {
            return Err(AppError::ValidationError(format!(
                "Cannot derive a table name from {}",
                path.display()
            )));
        }
        let store_name = request
            .store_name
            .clone()
            .unwrap_or_else(|| self.default_store.clone());

        let options = LoadOptions {
            sheet: request.sheet_name.clone(),
            encoding: request.encoding.clone(),
        };
        let load_path = path.clone();
        let data = tokio::task::spawn_blocking(move || load_file(&load_path, &options))
            .await
            .map_err(|e| AppError::Internal(format!("Loader task failed: {}", e)))??;

        let store = self.registry.get_or_create(&store_name).await?;
        replace_table(store.pool(), &table, &data).await?;
        store.register_table(&table).await;

        let column_types: IndexMap<_, _> = data
            .columns()
            .iter()
            .map(|c| (c.name.clone(), c.kind))
            .collect();

        info!(
            store = %store_name,
            table = %table,
            rows = data.row_count(),
            columns = data.column_count(),
            "Imported file"
        );

        Ok(ImportOutcome {
            message: format!(
                "Imported {} rows from {} into table '{}'",
                data.row_count(),
                path.display(),
                table
            ),
            store: store_name,
            table,
            statistics: ImportStatistics {
                rows: data.row_count(),
                columns: data.column_count(),
                column_names: data.column_names(),
                column_types,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tabular::ScalarKind;
    use crate::infrastructure::db::table_io::row_count;
    use crate::infrastructure::db::StoreRegistryConfig;

    fn service(dir: &Path) -> (IngestionService, Arc<StoreRegistry>) {
        let registry = Arc::new(StoreRegistry::new(StoreRegistryConfig::new(dir.join("stores"))));
        (IngestionService::new(registry.clone(), "default"), registry)
    }

    #[test]
    fn test_table_name_from_path() {
        assert_eq!(
            table_name_from_path(Path::new("/data/Q1 sales-report.csv")),
            "Q1_sales_report"
        );
    }

    #[tokio::test]
    async fn test_import_csv_and_reimport_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("monthly sales.csv");
        std::fs::write(&file, "region,amount\nnorth,10\nsouth,12.5\n").unwrap();
        let (service, registry) = service(dir.path());

        let outcome = service.import(ImportRequest::new(&file)).await.unwrap();
        assert_eq!(outcome.table, "monthly_sales");
        assert_eq!(outcome.store, "default");
        assert_eq!(outcome.statistics.rows, 2);
        assert_eq!(outcome.statistics.column_types["amount"], ScalarKind::Float);

        service.import(ImportRequest::new(&file)).await.unwrap();
        let store = registry.get("default").await.unwrap();
        assert_eq!(row_count(store.pool(), "monthly_sales").await.unwrap(), 2);
        assert_eq!(store.known_tables().await, vec!["monthly_sales"]);
    }

    #[tokio::test]
    async fn test_missing_file_creates_no_store() {
        let dir = tempfile::tempdir().unwrap();
        let (service, registry) = service(dir.path());

        let err = service
            .import(ImportRequest::new(dir.path().join("absent.csv")).store("s"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::FileNotFound(_)));
        assert!(registry.get("s").await.is_err());
    }

    #[tokio::test]
    async fn test_explicit_table_and_store() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("x.json");
        std::fs::write(&file, r#"[{"a": 1}, {"a": 2}]"#).unwrap();
        let (service, _) = service(dir.path());

        let outcome = service
            .import(ImportRequest::new(&file).table("events").store("lab"))
            .await
            .unwrap();
        assert_eq!(outcome.table, "events");
        assert_eq!(outcome.store, "lab");
    }
}
