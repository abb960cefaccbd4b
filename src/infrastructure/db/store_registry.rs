//! Named, ephemeral SQLite stores.
//!
//! Each store is a fresh database file created on first use and kept open
//! for the lifetime of the registry. The registry is an explicit object
//! handed to the services; there is no process-wide store table.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::error::{AppError, Result};

/// Prefix of every store file name
pub const STORE_FILE_PREFIX: &str = "data_analysis_";

/// Settings for new stores
#[derive(Debug, Clone)]
pub struct StoreRegistryConfig {
    /// Directory the store files are created in
    pub storage_dir: PathBuf,
    /// Maximum connections per store pool
    pub max_connections: u32,
}

impl StoreRegistryConfig {
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            max_connections: 1,
        }
    }
}

/// One open store
#[derive(Debug)]
pub struct Store {
    name: String,
    path: PathBuf,
    pool: SqlitePool,
    /// Tables this process has written. The SQLite catalog stays authoritative.
    tables: Mutex<BTreeSet<String>>,
}

impl Store {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn register_table(&self, table: &str) {
        self.tables.lock().await.insert(table.to_string());
    }

    pub async fn forget_tables(&self) {
        self.tables.lock().await.clear();
    }

    pub async fn known_tables(&self) -> Vec<String> {
        self.tables.lock().await.iter().cloned().collect()
    }
}

/// Registry of stores keyed by name
pub struct StoreRegistry {
    stores: Arc<RwLock<HashMap<String, Arc<Store>>>>,
    config: StoreRegistryConfig,
}

impl StoreRegistry {
    pub fn new(config: StoreRegistryConfig) -> Self {
        Self {
            stores: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    pub fn storage_dir(&self) -> &Path {
        &self.config.storage_dir
    }

    /// Return the named store, creating its database file on first use
    pub async fn get_or_create(&self, name: &str) -> Result<Arc<Store>> {
        {
            let stores = self.stores.read().await;
            if let Some(store) = stores.get(name) {
                return Ok(store.clone());
            }
        }

        let mut stores = self.stores.write().await;
        // another caller may have created it between the two locks
        if let Some(store) = stores.get(name) {
            return Ok(store.clone());
        }

        let store = Arc::new(self.open_store(name).await?);
        stores.insert(name.to_string(), store.clone());
        Ok(store)
    }

    /// Return an existing store
    pub async fn get(&self, name: &str) -> Result<Arc<Store>> {
        let stores = self.stores.read().await;
        stores
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::UnknownStore(name.to_string()))
    }

    pub async fn store_names(&self) -> Vec<String> {
        let stores = self.stores.read().await;
        let mut names: Vec<String> = stores.keys().cloned().collect();
        names.sort();
        names
    }

    /// Close every pool; the registry is empty afterwards
    pub async fn close_all(&self) {
        let mut stores = self.stores.write().await;
        for (name, store) in stores.drain() {
            info!(store = %name, "Closing store pool");
            store.pool.close().await;
        }
    }

    async fn open_store(&self, name: &str) -> Result<Store> {
        if name.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Store name must not be empty".to_string(),
            ));
        }

        std::fs::create_dir_all(&self.config.storage_dir).map_err(|e| {
            AppError::IoError(format!(
                "Failed to create storage directory {}: {}",
                self.config.storage_dir.display(),
                e
            ))
        })?;

        let path = self.config.storage_dir.join(store_file_name(name));
        if path.exists() {
            warn!(path = %path.display(), "Store file already exists, reusing it");
        }

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(self.config.max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to open store '{}': {}", name, e))
            })?;

        info!(store = %name, path = %path.display(), "Created store");

        Ok(Store {
            name: name.to_string(),
            path,
            pool,
            tables: Mutex::new(BTreeSet::new()),
        })
    }
}

/// `data_analysis_<name>_<8 hex>.db`, with path-unsafe characters replaced
fn store_file_name(name: &str) -> String {
    let safe: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}{}_{}.db", STORE_FILE_PREFIX, safe, &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_file_name_shape() {
        let name = store_file_name("sales/2024");
        assert!(name.starts_with("data_analysis_sales_2024_"));
        assert!(name.ends_with(".db"));
        assert_eq!(name.len(), "data_analysis_sales_2024_".len() + 8 + 3);
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let registry = StoreRegistry::new(StoreRegistryConfig::new(dir.path()));

        let first = registry.get_or_create("default").await.unwrap();
        let second = registry.get_or_create("default").await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(first.path().exists());
        assert_eq!(registry.store_names().await, vec!["default"]);
    }

    #[tokio::test]
    async fn test_unknown_store() {
        let dir = tempfile::tempdir().unwrap();
        let registry = StoreRegistry::new(StoreRegistryConfig::new(dir.path()));

        let err = registry.get("ghost_store").await.unwrap_err();
        assert_eq!(err, AppError::UnknownStore("ghost_store".to_string()));
    }

    #[tokio::test]
    async fn test_bookkeeping_set() {
        let dir = tempfile::tempdir().unwrap();
        let registry = StoreRegistry::new(StoreRegistryConfig::new(dir.path()));
        let store = registry.get_or_create("s").await.unwrap();

        store.register_table("b").await;
        store.register_table("a").await;
        assert_eq!(store.known_tables().await, vec!["a", "b"]);

        store.forget_tables().await;
        assert!(store.known_tables().await.is_empty());
        registry.close_all().await;
        assert!(registry.store_names().await.is_empty());
    }
}
