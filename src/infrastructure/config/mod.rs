//! Runtime configuration.
//!
//! Layered with figment: built-in defaults, then `tabula.toml` in the working
//! directory, then `TABULA_*` environment variables (a `.env` file is loaded
//! into the environment by the binary before extraction).

use std::path::PathBuf;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::domain::error::{AppError, Result};

pub const CONFIG_FILE: &str = "tabula.toml";
pub const ENV_PREFIX: &str = "TABULA_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding the per-store SQLite files
    pub storage_dir: PathBuf,
    /// Store used when a call does not name one
    pub default_store: String,
    /// Row cap appended to queries without a LIMIT
    pub default_limit: u32,
    /// Pool size per store
    pub max_connections: u32,
    pub host: String,
    pub port: u16,
    /// Fallback tracing filter when RUST_LOG is unset
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_dir: std::env::temp_dir().join("tabula"),
            default_store: "default".to_string(),
            default_limit: 100,
            max_connections: 1,
            host: "127.0.0.1".to_string(),
            port: 3001,
            log_filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn load() -> Result<Self> {
        Self::from_figment(Self::figment())
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: AppConfig = figment
            .extract()
            .map_err(|e| AppError::ValidationError(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.default_store.trim().is_empty() {
            return Err(AppError::ValidationError(
                "default_store must not be empty".to_string(),
            ));
        }
        if self.max_connections == 0 {
            return Err(AppError::ValidationError(
                "max_connections must be at least 1".to_string(),
            ));
        }
        if self.default_limit == 0 {
            return Err(AppError::ValidationError(
                "default_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
