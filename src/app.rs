use std::io;
use std::sync::{Arc, Mutex};

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::application::toolkit::Toolkit;
use crate::infrastructure::config::AppConfig;
use crate::interfaces::http::{add_log, start_server};

/// Load configuration, start the HTTP tool server and run until it stops
pub async fn run() -> io::Result<()> {
    let _ = dotenvy::dotenv();

    let config = AppConfig::load()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let toolkit = Arc::new(Toolkit::new(&config));
    let logs = Arc::new(Mutex::new(Vec::new()));
    add_log(
        &logs,
        "INFO",
        "App",
        &format!("Storage directory: {}", config.storage_dir.display()),
    );

    info!(
        host = %config.host,
        port = config.port,
        storage_dir = %config.storage_dir.display(),
        "Starting tool server"
    );

    let server = start_server(toolkit.clone(), logs, &config.host, config.port).map_err(|e| {
        error!(error = %e, "Failed to bind tool server");
        e
    })?;
    let outcome = server.await;

    toolkit.shutdown().await;
    info!("Tool server stopped");
    outcome
}
