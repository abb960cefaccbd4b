use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use rust_xlsxwriter::{Workbook, XlsxError};
use tracing::info;

use crate::application::use_cases::query_gateway::{fetch_read_only, ResultSet};
use crate::domain::error::{AppError, Result};
use crate::domain::tabular::Value;
use crate::domain::tool_results::ExportOutcome;
use crate::infrastructure::db::StoreRegistry;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Excel,
    Json,
}

impl ExportFormat {
    pub fn label(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Excel => "excel",
            ExportFormat::Json => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "excel" => Ok(ExportFormat::Excel),
            "json" => Ok(ExportFormat::Json),
            _ => Err(AppError::UnsupportedExportFormat(s.to_string())),
        }
    }
}

/// Writes query results to files
pub struct ExportService {
    registry: Arc<StoreRegistry>,
}

impl ExportService {
    pub fn new(registry: Arc<StoreRegistry>) -> Self {
        Self { registry }
    }

    /// Run `query` without a row cap and write the result to `output_path`.
    ///
    /// The format is checked before anything touches the store or the disk.
    pub async fn export(
        &self,
        query: &str,
        output_path: &Path,
        store_name: &str,
        format: &str,
    ) -> Result<ExportOutcome> {
        let format: ExportFormat = format.parse()?;
        let store = self.registry.get(store_name).await?;

        let result = fetch_read_only(store.pool(), query).await?;
        let row_count = result.row_count();

        let path: PathBuf = output_path.to_path_buf();
        let target = path.clone();
        tokio::task::spawn_blocking(move || write_result(&result, &target, format))
            .await
            .map_err(|e| AppError::Internal(format!("Export task failed: {}", e)))??;

        info!(
            store = store_name,
            path = %path.display(),
            format = format.label(),
            rows = row_count,
            "Exported query result"
        );

        Ok(ExportOutcome {
            message: format!("Exported {} rows to {}", row_count, path.display()),
            output_path: path.display().to_string(),
            format: format.label().to_string(),
            row_count,
        })
    }
}

/// Write a result set in the given format, creating parent directories
pub fn write_result(result: &ResultSet, path: &Path, format: ExportFormat) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            AppError::IoError(format!("Failed to create {}: {}", parent.display(), e))
        })?;
    }

    match format {
        ExportFormat::Csv => write_csv(result, path),
        ExportFormat::Excel => write_excel(result, path),
        ExportFormat::Json => write_json(result, path),
    }
}

fn create_file(path: &Path) -> Result<BufWriter<File>> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| AppError::IoError(format!("Failed to create {}: {}", path.display(), e)))
}

fn write_csv(result: &ResultSet, path: &Path) -> Result<()> {
    let mut file = create_file(path)?;
    file.write_all(UTF8_BOM)?;

    let mut writer = csv::Writer::from_writer(file);
    let csv_err = |e: csv::Error| AppError::IoError(format!("Failed to write CSV: {}", e));

    writer.write_record(&result.columns).map_err(csv_err)?;
    for row in &result.rows {
        writer
            .write_record(row.iter().map(|v| v.to_string()))
            .map_err(csv_err)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_excel(result: &ResultSet, path: &Path) -> Result<()> {
    let xlsx_err = |e: XlsxError| AppError::IoError(format!("Failed to write workbook: {}", e));

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (col, name) in result.columns.iter().enumerate() {
        sheet.write_string(0, col as u16, name).map_err(xlsx_err)?;
    }

    for (index, row) in result.rows.iter().enumerate() {
        let r = index as u32 + 1;
        for (c, value) in row.iter().enumerate() {
            let c = c as u16;
            let written = match value {
                Value::Null => continue,
                Value::Integer(v) => sheet.write_number(r, c, *v as f64),
                Value::Float(v) => sheet.write_number(r, c, *v),
                Value::Boolean(v) => sheet.write_boolean(r, c, *v),
                Value::Text(_) | Value::Temporal(_) => sheet.write_string(r, c, value.to_string()),
            };
            written.map_err(xlsx_err)?;
        }
    }

    workbook.save(path).map_err(xlsx_err)?;
    Ok(())
}

fn write_json(result: &ResultSet, path: &Path) -> Result<()> {
    let mut file = create_file(path)?;
    serde_json::to_writer_pretty(&mut file, &result.to_records())
        .map_err(|e| AppError::IoError(format!("Failed to write JSON: {}", e)))?;
    file.flush()?;
    Ok(())
}
