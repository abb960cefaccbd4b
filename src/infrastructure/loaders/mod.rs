// ============================================================
// FORMAT LOADERS
// ============================================================
// Extension dispatch from a file on disk to in-memory tabular data

pub mod delimited;
pub mod encoding;
pub mod inference;
pub mod json;
pub mod parquet;
pub mod spreadsheet;

use std::path::Path;

use tracing::info;

use crate::domain::error::{AppError, Result};
use crate::domain::tabular::TabularData;

pub use delimited::DelimitedParser;

/// File formats recognised by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Tsv,
    Spreadsheet,
    Json,
    Parquet,
}

impl FileFormat {
    /// Case-insensitive lookup by extension (without the dot)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(FileFormat::Csv),
            "tsv" => Some(FileFormat::Tsv),
            "xlsx" | "xls" => Some(FileFormat::Spreadsheet),
            "json" => Some(FileFormat::Json),
            "parquet" => Some(FileFormat::Parquet),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        Self::from_extension(ext)
            .ok_or_else(|| AppError::UnsupportedFormat(format!(".{}", ext.to_ascii_lowercase())))
    }
}

/// Caller overrides for a load
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Worksheet name for spreadsheets
    pub sheet: Option<String>,
    /// Encoding label for delimited text; detected when absent
    pub encoding: Option<String>,
}

/// Load a file into memory, dispatching on its extension
pub fn load_file(path: &Path, options: &LoadOptions) -> Result<TabularData> {
    if !path.exists() {
        return Err(AppError::FileNotFound(path.display().to_string()));
    }

    let format = FileFormat::from_path(path)?;
    let table = match format {
        FileFormat::Csv => DelimitedParser::new()
            .with_encoding(options.encoding.as_deref())
            .parse_file(path)?,
        FileFormat::Tsv => DelimitedParser::tab_separated()
            .with_encoding(options.encoding.as_deref())
            .parse_file(path)?,
        FileFormat::Spreadsheet => spreadsheet::load_workbook(path, options.sheet.as_deref())?,
        FileFormat::Json => json::load_json(path)?,
        FileFormat::Parquet => parquet::load_parquet(path)?,
    };

    info!(
        path = %path.display(),
        format = ?format,
        rows = table.row_count(),
        columns = table.column_count(),
        "Loaded file"
    );

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_extension_dispatch_is_case_insensitive() {
        assert_eq!(FileFormat::from_extension("CSV"), Some(FileFormat::Csv));
        assert_eq!(FileFormat::from_extension("Xls"), Some(FileFormat::Spreadsheet));
        assert_eq!(FileFormat::from_extension("txt"), None);
    }

    #[test]
    fn test_missing_file_checked_first() {
        let err = load_file(Path::new("/nope/data.unknown"), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, AppError::FileNotFound(_)));
    }

    #[test]
    fn test_unsupported_extension_named() {
        let file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        let err = load_file(file.path(), &LoadOptions::default()).unwrap_err();
        assert_eq!(err, AppError::UnsupportedFormat(".txt".to_string()));
    }

    #[test]
    fn test_load_uppercase_csv() {
        let mut file = tempfile::Builder::new().suffix(".CSV").tempfile().unwrap();
        file.write_all(b"a,b\n1,x\n2,y\n").unwrap();
        let table = load_file(file.path(), &LoadOptions::default()).unwrap();
        assert_eq!(table.row_count(), 2);
    }
}
