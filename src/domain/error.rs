use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppError {
    FileNotFound(String),
    UnsupportedFormat(String),
    EncodingUndetermined(String),
    UnknownStore(String),
    UnknownTable(String),
    UnsafeQuery(String),
    UnsupportedExportFormat(String),
    ValidationError(String),
    ParseError(String),
    DatabaseError(String),
    IoError(String),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::FileNotFound(path) => write!(f, "File not found: {}", path),
            AppError::UnsupportedFormat(ext) => write!(f, "Unsupported file format: {}", ext),
            AppError::EncodingUndetermined(msg) => {
                write!(f, "Unable to determine file encoding: {}", msg)
            }
            AppError::UnknownStore(name) => write!(f, "Store '{}' does not exist", name),
            AppError::UnknownTable(name) => write!(f, "Table '{}' does not exist", name),
            AppError::UnsafeQuery(msg) => write!(f, "Unsafe query: {}", msg),
            AppError::UnsupportedExportFormat(format) => {
                write!(f, "Unsupported export format: {}", format)
            }
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AppError::IoError(msg) => write!(f, "IO error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
