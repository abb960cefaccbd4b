//! Payloads returned by the tool operations and the status envelope around them.

use crate::domain::error::Result;
use crate::domain::report::AnalysisReport;
use crate::domain::tabular::ScalarKind;
use indexmap::IndexMap;
use serde::Serialize;

/// One result row: column name → JSON value, in column order
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Envelope every tool operation returns. The status field is the only
/// thing a caller needs to tell success from failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ToolResponse<T> {
    Success(T),
    Error { message: String },
}

impl<T> ToolResponse<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, ToolResponse::Success(_))
    }

    pub fn payload(&self) -> Option<&T> {
        match self {
            ToolResponse::Success(payload) => Some(payload),
            ToolResponse::Error { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            ToolResponse::Success(_) => None,
            ToolResponse::Error { message } => Some(message),
        }
    }
}

impl<T> From<Result<T>> for ToolResponse<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(payload) => ToolResponse::Success(payload),
            Err(err) => ToolResponse::Error {
                message: err.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportStatistics {
    pub rows: usize,
    pub columns: usize,
    pub column_names: Vec<String>,
    pub column_types: IndexMap<String, ScalarKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportOutcome {
    pub message: String,
    pub store: String,
    pub table: String,
    pub statistics: ImportStatistics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableList {
    pub store: String,
    pub tables: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDescription {
    pub name: String,
    #[serde(rename = "type")]
    pub declared_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericRange {
    pub min: serde_json::Value,
    pub max: serde_json::Value,
    pub avg: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableDescription {
    pub store: String,
    pub table: String,
    pub row_count: i64,
    pub columns: Vec<ColumnDescription>,
    pub sample_data: Vec<Record>,
    pub numeric_statistics: IndexMap<String, NumericRange>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryOutcome {
    pub store: String,
    /// The statement as executed, including any appended LIMIT
    pub query: String,
    pub row_count: usize,
    pub columns: Vec<String>,
    pub data: Vec<Record>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportOutcome {
    pub store: String,
    pub report: AnalysisReport,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportOutcome {
    pub message: String,
    pub output_path: String,
    pub format: String,
    pub row_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClearOutcome {
    pub message: String,
    pub store: String,
    pub deleted_tables: Vec<String>,
}
