// ============================================================
// JSON LOADER
// ============================================================
// Array of record objects, or an object of columns

use std::path::Path;

use indexmap::IndexMap;
use serde_json::Value as JsonValue;

use super::inference::{infer_column, RawCell};
use crate::domain::error::{AppError, Result};
use crate::domain::tabular::TabularData;

pub fn load_json(path: &Path) -> Result<TabularData> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| AppError::IoError(format!("Failed to read {}: {}", path.display(), e)))?;
    parse_json(&content)
}

pub fn parse_json(content: &str) -> Result<TabularData> {
    let document: JsonValue = serde_json::from_str(content)
        .map_err(|e| AppError::ParseError(format!("Invalid JSON: {}", e)))?;

    let columns = match document {
        JsonValue::Array(records) => from_records(records)?,
        JsonValue::Object(columns) => from_columns(columns),
        _ => {
            return Err(AppError::ParseError(
                "JSON must be an array of records or an object of columns".to_string(),
            ))
        }
    };

    TabularData::new(
        columns
            .into_iter()
            .map(|(name, cells)| infer_column(name, cells))
            .collect(),
    )
}

/// `[{"a": 1, "b": 2}, ...]`; keys are collected in first-seen order
fn from_records(records: Vec<JsonValue>) -> Result<IndexMap<String, Vec<RawCell>>> {
    let mut columns: IndexMap<String, Vec<RawCell>> = IndexMap::new();

    for (row, record) in records.into_iter().enumerate() {
        let JsonValue::Object(fields) = record else {
            return Err(AppError::ParseError(format!(
                "Record {} is not a JSON object",
                row
            )));
        };
        for (key, value) in fields {
            let column = columns
                .entry(key)
                .or_insert_with(|| vec![RawCell::Missing; row]);
            column.push(to_raw_cell(value));
        }
        for column in columns.values_mut() {
            if column.len() < row + 1 {
                column.push(RawCell::Missing);
            }
        }
    }

    Ok(columns)
}

/// `{"a": {"0": 1, "1": 2}}` or `{"a": [1, 2]}`
fn from_columns(object: serde_json::Map<String, JsonValue>) -> IndexMap<String, Vec<RawCell>> {
    let mut columns: IndexMap<String, Vec<RawCell>> = object
        .into_iter()
        .map(|(name, values)| {
            let cells = match values {
                JsonValue::Array(items) => items.into_iter().map(to_raw_cell).collect(),
                JsonValue::Object(indexed) => indexed.into_iter().map(|(_, v)| to_raw_cell(v)).collect(),
                scalar => vec![to_raw_cell(scalar)],
            };
            (name, cells)
        })
        .collect();

    let height = columns.values().map(Vec::len).max().unwrap_or(0);
    for cells in columns.values_mut() {
        cells.resize(height, RawCell::Missing);
    }
    columns
}

fn to_raw_cell(value: JsonValue) -> RawCell {
    match value {
        JsonValue::Null => RawCell::Missing,
        JsonValue::Bool(b) => RawCell::Boolean(b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => RawCell::Integer(i),
            None => n.as_f64().map(RawCell::Float).unwrap_or(RawCell::Missing),
        },
        JsonValue::String(s) => RawCell::Text(s),
        nested => RawCell::Text(nested.to_string()),
    }
}
