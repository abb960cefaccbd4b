// ============================================================
// SCALAR VALUES
// ============================================================
// Closed set of column kinds and the cell values they hold

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage format for temporal cells (SQLite has no native datetime type)
pub const TEMPORAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Inferred type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    Integer,
    Float,
    Text,
    Boolean,
    Temporal,
    /// Every cell in the column is missing
    Null,
}

impl ScalarKind {
    pub fn label(&self) -> &'static str {
        match self {
            ScalarKind::Integer => "integer",
            ScalarKind::Float => "float",
            ScalarKind::Text => "text",
            ScalarKind::Boolean => "boolean",
            ScalarKind::Temporal => "temporal",
            ScalarKind::Null => "null",
        }
    }

    /// Declared SQLite column type used when persisting a column of this kind
    pub fn sql_type(&self) -> &'static str {
        match self {
            ScalarKind::Integer => "INTEGER",
            ScalarKind::Float => "REAL",
            ScalarKind::Boolean => "BOOLEAN",
            ScalarKind::Temporal => "TIMESTAMP",
            ScalarKind::Text | ScalarKind::Null => "TEXT",
        }
    }

    /// Map a declared SQLite column type back to a kind
    pub fn from_sql_type(declared: &str) -> Self {
        let upper = declared.trim().to_ascii_uppercase();
        match upper.as_str() {
            "BOOLEAN" | "BOOL" => ScalarKind::Boolean,
            "TIMESTAMP" | "DATETIME" | "DATE" => ScalarKind::Temporal,
            _ if upper.contains("INT") => ScalarKind::Integer,
            _ if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") => {
                ScalarKind::Float
            }
            _ => ScalarKind::Text,
        }
    }

    /// Integer and float columns; booleans are not numeric for statistics
    pub fn is_numeric(&self) -> bool {
        matches!(self, ScalarKind::Integer | ScalarKind::Float)
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single cell
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
    Temporal(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Float(v) if !v.is_nan() => Some(*v),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Integer(v) => serde_json::Value::Number((*v).into()),
            Value::Float(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(v) => serde_json::Value::String(v.clone()),
            Value::Boolean(v) => serde_json::Value::Bool(*v),
            Value::Temporal(v) => serde_json::Value::String(v.format(TEMPORAL_FORMAT).to_string()),
        }
    }

    /// Rough in-memory footprint, informational only
    pub fn approx_size(&self) -> usize {
        match self {
            Value::Null | Value::Integer(_) | Value::Float(_) | Value::Temporal(_) => 8,
            Value::Boolean(_) => 1,
            Value::Text(v) => 24 + v.len(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Integer(v) => write!(f, "{}", v),
            // keep a fractional part so a re-import infers float again
            Value::Float(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{:.1}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(v) => f.write_str(v),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Temporal(v) => write!(f, "{}", v.format(TEMPORAL_FORMAT)),
        }
    }
}
