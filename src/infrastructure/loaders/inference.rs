// ============================================================
// COLUMN TYPE INFERENCE
// ============================================================
// Deterministic per-column inference: integer → float → boolean → temporal → text

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::tabular::{Column, ScalarKind, Value};

static TEMPORAL_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}[-/]\d{1,2}[-/]\d{1,2}([ T]\d{1,2}:\d{2}(:\d{2}(\.\d+)?)?)?$")
        .expect("temporal shape pattern is valid")
});

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// A cell as read from a source file, before its column kind is known
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Missing,
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Temporal(NaiveDateTime),
}

impl RawCell {
    fn is_missing(&self) -> bool {
        match self {
            RawCell::Missing => true,
            RawCell::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    fn as_integer(&self) -> Option<i64> {
        match self {
            RawCell::Integer(v) => Some(*v),
            RawCell::Text(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    fn as_float(&self) -> Option<f64> {
        match self {
            RawCell::Integer(v) => Some(*v as f64),
            RawCell::Float(v) => Some(*v),
            RawCell::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    fn as_boolean(&self) -> Option<bool> {
        match self {
            RawCell::Boolean(v) => Some(*v),
            RawCell::Text(s) => {
                let t = s.trim();
                if t.eq_ignore_ascii_case("true") {
                    Some(true)
                } else if t.eq_ignore_ascii_case("false") {
                    Some(false)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    fn as_temporal(&self) -> Option<NaiveDateTime> {
        match self {
            RawCell::Temporal(v) => Some(*v),
            RawCell::Text(s) => parse_temporal(s),
            _ => None,
        }
    }

    fn into_text(self) -> String {
        match self {
            RawCell::Missing => String::new(),
            RawCell::Text(s) => s,
            RawCell::Integer(v) => Value::Integer(v).to_string(),
            RawCell::Float(v) => Value::Float(v).to_string(),
            RawCell::Boolean(v) => Value::Boolean(v).to_string(),
            RawCell::Temporal(v) => Value::Temporal(v).to_string(),
        }
    }
}

/// Parse the datetime shapes accepted for temporal columns
pub fn parse_temporal(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if !TEMPORAL_SHAPE.is_match(s) {
        return None;
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Pick the first kind every present cell converts to
pub fn infer_kind(cells: &[RawCell]) -> ScalarKind {
    let present: Vec<&RawCell> = cells.iter().filter(|c| !c.is_missing()).collect();

    if present.is_empty() {
        ScalarKind::Null
    } else if present.iter().all(|c| c.as_integer().is_some()) {
        ScalarKind::Integer
    } else if present.iter().all(|c| c.as_float().is_some()) {
        ScalarKind::Float
    } else if present.iter().all(|c| c.as_boolean().is_some()) {
        ScalarKind::Boolean
    } else if present.iter().all(|c| c.as_temporal().is_some()) {
        ScalarKind::Temporal
    } else {
        ScalarKind::Text
    }
}

/// Infer the column kind and convert every cell to it
pub fn infer_column(name: impl Into<String>, cells: Vec<RawCell>) -> Column {
    let kind = infer_kind(&cells);

    let values = cells
        .into_iter()
        .map(|cell| {
            if cell.is_missing() {
                return Value::Null;
            }
            let converted = match kind {
                ScalarKind::Integer => cell.as_integer().map(Value::Integer),
                ScalarKind::Float => cell.as_float().map(Value::Float),
                ScalarKind::Boolean => cell.as_boolean().map(Value::Boolean),
                ScalarKind::Temporal => cell.as_temporal().map(Value::Temporal),
                ScalarKind::Text => Some(Value::Text(cell.into_text())),
                ScalarKind::Null => None,
            };
            converted.unwrap_or(Value::Null)
        })
        .collect();

    Column::new(name, kind, values)
}
