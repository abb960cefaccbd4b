// ============================================================
// TABULAR DATA
// ============================================================
// Column-oriented table handed from a loader to the store

use std::collections::HashSet;

use super::{ScalarKind, Value};
use crate::domain::error::{AppError, Result};

/// A named column of uniformly typed cells
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub kind: ScalarKind,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ScalarKind, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            kind,
            values,
        }
    }

    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_null()).count()
    }

    /// Non-missing numeric cells, in row order
    pub fn numeric_values(&self) -> Vec<f64> {
        self.values.iter().filter_map(Value::as_f64).collect()
    }
}

/// Ordered columns of equal length; row order follows the source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabularData {
    columns: Vec<Column>,
}

impl TabularData {
    /// Blank column names become `Unnamed: <index>`; repeated names get
    /// `.1`, `.2`, ... suffixes (compared case-insensitively, as SQLite does)
    pub fn new(mut columns: Vec<Column>) -> Result<Self> {
        unique_column_names(&mut columns);
        if let Some(first) = columns.first() {
            let expected = first.values.len();
            if let Some(bad) = columns.iter().find(|c| c.values.len() != expected) {
                return Err(AppError::ParseError(format!(
                    "Column '{}' has {} values, expected {}",
                    bad.name,
                    bad.values.len(),
                    expected
                )));
            }
        }
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(|c| c.values.len()).unwrap_or(0)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Cells of one row, left to right
    pub fn row(&self, index: usize) -> Vec<&Value> {
        self.columns
            .iter()
            .filter_map(|c| c.values.get(index))
            .collect()
    }

    pub fn rows(&self) -> impl Iterator<Item = Vec<&Value>> + '_ {
        (0..self.row_count()).map(move |i| self.row(i))
    }

    pub fn approx_memory_bytes(&self) -> usize {
        self.columns
            .iter()
            .map(|c| c.name.len() + c.values.iter().map(Value::approx_size).sum::<usize>())
            .sum()
    }
}

fn unique_column_names(columns: &mut [Column]) {
    let mut seen: HashSet<String> = HashSet::with_capacity(columns.len());
    for (idx, column) in columns.iter_mut().enumerate() {
        let base = match column.name.trim() {
            "" => format!("Unnamed: {}", idx),
            trimmed => trimmed.to_string(),
        };
        let mut name = base.clone();
        let mut n = 1;
        while !seen.insert(name.to_lowercase()) {
            name = format!("{}.{}", base, n);
            n += 1;
        }
        column.name = name;
    }
}
