// ============================================================
// PARQUET LOADER
// ============================================================
// Columnar files read through the parquet arrow reader

use std::fs::File;
use std::path::Path;

use arrow::array::{Array, ArrayRef, BooleanArray, Float64Array, Int64Array};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::inference::{infer_column, parse_temporal, RawCell};
use crate::domain::error::{AppError, Result};
use crate::domain::tabular::TabularData;

pub fn load_parquet(path: &Path) -> Result<TabularData> {
    let file = File::open(path)
        .map_err(|e| AppError::IoError(format!("Failed to open {}: {}", path.display(), e)))?;

    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| AppError::ParseError(format!("Invalid parquet file: {}", e)))?;
    let schema = builder.schema().clone();
    let reader = builder
        .build()
        .map_err(|e| AppError::ParseError(format!("Failed to read parquet file: {}", e)))?;

    let mut cells: Vec<Vec<RawCell>> = vec![Vec::new(); schema.fields().len()];
    for batch in reader {
        let batch = batch.map_err(|e| AppError::ParseError(format!("Failed to read batch: {}", e)))?;
        for (idx, column) in cells.iter_mut().enumerate() {
            column.extend(array_cells(batch.column(idx))?);
        }
    }

    let columns = schema
        .fields()
        .iter()
        .zip(cells)
        .map(|(field, column_cells)| infer_column(field.name().clone(), column_cells))
        .collect();

    TabularData::new(columns)
}

fn arrow_err(e: arrow::error::ArrowError) -> AppError {
    AppError::ParseError(format!("Failed to convert parquet column: {}", e))
}

/// Convert one arrow array into raw cells, keeping numeric and boolean types
fn array_cells(array: &ArrayRef) -> Result<Vec<RawCell>> {
    let data_type = array.data_type();

    if data_type.is_integer() {
        let casted = cast(array, &DataType::Int64).map_err(arrow_err)?;
        let values = casted
            .as_any()
            .downcast_ref::<Int64Array>()
            .ok_or_else(|| AppError::Internal("Int64 cast produced another type".to_string()))?;
        return Ok(values
            .iter()
            .map(|v| v.map(RawCell::Integer).unwrap_or(RawCell::Missing))
            .collect());
    }

    if data_type.is_floating() || matches!(data_type, DataType::Decimal128(_, _) | DataType::Decimal256(_, _)) {
        let casted = cast(array, &DataType::Float64).map_err(arrow_err)?;
        let values = casted
            .as_any()
            .downcast_ref::<Float64Array>()
            .ok_or_else(|| AppError::Internal("Float64 cast produced another type".to_string()))?;
        return Ok(values
            .iter()
            .map(|v| v.map(RawCell::Float).unwrap_or(RawCell::Missing))
            .collect());
    }

    if let Some(values) = array.as_any().downcast_ref::<BooleanArray>() {
        return Ok(values
            .iter()
            .map(|v| v.map(RawCell::Boolean).unwrap_or(RawCell::Missing))
            .collect());
    }

    let temporal = data_type.is_temporal();
    let formatter =
        ArrayFormatter::try_new(array.as_ref(), &FormatOptions::default()).map_err(arrow_err)?;

    Ok((0..array.len())
        .map(|i| {
            if array.is_null(i) {
                return RawCell::Missing;
            }
            let text = formatter.value(i).to_string();
            match temporal.then(|| parse_temporal(&text)).flatten() {
                Some(dt) => RawCell::Temporal(dt),
                None => RawCell::Text(text),
            }
        })
        .collect())
}
