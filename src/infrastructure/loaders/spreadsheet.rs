// ============================================================
// SPREADSHEET LOADER
// ============================================================
// .xlsx / .xls workbooks through calamine; first row is the header

use std::path::Path;

use calamine::{open_workbook_auto, Data, DataType, Range, Reader};
use tracing::info;

use super::inference::{infer_column, RawCell};
use crate::domain::error::{AppError, Result};
use crate::domain::tabular::TabularData;

/// Load one worksheet: the named sheet, or the first one
pub fn load_workbook(path: &Path, sheet: Option<&str>) -> Result<TabularData> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| AppError::ParseError(format!("Failed to open workbook: {}", e)))?;

    let range = match sheet {
        Some(name) => {
            let names = workbook.sheet_names().to_vec();
            if !names.iter().any(|n| n == name) {
                return Err(AppError::ValidationError(format!(
                    "Sheet '{}' not found. Available sheets: {:?}",
                    name, names
                )));
            }
            workbook
                .worksheet_range(name)
                .map_err(|e| AppError::ParseError(format!("Failed to read sheet '{}': {}", name, e)))?
        }
        None => workbook
            .worksheet_range_at(0)
            .ok_or_else(|| AppError::ParseError("No worksheet found".to_string()))?
            .map_err(|e| AppError::ParseError(format!("Failed to read worksheet: {}", e)))?,
    };

    info!(
        path = %path.display(),
        sheet = sheet.unwrap_or("<first>"),
        rows = range.height(),
        "Read worksheet"
    );

    range_to_table(&range)
}

/// Convert a cell range to a table, treating the first row as the header
pub fn range_to_table(range: &Range<Data>) -> Result<TabularData> {
    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return TabularData::new(Vec::new());
    };

    let names: Vec<String> = header_row
        .iter()
        .enumerate()
        .map(|(idx, cell)| match cell {
            Data::Empty => format!("Unnamed: {}", idx),
            other => other.to_string().trim().to_string(),
        })
        .collect();

    let mut cells: Vec<Vec<RawCell>> = vec![Vec::new(); names.len()];
    for row in rows {
        for (idx, column) in cells.iter_mut().enumerate() {
            column.push(row.get(idx).map(to_raw_cell).unwrap_or(RawCell::Missing));
        }
    }

    let columns = names
        .into_iter()
        .zip(cells)
        .map(|(name, column_cells)| infer_column(name, column_cells))
        .collect();

    TabularData::new(columns)
}

fn to_raw_cell(cell: &Data) -> RawCell {
    match cell {
        Data::Empty | Data::Error(_) => RawCell::Missing,
        Data::Int(v) => RawCell::Integer(*v),
        // Excel stores every number as a double
        Data::Float(v) if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => {
            RawCell::Integer(*v as i64)
        }
        Data::Float(v) => RawCell::Float(*v),
        Data::Bool(v) => RawCell::Boolean(*v),
        Data::String(s) => RawCell::Text(s.clone()),
        other => match other.as_datetime() {
            Some(dt) => RawCell::Temporal(dt),
            None => RawCell::Text(other.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tabular::{ScalarKind, Value};

    fn range_from(rows: Vec<Vec<Data>>) -> Range<Data> {
        let height = rows.len() as u32;
        let width = rows.iter().map(Vec::len).max().unwrap_or(0) as u32;
        let mut range = Range::new((0, 0), (height - 1, width - 1));
        for (r, row) in rows.into_iter().enumerate() {
            for (c, cell) in row.into_iter().enumerate() {
                range.set_value((r as u32, c as u32), cell);
            }
        }
        range
    }

    #[test]
    fn test_range_to_table_infers_kinds() {
        let range = range_from(vec![
            vec![Data::String("item".into()), Data::String("qty".into()), Data::String("price".into())],
            vec![Data::String("pen".into()), Data::Float(3.0), Data::Float(1.25)],
            vec![Data::String("ink".into()), Data::Empty, Data::Float(4.0)],
        ]);

        let table = range_to_table(&range).unwrap();
        assert_eq!(table.column_names(), vec!["item", "qty", "price"]);
        assert_eq!(table.columns()[1].kind, ScalarKind::Integer);
        assert_eq!(table.columns()[1].values[1], Value::Null);
        assert_eq!(table.columns()[2].kind, ScalarKind::Float);
    }

    #[test]
    fn test_blank_header_cell_named() {
        let range = range_from(vec![
            vec![Data::String("a".into()), Data::Empty],
            vec![Data::Bool(true), Data::Int(7)],
        ]);
        let table = range_to_table(&range).unwrap();
        assert_eq!(table.column_names(), vec!["a", "Unnamed: 1"]);
        assert_eq!(table.columns()[0].kind, ScalarKind::Boolean);
    }

    #[test]
    fn test_repeated_header_gets_suffix() {
        let range = range_from(vec![
            vec![Data::String("x".into()), Data::String("x".into())],
            vec![Data::Int(1), Data::Int(2)],
        ]);
        let table = range_to_table(&range).unwrap();
        assert_eq!(table.column_names(), vec!["x", "x.1"]);
        assert_eq!(table.columns()[1].values[0], Value::Integer(2));
    }

    fn two_sheet_workbook(path: &Path) {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let first = workbook.add_worksheet();
        first.write_string(0, 0, "a").unwrap();
        first.write_number(1, 0, 1.0).unwrap();

        let second = workbook.add_worksheet();
        second.set_name("Prices").unwrap();
        second.write_string(0, 0, "item").unwrap();
        second.write_string(0, 1, "price").unwrap();
        second.write_string(1, 0, "pen").unwrap();
        second.write_number(1, 1, 1.5).unwrap();
        workbook.save(path).unwrap();
    }

    #[test]
    fn test_named_sheet_selected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.xlsx");
        two_sheet_workbook(&path);

        let first = load_workbook(&path, None).unwrap();
        assert_eq!(first.column_names(), vec!["a"]);

        let prices = load_workbook(&path, Some("Prices")).unwrap();
        assert_eq!(prices.column_names(), vec!["item", "price"]);
        assert_eq!(prices.columns()[1].kind, ScalarKind::Float);
    }

    #[test]
    fn test_missing_sheet_is_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.xlsx");
        two_sheet_workbook(&path);

        match load_workbook(&path, Some("Nope")) {
            Err(AppError::ValidationError(message)) => {
                assert!(message.contains("Sheet 'Nope' not found"));
                assert!(message.contains("Prices"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
