// ============================================================
// DELIMITED TEXT LOADER
// ============================================================
// CSV / TSV files with encoding detection and a fallback chain

use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use tracing::info;

use super::encoding::{decode_with_fallback, detect_file_encoding, EncodingChoice};
use super::inference::{infer_column, RawCell};
use crate::domain::error::{AppError, Result};
use crate::domain::tabular::TabularData;

/// Cell texts read as missing values
const MISSING_MARKERS: [&str; 11] = [
    "", "NA", "N/A", "n/a", "NaN", "nan", "NULL", "null", "None", "<NA>", "#N/A",
];

/// Delimited text parser
pub struct DelimitedParser {
    /// Field delimiter (default: comma)
    delimiter: u8,

    /// Encoding label supplied by the caller; detected when absent
    encoding: Option<String>,
}

impl Default for DelimitedParser {
    fn default() -> Self {
        Self {
            delimiter: b',',
            encoding: None,
        }
    }
}

impl DelimitedParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tab_separated() -> Self {
        Self::default().with_delimiter(b'\t')
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_encoding(mut self, encoding: Option<&str>) -> Self {
        self.encoding = encoding.map(str::to_string);
        self
    }

    /// Read, decode and parse a delimited file
    pub fn parse_file(&self, path: &Path) -> Result<TabularData> {
        let bytes = std::fs::read(path)
            .map_err(|e| AppError::IoError(format!("Failed to read {}: {}", path.display(), e)))?;

        let first_choice = match self.encoding.as_deref() {
            Some(label) => EncodingChoice::Explicit(label),
            None => EncodingChoice::Detected(detect_file_encoding(path)),
        };
        let (content, encoding) = decode_with_fallback(&bytes, first_choice)?;

        info!(
            path = %path.display(),
            encoding = encoding.name(),
            "Decoded delimited file"
        );

        self.parse_content(&content)
    }

    /// Parse already-decoded content; the first record is the header
    pub fn parse_content(&self, content: &str) -> Result<TabularData> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| AppError::ParseError(format!("Failed to read headers: {}", e)))?
            .clone();

        let mut cells: Vec<Vec<RawCell>> = vec![Vec::new(); headers.len()];

        for (index, result) in reader.records().enumerate() {
            let record = result.map_err(|e| {
                AppError::ParseError(format!("Failed to parse row {}: {}", index + 1, e))
            })?;
            Self::push_record(&headers, &record, &mut cells);
        }

        let columns = headers
            .iter()
            .zip(cells)
            .map(|(name, column_cells)| infer_column(name, column_cells))
            .collect();

        TabularData::new(columns)
    }

    fn push_record(headers: &StringRecord, record: &StringRecord, cells: &mut [Vec<RawCell>]) {
        for (idx, column) in cells.iter_mut().enumerate().take(headers.len()) {
            let cell = match record.get(idx) {
                Some(value) if !MISSING_MARKERS.contains(&value) => {
                    RawCell::Text(value.to_string())
                }
                _ => RawCell::Missing,
            };
            column.push(cell);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tabular::{ScalarKind, Value};
    use std::io::Write;

    #[test]
    fn test_parse_simple_csv() {
        let content = "name,age,city\nAlice,30,NYC\nBob,25,LA";
        let table = DelimitedParser::new().parse_content(content).unwrap();

        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_names(), vec!["name", "age", "city"]);
        assert_eq!(table.columns()[1].kind, ScalarKind::Integer);
        assert_eq!(table.columns()[0].values[0], Value::Text("Alice".to_string()));
    }

    #[test]
    fn test_parse_tsv_with_missing_markers() {
        let content = "id\tscore\n1\t2.5\n2\tNA\n3\t\n";
        let table = DelimitedParser::tab_separated()
            .parse_content(content)
            .unwrap();

        let score = &table.columns()[1];
        assert_eq!(score.kind, ScalarKind::Float);
        assert_eq!(score.null_count(), 2);
    }

    #[test]
    fn test_short_rows_padded_with_missing() {
        let table = DelimitedParser::new()
            .parse_content("a,b\n1\n2,3\n")
            .unwrap();
        assert_eq!(table.columns()[1].values, vec![Value::Null, Value::Integer(3)]);
    }

    #[test]
    fn test_whitespace_cell_stays_text() {
        let table = DelimitedParser::new()
            .parse_content("code,label
1,a
2,  
3,
")
            .unwrap();
        let label = &table.columns()[1];
        assert_eq!(label.kind, ScalarKind::Text);
        assert_eq!(label.values[1], Value::Text("  ".to_string()));
        assert_eq!(label.values[2], Value::Null);
    }

    #[test]
    fn test_duplicate_and_blank_headers() {
        let table = DelimitedParser::new()
            .parse_content("x,x,\n1,2,3\n")
            .unwrap();
        assert_eq!(table.column_names(), vec!["x", "x.1", "Unnamed: 2"]);
    }

    #[test]
    fn test_parse_file_with_latin1_bytes() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        // "café" in Latin-1 is not valid UTF-8
        file.write_all(b"word,n\ncaf\xE9,1\n").unwrap();

        let table = DelimitedParser::new().parse_file(file.path()).unwrap();
        assert_eq!(table.row_count(), 1);
        assert!(matches!(
            &table.columns()[0].values[0],
            Value::Text(word) if word.starts_with("caf") && word.chars().count() == 4
        ));
    }
}
