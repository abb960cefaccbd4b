//! Tiered statistical reports over a stored table.
//!
//! Tiers are cumulative:
//! - basic: shape, numeric summaries, missing values, kind counts
//! - statistical: adds duplicate rows and distinct-value counts
//! - correlation: adds strongly correlated numeric column pairs
//!
//! The whole table is loaded; nothing is sampled.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use tracing::info;

use crate::domain::error::Result;
use crate::domain::report::{
    AnalysisReport, AnalysisTier, BasicInfo, HighCorrelation, NumericSummary,
};
use crate::domain::tabular::{Column, TabularData, Value};
use crate::domain::tool_results::ReportOutcome;
use crate::infrastructure::db::table_io::{ensure_table, load_table};
use crate::infrastructure::db::StoreRegistry;

/// Pairs whose |r| is strictly above this are reported
pub const CORRELATION_THRESHOLD: f64 = 0.7;

/// Floating-point noise ignored when comparing against the threshold
const CORRELATION_EPSILON: f64 = 1e-12;

pub fn is_high_correlation(r: f64) -> bool {
    r.abs() - CORRELATION_THRESHOLD > CORRELATION_EPSILON
}

/// Build the report for an in-memory table
pub fn build_report(table: &str, data: &TabularData, tier: AnalysisTier) -> AnalysisReport {
    let numeric: Vec<&Column> = data.columns().iter().filter(|c| c.kind.is_numeric()).collect();

    let summaries: IndexMap<String, NumericSummary> = numeric
        .iter()
        .map(|c| (c.name.clone(), summarize(&c.numeric_values())))
        .collect();

    let missing: IndexMap<String, usize> = data
        .columns()
        .iter()
        .map(|c| (c.name.clone(), c.null_count()))
        .filter(|(_, n)| *n > 0)
        .collect();

    let mut data_types: IndexMap<String, usize> = IndexMap::new();
    for column in data.columns() {
        *data_types.entry(column.kind.label().to_string()).or_insert(0) += 1;
    }

    let memory_bytes = data.approx_memory_bytes();
    let mut report = AnalysisReport {
        table: table.to_string(),
        analysis_type: tier,
        basic_info: BasicInfo {
            rows: data.row_count(),
            columns: data.column_count(),
            memory_usage: format!("{:.2} MB", memory_bytes as f64 / 1024.0 / 1024.0),
            memory_bytes,
        },
        numeric_summary: (!summaries.is_empty()).then_some(summaries),
        missing_values: (!missing.is_empty()).then_some(missing),
        data_types,
        duplicate_rows: None,
        unique_value_counts: None,
        high_correlations: None,
    };

    if tier.includes(AnalysisTier::Statistical) {
        let duplicates = duplicate_rows(data);
        report.duplicate_rows = (duplicates > 0).then_some(duplicates);

        let rows = data.row_count();
        let unique: IndexMap<String, usize> = data
            .columns()
            .iter()
            .map(|c| (c.name.clone(), distinct_count(c)))
            .filter(|(_, n)| *n < rows)
            .collect();
        report.unique_value_counts = (!unique.is_empty()).then_some(unique);
    }

    if tier.includes(AnalysisTier::Correlation) && numeric.len() >= 2 {
        let pairs = high_correlations(&numeric);
        report.high_correlations = (!pairs.is_empty()).then_some(pairs);
    }

    report
}

/// count, mean, sample std, min, quartiles (linear interpolation), max
pub fn summarize(values: &[f64]) -> NumericSummary {
    let count = values.len();
    if count == 0 {
        return NumericSummary {
            count,
            mean: None,
            std: None,
            min: None,
            p25: None,
            p50: None,
            p75: None,
            max: None,
        };
    }

    let mean = values.iter().sum::<f64>() / count as f64;
    let std = (count > 1).then(|| {
        let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
        (ss / (count - 1) as f64).sqrt()
    });

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    NumericSummary {
        count,
        mean: Some(mean),
        std,
        min: sorted.first().copied(),
        p25: Some(quantile(&sorted, 0.25)),
        p50: Some(quantile(&sorted, 0.5)),
        p75: Some(quantile(&sorted, 0.75)),
        max: sorted.last().copied(),
    }
}

/// `sorted` must be non-empty and ascending
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// Hashable stand-in for a cell; floats compare by bit pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CellKey {
    Null,
    Integer(i64),
    Float(u64),
    Text(String),
    Boolean(bool),
    Temporal(NaiveDateTime),
}

impl From<&Value> for CellKey {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => CellKey::Null,
            Value::Integer(v) => CellKey::Integer(*v),
            // fold -0.0 into 0.0
            Value::Float(v) => CellKey::Float((v + 0.0).to_bits()),
            Value::Text(v) => CellKey::Text(v.clone()),
            Value::Boolean(v) => CellKey::Boolean(*v),
            Value::Temporal(v) => CellKey::Temporal(*v),
        }
    }
}

/// Rows identical to an earlier row; the first occurrence is not counted
pub fn duplicate_rows(data: &TabularData) -> usize {
    let mut seen: HashSet<Vec<CellKey>> = HashSet::with_capacity(data.row_count());
    data.rows()
        .filter(|row| !seen.insert(row.iter().map(|v| CellKey::from(*v)).collect()))
        .count()
}

/// Distinct non-null values in a column
pub fn distinct_count(column: &Column) -> usize {
    column
        .values
        .iter()
        .filter(|v| !v.is_null())
        .map(CellKey::from)
        .collect::<HashSet<_>>()
        .len()
}

/// Pearson r over rows where both cells are present
pub fn pearson(x: &Column, y: &Column) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = x
        .values
        .iter()
        .zip(&y.values)
        .filter_map(|(a, b)| Some((a.as_f64()?, b.as_f64()?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(a, _)| a).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, b)| b).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (a, b) in &pairs {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denominator = (var_x * var_y).sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        return None;
    }
    Some((cov / denominator).clamp(-1.0, 1.0))
}

fn high_correlations(numeric: &[&Column]) -> Vec<HighCorrelation> {
    let mut pairs = Vec::new();
    for (i, left) in numeric.iter().enumerate() {
        for right in &numeric[i + 1..] {
            match pearson(left, right) {
                Some(r) if is_high_correlation(r) => pairs.push(HighCorrelation {
                    column1: left.name.clone(),
                    column2: right.name.clone(),
                    correlation: (r * 1000.0).round() / 1000.0,
                }),
                _ => {}
            }
        }
    }
    pairs
}

/// Runs reports against tables in named stores
pub struct AnalysisEngine {
    registry: Arc<StoreRegistry>,
}

impl AnalysisEngine {
    pub fn new(registry: Arc<StoreRegistry>) -> Self {
        Self { registry }
    }

    pub async fn analyze(
        &self,
        table: &str,
        store_name: &str,
        tier: AnalysisTier,
    ) -> Result<ReportOutcome> {
        let store = self.registry.get(store_name).await?;
        ensure_table(store.pool(), table).await?;

        let data = load_table(store.pool(), table).await?;
        let report = build_report(table, &data, tier);

        info!(
            store = store_name,
            table,
            tier = ?tier,
            rows = data.row_count(),
            "Generated analysis report"
        );

        Ok(ReportOutcome {
            store: store_name.to_string(),
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tabular::ScalarKind;

    fn int_column(name: &str, values: &[i64]) -> Column {
        Column::new(
            name,
            ScalarKind::Integer,
            values.iter().copied().map(Value::Integer).collect(),
        )
    }

    fn float_column(name: &str, values: &[Option<f64>]) -> Column {
        Column::new(
            name,
            ScalarKind::Float,
            values
                .iter()
                .map(|v| v.map(Value::Float).unwrap_or(Value::Null))
                .collect(),
        )
    }

    /// y has correlation exactly `r` with x
    fn correlated_pair(r: f64) -> TabularData {
        let s = std::f64::consts::FRAC_1_SQRT_2;
        let u = [s, -s, 0.0, 0.0];
        let v = [0.0, 0.0, s, -s];
        let k = (1.0 - r * r).sqrt();
        let y: Vec<Option<f64>> = (0..4).map(|i| Some(r * u[i] + k * v[i])).collect();
        let x: Vec<Option<f64>> = u.iter().map(|x| Some(*x)).collect();
        TabularData::new(vec![float_column("x", &x), float_column("y", &y)]).unwrap()
    }

    #[test]
    fn test_summarize() {
        let summary = summarize(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(summary.count, 4);
        assert_eq!(summary.mean, Some(2.5));
        assert_eq!(summary.p25, Some(1.75));
        assert_eq!(summary.p50, Some(2.5));
        assert_eq!(summary.p75, Some(3.25));
        let std = summary.std.unwrap();
        assert!((std - 1.2909944487358056).abs() < 1e-12);

        let single = summarize(&[5.0]);
        assert_eq!(single.std, None);
        assert_eq!(single.min, Some(5.0));
    }

    #[test]
    fn test_threshold_is_strict() {
        assert!(!is_high_correlation(0.70));
        assert!(!is_high_correlation(-0.70));
        assert!(is_high_correlation(0.71));
        assert!(is_high_correlation(-0.9));
    }

    #[test]
    fn test_correlation_above_threshold_reported() {
        let report = build_report("t", &correlated_pair(0.71), AnalysisTier::Correlation);
        let pairs = report.high_correlations.unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].column1, "x");
        assert_eq!(pairs[0].column2, "y");
        assert_eq!(pairs[0].correlation, 0.71);
    }

    #[test]
    fn test_correlation_at_threshold_omitted() {
        for r in [0.70, -0.70] {
            let report = build_report("t", &correlated_pair(r), AnalysisTier::Correlation);
            assert!(report.high_correlations.is_none(), "r = {} was reported", r);
        }
    }

    #[test]
    fn test_correlation_below_threshold_omitted() {
        let report = build_report("t", &correlated_pair(0.5), AnalysisTier::Correlation);
        assert!(report.high_correlations.is_none());
    }

    #[test]
    fn test_missing_values_and_kinds() {
        let values: Vec<Option<f64>> = (0..10)
            .map(|i| if i < 3 { None } else { Some(i as f64) })
            .collect();
        let data = TabularData::new(vec![
            int_column("id", &(0..10).collect::<Vec<_>>()),
            float_column("score", &values),
        ])
        .unwrap();

        let report = build_report("t", &data, AnalysisTier::Basic);
        let missing = report.missing_values.unwrap();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing["score"], 3);
        assert_eq!(report.data_types["integer"], 1);
        assert_eq!(report.data_types["float"], 1);
        assert_eq!(report.numeric_summary.unwrap()["score"].count, 7);
        assert!(report.duplicate_rows.is_none());
        assert!(report.unique_value_counts.is_none());
    }

    #[test]
    fn test_statistical_tier() {
        let data = TabularData::new(vec![
            int_column("a", &[1, 1, 2, 1]),
            int_column("b", &[5, 5, 6, 7]),
            int_column("id", &[1, 2, 3, 4]),
        ])
        .unwrap();

        let report = build_report("t", &data, AnalysisTier::Statistical);
        assert!(report.duplicate_rows.is_none());
        let unique = report.unique_value_counts.unwrap();
        assert_eq!(unique["a"], 2);
        assert_eq!(unique["b"], 3);
        assert!(!unique.contains_key("id"));
        assert!(report.high_correlations.is_none());
    }

    #[test]
    fn test_duplicate_rows_keep_first() {
        let data = TabularData::new(vec![
            int_column("a", &[1, 1, 1, 2]),
            Column::new(
                "b",
                ScalarKind::Text,
                vec![
                    Value::Text("x".into()),
                    Value::Text("x".into()),
                    Value::Text("x".into()),
                    Value::Null,
                ],
            ),
        ])
        .unwrap();
        assert_eq!(duplicate_rows(&data), 2);
    }

    #[test]
    fn test_booleans_not_numeric() {
        let data = TabularData::new(vec![
            int_column("n", &[1, 2, 3]),
            Column::new(
                "flag",
                ScalarKind::Boolean,
                vec![Value::Boolean(true), Value::Boolean(false), Value::Boolean(true)],
            ),
        ])
        .unwrap();
        let report = build_report("t", &data, AnalysisTier::Correlation);
        assert_eq!(report.numeric_summary.unwrap().len(), 1);
        assert!(report.high_correlations.is_none());
    }

    #[test]
    fn test_constant_column_has_no_correlation() {
        let x = int_column("x", &[1, 2, 3]);
        let y = int_column("y", &[4, 4, 4]);
        assert_eq!(pearson(&x, &y), None);
    }
}
