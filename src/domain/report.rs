use crate::domain::error::AppError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Depth of an analysis report. Tiers are cumulative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisTier {
    Basic,
    Statistical,
    Correlation,
}

impl AnalysisTier {
    /// True when this tier also computes everything `other` computes
    pub fn includes(self, other: AnalysisTier) -> bool {
        self >= other
    }
}

impl Default for AnalysisTier {
    fn default() -> Self {
        AnalysisTier::Basic
    }
}

impl FromStr for AnalysisTier {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(AnalysisTier::Basic),
            "statistical" => Ok(AnalysisTier::Statistical),
            "correlation" => Ok(AnalysisTier::Correlation),
            other => Err(AppError::ValidationError(format!(
                "Unknown analysis type '{}', expected basic, statistical or correlation",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasicInfo {
    pub rows: usize,
    pub columns: usize,
    /// Approximate size, formatted as megabytes
    pub memory_usage: String,
    pub memory_bytes: usize,
}

/// Descriptive statistics of one numeric column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSummary {
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    #[serde(rename = "25%")]
    pub p25: Option<f64>,
    #[serde(rename = "50%")]
    pub p50: Option<f64>,
    #[serde(rename = "75%")]
    pub p75: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighCorrelation {
    pub column1: String,
    pub column2: String,
    pub correlation: f64,
}

/// Result of one analysis run. Optional sections are omitted when empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub table: String,
    pub analysis_type: AnalysisTier,
    pub basic_info: BasicInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric_summary: Option<IndexMap<String, NumericSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_values: Option<IndexMap<String, usize>>,
    pub data_types: IndexMap<String, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_rows: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_value_counts: Option<IndexMap<String, usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high_correlations: Option<Vec<HighCorrelation>>,
}
