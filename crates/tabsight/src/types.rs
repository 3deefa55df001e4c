use crate::charts::ChartKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Semantic role of a column's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnRole {
    Numeric,
    Datetime,
    Categorical,
}

impl ColumnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Datetime => "datetime",
            Self::Categorical => "categorical",
        }
    }
}

/// Roles for every column of a dataset, in column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnRoles {
    entries: Vec<(String, ColumnRole)>,
}

impl ColumnRoles {
    pub fn new(entries: Vec<(String, ColumnRole)>) -> Self {
        Self { entries }
    }

    pub fn get(&self, column: &str) -> Option<ColumnRole> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, role)| *role)
    }

    /// Column names holding `role`, in column order.
    pub fn columns_with(&self, role: ColumnRole) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, r)| *r == role)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ColumnRole)> {
        self.entries.iter().map(|(name, role)| (name.as_str(), *role))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Dataset-level metrics, computed once after cleaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KpiSummary {
    pub rows: usize,
    pub columns: usize,
    pub missing: usize,
    pub duplicates: usize,
}

/// Per-column metadata reported alongside the KPIs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    #[serde(rename = "column")]
    pub name: String,
    #[serde(rename = "dtype")]
    pub raw_type: String,
    pub role: ColumnRole,
    pub non_null_count: usize,
}

/// First rows of the cleaned dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataPreview {
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
}

/// One selected chart paired with its rendered artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartEntry {
    pub kind: ChartKind,
    pub key: String,
    pub title: String,
    pub figure: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Response of the upload/analyze path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub kpis: KpiSummary,
    pub columns: Vec<ColumnMetadata>,
    pub preview: DataPreview,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    pub charts: Vec<ChartEntry>,
}

/// Response of the clean-only path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanOnlyReport {
    pub cleaned_data: Vec<Map<String, Value>>,
    pub shape: (usize, usize),
}
