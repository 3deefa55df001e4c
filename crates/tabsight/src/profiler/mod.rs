//! Dataset profiling.
//!
//! This module provides:
//! - Column role inference (numeric, datetime, categorical)
//! - Date parsing for date-named columns
//! - Dataset KPIs and per-column metadata
//! - The data preview shown next to the charts

mod type_inference;

use crate::error::Result;
use crate::ingest::frame_to_records;
use crate::types::{ColumnMetadata, ColumnRoles, DataPreview, KpiSummary};
use crate::utils::{count_duplicate_rows, total_null_count};
use polars::prelude::*;
use tracing::debug;

pub use type_inference::{
    DATE_NAME_MARKER, infer_column_role, infer_roles, is_date_column_name, parse_date_columns,
    parse_date_series, parse_datetime_str,
};

/// Profile of a cleaned dataset.
#[derive(Debug, Clone)]
pub struct DatasetProfile {
    pub kpis: KpiSummary,
    pub columns: Vec<ColumnMetadata>,
}

/// Data profiler for summarizing dataset structure.
pub struct DataProfiler;

impl DataProfiler {
    /// Compute KPIs and column metadata for a dataset.
    ///
    /// Roles are taken from `roles` when present, otherwise inferred from the
    /// column itself.
    pub fn profile(df: &DataFrame, roles: &ColumnRoles) -> Result<DatasetProfile> {
        let kpis = Self::kpis(df)?;
        let columns = df
            .get_columns()
            .iter()
            .map(|col| {
                let name = col.name().to_string();
                let series = col.as_materialized_series();
                let role = roles
                    .get(&name)
                    .unwrap_or_else(|| infer_column_role(&name, series));
                ColumnMetadata {
                    raw_type: format!("{:?}", series.dtype()),
                    role,
                    non_null_count: series.len() - series.null_count(),
                    name,
                }
            })
            .collect();

        debug!(
            "Profiled dataset: {} rows, {} columns, {} missing, {} duplicates",
            kpis.rows, kpis.columns, kpis.missing, kpis.duplicates
        );

        Ok(DatasetProfile { kpis, columns })
    }

    /// Row count, column count, null cells and exact duplicate rows.
    pub fn kpis(df: &DataFrame) -> Result<KpiSummary> {
        Ok(KpiSummary {
            rows: df.height(),
            columns: df.width(),
            missing: total_null_count(df),
            duplicates: count_duplicate_rows(df)?,
        })
    }

    /// The first `rows` rows as JSON records.
    pub fn preview(df: &DataFrame, rows: usize) -> Result<DataPreview> {
        Ok(DataPreview {
            columns: df
                .get_column_names()
                .into_iter()
                .map(|name| name.to_string())
                .collect(),
            rows: frame_to_records(df, Some(rows))?,
        })
    }
}
