//! Deterministic chart selection from column roles.

use super::correlation::correlation_matrix;
use super::{
    BarGroup, ChartKind, ChartSource, ChartSpec, HistogramBin, PieSlice, TimePoint,
};
use crate::config::PipelineConfig;
use crate::error::{Result, ResultExt, TabsightError};
use crate::types::{ColumnRole, ColumnRoles};
use crate::utils::{finite_values, timestamp_values};
use polars::prelude::*;
use tracing::debug;

/// Decides which charts apply to a dataset and builds their specs.
///
/// Output order is fixed: histograms, bar, pie, line, scatter, heatmap.
/// A kind whose columns are missing is omitted, never an error.
#[derive(Debug, Clone)]
pub struct ChartSelector {
    max_histograms: usize,
    histogram_bins: usize,
    max_pie_slices: usize,
    heatmap_precision: usize,
}

impl Default for ChartSelector {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl ChartSelector {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            max_histograms: config.max_histograms,
            histogram_bins: config.histogram_bins,
            max_pie_slices: config.max_pie_slices,
            heatmap_precision: config.heatmap_precision,
        }
    }

    pub fn select(&self, df: &DataFrame, roles: &ColumnRoles) -> Result<Vec<ChartSpec>> {
        let numeric = roles.columns_with(ColumnRole::Numeric);
        let categorical = roles.columns_with(ColumnRole::Categorical);
        let datetime = roles.columns_with(ColumnRole::Datetime);

        let mut specs = Vec::new();

        for column in numeric.iter().take(self.max_histograms) {
            specs.push(self.histogram(df, column)?);
        }

        if let (Some(category), Some(metric)) = (categorical.first(), numeric.first()) {
            specs.push(self.bar(df, category, metric)?);
        }

        if let Some(category) = categorical.first() {
            specs.push(self.pie(df, category)?);
        }

        if let (Some(date), Some(metric)) = (datetime.first(), numeric.first())
            && let Some(spec) = self.line(df, date, metric)?
        {
            specs.push(spec);
        }

        if numeric.len() >= 2 {
            specs.push(self.scatter(df, numeric[0], numeric[1])?);
            specs.push(self.heatmap(df, &numeric)?);
        }

        debug!(
            "Selected {} charts: {:?}",
            specs.len(),
            specs.iter().map(|s| s.key.as_str()).collect::<Vec<_>>()
        );
        Ok(specs)
    }

    fn series<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
        df.column(name)
            .map(|col| col.as_materialized_series())
            .map_err(|_| TabsightError::ColumnNotFound(name.to_string()))
    }

    fn histogram(&self, df: &DataFrame, column: &str) -> Result<ChartSpec> {
        let values: Vec<f64> = finite_values(Self::series(df, column)?)
            .context("Failed to read histogram values")?
            .into_iter()
            .flatten()
            .collect();
        let bins = histogram_bins(&values, self.histogram_bins);

        Ok(ChartSpec {
            kind: ChartKind::Histogram,
            key: format!("hist_{}", column),
            title: format!("{} Distribution", column),
            source: ChartSource::Histogram {
                column: column.to_string(),
                values,
                bin_count: self.histogram_bins,
                bins,
            },
        })
    }

    fn bar(&self, df: &DataFrame, category: &str, metric: &str) -> Result<ChartSpec> {
        let labels = Self::series(df, category)?.cast(&DataType::String)?;
        let values = Series::new(
            PlSmallStr::from_static("value"),
            finite_values(Self::series(df, metric)?)?,
        );
        let frame = DataFrame::new(vec![
            labels.with_name(PlSmallStr::from_static("label")).into(),
            values.into(),
        ])?;

        // ascending by label, null group last; all-null groups get a null mean
        let means = frame
            .lazy()
            .group_by([col("label")])
            .agg([col("value").mean()])
            .sort(["label"], SortMultipleOptions::default().with_nulls_last(true))
            .collect()
            .context("Failed to aggregate bar groups")?;

        let groups = means
            .column("label")?
            .as_materialized_series()
            .str()?
            .into_iter()
            .zip(means.column("value")?.as_materialized_series().f64()?)
            .map(|(label, mean)| BarGroup {
                label: label.map(str::to_string),
                mean,
            })
            .collect();

        Ok(ChartSpec {
            kind: ChartKind::Bar,
            key: format!("bar_{}_by_{}", metric, category),
            title: format!("{} by {}", metric, category),
            source: ChartSource::Bar {
                category: category.to_string(),
                metric: metric.to_string(),
                groups,
            },
        })
    }

    fn pie(&self, df: &DataFrame, column: &str) -> Result<ChartSpec> {
        let labels = Self::series(df, column)?
            .cast(&DataType::String)?
            .with_name(PlSmallStr::from_static("label"))
            .drop_nulls();

        // counts descending; ties keep the order labels were first seen
        let counts = DataFrame::new(vec![labels.into()])?
            .lazy()
            .group_by_stable([col("label")])
            .agg([len().cast(DataType::UInt64).alias("count")])
            .sort(
                ["count"],
                SortMultipleOptions::default()
                    .with_order_descending(true)
                    .with_maintain_order(true),
            )
            .limit(self.max_pie_slices as IdxSize)
            .collect()
            .context("Failed to count pie slices")?;

        let slices = counts
            .column("label")?
            .as_materialized_series()
            .str()?
            .into_iter()
            .zip(counts.column("count")?.as_materialized_series().u64()?)
            .filter_map(|(label, count)| {
                Some(PieSlice {
                    label: label?.to_string(),
                    count: count? as usize,
                })
            })
            .collect();

        Ok(ChartSpec {
            kind: ChartKind::Pie,
            key: format!("pie_{}_distribution", column),
            title: format!("{} Distribution", column),
            source: ChartSource::Pie {
                column: column.to_string(),
                slices,
            },
        })
    }

    fn line(&self, df: &DataFrame, date: &str, metric: &str) -> Result<Option<ChartSpec>> {
        let stamps = timestamp_values(Self::series(df, date)?)?;
        let values = finite_values(Self::series(df, metric)?)?;

        let mut points: Vec<TimePoint> = stamps
            .iter()
            .zip(values.iter())
            .filter_map(|(ts, value)| {
                ts.map(|timestamp| TimePoint {
                    timestamp,
                    value: *value,
                })
            })
            .collect();
        if points.len() < 2 {
            debug!(
                "Skipping line chart: only {} rows with a value in '{}'",
                points.len(),
                date
            );
            return Ok(None);
        }
        points.sort_by_key(|p| p.timestamp);

        Ok(Some(ChartSpec {
            kind: ChartKind::Line,
            key: format!("line_{}_over_{}", metric, date),
            title: format!("{} over {}", metric, date),
            source: ChartSource::Line {
                x: date.to_string(),
                y: metric.to_string(),
                points,
            },
        }))
    }

    fn scatter(&self, df: &DataFrame, x: &str, y: &str) -> Result<ChartSpec> {
        let xs = finite_values(Self::series(df, x)?)?;
        let ys = finite_values(Self::series(df, y)?)?;
        let points = xs
            .iter()
            .zip(ys.iter())
            .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
            .collect();

        Ok(ChartSpec {
            kind: ChartKind::Scatter,
            key: format!("scatter_{}_vs_{}", y, x),
            title: format!("{} vs {}", y, x),
            source: ChartSource::Scatter {
                x: x.to_string(),
                y: y.to_string(),
                points,
            },
        })
    }

    fn heatmap(&self, df: &DataFrame, numeric: &[&str]) -> Result<ChartSpec> {
        let columns = numeric
            .iter()
            .map(|name| Ok(finite_values(Self::series(df, name)?)?))
            .collect::<Result<Vec<_>>>()?;
        let matrix = correlation_matrix(&columns);
        let text = matrix
            .iter()
            .map(|row| {
                row.iter()
                    .map(|v| {
                        v.map(|r| format!("{:.*}", self.heatmap_precision, r))
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect();

        Ok(ChartSpec {
            kind: ChartKind::Heatmap,
            key: "heatmap_correlation".to_string(),
            title: "Correlation Heatmap".to_string(),
            source: ChartSource::Heatmap {
                columns: numeric.iter().map(|s| s.to_string()).collect(),
                matrix,
                text,
            },
        })
    }
}

/// Equal-width bins over the min..max of `values`. A constant column gets a
/// single bin holding every value.
fn histogram_bins(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let width = (max - min) / bins as f64;

    if width <= 0.0 || !width.is_finite() {
        return vec![HistogramBin {
            start: min,
            end: max,
            count: values.len(),
        }];
    }

    let mut result: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            start: min + width * i as f64,
            end: if i + 1 == bins {
                max
            } else {
                min + width * (i + 1) as f64
            },
            count: 0,
        })
        .collect();
    for v in values {
        let idx = (((v - min) / width).floor() as usize).min(bins - 1);
        result[idx].count += 1;
    }
    result
}

/// Select charts with the default limits (3 histograms, 20 bins, 10 pie
/// slices).
pub fn select_charts(df: &DataFrame, roles: &ColumnRoles) -> Result<Vec<ChartSpec>> {
    ChartSelector::default().select(df, roles)
}
