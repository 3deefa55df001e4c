//! Integration tests for the cleaning and charting pipeline.
//!
//! These tests verify end-to-end behavior of the pipeline using small fixture datasets.

use parking_lot::Mutex;
use polars::prelude::*;
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tabsight::ingest::{load_csv_path, records_from_json};
use tabsight::{
    AnalysisReport, ChartKind, ChartRenderer, ChartSource, ChartSpec, CleaningConfig,
    ColumnRole, DataCleaner, FillStrategy, HistoryLog, InsightService, Operation, Pipeline,
    PipelineConfig, PipelineStage, RasterRenderer, RenderError, RenderedChart,
};
use tempfile::TempDir;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_csv(filename: &str) -> DataFrame {
    load_csv_path(fixtures_path().join(filename)).expect("Failed to read CSV fixture")
}

fn in_memory_config() -> PipelineConfig {
    PipelineConfig::builder()
        .save_to_disk(false)
        .image_size(320, 200)
        .build()
        .unwrap()
}

fn analyze(df: &DataFrame, cleaning: &CleaningConfig) -> AnalysisReport {
    Pipeline::builder()
        .config(in_memory_config())
        .build()
        .unwrap()
        .analyze(df, cleaning)
        .expect("Analysis should succeed")
}

fn chart_keys(report: &AnalysisReport) -> Vec<&str> {
    report.charts.iter().map(|c| c.key.as_str()).collect()
}

/// Fails every chart of one kind and renders the rest normally.
struct FailingKindRenderer {
    kind: ChartKind,
    inner: RasterRenderer,
}

impl ChartRenderer for FailingKindRenderer {
    fn render(&self, spec: &ChartSpec) -> Result<RenderedChart, RenderError> {
        if spec.kind == self.kind {
            return Err(RenderError::EmptyData);
        }
        self.inner.render(spec)
    }
}

// ============================================================================
// Full Pipeline Tests
// ============================================================================

#[test]
fn test_full_pipeline_sales() {
    let df = load_csv("sales.csv");
    let cleaning = CleaningConfig::builder()
        .remove_duplicates(true)
        .fill_strategy(FillStrategy::Mean)
        .build();

    let report = analyze(&df, &cleaning);

    assert_eq!(report.kpis.rows, 5);
    assert_eq!(report.kpis.columns, 4);
    assert_eq!(report.kpis.missing, 0);
    assert_eq!(report.kpis.duplicates, 0);
    assert_eq!(
        chart_keys(&report),
        vec![
            "hist_units",
            "hist_price",
            "bar_units_by_region",
            "pie_region_distribution",
            "line_units_over_order_date",
            "scatter_price_vs_units",
            "heatmap_correlation",
        ]
    );
    assert!(report.download_url.is_none());
    assert!(report.charts.iter().all(|c| c.image_url.is_none()));
}

#[test]
fn test_column_roles_reported() {
    let report = analyze(&load_csv("sales.csv"), &CleaningConfig::default());

    let roles: Vec<(&str, ColumnRole)> = report
        .columns
        .iter()
        .map(|c| (c.name.as_str(), c.role))
        .collect();
    assert_eq!(
        roles,
        vec![
            ("order_date", ColumnRole::Datetime),
            ("region", ColumnRole::Categorical),
            ("units", ColumnRole::Numeric),
            ("price", ColumnRole::Numeric),
        ]
    );
    let units = &report.columns[2];
    assert_eq!(units.non_null_count, 5);
}

#[test]
fn test_kpis_match_uncleaned_data() {
    let df = load_csv("sales.csv");
    let report = analyze(&df, &CleaningConfig::default());

    assert_eq!(report.kpis.rows, df.height());
    assert_eq!(report.kpis.columns, df.width());
    assert_eq!(report.kpis.missing, 2);
    assert_eq!(report.kpis.duplicates, 1);
    let non_null_total: usize = report.columns.iter().map(|c| c.non_null_count).sum();
    assert_eq!(
        non_null_total + report.kpis.missing,
        report.kpis.rows * report.kpis.columns
    );
}

#[test]
fn test_end_to_end_mean_fill() {
    let df = df![
        "id" => [1i64, 2, 2, 4],
        "category" => ["a", "b", "b", "c"],
        "value" => [Some(10i64), None, Some(20), Some(30)],
    ]
    .unwrap();
    let cleaning = CleaningConfig::builder()
        .remove_duplicates(true)
        .fill_strategy(FillStrategy::Mean)
        .build();

    let report = analyze(&df, &cleaning);

    // the filled row (2, b, 20.0) repeats the next row and is dropped
    assert_eq!(report.kpis.rows, 3);
    assert_eq!(report.kpis.missing, 0);
    assert_eq!(report.kpis.duplicates, 0);
    assert_eq!(report.preview.rows[1]["value"], serde_json::json!(20.0));
    assert_eq!(report.preview.rows[2]["id"], serde_json::json!(4));
}

#[test]
fn test_exact_duplicates_removed_before_fill() {
    let df = df![
        "id" => [1i64, 2, 2, 4],
        "category" => ["a", "b", "b", "c"],
        "value" => [Some(10i64), None, None, Some(40)],
    ]
    .unwrap();
    let cleaning = CleaningConfig::builder()
        .remove_duplicates(true)
        .fill_strategy(FillStrategy::Mean)
        .build();

    let report = analyze(&df, &cleaning);

    assert_eq!(report.kpis.rows, 3);
    assert_eq!(report.kpis.missing, 0);
    assert_eq!(report.preview.rows[1]["value"], serde_json::json!(25.0));
}

// ============================================================================
// Cleaning Semantics
// ============================================================================

#[test]
fn test_deduplication_is_idempotent() {
    let df = load_csv("sales.csv");
    let config = CleaningConfig::builder().remove_duplicates(true).build();
    let cleaner = DataCleaner::new(&config);

    let once = cleaner.clean(&df).unwrap().data;
    let twice = cleaner.clean(&once).unwrap().data;

    assert_eq!(once.height(), 5);
    assert!(once.equals_missing(&twice));
}

#[test]
fn test_cleaning_with_fill_is_idempotent() {
    let df = df![
        "id" => [1i64, 2, 2, 4],
        "category" => ["a", "b", "b", "c"],
        "value" => [Some(10i64), None, Some(20), Some(30)],
    ]
    .unwrap();
    let config = CleaningConfig::builder()
        .remove_duplicates(true)
        .fill_strategy(FillStrategy::Mean)
        .build();
    let cleaner = DataCleaner::new(&config);

    let once = cleaner.clean(&df).unwrap().data;
    let twice = cleaner.clean(&once).unwrap().data;

    assert_eq!(once.height(), 3);
    assert_eq!(twice.height(), 3);
    assert!(once.equals_missing(&twice));
}

#[test]
fn test_null_tokens_keep_numeric_columns() {
    let df = load_csv("null_tokens.csv");
    let report = analyze(&df, &CleaningConfig::default());

    let roles: Vec<(&str, ColumnRole)> = report
        .columns
        .iter()
        .map(|c| (c.name.as_str(), c.role))
        .collect();
    assert_eq!(
        roles,
        vec![
            ("region", ColumnRole::Categorical),
            ("units", ColumnRole::Numeric),
            ("price", ColumnRole::Numeric),
        ]
    );
    assert_eq!(report.kpis.missing, 4);
    assert_eq!(
        chart_keys(&report),
        vec![
            "hist_units",
            "hist_price",
            "bar_units_by_region",
            "pie_region_distribution",
            "scatter_price_vs_units",
            "heatmap_correlation",
        ]
    );
}

#[test]
fn test_remove_nulls_takes_precedence() {
    let df = load_csv("sales.csv");
    let cleaning = CleaningConfig::builder()
        .remove_nulls(true)
        .fill_strategy(FillStrategy::Constant)
        .fill_constant("99")
        .build();

    let report = analyze(&df, &cleaning);

    assert_eq!(report.kpis.rows, 4);
    assert_eq!(report.kpis.missing, 0);
    // duplicates were not requested to be removed
    assert_eq!(report.kpis.duplicates, 1);
}

#[test]
fn test_normalize_bounds_numeric_columns() {
    let df = load_csv("wide_numeric.csv");
    let config = CleaningConfig::builder().normalize(true).build();

    let outcome = DataCleaner::new(&config).clean(&df).unwrap();

    for name in ["a", "b", "c", "d", "e"] {
        let col = outcome.data.column(name).unwrap().as_materialized_series();
        let values: Vec<f64> = col.f64().unwrap().into_no_null_iter().collect();
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        assert!(min.abs() < 1e-12, "{} min was {}", name, min);
        assert!((max - 1.0).abs() < 1e-12, "{} max was {}", name, max);
    }
}

// ============================================================================
// Chart Selection Limits
// ============================================================================

#[test]
fn test_histograms_capped_at_three() {
    let report = analyze(&load_csv("wide_numeric.csv"), &CleaningConfig::default());

    assert_eq!(
        chart_keys(&report),
        vec![
            "hist_a",
            "hist_b",
            "hist_c",
            "scatter_b_vs_a",
            "heatmap_correlation",
        ]
    );
}

#[test]
fn test_heatmap_covers_all_numeric_columns() {
    let report = analyze(&load_csv("wide_numeric.csv"), &CleaningConfig::default());
    let heatmap = report
        .charts
        .iter()
        .find(|c| c.kind == ChartKind::Heatmap)
        .unwrap();

    let z = heatmap.figure["data"][0]["z"].as_array().unwrap();
    assert_eq!(z.len(), 5);
    assert_eq!(z[0][0], serde_json::json!(1.0));
}

#[test]
fn test_pie_limited_to_ten_slices() {
    let df = load_csv("many_categories.csv");
    let spec = tabsight::select_charts(&df, &tabsight::infer_roles(&df))
        .unwrap()
        .into_iter()
        .find(|s| s.kind == ChartKind::Pie)
        .unwrap();

    let ChartSource::Pie { slices, .. } = spec.source else {
        panic!("expected a pie source");
    };
    assert_eq!(slices.len(), 10);
    assert_eq!(slices[0].label, "c01");
    assert_eq!(slices[0].count, 3);
    assert_eq!(slices[9].label, "c10");
}

#[test]
fn test_single_numeric_column_has_no_scatter_or_heatmap() {
    let df = df![
        "city" => ["x", "y", "x"],
        "temp" => [1.0f64, 2.0, 3.0],
    ]
    .unwrap();

    let report = analyze(&df, &CleaningConfig::default());

    assert_eq!(
        chart_keys(&report),
        vec!["hist_temp", "bar_temp_by_city", "pie_city_distribution"]
    );
}

#[test]
fn test_single_dated_row_has_no_line_chart() {
    let report = analyze(&load_csv("single_date.csv"), &CleaningConfig::default());

    assert_eq!(report.columns[0].role, ColumnRole::Datetime);
    assert!(report.charts.iter().all(|c| c.kind != ChartKind::Line));
    assert_eq!(chart_keys(&report), vec!["hist_value"]);
}

// ============================================================================
// Rendering and Export
// ============================================================================

#[test]
fn test_render_failure_is_isolated() {
    let pipeline = Pipeline::builder()
        .config(in_memory_config())
        .renderer(Arc::new(FailingKindRenderer {
            kind: ChartKind::Pie,
            inner: RasterRenderer::new(320, 200),
        }))
        .build()
        .unwrap();

    let report = pipeline
        .analyze(&load_csv("sales.csv"), &CleaningConfig::default())
        .unwrap();

    assert_eq!(report.charts.len(), 6);
    assert!(report.charts.iter().all(|c| c.kind != ChartKind::Pie));
}

#[test]
fn test_export_writes_artifacts() {
    let temp = TempDir::new().unwrap();
    let export_dir = temp.path().join("exports");
    let pipeline = Pipeline::builder()
        .config(
            PipelineConfig::builder()
                .export_dir(&export_dir)
                .image_size(320, 200)
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();

    let report = pipeline
        .analyze(&load_csv("wide_numeric.csv"), &CleaningConfig::default())
        .unwrap();

    let download_url = report.download_url.as_deref().unwrap();
    assert!(download_url.starts_with("/download/cleaned_"));
    let csv_name = download_url.trim_start_matches("/download/");
    let written = std::fs::read_to_string(export_dir.join(csv_name)).unwrap();
    assert!(written.starts_with("a,b,c,d,e"));

    for chart in &report.charts {
        let url = chart.image_url.as_deref().unwrap();
        let name = url.trim_start_matches("/download/");
        assert!(name.starts_with(chart.kind.as_str()));
        let bytes = std::fs::read(export_dir.join(name)).unwrap();
        assert_eq!(&bytes[..4], b"\x89PNG");
    }
    // one CSV plus one image per chart
    assert_eq!(
        std::fs::read_dir(&export_dir).unwrap().count(),
        report.charts.len() + 1
    );
}

#[test]
fn test_progress_ends_with_complete() {
    let stages = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&stages);
    let pipeline = Pipeline::builder()
        .config(in_memory_config())
        .on_progress(move |update| sink.lock().push(update.stage))
        .build()
        .unwrap();

    pipeline
        .analyze(&load_csv("sales.csv"), &CleaningConfig::default())
        .unwrap();

    let stages = stages.lock();
    assert_eq!(stages.first(), Some(&PipelineStage::TypeInference));
    assert_eq!(stages.last(), Some(&PipelineStage::Complete));
    assert!(stages.contains(&PipelineStage::Rendering));
}

// ============================================================================
// Clean-Only Path and Service
// ============================================================================

#[test]
fn test_clean_only_json_records() {
    let raw = std::fs::read(fixtures_path().join("records.json")).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&raw).unwrap();
    let df = records_from_json(&value).unwrap();
    let cleaning = CleaningConfig::builder()
        .remove_duplicates(true)
        .fill_strategy(FillStrategy::Constant)
        .fill_constant("n/a")
        .build();

    let report = Pipeline::builder()
        .config(in_memory_config())
        .build()
        .unwrap()
        .clean_only(&df, &cleaning)
        .unwrap();

    assert_eq!(report.shape, (3, 3));
    let second = &report.cleaned_data[1];
    assert_eq!(second["id"], serde_json::json!(2));
    assert_eq!(second["city"], serde_json::json!("n/a"));
    // unparsable constant falls back to 0 for numeric columns
    assert_eq!(second["score"], serde_json::json!(0.0));
}

#[test]
fn test_service_records_history() {
    let history = Arc::new(HistoryLog::with_capacity(2));
    let service = InsightService::new(
        Pipeline::builder().config(in_memory_config()).build().unwrap(),
        Arc::clone(&history),
    );
    let csv = std::fs::read(fixtures_path().join("sales.csv")).unwrap();
    let mut form = HashMap::new();
    form.insert("remove_duplicates".to_string(), "True".to_string());

    let report = service.handle_upload(&csv, &form).unwrap();
    assert_eq!(report.kpis.rows, 5);

    service
        .handle_clean(br#"[{"a": 1}, {"a": 1}]"#)
        .unwrap();
    assert!(service.handle_clean(b"not json").is_err());

    let entries = history.recent();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].operation, Operation::Clean);
    assert!(entries[0].success);
    assert_eq!(entries[0].rows, 2);
    assert!(!entries[1].success);
}
