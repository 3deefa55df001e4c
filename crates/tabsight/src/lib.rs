//! Tabular Data Insight Library
//!
//! Cleans a tabular dataset, profiles it and picks the charts that fit its
//! columns, built with Rust and Polars.
//!
//! # Overview
//!
//! - **Ingest**: Delimited text or JSON records into a [`DataFrame`](polars::prelude::DataFrame)
//! - **Cleaning**: Date parsing, deduplication, null removal or filling, scaling
//! - **Profiling**: Column roles, KPIs, per-column metadata and a preview
//! - **Chart Selection**: Histograms, bar, pie, line, scatter and a correlation heatmap
//! - **Rendering**: PNG images plus plotly-style figure descriptions
//! - **Export**: Cleaned CSV and chart images under `/download/` URLs
//! - **Progress Reporting**: Stage-by-stage updates while a request runs
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use tabsight::{CleaningConfig, FillStrategy, Pipeline, PipelineConfig};
//! use tabsight::ingest::load_csv_path;
//!
//! let df = load_csv_path("sales.csv")?;
//!
//! let cleaning = CleaningConfig::builder()
//!     .remove_duplicates(true)
//!     .fill_strategy(FillStrategy::Median)
//!     .build();
//!
//! let report = Pipeline::builder()
//!     .config(PipelineConfig::builder().export_dir("exports").build()?)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .analyze(&df, &cleaning)?;
//!
//! println!("{} rows, {} charts", report.kpis.rows, report.charts.len());
//! ```
//!
//! # Request Handling
//!
//! [`InsightService`] wraps a pipeline with the two request shapes a
//! transport layer needs: a multipart-style upload with string form fields,
//! and a JSON body of records for clean-only requests. Each request appends
//! an entry to a bounded [`HistoryLog`].
//!
//! ```rust,ignore
//! use tabsight::{HistoryLog, InsightService, Pipeline};
//! use std::sync::Arc;
//!
//! let service = InsightService::new(Pipeline::builder().build()?, Arc::new(HistoryLog::default()));
//! let cleaned = service.handle_clean(br#"{"data": [{"a": 1}], "options": {}}"#)?;
//! ```

pub mod charts;
pub mod cleaner;
pub mod config;
pub mod error;
pub mod export;
pub mod history;
pub mod ingest;
pub mod pipeline;
pub mod profiler;
pub mod service;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use charts::{
    ChartKind, ChartRenderer, ChartSelector, ChartSource, ChartSpec, RasterRenderer, RenderError,
    RenderedChart, select_charts,
};
pub use cleaner::{CleaningOutcome, DataCleaner, ScalingMethod, StatisticalImputer};
pub use config::{
    CleaningConfig, CleaningConfigBuilder, ConfigValidationError, FillStrategy, MISSING_SENTINEL,
    PipelineConfig, PipelineConfigBuilder,
};
pub use error::{Result as TabsightResult, ResultExt, TabsightError};
pub use export::{ExportStore, ExportedArtifact};
pub use history::{HistoryEntry, HistoryLog, Operation};
pub use pipeline::{
    ClosureProgressReporter, Pipeline, PipelineBuilder, PipelineStage, ProgressReporter,
    ProgressUpdate,
};
pub use profiler::{DataProfiler, DatasetProfile, infer_roles};
pub use service::InsightService;
pub use types::{
    AnalysisReport, ChartEntry, CleanOnlyReport, ColumnMetadata, ColumnRole, ColumnRoles,
    DataPreview, KpiSummary,
};
