//! Main analysis pipeline.
//!
//! This module provides the core `Pipeline` struct and builder for
//! orchestrating cleaning, profiling, chart selection and rendering.

use crate::charts::{ChartRenderer, ChartSelector, ChartSpec, RasterRenderer, RenderedChart};
use crate::cleaner::DataCleaner;
use crate::config::{CleaningConfig, ConfigValidationError, PipelineConfig};
use crate::error::{Result, ResultExt, TabsightError};
use crate::export::{ExportStore, ExportedArtifact};
use crate::ingest::{frame_to_records, load_csv_bytes};
use crate::pipeline::progress::{
    ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate,
};
use crate::profiler::{DataProfiler, infer_roles};
use crate::types::{AnalysisReport, ChartEntry, CleanOnlyReport};
use polars::prelude::*;
use rayon::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// The analysis pipeline.
///
/// Use [`Pipeline::builder()`] to create a pipeline with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use tabsight::{CleaningConfig, FillStrategy, Pipeline, PipelineConfig};
///
/// let report = Pipeline::builder()
///     .config(PipelineConfig::builder().export_dir("exports").build()?)
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?
///     .analyze(&df, &CleaningConfig::builder().fill_strategy(FillStrategy::Mean).build())?;
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    selector: ChartSelector,
    renderer: Arc<dyn ChartRenderer>,
    store: ExportStore,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(Pipeline: Send, Sync);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Clean, profile and chart a dataset.
    ///
    /// A chart that fails to render is logged and left out; any other
    /// failure aborts the run and removes artifacts it already wrote.
    pub fn analyze(&self, df: &DataFrame, cleaning: &CleaningConfig) -> Result<AnalysisReport> {
        let result = self.analyze_internal(df, cleaning);
        self.finish(result, "Analysis completed successfully")
    }

    /// Parse delimited text and analyze it. A parse failure is reported
    /// as [`TabsightError::InputFormat`].
    pub fn analyze_csv(&self, bytes: &[u8], cleaning: &CleaningConfig) -> Result<AnalysisReport> {
        let result = self.load(bytes).and_then(|df| self.analyze_internal(&df, cleaning));
        self.finish(result, "Analysis completed successfully")
    }

    fn load(&self, bytes: &[u8]) -> Result<DataFrame> {
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Loading,
            0.0,
            format!("Reading {} bytes...", bytes.len()),
        ));
        let df = load_csv_bytes(bytes).context("Failed to read uploaded file")?;
        info!("Loaded dataset: {:?}", df.shape());
        Ok(df)
    }

    /// Clean a dataset and return it as records. No charts are selected,
    /// rendered or exported.
    pub fn clean_only(&self, df: &DataFrame, cleaning: &CleaningConfig) -> Result<CleanOnlyReport> {
        let result = self.clean_only_internal(df, cleaning);
        self.finish(result, "Cleaning completed successfully")
    }

    fn finish<T>(&self, result: Result<T>, message: &str) -> Result<T> {
        match result {
            Ok(value) => {
                self.report_progress(ProgressUpdate::complete(message));
                Ok(value)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn clean_only_internal(
        &self,
        df: &DataFrame,
        cleaning: &CleaningConfig,
    ) -> Result<CleanOnlyReport> {
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Cleaning,
            0.0,
            "Cleaning dataset...",
        ));
        let outcome = DataCleaner::new(cleaning).clean(df)?;
        let cleaned_data =
            frame_to_records(&outcome.data, None).context("Failed to serialize cleaned data")?;

        Ok(CleanOnlyReport {
            cleaned_data,
            shape: outcome.data.shape(),
        })
    }

    fn analyze_internal(&self, df: &DataFrame, cleaning: &CleaningConfig) -> Result<AnalysisReport> {
        let start_time = Instant::now();
        info!("Starting analysis pipeline on {:?}", df.shape());

        // Step 1: Type inference on the raw input
        self.report_progress(ProgressUpdate::new(
            PipelineStage::TypeInference,
            0.0,
            "Inferring column roles...",
        ));
        let raw_roles = infer_roles(df);
        debug!(
            "Raw column roles: {:?}",
            raw_roles
                .iter()
                .map(|(name, role)| format!("{}={}", name, role.as_str()))
                .collect::<Vec<_>>()
        );

        // Step 2: Cleaning (roles are re-inferred on the cleaned data)
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Cleaning,
            0.0,
            "Cleaning dataset...",
        ));
        let outcome = DataCleaner::new(cleaning).clean(df)?;
        for action in &outcome.actions {
            debug!("Cleaning: {}", action);
        }

        // Step 3: Profiling
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Profiling,
            0.0,
            "Profiling dataset...",
        ));
        let profile = DataProfiler::profile(&outcome.data, &outcome.roles)?;
        let preview = DataProfiler::preview(&outcome.data, self.config.preview_rows)?;

        // Step 4: Chart selection
        self.report_progress(ProgressUpdate::new(
            PipelineStage::ChartSelection,
            0.0,
            "Selecting charts...",
        ));
        let specs = self.selector.select(&outcome.data, &outcome.roles)?;

        // Step 5: Rendering
        let rendered = self.render_all(&specs);

        // Step 6: Export
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Exporting,
            0.0,
            "Exporting artifacts...",
        ));
        let (download_url, charts) = self.export(&outcome.data, specs, rendered)?;

        info!(
            "Analysis complete in {:.2?}: {} rows, {} columns, {} charts",
            start_time.elapsed(),
            profile.kpis.rows,
            profile.kpis.columns,
            charts.len()
        );

        Ok(AnalysisReport {
            kpis: profile.kpis,
            columns: profile.columns,
            preview,
            download_url,
            charts,
        })
    }

    /// Render every spec, in order. Failed charts come back as `None`.
    fn render_all(&self, specs: &[ChartSpec]) -> Vec<Option<RenderedChart>> {
        let total = specs.len();
        let done = AtomicUsize::new(0);
        self.report_progress(ProgressUpdate::with_items(
            PipelineStage::Rendering,
            0,
            total,
            format!("Rendering {} charts...", total),
        ));

        let render_one = |spec: &ChartSpec| {
            let result = self.renderer.render(spec).map_err(|e| TabsightError::Render {
                key: spec.key.clone(),
                reason: e.to_string(),
            });
            let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
            self.report_progress(ProgressUpdate::with_items(
                PipelineStage::Rendering,
                finished,
                total,
                format!("Rendered {}", spec.key),
            ));
            match result {
                Ok(chart) => Some(chart),
                Err(e) => {
                    warn!("{}; omitting chart", e);
                    None
                }
            }
        };

        if self.config.parallel_rendering {
            specs.par_iter().map(render_one).collect()
        } else {
            specs.iter().map(render_one).collect()
        }
    }

    fn export(
        &self,
        data: &DataFrame,
        specs: Vec<ChartSpec>,
        rendered: Vec<Option<RenderedChart>>,
    ) -> Result<(Option<String>, Vec<ChartEntry>)> {
        let mut written: Vec<ExportedArtifact> = Vec::new();
        let result = self.export_inner(data, specs, rendered, &mut written);
        if result.is_err() {
            self.store.discard(&written);
        }
        result
    }

    fn export_inner(
        &self,
        data: &DataFrame,
        specs: Vec<ChartSpec>,
        rendered: Vec<Option<RenderedChart>>,
        written: &mut Vec<ExportedArtifact>,
    ) -> Result<(Option<String>, Vec<ChartEntry>)> {
        let download_url = if self.config.save_to_disk {
            let artifact = self
                .store
                .write_cleaned(data)
                .context("Failed to export cleaned dataset")?;
            let url = artifact.url();
            written.push(artifact);
            Some(url)
        } else {
            None
        };

        let mut charts = Vec::with_capacity(specs.len());
        for (spec, chart) in specs.into_iter().zip(rendered) {
            let Some(chart) = chart else {
                continue;
            };

            let image_url = if self.config.save_to_disk {
                let artifact = self
                    .store
                    .write_chart_image(spec.kind, &spec.key, &chart.png)
                    .with_context(|| format!("Failed to export chart '{}'", spec.key))?;
                let url = artifact.url();
                written.push(artifact);
                Some(url)
            } else {
                None
            };

            charts.push(ChartEntry {
                kind: spec.kind,
                title: spec.display_title().to_string(),
                key: spec.key,
                figure: chart.figure,
                image_url,
            });
        }

        Ok((download_url, charts))
    }
}

/// Builder for [`Pipeline`] with fluent API.
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
    renderer: Option<Arc<dyn ChartRenderer>>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the chart renderer. Defaults to a [`RasterRenderer`] sized from
    /// the configuration.
    pub fn renderer(mut self, renderer: Arc<dyn ChartRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Set a progress reporter for receiving updates during processing.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let renderer = self.renderer.unwrap_or_else(|| {
            Arc::new(RasterRenderer::new(config.image_width, config.image_height))
        });

        Ok(Pipeline {
            selector: ChartSelector::from_config(&config),
            store: ExportStore::new(config.export_dir.clone()),
            renderer,
            progress_reporter: self.progress_reporter,
            config,
        })
    }
}
