//! Progress reporting for the analysis pipeline.
//!
//! # Example
//!
//! ```rust,ignore
//! use tabsight::Pipeline;
//!
//! let report = Pipeline::builder()
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .analyze(&df, &cleaning)?;
//! ```

use serde::{Deserialize, Serialize};

/// Stages of the analysis pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Reading the input into a table
    Loading,
    /// Assigning column roles
    TypeInference,
    /// Deduplication, null handling and scaling
    Cleaning,
    /// KPIs and column metadata
    Profiling,
    /// Deciding which charts apply
    ChartSelection,
    /// Rendering each selected chart
    Rendering,
    /// Writing the cleaned dataset and chart images
    Exporting,
    /// Pipeline completed successfully
    Complete,
    /// Pipeline failed with an error
    Failed,
}

impl PipelineStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Loading => "Loading Data",
            Self::TypeInference => "Inferring Types",
            Self::Cleaning => "Cleaning Data",
            Self::Profiling => "Profiling Dataset",
            Self::ChartSelection => "Selecting Charts",
            Self::Rendering => "Rendering Charts",
            Self::Exporting => "Exporting Artifacts",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Share of overall progress this stage accounts for (0.0 - 1.0).
    ///
    /// The non-terminal stages sum to 1.0.
    pub fn weight(&self) -> f32 {
        match self {
            Self::Loading => 0.05,
            Self::TypeInference => 0.05,
            Self::Cleaning => 0.20,
            Self::Profiling => 0.10,
            Self::ChartSelection => 0.10,
            Self::Rendering => 0.40,
            Self::Exporting => 0.10,
            Self::Complete | Self::Failed => 0.0,
        }
    }

    /// Returns the cumulative progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Loading => 0.0,
            Self::TypeInference => 0.05,
            Self::Cleaning => 0.10,
            Self::Profiling => 0.30,
            Self::ChartSelection => 0.40,
            Self::Rendering => 0.50,
            Self::Exporting => 0.90,
            Self::Complete => 1.0,
            Self::Failed => 0.0,
        }
    }
}

/// A progress update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Current pipeline stage
    pub stage: PipelineStage,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within current stage (0.0 - 1.0)
    pub stage_progress: f32,

    /// Human-readable message describing current activity
    pub message: String,

    /// Number of items processed in current stage (for iterative operations)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_processed: Option<usize>,

    /// Total items in current stage (for iterative operations)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_total: Option<usize>,
}

impl ProgressUpdate {
    pub fn new(stage: PipelineStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let stage_progress = stage_progress.clamp(0.0, 1.0);
        let progress = stage.base_progress() + (stage.weight() * stage_progress);
        Self {
            stage,
            progress: progress.clamp(0.0, 1.0),
            stage_progress,
            message: message.into(),
            items_processed: None,
            items_total: None,
        }
    }

    /// Creates a progress update with item counts.
    pub fn with_items(
        stage: PipelineStage,
        current: usize,
        total: usize,
        message: impl Into<String>,
    ) -> Self {
        let stage_progress = if total > 0 {
            current as f32 / total as f32
        } else {
            1.0
        };
        Self {
            items_processed: Some(current),
            items_total: Some(total),
            ..Self::new(stage, stage_progress, message)
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self::new(PipelineStage::Complete, 1.0, message)
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            stage: PipelineStage::Failed,
            progress: 0.0,
            stage_progress: 0.0,
            message: message.into(),
            items_processed: None,
            items_total: None,
        }
    }
}

/// Receives progress updates from the pipeline.
///
/// Rendering may run on several threads, so implementations must be
/// `Send + Sync`.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

/// Wrapper that implements [`ProgressReporter`] using a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_weights_sum_to_one() {
        let total: f32 = [
            PipelineStage::Loading,
            PipelineStage::TypeInference,
            PipelineStage::Cleaning,
            PipelineStage::Profiling,
            PipelineStage::ChartSelection,
            PipelineStage::Rendering,
            PipelineStage::Exporting,
        ]
        .iter()
        .map(|s| s.weight())
        .sum();
        assert!((total - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_progress_calculation() {
        let update = ProgressUpdate::new(PipelineStage::Rendering, 0.5, "halfway");
        assert!((update.progress - 0.70).abs() < 1e-6);
        assert_eq!(update.stage_progress, 0.5);
    }

    #[test]
    fn test_with_items() {
        let update = ProgressUpdate::with_items(PipelineStage::Rendering, 1, 4, "chart 1/4");
        assert_eq!(update.items_processed, Some(1));
        assert_eq!(update.items_total, Some(4));
        assert!((update.stage_progress - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_terminal_updates() {
        assert_eq!(ProgressUpdate::complete("done").progress, 1.0);
        let failed = ProgressUpdate::failed("boom");
        assert_eq!(failed.stage, PipelineStage::Failed);
        assert_eq!(failed.progress, 0.0);
    }

    #[test]
    fn test_closure_reporter() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let reporter = ClosureProgressReporter::new(move |update: ProgressUpdate| {
            sink.lock().push(update.stage);
        });

        reporter.report(ProgressUpdate::new(PipelineStage::Loading, 0.0, "start"));
        reporter.report(ProgressUpdate::complete("done"));

        assert_eq!(
            *seen.lock(),
            vec![PipelineStage::Loading, PipelineStage::Complete]
        );
    }

    #[test]
    fn test_stage_serialization() {
        let json = serde_json::to_string(&PipelineStage::ChartSelection).unwrap();
        assert_eq!(json, "\"chart_selection\"");
    }
}
