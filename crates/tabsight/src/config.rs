//! Configuration types for the pipeline.
//!
//! [`CleaningConfig`] is built once per request from caller input and never
//! mutated afterwards. [`PipelineConfig`] holds the request-independent
//! settings (caps, image size, export location).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Policy for replacing null values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum FillStrategy {
    /// Leave nulls in place
    #[default]
    None,
    /// Numeric nulls become the column mean
    Mean,
    /// Numeric nulls become the column median
    Median,
    /// Numeric nulls become `fill_constant` parsed as a number (0 when unparsable)
    Constant,
}

impl FillStrategy {
    /// Parse a strategy name, treating anything unrecognized as [`FillStrategy::None`].
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "mean" => Self::Mean,
            "median" => Self::Median,
            "constant" => Self::Constant,
            _ => Self::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Mean => "mean",
            Self::Median => "median",
            Self::Constant => "constant",
        }
    }
}

impl From<String> for FillStrategy {
    fn from(value: String) -> Self {
        Self::parse_lenient(&value)
    }
}

/// Sentinel written into non-numeric nulls when no fill constant is given.
pub const MISSING_SENTINEL: &str = "Missing";

/// Cleaning options for a single request.
///
/// Documented fallbacks:
/// - `remove_nulls` takes precedence: when it is set, `fill_strategy` has no effect.
/// - With [`FillStrategy::Constant`], numeric columns are filled with
///   `fill_constant` parsed as a number, or `0` when it does not parse. Numeric
///   columns never keep nulls once a fill strategy is configured.
/// - Categorical columns are filled with `fill_constant` as literal text, or
///   with [`MISSING_SENTINEL`] when it is empty.
/// - Datetime columns are never filled: their nulls survive any fill
///   strategy, so `missing` can stay above 0 after a fill.
/// - With duplicate removal set, rows that become equal after filling are
///   dropped as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CleaningConfig {
    /// Drop every row that contains at least one null.
    pub remove_nulls: bool,

    /// Drop exact-duplicate rows, keeping the first occurrence.
    pub remove_duplicates: bool,

    /// Null replacement policy (ignored when `remove_nulls` is set).
    pub fill_strategy: FillStrategy,

    /// Constant used by the fill step (see type docs for fallbacks).
    pub fill_constant: String,

    /// Replace numeric values with `(x - mean) / stddev`.
    pub standardize: bool,

    /// Replace numeric values with `(x - min) / (max - min)`.
    pub normalize: bool,
}

impl CleaningConfig {
    /// Create a new configuration builder.
    pub fn builder() -> CleaningConfigBuilder {
        CleaningConfigBuilder::default()
    }

    /// Build a configuration from string form fields as an upload endpoint
    /// receives them. Flags are true only for a case-insensitive `"true"`.
    pub fn from_form(fields: &HashMap<String, String>) -> Self {
        let flag = |name: &str| {
            fields
                .get(name)
                .map(|v| v.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(false)
        };

        Self {
            remove_nulls: flag("remove_nulls"),
            remove_duplicates: flag("remove_duplicates"),
            fill_strategy: fields
                .get("fill_strategy")
                .map(|v| FillStrategy::parse_lenient(v))
                .unwrap_or_default(),
            fill_constant: fields.get("fill_constant").cloned().unwrap_or_default(),
            standardize: flag("standardize"),
            normalize: flag("normalize"),
        }
    }

    /// The fill strategy that actually applies, after the null-removal
    /// precedence rule.
    pub fn effective_fill_strategy(&self) -> FillStrategy {
        if self.remove_nulls {
            FillStrategy::None
        } else {
            self.fill_strategy
        }
    }

    /// Numeric fill value for [`FillStrategy::Constant`].
    ///
    /// `inf` and `-inf` are accepted as given. Text that is not a number,
    /// and `nan`, fall back to 0.
    pub fn numeric_fill_constant(&self) -> f64 {
        self.fill_constant
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| !v.is_nan())
            .unwrap_or(0.0)
    }

    /// Text fill value for categorical columns.
    pub fn text_fill_constant(&self) -> &str {
        if self.fill_constant.is_empty() {
            MISSING_SENTINEL
        } else {
            &self.fill_constant
        }
    }
}

/// Builder for [`CleaningConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct CleaningConfigBuilder {
    config: CleaningConfig,
}

impl CleaningConfigBuilder {
    pub fn remove_nulls(mut self, remove: bool) -> Self {
        self.config.remove_nulls = remove;
        self
    }

    pub fn remove_duplicates(mut self, remove: bool) -> Self {
        self.config.remove_duplicates = remove;
        self
    }

    pub fn fill_strategy(mut self, strategy: FillStrategy) -> Self {
        self.config.fill_strategy = strategy;
        self
    }

    pub fn fill_constant(mut self, constant: impl Into<String>) -> Self {
        self.config.fill_constant = constant.into();
        self
    }

    pub fn standardize(mut self, enable: bool) -> Self {
        self.config.standardize = enable;
        self
    }

    pub fn normalize(mut self, enable: bool) -> Self {
        self.config.normalize = enable;
        self
    }

    pub fn build(self) -> CleaningConfig {
        self.config
    }
}

/// Request-independent pipeline settings.
///
/// Use [`PipelineConfig::builder()`] to create a validated configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory receiving cleaned datasets and chart images.
    /// Default: "exports"
    pub export_dir: PathBuf,

    /// Whether artifacts are written to disk at all.
    /// Default: true
    pub save_to_disk: bool,

    /// Maximum number of histograms per response.
    /// Default: 3
    pub max_histograms: usize,

    /// Number of bins per histogram.
    /// Default: 20
    pub histogram_bins: usize,

    /// Maximum number of pie slices.
    /// Default: 10
    pub max_pie_slices: usize,

    /// Number of cleaned rows included in the preview.
    /// Default: 10
    pub preview_rows: usize,

    /// Raster image width in pixels.
    /// Default: 1200
    pub image_width: u32,

    /// Raster image height in pixels.
    /// Default: 700
    pub image_height: u32,

    /// Decimal places for heatmap cell labels.
    /// Default: 2
    pub heatmap_precision: usize,

    /// Render charts on the rayon thread pool.
    /// Default: true
    pub parallel_rendering: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            export_dir: PathBuf::from("exports"),
            save_to_disk: true,
            max_histograms: 3,
            histogram_bins: 20,
            max_pie_slices: 10,
            preview_rows: 10,
            image_width: 1200,
            image_height: 700,
            heatmap_precision: 2,
            parallel_rendering: true,
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let counts = [
            ("histogram_bins", self.histogram_bins),
            ("max_pie_slices", self.max_pie_slices),
        ];
        for (field, value) in counts {
            if value == 0 {
                return Err(ConfigValidationError::ZeroCount(field.to_string()));
            }
        }

        if self.image_width == 0 || self.image_height == 0 {
            return Err(ConfigValidationError::InvalidImageSize {
                width: self.image_width,
                height: self.image_height,
            });
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid value for '{0}': must be at least 1")]
    ZeroCount(String),

    #[error("Invalid image size {width}x{height}: both dimensions must be non-zero")]
    InvalidImageSize { width: u32, height: u32 },
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    export_dir: Option<PathBuf>,
    save_to_disk: Option<bool>,
    max_histograms: Option<usize>,
    histogram_bins: Option<usize>,
    max_pie_slices: Option<usize>,
    preview_rows: Option<usize>,
    image_size: Option<(u32, u32)>,
    heatmap_precision: Option<usize>,
    parallel_rendering: Option<bool>,
}

impl PipelineConfigBuilder {
    /// Set the export directory for cleaned datasets and chart images.
    pub fn export_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.export_dir = Some(path.into());
        self
    }

    /// Enable or disable writing artifacts to disk.
    ///
    /// When false, charts are still rendered but nothing is persisted and
    /// artifact references are omitted from the report.
    pub fn save_to_disk(mut self, save: bool) -> Self {
        self.save_to_disk = Some(save);
        self
    }

    pub fn max_histograms(mut self, max: usize) -> Self {
        self.max_histograms = Some(max);
        self
    }

    pub fn histogram_bins(mut self, bins: usize) -> Self {
        self.histogram_bins = Some(bins);
        self
    }

    pub fn max_pie_slices(mut self, max: usize) -> Self {
        self.max_pie_slices = Some(max);
        self
    }

    pub fn preview_rows(mut self, rows: usize) -> Self {
        self.preview_rows = Some(rows);
        self
    }

    pub fn image_size(mut self, width: u32, height: u32) -> Self {
        self.image_size = Some((width, height));
        self
    }

    pub fn heatmap_precision(mut self, decimals: usize) -> Self {
        self.heatmap_precision = Some(decimals);
        self
    }

    pub fn parallel_rendering(mut self, parallel: bool) -> Self {
        self.parallel_rendering = Some(parallel);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PipelineConfig` or an error if validation fails.
    pub fn build(self) -> Result<PipelineConfig, ConfigValidationError> {
        let defaults = PipelineConfig::default();
        let (image_width, image_height) = self
            .image_size
            .unwrap_or((defaults.image_width, defaults.image_height));

        let config = PipelineConfig {
            export_dir: self.export_dir.unwrap_or(defaults.export_dir),
            save_to_disk: self.save_to_disk.unwrap_or(defaults.save_to_disk),
            max_histograms: self.max_histograms.unwrap_or(defaults.max_histograms),
            histogram_bins: self.histogram_bins.unwrap_or(defaults.histogram_bins),
            max_pie_slices: self.max_pie_slices.unwrap_or(defaults.max_pie_slices),
            preview_rows: self.preview_rows.unwrap_or(defaults.preview_rows),
            image_width,
            image_height,
            heatmap_precision: self.heatmap_precision.unwrap_or(defaults.heatmap_precision),
            parallel_rendering: self
                .parallel_rendering
                .unwrap_or(defaults.parallel_rendering),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cleaning_config() {
        let config = CleaningConfig::default();
        assert!(!config.remove_nulls);
        assert!(!config.remove_duplicates);
        assert_eq!(config.fill_strategy, FillStrategy::None);
        assert_eq!(config.fill_constant, "");
    }

    #[test]
    fn test_fill_strategy_lenient_parsing() {
        assert_eq!(FillStrategy::parse_lenient("MEAN"), FillStrategy::Mean);
        assert_eq!(FillStrategy::parse_lenient(" median "), FillStrategy::Median);
        assert_eq!(FillStrategy::parse_lenient("constant"), FillStrategy::Constant);
        assert_eq!(FillStrategy::parse_lenient("mode"), FillStrategy::None);
        assert_eq!(FillStrategy::parse_lenient(""), FillStrategy::None);
    }

    #[test]
    fn test_cleaning_config_from_json_with_unknown_strategy() {
        let json = r#"{"remove_duplicates": true, "fill_strategy": "interpolate"}"#;
        let config: CleaningConfig = serde_json::from_str(json).unwrap();

        assert!(config.remove_duplicates);
        assert!(!config.remove_nulls);
        assert_eq!(config.fill_strategy, FillStrategy::None);
    }

    #[test]
    fn test_cleaning_config_from_frontend_json() {
        let json = r#"{
            "remove_nulls": false,
            "remove_duplicates": true,
            "fill_strategy": "constant",
            "fill_constant": "7.5",
            "standardize": false,
            "normalize": true
        }"#;
        let config: CleaningConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.fill_strategy, FillStrategy::Constant);
        assert_eq!(config.numeric_fill_constant(), 7.5);
        assert!(config.normalize);
    }

    #[test]
    fn test_from_form() {
        let mut fields = HashMap::new();
        fields.insert("remove_nulls".to_string(), "TRUE".to_string());
        fields.insert("remove_duplicates".to_string(), "yes".to_string());
        fields.insert("fill_strategy".to_string(), "Median".to_string());

        let config = CleaningConfig::from_form(&fields);
        assert!(config.remove_nulls);
        assert!(!config.remove_duplicates);
        assert_eq!(config.fill_strategy, FillStrategy::Median);
        assert!(!config.standardize);
    }

    #[test]
    fn test_remove_nulls_overrides_fill() {
        let config = CleaningConfig::builder()
            .remove_nulls(true)
            .fill_strategy(FillStrategy::Mean)
            .build();
        assert_eq!(config.effective_fill_strategy(), FillStrategy::None);
    }

    #[test]
    fn test_fill_constant_fallbacks() {
        let config = CleaningConfig::builder().fill_constant("abc").build();
        assert_eq!(config.numeric_fill_constant(), 0.0);
        assert_eq!(config.text_fill_constant(), "abc");

        let empty = CleaningConfig::default();
        assert_eq!(empty.numeric_fill_constant(), 0.0);
        assert_eq!(empty.text_fill_constant(), MISSING_SENTINEL);
    }

    #[test]
    fn test_fill_constant_infinities_accepted() {
        let positive = CleaningConfig::builder().fill_constant(" inf ").build();
        assert_eq!(positive.numeric_fill_constant(), f64::INFINITY);

        let negative = CleaningConfig::builder().fill_constant("-inf").build();
        assert_eq!(negative.numeric_fill_constant(), f64::NEG_INFINITY);

        let nan = CleaningConfig::builder().fill_constant("NaN").build();
        assert_eq!(nan.numeric_fill_constant(), 0.0);
    }

    #[test]
    fn test_pipeline_builder_defaults() {
        let config = PipelineConfig::builder().build().unwrap();
        assert_eq!(config.max_histograms, 3);
        assert_eq!(config.histogram_bins, 20);
        assert_eq!(config.max_pie_slices, 10);
        assert_eq!(config.preview_rows, 10);
        assert_eq!((config.image_width, config.image_height), (1200, 700));
    }

    #[test]
    fn test_pipeline_validation_zero_bins() {
        let result = PipelineConfig::builder().histogram_bins(0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::ZeroCount(_)
        ));
    }

    #[test]
    fn test_pipeline_validation_image_size() {
        let result = PipelineConfig::builder().image_size(0, 700).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidImageSize { .. }
        ));
    }
}
