//! Error types for the cleaning, profiling and charting pipeline.
//!
//! Every failure that can reach a caller is a [`TabsightError`]. Errors
//! serialize as `{ "code", "message" }` so the boundary layer can hand them
//! to a client without leaking internals.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the pipeline.
#[derive(Error, Debug)]
pub enum TabsightError {
    /// Raw input could not be parsed into a table.
    #[error("Invalid input format: {0}")]
    InputFormat(String),

    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// A single chart could not be rendered.
    #[error("Failed to render chart '{key}': {reason}")]
    Render { key: String, reason: String },

    /// Writing an artifact to the export area failed.
    #[error("Failed to export artifact: {0}")]
    Export(String),

    /// Any other failure during cleaning or profiling.
    #[error("Unexpected error: {0}")]
    Unexpected(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Image encoding error.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<TabsightError>,
    },
}

impl TabsightError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        TabsightError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code for clients.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InputFormat(_) => "INPUT_FORMAT_ERROR",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::Render { .. } => "RENDER_ERROR",
            Self::Export(_) => "EXPORT_ERROR",
            Self::Unexpected(_) => "UNEXPECTED_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::Image(_) => "IMAGE_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Whether the failure was caused by the caller's input rather than
    /// by the pipeline itself.
    pub fn is_input_error(&self) -> bool {
        match self {
            Self::InputFormat(_) => true,
            Self::WithContext { source, .. } => source.is_input_error(),
            _ => false,
        }
    }
}

impl Serialize for TabsightError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("TabsightError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, TabsightError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add lazily built context to an error result.
    fn with_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| TabsightError::Polars(e).with_context(context))
    }

    fn with_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| TabsightError::Polars(e).with_context(f()))
    }
}
