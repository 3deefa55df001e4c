//! Request-level entry points.
//!
//! [`InsightService`] sits where a transport layer would call in: it parses
//! raw request input, builds the cleaning configuration, runs the pipeline
//! and appends one history entry per request.

use crate::config::CleaningConfig;
use crate::error::{Result, ResultExt, TabsightError};
use crate::history::{HistoryEntry, HistoryLog, Operation};
use crate::ingest::parse_clean_request;
use crate::pipeline::Pipeline;
use crate::types::{AnalysisReport, CleanOnlyReport};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

/// Serves upload and clean-only requests.
pub struct InsightService {
    pipeline: Pipeline,
    history: Arc<HistoryLog>,
}

static_assertions::assert_impl_all!(InsightService: Send, Sync);

impl InsightService {
    pub fn new(pipeline: Pipeline, history: Arc<HistoryLog>) -> Self {
        Self { pipeline, history }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn history(&self) -> &Arc<HistoryLog> {
        &self.history
    }

    /// Analyze an uploaded delimited file. `form` carries the cleaning
    /// options as text fields (`remove_nulls=true`, `fill_strategy=mean`, ...).
    pub fn handle_upload(
        &self,
        bytes: &[u8],
        form: &HashMap<String, String>,
    ) -> Result<AnalysisReport> {
        let result = self.upload_internal(bytes, form);
        match &result {
            Ok(report) => self.history.record(HistoryEntry::new(
                Operation::Upload,
                report.kpis.rows,
                report.kpis.columns,
                report.charts.len(),
            )),
            Err(e) => {
                error!("Upload failed: {}", e);
                self.history.record(HistoryEntry::failed(Operation::Upload));
            }
        }
        result
    }

    fn upload_internal(
        &self,
        bytes: &[u8],
        form: &HashMap<String, String>,
    ) -> Result<AnalysisReport> {
        let cleaning = CleaningConfig::from_form(form);
        info!(
            "Upload received: {} bytes, fill strategy '{}'",
            bytes.len(),
            cleaning.fill_strategy.as_str()
        );
        self.pipeline.analyze_csv(bytes, &cleaning)
    }

    /// Clean a JSON body of records (`{"data": [...], "options": {...}}`).
    pub fn handle_clean(&self, body: &[u8]) -> Result<CleanOnlyReport> {
        let result = parse_clean_request(body)
            .context("Failed to read clean request")
            .and_then(|(df, cleaning)| self.pipeline.clean_only(&df, &cleaning));
        match &result {
            Ok(report) => self.history.record(HistoryEntry::new(
                Operation::Clean,
                report.shape.0,
                report.shape.1,
                0,
            )),
            Err(e) => {
                error!("Clean request failed: {}", e);
                self.history.record(HistoryEntry::failed(Operation::Clean));
            }
        }
        result
    }
}

/// HTTP-style status for an error: 400 for bad input, 500 otherwise.
pub fn error_status(err: &TabsightError) -> u16 {
    if err.is_input_error() { 400 } else { 500 }
}

/// Client-facing error body: `{"error": {"code", "message"}}`.
pub fn error_body(err: &TabsightError) -> Value {
    json!({ "error": err })
}
