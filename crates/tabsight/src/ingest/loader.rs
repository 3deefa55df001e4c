//! Parsing raw uploads into data frames.

use super::value::{CellValue, cells_to_series};
use crate::config::CleaningConfig;
use crate::error::{Result, TabsightError};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use serde::Deserialize;
use serde_json::Value;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

const SCHEMA_INFERENCE_ROWS: usize = 100;

/// Field values read as missing, besides an empty field. Matches the tokens
/// common spreadsheet and dataframe exports write for a missing value.
pub const NULL_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

fn parse_options(quote_char: Option<u8>) -> CsvParseOptions {
    CsvParseOptions::default()
        .with_quote_char(quote_char)
        .with_null_values(Some(NullValues::AllColumns(
            NULL_TOKENS.iter().map(|t| PlSmallStr::from_static(*t)).collect(),
        )))
}

/// Body of a clean-only request: records plus optional cleaning options.
#[derive(Debug, Clone, Deserialize)]
pub struct CleanRequest {
    pub data: Value,
    #[serde(default)]
    pub options: CleaningConfig,
}

/// Parse delimited text with a header row.
///
/// Tries standard quote handling first, then no quote handling, then a
/// pre-cleaned copy of the content. Every strategy reads [`NULL_TOKENS`] and
/// empty fields as null. Fails with
/// [`TabsightError::InputFormat`] when no strategy yields a table.
pub fn load_csv_bytes(bytes: &[u8]) -> Result<DataFrame> {
    let df = read_csv_with_fallbacks(bytes)?;
    if df.width() == 0 {
        return Err(TabsightError::InputFormat(
            "delimited input has no columns".to_string(),
        ));
    }
    debug!("Parsed delimited input: {:?}", df.shape());
    Ok(df)
}

/// Read a delimited file from disk.
pub fn load_csv_path(path: impl AsRef<Path>) -> Result<DataFrame> {
    let bytes = std::fs::read(path.as_ref())?;
    load_csv_bytes(&bytes)
}

fn read_csv_with_fallbacks(bytes: &[u8]) -> Result<DataFrame> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(TabsightError::InputFormat("input is empty".to_string()));
    }

    // Strategy 1: standard loading with quote handling
    match CsvReadOptions::default()
        .with_infer_schema_length(Some(SCHEMA_INFERENCE_ROWS))
        .with_has_header(true)
        .with_parse_options(parse_options(Some(b'"')))
        .into_reader_with_file_handle(Cursor::new(bytes.to_vec()))
        .finish()
    {
        Ok(df) => return Ok(df),
        Err(e) => debug!("Standard CSV parsing failed: {}", e),
    }

    // Strategy 2: without quote handling
    match CsvReadOptions::default()
        .with_infer_schema_length(Some(SCHEMA_INFERENCE_ROWS))
        .with_has_header(true)
        .with_parse_options(parse_options(None))
        .into_reader_with_file_handle(Cursor::new(bytes.to_vec()))
        .finish()
    {
        Ok(df) => return Ok(df),
        Err(e) => debug!("CSV parsing without quotes failed: {}", e),
    }

    // Strategy 3: pre-clean content
    let content = String::from_utf8_lossy(bytes);
    let cleaned = clean_csv_content(&content);
    CsvReadOptions::default()
        .with_infer_schema_length(Some(SCHEMA_INFERENCE_ROWS))
        .with_has_header(true)
        .with_parse_options(parse_options(Some(b'"')))
        .into_reader_with_file_handle(Cursor::new(cleaned.into_bytes()))
        .finish()
        .map_err(|e| TabsightError::InputFormat(format!("failed to read CSV: {}", e)))
}

fn clean_csv_content(content: &str) -> String {
    content
        .replace("\"\"\"", "\"")
        .replace("\"\"", "\"")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build a data frame from a JSON array of records, or from an object whose
/// `data` field holds that array.
///
/// Column order follows first appearance across records; keys missing from a
/// record are null.
pub fn records_from_json(value: &Value) -> Result<DataFrame> {
    let records = match value {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("data") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(TabsightError::InputFormat(
                    "expected an array of records or an object with a 'data' array".to_string(),
                ));
            }
        },
        _ => {
            return Err(TabsightError::InputFormat(
                "expected an array of records".to_string(),
            ));
        }
    };

    let mut names: Vec<String> = Vec::new();
    for (idx, record) in records.iter().enumerate() {
        let Value::Object(fields) = record else {
            return Err(TabsightError::InputFormat(format!(
                "record {} is not an object",
                idx
            )));
        };
        for key in fields.keys() {
            if !names.iter().any(|n| n == key) {
                names.push(key.clone());
            }
        }
    }

    let mut columns = Vec::with_capacity(names.len());
    for name in &names {
        let cells: Vec<CellValue> = records
            .iter()
            .map(|record| {
                record
                    .get(name)
                    .map(CellValue::from_json)
                    .unwrap_or(CellValue::Null)
            })
            .collect();
        columns.push(Column::from(cells_to_series(name, &cells)?));
    }

    let df = DataFrame::new(columns)?;
    debug!("Parsed {} JSON records into {:?}", records.len(), df.shape());
    Ok(df)
}

/// Parse a clean-only request body.
pub fn parse_clean_request(body: &[u8]) -> Result<(DataFrame, CleaningConfig)> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| TabsightError::InputFormat(format!("invalid JSON body: {}", e)))?;

    if value.is_array() {
        return Ok((records_from_json(&value)?, CleaningConfig::default()));
    }

    let request: CleanRequest = serde_json::from_value(value)
        .map_err(|e| TabsightError::InputFormat(format!("invalid clean request: {}", e)))?;
    let df = records_from_json(&request.data)?;
    Ok((df, request.options))
}
