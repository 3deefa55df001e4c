//! Column role inference and date parsing.

use crate::types::{ColumnRole, ColumnRoles};
use crate::utils::{is_datetime_dtype, is_numeric_dtype};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;
use tracing::debug;

/// Substring (case-insensitive) that marks a column as holding dates.
pub const DATE_NAME_MARKER: &str = "date";

// Shape regexes paired with the chrono formats worth trying for that shape.
// Date-only formats are listed separately because they parse into NaiveDate.
static DATE_PATTERNS: Lazy<Vec<(Regex, &'static [&'static str], bool)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"^\d{4}-\d{1,2}-\d{1,2}[ T]\d{1,2}:\d{2}").expect("Invalid regex: ISO datetime"),
            &[
                "%Y-%m-%d %H:%M:%S",
                "%Y-%m-%dT%H:%M:%S",
                "%Y-%m-%d %H:%M:%S%.f",
                "%Y-%m-%dT%H:%M:%S%.f",
                "%Y-%m-%d %H:%M",
                "%Y-%m-%dT%H:%M",
            ][..],
            false,
        ),
        (
            Regex::new(r"^\d{1,2}/\d{1,2}/\d{4} \d{1,2}:\d{2}").expect("Invalid regex: US datetime"),
            &["%m/%d/%Y %H:%M:%S", "%m/%d/%Y %H:%M"][..],
            false,
        ),
        (
            Regex::new(r"^\d{4}-\d{1,2}-\d{1,2}$").expect("Invalid regex: YYYY-MM-DD"),
            &["%Y-%m-%d"][..],
            true,
        ),
        (
            Regex::new(r"^\d{4}/\d{1,2}/\d{1,2}$").expect("Invalid regex: YYYY/MM/DD"),
            &["%Y/%m/%d"][..],
            true,
        ),
        (
            Regex::new(r"^\d{1,2}/\d{1,2}/\d{4}$").expect("Invalid regex: MM/DD/YYYY"),
            &["%m/%d/%Y", "%d/%m/%Y"][..],
            true,
        ),
        (
            Regex::new(r"^\d{1,2}-\d{1,2}-\d{4}$").expect("Invalid regex: MM-DD-YYYY"),
            &["%m-%d-%Y", "%d-%m-%Y"][..],
            true,
        ),
        (
            Regex::new(r"^\d{1,2}\.\d{1,2}\.\d{4}$").expect("Invalid regex: DD.MM.YYYY"),
            &["%d.%m.%Y"][..],
            true,
        ),
        (
            Regex::new(r"^\d{8}$").expect("Invalid regex: YYYYMMDD"),
            &["%Y%m%d"][..],
            true,
        ),
        (
            Regex::new(r"(?i)^[a-z]{3,9}\.? \d{1,2},? \d{4}$").expect("Invalid regex: Month D, YYYY"),
            &["%B %d, %Y", "%b %d, %Y", "%B %d %Y", "%b %d %Y"][..],
            true,
        ),
        (
            Regex::new(r"(?i)^\d{1,2} [a-z]{3,9},? \d{4}$").expect("Invalid regex: D Month YYYY"),
            &["%d %B %Y", "%d %b %Y"][..],
            true,
        ),
    ]
});

/// Whether a column name marks the column as holding dates.
pub fn is_date_column_name(name: &str) -> bool {
    name.to_lowercase().contains(DATE_NAME_MARKER)
}

/// Parse one date or date-time string into epoch milliseconds (UTC).
pub fn parse_datetime_str(raw: &str) -> Option<i64> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.timestamp_millis());
    }

    for (pattern, formats, date_only) in DATE_PATTERNS.iter() {
        if !pattern.is_match(value) {
            continue;
        }
        for format in formats.iter() {
            let parsed = if *date_only {
                NaiveDate::parse_from_str(value, format)
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            } else {
                NaiveDateTime::parse_from_str(value, format).ok()
            };
            if let Some(dt) = parsed {
                return Some(dt.and_utc().timestamp_millis());
            }
        }
    }

    None
}

/// Coerce a series to `Datetime(ms)`. Values that do not parse become null.
pub fn parse_date_series(series: &Series) -> PolarsResult<Series> {
    let target = DataType::Datetime(TimeUnit::Milliseconds, None);
    if is_datetime_dtype(series.dtype()) {
        return series.cast(&target);
    }

    let strings = series.cast(&DataType::String)?;
    let parsed: Vec<Option<i64>> = strings
        .str()?
        .into_iter()
        .map(|v| v.and_then(parse_datetime_str))
        .collect();

    Series::new(series.name().clone(), parsed).cast(&target)
}

/// Parse every date-named column of a frame in place.
pub fn parse_date_columns(df: &mut DataFrame) -> PolarsResult<()> {
    let date_columns: Vec<String> = df
        .get_column_names()
        .into_iter()
        .filter(|name| is_date_column_name(name))
        .map(|name| name.to_string())
        .collect();

    for name in &date_columns {
        let series = df.column(name)?.as_materialized_series().clone();
        let before = series.len() - series.null_count();
        let parsed = parse_date_series(&series)?;
        let after = parsed.len() - parsed.null_count();
        debug!(
            "Parsed date column '{}': {} of {} non-null values kept",
            name, after, before
        );
        df.replace(name, parsed)?;
    }

    Ok(())
}

/// Role of a column given its name and values.
///
/// A date-named column is a datetime column regardless of how many of its
/// values parse. Otherwise integer and floating point columns are numeric and
/// everything else is categorical.
pub fn infer_column_role(name: &str, series: &Series) -> ColumnRole {
    if is_date_column_name(name) || is_datetime_dtype(series.dtype()) {
        ColumnRole::Datetime
    } else if is_numeric_dtype(series.dtype()) {
        ColumnRole::Numeric
    } else {
        ColumnRole::Categorical
    }
}

/// Roles for every column of a frame, in column order.
pub fn infer_roles(df: &DataFrame) -> ColumnRoles {
    ColumnRoles::new(
        df.get_columns()
            .iter()
            .map(|col| {
                let name = col.name().to_string();
                let role = infer_column_role(&name, col.as_materialized_series());
                (name, role)
            })
            .collect(),
    )
}
