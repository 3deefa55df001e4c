//! Tagged cell values and their conversion to and from polars columns.

use chrono::DateTime;
use polars::prelude::*;
use serde::{Serialize, Serializer};
use std::fmt;

/// Display format for timestamp cells.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single table cell.
///
/// Timestamps are milliseconds since the Unix epoch (UTC).
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Timestamp(i64),
    Null,
}

impl CellValue {
    /// Infer a cell from raw text: blank is null, integer-looking text is an
    /// integer, finite float-looking text is a float, anything else is text.
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::Null;
        }
        if let Ok(int_val) = trimmed.parse::<i64>() {
            return Self::Integer(int_val);
        }
        match trimmed.parse::<f64>() {
            Ok(float_val) if float_val.is_finite() => Self::Float(float_val),
            _ => Self::Text(raw.to_string()),
        }
    }

    /// Convert a JSON record value into a cell.
    pub fn from_json(value: &serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Text(b.to_string()),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => n.as_f64().map(Self::Float).unwrap_or(Self::Null),
            },
            Value::String(s) => Self::infer(s),
            other => Self::Text(other.to_string()),
        }
    }

    /// JSON representation used in previews and clean-only records.
    /// Non-finite floats have no JSON form and become null.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;

        match self {
            Self::Integer(i) => Value::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::Text(s) => Value::String(s.clone()),
            Self::Timestamp(ms) => format_timestamp(*ms)
                .map(Value::String)
                .unwrap_or(Value::Null),
            Self::Null => Value::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Numeric view of the cell, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{}", v),
            Self::Text(s) => write!(f, "{}", s),
            Self::Timestamp(ms) => match format_timestamp(*ms) {
                Some(s) => write!(f, "{}", s),
                None => write!(f, "{}", ms),
            },
            Self::Null => write!(f, "null"),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_json().serialize(serializer)
    }
}

/// Format epoch milliseconds as `YYYY-MM-DD HH:MM:SS`.
pub fn format_timestamp(ms: i64) -> Option<String> {
    DateTime::from_timestamp_millis(ms).map(|dt| dt.naive_utc().format(TIMESTAMP_FORMAT).to_string())
}

/// Read every value of a series as tagged cells.
pub fn series_to_cells(series: &Series) -> PolarsResult<Vec<CellValue>> {
    let dtype = series.dtype();

    if dtype.is_integer() {
        let ints = series.cast(&DataType::Int64)?;
        return Ok(ints
            .i64()?
            .into_iter()
            .map(|v| v.map(CellValue::Integer).unwrap_or(CellValue::Null))
            .collect());
    }

    if dtype.is_float() {
        let floats = series.cast(&DataType::Float64)?;
        return Ok(floats
            .f64()?
            .into_iter()
            .map(|v| v.map(CellValue::Float).unwrap_or(CellValue::Null))
            .collect());
    }

    if matches!(dtype, DataType::Datetime(_, _) | DataType::Date) {
        let millis = series
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
            .cast(&DataType::Int64)?;
        return Ok(millis
            .i64()?
            .into_iter()
            .map(|v| v.map(CellValue::Timestamp).unwrap_or(CellValue::Null))
            .collect());
    }

    if dtype == &DataType::Boolean {
        return Ok(series
            .bool()?
            .into_iter()
            .map(|v| {
                v.map(|b| CellValue::Text(b.to_string()))
                    .unwrap_or(CellValue::Null)
            })
            .collect());
    }

    let strings = series.cast(&DataType::String)?;
    Ok(strings
        .str()?
        .into_iter()
        .map(|v| {
            v.map(|s| CellValue::Text(s.to_string()))
                .unwrap_or(CellValue::Null)
        })
        .collect())
}

/// Build a series from cells, choosing the narrowest dtype that covers the
/// non-null tags: all integers → `Int64`, integers and floats → `Float64`,
/// all timestamps → `Datetime(ms)`, anything else → `String`.
pub fn cells_to_series(name: &str, cells: &[CellValue]) -> PolarsResult<Series> {
    let mut has_int = false;
    let mut has_float = false;
    let mut has_timestamp = false;
    let mut has_text = false;

    for cell in cells {
        match cell {
            CellValue::Integer(_) => has_int = true,
            CellValue::Float(_) => has_float = true,
            CellValue::Timestamp(_) => has_timestamp = true,
            CellValue::Text(_) => has_text = true,
            CellValue::Null => {}
        }
    }

    let name = PlSmallStr::from(name);
    let numeric_only = !has_text && !has_timestamp;

    if numeric_only && has_int && !has_float {
        let values: Vec<Option<i64>> = cells
            .iter()
            .map(|c| match c {
                CellValue::Integer(i) => Some(*i),
                _ => None,
            })
            .collect();
        return Ok(Series::new(name, values));
    }

    if numeric_only && has_float {
        let values: Vec<Option<f64>> = cells.iter().map(CellValue::as_f64).collect();
        return Ok(Series::new(name, values));
    }

    if has_timestamp && !has_int && !has_float && !has_text {
        let values: Vec<Option<i64>> = cells
            .iter()
            .map(|c| match c {
                CellValue::Timestamp(ms) => Some(*ms),
                _ => None,
            })
            .collect();
        return Series::new(name, values).cast(&DataType::Datetime(TimeUnit::Milliseconds, None));
    }

    let values: Vec<Option<String>> = cells
        .iter()
        .map(|c| if c.is_null() { None } else { Some(c.to_string()) })
        .collect();
    Ok(Series::new(name, values))
}

/// Rows of a frame as JSON records keyed by column name, in column order.
/// `limit` caps the number of leading rows returned.
pub fn frame_to_records(
    df: &DataFrame,
    limit: Option<usize>,
) -> PolarsResult<Vec<serde_json::Map<String, serde_json::Value>>> {
    let height = limit.map_or(df.height(), |n| n.min(df.height()));
    let frame = df.head(Some(height));

    let mut columns = Vec::with_capacity(frame.width());
    for col in frame.get_columns() {
        columns.push((
            col.name().to_string(),
            series_to_cells(col.as_materialized_series())?,
        ));
    }

    Ok((0..height)
        .map(|row| {
            columns
                .iter()
                .map(|(name, cells)| (name.clone(), cells[row].to_json()))
                .collect()
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_infer() {
        assert_eq!(CellValue::infer("42"), CellValue::Integer(42));
        assert_eq!(CellValue::infer(" -3.5 "), CellValue::Float(-3.5));
        assert_eq!(CellValue::infer(""), CellValue::Null);
        assert_eq!(CellValue::infer("   "), CellValue::Null);
        assert_eq!(CellValue::infer("abc"), CellValue::Text("abc".to_string()));
        assert_eq!(CellValue::infer("NaN"), CellValue::Text("NaN".to_string()));
    }

    #[test]
    fn test_from_json() {
        assert_eq!(CellValue::from_json(&json!(10)), CellValue::Integer(10));
        assert_eq!(CellValue::from_json(&json!(1.5)), CellValue::Float(1.5));
        assert_eq!(CellValue::from_json(&json!("20")), CellValue::Integer(20));
        assert_eq!(CellValue::from_json(&json!(null)), CellValue::Null);
        assert_eq!(
            CellValue::from_json(&json!(true)),
            CellValue::Text("true".to_string())
        );
    }

    #[test]
    fn test_non_finite_serializes_as_null() {
        assert_eq!(CellValue::Float(f64::NAN).to_json(), json!(null));
        assert_eq!(CellValue::Float(f64::INFINITY).to_json(), json!(null));
        assert_eq!(CellValue::Float(2.5).to_json(), json!(2.5));
    }

    #[test]
    fn test_timestamp_format() {
        // 2024-01-15 10:30:00 UTC
        let ms = 1_705_314_600_000;
        assert_eq!(
            format_timestamp(ms),
            Some("2024-01-15 10:30:00".to_string())
        );
        assert_eq!(CellValue::Timestamp(ms).to_json(), json!("2024-01-15 10:30:00"));
    }

    #[test]
    fn test_cells_to_series_dtypes() {
        let ints = cells_to_series("a", &[CellValue::Integer(1), CellValue::Null]).unwrap();
        assert_eq!(ints.dtype(), &DataType::Int64);
        assert_eq!(ints.null_count(), 1);

        let mixed =
            cells_to_series("b", &[CellValue::Integer(1), CellValue::Float(2.5)]).unwrap();
        assert_eq!(mixed.dtype(), &DataType::Float64);

        let text = cells_to_series(
            "c",
            &[CellValue::Integer(1), CellValue::Text("x".to_string())],
        )
        .unwrap();
        assert_eq!(text.dtype(), &DataType::String);

        let stamps = cells_to_series("d", &[CellValue::Timestamp(0), CellValue::Null]).unwrap();
        assert!(matches!(stamps.dtype(), DataType::Datetime(_, _)));

        let empty = cells_to_series("e", &[CellValue::Null, CellValue::Null]).unwrap();
        assert_eq!(empty.dtype(), &DataType::String);
        assert_eq!(empty.null_count(), 2);
    }

    #[test]
    fn test_series_to_cells_roundtrip_kinds() {
        let series = Series::new("v".into(), &[Some(1.5), None, Some(3.0)]);
        let cells = series_to_cells(&series).unwrap();
        assert_eq!(
            cells,
            vec![CellValue::Float(1.5), CellValue::Null, CellValue::Float(3.0)]
        );

        let flags = Series::new("f".into(), &[true, false]);
        let cells = series_to_cells(&flags).unwrap();
        assert_eq!(cells[0], CellValue::Text("true".to_string()));
    }

    #[test]
    fn test_frame_to_records() {
        let df = df![
            "z" => [Some(1i64), None, Some(3)],
            "a" => ["x", "y", "w"],
        ]
        .unwrap();

        let records = frame_to_records(&df, Some(2)).unwrap();
        assert_eq!(records.len(), 2);
        let keys: Vec<&String> = records[0].keys().collect();
        assert_eq!(keys, vec!["z", "a"]);
        assert_eq!(records[1]["z"], json!(null));
        assert_eq!(records[1]["a"], json!("y"));

        assert_eq!(frame_to_records(&df, None).unwrap().len(), 3);
        assert_eq!(frame_to_records(&df, Some(10)).unwrap().len(), 3);
    }
}
