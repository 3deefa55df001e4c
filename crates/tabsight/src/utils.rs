//! Shared helpers for working with polars frames.
//!
//! Dtype checks, null filling, row-level duplicate detection and the finite
//! numeric view used by chart selection.

use polars::prelude::*;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType holds calendar dates or timestamps.
#[inline]
pub fn is_datetime_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Datetime(_, _) | DataType::Date)
}

// =============================================================================
// Series Transformation Utilities
// =============================================================================

/// Fill null values in a numeric Series with a specific value.
///
/// The result is always `Float64`.
pub fn fill_numeric_nulls(series: &Series, fill_value: f64) -> PolarsResult<Series> {
    let floats = series.cast(&DataType::Float64)?;
    Ok(floats.f64()?.fill_null_with_values(fill_value)?.into_series())
}

/// Fill null values in a Series with text. Non-null values keep their text form.
pub fn fill_string_nulls(series: &Series, fill_value: &str) -> PolarsResult<Series> {
    let strings = series.cast(&DataType::String)?;
    let fill = StringChunked::full(series.name().clone(), fill_value, series.len()).into_series();
    strings.zip_with(&strings.is_not_null(), &fill)
}

/// Float view of a numeric Series with NaN turned into null, so that
/// aggregates skip it the same way they skip missing values.
pub fn observed_floats(series: &Series) -> PolarsResult<Float64Chunked> {
    let floats = series.cast(&DataType::Float64)?;
    let ca = floats.f64()?;
    ca.set(&ca.is_nan(), None)
}

/// Numeric values as `f64`, with null and non-finite values mapped to `None`.
pub fn finite_values(series: &Series) -> PolarsResult<Vec<Option<f64>>> {
    let floats = series.cast(&DataType::Float64)?;
    Ok(floats
        .f64()?
        .into_iter()
        .map(|v| v.filter(|f| f.is_finite()))
        .collect())
}

/// Epoch milliseconds of a datetime Series, nulls kept as `None`.
pub fn timestamp_values(series: &Series) -> PolarsResult<Vec<Option<i64>>> {
    let millis = series
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
        .cast(&DataType::Int64)?;
    Ok(millis.i64()?.into_iter().collect())
}

// =============================================================================
// Row Utilities
// =============================================================================

/// Drop exact-duplicate rows, keeping the first occurrence in row order.
///
/// Rows compare equal when every cell matches, with null equal to null.
pub fn drop_duplicate_rows(df: &DataFrame) -> PolarsResult<DataFrame> {
    if df.width() == 0 {
        return Ok(df.clone());
    }
    df.unique_stable(None, UniqueKeepStrategy::First, None)
}

/// Number of rows that repeat an earlier row exactly.
pub fn count_duplicate_rows(df: &DataFrame) -> PolarsResult<usize> {
    if df.width() == 0 {
        return Ok(0);
    }
    Ok(df.height() - drop_duplicate_rows(df)?.height())
}

/// Drop every row that has a null in any column.
pub fn drop_incomplete_rows(df: &DataFrame) -> PolarsResult<DataFrame> {
    df.drop_nulls::<String>(None)
}

/// Total null cells across the frame.
pub fn total_null_count(df: &DataFrame) -> usize {
    df.get_columns().iter().map(|col| col.null_count()).sum()
}
