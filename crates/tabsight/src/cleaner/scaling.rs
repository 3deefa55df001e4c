//! Standardization and min-max normalization of numeric columns.
//!
//! Neither transform guards against a zero spread: a constant column becomes
//! NaN (or ±inf), and nulls stay null.

use crate::error::Result;
use crate::utils::observed_floats;
use polars::prelude::*;
use tracing::debug;

/// Scaling method applied to a numeric column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalingMethod {
    /// `(x - mean) / stddev`, with the sample standard deviation.
    Standard,
    /// `(x - min) / (max - min)`.
    MinMax,
}

impl ScalingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standardized",
            Self::MinMax => "normalized",
        }
    }
}

fn scale_series(series: &Series, method: ScalingMethod) -> PolarsResult<Series> {
    let observed = observed_floats(series)?;
    let (offset, divisor) = match method {
        ScalingMethod::Standard => (
            observed.mean().unwrap_or(f64::NAN),
            // sample standard deviation; a single value has none
            observed.std(1).unwrap_or(f64::NAN),
        ),
        ScalingMethod::MinMax => {
            let min = observed.min().unwrap_or(f64::NAN);
            let max = observed.max().unwrap_or(f64::NAN);
            (min, max - min)
        }
    };

    let floats = series.cast(&DataType::Float64)?;
    Ok(&(&floats - offset) / divisor)
}

/// Scale one numeric column of `df` in place.
pub fn scale_column(
    df: &mut DataFrame,
    col_name: &str,
    method: ScalingMethod,
    actions: &mut Vec<String>,
) -> Result<()> {
    let series = df.column(col_name)?.as_materialized_series().clone();
    let scaled = scale_series(&series, method)?;

    let non_finite = scaled
        .f64()?
        .into_iter()
        .flatten()
        .filter(|v| !v.is_finite())
        .count();
    if non_finite > 0 {
        debug!(
            "Column '{}' has {} non-finite values after scaling",
            col_name, non_finite
        );
    }

    df.replace(col_name, scaled)?;
    actions.push(format!("{} '{}'", method.as_str(), col_name));
    Ok(())
}
