//! Null filling for numeric and categorical columns.

use crate::config::{CleaningConfig, FillStrategy};
use crate::error::Result;
use crate::utils::{fill_numeric_nulls, fill_string_nulls, observed_floats};
use polars::prelude::*;
use tracing::{debug, warn};

/// Statistical imputation methods for filling missing values.
pub struct StatisticalImputer;

impl StatisticalImputer {
    /// Fill nulls of a numeric column according to `config`'s fill strategy.
    ///
    /// Numeric columns never keep nulls once a strategy is set: a statistic
    /// that cannot be computed (all-null column) falls back to 0.
    pub fn fill_numeric(
        df: &mut DataFrame,
        col_name: &str,
        config: &CleaningConfig,
        actions: &mut Vec<String>,
    ) -> Result<()> {
        let series = df.column(col_name)?.as_materialized_series().clone();
        let null_count = series.null_count();
        if null_count == 0 {
            return Ok(());
        }

        let strategy = config.effective_fill_strategy();
        let fill_value = match strategy {
            FillStrategy::None => return Ok(()),
            FillStrategy::Constant => config.numeric_fill_constant(),
            FillStrategy::Mean | FillStrategy::Median => {
                let observed = observed_floats(&series)?;
                let statistic = if strategy == FillStrategy::Mean {
                    observed.mean()
                } else {
                    observed.median()
                };
                statistic.unwrap_or_else(|| {
                    warn!(
                        "Column '{}' has no values to compute a {}; filling with 0",
                        col_name,
                        strategy.as_str()
                    );
                    0.0
                })
            }
        };

        let filled = fill_numeric_nulls(&series, fill_value)?;
        df.replace(col_name, filled)?;

        debug!(
            "Filled {} nulls in '{}' with {} ({})",
            null_count,
            col_name,
            fill_value,
            strategy.as_str()
        );
        actions.push(format!(
            "Filled {} missing values in '{}' with {} {:.4}",
            null_count,
            col_name,
            strategy.as_str(),
            fill_value
        ));
        Ok(())
    }

    /// Fill nulls of a categorical column with the configured text constant,
    /// or the `"Missing"` sentinel when none is set.
    pub fn fill_categorical(
        df: &mut DataFrame,
        col_name: &str,
        config: &CleaningConfig,
        actions: &mut Vec<String>,
    ) -> Result<()> {
        if config.effective_fill_strategy() == FillStrategy::None {
            return Ok(());
        }

        let series = df.column(col_name)?.as_materialized_series().clone();
        let null_count = series.null_count();
        if null_count == 0 {
            return Ok(());
        }

        let fill_value = config.text_fill_constant();
        let filled = fill_string_nulls(&series, fill_value)?;
        df.replace(col_name, filled)?;

        debug!(
            "Filled {} nulls in '{}' with '{}'",
            null_count, col_name, fill_value
        );
        actions.push(format!(
            "Filled {} missing values in '{}' with '{}'",
            null_count, col_name, fill_value
        ));
        Ok(())
    }
}
