//! Data cleaning module.
//!
//! This module provides functionality for:
//! - Parsing date-named columns
//! - Removing duplicate rows
//! - Dropping rows with nulls, or filling nulls by strategy
//! - Standardizing and normalizing numeric columns

mod imputation;
mod scaling;

pub use imputation::StatisticalImputer;
pub use scaling::{ScalingMethod, scale_column};

use crate::config::CleaningConfig;
use crate::error::{Result, ResultExt};
use crate::profiler::{infer_roles, parse_date_columns};
use crate::types::{ColumnRole, ColumnRoles};
use crate::utils::{drop_duplicate_rows, drop_incomplete_rows};
use polars::prelude::*;
use tracing::{debug, info};

/// Result of a cleaning run.
#[derive(Debug, Clone)]
pub struct CleaningOutcome {
    pub data: DataFrame,
    /// Roles re-inferred on the cleaned data.
    pub roles: ColumnRoles,
    /// Human-readable log of the steps that changed something.
    pub actions: Vec<String>,
}

/// Data cleaner driven by a [`CleaningConfig`].
pub struct DataCleaner<'a> {
    config: &'a CleaningConfig,
}

impl<'a> DataCleaner<'a> {
    pub fn new(config: &'a CleaningConfig) -> Self {
        Self { config }
    }

    /// Clean a dataset. The input frame is left untouched.
    ///
    /// Steps run in a fixed order:
    /// 1. Parse date-named columns
    /// 2. Remove duplicate rows (if enabled)
    /// 3. Drop rows with any null (if enabled), otherwise
    /// 4. Fill nulls according to the fill strategy, then drop any duplicate
    ///    rows the fill produced (if duplicate removal is enabled)
    /// 5. Standardize numeric columns (if enabled)
    /// 6. Normalize numeric columns (if enabled)
    ///
    /// With duplicate removal enabled the output never holds two equal rows,
    /// and cleaning the output again with the same config changes nothing.
    pub fn clean(&self, df: &DataFrame) -> Result<CleaningOutcome> {
        let mut df = df.clone();
        let mut actions = Vec::new();

        info!("Cleaning dataset with shape {:?}", df.shape());

        // 1. Date parsing
        parse_date_columns(&mut df).context("Failed to parse date columns")?;

        // 2. Duplicates
        if self.config.remove_duplicates {
            df = self.remove_duplicates(df, "duplicate rows", &mut actions)?;
        }

        // 3./4. Nulls
        let roles = infer_roles(&df);
        if self.config.remove_nulls {
            let before = df.height();
            df = drop_incomplete_rows(&df)?;
            let removed = before - df.height();
            debug!("Removed {} rows with missing values", removed);
            if removed > 0 {
                actions.push(format!("Removed {} rows with missing values", removed));
            }
        } else {
            for (name, role) in roles.iter() {
                let filled = match role {
                    ColumnRole::Numeric => {
                        StatisticalImputer::fill_numeric(&mut df, name, self.config, &mut actions)
                    }
                    ColumnRole::Categorical => StatisticalImputer::fill_categorical(
                        &mut df,
                        name,
                        self.config,
                        &mut actions,
                    ),
                    ColumnRole::Datetime => Ok(()),
                };
                filled.with_context(|| format!("Failed to fill column '{}'", name))?;
            }
            // filled cells can turn distinct rows into exact duplicates
            if self.config.remove_duplicates {
                df = self.remove_duplicates(df, "rows duplicated by filling", &mut actions)?;
            }
        }

        // 5./6. Scaling
        let numeric: Vec<String> = roles
            .columns_with(ColumnRole::Numeric)
            .into_iter()
            .map(str::to_string)
            .collect();
        for (enabled, method) in [
            (self.config.standardize, ScalingMethod::Standard),
            (self.config.normalize, ScalingMethod::MinMax),
        ] {
            if !enabled {
                continue;
            }
            for name in &numeric {
                scale_column(&mut df, name, method, &mut actions)?;
            }
        }

        let roles = infer_roles(&df);
        info!(
            "Cleaning complete: shape {:?}, {} actions",
            df.shape(),
            actions.len()
        );

        Ok(CleaningOutcome {
            data: df,
            roles,
            actions,
        })
    }

    fn remove_duplicates(
        &self,
        df: DataFrame,
        what: &str,
        actions: &mut Vec<String>,
    ) -> Result<DataFrame> {
        let before = df.height();
        let df = drop_duplicate_rows(&df).context("Failed to remove duplicate rows")?;
        let removed = before - df.height();
        debug!("Removed {} {}", removed, what);
        if removed > 0 {
            actions.push(format!("Removed {} {}", removed, what));
        }
        Ok(df)
    }
}
