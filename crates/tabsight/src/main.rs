//! CLI entry point for the cleaning and charting pipeline.

use anyhow::{Result, anyhow};
use clap::{Parser, ValueEnum};
use dotenv::dotenv;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tabsight::ingest::{load_csv_path, records_from_json};
use tabsight::profiler::parse_date_columns;
use tabsight::{
    AnalysisReport, CleanOnlyReport, CleaningConfig, DataProfiler, FillStrategy, Pipeline,
    PipelineConfig, infer_roles,
};
use tracing::{error, info};

/// Environment variable overriding the default export directory.
const EXPORT_DIR_ENV: &str = "TABSIGHT_EXPORT_DIR";
const DEFAULT_EXPORT_DIR: &str = "exports";

/// CLI-compatible fill strategy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliFillStrategy {
    /// Leave nulls in place
    None,
    /// Fill numeric nulls with the column mean
    Mean,
    /// Fill numeric nulls with the column median
    Median,
    /// Fill nulls with --fill-constant
    Constant,
}

impl From<CliFillStrategy> for FillStrategy {
    fn from(cli: CliFillStrategy) -> Self {
        match cli {
            CliFillStrategy::None => FillStrategy::None,
            CliFillStrategy::Mean => FillStrategy::Mean,
            CliFillStrategy::Median => FillStrategy::Median,
            CliFillStrategy::Constant => FillStrategy::Constant,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Tabular data cleaning, profiling and chart selection",
    long_about = "Cleans a CSV or JSON dataset, reports KPIs and column roles, and renders \
                  the charts that fit its columns.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  TABSIGHT_EXPORT_DIR   Directory for cleaned CSVs and chart images\n\n\
                  EXAMPLES:\n  \
                  # Analyze with defaults\n  \
                  tabsight -i sales.csv\n\n  \
                  # Drop duplicates and fill numeric gaps with the median\n  \
                  tabsight -i sales.csv --remove-duplicates --fill-strategy median\n\n  \
                  # Clean JSON records only, machine-readable output\n  \
                  tabsight -i records.json --clean-only --json"
)]
struct Args {
    /// Path to the CSV or JSON file to process
    #[arg(short, long)]
    input: String,

    /// Export directory for the cleaned dataset and chart images
    ///
    /// Falls back to $TABSIGHT_EXPORT_DIR, then "exports"
    #[arg(short, long)]
    output: Option<String>,

    /// Drop every row containing a null (takes precedence over filling)
    #[arg(long)]
    remove_nulls: bool,

    /// Drop exact-duplicate rows, keeping the first
    #[arg(long)]
    remove_duplicates: bool,

    /// Strategy for filling nulls
    #[arg(long, value_enum, default_value = "none")]
    fill_strategy: CliFillStrategy,

    /// Constant used by --fill-strategy constant
    #[arg(long, default_value = "")]
    fill_constant: String,

    /// Standardize numeric columns (z-score)
    #[arg(long)]
    standardize: bool,

    /// Normalize numeric columns to [0, 1]
    #[arg(long)]
    normalize: bool,

    /// Only clean the data; skip profiling and charts
    #[arg(long)]
    clean_only: bool,

    /// Show the raw dataset profile without cleaning or exporting
    #[arg(long)]
    dry_run: bool,

    /// Do not write the cleaned dataset or chart images
    #[arg(long)]
    no_save: bool,

    /// Render charts sequentially
    #[arg(long)]
    no_parallel: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all progress logs; only outputs the final JSON report.
    #[arg(long)]
    json: bool,
}

impl Args {
    fn cleaning_config(&self) -> CleaningConfig {
        CleaningConfig::builder()
            .remove_nulls(self.remove_nulls)
            .remove_duplicates(self.remove_duplicates)
            .fill_strategy(self.fill_strategy.into())
            .fill_constant(self.fill_constant.clone())
            .standardize(self.standardize)
            .normalize(self.normalize)
            .build()
    }

    fn export_dir(&self) -> PathBuf {
        self.output
            .clone()
            .or_else(|| std::env::var(EXPORT_DIR_ENV).ok())
            .unwrap_or_else(|| DEFAULT_EXPORT_DIR.to_string())
            .into()
    }
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    // Load environment variables from .env file
    dotenv().ok();

    if !Path::new(&args.input).exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }

    info!("Loading dataset from: {}", args.input);
    let data = load_input(&args.input)?;
    info!("Dataset loaded successfully: {:?}", data.shape());

    if args.dry_run {
        return run_dry_run(&args, &data);
    }

    let pipeline = build_pipeline(&args)?;
    let cleaning = args.cleaning_config();

    if args.clean_only {
        let report = pipeline
            .clean_only(&data, &cleaning)
            .map_err(|e| anyhow!("Cleaning failed: {}", e))?;
        return handle_clean_output(&report, &args);
    }

    match pipeline.analyze(&data, &cleaning) {
        Ok(report) => handle_analysis_output(&report, data.shape(), &args),
        Err(e) => {
            error!("Pipeline failed: {}", e);
            Err(anyhow!("Pipeline failed: {}", e))
        }
    }
}

/// Load a `.json` file of records, or anything else as delimited text.
fn load_input(path: &str) -> Result<DataFrame> {
    let is_json = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        let bytes = std::fs::read(path)?;
        let value: serde_json::Value = serde_json::from_slice(&bytes)?;
        Ok(records_from_json(&value)?)
    } else {
        Ok(load_csv_path(path)?)
    }
}

fn build_pipeline(args: &Args) -> Result<Pipeline> {
    let config = PipelineConfig::builder()
        .export_dir(args.export_dir())
        .save_to_disk(!args.no_save)
        .parallel_rendering(!args.no_parallel)
        .build()?;

    let mut builder = Pipeline::builder().config(config);

    if !args.quiet && !args.json {
        builder = builder.on_progress(|update| {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }

    Ok(builder.build()?)
}

/// Show roles and KPIs of the raw input.
///
/// Uses `println!` for user-facing output so it is visible regardless of
/// the log level.
fn run_dry_run(args: &Args, data: &DataFrame) -> Result<()> {
    let mut parsed = data.clone();
    parse_date_columns(&mut parsed)?;
    let roles = infer_roles(&parsed);
    let profile = DataProfiler::profile(&parsed, &roles)?;

    println!("\n{}", "=".repeat(80));
    println!("DRY RUN - Raw dataset profile");
    println!("{}\n", "=".repeat(80));

    println!("DATASET OVERVIEW");
    println!("{}", "-".repeat(40));
    println!("  File: {}", args.input);
    println!("  Rows: {}", profile.kpis.rows);
    println!("  Columns: {}", profile.kpis.columns);
    println!("  Missing cells: {}", profile.kpis.missing);
    println!("  Duplicate rows: {}", profile.kpis.duplicates);
    println!();

    print_column_table(&profile.columns);

    println!("CLEANING OPTIONS");
    println!("{}", "-".repeat(40));
    let cleaning = args.cleaning_config();
    println!("  Remove nulls: {}", cleaning.remove_nulls);
    println!("  Remove duplicates: {}", cleaning.remove_duplicates);
    println!(
        "  Fill strategy: {}",
        cleaning.effective_fill_strategy().as_str()
    );
    println!("  Standardize: {}", cleaning.standardize);
    println!("  Normalize: {}", cleaning.normalize);
    println!();

    println!("{}", "=".repeat(80));
    println!("To execute, run without --dry-run");
    println!("{}", "=".repeat(80));

    Ok(())
}

fn print_column_table(columns: &[tabsight::ColumnMetadata]) {
    println!("COLUMNS");
    println!("{}", "-".repeat(40));
    println!(
        "{:<20} {:<24} {:<12} {:<10}",
        "Column", "Type", "Role", "Non-null"
    );
    println!("{}", "-".repeat(70));
    for col in columns {
        println!(
            "{:<20} {:<24} {:<12} {:<10}",
            truncate_str(&col.name, 19),
            truncate_str(&col.raw_type, 23),
            col.role.as_str(),
            col.non_null_count
        );
    }
    println!();
}

/// Truncate a string to max length with ellipsis
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

fn handle_clean_output(report: &CleanOnlyReport, args: &Args) -> Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!();
    println!("{}", "=".repeat(80));
    println!("CLEANING COMPLETE");
    println!("{}", "=".repeat(80));
    println!();
    println!(
        "Cleaned: {} rows x {} columns",
        report.shape.0, report.shape.1
    );
    println!();
    for (idx, record) in report.cleaned_data.iter().take(5).enumerate() {
        println!("  {:>3}: {}", idx, serde_json::Value::Object(record.clone()));
    }
    if report.cleaned_data.len() > 5 {
        println!("  ... and {} more rows", report.cleaned_data.len() - 5);
    }
    println!();
    println!("Use --json for machine-readable output");
    println!("{}", "=".repeat(80));
    Ok(())
}

fn handle_analysis_output(
    report: &AnalysisReport,
    original_shape: (usize, usize),
    args: &Args,
) -> Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    print_human_readable_summary(report, original_shape, args);
    Ok(())
}

/// Print a human-readable summary of the analysis.
fn print_human_readable_summary(
    report: &AnalysisReport,
    original_shape: (usize, usize),
    args: &Args,
) {
    let kpis = &report.kpis;

    println!();
    println!("{}", "=".repeat(80));
    println!("ANALYSIS COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!(
        "Input:  {} ({} rows x {} columns)",
        args.input, original_shape.0, original_shape.1
    );
    println!("Output: {} rows x {} columns", kpis.rows, kpis.columns);
    println!("  Missing cells: {}", kpis.missing);
    println!("  Duplicate rows: {}", kpis.duplicates);
    println!();

    print_column_table(&report.columns);

    println!("Charts ({}):", report.charts.len());
    for chart in &report.charts {
        match &chart.image_url {
            Some(url) => println!("  - [{}] {} -> {}", chart.kind, chart.title, url),
            None => println!("  - [{}] {}", chart.kind, chart.title),
        }
    }
    println!();

    if let Some(ref url) = report.download_url {
        println!("Cleaned dataset: {}", url);
        println!("Export directory: {}", args.export_dir().display());
        println!();
    }

    if !report.preview.rows.is_empty() {
        println!("Preview:");
        for line in preview_lines(report) {
            println!("  {}", line);
        }
        println!();
    }

    println!("Use --json for machine-readable output");
    println!("{}", "=".repeat(80));
}

fn preview_lines(report: &AnalysisReport) -> Vec<String> {
    let mut lines = vec![report.preview.columns.join(", ")];
    for row in report.preview.rows.iter().take(5) {
        let cells: Vec<String> = report
            .preview
            .columns
            .iter()
            .map(|c| match row.get(c) {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(serde_json::Value::Null) | None => "null".to_string(),
                Some(other) => other.to_string(),
            })
            .collect();
        lines.push(cells.join(", "));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("short", 10), "short");
        assert_eq!(truncate_str("a_very_long_column_name", 10), "a_very_...");
    }

    #[test]
    fn test_cleaning_config_from_args() {
        let args = Args::parse_from([
            "tabsight",
            "-i",
            "data.csv",
            "--remove-nulls",
            "--fill-strategy",
            "median",
            "--normalize",
        ]);
        let config = args.cleaning_config();

        assert!(config.remove_nulls);
        assert_eq!(config.fill_strategy, FillStrategy::Median);
        assert_eq!(config.effective_fill_strategy(), FillStrategy::None);
        assert!(config.normalize);
        assert!(!config.standardize);
    }

    #[test]
    fn test_export_dir_flag_wins() {
        let args = Args::parse_from(["tabsight", "-i", "data.csv", "-o", "out"]);
        assert_eq!(args.export_dir(), PathBuf::from("out"));
    }
}
