//! Write-once export area for cleaned datasets and chart images.
//!
//! Every artifact gets a fresh random name and is referenced by a
//! `/download/<file>` URL. Nothing here reads artifacts back.

use crate::charts::ChartKind;
use crate::error::{Result, TabsightError};
use polars::prelude::*;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

/// URL prefix under which exported files are served.
pub const DOWNLOAD_PREFIX: &str = "/download/";

/// A file written to the export area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedArtifact {
    pub file_name: String,
    pub path: PathBuf,
}

impl ExportedArtifact {
    pub fn url(&self) -> String {
        format!("{}{}", DOWNLOAD_PREFIX, self.file_name)
    }
}

/// Directory that receives exported artifacts.
#[derive(Debug, Clone)]
pub struct ExportStore {
    dir: PathBuf,
}

impl ExportStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn prepare(&self, file_name: String) -> Result<ExportedArtifact> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            TabsightError::Export(format!(
                "cannot create export directory '{}': {}",
                self.dir.display(),
                e
            ))
        })?;
        let path = self.dir.join(&file_name);
        Ok(ExportedArtifact { file_name, path })
    }

    /// Write the cleaned dataset as `cleaned_<id>.csv`.
    pub fn write_cleaned(&self, df: &DataFrame) -> Result<ExportedArtifact> {
        let artifact = self.prepare(format!("cleaned_{}.csv", Uuid::new_v4().simple()))?;
        let mut file = File::create(&artifact.path)?;
        let mut df = df.clone();

        CsvWriter::new(&mut file)
            .include_header(true)
            .with_separator(b',')
            .with_quote_char(b'"')
            .finish(&mut df)
            .map_err(|e| TabsightError::Export(format!("failed to write cleaned CSV: {}", e)))?;

        info!("Dataset saved: {}", artifact.path.display());
        Ok(artifact)
    }

    /// Write a chart image as `<kind>_<key>_<id>.png`.
    pub fn write_chart_image(
        &self,
        kind: ChartKind,
        key: &str,
        png: &[u8],
    ) -> Result<ExportedArtifact> {
        let artifact = self.prepare(format!(
            "{}_{}_{}.png",
            kind.as_str(),
            sanitize_file_stem(key),
            Uuid::new_v4().simple()
        ))?;
        let mut file = File::create(&artifact.path)?;
        file.write_all(png)?;

        info!("Chart image saved: {}", artifact.path.display());
        Ok(artifact)
    }

    /// Remove artifacts written by a request that later failed.
    pub fn discard(&self, artifacts: &[ExportedArtifact]) {
        for artifact in artifacts {
            if let Err(e) = fs::remove_file(&artifact.path) {
                warn!(
                    "Failed to remove partial artifact {}: {}",
                    artifact.path.display(),
                    e
                );
            }
        }
    }
}

/// Replace characters that are unsafe in file names with `_`.
pub fn sanitize_file_stem(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "chart".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_file_stem() {
        assert_eq!(sanitize_file_stem("hist_unit price"), "hist_unit_price");
        assert_eq!(sanitize_file_stem("bar_a/b_by_../c"), "bar_a_b_by____c");
        assert_eq!(sanitize_file_stem(""), "chart");
    }

    #[test]
    fn test_write_cleaned_csv() {
        let temp = TempDir::new().unwrap();
        let store = ExportStore::new(temp.path().join("exports"));
        let df = df!["a" => [1i64, 2], "b" => ["x", "y"]].unwrap();

        let artifact = store.write_cleaned(&df).unwrap();

        assert!(artifact.file_name.starts_with("cleaned_"));
        assert!(artifact.file_name.ends_with(".csv"));
        assert!(artifact.url().starts_with("/download/cleaned_"));
        let content = fs::read_to_string(&artifact.path).unwrap();
        assert!(content.starts_with("a,b"));
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn test_artifact_names_are_unique() {
        let temp = TempDir::new().unwrap();
        let store = ExportStore::new(temp.path());

        let first = store
            .write_chart_image(ChartKind::Histogram, "hist_a", b"png")
            .unwrap();
        let second = store
            .write_chart_image(ChartKind::Histogram, "hist_a", b"png")
            .unwrap();

        assert_ne!(first.file_name, second.file_name);
        assert!(first.file_name.starts_with("histogram_hist_a_"));
        assert_eq!(fs::read(&first.path).unwrap(), b"png");
    }

    #[test]
    fn test_discard_removes_files() {
        let temp = TempDir::new().unwrap();
        let store = ExportStore::new(temp.path());
        let artifact = store
            .write_chart_image(ChartKind::Pie, "pie_c_distribution", b"png")
            .unwrap();

        store.discard(std::slice::from_ref(&artifact));
        assert!(!artifact.path.exists());
    }
}
