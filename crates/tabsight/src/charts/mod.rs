//! Chart selection and rendering.
//!
//! The selector turns a cleaned dataset and its column roles into an ordered
//! list of [`ChartSpec`]s. A [`ChartRenderer`] turns each spec into a PNG and
//! a plotly-style figure description.

mod correlation;
mod figure;
mod render;
mod selector;

pub use correlation::{correlation_matrix, pearson};
pub use figure::figure_for;
pub use render::{ChartRenderer, RasterRenderer, RenderError, RenderedChart};
pub use selector::{ChartSelector, select_charts};

use serde::{Deserialize, Serialize};

/// Kind of chart, in the fixed order the selector emits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Histogram,
    Bar,
    Pie,
    Line,
    Scatter,
    Heatmap,
}

impl ChartKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Histogram => "histogram",
            Self::Bar => "bar",
            Self::Pie => "pie",
            Self::Line => "line",
            Self::Scatter => "scatter",
            Self::Heatmap => "heatmap",
        }
    }
}

impl std::fmt::Display for ChartKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One histogram bin covering `[start, end)`; the last bin is closed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Mean of the metric for one category value. `label` is `None` for the
/// null group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarGroup {
    pub label: Option<String>,
    pub mean: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieSlice {
    pub label: String,
    pub count: usize,
}

/// A time series point; `timestamp` is epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimePoint {
    pub timestamp: i64,
    pub value: Option<f64>,
}

/// Data backing a chart, already aggregated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChartSource {
    Histogram {
        column: String,
        /// Finite values of the column, in row order.
        values: Vec<f64>,
        /// Configured bin count; `bins` is shorter for a constant column.
        bin_count: usize,
        bins: Vec<HistogramBin>,
    },
    Bar {
        category: String,
        metric: String,
        groups: Vec<BarGroup>,
    },
    Pie {
        column: String,
        slices: Vec<PieSlice>,
    },
    Line {
        x: String,
        y: String,
        points: Vec<TimePoint>,
    },
    Scatter {
        x: String,
        y: String,
        points: Vec<(f64, f64)>,
    },
    Heatmap {
        columns: Vec<String>,
        matrix: Vec<Vec<Option<f64>>>,
        /// Cell values formatted to a fixed precision; empty when undefined.
        text: Vec<Vec<String>>,
    },
}

/// A declarative chart: what to draw and from which data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    /// Stable identifier, unique within one response.
    pub key: String,
    pub title: String,
    pub source: ChartSource,
}

impl ChartSpec {
    /// Title for display, falling back to the key when empty.
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.key
        } else {
            &self.title
        }
    }
}
