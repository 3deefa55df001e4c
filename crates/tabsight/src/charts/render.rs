//! Chart rendering.
//!
//! [`ChartRenderer`] is the seam to a plotting backend. [`RasterRenderer`]
//! draws each chart with `plotters` into an RGB buffer and encodes it as PNG.

use super::figure::figure_for;
use super::{BarGroup, ChartSource, ChartSpec, HistogramBin, PieSlice, TimePoint};
use chrono::DateTime;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::f64::consts::PI;
use std::io::Cursor;
use thiserror::Error;

/// Rendering failure for a single chart.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("chart has no drawable data")]
    EmptyData,

    #[error("invalid canvas size {width}x{height}")]
    InvalidCanvas { width: u32, height: u32 },

    #[error("failed to draw chart: {0}")]
    Draw(String),

    #[error("failed to encode image: {0}")]
    Encode(#[from] image::ImageError),
}

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for RenderError {
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        RenderError::Draw(err.to_string())
    }
}

/// A rendered chart: PNG bytes plus the structured figure description.
#[derive(Debug, Clone)]
pub struct RenderedChart {
    pub png: Vec<u8>,
    pub figure: serde_json::Value,
}

/// Turns a chart spec into artifacts. Implementations must be safe to call
/// from several threads at once.
pub trait ChartRenderer: Send + Sync {
    fn render(&self, spec: &ChartSpec) -> Result<RenderedChart, RenderError>;
}

type Canvas<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

const FONT: &str = "sans-serif";
const MIN_SIDE: u32 = 120;
const MISSING_CELL: RGBColor = RGBColor(200, 200, 200);
const PALETTE: [RGBColor; 10] = [
    RGBColor(99, 110, 250),
    RGBColor(239, 85, 59),
    RGBColor(0, 204, 150),
    RGBColor(171, 99, 250),
    RGBColor(255, 161, 90),
    RGBColor(25, 211, 243),
    RGBColor(255, 102, 146),
    RGBColor(182, 232, 128),
    RGBColor(255, 151, 255),
    RGBColor(254, 203, 82),
];

/// Draws charts with the `plotters` bitmap backend and encodes them as PNG.
#[derive(Debug, Clone, Copy)]
pub struct RasterRenderer {
    width: u32,
    height: u32,
}

impl Default for RasterRenderer {
    fn default() -> Self {
        Self::new(1200, 700)
    }
}

impl ChartRenderer for RasterRenderer {
    fn render(&self, spec: &ChartSpec) -> Result<RenderedChart, RenderError> {
        let png = self.render_png(spec)?;
        Ok(RenderedChart {
            png,
            figure: figure_for(spec),
        })
    }
}

impl RasterRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn render_png(&self, spec: &ChartSpec) -> Result<Vec<u8>, RenderError> {
        if self.width < MIN_SIDE || self.height < MIN_SIDE {
            return Err(RenderError::InvalidCanvas {
                width: self.width,
                height: self.height,
            });
        }

        let mut buffer = vec![0u8; self.width as usize * self.height as usize * 3];
        {
            let root =
                BitMapBackend::with_buffer(&mut buffer, (self.width, self.height)).into_drawing_area();
            root.fill(&WHITE)?;

            let title = spec.display_title();
            match &spec.source {
                ChartSource::Histogram { column, bins, .. } => {
                    draw_histogram(&root, title, column, bins)?
                }
                ChartSource::Bar {
                    category,
                    metric,
                    groups,
                } => draw_bar(&root, title, category, metric, groups)?,
                ChartSource::Pie { slices, .. } => draw_pie(&root, title, slices)?,
                ChartSource::Line { x, y, points } => draw_line(&root, title, x, y, points)?,
                ChartSource::Scatter { x, y, points } => {
                    draw_scatter(&root, title, x, y, points)?
                }
                ChartSource::Heatmap {
                    columns,
                    matrix,
                    text,
                } => draw_heatmap(&root, title, columns, matrix, text)?,
            }

            root.present()?;
        }

        encode_png(&buffer, self.width, self.height)
    }
}

fn encode_png(rgb: &[u8], width: u32, height: u32) -> Result<Vec<u8>, RenderError> {
    let mut png_bytes = Vec::new();
    let encoder = PngEncoder::new(Cursor::new(&mut png_bytes));
    encoder.write_image(rgb, width, height, ExtendedColorType::Rgb8)?;
    Ok(png_bytes)
}

/// Finite min and max of `values`, padded so the range is never empty.
fn padded_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (min, max) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if min > max {
        return None;
    }
    if min == max {
        return Some((min - 0.5, max + 0.5));
    }
    let pad = (max - min) * 0.05;
    Some((min - pad, max + pad))
}

/// Label of a category segment; ticks between segments stay blank.
fn segment_label(labels: &[String], value: &SegmentValue<i32>) -> String {
    match value {
        SegmentValue::CenterOf(i) => labels.get(*i as usize).cloned().unwrap_or_default(),
        _ => String::new(),
    }
}

fn draw_histogram(
    root: &Canvas<'_>,
    title: &str,
    column: &str,
    bins: &[HistogramBin],
) -> Result<(), RenderError> {
    let peak = bins
        .iter()
        .map(|b| b.count)
        .max()
        .filter(|c| *c > 0)
        .ok_or(RenderError::EmptyData)?;
    let (lo, hi) =
        padded_range(bins.iter().flat_map(|b| [b.start, b.end])).ok_or(RenderError::EmptyData)?;

    let mut chart = ChartBuilder::on(root)
        .caption(title, (FONT, 24))
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(lo..hi, 0f64..peak as f64 * 1.1)?;
    chart
        .configure_mesh()
        .x_desc(column)
        .y_desc("count")
        .draw()?;

    chart.draw_series(bins.iter().map(|bin| {
        // a constant column has one zero-width bin; draw it across the axis
        let (start, end) = if bin.end > bin.start {
            (bin.start, bin.end)
        } else {
            (lo, hi)
        };
        Rectangle::new([(start, 0.0), (end, bin.count as f64)], PALETTE[0].filled())
    }))?;
    Ok(())
}

fn draw_bar(
    root: &Canvas<'_>,
    title: &str,
    category: &str,
    metric: &str,
    groups: &[BarGroup],
) -> Result<(), RenderError> {
    let (lo, hi) = padded_range(
        groups
            .iter()
            .filter_map(|g| g.mean)
            .filter(|m| m.is_finite())
            .chain([0.0]),
    )
    .filter(|_| groups.iter().any(|g| g.mean.is_some_and(f64::is_finite)))
    .ok_or(RenderError::EmptyData)?;
    let labels: Vec<String> = groups
        .iter()
        .map(|g| g.label.clone().unwrap_or_else(|| "null".to_string()))
        .collect();

    let mut chart = ChartBuilder::on(root)
        .caption(title, (FONT, 24))
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d((0..groups.len() as i32).into_segmented(), lo..hi)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(labels.len())
        .x_label_formatter(&|v| segment_label(&labels, v))
        .x_desc(category)
        .y_desc(metric)
        .draw()?;

    chart.draw_series(groups.iter().enumerate().filter_map(|(i, group)| {
        let mean = group.mean.filter(|m| m.is_finite())?;
        let i = i as i32;
        let mut bar = Rectangle::new(
            [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), mean)],
            PALETTE[0].filled(),
        );
        bar.set_margin(0, 0, 6, 6);
        Some(bar)
    }))?;
    Ok(())
}

/// Pie as filled sector polygons, clockwise from 12 o'clock, with a legend
/// to the right.
fn draw_pie(root: &Canvas<'_>, title: &str, slices: &[PieSlice]) -> Result<(), RenderError> {
    let total: usize = slices.iter().map(|s| s.count).sum();
    if total == 0 {
        return Err(RenderError::EmptyData);
    }

    let area = root.titled(title, (FONT, 24))?;
    let (width, height) = area.dim_in_pixel();
    let radius = (width as f64 * 0.6).min(height as f64) / 2.0 - 10.0;
    let center = (width as f64 * 0.35, height as f64 / 2.0);
    let point = |turn: f64| {
        let angle = turn * 2.0 * PI;
        (
            (center.0 + radius * angle.sin()).round() as i32,
            (center.1 - radius * angle.cos()).round() as i32,
        )
    };

    let mut start = 0.0;
    for (i, slice) in slices.iter().enumerate() {
        let end = start + slice.count as f64 / total as f64;
        let steps = ((end - start) * 360.0).ceil().max(1.0) as usize;
        let mut outline = vec![(center.0.round() as i32, center.1.round() as i32)];
        outline.extend((0..=steps).map(|k| point(start + (end - start) * k as f64 / steps as f64)));
        let color = PALETTE[i % PALETTE.len()];
        area.draw(&Polygon::new(outline, color.filled()))?;

        start = end;

        let legend_x = (width as f64 * 0.72) as i32;
        let legend_y = 20 + i as i32 * 22;
        if legend_y + 14 > height as i32 {
            continue;
        }
        area.draw(&Rectangle::new(
            [(legend_x, legend_y), (legend_x + 14, legend_y + 14)],
            color.filled(),
        ))?;
        area.draw(&Text::new(
            format!("{} ({})", slice.label, slice.count),
            (legend_x + 20, legend_y),
            (FONT, 14).into_font(),
        ))?;
    }
    Ok(())
}

fn format_day(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Time series; a null value breaks the line.
fn draw_line(
    root: &Canvas<'_>,
    title: &str,
    x: &str,
    y: &str,
    points: &[TimePoint],
) -> Result<(), RenderError> {
    let finite: Vec<(f64, f64)> = points
        .iter()
        .filter_map(|p| Some((p.timestamp as f64, p.value.filter(|v| v.is_finite())?)))
        .collect();
    let (x_lo, x_hi) = padded_range(finite.iter().map(|p| p.0)).ok_or(RenderError::EmptyData)?;
    let (y_lo, y_hi) = padded_range(finite.iter().map(|p| p.1)).ok_or(RenderError::EmptyData)?;

    let mut chart = ChartBuilder::on(root)
        .caption(title, (FONT, 24))
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)?;
    chart
        .configure_mesh()
        .x_labels(6)
        .x_label_formatter(&|ms| format_day(*ms as i64))
        .x_desc(x)
        .y_desc(y)
        .draw()?;

    let runs = points
        .split(|p| !p.value.is_some_and(f64::is_finite))
        .filter(|run| !run.is_empty());
    for run in runs {
        chart.draw_series(LineSeries::new(
            run.iter()
                .filter_map(|p| Some((p.timestamp as f64, p.value?))),
            PALETTE[0].stroke_width(2),
        ))?;
    }
    chart.draw_series(
        finite
            .iter()
            .map(|p| Circle::new(*p, 4, PALETTE[0].filled())),
    )?;
    Ok(())
}

fn draw_scatter(
    root: &Canvas<'_>,
    title: &str,
    x: &str,
    y: &str,
    points: &[(f64, f64)],
) -> Result<(), RenderError> {
    let finite: Vec<(f64, f64)> = points
        .iter()
        .copied()
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .collect();
    let (x_lo, x_hi) = padded_range(finite.iter().map(|p| p.0)).ok_or(RenderError::EmptyData)?;
    let (y_lo, y_hi) = padded_range(finite.iter().map(|p| p.1)).ok_or(RenderError::EmptyData)?;

    let mut chart = ChartBuilder::on(root)
        .caption(title, (FONT, 24))
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)?;
    chart.configure_mesh().x_desc(x).y_desc(y).draw()?;

    chart.draw_series(
        finite
            .iter()
            .map(|p| Circle::new(*p, 3, PALETTE[1].filled())),
    )?;
    Ok(())
}

/// Blue for -1, white for 0, red for +1.
fn diverging(value: f64) -> RGBColor {
    let v = value.clamp(-1.0, 1.0);
    let fade = |t: f64| (255.0 * (1.0 - t)).round() as u8;
    if v < 0.0 {
        let t = -v;
        RGBColor(fade(t), fade(t * 0.6), 255)
    } else {
        RGBColor(255, fade(v * 0.6), fade(v))
    }
}

fn draw_heatmap(
    root: &Canvas<'_>,
    title: &str,
    columns: &[String],
    matrix: &[Vec<Option<f64>>],
    text: &[Vec<String>],
) -> Result<(), RenderError> {
    let n = matrix.len() as i32;
    if n == 0 {
        return Err(RenderError::EmptyData);
    }

    let mut chart = ChartBuilder::on(root)
        .caption(title, (FONT, 24))
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(80)
        .build_cartesian_2d((0..n).into_segmented(), (0..n).into_segmented())?;
    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(columns.len())
        .y_labels(columns.len())
        .x_label_formatter(&|v| segment_label(columns, v))
        .y_label_formatter(&|v| segment_label(columns, v))
        .draw()?;

    let cells = matrix.iter().enumerate().flat_map(|(i, row)| {
        row.iter().enumerate().map(move |(j, value)| {
            let (i, j) = (i as i32, j as i32);
            let color = value.map(diverging).unwrap_or(MISSING_CELL);
            Rectangle::new(
                [
                    (SegmentValue::Exact(j), SegmentValue::Exact(i)),
                    (SegmentValue::Exact(j + 1), SegmentValue::Exact(i + 1)),
                ],
                color.filled(),
            )
        })
    });
    chart.draw_series(cells)?;

    let centered = TextStyle::from((FONT, 14).into_font()).pos(Pos::new(HPos::Center, VPos::Center));
    let labels = text.iter().enumerate().flat_map(|(i, row)| {
        let style = centered.clone();
        row.iter().enumerate().map(move |(j, cell)| {
            Text::new(
                cell.clone(),
                (SegmentValue::CenterOf(j as i32), SegmentValue::CenterOf(i as i32)),
                style.clone(),
            )
        })
    });
    chart.draw_series(labels)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::ChartKind;

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn histogram(bins: Vec<HistogramBin>) -> ChartSpec {
        ChartSpec {
            kind: ChartKind::Histogram,
            key: "hist_v".to_string(),
            title: "v Distribution".to_string(),
            source: ChartSource::Histogram {
                column: "v".to_string(),
                values: Vec::new(),
                bin_count: 20,
                bins,
            },
        }
    }

    fn decode(png: &[u8]) -> image::RgbImage {
        image::load_from_memory(png).unwrap().to_rgb8()
    }

    #[test]
    fn test_render_histogram_png() {
        let renderer = RasterRenderer::new(320, 200);
        let spec = histogram(vec![
            HistogramBin { start: 0.0, end: 1.0, count: 3 },
            HistogramBin { start: 1.0, end: 2.0, count: 1 },
        ]);
        let rendered = renderer.render(&spec).unwrap();

        assert_eq!(&rendered.png[..8], &PNG_SIGNATURE);
        assert_eq!(decode(&rendered.png).dimensions(), (320, 200));
        assert_eq!(rendered.figure["data"][0]["type"], "histogram");
    }

    #[test]
    fn test_render_constant_histogram() {
        let renderer = RasterRenderer::new(320, 200);
        let spec = histogram(vec![HistogramBin { start: 4.0, end: 4.0, count: 3 }]);
        assert!(renderer.render(&spec).is_ok());
    }

    #[test]
    fn test_render_empty_histogram_fails() {
        let renderer = RasterRenderer::new(320, 200);
        let err = renderer.render(&histogram(Vec::new())).unwrap_err();
        assert!(matches!(err, RenderError::EmptyData));
    }

    #[test]
    fn test_invalid_canvas() {
        let renderer = RasterRenderer::new(0, 0);
        let spec = histogram(vec![HistogramBin { start: 0.0, end: 1.0, count: 1 }]);
        assert!(matches!(
            renderer.render(&spec).unwrap_err(),
            RenderError::InvalidCanvas { .. }
        ));
    }

    #[test]
    fn test_render_bar_with_null_group() {
        let renderer = RasterRenderer::new(320, 200);
        let spec = ChartSpec {
            kind: ChartKind::Bar,
            key: "bar_v_by_c".to_string(),
            title: "v by c".to_string(),
            source: ChartSource::Bar {
                category: "c".to_string(),
                metric: "v".to_string(),
                groups: vec![
                    BarGroup { label: Some("a".to_string()), mean: Some(-2.0) },
                    BarGroup { label: Some("b".to_string()), mean: None },
                    BarGroup { label: None, mean: Some(3.0) },
                ],
            },
        };
        assert!(renderer.render(&spec).is_ok());
    }

    #[test]
    fn test_render_pie_fills_wedges() {
        let renderer = RasterRenderer::new(300, 300);
        let pie = ChartSpec {
            kind: ChartKind::Pie,
            key: "pie_c_distribution".to_string(),
            title: "c Distribution".to_string(),
            source: ChartSource::Pie {
                column: "c".to_string(),
                slices: vec![
                    PieSlice { label: "a".to_string(), count: 3 },
                    PieSlice { label: "b".to_string(), count: 1 },
                ],
            },
        };
        let img = decode(&renderer.render(&pie).unwrap().png);

        let palette: Vec<[u8; 3]> = PALETTE[..2]
            .iter()
            .map(|c| [c.0, c.1, c.2])
            .collect();
        let colored = img.pixels().filter(|p| palette.contains(&p.0)).count();
        assert!(colored > 1000);
    }

    #[test]
    fn test_render_line_with_gap_and_heatmap() {
        let renderer = RasterRenderer::new(320, 240);
        let line = ChartSpec {
            kind: ChartKind::Line,
            key: "line_v_over_d".to_string(),
            title: "v over d".to_string(),
            source: ChartSource::Line {
                x: "d".to_string(),
                y: "v".to_string(),
                points: vec![
                    TimePoint { timestamp: 0, value: Some(1.0) },
                    TimePoint { timestamp: 86_400_000, value: None },
                    TimePoint { timestamp: 172_800_000, value: Some(2.0) },
                    TimePoint { timestamp: 259_200_000, value: Some(4.0) },
                ],
            },
        };
        assert!(renderer.render(&line).is_ok());

        let heatmap = ChartSpec {
            kind: ChartKind::Heatmap,
            key: "heatmap_correlation".to_string(),
            title: "Correlation Heatmap".to_string(),
            source: ChartSource::Heatmap {
                columns: vec!["a".to_string(), "b".to_string()],
                matrix: vec![vec![Some(1.0), None], vec![None, Some(1.0)]],
                text: vec![
                    vec!["1.00".to_string(), String::new()],
                    vec![String::new(), "1.00".to_string()],
                ],
            },
        };
        assert!(renderer.render(&heatmap).is_ok());
    }

    #[test]
    fn test_scatter_without_finite_points_fails() {
        let renderer = RasterRenderer::default();
        let spec = ChartSpec {
            kind: ChartKind::Scatter,
            key: "scatter_b_vs_a".to_string(),
            title: "b vs a".to_string(),
            source: ChartSource::Scatter {
                x: "a".to_string(),
                y: "b".to_string(),
                points: Vec::new(),
            },
        };
        assert!(matches!(
            renderer.render(&spec).unwrap_err(),
            RenderError::EmptyData
        ));
    }

    #[test]
    fn test_diverging_endpoints() {
        assert_eq!(diverging(0.0), RGBColor(255, 255, 255));
        assert_eq!(diverging(1.0), RGBColor(255, 102, 0));
        assert_eq!(diverging(-1.0), RGBColor(0, 102, 255));
    }
}
