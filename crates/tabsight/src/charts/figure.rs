//! Plotly-style figure descriptions for client-side re-rendering.

use super::{ChartSource, ChartSpec};
use crate::ingest::format_timestamp;
use serde_json::{Value, json};

const TEMPLATE: &str = "plotly_dark";

fn layout(title: &str, x_title: Option<&str>, y_title: Option<&str>) -> Value {
    let mut layout = json!({
        "title": { "text": title },
        "template": TEMPLATE,
    });
    if let Some(x) = x_title {
        layout["xaxis"] = json!({ "title": { "text": x } });
    }
    if let Some(y) = y_title {
        layout["yaxis"] = json!({ "title": { "text": y } });
    }
    layout
}

fn number(value: Option<f64>) -> Value {
    value
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Structured figure for a chart spec: `{ "data": [trace], "layout": {...} }`.
pub fn figure_for(spec: &ChartSpec) -> Value {
    let title = spec.display_title();

    match &spec.source {
        ChartSource::Histogram {
            column,
            values,
            bin_count,
            ..
        } => json!({
            "data": [{
                "type": "histogram",
                "name": column,
                "x": values,
                "nbinsx": bin_count,
            }],
            "layout": layout(title, Some(column), Some("count")),
        }),
        ChartSource::Bar {
            category,
            metric,
            groups,
        } => json!({
            "data": [{
                "type": "bar",
                "name": metric,
                "x": groups.iter().map(|g| g.label.clone()).collect::<Vec<_>>(),
                "y": groups.iter().map(|g| number(g.mean)).collect::<Vec<_>>(),
            }],
            "layout": layout(title, Some(category), Some(metric)),
        }),
        ChartSource::Pie { column, slices } => json!({
            "data": [{
                "type": "pie",
                "name": column,
                "labels": slices.iter().map(|s| s.label.as_str()).collect::<Vec<_>>(),
                "values": slices.iter().map(|s| s.count).collect::<Vec<_>>(),
            }],
            "layout": layout(title, None, None),
        }),
        ChartSource::Line { x, y, points } => json!({
            "data": [{
                "type": "scatter",
                "mode": "lines+markers",
                "name": y,
                "x": points.iter().map(|p| format_timestamp(p.timestamp)).collect::<Vec<_>>(),
                "y": points.iter().map(|p| number(p.value)).collect::<Vec<_>>(),
            }],
            "layout": layout(title, Some(x), Some(y)),
        }),
        ChartSource::Scatter { x, y, points } => json!({
            "data": [{
                "type": "scatter",
                "mode": "markers",
                "x": points.iter().map(|p| p.0).collect::<Vec<_>>(),
                "y": points.iter().map(|p| p.1).collect::<Vec<_>>(),
            }],
            "layout": layout(title, Some(x), Some(y)),
        }),
        ChartSource::Heatmap {
            columns,
            matrix,
            text,
        } => json!({
            "data": [{
                "type": "heatmap",
                "z": matrix
                    .iter()
                    .map(|row| row.iter().map(|v| number(*v)).collect::<Vec<_>>())
                    .collect::<Vec<_>>(),
                "x": columns,
                "y": columns,
                "text": text,
                "texttemplate": "%{text}",
                "colorscale": "RdBu_r",
                "zmin": -1,
                "zmax": 1,
            }],
            "layout": layout(title, None, None),
        }),
    }
}
