//! # Chart
//! Line charts of report histories, rendered to SVG with plotters.
//!
//! A [`Chart`] is one or more vertically stacked [`Panel`]s; each panel plots
//! date-indexed [`Series`]. Rendering only reads the history handed to it, so a
//! failure here never touches persisted data.

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::error::RenderError;

pub use plotters::style::RGBColor;
pub use plotters::style::{BLACK, BLUE, GREEN, RED};

#[derive(Debug, Clone)]
pub struct Series {
    pub label: String,
    pub points: Vec<(NaiveDate, f64)>,
    pub color: RGBColor,
    /// Print each point's value with this many decimals.
    pub value_labels: Option<usize>,
}

impl Series {
    pub fn new(label: impl Into<String>, points: Vec<(NaiveDate, f64)>, color: RGBColor) -> Self {
        Self {
            label: label.into(),
            points,
            color,
            value_labels: None,
        }
    }

    pub fn with_value_labels(mut self, decimals: usize) -> Self {
        self.value_labels = Some(decimals);
        self
    }
}

#[derive(Debug, Clone)]
pub struct Panel {
    pub title: String,
    pub y_label: String,
    pub series: Vec<Series>,
}

#[derive(Debug, Clone)]
pub struct Chart {
    pub panels: Vec<Panel>,
    pub size: (u32, u32),
}

impl Chart {
    pub fn single(panel: Panel, size: (u32, u32)) -> Self {
        Self {
            panels: vec![panel],
            size,
        }
    }

    pub fn point_count(&self) -> usize {
        self.panels
            .iter()
            .flat_map(|p| p.series.iter())
            .map(|s| s.points.len())
            .sum()
    }
}

fn backend<E: std::fmt::Display>(e: E) -> RenderError {
    RenderError::Backend(e.to_string())
}

fn at_midnight(d: NaiveDate) -> DateTime<Utc> {
    d.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc()
}

/// Render `chart` to an SVG file at `output`, creating parent dirs.
pub fn render(chart: &Chart, output: &Path) -> Result<(), RenderError> {
    if chart.point_count() == 0 {
        let title = chart
            .panels
            .first()
            .map(|p| p.title.clone())
            .unwrap_or_default();
        return Err(RenderError::EmptyHistory(title));
    }
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| RenderError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let root = SVGBackend::new(output, chart.size).into_drawing_area();
    root.fill(&WHITE).map_err(backend)?;
    let areas = root.split_evenly((chart.panels.len(), 1));
    for (panel, area) in chart.panels.iter().zip(areas.iter()) {
        draw_panel(panel, area)?;
    }
    root.present().map_err(backend)?;
    tracing::info!(target: "report", path = %output.display(), points = chart.point_count(), "chart saved");
    Ok(())
}

fn draw_panel(panel: &Panel, area: &DrawingArea<SVGBackend<'_>, Shift>) -> Result<(), RenderError> {
    let all: Vec<(NaiveDate, f64)> = panel
        .series
        .iter()
        .flat_map(|s| s.points.iter().copied())
        .collect();
    // a panel with nothing in the window stays blank
    let Some((x0, x1, y0, y1)) = bounds(&all) else {
        return Ok(());
    };

    let mut ctx = ChartBuilder::on(area)
        .caption(&panel.title, ("sans-serif", 22).into_font())
        .margin(15)
        .x_label_area_size(55)
        .y_label_area_size(70)
        .build_cartesian_2d(x0..x1, y0..y1)
        .map_err(backend)?;

    ctx.configure_mesh()
        .x_desc("Date")
        .y_desc(panel.y_label.as_str())
        .x_labels(12)
        .x_label_formatter(&|d| d.format("%Y-%m-%d").to_string())
        .draw()
        .map_err(backend)?;

    for s in &panel.series {
        let color = s.color;
        let pts: Vec<(DateTime<Utc>, f64)> =
            s.points.iter().map(|(d, v)| (at_midnight(*d), *v)).collect();

        ctx.draw_series(LineSeries::new(pts.iter().copied(), color.stroke_width(2)))
            .map_err(backend)?
            .label(s.label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 15, y)], color));
        ctx.draw_series(pts.iter().map(|p| Circle::new(*p, 3, color.filled())))
            .map_err(backend)?;

        if let Some(decimals) = s.value_labels {
            ctx.draw_series(pts.iter().map(|p| {
                Text::new(format!("{:.*}", decimals, p.1), *p, ("sans-serif", 11).into_font())
            }))
            .map_err(backend)?;
        }
    }

    ctx.configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(backend)?;
    Ok(())
}

/// Axis ranges with a little headroom; a single day or a flat line still gets a visible span.
fn bounds(points: &[(NaiveDate, f64)]) -> Option<(DateTime<Utc>, DateTime<Utc>, f64, f64)> {
    let first = points.first()?;
    let (mut d0, mut d1, mut v0, mut v1) = (first.0, first.0, first.1, first.1);
    for &(d, v) in points {
        d0 = d0.min(d);
        d1 = d1.max(d);
        v0 = v0.min(v);
        v1 = v1.max(v);
    }
    let pad = if v1 > v0 {
        (v1 - v0) * 0.1
    } else {
        v0.abs().max(1.0) * 0.05
    };
    Some((
        at_midnight(d0.pred_opt().unwrap_or(d0)),
        at_midnight(d1.succ_opt().unwrap_or(d1)),
        v0 - pad,
        v1 + pad,
    ))
}
