//! Chart primitives on top of plotters' SVG backend
//!
//! Reports describe *what* to draw with the small structs below and hand
//! them to a primitive together with a drawing area, so one figure can be
//! split into several panels. Categorical axes use `f64` positions
//! `0, 1, ..., n-1` with labels mapped back from the tick value.

use crate::errors::Result;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::Path;

/// Drawing area of an SVG figure
pub type Area<'a> = DrawingArea<SVGBackend<'a>, Shift>;

const FONT: &str = "sans-serif";

pub const STEEL_BLUE: RGBColor = RGBColor(70, 130, 180);
pub const TREND_RED: RGBColor = RGBColor(214, 39, 40);
pub const MEAN_GREEN: RGBColor = RGBColor(44, 160, 44);
pub const MEDIAN_GREEN: RGBColor = RGBColor(0, 128, 0);
pub const CORAL: RGBColor = RGBColor(255, 127, 80);
pub const LIGHT_BLUE: RGBColor = RGBColor(173, 216, 230);
pub const GREY: RGBColor = RGBColor(128, 128, 128);

/// Six evenly spaced samples of the viridis colour map, one per pentad
pub const VIRIDIS_6: [RGBColor; 6] = [
    RGBColor(68, 1, 84),
    RGBColor(65, 68, 135),
    RGBColor(42, 120, 142),
    RGBColor(34, 168, 132),
    RGBColor(122, 209, 81),
    RGBColor(253, 231, 37),
];

/// Cool-to-warm ramp for the twelve calendar months
pub const MONTH_RAMP: [RGBColor; 12] = [
    RGBColor(69, 117, 180),
    RGBColor(98, 149, 196),
    RGBColor(135, 181, 213),
    RGBColor(171, 208, 228),
    RGBColor(205, 230, 240),
    RGBColor(233, 245, 232),
    RGBColor(254, 242, 204),
    RGBColor(254, 217, 146),
    RGBColor(253, 184, 111),
    RGBColor(248, 141, 82),
    RGBColor(234, 96, 62),
    RGBColor(215, 48, 39),
];

/// Convert an `(r, g, b)` triple from the configuration
pub fn rgb((r, g, b): (u8, u8, u8)) -> RGBColor {
    RGBColor(r, g, b)
}

/// `color` blended 70% towards white
pub fn faded(color: RGBColor) -> RGBColor {
    let blend = |c: u8| (f64::from(c) * 0.3 + 255.0 * 0.7).round() as u8;
    RGBColor(blend(color.0), blend(color.1), blend(color.2))
}

/// Create an SVG figure at `path`, cleared to white
pub fn svg_figure(path: &Path, size: (u32, u32)) -> Result<Area<'_>> {
    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    Ok(root)
}

/// Put a figure-level title above `area` and return the remaining space
pub fn with_title<'a>(area: &Area<'a>, title: &str) -> Result<Area<'a>> {
    Ok(area.titled(title, (FONT, 22).into_font())?)
}

/// A polyline, optionally with point markers and a filled area under it
#[derive(Debug, Clone)]
pub struct Series {
    pub label: String,
    pub points: Vec<(f64, f64)>,
    pub color: RGBColor,
    pub width: u32,
    pub markers: bool,
    pub fill: bool,
}

impl Series {
    pub fn line(label: impl Into<String>, points: Vec<(f64, f64)>, color: RGBColor) -> Self {
        Self {
            label: label.into(),
            points,
            color,
            width: 2,
            markers: false,
            fill: false,
        }
    }

    #[must_use]
    pub fn with_markers(mut self) -> Self {
        self.markers = true;
        self
    }

    #[must_use]
    pub fn with_fill(mut self) -> Self {
        self.fill = true;
        self
    }

    #[must_use]
    pub fn with_width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }
}

/// Horizontal reference line
#[derive(Debug, Clone)]
pub struct RefLine {
    pub label: String,
    pub y: f64,
    pub color: RGBColor,
}

/// How x tick values are printed
#[derive(Debug, Clone)]
pub enum XAxis {
    /// Plain numbers with the given number of decimals
    Numeric(usize),
    /// Tick `i` shows `labels[i]`
    Categories(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct LineChart<'s> {
    pub title: &'s str,
    pub x_desc: &'s str,
    pub y_desc: &'s str,
    pub series: Vec<Series>,
    pub ref_lines: Vec<RefLine>,
    pub x_axis: XAxis,
}

/// One bar of a categorical bar chart
#[derive(Debug, Clone)]
pub struct Bar {
    pub label: String,
    pub value: f64,
    pub error: Option<f64>,
    pub color: RGBColor,
}

#[derive(Debug, Clone)]
pub struct BarChart<'s> {
    pub title: &'s str,
    pub x_desc: &'s str,
    pub y_desc: &'s str,
    pub bars: Vec<Bar>,
    /// Decimals of the value printed above each bar
    pub decimals: usize,
    pub suffix: &'s str,
}

/// One box of a box plot
#[derive(Debug, Clone)]
pub struct BoxGroup {
    pub label: String,
    pub values: Vec<f64>,
    pub color: RGBColor,
}

/// Vertical marker line, e.g. a mean or a median
#[derive(Debug, Clone)]
pub struct Marker {
    pub label: String,
    pub x: f64,
    pub color: RGBColor,
}

#[derive(Debug, Clone, Copy)]
pub enum Reference {
    None,
    /// `y = x` across the data range
    Identity,
    /// `y = 0`
    Zero,
    /// `y = intercept + slope * x`
    Line { slope: f64, intercept: f64 },
}

fn padded_range(min: f64, max: f64, include_zero: bool) -> std::ops::Range<f64> {
    let (mut lo, mut hi) = if min.is_finite() && max.is_finite() {
        (min, max)
    } else {
        (0.0, 1.0)
    };
    if include_zero {
        lo = lo.min(0.0);
        hi = hi.max(0.0);
    }
    if (hi - lo).abs() < f64::EPSILON {
        lo -= 1.0;
        hi += 1.0;
    }
    let pad = (hi - lo) * 0.06;
    let lo = if include_zero && lo >= 0.0 { lo } else { lo - pad };
    lo..hi + pad
}

fn extent(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

fn category_label(labels: &[String], x: f64) -> String {
    let index = x.round();
    if (x - index).abs() > 1e-6 || index < 0.0 {
        return String::new();
    }
    labels.get(index as usize).cloned().unwrap_or_default()
}

fn format_tick(axis: &XAxis, x: f64) -> String {
    match axis {
        XAxis::Numeric(decimals) => format!("{x:.decimals$}"),
        XAxis::Categories(labels) => category_label(labels, x),
    }
}

/// Line chart with optional fills and horizontal reference lines
pub fn line_chart(area: &Area<'_>, chart: &LineChart<'_>) -> Result<()> {
    let (x_min, x_max) = extent(chart.series.iter().flat_map(|s| s.points.iter().map(|p| p.0)));
    let (y_min, y_max) = extent(
        chart
            .series
            .iter()
            .flat_map(|s| s.points.iter().map(|p| p.1))
            .chain(chart.ref_lines.iter().map(|r| r.y)),
    );
    let x_range = match &chart.x_axis {
        XAxis::Categories(labels) => -0.5..(labels.len().max(1) as f64 - 0.5),
        XAxis::Numeric(_) => padded_range(x_min, x_max, false),
    };
    let any_fill = chart.series.iter().any(|s| s.fill);
    let y_range = padded_range(y_min, y_max, any_fill || y_min >= 0.0);
    let (x_lo, x_hi) = (x_range.start, x_range.end);

    let mut ctx = ChartBuilder::on(area)
        .caption(chart.title, (FONT, 20).into_font())
        .margin(12)
        .x_label_area_size(45)
        .y_label_area_size(65)
        .build_cartesian_2d(x_range, y_range)?;

    let x_fmt = |x: &f64| format_tick(&chart.x_axis, *x);
    let y_fmt = |y: &f64| format!("{y:.0}");
    let mut mesh = ctx.configure_mesh();
    mesh.x_desc(chart.x_desc)
        .y_desc(chart.y_desc)
        .x_label_formatter(&x_fmt)
        .y_label_formatter(&y_fmt);
    if let XAxis::Categories(labels) = &chart.x_axis {
        mesh.x_labels(labels.len());
    }
    mesh.draw()?;

    let mut labelled = false;
    for series in &chart.series {
        let color = series.color;
        if series.fill {
            ctx.draw_series(AreaSeries::new(
                series.points.iter().copied(),
                0.0,
                color.mix(0.2),
            ))?;
        }
        let anno = ctx.draw_series(LineSeries::new(
            series.points.iter().copied(),
            color.stroke_width(series.width),
        ))?;
        if !series.label.is_empty() {
            labelled = true;
            anno.label(series.label.clone()).legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
            });
        }
        if series.markers {
            ctx.draw_series(
                series
                    .points
                    .iter()
                    .map(|&p| Circle::new(p, 2, color.filled())),
            )?;
        }
    }

    for line in &chart.ref_lines {
        let color = line.color;
        let anno = ctx.draw_series(LineSeries::new(
            vec![(x_lo, line.y), (x_hi, line.y)],
            color.mix(0.8).stroke_width(2),
        ))?;
        if !line.label.is_empty() {
            labelled = true;
            anno.label(line.label.clone()).legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
            });
        }
    }

    if labelled {
        ctx.configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(&WHITE.mix(0.9))
            .border_style(&BLACK)
            .draw()?;
    }
    Ok(())
}

/// Categorical bar chart with optional error bars and value annotations
pub fn bar_chart(area: &Area<'_>, chart: &BarChart<'_>) -> Result<()> {
    let labels: Vec<String> = chart.bars.iter().map(|b| b.label.clone()).collect();
    let top = chart
        .bars
        .iter()
        .map(|b| b.value + b.error.unwrap_or(0.0))
        .filter(|v| v.is_finite())
        .fold(0.0_f64, f64::max);
    let y_max = if top > 0.0 { top * 1.15 } else { 1.0 };
    let n = chart.bars.len().max(1) as f64;

    let mut ctx = ChartBuilder::on(area)
        .caption(chart.title, (FONT, 20).into_font())
        .margin(12)
        .x_label_area_size(45)
        .y_label_area_size(65)
        .build_cartesian_2d(-0.5..(n - 0.5), 0.0..y_max)?;

    let x_fmt = |x: &f64| category_label(&labels, *x);
    ctx.configure_mesh()
        .disable_x_mesh()
        .x_labels(chart.bars.len())
        .x_label_formatter(&x_fmt)
        .x_desc(chart.x_desc)
        .y_desc(chart.y_desc)
        .draw()?;

    let finite = || {
        chart
            .bars
            .iter()
            .enumerate()
            .filter(|(_, b)| b.value.is_finite())
            .map(|(i, b)| (i as f64, b))
    };

    ctx.draw_series(finite().map(|(x, bar)| {
        Rectangle::new([(x - 0.38, 0.0), (x + 0.38, bar.value)], bar.color.mix(0.8).filled())
    }))?;
    ctx.draw_series(finite().map(|(x, bar)| {
        Rectangle::new([(x - 0.38, 0.0), (x + 0.38, bar.value)], BLACK.stroke_width(1))
    }))?;
    ctx.draw_series(finite().filter_map(|(x, bar)| {
        bar.error.filter(|e| e.is_finite()).map(|e| {
            ErrorBar::new_vertical(x, bar.value - e, bar.value, bar.value + e, BLACK.filled(), 10)
        })
    }))?;

    let text_style = TextStyle::from((FONT, 13).into_font()).pos(Pos::new(HPos::Center, VPos::Bottom));
    let decimals = chart.decimals;
    ctx.draw_series(finite().map(|(x, bar)| {
        let y = bar.value + bar.error.filter(|e| e.is_finite()).unwrap_or(0.0);
        Text::new(
            format!("{:.decimals$}{}", bar.value, chart.suffix),
            (x, y + y_max * 0.01),
            text_style.clone(),
        )
    }))?;
    Ok(())
}

/// Histogram of `values` with vertical markers
pub fn histogram_chart(
    area: &Area<'_>,
    title: &str,
    x_desc: &str,
    histogram: &crate::statistics::Histogram,
    color: RGBColor,
    legend: &str,
    markers: &[Marker],
) -> Result<()> {
    let x_lo = histogram.edges.first().copied().unwrap_or(0.0);
    let x_hi = histogram.edges.last().copied().unwrap_or(1.0);
    let y_max = (histogram.max_count().max(1) as f64) * 1.1;

    let mut ctx = ChartBuilder::on(area)
        .caption(title, (FONT, 20).into_font())
        .margin(12)
        .x_label_area_size(45)
        .y_label_area_size(65)
        .build_cartesian_2d(x_lo..x_hi, 0.0..y_max)?;

    ctx.configure_mesh()
        .disable_x_mesh()
        .x_desc(x_desc)
        .y_desc("Frequência")
        .x_label_formatter(&|x: &f64| format!("{x:.0}"))
        .y_label_formatter(&|y: &f64| format!("{y:.0}"))
        .draw()?;

    let bins = || {
        histogram
            .edges
            .windows(2)
            .zip(&histogram.counts)
            .map(|(edge, &count)| (edge[0], edge[1], count as f64))
    };
    let anno = ctx.draw_series(
        bins().map(|(lo, hi, count)| Rectangle::new([(lo, 0.0), (hi, count)], color.mix(0.7).filled())),
    )?;
    if !legend.is_empty() {
        anno.label(legend).legend(move |(x, y)| {
            Rectangle::new([(x, y - 5), (x + 15, y + 5)], color.mix(0.7).filled())
        });
    }
    ctx.draw_series(
        bins().map(|(lo, hi, count)| Rectangle::new([(lo, 0.0), (hi, count)], BLACK.stroke_width(1))),
    )?;

    for marker in markers {
        let color = marker.color;
        ctx.draw_series(LineSeries::new(
            vec![(marker.x, 0.0), (marker.x, y_max)],
            color.stroke_width(2),
        ))?
        .label(marker.label.clone())
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }

    if !legend.is_empty() || !markers.is_empty() {
        ctx.configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(&WHITE.mix(0.9))
            .border_style(&BLACK)
            .draw()?;
    }
    Ok(())
}

/// Box plot per group with a triangle marker at the mean
pub fn box_chart(area: &Area<'_>, title: &str, x_desc: &str, y_desc: &str, groups: &[BoxGroup]) -> Result<()> {
    let labels: Vec<String> = groups.iter().map(|g| g.label.clone()).collect();
    let (y_min, y_max) = extent(groups.iter().flat_map(|g| g.values.iter().copied()));
    let y_range = padded_range(y_min, y_max, y_min >= 0.0);
    let n = groups.len().max(1) as f64;

    let mut ctx = ChartBuilder::on(area)
        .caption(title, (FONT, 20).into_font())
        .margin(12)
        .x_label_area_size(45)
        .y_label_area_size(65)
        .build_cartesian_2d(-0.5..(n - 0.5), (y_range.start as f32)..(y_range.end as f32))?;

    let x_fmt = |x: &f64| category_label(&labels, *x);
    ctx.configure_mesh()
        .disable_x_mesh()
        .x_labels(groups.len())
        .x_label_formatter(&x_fmt)
        .x_desc(x_desc)
        .y_desc(y_desc)
        .draw()?;

    let populated = || {
        groups
            .iter()
            .enumerate()
            .filter(|(_, g)| g.values.iter().any(|v| v.is_finite()))
            .map(|(i, g)| (i as f64, g))
    };

    ctx.draw_series(populated().map(|(x, group)| {
        let finite: Vec<f64> = group.values.iter().copied().filter(|v| v.is_finite()).collect();
        let quartiles = Quartiles::new(&finite);
        Boxplot::new_vertical(x, &quartiles)
            .width(28)
            .whisker_width(0.5)
            .style(group.color.stroke_width(2))
    }))?;

    ctx.draw_series(populated().map(|(x, group)| {
        let finite: Vec<f64> = group.values.iter().copied().filter(|v| v.is_finite()).collect();
        let mean = finite.iter().sum::<f64>() / finite.len() as f64;
        TriangleMarker::new((x, mean as f32), 5, TREND_RED.filled())
    }))?;
    Ok(())
}

/// Scatter plot with an optional reference line
#[allow(clippy::too_many_arguments)]
pub fn scatter_chart(
    area: &Area<'_>,
    title: &str,
    x_desc: &str,
    y_desc: &str,
    points: &[(f64, f64)],
    color: RGBColor,
    reference: Reference,
) -> Result<()> {
    let (x_min, x_max) = extent(points.iter().map(|p| p.0));
    let (y_min, y_max) = extent(points.iter().map(|p| p.1));
    let (x_range, y_range) = match reference {
        Reference::Identity => {
            let lo = x_min.min(y_min);
            let hi = x_max.max(y_max);
            (padded_range(lo, hi, false), padded_range(lo, hi, false))
        }
        Reference::Zero => (padded_range(x_min, x_max, false), padded_range(y_min, y_max, true)),
        _ => (padded_range(x_min, x_max, false), padded_range(y_min, y_max, false)),
    };
    let (x_lo, x_hi) = (x_range.start, x_range.end);

    let mut ctx = ChartBuilder::on(area)
        .caption(title, (FONT, 18).into_font())
        .margin(12)
        .x_label_area_size(45)
        .y_label_area_size(65)
        .build_cartesian_2d(x_range, y_range)?;

    ctx.configure_mesh()
        .x_desc(x_desc)
        .y_desc(y_desc)
        .x_label_formatter(&|x: &f64| format!("{x:.1}"))
        .y_label_formatter(&|y: &f64| format!("{y:.1}"))
        .draw()?;

    ctx.draw_series(
        points
            .iter()
            .filter(|(x, y)| x.is_finite() && y.is_finite())
            .map(|&p| Circle::new(p, 4, color.mix(0.6).filled())),
    )?;

    let line = match reference {
        Reference::None => None,
        Reference::Identity => Some(vec![(x_lo, x_lo), (x_hi, x_hi)]),
        Reference::Zero => Some(vec![(x_lo, 0.0), (x_hi, 0.0)]),
        Reference::Line { slope, intercept } => Some(vec![
            (x_lo, intercept + slope * x_lo),
            (x_hi, intercept + slope * x_hi),
        ]),
    };
    if let Some(line) = line {
        ctx.draw_series(LineSeries::new(line, TREND_RED.stroke_width(2)))?;
    }
    Ok(())
}

/// Stem plot of correlations by lag with a ±`band` white-noise band
pub fn correlogram(area: &Area<'_>, title: &str, y_desc: &str, values: &[f64], band: f64, color: RGBColor) -> Result<()> {
    let max_lag = values.len().saturating_sub(1).max(1) as f64;

    let mut ctx = ChartBuilder::on(area)
        .caption(title, (FONT, 18).into_font())
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(55)
        .build_cartesian_2d(-0.5..(max_lag + 0.5), -1.05..1.05)?;

    ctx.configure_mesh()
        .x_desc("Defasagem")
        .y_desc(y_desc)
        .x_label_formatter(&|x: &f64| format!("{x:.0}"))
        .y_label_formatter(&|y: &f64| format!("{y:.1}"))
        .draw()?;

    ctx.draw_series(std::iter::once(Rectangle::new(
        [(-0.5, -band), (max_lag + 0.5, band)],
        LIGHT_BLUE.mix(0.5).filled(),
    )))?;
    ctx.draw_series(LineSeries::new(vec![(-0.5, 0.0), (max_lag + 0.5, 0.0)], BLACK.stroke_width(1)))?;
    ctx.draw_series(values.iter().enumerate().map(|(lag, &v)| {
        PathElement::new(vec![(lag as f64, 0.0), (lag as f64, v)], color.stroke_width(2))
    }))?;
    ctx.draw_series(
        values
            .iter()
            .enumerate()
            .map(|(lag, &v)| Circle::new((lag as f64, v), 3, color.filled())),
    )?;
    Ok(())
}

/// Title and a centred note, for figures whose data turned out empty
pub fn empty_chart(area: &Area<'_>, title: &str, note: &str) -> Result<()> {
    let body = with_title(area, title)?;
    let (width, height) = body.dim_in_pixel();
    let style = TextStyle::from((FONT, 16).into_font()).pos(Pos::new(HPos::Center, VPos::Center));
    body.draw_text(note, &style, ((width / 2) as i32, (height / 2) as i32))?;
    Ok(())
}
