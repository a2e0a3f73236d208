//! Time-series line chart rendering.
//!
//! Draws an [`IndexSeries`] as markers joined by line segments on a white
//! canvas with a frame, grid, tick labels, title and axis labels, then
//! encodes it as PNG.

use std::path::Path;

use chrono::{DateTime, Utc};
use image::{ImageFormat, RgbImage};
use tracing::debug;
use verdant_core::IndexSeries;

use crate::error::Result;
use crate::font::{draw_text, draw_text_vertical, text_height, text_width, vertical_text_height};
use crate::scheme::{evaluate, ColorScheme, Rgb};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// How series markers are colored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarkerColor {
    Fixed(Rgb),
    /// Position of the value within the y axis range, through a ramp.
    ByValue(ColorScheme),
}

/// Layout and labels of a chart.
#[derive(Debug, Clone)]
pub struct ChartStyle {
    pub width: u32,
    pub height: u32,
    pub margin_left: u32,
    pub margin_right: u32,
    pub margin_top: u32,
    pub margin_bottom: u32,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub background: Rgb,
    pub frame: Rgb,
    pub grid: Rgb,
    pub text: Rgb,
    pub line: Rgb,
    pub marker: MarkerColor,
    pub marker_radius: u32,
    pub line_width: u32,
    /// Font pixel size for tick labels; titles are drawn one step larger.
    pub font_scale: u32,
    /// Number of date ticks along x.
    pub x_ticks: usize,
    /// Approximate number of value ticks along y.
    pub y_ticks: usize,
}

impl Default for ChartStyle {
    /// 12x6 in at 100 dpi.
    fn default() -> Self {
        Self {
            width: 1200,
            height: 600,
            margin_left: 90,
            margin_right: 30,
            margin_top: 50,
            margin_bottom: 70,
            title: "NDVI time series".into(),
            x_label: "Date".into(),
            y_label: "NDVI".into(),
            background: Rgb::WHITE,
            frame: Rgb::BLACK,
            grid: Rgb::GRID_GRAY,
            text: Rgb::TEXT_GRAY,
            line: Rgb::SERIES_BLUE,
            marker: MarkerColor::Fixed(Rgb::SERIES_BLUE),
            marker_radius: 4,
            line_width: 2,
            font_scale: 2,
            x_ticks: 6,
            y_ticks: 6,
        }
    }
}

impl ChartStyle {
    /// Default layout with the index name on the y axis.
    pub fn for_index(name: &str) -> Self {
        Self {
            title: format!("{} time series", name),
            y_label: name.to_string(),
            ..Self::default()
        }
    }

    pub fn for_series(series: &IndexSeries) -> Self {
        Self::for_index(series.name())
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn marker(mut self, marker: MarkerColor) -> Self {
        self.marker = marker;
        self
    }

    /// Plot area as `(left, top, right, bottom)` pixel edges.
    pub fn plot_area(&self) -> (i64, i64, i64, i64) {
        (
            self.margin_left as i64,
            self.margin_top as i64,
            self.width.saturating_sub(self.margin_right) as i64,
            self.height.saturating_sub(self.margin_bottom) as i64,
        )
    }
}

// ---------------------------------------------------------------------------
// Axes
// ---------------------------------------------------------------------------

/// Linear mapping from a data interval onto a pixel interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Axis {
    pub min: f64,
    pub max: f64,
    pixel_from: f64,
    pixel_to: f64,
}

impl Axis {
    pub fn new(min: f64, max: f64, pixel_from: i64, pixel_to: i64) -> Self {
        Self {
            min,
            max,
            pixel_from: pixel_from as f64,
            pixel_to: pixel_to as f64,
        }
    }

    pub fn to_pixel(&self, v: f64) -> f64 {
        let span = self.max - self.min;
        let t = if span.abs() < f64::EPSILON {
            0.5
        } else {
            (v - self.min) / span
        };
        self.pixel_from + t * (self.pixel_to - self.pixel_from)
    }

    /// Normalized position of `v` within the axis range.
    pub fn fraction(&self, v: f64) -> f64 {
        let span = self.max - self.min;
        if span.abs() < f64::EPSILON {
            0.5
        } else {
            (v - self.min) / span
        }
    }
}

/// Value range with 5 % padding; a flat or empty series gets a fixed window.
pub fn value_limits(series: &IndexSeries) -> (f64, f64) {
    match series.value_range() {
        None => (-1.0, 1.0),
        Some((lo, hi)) if (hi - lo).abs() < 1e-12 => (lo - 0.1, hi + 0.1),
        Some((lo, hi)) => {
            let pad = (hi - lo) * 0.05;
            (lo - pad, hi + pad)
        }
    }
}

/// Time range in epoch milliseconds with 5 % padding, or `None` when empty.
pub fn time_limits(series: &IndexSeries) -> Option<(f64, f64)> {
    let (first, last) = series.time_span()?;
    let (lo, hi) = (
        first.timestamp_millis() as f64,
        last.timestamp_millis() as f64,
    );
    if hi - lo < 1.0 {
        Some((lo - MILLIS_PER_DAY, hi + MILLIS_PER_DAY))
    } else {
        let pad = (hi - lo) * 0.05;
        Some((lo - pad, hi + pad))
    }
}

/// 1, 2 or 5 times a power of ten, at least `raw`.
pub fn nice_step(raw: f64) -> f64 {
    if !(raw.is_finite() && raw > 0.0) {
        return 1.0;
    }
    let magnitude = 10f64.powf(raw.log10().floor());
    let residual = raw / magnitude;
    // Tolerate rounding in `powf`
    let nice = if residual <= 1.0 + 1e-9 {
        1.0
    } else if residual <= 2.0 + 1e-9 {
        2.0
    } else if residual <= 5.0 + 1e-9 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

/// Tick positions covering `[min, max]` at a nice step.
pub fn value_ticks(min: f64, max: f64, target: usize) -> (Vec<f64>, f64) {
    let step = nice_step((max - min) / target.max(2).saturating_sub(1) as f64);
    let first = (min / step).ceil() * step;
    let mut ticks = Vec::new();
    let mut i = 0;
    loop {
        let t = first + i as f64 * step;
        if t > max + step * 1e-9 {
            break;
        }
        // Avoid printing -0.0
        ticks.push(if t.abs() < step * 1e-9 { 0.0 } else { t });
        i += 1;
    }
    (ticks, step)
}

/// Label for a value tick with just enough decimals for `step`.
pub fn format_value(v: f64, step: f64) -> String {
    let decimals = (-step.log10().floor()).max(0.0) as usize;
    format!("{:.*}", decimals, v)
}

/// Evenly spaced date ticks over the series' own span.
pub fn date_ticks(series: &IndexSeries, count: usize) -> Vec<DateTime<Utc>> {
    let Some((first, last)) = series.time_span() else {
        return Vec::new();
    };
    if first == last || count < 2 {
        return vec![first];
    }
    let (lo, hi) = (first.timestamp_millis(), last.timestamp_millis());
    (0..count)
        .filter_map(|i| {
            let t = lo + ((hi - lo) as f64 * i as f64 / (count - 1) as f64).round() as i64;
            DateTime::from_timestamp_millis(t)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render `series` into an RGB image.
///
/// An empty series still yields a complete chart: frame, grid, title and
/// axis labels, with no data line and no date ticks.
pub fn render_line_chart(series: &IndexSeries, style: &ChartStyle) -> RgbImage {
    let mut img = RgbImage::from_pixel(style.width, style.height, style.background.to_pixel());
    let (left, top, right, bottom) = style.plot_area();
    let scale = style.font_scale.max(1);

    let (vmin, vmax) = value_limits(series);
    let y_axis = Axis::new(vmin, vmax, bottom, top);
    let x_axis = time_limits(series).map(|(lo, hi)| Axis::new(lo, hi, left, right));

    // Grid and y ticks
    let (ticks, step) = value_ticks(vmin, vmax, style.y_ticks);
    for v in &ticks {
        let y = y_axis.to_pixel(*v).round() as i64;
        draw_hline(&mut img, left, right, y, style.grid);
        draw_hline(&mut img, left - 5, left, y, style.frame);
        let label = format_value(*v, step);
        draw_text(
            &mut img,
            left - 10 - text_width(&label, scale) as i64,
            y - (text_height(scale) / 2) as i64,
            &label,
            scale,
            style.text,
        );
    }

    // Grid and x ticks
    if let Some(x_axis) = &x_axis {
        for t in date_ticks(series, style.x_ticks) {
            let x = x_axis.to_pixel(t.timestamp_millis() as f64).round() as i64;
            draw_vline(&mut img, x, top, bottom, style.grid);
            draw_vline(&mut img, x, bottom, bottom + 5, style.frame);
            let label = t.format("%Y-%m-%d").to_string();
            draw_text(
                &mut img,
                x - (text_width(&label, scale) / 2) as i64,
                bottom + 10,
                &label,
                scale,
                style.text,
            );
        }
    }

    // Frame
    draw_hline(&mut img, left, right, top, style.frame);
    draw_hline(&mut img, left, right, bottom, style.frame);
    draw_vline(&mut img, left, top, bottom, style.frame);
    draw_vline(&mut img, right, top, bottom, style.frame);

    // Title and axis labels
    let title_scale = scale + 1;
    draw_text(
        &mut img,
        (style.width as i64 - text_width(&style.title, title_scale) as i64) / 2,
        (top - text_height(title_scale) as i64) / 2,
        &style.title,
        title_scale,
        style.text,
    );
    draw_text(
        &mut img,
        (left + right - text_width(&style.x_label, scale) as i64) / 2,
        style.height as i64 - 10 - text_height(scale) as i64,
        &style.x_label,
        scale,
        style.text,
    );
    draw_text_vertical(
        &mut img,
        (5 * scale) as i64 + 4,
        (top + bottom - vertical_text_height(&style.y_label, scale) as i64) / 2,
        &style.y_label,
        scale,
        style.text,
    );

    // Data
    if let Some(x_axis) = &x_axis {
        let points: Vec<(i64, i64, f64)> = series
            .iter()
            .map(|s| {
                (
                    x_axis.to_pixel(s.timestamp.timestamp_millis() as f64).round() as i64,
                    y_axis.to_pixel(s.value).round() as i64,
                    s.value,
                )
            })
            .collect();

        for pair in points.windows(2) {
            let (x0, y0, _) = pair[0];
            let (x1, y1, _) = pair[1];
            draw_line(&mut img, x0, y0, x1, y1, style.line_width, style.line);
        }
        for (x, y, v) in &points {
            let color = match style.marker {
                MarkerColor::Fixed(c) => c,
                MarkerColor::ByValue(scheme) => evaluate(scheme, y_axis.fraction(*v)),
            };
            fill_circle(&mut img, *x, *y, style.marker_radius as i64, color);
        }
        debug!("plotted {} points", points.len());
    }

    img
}

/// Render and write a PNG, overwriting `path`.
pub fn save_chart(series: &IndexSeries, style: &ChartStyle, path: &Path) -> Result<()> {
    let img = render_line_chart(series, style);
    img.save_with_format(path, ImageFormat::Png)?;
    debug!("wrote {}x{} chart to {}", img.width(), img.height(), path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

fn put(img: &mut RgbImage, x: i64, y: i64, color: Rgb) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, color.to_pixel());
    }
}

fn draw_hline(img: &mut RgbImage, x0: i64, x1: i64, y: i64, color: Rgb) {
    for x in x0.min(x1)..=x0.max(x1) {
        put(img, x, y, color);
    }
}

fn draw_vline(img: &mut RgbImage, x: i64, y0: i64, y1: i64, color: Rgb) {
    for y in y0.min(y1)..=y0.max(y1) {
        put(img, x, y, color);
    }
}

/// Bresenham line, thickened with a square brush.
fn draw_line(img: &mut RgbImage, x0: i64, y0: i64, x1: i64, y1: i64, width: u32, color: Rgb) {
    let half = (width.max(1) as i64 - 1) / 2;
    let extra = (width.max(1) as i64 - 1) - half;
    let (dx, dy) = ((x1 - x0).abs(), -(y1 - y0).abs());
    let (sx, sy) = (if x0 < x1 { 1 } else { -1 }, if y0 < y1 { 1 } else { -1 });
    let (mut x, mut y, mut err) = (x0, y0, dx + dy);

    loop {
        for bx in -half..=extra {
            for by in -half..=extra {
                put(img, x + bx, y + by, color);
            }
        }
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

fn fill_circle(img: &mut RgbImage, cx: i64, cy: i64, r: i64, color: Rgb) {
    for y in -r..=r {
        for x in -r..=r {
            if x * x + y * y <= r * r {
                put(img, cx + x, cy + y, color);
            }
        }
    }
}
