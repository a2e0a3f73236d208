//! # Verdant Chart
//!
//! Line charts of an [`IndexSeries`](verdant_core::IndexSeries), drawn
//! directly onto an RGB image and written as PNG. Labels use a built-in
//! 5x7 bitmap font, so no system fonts are needed.
//!
//! ## Usage
//!
//! ```ignore
//! use verdant_chart::{save_chart, ChartStyle};
//!
//! let style = ChartStyle::for_series(&series);
//! save_chart(&series, &style, Path::new("ndvi_time_series.png"))?;
//! ```

mod error;
mod font;
mod render;
mod scheme;

pub use error::{ChartError, Result};
pub use render::{
    date_ticks, nice_step, render_line_chart, save_chart, value_limits, value_ticks, Axis,
    ChartStyle, MarkerColor,
};
pub use scheme::{evaluate, ColorScheme, ColorStop, Rgb};
