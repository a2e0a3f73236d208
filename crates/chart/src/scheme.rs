//! Chart colors and value ramps.

/// RGB color as (r, g, b) with values in 0..=255.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const WHITE: Self = Self::new(255, 255, 255);
    pub const BLACK: Self = Self::new(0, 0, 0);
    /// Default series color (matplotlib `C0`).
    pub const SERIES_BLUE: Self = Self::new(31, 119, 180);
    pub const GRID_GRAY: Self = Self::new(221, 221, 221);
    pub const TEXT_GRAY: Self = Self::new(38, 38, 38);

    pub(crate) fn to_pixel(self) -> image::Rgb<u8> {
        image::Rgb([self.r, self.g, self.b])
    }
}

/// A color stop: position in [0, 1] mapped to an RGB color.
#[derive(Debug, Clone, Copy)]
pub struct ColorStop {
    pub t: f64,
    pub color: Rgb,
}

impl ColorStop {
    pub const fn new(t: f64, r: u8, g: u8, b: u8) -> Self {
        Self {
            t,
            color: Rgb::new(r, g, b),
        }
    }
}

/// Ramps for coloring markers by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorScheme {
    /// Brown -> Yellow -> Green
    Ndvi,
    /// Blue -> White -> Red
    Divergent,
    /// Black -> White
    Grayscale,
}

impl ColorScheme {
    pub const ALL: &[ColorScheme] = &[Self::Ndvi, Self::Divergent, Self::Grayscale];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Ndvi => "ndvi",
            Self::Divergent => "divergent",
            Self::Grayscale => "grayscale",
        }
    }

    /// Look a scheme up by [`name`](Self::name), case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|s| s.name().eq_ignore_ascii_case(name))
    }
}

const NDVI_STOPS: &[ColorStop] = &[
    ColorStop::new(0.0, 120, 70, 20),
    ColorStop::new(0.3, 200, 170, 60),
    ColorStop::new(0.5, 240, 230, 100),
    ColorStop::new(0.7, 100, 180, 50),
    ColorStop::new(1.0, 10, 100, 20),
];

const DIVERGENT_STOPS: &[ColorStop] = &[
    ColorStop::new(0.00, 44, 62, 180),
    ColorStop::new(0.25, 120, 160, 220),
    ColorStop::new(0.50, 240, 240, 240),
    ColorStop::new(0.75, 220, 120, 80),
    ColorStop::new(1.00, 180, 30, 30),
];

// ─── Interpolation ─────────────────────────────────────────────────────

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn lerp_color(c1: Rgb, c2: Rgb, t: f64) -> Rgb {
    Rgb::new(
        lerp(c1.r as f64, c2.r as f64, t).round() as u8,
        lerp(c1.g as f64, c2.g as f64, t).round() as u8,
        lerp(c1.b as f64, c2.b as f64, t).round() as u8,
    )
}

fn multi_stop(stops: &[ColorStop], t: f64) -> Rgb {
    if t.is_nan() || t <= 0.0 {
        return stops[0].color;
    }
    if t >= 1.0 {
        return stops[stops.len() - 1].color;
    }
    for i in 1..stops.len() {
        if t <= stops[i].t {
            let ratio = (t - stops[i - 1].t) / (stops[i].t - stops[i - 1].t);
            return lerp_color(stops[i - 1].color, stops[i].color, ratio);
        }
    }
    stops[stops.len() - 1].color
}

/// Evaluate a scheme at normalized position `t` ∈ [0, 1]; outside is clamped.
pub fn evaluate(scheme: ColorScheme, t: f64) -> Rgb {
    match scheme {
        ColorScheme::Ndvi => multi_stop(NDVI_STOPS, t),
        ColorScheme::Divergent => multi_stop(DIVERGENT_STOPS, t),
        ColorScheme::Grayscale => {
            let v = (t.clamp(0.0, 1.0) * 255.0).round() as u8;
            Rgb::new(v, v, v)
        }
    }
}
