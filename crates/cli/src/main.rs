//! Verdant CLI - vegetation-index time series from Earth Engine

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use verdant_chart::{save_chart, ChartStyle, ColorScheme, MarkerColor};
use verdant_cloud::auth::BearerAuth;
use verdant_cloud::lowering::series_expression;
use verdant_cloud::{EarthEngineOptions, EarthEngineSource};
use verdant_core::index::NDVI_FORMULA;
use verdant_core::query::{DEFAULT_CLOUD_PROPERTY, DEFAULT_COLLECTION};
use verdant_core::{
    collect_series, AreaOfInterest, IndexDefinition, LatLon, ReductionRequest, SceneFilter,
    TimeRange,
};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "verdant")]
#[command(
    author,
    version,
    about = "Vegetation-index time series from Earth Engine, plotted to PNG",
    long_about = None
)]
struct Cli {
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    // ── Area of interest ─────────────────────────────────────────────
    /// Latitude of the AOI center (decimal degrees)
    #[arg(long, default_value = "-31.7668", allow_hyphen_values = true)]
    lat: f64,

    /// Longitude of the AOI center (decimal degrees)
    #[arg(long, default_value = "-52.3448", allow_hyphen_values = true)]
    lon: f64,

    /// Buffer radius around the center, in meters
    #[arg(long, default_value = "5000")]
    buffer: f64,

    // ── Scene filter ─────────────────────────────────────────────────
    /// First day of the time range (YYYY-MM-DD, inclusive)
    #[arg(long, default_value = "2020-01-01")]
    start: NaiveDate,

    /// Last day of the time range (YYYY-MM-DD, inclusive)
    #[arg(long, default_value = "2023-12-31")]
    end: NaiveDate,

    /// Keep scenes with cloud cover strictly below this percentage
    #[arg(long, default_value = "10")]
    max_cloud: f64,

    /// Image collection id
    #[arg(long, default_value = DEFAULT_COLLECTION)]
    collection: String,

    /// Scene property holding the cloud-cover percentage
    #[arg(long, default_value = DEFAULT_CLOUD_PROPERTY)]
    cloud_property: String,

    // ── Index ────────────────────────────────────────────────────────
    /// Band bound to the RED alias
    #[arg(long, default_value = "B4")]
    red: String,

    /// Band bound to the NIR alias
    #[arg(long, default_value = "B8")]
    nir: String,

    /// Custom index formula over band aliases, e.g. "2.5 * (NIR - RED) / (NIR + 6 * RED - 7.5 * BLUE + 1)"
    #[arg(long)]
    formula: Option<String>,

    /// Extra alias binding ALIAS=BAND (repeatable)
    #[arg(long = "band", value_name = "ALIAS=BAND")]
    bands: Vec<String>,

    /// Name of the derived band (default NDVI, or INDEX with --formula)
    #[arg(long)]
    index_name: Option<String>,

    /// Reduction scale in meters
    #[arg(long, default_value = "10")]
    scale: f64,

    // ── Output ───────────────────────────────────────────────────────
    /// Output chart (PNG), overwritten
    #[arg(short, long, default_value = "ndvi_time_series.png")]
    output: PathBuf,

    /// Also write the series as CSV
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Chart title
    #[arg(long)]
    title: Option<String>,

    /// Color markers by value: ndvi, divergent or grayscale
    #[arg(long, value_name = "SCHEME", value_parser = parse_scheme)]
    color_by: Option<ColorScheme>,

    /// Only write the chart; do not open it in the system viewer
    #[arg(long)]
    no_show: bool,

    /// Print the Earth Engine expression as JSON and exit without sending it
    #[arg(long)]
    print_expression: bool,

    // ── Earth Engine ─────────────────────────────────────────────────
    /// Cloud project billed for the computation
    #[arg(long, env = "EARTHENGINE_PROJECT", default_value = "earthengine-legacy")]
    project: String,

    /// OAuth2 access token (default: `gcloud auth print-access-token`)
    #[arg(long, env = "EARTHENGINE_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Request timeout in seconds (default: none)
    #[arg(long)]
    timeout: Option<u64>,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn parse_scheme(s: &str) -> std::result::Result<ColorScheme, String> {
    ColorScheme::from_name(s).ok_or_else(|| {
        let names: Vec<&str> = ColorScheme::ALL.iter().map(|c| c.name()).collect();
        format!("unknown color scheme '{}' (expected one of: {})", s, names.join(", "))
    })
}

fn parse_binding(s: &str) -> Result<(String, String)> {
    let (alias, band) = s
        .split_once('=')
        .with_context(|| format!("Invalid band binding '{}': expected ALIAS=BAND", s))?;
    let (alias, band) = (alias.trim(), band.trim());
    if alias.is_empty() || band.is_empty() {
        anyhow::bail!("Invalid band binding '{}': expected ALIAS=BAND", s);
    }
    Ok((alias.to_string(), band.to_string()))
}

fn build_index(cli: &Cli) -> Result<IndexDefinition> {
    let mut bindings = vec![
        ("NIR".to_string(), cli.nir.clone()),
        ("RED".to_string(), cli.red.clone()),
    ];
    for binding in &cli.bands {
        let (alias, band) = parse_binding(binding)?;
        match bindings.iter_mut().find(|(a, _)| *a == alias) {
            Some(existing) => existing.1 = band,
            None => bindings.push((alias, band)),
        }
    }

    let formula = cli.formula.as_deref().unwrap_or(NDVI_FORMULA);
    let default_name = if cli.formula.is_some() { "INDEX" } else { "NDVI" };
    let name = cli.index_name.as_deref().unwrap_or(default_name);

    let refs: Vec<(&str, &str)> = bindings
        .iter()
        .map(|(a, b)| (a.as_str(), b.as_str()))
        .collect();
    IndexDefinition::new(name, formula, &refs).context("Invalid index definition")
}

fn build_request(cli: &Cli) -> Result<ReductionRequest> {
    let aoi = AreaOfInterest::new(LatLon::new(cli.lat, cli.lon), cli.buffer);
    let range = TimeRange::new(cli.start, cli.end);
    let filter = SceneFilter::new(aoi, range, cli.max_cloud)
        .collection(&cli.collection)
        .cloud_property(&cli.cloud_property);
    Ok(ReductionRequest::new(filter, build_index(cli)?).scale(cli.scale))
}

fn chart_style(cli: &Cli, index_name: &str) -> ChartStyle {
    let title = match &cli.title {
        Some(t) => t.clone(),
        None => format!("{} time series ({:.4}, {:.4})", index_name, cli.lat, cli.lon),
    };
    let style = ChartStyle::for_index(index_name).title(&title);
    match cli.color_by {
        Some(scheme) => style.marker(MarkerColor::ByValue(scheme)),
        None => style,
    }
}

fn resolve_auth(token: Option<&str>) -> Result<BearerAuth> {
    match token {
        Some(t) => BearerAuth::new(t).context("Invalid access token"),
        None => BearerAuth::from_gcloud()
            .context("No access token: pass --token, set EARTHENGINE_TOKEN, or log in with gcloud"),
    }
}

/// Whether a viewer can be opened. On X11/Wayland systems this needs a display.
fn display_available() -> bool {
    if cfg!(any(target_os = "macos", target_os = "windows")) {
        return true;
    }
    ["DISPLAY", "WAYLAND_DISPLAY"]
        .iter()
        .any(|var| std::env::var_os(var).is_some_and(|v| !v.is_empty()))
}

/// Hand a file to the platform's default viewer.
fn show(path: &Path) -> Result<()> {
    let mut cmd = if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    } else {
        Command::new("xdg-open")
    };
    cmd.arg(path)
        .spawn()
        .with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(())
}

fn done(name: &str, path: &Path, samples: usize, elapsed: Duration) -> String {
    format!(
        "{} analysis complete ({} samples in {:.2?}), chart saved to: {}",
        name,
        samples,
        elapsed,
        path.display()
    )
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let request = build_request(&cli)?;
    let style = chart_style(&cli, request.index.name());

    if cli.print_expression {
        let expression = series_expression(&request);
        println!("{}", serde_json::to_string_pretty(&expression)?);
        return Ok(());
    }

    let start = Instant::now();

    let auth = resolve_auth(cli.token.as_deref())?;
    let options = EarthEngineOptions {
        project: cli.project.clone(),
        request_timeout: cli.timeout.map(Duration::from_secs),
        ..Default::default()
    };
    let source = EarthEngineSource::new(options, Box::new(auth))
        .context("Failed to create Earth Engine client")?;

    let pb = spinner("Computing index series on Earth Engine...");
    let series = collect_series(&source, &request);
    pb.finish_and_clear();
    let series = series.context("Earth Engine request failed")?;

    if series.is_empty() {
        warn!("No samples: no scene matched the filter or every scene was masked");
    } else if let Some((lo, hi)) = series.value_range() {
        info!("{} samples, {} range [{:.4}, {:.4}]", series.len(), series.name(), lo, hi);
    }

    let pb = spinner("Rendering chart...");
    let saved = save_chart(&series, &style, &cli.output);
    pb.finish_and_clear();
    saved.with_context(|| format!("Failed to write {}", cli.output.display()))?;

    if let Some(csv) = &cli.csv {
        series
            .save_csv(csv)
            .with_context(|| format!("Failed to write {}", csv.display()))?;
        info!("Series written to {}", csv.display());
    }

    println!(
        "{}",
        done(series.name(), &cli.output, series.len(), start.elapsed())
    );

    if cli.no_show {
        debug!("Display disabled with --no-show");
    } else if !display_available() {
        info!("No display detected, not opening {}", cli.output.display());
    } else if let Err(e) = show(&cli.output) {
        warn!("{:#}", e);
    }

    Ok(())
}
