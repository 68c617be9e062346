//! Command-line front end: reads AOI uploads, plans the two-date water map,
//! registers it with a catalog and prints the map document as JSON.
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use geo::BoundingRect;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mndwi_core::aoi::Session;
use mndwi_core::catalog::memory::SyntheticSpec;
use mndwi_core::classify::GapPolicy;
use mndwi_core::map::MapDocument;
use mndwi_core::pipeline::{DateStats, MapPlan};
use mndwi_core::raster::Grid;
use mndwi_core::window::DateWindow;
use mndwi_core::{
    parse_uploads, AccessibilityMode, CloudThreshold, InMemoryCatalog, MapRequest, MndwiPipeline,
    ViewerConfig,
};

// ── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "mndwi-viewer",
    about = "Plan and render a two-date MNDWI surface-water map as a JSON map document"
)]
struct Args {
    /// GeoJSON upload(s) defining the area of interest (repeatable)
    #[arg(long = "aoi")]
    aoi: Vec<PathBuf>,

    /// Initial anchor date (YYYY-MM-DD); defaults to today minus two days
    #[arg(long)]
    initial: Option<NaiveDate>,

    /// Updated anchor date (YYYY-MM-DD); defaults to today minus two days
    #[arg(long)]
    updated: Option<NaiveDate>,

    /// Cloud cover upper bound in percent (5..=100, step 5)
    #[arg(long)]
    cloud: Option<CloudThreshold>,

    /// Palette mode, e.g. "Normal" or "Banjir Tinggi"
    #[arg(long, default_value = "Normal")]
    mode: AccessibilityMode,

    /// Treatment of index values outside every class range: pass_through | no_data_class
    #[arg(long)]
    gap_policy: Option<GapPolicy>,

    /// Viewer configuration JSON
    #[arg(long)]
    config: Option<PathBuf>,

    /// Scene catalog fixture JSON; a seeded synthetic catalog is used when absent
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Seed of the synthetic catalog
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Pixels per side of synthetic scenes
    #[arg(long, default_value = "64")]
    grid: usize,

    /// Evaluate the masked index and include per-class pixel counts
    #[arg(long)]
    stats: bool,

    /// Write the document here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Serialize)]
struct Output {
    document: MapDocument,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<Vec<DateStats>>,
}

// ── Setup ────────────────────────────────────────────────────────────────────

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<ViewerConfig> {
    let Some(path) = path else {
        return Ok(ViewerConfig::default());
    };
    let text = fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))?;
    ViewerConfig::from_json(&text).with_context(|| format!("Invalid config {}", path.display()))
}

fn build_request(args: &Args, config: &ViewerConfig) -> MapRequest {
    let mut request = MapRequest::defaults(config);
    if let Some(d) = args.initial {
        request.initial_date = d;
    }
    if let Some(d) = args.updated {
        request.updated_date = d;
    }
    if let Some(c) = args.cloud {
        request.cloud_threshold = c;
    }
    if let Some(g) = args.gap_policy {
        request.gap_policy = g;
    }
    request.mode = args.mode;
    request
}

/// Synthetic scenes covering the AOI bounds (or a degree around the fallback
/// point) for both acquisition windows.
fn synthetic_catalog(args: &Args, plan: &MapPlan, config: &ViewerConfig) -> InMemoryCatalog {
    let grid = match plan.aoi.to_multi_polygon().bounding_rect() {
        Some(r) => Grid::new(args.grid, args.grid, r.min().x, r.max().x, r.min().y, r.max().y),
        None => {
            let p = config.fallback_point;
            Grid::new(args.grid, args.grid, p.lon - 0.5, p.lon + 0.5, p.lat - 0.5, p.lat + 0.5)
        }
    };
    let windows: Vec<DateWindow> = [&plan.initial, &plan.updated]
        .iter()
        .map(|p| p.composite.root_query().window)
        .collect();
    let mut spec = SyntheticSpec::new(args.seed, grid, windows);
    spec.collection = config.collection.clone();
    spec.cloud_property = config.cloud_property.clone();
    InMemoryCatalog::synthetic(&spec)
}

// ── Main ─────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = load_config(args.config.as_ref())?;
    let request = build_request(&args, &config);

    let mut uploads = Vec::with_capacity(args.aoi.len());
    for path in &args.aoi {
        uploads.push(fs::read(path).with_context(|| format!("Cannot read {}", path.display()))?);
    }
    let upload = parse_uploads(&uploads).context("Failed to parse AOI upload")?;
    if upload.geometries.is_empty() {
        warn!(fallback = ?config.fallback_point, "no AOI geometry; using fallback point");
    }

    let pipeline = MndwiPipeline::new(config);
    let mut session = Session::new();
    let plan = pipeline.plan(&request, upload, &mut session);

    let catalog = match &args.catalog {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))?;
            InMemoryCatalog::from_json(&text).with_context(|| format!("Invalid catalog {}", path.display()))?
        }
        None => {
            info!(seed = args.seed, "no catalog fixture; generating synthetic scenes");
            synthetic_catalog(&args, &plan, pipeline.config())
        }
    };
    info!(scenes = catalog.scene_count(), "catalog ready");

    let document = pipeline.render(&plan, &catalog).context("Failed to render map")?;
    let stats = if args.stats {
        Some(pipeline.stats(&plan, &catalog).context("Failed to evaluate index statistics")?)
    } else {
        None
    };

    let json = serde_json::to_string_pretty(&Output { document, stats })?;
    match &args.output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Cannot write {}", path.display()))?;
            info!(path = %path.display(), "map document written");
        }
        None => println!("{json}"),
    }
    Ok(())
}
