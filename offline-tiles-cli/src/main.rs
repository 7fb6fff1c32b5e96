//! offline-tiles - provision map tiles next to an exported dataset
//!
//! Reads the points of the dataset, plans the tiles covering them, skips what
//! a previous run already stored below `<outdir>/tiles` and downloads the rest.

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use offline_tiles::prelude::*;
use offline_tiles::tiles::coverage::estimate;

#[derive(Parser, Debug)]
#[command(name = "offline-tiles")]
#[command(about = "Download the map tiles needed to browse a dataset offline", long_about = None)]
struct Args {
    /// JSON file with an array of points (`lat`/`lng` or `latitude`/`longitude`)
    #[arg(long)]
    points: PathBuf,

    /// Export directory; tiles are stored below `<outdir>/tiles`
    #[arg(long, default_value = "offline")]
    outdir: PathBuf,

    /// JSON file with provisioning settings, overridden by the flags below
    #[arg(long, env = "OFFLINE_TILES_CONFIG")]
    config: Option<PathBuf>,

    /// Padding in degrees of longitude at zoom 5
    #[arg(long)]
    padding: Option<f64>,

    /// Highest zoom level to download (at most 12)
    #[arg(long)]
    max_zoom: Option<u8>,

    /// Tile server URL template with {z}, {x}, {y} and optionally {s}
    #[arg(long, env = "OFFLINE_TILES_URL")]
    url_template: Option<String>,

    /// Maximum concurrent downloads
    #[arg(long)]
    concurrency: Option<usize>,

    /// Start from fewer concurrent downloads and more frequent checkpoints
    /// when no config file is given
    #[arg(long)]
    low_resource: bool,

    /// Re-check tiles recorded as downloaded and fetch the ones that vanished
    #[arg(long)]
    verify: bool,

    /// Plan and check existing tiles, but do not download anything
    #[arg(long)]
    dry_run: bool,
}

/// One record of the points file. Records without a location are skipped.
#[derive(Debug, Deserialize)]
struct PointRecord {
    #[serde(default, alias = "latitude")]
    lat: Option<f64>,
    #[serde(default, alias = "longitude", alias = "lon")]
    lng: Option<f64>,
}

fn parse_points(data: &[u8]) -> Result<Vec<LatLng>> {
    let records: Vec<PointRecord> =
        serde_json::from_slice(data).context("points file must be a JSON array of points")?;

    let points: Vec<LatLng> = records
        .iter()
        .filter_map(|r| match (r.lat, r.lng) {
            (Some(lat), Some(lng)) => Some(LatLng::new(lat, lng)),
            _ => None,
        })
        .collect();

    if points.len() < records.len() {
        log::info!(
            "{} of {} records have no location",
            records.len() - points.len(),
            records.len()
        );
    }
    Ok(points)
}

fn load_config(args: &Args) -> Result<TileProvisionConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let data = std::fs::read(path)
                .with_context(|| format!("could not read config {}", path.display()))?;
            serde_json::from_slice(&data)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None if args.low_resource => TileProvisionConfig::low_resource(),
        None => TileProvisionConfig::default(),
    };

    if let Some(padding) = args.padding {
        config.padding = padding;
    }
    if let Some(max_zoom) = args.max_zoom {
        config.max_zoom = max_zoom;
    }
    if let Some(template) = &args.url_template {
        config.url_template = template.clone();
    }
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }

    config.validate()?;
    Ok(config)
}

fn tile_root(outdir: &Path) -> PathBuf {
    outdir.join("tiles")
}

async fn run(args: Args) -> Result<bool> {
    let config = load_config(&args)?;

    let data = std::fs::read(&args.points)
        .with_context(|| format!("could not read points {}", args.points.display()))?;
    let points = parse_points(&data)?;
    if points.is_empty() {
        bail!("{} contains no points with a location", args.points.display());
    }

    let root = tile_root(&args.outdir);
    let mut list = TileList::open_dir(&root, config.clone())
        .await
        .with_context(|| format!("could not open tile directory {}", root.display()))?;

    if args.verify {
        let reset = list.verify().await?;
        if reset > 0 {
            log::warn!("{} tiles recorded as downloaded are missing", reset);
        }
    }

    for (zoom, count) in estimate(&points, config.padding, config.max_zoom)? {
        log::debug!("zoom {:>2}: {} tiles", zoom, count);
    }

    list.create(&points)?;
    let missing = list.prune().await?;
    println!("Must download {} tiles", missing);

    if args.dry_run || missing == 0 {
        return Ok(true);
    }

    let report = list.download().await?;
    println!(
        "Downloaded {} of {} tiles, {} still missing",
        report.succeeded, report.attempted, report.remaining
    );
    Ok(report.is_complete())
}

#[tokio::main]
async fn main() {
    env_logger::init();

    match run(Args::parse()).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
