//! # offline-tiles
//!
//! Offline map-tile provisioning for static dataset exports.
//!
//! Given the locations a map has to show, this crate works out which
//! slippy-map tiles are needed from zoom 0 up to a maximum zoom, remembers in
//! a persisted tile list which of them are already on disk, and downloads the
//! rest from a remote tile server. Every step can be re-run: tiles fetched by
//! an earlier run are never requested again.
//!
//! ```no_run
//! use offline_tiles::prelude::*;
//!
//! # async fn run() -> offline_tiles::Result<()> {
//! let config = TileProvisionConfig::default().with_coverage(8, 8.0);
//! let mut tiles = TileList::open_dir("offline/tiles", config).await?;
//! tiles.create(&[LatLng::new(52.52, 13.405), LatLng::new(48.86, 2.35)])?;
//! if tiles.prune().await? > 0 {
//!     let report = tiles.download().await?;
//!     println!("{} tiles still missing", report.remaining);
//! }
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod prelude;
pub mod tiles;
pub use crate::core::constants;

// Re-export public API
pub use core::{
    config::TileProvisionConfig,
    geo::{project, LatLng, LatLngBounds, TileCoord},
};

pub use tiles::{
    coverage::plan, ledger::TileLedger, list::TileList, loader::DownloadReport,
    loader::TileLoader,
};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, TileError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum TileError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Planning error: {0}")]
    Planning(String),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Tile list error: {0}")]
    Ledger(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Error type alias for convenience
pub type Error = TileError;
