//! Prelude module for common offline-tiles types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use offline_tiles::prelude::*;`

pub use crate::core::{
    config::TileProvisionConfig,
    geo::{project, LatLng, LatLngBounds, TileCoord},
};

pub use crate::tiles::{
    client::{FetchError, HttpTileClient, TileClient},
    coverage::{plan, TileSet},
    ledger::{TileEntry, TileLedger},
    list::TileList,
    loader::{DownloadReport, TileLoader, TileLoaderConfig},
    source::{TileSource, UrlTemplateSource},
    storage::{DiskStore, MemoryStore, TileStore},
};

pub use crate::{Result, TileError};

pub use std::sync::{Arc, Mutex};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};
