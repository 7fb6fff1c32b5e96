//! Core constants for tile planning and provisioning.
//! Keeping them in a single place makes it easier to tweak engine-wide magic numbers.

/// Latitude limit of the Web Mercator projection, in degrees.
pub const MAX_LATITUDE: f64 = 85.0511287798;

/// Longitude limit, in degrees.
pub const MAX_LONGITUDE: f64 = 180.0;

/// Zoom level at which the coverage padding is specified.
pub const PADDING_REFERENCE_ZOOM: u8 = 5;

/// Maximum zoom levels must stay strictly below this value; tile counts grow as 4^zoom.
pub const ZOOM_LIMIT: u8 = 13;

/// Default maximal zoom level for planned tiles.
pub const DEFAULT_MAX_ZOOM: u8 = 10;

/// Default padding in degrees of longitude at the reference zoom.
pub const DEFAULT_PADDING: f64 = 8.0;

/// File extension of stored tiles.
pub const TILE_EXTENSION: &str = "png";

/// Name of the persisted tile list, relative to the tile root.
pub const TILE_LIST_FILE: &str = "tilelist.json";

/// Files smaller than this are treated as missing (truncated or empty downloads).
pub const DEFAULT_MIN_TILE_BYTES: u64 = 64;

/// Default number of concurrent tile requests.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Upper bound on concurrent tile requests.
pub const MAX_CONCURRENCY: usize = 16;

/// Persist the tile list after this many successful downloads.
pub const DEFAULT_CHECKPOINT_EVERY: usize = 64;

/// Upper bound on checkpoints per download batch; large tile lists are
/// checkpointed no more often than every `len / MAX_CHECKPOINTS` successes.
pub const MAX_CHECKPOINTS: usize = 100;

/// Default OpenStreetMap tile template.
pub const DEFAULT_URL_TEMPLATE: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";

/// User agent sent with every tile request; public tile servers reject anonymous clients.
pub const DEFAULT_USER_AGENT: &str = concat!("offline-tiles/", env!("CARGO_PKG_VERSION"));

/// Per-request timeout in milliseconds.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Transport-level attempts per tile request.
pub const DEFAULT_MAX_ATTEMPTS: usize = 2;
