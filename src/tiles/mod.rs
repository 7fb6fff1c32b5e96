pub mod client;
pub mod coverage;
pub mod ledger;
pub mod list;
pub mod loader;
pub mod source;
pub mod storage;

// Re-exports for convenience
pub use client::{FetchError, HttpTileClient, TileClient};
pub use coverage::{estimate, plan, TileSet, TileSpan};
pub use ledger::{LedgerStats, TileEntry, TileLedger};
pub use list::TileList;
pub use loader::{DownloadReport, TileLoader, TileLoaderConfig};
pub use source::{TileSource, UrlTemplateSource};
pub use storage::{DiskStore, MemoryStore, TileStore};
