//! Caller-facing tile list
//!
//! [`TileList`] ties the pieces together for an exporter: open the tile root
//! (loading any tile list left by a previous run), `create` a plan for the
//! dataset's points, `prune` what is already on disk and `download` the rest.
//! Every step is safe to repeat.

use std::path::PathBuf;

use super::client::{HttpTileClient, TileClient};
use super::coverage::plan;
use super::ledger::{LedgerStats, TileLedger};
use super::loader::{DownloadReport, TileLoader, TileLoaderConfig};
use super::source::{TileSource, UrlTemplateSource};
use super::storage::{DiskStore, TileStore};
use crate::core::config::TileProvisionConfig;
use crate::core::geo::LatLng;
use crate::prelude::Arc;
use crate::{Result, TileError};

pub struct TileList {
    store: Arc<dyn TileStore>,
    loader: TileLoader,
    config: TileProvisionConfig,
    ledger: TileLedger,
}

impl TileList {
    /// Validates `config`, checks that `store` is writable and loads the
    /// tile list of a previous run, if any. Fails before any network activity.
    pub async fn open(
        store: Arc<dyn TileStore>,
        client: Arc<dyn TileClient>,
        config: TileProvisionConfig,
    ) -> Result<Self> {
        config.validate()?;
        store.prepare().await?;

        let ledger = TileLedger::load(store.as_ref()).await?;
        let source: Arc<dyn TileSource> = Arc::new(UrlTemplateSource::from_config(&config));
        let loader = TileLoader::new(source, client, TileLoaderConfig::from(&config));

        Ok(Self {
            store,
            loader,
            config,
            ledger,
        })
    }

    /// Opens a tile list in a directory, fetching over HTTP
    pub async fn open_dir(root: impl Into<PathBuf>, config: TileProvisionConfig) -> Result<Self> {
        let client = HttpTileClient::new(&config)?;
        Self::open(Arc::new(DiskStore::new(root)), Arc::new(client), config).await
    }

    /// Plans the tiles covering `points` and merges them into the list.
    /// Returns how many tiles were not tracked before.
    pub fn create(&mut self, points: &[LatLng]) -> Result<usize> {
        let usable: Vec<LatLng> = points
            .iter()
            .filter(|p| p.lat.is_finite() && p.lng.is_finite())
            .copied()
            .collect();
        if usable.len() < points.len() {
            log::warn!(
                "skipping {} points without usable coordinates",
                points.len() - usable.len()
            );
        }
        if usable.is_empty() {
            return Err(TileError::Planning(
                "no points with coordinates, nothing to plan a map for".to_string(),
            ));
        }

        let tiles = plan(&usable, self.config.padding, self.config.max_zoom)?;
        let planned = tiles.len();
        let added = self.ledger.seed(tiles);
        log::info!(
            "planned {} tiles up to zoom {} ({} new)",
            planned,
            self.config.max_zoom,
            added
        );
        Ok(added)
    }

    /// Marks tiles already present in storage as fetched and persists the
    /// list. Returns the number of tiles that still have to be downloaded.
    pub async fn prune(&mut self) -> Result<usize> {
        let missing = self
            .ledger
            .reconcile(self.store.as_ref(), self.config.min_tile_bytes)
            .await?;
        self.persist().await?;
        Ok(missing)
    }

    /// Downloads every missing tile. Individual failures are reported, not raised.
    pub async fn download(&mut self) -> Result<DownloadReport> {
        let pending = self.ledger.pending_count();
        if pending > 0 {
            log::info!("Must download {} tiles", pending);
        }

        let report = self
            .loader
            .download(&mut self.ledger, self.store.as_ref())
            .await?;

        if report.is_complete() {
            log::info!("all {} tiles are available", self.ledger.len());
        } else {
            log::warn!(
                "{} tiles could not be downloaded, run again to retry",
                report.remaining
            );
        }
        Ok(report)
    }

    /// Re-checks tiles marked as fetched and resets those missing from
    /// storage. Returns how many were reset.
    pub async fn verify(&mut self) -> Result<usize> {
        let reset = self
            .ledger
            .audit(self.store.as_ref(), self.config.min_tile_bytes)
            .await?;
        if reset > 0 {
            self.persist().await?;
        }
        Ok(reset)
    }

    pub async fn persist(&self) -> Result<()> {
        self.ledger.persist(self.store.as_ref()).await
    }

    pub fn ledger(&self) -> &TileLedger {
        &self.ledger
    }

    pub fn stats(&self) -> LedgerStats {
        self.ledger.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles::client::FetchError;
    use crate::tiles::storage::MemoryStore;
    use async_trait::async_trait;

    struct Unreachable;

    #[async_trait]
    impl TileClient for Unreachable {
        async fn get(&self, _url: &str) -> std::result::Result<Vec<u8>, FetchError> {
            Err(FetchError::Http("offline".to_string()))
        }
    }

    async fn open_memory(store: MemoryStore) -> Result<TileList> {
        TileList::open(
            Arc::new(store),
            Arc::new(Unreachable),
            TileProvisionConfig::for_testing(),
        )
        .await
    }

    #[tokio::test]
    async fn test_create_requires_points() {
        let mut list = open_memory(MemoryStore::new()).await.unwrap();
        assert!(matches!(list.create(&[]), Err(TileError::Planning(_))));
        assert!(matches!(
            list.create(&[LatLng::new(f64::NAN, 3.0)]),
            Err(TileError::Planning(_))
        ));
        assert!(list.ledger().is_empty());
    }

    #[tokio::test]
    async fn test_open_rejects_bad_config_before_storage() {
        let mut config = TileProvisionConfig::for_testing();
        config.max_zoom = 14;
        let store = Arc::new(MemoryStore::read_only());
        let result = TileList::open(store, Arc::new(Unreachable), config).await;
        assert!(matches!(result, Err(TileError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_open_rejects_unwritable_storage() {
        let result = open_memory(MemoryStore::read_only()).await;
        assert!(matches!(result, Err(TileError::Storage(_))));
    }

    #[tokio::test]
    async fn test_failed_downloads_stay_pending() {
        let store = MemoryStore::new();
        let mut list = open_memory(store.clone()).await.unwrap();
        list.create(&[LatLng::new(10.0, 10.0)]).unwrap();
        let missing = list.prune().await.unwrap();
        assert_eq!(missing, list.ledger().len());

        let report = list.download().await.unwrap();
        assert_eq!(report.succeeded, 0);
        assert_eq!(report.remaining, missing);
        assert_eq!(report.failed.len(), missing);

        // the list was persisted and survives a reopen
        let reopened = open_memory(store).await.unwrap();
        assert_eq!(reopened.ledger().pending_count(), missing);
    }
}
