//! Batch download of pending tiles
//!
//! Requests run concurrently on a bounded pool; results flow back to the one
//! loop that owns the ledger, so `mark_fetched` is only ever called from a
//! single place. A failed tile is recorded and the batch moves on; retrying is
//! left to the next run.

use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};

use super::client::{looks_like_image, FetchError, TileClient};
use super::ledger::TileLedger;
use super::source::TileSource;
use super::storage::TileStore;
use crate::core::config::TileProvisionConfig;
use crate::core::constants::{
    DEFAULT_CHECKPOINT_EVERY, DEFAULT_CONCURRENCY, MAX_CHECKPOINTS, MAX_CONCURRENCY,
};
use crate::core::geo::TileCoord;
use crate::prelude::Arc;
use crate::Result;

/// Configuration for the tile loader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileLoaderConfig {
    /// Maximum concurrent tile downloads
    pub max_concurrent: usize,
    /// Persist the ledger after this many successful downloads. Raised for
    /// large ledgers so a batch writes at most [`MAX_CHECKPOINTS`] of them.
    pub checkpoint_every: usize,
}

impl Default for TileLoaderConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_CONCURRENCY,
            checkpoint_every: DEFAULT_CHECKPOINT_EVERY,
        }
    }
}

impl From<&TileProvisionConfig> for TileLoaderConfig {
    fn from(config: &TileProvisionConfig) -> Self {
        Self {
            max_concurrent: config.concurrency.clamp(1, MAX_CONCURRENCY),
            checkpoint_every: config.checkpoint_every.max(1),
        }
    }
}

/// Outcome of one download batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadReport {
    pub attempted: usize,
    pub succeeded: usize,
    /// Tiles that could not be fetched, in coordinate order
    pub failed: Vec<TileCoord>,
    /// Entries of the ledger still unfetched after the batch
    pub remaining: usize,
}

impl DownloadReport {
    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }
}

/// Downloads pending tiles from a [`TileSource`] into a [`TileStore`]
pub struct TileLoader {
    source: Arc<dyn TileSource>,
    client: Arc<dyn TileClient>,
    config: TileLoaderConfig,
}

impl TileLoader {
    pub fn new(
        source: Arc<dyn TileSource>,
        client: Arc<dyn TileClient>,
        config: TileLoaderConfig,
    ) -> Self {
        Self {
            source,
            client,
            config,
        }
    }

    /// Fetches every pending entry of `ledger`, writing tiles to `store`.
    ///
    /// The ledger is checkpointed to `store` periodically and once more at
    /// the end. Every checkpoint rewrites the whole ledger, so the interval
    /// grows with its size. Only a failure to persist the ledger aborts the
    /// batch.
    pub async fn download(
        &self,
        ledger: &mut TileLedger,
        store: &dyn TileStore,
    ) -> Result<DownloadReport> {
        let jobs: Vec<(TileCoord, PathBuf)> = ledger
            .pending()
            .map(|entry| (entry.coord, entry.path.clone()))
            .collect();

        let mut report = DownloadReport {
            attempted: jobs.len(),
            ..DownloadReport::default()
        };
        if jobs.is_empty() {
            return Ok(report);
        }

        let checkpoint_every = self.checkpoint_interval(ledger.len());
        log::debug!(
            "downloading {} tiles with up to {} concurrent requests, checkpoint every {}",
            jobs.len(),
            self.config.max_concurrent,
            checkpoint_every
        );

        let mut results = stream::iter(jobs)
            .map(|(coord, path)| async move {
                let result = self.fetch_tile(coord, &path, store).await;
                (coord, result)
            })
            .buffer_unordered(self.config.max_concurrent);

        let mut since_checkpoint = 0usize;
        while let Some((coord, result)) = results.next().await {
            match result {
                Ok(size) => {
                    log::debug!("downloaded tile {} ({} bytes)", coord, size);
                    ledger.mark_fetched(&coord);
                    report.succeeded += 1;
                    since_checkpoint += 1;

                    if since_checkpoint >= checkpoint_every {
                        ledger.persist(store).await?;
                        since_checkpoint = 0;
                        log::info!(
                            "fetched {}/{} tiles ({} failed)",
                            report.succeeded,
                            report.attempted,
                            report.failed.len()
                        );
                    }
                }
                Err(e) => {
                    log::warn!("tile {} download failed: {}", coord, e);
                    report.failed.push(coord);
                }
            }
        }
        drop(results);

        ledger.persist(store).await?;

        report.failed.sort();
        report.remaining = ledger.pending_count();
        Ok(report)
    }

    fn checkpoint_interval(&self, ledger_len: usize) -> usize {
        self.config
            .checkpoint_every
            .max(ledger_len / MAX_CHECKPOINTS)
            .max(1)
    }

    async fn fetch_tile(
        &self,
        coord: TileCoord,
        path: &Path,
        store: &dyn TileStore,
    ) -> std::result::Result<usize, FetchError> {
        let url = self.source.url(coord);
        let data = self.client.get(&url).await?;
        if !looks_like_image(&data) {
            return Err(FetchError::NotAnImage(data.len()));
        }
        store.write(path, &data).await?;
        Ok(data.len())
    }
}
