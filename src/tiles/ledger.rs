//! Persisted record of planned tiles and their fetch status
//!
//! The ledger is the only place that knows whether a tile has been fetched.
//! It is seeded from a coverage plan, reconciled against local storage,
//! updated by the loader as downloads succeed and written to
//! `tilelist.json` next to the tile tree, so that an interrupted or repeated
//! run picks up where the previous one stopped.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::storage::TileStore;
use crate::core::constants::{TILE_LIST_FILE, ZOOM_LIMIT};
use crate::core::geo::TileCoord;
use crate::{Result, TileError};

const FORMAT_VERSION: u32 = 1;

/// One planned tile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileEntry {
    pub coord: TileCoord,
    pub fetched: bool,
    /// Location relative to the tile root
    pub path: PathBuf,
}

impl TileEntry {
    pub fn new(coord: TileCoord) -> Self {
        Self {
            coord,
            fetched: false,
            path: coord.relative_path(),
        }
    }
}

/// Fetch progress of a ledger
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerStats {
    pub total: usize,
    pub fetched: usize,
    pub pending: usize,
    /// `(zoom, total, fetched)` for every zoom level present
    pub per_zoom: Vec<(u8, usize, usize)>,
}

#[derive(Serialize, Deserialize)]
struct LedgerFile {
    version: u32,
    tiles: Vec<TileEntry>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TileLedger {
    entries: BTreeMap<TileCoord, TileEntry>,
}

impl TileLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, coord: &TileCoord) -> Option<&TileEntry> {
        self.entries.get(coord)
    }

    pub fn entries(&self) -> impl Iterator<Item = &TileEntry> {
        self.entries.values()
    }

    /// Merges planned tiles into the ledger. Coordinates already tracked keep
    /// their status. Returns the number of newly added entries.
    pub fn seed<I>(&mut self, tiles: I) -> usize
    where
        I: IntoIterator<Item = TileCoord>,
    {
        let before = self.entries.len();
        for coord in tiles {
            self.entries
                .entry(coord)
                .or_insert_with(|| TileEntry::new(coord));
        }
        self.entries.len() - before
    }

    /// Marks every unfetched entry whose file already exists in `store` with
    /// at least `min_bytes` bytes as fetched. Never resets a fetched entry.
    /// Returns the number of entries still waiting for download.
    pub async fn reconcile(&mut self, store: &dyn TileStore, min_bytes: u64) -> Result<usize> {
        let mut found = 0usize;
        let mut missing = 0usize;

        for entry in self.entries.values_mut().filter(|e| !e.fetched) {
            match store.size(&entry.path).await? {
                Some(size) if size >= min_bytes => {
                    entry.fetched = true;
                    found += 1;
                }
                Some(size) => {
                    log::debug!(
                        "tile {} is only {} bytes, treating as missing",
                        entry.coord,
                        size
                    );
                    missing += 1;
                }
                None => missing += 1,
            }
        }

        log::debug!(
            "reconciled tile list: {} found on disk, {} missing",
            found,
            missing
        );
        Ok(missing)
    }

    /// Re-checks fetched entries against `store` and resets those whose file
    /// disappeared or is smaller than `min_bytes`. Returns how many were reset.
    pub async fn audit(&mut self, store: &dyn TileStore, min_bytes: u64) -> Result<usize> {
        let mut reset = 0usize;
        for entry in self.entries.values_mut().filter(|e| e.fetched) {
            let size = store.size(&entry.path).await?;
            if !matches!(size, Some(size) if size >= min_bytes) {
                log::warn!(
                    "tile {} is marked fetched but missing from {}",
                    entry.coord,
                    store.describe()
                );
                entry.fetched = false;
                reset += 1;
            }
        }
        Ok(reset)
    }

    /// Entries still waiting for download, in coordinate order
    pub fn pending(&self) -> impl Iterator<Item = &TileEntry> {
        self.entries.values().filter(|e| !e.fetched)
    }

    pub fn pending_count(&self) -> usize {
        self.pending().count()
    }

    /// Records a successful download. Returns `true` if the entry changed.
    /// Unknown coordinates are ignored.
    pub fn mark_fetched(&mut self, coord: &TileCoord) -> bool {
        match self.entries.get_mut(coord) {
            Some(entry) if !entry.fetched => {
                entry.fetched = true;
                true
            }
            Some(_) => false,
            None => {
                log::warn!("ignoring fetch of untracked tile {}", coord);
                false
            }
        }
    }

    pub fn stats(&self) -> LedgerStats {
        let mut per_zoom: BTreeMap<u8, (usize, usize)> = BTreeMap::new();
        for entry in self.entries.values() {
            let counts = per_zoom.entry(entry.coord.z).or_default();
            counts.0 += 1;
            if entry.fetched {
                counts.1 += 1;
            }
        }

        let fetched: usize = per_zoom.values().map(|(_, f)| f).sum();
        LedgerStats {
            total: self.entries.len(),
            fetched,
            pending: self.entries.len() - fetched,
            per_zoom: per_zoom
                .into_iter()
                .map(|(zoom, (total, fetched))| (zoom, total, fetched))
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        let file = LedgerFile {
            version: FORMAT_VERSION,
            tiles: self.entries.values().cloned().collect(),
        };
        Ok(serde_json::to_vec(&file)?)
    }

    pub fn from_json(data: &[u8]) -> Result<Self> {
        let file: LedgerFile = serde_json::from_slice(data)?;
        if file.version != FORMAT_VERSION {
            return Err(TileError::Ledger(format!(
                "unsupported tile list version {}",
                file.version
            )));
        }

        let mut entries = BTreeMap::new();
        for mut entry in file.tiles {
            if entry.coord.z >= ZOOM_LIMIT {
                return Err(TileError::Ledger(format!(
                    "tile list contains tile {} beyond zoom limit {}",
                    entry.coord, ZOOM_LIMIT
                )));
            }
            if !entry.coord.is_valid() {
                return Err(TileError::Ledger(format!(
                    "tile list contains invalid tile {}",
                    entry.coord
                )));
            }
            // paths are derived, never trusted from the file
            entry.path = entry.coord.relative_path();
            entries.insert(entry.coord, entry);
        }
        Ok(Self { entries })
    }

    /// Writes the ledger to [`TILE_LIST_FILE`] in `store`
    pub async fn persist(&self, store: &dyn TileStore) -> Result<()> {
        let data = self.to_json()?;
        store.write(Path::new(TILE_LIST_FILE), &data).await?;
        log::debug!(
            "persisted {} tile entries to {}",
            self.entries.len(),
            store.describe()
        );
        Ok(())
    }

    /// Loads the ledger from `store`; a missing file yields an empty ledger
    pub async fn load(store: &dyn TileStore) -> Result<Self> {
        match store.read(Path::new(TILE_LIST_FILE)).await? {
            Some(data) => {
                let ledger = Self::from_json(&data)?;
                log::debug!(
                    "loaded {} tile entries from {}",
                    ledger.len(),
                    store.describe()
                );
                Ok(ledger)
            }
            None => Ok(Self::new()),
        }
    }
}
