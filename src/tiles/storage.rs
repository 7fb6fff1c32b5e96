//! Local storage for downloaded tiles and the persisted tile list
//!
//! Paths handed to a [`TileStore`] are always relative to the store's root
//! (`<zoom>/<x>/<y>.png`, `tilelist.json`). The disk store maps them below a
//! directory; the memory store keeps everything in a map so tests can run
//! without touching the filesystem.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};

use crate::prelude::{Arc, HashMap, Mutex};

#[async_trait]
pub trait TileStore: Send + Sync {
    /// Size in bytes of the file at `path`, or `None` when it does not exist
    async fn size(&self, path: &Path) -> io::Result<Option<u64>>;

    /// Contents of the file at `path`, or `None` when it does not exist
    async fn read(&self, path: &Path) -> io::Result<Option<Vec<u8>>>;

    /// Writes `data` to `path`, creating intermediate directories
    async fn write(&self, path: &Path, data: &[u8]) -> io::Result<()>;

    /// Makes sure the store can be written to at all
    async fn prepare(&self) -> io::Result<()>;

    /// Human readable location, for log messages
    fn describe(&self) -> String;
}

/// Tiles stored below a directory on the local filesystem
#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }
}

#[async_trait]
impl TileStore for DiskStore {
    async fn size(&self, path: &Path) -> io::Result<Option<u64>> {
        match tokio::fs::metadata(self.resolve(path)).await {
            Ok(meta) if meta.is_file() => Ok(Some(meta.len())),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn read(&self, path: &Path) -> io::Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.resolve(path)).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        let target = self.resolve(path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write next to the target and rename, so an interrupted run never
        // leaves a truncated tile behind under the final name.
        let mut partial = target.clone().into_os_string();
        partial.push(".part");
        tokio::fs::write(&partial, data).await?;
        tokio::fs::rename(&partial, &target).await
    }

    async fn prepare(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        let probe = self.root.join(".write-probe");
        tokio::fs::write(&probe, b"").await?;
        tokio::fs::remove_file(&probe).await
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

/// In-memory store, shared between clones
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    files: Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>,
    read_only: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that rejects every write, to exercise storage failures
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Self::default()
        }
    }

    /// Places a file directly, bypassing the read-only flag
    pub fn insert(&self, path: impl Into<PathBuf>, data: Vec<u8>) {
        if let Ok(mut files) = self.files.lock() {
            files.insert(path.into(), data);
        }
    }

    pub fn remove(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.lock().ok()?.remove(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files
            .lock()
            .map(|files| files.contains_key(path))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.files.lock().map(|files| files.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> io::Result<std::sync::MutexGuard<'_, HashMap<PathBuf, Vec<u8>>>> {
        self.files
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "memory store lock poisoned"))
    }

    fn check_writable(&self) -> io::Result<()> {
        if self.read_only {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "memory store is read-only",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl TileStore for MemoryStore {
    async fn size(&self, path: &Path) -> io::Result<Option<u64>> {
        Ok(self.lock()?.get(path).map(|data| data.len() as u64))
    }

    async fn read(&self, path: &Path) -> io::Result<Option<Vec<u8>>> {
        Ok(self.lock()?.get(path).cloned())
    }

    async fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        self.check_writable()?;
        self.lock()?.insert(path.to_path_buf(), data.to_vec());
        Ok(())
    }

    async fn prepare(&self) -> io::Result<()> {
        self.check_writable()
    }

    fn describe(&self) -> String {
        "<memory>".to_string()
    }
}
