//! Integration tests for the create → prune → download workflow, run the way
//! an exporter drives it, against an in-memory store and a fake tile server.

use async_trait::async_trait;
use offline_tiles::prelude::*;
use offline_tiles::tiles::coverage::estimate;
use std::collections::HashSet as StdHashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

const PNG: &[u8] = b"\x89PNG\r\n\x1a\n-tile-body-";

#[derive(Default)]
struct FakeTileServer {
    requests: AtomicUsize,
    failing: Mutex<StdHashSet<String>>,
}

impl FakeTileServer {
    fn fail(&self, url: impl Into<String>) {
        self.failing.lock().unwrap().insert(url.into());
    }

    fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }

    fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TileClient for FakeTileServer {
    async fn get(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(url) {
            return Err(FetchError::Status(500));
        }
        Ok(PNG.to_vec())
    }
}

fn config() -> TileProvisionConfig {
    let mut config = TileProvisionConfig::for_testing().with_coverage(4, 8.0);
    config.url_template = "https://tiles.test/{z}/{x}/{y}.png".to_string();
    config.subdomains.clear();
    config
}

fn points() -> Vec<LatLng> {
    vec![
        LatLng::new(-6.2, 106.8),
        LatLng::new(-8.65, 115.2),
        LatLng::new(-5.15, 119.4),
    ]
}

async fn open(store: &MemoryStore, server: &Arc<FakeTileServer>) -> TileList {
    TileList::open(Arc::new(store.clone()), server.clone(), config())
        .await
        .expect("open tile list")
}

#[tokio::test]
async fn test_full_run_then_rerun_needs_nothing() {
    let store = MemoryStore::new();
    let server = Arc::new(FakeTileServer::default());

    let mut list = open(&store, &server).await;
    let added = list.create(&points()).unwrap();
    let missing = list.prune().await.unwrap();
    assert_eq!(added, missing);

    let expected: u64 = estimate(&points(), 8.0, 4).unwrap().iter().map(|(_, n)| n).sum();
    assert_eq!(missing as u64, expected);

    let report = list.download().await.unwrap();
    assert_eq!(report.succeeded, missing);
    assert!(report.is_complete());
    assert_eq!(server.requests(), missing);

    // second run with identical inputs
    let mut again = open(&store, &server).await;
    assert_eq!(again.create(&points()).unwrap(), 0);
    assert_eq!(again.prune().await.unwrap(), 0);
    let report = again.download().await.unwrap();
    assert_eq!(report.attempted, 0);
    assert_eq!(server.requests(), missing);
}

#[tokio::test]
async fn test_prune_picks_up_files_from_elsewhere() {
    let store = MemoryStore::new();
    let server = Arc::new(FakeTileServer::default());

    // tiles copied in by hand, no tile list yet
    store.insert("0/0/0.png", PNG.to_vec());
    store.insert("1/1/1.png", PNG.to_vec());
    store.insert("1/0/0.png", b"".to_vec());

    let mut list = open(&store, &server).await;
    list.create(&points()).unwrap();
    let total = list.ledger().len();
    let missing = list.prune().await.unwrap();

    assert_eq!(missing, total - 2);
    assert!(list.ledger().get(&TileCoord::new(0, 0, 0)).unwrap().fetched);
    assert!(list.ledger().get(&TileCoord::new(1, 1, 1)).unwrap().fetched);

    list.download().await.unwrap();
    assert_eq!(server.requests(), missing);
}

#[tokio::test]
async fn test_failed_tiles_are_retried_by_the_next_run_only() {
    let store = MemoryStore::new();
    let server = Arc::new(FakeTileServer::default());
    server.fail("https://tiles.test/0/0/0.png");
    server.fail("https://tiles.test/1/1/1.png");

    let mut list = open(&store, &server).await;
    list.create(&points()).unwrap();
    let missing = list.prune().await.unwrap();

    let report = list.download().await.unwrap();
    assert_eq!(report.succeeded, missing - 2);
    assert_eq!(
        report.failed,
        vec![TileCoord::new(0, 0, 0), TileCoord::new(1, 1, 1)]
    );
    assert_eq!(report.remaining, 2);
    // no silent retries within a run
    assert_eq!(server.requests(), missing);

    server.heal();
    let mut rerun = open(&store, &server).await;
    rerun.create(&points()).unwrap();
    assert_eq!(rerun.prune().await.unwrap(), 2);
    let report = rerun.download().await.unwrap();
    assert_eq!(report.succeeded, 2);
    assert_eq!(server.requests(), missing + 2);
}

#[tokio::test]
async fn test_verify_resets_deleted_tiles() {
    let store = MemoryStore::new();
    let server = Arc::new(FakeTileServer::default());

    let mut list = open(&store, &server).await;
    list.create(&points()).unwrap();
    list.prune().await.unwrap();
    list.download().await.unwrap();

    store.remove(Path::new("0/0/0.png"));

    // reconcile alone trusts the tile list
    let mut rerun = open(&store, &server).await;
    assert_eq!(rerun.prune().await.unwrap(), 0);

    assert_eq!(rerun.verify().await.unwrap(), 1);
    assert_eq!(rerun.prune().await.unwrap(), 1);
    let report = rerun.download().await.unwrap();
    assert_eq!(report.succeeded, 1);
    assert!(store.contains(Path::new("0/0/0.png")));
}

#[tokio::test]
async fn test_growing_the_dataset_only_adds_tiles() {
    let store = MemoryStore::new();
    let server = Arc::new(FakeTileServer::default());

    let mut list = open(&store, &server).await;
    list.create(&points()).unwrap();
    list.prune().await.unwrap();
    list.download().await.unwrap();
    let first = list.ledger().len();

    let mut more = points();
    more.push(LatLng::new(35.68, 139.69));

    let mut rerun = open(&store, &server).await;
    let added = rerun.create(&more).unwrap();
    assert!(added > 0);
    assert_eq!(rerun.ledger().len(), first + added);
    assert_eq!(rerun.prune().await.unwrap(), added);
}

#[tokio::test]
async fn test_disk_backed_run() {
    let dir = tempfile::tempdir().unwrap();
    let server = Arc::new(FakeTileServer::default());
    let store = Arc::new(DiskStore::new(dir.path().join("tiles")));

    let mut list = TileList::open(store.clone(), server.clone(), config())
        .await
        .unwrap();
    list.create(&[LatLng::new(0.0, 0.0)]).unwrap();
    list.prune().await.unwrap();
    let report = list.download().await.unwrap();
    assert!(report.is_complete());

    assert!(dir.path().join("tiles/0/0/0.png").is_file());
    assert!(dir.path().join("tiles/2/2/2.png").is_file());
    assert!(dir.path().join("tiles/tilelist.json").is_file());

    let reopened = TileList::open(store, server, config()).await.unwrap();
    assert_eq!(reopened.ledger(), list.ledger());
    assert_eq!(reopened.stats().pending, 0);
}
