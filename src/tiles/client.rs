//! Network access to the remote tile server

use async_trait::async_trait;
use std::time::Duration;

use crate::core::config::TileProvisionConfig;
use crate::{Result, TileError};

/// Failure to obtain a single tile. Never aborts a batch.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("response is not an image ({0} bytes)")]
    NotAnImage(usize),

    #[error("could not store tile: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// Whether another transport-level attempt may help
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Status(code) => *code == 429 || *code >= 500,
            Self::NotAnImage(_) | Self::Io(_) => false,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => Self::Status(status.as_u16()),
            None => Self::Http(e.to_string()),
        }
    }
}

/// Anything able to GET raw tile bytes from a URL
#[async_trait]
pub trait TileClient: Send + Sync {
    async fn get(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError>;
}

/// reqwest-backed [`TileClient`] with a per-request timeout and a fixed
/// number of transport-level attempts.
///
/// Requests carry the configured User-Agent so that public tile servers
/// (e.g. OpenStreetMap) don't reject them.
#[derive(Debug, Clone)]
pub struct HttpTileClient {
    client: reqwest::Client,
    max_attempts: usize,
    retry_delay: Duration,
}

impl HttpTileClient {
    pub fn new(config: &TileProvisionConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout())
            .tcp_keepalive(Duration::from_secs(30))
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(config.concurrency.max(1))
            .build()
            .map_err(|e| TileError::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_attempts: config.max_attempts.max(1),
            retry_delay: Duration::from_millis(100),
        })
    }

    async fn get_once(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl TileClient for HttpTileClient {
    async fn get(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError> {
        let mut attempt = 1;
        loop {
            log::debug!("fetch {} attempt {}", url, attempt);
            match self.get_once(url).await {
                Ok(data) => return Ok(data),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    log::debug!("{} failed on attempt {}: {}", url, attempt, e);
                    attempt += 1;
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Recognises the raster formats tile servers deliver (PNG, JPEG, GIF, WebP).
pub fn looks_like_image(data: &[u8]) -> bool {
    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n";
    const JPEG: &[u8] = b"\xff\xd8\xff";

    data.starts_with(PNG)
        || data.starts_with(JPEG)
        || data.starts_with(b"GIF87a")
        || data.starts_with(b"GIF89a")
        || (data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_sniffing() {
        assert!(looks_like_image(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR"));
        assert!(looks_like_image(b"\xff\xd8\xff\xe0\0\x10JFIF"));
        assert!(looks_like_image(b"RIFF\0\0\0\0WEBPVP8 "));
        assert!(looks_like_image(b"GIF89a\x01\0"));
        assert!(!looks_like_image(b"<html><body>rate limited</body></html>"));
        assert!(!looks_like_image(b""));
    }

    #[test]
    fn test_transient_errors() {
        assert!(FetchError::Http("connection reset".into()).is_transient());
        assert!(FetchError::Status(503).is_transient());
        assert!(FetchError::Status(429).is_transient());
        assert!(!FetchError::Status(404).is_transient());
        assert!(!FetchError::NotAnImage(12).is_transient());
    }

    #[test]
    fn test_client_from_config() {
        let client = HttpTileClient::new(&TileProvisionConfig::for_testing()).unwrap();
        assert_eq!(client.max_attempts, 1);

        let client = HttpTileClient::new(&TileProvisionConfig::default()).unwrap();
        assert_eq!(client.max_attempts, crate::constants::DEFAULT_MAX_ATTEMPTS);
    }
}
