//! Configuration for tile provisioning
//!
//! Every knob of a provisioning run lives in [`TileProvisionConfig`]: the
//! coverage parameters handed over by the exporter, the network policy used by
//! the loader and the reconciliation thresholds. Presets mirror the usual
//! resource profiles; [`TileProvisionConfig::validate`] is called before any
//! planning or network activity starts.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::constants::{
    DEFAULT_CHECKPOINT_EVERY, DEFAULT_CONCURRENCY, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_ZOOM,
    DEFAULT_MIN_TILE_BYTES, DEFAULT_PADDING, DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_URL_TEMPLATE,
    DEFAULT_USER_AGENT, MAX_CONCURRENCY, ZOOM_LIMIT,
};
use crate::{Result, TileError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileProvisionConfig {
    /// Highest zoom level to plan, must be below [`ZOOM_LIMIT`]
    pub max_zoom: u8,
    /// Padding in degrees of longitude at the reference zoom level
    pub padding: f64,
    /// Maximum concurrent tile downloads
    pub concurrency: usize,
    /// Smallest file size accepted as an existing tile during reconciliation
    pub min_tile_bytes: u64,
    /// Persist the tile list after this many successful downloads
    pub checkpoint_every: usize,
    /// URL template with `{z}`, `{x}`, `{y}` and optionally `{s}` placeholders
    pub url_template: String,
    /// Subdomains substituted for `{s}`
    pub subdomains: Vec<String>,
    pub user_agent: String,
    pub request_timeout_ms: u64,
    /// Transport-level attempts per request
    pub max_attempts: usize,
}

impl Default for TileProvisionConfig {
    fn default() -> Self {
        Self {
            max_zoom: DEFAULT_MAX_ZOOM,
            padding: DEFAULT_PADDING,
            concurrency: DEFAULT_CONCURRENCY,
            min_tile_bytes: DEFAULT_MIN_TILE_BYTES,
            checkpoint_every: DEFAULT_CHECKPOINT_EVERY,
            url_template: DEFAULT_URL_TEMPLATE.to_string(),
            subdomains: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Unified configuration presets for TileProvisionConfig
impl TileProvisionConfig {
    pub fn low_resource() -> Self {
        Self {
            concurrency: 4,
            checkpoint_every: 16,
            ..Self::default()
        }
    }

    pub fn for_testing() -> Self {
        Self {
            max_zoom: 3,
            concurrency: 4,
            min_tile_bytes: 1,
            checkpoint_every: 4,
            request_timeout_ms: 500,
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Builder-style override of the coverage parameters
    pub fn with_coverage(mut self, max_zoom: u8, padding: f64) -> Self {
        self.max_zoom = max_zoom;
        self.padding = padding;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Rejects settings that would make a run meaningless or unbounded.
    pub fn validate(&self) -> Result<()> {
        validate_max_zoom(self.max_zoom)?;

        if !self.padding.is_finite() || self.padding < 0.0 {
            return Err(TileError::Configuration(format!(
                "padding must be a non-negative number of degrees, got {}",
                self.padding
            )));
        }
        if self.concurrency == 0 || self.concurrency > MAX_CONCURRENCY {
            return Err(TileError::Configuration(format!(
                "concurrency must be between 1 and {MAX_CONCURRENCY}, got {}",
                self.concurrency
            )));
        }
        if self.max_attempts == 0 {
            return Err(TileError::Configuration(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.checkpoint_every == 0 {
            return Err(TileError::Configuration(
                "checkpoint_every must be at least 1".to_string(),
            ));
        }
        for placeholder in ["{z}", "{x}", "{y}"] {
            if !self.url_template.contains(placeholder) {
                return Err(TileError::Configuration(format!(
                    "url template {:?} lacks the {placeholder} placeholder",
                    self.url_template
                )));
            }
        }
        if self.url_template.contains("{s}") && self.subdomains.is_empty() {
            return Err(TileError::Configuration(
                "url template uses {s} but no subdomains are configured".to_string(),
            ));
        }
        Ok(())
    }
}

pub(crate) fn validate_max_zoom(max_zoom: u8) -> Result<()> {
    if max_zoom >= ZOOM_LIMIT {
        return Err(TileError::Configuration(format!(
            "max zoom must be < {ZOOM_LIMIT}, got {max_zoom}"
        )));
    }
    Ok(())
}
