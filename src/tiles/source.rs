//! URL construction for remote tile servers

use crate::core::config::TileProvisionConfig;
use crate::core::geo::TileCoord;

/// Trait representing anything that can produce tile URLs for a given coordinate.
pub trait TileSource: Send + Sync {
    /// Build a URL for the requested `coord`.
    fn url(&self, coord: TileCoord) -> String;
}

/// Tile server addressed by a `{z}/{x}/{y}` URL template, optionally spreading
/// requests over `{s}` subdomains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplateSource {
    template: String,
    subdomains: Vec<String>,
}

impl UrlTemplateSource {
    pub fn new(template: impl Into<String>, subdomains: Vec<String>) -> Self {
        Self {
            template: template.into(),
            subdomains,
        }
    }

    pub fn from_config(config: &TileProvisionConfig) -> Self {
        Self::new(config.url_template.clone(), config.subdomains.clone())
    }
}

impl TileSource for UrlTemplateSource {
    fn url(&self, coord: TileCoord) -> String {
        let url = self
            .template
            .replace("{z}", &coord.z.to_string())
            .replace("{x}", &coord.x.to_string())
            .replace("{y}", &coord.y.to_string());

        // Guard against empty subdomain list (validation normally rejects it)
        if self.subdomains.is_empty() {
            return url.replace("{s}.", "").replace("{s}", "");
        }

        let idx = ((coord.x + coord.y) % self.subdomains.len() as u32) as usize;
        url.replace("{s}", &self.subdomains[idx])
    }
}
