//! Coverage planning across the zoom pyramid
//!
//! Given the points a map has to show, compute every tile from zoom 0 up to
//! the maximum zoom whose union covers the padded bounding box of the points.
//!
//! Padding is specified in degrees of longitude at zoom level
//! [`PADDING_REFERENCE_ZOOM`] and rescaled per level as
//! `padding * 2^(reference - zoom)`, so that it keeps roughly the same
//! on-screen size at every zoom.

use crate::core::config::validate_max_zoom;
use crate::core::constants::PADDING_REFERENCE_ZOOM;
use crate::core::geo::{project, LatLng, LatLngBounds, TileCoord};
use crate::prelude::HashSet;
use crate::{Result, TileError};

/// Deduplicated set of planned tiles
pub type TileSet = HashSet<TileCoord>;

/// Inclusive rectangle of tiles at a single zoom level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileSpan {
    pub zoom: u8,
    pub min_x: u32,
    pub max_x: u32,
    pub min_y: u32,
    pub max_y: u32,
}

impl TileSpan {
    /// Span of the tiles touched by the corners of `bounds` at `zoom`
    pub fn covering(bounds: &LatLngBounds, zoom: u8) -> Self {
        let corners = bounds.corners().map(|corner| project(&corner, zoom));

        let mut span = Self {
            zoom,
            min_x: corners[0].x,
            max_x: corners[0].x,
            min_y: corners[0].y,
            max_y: corners[0].y,
        };
        for tile in &corners[1..] {
            span.min_x = span.min_x.min(tile.x);
            span.max_x = span.max_x.max(tile.x);
            span.min_y = span.min_y.min(tile.y);
            span.max_y = span.max_y.max(tile.y);
        }
        span
    }

    pub fn width(&self) -> u64 {
        (self.max_x - self.min_x) as u64 + 1
    }

    pub fn height(&self) -> u64 {
        (self.max_y - self.min_y) as u64 + 1
    }

    pub fn tile_count(&self) -> u64 {
        self.width() * self.height()
    }

    /// Every tile of the span, column by column
    pub fn tiles(&self) -> impl Iterator<Item = TileCoord> + '_ {
        (self.min_x..=self.max_x).flat_map(move |x| {
            (self.min_y..=self.max_y).map(move |y| TileCoord::new(x, y, self.zoom))
        })
    }
}

/// Padding in degrees applied at `zoom`, given the padding at the reference zoom
pub fn padding_at_zoom(padding: f64, zoom: u8) -> f64 {
    padding * 2_f64.powi(PADDING_REFERENCE_ZOOM as i32 - zoom as i32)
}

/// One span per zoom level `0..=max_zoom`; empty when there are no points.
pub fn plan_spans(points: &[LatLng], padding: f64, max_zoom: u8) -> Result<Vec<TileSpan>> {
    validate_max_zoom(max_zoom)?;
    if !padding.is_finite() || padding < 0.0 {
        return Err(TileError::Configuration(format!(
            "padding must be a non-negative number of degrees, got {padding}"
        )));
    }

    let Some(bounds) = LatLngBounds::from_points(points) else {
        return Ok(Vec::new());
    };

    Ok((0..=max_zoom)
        .map(|zoom| {
            let padded = bounds.padded(padding_at_zoom(padding, zoom));
            TileSpan::covering(&padded, zoom)
        })
        .collect())
}

/// Computes the deduplicated set of tiles covering `points` at every zoom
/// level from 0 to `max_zoom` inclusive.
pub fn plan(points: &[LatLng], padding: f64, max_zoom: u8) -> Result<TileSet> {
    let spans = plan_spans(points, padding, max_zoom)?;

    let capacity = spans.iter().map(TileSpan::tile_count).sum::<u64>() as usize;
    let mut tiles = TileSet::with_capacity_and_hasher(capacity, Default::default());
    for span in &spans {
        tiles.extend(span.tiles());
    }

    log::debug!(
        "planned {} tiles for {} points up to zoom {}",
        tiles.len(),
        points.len(),
        max_zoom
    );
    Ok(tiles)
}

/// Per-zoom tile counts of a plan, without materialising the tiles.
pub fn estimate(points: &[LatLng], padding: f64, max_zoom: u8) -> Result<Vec<(u8, u64)>> {
    Ok(plan_spans(points, padding, max_zoom)?
        .iter()
        .map(|span| (span.zoom, span.tile_count()))
        .collect())
}
