use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::path::PathBuf;

use crate::core::constants::{MAX_LATITUDE, MAX_LONGITUDE, TILE_EXTENSION, ZOOM_LIMIT};

/// Represents a geographical coordinate with latitude and longitude
///
/// Accepts both the short (`lat`/`lng`) and the long (`latitude`/`longitude`)
/// spelling when deserialized, since point lists usually come straight from
/// a dataset export.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    #[serde(alias = "latitude")]
    pub lat: f64,
    #[serde(alias = "longitude", alias = "lon")]
    pub lng: f64,
}

impl LatLng {
    /// Creates a new LatLng coordinate
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Clamps latitude to the range Web Mercator can represent
    pub fn clamp_lat(lat: f64) -> f64 {
        lat.clamp(-MAX_LATITUDE, MAX_LATITUDE)
    }

    /// Clamps longitude to [-180, 180]
    pub fn clamp_lng(lng: f64) -> f64 {
        lng.clamp(-MAX_LONGITUDE, MAX_LONGITUDE)
    }
}

/// Represents a bounding box of geographical coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatLngBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl LatLngBounds {
    pub fn new(south_west: LatLng, north_east: LatLng) -> Self {
        Self {
            south_west,
            north_east,
        }
    }

    /// Creates bounds from individual coordinates
    pub fn from_coords(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self::new(LatLng::new(south, west), LatLng::new(north, east))
    }

    /// Minimal bounds enclosing every point, or `None` for an empty slice
    pub fn from_points(points: &[LatLng]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut bounds = Self::new(*first, *first);
        for point in rest {
            bounds.extend(point);
        }
        Some(bounds)
    }

    /// Extends the bounds to include a point
    pub fn extend(&mut self, point: &LatLng) {
        self.south_west.lat = self.south_west.lat.min(point.lat);
        self.south_west.lng = self.south_west.lng.min(point.lng);
        self.north_east.lat = self.north_east.lat.max(point.lat);
        self.north_east.lng = self.north_east.lng.max(point.lng);
    }

    /// Grows the bounds by `delta` degrees on every side, clamped to the
    /// projectable world.
    pub fn padded(&self, delta: f64) -> LatLngBounds {
        LatLngBounds::from_coords(
            LatLng::clamp_lat(self.south_west.lat - delta),
            LatLng::clamp_lng(self.south_west.lng - delta),
            LatLng::clamp_lat(self.north_east.lat + delta),
            LatLng::clamp_lng(self.north_east.lng + delta),
        )
    }

    /// The four corners, north-west first, clockwise
    pub fn corners(&self) -> [LatLng; 4] {
        [
            LatLng::new(self.north_east.lat, self.south_west.lng),
            self.north_east,
            LatLng::new(self.south_west.lat, self.north_east.lng),
            self.south_west,
        ]
    }
}

/// Represents a tile coordinate in the slippy map tile system
///
/// Ordering is by zoom first, then column, then row, which is also the order
/// tiles are written to the persisted tile list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    pub fn new(x: u32, y: u32, z: u8) -> Self {
        Self { x, y, z }
    }

    /// Number of tiles along one axis at `zoom`, saturating at `u32::MAX`
    /// for zoom levels no grid index can address
    pub fn tiles_per_axis(zoom: u8) -> u32 {
        1u32.checked_shl(zoom as u32).unwrap_or(u32::MAX)
    }

    /// Creates a tile coordinate from a LatLng and zoom level
    ///
    /// Out-of-range latitudes are clamped to the Mercator limit instead of
    /// failing, and the resulting indices are kept inside the grid so that
    /// longitude 180 and the poles land on the last row/column.
    pub fn from_lat_lng(lat_lng: &LatLng, zoom: u8) -> Self {
        let lat_rad = LatLng::clamp_lat(lat_lng.lat).to_radians();
        let lng = LatLng::clamp_lng(lat_lng.lng);
        let n = 2_f64.powi(zoom as i32);
        let last = (Self::tiles_per_axis(zoom) - 1) as f64;

        let x = ((lng + 180.0) / 360.0 * n).floor().clamp(0.0, last) as u32;
        let y = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n)
            .floor()
            .clamp(0.0, last) as u32;

        Self::new(x, y, zoom)
    }

    /// Checks that the zoom is below [`ZOOM_LIMIT`] and the indices lie
    /// inside the grid of that zoom
    pub fn is_valid(&self) -> bool {
        if self.z >= ZOOM_LIMIT {
            return false;
        }
        let max_coord = Self::tiles_per_axis(self.z);
        self.x < max_coord && self.y < max_coord
    }

    /// Location of the tile image relative to the tile root:
    /// `<zoom>/<column>/<row>.png`
    pub fn relative_path(&self) -> PathBuf {
        let mut path = PathBuf::from(self.z.to_string());
        path.push(self.x.to_string());
        path.push(format!("{}.{}", self.y, TILE_EXTENSION));
        path
    }
}

impl std::fmt::Display for TileCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Projects a point onto the tile grid at `zoom`.
pub fn project(point: &LatLng, zoom: u8) -> TileCoord {
    TileCoord::from_lat_lng(point, zoom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lat_lng_creation() {
        let coord = LatLng::new(40.7128, -74.0060);
        assert_eq!(coord.lat, 40.7128);
        assert_eq!(coord.lng, -74.0060);
    }

    #[test]
    fn test_lat_lng_accepts_long_field_names() {
        let point: LatLng =
            serde_json::from_str(r#"{"latitude": 12.5, "longitude": -3.25}"#).unwrap();
        assert_eq!(point, LatLng::new(12.5, -3.25));
    }

    #[test]
    fn test_tile_validity() {
        assert!(TileCoord::new(1023, 1023, 10).is_valid());
        assert!(!TileCoord::new(1024, 0, 10).is_valid());
        assert!(!TileCoord::new(0, 0, 13).is_valid());

        // zoom levels past the width of a u32 must not overflow
        assert_eq!(TileCoord::tiles_per_axis(31), 1 << 31);
        assert_eq!(TileCoord::tiles_per_axis(32), u32::MAX);
        assert!(!TileCoord::new(0, 0, 40).is_valid());
        assert!(!TileCoord::new(0, 0, u8::MAX).is_valid());
    }

    #[test]
    fn test_known_tiles() {
        assert_eq!(project(&LatLng::new(0.0, 0.0), 0), TileCoord::new(0, 0, 0));
        assert_eq!(project(&LatLng::new(0.0, 0.0), 1), TileCoord::new(1, 1, 1));
        assert_eq!(project(&LatLng::new(0.0, 0.0), 2), TileCoord::new(2, 2, 2));
        // Berlin at zoom 10
        assert_eq!(
            project(&LatLng::new(52.52, 13.405), 10),
            TileCoord::new(550, 335, 10)
        );
    }

    #[test]
    fn test_projection_stays_inside_grid() {
        let extremes = [
            LatLng::new(90.0, 180.0),
            LatLng::new(-90.0, -180.0),
            LatLng::new(89.9, 179.999),
            LatLng::new(-85.06, 180.0),
            LatLng::new(120.0, 400.0),
            LatLng::new(-120.0, -400.0),
        ];

        for zoom in 0..=12 {
            let n = TileCoord::tiles_per_axis(zoom);
            for point in &extremes {
                let tile = project(point, zoom);
                assert!(tile.x < n && tile.y < n, "{point:?} -> {tile} at zoom {zoom}");
                assert!(tile.is_valid());
            }
        }
    }

    #[test]
    fn test_relative_path_layout() {
        let tile = TileCoord::new(3, 5, 4);
        assert_eq!(tile.relative_path(), PathBuf::from("4").join("3").join("5.png"));
        assert_eq!(tile.to_string(), "4/3/5");
    }

    #[test]
    fn test_bounds_from_points_and_padding() {
        let bounds =
            LatLngBounds::from_points(&[LatLng::new(10.0, 20.0), LatLng::new(-5.0, 30.0)]).unwrap();
        assert_eq!(bounds, LatLngBounds::from_coords(-5.0, 20.0, 10.0, 30.0));

        let padded = bounds.padded(200.0);
        assert_eq!(padded.south_west.lng, -180.0);
        assert_eq!(padded.north_east.lng, 180.0);
        assert_eq!(padded.north_east.lat, MAX_LATITUDE);

        assert!(LatLngBounds::from_points(&[]).is_none());
    }
}
