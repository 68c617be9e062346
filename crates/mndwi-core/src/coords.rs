//! Geographic coordinate types and tile addressing.
//! All coordinate math uses f64 for precision.
use serde::{Deserialize, Serialize};

/// A point on the sphere in geographic coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    /// Latitude in degrees, -90 to +90.
    pub lat: f64,
    /// Longitude in degrees, -180 to +180.
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Build from a GeoJSON-ordered `(lon, lat)` pair.
    pub fn from_lon_lat(lon: f64, lat: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance in metres (haversine, mean Earth radius).
    pub fn distance_m(self, other: LatLon) -> f64 {
        const EARTH_RADIUS_M: f64 = 6_371_008.8;
        let (lat1, lon1) = (self.lat.to_radians(), self.lon.to_radians());
        let (lat2, lon2) = (other.lat.to_radians(), other.lon.to_radians());
        let a = ((lat2 - lat1) / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * ((lon2 - lon1) / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().asin()
    }
}

impl From<geo::Point<f64>> for LatLon {
    fn from(p: geo::Point<f64>) -> Self {
        Self::from_lon_lat(p.x(), p.y())
    }
}

/// A tile in a slippy-map (zoom/x/y) addressing scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileAddr {
    pub zoom: u32,
    pub x: u32,
    pub y: u32,
}

impl TileAddr {
    /// Deepest zoom whose tile indices fit in a `u32`.
    pub const MAX_ZOOM: u32 = 30;

    pub fn new(zoom: u32, x: u32, y: u32) -> Self {
        Self { zoom, x, y }
    }

    /// Returns the (min_lat, min_lon, max_lat, max_lon) bounding box for this tile.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let n = 2f64.powi(self.zoom.min(Self::MAX_ZOOM) as i32);
        let lon_min = (self.x as f64 / n) * 360.0 - 180.0;
        let lon_max = ((self.x + 1) as f64 / n) * 360.0 - 180.0;
        let lat_max = (std::f64::consts::PI * (1.0 - 2.0 * self.y as f64 / n)).sinh().atan().to_degrees();
        let lat_min = (std::f64::consts::PI * (1.0 - 2.0 * (self.y + 1) as f64 / n)).sinh().atan().to_degrees();
        (lat_min, lon_min, lat_max, lon_max)
    }

    /// Convert a LatLon to the tile containing it at the given zoom level,
    /// clamped to [`Self::MAX_ZOOM`].
    pub fn from_latlon(ll: LatLon, zoom: u32) -> Self {
        let zoom = zoom.min(Self::MAX_ZOOM);
        let n = (1u32 << zoom) as f64;
        let max_index = (1u32 << zoom) - 1;
        let x = ((ll.lon + 180.0) / 360.0 * n).floor().max(0.0) as u32;
        let lat_rad = ll.lat.to_radians();
        let y = ((1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / std::f64::consts::PI) / 2.0 * n)
            .floor()
            .max(0.0) as u32;
        Self { zoom, x: x.min(max_index), y: y.min(max_index) }
    }

    /// Expand a `{z}/{x}/{y}` URL template for this tile.
    pub fn fill_template(&self, template: &str) -> String {
        template
            .replace("{z}", &self.zoom.to_string())
            .replace("{x}", &self.x.to_string())
            .replace("{y}", &self.y.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_within_tolerance() {
        let mut rng_state: u64 = 42;
        for _ in 0..1000 {
            // LCG for deterministic pseudo-random
            rng_state = rng_state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let lat = (rng_state as f64 / u64::MAX as f64) * 170.0 - 85.0;
            rng_state = rng_state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let lon = (rng_state as f64 / u64::MAX as f64) * 360.0 - 180.0;

            let tile = TileAddr::from_latlon(LatLon::new(lat, lon), 12);
            let (lat_min, lon_min, lat_max, lon_max) = tile.bounds();

            assert!(lat >= lat_min - 0.0001 && lat <= lat_max + 0.0001);
            assert!(lon >= lon_min - 0.0001 && lon <= lon_max + 0.0001);
        }
    }

    #[test]
    fn zoom_past_tile_range_is_clamped() {
        let ll = LatLon::new(36.45, 10.85);
        let tile = TileAddr::from_latlon(ll, 40);
        assert_eq!(tile.zoom, TileAddr::MAX_ZOOM);
        let (lat_min, lon_min, lat_max, lon_max) = tile.bounds();
        assert!(lat_min - 1e-6 <= ll.lat && ll.lat <= lat_max + 1e-6);
        assert!(lon_min - 1e-6 <= ll.lon && ll.lon <= lon_max + 1e-6);
    }

    #[test]
    fn template_is_filled() {
        let t = TileAddr::new(4, 8, 6);
        assert_eq!(t.fill_template("https://t/{z}/{x}/{y}.png"), "https://t/4/8/6.png");
    }

    #[test]
    fn distance_of_one_degree_latitude() {
        let d = LatLon::new(0.0, 0.0).distance_m(LatLon::new(1.0, 0.0));
        assert!((d - 111_195.0).abs() < 50.0, "got {d}");
    }
}
