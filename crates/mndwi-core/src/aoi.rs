//! Area-of-interest resolution.
//!
//! All parsed geometries of one upload batch are bagged into a single
//! multi-geometry (no union, no dedup, no validity checks). With no geometry
//! the AOI degrades to a fixed fallback point.
use geo::{Intersects, MultiPolygon, Point, Rect};
use serde::{Deserialize, Serialize};

use crate::coords::LatLon;
use crate::geometry::{Geometry, ParsedUpload};

/// Fallback AOI point when an upload yields no geometry.
pub const FALLBACK_POINT: LatLon = LatLon { lat: 36.13, lon: 27.98 };

/// Spatial extent of an AOI.
#[derive(Debug, Clone, PartialEq)]
pub enum AoiRegion {
    /// One member per input geometry, in input order.
    MultiPolygon(Vec<Geometry>),
    Point(Point<f64>),
}

/// The merged area of interest plus the centroid of the last ingested geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct Aoi {
    region: AoiRegion,
    centroid: Option<LatLon>,
}

impl Aoi {
    /// Merge parsed geometries, falling back to `fallback` when there are none.
    pub fn resolve(upload: ParsedUpload, fallback: LatLon) -> Self {
        if upload.geometries.is_empty() {
            return Self {
                region: AoiRegion::Point(Point::new(fallback.lon, fallback.lat)),
                centroid: None,
            };
        }
        Self {
            region: AoiRegion::MultiPolygon(upload.geometries),
            centroid: upload.last_centroid,
        }
    }

    pub fn region(&self) -> &AoiRegion {
        &self.region
    }

    pub fn centroid(&self) -> Option<LatLon> {
        self.centroid
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.region, AoiRegion::Point(_))
    }

    /// Number of merged member geometries; 0 for the fallback point.
    pub fn member_count(&self) -> usize {
        match &self.region {
            AoiRegion::MultiPolygon(members) => members.len(),
            AoiRegion::Point(_) => 0,
        }
    }

    /// All member polygons flattened into one multipolygon.
    pub fn to_multi_polygon(&self) -> MultiPolygon<f64> {
        match &self.region {
            AoiRegion::MultiPolygon(members) => {
                MultiPolygon::new(members.iter().flat_map(Geometry::polygons).collect())
            }
            AoiRegion::Point(_) => MultiPolygon::new(Vec::new()),
        }
    }

    /// Spatial filter used when querying the catalog.
    pub fn intersects_rect(&self, rect: &Rect<f64>) -> bool {
        match &self.region {
            AoiRegion::MultiPolygon(_) => self.to_multi_polygon().intersects(rect),
            AoiRegion::Point(p) => rect.intersects(&p.0),
        }
    }

    /// Build a clip mask test. Clipping to a point keeps no pixel.
    pub fn clip_mask(&self) -> ClipMask {
        match &self.region {
            AoiRegion::MultiPolygon(_) => ClipMask::Polygons(self.to_multi_polygon()),
            AoiRegion::Point(_) => ClipMask::Nothing,
        }
    }
}

/// Pixel-centre inclusion test derived from an AOI.
#[derive(Debug, Clone)]
pub enum ClipMask {
    Polygons(MultiPolygon<f64>),
    Nothing,
}

impl ClipMask {
    pub fn keeps(&self, lon: f64, lat: f64) -> bool {
        match self {
            ClipMask::Polygons(mp) => mp.intersects(&geo::coord! { x: lon, y: lat }),
            ClipMask::Nothing => false,
        }
    }
}

/// Per-session upload memory: the centroid of the most recent upload that
/// produced one. Empty uploads leave it untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    last_centroid: Option<LatLon>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn absorb(&mut self, upload: &ParsedUpload) {
        if let Some(c) = upload.last_centroid {
            self.last_centroid = Some(c);
        }
    }

    pub fn last_centroid(&self) -> Option<LatLon> {
        self.last_centroid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::parse_uploads;

    fn square(x: f64, y: f64) -> String {
        format!(
            r#"{{"type":"Polygon","coordinates":[[[{x},{y}],[{x1},{y}],[{x1},{y1}],[{x},{y1}],[{x},{y}]]]}}"#,
            x1 = x + 1.0,
            y1 = y + 1.0
        )
    }

    #[test]
    fn member_count_matches_input_geometries() {
        let multi = r#"{"type":"MultiPolygon","coordinates":[[[[0,0],[1,0],[1,1],[0,0]]],[[[5,5],[6,5],[6,6],[5,5]]]]}"#;
        let a = format!(r#"{{"features":[{{"geometry":{}}},{{"geometry":{}}}]}}"#, square(0.0, 0.0), square(3.0, 3.0));
        let b = format!(r#"{{"geometries":[{multi}]}}"#);
        let aoi = Aoi::resolve(parse_uploads([a, b]).unwrap(), FALLBACK_POINT);
        assert!(!aoi.is_fallback());
        assert_eq!(aoi.member_count(), 3);
        assert_eq!(aoi.to_multi_polygon().0.len(), 4);
    }

    #[test]
    fn empty_upload_resolves_to_fallback_point() {
        let aoi = Aoi::resolve(ParsedUpload::default(), FALLBACK_POINT);
        assert_eq!(aoi.region(), &AoiRegion::Point(Point::new(27.98, 36.13)));
        assert_eq!(aoi.member_count(), 0);
        assert!(aoi.centroid().is_none());
    }

    #[test]
    fn clip_mask_tests_pixel_centres() {
        let doc = format!(r#"{{"geometries":[{}]}}"#, square(10.0, 36.0));
        let aoi = Aoi::resolve(parse_uploads([doc]).unwrap(), FALLBACK_POINT);
        let mask = aoi.clip_mask();
        assert!(mask.keeps(10.5, 36.5));
        assert!(!mask.keeps(12.5, 36.5));
        assert!(!Aoi::resolve(ParsedUpload::default(), FALLBACK_POINT).clip_mask().keeps(27.98, 36.13));
    }

    #[test]
    fn footprint_intersection() {
        let doc = format!(r#"{{"geometries":[{}]}}"#, square(10.0, 36.0));
        let aoi = Aoi::resolve(parse_uploads([doc]).unwrap(), FALLBACK_POINT);
        let hit = Rect::new(geo::coord! { x: 10.5, y: 36.5 }, geo::coord! { x: 20.0, y: 40.0 });
        let miss = Rect::new(geo::coord! { x: 50.0, y: 0.0 }, geo::coord! { x: 51.0, y: 1.0 });
        assert!(aoi.intersects_rect(&hit));
        assert!(!aoi.intersects_rect(&miss));

        let fallback = Aoi::resolve(ParsedUpload::default(), FALLBACK_POINT);
        let around = Rect::new(geo::coord! { x: 27.0, y: 36.0 }, geo::coord! { x: 28.0, y: 37.0 });
        assert!(fallback.intersects_rect(&around));
    }

    #[test]
    fn session_keeps_centroid_across_empty_uploads() {
        let mut session = Session::new();
        let doc = format!(r#"{{"geometries":[{}]}}"#, square(10.0, 36.0));
        session.absorb(&parse_uploads([doc]).unwrap());
        let c = session.last_centroid().unwrap();
        assert!((c.lon - 10.5).abs() < 1e-9 && (c.lat - 36.5).abs() < 1e-9);

        session.absorb(&ParsedUpload::default());
        assert_eq!(session.last_centroid(), Some(c));
    }
}
