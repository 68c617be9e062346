//! Geometry parser for uploaded GeoJSON-shaped documents.
//!
//! Accepted document shapes:
//!   - `{"features": [{"geometry": {...}}, ...]}`  (FeatureCollection-like)
//!   - `{"geometries": [{...}, ...]}`             (GeometryCollection-like)
//!
//! Any other document, and any feature without a `geometry` object carrying
//! `coordinates`, is skipped without a diagnostic. A geometry whose `type` is
//! neither `Polygon` nor `MultiPolygon` fails the whole upload.
use geo::{Centroid, Coord, LineString, MultiPolygon, Polygon};
use serde_json::Value;
use tracing::debug;

use crate::coords::LatLon;
use crate::error::GeometryError;

/// A parsed area geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Polygon(Polygon<f64>),
    MultiPolygon(MultiPolygon<f64>),
}

impl Geometry {
    /// Planar centroid; `None` for degenerate (zero-area, empty) geometries.
    pub fn centroid(&self) -> Option<LatLon> {
        match self {
            Geometry::Polygon(p) => p.centroid().map(LatLon::from),
            Geometry::MultiPolygon(mp) => mp.centroid().map(LatLon::from),
        }
    }

    /// Flatten into the member polygons.
    pub fn polygons(&self) -> Vec<Polygon<f64>> {
        match self {
            Geometry::Polygon(p) => vec![p.clone()],
            Geometry::MultiPolygon(mp) => mp.0.clone(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPolygon(_) => "MultiPolygon",
        }
    }
}

/// Result of parsing one upload batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedUpload {
    /// Geometries in document order, then feature order.
    pub geometries: Vec<Geometry>,
    /// Centroid of the last geometry that produced one.
    pub last_centroid: Option<LatLon>,
}

/// Parse every uploaded document of one batch.
pub fn parse_uploads<I, B>(uploads: I) -> Result<ParsedUpload, GeometryError>
where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
{
    let mut out = ParsedUpload::default();

    for (index, bytes) in uploads.into_iter().enumerate() {
        let doc: Value = serde_json::from_slice(bytes.as_ref())
            .map_err(|source| GeometryError::Json { index, source })?;

        for candidate in geometry_candidates(&doc) {
            let geometry = parse_geometry(index, candidate)?;
            if let Some(c) = geometry.centroid() {
                out.last_centroid = Some(c);
            }
            out.geometries.push(geometry);
        }
    }

    debug!(count = out.geometries.len(), "parsed upload geometries");
    Ok(out)
}

/// Geometry objects of a document that carry a `coordinates` member.
fn geometry_candidates(doc: &Value) -> Vec<&Value> {
    let geometries: Vec<&Value> = if let Some(features) = doc.get("features").and_then(Value::as_array) {
        features.iter().filter_map(|f| f.get("geometry")).collect()
    } else if let Some(geoms) = doc.get("geometries").and_then(Value::as_array) {
        geoms.iter().collect()
    } else {
        return Vec::new();
    };

    geometries
        .into_iter()
        .filter(|g| g.get("coordinates").is_some())
        .collect()
}

fn parse_geometry(index: usize, geometry: &Value) -> Result<Geometry, GeometryError> {
    let coords = geometry.get("coordinates").cloned().unwrap_or(Value::Null);
    match geometry.get("type").and_then(Value::as_str) {
        Some("Polygon") => {
            let rings: Vec<Vec<Vec<f64>>> = serde_json::from_value(coords)
                .map_err(|source| GeometryError::InvalidCoordinates { index, kind: "Polygon", source })?;
            Ok(Geometry::Polygon(polygon_from_rings(index, rings)?))
        }
        Some("MultiPolygon") => {
            let polys: Vec<Vec<Vec<Vec<f64>>>> = serde_json::from_value(coords)
                .map_err(|source| GeometryError::InvalidCoordinates { index, kind: "MultiPolygon", source })?;
            let polys = polys
                .into_iter()
                .map(|rings| polygon_from_rings(index, rings))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Geometry::MultiPolygon(MultiPolygon::new(polys)))
        }
        Some(other) => Err(GeometryError::UnsupportedType { index, kind: other.to_string() }),
        None => Err(GeometryError::MissingType { index }),
    }
}

/// First ring is the exterior, the rest are holes. Ordinates past the second
/// (altitude) are ignored.
fn polygon_from_rings(index: usize, rings: Vec<Vec<Vec<f64>>>) -> Result<Polygon<f64>, GeometryError> {
    let mut rings = rings
        .into_iter()
        .map(|ring| {
            ring.into_iter()
                .map(|pos| match pos.as_slice() {
                    [x, y, ..] => Ok(Coord { x: *x, y: *y }),
                    _ => Err(GeometryError::ShortPosition { index, len: pos.len() }),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(LineString::new)
        })
        .collect::<Result<Vec<_>, _>>()?
        .into_iter();

    let exterior = rings.next().unwrap_or_else(|| LineString::new(Vec::new()));
    Ok(Polygon::new(exterior, rings.collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = r#"{"type":"Polygon","coordinates":[[[10,36],[12,36],[12,38],[10,38],[10,36]]]}"#;

    fn feature_collection(geoms: &[&str]) -> String {
        let features: Vec<String> = geoms
            .iter()
            .map(|g| format!(r#"{{"type":"Feature","properties":{{}},"geometry":{g}}}"#))
            .collect();
        format!(r#"{{"type":"FeatureCollection","features":[{}]}}"#, features.join(","))
    }

    #[test]
    fn parses_feature_collection_polygon() {
        let doc = feature_collection(&[SQUARE]);
        let parsed = parse_uploads([doc.as_bytes()]).unwrap();
        assert_eq!(parsed.geometries.len(), 1);
        assert_eq!(parsed.geometries[0].kind(), "Polygon");
        let c = parsed.last_centroid.unwrap();
        assert!((c.lon - 11.0).abs() < 1e-9);
        assert!((c.lat - 37.0).abs() < 1e-9);
    }

    #[test]
    fn parses_geometry_collection_entries() {
        let multi = r#"{"type":"MultiPolygon","coordinates":[[[[0,0],[1,0],[1,1],[0,0]]],[[[5,5],[6,5],[6,6],[5,5]]]]}"#;
        let doc = format!(r#"{{"type":"GeometryCollection","geometries":[{SQUARE},{multi}]}}"#);
        let parsed = parse_uploads([doc]).unwrap();
        assert_eq!(parsed.geometries.len(), 2);
        assert_eq!(parsed.geometries[1].kind(), "MultiPolygon");
        assert_eq!(parsed.geometries[1].polygons().len(), 2);
    }

    #[test]
    fn unknown_document_shapes_are_skipped() {
        let docs = [
            r#"{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,0]]]}"#.to_string(),
            r#"{"features":"not a list"}"#.to_string(),
            r#"{"features":[{"properties":{}},{"geometry":{"type":"Polygon"}},{"geometry":null}]}"#.to_string(),
        ];
        let parsed = parse_uploads(docs).unwrap();
        assert!(parsed.geometries.is_empty());
        assert!(parsed.last_centroid.is_none());
    }

    #[test]
    fn last_centroid_comes_from_last_geometry() {
        let other = r#"{"type":"Polygon","coordinates":[[[20,0],[22,0],[22,2],[20,2],[20,0]]]}"#;
        let first = feature_collection(&[SQUARE]);
        let second = feature_collection(&[other]);
        let parsed = parse_uploads([first, second]).unwrap();
        let c = parsed.last_centroid.unwrap();
        assert!((c.lon - 21.0).abs() < 1e-9);
        assert!((c.lat - 1.0).abs() < 1e-9);
    }

    #[test]
    fn line_string_is_rejected() {
        let line = r#"{"type":"LineString","coordinates":[[0,0],[1,1]]}"#;
        let doc = feature_collection(&[line]);
        match parse_uploads([doc]) {
            Err(GeometryError::UnsupportedType { index: 0, kind }) => assert_eq!(kind, "LineString"),
            other => panic!("expected UnsupportedType, got {other:?}"),
        }
    }

    #[test]
    fn malformed_coordinates_are_an_error() {
        let bad = r#"{"type":"Polygon","coordinates":[[0,0],[1,1]]}"#;
        let doc = feature_collection(&[bad]);
        assert!(matches!(
            parse_uploads([doc]),
            Err(GeometryError::InvalidCoordinates { kind: "Polygon", .. })
        ));
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(matches!(parse_uploads([b"{not json".as_slice()]), Err(GeometryError::Json { index: 0, .. })));
    }

    #[test]
    fn altitude_ordinates_are_dropped() {
        let z = r#"{"type":"Polygon","coordinates":[[[0,0,5],[2,0,5],[2,2,5],[0,2,5],[0,0,5]]]}"#;
        let parsed = parse_uploads([feature_collection(&[z])]).unwrap();
        let c = parsed.last_centroid.unwrap();
        assert!((c.lon - 1.0).abs() < 1e-9 && (c.lat - 1.0).abs() < 1e-9);
    }
}
