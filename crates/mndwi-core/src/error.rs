//! Error types for every stage of the pipeline.
//!
//! Upload problems that are merely "not a geometry document" are not errors;
//! they are skipped by the parser. Everything here aborts the current run.

use thiserror::Error;

use crate::raster::Grid;

/// Failures while decoding an uploaded geometry document.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("upload #{index} is not valid JSON: {source}")]
    Json {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("geometry in upload #{index} has no `type` member")]
    MissingType { index: usize },

    #[error("geometry type `{kind}` in upload #{index} is not supported (expected Polygon or MultiPolygon)")]
    UnsupportedType { index: usize, kind: String },

    #[error("{kind} coordinates in upload #{index} have the wrong shape: {source}")]
    InvalidCoordinates {
        index: usize,
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("position in upload #{index} has {len} ordinates, need at least 2")]
    ShortPosition { index: usize, len: usize },
}

/// Failures reported by, or while talking to, the imagery catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("imagery catalog unavailable: {0}")]
    Unavailable(String),

    #[error("imagery catalog rejected the request: {0}")]
    Rejected(String),

    #[error("band `{band}` of scene `{scene}` is on grid {got:?}, other bands on {expected:?}")]
    GridMismatch {
        scene: String,
        band: String,
        expected: Grid,
        got: Grid,
    },

    #[error("failed to read catalog fixture: {0}")]
    Fixture(#[from] serde_json::Error),
}

/// Invalid user-facing configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cloud threshold {0} must lie in [5, 100] in steps of 5")]
    CloudThreshold(u32),

    #[error("unknown accessibility mode `{0}`")]
    AccessibilityMode(String),

    #[error("unknown gap policy `{0}`")]
    GapPolicy(String),

    #[error("reflectance scale must be positive, got {0}")]
    Scale(f32),

    #[error("zoom level {0} exceeds the maximum of {max}", max = crate::map::MAX_ZOOM)]
    Zoom(u8),

    #[error("invalid configuration file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failures while materializing an image expression.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("band `{0}` is not present in the composite")]
    MissingBand(String),
}

/// Crate-level error.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Image(#[from] ImageError),
}

pub type Result<T> = std::result::Result<T, Error>;
