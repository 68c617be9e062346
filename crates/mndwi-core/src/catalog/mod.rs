//! Imagery catalog boundary.
//!
//! The catalog is an external service: it answers collection queries with
//! scenes and turns image expressions plus visualization parameters into tile
//! URL templates. Failures (auth, quota, network) surface as `CatalogError`
//! and are never retried here.
pub mod memory;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aoi::Aoi;
use crate::error::CatalogError;
use crate::expr::ImageExpr;
use crate::layers::VisParams;
use crate::raster::Grid;
use crate::raster::Raster;
use crate::window::DateWindow;

pub use memory::InMemoryCatalog;

/// Surface reflectance collection queried by default.
pub const DEFAULT_COLLECTION: &str = "COPERNICUS/S2_SR";
/// Per-scene cloud cover metadata property.
pub const DEFAULT_CLOUD_PROPERTY: &str = "CLOUDY_PIXEL_PERCENTAGE";

/// One acquisition in a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub id: String,
    pub acquired: DateTime<Utc>,
    /// Numeric metadata, e.g. cloud cover percentage.
    #[serde(default)]
    pub properties: BTreeMap<String, f64>,
    /// Raw digital numbers per band, all on one grid.
    pub bands: BTreeMap<String, Raster>,
}

impl Scene {
    /// Pixel grid of the scene, taken from its first band.
    pub fn grid(&self) -> Option<Grid> {
        self.bands.values().next().map(Raster::grid)
    }

    pub fn property(&self, name: &str) -> Option<f64> {
        self.properties.get(name).copied()
    }
}

/// Declarative collection filter: cloud cover, acquisition window and AOI.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionQuery {
    pub collection: String,
    pub cloud_property: String,
    /// Exclusive upper bound on the cloud property.
    pub max_cloud: f64,
    pub window: DateWindow,
    pub aoi: Arc<Aoi>,
}

impl CollectionQuery {
    /// The three filters every catalog applies. Scenes lacking the cloud
    /// property, or lacking any band, never match.
    pub fn matches(&self, scene: &Scene) -> bool {
        let cloud_ok = scene
            .property(&self.cloud_property)
            .is_some_and(|c| c < self.max_cloud);
        let date_ok = self.window.contains(scene.acquired);
        let bounds_ok = scene
            .grid()
            .is_some_and(|g| self.aoi.intersects_rect(&g.footprint()));
        cloud_ok && date_ok && bounds_ok
    }
}

impl fmt::Display for CollectionQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{} < {}, {}..{}, bounds({} members)]",
            self.collection,
            self.cloud_property,
            self.max_cloud,
            self.window.start_str(),
            self.window.end_str(),
            self.aoi.member_count(),
        )
    }
}

/// Handle returned by the catalog for a renderable image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapId {
    pub id: String,
    /// `{z}/{x}/{y}` tile URL template.
    pub tile_url: String,
}

/// External imagery catalog.
pub trait Catalog {
    /// Scenes of `query.collection` satisfying `query`.
    fn query(&self, query: &CollectionQuery) -> Result<Vec<Arc<Scene>>, CatalogError>;

    /// Register `expr` for rendering with `vis` and return its tile source.
    fn map_id(&self, expr: &ImageExpr, vis: &VisParams) -> Result<MapId, CatalogError>;
}
