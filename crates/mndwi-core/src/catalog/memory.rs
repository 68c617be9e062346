//! In-memory catalog for tests, demos and offline runs.
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::{Days, NaiveTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use tracing::debug;

use super::{Catalog, CollectionQuery, MapId, Scene, DEFAULT_CLOUD_PROPERTY, DEFAULT_COLLECTION};
use crate::error::CatalogError;
use crate::expr::ImageExpr;
use crate::layers::VisParams;
use crate::raster::{Grid, Raster};
use crate::window::DateWindow;

/// JSON fixture layout: `{"collections": {"<id>": [scene, ...]}}`.
#[derive(Debug, Deserialize)]
struct Fixture {
    collections: BTreeMap<String, Vec<Scene>>,
}

/// Scenes held in memory, grouped by collection id.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    collections: BTreeMap<String, Vec<Arc<Scene>>>,
    outage: Option<String>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(s: &str) -> Result<Self, CatalogError> {
        let fixture: Fixture = serde_json::from_str(s)?;
        for scene in fixture.collections.values().flatten() {
            for (name, band) in &scene.bands {
                if band.data.len() != band.width * band.height {
                    return Err(CatalogError::Rejected(format!(
                        "scene `{}` band `{name}` has {} values for a {}x{} grid",
                        scene.id,
                        band.data.len(),
                        band.width,
                        band.height
                    )));
                }
            }
        }
        let collections = fixture
            .collections
            .into_iter()
            .map(|(id, scenes)| (id, scenes.into_iter().map(Arc::new).collect()))
            .collect();
        Ok(Self { collections, outage: None })
    }

    /// Register an empty collection.
    pub fn with_collection(mut self, id: &str) -> Self {
        self.collections.entry(id.to_string()).or_default();
        self
    }

    pub fn insert(&mut self, collection: &str, scene: Scene) {
        self.collections.entry(collection.to_string()).or_default().push(Arc::new(scene));
    }

    /// Make every request fail as an unreachable service would.
    pub fn with_outage(mut self, reason: &str) -> Self {
        self.outage = Some(reason.to_string());
        self
    }

    pub fn scene_count(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }

    fn check_available(&self) -> Result<(), CatalogError> {
        match &self.outage {
            Some(reason) => Err(CatalogError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }

    /// Reproducible synthetic Sentinel-2-like scenes.
    pub fn synthetic(spec: &SyntheticSpec) -> Self {
        let mut rng = StdRng::seed_from_u64(spec.seed);
        let mut catalog = Self::new().with_collection(&spec.collection);
        let mut n = 0usize;

        for window in &spec.windows {
            let days = (window.end - window.start).num_days().max(0) as u64;
            if days == 0 {
                continue;
            }
            for _ in 0..spec.scenes_per_window {
                let day = window.start + Days::new(rng.gen_range(0..days));
                let time = NaiveTime::from_num_seconds_from_midnight_opt(rng.gen_range(0..86_400), 0)
                    .unwrap_or(NaiveTime::MIN);
                let cloud: f64 = rng.gen_range(0.0..100.0);
                n += 1;
                let scene = Scene {
                    id: format!("SYN_{}_{n:03}", day.format("%Y%m%d")),
                    acquired: day.and_time(time).and_utc(),
                    properties: BTreeMap::from([(spec.cloud_property.clone(), cloud)]),
                    bands: synthetic_bands(spec.grid, &mut rng),
                };
                catalog.insert(&spec.collection, scene);
            }
        }

        debug!(scenes = catalog.scene_count(), seed = spec.seed, "synthetic catalog generated");
        catalog
    }
}

impl Catalog for InMemoryCatalog {
    fn query(&self, query: &CollectionQuery) -> Result<Vec<Arc<Scene>>, CatalogError> {
        self.check_available()?;
        let scenes = self
            .collections
            .get(&query.collection)
            .ok_or_else(|| CatalogError::Rejected(format!("collection `{}` not found", query.collection)))?;
        Ok(scenes.iter().filter(|s| query.matches(s)).cloned().collect())
    }

    fn map_id(&self, expr: &ImageExpr, vis: &VisParams) -> Result<MapId, CatalogError> {
        self.check_available()?;
        let collection = &expr.root_query().collection;
        if !self.collections.contains_key(collection) {
            return Err(CatalogError::Rejected(format!("collection `{collection}` not found")));
        }
        let mut hasher = DefaultHasher::new();
        format!("{expr}|{vis:?}").hash(&mut hasher);
        let id = format!("{:016x}", hasher.finish());
        Ok(MapId {
            tile_url: format!("memory://{collection}/maps/{id}/{{z}}/{{x}}/{{y}}"),
            id,
        })
    }
}

/// Parameters of [`InMemoryCatalog::synthetic`].
#[derive(Debug, Clone)]
pub struct SyntheticSpec {
    pub seed: u64,
    pub grid: Grid,
    pub windows: Vec<DateWindow>,
    pub scenes_per_window: usize,
    pub collection: String,
    pub cloud_property: String,
}

impl SyntheticSpec {
    pub fn new(seed: u64, grid: Grid, windows: Vec<DateWindow>) -> Self {
        Self {
            seed,
            grid,
            windows,
            scenes_per_window: 4,
            collection: DEFAULT_COLLECTION.to_string(),
            cloud_property: DEFAULT_CLOUD_PROPERTY.to_string(),
        }
    }
}

/// A lake in the middle of the grid (green above SWIR) surrounded by land
/// whose SWIR/green ratio rises west to east, so the index sweeps 0..~0.64.
fn synthetic_bands(grid: Grid, rng: &mut StdRng) -> BTreeMap<String, Raster> {
    let mut green = Raster::new(grid, 0.0);
    let mut swir = Raster::new(grid, 0.0);
    let mut red = Raster::new(grid, 0.0);
    let mut blue = Raster::new(grid, 0.0);

    let (cx, cy) = (grid.width as f64 / 2.0, grid.height as f64 / 2.0);
    let radius = grid.width.min(grid.height) as f64 * 0.2;

    for row in 0..grid.height {
        for col in 0..grid.width {
            let noise: f32 = rng.gen_range(0.97..1.03);
            let dist = ((col as f64 + 0.5 - cx).powi(2) + (row as f64 + 0.5 - cy).powi(2)).sqrt();
            let (g, s) = if dist < radius {
                (1500.0 * noise, 400.0 * noise)
            } else {
                let t = (col as f32 + 0.5) / grid.width.max(1) as f32;
                let ratio = 1.0 + 3.6 * t;
                (800.0 * noise, 800.0 * ratio * noise)
            };
            green.set(row, col, g);
            swir.set(row, col, s);
            red.set(row, col, g * 0.9);
            blue.set(row, col, g * 0.8);
        }
    }

    BTreeMap::from([
        ("B2".to_string(), blue),
        ("B3".to_string(), green),
        ("B4".to_string(), red),
        ("B11".to_string(), swir),
    ])
}
