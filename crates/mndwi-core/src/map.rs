//! Map document: view, base maps, overlay tile sources and legends.
//!
//! The document is what an interactive front end needs to draw the map; it
//! holds tile URL templates, never pixels.
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::classify::{legend, LegendEntry};
use crate::config::ViewerConfig;
use crate::coords::{LatLon, TileAddr};
use crate::error::CatalogError;
use crate::layers::{Layer, LayerKind, VisParams};
use crate::palette::{AccessibilityMode, IndexLegend};

/// Map centre when no upload centroid is known.
pub const DEFAULT_CENTER: LatLon = LatLon { lat: 36.45, lon: 10.85 };
pub const DEFAULT_ZOOM: u8 = 4;
/// Zoom used when centring on an upload centroid.
pub const CENTROID_ZOOM: u8 = 12;
/// Deepest zoom a view may request.
pub const MAX_ZOOM: u8 = 24;

pub const ATTRIBUTION: &str =
    "Map Data &copy; <a href=\"https://earthengine.google.com/\">Google Earth Engine</a>";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapView {
    pub center: LatLon,
    pub zoom: u8,
}

impl MapView {
    /// Centre on `centroid` at close zoom, or on the configured default.
    pub fn from_centroid(centroid: Option<LatLon>, config: &ViewerConfig) -> Self {
        match centroid {
            Some(center) => Self { center, zoom: config.centroid_zoom },
            None => Self { center: config.default_center, zoom: config.default_zoom },
        }
    }

    /// The tile under the view centre.
    pub fn center_tile(&self) -> TileAddr {
        TileAddr::from_latlon(self.center, u32::from(self.zoom))
    }
}

/// A selectable background map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BaseLayer {
    pub name: &'static str,
    pub tiles: &'static str,
}

pub const BASE_LAYERS: [BaseLayer; 2] = [
    BaseLayer { name: "Open Street Map", tiles: "openstreetmap" },
    BaseLayer { name: "Dark Basemap", tiles: "cartodbdark_matter" },
];

/// An overlay registered with the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedLayer {
    pub name: String,
    pub kind: LayerKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    pub map_id: String,
    pub tile_url: String,
    pub attribution: &'static str,
    pub vis: VisParams,
    /// Tile URL expanded for the tile under the view centre.
    pub center_tile_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legends {
    pub mode: AccessibilityMode,
    pub index: IndexLegend,
    pub classes: Vec<LegendEntry>,
}

impl Legends {
    pub fn for_mode(mode: AccessibilityMode) -> Self {
        let palette = mode.palette();
        Self { mode, index: IndexLegend::new(&palette), classes: legend(&palette) }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapDocument {
    pub view: MapView,
    pub base_layers: Vec<BaseLayer>,
    pub overlays: Vec<RenderedLayer>,
    /// Layer switcher, shown collapsed.
    pub layer_control: bool,
    pub legends: Legends,
}

/// Register every layer with the catalog, in order. The first failure aborts
/// the render.
pub fn render<C: Catalog + ?Sized>(
    catalog: &C,
    layers: &[Layer],
    view: MapView,
    mode: AccessibilityMode,
) -> Result<MapDocument, CatalogError> {
    let tile = view.center_tile();
    let mut overlays = Vec::with_capacity(layers.len());

    for layer in layers {
        let map_id = catalog.map_id(&layer.image, &layer.vis)?;
        debug!(layer = %layer.name, map_id = %map_id.id, "overlay registered");
        overlays.push(RenderedLayer {
            name: layer.name.clone(),
            kind: layer.kind,
            date: layer.date,
            center_tile_url: tile.fill_template(&map_id.tile_url),
            map_id: map_id.id,
            tile_url: map_id.tile_url,
            attribution: ATTRIBUTION,
            vis: layer.vis.clone(),
        });
    }

    info!(overlays = overlays.len(), zoom = view.zoom, "map document rendered");
    Ok(MapDocument {
        view,
        base_layers: BASE_LAYERS.to_vec(),
        overlays,
        layer_control: true,
        legends: Legends::for_mode(mode),
    })
}
