//! Named, styled map layers for one or two dates.
//!
//! Layers only reference image expressions; they never hold pixels.
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};
use tracing::info;

use crate::expr::ImageExpr;
use crate::palette::Palette;
use crate::window::DATE_FORMAT;

/// Rendering parameters handed to the catalog with an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bands: Option<Vec<String>>,
    pub min: f32,
    pub max: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gamma: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub palette: Option<Vec<String>>,
}

impl VisParams {
    /// Red/green/blue composite over reflectance 0..1.
    pub fn true_color(bands: &[String; 3]) -> Self {
        Self {
            bands: Some(bands.to_vec()),
            min: 0.0,
            max: 1.0,
            gamma: Some(1.0),
            palette: None,
        }
    }

    /// Masked index over 0..1 with the mode's ramp.
    pub fn raw_index(palette: &Palette) -> Self {
        Self {
            bands: None,
            min: 0.0,
            max: 1.0,
            gamma: None,
            palette: Some(palette.index.iter().map(|c| (*c).to_string()).collect()),
        }
    }

    /// Classes 1..7 with the mode's classified colors.
    pub fn classified(palette: &Palette) -> Self {
        Self {
            bands: None,
            min: 1.0,
            max: 7.0,
            gamma: None,
            palette: Some(palette.classified.iter().map(|c| (*c).to_string()).collect()),
        }
    }
}

/// Visualization parameters for the three layer kinds.
#[derive(Debug, Clone, PartialEq)]
pub struct VisBundle {
    pub true_color: VisParams,
    pub raw_index: VisParams,
    pub classified: VisParams,
}

impl VisBundle {
    pub fn new(true_color_bands: &[String; 3], palette: &Palette) -> Self {
        Self {
            true_color: VisParams::true_color(true_color_bands),
            raw_index: VisParams::raw_index(palette),
            classified: VisParams::classified(palette),
        }
    }

    fn for_kind(&self, kind: LayerKind) -> &VisParams {
        match kind {
            LayerKind::TrueColor => &self.true_color,
            LayerKind::RawIndex => &self.raw_index,
            LayerKind::Classified => &self.classified,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    TrueColor,
    RawIndex,
    Classified,
}

impl LayerKind {
    pub const ALL: [LayerKind; 3] = [LayerKind::TrueColor, LayerKind::RawIndex, LayerKind::Classified];

    pub fn title(&self) -> &'static str {
        match self {
            LayerKind::TrueColor => "Satellite Imagery",
            LayerKind::RawIndex => "Raw mndwi",
            LayerKind::Classified => "Reclassified mndwi",
        }
    }
}

/// Deferred imagery of one date.
#[derive(Debug, Clone)]
pub struct DateProducts {
    pub anchor: NaiveDate,
    pub composite: Arc<ImageExpr>,
    /// Masked index.
    pub index: Arc<ImageExpr>,
    pub classified: Arc<ImageExpr>,
}

impl DateProducts {
    fn image(&self, kind: LayerKind) -> &Arc<ImageExpr> {
        match kind {
            LayerKind::TrueColor => &self.composite,
            LayerKind::RawIndex => &self.index,
            LayerKind::Classified => &self.classified,
        }
    }
}

/// A renderable reference to one image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layer {
    pub name: String,
    pub kind: LayerKind,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_date")]
    pub date: Option<NaiveDate>,
    #[serde(rename = "expression", serialize_with = "serialize_expr")]
    pub image: Arc<ImageExpr>,
    pub vis: VisParams,
}

fn serialize_expr<S: Serializer>(expr: &Arc<ImageExpr>, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(expr.as_ref())
}

fn serialize_date<S: Serializer>(date: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
    match date {
        Some(d) => s.collect_str(&d.format(DATE_FORMAT)),
        None => s.serialize_none(),
    }
}

/// Three undated layers from `updated` when both anchors coincide, otherwise
/// six dated layers: true color, raw index, classified, each initial then
/// updated.
pub fn build_layers(initial: &DateProducts, updated: &DateProducts, vis: &VisBundle) -> Vec<Layer> {
    let layers: Vec<Layer> = if initial.anchor == updated.anchor {
        LayerKind::ALL
            .iter()
            .map(|&kind| Layer {
                name: kind.title().to_string(),
                kind,
                date: None,
                image: Arc::clone(updated.image(kind)),
                vis: vis.for_kind(kind).clone(),
            })
            .collect()
    } else {
        LayerKind::ALL
            .iter()
            .flat_map(|&kind| {
                [("Initial", initial), ("Updated", updated)].map(|(prefix, products)| Layer {
                    name: format!("{prefix} {}: {}", kind.title(), products.anchor.format(DATE_FORMAT)),
                    kind,
                    date: Some(products.anchor),
                    image: Arc::clone(products.image(kind)),
                    vis: vis.for_kind(kind).clone(),
                })
            })
            .collect()
    };

    info!(count = layers.len(), "map layers built");
    layers
}
