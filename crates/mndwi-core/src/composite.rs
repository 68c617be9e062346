//! Collection compositor: cloud/date/bounds filtering, clip, rescale, median.
use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use crate::aoi::{Aoi, ClipMask};
use crate::catalog::{CollectionQuery, Scene};
use crate::config::{CloudThreshold, ViewerConfig};
use crate::error::CatalogError;
use crate::expr::ImageExpr;
use crate::image::Image;
use crate::raster::{median_stack, Grid, Raster};
use crate::window::DateWindow;

/// Divisor turning surface reflectance digital numbers into reflectance.
pub const REFLECTANCE_SCALE: f32 = 10_000.0;

/// Builds composite expressions for one collection.
#[derive(Debug, Clone)]
pub struct Compositor {
    pub collection: String,
    pub cloud_property: String,
    pub scale: f32,
}

impl Compositor {
    pub fn from_config(config: &ViewerConfig) -> Self {
        Self {
            collection: config.collection.clone(),
            cloud_property: config.cloud_property.clone(),
            scale: config.reflectance_scale,
        }
    }

    /// Describe the median composite of `window` over `aoi`. Nothing is
    /// fetched until the expression is evaluated.
    pub fn describe(&self, cloud: CloudThreshold, window: DateWindow, aoi: &Arc<Aoi>) -> Arc<ImageExpr> {
        let query = CollectionQuery {
            collection: self.collection.clone(),
            cloud_property: self.cloud_property.clone(),
            max_cloud: f64::from(cloud.get()),
            window,
            aoi: Arc::clone(aoi),
        };
        ImageExpr::composite(query, self.scale)
    }
}

/// Resample every scene onto one grid covering all footprints, clip to
/// `clip`, divide by `scale`, and reduce per band by median. Cells a scene
/// does not cover are masked in that scene. No scenes yields an empty image,
/// not an error.
pub fn reduce_median(scenes: &[Arc<Scene>], clip: &ClipMask, scale: f32) -> Result<Image, CatalogError> {
    let mut grids = Vec::with_capacity(scenes.len());
    for scene in scenes {
        let Some(grid) = scene.grid() else {
            continue;
        };
        for (name, band) in &scene.bands {
            if band.grid() != grid {
                return Err(CatalogError::GridMismatch {
                    scene: scene.id.clone(),
                    band: name.clone(),
                    expected: grid,
                    got: band.grid(),
                });
            }
        }
        grids.push(grid);
    }
    let Some(target) = covering_grid(&grids) else {
        return Ok(Image::empty());
    };

    let keep = clip_cells(target, clip);
    let band_names: BTreeSet<&str> = scenes
        .iter()
        .flat_map(|s| s.bands.keys().map(String::as_str))
        .collect();

    let mut out = Image::on_grid(target);
    for name in band_names {
        let prepared: Vec<Raster> = scenes
            .iter()
            .filter_map(|s| s.bands.get(name))
            .map(|band| resample_clip_scale(band, target, &keep, scale))
            .collect();
        let refs: Vec<&Raster> = prepared.iter().collect();
        out.insert(name, median_stack(target, &refs));
    }

    debug!(
        scenes = scenes.len(),
        width = target.width,
        height = target.height,
        kept = keep.iter().filter(|k| **k).count(),
        "median composite reduced"
    );
    Ok(out)
}

/// Union of `grids` at the pixel size of the first one. A single grid, or
/// several identical ones, come back unchanged.
fn covering_grid(grids: &[Grid]) -> Option<Grid> {
    let first = *grids.first()?;
    let (dx, dy) = first.cell_size();
    if grids.iter().all(|g| *g == first)
        || first.is_empty()
        || !(dx.is_finite() && dy.is_finite() && dx > 0.0 && dy > 0.0)
    {
        return Some(first);
    }

    let min_lon = grids.iter().map(|g| g.min_lon).fold(f64::INFINITY, f64::min);
    let max_lon = grids.iter().map(|g| g.max_lon).fold(f64::NEG_INFINITY, f64::max);
    let min_lat = grids.iter().map(|g| g.min_lat).fold(f64::INFINITY, f64::min);
    let max_lat = grids.iter().map(|g| g.max_lat).fold(f64::NEG_INFINITY, f64::max);

    let width = (((max_lon - min_lon) / dx).round() as usize).max(1);
    let height = (((max_lat - min_lat) / dy).round() as usize).max(1);
    Some(Grid::new(
        width,
        height,
        min_lon,
        min_lon + width as f64 * dx,
        min_lat,
        min_lat + height as f64 * dy,
    ))
}

/// Per-cell clip decision for `grid`, by pixel centre.
fn clip_cells(grid: Grid, clip: &ClipMask) -> Vec<bool> {
    let mut keep = Vec::with_capacity(grid.len());
    for row in 0..grid.height {
        for col in 0..grid.width {
            let (lon, lat) = grid.cell_center(row, col);
            keep.push(clip.keeps(lon, lat));
        }
    }
    keep
}

fn resample_clip_scale(band: &Raster, target: Grid, keep: &[bool], scale: f32) -> Raster {
    let mut out = Raster::new(target, f32::NAN);
    for row in 0..target.height {
        for col in 0..target.width {
            if keep[row * target.width + col] {
                let (lon, lat) = target.cell_center(row, col);
                out.set(row, col, band.sample(lon, lat) / scale);
            }
        }
    }
    out
}
