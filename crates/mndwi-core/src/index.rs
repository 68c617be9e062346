//! Water index engine.
//!
//! `index = (SWIR - Green) / (SWIR + Green)`, nominally in [-1, 1], then
//! masked to `index >= 0`. Negative (water-dominated) pixels are treated as
//! noise for the land-focused classification and vanish from every
//! downstream layer.
use std::sync::Arc;

use crate::config::BandNames;
use crate::error::ImageError;
use crate::expr::ImageExpr;
use crate::image::Image;

/// Output band name of a normalized difference.
pub const INDEX_BAND: &str = "nd";

/// Pixels below this value are masked after the index is computed.
pub const MASK_THRESHOLD: f32 = 0.0;

/// Deferred index expressions for one composite.
#[derive(Debug, Clone)]
pub struct IndexExprs {
    pub raw: Arc<ImageExpr>,
    pub masked: Arc<ImageExpr>,
}

/// Builds the index chain from configured band names.
#[derive(Debug, Clone)]
pub struct IndexEngine {
    pub green: String,
    pub swir: String,
}

impl IndexEngine {
    pub fn new(bands: &BandNames) -> Self {
        Self { green: bands.green.clone(), swir: bands.swir.clone() }
    }

    pub fn describe(&self, composite: &Arc<ImageExpr>) -> IndexExprs {
        let raw = ImageExpr::normalized_difference(composite, &self.swir, &self.green);
        let masked = ImageExpr::mask_below(&raw, MASK_THRESHOLD);
        IndexExprs { raw, masked }
    }
}

/// Per-pixel `(a - b) / (a + b)` into a single `nd` band. Masked inputs and a
/// zero denominator give a masked output. An empty image stays empty.
pub fn normalized_difference(img: &Image, positive: &str, negative: &str) -> Result<Image, ImageError> {
    if img.is_empty() {
        return Ok(Image::empty());
    }
    let a = img.band(positive).ok_or_else(|| ImageError::MissingBand(positive.to_string()))?;
    let b = img.band(negative).ok_or_else(|| ImageError::MissingBand(negative.to_string()))?;

    let nd = a.zip_map(b, |a, b| {
        let sum = a + b;
        if a.is_nan() || b.is_nan() || sum.abs() < 1e-10 {
            f32::NAN
        } else {
            (a - b) / sum
        }
    });
    Ok(Image::single(INDEX_BAND, nd))
}

/// Mask every pixel of every band that is below `threshold`.
pub fn mask_below(img: &Image, threshold: f32) -> Image {
    let Some(grid) = img.grid() else {
        return Image::empty();
    };
    let mut out = Image::on_grid(grid);
    for name in img.band_names() {
        if let Some(band) = img.band(name) {
            out.insert(name, band.map(|v| if v >= threshold { v } else { f32::NAN }));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{Grid, Raster};
    use approx::assert_relative_eq;

    fn composite(green: Vec<f32>, swir: Vec<f32>) -> Image {
        let grid = Grid::new(green.len(), 1, 0.0, 1.0, 0.0, 1.0);
        let mut img = Image::on_grid(grid);
        img.insert("B3", Raster::from_vec(grid, green));
        img.insert("B11", Raster::from_vec(grid, swir));
        img
    }

    #[test]
    fn swir_minus_green_over_sum() {
        let img = composite(vec![0.1, 0.3, 0.2], vec![0.3, 0.1, 0.2]);
        let nd = normalized_difference(&img, "B11", "B3").unwrap();
        let band = nd.band(INDEX_BAND).unwrap();
        assert_relative_eq!(band.data[0], 0.5, epsilon = 1e-6);
        assert_relative_eq!(band.data[1], -0.5, epsilon = 1e-6);
        assert_relative_eq!(band.data[2], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn zero_denominator_and_masked_inputs_are_masked() {
        let img = composite(vec![0.0, f32::NAN], vec![0.0, 0.2]);
        let nd = normalized_difference(&img, "B11", "B3").unwrap();
        assert_eq!(nd.valid_pixels(), 0);
    }

    #[test]
    fn negative_index_is_masked_zero_is_kept() {
        let img = composite(vec![0.1, 0.3, 0.2], vec![0.3, 0.1, 0.2]);
        let nd = normalized_difference(&img, "B11", "B3").unwrap();
        let masked = mask_below(&nd, MASK_THRESHOLD);
        let band = masked.band(INDEX_BAND).unwrap();
        assert!(!band.data[0].is_nan());
        assert!(band.data[1].is_nan());
        assert_eq!(band.data[2], 0.0);
    }

    #[test]
    fn missing_band_is_an_error() {
        let img = composite(vec![0.1], vec![0.2]);
        assert!(matches!(normalized_difference(&img, "B12", "B3"), Err(ImageError::MissingBand(b)) if b == "B12"));
    }

    #[test]
    fn empty_composite_stays_empty() {
        let nd = normalized_difference(&Image::empty(), "B11", "B3").unwrap();
        assert!(nd.is_empty());
        assert!(mask_below(&nd, 0.0).is_empty());
    }
}
