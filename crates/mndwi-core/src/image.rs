use std::collections::BTreeMap;

use crate::raster::{Grid, Raster};

/// A materialized multi-band image. An image with no grid is empty: it
/// covers nothing and renders as a blank layer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Image {
    grid: Option<Grid>,
    bands: BTreeMap<String, Raster>,
}

impl Image {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Start an image on `grid` with no bands yet.
    pub fn on_grid(grid: Grid) -> Self {
        Self { grid: Some(grid), bands: BTreeMap::new() }
    }

    /// Single-band image.
    pub fn single(name: impl Into<String>, band: Raster) -> Self {
        let mut img = Self::on_grid(band.grid());
        img.insert(name, band);
        img
    }

    pub fn insert(&mut self, name: impl Into<String>, band: Raster) {
        debug_assert_eq!(Some(band.grid()), self.grid);
        self.bands.insert(name.into(), band);
    }

    pub fn is_empty(&self) -> bool {
        self.grid.is_none()
    }

    pub fn grid(&self) -> Option<Grid> {
        self.grid
    }

    pub fn band(&self, name: &str) -> Option<&Raster> {
        self.bands.get(name)
    }

    pub fn band_names(&self) -> impl Iterator<Item = &str> {
        self.bands.keys().map(String::as_str)
    }

    /// The first band, used by single-band derived images.
    pub fn first_band(&self) -> Option<(&str, &Raster)> {
        self.bands.iter().next().map(|(k, v)| (k.as_str(), v))
    }

    /// Unmasked pixels summed over every band.
    pub fn valid_pixels(&self) -> usize {
        self.bands.values().map(Raster::valid_count).sum()
    }
}
