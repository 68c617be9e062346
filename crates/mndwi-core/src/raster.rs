use serde::{Deserialize, Serialize};

#[cfg(feature = "threading")]
use rayon::prelude::*;

/// A single image band stored as f32 reflectance (or index) values, row-major.
/// Row 0 is the southern edge (min_lat). `NaN` marks a masked pixel.
/// Coordinate math uses f64; pixel values use f32.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Raster {
    /// Row-major pixel values; `NaN` = masked / no data.
    pub data: Vec<f32>,
    pub width: usize,
    pub height: usize,
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

/// Pixel grid shared by all bands of an image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub width: usize,
    pub height: usize,
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl Grid {
    pub fn new(width: usize, height: usize, min_lon: f64, max_lon: f64, min_lat: f64, max_lat: f64) -> Self {
        Self { width, height, min_lon, max_lon, min_lat, max_lat }
    }

    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cell extent in degrees as `(dx, dy)`.
    pub fn cell_size(&self) -> (f64, f64) {
        (
            (self.max_lon - self.min_lon) / self.width as f64,
            (self.max_lat - self.min_lat) / self.height as f64,
        )
    }

    /// Geographic centre of cell `(row, col)` as `(lon, lat)`.
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        let (dx, dy) = self.cell_size();
        (
            self.min_lon + (col as f64 + 0.5) * dx,
            self.min_lat + (row as f64 + 0.5) * dy,
        )
    }

    /// Footprint of the grid as a geo rectangle.
    pub fn footprint(&self) -> geo::Rect<f64> {
        geo::Rect::new(
            geo::coord! { x: self.min_lon, y: self.min_lat },
            geo::coord! { x: self.max_lon, y: self.max_lat },
        )
    }
}

impl Raster {
    /// Create a new Raster on `grid` filled with the given value.
    pub fn new(grid: Grid, fill: f32) -> Self {
        Self::from_vec(grid, vec![fill; grid.len()])
    }

    /// Build a Raster from existing row-major data. Panics if the length does
    /// not match the grid.
    pub fn from_vec(grid: Grid, data: Vec<f32>) -> Self {
        assert_eq!(data.len(), grid.len(), "raster data does not match grid");
        Self {
            data,
            width: grid.width,
            height: grid.height,
            min_lon: grid.min_lon,
            max_lon: grid.max_lon,
            min_lat: grid.min_lat,
            max_lat: grid.max_lat,
        }
    }

    pub fn grid(&self) -> Grid {
        Grid::new(self.width, self.height, self.min_lon, self.max_lon, self.min_lat, self.max_lat)
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.width + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, val: f32) {
        self.data[row * self.width + col] = val;
    }

    /// Value of the cell containing `(lon, lat)`; NaN outside the footprint.
    pub fn sample(&self, lon: f64, lat: f64) -> f32 {
        let g = self.grid();
        if g.is_empty() || lon < g.min_lon || lon >= g.max_lon || lat < g.min_lat || lat >= g.max_lat {
            return f32::NAN;
        }
        let (dx, dy) = g.cell_size();
        let col = (((lon - g.min_lon) / dx) as usize).min(self.width - 1);
        let row = (((lat - g.min_lat) / dy) as usize).min(self.height - 1);
        self.get(row, col)
    }

    /// Number of unmasked pixels.
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|v| !v.is_nan()).count()
    }

    /// Apply `f` to every pixel, producing a new raster on the same grid.
    pub fn map<F>(&self, f: F) -> Raster
    where
        F: Fn(f32) -> f32 + Sync + Send,
    {
        #[cfg(feature = "threading")]
        let data: Vec<f32> = self.data.par_iter().map(|&v| f(v)).collect();
        #[cfg(not(feature = "threading"))]
        let data: Vec<f32> = self.data.iter().map(|&v| f(v)).collect();
        Raster { data, ..self.clone_header() }
    }

    /// Combine two rasters on the same grid pixel by pixel.
    pub fn zip_map<F>(&self, other: &Raster, f: F) -> Raster
    where
        F: Fn(f32, f32) -> f32 + Sync + Send,
    {
        debug_assert_eq!(self.data.len(), other.data.len());
        #[cfg(feature = "threading")]
        let data: Vec<f32> = self
            .data
            .par_iter()
            .zip(other.data.par_iter())
            .map(|(&a, &b)| f(a, b))
            .collect();
        #[cfg(not(feature = "threading"))]
        let data: Vec<f32> = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(&a, &b)| f(a, b))
            .collect();
        Raster { data, ..self.clone_header() }
    }

    fn clone_header(&self) -> Raster {
        Raster {
            data: Vec::new(),
            width: self.width,
            height: self.height,
            min_lon: self.min_lon,
            max_lon: self.max_lon,
            min_lat: self.min_lat,
            max_lat: self.max_lat,
        }
    }
}

/// Per-pixel median across rasters sharing one grid, ignoring masked pixels.
/// Pixels masked in every input stay masked. Even counts average the two
/// middle values.
pub fn median_stack(grid: Grid, layers: &[&Raster]) -> Raster {
    let pixel_median = |i: usize| -> f32 {
        let mut vals: Vec<f32> = layers.iter().map(|r| r.data[i]).filter(|v| !v.is_nan()).collect();
        if vals.is_empty() {
            return f32::NAN;
        }
        vals.sort_by(|a, b| a.total_cmp(b));
        let mid = vals.len() / 2;
        if vals.len() % 2 == 1 {
            vals[mid]
        } else {
            (vals[mid - 1] + vals[mid]) / 2.0
        }
    };

    #[cfg(feature = "threading")]
    let data: Vec<f32> = (0..grid.len()).into_par_iter().map(pixel_median).collect();
    #[cfg(not(feature = "threading"))]
    let data: Vec<f32> = (0..grid.len()).map(pixel_median).collect();

    Raster::from_vec(grid, data)
}
