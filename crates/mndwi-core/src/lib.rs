//! Surface-water mapping from Sentinel-2 composites.
//!
//! Uploaded GeoJSON becomes an area of interest; each anchor date becomes a
//! cloud-filtered median composite, a masked MNDWI image and a five-class
//! flood map. All imagery stays deferred as [`expr::ImageExpr`] trees until a
//! [`catalog::Catalog`] renders or an [`eval::Evaluator`] materializes it.

pub mod aoi;
pub mod catalog;
pub mod classify;
pub mod composite;
pub mod config;
pub mod coords;
pub mod error;
pub mod eval;
pub mod expr;
pub mod geometry;
pub mod image;
pub mod index;
pub mod layers;
pub mod map;
pub mod palette;
pub mod pipeline;
pub mod raster;
pub mod window;

pub use aoi::{Aoi, Session};
pub use catalog::{Catalog, InMemoryCatalog};
pub use config::{CloudThreshold, ViewerConfig};
pub use error::{Error, Result};
pub use geometry::parse_uploads;
pub use palette::AccessibilityMode;
pub use pipeline::{MapRequest, MndwiPipeline};
