//! Fixed-breakpoint classification of the masked water index.
//!
//! Rules are half-open `[min, max)` ranges evaluated independently against the
//! input value; a later matching rule overwrites an earlier one. The ranges
//! leave gaps at `[-0.1, 0)`, `[0.2, 0.21)` and `[0.65, 1]`. Under
//! [`GapPolicy::PassThrough`] gap pixels keep their index value; under
//! [`GapPolicy::NoDataClass`] they become [`NO_DATA_CLASS`]. Masked pixels
//! stay masked either way.
use serde::{Deserialize, Serialize};

use crate::image::Image;
use crate::palette::Palette;
use crate::raster::Raster;

/// Sentinel class for gap pixels under [`GapPolicy::NoDataClass`].
pub const NO_DATA_CLASS: u8 = 0;

/// Highest class label.
pub const MAX_CLASS: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassRule {
    /// Inclusive lower bound.
    pub min: f32,
    /// Exclusive upper bound.
    pub max: f32,
    pub class: u8,
}

impl ClassRule {
    pub const fn new(min: f32, max: f32, class: u8) -> Self {
        Self { min, max, class }
    }

    #[inline]
    pub fn contains(&self, v: f32) -> bool {
        v >= self.min && v < self.max
    }
}

/// Breakpoints for the water index. Class 1 cannot fire after masking but is
/// kept as part of the rule set.
pub const MNDWI_RULES: [ClassRule; 5] = [
    ClassRule::new(-1.0, -0.1, 1),
    ClassRule::new(0.0, 0.2, 2),
    ClassRule::new(0.21, 0.35, 3),
    ClassRule::new(0.35, 0.45, 4),
    ClassRule::new(0.45, 0.65, 5),
];

/// Legend text per class, 1-based.
pub const CLASS_LABELS: [&str; MAX_CLASS as usize] = [
    "Vegetasi lainnya (Built-up/Rocks/Sand Surfaces)",
    "Non Banjir",
    "Banjir Ringan",
    "Banjir Sedang",
    "Banjir Tinggi",
];

/// What happens to unmasked pixels no rule matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapPolicy {
    /// Keep the original index value.
    #[default]
    PassThrough,
    /// Replace with [`NO_DATA_CLASS`].
    NoDataClass,
}

impl std::str::FromStr for GapPolicy {
    type Err = crate::error::ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "pass_through" | "passthrough" => Ok(GapPolicy::PassThrough),
            "no_data_class" | "nodata" | "no_data" => Ok(GapPolicy::NoDataClass),
            _ => Err(crate::error::ConfigError::GapPolicy(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassScheme {
    pub rules: Vec<ClassRule>,
    pub gap_policy: GapPolicy,
}

impl ClassScheme {
    pub fn mndwi(gap_policy: GapPolicy) -> Self {
        Self { rules: MNDWI_RULES.to_vec(), gap_policy }
    }

    /// Decide the class of one index value.
    pub fn class_of(&self, v: f32) -> PixelClass {
        if v.is_nan() {
            return PixelClass::Masked;
        }
        let mut class = None;
        for rule in &self.rules {
            if rule.contains(v) {
                class = Some(rule.class);
            }
        }
        match (class, self.gap_policy) {
            (Some(c), _) => PixelClass::Class(c),
            (None, GapPolicy::PassThrough) => PixelClass::Unclassified(v),
            (None, GapPolicy::NoDataClass) => PixelClass::Class(NO_DATA_CLASS),
        }
    }

    /// Output pixel value: the class label, or the untouched input.
    pub fn classify_value(&self, v: f32) -> f32 {
        match self.class_of(v) {
            PixelClass::Class(c) => f32::from(c),
            PixelClass::Unclassified(_) | PixelClass::Masked => v,
        }
    }

    pub fn classify_raster(&self, band: &Raster) -> Raster {
        band.map(|v| self.classify_value(v))
    }
}

/// Classify every band of `img`.
pub fn classify_image(img: &Image, scheme: &ClassScheme) -> Image {
    let Some(grid) = img.grid() else {
        return Image::empty();
    };
    let mut out = Image::on_grid(grid);
    for name in img.band_names() {
        if let Some(band) = img.band(name) {
            out.insert(name, scheme.classify_raster(band));
        }
    }
    out
}

/// Interpretation of one classified pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PixelClass {
    Class(u8),
    Unclassified(f32),
    Masked,
}

/// Pixel counts of a classified index image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassHistogram {
    /// Index 0 is [`NO_DATA_CLASS`], 1..=5 the ordinal classes. Rules mapping
    /// past [`MAX_CLASS`] count as unclassified.
    pub classes: [usize; MAX_CLASS as usize + 1],
    pub unclassified: usize,
    pub masked: usize,
}

impl ClassHistogram {
    /// Tally `index` under `scheme`. Working from the index rather than the
    /// classified output keeps class 1 apart from a passed-through 1.0.
    pub fn tally(index: &Raster, scheme: &ClassScheme) -> Self {
        let mut h = Self::default();
        for &v in &index.data {
            match scheme.class_of(v) {
                PixelClass::Class(c) => match h.classes.get_mut(usize::from(c)) {
                    Some(slot) => *slot += 1,
                    None => h.unclassified += 1,
                },
                PixelClass::Unclassified(_) => h.unclassified += 1,
                PixelClass::Masked => h.masked += 1,
            }
        }
        h
    }

    pub fn total(&self) -> usize {
        self.classes.iter().sum::<usize>() + self.unclassified + self.masked
    }
}

/// One row of the classified legend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendEntry {
    pub class: u8,
    pub label: String,
    pub color: String,
}

/// Class labels paired with the first five colors of the classified palette.
pub fn legend(palette: &Palette) -> Vec<LegendEntry> {
    CLASS_LABELS
        .iter()
        .zip(palette.classified.iter())
        .enumerate()
        .map(|(i, (label, color))| LegendEntry {
            class: i as u8 + 1,
            label: (*label).to_string(),
            color: (*color).to_string(),
        })
        .collect()
}
