//! Viewer configuration: user inputs and fixed processing constants.
//! Every field has a default, so an empty JSON object is a valid config.
use std::fmt;
use std::str::FromStr;

use chrono::{Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::aoi::FALLBACK_POINT;
use crate::catalog::{DEFAULT_CLOUD_PROPERTY, DEFAULT_COLLECTION};
use crate::classify::GapPolicy;
use crate::composite::REFLECTANCE_SCALE;
use crate::coords::LatLon;
use crate::error::ConfigError;
use crate::map::{CENTROID_ZOOM, DEFAULT_CENTER, DEFAULT_ZOOM, MAX_ZOOM};
use crate::window::LOOKBACK_DAYS;

/// Days subtracted from today for the default anchor dates, so fresh
/// acquisitions have had time to reach the catalog.
pub const DEFAULT_DATE_DELAY_DAYS: u64 = 2;

/// Cloud cover upper bound in percent: 5..=100 in steps of 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct CloudThreshold(u32);

impl CloudThreshold {
    pub const MIN: u32 = 5;
    pub const MAX: u32 = 100;
    pub const STEP: u32 = 5;

    pub fn new(percent: u32) -> Result<Self, ConfigError> {
        if (Self::MIN..=Self::MAX).contains(&percent) && percent % Self::STEP == 0 {
            Ok(Self(percent))
        } else {
            Err(ConfigError::CloudThreshold(percent))
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for CloudThreshold {
    fn default() -> Self {
        Self(85)
    }
}

impl TryFrom<u32> for CloudThreshold {
    type Error = ConfigError;

    fn try_from(v: u32) -> Result<Self, Self::Error> {
        Self::new(v)
    }
}

impl From<CloudThreshold> for u32 {
    fn from(c: CloudThreshold) -> u32 {
        c.0
    }
}

impl fmt::Display for CloudThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl FromStr for CloudThreshold {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let v: u32 = s
            .trim()
            .trim_end_matches('%')
            .parse()
            .map_err(|_| ConfigError::CloudThreshold(0))?;
        Self::new(v)
    }
}

/// Spectral band names of the queried collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandNames {
    pub green: String,
    pub swir: String,
    /// Red, green, blue.
    pub true_color: [String; 3],
}

impl Default for BandNames {
    fn default() -> Self {
        Self {
            green: "B3".to_string(),
            swir: "B11".to_string(),
            true_color: ["B4".to_string(), "B3".to_string(), "B2".to_string()],
        }
    }
}

/// Full viewer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub collection: String,
    pub cloud_property: String,
    pub cloud_threshold: CloudThreshold,
    pub reflectance_scale: f32,
    pub lookback_days: u64,
    pub bands: BandNames,
    /// AOI used when an upload yields no geometry.
    pub fallback_point: LatLon,
    /// Map centre when no upload centroid is known.
    pub default_center: LatLon,
    pub default_zoom: u8,
    pub centroid_zoom: u8,
    pub gap_policy: GapPolicy,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            cloud_property: DEFAULT_CLOUD_PROPERTY.to_string(),
            cloud_threshold: CloudThreshold::default(),
            reflectance_scale: REFLECTANCE_SCALE,
            lookback_days: LOOKBACK_DAYS,
            bands: BandNames::default(),
            fallback_point: FALLBACK_POINT,
            default_center: DEFAULT_CENTER,
            default_zoom: DEFAULT_ZOOM,
            centroid_zoom: CENTROID_ZOOM,
            gap_policy: GapPolicy::default(),
        }
    }
}

impl ViewerConfig {
    pub fn from_json(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reflectance_scale.is_nan() || self.reflectance_scale <= 0.0 {
            return Err(ConfigError::Scale(self.reflectance_scale));
        }
        for zoom in [self.default_zoom, self.centroid_zoom] {
            if zoom > MAX_ZOOM {
                return Err(ConfigError::Zoom(zoom));
            }
        }
        Ok(())
    }
}

/// Default anchor date: today (UTC) minus the ingestion delay.
pub fn default_anchor_date() -> NaiveDate {
    default_anchor_from(Utc::now().date_naive())
}

pub fn default_anchor_from(today: NaiveDate) -> NaiveDate {
    today
        .checked_sub_days(Days::new(DEFAULT_DATE_DELAY_DAYS))
        .unwrap_or(today)
}
