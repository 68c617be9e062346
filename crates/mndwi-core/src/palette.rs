//! Accessibility palettes.
//!
//! A mode selects a raw-index ramp and a classified set together; the two are
//! never mixed across modes.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Colors of the raw index ramp.
pub const INDEX_COLORS: usize = 6;
/// Colors of the classified set.
pub const CLASSIFIED_COLORS: usize = 7;

/// Raw-index ramp and classified colors of one mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Palette {
    pub index: [&'static str; INDEX_COLORS],
    pub classified: [&'static str; CLASSIFIED_COLORS],
}

/// Colorblind-friendly palette modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AccessibilityMode {
    #[default]
    Normal,
    #[serde(rename = "Non Banjir")]
    NonBanjir,
    #[serde(rename = "Banjir Ringan")]
    BanjirRingan,
    #[serde(rename = "Banjir Sedang")]
    BanjirSedang,
    #[serde(rename = "Banjir Tinggi")]
    BanjirTinggi,
}

const NORMAL: Palette = Palette {
    index: ["#ffffe5", "#f7fcb9", "#78c679", "#41ab5d", "#238443", "#005a32"],
    classified: ["#a50026", "#ed5e3d", "#f9f7ae", "#f4ff78", "#9ed569", "#229b51", "#006837"],
};

const NON_BANJIR: Palette = Palette {
    index: ["#fffaa1", "#f4ef8e", "#9a5d67", "#573f73", "#372851", "#191135"],
    classified: ["#95a600", "#92ed3e", "#affac5", "#78ffb0", "#69d6c6", "#22459c", "#000e69"],
};

const BANJIR_RINGAN: Palette = Palette {
    index: ["#a6f697", "#7def75", "#2dcebb", "#1597ab", "#0c677e", "#002c47"],
    classified: ["#95a600", "#92ed3e", "#affac5", "#78ffb0", "#69d6c6", "#22459c", "#000e69"],
};

const BANJIR_SEDANG: Palette = Palette {
    index: ["#cdffd7", "#a1fbb6", "#6cb5c6", "#3a77a5", "#205080", "#001752"],
    classified: ["#ed4700", "#ed8a00", "#e1fabe", "#99ff94", "#87bede", "#2e40cf", "#0600bc"],
};

const BANJIR_TINGGI: Palette = Palette {
    index: ["#407de0", "#2763da", "#394388", "#272c66", "#16194f", "#010034"],
    classified: ["#004f3d", "#338796", "#66a4f5", "#3683ff", "#3d50ca", "#421c7f", "#290058"],
};

impl AccessibilityMode {
    /// All modes, in selection-list order.
    pub const ALL: &[AccessibilityMode] = &[
        Self::Normal,
        Self::NonBanjir,
        Self::BanjirRingan,
        Self::BanjirSedang,
        Self::BanjirTinggi,
    ];

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::NonBanjir => "Non Banjir",
            Self::BanjirRingan => "Banjir Ringan",
            Self::BanjirSedang => "Banjir Sedang",
            Self::BanjirTinggi => "Banjir Tinggi",
        }
    }

    pub fn palette(&self) -> Palette {
        match self {
            Self::Normal => NORMAL,
            Self::NonBanjir => NON_BANJIR,
            Self::BanjirRingan => BANJIR_RINGAN,
            Self::BanjirSedang => BANJIR_SEDANG,
            Self::BanjirTinggi => BANJIR_TINGGI,
        }
    }
}

impl fmt::Display for AccessibilityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AccessibilityMode {
    type Err = ConfigError;

    /// Accepts the display name, case-insensitively, with `-`/`_` for spaces.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace(['-', '_'], " ");
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.name().to_ascii_lowercase() == wanted)
            .ok_or_else(|| ConfigError::AccessibilityMode(s.to_string()))
    }
}

/// Continuous legend for the raw index: the ramp spans -1 to 1.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexLegend {
    pub min: f32,
    pub max: f32,
    pub colors: Vec<String>,
}

impl IndexLegend {
    pub fn new(palette: &Palette) -> Self {
        Self {
            min: -1.0,
            max: 1.0,
            colors: palette.index.iter().map(|c| (*c).to_string()).collect(),
        }
    }
}
