//! Configuration types for the classification tools.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Configuration for cross-validation fold splitting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoldConfig {
    /// Seed used when `--random_seed` is not given
    #[serde(default = "default_random_seed")]
    pub random_seed: i64,
}

fn default_random_seed() -> i64 {
    123
}

impl Default for FoldConfig {
    fn default() -> Self {
        Self {
            random_seed: default_random_seed(),
        }
    }
}

/// Configuration for elevation-window filtering of photon CSVs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElevationConfig {
    /// Column holding the photon elevation
    #[serde(default = "default_elevation_column")]
    pub column: String,

    /// Photons at or below this elevation are dropped
    #[serde(default = "default_min_elevation")]
    pub min_elevation: f64,

    /// Photons at or above this elevation are dropped
    #[serde(default = "default_max_elevation")]
    pub max_elevation: f64,
}

fn default_elevation_column() -> String {
    "geoid_corrected_h".to_string()
}

fn default_min_elevation() -> f64 {
    -80.0
}

fn default_max_elevation() -> f64 {
    20.0
}

impl Default for ElevationConfig {
    fn default() -> Self {
        Self {
            column: default_elevation_column(),
            min_elevation: default_min_elevation(),
            max_elevation: default_max_elevation(),
        }
    }
}

/// Configuration for metric charts and tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotConfig {
    /// Image width in pixels
    #[serde(default = "default_plot_width")]
    pub width: u32,

    /// Image height in pixels
    #[serde(default = "default_plot_height")]
    pub height: u32,

    /// Font size for table cells
    #[serde(default = "default_font_size")]
    pub font_size: u32,
}

fn default_plot_width() -> u32 {
    1600
}

fn default_plot_height() -> u32 {
    900
}

fn default_font_size() -> u32 {
    18
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            width: default_plot_width(),
            height: default_plot_height(),
            font_size: default_font_size(),
        }
    }
}

/// Configuration for the labeled photon segment viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Along-track length of one segment in meters
    #[serde(default = "default_segment_size")]
    pub segment_size: u64,

    /// RGB colors keyed by class label
    #[serde(default = "default_label_colors")]
    pub label_colors: BTreeMap<i64, [u8; 3]>,

    /// Legend names keyed by class label
    #[serde(default = "default_label_names")]
    pub label_names: BTreeMap<i64, String>,

    /// Marker radius in pixels
    #[serde(default = "default_marker_size")]
    pub marker_size: u32,
}

fn default_segment_size() -> u64 {
    10_000
}

fn default_label_colors() -> BTreeMap<i64, [u8; 3]> {
    let mut colors = BTreeMap::new();
    colors.insert(0, [169, 169, 169]); // dark gray
    colors.insert(40, [255, 0, 255]); // magenta
    colors.insert(41, [0, 255, 255]); // cyan
    colors.insert(45, [0, 0, 255]); // blue
    colors
}

fn default_label_names() -> BTreeMap<i64, String> {
    let mut names = BTreeMap::new();
    names.insert(0, "other".to_string());
    names.insert(40, "bathymetry".to_string());
    names.insert(41, "sea surface".to_string());
    names.insert(45, "water column".to_string());
    names
}

fn default_marker_size() -> u32 {
    2
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            segment_size: default_segment_size(),
            label_colors: default_label_colors(),
            label_names: default_label_names(),
            marker_size: default_marker_size(),
        }
    }
}

/// Configuration for one-vs-rest prediction scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Class scored against everything else
    #[serde(default = "default_scored_class")]
    pub class: i64,
}

fn default_scored_class() -> i64 {
    40
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            class: default_scored_class(),
        }
    }
}

/// Top-level configuration combining all sub-configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub folds: FoldConfig,

    #[serde(default)]
    pub elevation: ElevationConfig,

    #[serde(default)]
    pub plot: PlotConfig,

    #[serde(default)]
    pub viewer: ViewerConfig,

    #[serde(default)]
    pub scoring: ScoringConfig,
}

impl ToolsConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: ToolsConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
