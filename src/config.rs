//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.choromap.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Shared styling settings.
    #[serde(default)]
    pub style: StyleConfig,

    /// Static PNG renderer settings.
    #[serde(default)]
    pub static_map: StaticMapConfig,

    /// Interactive web map settings.
    #[serde(default)]
    pub web_map: WebMapConfig,
}

/// Styling shared by both renderers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleConfig {
    /// Colormap name for choropleth fills.
    #[serde(default = "default_colormap")]
    pub colormap: String,

    /// Fill opacity for choropleth polygons (0.0 - 1.0).
    #[serde(default = "default_fill_opacity")]
    pub fill_opacity: f64,

    /// Outline color as `#rrggbb`.
    #[serde(default = "default_outline_color")]
    pub outline_color: String,

    /// Outline stroke width in pixels.
    #[serde(default = "default_outline_width")]
    pub outline_width: u32,

    /// Marker fill color as `#rrggbb`.
    #[serde(default = "default_marker_color")]
    pub marker_color: String,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            colormap: default_colormap(),
            fill_opacity: default_fill_opacity(),
            outline_color: default_outline_color(),
            outline_width: default_outline_width(),
            marker_color: default_marker_color(),
        }
    }
}

fn default_colormap() -> String {
    "viridis".to_string()
}

fn default_fill_opacity() -> f64 {
    0.75
}

fn default_outline_color() -> String {
    "#2b2b2b".to_string()
}

fn default_outline_width() -> u32 {
    1
}

fn default_marker_color() -> String {
    "#d73027".to_string()
}

/// Static renderer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticMapConfig {
    /// Output width in pixels.
    #[serde(default = "default_width")]
    pub width: u32,

    /// Output height in pixels.
    #[serde(default = "default_height")]
    pub height: u32,

    /// Margin around the plot frame in pixels.
    #[serde(default = "default_margin")]
    pub margin: u32,

    /// Gridline spacing in degrees (0 disables gridlines).
    #[serde(default = "default_grid_spacing")]
    pub grid_spacing_deg: f64,

    /// Draw latitude labels on the left side.
    #[serde(default = "default_true")]
    pub grid_labels_left: bool,

    /// Draw longitude labels along the bottom.
    #[serde(default = "default_true")]
    pub grid_labels_bottom: bool,

    /// Draw longitude labels along the top.
    #[serde(default)]
    pub grid_labels_top: bool,

    /// Draw latitude labels on the right side.
    #[serde(default)]
    pub grid_labels_right: bool,
}

impl Default for StaticMapConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            margin: default_margin(),
            grid_spacing_deg: default_grid_spacing(),
            grid_labels_left: true,
            grid_labels_bottom: true,
            grid_labels_top: false,
            grid_labels_right: false,
        }
    }
}

fn default_width() -> u32 {
    1200
}

fn default_height() -> u32 {
    900
}

fn default_margin() -> u32 {
    70
}

fn default_grid_spacing() -> f64 {
    0.5
}

fn default_true() -> bool {
    true
}

/// Web map settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebMapConfig {
    /// Tile URL template for the base layer.
    #[serde(default = "default_tile_url")]
    pub tile_url: String,

    /// Attribution line required by the tile provider.
    #[serde(default = "default_attribution")]
    pub attribution: String,

    /// Initial zoom level.
    #[serde(default = "default_zoom")]
    pub zoom: u8,
}

impl Default for WebMapConfig {
    fn default() -> Self {
        Self {
            tile_url: default_tile_url(),
            attribution: default_attribution(),
            zoom: default_zoom(),
        }
    }
}

fn default_tile_url() -> String {
    "https://tile.openstreetmap.org/{z}/{x}/{y}.png".to_string()
}

fn default_attribution() -> String {
    "© OpenStreetMap contributors".to_string()
}

fn default_zoom() -> u8 {
    10
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but
    /// can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(".choromap.toml");

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings; only values
    /// the user provided explicitly override.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(colormap) = args.colormap_override() {
            self.style.colormap = colormap.to_string();
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
