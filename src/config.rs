use std::{path::Path, time::Duration};

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnnotatorConfig {
    pub session: SessionConfig,
    pub detection: DetectionConfig,
    pub export: ExportConfig,
}

impl AnnotatorConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        Self::from_toml(&text).with_context(|| format!("Failed to parse config {:?}", path))
    }

    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Rectangles and detection crops smaller than this (px) on either side are discarded.
    pub min_box_size: f64,
    /// Polygon vertices closer than this (Manhattan, px) to the previous vertex are coalesced.
    pub vertex_merge_threshold: f64,
    pub double_click_ms: u64,
    pub min_handle_size: f64,
    pub max_handle_size: f64,
}

impl SessionConfig {
    pub fn double_click_window(&self) -> Duration {
        Duration::from_millis(self.double_click_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            min_box_size: 5.0,
            vertex_merge_threshold: crate::geometry::CLOSE_POINTS_THRESHOLD,
            double_click_ms: 200,
            min_handle_size: 5.0,
            max_handle_size: 20.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetectionConfig {
    pub confidence_threshold: f64,
    pub simplify_epsilon_factor: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.1,
            simplify_epsilon_factor: 0.005,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExportConfig {
    pub ignore_polygons: bool,
    pub save_empty_files: bool,
}
