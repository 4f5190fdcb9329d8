//! Run configuration, read from YAML or JSON.

use std::path::Path;

use kbplacer_layout::ParseOptions;
use kbplacer_place::PlacementConfig;
use kbplacer_route::RouterConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {path}: {message}")]
    Io { path: String, message: String },
    #[error("invalid config: {0}")]
    Parse(String),
}

/// Everything a run needs besides the layout and the footprints.
///
/// Every field has a default, so an empty file is a valid config:
///
/// ```yaml
/// key_distance: [19.05, 19.05]
/// diode: "D{} CUSTOM 5.08 3.03 90 BACK"
/// extra_diodes: ["DL{} CUSTOM 0 -5 0 BACK"]
/// additional_elements: ["ST{} CUSTOM 0 0 0 FRONT"]
/// parse: { sequential_fallback: false, collapse: true }
/// route: { row_layer: F.Cu, column_layer: B.Cu, clearance_mm: 0.2 }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacerConfig {
    #[serde(flatten)]
    pub placement: PlacementConfig,
    pub parse: ParseOptions,
    /// Routing is off unless this section is present.
    pub route: Option<RouterConfig>,
}

impl PlacerConfig {
    /// JSON first, then YAML.
    pub fn from_text(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(text).or_else(|json_err| {
            serde_yaml::from_str(text).map_err(|yaml_err| {
                ConfigError::Parse(if text.trim_start().starts_with('{') {
                    json_err.to_string()
                } else {
                    yaml_err.to_string()
                })
            })
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_text(&text)
    }
}
