use egui::Color32;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::brush::DEFAULT_ERASER_WIDTH;
use crate::error::ConfigError;
use crate::history::DEFAULT_HISTORY_DEPTH;
use crate::stroke::BrushConfiguration;

/// Settings fixed when a canvas is created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)] // missing fields fall back to their defaults
pub struct CanvasConfig {
    /// Bitmap size in pixels; never changes for the canvas' lifetime
    pub preferred_size: [u32; 2],
    /// Number of actions kept for undo
    pub history_depth: usize,
    pub eraser_width: f32,
    /// Colour of a blank canvas, also used by the eraser
    pub background: Color32,
    /// Pen the canvas starts with
    pub pen: BrushConfiguration,
    /// JPEG quality used by the host when exporting, 1 to 100
    pub jpeg_quality: u8,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            preferred_size: [1920, 1080],
            history_depth: DEFAULT_HISTORY_DEPTH,
            eraser_width: DEFAULT_ERASER_WIDTH,
            background: Color32::WHITE,
            pen: BrushConfiguration::default(),
            jpeg_quality: 90,
        }
    }
}

impl CanvasConfig {
    pub fn width(&self) -> u32 {
        self.preferred_size[0]
    }

    pub fn height(&self) -> u32 {
        self.preferred_size[1]
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        log::info!("Loading canvas configuration from {}", path.display());
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let config = CanvasConfig::from_json(r#"{ "history_depth": 5 }"#).unwrap();
        assert_eq!(config.history_depth, 5);
        assert_eq!(config.preferred_size, [1920, 1080]);
        assert_eq!(config.eraser_width, 20.0);
    }

    #[test]
    fn test_json_round_trip() {
        let config = CanvasConfig {
            preferred_size: [640, 480],
            ..Default::default()
        };
        let parsed = CanvasConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_bad_json_is_parse_error() {
        assert!(matches!(
            CanvasConfig::from_json("{ nope"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            CanvasConfig::load("/definitely/not/here.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
