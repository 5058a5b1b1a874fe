//! Engine configuration.
//!
//! Loaded from JSON; any field left out takes its default.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::renderer::session::{BufferParams, SessionParams};
use crate::scene::DEFAULT_MAX_DEPTH;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // Film
    pub width: u32,
    pub height: u32,
    /// Name of the pass written by offline renders.
    pub output_pass: String,

    // Sampling
    pub samples: u32,
    pub use_auto_tile: bool,
    /// Tile edge in pixels; non-zero turns auto tiling on.
    pub tile_size: u32,
    /// Worker threads; 0 lets the renderer pick.
    pub threads: usize,

    // Session
    /// Offline (batch) session without a display.
    pub background: bool,
    /// Suppress per-sample status logging.
    pub quiet: bool,

    // Depth render mode
    pub max_depth: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 512,
            output_pass: "combined".to_string(),
            samples: 128,
            use_auto_tile: false,
            tile_size: 0,
            threads: 0,
            background: false,
            quiet: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    #[must_use]
    pub fn session_params(&self) -> SessionParams {
        SessionParams {
            samples: self.samples,
            background: self.background,
            threads: self.threads,
            use_auto_tile: self.use_auto_tile || self.tile_size > 0,
            tile_size: self.tile_size,
        }
    }

    #[must_use]
    pub fn buffer_params(&self) -> BufferParams {
        BufferParams::full_frame(self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config = EngineConfig::from_json_str(r#"{ "samples": 16, "tile_size": 64 }"#).unwrap();
        assert_eq!(config.samples, 16);
        assert_eq!((config.width, config.height), (1024, 512));
        assert_eq!(config.output_pass, "combined");

        let params = config.session_params();
        assert!(params.use_auto_tile);
        assert_eq!(params.tile_size, 64);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        assert!(matches!(
            EngineConfig::from_json_str("{ samples: }"),
            Err(crate::errors::SceneError::Config(_))
        ));
    }
}
