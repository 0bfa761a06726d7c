//! Capture session configuration

use crate::CaptureError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable prefix for overrides, e.g. `EVCAM_RECORD_AUDIO=false`
pub const ENV_PREFIX: &str = "EVCAM";

/// Per-session capture settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Record the camcorder microphone with the video
    pub record_audio: bool,

    /// Preview rotation in degrees (head units are usually landscape)
    pub display_orientation: u32,

    /// Feed the preview sink, when one is supplied at prepare time
    pub preview_enabled: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            record_audio: true,
            display_orientation: 0,
            preview_enabled: true,
        }
    }
}

impl CaptureConfig {
    /// Video-only recording, e.g. for cameras without a nearby microphone
    pub fn silent() -> Self {
        Self {
            record_audio: false,
            ..Default::default()
        }
    }

    /// Load from a file (TOML, JSON or YAML by extension) with environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CaptureError> {
        config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .and_then(|settings| settings.try_deserialize::<Self>())
            .map_err(|e| CaptureError::Config(e.to_string()))
            .and_then(|config| config.validated())
    }

    fn validated(self) -> Result<Self, CaptureError> {
        if self.display_orientation % 90 != 0 || self.display_orientation >= 360 {
            return Err(CaptureError::Config(format!(
                "display_orientation must be 0, 90, 180 or 270, got {}",
                self.display_orientation
            )));
        }
        Ok(self)
    }
}
