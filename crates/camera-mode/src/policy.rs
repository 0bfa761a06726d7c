//! Recording policy derived from the operating mode

use crate::classifier::OperatingMode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cameras recorded concurrently when multi-camera capture is supported
const MULTI_CAMERA_COUNT: usize = 4;

/// Frame size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const HD_720: Resolution = Resolution::new(1280, 720);
    pub const FHD_1080: Resolution = Resolution::new(1920, 1080);

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width divided by height
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl From<(u32, u32)> for Resolution {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(width, height)
    }
}

/// Configuration ceilings handed to every capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatingPolicy {
    /// Number of cameras to record concurrently
    pub max_camera_count: usize,
    /// Largest frame size to negotiate
    pub resolution_ceiling: Resolution,
    /// Highest frame rate to record at (frames per second)
    pub frame_rate_ceiling: u32,
}

impl OperatingPolicy {
    /// Look up the policy for a mode
    pub fn for_mode(mode: OperatingMode, multi_camera: bool) -> Self {
        let (resolution_ceiling, frame_rate_ceiling) = match mode {
            OperatingMode::Full => (Resolution::FHD_1080, 30),
            OperatingMode::Limited => (Resolution::HD_720, 20),
            // Conservative settings for head units on the legacy stack
            OperatingMode::Legacy | OperatingMode::CompatibilityOnly => (Resolution::HD_720, 15),
        };

        Self {
            max_camera_count: if multi_camera { MULTI_CAMERA_COUNT } else { 1 },
            resolution_ceiling,
            frame_rate_ceiling,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_table() {
        let full = OperatingPolicy::for_mode(OperatingMode::Full, true);
        assert_eq!(full.max_camera_count, 4);
        assert_eq!(full.resolution_ceiling, Resolution::new(1920, 1080));
        assert_eq!(full.frame_rate_ceiling, 30);

        let limited = OperatingPolicy::for_mode(OperatingMode::Limited, false);
        assert_eq!(limited.max_camera_count, 1);
        assert_eq!(limited.resolution_ceiling, Resolution::new(1280, 720));
        assert_eq!(limited.frame_rate_ceiling, 20);

        for mode in [OperatingMode::Legacy, OperatingMode::CompatibilityOnly] {
            let policy = OperatingPolicy::for_mode(mode, false);
            assert_eq!(policy.resolution_ceiling, Resolution::HD_720);
            assert_eq!(policy.frame_rate_ceiling, 15);
            assert_eq!(policy.max_camera_count, 1);
        }
    }

    #[test]
    fn test_resolution_display() {
        assert_eq!(Resolution::FHD_1080.to_string(), "1920x1080");
        assert!((Resolution::HD_720.aspect_ratio() - 16.0 / 9.0).abs() < 1e-9);
    }
}
