//! Camera Mode Selection
//!
//! Classifies the cameras of an in-vehicle head unit by hardware support
//! tier and reduces them, together with the platform API level, into one
//! process-wide operating mode and its recording policy:
//! - Full: 1080p @ 30fps, up to 4 concurrent cameras
//! - Limited: 720p @ 20fps, single camera
//! - Legacy / CompatibilityOnly: 720p @ 15fps, single camera

mod classifier;
mod policy;
mod tier;

pub use classifier::{
    classify, CameraEnumerator, CapabilityClassifier, Classification, OperatingMode, RuleName,
};
pub use policy::{OperatingPolicy, Resolution};
pub use tier::{CameraDescriptor, HardwareTier, TierTally};

use thiserror::Error;

/// Platform API levels relevant to camera mode selection
pub mod api_level {
    /// First platform release with the modern camera API
    pub const MODERN_CAMERA_API: u32 = 21;
    /// First platform release trusted with FULL-tier multi-stream capture
    pub const FULL_TIER: u32 = 23;
}

/// Errors raised by the device enumeration collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnumerationError {
    /// The camera service refused access
    #[error("Camera access denied: {0}")]
    AccessDenied(String),

    /// The camera service is disconnected or not running
    #[error("Camera service unavailable: {0}")]
    ServiceUnavailable(String),

    /// A single camera's characteristics could not be read
    #[error("Failed to read characteristics of camera {id}: {reason}")]
    Characteristics { id: String, reason: String },
}
