//! Camera Capture Library for In-Vehicle Recording
//!
//! Drives one physical camera through preview and recording:
//! - Best-fit frame size and frame-rate negotiation against the
//!   irregular lists a device reports
//! - A prepare / start / stop / release lifecycle that never leaves a
//!   device or recorder handle open once the session is idle
//! - Collaborator traits for the camera device and the media recorder,
//!   with an in-process mock backend for hardware-free runs

pub mod backend;
pub mod config;
pub mod mock;
pub mod negotiate;
pub mod session;

pub use backend::{
    AudioCodec, CameraDevice, CameraProvider, Container, DeviceParameters, EncoderSettings,
    FocusMode, FpsRange, ManualEncoding, MediaRecorder, PreviewTarget, ProfileQuality,
    QualityProfile, RecorderBackend, RecorderConfig, SceneMode, VideoCodec,
};
pub use camera_mode::{OperatingPolicy, Resolution};
pub use config::CaptureConfig;
pub use negotiate::{select_fps_range, select_optimal, ASPECT_TOLERANCE};
pub use session::{CaptureSession, NegotiatedGeometry, RecordCallback, SessionState, StopOutcome};

use thiserror::Error;

/// Capture session error types
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Camera {camera_id} is in use or unavailable: {reason}")]
    DeviceUnavailable { camera_id: u32, reason: String },

    #[error("Camera not prepared")]
    NotPrepared,

    #[error("Camera already prepared")]
    AlreadyPrepared,

    #[error("Start recording failed: {0}")]
    StartFailed(String),

    #[error("Invalid format: {0}")]
    Format(String),

    #[error("Preview failed: {0}")]
    Preview(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Failure reported by a camera or recorder backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Device busy: {0}")]
    Busy(String),

    #[error("Device not found: {0}")]
    NotFound(String),

    #[error("Parameter rejected: {0}")]
    Rejected(String),

    #[error("Operation failed: {0}")]
    Failed(String),
}
