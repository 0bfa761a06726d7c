//! Collaborator traits for camera devices and media recorders
//!
//! A session talks to hardware only through these traits. Device handles
//! are moved, never shared: a recorder takes the device by value for the
//! duration of a recording and hands it back on teardown.

use crate::BackendError;
use camera_mode::Resolution;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Frame-rate range as reported by the device, in frames per 1000 seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FpsRange {
    pub min: u32,
    pub max: u32,
}

impl FpsRange {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// Upper bound in whole frames per second
    pub fn max_fps(&self) -> u32 {
        self.max / 1000
    }
}

/// Focus modes a device may offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FocusMode {
    Auto,
    ContinuousVideo,
    ContinuousPicture,
    Fixed,
    Infinity,
    Macro,
}

/// Scene modes a device may offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SceneMode {
    Auto,
    Action,
    Night,
    Landscape,
}

/// Capabilities reported by an open device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceParameters {
    pub preview_sizes: Vec<Resolution>,
    /// Empty when the device records at preview sizes only
    pub video_sizes: Vec<Resolution>,
    pub fps_ranges: Vec<FpsRange>,
    pub focus_modes: Vec<FocusMode>,
    pub scene_modes: Vec<SceneMode>,
}

/// Opaque handle of a display surface fed with live preview
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewTarget(pub String);

/// An open camera device
pub trait CameraDevice {
    fn parameters(&self) -> Result<DeviceParameters, BackendError>;

    fn set_preview_size(&mut self, size: Resolution) -> Result<(), BackendError>;

    fn set_preview_fps_range(&mut self, range: FpsRange) -> Result<(), BackendError>;

    fn set_focus_mode(&mut self, mode: FocusMode) -> Result<(), BackendError>;

    fn set_scene_mode(&mut self, mode: SceneMode) -> Result<(), BackendError>;

    fn set_preview_target(&mut self, target: &PreviewTarget) -> Result<(), BackendError>;

    /// Rotation of the preview in degrees
    fn set_display_orientation(&mut self, degrees: u32) -> Result<(), BackendError>;

    fn start_preview(&mut self) -> Result<(), BackendError>;

    fn stop_preview(&mut self) -> Result<(), BackendError>;

    /// Give up control so a recorder may drive the device
    fn unlock(&mut self) -> Result<(), BackendError>;

    /// Take control back from a recorder
    fn lock(&mut self) -> Result<(), BackendError>;

    /// Close the device
    fn release(self);
}

/// Opens camera devices by numeric id
pub trait CameraProvider {
    type Device: CameraDevice;

    fn open(&self, camera_id: u32) -> Result<Self::Device, BackendError>;
}

/// Named recording quality profiles, in order of preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProfileQuality {
    Hd720,
    Sd480,
    Low,
}

impl ProfileQuality {
    pub const PREFERENCE: [ProfileQuality; 3] =
        [ProfileQuality::Hd720, ProfileQuality::Sd480, ProfileQuality::Low];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Container {
    Mpeg4,
    ThreeGpp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoCodec {
    H264,
    H263,
    Hevc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioCodec {
    Aac,
    AmrNb,
}

/// Recording profile published by the platform for a camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityProfile {
    pub quality: ProfileQuality,
    pub container: Container,
    pub video_codec: VideoCodec,
    pub audio_codec: AudioCodec,
    pub size: Resolution,
    pub frame_rate: u32,
    /// Bits per second
    pub video_bitrate: u32,
}

/// Explicit encoder settings used when the platform publishes no profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualEncoding {
    pub container: Container,
    pub video_codec: VideoCodec,
    pub audio_codec: AudioCodec,
    pub size: Resolution,
    pub frame_rate: u32,
    pub video_bitrate: u32,
}

impl ManualEncoding {
    pub const VIDEO_BITRATE: u32 = 4_000_000;

    /// MPEG-4 / H.264 / AAC at 720p
    pub fn fallback(frame_rate: u32) -> Self {
        Self {
            container: Container::Mpeg4,
            video_codec: VideoCodec::H264,
            audio_codec: AudioCodec::Aac,
            size: Resolution::HD_720,
            frame_rate,
            video_bitrate: Self::VIDEO_BITRATE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncoderSettings {
    Profile(QualityProfile),
    Manual(ManualEncoding),
}

impl EncoderSettings {
    pub fn frame_rate(&self) -> u32 {
        match self {
            EncoderSettings::Profile(profile) => profile.frame_rate,
            EncoderSettings::Manual(manual) => manual.frame_rate,
        }
    }
}

/// Everything a recorder needs before `prepare`
#[derive(Debug, Clone, PartialEq)]
pub struct RecorderConfig {
    /// Record the camcorder microphone alongside video
    pub record_audio: bool,
    pub encoding: EncoderSettings,
    pub output: PathBuf,
    pub preview: Option<PreviewTarget>,
}

/// A media recorder instance
///
/// The recorder owns the device between `set_camera` and `take_camera`.
pub trait MediaRecorder {
    type Device;

    fn set_camera(&mut self, device: Self::Device);

    fn take_camera(&mut self) -> Option<Self::Device>;

    fn configure(&mut self, config: &RecorderConfig) -> Result<(), BackendError>;

    fn prepare(&mut self) -> Result<(), BackendError>;

    fn start(&mut self) -> Result<(), BackendError>;

    /// Finalize the output; a failure means the artifact is not trustworthy
    fn stop(&mut self) -> Result<(), BackendError>;

    fn reset(&mut self) -> Result<(), BackendError>;

    fn release(self);
}

/// Creates recorders and answers profile queries
pub trait RecorderBackend {
    type Device;
    type Recorder: MediaRecorder<Device = Self::Device>;

    fn create_recorder(&self) -> Result<Self::Recorder, BackendError>;

    /// Published profile of the given quality, if any
    fn profile(&self, camera_id: u32, quality: ProfileQuality) -> Option<QualityProfile>;
}
