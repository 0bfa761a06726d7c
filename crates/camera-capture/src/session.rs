//! Capture session lifecycle
//!
//! One session per physical camera: Idle → Prepared → Recording → Idle.
//! Handles live inside the state they belong to, so a device exists only
//! while Prepared or Recording and a recorder only while Recording. While
//! Recording, the recorder holds the device; it is handed back on teardown.
//!
//! Calls on one session are expected from a single control thread.

use crate::backend::{
    CameraDevice, CameraProvider, DeviceParameters, EncoderSettings, FocusMode, FpsRange,
    ManualEncoding, MediaRecorder, PreviewTarget, ProfileQuality, RecorderBackend,
    RecorderConfig, SceneMode,
};
use crate::config::CaptureConfig;
use crate::negotiate::{select_fps_range, select_optimal};
use crate::{BackendError, CaptureError};
use camera_mode::{OperatingPolicy, Resolution};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Recording events reported to the owner of a session
pub trait RecordCallback: Send {
    /// Fired once per successful `start()`
    fn on_record_started(&self) {}

    /// Fired at most once per `stop()`, only when the artifact exists
    fn on_record_stopped(&self, _output: &Path) {}
}

/// No-op callback
impl RecordCallback for () {}

/// Externally visible lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Idle,
    Prepared,
    Recording,
}

/// Result of a `stop()` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    /// Nothing was recording
    NotRecording,
    /// Recording finalized and the artifact is on disk
    Saved(PathBuf),
    /// The recorder failed to stop and the artifact was deleted
    Discarded,
    /// The recorder stopped but left no artifact
    Missing,
}

/// Geometry chosen during `prepare()`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NegotiatedGeometry {
    pub preview_size: Option<Resolution>,
    /// Reported only; the recording size comes from the encoder settings
    pub video_size: Option<Resolution>,
    pub fps_range: Option<FpsRange>,
}

impl NegotiatedGeometry {
    /// Negotiate against a device's parameters within policy ceilings
    pub fn negotiate(params: &DeviceParameters, policy: &OperatingPolicy) -> Self {
        Self {
            preview_size: select_optimal(&params.preview_sizes, policy.resolution_ceiling),
            video_size: select_optimal(&params.video_sizes, policy.resolution_ceiling),
            fps_range: select_fps_range(&params.fps_ranges, policy.frame_rate_ceiling),
        }
    }
}

/// Output and callback bound at prepare time
struct RecordingJob {
    output: PathBuf,
    preview: Option<PreviewTarget>,
    callback: Box<dyn RecordCallback>,
}

enum Slot<D, R> {
    Idle,
    Prepared {
        device: D,
        /// Control was given to a recorder and never taken back
        handed_off: bool,
        job: RecordingJob,
    },
    Recording {
        recorder: R,
        job: RecordingJob,
    },
}

/// Preview and recording session for one physical camera
pub struct CaptureSession<P, B>
where
    P: CameraProvider,
    B: RecorderBackend<Device = P::Device>,
{
    camera_id: u32,
    policy: OperatingPolicy,
    config: CaptureConfig,
    cameras: P,
    recorders: B,
    slot: Slot<P::Device, B::Recorder>,
    geometry: Option<NegotiatedGeometry>,
}

impl<P, B> CaptureSession<P, B>
where
    P: CameraProvider,
    B: RecorderBackend<Device = P::Device>,
{
    /// Create an idle session; no handle is opened until `prepare()`
    pub fn new(camera_id: u32, policy: OperatingPolicy, cameras: P, recorders: B) -> Self {
        Self {
            camera_id,
            policy,
            config: CaptureConfig::default(),
            cameras,
            recorders,
            slot: Slot::Idle,
            geometry: None,
        }
    }

    pub fn with_config(mut self, config: CaptureConfig) -> Self {
        self.config = config;
        self
    }

    pub fn camera_id(&self) -> u32 {
        self.camera_id
    }

    pub fn state(&self) -> SessionState {
        match self.slot {
            Slot::Idle => SessionState::Idle,
            Slot::Prepared { .. } => SessionState::Prepared,
            Slot::Recording { .. } => SessionState::Recording,
        }
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.slot, Slot::Recording { .. })
    }

    /// Geometry negotiated by the last successful `prepare()`
    pub fn geometry(&self) -> Option<NegotiatedGeometry> {
        self.geometry
    }

    /// Open the camera, negotiate geometry and start the live preview
    ///
    /// On failure the session stays Idle with no device held.
    pub fn prepare(
        &mut self,
        preview: Option<PreviewTarget>,
        output: impl Into<PathBuf>,
        callback: Box<dyn RecordCallback>,
    ) -> Result<(), CaptureError> {
        if !matches!(self.slot, Slot::Idle) {
            return Err(CaptureError::AlreadyPrepared);
        }

        let mut device =
            self.cameras
                .open(self.camera_id)
                .map_err(|e| CaptureError::DeviceUnavailable {
                    camera_id: self.camera_id,
                    reason: e.to_string(),
                })?;

        let geometry = match self.start_preview(&mut device, preview.as_ref()) {
            Ok(geometry) => geometry,
            Err(e) => {
                error!("Camera {} failed to prepare: {}", self.camera_id, e);
                release_device(device, false);
                return Err(e);
            }
        };

        self.geometry = Some(geometry);
        self.slot = Slot::Prepared {
            device,
            handed_off: false,
            job: RecordingJob {
                output: output.into(),
                preview,
                callback,
            },
        };
        info!("Camera {} prepared successfully", self.camera_id);
        Ok(())
    }

    fn start_preview(
        &self,
        device: &mut P::Device,
        preview: Option<&PreviewTarget>,
    ) -> Result<NegotiatedGeometry, CaptureError> {
        let format = |e: BackendError| CaptureError::Format(e.to_string());
        let params = device.parameters().map_err(format)?;
        let geometry = NegotiatedGeometry::negotiate(&params, &self.policy);

        if let Some(size) = geometry.preview_size {
            device.set_preview_size(size).map_err(format)?;
            debug!("Camera {} preview size: {}", self.camera_id, size);
        }
        if let Some(size) = geometry.video_size {
            debug!("Camera {} video size: {}", self.camera_id, size);
        }
        if let Some(range) = geometry.fps_range {
            device.set_preview_fps_range(range).map_err(format)?;
            debug!(
                "Camera {} FPS range: {}-{}",
                self.camera_id, range.min, range.max
            );
        }

        self.apply_preferences(device, &params);

        if self.config.preview_enabled {
            if let Some(target) = preview {
                device
                    .set_preview_target(target)
                    .map_err(|e| CaptureError::Preview(e.to_string()))?;
            }
        }

        if let Err(e) = device.set_display_orientation(self.config.display_orientation) {
            warn!("Failed to set display orientation: {}", e);
        }

        device
            .start_preview()
            .map_err(|e| CaptureError::Preview(e.to_string()))?;
        Ok(geometry)
    }

    /// Focus and scene preferences; a rejected preference is not fatal
    fn apply_preferences(&self, device: &mut P::Device, params: &DeviceParameters) {
        let focus = [FocusMode::ContinuousVideo, FocusMode::Auto]
            .into_iter()
            .find(|mode| params.focus_modes.contains(mode));
        if let Some(mode) = focus {
            if let Err(e) = device.set_focus_mode(mode) {
                warn!("Camera {} rejected focus mode {:?}: {}", self.camera_id, mode, e);
            }
        }

        if params.scene_modes.contains(&SceneMode::Auto) {
            if let Err(e) = device.set_scene_mode(SceneMode::Auto) {
                warn!("Camera {} rejected scene mode: {}", self.camera_id, e);
            }
        }
    }

    /// Hand the camera to a new recorder and start recording
    ///
    /// A no-op while already recording. After `StartFailed` the session
    /// must be released and prepared again.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        let (mut device, job) = match std::mem::replace(&mut self.slot, Slot::Idle) {
            Slot::Idle => return Err(CaptureError::NotPrepared),
            recording @ Slot::Recording { .. } => {
                self.slot = recording;
                warn!("Camera {} already recording", self.camera_id);
                return Ok(());
            }
            Slot::Prepared {
                device,
                handed_off: true,
                job,
            } => {
                self.slot = Slot::Prepared {
                    device,
                    handed_off: true,
                    job,
                };
                return Err(CaptureError::StartFailed(
                    "camera control was not recovered from a failed start".to_string(),
                ));
            }
            Slot::Prepared { device, job, .. } => (device, job),
        };

        let mut recorder = match self.recorders.create_recorder() {
            Ok(recorder) => recorder,
            Err(e) => {
                self.slot = Slot::Prepared {
                    device,
                    handed_off: false,
                    job,
                };
                return Err(CaptureError::StartFailed(e.to_string()));
            }
        };

        if let Err(e) = device.unlock() {
            recorder.release();
            self.slot = Slot::Prepared {
                device,
                handed_off: false,
                job,
            };
            return Err(CaptureError::StartFailed(e.to_string()));
        }
        recorder.set_camera(device);

        let config = RecorderConfig {
            record_audio: self.config.record_audio,
            encoding: self.select_encoding(),
            output: job.output.clone(),
            preview: job.preview.clone().filter(|_| self.config.preview_enabled),
        };

        match launch(&mut recorder, &config) {
            Ok(()) => {
                info!("Recording started: {}", job.output.display());
                job.callback.on_record_started();
                self.slot = Slot::Recording { recorder, job };
                Ok(())
            }
            Err(e) => {
                error!("Camera {} failed to start recording: {}", self.camera_id, e);
                self.slot = match teardown_recorder(recorder) {
                    Some(device) => Slot::Prepared {
                        device,
                        handed_off: true,
                        job,
                    },
                    None => {
                        warn!("Recorder kept camera {} on teardown", self.camera_id);
                        Slot::Idle
                    }
                };
                Err(CaptureError::StartFailed(e.to_string()))
            }
        }
    }

    /// Prefer a named profile clamped to the frame-rate ceiling, else manual settings
    fn select_encoding(&self) -> EncoderSettings {
        let ceiling = self.policy.frame_rate_ceiling;

        ProfileQuality::PREFERENCE
            .iter()
            .find_map(|quality| self.recorders.profile(self.camera_id, *quality))
            .map(|mut profile| {
                debug!("Using {:?} profile", profile.quality);
                profile.frame_rate = profile.frame_rate.min(ceiling);
                EncoderSettings::Profile(profile)
            })
            .unwrap_or_else(|| {
                warn!(
                    "No recording profile for camera {}, using manual encoder settings",
                    self.camera_id
                );
                EncoderSettings::Manual(ManualEncoding::fallback(ceiling))
            })
    }

    /// Finalize the recording and close both handles
    ///
    /// Idempotent: returns [`StopOutcome::NotRecording`] unless recording.
    /// A failed recorder stop deletes the artifact and fires no callback.
    pub fn stop(&mut self) -> StopOutcome {
        let (mut recorder, job) = match std::mem::replace(&mut self.slot, Slot::Idle) {
            Slot::Recording { recorder, job } => (recorder, job),
            other => {
                self.slot = other;
                return StopOutcome::NotRecording;
            }
        };

        let stopped = recorder.stop();
        if let Err(e) = &stopped {
            error!("Recorder failed to stop: {}", e);
            discard_artifact(&job.output);
        }

        match teardown_recorder(recorder) {
            Some(device) => release_device(device, true),
            None => warn!("Recorder kept camera {} on teardown", self.camera_id),
        }
        self.geometry = None;

        if stopped.is_err() {
            return StopOutcome::Discarded;
        }
        if !job.output.exists() {
            warn!("Recording artifact missing: {}", job.output.display());
            return StopOutcome::Missing;
        }

        info!("Recording stopped: {}", job.output.display());
        job.callback.on_record_stopped(&job.output);
        StopOutcome::Saved(job.output)
    }

    /// Stop if recording, then close whatever handle remains
    ///
    /// Safe to call any number of times.
    pub fn release(&mut self) {
        self.stop();

        match std::mem::replace(&mut self.slot, Slot::Idle) {
            Slot::Prepared {
                device, handed_off, ..
            } => release_device(device, handed_off),
            Slot::Recording { recorder, .. } => {
                if let Some(device) = teardown_recorder(recorder) {
                    release_device(device, true);
                }
            }
            Slot::Idle => {}
        }
        self.geometry = None;
    }
}

impl<P, B> Drop for CaptureSession<P, B>
where
    P: CameraProvider,
    B: RecorderBackend<Device = P::Device>,
{
    fn drop(&mut self) {
        self.release();
    }
}

fn launch<R: MediaRecorder>(recorder: &mut R, config: &RecorderConfig) -> Result<(), BackendError> {
    recorder.configure(config)?;
    recorder.prepare()?;
    recorder.start()
}

/// Reset and release a recorder, returning the camera it held
fn teardown_recorder<R: MediaRecorder>(mut recorder: R) -> Option<R::Device> {
    if let Err(e) = recorder.reset() {
        error!("Error resetting recorder: {}", e);
    }
    let device = recorder.take_camera();
    recorder.release();
    device
}

/// Stop the preview and close the camera, reclaiming control first if needed
fn release_device<D: CameraDevice>(mut device: D, reclaim: bool) {
    if reclaim {
        if let Err(e) = device.lock() {
            error!("Error reclaiming camera: {}", e);
        }
    }
    if let Err(e) = device.stop_preview() {
        error!("Error stopping preview: {}", e);
    }
    device.release();
}

fn discard_artifact(output: &Path) {
    if !output.exists() {
        return;
    }
    match std::fs::remove_file(output) {
        Ok(()) => warn!("Discarded partial recording {}", output.display()),
        Err(e) => error!("Failed to delete partial recording {}: {}", output.display(), e),
    }
}
