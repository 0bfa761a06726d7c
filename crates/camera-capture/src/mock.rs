//! In-process mock camera and recorder backend
//!
//! Lets sessions run without hardware. A [`MockRig`] is a cheap handle to
//! shared state: clone it into a session as both camera provider and
//! recorder backend, keep one clone to inject faults and inspect the
//! [`MockLedger`].

use crate::backend::{
    AudioCodec, CameraDevice, CameraProvider, Container, DeviceParameters, FocusMode, FpsRange,
    MediaRecorder, PreviewTarget, ProfileQuality, QualityProfile, RecorderBackend,
    RecorderConfig, SceneMode, VideoCodec,
};
use crate::BackendError;
use camera_mode::Resolution;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Bytes written by a mock recorder when it starts and stops
const MOCK_HEADER: &[u8] = b"\x00\x00\x00\x18ftypmp42";
const MOCK_TRAILER: &[u8] = b"moov";

/// Operations the mock should fail
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockFaults {
    pub open: bool,
    pub parameters: bool,
    pub preview_size: bool,
    pub focus: bool,
    pub scene: bool,
    pub orientation: bool,
    pub start_preview: bool,
    pub unlock: bool,
    pub create_recorder: bool,
    pub recorder_prepare: bool,
    pub recorder_start: bool,
    pub recorder_stop: bool,
    /// Recorder does not hand the camera back on teardown
    pub keep_camera: bool,
}

/// Observable effects of the mock backend
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MockLedger {
    /// Devices currently open
    pub open_devices: usize,
    /// Recorders currently alive
    pub open_recorders: usize,
    /// Total `open` attempts
    pub open_calls: usize,
    pub preview_size: Option<Resolution>,
    pub fps_range: Option<FpsRange>,
    pub focus_mode: Option<FocusMode>,
    pub scene_mode: Option<SceneMode>,
    pub orientation: Option<u32>,
    pub preview_target: Option<PreviewTarget>,
    pub previewing: bool,
    /// Whether a recorder currently controls the camera
    pub unlocked: bool,
    pub last_config: Option<RecorderConfig>,
}

#[derive(Debug)]
struct MockState {
    parameters: DeviceParameters,
    profiles: Vec<QualityProfile>,
    faults: MockFaults,
    ledger: MockLedger,
}

/// Shared mock camera provider and recorder backend
#[derive(Debug, Clone)]
pub struct MockRig {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockRig {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRig {
    /// A 16:9 head-unit camera publishing a 720p profile
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                parameters: Self::head_unit_parameters(),
                profiles: vec![Self::profile(ProfileQuality::Hd720, Resolution::HD_720, 30)],
                faults: MockFaults::default(),
                ledger: MockLedger::default(),
            })),
        }
    }

    /// Typical parameters of an in-vehicle camera
    pub fn head_unit_parameters() -> DeviceParameters {
        DeviceParameters {
            preview_sizes: vec![
                Resolution::new(1920, 1080),
                Resolution::new(1280, 720),
                Resolution::new(960, 720),
                Resolution::new(640, 480),
            ],
            video_sizes: vec![Resolution::new(1920, 1080), Resolution::new(1280, 720)],
            fps_ranges: vec![
                FpsRange::new(15000, 15000),
                FpsRange::new(15000, 30000),
                FpsRange::new(30000, 30000),
            ],
            focus_modes: vec![FocusMode::Auto, FocusMode::ContinuousVideo],
            scene_modes: vec![SceneMode::Auto, SceneMode::Night],
        }
    }

    /// An MPEG-4 / H.264 profile of the given quality
    pub fn profile(quality: ProfileQuality, size: Resolution, frame_rate: u32) -> QualityProfile {
        QualityProfile {
            quality,
            container: Container::Mpeg4,
            video_codec: VideoCodec::H264,
            audio_codec: AudioCodec::Aac,
            size,
            frame_rate,
            video_bitrate: 6_000_000,
        }
    }

    pub fn with_parameters(self, parameters: DeviceParameters) -> Self {
        self.state().parameters = parameters;
        self
    }

    pub fn with_profiles(self, profiles: Vec<QualityProfile>) -> Self {
        self.state().profiles = profiles;
        self
    }

    pub fn with_faults(self, faults: MockFaults) -> Self {
        self.state().faults = faults;
        self
    }

    /// Change injected faults on a rig already handed to a session
    pub fn update_faults(&self, update: impl FnOnce(&mut MockFaults)) {
        update(&mut self.state().faults);
    }

    pub fn ledger(&self) -> MockLedger {
        self.state().ledger.clone()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check(&self, fault: impl FnOnce(&MockFaults) -> bool, what: &str) -> Result<(), BackendError> {
        if fault(&self.state().faults) {
            Err(BackendError::Failed(format!("mock {} failure", what)))
        } else {
            Ok(())
        }
    }
}

/// An open mock camera
#[derive(Debug)]
pub struct MockDevice {
    rig: MockRig,
    camera_id: u32,
}

impl CameraProvider for MockRig {
    type Device = MockDevice;

    fn open(&self, camera_id: u32) -> Result<MockDevice, BackendError> {
        let mut state = self.state();
        state.ledger.open_calls += 1;
        if state.faults.open {
            return Err(BackendError::Busy(format!("camera {}", camera_id)));
        }
        state.ledger.open_devices += 1;
        debug!("Mock camera {} opened", camera_id);
        Ok(MockDevice {
            rig: self.clone(),
            camera_id,
        })
    }
}

impl CameraDevice for MockDevice {
    fn parameters(&self) -> Result<DeviceParameters, BackendError> {
        self.rig.check(|f| f.parameters, "parameters")?;
        Ok(self.rig.state().parameters.clone())
    }

    fn set_preview_size(&mut self, size: Resolution) -> Result<(), BackendError> {
        self.rig.check(|f| f.preview_size, "preview size")?;
        self.rig.state().ledger.preview_size = Some(size);
        Ok(())
    }

    fn set_preview_fps_range(&mut self, range: FpsRange) -> Result<(), BackendError> {
        self.rig.state().ledger.fps_range = Some(range);
        Ok(())
    }

    fn set_focus_mode(&mut self, mode: FocusMode) -> Result<(), BackendError> {
        self.rig.check(|f| f.focus, "focus")?;
        self.rig.state().ledger.focus_mode = Some(mode);
        Ok(())
    }

    fn set_scene_mode(&mut self, mode: SceneMode) -> Result<(), BackendError> {
        self.rig.check(|f| f.scene, "scene")?;
        self.rig.state().ledger.scene_mode = Some(mode);
        Ok(())
    }

    fn set_preview_target(&mut self, target: &PreviewTarget) -> Result<(), BackendError> {
        self.rig.state().ledger.preview_target = Some(target.clone());
        Ok(())
    }

    fn set_display_orientation(&mut self, degrees: u32) -> Result<(), BackendError> {
        self.rig.check(|f| f.orientation, "orientation")?;
        self.rig.state().ledger.orientation = Some(degrees);
        Ok(())
    }

    fn start_preview(&mut self) -> Result<(), BackendError> {
        self.rig.check(|f| f.start_preview, "start preview")?;
        self.rig.state().ledger.previewing = true;
        Ok(())
    }

    fn stop_preview(&mut self) -> Result<(), BackendError> {
        self.rig.state().ledger.previewing = false;
        Ok(())
    }

    fn unlock(&mut self) -> Result<(), BackendError> {
        self.rig.check(|f| f.unlock, "unlock")?;
        self.rig.state().ledger.unlocked = true;
        Ok(())
    }

    fn lock(&mut self) -> Result<(), BackendError> {
        self.rig.state().ledger.unlocked = false;
        Ok(())
    }

    fn release(self) {
        let mut state = self.rig.state();
        state.ledger.open_devices = state.ledger.open_devices.saturating_sub(1);
        debug!("Mock camera {} released", self.camera_id);
    }
}

/// A mock recorder writing a small placeholder artifact
#[derive(Debug)]
pub struct MockRecorder {
    rig: MockRig,
    camera: Option<MockDevice>,
    output: Option<PathBuf>,
}

impl MockRecorder {
    fn append(&self, bytes: &[u8]) -> Result<(), BackendError> {
        let output = self
            .output
            .as_ref()
            .ok_or_else(|| BackendError::Failed("no output file".to_string()))?;
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(output)
            .and_then(|mut file| file.write_all(bytes))
            .map_err(|e| BackendError::Failed(e.to_string()))
    }
}

impl RecorderBackend for MockRig {
    type Device = MockDevice;
    type Recorder = MockRecorder;

    fn create_recorder(&self) -> Result<MockRecorder, BackendError> {
        self.check(|f| f.create_recorder, "create recorder")?;
        self.state().ledger.open_recorders += 1;
        Ok(MockRecorder {
            rig: self.clone(),
            camera: None,
            output: None,
        })
    }

    fn profile(&self, _camera_id: u32, quality: ProfileQuality) -> Option<QualityProfile> {
        self.state()
            .profiles
            .iter()
            .find(|profile| profile.quality == quality)
            .copied()
    }
}

impl MediaRecorder for MockRecorder {
    type Device = MockDevice;

    fn set_camera(&mut self, device: MockDevice) {
        self.camera = Some(device);
    }

    fn take_camera(&mut self) -> Option<MockDevice> {
        if self.rig.state().faults.keep_camera {
            return None;
        }
        self.camera.take()
    }

    fn configure(&mut self, config: &RecorderConfig) -> Result<(), BackendError> {
        if self.camera.is_none() {
            return Err(BackendError::Rejected("no camera attached".to_string()));
        }
        self.output = Some(config.output.clone());
        self.rig.state().ledger.last_config = Some(config.clone());
        Ok(())
    }

    fn prepare(&mut self) -> Result<(), BackendError> {
        self.rig.check(|f| f.recorder_prepare, "recorder prepare")
    }

    fn start(&mut self) -> Result<(), BackendError> {
        self.rig.check(|f| f.recorder_start, "recorder start")?;
        self.append(MOCK_HEADER)
    }

    fn stop(&mut self) -> Result<(), BackendError> {
        self.rig.check(|f| f.recorder_stop, "recorder stop")?;
        self.append(MOCK_TRAILER)
    }

    fn reset(&mut self) -> Result<(), BackendError> {
        self.output = None;
        Ok(())
    }

    fn release(mut self) {
        // A camera still attached goes down with the recorder
        if let Some(device) = self.camera.take() {
            device.release();
        }
        let mut state = self.rig.state();
        state.ledger.open_recorders = state.ledger.open_recorders.saturating_sub(1);
    }
}
