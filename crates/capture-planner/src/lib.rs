//! Capture Planner
//!
//! Loads a camera topology description, runs mode classification and
//! per-camera format negotiation, and reports which cameras would record
//! with which geometry. No device is opened.

use anyhow::Context;
use camera_capture::{DeviceParameters, FocusMode, FpsRange, NegotiatedGeometry, SceneMode};
use camera_mode::{
    CameraEnumerator, CapabilityClassifier, Classification, EnumerationError, HardwareTier,
    Resolution,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// One camera as described in a topology file
#[derive(Debug, Clone, Deserialize)]
pub struct CameraSpec {
    pub id: String,
    /// Raw reported hardware level, absent when unreported
    #[serde(default)]
    pub hardware_level: Option<i32>,
    #[serde(default)]
    pub preview_sizes: Vec<Resolution>,
    #[serde(default)]
    pub video_sizes: Vec<Resolution>,
    #[serde(default)]
    pub fps_ranges: Vec<FpsRange>,
    #[serde(default)]
    pub focus_modes: Vec<FocusMode>,
    #[serde(default)]
    pub scene_modes: Vec<SceneMode>,
}

impl CameraSpec {
    pub fn parameters(&self) -> DeviceParameters {
        DeviceParameters {
            preview_sizes: self.preview_sizes.clone(),
            video_sizes: self.video_sizes.clone(),
            fps_ranges: self.fps_ranges.clone(),
            focus_modes: self.focus_modes.clone(),
            scene_modes: self.scene_modes.clone(),
        }
    }
}

/// Platform and cameras of a head unit
#[derive(Debug, Clone, Deserialize)]
pub struct Topology {
    pub api_level: u32,
    /// Simulate the camera service refusing enumeration
    #[serde(default)]
    pub enumeration_error: bool,
    #[serde(default)]
    pub cameras: Vec<CameraSpec>,
}

impl Topology {
    /// Load from a TOML, JSON or YAML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        config::Config::builder()
            .add_source(config::File::from(path))
            .build()
            .and_then(|settings| settings.try_deserialize::<Self>())
            .with_context(|| format!("failed to load topology from {}", path.display()))
    }
}

impl CameraEnumerator for Topology {
    fn camera_ids(&self) -> Result<Vec<String>, EnumerationError> {
        if self.enumeration_error {
            return Err(EnumerationError::ServiceUnavailable(
                "simulated by topology".to_string(),
            ));
        }
        Ok(self.cameras.iter().map(|camera| camera.id.clone()).collect())
    }

    fn hardware_level(&self, id: &str) -> Result<Option<i32>, EnumerationError> {
        self.cameras
            .iter()
            .find(|camera| camera.id == id)
            .map(|camera| camera.hardware_level)
            .ok_or_else(|| EnumerationError::Characteristics {
                id: id.to_string(),
                reason: "not in topology".to_string(),
            })
    }
}

/// Planned configuration of one camera
#[derive(Debug, Clone, Serialize)]
pub struct CameraPlan {
    pub id: String,
    pub tier: HardwareTier,
    /// Whether a capture session would be created for this camera
    pub recording: bool,
    pub geometry: NegotiatedGeometry,
}

/// Full plan for a topology
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub api_level: u32,
    pub classification: Classification,
    pub cameras: Vec<CameraPlan>,
}

impl Plan {
    pub fn recording_count(&self) -> usize {
        self.cameras.iter().filter(|camera| camera.recording).count()
    }
}

/// Classify the topology and negotiate every camera against the policy
///
/// Cameras are assigned sessions in listed order up to the policy's
/// camera count.
pub fn plan(topology: &Topology) -> Plan {
    let classification = CapabilityClassifier::new(topology.api_level).classify(topology);
    let policy = classification.policy;

    let cameras: Vec<CameraPlan> = topology
        .cameras
        .iter()
        .enumerate()
        .map(|(index, camera)| {
            let geometry = NegotiatedGeometry::negotiate(&camera.parameters(), &policy);
            if geometry.preview_size.is_none() {
                warn!("Camera {} reports no preview sizes, device default applies", camera.id);
            }
            debug!("Camera {} negotiated {:?}", camera.id, geometry);
            CameraPlan {
                id: camera.id.clone(),
                tier: HardwareTier::from_reported(camera.hardware_level),
                recording: index < policy.max_camera_count,
                geometry,
            }
        })
        .collect();

    info!(
        "Policy: {} cameras, {} @ {}fps",
        policy.max_camera_count, policy.resolution_ceiling, policy.frame_rate_ceiling
    );

    Plan {
        api_level: topology.api_level,
        classification,
        cameras,
    }
}

/// Initialize logging; `RUST_LOG` overrides the default `info` level
pub fn init_logging() -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}
