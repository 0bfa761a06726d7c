//! Capability Classifier
//!
//! Reduces per-camera hardware tiers plus the platform API level into a
//! single [`OperatingMode`]. The decision is an ordered rule table where
//! the first matching rule wins.

use crate::api_level::{FULL_TIER, MODERN_CAMERA_API};
use crate::policy::OperatingPolicy;
use crate::tier::{CameraDescriptor, TierTally};
use crate::EnumerationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, error, info};

/// Process-wide camera operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatingMode {
    /// Modern API on FULL-tier hardware (API 23+)
    Full,
    /// Modern API on LIMITED-tier hardware
    Limited,
    /// Modern API, LEGACY-tier hardware only
    Legacy,
    /// Legacy camera API only
    CompatibilityOnly,
}

impl OperatingMode {
    /// Whether sessions drive the modern camera API
    pub fn uses_modern_api(&self) -> bool {
        *self != OperatingMode::CompatibilityOnly
    }

    /// Whether the hardware is effectively driven through the legacy stack
    pub fn is_legacy(&self) -> bool {
        matches!(self, OperatingMode::Legacy | OperatingMode::CompatibilityOnly)
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperatingMode::Full => "full",
            OperatingMode::Limited => "limited",
            OperatingMode::Legacy => "legacy",
            OperatingMode::CompatibilityOnly => "compatibility-only",
        };
        f.write_str(name)
    }
}

/// Which decision produced a classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleName {
    /// Platform predates the modern camera API; enumeration skipped
    BelowModernApi,
    /// Enumeration failed; degraded to the most conservative mode
    EnumerationFailed,
    FullMultiCamera,
    FullSingleCamera,
    Limited,
    Legacy,
    Compatibility,
}

struct ModeRule {
    name: RuleName,
    matches: fn(u32, &TierTally) -> bool,
    mode: OperatingMode,
    multi_camera: bool,
}

fn full_multi(api: u32, tally: &TierTally) -> bool {
    api >= FULL_TIER && tally.full >= 2
}

fn full_single(api: u32, tally: &TierTally) -> bool {
    api >= FULL_TIER && tally.full >= 1
}

fn limited(_api: u32, tally: &TierTally) -> bool {
    tally.limited > 0
}

fn legacy(api: u32, _tally: &TierTally) -> bool {
    api >= MODERN_CAMERA_API
}

fn always(_api: u32, _tally: &TierTally) -> bool {
    true
}

/// Evaluated top to bottom, first match wins
const MODE_RULES: [ModeRule; 5] = [
    ModeRule {
        name: RuleName::FullMultiCamera,
        matches: full_multi,
        mode: OperatingMode::Full,
        multi_camera: true,
    },
    ModeRule {
        name: RuleName::FullSingleCamera,
        matches: full_single,
        mode: OperatingMode::Full,
        multi_camera: false,
    },
    ModeRule {
        name: RuleName::Limited,
        matches: limited,
        mode: OperatingMode::Limited,
        multi_camera: false,
    },
    ModeRule {
        name: RuleName::Legacy,
        matches: legacy,
        mode: OperatingMode::Legacy,
        multi_camera: false,
    },
    ModeRule {
        name: RuleName::Compatibility,
        matches: always,
        mode: OperatingMode::CompatibilityOnly,
        multi_camera: false,
    },
];

/// Outcome of one classification pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub mode: OperatingMode,
    /// Whether several cameras may record concurrently
    pub multi_camera: bool,
    pub policy: OperatingPolicy,
    pub tally: TierTally,
    pub rule: RuleName,
}

impl Classification {
    fn new(mode: OperatingMode, multi_camera: bool, tally: TierTally, rule: RuleName) -> Self {
        Self {
            mode,
            multi_camera,
            policy: OperatingPolicy::for_mode(mode, multi_camera),
            tally,
            rule,
        }
    }

    fn compatibility(rule: RuleName) -> Self {
        Self::new(
            OperatingMode::CompatibilityOnly,
            false,
            TierTally::default(),
            rule,
        )
    }

    /// Recommended number of concurrently recording cameras
    pub fn recommended_camera_count(&self) -> usize {
        self.policy.max_camera_count
    }
}

/// Classify an already enumerated camera list
pub fn classify(api_level: u32, cameras: &[CameraDescriptor]) -> Classification {
    if api_level < MODERN_CAMERA_API {
        return Classification::compatibility(RuleName::BelowModernApi);
    }
    reduce(api_level, TierTally::from_descriptors(cameras))
}

fn reduce(api_level: u32, tally: TierTally) -> Classification {
    // The last rule always matches, the fallback only guards the type
    let (name, mode, multi_camera) = MODE_RULES
        .iter()
        .find(|rule| (rule.matches)(api_level, &tally))
        .map(|rule| (rule.name, rule.mode, rule.multi_camera))
        .unwrap_or((RuleName::Compatibility, OperatingMode::CompatibilityOnly, false));

    Classification::new(mode, multi_camera, tally, name)
}

/// Device enumeration collaborator
pub trait CameraEnumerator {
    /// Identifiers of every camera device
    fn camera_ids(&self) -> Result<Vec<String>, EnumerationError>;

    /// Raw hardware level of a camera, `None` when unreported
    fn hardware_level(&self, id: &str) -> Result<Option<i32>, EnumerationError>;

    /// Describe every camera; any failure aborts the whole pass
    fn enumerate(&self) -> Result<Vec<CameraDescriptor>, EnumerationError> {
        self.camera_ids()?
            .into_iter()
            .map(|id| {
                let level = self.hardware_level(&id)?;
                Ok(CameraDescriptor::from_reported(id, level))
            })
            .collect()
    }
}

/// One-shot classifier for a given platform
///
/// Classification is synchronous and never retried; re-run it wholesale
/// when the camera topology changes.
#[derive(Debug, Clone, Copy)]
pub struct CapabilityClassifier {
    api_level: u32,
}

impl CapabilityClassifier {
    pub fn new(api_level: u32) -> Self {
        Self { api_level }
    }

    pub fn api_level(&self) -> u32 {
        self.api_level
    }

    /// Enumerate cameras and select the operating mode
    ///
    /// Never fails: an enumeration error degrades to
    /// [`OperatingMode::CompatibilityOnly`] so startup is not blocked.
    pub fn classify<E: CameraEnumerator + ?Sized>(&self, enumerator: &E) -> Classification {
        if self.api_level < MODERN_CAMERA_API {
            info!(
                "Selected mode: {} (API {})",
                OperatingMode::CompatibilityOnly,
                self.api_level
            );
            return Classification::compatibility(RuleName::BelowModernApi);
        }

        let cameras = match enumerator.enumerate() {
            Ok(cameras) => cameras,
            Err(e) => {
                error!("Failed to access cameras: {}", e);
                return Classification::compatibility(RuleName::EnumerationFailed);
            }
        };

        let tally = TierTally::from_descriptors(&cameras);
        debug!(
            "Camera support - Full: {}, Limited: {}, Legacy: {}, Total: {}",
            tally.full,
            tally.limited,
            tally.legacy,
            tally.total()
        );

        let classification = reduce(self.api_level, tally);
        info!(
            "Selected mode: {} via {:?}, multi-camera: {}",
            classification.mode, classification.rule, classification.multi_camera
        );
        classification
    }
}
