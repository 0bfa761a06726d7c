//! Hardware support tiers

use serde::{Deserialize, Serialize};

/// Reported hardware level values, as defined by the platform camera API
mod level {
    pub const LIMITED: i32 = 0;
    pub const FULL: i32 = 1;
    pub const LEGACY: i32 = 2;
}

/// Hardware support tier of a single camera device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HardwareTier {
    /// Per-frame manual control, multi-stream capable
    Full,
    /// Subset of Full capabilities
    Limited,
    /// Modern API emulated on top of the legacy camera stack
    Legacy,
    /// Level absent or not recognised (LEVEL_3, EXTERNAL, vendor values)
    Unknown,
}

impl HardwareTier {
    /// Map the raw level reported by the device characteristics
    pub fn from_reported(level: Option<i32>) -> Self {
        match level {
            Some(level::FULL) => HardwareTier::Full,
            Some(level::LIMITED) => HardwareTier::Limited,
            Some(level::LEGACY) => HardwareTier::Legacy,
            _ => HardwareTier::Unknown,
        }
    }
}

/// A camera found during enumeration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraDescriptor {
    /// Opaque device identifier
    pub id: String,
    /// Hardware support tier
    pub tier: HardwareTier,
}

impl CameraDescriptor {
    pub fn new(id: impl Into<String>, tier: HardwareTier) -> Self {
        Self {
            id: id.into(),
            tier,
        }
    }

    /// Build a descriptor from the raw reported hardware level
    pub fn from_reported(id: impl Into<String>, level: Option<i32>) -> Self {
        Self::new(id, HardwareTier::from_reported(level))
    }
}

/// Per-tier camera counts for one classification pass
///
/// Only Full and Limited are counted as such; Legacy and Unknown devices
/// are both folded into the legacy count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierTally {
    pub full: usize,
    pub limited: usize,
    pub legacy: usize,
}

impl TierTally {
    pub fn from_descriptors(cameras: &[CameraDescriptor]) -> Self {
        cameras.iter().fold(Self::default(), |mut tally, camera| {
            match camera.tier {
                HardwareTier::Full => tally.full += 1,
                HardwareTier::Limited => tally.limited += 1,
                HardwareTier::Legacy | HardwareTier::Unknown => tally.legacy += 1,
            }
            tally
        })
    }

    pub fn total(&self) -> usize {
        self.full + self.limited + self.legacy
    }

    pub fn legacy_present(&self) -> bool {
        self.legacy > 0
    }
}
