//! Best-fit format negotiation
//!
//! Devices report irregular size and frame-rate lists. These functions
//! pick the entry closest to a target with fixed, stable tie-breaking:
//! the first candidate found wins ties and is never replaced by a later
//! equal one.

use crate::backend::FpsRange;
use camera_mode::Resolution;

/// Maximum difference between candidate and target aspect ratio
pub const ASPECT_TOLERANCE: f64 = 0.1;

/// Pick the frame size closest to `target`
///
/// 1. An exact match is returned immediately.
/// 2. Otherwise, among candidates within [`ASPECT_TOLERANCE`] of the
///    target ratio and no wider than the target, the one with the
///    closest height.
/// 3. Otherwise the closest height among all candidates no wider than
///    the target, ignoring aspect ratio.
/// 4. Otherwise the first candidate in list order. This is an arbitrary
///    last resort and says nothing about its distance to the target.
///
/// Returns `None` only for an empty list, meaning "keep the device default".
pub fn select_optimal(candidates: &[Resolution], target: Resolution) -> Option<Resolution> {
    if let Some(exact) = candidates.iter().find(|size| **size == target) {
        return Some(*exact);
    }

    let target_ratio = target.aspect_ratio();
    let fits_width = |size: &&Resolution| size.width <= target.width;

    closest_height(
        candidates
            .iter()
            .filter(|size| (size.aspect_ratio() - target_ratio).abs() <= ASPECT_TOLERANCE)
            .filter(fits_width),
        target.height,
    )
    .or_else(|| closest_height(candidates.iter().filter(fits_width), target.height))
    .or_else(|| candidates.first().copied())
}

/// Stable minimum of `|height - target_height|`
fn closest_height<'a>(
    sizes: impl Iterator<Item = &'a Resolution>,
    target_height: u32,
) -> Option<Resolution> {
    sizes.fold(None, |best: Option<Resolution>, size| match best {
        Some(kept) if kept.height.abs_diff(target_height) <= size.height.abs_diff(target_height) => {
            Some(kept)
        }
        _ => Some(*size),
    })
}

/// Pick the preview frame-rate range for a ceiling in frames per second
///
/// Prefers the range with the highest upper bound not above the ceiling.
/// When no range qualifies, falls back to the range with the highest
/// upper bound overall. Ties keep the earlier range.
pub fn select_fps_range(ranges: &[FpsRange], ceiling_fps: u32) -> Option<FpsRange> {
    let ceiling = ceiling_fps.saturating_mul(1000);

    highest_upper_bound(ranges.iter().filter(|range| range.max <= ceiling))
        .or_else(|| highest_upper_bound(ranges.iter()))
}

fn highest_upper_bound<'a>(ranges: impl Iterator<Item = &'a FpsRange>) -> Option<FpsRange> {
    ranges.fold(None, |best: Option<FpsRange>, range| match best {
        Some(kept) if kept.max >= range.max => Some(kept),
        _ => Some(*range),
    })
}
