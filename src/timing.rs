//! Frame-time arithmetic under floating-point tolerance.
//!
//! Timestamps coming out of containers are rarely exact multiples of
//! `1 / fps`: a frame that "is" at 1.9333… seconds may be reported as
//! 1.9333333333333331, and naïvely flooring `t * fps` would then snap it to
//! the previous frame. Every helper here first checks whether the value is
//! already on a frame boundary (within [`TOLERANCE`]) before rounding in the
//! requested direction.
//!
//! [`FrameTiming::is_match`] is the predicate the decoder uses to decide
//! whether a decoded sample satisfies a requested time.
//!
//! # Example
//!
//! ```
//! use seekframe::timing::{ceil_to_frame, floor_to_frame};
//!
//! // Already on a frame boundary: returned unchanged.
//! assert_eq!(floor_to_frame(58.0 / 30.0, 30.0), 58.0 / 30.0);
//!
//! // Between frames: snaps down or up.
//! assert_eq!(floor_to_frame(1.95, 30.0), 58.0 / 30.0);
//! assert_eq!(ceil_to_frame(1.95, 30.0), 59.0 / 30.0);
//! ```

use std::cmp::Ordering;

/// Absolute tolerance used by [`nearly_equal`]: ten machine epsilons.
pub const TOLERANCE: f64 = f64::EPSILON * 10.0;

/// Decimal digits used when comparing sample timestamps against targets.
///
/// Container timestamps already carry rounding error well above
/// [`TOLERANCE`], so the match predicate compares at this coarser precision.
pub const MATCH_PRECISION: u32 = 5;

/// Returns `true` if `lhs` and `rhs` differ by at most [`TOLERANCE`].
pub fn nearly_equal(lhs: f64, rhs: f64) -> bool {
    (lhs - rhs).abs() <= TOLERANCE
}

/// `lhs > rhs`, unless the two are [`nearly_equal`].
pub fn is_greater(lhs: f64, rhs: f64) -> bool {
    !nearly_equal(lhs, rhs) && lhs > rhs
}

/// `lhs < rhs`, unless the two are [`nearly_equal`].
pub fn is_less(lhs: f64, rhs: f64) -> bool {
    !nearly_equal(lhs, rhs) && lhs < rhs
}

/// `lhs > rhs` or [`nearly_equal`].
pub fn is_greater_or_equal(lhs: f64, rhs: f64) -> bool {
    lhs > rhs || nearly_equal(lhs, rhs)
}

/// `lhs < rhs` or [`nearly_equal`].
pub fn is_less_or_equal(lhs: f64, rhs: f64) -> bool {
    lhs < rhs || nearly_equal(lhs, rhs)
}

/// Tolerance-aware three-way comparison consistent with [`nearly_equal`].
pub fn tolerant_cmp(lhs: f64, rhs: f64) -> Ordering {
    if nearly_equal(lhs, rhs) {
        Ordering::Equal
    } else if lhs < rhs {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}

/// Round `value` to `digits` decimal places, half away from zero.
pub fn precised(value: f64, digits: u32) -> f64 {
    let offset = 10_f64.powi(digits as i32);
    (value * offset).round() / offset
}

/// Equality after rounding both operands to `digits` decimal places.
pub fn equal_precise(lhs: f64, rhs: f64, digits: u32) -> bool {
    precised(lhs, digits) == precised(rhs, digits)
}

/// Apply `condition` to both operands after rounding them to `digits`
/// decimal places.
///
/// ```
/// use seekframe::timing::compare_precise;
///
/// // 1e-6 apart: indistinguishable at 5 digits.
/// assert!(!compare_precise(1.000001, 1.0, 5, |a, b| a > b));
/// ```
pub fn compare_precise<F>(lhs: f64, rhs: f64, digits: u32, condition: F) -> bool
where
    F: Fn(f64, f64) -> bool,
{
    condition(precised(lhs, digits), precised(rhs, digits))
}

/// Snap `seconds` to the nearest frame boundary at `frames_per_second`.
pub fn round_to_frame(seconds: f64, frames_per_second: f64) -> f64 {
    (seconds * frames_per_second).round() / frames_per_second
}

/// Snap `seconds` down to a frame boundary at `frames_per_second`.
///
/// Values that already sit on a boundary (within [`TOLERANCE`]) are returned
/// as that boundary instead of being pushed back one frame by rounding error.
pub fn floor_to_frame(seconds: f64, frames_per_second: f64) -> f64 {
    let rounded = round_to_frame(seconds, frames_per_second);
    if nearly_equal(rounded, seconds) {
        return rounded;
    }
    (seconds * frames_per_second).floor() / frames_per_second
}

/// Snap `seconds` up to a frame boundary at `frames_per_second`.
///
/// The mirror image of [`floor_to_frame`].
pub fn ceil_to_frame(seconds: f64, frames_per_second: f64) -> f64 {
    let rounded = round_to_frame(seconds, frames_per_second);
    if nearly_equal(rounded, seconds) {
        return rounded;
    }
    (seconds * frames_per_second).ceil() / frames_per_second
}

/// Index of the frame nearest to `seconds`.
pub fn frame_index(seconds: f64, frames_per_second: f64) -> i64 {
    (seconds * frames_per_second).round() as i64
}

/// Returns `true` if `seconds` already lies on a frame boundary.
pub fn is_on_frame_boundary(seconds: f64, frames_per_second: f64) -> bool {
    nearly_equal(round_to_frame(seconds, frames_per_second), seconds)
}

/// Match predicate for a candidate sample timestamp.
///
/// A candidate satisfies `target` when any of the following holds (all
/// comparisons at [`MATCH_PRECISION`] unless noted):
///
/// 1. the two are equal;
/// 2. the candidate is earlier than the target by less than one frame;
/// 3. the candidate is within one frame of the target (either side) and the
///    target is within one frame of the end of the asset. Without this the
///    final frame of a clip whose timestamps undershoot the duration would be
///    unreachable.
pub fn is_match(target: f64, candidate: f64, one_frame_duration: f64, asset_duration: f64) -> bool {
    if equal_precise(target, candidate, MATCH_PRECISION) {
        return true;
    }

    let earlier = compare_precise(target, candidate, MATCH_PRECISION, |a, b| a > b);
    let distance = (target - candidate).abs();
    let within_frame =
        compare_precise(distance, one_frame_duration, MATCH_PRECISION, |a, b| a < b);
    if earlier && within_frame {
        return true;
    }

    let near_target = distance <= one_frame_duration;
    let near_end = (asset_duration - target) <= one_frame_duration;
    near_target && near_end
}

/// Frame duration and asset length bound together for repeated matching.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTiming {
    /// Duration of one frame in seconds.
    pub one_frame_duration: f64,
    /// Total duration of the asset in seconds.
    pub asset_duration: f64,
}

impl FrameTiming {
    /// Create timing for a source of `frames_per_second` and `asset_duration`.
    ///
    /// Non-positive frame rates fall back to `fallback_frames_per_second`.
    pub fn new(frames_per_second: f64, fallback_frames_per_second: f64, asset_duration: f64) -> Self {
        let rate = if frames_per_second > 0.0 {
            frames_per_second
        } else {
            fallback_frames_per_second
        };
        Self {
            one_frame_duration: 1.0 / rate,
            asset_duration,
        }
    }

    /// See [`is_match`].
    pub fn is_match(&self, target: f64, candidate: f64) -> bool {
        is_match(
            target,
            candidate,
            self.one_frame_duration,
            self.asset_duration,
        )
    }
}
