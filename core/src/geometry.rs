//! Joint geometry helpers.
//!
//! Image convention: x grows to the right, y grows downwards, z is depth on
//! the same scale as x. Every helper returns `None` instead of a value it
//! cannot compute (missing joint, degenerate segment).

use nalgebra::Vector3;

use crate::landmarks::{FrameLandmarkSet, Joint, JointPair};

/// Segments shorter than this are treated as degenerate.
const MIN_SEGMENT: f64 = 1e-6;

/// Angle at `b` in degrees, from the law of cosines on the vectors b→a and
/// b→c. 180° = straight line.
pub fn angle_at(a: Vector3<f64>, b: Vector3<f64>, c: Vector3<f64>) -> Option<f64> {
    let ba = a - b;
    let bc = c - b;
    let mag1 = ba.norm();
    let mag2 = bc.norm();
    if mag1 < MIN_SEGMENT || mag2 < MIN_SEGMENT {
        return None;
    }
    let cos_angle = (ba.dot(&bc) / (mag1 * mag2)).clamp(-1.0, 1.0);
    Some(cos_angle.acos().to_degrees())
}

/// Angle between `v` and straight up in the image (0 = vertical).
pub fn angle_from_vertical(v: Vector3<f64>) -> Option<f64> {
    let n = v.norm();
    if n < MIN_SEGMENT {
        return None;
    }
    let up = Vector3::new(0.0, -1.0, 0.0);
    Some((v.dot(&up) / n).clamp(-1.0, 1.0).acos().to_degrees())
}

#[inline]
pub fn midpoint(a: Vector3<f64>, b: Vector3<f64>) -> Vector3<f64> {
    (a + b) * 0.5
}

#[inline]
pub fn distance(a: Vector3<f64>, b: Vector3<f64>) -> f64 {
    (a - b).norm()
}

/// Position of a joint whose visibility exceeds `min_vis`.
#[inline]
pub fn pos(frame: &FrameLandmarkSet, joint: Joint, min_vis: f64) -> Option<Vector3<f64>> {
    frame.visible(joint, min_vis).map(|lm| lm.position())
}

/// Midpoint of a left/right pair; both sides must be visible.
pub fn pair_midpoint(frame: &FrameLandmarkSet, pair: JointPair, min_vis: f64) -> Option<Vector3<f64>> {
    let (l, r) = pair.sides();
    Some(midpoint(pos(frame, l, min_vis)?, pos(frame, r, min_vis)?))
}

/// Centroid of a pair, falling back to whichever side is visible.
pub fn pair_centroid(frame: &FrameLandmarkSet, pair: JointPair, min_vis: f64) -> Option<Vector3<f64>> {
    let (l, r) = pair.sides();
    match (pos(frame, l, min_vis), pos(frame, r, min_vis)) {
        (Some(a), Some(b)) => Some(midpoint(a, b)),
        (Some(a), None) | (None, Some(a)) => Some(a),
        (None, None) => None,
    }
}

/// Distance between the two sides of a pair.
pub fn pair_width(frame: &FrameLandmarkSet, pair: JointPair, min_vis: f64) -> Option<f64> {
    let (l, r) = pair.sides();
    Some(distance(pos(frame, l, min_vis)?, pos(frame, r, min_vis)?))
}

/// Product of the visibilities of `joints`; `None` if any is missing.
pub fn joint_confidence(frame: &FrameLandmarkSet, joints: &[Joint]) -> Option<f64> {
    joints
        .iter()
        .try_fold(1.0, |acc, j| frame.get(*j).map(|lm| acc * lm.visibility.clamp(0.0, 1.0)))
}

/// Angle at the middle joint, averaged over the sides that are computable.
pub fn bilateral_angle(
    frame: &FrameLandmarkSet,
    left: [Joint; 3],
    right: [Joint; 3],
    min_vis: f64,
) -> Option<f64> {
    let side = |js: [Joint; 3]| -> Option<f64> {
        angle_at(pos(frame, js[0], min_vis)?, pos(frame, js[1], min_vis)?, pos(frame, js[2], min_vis)?)
    };
    match (side(left), side(right)) {
        (Some(a), Some(b)) => Some(0.5 * (a + b)),
        (Some(a), None) | (None, Some(a)) => Some(a),
        (None, None) => None,
    }
}

/// Smaller of the two side angles (front leg in a lunge, deeper arm in a curl).
pub fn min_side_angle(
    frame: &FrameLandmarkSet,
    left: [Joint; 3],
    right: [Joint; 3],
    min_vis: f64,
) -> Option<f64> {
    let side = |js: [Joint; 3]| -> Option<f64> {
        angle_at(pos(frame, js[0], min_vis)?, pos(frame, js[1], min_vis)?, pos(frame, js[2], min_vis)?)
    };
    match (side(left), side(right)) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (Some(a), None) | (None, Some(a)) => Some(a),
        (None, None) => None,
    }
}
