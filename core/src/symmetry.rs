// core/src/symmetry.rs
use crate::landmarks::{FrameLandmarkSet, Joint, JointPair, Landmark};

/// Both sides of a pair must be more confident than this to be corrected.
pub const PAIR_MIN_VISIBILITY: f64 = 0.5;

/// Soft bilateral symmetry about the vertical line through the hip centre.
///
/// For every limb pair each side's horizontal offset from the hip centre is
/// compared with the mean offset magnitude of the two sides; each side is
/// then moved `weight` of the way toward that symmetric offset. Offsets keep
/// their sign, so a side-on view (both sides on the same side of the hip
/// line) is left as it is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymmetryEnforcer {
    weight: f64,
}

impl Default for SymmetryEnforcer {
    fn default() -> Self {
        Self { weight: 0.3 }
    }
}

impl SymmetryEnforcer {
    pub fn new(weight: f64) -> Self {
        Self { weight: weight.clamp(0.0, 1.0) }
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn enforce(&self, frame: &FrameLandmarkSet) -> FrameLandmarkSet {
        enforce(frame, self.weight)
    }
}

/// Free-function form of [`SymmetryEnforcer::enforce`]. Weight 0 returns an
/// exact copy of the input.
pub fn enforce(frame: &FrameLandmarkSet, weight: f64) -> FrameLandmarkSet {
    if weight <= 0.0 {
        return frame.clone();
    }
    let w = weight.min(1.0);

    let hips = (
        frame.visible(Joint::LeftHip, PAIR_MIN_VISIBILITY),
        frame.visible(Joint::RightHip, PAIR_MIN_VISIBILITY),
    );
    let center_x = match hips {
        (Some(l), Some(r)) => 0.5 * (l.x + r.x),
        _ => return frame.clone(),
    };

    let mut out = frame.clone();
    for pair in JointPair::LIMBS {
        let (lj, rj) = pair.sides();
        let (Some(left), Some(right)) = (
            frame.visible(lj, PAIR_MIN_VISIBILITY),
            frame.visible(rj, PAIR_MIN_VISIBILITY),
        ) else {
            continue;
        };

        let dl = left.x - center_x;
        let dr = right.x - center_x;
        let avg = 0.5 * (dl.abs() + dr.abs());

        out.insert(blend_x(left, center_x + dl.signum() * avg, w));
        out.insert(blend_x(right, center_x + dr.signum() * avg, w));
    }
    out
}

fn blend_x(lm: &Landmark, target_x: f64, w: f64) -> Landmark {
    Landmark { x: lm.x + w * (target_x - lm.x), ..*lm }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frontal() -> FrameLandmarkSet {
        FrameLandmarkSet::from_landmarks([
            Landmark::new(Joint::LeftHip, 90.0, 200.0, 0.0, 0.9),
            Landmark::new(Joint::RightHip, 110.0, 200.0, 0.0, 0.9),
            Landmark::new(Joint::LeftShoulder, 70.0, 100.0, 0.0, 0.9),
            Landmark::new(Joint::RightShoulder, 150.0, 100.0, 0.0, 0.9),
        ])
    }

    #[test]
    fn weight_one_mirrors_offsets() {
        let out = enforce(&frontal(), 1.0);
        // offsets -30 / +50 → begge 40
        assert!((out.get(Joint::LeftShoulder).unwrap().x - 60.0).abs() < 1e-12);
        assert!((out.get(Joint::RightShoulder).unwrap().x - 140.0).abs() < 1e-12);
    }

    #[test]
    fn partial_weight_blends() {
        let out = SymmetryEnforcer::new(0.3).enforce(&frontal());
        assert!((out.get(Joint::LeftShoulder).unwrap().x - 67.0).abs() < 1e-12);
        assert!((out.get(Joint::RightShoulder).unwrap().x - 147.0).abs() < 1e-12);
        // y er urørt
        assert_eq!(out.get(Joint::LeftShoulder).unwrap().y, 100.0);
    }

    #[test]
    fn low_confidence_pair_untouched() {
        let mut f = frontal();
        f.insert(Landmark::new(Joint::RightShoulder, 150.0, 100.0, 0.0, 0.4));
        let out = enforce(&f, 0.5);
        assert_eq!(out.get(Joint::LeftShoulder), f.get(Joint::LeftShoulder));
    }
}
