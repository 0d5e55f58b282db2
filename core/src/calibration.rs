// core/src/calibration.rs
use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::ScaleConfig;
use crate::geometry::{distance, joint_confidence, pair_midpoint, pair_width, pos};
use crate::landmarks::{FrameLandmarkSet, Joint, JointPair, ScaledFrame};
use crate::measures::Measure;
use crate::ring::RingBuffer;
use crate::stats::{coefficient_of_variation, mean, z_scores};

/// Confidence reported until the history holds `min_history` entries.
pub const WARMUP_CONFIDENCE: f64 = 0.5;

// Oppreist: begge knær nesten strake og overkroppen nær loddrett
const UPRIGHT_KNEE_DEG: f64 = 160.0;
const UPRIGHT_TORSO_DEG: f64 = 20.0;
const STRAIGHT_ELBOW_DEG: f64 = 160.0;
/// Wrist height may differ from shoulder height by this share of the span.
const ARM_LEVEL_TOLERANCE: f64 = 0.25;
/// Wrist span must exceed shoulder width by this factor to count as a T-pose.
const MIN_SPAN_TO_SHOULDERS: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleEstimate {
    pub pixels_per_cm: f64,
    pub confidence: f64, // 0..1
}

/// Anthropometric priors, expressed as a share of standing height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleReference {
    /// nose → ankle midpoint
    Height,
    ShoulderWidth,
    /// shoulder midpoint → hip midpoint
    Torso,
    /// wrist → wrist with arms extended
    ArmSpan,
}

impl ScaleReference {
    pub const ALL: [ScaleReference; 4] = [
        ScaleReference::Height,
        ScaleReference::ShoulderWidth,
        ScaleReference::Torso,
        ScaleReference::ArmSpan,
    ];

    pub fn height_ratio(self) -> f64 {
        match self {
            ScaleReference::Height => 0.87,
            ScaleReference::ShoulderWidth => 0.26,
            ScaleReference::Torso => 0.25,
            ScaleReference::ArmSpan => 0.80,
        }
    }

    fn joints(self) -> &'static [Joint] {
        use Joint::*;
        match self {
            ScaleReference::Height => &[Nose, LeftAnkle, RightAnkle],
            ScaleReference::ShoulderWidth => &[LeftShoulder, RightShoulder],
            ScaleReference::Torso => &[LeftShoulder, RightShoulder, LeftHip, RightHip],
            ScaleReference::ArmSpan => &[LeftWrist, RightWrist],
        }
    }
}

/// One reference's px/cm reading with its visibility weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceEstimate {
    pub reference: ScaleReference,
    pub pixels_per_cm: f64,
    pub weight: f64,
}

/// Computes every reference available in `frame` (pixel space). Joints
/// outside the image are ignored; a non-positive frame size disables that
/// check.
pub fn reference_estimates(
    frame: &FrameLandmarkSet,
    frame_w: f64,
    frame_h: f64,
    height_cm: f64,
    min_vis: f64,
) -> Vec<ReferenceEstimate> {
    if !(height_cm > 0.0) {
        return Vec::new();
    }
    let inside: FrameLandmarkSet = if frame_w > 0.0 && frame_h > 0.0 {
        frame
            .iter()
            .filter(|lm| (0.0..=frame_w).contains(&lm.x) && (0.0..=frame_h).contains(&lm.y))
            .copied()
            .collect()
    } else {
        frame.clone()
    };

    let mut out = Vec::with_capacity(ScaleReference::ALL.len());
    for reference in ScaleReference::ALL {
        let Some(px) = reference_length(&inside, reference, min_vis) else {
            continue;
        };
        let Some(weight) = joint_confidence(&inside, reference.joints()) else {
            continue;
        };
        let cm = height_cm * reference.height_ratio();
        let ppcm = px / cm;
        if ppcm.is_finite() && ppcm > 0.0 {
            out.push(ReferenceEstimate { reference, pixels_per_cm: ppcm, weight });
        }
    }
    out
}

fn reference_length(f: &FrameLandmarkSet, reference: ScaleReference, min_vis: f64) -> Option<f64> {
    match reference {
        ScaleReference::Height => {
            // vinkler er skala-uavhengige, så pikselrammen kan brukes direkte
            let probe = ScaledFrame::new(f.clone(), None, 0.0);
            let knee = Measure::FrontKneeAngle.compute(&probe, min_vis)?;
            let lean = Measure::TorsoLean.compute(&probe, min_vis)?;
            if knee < UPRIGHT_KNEE_DEG || lean > UPRIGHT_TORSO_DEG {
                return None;
            }
            let nose = pos(f, Joint::Nose, min_vis)?;
            let ankles = pair_midpoint(f, JointPair::Ankle, min_vis)?;
            Some(distance(nose, ankles))
        }
        ScaleReference::ShoulderWidth => pair_width(f, JointPair::Shoulder, min_vis),
        ScaleReference::Torso => {
            let shoulders = pair_midpoint(f, JointPair::Shoulder, min_vis)?;
            let hips = pair_midpoint(f, JointPair::Hip, min_vis)?;
            Some(distance(shoulders, hips))
        }
        ScaleReference::ArmSpan => {
            let probe = ScaledFrame::new(f.clone(), None, 0.0);
            if Measure::MinElbowAngle.compute(&probe, min_vis)? < STRAIGHT_ELBOW_DEG {
                return None;
            }
            let span = pair_width(f, JointPair::Wrist, min_vis)?;
            let shoulders = pair_width(f, JointPair::Shoulder, min_vis)?;
            if span < MIN_SPAN_TO_SHOULDERS * shoulders {
                return None;
            }
            for (s, w) in [(Joint::LeftShoulder, Joint::LeftWrist), (Joint::RightShoulder, Joint::RightWrist)] {
                if (pos(f, w, min_vis)?.y - pos(f, s, min_vis)?.y).abs() > ARM_LEVEL_TOLERANCE * span {
                    return None;
                }
            }
            Some(span)
        }
    }
}

/// Drops estimates whose z-score exceeds `outlier_sigma` (unless that would
/// drop all of them) and returns the weight-averaged px/cm. Falls back to a
/// plain mean when the kept weights sum to zero.
pub fn fuse_estimates(estimates: &[ReferenceEstimate], outlier_sigma: f64) -> Option<f64> {
    if estimates.is_empty() {
        return None;
    }
    let values: Vec<f64> = estimates.iter().map(|e| e.pixels_per_cm).collect();
    let z = z_scores(&values);
    let mut kept: Vec<&ReferenceEstimate> = estimates
        .iter()
        .zip(&z)
        .filter(|(_, z)| z.abs() <= outlier_sigma)
        .map(|(e, _)| e)
        .collect();
    if kept.is_empty() {
        kept = estimates.iter().collect();
    } else if kept.len() < estimates.len() {
        debug!("scale: rejected {} of {} reference estimates", estimates.len() - kept.len(), estimates.len());
    }

    let total_w: f64 = kept.iter().map(|e| e.weight.max(0.0)).sum();
    let fused = if total_w > 0.0 {
        kept.iter().map(|e| e.pixels_per_cm * e.weight.max(0.0)).sum::<f64>() / total_w
    } else {
        let plain: Vec<f64> = kept.iter().map(|e| e.pixels_per_cm).collect();
        mean(&plain)?
    };
    fused.is_finite().then_some(fused)
}

/// Pixel → centimetre conversion from body-proportion priors, smoothed over
/// a bounded history.
#[derive(Debug, Clone)]
pub struct ScaleCalibrator {
    height_cm: f64,
    config: ScaleConfig,
    min_visibility: f64,
    history: RingBuffer<f64>,
    last: Option<ScaleEstimate>,
}

impl ScaleCalibrator {
    pub fn new(height_cm: f64, config: ScaleConfig, min_visibility: f64) -> Self {
        let history = RingBuffer::new(config.history_len);
        Self { height_cm, config, min_visibility, history, last: None }
    }

    pub fn height_cm(&self) -> f64 {
        self.height_cm
    }

    /// Scale for this frame, or `None` when no reference is computable. A
    /// `None` frame leaves the history untouched.
    pub fn estimate(&mut self, frame: &FrameLandmarkSet, frame_w: f64, frame_h: f64) -> Option<ScaleEstimate> {
        let refs = reference_estimates(frame, frame_w, frame_h, self.height_cm, self.min_visibility);
        let instant = fuse_estimates(&refs, self.config.outlier_sigma)?;
        self.history.push(instant);

        let pixels_per_cm = if self.history.len() >= self.config.min_history {
            self.smoothed().unwrap_or(instant)
        } else {
            instant
        };
        let est = ScaleEstimate { pixels_per_cm, confidence: self.confidence() };
        self.last = Some(est);
        Some(est)
    }

    /// EWMA over the history, oldest first.
    fn smoothed(&self) -> Option<f64> {
        let alpha = self.config.ewma_alpha;
        let mut it = self.history.iter();
        let first = *it.next()?;
        Some(it.fold(first, |s, v| alpha * v + (1.0 - alpha) * s))
    }

    /// 1 − 5·CV of the history, clamped to 0..1; fixed 0.5 during warm-up.
    pub fn confidence(&self) -> f64 {
        if self.history.len() < self.config.min_history {
            return WARMUP_CONFIDENCE;
        }
        let values = self.history.to_vec();
        match coefficient_of_variation(&values) {
            Some(cv) => (1.0 - 5.0 * cv).clamp(0.0, 1.0),
            None => 0.0,
        }
    }

    pub fn last_estimate(&self) -> Option<ScaleEstimate> {
        self.last
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.last = None;
    }
}
