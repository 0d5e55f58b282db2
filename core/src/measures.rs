// core/src/measures.rs
//! Named biomechanical measurements shared by form criteria and safety rules.

use serde::{Deserialize, Serialize};

use crate::geometry::{
    angle_at, angle_from_vertical, bilateral_angle, distance, min_side_angle, pair_centroid,
    pair_midpoint, pair_width, pos,
};
use crate::landmarks::{Joint, JointPair, ScaledFrame};

/// Neutral ear-to-shoulder distance relative to shoulder width.
pub const NEUTRAL_NECK_RATIO: f64 = 0.33;

/// Below this fraction the ankles are too close for a width ratio.
const MIN_WIDTH: f64 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Degrees,
    Centimeters,
    Ratio,
    Percent,
}

impl Unit {
    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Degrees => "°",
            Unit::Centimeters => "cm",
            Unit::Ratio => "",
            Unit::Percent => "%",
        }
    }

    /// Physical units need a calibrated frame.
    #[inline]
    pub fn needs_scale(self) -> bool {
        matches!(self, Unit::Centimeters)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    /// hip-knee-ankle, mean of both sides
    KneeAngle,
    /// hip-knee-ankle, the more bent side
    FrontKneeAngle,
    /// shoulder-hip-knee
    HipAngle,
    /// shoulder-elbow-wrist
    ElbowAngle,
    /// shoulder-elbow-wrist, the more bent side
    MinElbowAngle,
    /// hip-shoulder-elbow
    ShoulderAngle,
    /// hip→shoulder vector vs vertical
    TorsoLean,
    /// shoulder-hip-ankle
    BodyLine,
    /// 180 − ear-shoulder-hip
    SpineFlexion,
    /// knee width / ankle width
    KneeWidthRatio,
    /// ankle width / shoulder width
    StanceWidthRatio,
    /// inward knee collapse relative to ankle width (%)
    KneeValgus,
    /// hip centre offset from the ankle centre along the hip axis (cm, signed)
    HipLateralShift,
    /// horizontal wrist-over-elbow offset (cm, mean of sides)
    WristStackOffset,
    /// neck shortening vs neutral (%)
    ShoulderElevation,
    /// 180 − elbow-wrist-index, worse side
    WristDeviation,
    /// nose above ear level (degrees)
    NeckExtension,
}

impl Measure {
    pub fn unit(self) -> Unit {
        match self {
            Measure::KneeAngle
            | Measure::FrontKneeAngle
            | Measure::HipAngle
            | Measure::ElbowAngle
            | Measure::MinElbowAngle
            | Measure::ShoulderAngle
            | Measure::TorsoLean
            | Measure::BodyLine
            | Measure::SpineFlexion
            | Measure::WristDeviation
            | Measure::NeckExtension => Unit::Degrees,
            Measure::KneeWidthRatio | Measure::StanceWidthRatio => Unit::Ratio,
            Measure::KneeValgus | Measure::ShoulderElevation => Unit::Percent,
            Measure::HipLateralShift | Measure::WristStackOffset => Unit::Centimeters,
        }
    }

    /// Joints the measurement reads; reported back as "affected joints".
    pub fn joints(self) -> &'static [Joint] {
        use Joint::*;
        match self {
            Measure::KneeAngle | Measure::FrontKneeAngle => {
                &[LeftHip, LeftKnee, LeftAnkle, RightHip, RightKnee, RightAnkle]
            }
            Measure::HipAngle => &[LeftShoulder, LeftHip, LeftKnee, RightShoulder, RightHip, RightKnee],
            Measure::ElbowAngle | Measure::MinElbowAngle => {
                &[LeftShoulder, LeftElbow, LeftWrist, RightShoulder, RightElbow, RightWrist]
            }
            Measure::ShoulderAngle => &[LeftHip, LeftShoulder, LeftElbow, RightHip, RightShoulder, RightElbow],
            Measure::TorsoLean => &[LeftShoulder, RightShoulder, LeftHip, RightHip],
            Measure::BodyLine => &[LeftShoulder, LeftHip, LeftAnkle, RightShoulder, RightHip, RightAnkle],
            Measure::SpineFlexion => &[LeftEar, RightEar, LeftShoulder, RightShoulder, LeftHip, RightHip],
            Measure::KneeWidthRatio | Measure::KneeValgus => &[LeftKnee, RightKnee, LeftAnkle, RightAnkle],
            Measure::StanceWidthRatio => &[LeftAnkle, RightAnkle, LeftShoulder, RightShoulder],
            Measure::HipLateralShift => &[LeftHip, RightHip, LeftAnkle, RightAnkle],
            Measure::WristStackOffset => &[LeftElbow, LeftWrist, RightElbow, RightWrist],
            Measure::ShoulderElevation => &[LeftEar, RightEar, LeftShoulder, RightShoulder],
            Measure::WristDeviation => &[LeftElbow, LeftWrist, LeftIndex, RightElbow, RightWrist, RightIndex],
            Measure::NeckExtension => &[Nose, LeftEar, RightEar],
        }
    }

    /// Computes the measurement, or `None` when the joints it needs are
    /// missing/low-visibility or it needs a scale the frame lacks.
    pub fn compute(self, frame: &ScaledFrame, min_vis: f64) -> Option<f64> {
        if self.unit().needs_scale() && !frame.is_scaled() {
            return None;
        }
        let f = &frame.landmarks;
        use Joint::*;
        let value = match self {
            Measure::KneeAngle => bilateral_angle(
                f,
                [LeftHip, LeftKnee, LeftAnkle],
                [RightHip, RightKnee, RightAnkle],
                min_vis,
            )?,
            Measure::FrontKneeAngle => min_side_angle(
                f,
                [LeftHip, LeftKnee, LeftAnkle],
                [RightHip, RightKnee, RightAnkle],
                min_vis,
            )?,
            Measure::HipAngle => bilateral_angle(
                f,
                [LeftShoulder, LeftHip, LeftKnee],
                [RightShoulder, RightHip, RightKnee],
                min_vis,
            )?,
            Measure::ElbowAngle => bilateral_angle(
                f,
                [LeftShoulder, LeftElbow, LeftWrist],
                [RightShoulder, RightElbow, RightWrist],
                min_vis,
            )?,
            Measure::MinElbowAngle => min_side_angle(
                f,
                [LeftShoulder, LeftElbow, LeftWrist],
                [RightShoulder, RightElbow, RightWrist],
                min_vis,
            )?,
            Measure::ShoulderAngle => bilateral_angle(
                f,
                [LeftHip, LeftShoulder, LeftElbow],
                [RightHip, RightShoulder, RightElbow],
                min_vis,
            )?,
            Measure::TorsoLean => {
                let shoulders = pair_centroid(f, JointPair::Shoulder, min_vis)?;
                let hips = pair_centroid(f, JointPair::Hip, min_vis)?;
                angle_from_vertical(shoulders - hips)?
            }
            Measure::BodyLine => bilateral_angle(
                f,
                [LeftShoulder, LeftHip, LeftAnkle],
                [RightShoulder, RightHip, RightAnkle],
                min_vis,
            )?,
            Measure::SpineFlexion => {
                let ears = pair_centroid(f, JointPair::Ear, min_vis)?;
                let shoulders = pair_centroid(f, JointPair::Shoulder, min_vis)?;
                let hips = pair_centroid(f, JointPair::Hip, min_vis)?;
                180.0 - angle_at(ears, shoulders, hips)?
            }
            Measure::KneeWidthRatio => {
                let ankles = pair_width(f, JointPair::Ankle, min_vis)?;
                if ankles < MIN_WIDTH {
                    return None;
                }
                pair_width(f, JointPair::Knee, min_vis)? / ankles
            }
            Measure::StanceWidthRatio => {
                let shoulders = pair_width(f, JointPair::Shoulder, min_vis)?;
                if shoulders < MIN_WIDTH {
                    return None;
                }
                pair_width(f, JointPair::Ankle, min_vis)? / shoulders
            }
            Measure::KneeValgus => {
                let ankles = pair_width(f, JointPair::Ankle, min_vis)?;
                if ankles < MIN_WIDTH {
                    return None;
                }
                let knees = pair_width(f, JointPair::Knee, min_vis)?;
                (ankles - knees) / ankles * 100.0
            }
            Measure::HipLateralShift => {
                let lh = pos(f, LeftHip, min_vis)?;
                let rh = pos(f, RightHip, min_vis)?;
                let axis = rh - lh;
                let len = axis.norm();
                if len < MIN_WIDTH {
                    return None;
                }
                let ankles = pair_midpoint(f, JointPair::Ankle, min_vis)?;
                let hips = (lh + rh) * 0.5;
                (hips - ankles).dot(&(axis / len))
            }
            Measure::WristStackOffset => {
                let side = |e: Joint, w: Joint| -> Option<f64> {
                    Some((pos(f, w, min_vis)?.x - pos(f, e, min_vis)?.x).abs())
                };
                match (side(LeftElbow, LeftWrist), side(RightElbow, RightWrist)) {
                    (Some(a), Some(b)) => 0.5 * (a + b),
                    (Some(a), None) | (None, Some(a)) => a,
                    (None, None) => return None,
                }
            }
            Measure::ShoulderElevation => {
                let width = pair_width(f, JointPair::Shoulder, min_vis)?;
                if width < MIN_WIDTH {
                    return None;
                }
                let ears = pair_centroid(f, JointPair::Ear, min_vis)?;
                let shoulders = pair_midpoint(f, JointPair::Shoulder, min_vis)?;
                let ratio = distance(ears, shoulders) / width;
                ((NEUTRAL_NECK_RATIO - ratio) / NEUTRAL_NECK_RATIO * 100.0).max(0.0)
            }
            Measure::WristDeviation => {
                let side = |e: Joint, w: Joint, i: Joint| -> Option<f64> {
                    Some(180.0 - angle_at(pos(f, e, min_vis)?, pos(f, w, min_vis)?, pos(f, i, min_vis)?)?)
                };
                match (side(LeftElbow, LeftWrist, LeftIndex), side(RightElbow, RightWrist, RightIndex)) {
                    (Some(a), Some(b)) => a.max(b),
                    (Some(a), None) | (None, Some(a)) => a,
                    (None, None) => return None,
                }
            }
            Measure::NeckExtension => {
                let nose = pos(f, Nose, min_vis)?;
                let ears = pair_centroid(f, JointPair::Ear, min_vis)?;
                let d = nose - ears;
                let horizontal = (d.x * d.x + d.z * d.z).sqrt();
                if horizontal < MIN_WIDTH && d.y.abs() < MIN_WIDTH {
                    return None;
                }
                // y peker nedover: nese over øret gir positiv vinkel
                (-d.y).atan2(horizontal).to_degrees()
            }
        };
        value.is_finite().then_some(value)
    }
}
