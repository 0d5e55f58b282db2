// core/src/exercise.rs
//! Exercise registry: one profile per exercise with its form criteria, phase
//! rule and relevant safety checks. Built once, shared read-only by every
//! session.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::form::FormCriterion;
use crate::landmarks::JointPair;
use crate::measures::Measure;
use crate::phase::ExercisePhase::{self, Ascending, Bottom, Descending, Top};
use crate::phase::{PhaseRule, PhaseThresholds};
use crate::safety::SafetyIssue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "&'static str", try_from = "String")]
pub enum ExerciseType {
    Squat,
    Deadlift,
    Lunge,
    PushUp,
    ShoulderPress,
    BicepCurl,
    Plank,
}

impl ExerciseType {
    pub const ALL: [ExerciseType; 7] = [
        ExerciseType::Squat,
        ExerciseType::Deadlift,
        ExerciseType::Lunge,
        ExerciseType::PushUp,
        ExerciseType::ShoulderPress,
        ExerciseType::BicepCurl,
        ExerciseType::Plank,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ExerciseType::Squat => "squat",
            ExerciseType::Deadlift => "deadlift",
            ExerciseType::Lunge => "lunge",
            ExerciseType::PushUp => "push_up",
            ExerciseType::ShoulderPress => "shoulder_press",
            ExerciseType::BicepCurl => "bicep_curl",
            ExerciseType::Plank => "plank",
        }
    }

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ExerciseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExerciseType {
    type Err = ConfigError;

    /// Case-insensitive; `-` and spaces are read as `_`. Accepts a few
    /// common aliases ("pushup", "press", "curl").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .map(|c| if c == '-' || c == ' ' { '_' } else { c.to_ascii_lowercase() })
            .collect();
        match key.as_str() {
            "squat" => Ok(ExerciseType::Squat),
            "deadlift" => Ok(ExerciseType::Deadlift),
            "lunge" => Ok(ExerciseType::Lunge),
            "push_up" | "pushup" => Ok(ExerciseType::PushUp),
            "shoulder_press" | "press" | "overhead_press" => Ok(ExerciseType::ShoulderPress),
            "bicep_curl" | "biceps_curl" | "curl" => Ok(ExerciseType::BicepCurl),
            "plank" => Ok(ExerciseType::Plank),
            _ => Err(ConfigError::UnsupportedExercise(s.to_string())),
        }
    }
}

impl TryFrom<String> for ExerciseType {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ExerciseType> for &'static str {
    fn from(e: ExerciseType) -> Self {
        e.as_str()
    }
}

#[derive(Debug, Clone)]
pub struct ExerciseProfile {
    pub exercise: ExerciseType,
    /// Evaluation order; also the tie-break order for feedback.
    pub criteria: Vec<FormCriterion>,
    pub phase_rule: PhaseRule,
    pub safety: Vec<SafetyIssue>,
}

static PROFILES: Lazy<[ExerciseProfile; 7]> = Lazy::new(|| ExerciseType::ALL.map(build_profile));

/// Registered profile for `exercise`.
pub fn profile(exercise: ExerciseType) -> &'static ExerciseProfile {
    &PROFILES[exercise.index()]
}

const MOVING: &[ExercisePhase] = &[Descending, Bottom, Ascending];
const AT_BOTTOM: &[ExercisePhase] = &[Bottom];
const AT_TOP: &[ExercisePhase] = &[Top];
const ANY: &[ExercisePhase] = &[];

fn gap(upper: JointPair, lower: JointPair, top_cm: f64, bottom_cm: f64) -> PhaseRule {
    PhaseRule::VerticalGap {
        upper,
        lower,
        thresholds: PhaseThresholds { top_cm, bottom_cm, min_motion_cm: 0.5 },
    }
}

fn build_profile(exercise: ExerciseType) -> ExerciseProfile {
    use SafetyIssue::*;
    let c = FormCriterion::new;
    let (criteria, phase_rule, safety) = match exercise {
        ExerciseType::Squat => (
            vec![
                c("knee_depth", Measure::KneeAngle, 0.30, 90.0, (70.0, 110.0), AT_BOTTOM)
                    .text("Squat depth is off", "Lower until the thighs are about parallel to the floor"),
                c("torso_angle", Measure::TorsoLean, 0.25, 20.0, (0.0, 45.0), MOVING)
                    .text("Torso is leaning too far", "Keep the chest up and brace the core"),
                c("knee_tracking", Measure::KneeWidthRatio, 0.25, 1.0, (0.9, 1.3), ANY)
                    .text("Knees are not tracking over the feet", "Push the knees out in line with the toes"),
                c("stance_width", Measure::StanceWidthRatio, 0.10, 1.1, (0.8, 1.6), ANY)
                    .text("Stance width is off", "Place the feet about shoulder width apart"),
                c("hip_shift", Measure::HipLateralShift, 0.10, 0.0, (-5.0, 5.0), ANY)
                    .text("Hips are shifting to one side", "Distribute weight evenly on both feet"),
            ],
            gap(JointPair::Hip, JointPair::Knee, 35.0, 10.0),
            vec![SpineFlexion, KneeValgus, ForwardLean, HipLateralShift],
        ),
        ExerciseType::Deadlift => (
            vec![
                c("hip_hinge", Measure::HipAngle, 0.30, 80.0, (60.0, 110.0), AT_BOTTOM)
                    .text("Hip hinge is off", "Push the hips back while keeping the bar close"),
                c("back_angle", Measure::TorsoLean, 0.20, 45.0, (20.0, 70.0), AT_BOTTOM)
                    .text("Back angle is off", "Set the shoulders slightly in front of the bar"),
                c("lockout", Measure::HipAngle, 0.20, 178.0, (165.0, 180.0), AT_TOP)
                    .text("Incomplete lockout", "Squeeze the glutes and stand fully tall"),
                c("knee_bend", Measure::KneeAngle, 0.15, 140.0, (110.0, 170.0), AT_BOTTOM)
                    .text("Knee bend is off", "Keep a soft bend without turning it into a squat"),
                c("hip_shift", Measure::HipLateralShift, 0.15, 0.0, (-5.0, 5.0), ANY)
                    .text("Hips are shifting to one side", "Pull evenly with both sides"),
            ],
            gap(JointPair::Hip, JointPair::Knee, 35.0, 22.0),
            vec![SpineFlexion, HipLateralShift, NeckHyperextension],
        ),
        ExerciseType::Lunge => (
            vec![
                c("front_knee", Measure::FrontKneeAngle, 0.35, 90.0, (75.0, 105.0), AT_BOTTOM)
                    .text("Front knee angle is off", "Drop straight down until the front knee is at 90°"),
                c("torso_upright", Measure::TorsoLean, 0.30, 5.0, (0.0, 20.0), MOVING)
                    .text("Torso is leaning", "Stay tall with the shoulders over the hips"),
                c("knee_tracking", Measure::KneeWidthRatio, 0.20, 1.0, (0.8, 1.4), ANY)
                    .text("Knees are drifting inward", "Keep the front knee over the middle toes"),
                c("hip_shift", Measure::HipLateralShift, 0.15, 0.0, (-6.0, 6.0), ANY)
                    .text("Hips are shifting to one side", "Keep the pelvis level"),
            ],
            gap(JointPair::Hip, JointPair::Knee, 38.0, 25.0),
            vec![KneeValgus, ForwardLean, HipLateralShift],
        ),
        ExerciseType::PushUp => (
            vec![
                c("body_line", Measure::BodyLine, 0.35, 180.0, (165.0, 180.0), ANY)
                    .text("Body is not in a straight line", "Brace the core and squeeze the glutes"),
                c("elbow_depth", Measure::ElbowAngle, 0.30, 90.0, (70.0, 110.0), AT_BOTTOM)
                    .text("Push-up depth is off", "Lower until the elbows reach about 90°"),
                c("lockout", Measure::ElbowAngle, 0.20, 175.0, (160.0, 180.0), AT_TOP)
                    .text("Arms are not fully extended", "Press all the way up"),
                c("elbow_flare", Measure::ShoulderAngle, 0.15, 45.0, (20.0, 75.0), AT_BOTTOM)
                    .text("Elbows are flaring", "Keep the elbows about 45° from the torso"),
            ],
            gap(JointPair::Shoulder, JointPair::Elbow, 20.0, 5.0),
            vec![WristDeviation, ShoulderElevation, SpineFlexion],
        ),
        ExerciseType::ShoulderPress => (
            vec![
                c("lockout", Measure::ElbowAngle, 0.30, 175.0, (160.0, 180.0), AT_TOP)
                    .text("Incomplete lockout", "Press until the arms are straight overhead"),
                c("rack_depth", Measure::ElbowAngle, 0.20, 90.0, (70.0, 110.0), AT_BOTTOM)
                    .text("Bottom position is off", "Lower the weight to about shoulder height"),
                c("torso_upright", Measure::TorsoLean, 0.25, 0.0, (0.0, 15.0), ANY)
                    .text("Torso is leaning", "Brace the core and avoid arching back"),
                c("wrist_stack", Measure::WristStackOffset, 0.25, 0.0, (0.0, 8.0), ANY)
                    .text("Wrists are not stacked over the elbows", "Keep the forearms vertical"),
            ],
            gap(JointPair::Elbow, JointPair::Shoulder, 20.0, 2.0),
            vec![ShoulderElevation, WristDeviation, NeckHyperextension],
        ),
        ExerciseType::BicepCurl => (
            vec![
                c("curl_range", Measure::MinElbowAngle, 0.35, 40.0, (25.0, 60.0), AT_BOTTOM)
                    .text("Curl is not reaching full contraction", "Curl the weight all the way up"),
                c("full_extension", Measure::ElbowAngle, 0.25, 165.0, (150.0, 180.0), AT_TOP)
                    .text("Arms are not fully extended", "Lower the weight under control to full extension"),
                c("elbow_pinned", Measure::ShoulderAngle, 0.25, 10.0, (0.0, 25.0), ANY)
                    .text("Elbows are drifting forward", "Keep the elbows pinned to the sides"),
                c("torso_still", Measure::TorsoLean, 0.15, 0.0, (0.0, 10.0), ANY)
                    .text("Body is swinging", "Keep the torso still and lighten the load if needed"),
            ],
            gap(JointPair::Elbow, JointPair::Wrist, 18.0, -10.0),
            vec![WristDeviation, ShoulderElevation, ForwardLean],
        ),
        ExerciseType::Plank => (
            vec![
                c("body_line", Measure::BodyLine, 0.50, 180.0, (165.0, 180.0), ANY)
                    .text("Body is not in a straight line", "Keep the hips level with the shoulders"),
                c("hip_angle", Measure::HipAngle, 0.30, 180.0, (160.0, 180.0), ANY)
                    .text("Hips are piking or sagging", "Squeeze the glutes and tuck the pelvis"),
                c("shoulder_stack", Measure::ShoulderAngle, 0.20, 90.0, (75.0, 105.0), ANY)
                    .text("Shoulders are not over the elbows", "Stack the shoulders above the elbows"),
            ],
            PhaseRule::Static { measure: Measure::BodyLine },
            vec![SpineFlexion, ShoulderElevation, WristDeviation],
        ),
    };
    ExerciseProfile { exercise, criteria, phase_rule, safety }
}
