//! Exercise phase classification.
//!
//! Each frame is labelled from the vertical gap (cm) between two joint-group
//! centroids. Outside the thresholds the label is decided by the frame alone;
//! between them the direction of travel comes from the previous gap in the
//! rolling window. There is no transition lock: any label can follow any
//! other.

use serde::{Deserialize, Serialize};

use crate::exercise::{profile, ExerciseType};
use crate::geometry::pair_centroid;
use crate::landmarks::{JointPair, ScaledFrame};
use crate::measures::Measure;
use crate::ring::RingBuffer;

/// ≈ 3 s at 30 fps.
pub const PHASE_WINDOW_LEN: usize = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExercisePhase {
    Unknown,
    /// Extended end of the range (standing, lockout, arms straight).
    Top,
    /// Moving from top toward bottom.
    Descending,
    /// Contracted end of the range (squat depth, chest at floor, curled).
    Bottom,
    /// Moving from bottom toward top.
    Ascending,
    /// Static hold (plank).
    Holding,
}

impl ExercisePhase {
    pub const ALL: [ExercisePhase; 6] = [
        ExercisePhase::Unknown,
        ExercisePhase::Top,
        ExercisePhase::Descending,
        ExercisePhase::Bottom,
        ExercisePhase::Ascending,
        ExercisePhase::Holding,
    ];

    /// Exercise-specific wording for the phase.
    pub fn label(self, exercise: Option<ExerciseType>) -> &'static str {
        use ExerciseType::*;
        match (self, exercise) {
            (ExercisePhase::Unknown, _) => "unknown",
            (ExercisePhase::Holding, _) => "holding",
            (ExercisePhase::Top, Some(Squat | Deadlift | Lunge)) => "standing",
            (ExercisePhase::Top, Some(ShoulderPress)) => "lockout",
            (ExercisePhase::Top, Some(BicepCurl)) => "extended",
            (ExercisePhase::Top, _) => "top",
            (ExercisePhase::Bottom, Some(ShoulderPress)) => "rack",
            (ExercisePhase::Bottom, Some(BicepCurl)) => "curled",
            (ExercisePhase::Bottom, _) => "bottom",
            (ExercisePhase::Descending, Some(ShoulderPress | BicepCurl)) => "lowering",
            (ExercisePhase::Descending, _) => "descending",
            (ExercisePhase::Ascending, Some(ShoulderPress)) => "pressing",
            (ExercisePhase::Ascending, Some(BicepCurl)) => "curling",
            (ExercisePhase::Ascending, _) => "ascending",
        }
    }

    #[inline]
    pub fn is_transition(self) -> bool {
        matches!(self, ExercisePhase::Descending | ExercisePhase::Ascending)
    }
}

/// Gap thresholds in centimetres. `gap ≥ top_cm` ⇒ Top, `gap ≤ bottom_cm`
/// ⇒ Bottom; gap changes smaller than `min_motion_cm` carry no direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseThresholds {
    pub top_cm: f64,
    pub bottom_cm: f64,
    #[serde(default = "default_min_motion")]
    pub min_motion_cm: f64,
}

fn default_min_motion() -> f64 { 0.5 }

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PhaseRule {
    /// gap = lower.y − upper.y (image y grows downward).
    VerticalGap { upper: JointPair, lower: JointPair, thresholds: PhaseThresholds },
    /// Holding while `measure` is computable.
    Static { measure: Measure },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseSample {
    pub phase: ExercisePhase,
    pub gap_cm: Option<f64>,
    pub timestamp_s: f64,
}

/// Rolling window of recent phase samples.
#[derive(Debug, Clone)]
pub struct PhaseWindow {
    samples: RingBuffer<PhaseSample>,
}

impl Default for PhaseWindow {
    fn default() -> Self {
        Self::new(PHASE_WINDOW_LEN)
    }
}

impl PhaseWindow {
    pub fn new(capacity: usize) -> Self {
        Self { samples: RingBuffer::new(capacity) }
    }

    pub fn push(&mut self, sample: PhaseSample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn last_phase(&self) -> Option<ExercisePhase> {
        self.samples.latest().map(|s| s.phase)
    }

    /// Gap of the newest sample. `None` after an unmeasurable frame, so
    /// direction is never taken against a gap from before an occlusion.
    pub fn last_gap(&self) -> Option<f64> {
        self.samples.latest().and_then(|s| s.gap_cm)
    }

    /// Most recent label that is not Unknown.
    pub fn last_known_phase(&self) -> Option<ExercisePhase> {
        self.samples
            .iter()
            .rev()
            .map(|s| s.phase)
            .find(|p| *p != ExercisePhase::Unknown)
    }

    /// Sample count per phase within the window, in `ExercisePhase::ALL` order.
    pub fn distribution(&self) -> Vec<(ExercisePhase, usize)> {
        ExercisePhase::ALL
            .iter()
            .map(|p| (*p, self.samples.iter().filter(|s| s.phase == *p).count()))
            .filter(|(_, n)| *n > 0)
            .collect()
    }

    /// Most frequent label in the window (ties → earlier in `ALL`).
    pub fn dominant(&self) -> Option<ExercisePhase> {
        self.distribution()
            .into_iter()
            .fold(None, |best: Option<(ExercisePhase, usize)>, (p, n)| match best {
                Some((_, bn)) if bn >= n => best,
                _ => Some((p, n)),
            })
            .map(|(p, _)| p)
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseReading {
    pub phase: ExercisePhase,
    pub gap_cm: Option<f64>,
}

impl PhaseReading {
    pub const UNKNOWN: PhaseReading = PhaseReading { phase: ExercisePhase::Unknown, gap_cm: None };
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PhaseDetector {
    overrides: Option<PhaseThresholds>,
    min_visibility: f64,
}

impl PhaseDetector {
    pub fn new(overrides: Option<PhaseThresholds>, min_visibility: f64) -> Self {
        Self { overrides, min_visibility }
    }

    /// Thresholds in effect for `exercise`, honouring overrides.
    pub fn thresholds(&self, exercise: ExerciseType) -> Option<PhaseThresholds> {
        match profile(exercise).phase_rule {
            PhaseRule::VerticalGap { thresholds, .. } => Some(self.overrides.unwrap_or(thresholds)),
            PhaseRule::Static { .. } => None,
        }
    }

    /// Labels one frame. Unset exercise, unscaled frame or missing joints ⇒
    /// Unknown.
    pub fn classify(&self, exercise: Option<ExerciseType>, frame: &ScaledFrame, window: &PhaseWindow) -> PhaseReading {
        let Some(exercise) = exercise else {
            return PhaseReading::UNKNOWN;
        };
        match profile(exercise).phase_rule {
            PhaseRule::Static { measure } => {
                let phase = if measure.compute(frame, self.min_visibility).is_some() {
                    ExercisePhase::Holding
                } else {
                    ExercisePhase::Unknown
                };
                PhaseReading { phase, gap_cm: None }
            }
            PhaseRule::VerticalGap { upper, lower, thresholds } => {
                if !frame.is_scaled() {
                    return PhaseReading::UNKNOWN;
                }
                let t = self.overrides.unwrap_or(thresholds);
                let gap = (|| {
                    let up = pair_centroid(&frame.landmarks, upper, self.min_visibility)?;
                    let low = pair_centroid(&frame.landmarks, lower, self.min_visibility)?;
                    Some(low.y - up.y)
                })();
                match gap {
                    Some(g) => PhaseReading { phase: classify_gap(g, &t, window), gap_cm: Some(g) },
                    None => PhaseReading::UNKNOWN,
                }
            }
        }
    }
}

fn classify_gap(gap: f64, t: &PhaseThresholds, window: &PhaseWindow) -> ExercisePhase {
    if gap >= t.top_cm {
        return ExercisePhase::Top;
    }
    if gap <= t.bottom_cm {
        return ExercisePhase::Bottom;
    }
    if let Some(prev) = window.last_gap() {
        let delta = gap - prev;
        if delta < -t.min_motion_cm {
            return ExercisePhase::Descending;
        }
        if delta > t.min_motion_cm {
            return ExercisePhase::Ascending;
        }
    }
    match window.last_known_phase() {
        Some(p) if p.is_transition() => p,
        Some(ExercisePhase::Top) => ExercisePhase::Descending,
        Some(ExercisePhase::Bottom) => ExercisePhase::Ascending,
        _ => ExercisePhase::Unknown,
    }
}

/// Counts a repetition each time Top is reached after Bottom was visited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepCounter {
    visited_bottom: bool,
    count: u32,
}

impl RepCounter {
    /// Returns `true` when this phase completes a repetition.
    pub fn update(&mut self, phase: ExercisePhase) -> bool {
        match phase {
            ExercisePhase::Bottom => {
                self.visited_bottom = true;
                false
            }
            ExercisePhase::Top if self.visited_bottom => {
                self.visited_bottom = false;
                self.count += 1;
                true
            }
            _ => false,
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: PhaseThresholds = PhaseThresholds { top_cm: 35.0, bottom_cm: 10.0, min_motion_cm: 0.5 };

    fn push(w: &mut PhaseWindow, phase: ExercisePhase, gap: f64) {
        w.push(PhaseSample { phase, gap_cm: Some(gap), timestamp_s: 0.0 });
    }

    #[test]
    fn extremes_need_no_history() {
        let w = PhaseWindow::default();
        assert_eq!(classify_gap(40.0, &T, &w), ExercisePhase::Top);
        assert_eq!(classify_gap(5.0, &T, &w), ExercisePhase::Bottom);
        assert_eq!(classify_gap(20.0, &T, &w), ExercisePhase::Unknown);
    }

    #[test]
    fn direction_from_previous_gap() {
        let mut w = PhaseWindow::default();
        push(&mut w, ExercisePhase::Top, 36.0);
        assert_eq!(classify_gap(30.0, &T, &w), ExercisePhase::Descending);
        push(&mut w, ExercisePhase::Bottom, 8.0);
        assert_eq!(classify_gap(15.0, &T, &w), ExercisePhase::Ascending);
        // innenfor dødsonen: bunnen ⇒ på vei opp
        assert_eq!(classify_gap(8.2, &T, &w), ExercisePhase::Bottom);
        push(&mut w, ExercisePhase::Bottom, 10.0);
        assert_eq!(classify_gap(10.3, &T, &w), ExercisePhase::Ascending);
    }

    #[test]
    fn occlusion_breaks_the_gap_history() {
        let mut w = PhaseWindow::default();
        push(&mut w, ExercisePhase::Descending, 20.0);
        w.push(PhaseSample { phase: ExercisePhase::Unknown, gap_cm: None, timestamp_s: 0.0 });
        assert_eq!(w.last_gap(), None);
        // 30 cm mot den gamle 20 ville gitt Ascending; uten ferskt gap bæres siste retning
        assert_eq!(classify_gap(30.0, &T, &w), ExercisePhase::Descending);

        push(&mut w, ExercisePhase::Descending, 25.0);
        assert_eq!(w.last_gap(), Some(25.0));
        assert_eq!(classify_gap(30.0, &T, &w), ExercisePhase::Ascending);
    }

    #[test]
    fn rep_counted_on_return_to_top() {
        let mut reps = RepCounter::default();
        for p in [ExercisePhase::Top, ExercisePhase::Descending, ExercisePhase::Top] {
            assert!(!reps.update(p));
        }
        reps.update(ExercisePhase::Bottom);
        reps.update(ExercisePhase::Ascending);
        assert!(reps.update(ExercisePhase::Top));
        assert_eq!(reps.count(), 1);
    }

    #[test]
    fn overrides_replace_gap_thresholds() {
        let custom = PhaseThresholds { top_cm: 30.0, bottom_cm: 12.0, min_motion_cm: 1.0 };
        assert_eq!(PhaseDetector::new(Some(custom), 0.5).thresholds(ExerciseType::Squat), Some(custom));
        let default = PhaseDetector::default().thresholds(ExerciseType::Squat).unwrap();
        assert_eq!((default.top_cm, default.bottom_cm), (35.0, 10.0));
        assert_eq!(PhaseDetector::default().thresholds(ExerciseType::Plank), None);
    }

    #[test]
    fn labels_follow_the_exercise() {
        assert_eq!(ExercisePhase::Top.label(Some(ExerciseType::Squat)), "standing");
        assert_eq!(ExercisePhase::Top.label(Some(ExerciseType::ShoulderPress)), "lockout");
        assert_eq!(ExercisePhase::Bottom.label(Some(ExerciseType::BicepCurl)), "curled");
        assert_eq!(ExercisePhase::Descending.label(None), "descending");
    }

    #[test]
    fn dominant_phase() {
        let mut w = PhaseWindow::new(4);
        push(&mut w, ExercisePhase::Top, 40.0);
        push(&mut w, ExercisePhase::Descending, 30.0);
        push(&mut w, ExercisePhase::Descending, 20.0);
        assert_eq!(w.dominant(), Some(ExercisePhase::Descending));
        assert_eq!(w.distribution(), vec![(ExercisePhase::Top, 1), (ExercisePhase::Descending, 2)]);
    }
}
