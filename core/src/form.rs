// core/src/form.rs
//! Form scoring against weighted per-exercise criteria.

use serde::{Deserialize, Serialize};

use crate::exercise::{profile, ExerciseType};
use crate::landmarks::{Joint, ScaledFrame};
use crate::measures::{Measure, Unit};
use crate::phase::ExercisePhase;

/// Score returned when nothing could be evaluated.
pub const NEUTRAL_SCORE: f64 = 50.0;
/// Criteria scoring below this produce feedback.
pub const FEEDBACK_BELOW: f64 = 0.7;
pub const CRITICAL_BELOW: f64 = 0.3;

/// Share of the score lost between the ideal value and the farther range edge.
const IN_RANGE_PENALTY: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Info, Severity::Warning, Severity::Critical];

    pub fn from_score(score: f64) -> Severity {
        if score < CRITICAL_BELOW {
            Severity::Critical
        } else if score < FEEDBACK_BELOW {
            Severity::Warning
        } else {
            Severity::Info
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

/// Static target for one measurement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormCriterion {
    pub name: &'static str,
    pub measure: Measure,
    pub weight: f64, // 0..1
    pub ideal: f64,
    pub min: f64,
    pub max: f64,
    /// Phases in which the criterion applies; empty = all.
    pub phases: &'static [ExercisePhase],
    pub message: &'static str,
    pub suggestion: &'static str,
}

impl FormCriterion {
    pub fn new(
        name: &'static str,
        measure: Measure,
        weight: f64,
        ideal: f64,
        range: (f64, f64),
        phases: &'static [ExercisePhase],
    ) -> Self {
        Self {
            name,
            measure,
            weight,
            ideal,
            min: range.0,
            max: range.1,
            phases,
            message: "",
            suggestion: "",
        }
    }

    pub fn text(mut self, message: &'static str, suggestion: &'static str) -> Self {
        self.message = message;
        self.suggestion = suggestion;
        self
    }

    #[inline]
    pub fn unit(&self) -> Unit {
        self.measure.unit()
    }

    pub fn applies_to(&self, phase: ExercisePhase) -> bool {
        self.phases.is_empty() || self.phases.contains(&phase)
    }

    /// 0..1. Inside the range the score drops linearly to 0.7 at the edge
    /// farthest from the ideal; outside it decays from 0.7 to 0 over one
    /// range width past the edge.
    pub fn score(&self, value: f64) -> f64 {
        if !value.is_finite() {
            return 0.0;
        }
        let span = self.max - self.min;
        if (self.min..=self.max).contains(&value) {
            let reach = (self.ideal - self.min).max(self.max - self.ideal);
            if reach <= 0.0 {
                return 1.0;
            }
            return (1.0 - IN_RANGE_PENALTY * (value - self.ideal).abs() / reach).clamp(0.0, 1.0);
        }
        let excess = if value < self.min { self.min - value } else { value - self.max };
        if span <= 0.0 {
            return 0.0;
        }
        ((1.0 - IN_RANGE_PENALTY) * (1.0 - excess / span)).max(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormFeedback {
    pub severity: Severity,
    /// Criterion name; empty for general notices.
    pub criterion: String,
    pub message: String,
    pub affected_joints: Vec<Joint>,
    pub suggestion: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionScore {
    pub name: String,
    pub value: f64,
    pub score: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormEvaluation {
    /// 0..100
    pub score: f64,
    /// critical → warning → info; ties keep criterion order.
    pub feedback: Vec<FormFeedback>,
    /// Criteria that were computable this frame.
    pub criteria: Vec<CriterionScore>,
}

impl FormEvaluation {
    fn neutral(reason: &str) -> Self {
        Self {
            score: NEUTRAL_SCORE,
            feedback: vec![FormFeedback {
                severity: Severity::Info,
                criterion: String::new(),
                message: reason.to_string(),
                affected_joints: Vec::new(),
                suggestion: "Make sure the whole body is visible to the camera".to_string(),
            }],
            criteria: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormEvaluator {
    min_visibility: f64,
}

impl Default for FormEvaluator {
    fn default() -> Self {
        Self { min_visibility: 0.5 }
    }
}

impl FormEvaluator {
    pub fn new(min_visibility: f64) -> Self {
        Self { min_visibility }
    }

    /// Scores `frame` for `exercise` in `phase`.
    pub fn evaluate(&self, exercise: Option<ExerciseType>, frame: &ScaledFrame, phase: ExercisePhase) -> FormEvaluation {
        match exercise {
            Some(e) => self.evaluate_criteria(&profile(e).criteria, frame, phase),
            None => FormEvaluation::neutral("No exercise selected"),
        }
    }

    /// Scores an explicit criterion list. Criteria that cannot be computed
    /// (missing joints, wrong phase, centimetre unit on an unscaled frame)
    /// count toward neither numerator nor denominator.
    pub fn evaluate_criteria(&self, criteria: &[FormCriterion], frame: &ScaledFrame, phase: ExercisePhase) -> FormEvaluation {
        let mut scored = Vec::new();
        let mut feedback = Vec::new();

        for c in criteria.iter().filter(|c| c.applies_to(phase)) {
            let Some(value) = c.measure.compute(frame, self.min_visibility) else {
                continue;
            };
            let s = c.score(value);
            if s < FEEDBACK_BELOW {
                feedback.push(FormFeedback {
                    severity: Severity::from_score(s),
                    criterion: c.name.to_string(),
                    message: format!(
                        "{} ({:.1}{} vs ideal {:.1}{})",
                        c.message,
                        value,
                        c.unit().symbol(),
                        c.ideal,
                        c.unit().symbol()
                    ),
                    affected_joints: c.measure.joints().to_vec(),
                    suggestion: c.suggestion.to_string(),
                });
            }
            scored.push(CriterionScore { name: c.name.to_string(), value, score: s, weight: c.weight });
        }

        if scored.is_empty() {
            return FormEvaluation::neutral("Not enough visible joints to evaluate form");
        }

        let total_w: f64 = scored.iter().map(|c| c.weight.max(0.0)).sum();
        let ratio = if total_w > 0.0 {
            scored.iter().map(|c| c.score * c.weight.max(0.0)).sum::<f64>() / total_w
        } else {
            scored.iter().map(|c| c.score).sum::<f64>() / scored.len() as f64
        };

        // stabil sortering: lik alvorlighet beholder kriterierekkefølgen
        feedback.sort_by(|a, b| b.severity.cmp(&a.severity));

        FormEvaluation { score: (100.0 * ratio).clamp(0.0, 100.0), feedback, criteria: scored }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::{FrameLandmarkSet, Landmark};

    const NONE: &[ExercisePhase] = &[];

    fn crit(ideal: f64, min: f64, max: f64) -> FormCriterion {
        FormCriterion::new("t", Measure::KneeAngle, 1.0, ideal, (min, max), NONE)
    }

    #[test]
    fn in_range_scoring() {
        let c = crit(90.0, 70.0, 110.0);
        assert_eq!(c.score(90.0), 1.0);
        assert!((c.score(100.0) - 0.85).abs() < 1e-12);
        assert!((c.score(70.0) - 0.7).abs() < 1e-12);
    }

    #[test]
    fn out_of_range_decays_to_zero() {
        let c = crit(90.0, 70.0, 110.0);
        assert!((c.score(120.0) - 0.525).abs() < 1e-12);
        assert_eq!(c.score(150.0), 0.0);
        assert_eq!(c.score(f64::NAN), 0.0);
        assert_eq!(Severity::from_score(c.score(125.0)), Severity::Warning);
        assert_eq!(Severity::from_score(c.score(140.0)), Severity::Critical);
    }

    #[test]
    fn empty_frame_is_neutral() {
        let frame = ScaledFrame::new(FrameLandmarkSet::new(), None, 0.0);
        let out = FormEvaluator::default().evaluate(Some(ExerciseType::Squat), &frame, ExercisePhase::Bottom);
        assert_eq!(out.score, NEUTRAL_SCORE);
        assert_eq!(out.feedback.len(), 1);
        assert_eq!(out.feedback[0].severity, Severity::Info);
    }

    #[test]
    fn phase_restricted_criteria_are_skipped() {
        let frame = ScaledFrame::new(
            FrameLandmarkSet::from_landmarks([
                Landmark::new(Joint::LeftHip, 0.0, 0.0, 0.0, 0.9),
                Landmark::new(Joint::LeftKnee, 0.0, 40.0, 0.0, 0.9),
                Landmark::new(Joint::LeftAnkle, 0.0, 80.0, 0.0, 0.9),
            ]),
            None,
            0.0,
        );
        let only_bottom: &'static [ExercisePhase] = &[ExercisePhase::Bottom];
        let criteria = [FormCriterion::new("depth", Measure::KneeAngle, 1.0, 90.0, (70.0, 110.0), only_bottom)];
        let ev = FormEvaluator::default();

        let top = ev.evaluate_criteria(&criteria, &frame, ExercisePhase::Top);
        assert_eq!(top.score, NEUTRAL_SCORE);

        // strakt kne i bunnen: 180° er langt utenfor
        let bottom = ev.evaluate_criteria(&criteria, &frame, ExercisePhase::Bottom);
        assert_eq!(bottom.score, 0.0);
        assert_eq!(bottom.feedback[0].severity, Severity::Critical);
        assert_eq!(bottom.feedback[0].criterion, "depth");
    }

    #[test]
    fn feedback_is_ordered_by_severity() {
        let frame = ScaledFrame::new(
            FrameLandmarkSet::from_landmarks([
                Landmark::new(Joint::LeftHip, 0.0, 0.0, 0.0, 0.9),
                Landmark::new(Joint::LeftKnee, 0.0, 40.0, 0.0, 0.9),
                Landmark::new(Joint::LeftAnkle, 0.0, 80.0, 0.0, 0.9),
            ]),
            None,
            0.0,
        );
        let criteria = [
            FormCriterion::new("warn", Measure::KneeAngle, 0.5, 160.0, (140.0, 170.0), NONE),
            FormCriterion::new("crit", Measure::KneeAngle, 0.5, 90.0, (70.0, 110.0), NONE),
        ];
        let out = FormEvaluator::default().evaluate_criteria(&criteria, &frame, ExercisePhase::Unknown);
        let names: Vec<&str> = out.feedback.iter().map(|f| f.criterion.as_str()).collect();
        assert_eq!(names, ["crit", "warn"]);
        assert!((0.0..=100.0).contains(&out.score));
    }
}
