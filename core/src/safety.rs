// core/src/safety.rs
//! Threshold rules for unsafe movement, independent of the form score.
//!
//! Every rule maps one measurement to caution/warning/danger. Alerts for the
//! same (issue, body part) are rate limited by a cooldown measured on the
//! caller's frame timestamps.

use std::collections::{BTreeMap, HashMap};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::exercise::{profile, ExerciseType};
use crate::landmarks::ScaledFrame;
use crate::measures::Measure;
use crate::phase::ExercisePhase;
use crate::ring::RingBuffer;

pub const ALERT_HISTORY_LEN: usize = 100;
pub const TOP_ISSUES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetySeverity {
    Caution,
    Warning,
    Danger,
}

impl SafetySeverity {
    pub const ALL: [SafetySeverity; 3] = [SafetySeverity::Caution, SafetySeverity::Warning, SafetySeverity::Danger];

    pub fn as_str(self) -> &'static str {
        match self {
            SafetySeverity::Caution => "caution",
            SafetySeverity::Warning => "warning",
            SafetySeverity::Danger => "danger",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyIssue {
    SpineFlexion,
    KneeValgus,
    ForwardLean,
    ShoulderElevation,
    WristDeviation,
    HipLateralShift,
    NeckHyperextension,
}

impl SafetyIssue {
    pub fn rule(self) -> &'static SafetyRule {
        &SAFETY_RULES[self as usize]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyPart {
    LowerBack,
    Knees,
    Shoulders,
    Wrists,
    Hips,
    Neck,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SafetyRule {
    pub issue: SafetyIssue,
    pub body_part: BodyPart,
    pub measure: Measure,
    pub caution: f64,
    pub warning: f64,
    pub danger: f64,
    /// Compare |value| instead of value (signed measures).
    pub magnitude: bool,
    /// Phases in which the rule applies; empty = all.
    pub phases: &'static [ExercisePhase],
    pub message: &'static str,
    pub immediate_action: &'static str,
}

impl SafetyRule {
    /// Highest threshold reached, if any.
    pub fn classify(&self, value: f64) -> Option<SafetySeverity> {
        let v = if self.magnitude { value.abs() } else { value };
        if !v.is_finite() {
            return None;
        }
        if v >= self.danger {
            Some(SafetySeverity::Danger)
        } else if v >= self.warning {
            Some(SafetySeverity::Warning)
        } else if v >= self.caution {
            Some(SafetySeverity::Caution)
        } else {
            None
        }
    }

    fn applies_to(&self, phase: ExercisePhase) -> bool {
        self.phases.is_empty() || self.phases.contains(&phase)
    }
}

const UNDER_LOAD: &[ExercisePhase] = &[ExercisePhase::Descending, ExercisePhase::Bottom, ExercisePhase::Ascending];

/// Indexed by `SafetyIssue as usize`.
pub static SAFETY_RULES: [SafetyRule; 7] = [
    SafetyRule {
        issue: SafetyIssue::SpineFlexion,
        body_part: BodyPart::LowerBack,
        measure: Measure::SpineFlexion,
        caution: 15.0,
        warning: 25.0,
        danger: 35.0,
        magnitude: false,
        phases: &[],
        message: "Back is rounding",
        immediate_action: "Stop and reset with a neutral spine",
    },
    SafetyRule {
        issue: SafetyIssue::KneeValgus,
        body_part: BodyPart::Knees,
        measure: Measure::KneeValgus,
        caution: 10.0,
        warning: 20.0,
        danger: 30.0,
        magnitude: false,
        phases: UNDER_LOAD,
        message: "Knees are collapsing inward",
        immediate_action: "Push the knees out over the toes",
    },
    SafetyRule {
        issue: SafetyIssue::ForwardLean,
        body_part: BodyPart::LowerBack,
        measure: Measure::TorsoLean,
        caution: 45.0,
        warning: 60.0,
        danger: 75.0,
        magnitude: false,
        phases: &[],
        message: "Excessive forward lean",
        immediate_action: "Lift the chest and shift weight to the mid-foot",
    },
    SafetyRule {
        issue: SafetyIssue::ShoulderElevation,
        body_part: BodyPart::Shoulders,
        measure: Measure::ShoulderElevation,
        caution: 30.0,
        warning: 45.0,
        danger: 60.0,
        magnitude: false,
        phases: &[],
        message: "Shoulders are shrugging toward the ears",
        immediate_action: "Draw the shoulder blades down",
    },
    SafetyRule {
        issue: SafetyIssue::WristDeviation,
        body_part: BodyPart::Wrists,
        measure: Measure::WristDeviation,
        caution: 25.0,
        warning: 35.0,
        danger: 45.0,
        magnitude: false,
        phases: &[],
        message: "Wrist is bent under load",
        immediate_action: "Straighten the wrist over the forearm",
    },
    SafetyRule {
        issue: SafetyIssue::HipLateralShift,
        body_part: BodyPart::Hips,
        measure: Measure::HipLateralShift,
        caution: 5.0,
        warning: 8.0,
        danger: 12.0,
        magnitude: true,
        phases: &[],
        message: "Hips are shifting sideways",
        immediate_action: "Re-centre the hips between the feet",
    },
    SafetyRule {
        issue: SafetyIssue::NeckHyperextension,
        body_part: BodyPart::Neck,
        measure: Measure::NeckExtension,
        caution: 20.0,
        warning: 30.0,
        danger: 40.0,
        magnitude: false,
        phases: &[],
        message: "Neck is overextended",
        immediate_action: "Tuck the chin and look slightly ahead",
    },
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyAlert {
    pub severity: SafetySeverity,
    pub issue: SafetyIssue,
    pub body_part: BodyPart,
    pub value: f64,
    pub message: String,
    pub immediate_action: String,
    pub phase: ExercisePhase,
    pub timestamp_s: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SafetySummary {
    /// Alerts raised over the whole session (not only the retained history).
    pub total_raised: u64,
    pub suppressed: u64,
    pub by_severity: BTreeMap<SafetySeverity, usize>,
    pub by_body_part: BTreeMap<BodyPart, usize>,
    /// Most frequent issues in the history, most frequent first.
    pub top_issues: Vec<(SafetyIssue, usize)>,
}

#[derive(Debug, Clone)]
pub struct SafetyMonitor {
    cooldown_secs: f64,
    min_visibility: f64,
    last_fired: HashMap<(SafetyIssue, BodyPart), f64>,
    history: RingBuffer<SafetyAlert>,
    total_raised: u64,
    suppressed: u64,
}

impl SafetyMonitor {
    pub fn new(cooldown_secs: f64, min_visibility: f64) -> Self {
        Self {
            cooldown_secs,
            min_visibility,
            last_fired: HashMap::new(),
            history: RingBuffer::new(ALERT_HISTORY_LEN),
            total_raised: 0,
            suppressed: 0,
        }
    }

    /// Alerts for this frame, danger first. An unset exercise checks nothing.
    pub fn check(&mut self, frame: &ScaledFrame, exercise: Option<ExerciseType>, phase: ExercisePhase) -> Vec<SafetyAlert> {
        let Some(exercise) = exercise else {
            return Vec::new();
        };
        let now = frame.timestamp_s;
        let mut alerts = Vec::new();

        for issue in &profile(exercise).safety {
            let rule = issue.rule();
            if !rule.applies_to(phase) {
                continue;
            }
            let Some(value) = rule.measure.compute(frame, self.min_visibility) else {
                continue;
            };
            let Some(severity) = rule.classify(value) else {
                continue;
            };

            let key = (rule.issue, rule.body_part);
            if let Some(&last) = self.last_fired.get(&key) {
                if now - last < self.cooldown_secs {
                    self.suppressed += 1;
                    debug!("safety: {:?} suppressed ({:.2}s since last)", rule.issue, now - last);
                    continue;
                }
            }
            self.last_fired.insert(key, now);

            alerts.push(SafetyAlert {
                severity,
                issue: rule.issue,
                body_part: rule.body_part,
                value,
                message: format!("{} ({:.1}{})", rule.message, value, rule.measure.unit().symbol()),
                immediate_action: rule.immediate_action.to_string(),
                phase,
                timestamp_s: now,
            });
        }

        alerts.sort_by(|a, b| b.severity.cmp(&a.severity));
        for a in &alerts {
            self.history.push(a.clone());
        }
        self.total_raised += alerts.len() as u64;
        alerts
    }

    pub fn history(&self) -> impl Iterator<Item = &SafetyAlert> + '_ {
        self.history.iter()
    }

    pub fn summary(&self) -> SafetySummary {
        let mut by_severity = BTreeMap::new();
        let mut by_body_part = BTreeMap::new();
        let mut by_issue: BTreeMap<SafetyIssue, usize> = BTreeMap::new();
        for a in self.history.iter() {
            *by_severity.entry(a.severity).or_insert(0) += 1;
            *by_body_part.entry(a.body_part).or_insert(0) += 1;
            *by_issue.entry(a.issue).or_insert(0) += 1;
        }
        let mut top_issues: Vec<(SafetyIssue, usize)> = by_issue.into_iter().collect();
        top_issues.sort_by(|a, b| b.1.cmp(&a.1));
        top_issues.truncate(TOP_ISSUES);

        SafetySummary {
            total_raised: self.total_raised,
            suppressed: self.suppressed,
            by_severity,
            by_body_part,
            top_issues,
        }
    }

    pub fn reset(&mut self) {
        self.last_fired.clear();
        self.history.clear();
        self.total_raised = 0;
        self.suppressed = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::ScaleEstimate;
    use crate::landmarks::{FrameLandmarkSet, Joint, Landmark};

    /// Squat bottom (cm) that trips forward lean, knee valgus and hip shift.
    fn unsafe_squat(t: f64) -> ScaledFrame {
        let lean = 65f64.to_radians();
        let (sx, sy) = (45.0 * lean.sin(), 100.0 - 45.0 * lean.cos());
        let set = FrameLandmarkSet::from_landmarks([
            Landmark::new(Joint::LeftHip, 0.0, 100.0, -10.0, 0.9),
            Landmark::new(Joint::RightHip, 0.0, 100.0, 10.0, 0.9),
            Landmark::new(Joint::LeftShoulder, sx, sy, -12.0, 0.9),
            Landmark::new(Joint::RightShoulder, sx, sy, 12.0, 0.9),
            Landmark::new(Joint::LeftKnee, 2.0, 140.0, -4.0, 0.9),
            Landmark::new(Joint::RightKnee, 2.0, 140.0, 4.0, 0.9),
            // ankelsenteret 10 cm ut til siden
            Landmark::new(Joint::LeftAnkle, 0.0, 180.0, -24.0, 0.9),
            Landmark::new(Joint::RightAnkle, 0.0, 180.0, 4.0, 0.9),
        ]);
        ScaledFrame::new(set, Some(ScaleEstimate { pixels_per_cm: 1.0, confidence: 1.0 }), t)
    }

    fn alert(issue: SafetyIssue, t: f64) -> SafetyAlert {
        let rule = issue.rule();
        SafetyAlert {
            severity: SafetySeverity::Warning,
            issue,
            body_part: rule.body_part,
            value: rule.warning,
            message: rule.message.to_string(),
            immediate_action: rule.immediate_action.to_string(),
            phase: ExercisePhase::Bottom,
            timestamp_s: t,
        }
    }

    #[test]
    fn rules_are_indexed_by_issue() {
        for (i, rule) in SAFETY_RULES.iter().enumerate() {
            assert_eq!(rule.issue as usize, i);
            assert!(rule.caution < rule.warning && rule.warning < rule.danger);
        }
    }

    #[test]
    fn highest_threshold_wins() {
        let r = SafetyIssue::ForwardLean.rule();
        assert_eq!(r.classify(30.0), None);
        assert_eq!(r.classify(45.0), Some(SafetySeverity::Caution));
        assert_eq!(r.classify(61.0), Some(SafetySeverity::Warning));
        assert_eq!(r.classify(90.0), Some(SafetySeverity::Danger));
        let shift = SafetyIssue::HipLateralShift.rule();
        assert_eq!(shift.classify(-9.0), Some(SafetySeverity::Warning));
    }

    #[test]
    fn no_exercise_means_no_alerts() {
        let mut m = SafetyMonitor::new(2.0, 0.5);
        let frame = ScaledFrame::new(Default::default(), None, 0.0);
        assert!(m.check(&frame, None, ExercisePhase::Unknown).is_empty());
        assert_eq!(m.summary(), SafetySummary::default());
    }

    #[test]
    fn history_is_capped_but_totals_are_not() {
        let mut m = SafetyMonitor::new(0.0, 0.5);
        for i in 0..80 {
            let alerts = m.check(&unsafe_squat(i as f64 / 30.0), Some(ExerciseType::Squat), ExercisePhase::Bottom);
            let issues: Vec<SafetyIssue> = alerts.iter().map(|a| a.issue).collect();
            assert_eq!(issues.len(), 3, "frame {i}: {issues:?}");
        }
        assert_eq!(m.history().count(), ALERT_HISTORY_LEN);

        let summary = m.summary();
        assert_eq!(summary.total_raised, 240);
        assert_eq!(summary.suppressed, 0);
        let retained: usize = summary.by_severity.values().sum();
        assert_eq!(retained, ALERT_HISTORY_LEN);
        // eldste varsler er skjøvet ut
        assert!(m.history().all(|a| a.timestamp_s > 40.0 / 30.0));
    }

    #[test]
    fn top_issues_keep_the_three_most_frequent() {
        let mut m = SafetyMonitor::new(2.0, 0.5);
        let counts = [
            (SafetyIssue::SpineFlexion, 1),
            (SafetyIssue::KneeValgus, 4),
            (SafetyIssue::ForwardLean, 3),
            (SafetyIssue::HipLateralShift, 2),
        ];
        for (issue, n) in counts {
            for i in 0..n {
                m.history.push(alert(issue, i as f64));
            }
        }
        let top = m.summary().top_issues;
        assert_eq!(
            top,
            vec![
                (SafetyIssue::KneeValgus, 4),
                (SafetyIssue::ForwardLean, 3),
                (SafetyIssue::HipLateralShift, 2)
            ]
        );
    }
}
