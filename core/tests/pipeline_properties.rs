// core/tests/pipeline_properties.rs
mod common;

use common::{SideView, FPS, FRAME_H, FRAME_W};
use formcheck_core::calibration::{fuse_estimates, ReferenceEstimate, ScaleReference};
use formcheck_core::config::{FilterConfig, SessionConfig};
use formcheck_core::exercise::ExerciseType;
use formcheck_core::filter::LandmarkFilter;
use formcheck_core::form::{FormEvaluator, Severity, NEUTRAL_SCORE};
use formcheck_core::landmarks::{FrameLandmarkSet, Joint, Landmark, ScaledFrame};
use formcheck_core::phase::ExercisePhase;
use formcheck_core::safety::{SafetyIssue, SafetyMonitor, SafetySeverity};
use formcheck_core::symmetry::{self, SymmetryEnforcer};
use formcheck_core::types::FrameInput;
use formcheck_core::{AnalysisSession, ScaleEstimate};

fn bits(lm: &Landmark) -> [u64; 4] {
    [lm.x.to_bits(), lm.y.to_bits(), lm.z.to_bits(), lm.visibility.to_bits()]
}

#[test]
fn symmetry_weight_zero_is_identity() {
    let mut frame = SideView::default().squat_px(120.0);
    // skjev ramme med rare verdier
    frame.insert(Landmark::new(Joint::LeftShoulder, 0.1 + 0.2, -0.0, 1e-300, 0.51));
    frame.insert(Landmark::new(Joint::RightShoulder, 412.345_678_9, 17.0, -3.5, 0.99));

    for out in [symmetry::enforce(&frame, 0.0), SymmetryEnforcer::new(0.0).enforce(&frame)] {
        assert_eq!(out.len(), frame.len());
        for lm in frame.iter() {
            let got = out.get(lm.joint).expect("joint kept");
            assert_eq!(bits(got), bits(lm), "{:?} changed", lm.joint);
        }
    }
}

#[test]
fn kalman_converges_after_noisy_first_frame() {
    let truth = [0.52, 0.41, -0.08];
    for noise in [0.05, -0.07, 0.1] {
        let mut filter = LandmarkFilter::new(FilterConfig::default(), FPS);
        let mut last = None;
        for i in 0..30 {
            let n = if i == 0 { noise } else { 0.0 };
            let lm = Landmark::new(
                Joint::LeftWrist,
                (truth[0] + n) * FRAME_W,
                (truth[1] - n) * FRAME_H,
                (truth[2] + n) * FRAME_W,
                0.9,
            );
            last = filter.filter(&FrameLandmarkSet::from_landmarks([lm])).get(Joint::LeftWrist).copied();
        }
        let out = last.expect("wrist tracked");
        assert!((out.x - truth[0] * FRAME_W).abs() < 1e-3, "x off by {}", out.x - truth[0] * FRAME_W);
        assert!((out.y - truth[1] * FRAME_H).abs() < 1e-3, "y off by {}", out.y - truth[1] * FRAME_H);
        assert!((out.z - truth[2] * FRAME_W).abs() < 1e-3, "z off by {}", out.z - truth[2] * FRAME_W);
    }
}

fn run_standing(height_cm: f64, frames: usize) -> formcheck_core::FrameAnalysis {
    let mut session = AnalysisSession::new(SessionConfig::new(height_cm, Some(ExerciseType::Squat))).unwrap();
    let pose = SideView::default().standing_normalized();
    let mut last = None;
    for i in 0..frames {
        last = Some(session.process_frame(&FrameInput::new(pose.clone(), FRAME_W, FRAME_H, i as f64 / FPS)));
    }
    last.unwrap()
}

#[test]
fn scaled_landmarks_grow_with_configured_height() {
    let short = run_standing(170.0, 10);
    let tall = run_standing(204.0, 10);
    assert!(short.scaled && tall.scaled);
    let ratio = 204.0 / 170.0;

    for lm in short.landmarks.iter() {
        let other = tall.landmarks.get(lm.joint).expect("same joints");
        for (a, b) in [(lm.x, other.x), (lm.y, other.y), (lm.z, other.z)] {
            let expected = a * ratio;
            assert!(
                (b - expected).abs() <= 1e-9 * expected.abs().max(1.0),
                "{:?}: {b} != {expected}",
                lm.joint
            );
        }
    }
}

#[test]
fn outlier_reference_is_rejected() {
    let mut estimates: Vec<ReferenceEstimate> = (0..9)
        .map(|i| ReferenceEstimate {
            reference: ScaleReference::Torso,
            pixels_per_cm: 10.0 + (i as f64 - 4.0) * 0.05,
            weight: 1.0,
        })
        .collect();
    estimates.push(ReferenceEstimate { reference: ScaleReference::ShoulderWidth, pixels_per_cm: 1000.0, weight: 1.0 });

    let fused = fuse_estimates(&estimates, 2.0).unwrap();
    assert!((fused - 10.0).abs() / 10.0 < 0.05, "fused = {fused}");
}

#[test]
fn all_outliers_keeps_everything() {
    // to like store avvik: ingen z-score over 2
    let e = |p| ReferenceEstimate { reference: ScaleReference::Torso, pixels_per_cm: p, weight: 1.0 };
    let fused = fuse_estimates(&[e(5.0), e(15.0)], 2.0).unwrap();
    assert!((fused - 10.0).abs() < 1e-12);
}

#[test]
fn form_score_stays_within_bounds() {
    let evaluator = FormEvaluator::default();
    let view = SideView::default();
    let scale = Some(ScaleEstimate { pixels_per_cm: view.px_per_cm, confidence: 1.0 });

    for exercise in ExerciseType::ALL {
        for knee in [60.0, 90.0, 135.0, 180.0] {
            let frame = ScaledFrame::from_pixels(&view.squat_px(knee), scale, 0.0);
            for phase in ExercisePhase::ALL {
                let out = evaluator.evaluate(Some(exercise), &frame, phase);
                assert!((0.0..=100.0).contains(&out.score), "{exercise} {phase:?}: {}", out.score);
            }
        }
    }
}

#[test]
fn missing_joints_give_neutral_score_and_one_info() {
    let evaluator = FormEvaluator::default();
    let empty = ScaledFrame::new(FrameLandmarkSet::new(), None, 0.0);
    for exercise in ExerciseType::ALL {
        for phase in ExercisePhase::ALL {
            let out = evaluator.evaluate(Some(exercise), &empty, phase);
            assert_eq!(out.score, NEUTRAL_SCORE);
            assert_eq!(out.feedback.len(), 1);
            assert_eq!(out.feedback[0].severity, Severity::Info);
        }
    }
}

fn leaning_torso(lean_deg: f64, t: f64) -> ScaledFrame {
    let lean = lean_deg.to_radians();
    let torso = 45.0;
    let set = FrameLandmarkSet::from_landmarks([
        Landmark::new(Joint::LeftHip, 0.0, 100.0, -10.0, 0.9),
        Landmark::new(Joint::RightHip, 0.0, 100.0, 10.0, 0.9),
        Landmark::new(Joint::LeftShoulder, torso * lean.sin(), 100.0 - torso * lean.cos(), -12.0, 0.9),
        Landmark::new(Joint::RightShoulder, torso * lean.sin(), 100.0 - torso * lean.cos(), 12.0, 0.9),
    ]);
    ScaledFrame::new(set, Some(ScaleEstimate { pixels_per_cm: 1.0, confidence: 1.0 }), t)
}

#[test]
fn cooldown_suppresses_repeats_until_it_elapses() {
    let mut monitor = SafetyMonitor::new(2.0, 0.5);
    let squat = Some(ExerciseType::Squat);

    let first = monitor.check(&leaning_torso(65.0, 0.0), squat, ExercisePhase::Descending);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].issue, SafetyIssue::ForwardLean);
    assert_eq!(first[0].severity, SafetySeverity::Warning);

    let second = monitor.check(&leaning_torso(65.0, 1.0), squat, ExercisePhase::Descending);
    assert!(second.is_empty());

    // undertrykte varsler nullstiller ikke tidtakeren
    let third = monitor.check(&leaning_torso(65.0, 2.5), squat, ExercisePhase::Descending);
    assert_eq!(third.len(), 1);

    let summary = monitor.summary();
    assert_eq!(summary.total_raised, 2);
    assert_eq!(summary.suppressed, 1);
    assert_eq!(summary.top_issues, vec![(SafetyIssue::ForwardLean, 2)]);
}

#[test]
fn alerts_are_ordered_danger_first() {
    let mut monitor = SafetyMonitor::new(2.0, 0.5);
    let mut frame = leaning_torso(50.0, 0.0);
    // knær som faller kraftig innover
    for lm in [
        Landmark::new(Joint::LeftKnee, 2.0, 140.0, -4.0, 0.9),
        Landmark::new(Joint::RightKnee, 2.0, 140.0, 4.0, 0.9),
        Landmark::new(Joint::LeftAnkle, 0.0, 180.0, -14.0, 0.9),
        Landmark::new(Joint::RightAnkle, 0.0, 180.0, 14.0, 0.9),
    ] {
        frame.landmarks.insert(lm);
    }
    let alerts = monitor.check(&frame, Some(ExerciseType::Squat), ExercisePhase::Bottom);
    let severities: Vec<SafetySeverity> = alerts.iter().map(|a| a.severity).collect();
    assert_eq!(severities, vec![SafetySeverity::Danger, SafetySeverity::Caution]);
    assert_eq!(alerts[0].issue, SafetyIssue::KneeValgus);
}
