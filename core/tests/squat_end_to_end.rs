// core/tests/squat_end_to_end.rs
mod common;

use common::{load_knee_angles, SideView, FPS, FRAME_H, FRAME_W};
use formcheck_core::form::FormEvaluator;
use formcheck_core::landmarks::ScaledFrame;
use formcheck_core::phase::ExercisePhase;
use formcheck_core::safety::SafetySeverity;
use formcheck_core::{AnalysisSession, ExerciseType, FrameInput, ScaleEstimate, SessionConfig};

fn dedup(phases: &[ExercisePhase]) -> Vec<ExercisePhase> {
    let mut out: Vec<ExercisePhase> = Vec::new();
    for p in phases {
        if out.last() != Some(p) {
            out.push(*p);
        }
    }
    out
}

#[test]
fn ninety_frame_squat() {
    let rows = load_knee_angles("squat_knee_angles.csv");
    assert_eq!(rows.len(), 90);

    let view = SideView::default();
    let mut session = AnalysisSession::new(SessionConfig::new(view.height_cm, Some(ExerciseType::Squat))).unwrap();

    let mut phases = Vec::new();
    let mut labels = Vec::new();
    let mut pipeline_min = f64::INFINITY;
    let mut isolated_min = f64::INFINITY;
    let evaluator = FormEvaluator::default();
    let exact = Some(ScaleEstimate { pixels_per_cm: view.px_per_cm, confidence: 1.0 });

    for row in &rows {
        let input = FrameInput::new(view.squat_normalized(row.knee_angle_deg), FRAME_W, FRAME_H, row.t_s);
        let out = session.process_frame(&input);

        assert!(out.scaled, "frame {} unscaled", row.frame);
        assert!(
            out.alerts.iter().all(|a| a.severity != SafetySeverity::Danger),
            "danger alert at frame {}: {:?}",
            row.frame,
            out.alerts
        );

        // samme geometri, uten filter og med eksakt skala
        let isolated = ScaledFrame::from_pixels(&view.squat_px(row.knee_angle_deg), exact, row.t_s);
        let iso = evaluator.evaluate(Some(ExerciseType::Squat), &isolated, out.phase);

        pipeline_min = pipeline_min.min(out.score);
        isolated_min = isolated_min.min(iso.score);
        phases.push(out.phase);
        labels.push(out.phase_label);
    }

    let seq: Vec<ExercisePhase> =
        dedup(&phases).into_iter().filter(|p| *p != ExercisePhase::Unknown).collect();
    assert_eq!(
        seq,
        vec![
            ExercisePhase::Top,
            ExercisePhase::Descending,
            ExercisePhase::Bottom,
            ExercisePhase::Ascending,
            ExercisePhase::Top
        ]
    );
    assert_eq!(labels.first().map(String::as_str), Some("standing"));
    assert!(labels.iter().any(|l| l == "bottom"));

    assert!(
        pipeline_min >= isolated_min,
        "pipeline min {pipeline_min:.2} < isolated min {isolated_min:.2}"
    );

    let summary = session.close();
    assert_eq!(summary.frames_processed, 90);
    assert_eq!(summary.frames_unscaled, 0);
    assert_eq!(summary.reps, 1);
    assert!(!summary.degraded);
    assert!(summary.closed_at.is_some());
    assert_eq!(summary.safety.by_severity.get(&SafetySeverity::Danger), None);
    let counted: u64 = summary.phase_distribution.values().sum();
    assert_eq!(counted, 90);
    assert!(summary.mean_score_by_phase.contains_key(&ExercisePhase::Bottom));
}

#[test]
fn frames_per_second_matches_fixture() {
    let rows = load_knee_angles("squat_knee_angles.csv");
    for pair in rows.windows(2) {
        assert!((pair[1].t_s - pair[0].t_s - 1.0 / FPS).abs() < 1e-3);
    }
}
