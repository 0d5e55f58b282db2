// core/src/session.rs
//! Per-frame orchestration and session aggregation.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::Utc;
use log::{debug, info, warn};

use crate::calibration::ScaleCalibrator;
use crate::config::SessionConfig;
use crate::error::ConfigError;
use crate::filter::LandmarkFilter;
use crate::form::{FormEvaluator, Severity};
use crate::landmarks::ScaledFrame;
use crate::phase::{ExercisePhase, PhaseDetector, PhaseSample, PhaseWindow, RepCounter, PHASE_WINDOW_LEN};
use crate::ring::RingBuffer;
use crate::safety::SafetyMonitor;
use crate::stats::{median, RoundTo, RunningStats};
use crate::symmetry::SymmetryEnforcer;
use crate::telemetry::SessionMetrics;
use crate::types::{FrameAnalysis, FrameInput, ScoreStats, SessionSummary};

/// Unscaled frames in a row between two warnings.
const UNSCALED_WARN_EVERY: u32 = 30;
/// Below this mean scale confidence the session is reported as degraded.
const DEGRADED_CONFIDENCE: f64 = 0.4;

#[derive(Debug, Clone)]
struct Aggregates {
    frames: u64,
    unscaled: u64,
    scores: RunningStats,
    recent_scores: RingBuffer<f64>,
    by_phase: BTreeMap<ExercisePhase, RunningStats>,
    phase_counts: BTreeMap<ExercisePhase, u64>,
    feedback: BTreeMap<Severity, u64>,
    scale_confidence: RunningStats,
}

impl Aggregates {
    fn new() -> Self {
        Self {
            frames: 0,
            unscaled: 0,
            scores: RunningStats::new(),
            recent_scores: RingBuffer::new(PHASE_WINDOW_LEN),
            by_phase: BTreeMap::new(),
            phase_counts: BTreeMap::new(),
            feedback: BTreeMap::new(),
            scale_confidence: RunningStats::new(),
        }
    }

    fn push_score(&mut self, score: f64) {
        self.scores.push(score);
        self.recent_scores.push(score);
    }

    fn recent_median(&self) -> Option<f64> {
        (!self.recent_scores.is_empty()).then(|| median(&self.recent_scores.to_vec()))
    }
}

/// Owns every piece of per-session state. Frames are processed strictly in
/// call order; independent sessions share nothing mutable.
#[derive(Debug)]
pub struct AnalysisSession {
    config: SessionConfig,
    filter: LandmarkFilter,
    symmetry: SymmetryEnforcer,
    calibrator: ScaleCalibrator,
    detector: PhaseDetector,
    window: PhaseWindow,
    reps: RepCounter,
    form: FormEvaluator,
    safety: SafetyMonitor,
    metrics: SessionMetrics,
    agg: Aggregates,
    unscaled_streak: u32,
    started_at: chrono::DateTime<Utc>,
}

impl AnalysisSession {
    /// Validates `config` and builds a fresh session.
    pub fn new(config: SessionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let min_vis = config.filter.visibility_threshold;
        let session = Self {
            filter: LandmarkFilter::new(config.filter.clone(), config.fps),
            symmetry: SymmetryEnforcer::new(config.symmetry_weight),
            calibrator: ScaleCalibrator::new(config.height_cm, config.scale.clone(), min_vis),
            detector: PhaseDetector::new(config.phase_thresholds, min_vis),
            window: PhaseWindow::default(),
            reps: RepCounter::default(),
            form: FormEvaluator::new(min_vis),
            safety: SafetyMonitor::new(config.cooldown_secs, min_vis),
            metrics: SessionMetrics::new()?,
            agg: Aggregates::new(),
            unscaled_streak: 0,
            started_at: Utc::now(),
            config,
        };
        info!(
            "analysis session started: exercise={} height={}cm fps={}",
            session.exercise_name(),
            session.config.height_cm,
            session.config.fps
        );
        Ok(session)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn metrics(&self) -> &SessionMetrics {
        &self.metrics
    }

    fn exercise_name(&self) -> &'static str {
        self.config.exercise.map_or("none", |e| e.as_str())
    }

    /// Runs one frame through filter → scale → phase/form/safety and folds
    /// the result into the session aggregates. Never fails; missing data
    /// shows up as an unscaled frame, unknown phase or neutral score.
    pub fn process_frame(&mut self, input: &FrameInput) -> FrameAnalysis {
        let started = Instant::now();
        let exercise = self.config.exercise;

        let pixels = self.config.coordinate_space.to_pixels(&input.landmarks, input.frame_w, input.frame_h);
        let filtered = self.filter.filter(&pixels);
        let corrected = self.symmetry.enforce(&filtered);

        let scale = self.calibrator.estimate(&corrected, input.frame_w, input.frame_h);
        let frame = ScaledFrame::from_pixels(&corrected, scale, input.timestamp_s);
        self.track_unscaled(&frame);

        let reading = self.detector.classify(exercise, &frame, &self.window);
        self.window.push(PhaseSample { phase: reading.phase, gap_cm: reading.gap_cm, timestamp_s: input.timestamp_s });
        if self.reps.update(reading.phase) {
            debug!("rep {} completed at t={:.2}s", self.reps.count(), input.timestamp_s);
        }

        let evaluation = self.form.evaluate(exercise, &frame, reading.phase);
        let alerts = self.safety.check(&frame, exercise, reading.phase);
        let scale_confidence = frame.scale.map_or(0.0, |s| s.confidence);

        self.agg.frames += 1;
        if !frame.is_scaled() {
            self.agg.unscaled += 1;
        }
        self.agg.push_score(evaluation.score);
        self.agg.by_phase.entry(reading.phase).or_default().push(evaluation.score);
        *self.agg.phase_counts.entry(reading.phase).or_insert(0) += 1;
        for f in &evaluation.feedback {
            *self.agg.feedback.entry(f.severity).or_insert(0) += 1;
        }
        self.agg.scale_confidence.push(scale_confidence);

        let elapsed = started.elapsed().as_secs_f64();
        self.metrics.observe_frame(frame.is_scaled(), elapsed);
        self.metrics.record_feedback(&evaluation.feedback);
        self.metrics.record_alerts(&alerts);

        debug!(
            "t={:.3}s phase={} score={:.1} feedback={} alerts={} scale={:?} ({:.3} ms)",
            input.timestamp_s,
            reading.phase.label(exercise),
            evaluation.score,
            evaluation.feedback.len(),
            alerts.len(),
            frame.scale.map(|s| s.pixels_per_cm.round_to(3)),
            elapsed * 1000.0
        );

        FrameAnalysis {
            timestamp_s: input.timestamp_s,
            scaled: frame.is_scaled(),
            scale: frame.scale,
            scale_confidence,
            landmarks: frame.landmarks,
            phase: reading.phase,
            phase_label: reading.phase.label(exercise).to_string(),
            score: evaluation.score,
            feedback: evaluation.feedback,
            alerts,
            reps: self.reps.count(),
        }
    }

    fn track_unscaled(&mut self, frame: &ScaledFrame) {
        if frame.is_scaled() {
            self.unscaled_streak = 0;
            return;
        }
        self.unscaled_streak += 1;
        if self.unscaled_streak % UNSCALED_WARN_EVERY == 0 {
            warn!(
                "calibration unavailable for {} consecutive frames (t={:.2}s)",
                self.unscaled_streak, frame.timestamp_s
            );
        }
    }

    /// Aggregate view of the session so far.
    pub fn summary(&self) -> SessionSummary {
        let mean_conf = self.agg.scale_confidence.mean();
        let unscaled_share = if self.agg.frames > 0 {
            self.agg.unscaled as f64 / self.agg.frames as f64
        } else {
            0.0
        };
        let degraded = self.agg.frames > 0
            && (mean_conf.map_or(true, |c| c < DEGRADED_CONFIDENCE) || unscaled_share > 0.5);

        SessionSummary {
            exercise: self.config.exercise,
            height_cm: self.config.height_cm,
            started_at: self.started_at,
            closed_at: None,
            frames_processed: self.agg.frames,
            frames_unscaled: self.agg.unscaled,
            score: ScoreStats::from(&self.agg.scores),
            recent_median_score: self.agg.recent_median(),
            mean_score_by_phase: self
                .agg
                .by_phase
                .iter()
                .filter_map(|(p, s)| s.mean().map(|m| (*p, m.round_to(2))))
                .collect(),
            phase_distribution: self.agg.phase_counts.clone(),
            reps: self.reps.count(),
            feedback_by_severity: self.agg.feedback.clone(),
            safety: self.safety.summary(),
            mean_scale_confidence: mean_conf,
            degraded,
        }
    }

    /// Clears all per-session state; configuration is kept.
    pub fn reset(&mut self) {
        self.filter.reset();
        self.calibrator.reset();
        self.window.clear();
        self.reps.reset();
        self.safety.reset();
        self.agg = Aggregates::new();
        self.unscaled_streak = 0;
        self.started_at = Utc::now();
        info!("analysis session reset: exercise={}", self.exercise_name());
    }

    /// Ends the session and returns its final summary.
    pub fn close(self) -> SessionSummary {
        let mut summary = self.summary();
        summary.closed_at = Some(Utc::now());
        info!(
            "analysis session closed: frames={} reps={} mean_score={:?} degraded={}",
            summary.frames_processed,
            summary.reps,
            summary.score.mean.map(|m| m.round_to(1)),
            summary.degraded
        );
        summary
    }
}
