use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calibration::ScaleEstimate;
use crate::exercise::ExerciseType;
use crate::form::{FormFeedback, Severity};
use crate::landmarks::FrameLandmarkSet;
use crate::phase::ExercisePhase;
use crate::safety::{SafetyAlert, SafetySummary};
use crate::stats::RunningStats;

/// One frame from the pose estimator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameInput {
    pub landmarks: FrameLandmarkSet,
    pub frame_w: f64, // piksler
    pub frame_h: f64,
    pub timestamp_s: f64, // sekunder fra start
}

impl FrameInput {
    pub fn new(landmarks: FrameLandmarkSet, frame_w: f64, frame_h: f64, timestamp_s: f64) -> Self {
        Self { landmarks, frame_w, frame_h, timestamp_s }
    }
}

/// Per-frame result handed to the consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameAnalysis {
    pub timestamp_s: f64,
    /// Centimetres when `scaled`, pixels otherwise.
    pub landmarks: FrameLandmarkSet,
    pub scaled: bool,
    pub scale: Option<ScaleEstimate>,
    /// 0 when the frame is unscaled.
    pub scale_confidence: f64,
    pub phase: ExercisePhase,
    pub phase_label: String,
    pub score: f64, // 0..100
    pub feedback: Vec<FormFeedback>,
    pub alerts: Vec<SafetyAlert>,
    /// Repetitions completed so far, including one finished on this frame.
    pub reps: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreStats {
    pub count: u64,
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub std_dev: Option<f64>,
}

impl From<&RunningStats> for ScoreStats {
    fn from(s: &RunningStats) -> Self {
        Self { count: s.count(), mean: s.mean(), min: s.min(), max: s.max(), std_dev: s.std_dev() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub exercise: Option<ExerciseType>,
    pub height_cm: f64,
    pub started_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub frames_processed: u64,
    pub frames_unscaled: u64,
    pub score: ScoreStats,
    /// Median over the last ~3 s of frames.
    pub recent_median_score: Option<f64>,
    pub mean_score_by_phase: BTreeMap<ExercisePhase, f64>,
    pub phase_distribution: BTreeMap<ExercisePhase, u64>,
    pub reps: u32,
    pub feedback_by_severity: BTreeMap<Severity, u64>,
    pub safety: SafetySummary,
    pub mean_scale_confidence: Option<f64>,
    /// Low mean scale confidence or mostly unscaled frames.
    pub degraded: bool,
}
