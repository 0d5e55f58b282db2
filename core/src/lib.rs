//! Pose-analysis core: turns per-frame body landmarks into calibrated,
//! phase-aware form scores and safety alerts.

pub mod calibration;
pub mod config;
pub mod error;
pub mod exercise;
pub mod filter;
pub mod form;
pub mod geometry;
pub mod kalman;
pub mod landmarks;
pub mod measures;
pub mod phase;
pub mod ring;
pub mod safety;
pub mod session;
pub mod smoothing;
pub mod stats;
pub mod symmetry;
pub mod telemetry;
pub mod types;

pub use calibration::{ScaleCalibrator, ScaleEstimate};
pub use config::{load_session_config, FilterConfig, ScaleConfig, SessionConfig};
pub use error::ConfigError;
pub use exercise::ExerciseType;
pub use filter::LandmarkFilter;
pub use form::{FormCriterion, FormEvaluation, FormEvaluator, FormFeedback, Severity};
pub use landmarks::{CoordinateSpace, FrameLandmarkSet, Joint, Landmark, ScaledFrame};
pub use phase::{ExercisePhase, PhaseDetector, PhaseThresholds};
pub use safety::{SafetyAlert, SafetyMonitor, SafetySeverity};
pub use session::AnalysisSession;
pub use symmetry::SymmetryEnforcer;
pub use types::{FrameAnalysis, FrameInput, SessionSummary};
