// core/src/config.rs
use std::path::Path;

use anyhow::Context;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_path_to_error as spte;

use crate::error::ConfigError;
use crate::exercise::ExerciseType;
use crate::landmarks::CoordinateSpace;
use crate::phase::PhaseThresholds;

pub const MIN_HEIGHT_CM: f64 = 100.0;
pub const MAX_HEIGHT_CM: f64 = 250.0;

/// Tuning for [`crate::filter::LandmarkFilter`]. Distances are in pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub visibility_threshold: f64,
    /// White-noise acceleration variance (px²/s⁴).
    pub process_variance: f64,
    /// Measurement variance (px²).
    pub measurement_variance: f64,
    pub buffer_len: usize,
    pub min_smoothing_samples: usize,
    pub smoothing_window: usize,
    pub poly_order: usize,
    pub gaussian_sigma: f64,
    pub outlier_window: usize,
    pub outlier_sigma: f64,
    /// Floor for the outlier standard deviation (px).
    pub outlier_min_std: f64,
    /// Share of the raw value kept when an outlier is replaced.
    pub outlier_raw_weight: f64,
    /// Frames a joint may be missing before its track restarts.
    pub max_gap_frames: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            visibility_threshold: 0.5,
            process_variance: 1000.0,
            measurement_variance: 0.01,
            buffer_len: 15,
            min_smoothing_samples: 5,
            smoothing_window: 7,
            poly_order: 2,
            gaussian_sigma: 1.5,
            outlier_window: 10,
            outlier_sigma: 3.0,
            outlier_min_std: 1.0,
            outlier_raw_weight: 0.3,
            max_gap_frames: 15,
        }
    }
}

/// Tuning for [`crate::calibration::ScaleCalibrator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleConfig {
    pub history_len: usize,
    pub min_history: usize,
    pub ewma_alpha: f64,
    pub outlier_sigma: f64,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self { history_len: 30, min_history: 5, ewma_alpha: 0.3, outlier_sigma: 2.0 }
    }
}

fn default_fps() -> f64 { 30.0 }
fn default_symmetry_weight() -> f64 { 0.3 }
fn default_cooldown_secs() -> f64 { 2.0 }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Brukerens høyde (cm). Påkrevd.
    pub height_cm: f64,
    /// `None` = ingen øvelse valgt; fase/score faller tilbake til nøytral.
    #[serde(default)]
    pub exercise: Option<ExerciseType>,
    #[serde(default)]
    pub coordinate_space: CoordinateSpace,
    #[serde(default = "default_fps")]
    pub fps: f64,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default = "default_symmetry_weight")]
    pub symmetry_weight: f64,
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: f64,
    #[serde(default)]
    pub scale: ScaleConfig,
    /// Overstyrer øvelsens standard fase-terskler (cm).
    #[serde(default)]
    pub phase_thresholds: Option<PhaseThresholds>,
}

impl SessionConfig {
    pub fn new(height_cm: f64, exercise: Option<ExerciseType>) -> Self {
        Self {
            height_cm,
            exercise,
            coordinate_space: CoordinateSpace::default(),
            fps: default_fps(),
            filter: FilterConfig::default(),
            symmetry_weight: default_symmetry_weight(),
            cooldown_secs: default_cooldown_secs(),
            scale: ScaleConfig::default(),
            phase_thresholds: None,
        }
    }

    /// Like [`SessionConfig::new`] but resolves the exercise from its name.
    pub fn for_exercise_name(height_cm: f64, exercise: &str) -> Result<Self, ConfigError> {
        let exercise: ExerciseType = exercise.parse()?;
        let cfg = Self::new(height_cm, Some(exercise));
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parses JSON, reporting the failing field path.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let de = &mut serde_json::Deserializer::from_str(json);
        let cfg: SessionConfig = spte::deserialize(de).map_err(|e| ConfigError::Parse {
            path: e.path().to_string(),
            message: e.inner().to_string(),
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let res = self.check();
        if let Err(e) = &res {
            warn!("session config rejected: {e}");
        }
        res
    }

    fn check(&self) -> Result<(), ConfigError> {
        if !self.height_cm.is_finite() || !(MIN_HEIGHT_CM..=MAX_HEIGHT_CM).contains(&self.height_cm) {
            return Err(ConfigError::HeightOutOfRange {
                height_cm: self.height_cm,
                min: MIN_HEIGHT_CM,
                max: MAX_HEIGHT_CM,
            });
        }
        if !(self.fps.is_finite() && self.fps > 0.0) {
            return Err(ConfigError::invalid("fps", format!("must be > 0, got {}", self.fps)));
        }
        if !(0.0..=1.0).contains(&self.symmetry_weight) {
            return Err(ConfigError::invalid(
                "symmetry_weight",
                format!("must be within 0..=1, got {}", self.symmetry_weight),
            ));
        }
        if !(self.cooldown_secs.is_finite() && self.cooldown_secs >= 0.0) {
            return Err(ConfigError::invalid("cooldown_secs", "must be a non-negative number"));
        }

        let f = &self.filter;
        if !(0.0..=1.0).contains(&f.visibility_threshold) {
            return Err(ConfigError::invalid("filter.visibility_threshold", "must be within 0..=1"));
        }
        if !(f.process_variance > 0.0 && f.measurement_variance > 0.0) {
            return Err(ConfigError::invalid("filter", "process/measurement variance must be > 0"));
        }
        if f.buffer_len < f.min_smoothing_samples || f.min_smoothing_samples == 0 {
            return Err(ConfigError::invalid(
                "filter.buffer_len",
                format!("must hold at least min_smoothing_samples ({})", f.min_smoothing_samples),
            ));
        }
        if f.outlier_window < 2 || !(f.outlier_sigma > 0.0) {
            return Err(ConfigError::invalid("filter.outlier", "window must be ≥ 2 and sigma > 0"));
        }
        if !(0.0..=1.0).contains(&f.outlier_raw_weight) {
            return Err(ConfigError::invalid("filter.outlier_raw_weight", "must be within 0..=1"));
        }

        let s = &self.scale;
        if s.history_len == 0 || s.min_history == 0 {
            return Err(ConfigError::invalid("scale.history_len", "must be > 0"));
        }
        if !(s.ewma_alpha > 0.0 && s.ewma_alpha <= 1.0) {
            return Err(ConfigError::invalid("scale.ewma_alpha", "must be within (0, 1]"));
        }
        if !(s.outlier_sigma > 0.0) {
            return Err(ConfigError::invalid("scale.outlier_sigma", "must be > 0"));
        }

        if let Some(t) = &self.phase_thresholds {
            if !(t.top_cm > t.bottom_cm) {
                return Err(ConfigError::invalid(
                    "phase_thresholds",
                    format!("top_cm ({}) must exceed bottom_cm ({})", t.top_cm, t.bottom_cm),
                ));
            }
            if !(t.min_motion_cm >= 0.0) {
                return Err(ConfigError::invalid("phase_thresholds.min_motion_cm", "must be ≥ 0"));
            }
        }
        Ok(())
    }
}

/// Reads and validates a JSON session config from disk.
pub fn load_session_config<P: AsRef<Path>>(path: P) -> anyhow::Result<SessionConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading session config {}", path.display()))?;
    let cfg = SessionConfig::from_json_str(&contents)
        .with_context(|| format!("invalid session config {}", path.display()))?;
    Ok(cfg)
}
