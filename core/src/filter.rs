//! Per-joint temporal filtering: visibility gate, outlier replacement,
//! constant-velocity Kalman filter and Savitzky-Golay smoothing over a short
//! ring buffer.

use log::trace;
use nalgebra::Vector3;

use crate::config::FilterConfig;
use crate::kalman::JointKalman;
use crate::landmarks::{FrameLandmarkSet, Joint, Landmark, JOINT_COUNT};
use crate::ring::RingBuffer;
use crate::smoothing::smooth_latest;

/// Outlier statistics need at least this many buffered samples.
const MIN_OUTLIER_SAMPLES: usize = 3;

#[derive(Debug, Clone)]
struct JointTrack {
    kalman: JointKalman,
    buffer: RingBuffer<Vector3<f64>>,
    last_seen: u64,
}

#[derive(Debug, Clone)]
pub struct LandmarkFilter {
    config: FilterConfig,
    dt: f64,
    tracks: [Option<JointTrack>; JOINT_COUNT],
    frame_index: u64,
}

impl LandmarkFilter {
    pub fn new(config: FilterConfig, fps: f64) -> Self {
        let dt = if fps > 0.0 { 1.0 / fps } else { 1.0 / 30.0 };
        Self { config, dt, tracks: std::array::from_fn(|_| None), frame_index: 0 }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Filters one frame. Joints at or below the visibility threshold are
    /// dropped from the output; joints seen for the first time pass through
    /// as-is.
    pub fn filter(&mut self, raw: &FrameLandmarkSet) -> FrameLandmarkSet {
        self.frame_index += 1;
        let mut out = FrameLandmarkSet::new();

        for lm in raw.iter() {
            if !lm.is_finite() || !lm.is_visible(self.config.visibility_threshold) {
                continue;
            }
            out.insert(self.filter_joint(lm));
        }
        out
    }

    fn filter_joint(&mut self, lm: &Landmark) -> Landmark {
        let idx = lm.joint.index();
        let frame_index = self.frame_index;
        let measured = lm.position();

        // for lang pause: start sporet på nytt
        let stale = self.tracks[idx]
            .as_ref()
            .map_or(false, |t| frame_index.saturating_sub(t.last_seen) > self.config.max_gap_frames as u64);
        if stale {
            self.tracks[idx] = None;
        }

        if self.tracks[idx].is_none() {
            let mut kalman = JointKalman::new(
                self.config.process_variance,
                self.config.measurement_variance,
                self.dt,
            );
            kalman.initialize(measured);
            let mut buffer = RingBuffer::new(self.config.buffer_len);
            buffer.push(measured);
            self.tracks[idx] = Some(JointTrack { kalman, buffer, last_seen: frame_index });
            return *lm;
        }
        let Some(track) = self.tracks[idx].as_mut() else {
            return *lm;
        };
        track.last_seen = frame_index;

        let measurement = match outlier_replacement(&track.buffer, measured, &self.config) {
            Some(replaced) => {
                trace!("{}: outlier {:?} replaced by {:?}", lm.joint.name(), measured, replaced);
                replaced
            }
            None => measured,
        };

        let filtered = track.kalman.step(measurement);
        track.buffer.push(filtered);

        let emitted = if track.buffer.len() >= self.config.min_smoothing_samples {
            let history = track.buffer.to_vec();
            smooth_latest(
                &history,
                self.config.smoothing_window,
                self.config.poly_order,
                self.config.gaussian_sigma,
            )
            .unwrap_or(filtered)
        } else {
            filtered
        };

        lm.with_position(emitted)
    }

    /// Number of joints with live filter state.
    pub fn tracked_joints(&self) -> usize {
        self.tracks.iter().filter(|t| t.is_some()).count()
    }

    pub fn is_tracking(&self, joint: Joint) -> bool {
        self.tracks[joint.index()].is_some()
    }

    /// Drops every track and buffer.
    pub fn reset(&mut self) {
        for t in self.tracks.iter_mut() {
            *t = None;
        }
        self.frame_index = 0;
    }
}

/// z-scores `measured` against the last `outlier_window` buffered samples.
/// Beyond `outlier_sigma` on any axis, returns a blend of the raw value and
/// a linear extrapolation from the last two samples.
fn outlier_replacement(
    buffer: &RingBuffer<Vector3<f64>>,
    measured: Vector3<f64>,
    cfg: &FilterConfig,
) -> Option<Vector3<f64>> {
    if buffer.len() < MIN_OUTLIER_SAMPLES {
        return None;
    }
    let recent: Vec<Vector3<f64>> = buffer.recent(cfg.outlier_window).copied().collect();
    let n = recent.len() as f64;
    let mean = recent.iter().fold(Vector3::<f64>::zeros(), |acc, p| acc + p) / n;
    let var = recent
        .iter()
        .fold(Vector3::<f64>::zeros(), |acc, p| acc + (p - mean).component_mul(&(p - mean)))
        / n;

    let is_outlier = (0..3).any(|axis| {
        let sd = var[axis].sqrt().max(cfg.outlier_min_std);
        ((measured[axis] - mean[axis]) / sd).abs() > cfg.outlier_sigma
    });
    if !is_outlier {
        return None;
    }

    let last = *buffer.back(0)?;
    let prev = *buffer.back(1)?;
    let predicted = last + (last - prev);
    let w = cfg.outlier_raw_weight.clamp(0.0, 1.0);
    Some(measured * w + predicted * (1.0 - w))
}
