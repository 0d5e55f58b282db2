// core/src/telemetry.rs
//! Prometheus counters for one analysis session. Each session owns its own
//! registry; nothing is registered globally.

use std::fmt;

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

use crate::form::FormFeedback;
use crate::safety::SafetyAlert;

const FRAME_BUCKETS: &[f64] = &[0.0001, 0.0005, 0.001, 0.002, 0.005, 0.01, 0.02, 0.033, 0.05, 0.1];

#[derive(Clone)]
pub struct SessionMetrics {
    registry: Registry,
    frames: IntCounter,
    frames_unscaled: IntCounter,
    safety_alerts: IntCounterVec,
    feedback: IntCounterVec,
    frame_seconds: Histogram,
}

impl SessionMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let frames = IntCounter::with_opts(Opts::new("formcheck_frames_total", "Frames processed"))?;
        let frames_unscaled = IntCounter::with_opts(Opts::new(
            "formcheck_frames_unscaled_total",
            "Frames without a usable px/cm scale",
        ))?;
        let safety_alerts = IntCounterVec::new(
            Opts::new("formcheck_safety_alerts_total", "Safety alerts raised by severity"),
            &["severity"],
        )?;
        let feedback = IntCounterVec::new(
            Opts::new("formcheck_feedback_total", "Form feedback items by severity"),
            &["severity"],
        )?;
        let frame_seconds = Histogram::with_opts(
            HistogramOpts::new("formcheck_frame_seconds", "Wall time spent per frame")
                .buckets(FRAME_BUCKETS.to_vec()),
        )?;

        registry.register(Box::new(frames.clone()))?;
        registry.register(Box::new(frames_unscaled.clone()))?;
        registry.register(Box::new(safety_alerts.clone()))?;
        registry.register(Box::new(feedback.clone()))?;
        registry.register(Box::new(frame_seconds.clone()))?;

        Ok(Self { registry, frames, frames_unscaled, safety_alerts, feedback, frame_seconds })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn observe_frame(&self, scaled: bool, seconds: f64) {
        self.frames.inc();
        if !scaled {
            self.frames_unscaled.inc();
        }
        self.frame_seconds.observe(seconds);
    }

    pub fn record_alerts(&self, alerts: &[SafetyAlert]) {
        for a in alerts {
            self.safety_alerts.with_label_values(&[a.severity.as_str()]).inc();
        }
    }

    pub fn record_feedback(&self, feedback: &[FormFeedback]) {
        for f in feedback {
            self.feedback.with_label_values(&[f.severity.as_str()]).inc();
        }
    }

    pub fn frames_total(&self) -> u64 {
        self.frames.get()
    }

    /// Text exposition format of everything in the session registry.
    pub fn render(&self) -> prometheus::Result<String> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}

impl fmt::Debug for SessionMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionMetrics")
            .field("frames", &self.frames.get())
            .field("frames_unscaled", &self.frames_unscaled.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sessions_do_not_share_counters() {
        let a = SessionMetrics::new().unwrap();
        let b = SessionMetrics::new().unwrap();
        a.observe_frame(false, 0.001);
        assert_eq!(a.frames_total(), 1);
        assert_eq!(b.frames_total(), 0);
        let text = a.render().unwrap();
        assert!(text.contains("formcheck_frames_unscaled_total 1"));
    }
}
