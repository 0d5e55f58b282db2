use thiserror::Error;

/// Construction-time failures. Per-frame processing never errors; missing
/// data shows up as `None` on the affected values instead.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("height {height_cm} cm is outside the supported range {min}-{max} cm")]
    HeightOutOfRange { height_cm: f64, min: f64, max: f64 },

    #[error("unsupported exercise type: {0:?}")]
    UnsupportedExercise(String),

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("parse error at {path}: {message}")]
    Parse { path: String, message: String },

    #[error("metrics registry: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl ConfigError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidParameter { name, reason: reason.into() }
    }
}
