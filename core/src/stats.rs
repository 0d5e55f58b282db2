// core/src/stats.rs
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

// --- RoundTo trait (brukt i sammendrag) ---
pub trait RoundTo {
    fn round_to(self, dp: u32) -> f64;
}

impl RoundTo for f64 {
    #[inline]
    fn round_to(self, dp: u32) -> f64 {
        if dp == 0 { return self.round(); }
        let factor = 10_f64.powi(dp as i32);
        (self * factor).round() / factor
    }
}

pub fn mean(xs: &[f64]) -> Option<f64> {
    if xs.is_empty() { return None; }
    Some(xs.iter().sum::<f64>() / xs.len() as f64)
}

/// Population standard deviation.
pub fn std_dev(xs: &[f64]) -> Option<f64> {
    let m = mean(xs)?;
    let var = xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / xs.len() as f64;
    Some(var.sqrt())
}

/// Robust median; 0.0 for an empty slice.
pub fn median(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    let mut v: Vec<OrderedFloat<f64>> = xs.iter().copied().map(OrderedFloat).collect();
    v.sort();
    let n = v.len();
    if n % 2 == 1 {
        v[n / 2].0
    } else {
        (v[n / 2 - 1].0 + v[n / 2].0) / 2.0
    }
}

/// z-scores against the population mean/std. A zero spread yields all zeros.
pub fn z_scores(xs: &[f64]) -> Vec<f64> {
    let (Some(m), Some(sd)) = (mean(xs), std_dev(xs)) else {
        return Vec::new();
    };
    if sd <= f64::EPSILON {
        return vec![0.0; xs.len()];
    }
    xs.iter().map(|x| (x - m) / sd).collect()
}

/// Coefficient of variation (std / |mean|). `None` for an empty slice or a
/// zero mean.
pub fn coefficient_of_variation(xs: &[f64]) -> Option<f64> {
    let m = mean(xs)?;
    if m.abs() <= f64::EPSILON {
        return None;
    }
    Some(std_dev(xs)? / m.abs())
}

/// Running mean/variance/min/max (Welford). Constant memory regardless of
/// session length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, x: f64) {
        if !x.is_finite() {
            return;
        }
        self.count += 1;
        if self.count == 1 {
            self.min = x;
            self.max = x;
        } else {
            self.min = self.min.min(x);
            self.max = self.max.max(x);
        }
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }

    pub fn min(&self) -> Option<f64> {
        (self.count > 0).then_some(self.min)
    }

    pub fn max(&self) -> Option<f64> {
        (self.count > 0).then_some(self.max)
    }

    /// Population standard deviation.
    pub fn std_dev(&self) -> Option<f64> {
        (self.count > 0).then(|| (self.m2 / self.count as f64).sqrt())
    }
}
