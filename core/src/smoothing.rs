// core/src/smoothing.rs
use nalgebra::{DMatrix, Vector3};

/// Savitzky-Golay weights for the newest sample of an `n`-point window.
///
/// Fits a polynomial of degree `poly_order` by least squares with t = 0 at
/// the newest sample and returns the row of (AᵀA)⁻¹Aᵀ that yields the
/// fitted value at t = 0. `None` when the window is too short for the order.
pub fn savgol_endpoint_weights(n: usize, poly_order: usize) -> Option<Vec<f64>> {
    if n < poly_order + 2 {
        return None;
    }
    let cols = poly_order + 1;
    let a = DMatrix::from_fn(n, cols, |i, k| {
        let t = i as f64 - (n - 1) as f64;
        t.powi(k as i32)
    });
    let ata = a.transpose() * &a;
    let inv = ata.try_inverse()?;
    let proj = inv * a.transpose();
    Some(proj.row(0).iter().copied().collect())
}

/// Causal Gaussian weights, peak at the newest sample.
pub fn gaussian_endpoint_weights(n: usize, sigma: f64) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    let sigma = if sigma > 0.0 { sigma } else { 1.0 };
    let raw: Vec<f64> = (0..n)
        .map(|i| {
            let d = (n - 1 - i) as f64;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f64 = raw.iter().sum();
    raw.into_iter().map(|w| w / sum).collect()
}

/// Smoothed value of the newest point in `points` (oldest first).
///
/// Uses the largest odd window ≤ `window` that the history allows. If that
/// window is too short for `poly_order`, falls back to Gaussian weights.
pub fn smooth_latest(points: &[Vector3<f64>], window: usize, poly_order: usize, sigma: f64) -> Option<Vector3<f64>> {
    if points.is_empty() {
        return None;
    }
    let mut len = window.min(points.len()).max(1);
    if len % 2 == 0 {
        len -= 1;
    }
    let tail = &points[points.len() - len..];
    let weights = savgol_endpoint_weights(len, poly_order)
        .unwrap_or_else(|| gaussian_endpoint_weights(len, sigma));

    let mut out = Vector3::zeros();
    for (w, p) in weights.iter().zip(tail) {
        out += p * *w;
    }
    if out.iter().all(|v| v.is_finite()) { Some(out) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_sum_to_one() {
        let w = savgol_endpoint_weights(7, 2).unwrap();
        assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        let g = gaussian_endpoint_weights(5, 1.5);
        assert!((g.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(g[4] > g[0]);
    }

    #[test]
    fn too_short_window_has_no_polynomial_fit() {
        assert!(savgol_endpoint_weights(3, 2).is_none());
        assert!(savgol_endpoint_weights(4, 2).is_some());
    }

    #[test]
    fn quadratic_is_reproduced_exactly() {
        let pts: Vec<Vector3<f64>> = (0..7)
            .map(|i| {
                let t = i as f64;
                Vector3::new(t * t, 2.0 * t + 1.0, 5.0)
            })
            .collect();
        let s = smooth_latest(&pts, 7, 2, 1.5).unwrap();
        assert!((s.x - 36.0).abs() < 1e-6);
        assert!((s.y - 13.0).abs() < 1e-6);
        assert!((s.z - 5.0).abs() < 1e-6);
    }
}
