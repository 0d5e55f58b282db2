//! Constant-velocity Kalman filter for one joint.
//!
//! State vector: [x, y, z, vx, vy, vz]ᵀ, position observed on all three axes.
//! Process noise is the discrete white-noise-acceleration model, one block
//! per axis.

use nalgebra::{Matrix3, Matrix3x6, Matrix6, Matrix6x3, Vector3, Vector6};

#[derive(Debug, Clone)]
pub struct JointKalman {
    state: Vector6<f64>,
    covariance: Matrix6<f64>,
    process_noise: Matrix6<f64>,
    measurement_noise: Matrix3<f64>,
    transition: Matrix6<f64>,
    initialized: bool,
}

impl JointKalman {
    pub fn new(process_variance: f64, measurement_variance: f64, dt: f64) -> Self {
        // F: x += v * dt
        let mut transition = Matrix6::identity();
        transition.fixed_view_mut::<3, 3>(0, 3).fill_diagonal(dt);

        // Q = q * G Gᵀ, G = [dt²/2, dt] per akse
        let g_pos = 0.5 * dt * dt;
        let g_vel = dt;
        let mut process_noise = Matrix6::zeros();
        for axis in 0..3 {
            process_noise[(axis, axis)] = process_variance * g_pos * g_pos;
            process_noise[(axis, axis + 3)] = process_variance * g_pos * g_vel;
            process_noise[(axis + 3, axis)] = process_variance * g_pos * g_vel;
            process_noise[(axis + 3, axis + 3)] = process_variance * g_vel * g_vel;
        }

        Self {
            state: Vector6::zeros(),
            covariance: Matrix6::identity(),
            process_noise,
            measurement_noise: Matrix3::identity() * measurement_variance,
            transition,
            initialized: false,
        }
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Seeds the filter with its first measurement: zero velocity, position
    /// uncertainty equal to the measurement noise.
    pub fn initialize(&mut self, measurement: Vector3<f64>) {
        self.state = Vector6::zeros();
        self.state.fixed_rows_mut::<3>(0).copy_from(&measurement);
        self.covariance = Matrix6::zeros();
        self.covariance
            .fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&self.measurement_noise);
        let vel_var = self.process_noise[(3, 3)].max(1e-9);
        self.covariance.fixed_view_mut::<3, 3>(3, 3).fill_diagonal(vel_var);
        self.initialized = true;
    }

    pub fn predict(&mut self) {
        let f = self.transition;
        self.state = f * self.state;
        self.covariance = f * self.covariance * f.transpose() + self.process_noise;
    }

    pub fn update(&mut self, measurement: Vector3<f64>) {
        let mut h = Matrix3x6::<f64>::zeros();
        h[(0, 0)] = 1.0;
        h[(1, 1)] = 1.0;
        h[(2, 2)] = 1.0;

        let innovation = measurement - h * self.state;
        let s = h * self.covariance * h.transpose() + self.measurement_noise;
        let Some(s_inv) = s.try_inverse() else {
            // singulær S: behold prediksjonen
            return;
        };
        let k: Matrix6x3<f64> = self.covariance * h.transpose() * s_inv;

        self.state += k * innovation;
        self.covariance = (Matrix6::identity() - k * h) * self.covariance;
    }

    /// First call seeds the state and returns the measurement unchanged;
    /// later calls predict, then correct with the measurement.
    pub fn step(&mut self, measurement: Vector3<f64>) -> Vector3<f64> {
        if !self.initialized {
            self.initialize(measurement);
            return measurement;
        }
        self.predict();
        self.update(measurement);
        self.position()
    }

    pub fn position(&self) -> Vector3<f64> {
        self.state.fixed_rows::<3>(0).into_owned()
    }

    pub fn velocity(&self) -> Vector3<f64> {
        self.state.fixed_rows::<3>(3).into_owned()
    }

    pub fn reset(&mut self) {
        self.state = Vector6::zeros();
        self.covariance = Matrix6::identity();
        self.initialized = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_step_passes_measurement_through() {
        let mut kf = JointKalman::new(1000.0, 0.01, 1.0 / 30.0);
        let m = Vector3::new(0.4, 0.6, -0.1);
        assert_eq!(kf.step(m), m);
        assert!(kf.is_initialized());
    }

    #[test]
    fn tracks_constant_velocity() {
        let mut kf = JointKalman::new(1000.0, 0.01, 1.0 / 30.0);
        let mut out = Vector3::zeros();
        for i in 0..60 {
            let t = i as f64 / 30.0;
            out = kf.step(Vector3::new(10.0 * t, 0.0, 0.0));
        }
        assert!((out.x - 10.0 * 59.0 / 30.0).abs() < 1e-2);
        assert!((kf.velocity().x - 10.0).abs() < 0.5);
    }
}
