// core/tests/common/mod.rs
#![allow(dead_code)]

use std::path::PathBuf;

use formcheck_core::landmarks::{FrameLandmarkSet, Joint, Landmark};
use serde::Deserialize;

pub const FRAME_W: f64 = 640.0;
pub const FRAME_H: f64 = 480.0;
pub const FPS: f64 = 30.0;

/// Synthetic side-on camera: x points forward, image y down, the body's
/// left/right axis is depth (z).
#[derive(Debug, Clone, Copy)]
pub struct SideView {
    pub height_cm: f64,
    pub px_per_cm: f64,
    pub foot_x: f64,
    pub floor_y: f64,
    pub visibility: f64,
}

impl Default for SideView {
    fn default() -> Self {
        Self { height_cm: 175.0, px_per_cm: 2.4, foot_x: 300.0, floor_y: 440.0, visibility: 0.95 }
    }
}

impl SideView {
    /// Squat pose for a given knee angle. The shin takes 10 % of the bend,
    /// the torso leans forward by 35 % of it.
    pub fn squat_cm(&self, knee_deg: f64) -> Vec<(Joint, [f64; 3])> {
        let h = self.height_cm;
        let bend = 180.0 - knee_deg;
        let a = (bend * 0.1).to_radians();
        let b = (bend - bend * 0.1).to_radians();
        let g = (bend * 0.35).to_radians();

        let knee = [0.246 * h * a.sin(), 0.246 * h * a.cos()];
        let hip = [knee[0] - 0.245 * h * b.sin(), knee[1] + 0.245 * h * b.cos()];
        let shoulder = [hip[0] + 0.25 * h * g.sin(), hip[1] + 0.25 * h * g.cos()];
        let head = [shoulder[0] + 0.129 * h * g.sin(), shoulder[1] + 0.129 * h * g.cos()];
        let elbow = [shoulder[0], shoulder[1] - 0.19 * h];
        let wrist = [elbow[0], elbow[1] - 0.15 * h];

        let mut out = vec![(Joint::Nose, [head[0], head[1], 0.0])];
        let pairs: [(Joint, Joint, [f64; 2], f64); 7] = [
            (Joint::LeftAnkle, Joint::RightAnkle, [0.0, 0.0], 0.14),
            (Joint::LeftKnee, Joint::RightKnee, knee, 0.14),
            (Joint::LeftHip, Joint::RightHip, hip, 0.10),
            (Joint::LeftShoulder, Joint::RightShoulder, shoulder, 0.13),
            (Joint::LeftEar, Joint::RightEar, head, 0.05),
            (Joint::LeftElbow, Joint::RightElbow, elbow, 0.15),
            (Joint::LeftWrist, Joint::RightWrist, wrist, 0.15),
        ];
        for (l, r, p, half) in pairs {
            out.push((l, [p[0], p[1], -half * h]));
            out.push((r, [p[0], p[1], half * h]));
        }
        out
    }

    /// Same pose in pixels.
    pub fn squat_px(&self, knee_deg: f64) -> FrameLandmarkSet {
        self.squat_cm(knee_deg)
            .into_iter()
            .map(|(j, [x, y, z])| {
                Landmark::new(
                    j,
                    self.foot_x + x * self.px_per_cm,
                    self.floor_y - y * self.px_per_cm,
                    z * self.px_per_cm,
                    self.visibility,
                )
            })
            .collect()
    }

    /// Same pose in normalized image coordinates (z on the x scale).
    pub fn squat_normalized(&self, knee_deg: f64) -> FrameLandmarkSet {
        self.squat_px(knee_deg)
            .map(|lm| Landmark { x: lm.x / FRAME_W, y: lm.y / FRAME_H, z: lm.z / FRAME_W, ..*lm })
    }

    pub fn standing_normalized(&self) -> FrameLandmarkSet {
        self.squat_normalized(180.0)
    }
}

#[derive(Debug, Deserialize)]
pub struct KneeAngleRow {
    pub frame: usize,
    pub t_s: f64,
    pub knee_angle_deg: f64,
}

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures").join(name)
}

pub fn load_knee_angles(name: &str) -> Vec<KneeAngleRow> {
    let mut rdr = csv::Reader::from_path(fixture_path(name)).expect("open fixture");
    rdr.deserialize().map(|r| r.expect("fixture row")).collect()
}
