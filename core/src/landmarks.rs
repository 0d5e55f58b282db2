// core/src/landmarks.rs
use nalgebra::Vector3;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Antall ledd i BlazePose-topologien.
pub const JOINT_COUNT: usize = 33;

/// Closed set of body joints, indexed the same way the upstream pose model
/// emits them (0 = nose … 32 = right foot index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Joint {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl Joint {
    pub const ALL: [Joint; JOINT_COUNT] = [
        Joint::Nose,
        Joint::LeftEyeInner,
        Joint::LeftEye,
        Joint::LeftEyeOuter,
        Joint::RightEyeInner,
        Joint::RightEye,
        Joint::RightEyeOuter,
        Joint::LeftEar,
        Joint::RightEar,
        Joint::MouthLeft,
        Joint::MouthRight,
        Joint::LeftShoulder,
        Joint::RightShoulder,
        Joint::LeftElbow,
        Joint::RightElbow,
        Joint::LeftWrist,
        Joint::RightWrist,
        Joint::LeftPinky,
        Joint::RightPinky,
        Joint::LeftIndex,
        Joint::RightIndex,
        Joint::LeftThumb,
        Joint::RightThumb,
        Joint::LeftHip,
        Joint::RightHip,
        Joint::LeftKnee,
        Joint::RightKnee,
        Joint::LeftAnkle,
        Joint::RightAnkle,
        Joint::LeftHeel,
        Joint::RightHeel,
        Joint::LeftFootIndex,
        Joint::RightFootIndex,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(idx: usize) -> Option<Joint> {
        Joint::ALL.get(idx).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Joint::Nose => "nose",
            Joint::LeftEyeInner => "left_eye_inner",
            Joint::LeftEye => "left_eye",
            Joint::LeftEyeOuter => "left_eye_outer",
            Joint::RightEyeInner => "right_eye_inner",
            Joint::RightEye => "right_eye",
            Joint::RightEyeOuter => "right_eye_outer",
            Joint::LeftEar => "left_ear",
            Joint::RightEar => "right_ear",
            Joint::MouthLeft => "mouth_left",
            Joint::MouthRight => "mouth_right",
            Joint::LeftShoulder => "left_shoulder",
            Joint::RightShoulder => "right_shoulder",
            Joint::LeftElbow => "left_elbow",
            Joint::RightElbow => "right_elbow",
            Joint::LeftWrist => "left_wrist",
            Joint::RightWrist => "right_wrist",
            Joint::LeftPinky => "left_pinky",
            Joint::RightPinky => "right_pinky",
            Joint::LeftIndex => "left_index",
            Joint::RightIndex => "right_index",
            Joint::LeftThumb => "left_thumb",
            Joint::RightThumb => "right_thumb",
            Joint::LeftHip => "left_hip",
            Joint::RightHip => "right_hip",
            Joint::LeftKnee => "left_knee",
            Joint::RightKnee => "right_knee",
            Joint::LeftAnkle => "left_ankle",
            Joint::RightAnkle => "right_ankle",
            Joint::LeftHeel => "left_heel",
            Joint::RightHeel => "right_heel",
            Joint::LeftFootIndex => "left_foot_index",
            Joint::RightFootIndex => "right_foot_index",
        }
    }
}

/// Left/right pairs used by symmetry correction and bilateral measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointPair {
    Shoulder,
    Elbow,
    Wrist,
    Hip,
    Knee,
    Ankle,
    Ear,
    Index,
}

impl JointPair {
    /// The six pairs the symmetry correction operates on.
    pub const LIMBS: [JointPair; 6] = [
        JointPair::Shoulder,
        JointPair::Elbow,
        JointPair::Wrist,
        JointPair::Hip,
        JointPair::Knee,
        JointPair::Ankle,
    ];

    pub fn sides(self) -> (Joint, Joint) {
        match self {
            JointPair::Shoulder => (Joint::LeftShoulder, Joint::RightShoulder),
            JointPair::Elbow => (Joint::LeftElbow, Joint::RightElbow),
            JointPair::Wrist => (Joint::LeftWrist, Joint::RightWrist),
            JointPair::Hip => (Joint::LeftHip, Joint::RightHip),
            JointPair::Knee => (Joint::LeftKnee, Joint::RightKnee),
            JointPair::Ankle => (Joint::LeftAnkle, Joint::RightAnkle),
            JointPair::Ear => (Joint::LeftEar, Joint::RightEar),
            JointPair::Index => (Joint::LeftIndex, Joint::RightIndex),
        }
    }

    #[inline]
    pub fn left(self) -> Joint {
        self.sides().0
    }

    #[inline]
    pub fn right(self) -> Joint {
        self.sides().1
    }
}

/// One estimated joint position. Values are never mutated in place; every
/// processing stage builds a new landmark.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub joint: Joint,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub visibility: f64, // 0..1
}

impl Landmark {
    pub fn new(joint: Joint, x: f64, y: f64, z: f64, visibility: f64) -> Self {
        Self { joint, x, y, z, visibility }
    }

    #[inline]
    pub fn position(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    /// Same joint and visibility, new coordinates.
    #[inline]
    pub fn with_position(&self, p: Vector3<f64>) -> Landmark {
        Landmark { joint: self.joint, x: p.x, y: p.y, z: p.z, visibility: self.visibility }
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Strictly above the threshold; a joint exactly at it counts as hidden.
    #[inline]
    pub fn is_visible(&self, min_visibility: f64) -> bool {
        self.visibility > min_visibility
    }
}

/// Landmarks for one frame, keyed by joint. A joint is either present or
/// absent; there is no padding value.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameLandmarkSet {
    slots: [Option<Landmark>; JOINT_COUNT],
}

impl Default for FrameLandmarkSet {
    fn default() -> Self {
        Self { slots: [None; JOINT_COUNT] }
    }
}

impl FrameLandmarkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_landmarks<I>(landmarks: I) -> Self
    where
        I: IntoIterator<Item = Landmark>,
    {
        let mut set = Self::new();
        for lm in landmarks {
            set.insert(lm);
        }
        set
    }

    /// Inserts (or replaces) the landmark for `lm.joint`.
    pub fn insert(&mut self, lm: Landmark) {
        self.slots[lm.joint.index()] = Some(lm);
    }

    pub fn remove(&mut self, joint: Joint) -> Option<Landmark> {
        self.slots[joint.index()].take()
    }

    #[inline]
    pub fn get(&self, joint: Joint) -> Option<&Landmark> {
        self.slots[joint.index()].as_ref()
    }

    /// Landmark only if its visibility exceeds `min_visibility`.
    #[inline]
    pub fn visible(&self, joint: Joint, min_visibility: f64) -> Option<&Landmark> {
        self.get(joint).filter(|lm| lm.is_visible(min_visibility))
    }

    #[inline]
    pub fn contains(&self, joint: Joint) -> bool {
        self.slots[joint.index()].is_some()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|s| s.is_none())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Landmark> {
        self.slots.iter().filter_map(|s| s.as_ref())
    }

    /// Builds a new set by applying `f` to every present landmark.
    pub fn map<F>(&self, mut f: F) -> FrameLandmarkSet
    where
        F: FnMut(&Landmark) -> Landmark,
    {
        let mut out = FrameLandmarkSet::new();
        for lm in self.iter() {
            out.insert(f(lm));
        }
        out
    }
}

// Serialiseres som liste over tilstedeværende ledd.
impl Serialize for FrameLandmarkSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for FrameLandmarkSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let list = Vec::<Landmark>::deserialize(deserializer)?;
        Ok(FrameLandmarkSet::from_landmarks(list))
    }
}

impl FromIterator<Landmark> for FrameLandmarkSet {
    fn from_iter<I: IntoIterator<Item = Landmark>>(iter: I) -> Self {
        FrameLandmarkSet::from_landmarks(iter)
    }
}

/// How upstream expresses x/y. Declared once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateSpace {
    /// x, y in [0,1]; z on the same scale as x.
    #[default]
    Normalized,
    Pixels,
}

impl CoordinateSpace {
    /// Converts a frame to pixel space. Pixel input is returned as-is.
    pub fn to_pixels(self, frame: &FrameLandmarkSet, frame_w: f64, frame_h: f64) -> FrameLandmarkSet {
        match self {
            CoordinateSpace::Pixels => frame.clone(),
            CoordinateSpace::Normalized => frame.map(|lm| Landmark {
                x: lm.x * frame_w,
                y: lm.y * frame_h,
                z: lm.z * frame_w,
                ..*lm
            }),
        }
    }
}

/// Frame after calibration. With a scale the coordinates are centimetres,
/// without one they stay in pixels and `scale` is `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledFrame {
    pub landmarks: FrameLandmarkSet,
    pub scale: Option<crate::calibration::ScaleEstimate>,
    pub timestamp_s: f64,
}

impl ScaledFrame {
    pub fn new(
        landmarks: FrameLandmarkSet,
        scale: Option<crate::calibration::ScaleEstimate>,
        timestamp_s: f64,
    ) -> Self {
        Self { landmarks, scale, timestamp_s }
    }

    /// Divides pixel coordinates by `pixels_per_cm`. A non-positive scale
    /// leaves the frame unscaled.
    pub fn from_pixels(
        pixels: &FrameLandmarkSet,
        scale: Option<crate::calibration::ScaleEstimate>,
        timestamp_s: f64,
    ) -> Self {
        match scale {
            Some(s) if s.pixels_per_cm > 0.0 && s.pixels_per_cm.is_finite() => {
                let k = 1.0 / s.pixels_per_cm;
                let landmarks = pixels.map(|lm| Landmark {
                    x: lm.x * k,
                    y: lm.y * k,
                    z: lm.z * k,
                    ..*lm
                });
                Self { landmarks, scale: Some(s), timestamp_s }
            }
            _ => Self { landmarks: pixels.clone(), scale: None, timestamp_s },
        }
    }

    #[inline]
    pub fn is_scaled(&self) -> bool {
        self.scale.is_some()
    }

    #[inline]
    pub fn get(&self, joint: Joint) -> Option<&Landmark> {
        self.landmarks.get(joint)
    }
}
