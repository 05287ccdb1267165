//! Fundamental types for the LETDANCE engine.

use chrono::{DateTime, Utc};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Analysis session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Timestamp wrapper with nanosecond precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().timestamp_nanos_opt().unwrap_or(0))
    }

    pub fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    pub fn as_nanos(&self) -> i64 {
        self.0
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1_000_000_000.0
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(self.0)
    }
}

/// The eight anatomical landmarks tracked per frame, in their fixed order.
///
/// Downstream code indexes keypoint arrays by this discriminant, so the
/// order is part of the data contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Landmark {
    LeftShoulder = 0,
    RightShoulder = 1,
    LeftElbow = 2,
    RightElbow = 3,
    LeftHip = 4,
    RightHip = 5,
    LeftKnee = 6,
    RightKnee = 7,
}

impl Landmark {
    pub const COUNT: usize = 8;

    pub const ALL: [Landmark; Landmark::COUNT] = [
        Landmark::LeftShoulder,
        Landmark::RightShoulder,
        Landmark::LeftElbow,
        Landmark::RightElbow,
        Landmark::LeftHip,
        Landmark::RightHip,
        Landmark::LeftKnee,
        Landmark::RightKnee,
    ];

    pub fn from_index(idx: u8) -> Option<Self> {
        Self::ALL.get(idx as usize).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Landmark::LeftShoulder => "left_shoulder",
            Landmark::RightShoulder => "right_shoulder",
            Landmark::LeftElbow => "left_elbow",
            Landmark::RightElbow => "right_elbow",
            Landmark::LeftHip => "left_hip",
            Landmark::RightHip => "right_hip",
            Landmark::LeftKnee => "left_knee",
            Landmark::RightKnee => "right_knee",
        }
    }

    /// COCO-17 index of this landmark, as emitted by common pose detectors
    pub fn coco_index(self) -> usize {
        match self {
            Landmark::LeftShoulder => 5,
            Landmark::RightShoulder => 6,
            Landmark::LeftElbow => 7,
            Landmark::RightElbow => 8,
            Landmark::LeftHip => 11,
            Landmark::RightHip => 12,
            Landmark::LeftKnee => 13,
            Landmark::RightKnee => 14,
        }
    }

    /// Bone segments drawn for the reduced skeleton
    pub fn skeleton_pairs() -> &'static [(Landmark, Landmark)] {
        &[
            (Landmark::LeftShoulder, Landmark::LeftElbow),
            (Landmark::RightShoulder, Landmark::RightElbow),
            (Landmark::LeftShoulder, Landmark::RightShoulder),
            (Landmark::LeftHip, Landmark::LeftKnee),
            (Landmark::RightHip, Landmark::RightKnee),
            (Landmark::LeftHip, Landmark::RightHip),
            (Landmark::LeftShoulder, Landmark::LeftHip),
            (Landmark::RightShoulder, Landmark::RightHip),
        ]
    }
}

/// A single landmark sample in image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f64,
    pub y: f64,
    /// Detector confidence in [0, 1]
    pub confidence: f32,
}

impl Keypoint {
    pub fn new(x: f64, y: f64, confidence: f32) -> Self {
        Self {
            x,
            y,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Placeholder for a landmark the detector did not report
    pub fn missing() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn position(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }

    /// Strictly above the threshold counts as reliable
    pub fn is_reliable(&self, threshold: f32) -> bool {
        self.confidence > threshold
    }
}

/// Keypoints for one sampling instant, indexed by [`Landmark`].
///
/// Unreliable keypoints stay in place; the array is never compacted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeypointFrame {
    timestamp: Timestamp,
    keypoints: [Keypoint; Landmark::COUNT],
}

impl KeypointFrame {
    pub fn new(timestamp: Timestamp, keypoints: [Keypoint; Landmark::COUNT]) -> Self {
        Self {
            timestamp,
            keypoints,
        }
    }

    /// Build from a detector output slice that must hold exactly eight entries
    pub fn from_slice(timestamp: Timestamp, keypoints: &[Keypoint]) -> Result<Self> {
        let keypoints: [Keypoint; Landmark::COUNT] =
            keypoints.try_into().map_err(|_| Error::KeypointCount {
                expected: Landmark::COUNT,
                actual: keypoints.len(),
            })?;
        Ok(Self::new(timestamp, keypoints))
    }

    /// Select the eight tracked landmarks out of a COCO-17 keypoint list.
    /// Indices beyond the list become [`Keypoint::missing`].
    pub fn from_coco(timestamp: Timestamp, coco: &[Keypoint]) -> Self {
        let keypoints = Landmark::ALL.map(|lm| {
            coco.get(lm.coco_index())
                .copied()
                .unwrap_or_else(Keypoint::missing)
        });
        Self::new(timestamp, keypoints)
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn keypoints(&self) -> &[Keypoint; Landmark::COUNT] {
        &self.keypoints
    }

    pub fn get(&self, landmark: Landmark) -> &Keypoint {
        &self.keypoints[landmark.index()]
    }

    /// Number of keypoints whose confidence exceeds the threshold
    pub fn visible_count(&self, threshold: f32) -> usize {
        self.keypoints
            .iter()
            .filter(|kp| kp.is_reliable(threshold))
            .count()
    }
}

/// Map a raw feature onto [-1, 1]. Non-finite inputs become 0.
pub fn bounded(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Laban effort qualities, each bounded to [-1, 1]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MovementQualityVector {
    /// Light (-1) to strong (+1)
    pub weight: f64,
    /// Sustained (-1) to sudden (+1)
    pub time: f64,
    /// Erratic (-1) to flowing (+1)
    pub flow: f64,
    /// Direct (-1) to indirect (+1)
    pub space: f64,
}

impl MovementQualityVector {
    /// Construct with every dimension passed through [`bounded`]
    pub fn new(weight: f64, time: f64, flow: f64, space: f64) -> Self {
        Self {
            weight: bounded(weight),
            time: bounded(time),
            flow: bounded(flow),
            space: bounded(space),
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.weight, self.time, self.flow, self.space]
    }

    /// Component-wise mean; `None` for an empty input
    pub fn mean<'a, I>(vectors: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a MovementQualityVector>,
    {
        let mut sum = [0.0; 4];
        let mut count = 0usize;
        for v in vectors {
            for (acc, x) in sum.iter_mut().zip(v.as_array()) {
                *acc += x;
            }
            count += 1;
        }

        if count == 0 {
            return None;
        }

        let n = count as f64;
        Some(Self::new(sum[0] / n, sum[1] / n, sum[2] / n, sum[3] / n))
    }
}
