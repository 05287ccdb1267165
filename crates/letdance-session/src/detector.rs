//! Pose detector boundary.
//!
//! The neural keypoint model lives outside this crate. The sampling loop
//! only needs "frame in, eight keypoints or nothing out".

use std::collections::VecDeque;

use async_trait::async_trait;
use letdance_camera::VideoFrame;
use letdance_core::{Keypoint, KeypointFrame, Landmark};
use parking_lot::Mutex;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectorError {
    #[error("Pose model not loaded: {0}")]
    ModelUnavailable(String),

    #[error("Inference failed: {0}")]
    Inference(String),
}

/// Turns camera frames into keypoint frames
#[async_trait]
pub trait PoseDetector: Send + Sync {
    /// `Ok(None)` when no subject was found in the frame
    async fn detect(
        &self,
        frame: &VideoFrame,
        confidence_threshold: f32,
    ) -> Result<Option<KeypointFrame>, DetectorError>;
}

type Pose = [Keypoint; Landmark::COUNT];

/// Detector replaying a fixed sequence of poses, one per call
#[derive(Debug, Default)]
pub struct ScriptedDetector {
    script: Mutex<VecDeque<Option<Pose>>>,
    fallback: Option<Pose>,
}

impl ScriptedDetector {
    /// Replays `script`, then reports no subject
    pub fn new(script: Vec<Option<Pose>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: None,
        }
    }

    /// Reports the same pose on every call
    pub fn constant(pose: Pose) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Some(pose),
        }
    }

    /// Never finds a subject
    pub fn empty() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PoseDetector for ScriptedDetector {
    async fn detect(
        &self,
        frame: &VideoFrame,
        _confidence_threshold: f32,
    ) -> Result<Option<KeypointFrame>, DetectorError> {
        let pose = self.script.lock().pop_front().unwrap_or(self.fallback);
        Ok(pose.map(|keypoints| KeypointFrame::new(frame.captured_at, keypoints)))
    }
}
