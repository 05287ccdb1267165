//! Session records, summary and failure kinds.

use chrono::{DateTime, Utc};
use letdance_camera::AcquisitionError;
use letdance_core::{MovementQualityVector, SessionId};
use letdance_lma::{Emotion, EmotionScore};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// One valid analysis inside a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub timestamp: DateTime<Utc>,
    /// 1-based index among frames read during the session
    pub frame_index: u64,
    pub quality: MovementQualityVector,
    pub emotion: Emotion,
    pub scores: Vec<EmotionScore>,
    /// Landmarks with confidence above 0.5
    pub visible_keypoints: usize,
}

/// Emotion counts in first-seen order.
///
/// Serialized as a `label -> count` map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmotionDistribution {
    counts: Vec<(Emotion, usize)>,
}

impl EmotionDistribution {
    pub fn record(&mut self, emotion: Emotion) {
        match self.counts.iter_mut().find(|(e, _)| *e == emotion) {
            Some((_, n)) => *n += 1,
            None => self.counts.push((emotion, 1)),
        }
    }

    pub fn count(&self, emotion: Emotion) -> usize {
        self.counts
            .iter()
            .find(|(e, _)| *e == emotion)
            .map_or(0, |(_, n)| *n)
    }

    /// Most frequent emotion; ties go to the one seen first
    pub fn dominant(&self) -> Option<Emotion> {
        self.counts
            .iter()
            .fold(None::<(Emotion, usize)>, |best, &(e, n)| match best {
                Some((_, m)) if m >= n => best,
                _ => Some((e, n)),
            })
            .map(|(e, _)| e)
    }

    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, n)| n).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Emotion, usize)> + '_ {
        self.counts.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

impl FromIterator<Emotion> for EmotionDistribution {
    fn from_iter<I: IntoIterator<Item = Emotion>>(iter: I) -> Self {
        let mut distribution = Self::default();
        for emotion in iter {
            distribution.record(emotion);
        }
        distribution
    }
}

impl Serialize for EmotionDistribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.counts.iter().map(|(e, n)| (e.label(), n)))
    }
}

/// Outcome of a completed session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub started_at: DateTime<Utc>,
    pub duration_secs: f64,
    /// Frames read successfully from the camera
    pub total_frames: u64,
    /// Frames with detected keypoints
    pub valid_analyses: usize,
    /// Frames where the detector found no subject or failed
    pub skipped_frames: u64,
    pub dominant_emotion: Emotion,
    pub emotion_distribution: EmotionDistribution,
    /// Component-wise mean over every valid analysis
    pub average_quality: MovementQualityVector,
    /// Most recent records, oldest first
    pub recent_records: Vec<AnalysisRecord>,
    /// Samples accepted by the frame sink
    pub saved_frames: usize,
    pub frame_saving_enabled: bool,
    pub save_interval: u64,
}

/// Session-level failure
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionFailure {
    #[error("Invalid session parameters: {0}")]
    InvalidParameters(String),

    #[error("No camera available: {0}")]
    NoCameraAvailable(#[source] AcquisitionError),

    #[error("Camera lost after {consecutive_failures} consecutive read failures ({valid_analyses} analyses completed)")]
    DeviceLostDuringSampling {
        consecutive_failures: u32,
        valid_analyses: usize,
    },

    #[error("No valid pose detected in {total_frames} frames")]
    NoValidAnalyses { total_frames: u64 },
}

impl SessionFailure {
    /// Stable identifier for tool responses
    pub fn kind(&self) -> &'static str {
        match self {
            SessionFailure::InvalidParameters(_) => "invalid_parameters",
            SessionFailure::NoCameraAvailable(_) => "no_camera_available",
            SessionFailure::DeviceLostDuringSampling { .. } => "device_lost_during_sampling",
            SessionFailure::NoValidAnalyses { .. } => "no_valid_analyses",
        }
    }
}
