//! Per-session movement analyzer: history window, extraction, classification.

use letdance_core::{KeypointFrame, MotionHistoryBuffer, MovementQualityVector, Result};
use serde::{Deserialize, Serialize};

use crate::emotion::{Classification, EmotionClassifier};
use crate::quality::QualityExtractor;

/// Result of analysing one keypoint frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameAnalysis {
    pub quality: MovementQualityVector,
    pub classification: Classification,
}

/// Owns the motion history for one session.
///
/// Not shared: the sampling loop holds it exclusively for the session's
/// lifetime.
#[derive(Debug, Clone)]
pub struct MovementAnalyzer {
    history: MotionHistoryBuffer,
    extractor: QualityExtractor,
    classifier: EmotionClassifier,
}

impl MovementAnalyzer {
    pub fn new(
        max_history: usize,
        extractor: QualityExtractor,
        classifier: EmotionClassifier,
    ) -> Result<Self> {
        Ok(Self {
            history: MotionHistoryBuffer::new(max_history)?,
            extractor,
            classifier,
        })
    }

    /// Push the frame into the window, then extract and classify
    pub fn analyze(&mut self, frame: KeypointFrame) -> FrameAnalysis {
        self.history.push(frame);

        let quality = self.extractor.extract(&self.history.snapshot());
        let classification = self.classifier.classify(&quality);

        FrameAnalysis {
            quality,
            classification,
        }
    }

    pub fn history(&self) -> &MotionHistoryBuffer {
        &self.history
    }

    pub fn classifier(&self) -> &EmotionClassifier {
        &self.classifier
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }
}

impl Default for MovementAnalyzer {
    fn default() -> Self {
        Self {
            history: MotionHistoryBuffer::default(),
            extractor: QualityExtractor::default(),
            classifier: EmotionClassifier::default(),
        }
    }
}
