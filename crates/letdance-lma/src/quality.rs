//! Movement quality extraction over the motion history window.

use letdance_core::{HistoryWindow, MovementQualityVector};
use serde::{Deserialize, Serialize};

use crate::effort::{FlowEffort, TimeEffort, WeightEffort, REFERENCE_DISPLACEMENT};
use crate::space::SpaceEffort;

/// Complete effort profile for the newest frame in a window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffortProfile {
    pub weight: WeightEffort,
    pub time: TimeEffort,
    pub flow: FlowEffort,
    pub space: SpaceEffort,
}

impl EffortProfile {
    /// The bounded vector handed to classification
    pub fn quality(&self) -> MovementQualityVector {
        MovementQualityVector::new(
            self.weight.strength,
            self.time.suddenness,
            self.flow.fluency,
            self.space.indirectness,
        )
    }

    /// Get dominant effort states
    pub fn dominant_efforts(&self) -> Vec<&'static str> {
        vec![
            if self.space.is_direct() { "Direct" } else { "Indirect" },
            if self.time.is_sudden() { "Sudden" } else { "Sustained" },
            if self.weight.is_strong() { "Strong" } else { "Light" },
            if self.flow.is_bound() { "Bound" } else { "Free" },
        ]
    }
}

/// Stateless extractor turning a history window into effort qualities
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityExtractor {
    /// Per-frame displacement mapped to time = +1
    pub reference_displacement: f64,
}

impl QualityExtractor {
    pub fn new(reference_displacement: f64) -> Self {
        Self {
            reference_displacement,
        }
    }

    /// Full profile; `None` when the window is empty
    pub fn profile(&self, window: &HistoryWindow<'_>) -> Option<EffortProfile> {
        let current = window.latest()?;

        Some(EffortProfile {
            weight: WeightEffort::from_frame(current),
            time: TimeEffort::from_window(window, self.reference_displacement),
            flow: FlowEffort::from_window(window),
            space: SpaceEffort::from_frame(current),
        })
    }

    /// Quality vector for the newest frame; zero for an empty window
    pub fn extract(&self, window: &HistoryWindow<'_>) -> MovementQualityVector {
        self.profile(window)
            .map(|p| p.quality())
            .unwrap_or_default()
    }
}

impl Default for QualityExtractor {
    fn default() -> Self {
        Self::new(REFERENCE_DISPLACEMENT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{buffer_of, stance};
    use letdance_core::{Keypoint, KeypointFrame, Landmark, MotionHistoryBuffer, Timestamp};

    fn in_range(q: &MovementQualityVector) -> bool {
        q.as_array().iter().all(|v| (-1.0..=1.0).contains(v))
    }

    #[test]
    fn test_empty_window_is_zero() {
        let buffer = MotionHistoryBuffer::default();
        let q = QualityExtractor::default().extract(&buffer.snapshot());
        assert_eq!(q, MovementQualityVector::zero());
    }

    #[test]
    fn test_extreme_coordinates_stay_bounded() {
        let extremes = [0.0, 1e-300, 1e12, -1e12, 1e154, -1e300, f64::MAX, f64::MIN];
        let mut buffer = MotionHistoryBuffer::default();
        for (i, &a) in extremes.iter().enumerate() {
            let kps: [Keypoint; Landmark::COUNT] = std::array::from_fn(|j| {
                let b = extremes[(i + j) % extremes.len()];
                Keypoint::new(a, b, 0.5 + 0.5 * (j as f32 / 8.0))
            });
            buffer.push(KeypointFrame::new(Timestamp::from_nanos(i as i64), kps));

            let q = QualityExtractor::default().extract(&buffer.snapshot());
            assert!(in_range(&q), "out of range at step {i}: {q:?}");
        }
    }

    #[test]
    fn test_identical_symmetric_frames() {
        let buffer = buffer_of((0..4).map(|_| stance(0.0, 0.9)));
        let q = QualityExtractor::default().extract(&buffer.snapshot());
        assert_eq!(q.time, -1.0);
        assert_eq!(q.flow, 1.0);
    }

    #[test]
    fn test_short_windows() {
        let extractor = QualityExtractor::default();

        let one = buffer_of([stance(0.0, 0.9)]);
        let q = extractor.extract(&one.snapshot());
        assert_eq!((q.time, q.flow), (0.0, 0.0));

        let two = buffer_of([stance(0.0, 0.9), stance(3.0, 0.9)]);
        let q = extractor.extract(&two.snapshot());
        assert_ne!(q.time, 0.0);
        assert_eq!(q.flow, 0.0);
    }

    #[test]
    fn test_weight_combination() {
        let buffer = buffer_of([stance(0.0, 0.9)]);
        let q = QualityExtractor::default().extract(&buffer.snapshot());
        // 0.7 * 0.25 + 0.3 * -0.6
        assert!((q.weight + 0.005).abs() < 1e-9);
    }

    #[test]
    fn test_dominant_efforts() {
        let buffer = buffer_of([stance(0.0, 0.9), stance(0.0, 0.9), stance(0.0, 0.9)]);
        let profile = QualityExtractor::default()
            .profile(&buffer.snapshot())
            .unwrap();
        assert_eq!(
            profile.dominant_efforts(),
            vec!["Indirect", "Sustained", "Light", "Free"]
        );
    }
}
