//! Space effort analysis - Direct vs Indirect movement.
//!
//! The Space effort factor describes how focused or diffuse attention is
//! during movement.
//! - **Direct**: limbs gathered evenly around the body centre
//! - **Indirect**: one limb flung far out while the others stay close
//!
//! ## Metric: Reach Disparity
//!
//! ratio = max reach / mean reach over the reliable elbows and knees, where
//! reach is the distance from the shoulder-hip centroid.
//!
//! `space = min((ratio - 1) / 2, 1)`

use letdance_core::{bounded, centroid, distance_to_point, KeypointFrame, Landmark};
use serde::{Deserialize, Serialize};

use crate::effort::RELIABILITY_THRESHOLD;

const TORSO_LANDMARKS: [Landmark; 4] = [
    Landmark::LeftShoulder,
    Landmark::RightShoulder,
    Landmark::LeftHip,
    Landmark::RightHip,
];

const LIMB_LANDMARKS: [Landmark; 4] = [
    Landmark::LeftElbow,
    Landmark::RightElbow,
    Landmark::LeftKnee,
    Landmark::RightKnee,
];

/// Space effort quality (Direct vs Indirect)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpaceEffort {
    /// Mean limb distance from the body centre
    pub mean_reach: f64,
    /// Farthest limb distance from the body centre
    pub max_reach: f64,
    /// Limbs that passed the confidence filter
    pub limbs_used: usize,
    /// Indirectness score [-1=direct, 1=indirect]
    pub indirectness: f64,
}

impl SpaceEffort {
    pub fn from_frame(frame: &KeypointFrame) -> Self {
        let torso: Vec<_> = TORSO_LANDMARKS.iter().map(|&lm| frame.get(lm)).collect();
        let Some(center) = centroid(&torso) else {
            return Self::default();
        };

        let reaches: Vec<f64> = LIMB_LANDMARKS
            .iter()
            .map(|&lm| frame.get(lm))
            .filter(|kp| kp.is_reliable(RELIABILITY_THRESHOLD))
            .map(|kp| distance_to_point(kp, &center))
            .collect();

        if reaches.is_empty() {
            return Self::default();
        }

        let mean_reach = reaches.iter().sum::<f64>() / reaches.len() as f64;
        let max_reach = reaches.iter().cloned().fold(0.0, f64::max);

        let indirectness = if mean_reach > 0.0 {
            let range_ratio = max_reach / mean_reach;
            bounded(((range_ratio - 1.0) / 2.0).min(1.0))
        } else {
            0.0
        };

        Self {
            mean_reach,
            max_reach,
            limbs_used: reaches.len(),
            indirectness,
        }
    }

    pub fn is_direct(&self) -> bool {
        self.indirectness < 0.0
    }

    /// Qualitative description
    pub fn description(&self) -> &'static str {
        if self.indirectness > 0.6 {
            "Very Indirect - wide, multi-focused reach"
        } else if self.indirectness > 0.2 {
            "Somewhat Indirect - flexible, exploratory"
        } else if self.indirectness > -0.2 {
            "Neutral - balanced focus"
        } else if self.indirectness > -0.6 {
            "Somewhat Direct - purposeful"
        } else {
            "Very Direct - focused, channeled"
        }
    }
}

impl Default for SpaceEffort {
    fn default() -> Self {
        Self {
            mean_reach: 0.0,
            max_reach: 0.0,
            limbs_used: 0,
            indirectness: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::stance;
    use letdance_core::{Keypoint, Timestamp};

    #[test]
    fn test_reference_stance() {
        let space = SpaceEffort::from_frame(&stance(0.0, 0.9));
        assert_eq!(space.limbs_used, 4);
        // reaches 31.62, 31.62, 111.80, 111.80 around (0, 50)
        let expected_ratio = 125f64.sqrt() * 10.0 / ((1000f64.sqrt() + 12500f64.sqrt()) / 2.0);
        assert!((space.indirectness - (expected_ratio - 1.0) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_even_reach_is_zero() {
        let kps = [
            (-10.0, -10.0),
            (10.0, -10.0),
            (-20.0, 0.0),
            (20.0, 0.0),
            (-10.0, 10.0),
            (10.0, 10.0),
            (0.0, 20.0),
            (0.0, -20.0),
        ]
        .map(|(x, y)| Keypoint::new(x, y, 0.9));
        let frame = KeypointFrame::new(Timestamp::from_nanos(0), kps);
        let space = SpaceEffort::from_frame(&frame);
        assert!(space.indirectness.abs() < 1e-9);
    }

    #[test]
    fn test_no_reliable_limbs() {
        let mut kps = *stance(0.0, 0.9).keypoints();
        for lm in LIMB_LANDMARKS {
            kps[lm.index()].confidence = 0.2;
        }
        let frame = KeypointFrame::new(Timestamp::from_nanos(0), kps);
        let space = SpaceEffort::from_frame(&frame);
        assert_eq!(space.limbs_used, 0);
        assert_eq!(space.indirectness, 0.0);
    }

    #[test]
    fn test_single_outlier_limb_saturates() {
        let mut kps = *stance(0.0, 0.9).keypoints();
        kps[Landmark::LeftElbow.index()] = Keypoint::new(-5000.0, 0.0, 0.9);
        let frame = KeypointFrame::new(Timestamp::from_nanos(0), kps);
        let space = SpaceEffort::from_frame(&frame);
        assert!(space.indirectness > 0.4);
        assert!(space.indirectness <= 1.0);
    }
}
