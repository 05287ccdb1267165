//! Effort qualities analysis - Weight, Time, and Flow.
//!
//! ## Weight Effort: Strong vs Light
//!
//! Read from posture of the latest frame.
//! - **Expansion**: elbow span and knee span relative to shoulder width,
//!   recentred on the resting ratios (elbows ~1.2x, knees ~0.8x)
//! - **Verticality**: knee centre relative to hip centre, in torso lengths,
//!   sign flipped so upward-biased posture is positive
//!
//! `weight = 0.7 * expansion + 0.3 * verticality`
//!
//! ## Time Effort: Sudden vs Sustained
//!
//! Mean landmark displacement between the two newest frames, normalised by a
//! reference displacement: no motion maps to -1, the reference to +1.
//!
//! ## Flow Effort: Bound vs Free
//!
//! Stability of the per-step upper-body displacement across the window:
//! `1 / (1 + relative variance)`, rescaled so steady motion is +1 and
//! erratic motion tends to -1.

use letdance_core::{
    bounded, distance, mean_variance, midpoint, HistoryWindow, KeypointFrame, Landmark,
};
use serde::{Deserialize, Serialize};

/// Elbow span over shoulder width for a relaxed stance
pub const NEUTRAL_ELBOW_RATIO: f64 = 1.2;
/// Knee span over shoulder width for a relaxed stance
pub const NEUTRAL_KNEE_RATIO: f64 = 0.8;
pub const EXPANSION_SHARE: f64 = 0.7;
pub const VERTICALITY_SHARE: f64 = 0.3;
/// Per-frame displacement (pixels) that maps to time = +1
pub const REFERENCE_DISPLACEMENT: f64 = 15.0;
/// Keypoints must exceed this confidence to count in motion terms
pub const RELIABILITY_THRESHOLD: f32 = 0.5;
/// Guards the relative-variance division when motion is tiny
const FLOW_EPSILON: f64 = 1e-6;

const SPEED_LANDMARKS: [Landmark; Landmark::COUNT] = Landmark::ALL;
const FLOW_LANDMARKS: [Landmark; 4] = [
    Landmark::LeftShoulder,
    Landmark::RightShoulder,
    Landmark::LeftElbow,
    Landmark::RightElbow,
];

/// Weight effort quality (Strong vs Light)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightEffort {
    /// Body expansion in [-1, 1]
    pub expansion: f64,
    /// Upward bias in [-1, 1]
    pub verticality: f64,
    /// Strength score [-1=light, 1=strong]
    pub strength: f64,
}

impl WeightEffort {
    pub fn from_frame(frame: &KeypointFrame) -> Self {
        let expansion = body_expansion(frame);
        let verticality = vertical_bias(frame);
        let strength = bounded(EXPANSION_SHARE * expansion + VERTICALITY_SHARE * verticality);

        Self {
            expansion,
            verticality,
            strength,
        }
    }

    pub fn is_strong(&self) -> bool {
        self.strength > 0.0
    }

    pub fn description(&self) -> &'static str {
        if self.strength > 0.6 {
            "Very Strong - expansive, grounded presence"
        } else if self.strength > 0.2 {
            "Somewhat Strong - open, firm"
        } else if self.strength > -0.2 {
            "Neutral - balanced weight"
        } else if self.strength > -0.6 {
            "Somewhat Light - gathered, delicate"
        } else {
            "Very Light - compact, airy"
        }
    }
}

impl Default for WeightEffort {
    fn default() -> Self {
        Self {
            expansion: 0.0,
            verticality: 0.0,
            strength: 0.0,
        }
    }
}

/// Elbow and knee spans relative to shoulder width, recentred and averaged.
/// Zero shoulder width contributes 0.
pub fn body_expansion(frame: &KeypointFrame) -> f64 {
    let shoulder_width = distance(
        frame.get(Landmark::LeftShoulder),
        frame.get(Landmark::RightShoulder),
    );

    if shoulder_width <= 0.0 {
        return 0.0;
    }

    let arm_span = distance(frame.get(Landmark::LeftElbow), frame.get(Landmark::RightElbow));
    let leg_span = distance(frame.get(Landmark::LeftKnee), frame.get(Landmark::RightKnee));

    let arm_expansion = (arm_span / shoulder_width - NEUTRAL_ELBOW_RATIO) / NEUTRAL_ELBOW_RATIO;
    let leg_expansion = (leg_span / shoulder_width - NEUTRAL_KNEE_RATIO) / NEUTRAL_KNEE_RATIO;

    bounded((arm_expansion + leg_expansion) / 2.0)
}

/// Knee-centre offset below the hip centre in torso lengths, negated.
/// Torso length is the vertical shoulder-to-hip gap; zero contributes 0.
pub fn vertical_bias(frame: &KeypointFrame) -> f64 {
    let centre = |left, right| midpoint(frame.get(left), frame.get(right)).y;

    let shoulder_y = centre(Landmark::LeftShoulder, Landmark::RightShoulder);
    let hip_y = centre(Landmark::LeftHip, Landmark::RightHip);
    let torso_length = (hip_y - shoulder_y).abs();

    if torso_length <= 0.0 {
        return 0.0;
    }

    let knee_y = centre(Landmark::LeftKnee, Landmark::RightKnee);
    let offset = (knee_y - hip_y) / torso_length;

    -bounded(offset)
}

/// Mean displacement of the landmarks reliable in both frames
fn mean_displacement(
    from: &KeypointFrame,
    to: &KeypointFrame,
    landmarks: &[Landmark],
    threshold: f32,
) -> Option<f64> {
    let moves: Vec<f64> = landmarks
        .iter()
        .map(|&lm| (from.get(lm), to.get(lm)))
        .filter(|(a, b)| a.is_reliable(threshold) && b.is_reliable(threshold))
        .map(|(a, b)| distance(a, b))
        .collect();

    if moves.is_empty() {
        None
    } else {
        Some(moves.iter().sum::<f64>() / moves.len() as f64)
    }
}

/// Time effort quality (Sudden vs Sustained)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeEffort {
    /// Mean displacement between the two newest frames, if measurable
    pub mean_displacement: Option<f64>,
    /// Suddenness score [-1=sustained, 1=sudden]
    pub suddenness: f64,
}

impl TimeEffort {
    /// Needs two buffered frames; otherwise neutral
    pub fn from_window(window: &HistoryWindow<'_>, reference_displacement: f64) -> Self {
        let (Some(previous), Some(current)) = (window.previous(), window.latest()) else {
            return Self::default();
        };

        let mean_displacement =
            mean_displacement(previous, current, &SPEED_LANDMARKS, RELIABILITY_THRESHOLD);

        let suddenness = match mean_displacement {
            Some(d) => bounded((d / reference_displacement).min(1.0) * 2.0 - 1.0),
            None => 0.0,
        };

        Self {
            mean_displacement,
            suddenness,
        }
    }

    pub fn is_sudden(&self) -> bool {
        self.suddenness > 0.0
    }

    pub fn description(&self) -> &'static str {
        if self.suddenness > 0.6 {
            "Very Sudden - urgent, quick timing"
        } else if self.suddenness > 0.2 {
            "Somewhat Sudden - energetic, responsive"
        } else if self.suddenness > -0.2 {
            "Neutral - balanced timing"
        } else if self.suddenness > -0.6 {
            "Somewhat Sustained - leisurely, unhurried"
        } else {
            "Very Sustained - prolonged, lingering"
        }
    }
}

impl Default for TimeEffort {
    fn default() -> Self {
        Self {
            mean_displacement: None,
            suddenness: 0.0,
        }
    }
}

/// Flow effort quality (Bound vs Free)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlowEffort {
    /// Per-step upper-body displacements that fed the estimate
    pub samples: usize,
    /// Variance over mean of the step displacements
    pub relative_variance: f64,
    /// Fluency score [-1=erratic, 1=flowing]
    pub fluency: f64,
}

impl FlowEffort {
    /// Needs three buffered frames; otherwise neutral
    pub fn from_window(window: &HistoryWindow<'_>) -> Self {
        if window.len() < 3 {
            return Self::default();
        }

        let steps: Vec<f64> = window
            .pairs()
            .filter_map(|(a, b)| mean_displacement(a, b, &FLOW_LANDMARKS, RELIABILITY_THRESHOLD))
            .collect();

        if steps.len() < 2 {
            return Self {
                samples: steps.len(),
                ..Self::default()
            };
        }

        let Some((mean, variance)) = mean_variance(&steps) else {
            return Self::default();
        };

        if mean == 0.0 {
            return Self {
                samples: steps.len(),
                relative_variance: 0.0,
                fluency: 1.0,
            };
        }

        let relative_variance = variance / (mean + FLOW_EPSILON);
        let fluency = bounded(2.0 / (1.0 + relative_variance) - 1.0);

        Self {
            samples: steps.len(),
            relative_variance,
            fluency,
        }
    }

    pub fn is_free(&self) -> bool {
        self.fluency > 0.0
    }

    pub fn is_bound(&self) -> bool {
        self.fluency < 0.0
    }

    pub fn description(&self) -> &'static str {
        if self.fluency > 0.6 {
            "Very Free - continuous, released"
        } else if self.fluency > 0.2 {
            "Somewhat Free - fluid"
        } else if self.fluency > -0.2 {
            "Neutral - balanced flow"
        } else if self.fluency > -0.6 {
            "Somewhat Bound - careful, stoppable"
        } else {
            "Very Bound - halting, restrained"
        }
    }
}

impl Default for FlowEffort {
    fn default() -> Self {
        Self {
            samples: 0,
            relative_variance: 0.0,
            fluency: 0.0,
        }
    }
}
