//! Qualitative Laban vocabulary for an averaged quality vector.
//!
//! Downstream prompt builders (music synthesis, projection) want words, not
//! numbers. Each dimension yields three adjectives; the first follows the
//! sign, the others switch at a magnitude of 0.5.

use letdance_core::MovementQualityVector;
use serde::Serialize;

use crate::emotion::Emotion;

const STRONG_MAGNITUDE: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpaceTerms {
    pub direction: &'static str,
    pub path: &'static str,
    pub range: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeTerms {
    pub speed: &'static str,
    pub rhythm: &'static str,
    pub duration: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeightTerms {
    pub strength: &'static str,
    pub heaviness: &'static str,
    pub energy: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowTerms {
    pub control: &'static str,
    pub continuity: &'static str,
    pub tension: &'static str,
}

/// Word-level rendering of a session's movement character
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabanDescription {
    pub space: SpaceTerms,
    pub time: TimeTerms,
    pub weight: WeightTerms,
    pub flow: FlowTerms,
    pub movement_quality: Emotion,
    pub raw_qualities: MovementQualityVector,
}

impl LabanDescription {
    pub fn describe(quality: &MovementQualityVector, dominant: Emotion) -> Self {
        let q = quality;

        Self {
            space: SpaceTerms {
                direction: if q.space > 0.0 { "indirect" } else { "direct" },
                path: if q.space > STRONG_MAGNITUDE { "curved" } else { "straight" },
                range: if q.space.abs() > STRONG_MAGNITUDE { "wide" } else { "narrow" },
            },
            time: TimeTerms {
                speed: if q.time > 0.0 { "fast" } else { "slow" },
                rhythm: if q.time.abs() < STRONG_MAGNITUDE { "regular" } else { "irregular" },
                duration: if q.time < 0.0 { "sustained" } else { "quick" },
            },
            weight: WeightTerms {
                strength: if q.weight > 0.0 { "strong" } else { "light" },
                heaviness: if q.weight > STRONG_MAGNITUDE { "heavy" } else { "light" },
                energy: if q.weight > 0.0 { "powerful" } else { "gentle" },
            },
            flow: FlowTerms {
                control: if q.flow < 0.0 { "controlled" } else { "free" },
                continuity: if q.flow < 0.0 { "bound" } else { "flowing" },
                tension: if q.flow < -STRONG_MAGNITUDE { "tense" } else { "relaxed" },
            },
            movement_quality: dominant,
            raw_qualities: *quality,
        }
    }

    /// One-line summary suitable for a generation prompt
    pub fn summary(&self) -> String {
        format!(
            "{} movement: {} and {} space, {} {} timing, {} {} weight, {} {} flow",
            self.movement_quality.description(),
            self.space.direction,
            self.space.range,
            self.time.speed,
            self.time.rhythm,
            self.weight.strength,
            self.weight.energy,
            self.flow.continuity,
            self.flow.tension,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_energetic_description() {
        let q = MovementQualityVector::new(0.7, 0.8, 0.6, 0.6);
        let d = LabanDescription::describe(&q, Emotion::Passionate);

        assert_eq!(d.space.direction, "indirect");
        assert_eq!(d.space.path, "curved");
        assert_eq!(d.space.range, "wide");
        assert_eq!(d.time.speed, "fast");
        assert_eq!(d.time.rhythm, "irregular");
        assert_eq!(d.time.duration, "quick");
        assert_eq!(d.weight.heaviness, "heavy");
        assert_eq!(d.flow.continuity, "flowing");
        assert_eq!(d.flow.tension, "relaxed");
    }

    #[test]
    fn test_tense_description() {
        let q = MovementQualityVector::new(-0.2, -0.3, -0.7, -0.1);
        let d = LabanDescription::describe(&q, Emotion::Anxious);

        assert_eq!(d.space.direction, "direct");
        assert_eq!(d.space.path, "straight");
        assert_eq!(d.time.duration, "sustained");
        assert_eq!(d.weight.energy, "gentle");
        assert_eq!(d.flow.control, "controlled");
        assert_eq!(d.flow.tension, "tense");
        assert!(d.summary().starts_with("Tense / anxious"));
    }
}
