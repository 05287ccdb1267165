//! Emotion recognition from Laban effort qualities.
//!
//! ## Template Matching
//!
//! Each emotion is a reference point in (weight, time, flow, space). A quality
//! vector is compared with every template by weighted Euclidean distance:
//!
//! | Dimension | Importance |
//! |-----------|-----------:|
//! | Weight    | 1.2 |
//! | Time      | 1.0 |
//! | Flow      | 1.1 |
//! | Space     | 0.9 |
//!
//! and scored as `exp(-distance / 0.8)`. The best-scoring template wins
//! unless its similarity falls under the neutral threshold (0.3), in which
//! case the movement is labelled neutral.

use std::fmt;

use letdance_core::MovementQualityVector;
use serde::{Deserialize, Serialize};

/// Similarity below which the best match is reported as neutral
pub const NEUTRAL_THRESHOLD: f64 = 0.3;
/// Distance scale in the similarity kernel
pub const SIMILARITY_TEMPERATURE: f64 = 0.8;

/// Emotion categories recognised from dance movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Joyful,
    Graceful,
    Passionate,
    Melancholic,
    Anxious,
    Relaxed,
    Determined,
    Ethereal,
    /// Fallback when no template is close enough
    Neutral,
}

impl Emotion {
    pub fn label(&self) -> &'static str {
        match self {
            Emotion::Joyful => "joyful",
            Emotion::Graceful => "graceful",
            Emotion::Passionate => "passionate",
            Emotion::Melancholic => "melancholic",
            Emotion::Anxious => "anxious",
            Emotion::Relaxed => "relaxed",
            Emotion::Determined => "determined",
            Emotion::Ethereal => "ethereal",
            Emotion::Neutral => "neutral",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Emotion::Joyful => "Joyful / cheerful",
            Emotion::Graceful => "Graceful / calm",
            Emotion::Passionate => "Passionate / excited",
            Emotion::Melancholic => "Melancholic / sad",
            Emotion::Anxious => "Tense / anxious",
            Emotion::Relaxed => "Relaxed / soothing",
            Emotion::Determined => "Powerful / determined",
            Emotion::Ethereal => "Light / ethereal",
            Emotion::Neutral => "Neutral / natural",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-dimension importance in the template distance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionWeights {
    pub weight: f64,
    pub time: f64,
    pub flow: f64,
    pub space: f64,
}

impl DimensionWeights {
    pub const STANDARD: DimensionWeights = DimensionWeights {
        weight: 1.2,
        time: 1.0,
        flow: 1.1,
        space: 0.9,
    };

    pub fn as_array(&self) -> [f64; 4] {
        [self.weight, self.time, self.flow, self.space]
    }
}

impl Default for DimensionWeights {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Named reference point in quality space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmotionTemplate {
    pub emotion: Emotion,
    pub reference: MovementQualityVector,
    pub weights: DimensionWeights,
}

impl EmotionTemplate {
    const fn new(emotion: Emotion, weight: f64, time: f64, flow: f64, space: f64) -> Self {
        Self {
            emotion,
            reference: MovementQualityVector {
                weight,
                time,
                flow,
                space,
            },
            weights: DimensionWeights::STANDARD,
        }
    }

    /// Weighted Euclidean distance to a quality vector
    pub fn distance(&self, quality: &MovementQualityVector) -> f64 {
        self.weights
            .as_array()
            .iter()
            .zip(quality.as_array().iter().zip(self.reference.as_array()))
            .map(|(w, (q, r))| w * (q - r).powi(2))
            .sum::<f64>()
            .sqrt()
    }
}

/// Fixed template table, tuned for dance movement
pub const EMOTION_TEMPLATES: [EmotionTemplate; 8] = [
    EmotionTemplate::new(Emotion::Joyful, 0.5, 0.6, 0.7, 0.4),
    EmotionTemplate::new(Emotion::Graceful, -0.3, -0.4, 0.8, -0.2),
    EmotionTemplate::new(Emotion::Passionate, 0.8, 0.7, 0.5, 0.6),
    EmotionTemplate::new(Emotion::Melancholic, -0.6, -0.5, -0.3, -0.4),
    EmotionTemplate::new(Emotion::Anxious, 0.4, 0.3, -0.6, -0.5),
    EmotionTemplate::new(Emotion::Relaxed, -0.4, -0.6, 0.6, 0.2),
    EmotionTemplate::new(Emotion::Determined, 0.7, 0.2, 0.3, 0.5),
    EmotionTemplate::new(Emotion::Ethereal, -0.7, 0.4, 0.8, 0.3),
];

/// Similarity of a quality vector to one template
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmotionScore {
    pub emotion: Emotion,
    pub similarity: f64,
}

/// Classifier output: chosen label plus every template score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub emotion: Emotion,
    /// Similarity of the best template, even when the label fell back to neutral
    pub best_similarity: f64,
    /// Scores in template-table order
    pub scores: Vec<EmotionScore>,
}

impl Classification {
    pub fn score(&self, emotion: Emotion) -> Option<f64> {
        self.scores
            .iter()
            .find(|s| s.emotion == emotion)
            .map(|s| s.similarity)
    }
}

/// Deterministic template-matching classifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmotionClassifier {
    pub neutral_threshold: f64,
    pub temperature: f64,
}

impl EmotionClassifier {
    pub fn new(neutral_threshold: f64) -> Self {
        Self {
            neutral_threshold,
            temperature: SIMILARITY_TEMPERATURE,
        }
    }

    pub fn templates(&self) -> &'static [EmotionTemplate] {
        &EMOTION_TEMPLATES
    }

    pub fn classify(&self, quality: &MovementQualityVector) -> Classification {
        let scores: Vec<EmotionScore> = EMOTION_TEMPLATES
            .iter()
            .map(|template| EmotionScore {
                emotion: template.emotion,
                similarity: (-template.distance(quality) / self.temperature).exp(),
            })
            .collect();

        // first template wins ties
        let best = scores.iter().fold(None::<&EmotionScore>, |best, s| match best {
            Some(b) if b.similarity >= s.similarity => Some(b),
            _ => Some(s),
        });

        let (emotion, best_similarity) = match best {
            Some(b) if b.similarity >= self.neutral_threshold => (b.emotion, b.similarity),
            Some(b) => (Emotion::Neutral, b.similarity),
            None => (Emotion::Neutral, 0.0),
        };

        Classification {
            emotion,
            best_similarity,
            scores,
        }
    }

    /// Category names a caller can expect, neutral last
    pub fn categories(&self) -> Vec<Emotion> {
        EMOTION_TEMPLATES
            .iter()
            .map(|t| t.emotion)
            .chain(std::iter::once(Emotion::Neutral))
            .collect()
    }
}

impl Default for EmotionClassifier {
    fn default() -> Self {
        Self::new(NEUTRAL_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_template_match() {
        let classifier = EmotionClassifier::default();
        for template in &EMOTION_TEMPLATES {
            let result = classifier.classify(&template.reference);
            assert_eq!(result.emotion, template.emotion);
            assert!((result.best_similarity - 1.0).abs() < 1e-12);
            assert_eq!(result.score(template.emotion), Some(1.0));
        }
    }

    #[test]
    fn test_far_vector_is_neutral() {
        let classifier = EmotionClassifier::default();
        let far = MovementQualityVector::new(-1.0, 1.0, -1.0, 1.0);
        let result = classifier.classify(&far);

        assert_eq!(result.emotion, Emotion::Neutral);
        assert!(result.best_similarity < NEUTRAL_THRESHOLD);
        assert_eq!(result.scores.len(), EMOTION_TEMPLATES.len());
    }

    #[test]
    fn test_threshold_is_configurable() {
        let far = MovementQualityVector::new(-1.0, 1.0, -1.0, 1.0);
        let lenient = EmotionClassifier::new(0.0).classify(&far);
        assert_ne!(lenient.emotion, Emotion::Neutral);
    }

    #[test]
    fn test_scores_follow_table_order() {
        let result = EmotionClassifier::default().classify(&MovementQualityVector::zero());
        let order: Vec<_> = result.scores.iter().map(|s| s.emotion).collect();
        let table: Vec<_> = EMOTION_TEMPLATES.iter().map(|t| t.emotion).collect();
        assert_eq!(order, table);
        assert!(result.scores.iter().all(|s| s.similarity > 0.0 && s.similarity <= 1.0));
    }

    #[test]
    fn test_distance_weights() {
        let template = EMOTION_TEMPLATES[0];
        let mut q = template.reference;
        q.weight += 0.5;
        assert!((template.distance(&q) - (1.2f64 * 0.25).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_categories() {
        let categories = EmotionClassifier::default().categories();
        assert_eq!(categories.len(), 9);
        assert_eq!(categories.last(), Some(&Emotion::Neutral));
    }
}
