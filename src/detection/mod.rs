pub mod ai_likelihood;
pub mod text_presence;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One category score from an image classification model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub class_name: String,
    /// Model confidence in `[0, 1]`.
    pub probability: f64,
}

impl Prediction {
    pub fn new(class_name: impl Into<String>, probability: f64) -> Self {
        Self {
            class_name: class_name.into(),
            probability,
        }
    }
}

/// Output of a text-recognition engine for a whole image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recognition {
    pub text: String,
    /// Per-word confidences on a 0–100 scale.
    pub word_confidences: Vec<f64>,
}

impl Recognition {
    pub fn average_confidence(&self) -> f64 {
        let sum: f64 = self.word_confidences.iter().sum();
        sum / self.word_confidences.len().max(1) as f64
    }
}

/// An image classification model. Inference is outside this crate; the
/// implementation only has to hand back ranked category scores.
pub trait ImageClassifier: Send + Sync {
    fn classify(&self, image: &DynamicImage) -> Result<Vec<Prediction>>;

    fn name(&self) -> &str;
}

/// A text-recognition (OCR) engine.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, image: &DynamicImage) -> Result<Recognition>;

    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_confidence() {
        let recognition = Recognition {
            text: "hello".into(),
            word_confidences: vec![60.0, 80.0, 100.0],
        };
        assert_eq!(recognition.average_confidence(), 80.0);
        assert_eq!(Recognition::default().average_confidence(), 0.0);
    }
}
