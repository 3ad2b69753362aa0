use serde::{Deserialize, Serialize};

use super::Recognition;

pub const NO_TEXT_FOUND: &str = "No text found.";
pub const EXTRACTION_FAILED: &str = "Unable to extract text.";

/// Either the recognized text or the reason there is none, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPresence {
    pub detected: bool,
    pub extracted_text: Option<String>,
    pub error_reason: Option<String>,
}

impl TextPresence {
    fn absent(reason: &str) -> Self {
        Self {
            detected: false,
            extracted_text: None,
            error_reason: Some(reason.into()),
        }
    }

    pub fn recognition_failed() -> Self {
        Self::absent(EXTRACTION_FAILED)
    }
}

/// Short or low-confidence recognitions are treated as noise.
pub struct TextPresenceClassifier {
    min_len: usize,
    min_confidence: f64,
}

impl TextPresenceClassifier {
    pub fn new(min_len: usize, min_confidence: f64) -> Self {
        Self {
            min_len,
            min_confidence,
        }
    }

    pub fn classify(&self, recognition: &Recognition) -> TextPresence {
        let text = recognition.text.trim();

        if text.chars().count() >= self.min_len
            && recognition.average_confidence() >= self.min_confidence
        {
            TextPresence {
                detected: true,
                extracted_text: Some(text.to_string()),
                error_reason: None,
            }
        } else {
            TextPresence::absent(NO_TEXT_FOUND)
        }
    }
}

impl Default for TextPresenceClassifier {
    fn default() -> Self {
        Self::new(15, 70.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recognition(text: &str, confidence: f64) -> Recognition {
        Recognition {
            text: text.into(),
            word_confidences: vec![confidence; 3],
        }
    }

    #[test]
    fn test_long_confident_text_is_detected() {
        let result = TextPresenceClassifier::default().classify(&recognition("  twenty characters!  ", 80.0));
        assert!(result.detected);
        assert_eq!(result.extracted_text.as_deref(), Some("twenty characters!"));
        assert!(result.error_reason.is_none());
    }

    #[test]
    fn test_length_threshold_dominates() {
        let result = TextPresenceClassifier::default().classify(&recognition("ten chars!", 95.0));
        assert!(!result.detected);
        assert!(result.extracted_text.is_none());
        assert_eq!(result.error_reason.as_deref(), Some(NO_TEXT_FOUND));
    }

    #[test]
    fn test_low_confidence_is_rejected() {
        let result = TextPresenceClassifier::default().classify(&recognition("exactly twenty chars", 50.0));
        assert!(!result.detected);
        assert_eq!(result.error_reason.as_deref(), Some(NO_TEXT_FOUND));
    }

    #[test]
    fn test_no_words_means_zero_confidence() {
        let rec = Recognition {
            text: "a long enough line of text".into(),
            word_confidences: vec![],
        };
        assert!(!TextPresenceClassifier::default().classify(&rec).detected);
    }

    #[test]
    fn test_recognition_failure() {
        let result = TextPresence::recognition_failed();
        assert!(!result.detected);
        assert_eq!(result.error_reason.as_deref(), Some(EXTRACTION_FAILED));
    }
}
