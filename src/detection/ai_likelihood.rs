//! AI-generation likelihood.
//!
//! No available classifier has an "AI-generated" class, so the score of one
//! unrelated proxy category is reused as a stand-in. The result is a weak,
//! experimental signal and is labelled as such wherever it is shown.

use serde::{Deserialize, Serialize};

use super::Prediction;

/// Category the browser model exposes that is reused as the proxy.
pub const DEFAULT_PROXY_CATEGORY: &str = "Hentai";

pub const EXPERIMENTAL_NOTICE: &str = "Experimental: based on a proxy category of a general \
     image classifier, not a real AI-generation detector. Accuracy is not guaranteed.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Likelihood {
    Positive,
    Negative,
}

impl Likelihood {
    pub fn describe(&self) -> &'static str {
        match self {
            Likelihood::Positive => "Possibly AI-generated",
            Likelihood::Negative => "Not AI-generated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiLikelihood {
    pub label: Likelihood,
    pub confidence_percent: u8,
    pub notice: String,
}

impl AiLikelihood {
    pub fn summary(&self) -> String {
        format!(
            "{}% chance this image is {}.",
            self.confidence_percent,
            self.label.describe()
        )
    }
}

pub struct AiLikelihoodClassifier {
    proxy_category: String,
}

impl AiLikelihoodClassifier {
    pub fn new(proxy_category: impl Into<String>) -> Self {
        Self {
            proxy_category: proxy_category.into(),
        }
    }

    pub fn proxy_category(&self) -> &str {
        &self.proxy_category
    }

    pub fn classify(&self, predictions: &[Prediction]) -> AiLikelihood {
        let proxy = predictions
            .iter()
            .find(|p| p.class_name == self.proxy_category);

        let (label, confidence_percent) = match proxy {
            Some(p) => {
                let probability = if p.probability.is_finite() {
                    p.probability.clamp(0.0, 1.0)
                } else {
                    0.0
                };
                (Likelihood::Positive, (probability * 100.0).round() as u8)
            }
            None => (Likelihood::Negative, 0),
        };

        AiLikelihood {
            label,
            confidence_percent,
            notice: EXPERIMENTAL_NOTICE.into(),
        }
    }
}

impl Default for AiLikelihoodClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_PROXY_CATEGORY)
    }
}
