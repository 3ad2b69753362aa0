pub mod pdf;

use std::{fs, path::Path};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    ColorSwatch, FileDetails, FormattedEntry, GeoPoint,
    analysis::color::ColorDistribution,
    detection::{ai_likelihood::AiLikelihood, text_presence::TextPresence},
    error::Result,
};

/// Terminal state of a sub-analysis: its value, or why there is none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Section<T> {
    Ready { value: T },
    Unavailable { reason: String },
}

impl<T> Section<T> {
    pub fn ready(value: T) -> Self {
        Section::Ready { value }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Section::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn from_result(what: &str, result: Result<T>) -> Self {
        match result {
            Ok(value) => Section::ready(value),
            Err(e) => {
                warn!("{} unavailable: {}", what, e);
                Section::unavailable(e.to_string())
            }
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Section::Ready { value } => Some(value),
            Section::Unavailable { .. } => None,
        }
    }
}

/// Everything known about one analyzed image. Built once, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub file: FileDetails,
    pub entries: Vec<FormattedEntry>,
    pub location: GeoPoint,
    pub color_distribution: Section<ColorDistribution>,
    pub main_colors: Section<Vec<ColorSwatch>>,
    pub ai_likelihood: Section<AiLikelihood>,
    pub text_presence: Section<TextPresence>,
}

impl AnalysisReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
