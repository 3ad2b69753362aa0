use std::{fs, path::Path, sync::Arc};

use image::DynamicImage;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    analysis::{
        color::{ColorAnalyzer, ColorDistribution},
        palette::{Palette, PaletteExtractor},
    },
    detection::{
        ImageClassifier, TextRecognizer,
        ai_likelihood::{AiLikelihood, AiLikelihoodClassifier},
        text_presence::{TextPresence, TextPresenceClassifier},
    },
    error::{InsightError, Result},
    image_utils::{decode_image, sniff_mime},
    metadata::{
        exif::ExifExtractor,
        formatter::{FormatOptions, FormatterRegistry},
        gps::ReverseGeocoder,
        value::RawMetadata,
    },
    report::{AnalysisReport, Section},
    session::{AnalysisSession, ImageToken, SectionUpdate},
    size::format_bytes,
};

pub mod analysis;
pub mod config;
pub mod detection;
pub mod error;
pub mod image_utils;
pub mod metadata;
pub mod report;
pub mod session;
pub mod size;

const CLASSIFICATION_FAILED: &str = "Unable to analyze the image.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectorConfig {
    pub max_file_size: u64,
    pub accepted_mime_types: Vec<String>,
    pub max_value_len: usize,
    pub max_distribution_entries: usize,
    pub palette_size: usize,
    pub palette_quality: usize,
    pub palette_max_edge: u32,
    pub ai_proxy_category: String,
    pub min_text_len: usize,
    pub min_text_confidence: f64,
    pub date_format: String,
    pub parallel: bool,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            max_file_size: 9 * 1024 * 1024,
            accepted_mime_types: vec![
                "image/jpeg".into(),
                "image/png".into(),
                "image/gif".into(),
            ],
            max_value_len: 100,
            max_distribution_entries: 7,
            palette_size: 5,
            palette_quality: 10,
            palette_max_edge: 256,
            ai_proxy_category: detection::ai_likelihood::DEFAULT_PROXY_CATEGORY.into(),
            min_text_len: 15,
            min_text_confidence: 70.0,
            date_format: FormatOptions::default().date_format,
            parallel: true,
        }
    }
}

/// One user-supplied image file.
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageInput {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColorSwatch(pub [u8; 3]);

impl ColorSwatch {
    pub fn to_hex(&self) -> String {
        let [r, g, b] = self.0;
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedEntry {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub location_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDetails {
    pub name: String,
    pub size: u64,
    pub size_formatted: String,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
}

pub struct ImageInspector {
    config: InspectorConfig,
    formatter: FormatterRegistry,
    classifier: Option<Arc<dyn ImageClassifier>>,
    recognizer: Option<Arc<dyn TextRecognizer>>,
    geocoder: Option<Arc<dyn ReverseGeocoder>>,
    session: Arc<AnalysisSession>,
}

impl ImageInspector {
    pub fn new() -> Self {
        Self::with_config(InspectorConfig::default())
    }

    pub fn with_config(config: InspectorConfig) -> Self {
        let formatter = FormatterRegistry::new(FormatOptions {
            date_format: config.date_format.clone(),
            max_value_len: config.max_value_len,
        });

        Self {
            config,
            formatter,
            classifier: None,
            recognizer: None,
            geocoder: None,
            session: Arc::new(AnalysisSession::new()),
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn ImageClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn with_recognizer(mut self, recognizer: Arc<dyn TextRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    pub fn with_geocoder(mut self, geocoder: Arc<dyn ReverseGeocoder>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    /// Shares a session with other inspectors, e.g. one per UI view.
    pub fn with_session(mut self, session: Arc<AnalysisSession>) -> Self {
        self.session = session;
        self
    }

    pub fn config(&self) -> &InspectorConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<AnalysisSession> {
        &self.session
    }

    /// Rejects oversized or non-image input. Returns the effective MIME type.
    pub fn validate(&self, input: &ImageInput) -> Result<String> {
        let size = input.bytes.len() as u64;
        if size > self.config.max_file_size {
            return Err(InsightError::FileTooLarge {
                size,
                limit: self.config.max_file_size,
            });
        }

        let mime = match input.mime_type.trim() {
            "" => sniff_mime(&input.bytes)
                .ok_or_else(|| InsightError::UnsupportedFormat("unrecognized content".into()))?
                .to_string(),
            declared => declared.to_ascii_lowercase(),
        };

        if !self.config.accepted_mime_types.iter().any(|m| *m == mime) {
            return Err(InsightError::UnsupportedFormat(mime));
        }

        Ok(mime)
    }

    pub fn extract_metadata(&self, bytes: &[u8]) -> RawMetadata {
        ExifExtractor::extract(bytes)
    }

    pub fn format_metadata(&self, metadata: &RawMetadata) -> Vec<FormattedEntry> {
        self.formatter.format_all(metadata)
    }

    pub fn locate(&self, metadata: &RawMetadata) -> GeoPoint {
        let point = GeoPoint::from_metadata(metadata);
        match &self.geocoder {
            Some(geocoder) => point.resolve_with(geocoder.as_ref()),
            None => point,
        }
    }

    pub fn color_distribution(&self, image: &DynamicImage) -> Result<ColorDistribution> {
        ColorAnalyzer::new()
            .with_max_entries(self.config.max_distribution_entries)
            .with_parallel(self.config.parallel)
            .analyze(image)
    }

    pub fn palette(&self, image: &DynamicImage) -> Result<Palette> {
        PaletteExtractor::new(self.config.palette_size)
            .with_quality(self.config.palette_quality)
            .with_max_edge(self.config.palette_max_edge)
            .extract(image)
    }

    pub fn ai_likelihood(&self, image: &DynamicImage) -> Result<AiLikelihood> {
        let classifier = self.classifier.as_ref().ok_or_else(|| {
            InsightError::ExternalService("no image classifier configured".into())
        })?;

        let predictions = classifier.classify(image)?;
        Ok(AiLikelihoodClassifier::new(self.config.ai_proxy_category.clone()).classify(&predictions))
    }

    /// Text presence for an image. A failing recognizer is not an error: it
    /// yields "Unable to extract text.".
    pub fn text_presence(&self, image: &DynamicImage) -> Result<TextPresence> {
        let recognizer = self.recognizer.as_ref().ok_or_else(|| {
            InsightError::ExternalService("no text recognizer configured".into())
        })?;

        let classifier =
            TextPresenceClassifier::new(self.config.min_text_len, self.config.min_text_confidence);

        Ok(match recognizer.recognize(image) {
            Ok(recognition) => classifier.classify(&recognition),
            Err(e) => {
                warn!("Text recognition with {} failed: {}", recognizer.name(), e);
                TextPresence::recognition_failed()
            }
        })
    }

    pub fn analyze_path<P: AsRef<Path>>(&self, path: P) -> Result<AnalysisReport> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        self.analyze(ImageInput::new(name, "", bytes))
    }

    /// Runs the whole pipeline for one image and returns its report.
    ///
    /// Starting an analysis supersedes any earlier one on the same session;
    /// if another image is started before this one settles, this call
    /// returns [`InsightError::Superseded`].
    pub fn analyze(&self, input: ImageInput) -> Result<AnalysisReport> {
        let mime_type = self.validate(&input)?;

        info!("Analyzing {} ({} bytes)", input.name, input.bytes.len());
        let token = self.session.begin(&input.name);

        let image = match decode_image(&input.bytes) {
            Ok(image) => image,
            Err(e) => {
                self.session.cancel(&token);
                return Err(e);
            }
        };

        let metadata = self.extract_metadata(&input.bytes);
        let size = input.bytes.len() as u64;

        self.session.commit(
            &token,
            SectionUpdate::File(FileDetails {
                name: input.name.clone(),
                size,
                size_formatted: format_bytes(size),
                mime_type,
                width: image.width(),
                height: image.height(),
            }),
        );
        self.session
            .commit(&token, SectionUpdate::Entries(self.format_metadata(&metadata)));

        self.run_sub_analyses(&token, &image, &metadata);

        let report = self.session.finish(&token)?;
        info!("Finished analysis of {}", input.name);
        Ok(report)
    }

    fn run_sub_analyses(&self, token: &ImageToken, image: &DynamicImage, metadata: &RawMetadata) {
        let colors = || {
            let section = Section::from_result("color distribution", self.color_distribution(image));
            self.session.commit(token, SectionUpdate::ColorDistribution(section));
        };

        let palette = || {
            let section = Section::from_result(
                "palette",
                self.palette(image).map(|p| p.main_colors()),
            );
            self.session.commit(token, SectionUpdate::MainColors(section));
        };

        let ai = || {
            let section = match &self.classifier {
                None => Section::unavailable("No image classifier configured"),
                Some(_) => match self.ai_likelihood(image) {
                    Ok(result) => Section::ready(result),
                    Err(e) => {
                        warn!("AI likelihood classification failed: {}", e);
                        Section::unavailable(CLASSIFICATION_FAILED)
                    }
                },
            };
            self.session.commit(token, SectionUpdate::AiLikelihood(section));
        };

        let text = || {
            let section = Section::from_result("text presence", self.text_presence(image));
            self.session.commit(token, SectionUpdate::TextPresence(section));
        };

        let location = || {
            self.session.commit(token, SectionUpdate::Location(self.locate(metadata)));
        };

        if self.config.parallel {
            rayon::scope(|s| {
                s.spawn(|_| colors());
                s.spawn(|_| palette());
                s.spawn(|_| ai());
                s.spawn(|_| text());
                s.spawn(|_| location());
            });
        } else {
            colors();
            palette();
            ai();
            text();
            location();
        }
    }
}

impl Default for ImageInspector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swatch_hex() {
        assert_eq!(ColorSwatch([255, 8, 0]).to_hex(), "#ff0800");
    }

    #[test]
    fn test_rejects_oversized_input() {
        let config = InspectorConfig {
            max_file_size: 4,
            ..InspectorConfig::default()
        };
        let inspector = ImageInspector::with_config(config);

        let err = inspector
            .validate(&ImageInput::new("big.png", "image/png", vec![0; 5]))
            .unwrap_err();
        assert!(matches!(err, InsightError::FileTooLarge { size: 5, limit: 4 }));
        assert!(err.is_rejection());
    }

    #[test]
    fn test_rejects_non_images() {
        let inspector = ImageInspector::new();

        let err = inspector
            .validate(&ImageInput::new("notes.txt", "text/plain", b"hello".to_vec()))
            .unwrap_err();
        assert!(matches!(err, InsightError::UnsupportedFormat(_)));

        let err = inspector
            .validate(&ImageInput::new("mystery", "", b"hello".to_vec()))
            .unwrap_err();
        assert!(err.is_rejection());
    }

    #[test]
    fn test_accepts_declared_and_sniffed_types() {
        let inspector = ImageInspector::new();
        let png_magic = b"\x89PNG\r\n\x1a\n".to_vec();

        assert_eq!(
            inspector
                .validate(&ImageInput::new("a.png", "IMAGE/PNG", png_magic.clone()))
                .unwrap(),
            "image/png"
        );
        assert_eq!(
            inspector
                .validate(&ImageInput::new("a", "", png_magic))
                .unwrap(),
            "image/png"
        );
    }
}
