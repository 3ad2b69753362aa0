use std::{fs::File, io::BufWriter, path::Path};

use lopdf::{
    Document, Object, ObjectId, Stream,
    content::{Content, Operation},
    dictionary,
};

use crate::{
    detection::ai_likelihood::EXPERIMENTAL_NOTICE,
    error::{InsightError, Result},
    report::{AnalysisReport, Section},
};

#[derive(Debug, Clone)]
pub struct PdfConfig {
    pub title: String,
    pub page_width: i64,
    pub page_height: i64,
    pub margin: i64,
    pub font_size: i64,
    pub line_height: i64,
    /// Characters per line before wrapping (Courier is monospaced).
    pub wrap_columns: usize,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            title: "Image Analyzer".into(),
            page_width: 595,
            page_height: 842,
            margin: 50,
            font_size: 10,
            line_height: 14,
            wrap_columns: 80,
        }
    }
}

/// Plain-text, paginated PDF rendering of a report.
pub struct PdfExporter {
    config: PdfConfig,
}

impl PdfExporter {
    pub fn new() -> Self {
        Self {
            config: PdfConfig::default(),
        }
    }

    pub fn with_config(config: PdfConfig) -> Self {
        Self { config }
    }

    pub fn lines_per_page(&self) -> usize {
        let usable = self.config.page_height - 2 * self.config.margin;
        (usable / self.config.line_height.max(1)).max(1) as usize
    }

    pub fn render(&self, report: &AnalysisReport) -> Result<Vec<u8>> {
        let mut doc = self.build_document(report)?;
        let mut buffer = Vec::new();
        doc.save_to(&mut buffer)?;
        Ok(buffer)
    }

    pub fn save<P: AsRef<Path>>(&self, report: &AnalysisReport, path: P) -> Result<()> {
        let mut doc = self.build_document(report)?;
        let mut writer = BufWriter::new(File::create(path)?);
        doc.save_to(&mut writer)?;
        Ok(())
    }

    fn build_document(&self, report: &AnalysisReport) -> Result<Document> {
        if self.config.wrap_columns == 0 {
            return Err(InsightError::InvalidParameter(
                "PDF wrap width must be positive".into(),
            ));
        }

        let lines: Vec<String> = self
            .report_lines(report)
            .iter()
            .flat_map(|line| wrap(&to_pdf_text(line), self.config.wrap_columns))
            .collect();

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let mut page_ids: Vec<ObjectId> = Vec::new();
        for chunk in lines.chunks(self.lines_per_page()) {
            let content = self.page_content(chunk);
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            page_ids.push(page_id);
        }

        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids.iter().map(|&id| Object::Reference(id)).collect::<Vec<_>>(),
            "Count" => page_ids.len() as i64,
            "Resources" => resources_id,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                self.config.page_width.into(),
                self.config.page_height.into(),
            ],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal(to_pdf_text(&self.config.title)),
            "Producer" => Object::string_literal("image-insight"),
        });
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);

        Ok(doc)
    }

    fn page_content(&self, lines: &[String]) -> Content {
        let top = self.config.page_height - self.config.margin - self.config.font_size;

        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), self.config.font_size.into()]),
            Operation::new("TL", vec![self.config.line_height.into()]),
            Operation::new("Td", vec![self.config.margin.into(), top.into()]),
        ];
        for line in lines {
            operations.push(Operation::new("Tj", vec![Object::string_literal(line.as_str())]));
            operations.push(Operation::new("T*", vec![]));
        }
        operations.push(Operation::new("ET", vec![]));

        Content { operations }
    }

    fn report_lines(&self, report: &AnalysisReport) -> Vec<String> {
        let file = &report.file;
        let mut lines = vec![
            self.config.title.clone(),
            String::new(),
            format!("File Name: {}", file.name),
            format!("File Size: {}", file.size_formatted),
            format!("Format: {}", file.mime_type),
            format!("Image Dimensions: {} x {} pixels", file.width, file.height),
        ];

        if let Some((lat, lon)) = report.location.coordinates() {
            lines.push(format!("Coordinates: {}, {}", lat, lon));
            lines.push(format!(
                "Location: {}",
                report.location.location_name.as_deref().unwrap_or("N/A")
            ));
        }

        lines.push(String::new());
        match &report.main_colors {
            Section::Ready { value } if !value.is_empty() => lines.push(format!(
                "Main Colors: {}",
                value.iter().map(|c| c.to_hex()).collect::<Vec<_>>().join(" ")
            )),
            Section::Ready { .. } => lines.push("Main Colors: none".into()),
            Section::Unavailable { reason } => lines.push(format!("Main Colors: unavailable ({})", reason)),
        }

        match &report.color_distribution {
            Section::Ready { value } => {
                lines.push("Color Distribution:".into());
                for share in &value.shares {
                    lines.push(format!("  {}  {:.2}%", share.swatch.to_hex(), share.percentage));
                }
            }
            Section::Unavailable { reason } => {
                lines.push(format!("Color Distribution: unavailable ({})", reason))
            }
        }

        lines.push(String::new());
        match &report.ai_likelihood {
            Section::Ready { value } => {
                lines.push(format!("AI Generation Probability: {}", value.summary()))
            }
            Section::Unavailable { reason } => {
                lines.push(format!("AI Generation Probability: {}", reason))
            }
        }
        lines.push(EXPERIMENTAL_NOTICE.into());

        match &report.text_presence {
            Section::Ready { value } => match (&value.extracted_text, &value.error_reason) {
                (Some(text), _) => {
                    lines.push("Text Detected: Yes".into());
                    lines.extend(text.lines().map(|l| format!("  {}", l)));
                }
                (None, reason) => lines.push(format!(
                    "Text Detected: No ({})",
                    reason.as_deref().unwrap_or("no reason given")
                )),
            },
            Section::Unavailable { reason } => lines.push(format!("Text Detected: unavailable ({})", reason)),
        }

        if !report.entries.is_empty() {
            lines.push(String::new());
            lines.push("Metadata:".into());
            for entry in &report.entries {
                lines.push(format!("  {}: {}", entry.key, entry.value));
            }
        }

        lines
    }
}

impl Default for PdfExporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps printable ASCII, the only range the standard Courier font renders
/// without an explicit encoding. Tabs become spaces, anything else `?`.
fn to_pdf_text(line: &str) -> String {
    line.chars()
        .map(|c| match c {
            '\t' => ' ',
            c if (' '..='~').contains(&c) => c,
            _ => '?',
        })
        .collect()
}

fn wrap(line: &str, columns: usize) -> Vec<String> {
    if line.is_empty() {
        return vec![String::new()];
    }

    let chars: Vec<char> = line.chars().collect();
    chars
        .chunks(columns)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FormattedEntry, report::tests::sample_report};

    fn contains(haystack: &[u8], needle: &str) -> bool {
        haystack
            .windows(needle.len())
            .any(|w| w == needle.as_bytes())
    }

    #[test]
    fn test_renders_single_page_pdf() {
        let bytes = PdfExporter::new().render(&sample_report()).unwrap();

        assert!(bytes.starts_with(b"%PDF-1.5"));
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
        assert!(contains(&bytes, "File Name: harbour.jpg"));
        assert!(contains(&bytes, "Location: Pittsburgh"));
        assert!(contains(&bytes, "#0c2238"));
    }

    #[test]
    fn test_long_reports_paginate() {
        let mut report = sample_report();
        report.entries = (0..200)
            .map(|i| FormattedEntry {
                key: format!("Tag {}", i),
                value: "value".into(),
            })
            .collect();

        let exporter = PdfExporter::new();
        let bytes = exporter.render(&report).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();

        assert!(doc.get_pages().len() >= 200 / exporter.lines_per_page());
        assert!(doc.get_pages().len() > 1);
    }

    #[test]
    fn test_text_sanitizing_and_wrapping() {
        assert_eq!(to_pdf_text("Zoë\tpark"), "Zo? park");
        assert_eq!(to_pdf_text("caf\u{e9} \u{2192} ok~"), "caf? ? ok~");
        assert_eq!(wrap("abcdefg", 3), vec!["abc", "def", "g"]);
        assert_eq!(wrap("", 3), vec![String::new()]);
    }

    #[test]
    fn test_save_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analysis.pdf");
        PdfExporter::new().save(&sample_report(), &path).unwrap();

        let doc = Document::load(&path).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }
}
