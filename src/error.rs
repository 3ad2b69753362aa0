use thiserror::Error;

#[derive(Error, Debug)]
pub enum InsightError {
    #[error("Image decoding error: {0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("PDF export error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("File too large: {size} bytes (limit: {limit} bytes)")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("Field formatting error: {0}")]
    FieldFormat(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Analysis was superseded by a newer image")]
    Superseded,

    #[error("Report is incomplete: {0} still pending")]
    IncompleteReport(String),
}

impl InsightError {
    /// True for errors raised before any analysis starts (wrong type, oversized file).
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            InsightError::UnsupportedFormat(_) | InsightError::FileTooLarge { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, InsightError>;
