//! Error types for the ghabz-core library.

use thiserror::Error;

/// Main error type for the ghabz library.
#[derive(Error, Debug)]
pub enum GhabzError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to open PDF: {0}")]
    Open(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Page index beyond the document length (0-based).
    #[error("invalid page index: {0}")]
    InvalidPage(u32),

    /// Failed to collect positioned text from a page.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// The table detector failed on a region.
    #[error("table detection failed: {0}")]
    TableDetection(String),

    /// Failed to read or write a crop box.
    #[error("crop failed: {0}")]
    Crop(String),
}

impl PdfError {
    /// Whether this error means the source document itself is unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PdfError::Open(_) | PdfError::Encrypted)
    }
}

/// Result type for the ghabz library.
pub type Result<T> = std::result::Result<T, GhabzError>;
