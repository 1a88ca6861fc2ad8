//! Text acquisition: PDF tier cascade and image OCR.

pub mod format;
pub mod ocr;
pub mod orchestrator;
pub mod pdf;
pub mod pdfium;
pub mod preprocess;
pub mod strategy;
pub mod types;

pub use format::*;
pub use ocr::*;
pub use orchestrator::*;
pub use pdf::*;
pub use pdfium::{MockPdfPageRenderer, PdfiumRenderer};
pub use preprocess::OcrPreprocessor;
pub use strategy::*;
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("File is {size} bytes, limit is {limit}")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("OCR engine initialization failed: {0}")]
    OcrInit(String),

    #[error("OCR processing failed: {0}")]
    OcrProcessing(String),

    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),

    /// `page` is 1-based.
    #[error("PDF rendering failed on page {page}: {reason}")]
    PdfRendering { page: usize, reason: String },

    #[error("PDF is password-protected")]
    PdfEncrypted,

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("PDF renderer unavailable: {0}")]
    RendererUnavailable(String),

    #[error("Extraction cancelled")]
    Cancelled,

    #[error("Text extraction failed: {0}")]
    Failed(#[source] Box<ExtractionError>),
}

impl ExtractionError {
    /// Wrap as the pipeline-fatal `Failed` kind. Idempotent; unsupported
    /// formats and cancellation keep their own kind.
    pub fn into_failed(self) -> Self {
        match self {
            Self::Failed(_) | Self::UnsupportedFormat(_) | Self::Cancelled => self,
            other => Self::Failed(Box::new(other)),
        }
    }

    /// The root cause beneath any `Failed` wrapping.
    pub fn root_cause(&self) -> &ExtractionError {
        match self {
            Self::Failed(inner) => inner.root_cause(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn into_failed_wraps_once() {
        let err = ExtractionError::PdfParsing("bad xref".into()).into_failed();
        assert!(matches!(err, ExtractionError::Failed(_)));
        let again = err.into_failed();
        match again {
            ExtractionError::Failed(inner) => {
                assert!(matches!(*inner, ExtractionError::PdfParsing(_)))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unsupported_format_stays_distinguishable() {
        let err = ExtractionError::UnsupportedFormat("docx".into()).into_failed();
        assert!(matches!(err, ExtractionError::UnsupportedFormat(_)));
    }

    #[test]
    fn failed_displays_cause() {
        let err = ExtractionError::Failed(Box::new(ExtractionError::PdfEncrypted));
        assert_eq!(err.to_string(), "Text extraction failed: PDF is password-protected");
        assert!(matches!(err.root_cause(), ExtractionError::PdfEncrypted));
    }
}
