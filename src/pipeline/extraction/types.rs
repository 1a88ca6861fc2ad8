use serde::{Deserialize, Serialize};

use super::ExtractionError;
use crate::models::DocumentKind;

/// A document handed to text acquisition: bytes plus a type hint.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub bytes: Vec<u8>,
    pub kind: DocumentKind,
}

impl RawDocument {
    pub fn new(bytes: Vec<u8>, kind: DocumentKind) -> Self {
        Self { bytes, kind }
    }

    pub fn pdf(bytes: Vec<u8>) -> Self {
        Self::new(bytes, DocumentKind::Pdf)
    }

    pub fn image(bytes: Vec<u8>) -> Self {
        Self::new(bytes, DocumentKind::Image)
    }
}

/// Which tier produced the final text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Embedded text layer via pdf-extract.
    TextLayer,
    /// Embedded text layer via lopdf's decoder.
    AlternateTextLayer,
    /// Pages rendered to images, then OCR.
    RasterizedOcr,
    /// Direct OCR of an uploaded image.
    ImageOcr,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TextLayer => "text_layer",
            Self::AlternateTextLayer => "alternate_text_layer",
            Self::RasterizedOcr => "rasterized_ocr",
            Self::ImageOcr => "image_ocr",
        }
    }
}

/// Text acquisition result with provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionOutcome {
    pub text: String,
    pub method: ExtractionMethod,
    pub pages_processed: usize,
}

/// Text of one PDF page from a text-layer reader (1-based page number).
#[derive(Debug, Clone, PartialEq)]
pub struct PageText {
    pub page_number: usize,
    pub text: String,
}

/// Tesseract page segmentation modes used by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSegMode {
    /// Fully automatic layout analysis (psm 3).
    Auto,
    /// One uniform block of text (psm 6). Lab reports are a single dense table.
    SingleBlock,
}

impl PageSegMode {
    pub fn as_psm(&self) -> u8 {
        match self {
            Self::Auto => 3,
            Self::SingleBlock => 6,
        }
    }
}

/// Per-call OCR parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrOptions {
    pub language: String,
    pub page_seg_mode: PageSegMode,
    /// Restrict recognized characters. `None` = engine default.
    pub char_whitelist: Option<String>,
}

impl OcrOptions {
    pub fn single_block(language: &str) -> Self {
        Self {
            language: language.to_string(),
            page_seg_mode: PageSegMode::SingleBlock,
            char_whitelist: None,
        }
    }

    pub fn with_whitelist(mut self, whitelist: &str) -> Self {
        self.char_whitelist = Some(whitelist.to_string());
        self
    }
}

/// Raw OCR result from the engine
#[derive(Debug, Clone)]
pub struct OcrPageResult {
    pub text: String,
    /// Mean confidence in 0.0-1.0 when the engine reports one.
    pub confidence: Option<f32>,
}

/// OCR engine abstraction (allows mocking for tests)
pub trait OcrEngine: Send + Sync {
    /// Recognize text in an encoded image (PNG, JPEG, ...).
    fn ocr_image(
        &self,
        image_bytes: &[u8],
        options: &OcrOptions,
    ) -> Result<OcrPageResult, ExtractionError>;
}

/// PDF text-layer reader abstraction
pub trait PdfExtractor: Send + Sync {
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<PageText>, ExtractionError>;
}

/// PDF rasterizer abstraction. Page indices are 0-based.
pub trait PdfPageRenderer: Send + Sync {
    fn page_count(&self, pdf_bytes: &[u8]) -> Result<usize, ExtractionError>;

    /// Render one page to PNG bytes at the given DPI.
    fn render_page(
        &self,
        pdf_bytes: &[u8],
        page_index: usize,
        dpi: u32,
    ) -> Result<Vec<u8>, ExtractionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_block_is_psm_6() {
        let opts = OcrOptions::single_block("eng");
        assert_eq!(opts.page_seg_mode.as_psm(), 6);
        assert!(opts.char_whitelist.is_none());
        assert_eq!(PageSegMode::Auto.as_psm(), 3);
    }

    #[test]
    fn method_serializes_snake_case() {
        for method in [
            ExtractionMethod::TextLayer,
            ExtractionMethod::AlternateTextLayer,
            ExtractionMethod::RasterizedOcr,
            ExtractionMethod::ImageOcr,
        ] {
            let json = serde_json::to_string(&method).unwrap();
            assert_eq!(json, format!("\"{}\"", method.as_str()));
        }
    }

    #[test]
    fn raw_document_constructors() {
        assert_eq!(RawDocument::pdf(vec![1]).kind, DocumentKind::Pdf);
        assert_eq!(RawDocument::image(vec![]).kind, DocumentKind::Image);
    }
}
