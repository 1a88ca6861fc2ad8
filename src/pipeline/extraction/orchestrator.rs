use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use super::format::read_document;
use super::preprocess::OcrPreprocessor;
use super::strategy::{PdfTextStrategy, RasterizeOcrStrategy, TextLayerStrategy, TierContext};
use super::types::{
    ExtractionMethod, ExtractionOutcome, OcrEngine, OcrOptions, PdfPageRenderer, RawDocument,
};
use super::ExtractionError;
use crate::config::PipelineSettings;
use crate::models::DocumentKind;

/// Text acquisition for uploaded reports.
///
/// PDFs run through the tier cascade (text layer, alternate text layer,
/// then rasterize + OCR when a renderer is configured). Images are
/// preprocessed and OCR'd directly. Collaborators are trait objects so
/// tests can swap in mocks.
pub struct DocumentExtractor {
    ocr_engine: Arc<dyn OcrEngine>,
    preprocessor: OcrPreprocessor,
    pdf_tiers: Vec<Box<dyn PdfTextStrategy>>,
    ocr_language: String,
    min_content_chars: usize,
    max_ocr_pages: usize,
    ocr_dpi: u32,
    max_file_bytes: u64,
    cancel_flag: Option<Arc<AtomicBool>>,
}

impl DocumentExtractor {
    /// Text-layer tiers only. Add the OCR tier with `with_pdf_renderer`.
    pub fn new(ocr_engine: Arc<dyn OcrEngine>, settings: &PipelineSettings) -> Self {
        Self {
            ocr_engine,
            preprocessor: OcrPreprocessor::from_settings(settings),
            pdf_tiers: vec![
                Box::new(TextLayerStrategy::primary()),
                Box::new(TextLayerStrategy::alternate()),
            ],
            ocr_language: settings.ocr_language.clone(),
            min_content_chars: settings.min_content_chars,
            max_ocr_pages: settings.max_ocr_pages,
            ocr_dpi: settings.ocr_dpi,
            max_file_bytes: settings.max_file_bytes,
            cancel_flag: None,
        }
    }

    /// Append the rasterize-then-OCR tier backed by `renderer`.
    pub fn with_pdf_renderer(mut self, renderer: Box<dyn PdfPageRenderer>) -> Self {
        let tier = RasterizeOcrStrategy::new(
            renderer,
            self.ocr_engine.clone(),
            self.preprocessor.clone(),
            &self.ocr_language,
        )
        .with_max_pages(self.max_ocr_pages)
        .with_dpi(self.ocr_dpi);
        self.pdf_tiers.push(Box::new(tier));
        self
    }

    /// Replace the PDF cascade entirely.
    pub fn with_pdf_tiers(mut self, tiers: Vec<Box<dyn PdfTextStrategy>>) -> Self {
        self.pdf_tiers = tiers;
        self
    }

    /// Flag checked between pages; setting it aborts with `Cancelled`.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel_flag = Some(flag);
        self
    }

    /// Methods of the configured PDF tiers, in cascade order.
    pub fn pdf_methods(&self) -> Vec<ExtractionMethod> {
        self.pdf_tiers.iter().map(|t| t.method()).collect()
    }

    /// Acquire text and report which tier produced it.
    pub fn extract(&self, document: &RawDocument) -> Result<ExtractionOutcome, ExtractionError> {
        tracing::info!(
            kind = document.kind.as_str(),
            size = document.bytes.len(),
            "Starting text extraction"
        );

        let outcome = match document.kind {
            DocumentKind::Pdf => self.extract_pdf(&document.bytes),
            DocumentKind::Image => self.extract_image(&document.bytes),
        }
        .map_err(ExtractionError::into_failed)?;

        tracing::info!(
            method = outcome.method.as_str(),
            pages = outcome.pages_processed,
            chars = outcome.text.len(),
            "Text extraction complete"
        );
        Ok(outcome)
    }

    /// Acquire text only. The result is trimmed and may be empty.
    pub fn extract_text(&self, document: &RawDocument) -> Result<String, ExtractionError> {
        self.extract(document).map(|o| o.text)
    }

    /// Load a file (size-checked, dispatched by `hint` or extension) and extract.
    /// Read a file under the configured size limit, without extracting.
    pub fn load_document(
        &self,
        path: &Path,
        hint: Option<DocumentKind>,
    ) -> Result<RawDocument, ExtractionError> {
        read_document(path, hint, self.max_file_bytes)
    }

    pub fn extract_file(
        &self,
        path: &Path,
        hint: Option<DocumentKind>,
    ) -> Result<ExtractionOutcome, ExtractionError> {
        let document = self.load_document(path, hint)?;
        self.extract(&document)
    }

    pub fn extract_text_from_file(
        &self,
        path: &Path,
        hint: Option<DocumentKind>,
    ) -> Result<String, ExtractionError> {
        self.extract_file(path, hint).map(|o| o.text)
    }

    // ── PDF cascade ───────────────────────────────────────

    /// First tier with enough text wins. When none has enough, the last
    /// tier that completed supplies the text; when none completed, the last
    /// error is returned.
    fn extract_pdf(&self, pdf_bytes: &[u8]) -> Result<ExtractionOutcome, ExtractionError> {
        let ctx = TierContext {
            cancel: self.cancel_flag.as_deref(),
        };
        let mut fallback: Option<ExtractionOutcome> = None;
        let mut last_error: Option<ExtractionError> = None;

        for tier in &self.pdf_tiers {
            let method = tier.method();
            match tier.extract(pdf_bytes, &ctx) {
                Ok(output) => {
                    let text = output.text.trim().to_string();
                    let chars = text.chars().count();
                    let outcome = ExtractionOutcome {
                        text,
                        method,
                        pages_processed: output.pages_processed,
                    };
                    if chars >= self.min_content_chars {
                        return Ok(outcome);
                    }
                    tracing::debug!(
                        method = method.as_str(),
                        chars,
                        min = self.min_content_chars,
                        "Insufficient text, trying next tier"
                    );
                    fallback = Some(outcome);
                }
                Err(ExtractionError::Cancelled) => return Err(ExtractionError::Cancelled),
                Err(e) => {
                    tracing::warn!(method = method.as_str(), error = %e, "Extraction tier failed");
                    last_error = Some(e);
                }
            }
        }

        if let Some(outcome) = fallback {
            tracing::warn!(
                method = outcome.method.as_str(),
                chars = outcome.text.len(),
                "No tier produced sufficient text"
            );
            return Ok(outcome);
        }

        Err(last_error.unwrap_or_else(|| {
            ExtractionError::PdfParsing("no PDF extraction tiers configured".into())
        }))
    }

    // ── Image OCR ─────────────────────────────────────────

    fn extract_image(&self, image_bytes: &[u8]) -> Result<ExtractionOutcome, ExtractionError> {
        let prepared = self.preprocessor.preprocess(image_bytes)?;
        let options = OcrOptions::single_block(&self.ocr_language);
        let result = self.ocr_engine.ocr_image(&prepared, &options)?;
        Ok(ExtractionOutcome {
            text: result.text.trim().to_string(),
            method: ExtractionMethod::ImageOcr,
            pages_processed: 1,
        })
    }
}
