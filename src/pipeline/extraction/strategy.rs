//! PDF text acquisition tiers.
//!
//! Each tier is one way of getting text out of a PDF. The orchestrator runs
//! them in order and stops at the first one whose output is long enough.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::ocr::LAB_REPORT_WHITELIST;
use super::pdf::{join_pages, LopdfTextExtractor, PdfTextExtractor};
use super::preprocess::OcrPreprocessor;
use super::types::{ExtractionMethod, OcrEngine, OcrOptions, PdfExtractor, PdfPageRenderer};
use super::ExtractionError;

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Per-run state shared with every tier.
#[derive(Debug, Clone, Copy, Default)]
pub struct TierContext<'a> {
    /// Checked between pages; once set the tier stops with `Cancelled`.
    pub cancel: Option<&'a AtomicBool>,
}

impl TierContext<'_> {
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}

/// Untrimmed text produced by one tier.
#[derive(Debug, Clone, PartialEq)]
pub struct TierOutput {
    pub text: String,
    pub pages_processed: usize,
}

/// One step of the PDF cascade.
pub trait PdfTextStrategy: Send + Sync {
    fn method(&self) -> ExtractionMethod;

    fn extract(
        &self,
        pdf_bytes: &[u8],
        ctx: &TierContext<'_>,
    ) -> Result<TierOutput, ExtractionError>;
}

// ── Text layer ────────────────────────────────────────────

/// Reads the embedded text layer through a `PdfExtractor`.
pub struct TextLayerStrategy {
    reader: Box<dyn PdfExtractor>,
    method: ExtractionMethod,
}

impl TextLayerStrategy {
    pub fn new(reader: Box<dyn PdfExtractor>, method: ExtractionMethod) -> Self {
        Self { reader, method }
    }

    /// Primary reader (pdf-extract, layout-aware).
    pub fn primary() -> Self {
        Self::new(Box::new(PdfTextExtractor), ExtractionMethod::TextLayer)
    }

    /// Alternate reader (lopdf content-stream decoder).
    pub fn alternate() -> Self {
        Self::new(
            Box::new(LopdfTextExtractor),
            ExtractionMethod::AlternateTextLayer,
        )
    }
}

impl PdfTextStrategy for TextLayerStrategy {
    fn method(&self) -> ExtractionMethod {
        self.method
    }

    fn extract(
        &self,
        pdf_bytes: &[u8],
        ctx: &TierContext<'_>,
    ) -> Result<TierOutput, ExtractionError> {
        if ctx.is_cancelled() {
            return Err(ExtractionError::Cancelled);
        }
        let pages = self.reader.extract_pages(pdf_bytes)?;
        Ok(TierOutput {
            text: join_pages(&pages),
            pages_processed: pages.len(),
        })
    }
}

// ── Rasterize + OCR ───────────────────────────────────────

/// Renders pages to images and OCRs each one.
///
/// Pages are processed in order, capped at `max_pages`. A page that fails to
/// render or recognize is logged and left out of the result. Each surviving
/// page is prefixed with a `--- Page N ---` marker (1-based).
pub struct RasterizeOcrStrategy {
    renderer: Box<dyn PdfPageRenderer>,
    ocr_engine: Arc<dyn OcrEngine>,
    preprocessor: OcrPreprocessor,
    options: OcrOptions,
    max_pages: usize,
    dpi: u32,
}

impl RasterizeOcrStrategy {
    pub fn new(
        renderer: Box<dyn PdfPageRenderer>,
        ocr_engine: Arc<dyn OcrEngine>,
        preprocessor: OcrPreprocessor,
        language: &str,
    ) -> Self {
        Self {
            renderer,
            ocr_engine,
            preprocessor,
            options: OcrOptions::single_block(language).with_whitelist(LAB_REPORT_WHITELIST),
            max_pages: crate::config::DEFAULT_MAX_OCR_PAGES,
            dpi: crate::config::DEFAULT_OCR_DPI,
        }
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    fn ocr_page(&self, pdf_bytes: &[u8], page_index: usize) -> Result<String, ExtractionError> {
        let rendered = self.renderer.render_page(pdf_bytes, page_index, self.dpi)?;
        let prepared = self.preprocessor.preprocess(&rendered)?;
        let result = self.ocr_engine.ocr_image(&prepared, &self.options)?;
        tracing::debug!(
            page = page_index + 1,
            chars = result.text.len(),
            confidence = ?result.confidence,
            "Page OCR complete"
        );
        Ok(result.text)
    }
}

impl PdfTextStrategy for RasterizeOcrStrategy {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::RasterizedOcr
    }

    fn extract(
        &self,
        pdf_bytes: &[u8],
        ctx: &TierContext<'_>,
    ) -> Result<TierOutput, ExtractionError> {
        let page_count = self.renderer.page_count(pdf_bytes)?;
        let pages = page_count.min(self.max_pages);
        if page_count > pages {
            tracing::info!(
                page_count,
                max_pages = self.max_pages,
                "Rasterizing only the first pages"
            );
        }

        let mut sections = Vec::with_capacity(pages);
        let mut last_error = None;

        for page_index in 0..pages {
            if ctx.is_cancelled() {
                tracing::info!(page = page_index + 1, "Rasterize OCR cancelled");
                return Err(ExtractionError::Cancelled);
            }
            match self.ocr_page(pdf_bytes, page_index) {
                Ok(text) => {
                    sections.push(format!("--- Page {} ---\n{}", page_index + 1, text.trim()))
                }
                Err(e) => {
                    tracing::warn!(page = page_index + 1, error = %e, "Skipping page");
                    last_error = Some(e);
                }
            }
        }

        // Every page failed: nothing usable, surface the cause
        if sections.is_empty() {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        Ok(TierOutput {
            pages_processed: sections.len(),
            text: sections.join("\n\n"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::ocr::MockOcrEngine;
    use crate::pipeline::extraction::pdf::MockPdfExtractor;
    use crate::pipeline::extraction::pdfium::MockPdfPageRenderer;

    fn rasterizer(renderer: MockPdfPageRenderer, engine: Arc<MockOcrEngine>) -> RasterizeOcrStrategy {
        RasterizeOcrStrategy::new(Box::new(renderer), engine, OcrPreprocessor::new(64), "eng")
    }

    #[test]
    fn text_layer_joins_pages() {
        let tier = TextLayerStrategy::new(
            Box::new(MockPdfExtractor::with_pages(&["Glucose: 95 mg/dl", "TSH: 2.1 mIU/L"])),
            ExtractionMethod::TextLayer,
        );
        let out = tier.extract(b"%PDF", &TierContext::default()).unwrap();
        assert_eq!(out.text, "Glucose: 95 mg/dl\nTSH: 2.1 mIU/L");
        assert_eq!(out.pages_processed, 2);
        assert_eq!(tier.method(), ExtractionMethod::TextLayer);
    }

    #[test]
    fn text_layer_propagates_reader_error() {
        let tier = TextLayerStrategy::new(
            Box::new(MockPdfExtractor::failing()),
            ExtractionMethod::AlternateTextLayer,
        );
        let err = tier.extract(b"%PDF", &TierContext::default()).unwrap_err();
        assert!(matches!(err, ExtractionError::PdfParsing(_)));
    }

    #[test]
    fn default_tiers_report_their_method() {
        assert_eq!(TextLayerStrategy::primary().method(), ExtractionMethod::TextLayer);
        assert_eq!(
            TextLayerStrategy::alternate().method(),
            ExtractionMethod::AlternateTextLayer
        );
    }

    #[test]
    fn rasterize_marks_pages_and_uses_whitelist() {
        let engine = Arc::new(MockOcrEngine::new("Hemoglobin: 13.5 g/dl\n"));
        let tier = rasterizer(MockPdfPageRenderer::new(2), engine.clone());

        let out = tier.extract(b"%PDF", &TierContext::default()).unwrap();
        assert_eq!(
            out.text,
            "--- Page 1 ---\nHemoglobin: 13.5 g/dl\n\n--- Page 2 ---\nHemoglobin: 13.5 g/dl"
        );
        assert_eq!(out.pages_processed, 2);

        let calls = engine.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls
            .iter()
            .all(|c| c.char_whitelist.as_deref() == Some(LAB_REPORT_WHITELIST)));
    }

    #[test]
    fn rasterize_skips_failing_pages() {
        let engine = Arc::new(MockOcrEngine::new("TSH: 2.1 mIU/L"));
        let tier = rasterizer(MockPdfPageRenderer::new(3).failing_pages(&[1]), engine);

        let out = tier.extract(b"%PDF", &TierContext::default()).unwrap();
        assert!(out.text.contains("--- Page 1 ---"));
        assert!(!out.text.contains("--- Page 2 ---"));
        assert!(out.text.contains("--- Page 3 ---"));
        assert_eq!(out.pages_processed, 2);
    }

    #[test]
    fn rasterize_skips_pages_the_engine_rejects() {
        let engine = Arc::new(MockOcrEngine::new("TSH: 2.1 mIU/L").failing_on(&[0]));
        let tier = rasterizer(MockPdfPageRenderer::new(2), engine);

        let out = tier.extract(b"%PDF", &TierContext::default()).unwrap();
        assert!(out.text.starts_with("--- Page 2 ---"));
        assert_eq!(out.pages_processed, 1);
    }

    #[test]
    fn rasterize_all_pages_failing_is_an_error() {
        let engine = Arc::new(MockOcrEngine::new("unused"));
        let tier = rasterizer(MockPdfPageRenderer::new(2).failing_pages(&[0, 1]), engine);

        let err = tier.extract(b"%PDF", &TierContext::default()).unwrap_err();
        // the last failure is surfaced, numbered like the page markers
        assert!(matches!(err, ExtractionError::PdfRendering { page: 2, .. }));
    }

    #[test]
    fn rasterize_caps_page_count() {
        let engine = Arc::new(MockOcrEngine::new("x"));
        let renderer = MockPdfPageRenderer::new(5);
        let tier = rasterizer(renderer, engine.clone()).with_max_pages(2);

        let out = tier.extract(b"%PDF", &TierContext::default()).unwrap();
        assert_eq!(out.pages_processed, 2);
        assert_eq!(engine.calls().len(), 2);
    }

    #[test]
    fn rasterize_stops_between_pages_when_cancelled() {
        let flag = Arc::new(AtomicBool::new(false));
        let engine = Arc::new(MockOcrEngine::new("x"));
        let tier = rasterizer(
            MockPdfPageRenderer::new(4).cancel_after(0, flag.clone()),
            engine.clone(),
        );

        let ctx = TierContext {
            cancel: Some(flag.as_ref()),
        };
        let err = tier.extract(b"%PDF", &ctx).unwrap_err();
        assert!(matches!(err, ExtractionError::Cancelled));
        assert_eq!(engine.calls().len(), 1);
    }

    #[test]
    fn empty_pdf_yields_empty_output() {
        let engine = Arc::new(MockOcrEngine::new("x"));
        let tier = rasterizer(MockPdfPageRenderer::new(0), engine);
        let out = tier.extract(b"%PDF", &TierContext::default()).unwrap();
        assert_eq!(out.text, "");
        assert_eq!(out.pages_processed, 0);
    }
}
