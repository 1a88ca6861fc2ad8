use super::types::{PageText, PdfExtractor};
use super::ExtractionError;

/// PDF text extractor using the pdf-extract crate.
/// Handles digital PDFs with embedded text layers.
pub struct PdfTextExtractor;

impl PdfExtractor for PdfTextExtractor {
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<PageText>, ExtractionError> {
        let page_texts = pdf_extract::extract_text_from_mem_by_pages(pdf_bytes)
            .map_err(|e| ExtractionError::PdfParsing(e.to_string()))?;

        Ok(page_texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| PageText {
                page_number: i + 1,
                text,
            })
            .collect())
    }
}

/// Second text-layer reader built on lopdf's own content-stream decoder.
///
/// Recovers text differently from pdf-extract (no layout reconstruction,
/// per-font encoding lookup), so it sometimes succeeds where the first fails.
pub struct LopdfTextExtractor;

impl PdfExtractor for LopdfTextExtractor {
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<PageText>, ExtractionError> {
        let doc = lopdf::Document::load_mem(pdf_bytes)
            .map_err(|e| ExtractionError::PdfParsing(e.to_string()))?;

        if doc.is_encrypted() {
            return Err(ExtractionError::PdfEncrypted);
        }

        let mut pages = Vec::new();
        for page_number in doc.get_pages().keys() {
            // A page that fails to decode contributes nothing; the rest still count
            match doc.extract_text(&[*page_number]) {
                Ok(text) => pages.push(PageText {
                    page_number: *page_number as usize,
                    text,
                }),
                Err(e) => {
                    tracing::debug!(page = page_number, error = %e, "lopdf could not decode page");
                }
            }
        }
        Ok(pages)
    }
}

/// Mock text-layer reader: fixed page texts, or a parse failure.
pub struct MockPdfExtractor {
    pages: Option<Vec<String>>,
}

impl MockPdfExtractor {
    pub fn with_pages(pages: &[&str]) -> Self {
        Self {
            pages: Some(pages.iter().map(|p| p.to_string()).collect()),
        }
    }

    pub fn failing() -> Self {
        Self { pages: None }
    }
}

impl PdfExtractor for MockPdfExtractor {
    fn extract_pages(&self, _pdf_bytes: &[u8]) -> Result<Vec<PageText>, ExtractionError> {
        match &self.pages {
            Some(pages) => Ok(pages
                .iter()
                .enumerate()
                .map(|(i, text)| PageText {
                    page_number: i + 1,
                    text: text.clone(),
                })
                .collect()),
            None => Err(ExtractionError::PdfParsing("mock parse failure".into())),
        }
    }
}

/// Join page texts with newlines, in page order.
pub fn join_pages(pages: &[PageText]) -> String {
    pages
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
