//! Report processing glue.
//!
//! Drives one uploaded report through text acquisition and parameter
//! extraction and records the outcome as a `ProcessedReport`. Both engines
//! are injected, so the processor is testable with mocks end to end.

use std::path::Path;
#[cfg(feature = "ocr")]
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::PipelineSettings;
use crate::models::{DocumentKind, HealthParameter, ReportStatus};
use crate::pipeline::extraction::ocr::TesseractCli;
use crate::pipeline::extraction::pdfium::PdfiumRenderer;
use crate::pipeline::extraction::types::{ExtractionMethod, OcrEngine, RawDocument};
use crate::pipeline::extraction::{DocumentExtractor, ExtractionError};
use crate::pipeline::parameters::{ExtractionTables, ParameterExtractor, RegistryError};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that stop a report before it is processed at all.
///
/// Extraction failures once the document is loaded are not errors here;
/// they are recorded on the report as `ReportStatus::Failed`.
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Extraction tables invalid: {0}")]
    Tables(#[from] RegistryError),
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Caller choices for a single run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessOptions {
    /// Keep the acquired text on the report (off by default; it may hold PHI).
    pub keep_raw_text: bool,
}

/// Outcome of processing one report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedReport {
    pub id: Uuid,
    pub kind: DocumentKind,
    pub status: ReportStatus,
    /// Empty when processing failed or nothing was recognized.
    pub parameters: Vec<HealthParameter>,
    pub raw_text: Option<String>,
    pub error_message: Option<String>,
    pub method: Option<ExtractionMethod>,
    pub processed_at: DateTime<Utc>,
}

impl ProcessedReport {
    pub fn is_completed(&self) -> bool {
        self.status == ReportStatus::Completed
    }

    pub fn abnormal_count(&self) -> usize {
        self.parameters
            .iter()
            .filter(|p| p.status.is_abnormal())
            .count()
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// file → text → parameters → `ProcessedReport`.
pub struct ReportProcessor {
    extractor: DocumentExtractor,
    parameters: ParameterExtractor,
}

impl ReportProcessor {
    pub fn new(extractor: DocumentExtractor, parameters: ParameterExtractor) -> Self {
        Self {
            extractor,
            parameters,
        }
    }

    /// Load and process a file. The size limit is the extractor's.
    ///
    /// Rejections before any text work (unsupported type, oversized file,
    /// unreadable path) are returned as errors.
    pub fn process_file(
        &self,
        path: &Path,
        hint: Option<DocumentKind>,
        options: ProcessOptions,
    ) -> Result<ProcessedReport, ProcessingError> {
        let document = self.extractor.load_document(path, hint)?;
        Ok(self.process_document(&document, options))
    }

    /// Process an in-memory document. Never fails; failures are on the report.
    pub fn process_document(
        &self,
        document: &RawDocument,
        options: ProcessOptions,
    ) -> ProcessedReport {
        let id = Uuid::new_v4();
        tracing::info!(
            report_id = %id,
            kind = document.kind.as_str(),
            "Processing: starting extraction"
        );

        match self.extractor.extract(document) {
            Ok(outcome) => {
                let parameters = self.parameters.extract_parameters(&outcome.text);
                let report = ProcessedReport {
                    id,
                    kind: document.kind,
                    status: ReportStatus::Completed,
                    parameters,
                    raw_text: options.keep_raw_text.then_some(outcome.text),
                    error_message: None,
                    method: Some(outcome.method),
                    processed_at: Utc::now(),
                };
                tracing::info!(
                    report_id = %id,
                    method = outcome.method.as_str(),
                    parameters = report.parameters.len(),
                    abnormal = report.abnormal_count(),
                    "Processing complete"
                );
                report
            }
            Err(e) => {
                tracing::warn!(report_id = %id, error = %e, "Processing failed");
                ProcessedReport {
                    id,
                    kind: document.kind,
                    status: ReportStatus::Failed,
                    parameters: Vec::new(),
                    raw_text: None,
                    error_message: Some(e.to_string()),
                    method: None,
                    processed_at: Utc::now(),
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Build a `ReportProcessor` with production implementations.
///
/// - Tables: `settings.tables_path` when set, else the built-in tables
/// - OCR: `BundledTesseract` (feature-gated) or the `tesseract` binary
/// - Rasterizer: Pdfium when the library can be bound; without it scanned
///   PDFs stop after the text-layer tiers
pub fn build_processor(settings: &PipelineSettings) -> Result<ReportProcessor, ProcessingError> {
    let tables = match &settings.tables_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading extraction tables");
            ExtractionTables::load(path)?
        }
        None => ExtractionTables::standard(),
    };
    let parameters =
        ParameterExtractor::new(Arc::new(tables)).with_min_line_chars(settings.min_line_chars);

    let mut extractor = DocumentExtractor::new(build_ocr_engine(settings), settings);
    match PdfiumRenderer::new() {
        Ok(renderer) => extractor = extractor.with_pdf_renderer(Box::new(renderer)),
        Err(e) => tracing::warn!(error = %e, "Scanned PDFs will not be OCR'd"),
    }

    Ok(ReportProcessor::new(extractor, parameters))
}

/// Build the OCR engine, respecting feature flags.
fn build_ocr_engine(settings: &PipelineSettings) -> Arc<dyn OcrEngine> {
    #[cfg(feature = "ocr")]
    {
        let tessdata = settings.tessdata_dir.clone().or_else(find_tessdata_dir);
        match crate::pipeline::extraction::ocr::BundledTesseract::new(
            tessdata.as_deref(),
            &settings.ocr_language,
        ) {
            Ok(engine) => {
                tracing::info!(tessdata = ?tessdata, "Bundled Tesseract initialized");
                return Arc::new(engine);
            }
            Err(e) => tracing::warn!(error = %e, "Bundled Tesseract unavailable, using CLI"),
        }
    }

    let cli = TesseractCli::from_settings(settings);
    if !cli.is_available() {
        tracing::warn!("tesseract binary not found; image OCR will fail until it is installed");
    }
    Arc::new(cli)
}

/// Locate a tessdata directory holding `eng.traineddata` in common system paths.
#[cfg(feature = "ocr")]
fn find_tessdata_dir() -> Option<PathBuf> {
    let candidates = [
        "/usr/share/tesseract-ocr/5/tessdata",
        "/usr/share/tesseract-ocr/4.00/tessdata",
        "/usr/share/tessdata",
        "/usr/local/share/tessdata",
        "/opt/homebrew/share/tessdata",
    ];
    candidates
        .iter()
        .map(PathBuf::from)
        .find(|p| p.join("eng.traineddata").exists())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
