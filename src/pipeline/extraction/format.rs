//! Extension-based document type dispatch and upload limits.

use std::path::Path;

use super::types::RawDocument;
use super::ExtractionError;
use crate::config::ALLOWED_EXTENSIONS;
use crate::models::DocumentKind;

/// Map a file extension (with or without the leading dot, any case) to a kind.
pub fn kind_from_extension(ext: &str) -> Result<DocumentKind, ExtractionError> {
    let ext = ext.trim().trim_start_matches('.').to_lowercase();
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(ExtractionError::UnsupportedFormat(ext));
    }
    match ext.as_str() {
        "pdf" => Ok(DocumentKind::Pdf),
        _ => Ok(DocumentKind::Image),
    }
}

/// Classify a path by its extension.
pub fn detect_kind(path: &Path) -> Result<DocumentKind, ExtractionError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| ExtractionError::UnsupportedFormat(path.display().to_string()))?;
    kind_from_extension(ext)
}

/// Read a document from disk, enforcing the size limit before loading it.
///
/// `hint` overrides extension dispatch when the caller already knows the type.
pub fn read_document(
    path: &Path,
    hint: Option<DocumentKind>,
    max_bytes: u64,
) -> Result<RawDocument, ExtractionError> {
    let kind = match hint {
        Some(kind) => kind,
        None => detect_kind(path)?,
    };

    let size = std::fs::metadata(path)?.len();
    if size > max_bytes {
        return Err(ExtractionError::FileTooLarge {
            size,
            limit: max_bytes,
        });
    }

    let bytes = std::fs::read(path)?;
    tracing::debug!(
        path = %path.display(),
        kind = kind.as_str(),
        size = bytes.len(),
        "Document loaded"
    );
    Ok(RawDocument::new(bytes, kind))
}
