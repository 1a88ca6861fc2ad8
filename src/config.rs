//! Application constants and pipeline tunables.
//!
//! Every tunable has a compiled-in default and an `HLRA_*` environment
//! override. Invalid overrides are logged and ignored so a typo in the
//! deployment environment never takes the pipeline down.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Application-level constants
pub const APP_NAME: &str = "HLRA";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "hlra_lib=info,warn"
}

/// Trimmed text shorter than this is "insufficient" and triggers the next tier.
pub const DEFAULT_MIN_CONTENT_CHARS: usize = 50;

/// Upper bound on rasterized pages per document.
pub const DEFAULT_MAX_OCR_PAGES: usize = 10;

/// Rendering resolution for the rasterize-then-OCR tier.
pub const DEFAULT_OCR_DPI: u32 = 300;

/// Images with either side below this are upscaled before OCR.
pub const DEFAULT_MIN_IMAGE_DIMENSION: u32 = 1200;

/// Upload limit for a single report.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 10 * 1024 * 1024; // 10 MB

/// Lines shorter than this cannot hold a `name: value unit` triple.
pub const DEFAULT_MIN_LINE_CHARS: usize = 5;

/// File extensions accepted by `extract_text_from_file`.
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "jpg", "jpeg", "png"];

/// Runtime-tunable pipeline settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub min_content_chars: usize,
    pub max_ocr_pages: usize,
    pub ocr_dpi: u32,
    pub min_image_dimension: u32,
    pub max_file_bytes: u64,
    pub min_line_chars: usize,
    /// Tesseract language(s), e.g. "eng" or "eng+fra".
    pub ocr_language: String,
    /// Explicit tessdata directory (`TESSDATA_PREFIX`).
    pub tessdata_dir: Option<PathBuf>,
    /// Explicit tesseract binary (`HLRA_TESSERACT_PATH`), otherwise `tesseract` from PATH.
    pub tesseract_path: Option<PathBuf>,
    /// JSON extraction tables replacing the built-in ones (`HLRA_TABLES_PATH`).
    pub tables_path: Option<PathBuf>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            min_content_chars: DEFAULT_MIN_CONTENT_CHARS,
            max_ocr_pages: DEFAULT_MAX_OCR_PAGES,
            ocr_dpi: DEFAULT_OCR_DPI,
            min_image_dimension: DEFAULT_MIN_IMAGE_DIMENSION,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            min_line_chars: DEFAULT_MIN_LINE_CHARS,
            ocr_language: "eng".into(),
            tessdata_dir: None,
            tesseract_path: None,
            tables_path: None,
        }
    }
}

impl PipelineSettings {
    /// Defaults overlaid with environment overrides.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup (env in production, a map in tests).
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        override_parsed(&lookup, "HLRA_MIN_CONTENT_CHARS", &mut self.min_content_chars);
        override_parsed(&lookup, "HLRA_MAX_OCR_PAGES", &mut self.max_ocr_pages);
        override_parsed(&lookup, "HLRA_OCR_DPI", &mut self.ocr_dpi);
        override_parsed(&lookup, "HLRA_MIN_IMAGE_DIMENSION", &mut self.min_image_dimension);
        override_parsed(&lookup, "HLRA_MAX_FILE_BYTES", &mut self.max_file_bytes);
        override_parsed(&lookup, "HLRA_MIN_LINE_CHARS", &mut self.min_line_chars);

        if let Some(lang) = lookup("HLRA_OCR_LANG").filter(|l| !l.trim().is_empty()) {
            self.ocr_language = lang.trim().to_string();
        }
        if let Some(dir) = lookup("TESSDATA_PREFIX").filter(|d| !d.trim().is_empty()) {
            self.tessdata_dir = Some(PathBuf::from(dir));
        }
        if let Some(bin) = lookup("HLRA_TESSERACT_PATH").filter(|b| !b.trim().is_empty()) {
            self.tesseract_path = Some(PathBuf::from(bin));
        }
        if let Some(path) = lookup("HLRA_TABLES_PATH").filter(|p| !p.trim().is_empty()) {
            self.tables_path = Some(PathBuf::from(path));
        }

        if self.ocr_dpi == 0 {
            tracing::warn!("HLRA_OCR_DPI must be positive, using {DEFAULT_OCR_DPI}");
            self.ocr_dpi = DEFAULT_OCR_DPI;
        }
        self
    }
}

fn override_parsed<T, F>(lookup: &F, key: &str, slot: &mut T)
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => *slot = value,
        Err(_) => tracing::warn!(key, value = %raw, "Ignoring unparsable setting override"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_reference_design() {
        let s = PipelineSettings::default();
        assert_eq!(s.min_content_chars, 50);
        assert_eq!(s.max_ocr_pages, 10);
        assert_eq!(s.ocr_dpi, 300);
        assert_eq!(s.min_image_dimension, 1200);
        assert_eq!(s.max_file_bytes, 10 * 1024 * 1024);
        assert_eq!(s.min_line_chars, 5);
        assert_eq!(s.ocr_language, "eng");
    }

    #[test]
    fn overrides_are_applied() {
        let s = PipelineSettings::default().with_overrides(lookup_from(&[
            ("HLRA_MAX_OCR_PAGES", "3"),
            ("HLRA_OCR_DPI", " 200 "),
            ("HLRA_OCR_LANG", "eng+fra"),
            ("TESSDATA_PREFIX", "/opt/tessdata"),
            ("HLRA_TABLES_PATH", "/etc/hlra/tables.json"),
        ]));
        assert_eq!(s.max_ocr_pages, 3);
        assert_eq!(s.ocr_dpi, 200);
        assert_eq!(s.ocr_language, "eng+fra");
        assert_eq!(s.tessdata_dir, Some(PathBuf::from("/opt/tessdata")));
        assert_eq!(s.tables_path, Some(PathBuf::from("/etc/hlra/tables.json")));
    }

    #[test]
    fn invalid_overrides_keep_defaults() {
        let s = PipelineSettings::default().with_overrides(lookup_from(&[
            ("HLRA_MIN_CONTENT_CHARS", "lots"),
            ("HLRA_OCR_DPI", "0"),
            ("HLRA_OCR_LANG", "   "),
        ]));
        assert_eq!(s.min_content_chars, DEFAULT_MIN_CONTENT_CHARS);
        assert_eq!(s.ocr_dpi, DEFAULT_OCR_DPI);
        assert_eq!(s.ocr_language, "eng");
    }

    #[test]
    fn settings_deserialize_with_missing_fields() {
        let s: PipelineSettings = serde_json::from_str(r#"{"max_ocr_pages": 4}"#).unwrap();
        assert_eq!(s.max_ocr_pages, 4);
        assert_eq!(s.min_content_chars, DEFAULT_MIN_CONTENT_CHARS);
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, env!("CARGO_PKG_VERSION"));
    }
}
