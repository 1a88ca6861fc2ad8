use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

use tempfile::TempDir;

use super::types::{OcrEngine, OcrOptions, OcrPageResult};
use super::ExtractionError;
use crate::config::PipelineSettings;

/// Characters the rasterized-PDF OCR pass may emit. Space is included so
/// words stay separated.
pub const LAB_REPORT_WHITELIST: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789.,()/:-%+<>=[] ";

// ── TesseractCli ──────────────────────────────────────────

/// Tesseract via its command-line binary.
///
/// The image is written to a scoped temp directory that is removed when the
/// call returns, on success and on every error path.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    binary: PathBuf,
    tessdata_dir: Option<PathBuf>,
}

impl TesseractCli {
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            tessdata_dir: None,
        }
    }

    pub fn from_settings(settings: &PipelineSettings) -> Self {
        let mut cli = Self::new();
        if let Some(bin) = &settings.tesseract_path {
            cli = cli.with_binary(bin);
        }
        if let Some(dir) = &settings.tessdata_dir {
            cli = cli.with_tessdata_dir(dir);
        }
        cli
    }

    pub fn with_binary(mut self, binary: &Path) -> Self {
        self.binary = binary.to_path_buf();
        self
    }

    pub fn with_tessdata_dir(mut self, dir: &Path) -> Self {
        self.tessdata_dir = Some(dir.to_path_buf());
        self
    }

    /// Whether the binary can be executed at all.
    pub fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn build_args(&self, image_path: &Path, options: &OcrOptions) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            image_path.as_os_str().to_os_string(),
            "stdout".into(),
            "-l".into(),
            options.language.clone().into(),
            "--psm".into(),
            options.page_seg_mode.as_psm().to_string().into(),
        ];
        if let Some(dir) = &self.tessdata_dir {
            args.push("--tessdata-dir".into());
            args.push(dir.as_os_str().to_os_string());
        }
        if let Some(whitelist) = &options.char_whitelist {
            args.push("-c".into());
            args.push(format!("tessedit_char_whitelist={whitelist}").into());
        }
        args
    }
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrEngine for TesseractCli {
    fn ocr_image(
        &self,
        image_bytes: &[u8],
        options: &OcrOptions,
    ) -> Result<OcrPageResult, ExtractionError> {
        let temp_dir = TempDir::new()?;
        let image_path = temp_dir.path().join("page.png");
        std::fs::write(&image_path, image_bytes)?;

        let output = Command::new(&self.binary)
            .args(self.build_args(&image_path, options))
            .output();

        match output {
            Ok(output) if output.status.success() => Ok(OcrPageResult {
                text: String::from_utf8_lossy(&output.stdout).into_owned(),
                confidence: None,
            }),
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(ExtractionError::OcrProcessing(format!(
                    "tesseract exited with {}: {}",
                    output.status,
                    stderr.trim()
                )))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ExtractionError::OcrInit(
                format!("{} not found (install tesseract-ocr)", self.binary.display()),
            )),
            Err(e) => Err(ExtractionError::Io(e)),
        }
    }
}

// ── BundledTesseract ──────────────────────────────────────

/// Tesseract linked in-process through libtesseract.
/// Only available when compiled with the `ocr` feature flag.
#[cfg(feature = "ocr")]
pub struct BundledTesseract {
    tessdata_dir: Option<PathBuf>,
}

#[cfg(feature = "ocr")]
impl BundledTesseract {
    /// `tessdata_dir = None` defers to `TESSDATA_PREFIX` / the library default.
    pub fn new(tessdata_dir: Option<&Path>, language: &str) -> Result<Self, ExtractionError> {
        if let Some(dir) = tessdata_dir {
            for lang in language.split('+') {
                if !dir.join(format!("{lang}.traineddata")).exists() {
                    return Err(ExtractionError::OcrInit(format!(
                        "{lang}.traineddata not found in {}",
                        dir.display()
                    )));
                }
            }
        }
        Ok(Self {
            tessdata_dir: tessdata_dir.map(Path::to_path_buf),
        })
    }

    pub fn from_settings(settings: &PipelineSettings) -> Result<Self, ExtractionError> {
        Self::new(settings.tessdata_dir.as_deref(), &settings.ocr_language)
    }
}

#[cfg(feature = "ocr")]
impl OcrEngine for BundledTesseract {
    fn ocr_image(
        &self,
        image_bytes: &[u8],
        options: &OcrOptions,
    ) -> Result<OcrPageResult, ExtractionError> {
        let tessdata_str = match &self.tessdata_dir {
            Some(dir) => Some(
                dir.to_str()
                    .ok_or_else(|| ExtractionError::OcrInit("Invalid tessdata path".into()))?,
            ),
            None => None,
        };

        let tess = tesseract::Tesseract::new(tessdata_str, Some(&options.language))
            .map_err(|e| ExtractionError::OcrInit(format!("{e:?}")))?;

        let tess = match &options.char_whitelist {
            Some(whitelist) => tess
                .set_variable("tessedit_char_whitelist", whitelist)
                .map_err(|e| ExtractionError::OcrInit(format!("Failed to set whitelist: {e:?}")))?,
            None => tess,
        };

        let mut tess = tess
            .set_image_from_mem(image_bytes)
            .map_err(|e| ExtractionError::OcrProcessing(format!("{e:?}")))?;

        tess.set_page_seg_mode(match options.page_seg_mode {
            super::types::PageSegMode::Auto => tesseract::PageSegMode::PsmAuto,
            super::types::PageSegMode::SingleBlock => tesseract::PageSegMode::PsmSingleBlock,
        });

        let text = tess
            .get_text()
            .map_err(|e| ExtractionError::OcrProcessing(format!("{e:?}")))?;

        let confidence = tess.mean_text_conf().max(0) as f32 / 100.0;

        Ok(OcrPageResult {
            text,
            confidence: Some(confidence),
        })
    }
}

// ── Mock for testing ──────────────────────────────────────

/// Mock OCR engine for unit testing without Tesseract.
///
/// Returns the configured text for every call and records the options it
/// was called with. Calls listed in `failing_calls` (0-based) return an error.
pub struct MockOcrEngine {
    text: String,
    failing_calls: Vec<usize>,
    calls: Mutex<Vec<OcrOptions>>,
}

impl MockOcrEngine {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            failing_calls: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(mut self, calls: &[usize]) -> Self {
        self.failing_calls = calls.to_vec();
        self
    }

    pub fn calls(&self) -> Vec<OcrOptions> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl OcrEngine for MockOcrEngine {
    fn ocr_image(
        &self,
        _image_bytes: &[u8],
        options: &OcrOptions,
    ) -> Result<OcrPageResult, ExtractionError> {
        let call_index = match self.calls.lock() {
            Ok(mut calls) => {
                calls.push(options.clone());
                calls.len() - 1
            }
            Err(_) => return Err(ExtractionError::OcrProcessing("mock poisoned".into())),
        };

        if self.failing_calls.contains(&call_index) {
            return Err(ExtractionError::OcrProcessing(format!(
                "mock failure on call {call_index}"
            )));
        }

        Ok(OcrPageResult {
            text: self.text.clone(),
            confidence: Some(0.9),
        })
    }
}
