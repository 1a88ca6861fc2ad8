//! Page rasterization through PDFium for the rasterize-then-OCR tier.
//!
//! `pdfium_render::Pdfium` is `!Send`, so every call binds the library
//! afresh; the dynamic loader caches the handle after the first bind.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use image::ImageOutputFormat;
use pdfium_render::prelude::*;

use super::types::PdfPageRenderer;
use super::ExtractionError;

/// Longest side of a rendered page, whatever the DPI asks for.
const MAX_RENDER_SIDE_PX: u32 = 4096;

const POINTS_PER_INCH: f32 = 72.0;

/// Env var naming an explicit PDFium shared library.
pub const PDFIUM_LIB_ENV: &str = "PDFIUM_DYNAMIC_LIB_PATH";

// ═══════════════════════════════════════════════════════════
// Render sizing
// ═══════════════════════════════════════════════════════════

/// Target bitmap size for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RenderSize {
    width: u32,
    height: u32,
    /// True when the side guard shrank the page below the requested DPI.
    capped: bool,
}

impl RenderSize {
    fn for_page(width_pt: f32, height_pt: f32, dpi: u32) -> Self {
        let scale = dpi as f32 / POINTS_PER_INCH;
        let w = (width_pt * scale).max(1.0);
        let h = (height_pt * scale).max(1.0);
        let longest = w.max(h);

        if longest <= MAX_RENDER_SIDE_PX as f32 {
            return Self {
                width: w as u32,
                height: h as u32,
                capped: false,
            };
        }

        let shrink = MAX_RENDER_SIDE_PX as f32 / longest;
        Self {
            width: ((w * shrink) as u32).clamp(1, MAX_RENDER_SIDE_PX),
            height: ((h * shrink) as u32).clamp(1, MAX_RENDER_SIDE_PX),
            capped: true,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// PdfiumRenderer
// ═══════════════════════════════════════════════════════════

/// Renders PDF pages to PNG with PDFium.
///
/// Library lookup: explicit path, then `PDFIUM_DYNAMIC_LIB_PATH`, then the
/// executable's directory, then the system search path.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRenderer {
    library_path: Option<PathBuf>,
}

impl PdfiumRenderer {
    /// Fails with `RendererUnavailable` when no PDFium library can be bound.
    pub fn new() -> Result<Self, ExtractionError> {
        let renderer = Self::default();
        renderer.bind()?;
        Ok(renderer)
    }

    pub fn with_library_path(path: &Path) -> Result<Self, ExtractionError> {
        let renderer = Self {
            library_path: Some(path.to_path_buf()),
        };
        renderer.bind()?;
        Ok(renderer)
    }

    fn bind(&self) -> Result<Pdfium, ExtractionError> {
        let explicit = self
            .library_path
            .clone()
            .or_else(|| std::env::var_os(PDFIUM_LIB_ENV).map(PathBuf::from));

        if let Some(path) = explicit {
            let bindings = Pdfium::bind_to_library(&path).map_err(|e| {
                ExtractionError::RendererUnavailable(format!("{}: {e}", path.display()))
            })?;
            return Ok(Pdfium::new(bindings));
        }

        let beside_exe = std::env::current_exe().ok().and_then(|exe| {
            exe.parent()
                .map(|dir| Pdfium::pdfium_platform_library_name_at_path(dir.to_string_lossy().as_ref()))
        });
        if let Some(bindings) = beside_exe.and_then(|lib| Pdfium::bind_to_library(&lib).ok()) {
            return Ok(Pdfium::new(bindings));
        }

        Pdfium::bind_to_system_library()
            .map(Pdfium::new)
            .map_err(|e| {
                ExtractionError::RendererUnavailable(format!(
                    "no system PDFium ({e}); set {PDFIUM_LIB_ENV}"
                ))
            })
    }
}

/// Password-protected documents get their own kind; anything else means the
/// document itself could not be loaded.
fn open_error(e: PdfiumError) -> ExtractionError {
    let reason = e.to_string();
    let lower = reason.to_lowercase();
    if lower.contains("password") || lower.contains("encrypt") {
        ExtractionError::PdfEncrypted
    } else {
        ExtractionError::PdfParsing(reason)
    }
}

impl PdfPageRenderer for PdfiumRenderer {
    fn page_count(&self, pdf_bytes: &[u8]) -> Result<usize, ExtractionError> {
        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf_bytes, None)
            .map_err(open_error)?;
        Ok(document.pages().len() as usize)
    }

    fn render_page(
        &self,
        pdf_bytes: &[u8],
        page_index: usize,
        dpi: u32,
    ) -> Result<Vec<u8>, ExtractionError> {
        let render_err = |reason: String| ExtractionError::PdfRendering {
            page: page_index + 1,
            reason,
        };

        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf_bytes, None)
            .map_err(open_error)?;
        let pages = document.pages();
        let page = u16::try_from(page_index)
            .ok()
            .and_then(|i| pages.get(i).ok())
            .ok_or_else(|| render_err(format!("no such page (document has {})", pages.len())))?;

        let size = RenderSize::for_page(page.width().value, page.height().value, dpi);
        if size.capped {
            tracing::warn!(
                page = page_index + 1,
                width = size.width,
                height = size.height,
                dpi,
                "Oversized page rendered below requested DPI"
            );
        }

        let config = PdfRenderConfig::new()
            .set_target_width(size.width as i32)
            .set_maximum_height(size.height as i32);
        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| render_err(e.to_string()))?;

        let mut png = Cursor::new(Vec::new());
        bitmap
            .as_image()
            .write_to(&mut png, ImageOutputFormat::Png)
            .map_err(|e| ExtractionError::ImageProcessing(format!("page PNG encode: {e}")))?;

        tracing::debug!(
            page = page_index + 1,
            width = size.width,
            height = size.height,
            "Page rasterized"
        );
        Ok(png.into_inner())
    }
}

// ── Mock for testing ──────────────────────────────────────

/// Mock renderer returning a small gray PNG for each valid page.
///
/// Records the pages it rendered. Optional hooks make chosen pages fail or
/// raise a cancellation flag once a page has been rendered.
pub struct MockPdfPageRenderer {
    page_count: usize,
    failing_pages: Vec<usize>,
    cancel_after: Option<(usize, Arc<AtomicBool>)>,
    rendered: Mutex<Vec<usize>>,
}

impl MockPdfPageRenderer {
    pub fn new(page_count: usize) -> Self {
        Self {
            page_count,
            failing_pages: Vec::new(),
            cancel_after: None,
            rendered: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_pages(mut self, pages: &[usize]) -> Self {
        self.failing_pages = pages.to_vec();
        self
    }

    /// Set `flag` right after rendering `page_index`.
    pub fn cancel_after(mut self, page_index: usize, flag: Arc<AtomicBool>) -> Self {
        self.cancel_after = Some((page_index, flag));
        self
    }

    pub fn rendered_pages(&self) -> Vec<usize> {
        self.rendered.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl PdfPageRenderer for MockPdfPageRenderer {
    fn page_count(&self, _pdf_bytes: &[u8]) -> Result<usize, ExtractionError> {
        Ok(self.page_count)
    }

    fn render_page(
        &self,
        _pdf_bytes: &[u8],
        page_index: usize,
        _dpi: u32,
    ) -> Result<Vec<u8>, ExtractionError> {
        if page_index >= self.page_count || self.failing_pages.contains(&page_index) {
            return Err(ExtractionError::PdfRendering {
                page: page_index + 1,
                reason: format!("mock cannot render page index {page_index}"),
            });
        }
        if let Ok(mut rendered) = self.rendered.lock() {
            rendered.push(page_index);
        }
        if let Some((after, flag)) = &self.cancel_after {
            if *after == page_index {
                flag.store(true, Ordering::SeqCst);
            }
        }
        mock_page_png()
    }
}

/// 200x100 light-gray PNG.
fn mock_page_png() -> Result<Vec<u8>, ExtractionError> {
    let img = image::GrayImage::from_pixel(200, 100, image::Luma([200u8]));
    let mut buf = Cursor::new(Vec::new());
    image::DynamicImage::ImageLuma8(img)
        .write_to(&mut buf, ImageOutputFormat::Png)
        .map_err(|e| ExtractionError::ImageProcessing(e.to_string()))?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    #[test]
    fn a4_at_300dpi_is_not_capped() {
        let size = RenderSize::for_page(595.0, 842.0, 300);
        assert!((2470..=2480).contains(&size.width), "got {}", size.width);
        assert!((3500..=3510).contains(&size.height), "got {}", size.height);
        assert!(!size.capped);
    }

    #[test]
    fn oversized_page_is_capped_keeping_aspect() {
        let size = RenderSize::for_page(2000.0, 4000.0, 300);
        assert!(size.capped);
        assert!((4090..=MAX_RENDER_SIDE_PX).contains(&size.height), "got {}", size.height);
        assert!((2040..=2050).contains(&size.width), "got {}", size.width);
    }

    #[test]
    fn degenerate_page_still_renders_one_pixel() {
        let size = RenderSize::for_page(0.0, 0.0, 300);
        assert_eq!((size.width, size.height), (1, 1));
    }

    #[test]
    fn low_dpi_scales_down() {
        let size = RenderSize::for_page(612.0, 792.0, 72);
        assert_eq!((size.width, size.height), (612, 792));
    }

    #[test]
    fn missing_library_path_is_unavailable() {
        let err = PdfiumRenderer::with_library_path(Path::new("/nonexistent/libpdfium.so"))
            .unwrap_err();
        assert!(matches!(err, ExtractionError::RendererUnavailable(_)));
    }

    #[test]
    fn mock_renders_decodable_png() {
        let mock = MockPdfPageRenderer::new(3);
        let png = mock.render_page(&[], 0, 300).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.dimensions(), (200, 100));
        assert_eq!(mock.rendered_pages(), vec![0]);
    }

    #[test]
    fn mock_fails_requested_and_missing_pages() {
        let mock = MockPdfPageRenderer::new(3).failing_pages(&[1]);
        assert!(matches!(
            mock.render_page(&[], 3, 300),
            Err(ExtractionError::PdfRendering { page: 4, .. })
        ));
        let err = mock.render_page(&[], 1, 300).unwrap_err();
        assert_eq!(err.to_string(), "PDF rendering failed on page 2: mock cannot render page index 1");
        assert!(mock.render_page(&[], 1, 300).is_err());
        assert!(mock.render_page(&[], 2, 300).is_ok());
        assert_eq!(mock.rendered_pages(), vec![2]);
    }

    #[test]
    fn mock_sets_cancel_flag_after_chosen_page() {
        let flag = Arc::new(AtomicBool::new(false));
        let mock = MockPdfPageRenderer::new(4).cancel_after(1, flag.clone());
        mock.render_page(&[], 0, 300).unwrap();
        assert!(!flag.load(Ordering::SeqCst));
        mock.render_page(&[], 1, 300).unwrap();
        assert!(flag.load(Ordering::SeqCst));
    }
}
