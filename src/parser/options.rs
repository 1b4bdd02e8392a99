//! Parsing options and configuration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::ocr::{
    OcrEngine, PageRasterizer, PdftoppmRasterizer, TesseractEngine, DEFAULT_MIN_TEXT_CHARS,
    DEFAULT_OCR_DPI, DEFAULT_OCR_TIMEOUT,
};

/// Options for parsing documents.
#[derive(Clone)]
pub struct ParseOptions {
    /// Error handling mode
    pub error_mode: ErrorMode,

    /// Whether the OCR fallback may run for image-only PDFs
    pub ocr: bool,

    /// Resolution for rendering pages, in dots per inch
    pub ocr_dpi: u32,

    /// Non-whitespace characters below which a PDF counts as image-only
    pub ocr_min_chars: usize,

    /// Bound on the whole OCR stage
    pub ocr_timeout: Duration,

    /// Whether to extract embedded images
    pub extract_images: bool,

    /// Whether to process PDF pages in parallel
    pub parallel: bool,

    /// Page renderer used for OCR and image cropping
    pub rasterizer: Option<Arc<dyn PageRasterizer>>,

    /// Text recognizer used for OCR
    pub ocr_engine: Option<Arc<dyn OcrEngine>>,
}

impl ParseOptions {
    /// Create new parse options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Enable lenient mode (skip invalid content).
    pub fn lenient(mut self) -> Self {
        self.error_mode = ErrorMode::Lenient;
        self
    }

    /// Enable or disable the OCR fallback.
    pub fn with_ocr(mut self, enabled: bool) -> Self {
        self.ocr = enabled;
        self
    }

    /// Disable the OCR fallback.
    pub fn without_ocr(self) -> Self {
        self.with_ocr(false)
    }

    /// Set the OCR render resolution.
    pub fn with_ocr_dpi(mut self, dpi: u32) -> Self {
        self.ocr_dpi = dpi;
        self
    }

    /// Set the minimum text size that counts as usable.
    pub fn with_ocr_min_chars(mut self, chars: usize) -> Self {
        self.ocr_min_chars = chars;
        self
    }

    /// Set the OCR deadline.
    pub fn with_ocr_timeout(mut self, timeout: Duration) -> Self {
        self.ocr_timeout = timeout;
        self
    }

    /// Enable or disable image extraction.
    pub fn with_images(mut self, extract: bool) -> Self {
        self.extract_images = extract;
        self
    }

    /// Enable or disable parallel processing.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Replace the page rasterizer.
    pub fn with_rasterizer(mut self, rasterizer: impl PageRasterizer + 'static) -> Self {
        self.rasterizer = Some(Arc::new(rasterizer));
        self
    }

    /// Remove the page rasterizer. Images fall back to embedded payloads.
    pub fn without_rasterizer(mut self) -> Self {
        self.rasterizer = None;
        self
    }

    /// Replace the OCR engine.
    pub fn with_ocr_engine(mut self, engine: impl OcrEngine + 'static) -> Self {
        self.ocr_engine = Some(Arc::new(engine));
        self
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            error_mode: ErrorMode::Strict,
            ocr: true,
            ocr_dpi: DEFAULT_OCR_DPI,
            ocr_min_chars: DEFAULT_MIN_TEXT_CHARS,
            ocr_timeout: DEFAULT_OCR_TIMEOUT,
            extract_images: true,
            parallel: true,
            rasterizer: Some(Arc::new(PdftoppmRasterizer::new())),
            ocr_engine: Some(Arc::new(TesseractEngine::new())),
        }
    }
}

impl fmt::Debug for ParseOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseOptions")
            .field("error_mode", &self.error_mode)
            .field("ocr", &self.ocr)
            .field("ocr_dpi", &self.ocr_dpi)
            .field("ocr_min_chars", &self.ocr_min_chars)
            .field("ocr_timeout", &self.ocr_timeout)
            .field("extract_images", &self.extract_images)
            .field("parallel", &self.parallel)
            .field("rasterizer", &self.rasterizer.is_some())
            .field(
                "ocr_engine",
                &self.ocr_engine.as_ref().map(|e| e.name().to_string()),
            )
            .finish()
    }
}

/// Error handling mode.
///
/// For single documents, lenient mode skips PDF pages whose content cannot
/// be decoded. For comparisons, lenient mode reports per-input failures
/// and compares whatever parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Fail on any error
    #[default]
    Strict,
    /// Skip invalid content and continue
    Lenient,
}
