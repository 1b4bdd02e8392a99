//! OCR fallback for image-only PDFs.
//!
//! When primary extraction finds no usable text, each page is rendered to
//! a raster and passed through an OCR engine. Both steps sit behind traits
//! so hosts can plug in their own backends and tests can use fakes.
//!
//! Engine failures never fail the parse: the page keeps empty text and a
//! warning is recorded. Only the overall deadline is fatal.

mod process;

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;
use image::DynamicImage;
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::model::{PageText, TextModel};
use crate::parser::ParseOptions;

pub use process::{PdftoppmRasterizer, TesseractEngine};

/// Default resolution for rendering pages.
pub const DEFAULT_OCR_DPI: u32 = 200;

/// Default minimum number of non-whitespace characters below which a
/// document counts as image-only.
pub const DEFAULT_MIN_TEXT_CHARS: usize = 1;

/// Default bound on the whole OCR stage.
pub const DEFAULT_OCR_TIMEOUT: Duration = Duration::from_secs(120);

/// Renders a single document page to a raster image.
pub trait PageRasterizer: Send + Sync {
    /// Render `page_number` (1-indexed) of `document` at `dpi`.
    fn render_page(&self, document: &[u8], page_number: u32, dpi: u32) -> Result<DynamicImage>;
}

/// Recognizes text in a raster image.
pub trait OcrEngine: Send + Sync {
    /// Engine name, used in warnings.
    fn name(&self) -> &str;

    /// Recognize the text in `image`.
    fn recognize(&self, image: &DynamicImage) -> Result<String>;
}

/// Result of running the fallback over a document.
#[derive(Debug, Clone)]
pub struct OcrOutcome {
    /// Text model with recognized page text substituted in
    pub text: TextModel,
    /// Whether OCR was attempted for at least one page
    pub applied: bool,
    /// Per-page failures that degraded to empty text
    pub warnings: Vec<String>,
}

/// Decides whether OCR is needed and runs it under a deadline.
#[derive(Clone)]
pub struct OcrFallback {
    rasterizer: Option<Arc<dyn PageRasterizer>>,
    engine: Option<Arc<dyn OcrEngine>>,
    dpi: u32,
    min_chars: usize,
    timeout: Duration,
}

impl std::fmt::Debug for OcrFallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrFallback")
            .field("rasterizer", &self.rasterizer.is_some())
            .field("engine", &self.engine.as_ref().map(|e| e.name().to_string()))
            .field("dpi", &self.dpi)
            .field("min_chars", &self.min_chars)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl OcrFallback {
    /// Create a fallback from a rasterizer and an engine.
    pub fn new(
        rasterizer: Option<Arc<dyn PageRasterizer>>,
        engine: Option<Arc<dyn OcrEngine>>,
    ) -> Self {
        Self {
            rasterizer,
            engine,
            dpi: DEFAULT_OCR_DPI,
            min_chars: DEFAULT_MIN_TEXT_CHARS,
            timeout: DEFAULT_OCR_TIMEOUT,
        }
    }

    /// Build the fallback configured by parse options, or `None` when OCR is disabled.
    pub fn from_options(options: &ParseOptions) -> Option<Self> {
        if !options.ocr {
            return None;
        }
        Some(Self {
            rasterizer: options.rasterizer.clone(),
            engine: options.ocr_engine.clone(),
            dpi: options.ocr_dpi,
            min_chars: options.ocr_min_chars,
            timeout: options.ocr_timeout,
        })
    }

    /// Set the render resolution.
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    /// Set the deadline for the whole stage.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the minimum text size that counts as usable.
    pub fn with_min_chars(mut self, min_chars: usize) -> Self {
        self.min_chars = min_chars;
        self
    }

    /// Whether primary extraction yielded too little text.
    pub fn should_run(&self, text: &TextModel) -> bool {
        text.char_count() < self.min_chars.max(1)
    }

    /// Render one page and recognize its text.
    pub fn render_and_recognize(&self, document: &[u8], page_number: u32) -> Result<String> {
        let rasterizer = self
            .rasterizer
            .as_ref()
            .ok_or_else(|| Error::OcrUnavailable("no page rasterizer configured".to_string()))?;
        let engine = self
            .engine
            .as_ref()
            .ok_or_else(|| Error::OcrUnavailable("no OCR engine configured".to_string()))?;

        let image = rasterizer.render_page(document, page_number, self.dpi)?;
        let text = engine.recognize(&image)?;
        Ok(text.trim().to_string())
    }

    /// Recognize every page of `document` and substitute the text into `text`.
    ///
    /// Returns the input unchanged with `applied == false` when primary text
    /// is sufficient. Fails only with [`Error::Timeout`].
    pub fn apply(&self, document: &[u8], text: TextModel) -> Result<OcrOutcome> {
        if !self.should_run(&text) {
            return Ok(OcrOutcome {
                text,
                applied: false,
                warnings: Vec::new(),
            });
        }

        let pages = text.pages.unwrap_or_default();
        if pages.is_empty() {
            return Ok(OcrOutcome {
                text: TextModel::from_pages(pages),
                applied: false,
                warnings: Vec::new(),
            });
        }

        log::info!(
            "No usable text in {} page(s); running OCR at {} dpi",
            pages.len(),
            self.dpi
        );

        let page_numbers: Vec<u32> = pages.iter().map(|p| p.page_number).collect();
        let results = self.recognize_with_deadline(document, page_numbers)?;

        let mut warnings = Vec::new();
        let pages: Vec<PageText> = pages
            .into_iter()
            .zip(results)
            .map(|(page, (page_number, result))| match result {
                Ok(recognized) => PageText {
                    text: recognized,
                    ..page
                },
                Err(e) => {
                    log::warn!("OCR failed for page {}: {}", page_number, e);
                    warnings.push(format!("OCR failed for page {}: {}", page_number, e));
                    page
                }
            })
            .collect();

        Ok(OcrOutcome {
            text: TextModel::from_pages(pages),
            applied: true,
            warnings,
        })
    }

    /// Run recognition on a worker thread, bounded by the configured timeout.
    fn recognize_with_deadline(
        &self,
        document: &[u8],
        page_numbers: Vec<u32>,
    ) -> Result<Vec<(u32, Result<String>)>> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let worker = self.clone();
        let document: Arc<[u8]> = Arc::from(document);

        std::thread::spawn(move || {
            let results: Vec<(u32, Result<String>)> = page_numbers
                .par_iter()
                .map(|&n| (n, worker.render_and_recognize(&document, n)))
                .collect();
            // The receiver is gone if the deadline already passed.
            let _ = tx.send(results);
        });

        match rx.recv_timeout(self.timeout) {
            Ok(results) => Ok(results),
            Err(RecvTimeoutError::Timeout) => Err(Error::Timeout {
                stage: "OCR",
                limit: self.timeout,
            }),
            Err(RecvTimeoutError::Disconnected) => {
                Err(Error::Other("OCR worker exited without a result".to_string()))
            }
        }
    }
}
