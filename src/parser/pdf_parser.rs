//! PDF document reader using lopdf.
//!
//! Content streams are interpreted sequentially through the backend.
//! The per-page analysis that follows (lines, blocks, tables, words and
//! formatting evidence) only touches extracted spans and runs on rayon
//! when parallel processing is enabled.

use std::io::Cursor;
use std::sync::Arc;

use image::{DynamicImage, ImageFormat};
use lopdf::Document as LopdfDocument;
use rayon::prelude::*;

use crate::error::Result;
use crate::model::{
    BoundingBox, Image, Metadata, PageDimensions, PageLayout, PageText, SourceType, StyledWord,
    Table, TextModel,
};
use crate::ocr::PageRasterizer;

use super::backend::{LopdfBackend, PageId, PdfBackend};
use super::layout::{
    group_lines_into_blocks, group_spans_into_lines, FontStatistics, ImagePlacement,
    LayoutAnalyzer, PageContent, TextLine, TextSpan,
};
use super::options::{ErrorMode, ParseOptions};
use super::raw::{
    FormattingEvidence, MarginEvidence, PageExtent, ParagraphFormat, RawBlock, RawStructure,
    RunFormat, TextBox,
};
use super::table_detector::TableDetector;
use super::StructuralReader;

/// PDF reader.
#[derive(Clone)]
pub struct PdfParser {
    error_mode: ErrorMode,
    parallel: bool,
    extract_images: bool,
    rasterizer: Option<Arc<dyn PageRasterizer>>,
    dpi: u32,
}

impl std::fmt::Debug for PdfParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfParser")
            .field("error_mode", &self.error_mode)
            .field("parallel", &self.parallel)
            .field("extract_images", &self.extract_images)
            .field("rasterizer", &self.rasterizer.is_some())
            .field("dpi", &self.dpi)
            .finish()
    }
}

impl PdfParser {
    /// Create a reader with default options.
    pub fn new() -> Self {
        Self::with_options(&ParseOptions::default())
    }

    /// Create a reader configured by parse options.
    pub fn with_options(options: &ParseOptions) -> Self {
        Self {
            error_mode: options.error_mode,
            parallel: options.parallel,
            extract_images: options.extract_images,
            rasterizer: options.rasterizer.clone(),
            dpi: options.ocr_dpi,
        }
    }

    /// Run extraction against any backend.
    fn extract_from<B: PdfBackend + ?Sized>(
        &self,
        backend: &B,
        data: &[u8],
        mut metadata: Metadata,
    ) -> Result<RawStructure> {
        let mut warnings = Vec::new();
        let analyzer = LayoutAnalyzer::new(backend);

        let mut inputs = Vec::new();
        for (&page_number, &page_id) in &backend.pages() {
            let size = backend.page_size(page_id);
            let content = match analyzer.extract_page(page_id) {
                Ok(content) => content,
                Err(e) if self.error_mode == ErrorMode::Lenient => {
                    log::warn!("Skipping unreadable PDF page {}: {}", page_number, e);
                    warnings.push(format!("Page {} skipped: {}", page_number, e));
                    PageContent::default()
                }
                Err(e) => return Err(e),
            };
            inputs.push(PageInput {
                page_number,
                page_id,
                size,
                content,
            });
        }
        log::debug!("PDF content streams read for {} pages", inputs.len());

        let analyses: Vec<PageAnalysis> = if self.parallel {
            inputs.par_iter().map(analyze_page).collect()
        } else {
            inputs.iter().map(analyze_page).collect()
        };

        let images = if self.extract_images {
            self.collect_images(backend, data, &inputs, &mut warnings)
        } else {
            Vec::new()
        };

        metadata.page_count = Some(inputs.len() as u32);
        metadata.page_dimensions = inputs.iter().map(|p| p.size).collect();
        metadata.has_text_content = analyses.iter().any(|a| !a.text.text.trim().is_empty());

        let mut structure = RawStructure::empty(SourceType::Pdf);
        let mut pages = Vec::with_capacity(analyses.len());
        let mut extents = Vec::with_capacity(analyses.len());
        for analysis in analyses {
            pages.push(analysis.text);
            extents.push(analysis.extent);
            structure.blocks.extend(analysis.blocks);
            structure.tables.extend(analysis.tables);
            structure.formatting.runs.extend(analysis.runs);
            structure.formatting.paragraphs.extend(analysis.paragraphs);
        }
        structure.formatting.margins = MarginEvidence::TextExtents(extents);
        structure.formatting.spacing_observable = false;
        structure.metadata = metadata;
        structure.text = TextModel::from_pages(pages);
        structure.images = images;
        structure.warnings = warnings;

        log::debug!(
            "PDF extracted: {} blocks, {} tables, {} images",
            structure.blocks.len(),
            structure.tables.len(),
            structure.images.len()
        );
        Ok(structure)
    }

    /// Build images for every image XObject painted on each page.
    fn collect_images<B: PdfBackend + ?Sized>(
        &self,
        backend: &B,
        data: &[u8],
        inputs: &[PageInput],
        warnings: &mut Vec<String>,
    ) -> Vec<Image> {
        let mut images = Vec::new();

        for input in inputs {
            let placed: Vec<(&ImagePlacement, _)> = input
                .content
                .placements
                .iter()
                .filter_map(|p| backend.page_image(input.page_id, &p.name).map(|e| (p, e)))
                .collect();
            if placed.is_empty() {
                continue;
            }

            let raster = self.render_page(data, input.page_number, warnings);

            for (n, (placement, embedded)) in placed.into_iter().enumerate() {
                let id = format!("pdf-image-{}-{}", input.page_number, n + 1);
                let bbox = placement_bbox(placement, input.size);

                let cropped = raster
                    .as_ref()
                    .and_then(|page| crop_to_png(page, &bbox, self.dpi));
                let image = match cropped {
                    Some((png, width, height)) => {
                        Image::new(id, png).with_dimensions(width, height)
                    }
                    None => {
                        warnings.push(format!(
                            "{}: page raster unavailable, using embedded image data",
                            id
                        ));
                        let mut image = Image::new(id, embedded.data);
                        if let Some(mime) = embedded.mime_type {
                            image = image.with_mime_type(mime);
                        }
                        if let (Some(w), Some(h)) = (embedded.width, embedded.height) {
                            image = image.with_dimensions(w, h);
                        }
                        image
                    }
                };
                images.push(image.with_placement(input.page_number, bbox));
            }
        }

        images
    }

    fn render_page(
        &self,
        data: &[u8],
        page_number: u32,
        warnings: &mut Vec<String>,
    ) -> Option<DynamicImage> {
        let rasterizer = self.rasterizer.as_ref()?;
        match rasterizer.render_page(data, page_number, self.dpi) {
            Ok(raster) => Some(raster),
            Err(e) => {
                log::warn!("Rendering page {} for image crops failed: {}", page_number, e);
                warnings.push(format!("Page {} could not be rendered: {}", page_number, e));
                None
            }
        }
    }
}

impl Default for PdfParser {
    fn default() -> Self {
        Self::new()
    }
}

impl StructuralReader for PdfParser {
    fn source_type(&self) -> SourceType {
        SourceType::Pdf
    }

    fn extract(&self, data: &[u8]) -> Result<RawStructure> {
        let backend = LopdfBackend::load_bytes(data)?;
        log::debug!("PDF version {}", backend.version());
        let metadata = read_info(backend.raw_doc());
        self.extract_from(&backend, data, metadata)
    }
}

/// Content-stream output for one page.
struct PageInput {
    page_number: u32,
    page_id: PageId,
    size: PageDimensions,
    content: PageContent,
}

/// Everything derived from one page's spans.
struct PageAnalysis {
    text: PageText,
    extent: PageExtent,
    blocks: Vec<RawBlock>,
    tables: Vec<Table>,
    runs: Vec<RunFormat>,
    paragraphs: Vec<ParagraphFormat>,
}

fn analyze_page(input: &PageInput) -> PageAnalysis {
    let page = input.page_number;
    let spans = &input.content.spans;
    let body_size = FontStatistics::from_spans(spans).body_size;

    let lines = group_spans_into_lines(spans.clone());
    let text = lines.iter().map(TextLine::text).collect::<Vec<_>>().join("\n");
    let words: Vec<StyledWord> = lines
        .iter()
        .flat_map(|line| line.spans.iter())
        .flat_map(|span| {
            span.text.split_whitespace().map(move |word| StyledWord {
                text: word.to_string(),
                font: span.font_name.clone(),
                size: span.font_size,
            })
        })
        .collect();

    let text_box = text_box(spans);
    let extent = PageExtent {
        page_number: page,
        width: input.size.width,
        height: input.size.height,
        text_box,
    };

    let runs = spans
        .iter()
        .map(|s| RunFormat {
            font: Some(s.font_name.clone()),
            size: Some(s.font_size),
        })
        .collect();

    let (tables, remaining) = TableDetector::for_page(page).detect(spans.clone());

    let text_left = text_box.map(|b| b.left).unwrap_or(0.0);
    let mut blocks = Vec::new();
    let mut paragraphs = Vec::new();
    for block in group_lines_into_blocks(group_spans_into_lines(remaining), body_size) {
        if block.is_empty() {
            continue;
        }
        let spacings = block.line_spacings();
        paragraphs.push(ParagraphFormat {
            indent_left: Some(block.left() - text_left),
            indent_first_line: (block.lines.len() >= 2)
                .then(|| block.lines[0].x - block.lines[1].x),
            space_before: None,
            space_after: None,
            line_spacing: (!spacings.is_empty())
                .then(|| spacings.iter().sum::<f32>() / spacings.len() as f32),
        });
        blocks.push(RawBlock::sized(
            block.text().trim(),
            page,
            block.font_size(),
            body_size,
        ));
    }

    PageAnalysis {
        text: PageText::new(page, text).with_layout(PageLayout::from_words(&words)),
        extent,
        blocks,
        tables,
        runs,
        paragraphs,
    }
}

/// Box enclosing every span on the page, in PDF user space.
fn text_box(spans: &[TextSpan]) -> Option<TextBox> {
    let first = spans.first()?;
    let initial = TextBox {
        left: first.x,
        right: first.right(),
        top: first.top(),
        bottom: first.bottom(),
    };
    Some(spans.iter().fold(initial, |b, s| TextBox {
        left: b.left.min(s.x),
        right: b.right.max(s.right()),
        top: b.top.max(s.top()),
        bottom: b.bottom.min(s.bottom()),
    }))
}

/// The unit square under the placement transform, flipped to a top-left origin.
fn placement_bbox(placement: &ImagePlacement, size: PageDimensions) -> BoundingBox {
    let corners = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)].map(|(x, y)| placement.ctm.apply(x, y));
    let xs = corners.map(|c| c.0);
    let ys = corners.map(|c| c.1);
    let min = |v: [f32; 4]| v.into_iter().fold(f32::INFINITY, f32::min);
    let max = |v: [f32; 4]| v.into_iter().fold(f32::NEG_INFINITY, f32::max);

    BoundingBox {
        x0: min(xs),
        top: size.height - max(ys),
        x1: max(xs),
        bottom: size.height - min(ys),
    }
    .clip(size.width, size.height)
}

/// Crop a page raster to a box in points and encode it as PNG.
fn crop_to_png(page: &DynamicImage, bbox: &BoundingBox, dpi: u32) -> Option<(Vec<u8>, u32, u32)> {
    let scale = dpi as f32 / 72.0;
    let x = (bbox.x0 * scale).round() as u32;
    let y = (bbox.top * scale).round() as u32;
    let width = ((bbox.width() * scale).round() as u32).min(page.width().saturating_sub(x));
    let height = ((bbox.height() * scale).round() as u32).min(page.height().saturating_sub(y));
    if width == 0 || height == 0 {
        return None;
    }

    let cropped = page.crop_imm(x, y, width, height);
    let mut png = Vec::new();
    match cropped.write_to(&mut Cursor::new(&mut png), ImageFormat::Png) {
        Ok(()) => Some((png, width, height)),
        Err(e) => {
            log::warn!("PNG encoding of image crop failed: {}", e);
            None
        }
    }
}

/// Title, author and creation date from the Info dictionary.
fn read_info(doc: &LopdfDocument) -> Metadata {
    let mut metadata = Metadata::default();

    let info = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|info| match info {
            lopdf::Object::Reference(id) => doc.get_dictionary(*id).ok(),
            lopdf::Object::Dictionary(dict) => Some(dict),
            _ => None,
        });

    if let Some(info_dict) = info {
        let text = |key: &[u8]| {
            get_string_from_dict(info_dict, key).filter(|v| !v.trim().is_empty())
        };
        metadata.title = text(b"Title");
        metadata.author = text(b"Author");
        metadata.created = get_string_from_dict(info_dict, b"CreationDate")
            .and_then(|date| parse_pdf_date(&date));
    }

    metadata
}

/// Helper to get a string from a PDF dictionary.
fn get_string_from_dict(dict: &lopdf::Dictionary, key: &[u8]) -> Option<String> {
    dict.get(key).ok().and_then(|obj| match obj {
        lopdf::Object::String(bytes, _) => {
            // UTF-16BE with BOM is the PDF text string encoding for Unicode
            if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
                let utf16: Vec<u16> = bytes[2..]
                    .chunks_exact(2)
                    .map(|c| u16::from_be_bytes([c[0], c[1]]))
                    .collect();
                String::from_utf16(&utf16).ok()
            } else {
                String::from_utf8(bytes.clone())
                    .ok()
                    .or_else(|| Some(bytes.iter().map(|&b| b as char).collect()))
            }
        }
        lopdf::Object::Name(bytes) => String::from_utf8(bytes.clone()).ok(),
        _ => None,
    })
}

/// Parse a PDF date string (D:YYYYMMDDHHmmSSOHH'mm').
fn parse_pdf_date(s: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    let s = s.strip_prefix("D:").unwrap_or(s);

    // At minimum we need YYYY
    if s.len() < 4 {
        return None;
    }

    let year: i32 = s.get(0..4)?.parse().ok()?;
    let month: u32 = s.get(4..6).and_then(|m| m.parse().ok()).unwrap_or(1);
    let day: u32 = s.get(6..8).and_then(|d| d.parse().ok()).unwrap_or(1);
    let hour: u32 = s.get(8..10).and_then(|h| h.parse().ok()).unwrap_or(0);
    let minute: u32 = s.get(10..12).and_then(|m| m.parse().ok()).unwrap_or(0);
    let second: u32 = s.get(12..14).and_then(|s| s.parse().ok()).unwrap_or(0);

    chrono::NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .map(|dt| chrono::DateTime::from_naive_utc_and_offset(dt, chrono::Utc))
}
