//! Layout analysis for PDF pages.
//!
//! The content-stream pass ([`LayoutAnalyzer`]) turns page operators into
//! positioned text spans and image placements. Everything after that
//! (column detection, line and block grouping) is a pure function of the
//! spans, so pages can be grouped in parallel once extraction is done.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::error::Result;
use crate::sections::HEADING_SIZE_MARGIN;

use super::backend::{get_number_from_value, PdfBackend, PageId, PdfValue};

/// Font size assumed before the first `Tf` operator.
const DEFAULT_FONT_SIZE: f32 = 12.0;

/// Average glyph advance as a fraction of the font size.
const GLYPH_WIDTH_RATIO: f32 = 0.5;

/// `TJ` adjustment (thousandths of an em) treated as a word space.
const TJ_SPACE_THRESHOLD: f32 = 200.0;

/// A text span with position and font information.
#[derive(Debug, Clone)]
pub struct TextSpan {
    /// The text content
    pub text: String,
    /// X position (left edge)
    pub x: f32,
    /// Y position (baseline)
    pub y: f32,
    /// Estimated width of the text
    pub width: f32,
    /// Rendered font size in points
    pub font_size: f32,
    /// Font name (e.g., "ABCDEF+Helvetica-Bold")
    pub font_name: String,
}

impl TextSpan {
    /// Create a new text span. The width is estimated from the glyph count.
    pub fn new(text: String, x: f32, y: f32, font_size: f32, font_name: String) -> Self {
        let width = text.chars().count() as f32 * font_size * GLYPH_WIDTH_RATIO;
        Self {
            text,
            x,
            y,
            width,
            font_size,
            font_name,
        }
    }

    /// Get the bottom Y coordinate (approximate, based on font size).
    pub fn bottom(&self) -> f32 {
        self.y - self.font_size * 0.2 // Approximate descender
    }

    /// Get the top Y coordinate (approximate, based on font size).
    pub fn top(&self) -> f32 {
        self.y + self.font_size * 0.8 // Approximate ascender
    }

    /// Right edge.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }
}

/// A text line composed of multiple spans on the same baseline.
#[derive(Debug, Clone)]
pub struct TextLine {
    /// The spans in this line, sorted by X position
    pub spans: Vec<TextSpan>,
    /// Y position (baseline)
    pub y: f32,
    /// Leftmost X position
    pub x: f32,
    /// Dominant font size in this line
    pub font_size: f32,
}

impl TextLine {
    /// Create a new text line from spans.
    pub fn from_spans(mut spans: Vec<TextSpan>) -> Self {
        if spans.is_empty() {
            return Self {
                spans: vec![],
                y: 0.0,
                x: 0.0,
                font_size: 0.0,
            };
        }

        spans.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));

        // Dominant font size, weighted by text length
        let total_chars: usize = spans.iter().map(|s| s.text.len()).sum();
        let weighted_size: f32 = spans
            .iter()
            .map(|s| s.font_size * s.text.len() as f32)
            .sum();
        let font_size = if total_chars > 0 {
            weighted_size / total_chars as f32
        } else {
            spans[0].font_size
        };

        let y = spans[0].y;
        let x = spans[0].x;

        Self {
            spans,
            y,
            x,
            font_size,
        }
    }

    /// Get the combined text of all spans with appropriate spacing.
    ///
    /// Inserts spaces between spans based on their X coordinate gaps.
    /// For CJK characters, no space is inserted between adjacent characters.
    pub fn text(&self) -> String {
        if self.spans.is_empty() {
            return String::new();
        }

        if self.spans.len() == 1 {
            return self.spans[0].text.clone();
        }

        let mut result = String::new();

        for (i, span) in self.spans.iter().enumerate() {
            if i == 0 {
                result.push_str(&span.text);
                continue;
            }

            let prev_span = &self.spans[i - 1];
            let gap = span.x - prev_span.right();

            let char_count = span.text.chars().count();
            let avg_char_width = if char_count > 0 && span.width > 0.0 {
                span.width / char_count as f32
            } else {
                span.font_size * GLYPH_WIDTH_RATIO
            };

            // A gap over 20% of a glyph separates words, except between CJK glyphs
            let should_insert_space = gap > avg_char_width * 0.2 && {
                let prev_is_cjk = prev_span
                    .text
                    .chars()
                    .last()
                    .map(is_spaceless_script_char)
                    .unwrap_or(false);
                let curr_is_cjk = span
                    .text
                    .chars()
                    .next()
                    .map(is_spaceless_script_char)
                    .unwrap_or(false);
                !(prev_is_cjk && curr_is_cjk)
            };

            let prev_ends_with_space =
                prev_span.text.ends_with(' ') || prev_span.text.ends_with('\u{00A0}');
            let curr_starts_with_space =
                span.text.starts_with(' ') || span.text.starts_with('\u{00A0}');

            if should_insert_space && !prev_ends_with_space && !curr_starts_with_space {
                result.push(' ');
            }

            result.push_str(&span.text);
        }

        result
    }

    /// Right edge of the last span.
    pub fn right(&self) -> f32 {
        self.spans
            .iter()
            .map(TextSpan::right)
            .fold(self.x, f32::max)
    }
}

/// A text block (paragraph or heading candidate).
#[derive(Debug, Clone)]
pub struct TextBlock {
    /// The lines in this block, top to bottom
    pub lines: Vec<TextLine>,
}

impl TextBlock {
    /// Create a new text block.
    pub fn new(lines: Vec<TextLine>) -> Self {
        Self { lines }
    }

    /// Get the combined text of all lines.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Check if the block is empty.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() || self.text().trim().is_empty()
    }

    /// Dominant font size, weighted by text length.
    pub fn font_size(&self) -> f32 {
        let spans = || self.lines.iter().flat_map(|l| l.spans.iter());
        let total_chars: usize = spans().map(|s| s.text.len()).sum();
        if total_chars == 0 {
            return self.lines.first().map(|l| l.font_size).unwrap_or(0.0);
        }
        spans()
            .map(|s| s.font_size * s.text.len() as f32)
            .sum::<f32>()
            / total_chars as f32
    }

    /// Leftmost line start.
    pub fn left(&self) -> f32 {
        self.lines
            .iter()
            .map(|l| l.x)
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal))
            .unwrap_or(0.0)
    }

    /// Baseline distances between consecutive lines.
    pub fn line_spacings(&self) -> Vec<f32> {
        self.lines
            .windows(2)
            .map(|w| (w[0].y - w[1].y).abs())
            .filter(|s| *s > 0.1)
            .collect()
    }
}

/// A detected column in the page layout.
#[derive(Debug, Clone)]
pub struct Column {
    /// Left boundary X coordinate
    pub left: f32,
    /// Right boundary X coordinate
    pub right: f32,
    /// Column index (0 = leftmost)
    pub index: usize,
}

impl Column {
    /// Check if an X coordinate falls within this column.
    pub fn contains(&self, x: f32) -> bool {
        x >= self.left && x <= self.right
    }

    /// Check if a span belongs to this column.
    pub fn contains_span(&self, span: &TextSpan) -> bool {
        // Left edge or center point inside the column
        let center = span.x + span.width / 2.0;
        self.contains(span.x) || self.contains(center)
    }
}

/// Font size statistics for a page or document.
#[derive(Debug, Clone, Default)]
pub struct FontStatistics {
    /// Body text font size (most common)
    pub body_size: f32,
    /// All observed font sizes with frequency, keyed at 0.1pt precision
    pub size_histogram: HashMap<i32, usize>,
}

impl FontStatistics {
    /// Collect statistics over spans, weighted by span count.
    pub fn from_spans<'s>(spans: impl IntoIterator<Item = &'s TextSpan>) -> Self {
        let mut stats = Self::default();
        for span in spans {
            stats.add_size(span.font_size);
        }
        stats.analyze();
        stats
    }

    /// Add a font size observation.
    pub fn add_size(&mut self, size: f32) {
        let key = (size * 10.0).round() as i32;
        *self.size_histogram.entry(key).or_insert(0) += 1;
    }

    /// Calculate the body size. Ties go to the smaller size.
    pub fn analyze(&mut self) {
        self.body_size = self
            .size_histogram
            .iter()
            .max_by(|(ka, ca), (kb, cb)| ca.cmp(cb).then(kb.cmp(ka)))
            .map(|(key, _)| *key as f32 / 10.0)
            .unwrap_or(DEFAULT_FONT_SIZE);
    }
}

/// A 2D affine transform in PDF notation `[a b c d e f]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    /// The identity transform.
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    /// Pure translation.
    pub fn translation(tx: f32, ty: f32) -> Self {
        Self {
            e: tx,
            f: ty,
            ..Self::IDENTITY
        }
    }

    /// `self × other`: apply `self` first, then `other`.
    pub fn concat(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    /// Transform a point.
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Vertical scale factor.
    pub fn vertical_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }

    fn from_operands(operands: &[PdfValue]) -> Option<Matrix> {
        if operands.len() < 6 {
            return None;
        }
        let n: Vec<f32> = operands[..6]
            .iter()
            .map(|v| get_number_from_value(v).unwrap_or(0.0))
            .collect();
        Some(Matrix {
            a: n[0],
            b: n[1],
            c: n[2],
            d: n[3],
            e: n[4],
            f: n[5],
        })
    }
}

/// An image XObject painted on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePlacement {
    /// XObject resource name
    pub name: Vec<u8>,
    /// Transform in effect at the `Do` operator, mapping the unit square
    pub ctm: Matrix,
}

/// Everything the content-stream pass finds on one page.
#[derive(Debug, Clone, Default)]
pub struct PageContent {
    /// Text spans in content-stream order
    pub spans: Vec<TextSpan>,
    /// `Do` operators in content-stream order
    pub placements: Vec<ImagePlacement>,
}

/// Text state tracked between `BT` and `ET`.
#[derive(Debug, Clone)]
struct TextState {
    matrix: Matrix,
    line_matrix: Matrix,
    leading: f32,
    font_resource: Vec<u8>,
    font_name: String,
    font_size: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            leading: 0.0,
            font_resource: Vec::new(),
            font_name: String::new(),
            font_size: DEFAULT_FONT_SIZE,
        }
    }
}

impl TextState {
    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = Matrix::translation(tx, ty).concat(&self.line_matrix);
        self.matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = self.leading;
        self.move_line(0.0, -leading);
    }

    fn advance(&mut self, tx: f32) {
        self.matrix = Matrix::translation(tx, 0.0).concat(&self.matrix);
    }
}

/// Content-stream interpreter for a single PDF backend.
pub struct LayoutAnalyzer<'a, B: PdfBackend + ?Sized> {
    backend: &'a B,
}

impl<'a, B: PdfBackend + ?Sized> LayoutAnalyzer<'a, B> {
    /// Create a new layout analyzer.
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Extract spans and image placements from a page.
    pub fn extract_page(&self, page: PageId) -> Result<PageContent> {
        let fonts: HashMap<Vec<u8>, String> = self
            .backend
            .page_fonts(page)?
            .into_iter()
            .map(|f| (f.name, f.base_font))
            .collect();

        let content = self.backend.page_content(page)?;
        if content.iter().all(u8::is_ascii_whitespace) {
            return Ok(PageContent::default());
        }
        let ops = self.backend.decode_content(&content)?;

        let mut result = PageContent::default();
        let mut ctm = Matrix::IDENTITY;
        let mut ctm_stack: Vec<Matrix> = Vec::new();
        let mut text = TextState::default();
        let mut in_text_block = false;

        for op in ops {
            match op.operator.as_str() {
                "q" => ctm_stack.push(ctm),
                "Q" => {
                    if let Some(saved) = ctm_stack.pop() {
                        ctm = saved;
                    }
                }
                "cm" => {
                    if let Some(m) = Matrix::from_operands(&op.operands) {
                        ctm = m.concat(&ctm);
                    }
                }
                "Do" => {
                    if let Some(PdfValue::Name(name)) = op.operands.first() {
                        result.placements.push(ImagePlacement {
                            name: name.clone(),
                            ctm,
                        });
                    }
                }
                "BT" => {
                    in_text_block = true;
                    text.matrix = Matrix::IDENTITY;
                    text.line_matrix = Matrix::IDENTITY;
                }
                "ET" => in_text_block = false,
                "Tf" => {
                    if op.operands.len() >= 2 {
                        if let PdfValue::Name(resource) = &op.operands[0] {
                            text.font_name = fonts
                                .get(resource)
                                .cloned()
                                .unwrap_or_else(|| String::from_utf8_lossy(resource).to_string());
                            text.font_resource = resource.clone();
                        }
                        text.font_size =
                            get_number_from_value(&op.operands[1]).unwrap_or(DEFAULT_FONT_SIZE);
                    }
                }
                "TL" => {
                    if let Some(leading) = op.operands.first().and_then(get_number_from_value) {
                        text.leading = leading;
                    }
                }
                "Td" | "TD" => {
                    if op.operands.len() >= 2 {
                        let tx = get_number_from_value(&op.operands[0]).unwrap_or(0.0);
                        let ty = get_number_from_value(&op.operands[1]).unwrap_or(0.0);
                        if op.operator == "TD" {
                            text.leading = -ty;
                        }
                        text.move_line(tx, ty);
                    }
                }
                "Tm" => {
                    if let Some(m) = Matrix::from_operands(&op.operands) {
                        text.matrix = m;
                        text.line_matrix = m;
                    }
                }
                "T*" => text.next_line(),
                "Tj" if in_text_block => {
                    if let Some(PdfValue::Str(bytes)) = op.operands.first() {
                        let decoded = self.decode(page, &text, bytes);
                        self.show(&mut result.spans, &mut text, &ctm, decoded, 0.0);
                    }
                }
                "TJ" if in_text_block => {
                    if let Some(PdfValue::Array(items)) = op.operands.first() {
                        let (decoded, adjustment) = self.decode_array(page, &text, items);
                        self.show(&mut result.spans, &mut text, &ctm, decoded, adjustment);
                    }
                }
                "'" | "\"" => {
                    text.next_line();
                    let text_idx = if op.operator == "\"" { 2 } else { 0 };
                    if in_text_block {
                        if let Some(PdfValue::Str(bytes)) = op.operands.get(text_idx) {
                            let decoded = self.decode(page, &text, bytes);
                            self.show(&mut result.spans, &mut text, &ctm, decoded, 0.0);
                        }
                    }
                }
                _ => {}
            }
        }

        Ok(result)
    }

    fn decode(&self, page: PageId, text: &TextState, bytes: &[u8]) -> String {
        self.backend.decode_text(page, &text.font_resource, bytes)
    }

    /// Decode a `TJ` array. Large negative adjustments become word spaces;
    /// the total adjustment in text-space units is returned for advancing.
    fn decode_array(&self, page: PageId, text: &TextState, items: &[PdfValue]) -> (String, f32) {
        let mut combined = String::new();
        let mut adjustment = 0.0;

        for item in items {
            match item {
                PdfValue::Str(bytes) => combined.push_str(&self.decode(page, text, bytes)),
                PdfValue::Integer(_) | PdfValue::Real(_) => {
                    let n = get_number_from_value(item).unwrap_or(0.0);
                    adjustment -= n / 1000.0 * text.font_size;
                    if -n > TJ_SPACE_THRESHOLD
                        && !combined.is_empty()
                        && !combined.ends_with(' ')
                        && !combined.ends_with('\u{00A0}')
                        && !combined
                            .chars()
                            .last()
                            .map(is_spaceless_script_char)
                            .unwrap_or(false)
                    {
                        combined.push(' ');
                    }
                }
                _ => {}
            }
        }

        (combined, adjustment)
    }

    /// Record a span at the current text position and advance past it.
    fn show(
        &self,
        spans: &mut Vec<TextSpan>,
        text: &mut TextState,
        ctm: &Matrix,
        decoded: String,
        adjustment: f32,
    ) {
        let glyphs = decoded.chars().count() as f32;
        if !decoded.trim().is_empty() {
            let rendering = text.matrix.concat(ctm);
            let (x, y) = rendering.apply(0.0, 0.0);
            let size = text.font_size * rendering.vertical_scale();
            spans.push(TextSpan::new(decoded, x, y, size, text.font_name.clone()));
        }
        text.advance(glyphs * text.font_size * GLYPH_WIDTH_RATIO + adjustment);
    }
}

fn single_column(min_x: f32, max_x: f32) -> Vec<Column> {
    vec![Column {
        left: min_x - 10.0,
        right: max_x + 10.0,
        index: 0,
    }]
}

/// Detect columns in a page based on vertical gap (gutter) detection.
///
/// Looks for vertical empty spaces between text regions to identify
/// column boundaries. Returns columns sorted from left to right.
pub fn detect_columns(spans: &[TextSpan]) -> Vec<Column> {
    if spans.is_empty() {
        return vec![];
    }

    let min_x = spans
        .iter()
        .map(|s| s.x)
        .min_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal))
        .unwrap_or(0.0);
    let max_x = spans
        .iter()
        .map(TextSpan::right)
        .max_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal))
        .unwrap_or(0.0);

    let page_width = max_x - min_x;

    // Too narrow for two columns
    if page_width < 250.0 {
        return single_column(min_x, max_x);
    }

    // Count how many spans occupy each vertical slice
    let slice_width = 3.0;
    let num_slices = ((page_width / slice_width) as usize) + 1;
    let mut slice_occupancy = vec![0usize; num_slices];

    for span in spans {
        let start_slice = ((span.x - min_x) / slice_width) as usize;
        let end_slice = ((span.right() - min_x) / slice_width) as usize;

        for slot in slice_occupancy
            .iter_mut()
            .take(end_slice.min(num_slices - 1) + 1)
            .skip(start_slice)
        {
            *slot += 1;
        }
    }

    // Largest gap in the middle 70% of the page, preferring gaps near the center
    let search_start = num_slices * 15 / 100;
    let search_end = num_slices * 85 / 100;
    let page_center = num_slices / 2;

    let mut best_gap_start = 0;
    let mut best_gap_len = 0;
    let mut best_gap_center_dist = f32::MAX;

    let mut consider = |start: usize, len: usize| {
        let width = len as f32 * slice_width;
        if width < 10.0 {
            return;
        }
        let center_dist = ((start + len / 2) as i32 - page_center as i32).abs() as f32;
        let best_width = best_gap_len as f32 * slice_width;
        if width > best_width * 1.5 || (width >= best_width * 0.7 && center_dist < best_gap_center_dist)
        {
            best_gap_start = start;
            best_gap_len = len;
            best_gap_center_dist = center_dist;
        }
    };

    let mut current_gap_start = 0;
    let mut current_gap_len = 0;
    for (i, &occupancy) in slice_occupancy
        .iter()
        .enumerate()
        .take(search_end)
        .skip(search_start)
    {
        if occupancy == 0 {
            if current_gap_len == 0 {
                current_gap_start = i;
            }
            current_gap_len += 1;
        } else {
            if current_gap_len > 0 {
                consider(current_gap_start, current_gap_len);
            }
            current_gap_len = 0;
        }
    }
    if current_gap_len > 0 {
        consider(current_gap_start, current_gap_len);
    }

    let gap_width = best_gap_len as f32 * slice_width;
    log::debug!(
        "Best gap: width={:.1}pt at x={:.1}, page_width={:.1}",
        gap_width,
        min_x + best_gap_start as f32 * slice_width,
        page_width
    );

    if gap_width < 12.0 {
        return single_column(min_x, max_x);
    }

    let gutter_center = min_x + (best_gap_start as f32 + best_gap_len as f32 / 2.0) * slice_width;

    // Both columns need at least 80pt of width
    if gutter_center - min_x < 80.0 || max_x - gutter_center < 80.0 {
        log::debug!("Column too narrow, treating as single column");
        return single_column(min_x, max_x);
    }

    // Both columns need at least 10% of the spans
    let left_spans = spans
        .iter()
        .filter(|s| s.x + s.width / 2.0 < gutter_center)
        .count();
    let right_spans = spans.len() - left_spans;
    let min_spans = (spans.len() / 10).max(2);
    if left_spans < min_spans || right_spans < min_spans {
        log::debug!(
            "Spans too imbalanced (left={}, right={}), treating as single column",
            left_spans,
            right_spans
        );
        return single_column(min_x, max_x);
    }

    vec![
        Column {
            left: min_x - 10.0,
            right: gutter_center,
            index: 0,
        },
        Column {
            left: gutter_center,
            right: max_x + 10.0,
            index: 1,
        },
    ]
}

/// Group spans into lines based on Y position, respecting column boundaries.
///
/// In multi-column layouts the left column is read to the bottom before the
/// right column starts.
pub fn group_spans_into_lines(spans: Vec<TextSpan>) -> Vec<TextLine> {
    if spans.is_empty() {
        return vec![];
    }

    let columns = detect_columns(&spans);
    log::debug!("Detected {} columns", columns.len());

    if columns.len() <= 1 {
        return group_single_column(spans);
    }

    let mut column_spans: Vec<Vec<TextSpan>> = vec![Vec::new(); columns.len()];
    for span in spans {
        let col_idx = columns
            .iter()
            .position(|c| c.contains_span(&span))
            .unwrap_or(0);
        column_spans[col_idx].push(span);
    }

    column_spans
        .into_iter()
        .flat_map(group_single_column)
        .collect()
}

/// Y-based line grouping for a single column, top to bottom.
fn group_single_column(mut spans: Vec<TextSpan>) -> Vec<TextLine> {
    if spans.is_empty() {
        return vec![];
    }

    // PDF Y grows upwards
    spans.sort_by(|a, b| {
        b.y.partial_cmp(&a.y)
            .unwrap_or(Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal))
    });

    let mut lines: Vec<TextLine> = Vec::new();
    let mut current_line_spans: Vec<TextSpan> = Vec::new();
    let mut current_y: Option<f32> = None;

    for span in spans {
        let y_tolerance = span.font_size * 0.3;

        match current_y {
            Some(y) if (span.y - y).abs() <= y_tolerance => current_line_spans.push(span),
            _ => {
                if !current_line_spans.is_empty() {
                    lines.push(TextLine::from_spans(std::mem::take(
                        &mut current_line_spans,
                    )));
                }
                current_y = Some(span.y);
                current_line_spans.push(span);
            }
        }
    }

    if !current_line_spans.is_empty() {
        lines.push(TextLine::from_spans(current_line_spans));
    }

    lines
}

/// Group lines into blocks (paragraphs) based on spacing, size and indentation.
///
/// `body_size` is the page's body text size. Lines above and below the
/// heading threshold never share a block.
pub fn group_lines_into_blocks(lines: Vec<TextLine>, body_size: f32) -> Vec<TextBlock> {
    if lines.is_empty() {
        return vec![];
    }

    let avg_spacing = average_line_spacing(&lines);
    let mut blocks: Vec<TextBlock> = Vec::new();
    let mut current: Vec<TextLine> = Vec::new();

    for line in lines {
        let should_break = match current.last() {
            Some(prev) => should_break_block(prev, &line, current.len(), avg_spacing, body_size),
            None => false,
        };
        if should_break {
            blocks.push(TextBlock::new(std::mem::take(&mut current)));
        }
        current.push(line);
    }

    if !current.is_empty() {
        blocks.push(TextBlock::new(current));
    }

    blocks
}

fn average_line_spacing(lines: &[TextLine]) -> f32 {
    let spacings: Vec<f32> = lines
        .windows(2)
        .map(|w| (w[0].y - w[1].y).abs())
        .filter(|s| *s > 0.1)
        .collect();

    if spacings.is_empty() {
        return DEFAULT_FONT_SIZE;
    }

    spacings.iter().sum::<f32>() / spacings.len() as f32
}

fn should_break_block(
    prev_line: &TextLine,
    curr_line: &TextLine,
    block_len: usize,
    avg_spacing: f32,
    body_size: f32,
) -> bool {
    // Moving back up the page means a new column
    if curr_line.y > prev_line.y + prev_line.font_size {
        return true;
    }

    let spacing = (prev_line.y - curr_line.y).abs();
    if spacing > avg_spacing * 1.5 {
        return true;
    }

    if (prev_line.font_size - curr_line.font_size).abs() > 1.0 {
        return true;
    }

    let heading_sized = |size: f32| size > body_size + HEADING_SIZE_MARGIN;
    if heading_sized(prev_line.font_size) != heading_sized(curr_line.font_size) {
        return true;
    }

    // An indented first line followed by a line at the block margin stays together
    let first_line_indent = block_len == 1 && curr_line.x < prev_line.x;
    (prev_line.x - curr_line.x).abs() > 20.0 && !first_line_indent
}

/// Check if a character is from a script that doesn't use word spaces.
///
/// Chinese and Japanese don't use spaces between words, but Korean does.
pub(crate) fn is_spaceless_script_char(c: char) -> bool {
    let code = c as u32;

    // CJK Unified Ideographs and extensions A-F
    (0x4E00..=0x9FFF).contains(&code)
    || (0x3400..=0x4DBF).contains(&code)
    || (0x20000..=0x2A6DF).contains(&code)
    || (0x2A700..=0x2B73F).contains(&code)
    || (0x2B740..=0x2B81F).contains(&code)
    || (0x2B820..=0x2CEAF).contains(&code)
    || (0x2CEB0..=0x2EBEF).contains(&code)
    // Hiragana, Katakana
    || (0x3040..=0x309F).contains(&code)
    || (0x30A0..=0x30FF).contains(&code)
    // CJK Symbols and Punctuation
    || (0x3000..=0x303F).contains(&code)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::model::PageDimensions;
    use crate::parser::backend::{BackendFontInfo, ContentOp, EmbeddedImage};

    fn span(text: &str, x: f32, y: f32, size: f32) -> TextSpan {
        TextSpan::new(text.to_string(), x, y, size, "Helvetica".to_string())
    }

    /// Backend serving one page of pre-decoded operators.
    struct ScriptedBackend {
        ops: Vec<ContentOp>,
    }

    impl ScriptedBackend {
        fn new(ops: &[(&str, Vec<PdfValue>)]) -> Self {
            Self {
                ops: ops
                    .iter()
                    .map(|(operator, operands)| ContentOp {
                        operator: operator.to_string(),
                        operands: operands.clone(),
                    })
                    .collect(),
            }
        }
    }

    impl PdfBackend for ScriptedBackend {
        fn pages(&self) -> BTreeMap<u32, PageId> {
            BTreeMap::from([(1, (1, 0))])
        }

        fn page_fonts(&self, _page: PageId) -> Result<Vec<BackendFontInfo>> {
            Ok(vec![BackendFontInfo {
                name: b"F1".to_vec(),
                base_font: "ABCDEF+Arial".to_string(),
            }])
        }

        fn page_content(&self, _page: PageId) -> Result<Vec<u8>> {
            Ok(b"scripted".to_vec())
        }

        fn decode_content(&self, _data: &[u8]) -> Result<Vec<ContentOp>> {
            Ok(self.ops.clone())
        }

        fn decode_text(&self, _page: PageId, _font: &[u8], bytes: &[u8]) -> String {
            String::from_utf8_lossy(bytes).to_string()
        }

        fn page_size(&self, _page: PageId) -> PageDimensions {
            PageDimensions::letter()
        }

        fn page_image(&self, _page: PageId, _name: &[u8]) -> Option<EmbeddedImage> {
            None
        }
    }

    fn num(n: f32) -> PdfValue {
        PdfValue::Real(n)
    }

    fn string(s: &str) -> PdfValue {
        PdfValue::Str(s.as_bytes().to_vec())
    }

    #[test]
    fn test_font_statistics() {
        let mut stats = FontStatistics::default();
        for _ in 0..100 {
            stats.add_size(12.0);
        }
        for _ in 0..5 {
            stats.add_size(18.0);
        }
        stats.analyze();
        assert!((stats.body_size - 12.0).abs() < 0.1);
    }

    #[test]
    fn test_font_statistics_empty_defaults() {
        let mut stats = FontStatistics::default();
        stats.analyze();
        assert_eq!(stats.body_size, 12.0);
    }

    #[test]
    fn test_column_contains_span() {
        let col = Column {
            left: 100.0,
            right: 200.0,
            index: 0,
        };

        let inside = TextSpan {
            width: 50.0,
            ..span("Test", 120.0, 0.0, 12.0)
        };
        assert!(col.contains_span(&inside));

        // Center at 110
        let straddling = TextSpan {
            width: 40.0,
            ..span("Test", 90.0, 0.0, 12.0)
        };
        assert!(col.contains_span(&straddling));

        let outside = TextSpan {
            width: 30.0,
            ..span("Test", 250.0, 0.0, 12.0)
        };
        assert!(!col.contains_span(&outside));
    }

    #[test]
    fn test_matrix_concat_applies_left_first() {
        let scale = Matrix {
            a: 2.0,
            d: 2.0,
            ..Matrix::IDENTITY
        };
        let shift = Matrix::translation(10.0, 20.0);
        assert_eq!(scale.concat(&shift).apply(1.0, 1.0), (12.0, 22.0));
        assert_eq!(shift.concat(&scale).apply(1.0, 1.0), (22.0, 42.0));
    }

    #[test]
    fn test_extract_spans_with_leading() {
        let backend = ScriptedBackend::new(&[
            ("BT", vec![]),
            ("Tf", vec![PdfValue::Name(b"F1".to_vec()), num(10.0)]),
            ("TL", vec![num(14.0)]),
            ("Td", vec![num(72.0), num(700.0)]),
            ("Tj", vec![string("First")]),
            ("T*", vec![]),
            ("Tj", vec![string("Second")]),
            ("ET", vec![]),
        ]);
        let content = LayoutAnalyzer::new(&backend).extract_page((1, 0)).unwrap();
        assert_eq!(content.spans.len(), 2);
        assert_eq!(content.spans[0].font_name, "ABCDEF+Arial");
        assert_eq!((content.spans[0].x, content.spans[0].y), (72.0, 700.0));
        assert_eq!((content.spans[1].x, content.spans[1].y), (72.0, 686.0));
    }

    #[test]
    fn test_text_matrix_scales_font_size() {
        let backend = ScriptedBackend::new(&[
            ("BT", vec![]),
            ("Tf", vec![PdfValue::Name(b"F1".to_vec()), num(1.0)]),
            (
                "Tm",
                vec![num(18.0), num(0.0), num(0.0), num(18.0), num(50.0), num(600.0)],
            ),
            ("Tj", vec![string("Title")]),
            ("ET", vec![]),
        ]);
        let content = LayoutAnalyzer::new(&backend).extract_page((1, 0)).unwrap();
        assert_eq!(content.spans[0].font_size, 18.0);
    }

    #[test]
    fn test_tj_array_inserts_word_space() {
        let backend = ScriptedBackend::new(&[
            ("BT", vec![]),
            ("Tf", vec![PdfValue::Name(b"F1".to_vec()), num(12.0)]),
            (
                "TJ",
                vec![PdfValue::Array(vec![
                    string("Hello"),
                    PdfValue::Integer(-250),
                    string("World"),
                ])],
            ),
            ("ET", vec![]),
        ]);
        let content = LayoutAnalyzer::new(&backend).extract_page((1, 0)).unwrap();
        assert_eq!(content.spans[0].text, "Hello World");
    }

    #[test]
    fn test_image_placement_uses_saved_ctm() {
        let backend = ScriptedBackend::new(&[
            ("q", vec![]),
            (
                "cm",
                vec![num(200.0), num(0.0), num(0.0), num(100.0), num(72.0), num(500.0)],
            ),
            ("Do", vec![PdfValue::Name(b"Im1".to_vec())]),
            ("Q", vec![]),
            ("Do", vec![PdfValue::Name(b"Im2".to_vec())]),
        ]);
        let content = LayoutAnalyzer::new(&backend).extract_page((1, 0)).unwrap();
        assert_eq!(content.placements.len(), 2);
        assert_eq!(content.placements[0].ctm.apply(1.0, 1.0), (272.0, 600.0));
        assert_eq!(content.placements[1].ctm, Matrix::IDENTITY);
    }

    #[test]
    fn test_group_lines_reads_top_to_bottom() {
        let spans = vec![
            span("second", 72.0, 686.0, 12.0),
            span("first", 72.0, 700.0, 12.0),
            span("line", 120.0, 700.5, 12.0),
        ];
        let lines = group_spans_into_lines(spans);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text(), "first line");
        assert_eq!(lines[1].text(), "second");
    }

    #[test]
    fn test_blocks_split_on_gap_and_size() {
        let lines = group_spans_into_lines(vec![
            span("Heading", 72.0, 720.0, 18.0),
            span("Body one", 72.0, 690.0, 12.0),
            span("Body two", 72.0, 676.0, 12.0),
            span("Next paragraph", 72.0, 630.0, 12.0),
        ]);
        let blocks = group_lines_into_blocks(lines, 12.0);
        let texts: Vec<String> = blocks.iter().map(TextBlock::text).collect();
        assert_eq!(texts, vec!["Heading", "Body one Body two", "Next paragraph"]);
        assert!((blocks[0].font_size() - 18.0).abs() < 0.01);
    }

    #[test]
    fn test_slightly_larger_line_starts_block() {
        let lines = group_spans_into_lines(vec![
            span("Introduction", 72.0, 714.0, 13.0),
            span("Body one", 72.0, 700.0, 12.0),
            span("Body two", 72.0, 686.0, 12.0),
        ]);
        let texts: Vec<String> = group_lines_into_blocks(lines, 12.0)
            .iter()
            .map(TextBlock::text)
            .collect();
        assert_eq!(texts, vec!["Introduction", "Body one Body two"]);
    }

    #[test]
    fn test_first_line_indent_stays_in_block() {
        let lines = group_spans_into_lines(vec![
            span("Indented start", 108.0, 700.0, 12.0),
            span("continues here", 72.0, 686.0, 12.0),
            span("and here", 72.0, 672.0, 12.0),
        ]);
        let blocks = group_lines_into_blocks(lines, 12.0);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].left(), 72.0);
        assert_eq!(blocks[0].line_spacings(), vec![14.0, 14.0]);
    }

    #[test]
    fn test_cjk_spans_join_without_space() {
        let line = TextLine::from_spans(vec![
            TextSpan {
                width: 12.0,
                ..span("漢", 72.0, 700.0, 12.0)
            },
            span("字", 88.0, 700.0, 12.0),
        ]);
        assert_eq!(line.text(), "漢字");
    }
}
