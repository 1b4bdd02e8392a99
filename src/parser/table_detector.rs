//! Borderless table detection for PDF pages.
//!
//! A table is a run of consecutive text rows whose spans start at shared
//! column anchors. Detected tables come back as [`Table`] grids with
//! page-scoped ids; their spans are removed from the paragraph stream.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::model::Table;

use super::layout::TextSpan;

/// Anchors closer than this belong to one column.
const MIN_COLUMN_GAP: f32 = 15.0;

/// How far left of its anchor a span may start and still sit in that column.
const ANCHOR_SLACK: f32 = 10.0;

/// Row grouping tolerance as a fraction of the span font size.
const ROW_TOLERANCE: f32 = 0.4;

/// Share of multi-cell rows an edge must appear in to become an anchor.
const MIN_ANCHOR_SHARE: f32 = 0.3;

const MIN_ROWS: usize = 2;
const MIN_COLUMNS: usize = 2;

/// Above this, the "columns" are words of ordinary prose.
const MAX_COLUMNS: usize = 6;

const BULLETS: &[&str] = &[
    "-", "–", "—", "•", "·", "*", "○", "▪", "◦", "▸", "►", "■", "●", "□", "◆", "▶", "➤",
];

fn numbered_marker_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:\d+\s*[.)]?|[A-Za-z]\s*[.)])$").expect("valid list marker pattern")
    })
}

/// Spans sharing a baseline, left to right.
#[derive(Debug)]
struct SpanRow {
    spans: Vec<TextSpan>,
}

impl SpanRow {
    fn is_multi_cell(&self) -> bool {
        self.spans.len() >= 2
    }

    fn leading_text(&self) -> &str {
        self.spans.first().map(|s| s.text.trim()).unwrap_or("")
    }
}

/// Finds tables among the spans of one page.
#[derive(Debug, Clone, Copy)]
pub struct TableDetector {
    page: u32,
}

impl TableDetector {
    /// Detector for a 1-based page number; the number goes into table ids.
    pub fn for_page(page: u32) -> Self {
        Self { page }
    }

    /// Split spans into tables and the spans left for paragraphs.
    ///
    /// Tables are numbered top to bottom as `pdf-table-{page}-{n}`.
    pub fn detect(&self, spans: Vec<TextSpan>) -> (Vec<Table>, Vec<TextSpan>) {
        if spans.len() < MIN_ROWS * MIN_COLUMNS {
            return (Vec::new(), spans);
        }

        let rows = group_rows(spans);
        let anchors = column_anchors(&rows);
        if anchors.len() < MIN_COLUMNS {
            return (Vec::new(), rows.into_iter().flat_map(|r| r.spans).collect());
        }

        let mut scan = Scan::default();
        for row in rows {
            if is_table_row(&row, &anchors) {
                scan.pending.push(row);
            } else {
                self.close_region(&mut scan);
                scan.remaining.extend(row.spans);
            }
        }
        self.close_region(&mut scan);

        if !scan.tables.is_empty() {
            log::debug!("page {}: {} table(s) detected", self.page, scan.tables.len());
        }
        (scan.tables, scan.remaining)
    }

    fn close_region(&self, scan: &mut Scan) {
        let region = std::mem::take(&mut scan.pending);
        if region.len() < MIN_ROWS {
            scan.remaining.extend(region.into_iter().flat_map(|r| r.spans));
            return;
        }

        let anchors = column_anchors(&region);
        let columns = anchors.len();
        if !(MIN_COLUMNS..=MAX_COLUMNS).contains(&columns) || is_list(&region, columns) {
            log::debug!(
                "page {}: {}-row region with {} column(s) kept as text",
                self.page,
                region.len(),
                columns
            );
            scan.remaining.extend(region.into_iter().flat_map(|r| r.spans));
            return;
        }

        let id = format!("pdf-table-{}-{}", self.page, scan.tables.len() + 1);
        scan.tables.push(Table::new(id, Some(self.page), grid(&region, &anchors)));
    }
}

#[derive(Default)]
struct Scan {
    pending: Vec<SpanRow>,
    tables: Vec<Table>,
    remaining: Vec<TextSpan>,
}

fn by_position(a: &TextSpan, b: &TextSpan) -> Ordering {
    b.y.partial_cmp(&a.y)
        .unwrap_or(Ordering::Equal)
        .then(a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal))
}

/// Rows top to bottom. A span joins the current row when its baseline is
/// within tolerance of the row's first span.
fn group_rows(mut spans: Vec<TextSpan>) -> Vec<SpanRow> {
    spans.sort_by(by_position);

    let mut rows: Vec<SpanRow> = Vec::new();
    for span in spans {
        match rows.last_mut() {
            Some(row) if (row.spans[0].y - span.y).abs() <= span.font_size * ROW_TOLERANCE => {
                row.spans.push(span);
            }
            _ => rows.push(SpanRow { spans: vec![span] }),
        }
    }
    for row in &mut rows {
        row.spans.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));
    }
    rows
}

/// Column starts shared by enough multi-cell rows.
///
/// Left edges are clustered from the left; a cluster spans one column gap
/// and its anchor is its leftmost edge.
fn column_anchors(rows: &[SpanRow]) -> Vec<f32> {
    let multi: Vec<&SpanRow> = rows.iter().filter(|r| r.is_multi_cell()).collect();
    if multi.len() < MIN_ROWS {
        return Vec::new();
    }

    let mut edges: Vec<(f32, usize)> = multi
        .iter()
        .enumerate()
        .flat_map(|(n, row)| row.spans.iter().map(move |s| (s.x, n)))
        .collect();
    edges.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

    let mut clusters: Vec<(f32, BTreeSet<usize>)> = Vec::new();
    for (x, row) in edges {
        match clusters.last_mut() {
            Some((start, rows)) if x - *start < MIN_COLUMN_GAP => {
                rows.insert(row);
            }
            _ => clusters.push((x, BTreeSet::from([row]))),
        }
    }

    let needed = ((multi.len() as f32 * MIN_ANCHOR_SHARE).ceil() as usize).max(MIN_ROWS);
    clusters
        .into_iter()
        .filter(|(_, rows)| rows.len() >= needed)
        .map(|(start, _)| start)
        .collect()
}

fn in_column(x: f32, anchor: f32) -> bool {
    x >= anchor - ANCHOR_SLACK && x < anchor + MIN_COLUMN_GAP
}

fn is_table_row(row: &SpanRow, anchors: &[f32]) -> bool {
    if !row.is_multi_cell() {
        return false;
    }
    let aligned = row
        .spans
        .iter()
        .filter(|s| anchors.iter().any(|a| in_column(s.x, *a)))
        .count();
    aligned * 2 >= row.spans.len()
}

/// Marker-led rows: a bulleted list at any width, a numbered list when the
/// marker is the only other column.
fn is_list(rows: &[SpanRow], columns: usize) -> bool {
    let bullets = rows
        .iter()
        .filter(|r| BULLETS.contains(&r.leading_text()))
        .count();
    let numbered = rows
        .iter()
        .filter(|r| numbered_marker_pattern().is_match(r.leading_text()))
        .count();

    bullets * 2 >= rows.len() || (columns == 2 && (bullets + numbered) * 2 >= rows.len())
}

fn column_for(x: f32, anchors: &[f32]) -> usize {
    anchors
        .iter()
        .rposition(|a| x >= a - ANCHOR_SLACK)
        .unwrap_or(0)
}

/// Cell text per row; spans landing in one column are joined with a space.
fn grid(rows: &[SpanRow], anchors: &[f32]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| {
            let mut cells: Vec<Vec<&str>> = vec![Vec::new(); anchors.len()];
            for span in &row.spans {
                cells[column_for(span.x, anchors)].push(span.text.trim());
            }
            cells.into_iter().map(|parts| parts.join(" ")).collect()
        })
        .collect()
}
