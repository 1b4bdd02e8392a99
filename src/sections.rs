//! Section hierarchy from a flat stream of styled blocks.
//!
//! Headings open sections; body paragraphs attach to the innermost open
//! one. Opening a section at level L first closes every open section at
//! level L or deeper, so a node's parent is always its nearest preceding
//! shallower heading.

use std::sync::OnceLock;

use regex::Regex;

use crate::model::Section;
use crate::parser::{RawBlock, StyleSignal};

/// Deepest heading level assigned from PDF font sizes.
pub const MAX_PDF_HEADING_LEVEL: u32 = 6;

/// Points a block must exceed the page body size by to be a heading candidate.
pub(crate) const HEADING_SIZE_MARGIN: f32 = 0.5;

/// Longest text, in characters, that still counts as a heading candidate.
const MAX_HEADING_CHARS: usize = 120;

fn heading_style_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^heading\s*(\d+)$").expect("valid heading style pattern")
    })
}

/// Heading level named by a paragraph style, e.g. `Heading2` or `heading 2`.
///
/// Returns `None` for other styles, a non-numeric suffix, or level zero.
pub fn heading_level_from_style(style: &str) -> Option<u32> {
    let captures = heading_style_pattern().captures(style.trim())?;
    let level: u32 = captures.get(1)?.as_str().parse().ok()?;
    (level >= 1).then_some(level)
}

/// Font-size heading levels for a document.
///
/// Candidate sizes are ranked largest first; equal sizes share a level.
#[derive(Debug, Clone, Default)]
struct SizeLevels {
    /// Candidate sizes in 0.1pt units, descending
    ranked: Vec<i32>,
}

impl SizeLevels {
    fn from_blocks(blocks: &[RawBlock]) -> Self {
        let mut ranked: Vec<i32> = blocks
            .iter()
            .filter_map(|block| match block.signal {
                StyleSignal::Font { size, body_size }
                    if is_size_candidate(block, size, body_size) =>
                {
                    Some(size_key(size))
                }
                _ => None,
            })
            .collect();
        ranked.sort_unstable_by(|a, b| b.cmp(a));
        ranked.dedup();
        Self { ranked }
    }

    fn level(&self, size: f32) -> Option<u32> {
        let rank = self.ranked.iter().position(|k| *k == size_key(size))?;
        Some((rank as u32 + 1).min(MAX_PDF_HEADING_LEVEL))
    }
}

fn size_key(size: f32) -> i32 {
    (size * 10.0).round() as i32
}

fn is_size_candidate(block: &RawBlock, size: f32, body_size: f32) -> bool {
    size > body_size + HEADING_SIZE_MARGIN && block.text.chars().count() <= MAX_HEADING_CHARS
}

/// Builds a section tree with a stack of open sections.
#[derive(Debug, Default)]
pub struct SectionBuilder {
    open: Vec<Section>,
    roots: Vec<Section>,
}

impl SectionBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the section tree for a block stream.
    ///
    /// A stream without headings yields a single implicit section holding
    /// every paragraph. An empty stream yields no sections.
    pub fn build(blocks: &[RawBlock]) -> Vec<Section> {
        let levels = SizeLevels::from_blocks(blocks);
        let mut builder = Self::new();

        for block in blocks {
            let text = block.text.trim();
            if text.is_empty() {
                continue;
            }
            let level = match &block.signal {
                StyleSignal::Style(style) => style.as_deref().and_then(heading_level_from_style),
                StyleSignal::Font { size, body_size } => {
                    if is_size_candidate(block, *size, *body_size) {
                        levels.level(*size)
                    } else {
                        None
                    }
                }
            };
            match level {
                Some(level) => builder.open_section(text, level),
                None => builder.push_paragraph(text),
            }
        }

        let sections = builder.finish();
        log::debug!("Built {} top-level sections", sections.len());
        sections
    }

    /// Open a heading at `level`, closing open sections at that level or deeper.
    pub fn open_section(&mut self, title: impl Into<String>, level: u32) {
        let level = level.max(1);
        self.close_from(level);
        self.open.push(Section::new(title, level));
    }

    /// Attach a body paragraph to the innermost open section.
    pub fn push_paragraph(&mut self, text: impl Into<String>) {
        if self.open.is_empty() {
            self.open.push(Section::implicit());
        }
        if let Some(current) = self.open.last_mut() {
            current.paragraphs.push(text.into());
        }
    }

    /// Close every open section and return the roots.
    pub fn finish(mut self) -> Vec<Section> {
        self.close_from(1);
        self.roots
    }

    fn close_from(&mut self, level: u32) {
        while self.open.last().is_some_and(|s| s.level >= level) {
            if let Some(section) = self.open.pop() {
                match self.open.last_mut() {
                    Some(parent) => parent.children.push(section),
                    None => self.roots.push(section),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn styled(text: &str, style: Option<&str>) -> RawBlock {
        RawBlock::styled(text, style.map(str::to_string))
    }

    fn sized(text: &str, size: f32) -> RawBlock {
        RawBlock::sized(text, 1, size, 11.0)
    }

    #[test]
    fn test_heading_level_from_style() {
        assert_eq!(heading_level_from_style("Heading1"), Some(1));
        assert_eq!(heading_level_from_style("heading 2"), Some(2));
        assert_eq!(heading_level_from_style("HEADING 12"), Some(12));
        assert_eq!(heading_level_from_style("Heading 0"), None);
        assert_eq!(heading_level_from_style("Heading X"), None);
        assert_eq!(heading_level_from_style("Heading"), None);
        assert_eq!(heading_level_from_style("Normal"), None);
        assert_eq!(heading_level_from_style("Subheading 1"), None);
    }

    #[test]
    fn test_docx_nesting() {
        let blocks = vec![
            styled("Intro", Some("Heading 1")),
            styled("Opening words.", Some("Normal")),
            styled("Background", Some("Heading 2")),
            styled("Some history.", None),
            styled("Methods", Some("Heading 1")),
            styled("Steps.", None),
        ];
        let sections = SectionBuilder::build(&blocks);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].title, "Intro");
        assert_eq!(sections[0].paragraphs, vec!["Opening words."]);
        assert_eq!(sections[0].children[0].title, "Background");
        assert_eq!(sections[0].children[0].level, 2);
        assert_eq!(sections[0].children[0].paragraphs, vec!["Some history."]);
        assert_eq!(sections[1].title, "Methods");
    }

    #[test]
    fn test_skipped_level_attaches_to_nearest_shallower() {
        let blocks = vec![
            styled("A", Some("Heading1")),
            styled("A.x", Some("Heading3")),
            styled("B", Some("Heading2")),
        ];
        let sections = SectionBuilder::build(&blocks);
        assert_eq!(sections.len(), 1);
        let titles: Vec<&str> = sections[0].children.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["A.x", "B"]);
    }

    #[test]
    fn test_no_headings_yields_implicit_section() {
        let blocks = vec![styled("one", None), styled("two", Some("Normal"))];
        let sections = SectionBuilder::build(&blocks);
        assert_eq!(sections.len(), 1);
        assert!(sections[0].is_implicit());
        assert_eq!(sections[0].level, 1);
        assert_eq!(sections[0].paragraphs, vec!["one", "two"]);
    }

    #[test]
    fn test_paragraphs_before_first_heading() {
        let blocks = vec![styled("preface", None), styled("Chapter", Some("Heading1"))];
        let sections = SectionBuilder::build(&blocks);
        assert_eq!(sections.len(), 2);
        assert!(sections[0].is_implicit());
        assert_eq!(sections[1].title, "Chapter");
    }

    #[test]
    fn test_empty_stream() {
        assert!(SectionBuilder::build(&[]).is_empty());
    }

    #[test]
    fn test_invalid_heading_suffix_is_body() {
        let blocks = vec![styled("Title", Some("Heading 0"))];
        let sections = SectionBuilder::build(&blocks);
        assert!(sections[0].is_implicit());
        assert_eq!(sections[0].paragraphs, vec!["Title"]);
    }

    #[test]
    fn test_pdf_sizes_rank_into_levels() {
        let blocks = vec![
            sized("Report", 24.0),
            sized("Summary", 16.0),
            sized("Body text.", 11.0),
            sized("Details", 16.0),
            sized("More body.", 11.0),
        ];
        let sections = SectionBuilder::build(&blocks);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].title, "Report");
        assert_eq!(sections[0].level, 1);
        let children: Vec<(&str, u32)> = sections[0]
            .children
            .iter()
            .map(|s| (s.title.as_str(), s.level))
            .collect();
        assert_eq!(children, vec![("Summary", 2), ("Details", 2)]);
        assert_eq!(sections[0].children[1].paragraphs, vec!["More body."]);
    }

    #[test]
    fn test_pdf_margin_and_length_limits() {
        let long = "x".repeat(121);
        let blocks = vec![sized("Barely larger", 11.5), sized(&long, 20.0)];
        let sections = SectionBuilder::build(&blocks);
        assert_eq!(sections.len(), 1);
        assert!(sections[0].is_implicit());
        assert_eq!(sections[0].paragraphs.len(), 2);
    }

    #[test]
    fn test_pdf_levels_cap_at_six() {
        let blocks: Vec<RawBlock> = (0..8)
            .map(|i| sized(&format!("H{i}"), 30.0 - i as f32))
            .collect();
        let levels = SizeLevels::from_blocks(&blocks);
        assert_eq!(levels.level(30.0), Some(1));
        assert_eq!(levels.level(24.0), Some(6));
        assert_eq!(levels.level(23.0), Some(6));
    }
}
