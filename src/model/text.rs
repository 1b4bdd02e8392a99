//! Text model types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Extracted text of a document.
///
/// DOCX documents carry a paragraph stream; PDF documents carry per-page records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextModel {
    /// All text concatenated
    pub full_text: String,

    /// Paragraph stream (DOCX)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paragraphs: Option<Vec<String>>,

    /// Per-page records (PDF)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<Vec<PageText>>,
}

impl TextModel {
    /// Build a text model from a paragraph stream.
    pub fn from_paragraphs(paragraphs: Vec<String>) -> Self {
        let full_text = paragraphs.join("\n");
        Self {
            full_text,
            paragraphs: Some(paragraphs),
            pages: None,
        }
    }

    /// Build a text model from page records.
    pub fn from_pages(pages: Vec<PageText>) -> Self {
        let full_text = join_page_text(&pages);
        Self {
            full_text,
            paragraphs: None,
            pages: Some(pages),
        }
    }

    /// Number of non-whitespace characters in the text.
    pub fn char_count(&self) -> usize {
        self.full_text.chars().filter(|c| !c.is_whitespace()).count()
    }

    /// Whether there is no visible text at all.
    pub fn is_blank(&self) -> bool {
        self.full_text.trim().is_empty()
    }
}

fn join_page_text(pages: &[PageText]) -> String {
    pages
        .iter()
        .map(|p| p.text.as_str())
        .filter(|t| !t.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Text of a single PDF page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageText {
    /// Page number (1-indexed)
    pub page_number: u32,

    /// Page text, lines separated by newlines
    pub text: String,

    /// Font-grouped layout of the page
    pub layout: PageLayout,
}

impl PageText {
    /// Create a page record with an empty layout.
    pub fn new(page_number: u32, text: String) -> Self {
        Self {
            page_number,
            text,
            layout: PageLayout::default(),
        }
    }

    /// Set the layout.
    pub fn with_layout(mut self, layout: PageLayout) -> Self {
        self.layout = layout;
        self
    }
}

/// Text fragments and sizes rendered in one font.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FontGroup {
    /// Runs of contiguous words rendered in this font
    pub text: Vec<String>,

    /// Distinct sizes this font was rendered at, in first-seen order
    pub font_sizes: Vec<f32>,
}

/// Words of a page grouped by rendering font.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    /// Fragments per font
    pub words: BTreeMap<String, FontGroup>,

    /// Fonts in order of first appearance
    pub order: Vec<String>,

    /// Sorted font inventory
    pub fonts: Vec<String>,

    /// Sorted font size inventory
    pub font_sizes: Vec<f32>,
}

/// A single word with the font it was rendered in.
#[derive(Debug, Clone, PartialEq)]
pub struct StyledWord {
    /// Word text
    pub text: String,
    /// Font identity
    pub font: String,
    /// Rendered size in points
    pub size: f32,
}

impl PageLayout {
    /// Group words in reading order into per-font fragments.
    ///
    /// Consecutive words sharing a font are joined into one fragment.
    pub fn from_words(words: &[StyledWord]) -> Self {
        let mut layout = PageLayout::default();
        let mut current: Option<(String, Vec<&str>)> = None;

        for word in words {
            let size = round_size(word.size);

            if !layout.words.contains_key(&word.font) {
                layout.order.push(word.font.clone());
            }
            let group = layout.words.entry(word.font.clone()).or_default();
            if !group.font_sizes.iter().any(|s| (*s - size).abs() < f32::EPSILON) {
                group.font_sizes.push(size);
            }
            if !layout
                .font_sizes
                .iter()
                .any(|s| (*s - size).abs() < f32::EPSILON)
            {
                layout.font_sizes.push(size);
            }

            let same_font = matches!(&current, Some((font, _)) if *font == word.font);
            if same_font {
                if let Some((_, run)) = current.as_mut() {
                    run.push(word.text.as_str());
                }
            } else {
                if let Some((font, run)) = current.take() {
                    layout.push_fragment(&font, run.join(" "));
                }
                current = Some((word.font.clone(), vec![word.text.as_str()]));
            }
        }
        if let Some((font, run)) = current {
            layout.push_fragment(&font, run.join(" "));
        }

        layout.fonts = layout.order.clone();
        layout.fonts.sort();
        layout
            .font_sizes
            .sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        layout
    }

    fn push_fragment(&mut self, font: &str, fragment: String) {
        if let Some(group) = self.words.get_mut(font) {
            group.text.push(fragment);
        }
    }

    /// Whether the page rendered no words.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Round a font size to two decimals.
pub(crate) fn round_size(size: f32) -> f32 {
    (size * 100.0).round() / 100.0
}
