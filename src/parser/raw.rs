//! Raw structural primitives produced by the format readers.
//!
//! A [`RawStructure`] is everything later stages need from a source file.
//! Format differences survive only as tagged variants ([`StyleSignal`],
//! [`MarginEvidence`]), so section building and profiling never look at
//! the source format directly.

use crate::model::{Image, Margins, Metadata, SourceType, Table, TextModel};

/// Output of a [`StructuralReader`](super::StructuralReader).
#[derive(Debug, Clone)]
pub struct RawStructure {
    /// Source format
    pub source_type: SourceType,
    /// Document-level metadata, computed from primary extraction
    pub metadata: Metadata,
    /// Text blocks in reading order
    pub blocks: Vec<RawBlock>,
    /// Extracted text
    pub text: TextModel,
    /// Extracted tables
    pub tables: Vec<Table>,
    /// Extracted images
    pub images: Vec<Image>,
    /// Evidence for the formatting profile
    pub formatting: FormattingEvidence,
    /// Non-fatal problems met during extraction
    pub warnings: Vec<String>,
}

impl RawStructure {
    /// Create an empty structure for a source format.
    pub fn empty(source_type: SourceType) -> Self {
        Self {
            source_type,
            metadata: Metadata::default(),
            blocks: Vec::new(),
            text: TextModel::default(),
            tables: Vec::new(),
            images: Vec::new(),
            formatting: FormattingEvidence::default(),
            warnings: Vec::new(),
        }
    }
}

/// A paragraph or heading candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBlock {
    /// Block text, trimmed
    pub text: String,
    /// Page the block starts on (PDF)
    pub page: Option<u32>,
    /// What the reader knows about the block's style
    pub signal: StyleSignal,
}

impl RawBlock {
    /// A DOCX paragraph with its resolved style name.
    pub fn styled(text: impl Into<String>, style: Option<String>) -> Self {
        Self {
            text: text.into(),
            page: None,
            signal: StyleSignal::Style(style),
        }
    }

    /// Text recovered by OCR. It carries no style, so it is always body text.
    pub fn recognized(text: impl Into<String>, page: u32) -> Self {
        Self {
            text: text.into(),
            page: Some(page),
            signal: StyleSignal::Style(None),
        }
    }

    /// A PDF block with its dominant font size and the body size of its page.
    pub fn sized(text: impl Into<String>, page: u32, size: f32, body_size: f32) -> Self {
        Self {
            text: text.into(),
            page: Some(page),
            signal: StyleSignal::Font { size, body_size },
        }
    }
}

/// Style hint attached to a block.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleSignal {
    /// Paragraph style name (DOCX)
    Style(Option<String>),
    /// Dominant rendered font size in points (PDF)
    Font {
        /// Size in points
        size: f32,
        /// Most frequent span size on the block's page
        body_size: f32,
    },
}

/// Formatting observations gathered by a reader.
#[derive(Debug, Clone, Default)]
pub struct FormattingEvidence {
    /// Where margins come from
    pub margins: MarginEvidence,
    /// Font identity and size per run or span
    pub runs: Vec<RunFormat>,
    /// Effective paragraph formatting
    pub paragraphs: Vec<ParagraphFormat>,
    /// Whether the reader can observe paragraph spacing at all
    pub spacing_observable: bool,
}

/// Effective font of a text run. `None` means the run declares nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct RunFormat {
    /// Font name
    pub font: Option<String>,
    /// Size in points
    pub size: Option<f32>,
}

/// Effective formatting of a paragraph, in points.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParagraphFormat {
    /// Left indent
    pub indent_left: Option<f32>,
    /// First-line indent, negative for hanging
    pub indent_first_line: Option<f32>,
    /// Space before
    pub space_before: Option<f32>,
    /// Space after
    pub space_after: Option<f32>,
    /// Line spacing
    pub line_spacing: Option<f32>,
}

/// Margin source for a document.
#[derive(Debug, Clone, PartialEq)]
pub enum MarginEvidence {
    /// Margins declared per section (DOCX `w:pgMar`)
    Declared(Vec<Margins>),
    /// Page extents with the box enclosing rendered text (PDF)
    TextExtents(Vec<PageExtent>),
}

impl Default for MarginEvidence {
    fn default() -> Self {
        MarginEvidence::Declared(Vec::new())
    }
}

/// Page size with the bounding box of its text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageExtent {
    /// Page number (1-indexed)
    pub page_number: u32,
    /// Page width in points
    pub width: f32,
    /// Page height in points
    pub height: f32,
    /// Text box, or `None` when the page has no text
    pub text_box: Option<TextBox>,
}

impl PageExtent {
    /// Margins implied by the text box.
    pub fn margins(&self) -> Option<Margins> {
        let text_box = self.text_box?;
        Some(Margins {
            top: Some(self.height - text_box.top),
            bottom: Some(text_box.bottom),
            left: Some(text_box.left),
            right: Some(self.width - text_box.right),
        })
    }
}

/// Enclosing box of rendered text in PDF user space (bottom-left origin).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextBox {
    /// Minimum x
    pub left: f32,
    /// Maximum x plus estimated width
    pub right: f32,
    /// Maximum top
    pub top: f32,
    /// Minimum bottom
    pub bottom: f32,
}
