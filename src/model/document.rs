//! Document-level types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Image, Section, Table, TextModel};

/// Source format of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// WordprocessingML package (.docx)
    Docx,
    /// Portable Document Format
    Pdf,
}

impl SourceType {
    /// File extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            SourceType::Docx => "docx",
            SourceType::Pdf => "pdf",
        }
    }

    /// MIME type of the format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            SourceType::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            SourceType::Pdf => "application/pdf",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceType::Docx => write!(f, "DOCX"),
            SourceType::Pdf => write!(f, "PDF"),
        }
    }
}

/// Page size in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageDimensions {
    /// Width in points
    pub width: f32,
    /// Height in points
    pub height: f32,
}

impl PageDimensions {
    /// Create page dimensions.
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// US Letter size (8.5" x 11").
    pub fn letter() -> Self {
        Self::new(612.0, 792.0)
    }
}

/// Document metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Declared document title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Document author
    pub author: Option<String>,

    /// Creation date
    pub created: Option<DateTime<Utc>>,

    /// Last modification date (DOCX)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,

    /// Who saved the document last (DOCX)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_by: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Free-text description (DOCX `dc:description`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,

    /// Whether primary extraction found any text
    pub has_text_content: bool,

    /// Total number of pages, when the format records it
    pub page_count: Option<u32>,

    /// Page sizes in document order
    pub page_dimensions: Vec<PageDimensions>,
}

/// Counters derived from a document's collections.
///
/// There is no way to set a counter directly; [`Extras::derive`] is the
/// only constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Extras {
    paragraph_count: usize,
    section_count: usize,
    table_count: usize,
    image_count: usize,
    ocr_applied: bool,
}

impl Extras {
    /// Derive counters from the assembled collections.
    ///
    /// The paragraph count is the paragraph stream length when the text
    /// model carries one, otherwise the number of body paragraphs in the
    /// section tree.
    pub fn derive(
        sections: &[Section],
        text: &TextModel,
        tables: &[Table],
        images: &[Image],
        ocr_applied: bool,
    ) -> Self {
        let paragraph_count = match &text.paragraphs {
            Some(paragraphs) => paragraphs.len(),
            None => sections.iter().map(Section::total_paragraphs).sum(),
        };

        Self {
            paragraph_count,
            section_count: sections.len(),
            table_count: tables.len(),
            image_count: images.len(),
            ocr_applied,
        }
    }

    /// Number of paragraphs.
    pub fn paragraph_count(&self) -> usize {
        self.paragraph_count
    }

    /// Number of top-level sections.
    pub fn section_count(&self) -> usize {
        self.section_count
    }

    /// Number of tables.
    pub fn table_count(&self) -> usize {
        self.table_count
    }

    /// Number of images.
    pub fn image_count(&self) -> usize {
        self.image_count
    }

    /// Whether OCR ran for at least one page.
    pub fn ocr_applied(&self) -> bool {
        self.ocr_applied
    }
}

/// The format-independent output of a parse request.
///
/// Built once by the assembler and read-only afterwards. Reading one back
/// from JSON derives the counters again; stored counter values are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredDocument")]
pub struct UnifiedDocument {
    source_type: SourceType,
    metadata: Metadata,
    sections: Vec<Section>,
    text: TextModel,
    tables: Vec<Table>,
    images: Vec<Image>,
    extras: Extras,
}

#[derive(Deserialize)]
struct StoredDocument {
    source_type: SourceType,
    metadata: Metadata,
    sections: Vec<Section>,
    text: TextModel,
    tables: Vec<Table>,
    images: Vec<Image>,
    #[serde(default)]
    extras: StoredExtras,
}

#[derive(Default, Deserialize)]
struct StoredExtras {
    #[serde(default)]
    ocr_applied: bool,
}

impl From<StoredDocument> for UnifiedDocument {
    fn from(stored: StoredDocument) -> Self {
        Self::new(
            stored.source_type,
            stored.metadata,
            stored.sections,
            stored.text,
            stored.tables,
            stored.images,
            stored.extras.ocr_applied,
        )
    }
}

impl UnifiedDocument {
    pub(crate) fn new(
        source_type: SourceType,
        metadata: Metadata,
        sections: Vec<Section>,
        text: TextModel,
        tables: Vec<Table>,
        images: Vec<Image>,
        ocr_applied: bool,
    ) -> Self {
        let extras = Extras::derive(&sections, &text, &tables, &images, ocr_applied);
        Self {
            source_type,
            metadata,
            sections,
            text,
            tables,
            images,
            extras,
        }
    }

    /// Source format.
    pub fn source_type(&self) -> SourceType {
        self.source_type
    }

    /// Document metadata.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Top-level sections.
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Text model.
    pub fn text(&self) -> &TextModel {
        &self.text
    }

    /// Tables in document order.
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Images in document order.
    pub fn images(&self) -> &[Image] {
        &self.images
    }

    /// Derived counters.
    pub fn extras(&self) -> &Extras {
        &self.extras
    }
}
