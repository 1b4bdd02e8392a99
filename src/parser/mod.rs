//! Format readers.
//!
//! Each source format has one [`StructuralReader`]. [`reader_for`] picks it
//! once at pipeline entry; later stages only see [`RawStructure`].

mod backend;
mod docx_parser;
mod docx_styles;
mod layout;
mod options;
mod pdf_parser;
mod raw;
mod table_detector;

use crate::error::Result;
use crate::model::SourceType;

pub use backend::{EmbeddedImage, LopdfBackend, PdfBackend};
pub use docx_parser::{DocxParser, IMAGE_MARKER, TABLE_MARKER};
pub use layout::{FontStatistics, TextBlock, TextLine, TextSpan};
pub use options::{ErrorMode, ParseOptions};
pub use pdf_parser::PdfParser;
pub use raw::{
    FormattingEvidence, MarginEvidence, PageExtent, ParagraphFormat, RawBlock, RawStructure,
    RunFormat, StyleSignal, TextBox,
};
pub use table_detector::TableDetector;

/// Extracts raw structural primitives from one source format.
pub trait StructuralReader: Send + Sync {
    /// Format this reader understands.
    fn source_type(&self) -> SourceType;

    /// Read a complete file.
    fn extract(&self, data: &[u8]) -> Result<RawStructure>;
}

/// Select the reader for a source format.
pub fn reader_for(source_type: SourceType, options: &ParseOptions) -> Box<dyn StructuralReader> {
    match source_type {
        SourceType::Docx => Box::new(DocxParser::with_options(options)),
        SourceType::Pdf => Box::new(PdfParser::with_options(options)),
    }
}

/// Check whether a span of text marks a table or drawing placement.
pub fn is_placement_marker(text: &str) -> bool {
    matches!(text.trim(), TABLE_MARKER | IMAGE_MARKER)
}
