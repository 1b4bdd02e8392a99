//! # docunify
//!
//! Normalize DOCX and PDF documents into one structural model, and compare
//! titles and formatting across documents.
//!
//! ## Quick Start
//!
//! ```no_run
//! use docunify::{parse_file, render};
//!
//! fn main() -> docunify::Result<()> {
//!     let doc = parse_file("report.pdf")?;
//!     println!("{} sections", doc.extras().section_count());
//!
//!     let json = render::to_json(&doc, render::JsonFormat::Pretty)?;
//!     println!("{}", json);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **One output schema**: sections, text, tables, images and metadata for both formats
//! - **OCR fallback**: image-only PDFs go through a pluggable rasterizer and OCR engine
//! - **Format profiles**: margins, fonts, sizes, indentation and spacing per document
//! - **Consistency checks**: tolerance-based comparison of two or three profiles
//! - **Title checks**: normalized title equivalence against a reference
//! - **Parallel processing**: Uses Rayon for pages and for multi-document requests

pub mod compare;
pub mod detect;
pub mod error;
pub mod model;
pub mod ocr;
pub mod parser;
pub mod pipeline;
pub mod profile;
pub mod render;
pub mod sections;

// Re-export commonly used types
pub use compare::{
    CompareOptions, ConsistencyComparator, ConsistencyReport, Metric, MetricOutcome,
    TitleComparator, TitleComparison,
};
pub use detect::{detect_format_from_bytes, detect_format_from_path};
pub use error::{Error, Result};
pub use model::{
    FormatProfile, Image, Metadata, Section, SourceType, Table, TextModel, UnifiedDocument,
};
pub use ocr::{OcrEngine, OcrFallback, PageRasterizer};
pub use parser::{ErrorMode, ParseOptions, StructuralReader};
pub use pipeline::{
    compare_document_titles, compare_formats, compare_formats_against_reference, content_hash,
    parse_document, process_document, profile_document, DocumentInput, FormatComparison,
    ProcessedDocument, ReferenceFormatComparison,
};
#[cfg(feature = "async")]
pub use pipeline::parse_async;
pub use profile::FormatProfileExtractor;
pub use render::JsonFormat;
pub use sections::SectionBuilder;

use std::path::Path;

/// Parse a DOCX or PDF file, taking the format from its extension.
///
/// # Example
///
/// ```no_run
/// use docunify::parse_file;
///
/// let doc = parse_file("thesis.docx").unwrap();
/// println!("Tables: {}", doc.extras().table_count());
/// ```
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<UnifiedDocument> {
    parse_file_with_options(path, &ParseOptions::default())
}

/// Parse a file with custom options.
///
/// # Example
///
/// ```no_run
/// use docunify::{parse_file_with_options, ParseOptions};
///
/// let options = ParseOptions::new().without_ocr().sequential();
/// let doc = parse_file_with_options("scan.pdf", &options).unwrap();
/// ```
pub fn parse_file_with_options<P: AsRef<Path>>(
    path: P,
    options: &ParseOptions,
) -> Result<UnifiedDocument> {
    let input = DocumentInput::from_path(path)?;
    parse_document(&input.data, input.source_type, options)
}

/// Parse document bytes of a declared format.
///
/// # Example
///
/// ```no_run
/// use docunify::{parse_bytes, SourceType};
///
/// let data = std::fs::read("report.pdf").unwrap();
/// let doc = parse_bytes(&data, SourceType::Pdf).unwrap();
/// ```
pub fn parse_bytes(data: &[u8], source_type: SourceType) -> Result<UnifiedDocument> {
    parse_document(data, source_type, &ParseOptions::default())
}

/// Parse a file and render it as JSON.
///
/// # Example
///
/// ```no_run
/// use docunify::{to_json, JsonFormat};
///
/// let json = to_json("report.pdf", JsonFormat::Pretty).unwrap();
/// std::fs::write("report.json", json).unwrap();
/// ```
pub fn to_json<P: AsRef<Path>>(path: P, format: JsonFormat) -> Result<String> {
    let doc = parse_file(path)?;
    render::to_json(&doc, format)
}

/// Builder for parsing and comparing documents.
///
/// # Example
///
/// ```no_run
/// use docunify::Docunify;
///
/// let result = Docunify::new()
///     .without_ocr()
///     .lenient()
///     .parse("report.docx")?;
/// println!("{}", result.to_json()?);
/// # Ok::<(), docunify::Error>(())
/// ```
#[derive(Clone, Default)]
pub struct Docunify {
    parse_options: ParseOptions,
    compare_options: CompareOptions,
    json_format: JsonFormat,
}

impl Docunify {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable lenient mode.
    pub fn lenient(mut self) -> Self {
        self.parse_options = self.parse_options.lenient();
        self
    }

    /// Disable the OCR fallback.
    pub fn without_ocr(mut self) -> Self {
        self.parse_options = self.parse_options.without_ocr();
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.parse_options = self.parse_options.sequential();
        self
    }

    /// Enable or disable image extraction.
    pub fn with_images(mut self, extract: bool) -> Self {
        self.parse_options = self.parse_options.with_images(extract);
        self
    }

    /// Replace the parse options.
    pub fn with_parse_options(mut self, options: ParseOptions) -> Self {
        self.parse_options = options;
        self
    }

    /// Replace the comparison options.
    pub fn with_compare_options(mut self, options: CompareOptions) -> Self {
        self.compare_options = options;
        self
    }

    /// Emit compact instead of pretty JSON.
    pub fn compact(mut self) -> Self {
        self.json_format = JsonFormat::Compact;
        self
    }

    /// Parse a file.
    pub fn parse<P: AsRef<Path>>(&self, path: P) -> Result<DocunifyResult> {
        let input = DocumentInput::from_path(path)?;
        self.parse_input(&input)
    }

    /// Parse an in-memory input.
    pub fn parse_input(&self, input: &DocumentInput) -> Result<DocunifyResult> {
        let processed = process_document(&input.data, input.source_type, &self.parse_options)?;
        Ok(DocunifyResult {
            processed,
            json_format: self.json_format,
        })
    }

    /// Compare formatting consistency across two or three inputs.
    pub fn compare_formats(&self, inputs: &[DocumentInput]) -> Result<FormatComparison> {
        compare_formats(inputs, &self.parse_options, &self.compare_options)
    }

    /// Compare candidate titles against a reference.
    pub fn compare_titles(
        &self,
        reference: &DocumentInput,
        candidates: &[DocumentInput],
    ) -> Result<TitleComparison> {
        compare_document_titles(reference, candidates, &self.parse_options)
    }
}

/// Result of a [`Docunify::parse`] call.
#[derive(Debug, Clone)]
pub struct DocunifyResult {
    processed: ProcessedDocument,
    json_format: JsonFormat,
}

impl DocunifyResult {
    /// The unified document.
    pub fn document(&self) -> &UnifiedDocument {
        &self.processed.document
    }

    /// The formatting signature.
    pub fn profile(&self) -> &FormatProfile {
        &self.processed.profile
    }

    /// Warnings from extraction and OCR.
    pub fn warnings(&self) -> &[String] {
        &self.processed.warnings
    }

    /// Render the document as JSON.
    pub fn to_json(&self) -> Result<String> {
        render::to_json(self.document(), self.json_format)
    }

    /// Consume the result and return the document.
    pub fn into_document(self) -> UnifiedDocument {
        self.processed.document
    }
}
