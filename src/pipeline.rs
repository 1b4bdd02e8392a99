//! The normalization pipeline and multi-document operations.
//!
//! One document flows strictly forward:
//! reader → OCR fallback (PDF only) → sections and profile → assembly.
//! Multi-document operations run that same pipeline for every input on
//! the rayon pool and merge the results at a comparator.

use std::path::Path;

use md5::{Digest, Md5};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::compare::{
    CompareOptions, ConsistencyComparator, ConsistencyReport, ReferenceReport, TitleComparator,
    TitleComparison,
};
use crate::detect;
use crate::error::{Error, Result};
use crate::model::{FormatProfile, SourceType, TextModel, UnifiedDocument};
use crate::ocr::OcrFallback;
use crate::parser::{reader_for, ErrorMode, ParseOptions, RawBlock, RawStructure};
use crate::profile::FormatProfileExtractor;
use crate::sections::SectionBuilder;

/// A labelled document submitted to the pipeline.
#[derive(Debug, Clone)]
pub struct DocumentInput {
    /// Caller-chosen label, echoed in reports
    pub label: String,
    /// File content
    pub data: Vec<u8>,
    /// Declared source format
    pub source_type: SourceType,
}

impl DocumentInput {
    /// Create an input from bytes.
    pub fn new(label: impl Into<String>, data: Vec<u8>, source_type: SourceType) -> Self {
        Self {
            label: label.into(),
            data,
            source_type,
        }
    }

    /// Read a file, taking the source format from its extension and the
    /// label from its file name.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let source_type = SourceType::from_declared(&name)?;
        let data = std::fs::read(path)?;
        Ok(Self::new(name, data, source_type))
    }
}

/// Everything the pipeline produced for one document.
#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    /// Assembled output
    pub document: UnifiedDocument,
    /// Formatting signature
    pub profile: FormatProfile,
    /// Non-fatal problems from extraction and OCR
    pub warnings: Vec<String>,
}

/// Run the full pipeline on one document.
///
/// # Errors
/// * [`Error::UnsupportedFormat`] when the bytes do not match `source_type`
/// * [`Error::Parse`] when the content is unreadable
/// * [`Error::Timeout`] when OCR exceeds its bound
pub fn process_document(
    data: &[u8],
    source_type: SourceType,
    options: &ParseOptions,
) -> Result<ProcessedDocument> {
    detect::verify(data, source_type)?;

    let reader = reader_for(source_type, options);
    let raw = reader.extract(data)?;
    log::debug!(
        "{} reader produced {} block(s), {} table(s), {} image(s)",
        source_type,
        raw.blocks.len(),
        raw.tables.len(),
        raw.images.len()
    );

    let profile = FormatProfileExtractor::new().extract(&raw);
    let RawStructure {
        metadata,
        blocks,
        text,
        tables,
        images,
        mut warnings,
        ..
    } = raw;

    let mut sections = SectionBuilder::build(&blocks);
    let mut text = text;
    let mut ocr_applied = false;

    if source_type == SourceType::Pdf {
        if let Some(fallback) = OcrFallback::from_options(options) {
            let outcome = fallback.apply(data, text)?;
            if outcome.applied {
                sections = SectionBuilder::build(&recognized_blocks(&outcome.text));
            }
            text = outcome.text;
            ocr_applied = outcome.applied;
            warnings.extend(outcome.warnings);
        }
    }

    for warning in &warnings {
        log::warn!("{}", warning);
    }

    let document = UnifiedDocument::new(
        source_type,
        metadata,
        sections,
        text,
        tables,
        images,
        ocr_applied,
    );

    Ok(ProcessedDocument {
        document,
        profile,
        warnings,
    })
}

/// Paragraph blocks from OCR page text. Blank lines separate paragraphs.
fn recognized_blocks(text: &TextModel) -> Vec<RawBlock> {
    let mut blocks = Vec::new();
    for page in text.pages.iter().flatten() {
        let mut current: Vec<&str> = Vec::new();
        for line in page.text.lines().map(str::trim) {
            if line.is_empty() {
                if !current.is_empty() {
                    blocks.push(RawBlock::recognized(current.join(" "), page.page_number));
                    current.clear();
                }
            } else {
                current.push(line);
            }
        }
        if !current.is_empty() {
            blocks.push(RawBlock::recognized(current.join(" "), page.page_number));
        }
    }
    blocks
}

/// Parse one document into the unified model.
pub fn parse_document(
    data: &[u8],
    source_type: SourceType,
    options: &ParseOptions,
) -> Result<UnifiedDocument> {
    process_document(data, source_type, options).map(|p| p.document)
}

/// Derive the formatting signature of one document.
pub fn profile_document(
    data: &[u8],
    source_type: SourceType,
    options: &ParseOptions,
) -> Result<FormatProfile> {
    process_document(data, source_type, options).map(|p| p.profile)
}

/// Parse a document on the blocking pool of the current tokio runtime.
#[cfg(feature = "async")]
pub async fn parse_async(input: DocumentInput, options: ParseOptions) -> Result<UnifiedDocument> {
    tokio::task::spawn_blocking(move || parse_document(&input.data, input.source_type, &options))
        .await
        .map_err(|e| Error::Other(format!("parse task failed: {}", e)))?
}

/// MD5 hex digest of file content, the persistence layer's dedup key.
///
/// # Example
/// ```
/// assert_eq!(docunify::content_hash(b""), "d41d8cd98f00b204e9800998ecf8427e");
/// ```
pub fn content_hash(data: &[u8]) -> String {
    format!("{:x}", Md5::digest(data))
}

/// Per-input entry of a format comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    /// Input label
    pub label: String,
    /// Declared source format
    pub source_type: SourceType,
    /// Formatting signature, when the input parsed
    pub profile: Option<FormatProfile>,
    /// Why the input failed to parse
    pub error: Option<String>,
}

/// Result of comparing formatting across documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatComparison {
    /// One entry per input, in input order
    pub documents: Vec<DocumentSummary>,
    /// Comparison of the parsed inputs, or `None` when fewer than two parsed
    pub consistency: Option<ConsistencyReport>,
}

/// Result of comparing formatting against a reference document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceFormatComparison {
    /// Reference first, then candidates in input order
    pub documents: Vec<DocumentSummary>,
    /// Per-candidate reports, or `None` when the reference or every candidate failed
    pub comparison: Option<ReferenceReport>,
}

/// Run the pipeline for every input on the rayon pool.
///
/// Strict mode fails with the first error in input order.
fn process_all(
    inputs: &[&DocumentInput],
    options: &ParseOptions,
) -> Result<Vec<(DocumentSummary, Option<ProcessedDocument>)>> {
    let results: Vec<Result<ProcessedDocument>> = inputs
        .par_iter()
        .map(|input| process_document(&input.data, input.source_type, options))
        .collect();

    inputs
        .iter()
        .zip(results)
        .map(|(input, result)| match result {
            Ok(processed) => Ok((
                DocumentSummary {
                    label: input.label.clone(),
                    source_type: input.source_type,
                    profile: Some(processed.profile.clone()),
                    error: None,
                },
                Some(processed),
            )),
            Err(e) if options.error_mode == ErrorMode::Strict => Err(e),
            Err(e) => {
                log::warn!("{}: {}", input.label, e);
                Ok((
                    DocumentSummary {
                        label: input.label.clone(),
                        source_type: input.source_type,
                        profile: None,
                        error: Some(e.to_string()),
                    },
                    None,
                ))
            }
        })
        .collect()
}

fn check_count(count: usize) -> Result<()> {
    if (2..=3).contains(&count) {
        Ok(())
    } else {
        Err(Error::InvalidComparison(count))
    }
}

/// Compare formatting consistency across two or three documents.
///
/// In lenient mode, inputs that fail to parse are reported with their
/// error and the rest are still compared when at least two parsed.
pub fn compare_formats(
    inputs: &[DocumentInput],
    parse_options: &ParseOptions,
    compare_options: &CompareOptions,
) -> Result<FormatComparison> {
    check_count(inputs.len())?;

    let refs: Vec<&DocumentInput> = inputs.iter().collect();
    let documents: Vec<DocumentSummary> = process_all(&refs, parse_options)?
        .into_iter()
        .map(|(summary, _)| summary)
        .collect();

    let parsed: Vec<(&str, &FormatProfile)> = documents
        .iter()
        .filter_map(|d| d.profile.as_ref().map(|p| (d.label.as_str(), p)))
        .collect();

    let consistency = if parsed.len() >= 2 {
        Some(ConsistencyComparator::new(*compare_options).compare(&parsed)?)
    } else {
        log::warn!(
            "Only {} of {} inputs parsed; skipping consistency check",
            parsed.len(),
            inputs.len()
        );
        None
    };

    Ok(FormatComparison {
        documents,
        consistency,
    })
}

/// Compare the formatting of one or two candidates against a reference.
pub fn compare_formats_against_reference(
    reference: &DocumentInput,
    candidates: &[DocumentInput],
    parse_options: &ParseOptions,
    compare_options: &CompareOptions,
) -> Result<ReferenceFormatComparison> {
    check_count(candidates.len() + 1)?;

    let refs: Vec<&DocumentInput> = std::iter::once(reference).chain(candidates).collect();
    let documents: Vec<DocumentSummary> = process_all(&refs, parse_options)?
        .into_iter()
        .map(|(summary, _)| summary)
        .collect();

    let mut parsed = documents
        .iter()
        .map(|d| d.profile.as_ref().map(|p| (d.label.as_str(), p)));
    let reference_profile = parsed.next().flatten();
    let candidate_profiles: Vec<(&str, &FormatProfile)> = parsed.flatten().collect();

    let comparison = match reference_profile {
        Some(reference) if !candidate_profiles.is_empty() => Some(
            ConsistencyComparator::new(*compare_options)
                .compare_against_reference(reference, &candidate_profiles)?,
        ),
        _ => None,
    };

    Ok(ReferenceFormatComparison {
        documents,
        comparison,
    })
}

/// Compare each candidate's title against the reference's.
///
/// Takes one or two candidates. In lenient mode a document that fails to
/// parse has no title, so its cell is false.
pub fn compare_document_titles(
    reference: &DocumentInput,
    candidates: &[DocumentInput],
    options: &ParseOptions,
) -> Result<TitleComparison> {
    check_count(candidates.len() + 1)?;

    let refs: Vec<&DocumentInput> = std::iter::once(reference).chain(candidates).collect();
    let comparator = TitleComparator::new();

    let mut titles = process_all(&refs, options)?
        .into_iter()
        .zip(&refs)
        .map(|((_, processed), input)| {
            let title = processed.and_then(|p| comparator.candidate_title(&p.document));
            (input.label.as_str(), title)
        });

    let reference_title = titles
        .next()
        .unwrap_or((reference.label.as_str(), None));
    Ok(comparator.compare_titles(reference_title, titles.collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash() {
        assert_eq!(content_hash(b"abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_recognized_blocks_split_on_blank_lines() {
        let text = TextModel::from_pages(vec![
            crate::model::PageText::new(1, "Scanned Title\n\nfirst line\nsecond line\n".into()),
            crate::model::PageText::new(2, String::new()),
        ]);
        let blocks = recognized_blocks(&text);
        let texts: Vec<&str> = blocks.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["Scanned Title", "first line second line"]);
        assert!(blocks.iter().all(|b| b.page == Some(1)));
    }

    #[test]
    fn test_comparison_input_count() {
        let input = DocumentInput::new("a.pdf", b"%PDF-1.4".to_vec(), SourceType::Pdf);
        let err = compare_formats(
            &[input.clone()],
            &ParseOptions::default(),
            &CompareOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidComparison(1)));

        let err = compare_formats_against_reference(
            &input,
            &[input.clone(), input.clone(), input.clone()],
            &ParseOptions::default(),
            &CompareOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidComparison(4)));

        let lenient = ParseOptions::default().lenient().without_ocr();
        let err = compare_document_titles(&input, &[], &lenient).unwrap_err();
        assert!(matches!(err, Error::InvalidComparison(1)));

        let many = [input.clone(), input.clone(), input.clone()];
        let err = compare_document_titles(&input, &many, &lenient).unwrap_err();
        assert!(matches!(err, Error::InvalidComparison(4)));
    }

    #[test]
    fn test_mismatched_declared_type() {
        let err = parse_document(b"%PDF-1.7\n", SourceType::Docx, &ParseOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn test_lenient_reports_errors_without_comparison() {
        let broken = |label: &str| {
            DocumentInput::new(label, b"%PDF-1.4\ngarbage".to_vec(), SourceType::Pdf)
        };
        let options = ParseOptions::default().lenient().without_ocr();
        let result = compare_formats(
            &[broken("a.pdf"), broken("b.pdf")],
            &options,
            &CompareOptions::default(),
        )
        .unwrap();
        assert_eq!(result.documents.len(), 2);
        assert!(result.documents.iter().all(|d| d.error.is_some()));
        assert!(result.consistency.is_none());

        let strict = ParseOptions::default().without_ocr();
        assert!(compare_formats(
            &[broken("a.pdf"), broken("b.pdf")],
            &strict,
            &CompareOptions::default()
        )
        .is_err());
    }
}
