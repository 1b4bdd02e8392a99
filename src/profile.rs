//! Formatting signature extraction.
//!
//! Works only from [`FormattingEvidence`], so the extractor never needs to
//! know how a reader gathered it. A metric that cannot be observed stays
//! `None` and gets a warning naming it.

use std::collections::{BTreeSet, HashMap};

use crate::model::{distinct_values, FormatProfile, Indentation, Margins, SourceType, Spacing};
use crate::parser::{FormattingEvidence, MarginEvidence, RawStructure};

const NO_DOCX_FONTS: &str = "No explicit fonts detected; document may rely on default styles.";
const NO_DOCX_SIZES: &str = "No explicit font sizes detected; document may rely on default styles.";
const NO_PDF_FONTS: &str = "No font metadata detected; PDF text might be outlined or image-based.";
const NO_PDF_MARGINS: &str = "Unable to derive PDF margins (no text detected).";
const NO_TEXT: &str = "No extractable text.";

/// Strip a PDF subset prefix (`ABCDEF+Arial` becomes `Arial`).
///
/// Returns `None` for names that are empty after stripping.
pub fn normalize_font_name(name: &str) -> Option<String> {
    let normalized = name.rsplit('+').next().unwrap_or(name).trim();
    (!normalized.is_empty()).then(|| normalized.to_string())
}

/// Most frequent value after rounding to two decimals.
///
/// Ties go to the value seen first.
pub fn most_common_value<I: IntoIterator<Item = f32>>(values: I) -> Option<f32> {
    let mut counts: HashMap<i64, (usize, usize)> = HashMap::new();
    for (index, value) in values.into_iter().filter(|v| v.is_finite()).enumerate() {
        let key = (value * 100.0).round() as i64;
        counts.entry(key).or_insert((0, index)).0 += 1;
    }
    counts
        .into_iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|(key, _)| key as f32 / 100.0)
}

/// Derives a [`FormatProfile`] from a reader's formatting evidence.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatProfileExtractor;

impl FormatProfileExtractor {
    /// Create an extractor.
    pub fn new() -> Self {
        Self
    }

    /// Build the formatting signature of a document.
    pub fn extract(&self, raw: &RawStructure) -> FormatProfile {
        let evidence = &raw.formatting;
        let mut warnings = Vec::new();

        if raw.text.is_blank() && raw.blocks.is_empty() {
            warnings.push(NO_TEXT.to_string());
        }

        let fonts = collect_fonts(evidence);
        if fonts.is_none() {
            warnings.push(match raw.source_type {
                SourceType::Docx => NO_DOCX_FONTS.to_string(),
                SourceType::Pdf => NO_PDF_FONTS.to_string(),
            });
        }

        let font_sizes = distinct_values(evidence.runs.iter().filter_map(|r| r.size));
        if font_sizes.is_none() {
            warnings.push(match raw.source_type {
                SourceType::Docx => NO_DOCX_SIZES.to_string(),
                SourceType::Pdf => "font_sizes: no sized text found".to_string(),
            });
        }

        let margins = collect_margins(&evidence.margins);
        if margins.is_unknown() {
            warnings.push(match &evidence.margins {
                MarginEvidence::TextExtents(_) => NO_PDF_MARGINS.to_string(),
                MarginEvidence::Declared(_) => {
                    "margins: no section declares page margins".to_string()
                }
            });
        } else {
            for (name, value) in [
                ("margin_top", margins.top),
                ("margin_bottom", margins.bottom),
                ("margin_left", margins.left),
                ("margin_right", margins.right),
            ] {
                if value.is_none() {
                    warnings.push(format!("{name}: not declared"));
                }
            }
        }

        let paragraphs = &evidence.paragraphs;
        let indentation = Indentation {
            left: distinct_values(paragraphs.iter().filter_map(|p| p.indent_left)),
            first_line: distinct_values(paragraphs.iter().filter_map(|p| p.indent_first_line)),
        };
        let mut spacing = Spacing {
            before: distinct_values(paragraphs.iter().filter_map(|p| p.space_before)),
            after: distinct_values(paragraphs.iter().filter_map(|p| p.space_after)),
            line: distinct_values(paragraphs.iter().filter_map(|p| p.line_spacing)),
        };

        if evidence.spacing_observable {
            for (name, values) in [
                ("spacing_before", &spacing.before),
                ("spacing_after", &spacing.after),
            ] {
                if values.is_none() {
                    warnings.push(format!("{name}: no paragraph declares it"));
                }
            }
        } else {
            spacing.before = None;
            spacing.after = None;
            warnings.push(format!(
                "spacing_before/spacing_after: paragraph spacing is not observable in {}",
                raw.source_type
            ));
        }

        for (name, values) in [
            ("indentation_left", &indentation.left),
            ("indentation_first_line", &indentation.first_line),
            ("line_spacing", &spacing.line),
        ] {
            if values.is_none() {
                warnings.push(format!("{name}: not determinable"));
            }
        }

        log::debug!(
            "Profiled {} document: {} run(s), {} paragraph(s), {} warning(s)",
            raw.source_type,
            evidence.runs.len(),
            paragraphs.len(),
            warnings.len()
        );

        FormatProfile {
            margins,
            fonts,
            font_sizes,
            indentation,
            spacing,
            warnings,
        }
    }
}

fn collect_fonts(evidence: &FormattingEvidence) -> Option<BTreeSet<String>> {
    let fonts: BTreeSet<String> = evidence
        .runs
        .iter()
        .filter_map(|run| run.font.as_deref())
        .filter_map(normalize_font_name)
        .collect();
    (!fonts.is_empty()).then_some(fonts)
}

fn collect_margins(evidence: &MarginEvidence) -> Margins {
    let per_unit: Vec<Margins> = match evidence {
        MarginEvidence::Declared(declared) => declared.clone(),
        MarginEvidence::TextExtents(extents) => {
            extents.iter().filter_map(|extent| extent.margins()).collect()
        }
    };
    Margins {
        top: most_common_value(per_unit.iter().filter_map(|m| m.top)),
        bottom: most_common_value(per_unit.iter().filter_map(|m| m.bottom)),
        left: most_common_value(per_unit.iter().filter_map(|m| m.left)),
        right: most_common_value(per_unit.iter().filter_map(|m| m.right)),
    }
}
