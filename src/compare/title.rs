//! Title equivalence across documents.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::model::UnifiedDocument;
use crate::parser::is_placement_marker;

fn whitespace_run() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace pattern"))
}

/// Normalize a title for comparison: NFKC, trim, collapse whitespace, lowercase.
///
/// # Example
/// ```
/// use docunify::compare::normalize_title;
///
/// assert_eq!(normalize_title("  Annual\u{00A0}  REPORT "), "annual report");
/// assert_eq!(normalize_title("ﬁnal"), "final");
/// ```
pub fn normalize_title(title: &str) -> String {
    let composed: String = title.nfkc().collect();
    whitespace_run()
        .replace_all(composed.trim(), " ")
        .to_lowercase()
}

/// One document's title in a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleCell {
    /// Input label
    pub label: String,
    /// Candidate title as found in the document
    pub title: Option<String>,
    /// Whether the title matches
    pub matches: bool,
}

/// Titles of a group compared against a reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleComparison {
    /// Reference cell, true iff every candidate matched
    pub reference: TitleCell,
    /// One cell per candidate, in input order
    pub candidates: Vec<TitleCell>,
}

impl TitleComparison {
    /// Whether every candidate matched the reference.
    pub fn all_match(&self) -> bool {
        self.reference.matches
    }
}

/// Extracts candidate titles and checks their equivalence.
#[derive(Debug, Clone, Copy, Default)]
pub struct TitleComparator;

impl TitleComparator {
    /// Create a comparator.
    pub fn new() -> Self {
        Self
    }

    /// Candidate title of a document.
    ///
    /// The first top-level section's title when it has one, else the first
    /// non-empty paragraph (skipping table and image markers), else the
    /// first non-empty line of the first page with text.
    pub fn candidate_title(&self, document: &UnifiedDocument) -> Option<String> {
        let from_section = document
            .sections()
            .first()
            .map(|s| s.title.trim())
            .filter(|t| !t.is_empty());
        if let Some(title) = from_section {
            return Some(title.to_string());
        }

        let text = document.text();
        if let Some(paragraphs) = &text.paragraphs {
            return paragraphs
                .iter()
                .map(|p| p.trim())
                .find(|p| !p.is_empty() && !is_placement_marker(p))
                .map(str::to_string);
        }

        text.pages.as_ref().and_then(|pages| {
            pages
                .iter()
                .flat_map(|page| page.text.lines())
                .map(str::trim)
                .find(|line| !line.is_empty())
                .map(str::to_string)
        })
    }

    /// Whether two titles are present and equal after normalization.
    pub fn titles_match(&self, a: Option<&str>, b: Option<&str>) -> bool {
        match (a, b) {
            (Some(a), Some(b)) => normalize_title(a) == normalize_title(b),
            _ => false,
        }
    }

    /// Compare each candidate's title against the reference's.
    pub fn compare(
        &self,
        reference: (&str, &UnifiedDocument),
        candidates: &[(&str, &UnifiedDocument)],
    ) -> TitleComparison {
        self.compare_titles(
            (reference.0, self.candidate_title(reference.1)),
            candidates
                .iter()
                .map(|(label, document)| (*label, self.candidate_title(document)))
                .collect(),
        )
    }

    /// Compare already extracted titles. A missing title never matches.
    pub fn compare_titles(
        &self,
        reference: (&str, Option<String>),
        candidates: Vec<(&str, Option<String>)>,
    ) -> TitleComparison {
        let (reference_label, reference_title) = reference;
        let cells: Vec<TitleCell> = candidates
            .into_iter()
            .map(|(label, title)| {
                let matches = self.titles_match(reference_title.as_deref(), title.as_deref());
                TitleCell {
                    label: label.to_string(),
                    title,
                    matches,
                }
            })
            .collect();

        let all_match = cells.iter().all(|c| c.matches);
        log::debug!(
            "Title comparison against '{}': {}/{} match",
            reference_label,
            cells.iter().filter(|c| c.matches).count(),
            cells.len()
        );

        TitleComparison {
            reference: TitleCell {
                label: reference_label.to_string(),
                title: reference_title,
                matches: all_match,
            },
            candidates: cells,
        }
    }
}
