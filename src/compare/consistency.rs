//! Formatting consistency across two or three documents.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::FormatProfile;

/// Fewest profiles a comparison accepts.
pub const MIN_INPUTS: usize = 2;

/// Most profiles a comparison accepts.
pub const MAX_INPUTS: usize = 3;

// f32 rounding slack on tolerance checks
const EPSILON: f32 = 1e-4;

/// A compared formatting metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    MarginTop,
    MarginBottom,
    MarginLeft,
    MarginRight,
    Fonts,
    FontSizes,
    IndentationLeft,
    IndentationFirstLine,
    SpacingBefore,
    SpacingAfter,
    LineSpacing,
}

impl Metric {
    /// Every metric, in report order.
    pub const ALL: [Metric; 11] = [
        Metric::MarginTop,
        Metric::MarginBottom,
        Metric::MarginLeft,
        Metric::MarginRight,
        Metric::Fonts,
        Metric::FontSizes,
        Metric::IndentationLeft,
        Metric::IndentationFirstLine,
        Metric::SpacingBefore,
        Metric::SpacingAfter,
        Metric::LineSpacing,
    ];

    /// Stable snake_case name, as used in JSON and warnings.
    pub fn name(&self) -> &'static str {
        match self {
            Metric::MarginTop => "margin_top",
            Metric::MarginBottom => "margin_bottom",
            Metric::MarginLeft => "margin_left",
            Metric::MarginRight => "margin_right",
            Metric::Fonts => "fonts",
            Metric::FontSizes => "font_sizes",
            Metric::IndentationLeft => "indentation_left",
            Metric::IndentationFirstLine => "indentation_first_line",
            Metric::SpacingBefore => "spacing_before",
            Metric::SpacingAfter => "spacing_after",
            Metric::LineSpacing => "line_spacing",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Tolerances in points, per metric group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
    /// Page margins
    pub margin: f32,
    /// Font sizes
    pub font_size: f32,
    /// Left and first-line indentation
    pub indentation: f32,
    /// Space before and after paragraphs
    pub spacing: f32,
    /// Line spacing
    pub line_spacing: f32,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            margin: 0.5,
            font_size: 0.2,
            indentation: 0.5,
            spacing: 0.5,
            line_spacing: 0.5,
        }
    }
}

impl Tolerances {
    /// Tolerance applied to a metric. Font names compare exactly.
    pub fn for_metric(&self, metric: Metric) -> f32 {
        match metric {
            Metric::MarginTop | Metric::MarginBottom | Metric::MarginLeft | Metric::MarginRight => {
                self.margin
            }
            Metric::Fonts => 0.0,
            Metric::FontSizes => self.font_size,
            Metric::IndentationLeft | Metric::IndentationFirstLine => self.indentation,
            Metric::SpacingBefore | Metric::SpacingAfter => self.spacing,
            Metric::LineSpacing => self.line_spacing,
        }
    }
}

/// Options for consistency comparison.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CompareOptions {
    /// Per-group tolerances
    pub tolerances: Tolerances,
    /// Values one set may lack relative to another and still match
    pub set_allowance: usize,
}

impl CompareOptions {
    /// Create options with default tolerances.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the margin tolerance.
    pub fn with_margin_tolerance(mut self, points: f32) -> Self {
        self.tolerances.margin = points;
        self
    }

    /// Set the font size tolerance.
    pub fn with_font_size_tolerance(mut self, points: f32) -> Self {
        self.tolerances.font_size = points;
        self
    }

    /// Set the indentation tolerance.
    pub fn with_indentation_tolerance(mut self, points: f32) -> Self {
        self.tolerances.indentation = points;
        self
    }

    /// Set the paragraph spacing tolerance.
    pub fn with_spacing_tolerance(mut self, points: f32) -> Self {
        self.tolerances.spacing = points;
        self
    }

    /// Set the line spacing tolerance.
    pub fn with_line_spacing_tolerance(mut self, points: f32) -> Self {
        self.tolerances.line_spacing = points;
        self
    }

    /// Set how many unmatched set values are allowed.
    pub fn with_set_allowance(mut self, allowance: usize) -> Self {
        self.set_allowance = allowance;
        self
    }
}

/// How a metric comparison ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricOutcome {
    /// All values present and within tolerance
    Match,
    /// All values present, at least one pair out of tolerance
    Mismatch,
    /// Some inputs have a value and some do not
    PartiallyMissing,
    /// No input has a value
    Undeterminable,
}

/// Result for a single metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricResult {
    /// Whether the metric agrees across inputs
    pub matches: bool,
    /// Why it does or does not
    pub outcome: MetricOutcome,
}

impl MetricResult {
    fn from_outcome(outcome: MetricOutcome) -> Self {
        Self {
            matches: outcome == MetricOutcome::Match,
            outcome,
        }
    }
}

/// Warnings a document's profile carried into the comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentWarnings {
    /// Input label
    pub label: String,
    /// Profile warnings, unmodified
    pub warnings: Vec<String>,
}

/// Outcome of comparing two or three profiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyReport {
    /// Per-metric results
    pub metrics: BTreeMap<Metric, MetricResult>,
    /// Whether every metric matched
    pub all_match: bool,
    /// Tolerances the comparison applied
    pub tolerances: Tolerances,
    /// Per-document profile warnings
    pub document_warnings: Vec<DocumentWarnings>,
    /// Comparator warnings
    pub warnings: Vec<String>,
}

impl ConsistencyReport {
    /// Metrics that did not match, in report order.
    pub fn mismatched_metrics(&self) -> Vec<Metric> {
        self.metrics
            .iter()
            .filter(|(_, result)| !result.matches)
            .map(|(metric, _)| *metric)
            .collect()
    }

    /// Result for one metric.
    pub fn metric(&self, metric: Metric) -> Option<&MetricResult> {
        self.metrics.get(&metric)
    }
}

/// One candidate compared against the reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateReport {
    /// Candidate label
    pub label: String,
    /// Pairwise report against the reference
    pub report: ConsistencyReport,
    /// Metrics that differ from the reference
    pub mismatched_metrics: Vec<Metric>,
}

/// Outcome of comparing candidates against a reference profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceReport {
    /// Reference label
    pub reference: String,
    /// One entry per candidate, in input order
    pub candidates: Vec<CandidateReport>,
    /// Whether every candidate matched the reference on every metric
    pub all_match: bool,
}

/// Compares formatting profiles under tolerances.
#[derive(Debug, Clone, Default)]
pub struct ConsistencyComparator {
    options: CompareOptions,
}

impl ConsistencyComparator {
    /// Create a comparator.
    pub fn new(options: CompareOptions) -> Self {
        Self { options }
    }

    /// Options in use.
    pub fn options(&self) -> &CompareOptions {
        &self.options
    }

    /// Compare two or three labelled profiles.
    ///
    /// # Errors
    /// [`Error::InvalidComparison`] for any other input count.
    pub fn compare(&self, profiles: &[(&str, &FormatProfile)]) -> Result<ConsistencyReport> {
        if !(MIN_INPUTS..=MAX_INPUTS).contains(&profiles.len()) {
            return Err(Error::InvalidComparison(profiles.len()));
        }

        let tolerances = self.options.tolerances;
        let mut metrics = BTreeMap::new();
        let mut warnings = Vec::new();

        for metric in Metric::ALL {
            let outcome = match metric {
                Metric::Fonts => compare_font_sets(
                    profiles.iter().map(|(_, p)| p.fonts.as_ref()).collect(),
                    self.options.set_allowance,
                ),
                Metric::MarginTop
                | Metric::MarginBottom
                | Metric::MarginLeft
                | Metric::MarginRight => compare_scalars(
                    profiles.iter().map(|(_, p)| margin_value(p, metric)).collect(),
                    tolerances.for_metric(metric),
                ),
                _ => compare_numeric_sets(
                    profiles.iter().map(|(_, p)| set_value(p, metric)).collect(),
                    tolerances.for_metric(metric),
                    self.options.set_allowance,
                ),
            };
            if outcome == MetricOutcome::Undeterminable {
                warnings.push(format!("{metric}: undeterminable for all inputs"));
            }
            metrics.insert(metric, MetricResult::from_outcome(outcome));
        }

        let all_match = metrics.values().all(|r| r.matches);
        let document_warnings = profiles
            .iter()
            .map(|(label, profile)| DocumentWarnings {
                label: (*label).to_string(),
                warnings: profile.warnings.clone(),
            })
            .collect();

        log::debug!(
            "Compared {} profiles: all_match={}",
            profiles.len(),
            all_match
        );

        Ok(ConsistencyReport {
            metrics,
            all_match,
            tolerances,
            document_warnings,
            warnings,
        })
    }

    /// Compare each candidate independently against a reference profile.
    ///
    /// # Errors
    /// [`Error::InvalidComparison`] unless one or two candidates are given.
    pub fn compare_against_reference(
        &self,
        reference: (&str, &FormatProfile),
        candidates: &[(&str, &FormatProfile)],
    ) -> Result<ReferenceReport> {
        let total = candidates.len() + 1;
        if !(MIN_INPUTS..=MAX_INPUTS).contains(&total) {
            return Err(Error::InvalidComparison(total));
        }

        let candidates = candidates
            .iter()
            .map(|candidate| {
                let report = self.compare(&[reference, *candidate])?;
                let mismatched_metrics = report.mismatched_metrics();
                Ok(CandidateReport {
                    label: candidate.0.to_string(),
                    report,
                    mismatched_metrics,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let all_match = candidates.iter().all(|c| c.report.all_match);
        Ok(ReferenceReport {
            reference: reference.0.to_string(),
            candidates,
            all_match,
        })
    }
}

fn margin_value(profile: &FormatProfile, metric: Metric) -> Option<f32> {
    let margins = &profile.margins;
    match metric {
        Metric::MarginTop => margins.top,
        Metric::MarginBottom => margins.bottom,
        Metric::MarginLeft => margins.left,
        Metric::MarginRight => margins.right,
        _ => None,
    }
}

fn set_value(profile: &FormatProfile, metric: Metric) -> Option<&[f32]> {
    let values = match metric {
        Metric::FontSizes => &profile.font_sizes,
        Metric::IndentationLeft => &profile.indentation.left,
        Metric::IndentationFirstLine => &profile.indentation.first_line,
        Metric::SpacingBefore => &profile.spacing.before,
        Metric::SpacingAfter => &profile.spacing.after,
        Metric::LineSpacing => &profile.spacing.line,
        _ => return None,
    };
    values.as_deref()
}

/// Split out the null cases shared by every metric kind.
fn presence<T>(values: &[Option<T>]) -> Option<MetricOutcome> {
    let present = values.iter().filter(|v| v.is_some()).count();
    if present == 0 {
        Some(MetricOutcome::Undeterminable)
    } else if present < values.len() {
        Some(MetricOutcome::PartiallyMissing)
    } else {
        None
    }
}

fn within(a: f32, b: f32, tolerance: f32) -> bool {
    (a - b).abs() <= tolerance + EPSILON
}

/// Pairwise check that every value lies within `tolerance` of every other.
fn all_pairs<T>(values: &[T], agree: impl Fn(&T, &T) -> bool) -> MetricOutcome {
    for (i, a) in values.iter().enumerate() {
        for b in &values[i + 1..] {
            if !agree(a, b) {
                return MetricOutcome::Mismatch;
            }
        }
    }
    MetricOutcome::Match
}

fn compare_scalars(values: Vec<Option<f32>>, tolerance: f32) -> MetricOutcome {
    if let Some(outcome) = presence(&values) {
        return outcome;
    }
    let values: Vec<f32> = values.into_iter().flatten().collect();
    all_pairs(&values, |a, b| within(*a, *b, tolerance))
}

/// Values in `a` with no partner in `b` plus values in `b` with none in `a`.
fn unmatched_count(a: &[f32], b: &[f32], tolerance: f32) -> usize {
    let missing_from = |from: &[f32], other: &[f32]| {
        from.iter()
            .filter(|x| !other.iter().any(|y| within(**x, *y, tolerance)))
            .count()
    };
    missing_from(a, b) + missing_from(b, a)
}

fn compare_numeric_sets(
    values: Vec<Option<&[f32]>>,
    tolerance: f32,
    allowance: usize,
) -> MetricOutcome {
    if let Some(outcome) = presence(&values) {
        return outcome;
    }
    let values: Vec<&[f32]> = values.into_iter().flatten().collect();
    all_pairs(&values, |a, b| unmatched_count(a, b, tolerance) <= allowance)
}

fn compare_font_sets(values: Vec<Option<&BTreeSet<String>>>, allowance: usize) -> MetricOutcome {
    if let Some(outcome) = presence(&values) {
        return outcome;
    }
    let normalized: Vec<BTreeSet<String>> = values
        .into_iter()
        .flatten()
        .map(|fonts| fonts.iter().map(|f| f.trim().to_lowercase()).collect())
        .collect();
    all_pairs(&normalized, |a, b| a.symmetric_difference(b).count() <= allowance)
}
