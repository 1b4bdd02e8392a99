//! Formatting signature types.
//!
//! Every metric is optional. `None` means the value could not be
//! determined from the document and is never replaced by a default.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Per-document formatting signature used for consistency comparison.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatProfile {
    /// Page margins in points
    pub margins: Margins,

    /// Distinct font names in use
    pub fonts: Option<BTreeSet<String>>,

    /// Distinct font sizes in points, ascending
    pub font_sizes: Option<Vec<f32>>,

    /// Paragraph indentation values
    pub indentation: Indentation,

    /// Paragraph spacing values
    pub spacing: Spacing,

    /// Notes about metrics that could not be determined
    pub warnings: Vec<String>,
}

/// Page margins, each nullable individually.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    /// Top margin
    pub top: Option<f32>,
    /// Bottom margin
    pub bottom: Option<f32>,
    /// Left margin
    pub left: Option<f32>,
    /// Right margin
    pub right: Option<f32>,
}

impl Margins {
    /// Whether no side could be determined.
    pub fn is_unknown(&self) -> bool {
        self.top.is_none() && self.bottom.is_none() && self.left.is_none() && self.right.is_none()
    }
}

/// Distinct indentation values observed on paragraphs, in points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Indentation {
    /// Left indents
    pub left: Option<Vec<f32>>,
    /// First-line indents (negative for hanging)
    pub first_line: Option<Vec<f32>>,
}

/// Distinct spacing values observed on paragraphs, in points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Spacing {
    /// Space before paragraphs
    pub before: Option<Vec<f32>>,
    /// Space after paragraphs
    pub after: Option<Vec<f32>>,
    /// Line spacing
    pub line: Option<Vec<f32>>,
}

/// Sort and de-duplicate observed values, rounding to two decimals.
///
/// Returns `None` when nothing was observed.
pub fn distinct_values<I: IntoIterator<Item = f32>>(values: I) -> Option<Vec<f32>> {
    let mut values: Vec<f32> = values
        .into_iter()
        .filter(|v| v.is_finite())
        .map(|v| (v * 100.0).round() / 100.0)
        .collect();
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    values.dedup_by(|a, b| (*a - *b).abs() < 0.005);
    Some(values)
}
