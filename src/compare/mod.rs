//! Cross-document comparison.
//!
//! [`ConsistencyComparator`] checks formatting profiles against each other
//! under per-metric tolerances. [`TitleComparator`] checks that documents
//! carry the same title. Neither fails on missing data; absent values are
//! reported as outcomes instead.

mod consistency;
mod title;

pub use consistency::{
    CandidateReport, CompareOptions, ConsistencyComparator, ConsistencyReport, DocumentWarnings,
    Metric, MetricOutcome, MetricResult, ReferenceReport, Tolerances,
};
pub use title::{normalize_title, TitleCell, TitleComparator, TitleComparison};
