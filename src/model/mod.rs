//! Unified document model.
//!
//! These types are the format-independent output of the pipeline. Field
//! names are part of the JSON contract with downstream consumers.

mod document;
mod image;
mod profile;
mod section;
mod table;
mod text;

pub use document::{Extras, Metadata, PageDimensions, SourceType, UnifiedDocument};
pub use image::{detect_mime_type, BoundingBox, Image, ImageMetadata};
pub use profile::{distinct_values, FormatProfile, Indentation, Margins, Spacing};
pub use section::Section;
pub use table::Table;
pub use text::{FontGroup, PageLayout, PageText, StyledWord, TextModel};

pub(crate) use text::round_size;
