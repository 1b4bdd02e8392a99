//! Rendering pipeline outputs.

mod json;

pub use json::{to_json, JsonFormat};
