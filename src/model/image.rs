//! Embedded image types.

use serde::{Deserialize, Serialize};

/// An image extracted from a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    /// Image identifier
    pub id: String,

    /// MIME type (e.g., "image/png")
    pub mime_type: String,

    /// Width in pixels
    pub width: Option<u32>,

    /// Height in pixels
    pub height: Option<u32>,

    /// Placement and provenance
    pub metadata: ImageMetadata,

    /// Raw binary data, base64 encoded in JSON
    #[serde(default, skip_serializing_if = "Vec::is_empty", with = "base64_payload")]
    pub data: Vec<u8>,
}

mod base64_payload {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

impl Image {
    /// Create an image from its payload, detecting the MIME type from magic bytes.
    pub fn new(id: impl Into<String>, data: Vec<u8>) -> Self {
        let mime_type = detect_mime_type(&data)
            .unwrap_or("application/octet-stream")
            .to_string();
        let metadata = ImageMetadata {
            size_bytes: data.len(),
            ..ImageMetadata::default()
        };
        Self {
            id: id.into(),
            mime_type,
            width: None,
            height: None,
            metadata,
            data,
        }
    }

    /// Override the MIME type.
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    /// Set pixel dimensions.
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Set the originating page and bounding box.
    pub fn with_placement(mut self, page: u32, bbox: BoundingBox) -> Self {
        self.metadata.page = Some(page);
        self.metadata.area = Some(bbox.area());
        self.metadata.bbox = Some(bbox);
        self
    }

    /// Set the package relationship the image was read from.
    pub fn with_relationship(mut self, relationship_id: impl Into<String>) -> Self {
        self.metadata.relationship_id = Some(relationship_id.into());
        self
    }

    /// Get the file extension based on MIME type.
    pub fn extension(&self) -> &str {
        match self.mime_type.as_str() {
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "image/gif" => "gif",
            "image/tiff" => "tiff",
            "image/bmp" => "bmp",
            "image/webp" => "webp",
            "image/jp2" => "jp2",
            "image/x-emf" => "emf",
            "image/x-wmf" => "wmf",
            _ => "bin",
        }
    }

    /// Suggested file name for writing the payload to disk.
    pub fn suggested_filename(&self) -> String {
        format!("{}.{}", self.id, self.extension())
    }
}

/// Image placement and provenance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    /// Originating page (PDF)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,

    /// Bounding box on the page (PDF)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,

    /// Bounding box area in square points (PDF)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<f32>,

    /// Package relationship id (DOCX)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_id: Option<String>,

    /// Declared display size in points (DOCX)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_size: Option<(f32, f32)>,

    /// Payload size in bytes
    pub size_bytes: usize,
}

/// A rectangle in page points with a top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge
    pub x0: f32,
    /// Top edge, measured down from the top of the page
    pub top: f32,
    /// Right edge
    pub x1: f32,
    /// Bottom edge, measured down from the top of the page
    pub bottom: f32,
}

impl BoundingBox {
    /// Width in points.
    pub fn width(&self) -> f32 {
        (self.x1 - self.x0).max(0.0)
    }

    /// Height in points.
    pub fn height(&self) -> f32 {
        (self.bottom - self.top).max(0.0)
    }

    /// Area in square points.
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Clip to the page rectangle.
    pub fn clip(&self, page_width: f32, page_height: f32) -> Self {
        Self {
            x0: self.x0.clamp(0.0, page_width),
            top: self.top.clamp(0.0, page_height),
            x1: self.x1.clamp(0.0, page_width),
            bottom: self.bottom.clamp(0.0, page_height),
        }
    }
}

/// Detect MIME type from data magic bytes.
pub fn detect_mime_type(data: &[u8]) -> Option<&'static str> {
    if data.len() < 8 {
        return None;
    }

    // JPEG: FF D8 FF
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }

    // PNG: 89 50 4E 47 0D 0A 1A 0A
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("image/png");
    }

    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        return Some("image/gif");
    }

    if data.starts_with(&[0x49, 0x49, 0x2A, 0x00]) || data.starts_with(&[0x4D, 0x4D, 0x00, 0x2A])
    {
        return Some("image/tiff");
    }

    if data.starts_with(b"BM") {
        return Some("image/bmp");
    }

    if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        return Some("image/webp");
    }

    // JPEG 2000: 00 00 00 0C 6A 50 20 20
    if data.starts_with(&[0x00, 0x00, 0x00, 0x0C, 0x6A, 0x50, 0x20, 0x20]) {
        return Some("image/jp2");
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_mime_type() {
        let jpeg_data = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46];
        assert_eq!(detect_mime_type(&jpeg_data), Some("image/jpeg"));

        let png_data = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(detect_mime_type(&png_data), Some("image/png"));

        let unknown = vec![0x00; 8];
        assert_eq!(detect_mime_type(&unknown), None);
    }

    #[test]
    fn test_placement_sets_area() {
        let bbox = BoundingBox {
            x0: 72.0,
            top: 100.0,
            x1: 172.0,
            bottom: 150.0,
        };
        let image = Image::new("pdf-image-1-1", vec![0; 4]).with_placement(1, bbox);
        assert_eq!(image.metadata.page, Some(1));
        assert_eq!(image.metadata.area, Some(5000.0));
        assert_eq!(image.metadata.size_bytes, 4);
        assert_eq!(image.mime_type, "application/octet-stream");
    }

    #[test]
    fn test_bbox_clip() {
        let bbox = BoundingBox {
            x0: -10.0,
            top: 5.0,
            x1: 700.0,
            bottom: 900.0,
        };
        let clipped = bbox.clip(612.0, 792.0);
        assert_eq!(clipped.x0, 0.0);
        assert_eq!(clipped.x1, 612.0);
        assert_eq!(clipped.bottom, 792.0);
    }

    #[test]
    fn test_payload_serialized_as_base64() {
        let image = Image::new("docx-image-1", b"hello".to_vec()).with_relationship("rId4");
        let json = serde_json::to_string(&image).unwrap();
        assert!(json.contains("\"data\":\"aGVsbG8=\""));
        assert!(json.contains("rId4"));
        assert_eq!(image.suggested_filename(), "docx-image-1.bin");

        let back: Image = serde_json::from_str(&json).unwrap();
        assert_eq!(back.data, b"hello");
    }

    #[test]
    fn test_empty_payload_omitted() {
        let image = Image::new("pdf-image-1-1", Vec::new());
        let json = serde_json::to_string(&image).unwrap();
        assert!(!json.contains("\"data\""));

        let back: Image = serde_json::from_str(&json).unwrap();
        assert!(back.data.is_empty());
    }
}
