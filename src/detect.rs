//! Source format detection and validation.

use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::SourceType;

/// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";
const PDF_MAGIC_LEN: usize = 5;
const VERSION_LEN: usize = 3; // e.g., "1.7"

/// ZIP local file header: PK\x03\x04
const ZIP_MAGIC: &[u8] = &[0x50, 0x4B, 0x03, 0x04];

/// Main document part every DOCX package must contain.
const DOCX_MAIN_PART: &str = "word/document.xml";

impl SourceType {
    /// Resolve a declared type: a file name, an extension, or a MIME type.
    ///
    /// # Example
    /// ```
    /// use docunify::SourceType;
    ///
    /// assert_eq!(SourceType::from_declared("report.PDF").unwrap(), SourceType::Pdf);
    /// assert_eq!(SourceType::from_declared("docx").unwrap(), SourceType::Docx);
    /// assert!(SourceType::from_declared("notes.txt").is_err());
    /// ```
    pub fn from_declared(declared: &str) -> Result<Self> {
        let declared = declared.trim().to_ascii_lowercase();

        for source_type in [SourceType::Docx, SourceType::Pdf] {
            if declared == source_type.mime_type() {
                return Ok(source_type);
            }
        }

        let extension = declared.rsplit('.').next().unwrap_or(&declared);
        match extension {
            "docx" => Ok(SourceType::Docx),
            "pdf" => Ok(SourceType::Pdf),
            _ => Err(Error::UnsupportedFormat(format!(
                "unrecognized document type '{}'",
                declared
            ))),
        }
    }
}

/// Detect the source format from bytes.
///
/// # Returns
/// * `Ok(SourceType)` if the data is a PDF or a DOCX package
/// * `Err(Error::UnsupportedFormat)` otherwise
pub fn detect_format_from_bytes(data: &[u8]) -> Result<SourceType> {
    if is_pdf_bytes(data) {
        return Ok(SourceType::Pdf);
    }
    if is_docx_bytes(data) {
        return Ok(SourceType::Docx);
    }
    Err(Error::UnsupportedFormat(
        "content is neither PDF nor DOCX".to_string(),
    ))
}

/// Detect the source format of a file.
pub fn detect_format_from_path<P: AsRef<Path>>(path: P) -> Result<SourceType> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    detect_format_from_bytes(&data)
}

/// Check that bytes match the declared source format.
///
/// A mismatch between declared type and content is an unsupported-format
/// error, not a parse error.
pub fn verify(data: &[u8], declared: SourceType) -> Result<()> {
    let matches = match declared {
        SourceType::Pdf => is_pdf_bytes(data),
        SourceType::Docx => is_docx_bytes(data),
    };
    if matches {
        Ok(())
    } else {
        Err(Error::UnsupportedFormat(format!(
            "content does not match declared type {}",
            declared
        )))
    }
}

/// Check if bytes start with a valid PDF header.
pub fn is_pdf_bytes(data: &[u8]) -> bool {
    pdf_version(data).is_some()
}

/// Extract the header version (e.g., "1.7") from PDF bytes.
pub fn pdf_version(data: &[u8]) -> Option<String> {
    if data.len() < PDF_MAGIC_LEN + VERSION_LEN || !data.starts_with(PDF_MAGIC) {
        return None;
    }

    let version_bytes = &data[PDF_MAGIC_LEN..PDF_MAGIC_LEN + VERSION_LEN];
    let version = String::from_utf8_lossy(version_bytes).to_string();
    is_valid_version(&version).then_some(version)
}

/// Check if bytes are a ZIP package containing a WordprocessingML main part.
pub fn is_docx_bytes(data: &[u8]) -> bool {
    if !data.starts_with(ZIP_MAGIC) {
        return false;
    }
    match zip::ZipArchive::new(Cursor::new(data)) {
        Ok(archive) => archive.file_names().any(|name| name == DOCX_MAIN_PART),
        Err(_) => false,
    }
}

/// Check if a version string is valid.
fn is_valid_version(version: &str) -> bool {
    if version.len() != 3 {
        return false;
    }

    let chars: Vec<char> = version.chars().collect();
    chars[0].is_ascii_digit() && chars[1] == '.' && chars[2].is_ascii_digit()
}
