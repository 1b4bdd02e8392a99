//! Error types for docunify.

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::model::SourceType;

/// Result type alias for docunify operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while normalizing or comparing documents.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input is not a recognized format, or its bytes do not match the declared type.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Content within a recognized format is corrupt or unreadable.
    #[error("{format} parsing error: {reason}")]
    Parse {
        /// Format whose reader failed
        format: SourceType,
        /// Underlying cause
        reason: String,
    },

    /// The OCR engine or rasterizer is missing or misconfigured.
    #[error("OCR unavailable: {0}")]
    OcrUnavailable(String),

    /// A bounded stage did not finish in time.
    #[error("{stage} timed out after {}s", .limit.as_secs())]
    Timeout {
        /// Stage that exceeded its bound
        stage: &'static str,
        /// The configured bound
        limit: Duration,
    },

    /// Consistency comparison needs two or three inputs.
    #[error("Comparison requires 2 or 3 documents, got {0}")]
    InvalidComparison(usize),

    /// Error during rendering (JSON).
    #[error("Rendering error: {0}")]
    Render(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a parse error for the given format.
    pub fn parse(format: SourceType, reason: impl ToString) -> Self {
        Error::Parse {
            format,
            reason: reason.to_string(),
        }
    }

    /// Whether this error degrades to a warning instead of failing the request.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::OcrUnavailable(_))
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            _ => Error::parse(SourceType::Pdf, err),
        }
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Error::Io(e),
            _ => Error::parse(SourceType::Docx, err),
        }
    }
}

impl From<roxmltree::Error> for Error {
    fn from(err: roxmltree::Error) -> Self {
        Error::parse(SourceType::Docx, format!("malformed XML: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::parse(SourceType::Pdf, "bad xref");
        assert_eq!(err.to_string(), "PDF parsing error: bad xref");

        let err = Error::Timeout {
            stage: "OCR",
            limit: Duration::from_secs(30),
        };
        assert_eq!(err.to_string(), "OCR timed out after 30s");

        let err = Error::InvalidComparison(4);
        assert_eq!(
            err.to_string(),
            "Comparison requires 2 or 3 documents, got 4"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_zip_error_names_docx() {
        let err: Error = zip::result::ZipError::FileNotFound.into();
        assert!(matches!(
            err,
            Error::Parse {
                format: SourceType::Docx,
                ..
            }
        ));
    }

    #[test]
    fn test_recoverable() {
        assert!(Error::OcrUnavailable("tesseract".into()).is_recoverable());
        assert!(!Error::UnsupportedFormat("txt".into()).is_recoverable());
    }
}
