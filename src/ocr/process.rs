//! OCR backends that shell out to poppler and tesseract.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use image::DynamicImage;

use crate::error::{Error, Result};

use super::{OcrEngine, PageRasterizer};

/// Renders PDF pages with poppler's `pdftoppm`.
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    binary: PathBuf,
}

impl PdftoppmRasterizer {
    /// Use `pdftoppm` from `PATH`.
    pub fn new() -> Self {
        Self::with_binary("pdftoppm")
    }

    /// Use a specific `pdftoppm` executable.
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for PdftoppmRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl PageRasterizer for PdftoppmRasterizer {
    fn render_page(&self, document: &[u8], page_number: u32, dpi: u32) -> Result<DynamicImage> {
        let workdir = tempfile::tempdir()?;
        let input = workdir.path().join("input.pdf");
        std::fs::File::create(&input)?.write_all(document)?;
        let prefix = workdir.path().join("page");

        let page = page_number.to_string();
        let resolution = dpi.to_string();
        let output = Command::new(&self.binary)
            .args(["-png", "-singlefile", "-r", &resolution, "-f", &page, "-l", &page])
            .arg(&input)
            .arg(&prefix)
            .output();
        check_output(&self.binary, output)?;

        let rendered = prefix.with_extension("png");
        image::open(&rendered).map_err(|e| {
            Error::Other(format!(
                "failed to read rendered page {}: {}",
                page_number, e
            ))
        })
    }
}

/// Recognizes text with the `tesseract` command line tool.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    binary: PathBuf,
    language: String,
}

impl TesseractEngine {
    /// Use `tesseract` from `PATH` with English models.
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            language: "eng".to_string(),
        }
    }

    /// Use a specific `tesseract` executable.
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Set the recognition language (e.g., "eng+deu").
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(&self, image: &DynamicImage) -> Result<String> {
        let workdir = tempfile::tempdir()?;
        let input = workdir.path().join("page.png");
        image
            .save(&input)
            .map_err(|e| Error::Other(format!("failed to write OCR input: {}", e)))?;

        let output = Command::new(&self.binary)
            .arg(&input)
            .arg("stdout")
            .args(["-l", &self.language])
            .output();
        let output = check_output(&self.binary, output)?;

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Map process failures to OCR errors.
///
/// A missing executable means the engine is unavailable; a non-zero exit
/// carries the tool's stderr.
fn check_output(binary: &Path, output: io::Result<Output>) -> Result<Output> {
    let output = output.map_err(|e| match e.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
            Error::OcrUnavailable(format!("{} is not installed or not executable", binary.display()))
        }
        _ => Error::Io(e),
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Other(format!(
            "{} exited with {}: {}",
            binary.display(),
            output.status,
            stderr.trim()
        )));
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binary_is_unavailable() {
        let engine = TesseractEngine::new().with_binary("/nonexistent/tesseract-docunify");
        let image = DynamicImage::new_luma8(4, 4);
        let err = engine.recognize(&image).unwrap_err();
        assert!(matches!(err, Error::OcrUnavailable(_)));
    }

    #[test]
    fn test_missing_rasterizer_is_unavailable() {
        let rasterizer = PdftoppmRasterizer::with_binary("/nonexistent/pdftoppm-docunify");
        let err = rasterizer.render_page(b"%PDF-1.4", 1, 72).unwrap_err();
        assert!(matches!(err, Error::OcrUnavailable(_)));
    }
}
