//! Fixture builders and OCR fakes shared by the integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use docunify::{Error, OcrEngine, PageRasterizer, Result};
use image::{DynamicImage, Rgb, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// Page margins in twips (1/20 pt).
#[derive(Debug, Clone, Copy)]
pub struct Twips {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

impl Twips {
    pub fn inch() -> Self {
        Self {
            top: 1440,
            bottom: 1440,
            left: 1440,
            right: 1440,
        }
    }
}

/// Builds a minimal DOCX package in memory.
#[derive(Debug, Clone)]
pub struct DocxBuilder {
    body: String,
    margins: Option<Twips>,
    font: String,
    half_points: u32,
    author: Option<String>,
}

impl Default for DocxBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DocxBuilder {
    pub fn new() -> Self {
        Self {
            body: String::new(),
            margins: Some(Twips::inch()),
            font: "Calibri".to_string(),
            half_points: 22,
            author: None,
        }
    }

    /// Body font and size for paragraphs added after this call.
    pub fn font(mut self, font: &str, size_pt: f32) -> Self {
        self.font = font.to_string();
        self.half_points = (size_pt * 2.0).round() as u32;
        self
    }

    pub fn margins(mut self, margins: Option<Twips>) -> Self {
        self.margins = margins;
        self
    }

    pub fn author(mut self, author: &str) -> Self {
        self.author = Some(author.to_string());
        self
    }

    pub fn heading(mut self, level: u32, text: &str) -> Self {
        self.body.push_str(&format!(
            r#"<w:p><w:pPr><w:pStyle w:val="Heading{level}"/></w:pPr><w:r><w:rPr><w:rFonts w:ascii="{font}"/><w:sz w:val="32"/></w:rPr><w:t>{text}</w:t></w:r></w:p>"#,
            font = self.font
        ));
        self
    }

    pub fn paragraph(mut self, text: &str) -> Self {
        self.body.push_str(&format!(
            r#"<w:p><w:pPr><w:ind w:left="0" w:firstLine="360"/><w:spacing w:before="0" w:after="160" w:line="276"/></w:pPr><w:r><w:rPr><w:rFonts w:ascii="{font}"/><w:sz w:val="{sz}"/></w:rPr><w:t xml:space="preserve">{text}</w:t></w:r></w:p>"#,
            font = self.font,
            sz = self.half_points
        ));
        self
    }

    /// A table of plain text cells.
    pub fn table(mut self, rows: &[&[&str]]) -> Self {
        self.body.push_str("<w:tbl>");
        for row in rows {
            self.body.push_str("<w:tr>");
            for cell in *row {
                self.body
                    .push_str(&format!("<w:tc><w:p><w:r><w:t>{cell}</w:t></w:r></w:p></w:tc>"));
            }
            self.body.push_str("</w:tr>");
        }
        self.body.push_str("</w:tbl>");
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let section = match self.margins {
            Some(m) => format!(
                r#"<w:sectPr><w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="{}" w:bottom="{}" w:left="{}" w:right="{}"/></w:sectPr>"#,
                m.top, m.bottom, m.left, m.right
            ),
            None => r#"<w:sectPr><w:pgSz w:w="12240" w:h="15840"/></w:sectPr>"#.to_string(),
        };
        let document = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="{WML_NS}"><w:body>{}{}</w:body></w:document>"#,
            self.body, section
        );

        let mut parts: Vec<(&str, String)> = vec![("word/document.xml", document)];
        if let Some(ref author) = self.author {
            parts.push((
                "docProps/core.xml",
                format!(
                    r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:creator>{author}</dc:creator></cp:coreProperties>"#
                ),
            ));
        }
        zip_package(&parts)
    }
}

fn zip_package(parts: &[(&str, String)]) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut buf);
        let options = zip::write::SimpleFileOptions::default();
        for (name, data) in parts {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }
    buf.into_inner()
}

/// One text show operation on a page.
#[derive(Debug, Clone)]
pub struct PdfLine {
    pub size: i64,
    pub x: i64,
    pub y: i64,
    pub text: String,
}

impl PdfLine {
    pub fn new(size: i64, x: i64, y: i64, text: &str) -> Self {
        Self {
            size,
            x,
            y,
            text: text.to_string(),
        }
    }
}

/// Builds a Letter-sized PDF with lopdf.
#[derive(Debug, Clone, Default)]
pub struct PdfBuilder {
    pages: Vec<Vec<PdfLine>>,
    scanned: bool,
    author: Option<String>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, lines: Vec<PdfLine>) -> Self {
        self.pages.push(lines);
        self
    }

    /// Pages carry only a full-page image, as a scanner produces.
    pub fn scanned(mut self, pages: usize) -> Self {
        self.scanned = true;
        self.pages = vec![Vec::new(); pages];
        self
    }

    pub fn author(mut self, author: &str) -> Self {
        self.author = Some(author.to_string());
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "ABCDEF+Helvetica",
        });
        let scan = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 4,
                "Height" => 4,
                "Filter" => "DCTDecode",
            },
            vec![0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0],
        ));
        let resources = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font },
            "XObject" => dictionary! { "Scan" => scan },
        });

        let mut kids = Vec::new();
        for lines in &self.pages {
            let mut operations = Vec::new();
            if self.scanned {
                operations.push(Operation::new("q", vec![]));
                operations.push(Operation::new(
                    "cm",
                    vec![
                        612.into(),
                        0.into(),
                        0.into(),
                        792.into(),
                        0.into(),
                        0.into(),
                    ],
                ));
                operations.push(Operation::new("Do", vec!["Scan".into()]));
                operations.push(Operation::new("Q", vec![]));
            }
            for line in lines {
                operations.push(Operation::new("BT", vec![]));
                operations.push(Operation::new("Tf", vec!["F1".into(), line.size.into()]));
                operations.push(Operation::new("Td", vec![line.x.into(), line.y.into()]));
                operations.push(Operation::new(
                    "Tj",
                    vec![Object::string_literal(line.text.as_str())],
                ));
                operations.push(Operation::new("ET", vec![]));
            }
            let content = Content { operations };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::from(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        if let Some(ref author) = self.author {
            let info_id = doc.add_object(dictionary! {
                "Author" => Object::string_literal(author.as_str()),
                "CreationDate" => Object::string_literal("D:20240301120000Z"),
            });
            doc.trailer.set("Info", info_id);
        }

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }
}

/// A one-page report: a 20pt title over 12pt body lines at x=72.
pub fn report_pdf(title: &str) -> Vec<u8> {
    PdfBuilder::new()
        .page(vec![
            PdfLine::new(20, 72, 700, title),
            PdfLine::new(12, 72, 660, "Revenue grew in every region."),
            PdfLine::new(12, 72, 646, "Costs stayed flat for the year."),
            PdfLine::new(12, 72, 600, "Hiring resumes next quarter."),
        ])
        .author("Jane Roe")
        .build()
}

/// Renders every page as a blank Letter page at the requested dpi.
#[derive(Debug, Default)]
pub struct BlankRasterizer;

impl PageRasterizer for BlankRasterizer {
    fn render_page(&self, _document: &[u8], _page: u32, dpi: u32) -> Result<DynamicImage> {
        let scale = dpi as f32 / 72.0;
        let (w, h) = ((612.0 * scale) as u32, (792.0 * scale) as u32);
        Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            w,
            h,
            Rgb([255, 255, 255]),
        )))
    }
}

/// Recognizes the same text on every page and counts its calls.
#[derive(Debug)]
pub struct ScriptedEngine {
    text: String,
    pub calls: Arc<AtomicUsize>,
}

impl ScriptedEngine {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl OcrEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    fn recognize(&self, _image: &DynamicImage) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.text.clone())
    }
}

/// Always reports the engine as missing.
#[derive(Debug, Default)]
pub struct MissingEngine;

impl OcrEngine for MissingEngine {
    fn name(&self) -> &str {
        "missing"
    }

    fn recognize(&self, _image: &DynamicImage) -> Result<String> {
        Err(Error::OcrUnavailable("tesseract not installed".to_string()))
    }
}

/// Sleeps before answering, to exercise the OCR deadline.
#[derive(Debug)]
pub struct SlowEngine(pub Duration);

impl OcrEngine for SlowEngine {
    fn name(&self) -> &str {
        "slow"
    }

    fn recognize(&self, _image: &DynamicImage) -> Result<String> {
        std::thread::sleep(self.0);
        Ok("late".to_string())
    }
}
