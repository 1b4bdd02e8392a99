//! DOCX document reader using zip and roxmltree.

use std::collections::HashMap;
use std::io::{Cursor, Read};

use chrono::{DateTime, Utc};
use roxmltree::Node;
use zip::ZipArchive;

use crate::error::{Error, Result};
use crate::model::{Image, Margins, Metadata, PageDimensions, SourceType, Table, TextModel};

use super::docx_styles::{
    run_font, twips_attr, wml, wml_attr, ParagraphProps, StyleSheet, ThemeFonts, WML_NS,
};
use super::options::ParseOptions;
use super::raw::{
    FormattingEvidence, MarginEvidence, ParagraphFormat, RawBlock, RawStructure, RunFormat,
};
use super::StructuralReader;

const WPD_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const IMAGE_REL_SUFFIX: &str = "/relationships/image";

const DOCUMENT_PART: &str = "word/document.xml";
const STYLES_PART: &str = "word/styles.xml";
const RELS_PART: &str = "word/_rels/document.xml.rels";
const CORE_PART: &str = "docProps/core.xml";
const APP_PART: &str = "docProps/app.xml";

/// Placement marker for a table in the paragraph stream.
pub const TABLE_MARKER: &str = "<<TABLE>>";
/// Placement marker for a drawing in the paragraph stream.
pub const IMAGE_MARKER: &str = "<<IMAGE>>";

/// English Metric Units per point.
const EMU_PER_PT: f32 = 12700.0;

/// WordprocessingML package reader.
#[derive(Debug, Clone)]
pub struct DocxParser {
    extract_images: bool,
}

impl DocxParser {
    /// Create a reader with default options.
    pub fn new() -> Self {
        Self::with_options(&ParseOptions::default())
    }

    /// Create a reader configured by parse options.
    pub fn with_options(options: &ParseOptions) -> Self {
        Self {
            extract_images: options.extract_images,
        }
    }
}

impl Default for DocxParser {
    fn default() -> Self {
        Self::new()
    }
}

impl StructuralReader for DocxParser {
    fn source_type(&self) -> SourceType {
        SourceType::Docx
    }

    fn extract(&self, data: &[u8]) -> Result<RawStructure> {
        let mut package = Package::open(data)?;

        let document_xml = package
            .read_string(DOCUMENT_PART)?
            .ok_or_else(|| Error::parse(SourceType::Docx, "missing word/document.xml"))?;

        let theme = match package.theme_part_name() {
            Some(name) => package
                .read_string(&name)?
                .map(|xml| ThemeFonts::parse(&xml))
                .unwrap_or_default(),
            None => ThemeFonts::default(),
        };
        let styles = package
            .read_string(STYLES_PART)?
            .map(|xml| StyleSheet::parse(&xml, &theme))
            .unwrap_or_default();
        let relationships = match package.read_string(RELS_PART)? {
            Some(xml) => parse_relationships(&xml)?,
            None => Vec::new(),
        };

        let xml = roxmltree::Document::parse(&document_xml)?;
        let body = wml(xml.root_element(), "body")
            .ok_or_else(|| Error::parse(SourceType::Docx, "document has no w:body"))?;

        let mut walker = BodyWalker::new(&styles, &theme);
        walker.walk(body);
        log::debug!(
            "DOCX body: {} paragraphs, {} blocks, {} tables",
            walker.paragraphs.len(),
            walker.blocks.len(),
            walker.tables.len()
        );

        let mut warnings = Vec::new();
        let images = if self.extract_images {
            collect_images(&mut package, &relationships, &walker.drawings, &mut warnings)?
        } else {
            Vec::new()
        };

        let mut metadata = match package.read_string(CORE_PART)? {
            Some(xml) => parse_core_properties(&xml),
            None => Metadata::default(),
        };
        metadata.page_count = package
            .read_string(APP_PART)?
            .and_then(|xml| parse_page_count(&xml));
        metadata.page_dimensions = walker.page_dimensions.clone();
        metadata.has_text_content = !walker.blocks.is_empty();

        let BodyWalker {
            paragraphs,
            blocks,
            tables,
            runs,
            formats,
            margins,
            ..
        } = walker;

        Ok(RawStructure {
            source_type: SourceType::Docx,
            metadata,
            blocks,
            text: TextModel::from_paragraphs(paragraphs),
            tables,
            images,
            formatting: FormattingEvidence {
                margins: MarginEvidence::Declared(margins),
                runs,
                paragraphs: formats,
                spacing_observable: true,
            },
            warnings,
        })
    }
}

/// Open ZIP package with part lookup.
struct Package<'a> {
    archive: ZipArchive<Cursor<&'a [u8]>>,
}

impl<'a> Package<'a> {
    fn open(data: &'a [u8]) -> Result<Self> {
        let archive = ZipArchive::new(Cursor::new(data))?;
        Ok(Self { archive })
    }

    fn read_bytes(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        let mut file = match self.archive.by_name(name) {
            Ok(file) => file,
            Err(zip::result::ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut buf = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut buf)?;
        Ok(Some(buf))
    }

    fn read_string(&mut self, name: &str) -> Result<Option<String>> {
        match self.read_bytes(name)? {
            Some(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|_| Error::parse(SourceType::Docx, format!("{} is not UTF-8", name))),
            None => Ok(None),
        }
    }

    fn theme_part_name(&self) -> Option<String> {
        let mut themes: Vec<&str> = self
            .archive
            .file_names()
            .filter(|n| n.starts_with("word/theme/") && n.ends_with(".xml"))
            .collect();
        themes.sort_unstable();
        themes.first().map(|n| n.to_string())
    }
}

/// An entry of the main document's relationship part.
#[derive(Debug, Clone, PartialEq)]
struct Relationship {
    id: String,
    rel_type: String,
    target: String,
    external: bool,
}

fn parse_relationships(xml: &str) -> Result<Vec<Relationship>> {
    let doc = roxmltree::Document::parse(xml)?;
    let rels = doc
        .descendants()
        .filter(|n| n.has_tag_name("Relationship"))
        .filter_map(|n| {
            Some(Relationship {
                id: n.attribute("Id")?.to_string(),
                rel_type: n.attribute("Type")?.to_string(),
                target: n.attribute("Target")?.to_string(),
                external: n.attribute("TargetMode") == Some("External"),
            })
        })
        .collect();
    Ok(rels)
}

/// Resolve a relationship target against the `word/` folder.
fn resolve_target(target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut parts: Vec<&str> = vec!["word"];
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    parts.join("/")
}

/// Collects body content in document order.
struct BodyWalker<'s> {
    styles: &'s StyleSheet,
    theme: &'s ThemeFonts,
    paragraphs: Vec<String>,
    blocks: Vec<RawBlock>,
    tables: Vec<Table>,
    runs: Vec<RunFormat>,
    formats: Vec<ParagraphFormat>,
    margins: Vec<Margins>,
    page_dimensions: Vec<PageDimensions>,
    /// Declared display size per image relationship id
    drawings: HashMap<String, (f32, f32)>,
}

/// Text of one paragraph, with and without placement markers.
#[derive(Default)]
struct InlineText {
    marked: String,
    plain: String,
    runs: Vec<(Option<String>, Option<f32>)>,
}

impl<'s> BodyWalker<'s> {
    fn new(styles: &'s StyleSheet, theme: &'s ThemeFonts) -> Self {
        Self {
            styles,
            theme,
            paragraphs: Vec::new(),
            blocks: Vec::new(),
            tables: Vec::new(),
            runs: Vec::new(),
            formats: Vec::new(),
            margins: Vec::new(),
            page_dimensions: Vec::new(),
            drawings: HashMap::new(),
        }
    }

    fn walk(&mut self, container: Node) {
        for child in container.children().filter(|n| is_wml(*n)) {
            match child.tag_name().name() {
                "p" => self.paragraph(child),
                "tbl" => self.table(child),
                "sdt" => {
                    if let Some(content) = wml(child, "sdtContent") {
                        self.walk(content);
                    }
                }
                "sectPr" => self.section_properties(child),
                _ => {}
            }
        }
    }

    fn paragraph(&mut self, p: Node) {
        let ppr = wml(p, "pPr");
        let style_id = ppr.and_then(|ppr| wml_attr(ppr, "pStyle"));

        let mut inline = InlineText::default();
        self.inline(p, &mut inline);

        let marked = inline.marked.trim();
        if !marked.is_empty() {
            self.paragraphs.push(marked.to_string());
        }

        let plain = inline.plain.trim();
        if !plain.is_empty() {
            let style_name = self
                .styles
                .effective_id(style_id)
                .map(|id| self.styles.display_name(id));
            self.blocks.push(RawBlock::styled(plain, style_name));

            let style_props = self.styles.resolve(style_id);
            let mut props = ParagraphProps::read(ppr, None, self.theme);
            props.inherit(&style_props);

            self.formats.push(ParagraphFormat {
                indent_left: props.indent_left,
                indent_first_line: props.indent_first_line,
                space_before: props.space_before,
                space_after: props.space_after,
                line_spacing: props.line_spacing,
            });
            for (font, size) in inline.runs {
                self.runs.push(RunFormat {
                    font: font.or_else(|| style_props.font_name.clone()),
                    size: size.or(style_props.font_size),
                });
            }
        }

        if let Some(sect) = ppr.and_then(|ppr| wml(ppr, "sectPr")) {
            self.section_properties(sect);
        }
    }

    /// Gather run text and drawings below `node`.
    fn inline(&mut self, node: Node, out: &mut InlineText) {
        for child in node.children().filter(|n| n.is_element()) {
            let name = child.tag_name().name();
            if !is_wml(child) {
                if name == "pict" || name == "drawing" {
                    self.drawing(child, out);
                }
                continue;
            }
            match name {
                "pPr" | "rPr" | "delText" | "instrText" => {}
                "r" => {
                    let declared = wml(child, "rPr")
                        .map(|rpr| run_font(rpr, self.theme))
                        .unwrap_or((None, None));
                    out.runs.push(declared);
                    let index = out.runs.len() - 1;
                    let before = out.plain.len();
                    self.inline(child, out);
                    // Runs without text carry no font evidence.
                    if out.plain[before..].trim().is_empty() && out.runs.len() == index + 1 {
                        out.runs.pop();
                    }
                }
                "t" => {
                    let text = child.text().unwrap_or("");
                    out.marked.push_str(text);
                    out.plain.push_str(text);
                }
                "tab" => {
                    out.marked.push('\t');
                    out.plain.push('\t');
                }
                "br" | "cr" => {
                    out.marked.push('\n');
                    out.plain.push('\n');
                }
                "drawing" | "pict" => self.drawing(child, out),
                _ => self.inline(child, out),
            }
        }
    }

    /// Record a drawing: insert a marker and note declared image sizes.
    fn drawing(&mut self, node: Node, out: &mut InlineText) {
        out.marked.push('\n');
        out.marked.push_str(IMAGE_MARKER);
        out.marked.push('\n');

        for container in node
            .descendants()
            .filter(|n| n.has_tag_name((WPD_NS, "inline")) || n.has_tag_name((WPD_NS, "anchor")))
        {
            let extent = container
                .children()
                .find(|n| n.has_tag_name((WPD_NS, "extent")))
                .and_then(|ext| {
                    let cx = ext.attribute("cx")?.parse::<f32>().ok()?;
                    let cy = ext.attribute("cy")?.parse::<f32>().ok()?;
                    Some((cx / EMU_PER_PT, cy / EMU_PER_PT))
                });
            let embed = container
                .descendants()
                .find_map(|n| n.attribute((R_NS, "embed")));
            if let (Some(size), Some(id)) = (extent, embed) {
                self.drawings.entry(id.to_string()).or_insert(size);
            }
        }
    }

    fn table(&mut self, tbl: Node) {
        let mut data = Vec::new();
        for tr in tbl.children().filter(|n| n.has_tag_name((WML_NS, "tr"))) {
            let mut row = Vec::new();
            for tc in tr.children().filter(|n| n.has_tag_name((WML_NS, "tc"))) {
                let span = wml(tc, "tcPr")
                    .and_then(|pr| wml_attr(pr, "gridSpan"))
                    .and_then(|v| v.parse::<usize>().ok())
                    .unwrap_or(1)
                    .max(1);
                let text = cell_text(tc);
                for _ in 0..span {
                    row.push(text.clone());
                }
            }
            data.push(row);
        }

        let id = format!("table-{}", self.tables.len() + 1);
        self.tables.push(Table::new(id, None, data));
        self.paragraphs.push(TABLE_MARKER.to_string());
    }

    fn section_properties(&mut self, sect: Node) {
        if let Some(size) = wml(sect, "pgSz") {
            if let (Some(w), Some(h)) = (twips_attr(size, "w"), twips_attr(size, "h")) {
                self.page_dimensions.push(PageDimensions::new(w, h));
            }
        }
        if let Some(mar) = wml(sect, "pgMar") {
            self.margins.push(Margins {
                top: twips_attr(mar, "top").map(f32::abs),
                bottom: twips_attr(mar, "bottom").map(f32::abs),
                left: twips_attr(mar, "left"),
                right: twips_attr(mar, "right"),
            });
        }
    }
}

fn is_wml(node: Node) -> bool {
    node.is_element() && node.tag_name().namespace() == Some(WML_NS)
}

/// Cell text: the cell's own paragraphs joined by newlines.
fn cell_text(tc: Node) -> String {
    tc.children()
        .filter(|n| n.has_tag_name((WML_NS, "p")))
        .map(|p| {
            p.descendants()
                .filter(|n| n.has_tag_name((WML_NS, "t")))
                .filter_map(|t| t.text())
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn collect_images(
    package: &mut Package,
    relationships: &[Relationship],
    drawings: &HashMap<String, (f32, f32)>,
    warnings: &mut Vec<String>,
) -> Result<Vec<Image>> {
    let mut images = Vec::new();

    for rel in relationships
        .iter()
        .filter(|r| r.rel_type.ends_with(IMAGE_REL_SUFFIX) && !r.external)
    {
        let part = resolve_target(&rel.target);
        let Some(data) = package.read_bytes(&part)? else {
            log::warn!("Image relationship {} points to missing part {}", rel.id, part);
            warnings.push(format!("Image part {} is missing", part));
            continue;
        };

        let id = format!("docx-image-{}", images.len() + 1);
        let dimensions = image::ImageReader::new(Cursor::new(&data))
            .with_guessed_format()
            .ok()
            .and_then(|reader| reader.into_dimensions().ok());

        let mut image = Image::new(id, data).with_relationship(rel.id.clone());
        if image.mime_type == "application/octet-stream" {
            if let Some(mime) = mime_from_extension(&part) {
                image = image.with_mime_type(mime);
            }
        }
        if let Some((width, height)) = dimensions {
            image = image.with_dimensions(width, height);
        }
        image.metadata.declared_size = drawings.get(&rel.id).copied();
        images.push(image);
    }

    Ok(images)
}

fn mime_from_extension(part: &str) -> Option<&'static str> {
    let extension = part.rsplit('.').next()?.to_ascii_lowercase();
    match extension.as_str() {
        "emf" => Some("image/x-emf"),
        "wmf" => Some("image/x-wmf"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

fn parse_core_properties(xml: &str) -> Metadata {
    let mut metadata = Metadata::default();
    let Ok(doc) = roxmltree::Document::parse(xml) else {
        log::warn!("Ignoring unreadable core properties");
        return metadata;
    };

    for node in doc.descendants().filter(|n| n.is_element()) {
        let text = node.text().map(str::trim).filter(|t| !t.is_empty());
        let owned = text.map(str::to_string);
        match node.tag_name().name() {
            "title" => metadata.title = owned,
            "subject" => metadata.subject = owned,
            "creator" => metadata.author = owned,
            "keywords" => metadata.keywords = owned,
            "category" => metadata.category = owned,
            "description" => metadata.comments = owned,
            "lastModifiedBy" => metadata.last_modified_by = owned,
            "created" => metadata.created = text.and_then(parse_w3c_date),
            "modified" => metadata.modified = text.and_then(parse_w3c_date),
            _ => {}
        }
    }
    metadata
}

/// Parse a W3CDTF timestamp as written in core properties.
fn parse_w3c_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_page_count(xml: &str) -> Option<u32> {
    let doc = roxmltree::Document::parse(xml).ok()?;
    doc.descendants()
        .find(|n| n.tag_name().name() == "Pages")
        .and_then(|n| n.text())
        .and_then(|t| t.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::raw::StyleSignal;
    use std::io::Write;

    fn package(parts: &[(&str, &[u8])]) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            let options = zip::write::SimpleFileOptions::default();
            for (name, data) in parts {
                writer.start_file(*name, options).unwrap();
                writer.write_all(data).unwrap();
            }
            writer.finish().unwrap();
        }
        buf.into_inner()
    }

    fn document(body: &str) -> String {
        format!(
            r#"<w:document xmlns:w="{WML_NS}" xmlns:wp="{WPD_NS}" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="{R_NS}"><w:body>{body}</w:body></w:document>"#
        )
    }

    fn para(style: &str, text: &str) -> String {
        format!(r#"<w:p><w:pPr><w:pStyle w:val="{style}"/></w:pPr><w:r><w:t>{text}</w:t></w:r></w:p>"#)
    }

    #[test]
    fn test_paragraphs_and_markers() {
        let body = format!(
            "{}{}{}{}",
            para("Heading1", "Intro"),
            r#"<w:p><w:r><w:t>Before</w:t></w:r><w:r><w:drawing><wp:inline><wp:extent cx="127000" cy="254000"/><a:graphic><a:blip r:embed="rId5"/></a:graphic></wp:inline></w:drawing></w:r></w:p>"#,
            r#"<w:tbl><w:tr><w:tc><w:tcPr><w:gridSpan w:val="2"/></w:tcPr><w:p><w:r><w:t>Wide</w:t></w:r></w:p></w:tc></w:tr><w:tr><w:tc><w:p><w:r><w:t>a</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>b</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#,
            r#"<w:p></w:p><w:sectPr><w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="1440" w:bottom="1440" w:left="1800" w:right="1800"/></w:sectPr>"#,
        );
        let data = package(&[(DOCUMENT_PART, document(&body).as_bytes())]);
        let raw = DocxParser::new().extract(&data).unwrap();

        let paragraphs = raw.text.paragraphs.as_ref().unwrap();
        assert_eq!(
            paragraphs,
            &vec![
                "Intro".to_string(),
                "Before\n<<IMAGE>>".to_string(),
                TABLE_MARKER.to_string()
            ]
        );
        assert_eq!(raw.blocks.len(), 2);
        assert_eq!(
            raw.blocks[0].signal,
            StyleSignal::Style(Some("Heading1".to_string()))
        );
        assert_eq!(raw.blocks[1].text, "Before");

        assert_eq!(raw.tables.len(), 1);
        assert_eq!(raw.tables[0].id(), "table-1");
        assert_eq!(raw.tables[0].data()[0], vec!["Wide", "Wide"]);
        assert_eq!(raw.tables[0].column_count(), 2);

        assert_eq!(raw.metadata.page_dimensions, vec![PageDimensions::letter()]);
        assert!(raw.metadata.has_text_content);
        match &raw.formatting.margins {
            MarginEvidence::Declared(margins) => {
                assert_eq!(margins.len(), 1);
                assert_eq!(margins[0].left, Some(90.0));
                assert_eq!(margins[0].top, Some(72.0));
            }
            other => panic!("unexpected evidence {:?}", other),
        }
    }

    #[test]
    fn test_images_by_relationship() {
        let png = {
            let mut out = Cursor::new(Vec::new());
            image::DynamicImage::new_rgb8(3, 2)
                .write_to(&mut out, image::ImageFormat::Png)
                .unwrap();
            out.into_inner()
        };
        let body = r#"<w:p><w:r><w:drawing><wp:anchor><wp:extent cx="254000" cy="127000"/><a:graphic><a:blip r:embed="rId7"/></a:graphic></wp:anchor></w:drawing></w:r></w:p>"#;
        let rels = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
<Relationship Id="rId7" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/image1.png"/>
<Relationship Id="rId9" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="http://example.com/x.png" TargetMode="External"/>
</Relationships>"#;
        let data = package(&[
            (DOCUMENT_PART, document(body).as_bytes()),
            (RELS_PART, rels.as_bytes()),
            ("word/media/image1.png", &png),
        ]);
        let raw = DocxParser::new().extract(&data).unwrap();

        assert_eq!(raw.images.len(), 1);
        let image = &raw.images[0];
        assert_eq!(image.id, "docx-image-1");
        assert_eq!(image.mime_type, "image/png");
        assert_eq!((image.width, image.height), (Some(3), Some(2)));
        assert_eq!(image.metadata.relationship_id.as_deref(), Some("rId7"));
        assert_eq!(image.metadata.declared_size, Some((20.0, 10.0)));
        assert_eq!(image.metadata.size_bytes, png.len());
        assert!(!raw.metadata.has_text_content);
    }

    #[test]
    fn test_images_disabled() {
        let data = package(&[(DOCUMENT_PART, document("").as_bytes())]);
        let raw = DocxParser::with_options(&ParseOptions::default().with_images(false))
            .extract(&data)
            .unwrap();
        assert!(raw.images.is_empty());
    }

    #[test]
    fn test_sdt_content_is_walked() {
        let body = format!(
            "<w:sdt><w:sdtContent>{}</w:sdtContent></w:sdt>",
            para("Title", "Wrapped")
        );
        let data = package(&[(DOCUMENT_PART, document(&body).as_bytes())]);
        let raw = DocxParser::new().extract(&data).unwrap();
        assert_eq!(raw.blocks[0].text, "Wrapped");
    }

    #[test]
    fn test_core_and_app_properties() {
        let core = r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/">
<dc:title>Annual Report</dc:title><dc:subject>Finance</dc:subject><dc:creator>Ada Lovelace</dc:creator><cp:keywords>budget, 2024</cp:keywords><dc:description>Board copy</dc:description><cp:lastModifiedBy>Charles Babbage</cp:lastModifiedBy><dcterms:created>2024-03-01T10:00:00Z</dcterms:created><dcterms:modified>2024-03-05T08:30:00Z</dcterms:modified><cp:category>Reports</cp:category></cp:coreProperties>"#;
        let app = r#"<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties"><Pages>4</Pages></Properties>"#;
        let data = package(&[
            (DOCUMENT_PART, document(&para("Normal", "x")).as_bytes()),
            (CORE_PART, core.as_bytes()),
            (APP_PART, app.as_bytes()),
        ]);
        let raw = DocxParser::new().extract(&data).unwrap();
        assert_eq!(raw.metadata.author.as_deref(), Some("Ada Lovelace"));
        assert_eq!(
            raw.metadata.created.map(|d| d.to_rfc3339()),
            Some("2024-03-01T10:00:00+00:00".to_string())
        );
        assert_eq!(raw.metadata.page_count, Some(4));

        let metadata = &raw.metadata;
        assert_eq!(metadata.title.as_deref(), Some("Annual Report"));
        assert_eq!(metadata.subject.as_deref(), Some("Finance"));
        assert_eq!(metadata.keywords.as_deref(), Some("budget, 2024"));
        assert_eq!(metadata.category.as_deref(), Some("Reports"));
        assert_eq!(metadata.comments.as_deref(), Some("Board copy"));
        assert_eq!(metadata.last_modified_by.as_deref(), Some("Charles Babbage"));
        assert_eq!(
            metadata.modified.map(|d| d.to_rfc3339()),
            Some("2024-03-05T08:30:00+00:00".to_string())
        );
    }

    #[test]
    fn test_run_and_paragraph_formatting() {
        let styles = r#"<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/>
<w:rPr><w:rFonts w:ascii="Arial"/><w:sz w:val="22"/></w:rPr></w:style></w:styles>"#;
        let body = r#"<w:p><w:pPr><w:ind w:left="720" w:hanging="360"/><w:spacing w:before="120" w:after="240" w:line="276"/></w:pPr>
<w:r><w:rPr><w:rFonts w:ascii="Georgia"/><w:sz w:val="24"/></w:rPr><w:t>One</w:t></w:r><w:r><w:t xml:space="preserve"> two</w:t></w:r><w:r><w:rPr><w:sz w:val="40"/></w:rPr></w:r></w:p>"#;
        let data = package(&[
            (DOCUMENT_PART, document(body).as_bytes()),
            (STYLES_PART, styles.as_bytes()),
        ]);
        let raw = DocxParser::new().extract(&data).unwrap();

        assert_eq!(
            raw.formatting.runs,
            vec![
                RunFormat {
                    font: Some("Georgia".into()),
                    size: Some(12.0)
                },
                RunFormat {
                    font: Some("Arial".into()),
                    size: Some(11.0)
                },
            ]
        );
        let format = &raw.formatting.paragraphs[0];
        assert_eq!(format.indent_left, Some(36.0));
        assert_eq!(format.indent_first_line, Some(-18.0));
        assert_eq!(format.space_before, Some(6.0));
        assert_eq!(format.space_after, Some(12.0));
        assert_eq!(format.line_spacing, Some(13.8));
        assert_eq!(
            raw.blocks[0].signal,
            StyleSignal::Style(Some("Normal".to_string()))
        );
    }

    #[test]
    fn test_not_a_package() {
        let err = DocxParser::new().extract(b"plain text").unwrap_err();
        assert!(matches!(
            err,
            Error::Parse {
                format: SourceType::Docx,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_main_part() {
        let data = package(&[("word/styles.xml", b"<x/>")]);
        let err = DocxParser::new().extract(&data).unwrap_err();
        assert!(err.to_string().contains("word/document.xml"));
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("media/image1.png"), "word/media/image1.png");
        assert_eq!(resolve_target("../media/a.png"), "media/a.png");
        assert_eq!(resolve_target("/word/media/b.png"), "word/media/b.png");
    }
}
