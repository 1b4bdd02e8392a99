//! WordprocessingML style sheet and theme resolution.

use std::collections::HashMap;

use roxmltree::Node;

pub(crate) const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub(crate) const DML_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";

/// Maximum `w:basedOn` hops followed when resolving a style property.
const MAX_STYLE_DEPTH: usize = 16;

pub(crate) fn twips_to_pts(twips: f32) -> f32 {
    twips / 20.0
}

/// First WML child element named `name`.
pub(crate) fn wml<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.tag_name().name() == name && n.tag_name().namespace() == Some(WML_NS))
}

/// `w:val` of the WML child element named `child`.
pub(crate) fn wml_attr<'a>(node: Node<'a, '_>, child: &str) -> Option<&'a str> {
    wml(node, child).and_then(|n| n.attribute((WML_NS, "val")))
}

/// A twips attribute converted to points.
pub(crate) fn twips_attr(node: Node, attr: &str) -> Option<f32> {
    node.attribute((WML_NS, attr))
        .and_then(|v| v.trim().parse::<f32>().ok())
        .map(twips_to_pts)
}

fn dml<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.tag_name().name() == name && n.tag_name().namespace() == Some(DML_NS))
}

fn latin_typeface<'a>(node: Node<'a, '_>) -> Option<&'a str> {
    dml(node, "latin")
        .and_then(|n| n.attribute("typeface"))
        .filter(|tf| !tf.is_empty())
}

/// Major and minor Latin fonts from the document theme.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ThemeFonts {
    pub major: Option<String>,
    pub minor: Option<String>,
}

impl ThemeFonts {
    /// Parse `word/theme/theme1.xml`. Unreadable themes resolve nothing.
    pub fn parse(xml: &str) -> Self {
        let mut fonts = ThemeFonts::default();
        let Ok(doc) = roxmltree::Document::parse(xml) else {
            log::debug!("Ignoring unreadable theme part");
            return fonts;
        };

        for node in doc.descendants() {
            if node.tag_name().namespace() != Some(DML_NS) {
                continue;
            }
            match node.tag_name().name() {
                "majorFont" => fonts.major = latin_typeface(node).map(str::to_string),
                "minorFont" => fonts.minor = latin_typeface(node).map(str::to_string),
                _ => {}
            }
        }
        fonts
    }

    fn resolve(&self, theme_ref: &str) -> Option<String> {
        if theme_ref.starts_with("major") {
            self.major.clone()
        } else if theme_ref.starts_with("minor") {
            self.minor.clone()
        } else {
            None
        }
    }
}

/// Resolve the font named by a `w:rFonts` element.
///
/// Explicit `ascii`/`hAnsi` names win over theme references.
pub(crate) fn resolve_rfonts(rfonts: Node, theme: &ThemeFonts) -> Option<String> {
    for attr in ["ascii", "hAnsi"] {
        if let Some(name) = rfonts.attribute((WML_NS, attr)).filter(|v| !v.is_empty()) {
            return Some(name.to_string());
        }
    }
    ["asciiTheme", "hAnsiTheme"]
        .iter()
        .filter_map(|attr| rfonts.attribute((WML_NS, *attr)))
        .find_map(|theme_ref| theme.resolve(theme_ref))
}

/// Paragraph properties that can come from a style or be set directly.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ParagraphProps {
    pub font_name: Option<String>,
    pub font_size: Option<f32>,
    pub indent_left: Option<f32>,
    pub indent_first_line: Option<f32>,
    pub space_before: Option<f32>,
    pub space_after: Option<f32>,
    pub line_spacing: Option<f32>,
}

impl ParagraphProps {
    /// Read direct properties from a `w:pPr` and a `w:rPr`.
    pub fn read(ppr: Option<Node>, rpr: Option<Node>, theme: &ThemeFonts) -> Self {
        let mut props = ParagraphProps::default();

        if let Some(ppr) = ppr {
            if let Some(ind) = wml(ppr, "ind") {
                props.indent_left = twips_attr(ind, "left").or_else(|| twips_attr(ind, "start"));
                props.indent_first_line = twips_attr(ind, "firstLine")
                    .or_else(|| twips_attr(ind, "hanging").map(|h| -h));
            }
            if let Some(spacing) = wml(ppr, "spacing") {
                props.space_before = twips_attr(spacing, "before");
                props.space_after = twips_attr(spacing, "after");
                props.line_spacing = twips_attr(spacing, "line");
            }
        }

        if let Some(rpr) = rpr {
            let (font_name, font_size) = run_font(rpr, theme);
            props.font_name = font_name;
            props.font_size = font_size;
        }

        props
    }

    /// Fill unset properties from `fallback`.
    pub fn inherit(&mut self, fallback: &ParagraphProps) {
        fn fill<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if slot.is_none() {
                slot.clone_from(value);
            }
        }
        fill(&mut self.font_name, &fallback.font_name);
        fill(&mut self.font_size, &fallback.font_size);
        fill(&mut self.indent_left, &fallback.indent_left);
        fill(&mut self.indent_first_line, &fallback.indent_first_line);
        fill(&mut self.space_before, &fallback.space_before);
        fill(&mut self.space_after, &fallback.space_after);
        fill(&mut self.line_spacing, &fallback.line_spacing);
    }
}

/// Font name and size declared by a `w:rPr`.
pub(crate) fn run_font(rpr: Node, theme: &ThemeFonts) -> (Option<String>, Option<f32>) {
    let font_name = wml(rpr, "rFonts").and_then(|rfonts| resolve_rfonts(rfonts, theme));
    let font_size = wml_attr(rpr, "sz")
        .and_then(|v| v.trim().parse::<f32>().ok())
        .map(|half_points| half_points / 2.0);
    (font_name, font_size)
}

#[derive(Debug, Clone, Default)]
struct StyleDef {
    name: Option<String>,
    based_on: Option<String>,
    props: ParagraphProps,
}

/// Paragraph styles from `word/styles.xml`.
///
/// `w:docDefaults` are not read; only explicit style values count.
#[derive(Debug, Clone, Default)]
pub(crate) struct StyleSheet {
    styles: HashMap<String, StyleDef>,
    default_paragraph: Option<String>,
}

impl StyleSheet {
    /// Parse the style part. Unreadable style parts yield an empty sheet.
    pub fn parse(xml: &str, theme: &ThemeFonts) -> Self {
        let mut sheet = StyleSheet::default();
        let Ok(doc) = roxmltree::Document::parse(xml) else {
            log::warn!("Ignoring unreadable styles part");
            return sheet;
        };

        for style in doc.root_element().children() {
            if style.tag_name().name() != "style" || style.tag_name().namespace() != Some(WML_NS) {
                continue;
            }
            if style.attribute((WML_NS, "type")) != Some("paragraph") {
                continue;
            }
            let Some(id) = style.attribute((WML_NS, "styleId")) else {
                continue;
            };

            if style.attribute((WML_NS, "default")) == Some("1") {
                sheet.default_paragraph = Some(id.to_string());
            }

            let def = StyleDef {
                name: wml_attr(style, "name").map(str::to_string),
                based_on: wml_attr(style, "basedOn").map(str::to_string),
                props: ParagraphProps::read(wml(style, "pPr"), wml(style, "rPr"), theme),
            };
            sheet.styles.insert(id.to_string(), def);
        }

        sheet
    }

    /// Style id applied to a paragraph, falling back to the default style.
    pub fn effective_id<'a>(&'a self, style_id: Option<&'a str>) -> Option<&'a str> {
        style_id.or(self.default_paragraph.as_deref())
    }

    /// Display name of a style, or the id when the sheet does not name it.
    pub fn display_name(&self, style_id: &str) -> String {
        self.styles
            .get(style_id)
            .and_then(|def| def.name.clone())
            .unwrap_or_else(|| style_id.to_string())
    }

    /// Properties of a style with its `basedOn` chain folded in.
    pub fn resolve(&self, style_id: Option<&str>) -> ParagraphProps {
        let mut props = ParagraphProps::default();
        let mut current = self.effective_id(style_id).map(str::to_string);
        let mut depth = 0;

        while let Some(id) = current {
            if depth >= MAX_STYLE_DEPTH {
                log::warn!("Style chain for '{}' exceeds {} levels", id, MAX_STYLE_DEPTH);
                break;
            }
            let Some(def) = self.styles.get(&id) else {
                break;
            };
            props.inherit(&def.props);
            current = def.based_on.clone();
            depth += 1;
        }

        props
    }
}
