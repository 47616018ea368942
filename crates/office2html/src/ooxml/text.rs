//! WordprocessingML (`/word/document.xml`) into the document tree.

use tracing::debug;

use crate::doc::elements::{ElementId, ElementPayload, ElementRegistry, ElementType};
use crate::doc::style::{
    Color, FontStyle, FontWeight, Measure, PageLayout, ResolvedStyle, TextAlign,
};
use crate::doc::styles::{StyleEntry, StyleFamily, StyleRegistry};
use crate::doc::{Document, DocumentKind};
use crate::error::{OpenError, Result};
use crate::vfs::{Filesystem, Path};
use crate::xml::{XmlDocument, XmlNodeId};

use super::rels::Relationships;

/// Twips (1/1440 inch) to a measure in inches, rounded to 4 decimals.
pub(crate) fn twips(value: &str) -> Option<Measure> {
    let twips: f64 = value.parse().ok()?;
    Some(Measure::new((twips / 1440.0 * 10_000.0).round() / 10_000.0, "in"))
}

/// Half-points to a point measure.
fn half_points(value: &str) -> Option<Measure> {
    let half: f64 = value.parse().ok()?;
    Some(Measure::new(half / 2.0, "pt"))
}

fn attr_val<'a>(xml: &'a XmlDocument, node: XmlNodeId, name: &str) -> Option<&'a str> {
    xml.first_child_by_name(node, name)
        .and_then(|child| xml.attribute(child, "w:val"))
}

/// Toggle properties like `w:b` are on when present unless `w:val` says
/// otherwise.
fn toggle(xml: &XmlDocument, node: XmlNodeId, name: &str) -> Option<bool> {
    let child = xml.first_child_by_name(node, name)?;
    Some(!matches!(
        xml.attribute(child, "w:val"),
        Some("false") | Some("0") | Some("none")
    ))
}

/// Read `w:rPr` run properties into a partial style.
fn read_run_properties(xml: &XmlDocument, rpr: XmlNodeId, partial: &mut ResolvedStyle) {
    let text = &mut partial.text;
    if let Some(bold) = toggle(xml, rpr, "w:b") {
        text.font_weight = Some(if bold { FontWeight::Bold } else { FontWeight::Normal });
    }
    if let Some(italic) = toggle(xml, rpr, "w:i") {
        text.font_style = Some(if italic { FontStyle::Italic } else { FontStyle::Normal });
    }
    if let Some(underline) = attr_val(xml, rpr, "w:u") {
        text.font_underline = Some(underline != "none");
    }
    if toggle(xml, rpr, "w:strike").is_some() {
        text.font_line_through = toggle(xml, rpr, "w:strike");
    }
    if let Some(size) = attr_val(xml, rpr, "w:sz").and_then(half_points) {
        text.font_size = Some(size);
    }
    if let Some(color) = attr_val(xml, rpr, "w:color") {
        if color != "auto" {
            text.font_color = Color::parse(&format!("#{color}"));
        }
    }
    if let Some(fonts) = xml.first_child_by_name(rpr, "w:rFonts") {
        if let Some(ascii) = xml.attribute(fonts, "w:ascii") {
            text.font_name = Some(ascii.to_string());
        }
    }
}

/// Read `w:pPr` paragraph properties into a partial style.
fn read_paragraph_properties(xml: &XmlDocument, ppr: XmlNodeId, partial: &mut ResolvedStyle) {
    if let Some(justification) = attr_val(xml, ppr, "w:jc") {
        partial.paragraph.text_align = match justification {
            "left" | "start" => Some(TextAlign::Left),
            "right" | "end" => Some(TextAlign::Right),
            "center" => Some(TextAlign::Center),
            "both" | "distribute" => Some(TextAlign::Justify),
            _ => None,
        };
    }
    if let Some(rpr) = xml.first_child_by_name(ppr, "w:rPr") {
        read_run_properties(xml, rpr, partial);
    }
}

/// Populate the registry from `/word/styles.xml`.
fn index_styles(xml: &XmlDocument, styles_root: XmlNodeId, registry: &mut StyleRegistry) {
    for style in xml.children_by_name(styles_root, "w:style") {
        let Some(id) = xml.attribute(style, "w:styleId") else {
            continue;
        };
        let family = match xml.attribute(style, "w:type") {
            Some("paragraph") => StyleFamily::Paragraph,
            Some("character") => StyleFamily::Text,
            Some("table") => StyleFamily::Table,
            _ => continue,
        };
        let mut partial = ResolvedStyle::default();
        if let Some(rpr) = xml.first_child_by_name(style, "w:rPr") {
            read_run_properties(xml, rpr, &mut partial);
        }
        if let Some(ppr) = xml.first_child_by_name(style, "w:pPr") {
            read_paragraph_properties(xml, ppr, &mut partial);
        }
        registry.insert_named(
            family,
            id.to_string(),
            StyleEntry {
                parent: attr_val(xml, style, "w:basedOn").map(str::to_string),
                partial,
            },
        );
    }
    for default in xml.children_by_name(styles_root, "w:docDefaults") {
        if let Some(rpr) = xml.find(default, "w:rPrDefault/w:rPr") {
            let mut partial = ResolvedStyle::default();
            read_run_properties(xml, rpr, &mut partial);
            registry.set_default(StyleFamily::Paragraph, partial);
        }
    }
}

struct TextParser<'a> {
    xml: &'a XmlDocument,
    registry: &'a mut ElementRegistry,
    styles: &'a mut StyleRegistry,
    rels: &'a Relationships,
    base: Path,
    anonymous: u32,
}

impl TextParser<'_> {
    fn parse_block(&mut self, node: XmlNodeId, parent: ElementId) {
        match self.xml.name(node) {
            "w:p" => {
                let paragraph = self.registry.create(ElementType::Paragraph, Some(node));
                self.style_from_properties(paragraph, node, "w:pPr", "w:pStyle");
                self.registry.append_child(parent, paragraph);
                let children: Vec<XmlNodeId> = self.xml.element_children(node).collect();
                for child in children {
                    self.parse_inline(child, paragraph);
                }
            }
            "w:tbl" => self.parse_table(node, parent),
            "w:sectPr" | "w:pPr" => {}
            other => debug!(element = other, "skipping unknown block element"),
        }
    }

    fn parse_inline(&mut self, node: XmlNodeId, parent: ElementId) {
        match self.xml.name(node) {
            "w:r" => {
                let span = self.registry.create(ElementType::Span, Some(node));
                self.style_from_properties(span, node, "w:rPr", "w:rStyle");
                self.registry.append_child(parent, span);
                let children: Vec<XmlNodeId> = self.xml.element_children(node).collect();
                for child in children {
                    match self.xml.name(child) {
                        "w:t" | "w:tab" => {
                            let text = self.registry.create(ElementType::Text, Some(child));
                            self.registry.append_child(span, text);
                        }
                        "w:br" => {
                            let line_break =
                                self.registry.create(ElementType::LineBreak, Some(child));
                            self.registry.append_child(span, line_break);
                        }
                        "w:drawing" => self.parse_drawing(child, span),
                        _ => {}
                    }
                }
            }
            "w:hyperlink" => {
                let link = self.registry.create(ElementType::Link, Some(node));
                let href = self
                    .xml
                    .attribute(node, "r:id")
                    .and_then(|id| self.rels.resolve(&self.base, id))
                    .map(|path| path.to_string())
                    .or_else(|| {
                        self.xml
                            .attribute(node, "w:anchor")
                            .map(|anchor| format!("#{anchor}"))
                    })
                    .unwrap_or_default();
                self.registry.get_mut(link).payload = ElementPayload::Link { href };
                self.registry.append_child(parent, link);
                let children: Vec<XmlNodeId> = self.xml.element_children(node).collect();
                for child in children {
                    self.parse_inline(child, link);
                }
            }
            "w:bookmarkStart" => {
                let bookmark = self.registry.create(ElementType::Bookmark, Some(node));
                self.registry.get_mut(bookmark).payload = ElementPayload::Bookmark {
                    name: self
                        .xml
                        .attribute(node, "w:name")
                        .unwrap_or("")
                        .to_string(),
                };
                self.registry.append_child(parent, bookmark);
            }
            "w:pPr" | "w:proofErr" | "w:bookmarkEnd" => {}
            other => debug!(element = other, "skipping unknown inline element"),
        }
    }

    fn parse_drawing(&mut self, node: XmlNodeId, parent: ElementId) {
        let frame = self.registry.create(ElementType::Frame, Some(node));
        self.registry.append_child(parent, frame);
        if let Some(embed) = self.find_blip_embed(node) {
            if let Some(target) = self.rels.resolve(&self.base, &embed) {
                let image = self.registry.create(ElementType::Image, Some(node));
                self.registry.get_mut(image).payload = ElementPayload::Image {
                    href: target.to_string(),
                };
                self.registry.append_child(frame, image);
            }
        }
    }

    fn find_blip_embed(&self, node: XmlNodeId) -> Option<String> {
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if self.xml.name(current) == "a:blip" {
                if let Some(embed) = self.xml.attribute(current, "r:embed") {
                    return Some(embed.to_string());
                }
            }
            stack.extend(self.xml.element_children(current));
        }
        None
    }

    fn parse_table(&mut self, node: XmlNodeId, parent: ElementId) {
        let table = self.registry.create(ElementType::Table, Some(node));
        self.registry.append_child(parent, table);

        if let Some(grid) = self.xml.first_child_by_name(node, "w:tblGrid") {
            let columns: Vec<XmlNodeId> = self.xml.children_by_name(grid, "w:gridCol").collect();
            for column_node in columns {
                let column = self
                    .registry
                    .create(ElementType::TableColumn, Some(column_node));
                if let Some(width) = self
                    .xml
                    .attribute(column_node, "w:w")
                    .and_then(twips)
                {
                    let name = format!("__col{}", self.anonymous);
                    self.anonymous += 1;
                    self.styles.insert_automatic(
                        StyleFamily::TableColumn,
                        name.clone(),
                        StyleEntry {
                            parent: None,
                            partial: ResolvedStyle {
                                table_column: crate::doc::style::TableColumnStyle {
                                    width: Some(width),
                                },
                                ..Default::default()
                            },
                        },
                    );
                    self.registry.get_mut(column).style_name = Some(name);
                }
                self.registry.append_table_column(table, column);
            }
        }

        let rows: Vec<XmlNodeId> = self.xml.children_by_name(node, "w:tr").collect();
        for row_node in rows {
            let row = self.registry.create(ElementType::TableRow, Some(row_node));
            self.registry.append_child(table, row);
            let cells: Vec<XmlNodeId> = self.xml.children_by_name(row_node, "w:tc").collect();
            for cell_node in cells {
                let cell = self.registry.create(ElementType::TableCell, Some(cell_node));
                let column_span = self
                    .xml
                    .first_child_by_name(cell_node, "w:tcPr")
                    .and_then(|tcpr| attr_val(self.xml, tcpr, "w:gridSpan"))
                    .and_then(|value| value.parse().ok())
                    .unwrap_or(1);
                self.registry.get_mut(cell).payload = ElementPayload::Cell {
                    column_span,
                    row_span: 1,
                    covered: false,
                };
                self.registry.append_child(row, cell);
                let blocks: Vec<XmlNodeId> = self.xml.element_children(cell_node).collect();
                for block in blocks {
                    self.parse_block(block, cell);
                }
            }
        }
    }

    fn style_from_properties(
        &mut self,
        element: ElementId,
        node: XmlNodeId,
        properties_name: &str,
        style_ref_name: &str,
    ) {
        let Some(properties) = self.xml.first_child_by_name(node, properties_name) else {
            return;
        };
        let parent_style = attr_val(self.xml, properties, style_ref_name).map(str::to_string);
        let mut partial = ResolvedStyle::default();
        if properties_name == "w:pPr" {
            read_paragraph_properties(self.xml, properties, &mut partial);
        } else {
            read_run_properties(self.xml, properties, &mut partial);
        }
        if parent_style.is_none() && partial == ResolvedStyle::default() {
            return;
        }
        // direct formatting becomes an anonymous automatic style
        let name = format!("__direct{}", self.anonymous);
        self.anonymous += 1;
        let family = StyleFamily::of_element(self.registry.get(element).element_type);
        self.styles.insert_automatic(
            family,
            name.clone(),
            StyleEntry {
                parent: parent_style,
                partial,
            },
        );
        self.registry.get_mut(element).style_name = Some(name);
    }
}

/// Parse a WordprocessingML package into a [`Document`].
pub fn parse_document(filesystem: &dyn Filesystem) -> Result<Document> {
    let part = Path::new("/word/document.xml")?;
    let file = filesystem
        .open(&part)
        .map_err(|_| OpenError::NoOfficeOpenXmlFile)?;
    let mut xml = XmlDocument::parse(&file.bytes()?)?;

    let mut styles = StyleRegistry::new();
    if let Ok(styles_file) = filesystem.open(&Path::new("/word/styles.xml")?) {
        let styles_root = xml.append_tree(&styles_file.bytes()?)?;
        index_styles(&xml, styles_root, &mut styles);
    }

    let body = xml
        .find(xml.root(), "w:body")
        .ok_or(OpenError::NoOfficeOpenXmlFile)?;

    // section properties carry the page geometry
    if let Some(sectpr) = xml.first_child_by_name(body, "w:sectPr") {
        let mut layout = PageLayout::default();
        if let Some(size) = xml.first_child_by_name(sectpr, "w:pgSz") {
            layout.width = xml.attribute(size, "w:w").and_then(twips);
            layout.height = xml.attribute(size, "w:h").and_then(twips);
        }
        if let Some(margin) = xml.first_child_by_name(sectpr, "w:pgMar") {
            layout.margin.top = xml.attribute(margin, "w:top").and_then(twips);
            layout.margin.right = xml.attribute(margin, "w:right").and_then(twips);
            layout.margin.bottom = xml.attribute(margin, "w:bottom").and_then(twips);
            layout.margin.left = xml.attribute(margin, "w:left").and_then(twips);
        }
        styles.insert_page_layout("default".to_string(), layout);
    }

    let rels = Relationships::for_part(filesystem, &part)?;
    let mut registry = ElementRegistry::new();
    let root = registry.create(ElementType::TextRoot, Some(body));
    {
        let mut parser = TextParser {
            xml: &xml,
            registry: &mut registry,
            styles: &mut styles,
            rels: &rels,
            base: part.parent()?,
            anonymous: 0,
        };
        let blocks: Vec<XmlNodeId> = parser.xml.element_children(body).collect();
        for block in blocks {
            parser.parse_block(block, root);
        }
    }

    Ok(Document {
        kind: DocumentKind::Text,
        xml,
        registry,
        root,
        styles,
        master_pages: Vec::new(),
        first_master_page: None,
    })
}
