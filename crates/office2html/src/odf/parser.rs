//! Build the element tree from an ODF package: `content.xml` (and the
//! master pages from `styles.xml`) become typed elements with parent and
//! sibling wiring, dispatched on qualified XML names.

use std::collections::HashMap;

use tracing::debug;

use crate::doc::elements::{ElementId, ElementPayload, ElementRegistry, ElementType};
use crate::doc::styles::StyleRegistry;
use crate::doc::{Document, DocumentKind};
use crate::error::{OpenError, Result};
use crate::vfs::{Filesystem, Path};
use crate::xml::{XmlDocument, XmlNodeId};

use super::spreadsheet;
use super::styles::index_styles;

pub(crate) struct ParseContext<'a> {
    pub xml: &'a XmlDocument,
    pub registry: &'a mut ElementRegistry,
    pub kind: DocumentKind,
}

impl ParseContext<'_> {
    /// Parse all children of `xml_parent` and append them under `parent`,
    /// merging adjacent text-like nodes into single text elements.
    pub fn parse_children(&mut self, xml_parent: XmlNodeId, parent: ElementId) {
        let xml = self.xml;
        let mut run: Option<(XmlNodeId, XmlNodeId)> = None;
        let children: Vec<XmlNodeId> = xml.children(xml_parent).collect();
        for child in children {
            if is_text_like(xml, child) {
                run = match run {
                    Some((first, _)) => Some((first, child)),
                    None => Some((child, child)),
                };
                continue;
            }
            if let Some((first, last)) = run.take() {
                self.append_text_run(parent, first, last);
            }
            if let Some(element) = self.parse_detached(child) {
                self.registry.append_child(parent, element);
            }
        }
        if let Some((first, last)) = run.take() {
            self.append_text_run(parent, first, last);
        }
    }

    fn append_text_run(&mut self, parent: ElementId, first: XmlNodeId, last: XmlNodeId) {
        // whitespace between block elements is insignificant; only inline
        // contexts keep it
        let inline_context = matches!(
            self.registry.get(parent).element_type,
            ElementType::Paragraph | ElementType::Span | ElementType::Link
        );
        if !inline_context && self.run_is_whitespace(first, last) {
            return;
        }
        let element = self.registry.create(ElementType::Text, Some(first));
        self.registry.get_mut(element).last_node = Some(last);
        self.registry.append_child(parent, element);
    }

    fn run_is_whitespace(&self, first: XmlNodeId, last: XmlNodeId) -> bool {
        let xml = self.xml;
        let mut current = Some(first);
        while let Some(node) = current {
            if !xml.is_text(node) || !xml.text(node).trim().is_empty() {
                return false;
            }
            if node == last {
                break;
            }
            current = xml.node(node).next_sibling;
        }
        true
    }

    /// Parse one XML element into an (unattached) document element.
    ///
    /// Unknown elements yield `None` and are skipped with their subtree.
    pub fn parse_detached(&mut self, node: XmlNodeId) -> Option<ElementId> {
        let xml = self.xml;
        let name = xml.name(node);
        let (element_type, descend) = match name {
            "text:p" | "text:h" => (ElementType::Paragraph, true),
            "text:span" => (ElementType::Span, true),
            "text:a" => (ElementType::Link, true),
            "text:line-break" => (ElementType::LineBreak, false),
            "text:bookmark" | "text:bookmark-start" => (ElementType::Bookmark, false),
            "text:list" => (ElementType::List, true),
            "text:list-item" | "text:list-header" => (ElementType::ListItem, true),
            "table:table" => {
                if self.kind == DocumentKind::Spreadsheet {
                    return Some(spreadsheet::parse_sheet(self, node));
                }
                return Some(self.parse_table(node));
            }
            "draw:page" => {
                let element_type = if self.kind == DocumentKind::Presentation {
                    ElementType::Slide
                } else {
                    ElementType::Page
                };
                (element_type, true)
            }
            "draw:frame" => (ElementType::Frame, true),
            "draw:image" => (ElementType::Image, false),
            "draw:rect" => (ElementType::Rect, true),
            "draw:line" => (ElementType::Line, true),
            "draw:circle" | "draw:ellipse" => (ElementType::Circle, true),
            "draw:custom-shape" => (ElementType::CustomShape, true),
            "draw:g" => (ElementType::Group, true),
            "draw:text-box" => (ElementType::Group, true),
            _ => {
                debug!(element = name, "skipping unknown element");
                return None;
            }
        };

        let element = self.registry.create(element_type, Some(node));
        self.registry.get_mut(element).style_name = style_name_of(xml, node);
        match element_type {
            ElementType::Link => {
                self.registry.get_mut(element).payload = ElementPayload::Link {
                    href: xml.attribute(node, "xlink:href").unwrap_or("").to_string(),
                };
            }
            ElementType::Bookmark => {
                self.registry.get_mut(element).payload = ElementPayload::Bookmark {
                    name: xml.attribute(node, "text:name").unwrap_or("").to_string(),
                };
            }
            ElementType::Image => {
                self.registry.get_mut(element).payload = ElementPayload::Image {
                    href: xml.attribute(node, "xlink:href").unwrap_or("").to_string(),
                };
            }
            ElementType::Slide | ElementType::Page => {
                self.registry.get_mut(element).payload = ElementPayload::MasterRef { master: None };
            }
            _ => {}
        }
        if descend {
            self.parse_children(node, element);
        }
        Some(element)
    }

    /// A table inside a text document: a column chain plus row children.
    fn parse_table(&mut self, node: XmlNodeId) -> ElementId {
        let xml = self.xml;
        let table = self.registry.create(ElementType::Table, Some(node));
        self.registry.get_mut(table).style_name = style_name_of(xml, node);

        for column_node in xml.children_by_name(node, "table:table-column") {
            let repeated: u32 = xml
                .attribute(column_node, "table:number-columns-repeated")
                .and_then(|value| value.parse().ok())
                .unwrap_or(1)
                .clamp(1, 1024);
            for _ in 0..repeated {
                let column = self
                    .registry
                    .create(ElementType::TableColumn, Some(column_node));
                self.registry.get_mut(column).style_name = style_name_of(xml, column_node);
                self.registry.append_table_column(table, column);
            }
        }

        let row_nodes: Vec<XmlNodeId> = xml
            .children(node)
            .flat_map(|child| match xml.name(child) {
                "table:table-row" => vec![child],
                "table:table-header-rows" => {
                    xml.children_by_name(child, "table:table-row").collect()
                }
                _ => Vec::new(),
            })
            .collect();
        for row_node in row_nodes {
            let row = self.registry.create(ElementType::TableRow, Some(row_node));
            self.registry.get_mut(row).style_name = style_name_of(xml, row_node);
            self.registry.append_child(table, row);

            let cell_nodes: Vec<XmlNodeId> = xml.children(row_node).collect();
            for cell_node in cell_nodes {
                let covered = match xml.name(cell_node) {
                    "table:table-cell" => false,
                    "table:covered-table-cell" => true,
                    _ => continue,
                };
                let repeated: u32 = xml
                    .attribute(cell_node, "table:number-columns-repeated")
                    .and_then(|value| value.parse().ok())
                    .unwrap_or(1)
                    .clamp(1, 1024);
                for _ in 0..repeated {
                    let cell = self.registry.create(ElementType::TableCell, Some(cell_node));
                    self.registry.get_mut(cell).style_name = style_name_of(xml, cell_node);
                    self.registry.get_mut(cell).payload = ElementPayload::Cell {
                        column_span: span_of(xml, cell_node, "table:number-columns-spanned"),
                        row_span: span_of(xml, cell_node, "table:number-rows-spanned"),
                        covered,
                    };
                    self.registry.append_child(row, cell);
                    if !covered {
                        self.parse_children(cell_node, cell);
                    }
                }
            }
        }
        table
    }
}

fn span_of(xml: &XmlDocument, node: XmlNodeId, attribute: &str) -> u32 {
    xml.attribute(node, attribute)
        .and_then(|value| value.parse().ok())
        .unwrap_or(1)
        .max(1)
}

fn is_text_like(xml: &XmlDocument, node: XmlNodeId) -> bool {
    xml.is_text(node) || matches!(xml.name(node), "text:s" | "text:tab")
}

fn style_name_of(xml: &XmlDocument, node: XmlNodeId) -> Option<String> {
    for attribute in [
        "text:style-name",
        "table:style-name",
        "draw:style-name",
        "presentation:style-name",
    ] {
        if let Some(name) = xml.attribute(node, attribute) {
            return Some(name.to_string());
        }
    }
    None
}

/// Parse an ODF package from a filesystem into a [`Document`].
pub fn parse_document(filesystem: &dyn Filesystem) -> Result<Document> {
    let content = filesystem
        .open(&Path::new("/content.xml")?)
        .map_err(|_| OpenError::NoOpenDocumentFile)?;
    let mut xml = XmlDocument::parse(&content.bytes()?)?;

    let styles_root = match filesystem.open(&Path::new("/styles.xml")?) {
        Ok(styles_file) => Some(xml.append_tree(&styles_file.bytes()?)?),
        Err(_) => None,
    };

    let mut styles = StyleRegistry::new();
    if let Some(root) = styles_root {
        index_styles(&xml, root, &mut styles);
    }
    index_styles(&xml, xml.root(), &mut styles);

    let body = xml
        .find(xml.root(), "office:body")
        .ok_or(OpenError::NoOpenDocumentFile)?;
    let (kind, content_root) = ["office:text", "office:presentation", "office:spreadsheet", "office:drawing"]
        .iter()
        .find_map(|name| xml.first_child_by_name(body, name).map(|node| (*name, node)))
        .map(|(name, node)| {
            let kind = match name {
                "office:text" => DocumentKind::Text,
                "office:presentation" => DocumentKind::Presentation,
                "office:spreadsheet" => DocumentKind::Spreadsheet,
                _ => DocumentKind::Drawing,
            };
            (kind, node)
        })
        .ok_or(OpenError::NoOpenDocumentFile)?;

    let mut registry = ElementRegistry::new();
    let root_type = if kind == DocumentKind::Text {
        ElementType::TextRoot
    } else {
        ElementType::Root
    };
    let root = registry.create(root_type, Some(content_root));

    {
        let mut ctx = ParseContext {
            xml: &xml,
            registry: &mut registry,
            kind,
        };
        ctx.parse_children(content_root, root);
    }

    // master pages from styles.xml
    let mut master_pages = Vec::new();
    let mut master_by_name: HashMap<String, ElementId> = HashMap::new();
    if let Some(styles_root) = styles_root {
        if let Some(master_styles) = xml.first_child_by_name(styles_root, "office:master-styles") {
            let master_nodes: Vec<XmlNodeId> = xml
                .children_by_name(master_styles, "style:master-page")
                .collect();
            let mut ctx = ParseContext {
                xml: &xml,
                registry: &mut registry,
                kind,
            };
            for master_node in master_nodes {
                let master = ctx.registry.create(ElementType::MasterPage, Some(master_node));
                ctx.parse_children(master_node, master);
                if let Some(name) = xml.attribute(master_node, "style:name") {
                    master_by_name.insert(name.to_string(), master);
                }
                master_pages.push(master);
            }
        }
    }

    // wire slides and pages to their master pages
    for id in 0..registry.len() as u32 {
        let id = ElementId(id);
        let element = registry.get(id);
        if !matches!(element.element_type, ElementType::Slide | ElementType::Page) {
            continue;
        }
        let master = element
            .node
            .and_then(|node| xml.attribute(node, "draw:master-page-name"))
            .and_then(|name| master_by_name.get(name).copied());
        registry.get_mut(id).payload = ElementPayload::MasterRef { master };
    }

    Ok(Document {
        kind,
        xml,
        registry,
        root,
        styles,
        first_master_page: master_pages.first().copied(),
        master_pages,
    })
}
