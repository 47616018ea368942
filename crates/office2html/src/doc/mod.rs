//! The uniform in-memory document: the parsed XML, the typed element tree,
//! the style registry, and the cursor that navigates it all.

pub mod cursor;
pub mod elements;
pub mod path;
pub mod style;
pub mod styles;

use serde::Serialize;

pub use cursor::DocumentCursor;
pub use elements::{Element, ElementId, ElementPayload, ElementRegistry, ElementType, SheetData};
pub use path::{Component, DocumentPath};
pub use style::{PageLayout, ResolvedStyle, TableDimensions, TablePosition};
pub use styles::{StyleFamily, StyleRegistry};

use crate::xml::XmlDocument;

/// What kind of document a file decodes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Text,
    Presentation,
    Spreadsheet,
    Drawing,
}

/// A fully decoded document.
#[derive(Debug, Clone)]
pub struct Document {
    pub kind: DocumentKind,
    /// The content DOM the element tree points into.
    pub xml: XmlDocument,
    pub registry: ElementRegistry,
    pub root: ElementId,
    pub styles: StyleRegistry,
    /// Master page elements, in declaration order.
    pub master_pages: Vec<ElementId>,
    pub first_master_page: Option<ElementId>,
}

impl Document {
    pub fn document_type(&self) -> DocumentKind {
        self.kind
    }

    /// A cursor positioned at the document root.
    pub fn cursor(&self) -> DocumentCursor<'_> {
        DocumentCursor::new(self)
    }

    /// The style attributes directly attached to an element, resolved
    /// through the registry.
    pub fn partial_style(&self, id: ElementId) -> ResolvedStyle {
        let element = self.registry.get(id);
        match &element.style_name {
            Some(name) => {
                let family = StyleFamily::of_element(element.element_type);
                (*self.styles.resolve(family, name)).clone()
            }
            None => ResolvedStyle::default(),
        }
    }

    /// The page layout referenced by a master page element (or the first
    /// master page when `id` is `None`).
    pub fn page_layout(&self, id: Option<ElementId>) -> PageLayout {
        let Some(id) = id.or(self.first_master_page) else {
            // documents without master pages register a "default" layout
            return self
                .styles
                .page_layout("default")
                .cloned()
                .unwrap_or_default();
        };
        let element = self.registry.get(id);
        element
            .node
            .and_then(|node| self.xml.attribute(node, "style:page-layout-name"))
            .and_then(|name| self.styles.page_layout(name))
            .cloned()
            .unwrap_or_default()
    }

    /// The master page a slide or drawing page links to.
    pub fn master_page_of(&self, id: ElementId) -> Option<ElementId> {
        match &self.registry.get(id).payload {
            ElementPayload::MasterRef { master } => *master,
            _ => None,
        }
        .or(self.first_master_page)
    }

    /// Concatenated text content of an element, following the backing XML.
    pub fn element_text(&self, id: ElementId) -> String {
        let element = self.registry.get(id);
        match element.element_type {
            ElementType::Text => {
                let (Some(first), Some(last)) = (element.node, element.last_node) else {
                    return String::new();
                };
                let mut result = String::new();
                let mut current = Some(first);
                while let Some(node) = current {
                    result.push_str(&text_of_run_node(&self.xml, node));
                    if node == last {
                        break;
                    }
                    current = self.xml.node(node).next_sibling;
                }
                result
            }
            _ => {
                let mut result = String::new();
                for child in self.registry.children(id) {
                    result.push_str(&self.element_text(child));
                }
                result
            }
        }
    }
}

/// Text of one node of a merged text run: literal text, a tab marker, or a
/// space expansion.
fn text_of_run_node(xml: &XmlDocument, node: crate::xml::XmlNodeId) -> String {
    if xml.is_text(node) {
        return xml.text(node).to_string();
    }
    match xml.name(node) {
        "text:tab" | "w:tab" => "\t".to_string(),
        "text:s" => {
            let count: usize = xml
                .attribute(node, "text:c")
                .and_then(|c| c.parse().ok())
                .unwrap_or(1);
            " ".repeat(count)
        }
        _ => xml.text_content(node),
    }
}
