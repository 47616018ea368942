//! A small owned XML DOM.
//!
//! The document decoders keep long-lived references into parsed XML, so the
//! DOM is arena-backed: nodes live in one `Vec` and every link is an id.
//! Text nodes preserve whitespace exactly as read; the writer reproduces a
//! document that parses back to the same tree (used by the ODF save path).

use std::io::Cursor;

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::error::{OpenError, Result};

/// Index of a node inside an [`XmlDocument`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct XmlNodeId(pub u32);

#[derive(Debug, Clone)]
pub enum XmlNodeKind {
    Element {
        /// Qualified name as written, e.g. `table:table-row`.
        name: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
pub struct XmlNode {
    pub kind: XmlNodeKind,
    pub parent: Option<XmlNodeId>,
    pub first_child: Option<XmlNodeId>,
    pub last_child: Option<XmlNodeId>,
    pub previous_sibling: Option<XmlNodeId>,
    pub next_sibling: Option<XmlNodeId>,
}

#[derive(Debug, Clone)]
pub struct XmlDocument {
    nodes: Vec<XmlNode>,
    root: XmlNodeId,
}

impl XmlDocument {
    /// Parse a UTF-8 XML byte stream. Malformed XML is a [`OpenError::NoXmlFile`].
    pub fn parse(data: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(data)
            .map_err(|_| OpenError::NoXmlFile("document is not UTF-8".to_string()))?;
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(false);

        let mut nodes: Vec<XmlNode> = Vec::new();
        let mut stack: Vec<XmlNodeId> = Vec::new();
        let mut root: Option<XmlNodeId> = None;

        let mut push_node = |nodes: &mut Vec<XmlNode>,
                             stack: &[XmlNodeId],
                             root: &mut Option<XmlNodeId>,
                             kind: XmlNodeKind|
         -> Result<XmlNodeId> {
            let id = XmlNodeId(nodes.len() as u32);
            let parent = stack.last().copied();
            nodes.push(XmlNode {
                kind,
                parent,
                first_child: None,
                last_child: None,
                previous_sibling: None,
                next_sibling: None,
            });
            if let Some(parent_id) = parent {
                let previous = nodes[parent_id.0 as usize].last_child;
                nodes[parent_id.0 as usize].last_child = Some(id);
                if let Some(prev_id) = previous {
                    nodes[prev_id.0 as usize].next_sibling = Some(id);
                    nodes[id.0 as usize].previous_sibling = Some(prev_id);
                } else {
                    nodes[parent_id.0 as usize].first_child = Some(id);
                }
            } else if matches!(nodes[id.0 as usize].kind, XmlNodeKind::Element { .. }) {
                if root.is_some() {
                    return Err(OpenError::NoXmlFile("multiple root elements".to_string()));
                }
                *root = Some(id);
            }
            Ok(id)
        };

        let element_kind = |start: &BytesStart| -> Result<XmlNodeKind> {
            let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
            let mut attributes = Vec::new();
            for attribute in start.attributes() {
                let attribute =
                    attribute.map_err(|e| OpenError::NoXmlFile(format!("bad attribute: {e}")))?;
                let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
                let value = attribute
                    .unescape_value()
                    .map_err(|e| OpenError::NoXmlFile(format!("bad attribute value: {e}")))?
                    .into_owned();
                attributes.push((key, value));
            }
            Ok(XmlNodeKind::Element { name, attributes })
        };

        loop {
            match reader.read_event() {
                Ok(Event::Start(start)) => {
                    let id = push_node(&mut nodes, &stack, &mut root, element_kind(&start)?)?;
                    stack.push(id);
                }
                Ok(Event::Empty(start)) => {
                    push_node(&mut nodes, &stack, &mut root, element_kind(&start)?)?;
                }
                Ok(Event::End(_)) => {
                    if stack.pop().is_none() {
                        return Err(OpenError::NoXmlFile("unbalanced end tag".to_string()));
                    }
                }
                Ok(Event::Text(text)) => {
                    if !stack.is_empty() {
                        let content = text
                            .xml_content()
                            .map_err(|e| OpenError::NoXmlFile(format!("bad text: {e}")))?
                            .into_owned();
                        push_node(&mut nodes, &stack, &mut root, XmlNodeKind::Text(content))?;
                    }
                }
                Ok(Event::CData(data)) => {
                    if !stack.is_empty() {
                        let content = String::from_utf8_lossy(&data).into_owned();
                        push_node(&mut nodes, &stack, &mut root, XmlNodeKind::Text(content))?;
                    }
                }
                Ok(Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_)) => {}
                Ok(Event::GeneralRef(reference)) => {
                    if !stack.is_empty() {
                        let name = String::from_utf8_lossy(reference.as_ref()).into_owned();
                        let resolved = match name.as_str() {
                            "lt" => "<".to_string(),
                            "gt" => ">".to_string(),
                            "amp" => "&".to_string(),
                            "apos" => "'".to_string(),
                            "quot" => "\"".to_string(),
                            _ => {
                                let code = name
                                    .strip_prefix("#x")
                                    .or_else(|| name.strip_prefix("#X"))
                                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                                    .or_else(|| {
                                        name.strip_prefix('#').and_then(|dec| dec.parse().ok())
                                    });
                                match code.and_then(char::from_u32) {
                                    Some(c) => c.to_string(),
                                    None => {
                                        return Err(OpenError::NoXmlFile(format!(
                                            "unknown entity &{name};"
                                        )));
                                    }
                                }
                            }
                        };
                        push_node(&mut nodes, &stack, &mut root, XmlNodeKind::Text(resolved))?;
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(OpenError::NoXmlFile(e.to_string())),
            }
        }

        if !stack.is_empty() {
            return Err(OpenError::NoXmlFile("unclosed element".to_string()));
        }
        let root = root.ok_or_else(|| OpenError::NoXmlFile("no root element".to_string()))?;
        Ok(Self { nodes, root })
    }

    pub fn root(&self) -> XmlNodeId {
        self.root
    }

    /// Parse another XML document into this arena and return its root.
    ///
    /// The new tree is not linked to the existing one; it lets one arena
    /// back nodes from several parts (e.g. `content.xml` plus `styles.xml`).
    pub fn append_tree(&mut self, data: &[u8]) -> Result<XmlNodeId> {
        let sub = XmlDocument::parse(data)?;
        let offset = self.nodes.len() as u32;
        let shift = |id: Option<XmlNodeId>| id.map(|XmlNodeId(raw)| XmlNodeId(raw + offset));
        for node in sub.nodes {
            self.nodes.push(XmlNode {
                kind: node.kind,
                parent: shift(node.parent),
                first_child: shift(node.first_child),
                last_child: shift(node.last_child),
                previous_sibling: shift(node.previous_sibling),
                next_sibling: shift(node.next_sibling),
            });
        }
        Ok(XmlNodeId(sub.root.0 + offset))
    }

    pub fn node(&self, id: XmlNodeId) -> &XmlNode {
        &self.nodes[id.0 as usize]
    }

    pub fn is_element(&self, id: XmlNodeId) -> bool {
        matches!(self.node(id).kind, XmlNodeKind::Element { .. })
    }

    pub fn is_text(&self, id: XmlNodeId) -> bool {
        matches!(self.node(id).kind, XmlNodeKind::Text(_))
    }

    /// Qualified element name, or `""` for text nodes.
    pub fn name(&self, id: XmlNodeId) -> &str {
        match &self.node(id).kind {
            XmlNodeKind::Element { name, .. } => name,
            XmlNodeKind::Text(_) => "",
        }
    }

    pub fn attribute(&self, id: XmlNodeId, name: &str) -> Option<&str> {
        match &self.node(id).kind {
            XmlNodeKind::Element { attributes, .. } => attributes
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str()),
            XmlNodeKind::Text(_) => None,
        }
    }

    /// Text of a text node, or `""`.
    pub fn text(&self, id: XmlNodeId) -> &str {
        match &self.node(id).kind {
            XmlNodeKind::Text(text) => text,
            XmlNodeKind::Element { .. } => "",
        }
    }

    pub fn children(&self, id: XmlNodeId) -> XmlChildren<'_> {
        XmlChildren {
            document: self,
            next: self.node(id).first_child,
        }
    }

    pub fn element_children(&self, id: XmlNodeId) -> impl Iterator<Item = XmlNodeId> + '_ {
        self.children(id).filter(|&child| self.is_element(child))
    }

    pub fn children_by_name<'a>(
        &'a self,
        id: XmlNodeId,
        name: &'a str,
    ) -> impl Iterator<Item = XmlNodeId> + 'a {
        self.children(id).filter(move |&child| self.name(child) == name)
    }

    pub fn first_child_by_name(&self, id: XmlNodeId, name: &str) -> Option<XmlNodeId> {
        self.children_by_name(id, name).next()
    }

    /// Walk a `/`-separated chain of qualified child names from `id`.
    pub fn find(&self, id: XmlNodeId, path: &str) -> Option<XmlNodeId> {
        let mut current = id;
        for name in path.split('/').filter(|s| !s.is_empty()) {
            current = self.first_child_by_name(current, name)?;
        }
        Some(current)
    }

    /// Concatenated text of all descendant text nodes, whitespace preserved.
    pub fn text_content(&self, id: XmlNodeId) -> String {
        let mut result = String::new();
        self.collect_text(id, &mut result);
        result
    }

    fn collect_text(&self, id: XmlNodeId, into: &mut String) {
        match &self.node(id).kind {
            XmlNodeKind::Text(text) => into.push_str(text),
            XmlNodeKind::Element { .. } => {
                for child in self.children(id) {
                    self.collect_text(child, into);
                }
            }
        }
    }

    /// Replace the children of an element with one text node, returning
    /// the new node's id.
    pub fn set_text_content(&mut self, id: XmlNodeId, text: &str) -> XmlNodeId {
        let text_id = XmlNodeId(self.nodes.len() as u32);
        self.nodes.push(XmlNode {
            kind: XmlNodeKind::Text(text.to_string()),
            parent: Some(id),
            first_child: None,
            last_child: None,
            previous_sibling: None,
            next_sibling: None,
        });
        // detached children stay in the arena but are no longer reachable
        let node = &mut self.nodes[id.0 as usize];
        node.first_child = Some(text_id);
        node.last_child = Some(text_id);
        text_id
    }

    /// Overwrite the text of a text node.
    pub fn set_text(&mut self, id: XmlNodeId, text: &str) {
        if let XmlNodeKind::Text(current) = &mut self.nodes[id.0 as usize].kind {
            text.clone_into(current);
        }
    }

    /// Turn any node into a text node with the given content, keeping its
    /// links. Children of a former element node become unreachable.
    pub fn replace_with_text(&mut self, id: XmlNodeId, text: &str) {
        let node = &mut self.nodes[id.0 as usize];
        node.kind = XmlNodeKind::Text(text.to_string());
        node.first_child = None;
        node.last_child = None;
    }

    /// Unlink a node from its parent and siblings. The node stays in the
    /// arena but is no longer reachable from its tree.
    pub fn detach(&mut self, id: XmlNodeId) {
        let (parent, previous, next) = {
            let node = self.node(id);
            (node.parent, node.previous_sibling, node.next_sibling)
        };
        if let Some(previous) = previous {
            self.nodes[previous.0 as usize].next_sibling = next;
        }
        if let Some(next) = next {
            self.nodes[next.0 as usize].previous_sibling = previous;
        }
        if let Some(parent) = parent {
            let parent_node = &mut self.nodes[parent.0 as usize];
            if parent_node.first_child == Some(id) {
                parent_node.first_child = next;
            }
            if parent_node.last_child == Some(id) {
                parent_node.last_child = previous;
            }
        }
        let node = &mut self.nodes[id.0 as usize];
        node.parent = None;
        node.previous_sibling = None;
        node.next_sibling = None;
    }

    /// Detach every element with the given qualified name below `root`.
    pub fn strip_elements_named(&mut self, root: XmlNodeId, name: &str) {
        let mut matches = Vec::new();
        let mut stack = vec![root];
        while let Some(current) = stack.pop() {
            for child in self.children(current) {
                if self.name(child) == name {
                    matches.push(child);
                } else {
                    stack.push(child);
                }
            }
        }
        for id in matches {
            self.detach(id);
        }
    }

    /// Serialize the document, including an XML declaration.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .expect("write to memory");
        self.write_node(&mut writer, self.root);
        writer.into_inner().into_inner()
    }

    fn write_node(&self, writer: &mut Writer<Cursor<Vec<u8>>>, id: XmlNodeId) {
        match &self.node(id).kind {
            XmlNodeKind::Text(text) => {
                writer
                    .write_event(Event::Text(BytesText::new(text)))
                    .expect("write to memory");
            }
            XmlNodeKind::Element { name, attributes } => {
                let mut start = BytesStart::new(name.as_str());
                for (key, value) in attributes {
                    start.push_attribute((key.as_str(), value.as_str()));
                }
                if self.node(id).first_child.is_none() {
                    writer
                        .write_event(Event::Empty(start))
                        .expect("write to memory");
                    return;
                }
                writer
                    .write_event(Event::Start(start))
                    .expect("write to memory");
                for child in self.children(id) {
                    self.write_node(writer, child);
                }
                writer
                    .write_event(Event::End(BytesEnd::new(name.as_str())))
                    .expect("write to memory");
            }
        }
    }
}

pub struct XmlChildren<'a> {
    document: &'a XmlDocument,
    next: Option<XmlNodeId>,
}

impl Iterator for XmlChildren<'_> {
    type Item = XmlNodeId;

    fn next(&mut self) -> Option<XmlNodeId> {
        let current = self.next?;
        self.next = self.document.node(current).next_sibling;
        Some(current)
    }
}
