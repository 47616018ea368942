//! Inline edit diffs: a JSON map from document paths to replacement text,
//! applied onto the parsed document's backing XML.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::doc::{Document, DocumentPath, ElementId, ElementType};
use crate::error::{OpenError, Result};
use crate::xml::XmlNodeId;

/// The wire shape of an edit diff.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct EditDiff {
    /// Document path to new text content.
    #[serde(rename = "modifiedText", default)]
    pub modified_text: BTreeMap<String, String>,
}

impl EditDiff {
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|_| OpenError::NoJsonFile)
    }
}

/// Apply every entry of a diff to the document's XML.
///
/// Each path is resolved from the root; a path that does not resolve is an
/// [`OpenError::InvalidPath`].
pub fn apply_edits(document: &mut Document, diff: &EditDiff) -> Result<()> {
    let mut targets: Vec<(ElementId, String)> = Vec::new();
    {
        let mut cursor = document.cursor();
        for (path_text, text) in &diff.modified_text {
            let path = DocumentPath::parse(path_text)?;
            if !cursor.move_to(&path) {
                return Err(OpenError::InvalidPath(format!(
                    "no element at {path_text}"
                )));
            }
            targets.push((cursor.element(), text.clone()));
        }
    }
    for (element, text) in targets {
        overwrite_element_text(document, element, &text);
    }
    Ok(())
}

fn overwrite_element_text(document: &mut Document, element: ElementId, text: &str) {
    let record = document.registry.get(element).clone();
    match record.element_type {
        ElementType::Text => {
            let (Some(first), Some(last)) = (record.node, record.last_node) else {
                return;
            };
            // collapse the run onto its first node
            let mut to_remove: Vec<XmlNodeId> = Vec::new();
            let mut current = document.xml.node(first).next_sibling;
            while let Some(node) = current {
                to_remove.push(node);
                if node == last {
                    break;
                }
                current = document.xml.node(node).next_sibling;
            }
            for node in to_remove {
                document.xml.detach(node);
            }
            document.xml.replace_with_text(first, text);
            document.registry.get_mut(element).last_node = Some(first);
        }
        _ => {
            let Some(node) = record.node else {
                return;
            };
            // replace both the XML subtree and the element's children with
            // a single text run so tree and DOM stay in step
            let new_node = document.xml.set_text_content(node, text);
            let text_element = document.registry.create(ElementType::Text, Some(new_node));
            document.registry.get_mut(text_element).parent = Some(element);
            let record = document.registry.get_mut(element);
            record.first_child = Some(text_element);
            record.last_child = Some(text_element);
        }
    }
}
