//! PresentationML (`/ppt/presentation.xml` plus slide parts) into the
//! document tree.

use tracing::debug;

use crate::doc::elements::{ElementId, ElementPayload, ElementRegistry, ElementType};
use crate::doc::style::{Measure, PageLayout};
use crate::doc::styles::StyleRegistry;
use crate::doc::{Document, DocumentKind};
use crate::error::{OpenError, Result};
use crate::vfs::{Filesystem, Path};
use crate::xml::{XmlDocument, XmlNodeId};

use super::rels::Relationships;

/// EMUs (1/914400 inch) to a measure in inches, rounded to 4 decimals.
fn emu(value: &str) -> Option<Measure> {
    let emu: f64 = value.parse().ok()?;
    Some(Measure::new(
        (emu / 914_400.0 * 10_000.0).round() / 10_000.0,
        "in",
    ))
}

struct SlideParser<'a> {
    xml: &'a XmlDocument,
    registry: &'a mut ElementRegistry,
    rels: &'a Relationships,
    base: Path,
}

impl SlideParser<'_> {
    fn parse_shape_tree(&mut self, tree: XmlNodeId, parent: ElementId) {
        let children: Vec<XmlNodeId> = self.xml.element_children(tree).collect();
        for child in children {
            match self.xml.name(child) {
                "p:sp" => {
                    let frame = self.registry.create(ElementType::Frame, Some(child));
                    self.registry.append_child(parent, frame);
                    if let Some(body) = self.xml.first_child_by_name(child, "p:txBody") {
                        self.parse_text_body(body, frame);
                    }
                }
                "p:pic" => {
                    let frame = self.registry.create(ElementType::Frame, Some(child));
                    self.registry.append_child(parent, frame);
                    if let Some(embed) = self.find_blip_embed(child) {
                        if let Some(target) = self.rels.resolve(&self.base, &embed) {
                            let image = self.registry.create(ElementType::Image, Some(child));
                            self.registry.get_mut(image).payload = ElementPayload::Image {
                                href: target.to_string(),
                            };
                            self.registry.append_child(frame, image);
                        }
                    }
                }
                "p:grpSp" => {
                    let group = self.registry.create(ElementType::Group, Some(child));
                    self.registry.append_child(parent, group);
                    self.parse_shape_tree(child, group);
                }
                "p:nvGrpSpPr" | "p:grpSpPr" => {}
                other => debug!(element = other, "skipping unknown slide element"),
            }
        }
    }

    fn parse_text_body(&mut self, body: XmlNodeId, parent: ElementId) {
        let paragraphs: Vec<XmlNodeId> = self.xml.children_by_name(body, "a:p").collect();
        for paragraph_node in paragraphs {
            let paragraph = self
                .registry
                .create(ElementType::Paragraph, Some(paragraph_node));
            self.registry.append_child(parent, paragraph);
            let runs: Vec<XmlNodeId> = self.xml.element_children(paragraph_node).collect();
            for run in runs {
                match self.xml.name(run) {
                    "a:r" => {
                        let span = self.registry.create(ElementType::Span, Some(run));
                        self.registry.append_child(paragraph, span);
                        let parts: Vec<XmlNodeId> = self.xml.element_children(run).collect();
                        for part in parts {
                            if self.xml.name(part) == "a:t" {
                                let text = self.registry.create(ElementType::Text, Some(part));
                                self.registry.append_child(span, text);
                            }
                        }
                    }
                    "a:br" => {
                        let line_break = self.registry.create(ElementType::LineBreak, Some(run));
                        self.registry.append_child(paragraph, line_break);
                    }
                    _ => {}
                }
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
}

/// Parse a PresentationML package into a [`Document`].
pub fn parse_document(filesystem: &dyn Filesystem) -> Result<Document> {
    let part = Path::new("/ppt/presentation.xml")?;
    let file = filesystem
        .open(&part)
        .map_err(|_| OpenError::NoOfficeOpenXmlFile)?;
    let mut xml = XmlDocument::parse(&file.bytes()?)?;
    let rels = Relationships::for_part(filesystem, &part)?;
    let base = part.parent()?;

    let mut styles = StyleRegistry::new();
    if let Some(size) = xml.find(xml.root(), "p:sldSz") {
        let layout = PageLayout {
            width: xml.attribute(size, "cx").and_then(emu),
            height: xml.attribute(size, "cy").and_then(emu),
            ..Default::default()
        };
        styles.insert_page_layout("default".to_string(), layout);
    }

    // slide parts in presentation order
    let mut slide_paths = Vec::new();
    if let Some(list) = xml.find(xml.root(), "p:sldIdLst") {
        for slide_id in xml.children_by_name(list, "p:sldId") {
            let Some(id) = xml.attribute(slide_id, "r:id") else {
                continue;
            };
            if let Some(path) = rels.resolve(&base, id) {
                slide_paths.push(path);
            }
        }
    }

    let mut registry = ElementRegistry::new();
    let root = registry.create(ElementType::Root, None);

    for slide_path in slide_paths {
        let Ok(slide_file) = filesystem.open(&slide_path) else {
            debug!(slide = %slide_path, "slide part missing, skipping");
            continue;
        };
        let slide_root = xml.append_tree(&slide_file.bytes()?)?;
        let slide_rels = Relationships::for_part(filesystem, &slide_path)?;

        let slide = registry.create(ElementType::Slide, Some(slide_root));
        registry.get_mut(slide).payload = ElementPayload::MasterRef { master: None };
        registry.append_child(root, slide);

        if let Some(tree) = xml.find(slide_root, "p:cSld/p:spTree") {
            let mut parser = SlideParser {
                xml: &xml,
                registry: &mut registry,
                rels: &slide_rels,
                base: slide_path.parent()?,
            };
            parser.parse_shape_tree(tree, slide);
        }
    }

    Ok(Document {
        kind: DocumentKind::Presentation,
        xml,
        registry,
        root,
        styles,
        master_pages: Vec::new(),
        first_master_page: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::{File, MemoryFilesystem};

    fn package() -> MemoryFilesystem {
        let mut fs = MemoryFilesystem::new();
        fs.create_file(
            &Path::new("/ppt/presentation.xml").unwrap(),
            File::from_bytes(
                br#"<p:presentation><p:sldSz cx="9144000" cy="6858000"/>
                    <p:sldIdLst><p:sldId id="256" r:id="rId2"/></p:sldIdLst></p:presentation>"#
                    .to_vec(),
            ),
        )
        .unwrap();
        fs.create_file(
            &Path::new("/ppt/_rels/presentation.xml.rels").unwrap(),
            File::from_bytes(
                br#"<Relationships><Relationship Id="rId2" Type="t" Target="slides/slide1.xml"/></Relationships>"#
                    .to_vec(),
            ),
        )
        .unwrap();
        fs.create_file(
            &Path::new("/ppt/slides/slide1.xml").unwrap(),
            File::from_bytes(
                br#"<p:sld><p:cSld><p:spTree>
                      <p:sp><p:txBody><a:p><a:r><a:t>Hello from the deck</a:t></a:r></a:p></p:txBody></p:sp>
                    </p:spTree></p:cSld></p:sld>"#
                    .to_vec(),
            ),
        )
        .unwrap();
        fs
    }

    #[test]
    fn test_slides_and_text() {
        let document = parse_document(&package()).unwrap();
        assert_eq!(document.kind, DocumentKind::Presentation);
        let slides: Vec<ElementId> = document.registry.children(document.root).collect();
        assert_eq!(slides.len(), 1);
        assert_eq!(document.element_text(slides[0]), "Hello from the deck");
    }

    #[test]
    fn test_slide_size_becomes_page_layout() {
        let document = parse_document(&package()).unwrap();
        let layout = document.page_layout(None);
        assert_eq!(layout.width.as_ref().unwrap().to_string(), "10in");
        assert_eq!(layout.height.as_ref().unwrap().to_string(), "7.5in");
    }

    #[test]
    fn test_missing_presentation_part() {
        let fs = MemoryFilesystem::new();
        assert!(matches!(
            parse_document(&fs),
            Err(OpenError::NoOfficeOpenXmlFile)
        ));
    }
}
