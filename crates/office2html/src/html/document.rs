//! The element-tree to HTML walk: one page per logical page, slide, sheet,
//! or drawing page, driven by the document cursor.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::config::HtmlOptions;
use crate::doc::elements::ElementPayload;
use crate::doc::{Document, DocumentCursor, DocumentKind, ElementType};
use crate::error::Result;
use crate::magic;
use crate::vfs::{Filesystem, Path};

use super::sheet;
use super::style as css;
use super::writer::{HtmlWriter, escape_text};
use super::{HtmlOutput, HtmlPage};

/// What a tab stop expands to.
pub const TAB_FILLER: &str = "&emsp;";

pub(super) struct Translator<'a> {
    pub document: &'a Document,
    pub package: Option<&'a dyn Filesystem>,
    pub options: &'a HtmlOptions,
    pub resources: Vec<(String, Vec<u8>)>,
}

impl<'a> Translator<'a> {
    pub fn new(
        document: &'a Document,
        package: Option<&'a dyn Filesystem>,
        options: &'a HtmlOptions,
    ) -> Self {
        Self {
            document,
            package,
            options,
            resources: Vec::new(),
        }
    }

    /// Translate the whole document into its logical pages.
    pub fn translate(mut self) -> Result<HtmlOutput> {
        let mut pages = match self.document.kind {
            DocumentKind::Text => vec![self.translate_text_document()?],
            DocumentKind::Presentation | DocumentKind::Drawing => self.translate_pages()?,
            DocumentKind::Spreadsheet => sheet::translate_sheets(&mut self)?,
        };

        // entry window
        let offset = self.options.entry_offset as usize;
        if offset > 0 || self.options.entry_count > 0 {
            let end = if self.options.entry_count > 0 {
                (offset + self.options.entry_count as usize).min(pages.len())
            } else {
                pages.len()
            };
            pages = pages.drain(offset.min(pages.len())..end).collect();
        }

        Ok(HtmlOutput {
            pages,
            resources: self.resources,
        })
    }

    fn writer(&self) -> HtmlWriter {
        HtmlWriter::new(self.options.format_html, self.options.html_indent)
    }

    fn translate_text_document(&mut self) -> Result<HtmlPage> {
        let layout = self.document.page_layout(None);
        let mut writer = self.writer();
        writer.open(
            "div",
            &[
                ("class", "page".to_string()),
                ("style", css::page_css(&layout, self.options.text_document_margin)),
            ],
        );
        let inner_style = if self.options.text_document_margin {
            css::page_margin_css(&layout)
        } else {
            String::new()
        };
        writer.open("div", &[("class", "content".to_string()), ("style", inner_style)]);

        let mut cursor = self.document.cursor();
        self.render_children(&mut writer, &mut cursor);

        writer.close();
        writer.close();
        Ok(HtmlPage {
            name: "page-1".to_string(),
            html: writer.finish(),
        })
    }

    /// One output page per slide or drawing page.
    fn translate_pages(&mut self) -> Result<Vec<HtmlPage>> {
        let mut pages = Vec::new();
        let mut cursor = self.document.cursor();
        let mut collected: Vec<(String, String)> = Vec::new();
        cursor.for_each_child(|cursor, index| {
            let name = match cursor.element_type() {
                ElementType::Slide => format!("slide-{}", index + 1),
                _ => format!("page-{}", index + 1),
            };
            let html = self.render_one_page(cursor);
            collected.push((name, html));
            true
        });
        for (name, html) in collected {
            pages.push(HtmlPage { name, html });
        }
        Ok(pages)
    }

    fn render_one_page(&mut self, cursor: &mut DocumentCursor<'_>) -> String {
        let master = self.document.master_page_of(cursor.element());
        let layout = self.document.page_layout(master);
        let mut writer = self.writer();
        let mut style = css::page_css(&layout, false);
        style.push_str(";position:relative;overflow:hidden");
        writer.open(
            "div",
            &[("class", "page".to_string()), ("style", style)],
        );
        // the master page background renders first, underneath the content
        if cursor.move_to_master_page() {
            self.render_children(&mut writer, cursor);
            cursor.move_to_parent();
        }
        self.render_children(&mut writer, cursor);
        writer.close();
        writer.finish()
    }

    pub(super) fn render_children(
        &mut self,
        writer: &mut HtmlWriter,
        cursor: &mut DocumentCursor<'_>,
    ) {
        cursor.for_each_child(|cursor, _| {
            self.render_element(writer, cursor);
            true
        });
    }

    fn data_path(&self, cursor: &DocumentCursor<'_>) -> (&'static str, String) {
        if self.options.editable {
            ("data-path", cursor.document_path().to_string())
        } else {
            ("data-path", String::new())
        }
    }

    pub(super) fn render_element(
        &mut self,
        writer: &mut HtmlWriter,
        cursor: &mut DocumentCursor<'_>,
    ) {
        let document = self.document;
        match cursor.element_type() {
            ElementType::Paragraph => {
                let style = css::paragraph_css(cursor.style(), &document.styles);
                let path = self.data_path(cursor);
                writer.open("p", &[("style", style), path]);
                self.render_children(writer, cursor);
                writer.close();
            }
            ElementType::Span => {
                let style = css::text_css(cursor.style(), &document.styles);
                let path = self.data_path(cursor);
                writer.open_inline("span", &[("style", style), path]);
                self.render_children(writer, cursor);
                writer.close();
            }
            ElementType::Text => {
                let path = self.data_path(cursor);
                writer.open_inline("span", &[path]);
                let text = document.element_text(cursor.element());
                writer.raw(&escape_text(&text).replace('\t', TAB_FILLER));
                writer.close();
            }
            ElementType::LineBreak => writer.void("br", &[]),
            ElementType::Link => {
                let href = match &document.registry.get(cursor.element()).payload {
                    ElementPayload::Link { href } => href.clone(),
                    _ => String::new(),
                };
                writer.open_inline("a", &[("href", href)]);
                self.render_children(writer, cursor);
                writer.close();
            }
            ElementType::Bookmark => {
                let name = match &document.registry.get(cursor.element()).payload {
                    ElementPayload::Bookmark { name } => name.clone(),
                    _ => String::new(),
                };
                writer.open_inline("a", &[("id", name)]);
                writer.close();
            }
            ElementType::List => {
                writer.open("ul", &[]);
                self.render_children(writer, cursor);
                writer.close();
            }
            ElementType::ListItem => {
                writer.open("li", &[]);
                self.render_children(writer, cursor);
                writer.close();
            }
            ElementType::Table => self.render_table(writer, cursor),
            ElementType::Sheet => sheet::render_sheet(self, writer, cursor),
            ElementType::Frame => {
                let style = self.frame_css(cursor);
                writer.open("div", &[("class", "frame".to_string()), ("style", style)]);
                self.render_children(writer, cursor);
                writer.close();
            }
            ElementType::Image => self.render_image(writer, cursor),
            ElementType::Rect | ElementType::Circle | ElementType::CustomShape => {
                let mut style = css::graphic_css(cursor.style());
                let position = self.frame_css(cursor);
                if !position.is_empty() {
                    style.push(';');
                    style.push_str(&position);
                }
                writer.open("div", &[("class", "shape".to_string()), ("style", style)]);
                self.render_children(writer, cursor);
                writer.close();
            }
            ElementType::Line => {
                writer.void(
                    "hr",
                    &[("style", css::graphic_css(cursor.style()))],
                );
            }
            ElementType::Group => {
                writer.open("div", &[("class", "group".to_string())]);
                self.render_children(writer, cursor);
                writer.close();
            }
            // structural kinds handled by their callers
            ElementType::Root
            | ElementType::TextRoot
            | ElementType::Slide
            | ElementType::Page
            | ElementType::MasterPage
            | ElementType::TableColumn
            | ElementType::TableRow
            | ElementType::TableCell => {
                self.render_children(writer, cursor);
            }
        }
    }

    /// Absolute placement from the frame's geometry attributes, when set.
    fn frame_css(&self, cursor: &DocumentCursor<'_>) -> String {
        let Some(node) = self.document.registry.get(cursor.element()).node else {
            return String::new();
        };
        let mut properties = Vec::new();
        for (attribute, property) in [
            ("svg:x", "left"),
            ("svg:y", "top"),
            ("svg:width", "width"),
            ("svg:height", "height"),
        ] {
            if let Some(value) = self.document.xml.attribute(node, attribute) {
                properties.push(format!("{property}:{value}"));
            }
        }
        if properties.is_empty() {
            return String::new();
        }
        format!("position:absolute;{}", properties.join(";"))
    }

    fn render_table(&mut self, writer: &mut HtmlWriter, cursor: &mut DocumentCursor<'_>) {
        writer.open("table", &[("style", css::table_css(cursor.style()))]);
        writer.open("colgroup", &[]);
        cursor.for_each_table_column(|cursor, _| {
            writer.void("col", &[("style", css::table_column_css(cursor.style()))]);
            true
        });
        writer.close();
        cursor.for_each_table_row(|cursor, _| {
            writer.open("tr", &[("style", css::table_row_css(cursor.style()))]);
            cursor.for_each_table_cell(|cursor, _| {
                let payload = self
                    .document
                    .registry
                    .get(cursor.element())
                    .payload
                    .clone();
                if let ElementPayload::Cell {
                    column_span,
                    row_span,
                    covered,
                } = payload
                {
                    if covered {
                        return true;
                    }
                    let mut attributes = vec![(
                        "style",
                        css::table_cell_css(cursor.style()),
                    )];
                    if column_span > 1 {
                        attributes.push(("colspan", column_span.to_string()));
                    }
                    if row_span > 1 {
                        attributes.push(("rowspan", row_span.to_string()));
                    }
                    writer.open("td", &attributes);
                    self.render_children(writer, cursor);
                    writer.close();
                }
                true
            });
            writer.close();
            true
        });
        writer.close();
    }

    fn render_image(&mut self, writer: &mut HtmlWriter, cursor: &mut DocumentCursor<'_>) {
        let href = match &self.document.registry.get(cursor.element()).payload {
            ElementPayload::Image { href } => href.clone(),
            _ => String::new(),
        };
        let source = self.image_source(&href);
        writer.void("img", &[("src", source), ("alt", String::new())]);
    }

    /// Inline the image as a data URI, or stage it under `resources/` when
    /// resources are external.
    fn image_source(&mut self, href: &str) -> String {
        let Some(package) = self.package else {
            return href.to_string();
        };
        let Some(data) = Path::new(href)
            .ok()
            .and_then(|path| path.as_absolute().ok())
            .and_then(|path| package.open(&path).ok())
            .and_then(|file| file.bytes().ok())
        else {
            return href.to_string();
        };
        if self.options.embed_resources {
            let mime = image_mime(&data);
            return format!("data:{mime};base64,{}", BASE64.encode(data.as_slice()));
        }
        let name = format!(
            "media/{}",
            href.rsplit('/').next().unwrap_or("image")
        );
        self.resources.push((name.clone(), data.as_ref().clone()));
        let base = if self.options.relative_resource_paths {
            "resources"
        } else {
            &self.options.external_resource_path
        };
        format!("{base}/{name}")
    }
}

fn image_mime(data: &[u8]) -> &'static str {
    use crate::config::FileType;
    match magic::file_type(&data[..data.len().min(12)]) {
        FileType::PortableNetworkGraphics => "image/png",
        FileType::Jpeg => "image/jpeg",
        FileType::GraphicsInterchangeFormat => "image/gif",
        FileType::BitmapImageFile => "image/bmp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::{File, MemoryFilesystem};

    const CONTENT: &str = r#"<?xml version="1.0"?>
<office:document-content xmlns:office="urn:o">
  <office:automatic-styles>
    <style:style style:name="P1" style:family="paragraph">
      <style:text-properties fo:font-weight="bold"/>
    </style:style>
  </office:automatic-styles>
  <office:body>
    <office:text>
      <text:p text:style-name="P1">Bold title</text:p>
      <text:p>Plain <text:span>nested</text:span></text:p>
      <text:p>A<text:tab/>B</text:p>
    </office:text>
  </office:body>
</office:document-content>"#;

    fn document() -> crate::doc::Document {
        let mut fs = MemoryFilesystem::new();
        fs.create_file(
            &Path::new("/content.xml").unwrap(),
            File::from_bytes(CONTENT.as_bytes().to_vec()),
        )
        .unwrap();
        crate::odf::parser::parse_document(&fs).unwrap()
    }

    #[test]
    fn test_text_document_page() {
        let document = document();
        let options = HtmlOptions::default();
        let output = Translator::new(&document, None, &options).translate().unwrap();
        assert_eq!(output.pages.len(), 1);
        let html = &output.pages[0].html;
        assert!(html.contains("font-weight:bold"));
        assert!(html.contains("Bold title"));
        assert!(html.contains("<span>nested</span>"));
        assert!(html.contains(TAB_FILLER));
    }

    #[test]
    fn test_editable_emits_data_paths() {
        let document = document();
        let options = HtmlOptions {
            editable: true,
            ..Default::default()
        };
        let output = Translator::new(&document, None, &options).translate().unwrap();
        let html = &output.pages[0].html;
        assert!(html.contains(r#"data-path="/child:0/child:0""#));
        assert!(html.contains(r#"data-path="/child:1/child:1""#));
    }

    #[test]
    fn test_entry_window() {
        let document = document();
        let options = HtmlOptions {
            entry_offset: 1,
            ..Default::default()
        };
        // a text document has a single page, so offsetting past it leaves none
        let output = Translator::new(&document, None, &options).translate().unwrap();
        assert!(output.pages.is_empty());
    }
}
