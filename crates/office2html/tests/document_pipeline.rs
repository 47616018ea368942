//! End-to-end scenarios: build a package in memory, open it through the
//! probe chain, and inspect the decoded document and its HTML.

mod common;

use pretty_assertions::assert_eq;

use office2html::doc::{DocumentKind, ElementType};
use office2html::{DecodedFile, FileType, HtmlOptions};

use common::*;

fn open_document(bytes: Vec<u8>) -> office2html::DocumentFile {
    match office2html::open_bytes(bytes).unwrap() {
        DecodedFile::Document(document) => document,
        other => panic!("expected a document, got {:?}", other.file_type()),
    }
}

#[test]
fn text_document_page_layout() {
    let bytes = build_odf(
        ODT_MIME,
        &[
            ("content.xml", &text_content_xml(&["About this file"])),
            ("styles.xml", &styles_xml("8.2673in", "11.6925in", "0.7874in")),
        ],
    );
    let document = open_document(bytes);
    assert_eq!(document.file_type(), FileType::OpendocumentText);

    let tree = document.document().unwrap();
    assert_eq!(tree.document_type(), DocumentKind::Text);
    let layout = tree.page_layout(None);
    assert_eq!(layout.width.as_ref().unwrap().to_string(), "8.2673in");
}

#[test]
fn drawing_pages_share_master_geometry() {
    let bytes = build_odf(
        ODG_MIME,
        &[
            ("content.xml", &drawing_content_xml(3)),
            ("styles.xml", &styles_xml("21cm", "29.7cm", "1cm")),
        ],
    );
    let document = open_document(bytes);
    assert_eq!(document.file_type(), FileType::OpendocumentGraphics);

    let tree = document.document().unwrap();
    assert_eq!(tree.document_type(), DocumentKind::Drawing);
    let pages: Vec<_> = tree.registry.children(tree.root).collect();
    assert_eq!(pages.len(), 3);
    for &page in &pages {
        assert_eq!(tree.registry.get(page).element_type, ElementType::Page);
        let layout = tree.page_layout(tree.master_page_of(page));
        assert_eq!(layout.width.as_ref().unwrap().to_string(), "21cm");
        assert_eq!(layout.height.as_ref().unwrap().to_string(), "29.7cm");
        assert_eq!(layout.margin.top.as_ref().unwrap().to_string(), "1cm");
    }
}

#[test]
fn spreadsheet_translates_to_sheet_tables() {
    let bytes = build_odf(
        ODS_MIME,
        &[(
            "content.xml",
            &spreadsheet_content_xml(&[
                ("Page 1", vec![vec!["Page 1"]]),
                ("Page 2", vec![vec!["Page 2"]]),
                ("Page 3", vec![vec!["Page 3"]]),
            ]),
        )],
    );
    let decoded = office2html::open_bytes(bytes).unwrap();
    assert_eq!(decoded.file_type(), FileType::OpendocumentSpreadsheet);

    let output = office2html::translate(&decoded, &HtmlOptions::default()).unwrap();
    assert_eq!(output.pages.len(), 3);
    for (index, page) in output.pages.iter().enumerate() {
        assert_eq!(page.name, format!("Page {}", index + 1));
        assert!(page.html.contains("<table"));
        assert!(page.html.contains(&format!("Page {}", index + 1)));
        assert!(page.html.contains("<th>A</th>"));
    }
}

#[test]
fn cursor_descend_and_return_is_identity() {
    let bytes = build_odf(
        ODT_MIME,
        &[(
            "content.xml",
            &text_content_xml(&["one", "two", "three"]),
        )],
    );
    let document = open_document(bytes);
    let tree = document.document().unwrap();

    let mut cursor = tree.cursor();
    let before = cursor.clone();
    assert!(cursor.move_to_first_child());
    assert!(cursor.move_to_parent());
    assert_eq!(cursor, before);
    assert_eq!(cursor.depth(), before.depth());
    assert_eq!(
        cursor.document_path().to_string(),
        before.document_path().to_string()
    );
}

#[test]
fn cursor_sibling_walk_tracks_paths() {
    let bytes = build_odf(
        ODT_MIME,
        &[(
            "content.xml",
            &text_content_xml(&["one", "two", "three"]),
        )],
    );
    let document = open_document(bytes);
    let tree = document.document().unwrap();

    let mut cursor = tree.cursor();
    assert!(cursor.move_to_first_child());
    assert_eq!(cursor.document_path().to_string(), "/child:0");
    assert!(cursor.move_to_next_sibling());
    assert!(cursor.move_to_next_sibling());
    assert_eq!(cursor.document_path().to_string(), "/child:2");
    assert!(!cursor.move_to_next_sibling());
    assert!(cursor.move_to_previous_sibling());
    assert_eq!(cursor.document_path().to_string(), "/child:1");

    // re-walking the recorded path lands on the same element
    let path = cursor.document_path().clone();
    let element = cursor.element();
    let mut fresh = tree.cursor();
    assert!(fresh.move_to(&path));
    assert_eq!(fresh.element(), element);
}

#[test]
fn legacy_word_container_detected() {
    use std::io::{Cursor, Write};
    let mut compound = cfb::CompoundFile::create(Cursor::new(Vec::new())).unwrap();
    compound
        .create_stream("WordDocument")
        .unwrap()
        .write_all(&[0u8; 128])
        .unwrap();
    compound.flush().unwrap();
    let bytes = compound.into_inner().into_inner();

    let document = open_document(bytes);
    assert_eq!(document.file_type(), FileType::LegacyWordDocument);
    // decoding is delegated, so the native tree is unavailable
    assert!(matches!(
        document.document(),
        Err(office2html::OpenError::UnsupportedOperation)
    ));
}

#[test]
fn docx_package_decodes_and_translates() {
    use std::io::{Cursor, Write};
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("word/document.xml", zip::write::SimpleFileOptions::default())
        .unwrap();
    writer
        .write_all(
            br#"<?xml version="1.0"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Hello from DOCX</w:t></w:r></w:p>
    <w:sectPr><w:pgSz w:w="11906" w:h="16838"/></w:sectPr>
  </w:body>
</w:document>"#,
        )
        .unwrap();
    let bytes = writer.finish().unwrap().into_inner();

    let document = open_document(bytes);
    assert_eq!(document.file_type(), FileType::OfficeOpenXmlDocument);
    let tree = document.document().unwrap();
    let first = tree.registry.children(tree.root).next().unwrap();
    assert_eq!(tree.element_text(first), "Hello from DOCX");

    let decoded = DecodedFile::Document(document);
    let output = office2html::translate(&decoded, &HtmlOptions::default()).unwrap();
    assert!(output.pages[0].html.contains("Hello from DOCX"));
}
