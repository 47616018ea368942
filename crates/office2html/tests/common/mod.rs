//! Shared fixture builders: minimal but well-formed packages assembled in
//! memory with `zip` and raw XML, so tests run without binary fixtures.
#![allow(dead_code)]

use std::io::{Cursor, Write};

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub const ODT_MIME: &str = "application/vnd.oasis.opendocument.text";
pub const ODS_MIME: &str = "application/vnd.oasis.opendocument.spreadsheet";
pub const ODG_MIME: &str = "application/vnd.oasis.opendocument.graphics";

/// Build an ODF package: the stored `mimetype` entry first, then the given
/// entries.
pub fn build_odf(mime: &str, entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file(
            "mimetype",
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored),
        )
        .unwrap();
    writer.write_all(mime.as_bytes()).unwrap();
    for (name, content) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// `styles.xml` with one master page and an A4-portrait page layout.
pub fn styles_xml(width: &str, height: &str, margin: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-styles xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0">
  <office:styles>
    <style:default-style style:family="paragraph">
      <style:text-properties style:font-name="Liberation Serif" fo:font-size="12pt"/>
    </style:default-style>
  </office:styles>
  <office:automatic-styles>
    <style:page-layout style:name="pm1">
      <style:page-layout-properties fo:page-width="{width}" fo:page-height="{height}"
        style:print-orientation="portrait" fo:margin="{margin}"/>
    </style:page-layout>
  </office:automatic-styles>
  <office:master-styles>
    <style:master-page style:name="Standard" style:page-layout-name="pm1"/>
  </office:master-styles>
</office:document-styles>"#
    )
}

/// A text-document `content.xml` with the given paragraph bodies.
pub fn text_content_xml(paragraphs: &[&str]) -> String {
    let body: String = paragraphs
        .iter()
        .map(|text| format!("<text:p><text:span>{text}</text:span></text:p>"))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0">
  <office:body>
    <office:text>{body}</office:text>
  </office:body>
</office:document-content>"#
    )
}

/// A spreadsheet `content.xml` with one sheet per `(name, rows)` where
/// each row is a list of cell texts.
pub fn spreadsheet_content_xml(sheets: &[(&str, Vec<Vec<&str>>)]) -> String {
    let mut tables = String::new();
    for (name, rows) in sheets {
        tables.push_str(&format!(r#"<table:table table:name="{name}">"#));
        tables.push_str("<table:table-column/>");
        for row in rows {
            tables.push_str("<table:table-row>");
            for cell in row {
                tables.push_str(&format!(
                    "<table:table-cell><text:p>{cell}</text:p></table:table-cell>"
                ));
            }
            tables.push_str("</table:table-row>");
        }
        tables.push_str("</table:table>");
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0">
  <office:body>
    <office:spreadsheet>{tables}</office:spreadsheet>
  </office:body>
</office:document-content>"#
    )
}

/// A drawing `content.xml` with the given number of pages.
pub fn drawing_content_xml(pages: u32) -> String {
    let body: String = (0..pages)
        .map(|index| {
            format!(
                r#"<draw:page draw:name="page{index}" draw:master-page-name="Standard"><draw:rect svg:x="1cm" svg:y="1cm" svg:width="4cm" svg:height="2cm"/></draw:page>"#
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0">
  <office:body>
    <office:drawing>{body}</office:drawing>
  </office:body>
</office:document-content>"#
    )
}
