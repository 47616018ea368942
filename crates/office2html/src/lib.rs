//! Pure-Rust reading and HTML translation of office documents (ODF, OOXML,
//! legacy Office containers, plus PDF/text/image pass-throughs).
//!
//! # Quick start
//!
//! ```no_run
//! let decoded = office2html::open("report.odt").unwrap();
//! let output = office2html::translate(&decoded, &office2html::config::HtmlOptions::default()).unwrap();
//! office2html::html::write_output(std::path::Path::new("report-html"), &output, &decoded.meta()).unwrap();
//! ```
//!
//! # Encrypted files
//!
//! ```no_run
//! use office2html::DecodedFile;
//!
//! let mut decoded = office2html::open("pages.ods").unwrap();
//! if let DecodedFile::Document(document) = &mut decoded {
//!     if document.password_encrypted() {
//!         assert!(document.decrypt("pages").unwrap());
//!     }
//!     let tree = document.document().unwrap();
//!     println!("{:?}", tree.document_type());
//! }
//! ```

pub mod archive;
pub mod config;
pub mod crypto;
pub mod doc;
pub mod edit;
pub mod error;
pub mod html;
pub mod magic;
pub mod meta;
pub mod odf;
pub mod oldms;
pub mod ooxml;
pub mod open_strategy;
pub mod text;
pub mod vfs;
pub mod xml;

pub use config::{DecodePreference, FileCategory, FileType, HtmlOptions};
pub use error::{OpenError, Result};
pub use html::HtmlOutput;
pub use meta::{EncryptionState, FileMeta};
pub use open_strategy::{DecodedFile, DocumentFile};

use vfs::File;

/// Open a file from disk, probing its contents. The extension only refines
/// the text-family fallback.
pub fn open(path: impl AsRef<std::path::Path>) -> Result<DecodedFile> {
    let path = path.as_ref();
    let extension = path.extension().and_then(|e| e.to_str()).map(str::to_string);
    let file = File::from_disk(path)?;
    open_strategy::open_file(&file, extension.as_deref())
}

/// Open in-memory bytes, probing their contents.
pub fn open_bytes(data: Vec<u8>) -> Result<DecodedFile> {
    open_strategy::open_file(&File::from_bytes(data), None)
}

/// Open a file as an explicit type, skipping probing.
pub fn open_as(path: impl AsRef<std::path::Path>, file_type: FileType) -> Result<DecodedFile> {
    let file = File::from_disk(path.as_ref())?;
    open_strategy::open_file_as(&file, file_type)
}

/// Open with a decoder-engine preference.
///
/// Only the native engine lives in this crate; the PDF and legacy-Word
/// engines are external collaborators selected by the caller that hosts
/// them.
pub fn open_with_preference(
    path: impl AsRef<std::path::Path>,
    preference: DecodePreference,
) -> Result<DecodedFile> {
    match preference {
        DecodePreference::Native => open(path),
        other => Err(OpenError::UnsupportedDecoderEngine(other)),
    }
}

/// Translate any decoded file to HTML pages.
pub fn translate(decoded: &DecodedFile, options: &HtmlOptions) -> Result<HtmlOutput> {
    match decoded {
        DecodedFile::Text(text) => Ok(html::translate_text(text, options)),
        DecodedFile::Csv(csv) => Ok(html::translate_csv(csv, options)),
        DecodedFile::Json(json) => Ok(html::translate_json(json, options)),
        DecodedFile::Image(image) => html::translate_image(&image.file, image.file_type, options),
        DecodedFile::Document(document) => {
            let tree = document.document()?;
            let package = document.filesystem();
            html::translate_document(&tree, Some(package.as_ref()), options)
        }
        DecodedFile::Archive(archive) => Ok(translate_archive_listing(archive, options)),
        // page content is rendered by the delegated PDF engine
        DecodedFile::Pdf(_) => Ok(translate_delegated_stub("PDF", options)),
        DecodedFile::Unknown { .. } => Err(OpenError::UnknownFileType),
    }
}

/// Apply an edit diff to a document file and return the re-serialized
/// package bytes. Only ODF packages can be written back.
pub fn edit_and_save(decoded: &DecodedFile, diff: &edit::EditDiff) -> Result<Vec<u8>> {
    let DecodedFile::Document(DocumentFile::OpenDocument(odf)) = decoded else {
        return Err(OpenError::UnsupportedOperation);
    };
    let mut document = odf.document()?;
    edit::apply_edits(&mut document, diff)?;
    odf::save::save(odf, &document)
}

fn translate_archive_listing(
    archive: &open_strategy::ArchiveFile,
    options: &HtmlOptions,
) -> HtmlOutput {
    use html::writer::HtmlWriter;
    let mut writer = HtmlWriter::new(options.format_html, options.html_indent);
    writer.open("div", &[("class", "page".to_string())]);
    writer.open("ul", &[("class", "archive".to_string())]);
    for entry in archive.archive().entries() {
        writer.open_inline("li", &[]);
        writer.text(entry.path.as_str());
        if entry.is_directory() {
            writer.text("/");
        }
        writer.close();
    }
    writer.close();
    writer.close();
    HtmlOutput {
        pages: vec![html::HtmlPage {
            name: "archive".to_string(),
            html: writer.finish(),
        }],
        resources: Vec::new(),
    }
}

fn translate_delegated_stub(kind: &str, options: &HtmlOptions) -> HtmlOutput {
    use html::writer::HtmlWriter;
    let mut writer = HtmlWriter::new(options.format_html, options.html_indent);
    writer.open("div", &[("class", "page".to_string())]);
    writer.open("p", &[]);
    writer.text(&format!(
        "{kind} content is rendered by an external engine."
    ));
    writer.close();
    writer.close();
    HtmlOutput {
        pages: vec![html::HtmlPage {
            name: "page-1".to_string(),
            html: writer.finish(),
        }],
        resources: Vec::new(),
    }
}
