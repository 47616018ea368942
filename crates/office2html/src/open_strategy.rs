//! Layered open: classify by magic, then peel container layers until a
//! specific decoder claims the file. Probe misses fall through softly; the
//! first success wins.

use std::sync::Arc;

use tracing::debug;

use crate::archive::{Archive, ArchiveFilesystem};
use crate::config::{FileCategory, FileType};
use crate::doc::Document;
use crate::error::{OpenError, Result};
use crate::magic;
use crate::meta::{DocumentMeta, EncryptionState, FileMeta};
use crate::odf::OpenDocumentFile;
use crate::oldms::LegacyMicrosoftFile;
use crate::ooxml::OfficeOpenXmlFile;
use crate::text::{CsvFile, JsonFile, TextFile};
use crate::vfs::{File, Filesystem};
use crate::{archive, doc};

/// A generic archive (ZIP or CFB) that no document decoder claimed.
#[derive(Clone)]
pub struct ArchiveFile {
    pub file_type: FileType,
    filesystem: ArchiveFilesystem,
}

impl ArchiveFile {
    pub fn filesystem(&self) -> &ArchiveFilesystem {
        &self.filesystem
    }

    pub fn archive(&self) -> &Archive {
        self.filesystem.archive()
    }
}

/// A PDF handle; page rendering is delegated to an external engine.
#[derive(Clone)]
pub struct PdfFile {
    pub file: File,
}

/// An image classified by magic.
#[derive(Clone)]
pub struct ImageFile {
    pub file_type: FileType,
    pub file: File,
}

/// One of the document families, behind a uniform surface.
#[derive(Clone)]
pub enum DocumentFile {
    OpenDocument(OpenDocumentFile),
    OfficeOpenXml(OfficeOpenXmlFile),
    LegacyMicrosoft(LegacyMicrosoftFile),
}

impl DocumentFile {
    pub fn file_type(&self) -> FileType {
        match self {
            Self::OpenDocument(file) => file.file_type(),
            Self::OfficeOpenXml(file) => file.file_type(),
            Self::LegacyMicrosoft(file) => file.file_type(),
        }
    }

    pub fn document_type(&self) -> Option<doc::DocumentKind> {
        match self.file_type() {
            FileType::OpendocumentText | FileType::OfficeOpenXmlDocument => {
                Some(doc::DocumentKind::Text)
            }
            FileType::OpendocumentPresentation | FileType::OfficeOpenXmlPresentation => {
                Some(doc::DocumentKind::Presentation)
            }
            FileType::OpendocumentSpreadsheet | FileType::OfficeOpenXmlWorkbook => {
                Some(doc::DocumentKind::Spreadsheet)
            }
            FileType::OpendocumentGraphics => Some(doc::DocumentKind::Drawing),
            _ => None,
        }
    }

    pub fn password_encrypted(&self) -> bool {
        match self {
            Self::OpenDocument(file) => file.password_encrypted(),
            Self::OfficeOpenXml(file) => file.password_encrypted(),
            Self::LegacyMicrosoft(_) => false,
        }
    }

    pub fn encryption_state(&self) -> EncryptionState {
        match self {
            Self::OpenDocument(file) => file.encryption_state(),
            Self::OfficeOpenXml(file) => file.encryption_state(),
            Self::LegacyMicrosoft(file) => file.encryption_state(),
        }
    }

    /// Try a password. `Ok(false)` means it did not verify.
    pub fn decrypt(&mut self, password: &str) -> Result<bool> {
        match self {
            Self::OpenDocument(file) => file.decrypt(password),
            Self::OfficeOpenXml(file) => file.decrypt(password),
            Self::LegacyMicrosoft(file) => file.decrypt(password),
        }
    }

    /// Parse into the uniform document tree.
    pub fn document(&self) -> Result<Document> {
        match self {
            Self::OpenDocument(file) => file.document(),
            Self::OfficeOpenXml(file) => file.document(),
            // legacy formats decode through a delegated engine only
            Self::LegacyMicrosoft(_) => Err(OpenError::UnsupportedOperation),
        }
    }

    pub fn filesystem(&self) -> Arc<dyn Filesystem> {
        match self {
            Self::OpenDocument(file) => file.filesystem().clone(),
            Self::OfficeOpenXml(file) => file.filesystem().clone(),
            Self::LegacyMicrosoft(file) => file.filesystem().clone(),
        }
    }
}

/// Everything an open call can produce.
#[derive(Clone)]
pub enum DecodedFile {
    Text(TextFile),
    Csv(CsvFile),
    Json(JsonFile),
    Image(ImageFile),
    Archive(ArchiveFile),
    Document(DocumentFile),
    Pdf(PdfFile),
    Unknown { file: File, file_type: FileType },
}

impl DecodedFile {
    pub fn file_type(&self) -> FileType {
        match self {
            Self::Text(text) => text.file_type,
            Self::Csv(_) => FileType::CommaSeparatedValues,
            Self::Json(_) => FileType::JavascriptObjectNotation,
            Self::Image(image) => image.file_type,
            Self::Archive(archive) => archive.file_type,
            Self::Document(document) => document.file_type(),
            Self::Pdf(_) => FileType::PortableDocumentFormat,
            Self::Unknown { file_type, .. } => *file_type,
        }
    }

    pub fn file_category(&self) -> FileCategory {
        self.file_type().category()
    }

    /// The file-level metadata written to `meta.json`.
    pub fn meta(&self) -> FileMeta {
        let mut meta = FileMeta::new(self.file_type());
        if let Self::Document(document) = self {
            meta.password_encrypted = document.password_encrypted();
            let mut document_meta = match document {
                DocumentFile::OpenDocument(file) => file.document_meta(),
                _ => DocumentMeta::default(),
            };
            document_meta.document_type = document.document_type();
            if document.encryption_state() != EncryptionState::Encrypted {
                if let Ok(parsed) = document.document() {
                    document_meta.entry_count =
                        Some(parsed.registry.children(parsed.root).count() as u32);
                }
            }
            meta.document_meta = Some(document_meta);
        }
        meta
    }
}

fn open_zip(file: &File) -> Result<DecodedFile> {
    let archive = archive::zip::read_archive(file)?;

    match OpenDocumentFile::open_archive(archive.clone()) {
        Ok(odf) => return Ok(DecodedFile::Document(DocumentFile::OpenDocument(odf))),
        Err(error) => debug!(%error, "not an OpenDocument package"),
    }

    let filesystem: Arc<dyn Filesystem> = Arc::new(archive.clone().filesystem());
    match OfficeOpenXmlFile::open(filesystem) {
        Ok(ooxml) => return Ok(DecodedFile::Document(DocumentFile::OfficeOpenXml(ooxml))),
        Err(error) => debug!(%error, "not an OOXML package"),
    }

    Ok(DecodedFile::Archive(ArchiveFile {
        file_type: FileType::Zip,
        filesystem: archive.filesystem(),
    }))
}

fn open_cfb(file: &File) -> Result<DecodedFile> {
    let archive = archive::cfb::read_archive(file)?;
    let filesystem: Arc<dyn Filesystem> = Arc::new(archive.clone().filesystem());

    match LegacyMicrosoftFile::open(filesystem.clone()) {
        Ok(legacy) => return Ok(DecodedFile::Document(DocumentFile::LegacyMicrosoft(legacy))),
        Err(error) => debug!(%error, "not a legacy Microsoft document"),
    }

    // OOXML Standard encryption wraps the package in a CFB envelope
    match OfficeOpenXmlFile::open(filesystem) {
        Ok(ooxml) => return Ok(DecodedFile::Document(DocumentFile::OfficeOpenXml(ooxml))),
        Err(error) => debug!(%error, "not an encrypted OOXML envelope"),
    }

    Ok(DecodedFile::Archive(ArchiveFile {
        file_type: FileType::CompoundFileBinaryFormat,
        filesystem: archive.filesystem(),
    }))
}

fn open_text(file: &File, extension: Option<&str>) -> Result<DecodedFile> {
    let hinted = extension.map(FileType::from_extension);
    match hinted {
        Some(FileType::CommaSeparatedValues) => {
            return Ok(DecodedFile::Csv(CsvFile::open(file)?));
        }
        Some(FileType::JavascriptObjectNotation) => {
            return Ok(DecodedFile::Json(JsonFile::open(file)?));
        }
        Some(FileType::Markdown) => {
            return Ok(DecodedFile::Text(TextFile::open(file, FileType::Markdown)?));
        }
        _ => {}
    }
    Ok(DecodedFile::Text(TextFile::open(file, FileType::TextFile)?))
}

/// Open a file by probing container layers, preferring specificity.
///
/// `extension` refines the text-family fallback (`csv`, `json`, `md`).
pub fn open_file(file: &File, extension: Option<&str>) -> Result<DecodedFile> {
    match magic::file_type_of(file)? {
        FileType::Zip => open_zip(file),
        FileType::CompoundFileBinaryFormat => open_cfb(file),
        FileType::PortableDocumentFormat => Ok(DecodedFile::Pdf(PdfFile { file: file.clone() })),
        image_type @ (FileType::PortableNetworkGraphics
        | FileType::GraphicsInterchangeFormat
        | FileType::Jpeg
        | FileType::BitmapImageFile
        | FileType::StarviewMetafile) => Ok(DecodedFile::Image(ImageFile {
            file_type: image_type,
            file: file.clone(),
        })),
        known @ (FileType::RichTextFormat | FileType::WordPerfect) => Ok(DecodedFile::Unknown {
            file: file.clone(),
            file_type: known,
        }),
        _ => match open_text(file, extension) {
            Ok(decoded) => Ok(decoded),
            Err(_) => Ok(DecodedFile::Unknown {
                file: file.clone(),
                file_type: FileType::Unknown,
            }),
        },
    }
}

/// Open with an explicit type, skipping the probe chain.
pub fn open_file_as(file: &File, file_type: FileType) -> Result<DecodedFile> {
    match file_type {
        FileType::Zip => {
            let archive = archive::zip::read_archive(file)?;
            Ok(DecodedFile::Archive(ArchiveFile {
                file_type: FileType::Zip,
                filesystem: archive.filesystem(),
            }))
        }
        FileType::CompoundFileBinaryFormat => {
            let archive = archive::cfb::read_archive(file)?;
            Ok(DecodedFile::Archive(ArchiveFile {
                file_type: FileType::CompoundFileBinaryFormat,
                filesystem: archive.filesystem(),
            }))
        }
        FileType::OpendocumentText
        | FileType::OpendocumentPresentation
        | FileType::OpendocumentSpreadsheet
        | FileType::OpendocumentGraphics => {
            let archive = archive::zip::read_archive(file)?;
            let odf = OpenDocumentFile::open_archive(archive)?;
            Ok(DecodedFile::Document(DocumentFile::OpenDocument(odf)))
        }
        FileType::OfficeOpenXmlDocument
        | FileType::OfficeOpenXmlPresentation
        | FileType::OfficeOpenXmlWorkbook => {
            let archive = archive::zip::read_archive(file)?;
            let filesystem: Arc<dyn Filesystem> = Arc::new(archive.filesystem());
            let ooxml = OfficeOpenXmlFile::open(filesystem)?;
            Ok(DecodedFile::Document(DocumentFile::OfficeOpenXml(ooxml)))
        }
        FileType::OfficeOpenXmlEncrypted => {
            let archive = archive::cfb::read_archive(file)?;
            let filesystem: Arc<dyn Filesystem> = Arc::new(archive.filesystem());
            let ooxml = OfficeOpenXmlFile::open(filesystem)?;
            Ok(DecodedFile::Document(DocumentFile::OfficeOpenXml(ooxml)))
        }
        FileType::LegacyWordDocument
        | FileType::LegacyPowerpointPresentation
        | FileType::LegacyExcelWorksheets => {
            let archive = archive::cfb::read_archive(file)?;
            let filesystem: Arc<dyn Filesystem> = Arc::new(archive.filesystem());
            let legacy = LegacyMicrosoftFile::open(filesystem)?;
            Ok(DecodedFile::Document(DocumentFile::LegacyMicrosoft(legacy)))
        }
        FileType::PortableDocumentFormat => {
            Ok(DecodedFile::Pdf(PdfFile { file: file.clone() }))
        }
        FileType::PortableNetworkGraphics
        | FileType::GraphicsInterchangeFormat
        | FileType::Jpeg
        | FileType::BitmapImageFile
        | FileType::StarviewMetafile => Ok(DecodedFile::Image(ImageFile {
            file_type,
            file: file.clone(),
        })),
        FileType::TextFile | FileType::Markdown => {
            Ok(DecodedFile::Text(TextFile::open(file, file_type)?))
        }
        FileType::CommaSeparatedValues => Ok(DecodedFile::Csv(CsvFile::open(file)?)),
        FileType::JavascriptObjectNotation => Ok(DecodedFile::Json(JsonFile::open(file)?)),
        FileType::Unknown | FileType::RichTextFormat | FileType::WordPerfect => {
            Err(OpenError::UnsupportedFileType(file_type))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{ArchiveEntry, ArchiveEntryKind, CompressionMethod};
    use crate::vfs::Path;

    fn zip_bytes(entries: &[(&str, &[u8], CompressionMethod)]) -> Vec<u8> {
        let entries = entries
            .iter()
            .map(|(path, data, method)| ArchiveEntry {
                path: Path::new(path).unwrap(),
                kind: ArchiveEntryKind::File,
                method: *method,
                compression_level: None,
                file: Some(File::from_bytes(data.to_vec())),
            })
            .collect();
        archive::zip::write_archive(&Archive::from_entries(entries)).unwrap()
    }

    #[test]
    fn test_odf_wins_over_plain_zip() {
        let bytes = zip_bytes(&[
            (
                "/mimetype",
                b"application/vnd.oasis.opendocument.text",
                CompressionMethod::Stored,
            ),
            (
                "/content.xml",
                br#"<office:document-content><office:body><office:text/></office:body></office:document-content>"#,
                CompressionMethod::Deflated,
            ),
        ]);
        let decoded = open_file(&File::from_bytes(bytes), None).unwrap();
        assert_eq!(decoded.file_type(), FileType::OpendocumentText);
        assert!(matches!(decoded, DecodedFile::Document(_)));
    }

    #[test]
    fn test_ooxml_after_odf_probe() {
        let bytes = zip_bytes(&[(
            "/word/document.xml",
            br#"<w:document><w:body/></w:document>"#,
            CompressionMethod::Deflated,
        )]);
        let decoded = open_file(&File::from_bytes(bytes), None).unwrap();
        assert_eq!(decoded.file_type(), FileType::OfficeOpenXmlDocument);
    }

    #[test]
    fn test_plain_zip_falls_back_to_archive() {
        let bytes = zip_bytes(&[("/readme.txt", b"hello", CompressionMethod::Deflated)]);
        let decoded = open_file(&File::from_bytes(bytes), None).unwrap();
        assert_eq!(decoded.file_type(), FileType::Zip);
        assert_eq!(decoded.file_category(), FileCategory::Archive);
    }

    #[test]
    fn test_pdf_and_image_short_circuit() {
        let decoded = open_file(&File::from_bytes(b"%PDF-1.4 ...".to_vec()), None).unwrap();
        assert!(matches!(decoded, DecodedFile::Pdf(_)));

        let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        let decoded = open_file(&File::from_bytes(png.to_vec()), None).unwrap();
        assert_eq!(decoded.file_type(), FileType::PortableNetworkGraphics);
    }

    #[test]
    fn test_text_fallback_with_extension_hints() {
        let decoded = open_file(&File::from_bytes(b"a,b\n1,2\n".to_vec()), Some("csv")).unwrap();
        assert!(matches!(decoded, DecodedFile::Csv(_)));

        let decoded = open_file(&File::from_bytes(b"{\"k\":1}".to_vec()), Some("json")).unwrap();
        assert!(matches!(decoded, DecodedFile::Json(_)));

        let decoded = open_file(&File::from_bytes(b"plain".to_vec()), None).unwrap();
        assert_eq!(decoded.file_type(), FileType::TextFile);
    }

    #[test]
    fn test_binary_garbage_is_unknown() {
        let decoded = open_file(&File::from_bytes(vec![0x00, 0xFF, 0xFE, 0x01]), None).unwrap();
        assert_eq!(decoded.file_type(), FileType::Unknown);
    }

    #[test]
    fn test_open_as_skips_probing() {
        let bytes = zip_bytes(&[("/anything.txt", b"x", CompressionMethod::Deflated)]);
        let decoded = open_file_as(&File::from_bytes(bytes), FileType::Zip).unwrap();
        assert!(matches!(decoded, DecodedFile::Archive(_)));

        assert!(matches!(
            open_file_as(&File::from_bytes(b"x".to_vec()), FileType::RichTextFormat),
            Err(OpenError::UnsupportedFileType(_))
        ));
    }
}
