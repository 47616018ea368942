//! OpenDocument package handling: type detection from the `mimetype`
//! entry, manifest-driven decryption, document parsing, and the edit/save
//! round trip.

pub mod decrypt;
pub mod manifest;
pub mod parser;
pub mod save;
pub mod spreadsheet;
pub mod styles;

use std::sync::Arc;

use crate::archive::Archive;
use crate::config::FileType;
use crate::doc::Document;
use crate::error::{OpenError, Result};
use crate::meta::{DocumentMeta, EncryptionState};
use crate::vfs::{Filesystem, Path};
use crate::xml::XmlDocument;

use manifest::Manifest;

/// An ODF package opened from an archive.
#[derive(Clone)]
pub struct OpenDocumentFile {
    /// The archive as read from disk, kept for byte-exact re-serialization.
    archive: Option<Arc<Archive>>,
    filesystem: Arc<dyn Filesystem>,
    file_type: FileType,
    manifest: Manifest,
    encryption_state: EncryptionState,
}

fn file_type_from_mime(mime: &str) -> Option<FileType> {
    match mime.trim() {
        "application/vnd.oasis.opendocument.text" | "application/vnd.sun.xml.writer" => {
            Some(FileType::OpendocumentText)
        }
        "application/vnd.oasis.opendocument.presentation"
        | "application/vnd.sun.xml.impress" => Some(FileType::OpendocumentPresentation),
        "application/vnd.oasis.opendocument.spreadsheet" | "application/vnd.sun.xml.calc" => {
            Some(FileType::OpendocumentSpreadsheet)
        }
        "application/vnd.oasis.opendocument.graphics" | "application/vnd.sun.xml.draw" => {
            Some(FileType::OpendocumentGraphics)
        }
        _ => None,
    }
}

impl OpenDocumentFile {
    /// Open from an archive, keeping the entry list for saving.
    pub fn open_archive(archive: Archive) -> Result<Self> {
        let archive = Arc::new(archive);
        let filesystem: Arc<dyn Filesystem> = Arc::new(archive.as_ref().clone().filesystem());
        let mut result = Self::open(filesystem)?;
        result.archive = Some(archive);
        Ok(result)
    }

    /// Open from any filesystem exposing the package contract.
    pub fn open(filesystem: Arc<dyn Filesystem>) -> Result<Self> {
        let mime_path = Path::new("/mimetype")?;
        let content_path = Path::new("/content.xml")?;
        let manifest_path = Path::new("/META-INF/manifest.xml")?;

        let file_type = match filesystem.open(&mime_path) {
            Ok(file) => {
                let bytes = file.bytes()?;
                let mime = std::str::from_utf8(&bytes).map_err(|_| OpenError::NoOpenDocumentFile)?;
                file_type_from_mime(mime).ok_or(OpenError::NoOpenDocumentFile)?
            }
            Err(_) => {
                // legacy packages may omit the mimetype entry
                if !filesystem.is_file(&content_path) {
                    return Err(OpenError::NoOpenDocumentFile);
                }
                FileType::OpendocumentText
            }
        };

        let manifest = match filesystem.open(&manifest_path) {
            Ok(file) => manifest::parse_manifest(&XmlDocument::parse(&file.bytes()?)?)?,
            Err(_) => Manifest::default(),
        };
        let encryption_state = if manifest.encrypted {
            EncryptionState::Encrypted
        } else {
            EncryptionState::NotEncrypted
        };

        Ok(Self {
            archive: None,
            filesystem,
            file_type,
            manifest,
            encryption_state,
        })
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    pub fn password_encrypted(&self) -> bool {
        self.manifest.encrypted
    }

    pub fn encryption_state(&self) -> EncryptionState {
        self.encryption_state
    }

    pub fn filesystem(&self) -> &Arc<dyn Filesystem> {
        &self.filesystem
    }

    /// The archive the package was opened from, when it still exists in
    /// its on-disk form (a decrypted package no longer does).
    pub fn archive(&self) -> Option<&Arc<Archive>> {
        self.archive.as_ref()
    }

    /// Try a password. `Ok(false)` means it did not verify; on success the
    /// package filesystem is replaced by the decrypted contents.
    pub fn decrypt(&mut self, password: &str) -> Result<bool> {
        if self.encryption_state != EncryptionState::Encrypted {
            return Err(OpenError::NotEncrypted);
        }
        match decrypt::decrypt_filesystem(self.filesystem.as_ref(), &self.manifest, password)? {
            Some(decrypted) => {
                self.filesystem = Arc::new(decrypted);
                self.archive = None;
                self.encryption_state = EncryptionState::Decrypted;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Parse the package into a document tree.
    pub fn document(&self) -> Result<Document> {
        if self.encryption_state == EncryptionState::Encrypted {
            return Err(OpenError::FileEncrypted);
        }
        parser::parse_document(self.filesystem.as_ref())
    }

    /// Creator and date facts from `meta.xml`, when present and readable.
    pub fn document_meta(&self) -> DocumentMeta {
        let mut meta = DocumentMeta::default();
        let Ok(path) = Path::new("/meta.xml") else {
            return meta;
        };
        let Ok(file) = self.filesystem.open(&path) else {
            return meta;
        };
        let Ok(bytes) = file.bytes() else {
            return meta;
        };
        let Ok(xml) = XmlDocument::parse(&bytes) else {
            return meta;
        };
        if let Some(office_meta) = xml.find(xml.root(), "office:meta") {
            meta.creator = xml
                .first_child_by_name(office_meta, "meta:initial-creator")
                .or_else(|| xml.first_child_by_name(office_meta, "dc:creator"))
                .map(|node| xml.text_content(node));
            meta.creation_date = xml
                .first_child_by_name(office_meta, "meta:creation-date")
                .map(|node| xml.text_content(node));
        }
        meta
    }
}
