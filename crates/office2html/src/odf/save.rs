//! Re-emit an ODF package after inline edits: `content.xml` is rewritten
//! from the (possibly modified) DOM, the manifest loses its encryption
//! records, and every other entry is copied byte for byte in its original
//! order and compression method.

use crate::archive::{Archive, ArchiveEntry};
use crate::archive::zip::write_archive;
use crate::doc::Document;
use crate::error::{OpenError, Result};
use crate::vfs::{File, Path};
use crate::xml::XmlDocument;

use super::OpenDocumentFile;

/// Serialize the edited package back to ZIP bytes.
pub fn save(file: &OpenDocumentFile, document: &Document) -> Result<Vec<u8>> {
    // a decrypted package lost its on-disk archive; re-encrypting is not
    // supported, so neither is saving it
    let archive = file.archive().ok_or(OpenError::UnsupportedOperation)?;

    let content_path = Path::new("/content.xml")?;
    let manifest_path = Path::new("/META-INF/manifest.xml")?;

    let mut entries = Vec::with_capacity(archive.len());
    for entry in archive.entries() {
        if entry.path == content_path {
            entries.push(ArchiveEntry {
                file: Some(File::from_bytes(document.xml.to_bytes())),
                ..entry.clone()
            });
        } else if entry.path == manifest_path {
            let original = entry.file.as_ref().ok_or(OpenError::NullPointer)?;
            let mut manifest = XmlDocument::parse(&original.bytes()?)?;
            manifest.strip_elements_named(manifest.root(), "manifest:encryption-data");
            entries.push(ArchiveEntry {
                file: Some(File::from_bytes(manifest.to_bytes())),
                ..entry.clone()
            });
        } else {
            entries.push(entry.clone());
        }
    }

    write_archive(&Archive::from_entries(entries))
}
