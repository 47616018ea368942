//! ZIP reading and writing on top of the `zip` crate.
//!
//! Reading keeps the central-directory order and hands out lazy per-entry
//! file handles; all handles of one archive share the seek state behind a
//! mutex, and each read holds the lock only for its own extraction.
//! Writing preserves insertion order, which matters for ODF where the
//! uncompressed `mimetype` entry must come first.

use std::io::{Cursor, Read, Write};
use std::sync::{Arc, Mutex};

use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::error::{OpenError, Result};
use crate::vfs::{File, FileLocation, FileSource, Path, SharedBytes};

use super::{Archive, ArchiveEntry, ArchiveEntryKind, CompressionMethod};

type SharedZip = Arc<Mutex<ZipArchive<Cursor<SharedBytes>>>>;

struct ZipEntrySource {
    archive: SharedZip,
    index: usize,
    size: u64,
}

impl FileSource for ZipEntrySource {
    fn location(&self) -> FileLocation {
        FileLocation::Memory
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn load(&self) -> Result<Vec<u8>> {
        let mut archive = self.archive.lock().map_err(|_| OpenError::NoZipFile)?;
        let mut entry = archive
            .by_index(self.index)
            .map_err(|_| OpenError::NoZipFile)?;
        let mut data = Vec::with_capacity(self.size as usize);
        entry.read_to_end(&mut data)?;
        Ok(data)
    }
}

/// Open a ZIP container. A stream that is not a ZIP is [`OpenError::NoZipFile`].
pub fn read_archive(file: &File) -> Result<Archive> {
    let bytes = file.bytes()?;
    let reader = Cursor::new(SharedBytes(bytes));
    let archive = ZipArchive::new(reader).map_err(|_| OpenError::NoZipFile)?;
    let shared: SharedZip = Arc::new(Mutex::new(archive));

    let count = shared.lock().map_err(|_| OpenError::NoZipFile)?.len();
    let mut entries = Vec::with_capacity(count);
    for index in 0..count {
        let (name, is_dir, size, method) = {
            let mut guard = shared.lock().map_err(|_| OpenError::NoZipFile)?;
            let entry = guard.by_index_raw(index).map_err(|_| OpenError::NoZipFile)?;
            (
                entry.name().to_string(),
                entry.is_dir(),
                entry.size(),
                entry.compression(),
            )
        };
        let path = Path::root()
            .join(&Path::new(&name)?)
            .map_err(|_| OpenError::NoZipFile)?;
        let method = match method {
            zip::CompressionMethod::Stored => CompressionMethod::Stored,
            _ => CompressionMethod::Deflated,
        };
        if is_dir {
            entries.push(ArchiveEntry {
                path,
                kind: ArchiveEntryKind::Directory,
                method,
                compression_level: None,
                file: None,
            });
        } else {
            let source = ZipEntrySource {
                archive: shared.clone(),
                index,
                size,
            };
            entries.push(ArchiveEntry {
                path,
                kind: ArchiveEntryKind::File,
                method,
                compression_level: None,
                file: Some(File::from_source(Arc::new(source))),
            });
        }
    }
    Ok(Archive::from_entries(entries))
}

/// Serialize an [`Archive`] in entry order.
pub fn write_archive(archive: &Archive) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for entry in archive.entries() {
        let name = entry.path.as_relative().to_string();
        match entry.kind {
            ArchiveEntryKind::Directory => {
                // directory names end with a slash in the container
                writer
                    .add_directory(format!("{name}/"), SimpleFileOptions::default())
                    .map_err(|e| OpenError::ZipSaveError(e.to_string()))?;
            }
            ArchiveEntryKind::File => {
                let method = match entry.method {
                    CompressionMethod::Stored => zip::CompressionMethod::Stored,
                    CompressionMethod::Deflated => zip::CompressionMethod::Deflated,
                };
                let options = SimpleFileOptions::default()
                    .compression_method(method)
                    .compression_level(entry.compression_level);
                writer
                    .start_file(name, options)
                    .map_err(|e| OpenError::ZipSaveError(e.to_string()))?;
                let file = entry.file.as_ref().ok_or(OpenError::NullPointer)?;
                let data = file.bytes()?;
                writer
                    .write_all(data.as_slice())
                    .map_err(|e| OpenError::ZipSaveError(e.to_string()))?;
            }
        }
    }
    let cursor = writer
        .finish()
        .map_err(|e| OpenError::ZipSaveError(e.to_string()))?;
    Ok(cursor.into_inner())
}
