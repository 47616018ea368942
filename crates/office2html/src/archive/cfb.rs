//! Compound File Binary reading on top of the `cfb` crate.
//!
//! The crate walks the directory's red-black tree for us; entries come out
//! in storage pre-order with streams in tree order inside each storage,
//! which is the order legacy Office consumers expect.

use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex};

use crate::error::{OpenError, Result};
use crate::vfs::{File, FileLocation, FileSource, Path, SharedBytes};

use super::{Archive, ArchiveEntry, ArchiveEntryKind, CompressionMethod};

type SharedCfb = Arc<Mutex<cfb::CompoundFile<Cursor<SharedBytes>>>>;

struct CfbStreamSource {
    compound: SharedCfb,
    path: String,
    size: u64,
}

impl FileSource for CfbStreamSource {
    fn location(&self) -> FileLocation {
        FileLocation::Memory
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn load(&self) -> Result<Vec<u8>> {
        let mut compound = self
            .compound
            .lock()
            .map_err(|_| OpenError::CfbFileCorrupted("poisoned lock".to_string()))?;
        let mut stream = compound
            .open_stream(&self.path)
            .map_err(|e| OpenError::CfbFileCorrupted(e.to_string()))?;
        let mut data = Vec::with_capacity(self.size as usize);
        stream.read_to_end(&mut data)?;
        Ok(data)
    }
}

/// Open a CFB container. A stream that is not a compound file is
/// [`OpenError::NoCfbFile`].
pub fn read_archive(file: &File) -> Result<Archive> {
    let bytes = file.bytes()?;
    let reader = Cursor::new(SharedBytes(bytes));
    let compound = cfb::CompoundFile::open(reader).map_err(|_| OpenError::NoCfbFile)?;

    let mut raw_entries = Vec::new();
    for entry in compound.walk() {
        if entry.is_root() {
            continue;
        }
        let logical = cfb_path_to_logical(entry.path())?;
        raw_entries.push((logical, entry.is_stream(), entry.len()));
    }

    let shared: SharedCfb = Arc::new(Mutex::new(compound));
    let mut entries = Vec::with_capacity(raw_entries.len());
    for (path, is_stream, size) in raw_entries {
        if is_stream {
            let source = CfbStreamSource {
                compound: shared.clone(),
                path: path.to_string(),
                size,
            };
            entries.push(ArchiveEntry {
                path,
                kind: ArchiveEntryKind::File,
                method: CompressionMethod::Stored,
                compression_level: None,
                file: Some(File::from_source(Arc::new(source))),
            });
        } else {
            entries.push(ArchiveEntry {
                path,
                kind: ArchiveEntryKind::Directory,
                method: CompressionMethod::Stored,
                compression_level: None,
                file: None,
            });
        }
    }
    Ok(Archive::from_entries(entries))
}

fn cfb_path_to_logical(path: &std::path::Path) -> Result<Path> {
    // CFB names are UCS-2 in the container; the cfb crate hands them to us
    // as decoded strings. Control characters (e.g. "\u{5}SummaryInformation")
    // are legal and preserved.
    let mut logical = Path::root();
    for component in path.components() {
        if let std::path::Component::Normal(name) = component {
            let name = name
                .to_str()
                .ok_or_else(|| OpenError::CfbFileCorrupted("non-unicode name".to_string()))?;
            logical = logical.join_segment(name)?;
        }
    }
    Ok(logical)
}
