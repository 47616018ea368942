//! Container codecs. An [`Archive`] is an ordered list of entries read from
//! a ZIP or CFB container; [`ArchiveFilesystem`] exposes it through the
//! read side of the [`Filesystem`] trait.

pub mod cfb;
pub mod zip;

use std::sync::Arc;

use crate::error::{OpenError, Result};
use crate::vfs::{File, FileWalker, Filesystem, Path, WalkEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveEntryKind {
    File,
    Directory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflated,
}

/// One entry of a container, in on-disk order.
#[derive(Clone)]
pub struct ArchiveEntry {
    pub path: Path,
    pub kind: ArchiveEntryKind,
    pub method: CompressionMethod,
    /// Deflate level to use when the entry is re-serialized.
    pub compression_level: Option<i64>,
    pub file: Option<File>,
}

impl ArchiveEntry {
    pub fn is_file(&self) -> bool {
        self.kind == ArchiveEntryKind::File
    }

    pub fn is_directory(&self) -> bool {
        self.kind == ArchiveEntryKind::Directory
    }
}

/// An ordered, read-only view of a container's entries.
#[derive(Clone, Default)]
pub struct Archive {
    entries: Vec<ArchiveEntry>,
}

impl Archive {
    pub fn from_entries(entries: Vec<ArchiveEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in container order.
    pub fn entries(&self) -> impl Iterator<Item = &ArchiveEntry> {
        self.entries.iter()
    }

    pub fn find(&self, path: &Path) -> Option<&ArchiveEntry> {
        self.entries.iter().find(|entry| &entry.path == path)
    }

    pub fn filesystem(self) -> ArchiveFilesystem {
        ArchiveFilesystem {
            archive: Arc::new(self),
        }
    }
}

/// Read-only filesystem over an [`Archive`].
///
/// `file_walker` yields entries in container order; directories that exist
/// only implicitly (no entry of their own) are still reported by
/// `is_directory`.
#[derive(Clone)]
pub struct ArchiveFilesystem {
    archive: Arc<Archive>,
}

impl ArchiveFilesystem {
    pub fn archive(&self) -> &Archive {
        &self.archive
    }
}

impl Filesystem for ArchiveFilesystem {
    fn exists(&self, path: &Path) -> bool {
        self.is_file(path) || self.is_directory(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        let Ok(path) = path.as_absolute() else {
            return false;
        };
        self.archive
            .find(&path)
            .map(ArchiveEntry::is_file)
            .unwrap_or(false)
    }

    fn is_directory(&self, path: &Path) -> bool {
        let Ok(path) = path.as_absolute() else {
            return false;
        };
        if path.is_root() {
            return true;
        }
        self.archive.entries().any(|entry| {
            (entry.is_directory() && entry.path == path)
                || (entry.path != path && entry.path.starts_with(&path))
        })
    }

    fn open(&self, path: &Path) -> Result<File> {
        let path = path.as_absolute()?;
        self.archive
            .find(&path)
            .and_then(|entry| entry.file.clone())
            .ok_or(OpenError::FileNotFound)
    }

    fn file_walker(&self, path: &Path) -> Result<FileWalker> {
        let root = path.as_absolute()?;
        if !self.is_directory(&root) {
            return Err(OpenError::FileNotFound);
        }
        let entries = self
            .archive
            .entries()
            .filter(|entry| entry.path != root && entry.path.starts_with(&root))
            .map(|entry| WalkEntry {
                depth: entry.path.depth() - root.depth(),
                path: entry.path.clone(),
                is_file: entry.is_file(),
            })
            .collect();
        Ok(FileWalker::from_entries(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> Path {
        Path::new(s).unwrap()
    }

    fn file_entry(path: &str, data: &[u8]) -> ArchiveEntry {
        ArchiveEntry {
            path: p(path),
            kind: ArchiveEntryKind::File,
            method: CompressionMethod::Deflated,
            compression_level: None,
            file: Some(File::from_bytes(data.to_vec())),
        }
    }

    fn sample() -> Archive {
        Archive::from_entries(vec![
            file_entry("/mimetype", b"application/vnd.oasis.opendocument.text"),
            file_entry("/content.xml", b"<a/>"),
            file_entry("/META-INF/manifest.xml", b"<m/>"),
        ])
    }

    #[test]
    fn test_find_and_order() {
        let archive = sample();
        assert!(archive.find(&p("/content.xml")).is_some());
        let order: Vec<String> = archive.entries().map(|e| e.path.to_string()).collect();
        assert_eq!(order, ["/mimetype", "/content.xml", "/META-INF/manifest.xml"]);
    }

    #[test]
    fn test_filesystem_view() {
        let fs = sample().filesystem();
        assert!(fs.is_file(&p("/mimetype")));
        assert!(fs.is_directory(&p("/META-INF")));
        assert!(fs.is_directory(&p("/")));
        assert!(!fs.exists(&p("/styles.xml")));
        assert_eq!(
            fs.open(&p("/content.xml")).unwrap().bytes().unwrap().as_slice(),
            b"<a/>"
        );
    }

    #[test]
    fn test_walker_preserves_container_order() {
        let fs = sample().filesystem();
        let mut walker = fs.file_walker(&p("/")).unwrap();
        let mut order = vec![walker.path().unwrap().to_string()];
        while walker.next() {
            order.push(walker.path().unwrap().to_string());
        }
        assert_eq!(order, ["/mimetype", "/content.xml", "/META-INF/manifest.xml"]);
    }
}
