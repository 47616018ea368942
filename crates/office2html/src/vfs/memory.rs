use std::collections::{BTreeMap, BTreeSet};

use crate::error::{OpenError, Result};

use super::{File, FileWalker, Filesystem, Path, WalkEntry};

/// An in-memory filesystem mapping absolute paths to file handles.
///
/// Directories exist implicitly wherever a descendant file exists, or
/// explicitly once `create_directory` marked them. Decrypted archives are
/// materialized as one of these.
#[derive(Default, Clone)]
pub struct MemoryFilesystem {
    files: BTreeMap<Path, File>,
    directories: BTreeSet<Path>,
}

impl MemoryFilesystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterate files in path order.
    pub fn files(&self) -> impl Iterator<Item = (&Path, &File)> {
        self.files.iter()
    }

    fn normalize(path: &Path) -> Result<Path> {
        path.as_absolute()
    }

    fn has_descendant(&self, path: &Path) -> bool {
        self.files.keys().any(|p| p != path && p.starts_with(path))
            || self
                .directories
                .iter()
                .any(|p| p != path && p.starts_with(path))
    }
}

impl Filesystem for MemoryFilesystem {
    fn exists(&self, path: &Path) -> bool {
        self.is_file(path) || self.is_directory(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        Self::normalize(path)
            .map(|p| self.files.contains_key(&p))
            .unwrap_or(false)
    }

    fn is_directory(&self, path: &Path) -> bool {
        let Ok(path) = Self::normalize(path) else {
            return false;
        };
        path.is_root() || self.directories.contains(&path) || self.has_descendant(&path)
    }

    fn open(&self, path: &Path) -> Result<File> {
        let path = Self::normalize(path)?;
        self.files.get(&path).cloned().ok_or(OpenError::FileNotFound)
    }

    fn file_walker(&self, path: &Path) -> Result<FileWalker> {
        let root = Self::normalize(path)?;
        if !self.is_directory(&root) {
            return Err(OpenError::FileNotFound);
        }
        let mut entries = Vec::new();
        let mut seen_dirs = BTreeSet::new();
        let all_paths = self
            .files
            .keys()
            .map(|p| (p.clone(), true))
            .chain(self.directories.iter().map(|p| (p.clone(), false)));
        for (file_path, is_file) in all_paths {
            if !file_path.starts_with(&root) || file_path == root {
                continue;
            }
            // emit the intermediate directories the first time they appear
            let tail = file_path.rebase(&root)?;
            let mut dir = root.clone();
            let segments: Vec<&str> = tail.as_str().split('/').collect();
            for segment in &segments[..segments.len() - 1] {
                dir = dir.join_segment(segment)?;
                if seen_dirs.insert(dir.clone()) {
                    entries.push(WalkEntry {
                        depth: dir.depth() - root.depth(),
                        path: dir.clone(),
                        is_file: false,
                    });
                }
            }
            if is_file {
                entries.push(WalkEntry {
                    depth: file_path.depth() - root.depth(),
                    path: file_path,
                    is_file: true,
                });
            } else if seen_dirs.insert(file_path.clone()) {
                entries.push(WalkEntry {
                    depth: file_path.depth() - root.depth(),
                    path: file_path,
                    is_file: false,
                });
            }
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(FileWalker::from_entries(entries))
    }

    fn create_file(&mut self, path: &Path, file: File) -> Result<()> {
        let path = Self::normalize(path)?;
        if path.is_root() {
            return Err(OpenError::InvalidPath("cannot create /".to_string()));
        }
        self.files.insert(path, file);
        Ok(())
    }

    fn create_directory(&mut self, path: &Path) -> Result<()> {
        let path = Self::normalize(path)?;
        self.directories.insert(path);
        Ok(())
    }

    fn remove(&mut self, path: &Path) -> Result<()> {
        let path = Self::normalize(path)?;
        let removed_file = self.files.remove(&path).is_some();
        let removed_dir = self.directories.remove(&path);
        if removed_dir || self.has_descendant(&path) {
            self.files.retain(|p, _| !p.starts_with(&path));
            self.directories.retain(|p| !p.starts_with(&path));
            return Ok(());
        }
        if removed_file { Ok(()) } else { Err(OpenError::FileNotFound) }
    }

    fn copy(&mut self, from: &Path, to: &Path) -> Result<()> {
        let file = self.open(from)?;
        self.create_file(to, file)
    }

    fn rename(&mut self, from: &Path, to: &Path) -> Result<()> {
        let file = self.open(from)?;
        self.create_file(to, file)?;
        self.files.remove(&Self::normalize(from)?);
        Ok(())
    }
}
