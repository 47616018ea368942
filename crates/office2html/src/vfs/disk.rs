use std::path::PathBuf;

use crate::error::{OpenError, Result};

use super::{File, FileWalker, Filesystem, Path, WalkEntry};

/// A filesystem rooted at a host directory.
///
/// Every logical path is resolved as `root + path`, so callers cannot reach
/// outside the configured root with absolute logical paths. Walks are
/// emitted in lexicographic order for determinism.
pub struct DiskFilesystem {
    root: PathBuf,
}

impl DiskFilesystem {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn translate(&self, path: &Path) -> Result<PathBuf> {
        let relative = path.as_relative();
        if relative.is_escaping() {
            return Err(OpenError::InvalidPath(format!(
                "path escapes the filesystem root: {path}"
            )));
        }
        let mut host = self.root.clone();
        if !relative.is_root() {
            host.push(relative.as_str());
        }
        Ok(host)
    }

    fn collect(
        &self,
        host: &std::path::Path,
        logical: &Path,
        depth: u32,
        entries: &mut Vec<WalkEntry>,
    ) -> Result<()> {
        let mut children: Vec<_> = std::fs::read_dir(host)?
            .collect::<std::io::Result<Vec<_>>>()?
            .into_iter()
            .map(|e| e.path())
            .collect();
        children.sort();
        for child in children {
            let Some(name) = child.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let child_logical = logical.join_segment(name)?;
            if child.is_dir() {
                entries.push(WalkEntry {
                    path: child_logical.clone(),
                    is_file: false,
                    depth: depth + 1,
                });
                self.collect(&child, &child_logical, depth + 1, entries)?;
            } else if child.is_file() {
                entries.push(WalkEntry {
                    path: child_logical,
                    is_file: true,
                    depth: depth + 1,
                });
            }
        }
        Ok(())
    }
}

impl Filesystem for DiskFilesystem {
    fn exists(&self, path: &Path) -> bool {
        self.translate(path).map(|p| p.exists()).unwrap_or(false)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.translate(path).map(|p| p.is_file()).unwrap_or(false)
    }

    fn is_directory(&self, path: &Path) -> bool {
        self.translate(path).map(|p| p.is_dir()).unwrap_or(false)
    }

    fn open(&self, path: &Path) -> Result<File> {
        File::from_disk(self.translate(path)?)
    }

    fn file_walker(&self, path: &Path) -> Result<FileWalker> {
        let host = self.translate(path)?;
        if !host.is_dir() {
            return Err(OpenError::FileNotFound);
        }
        let mut entries = Vec::new();
        self.collect(&host, &path.as_absolute()?, 0, &mut entries)?;
        Ok(FileWalker::from_entries(entries))
    }

    fn create_file(&mut self, path: &Path, file: File) -> Result<()> {
        let host = self.translate(path)?;
        if let Some(parent) = host.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| OpenError::FileWriteError(e.to_string()))?;
        }
        let data = file.bytes()?;
        std::fs::write(&host, data.as_slice())
            .map_err(|e| OpenError::FileWriteError(e.to_string()))
    }

    fn create_directory(&mut self, path: &Path) -> Result<()> {
        std::fs::create_dir_all(self.translate(path)?)
            .map_err(|e| OpenError::FileWriteError(e.to_string()))
    }

    fn remove(&mut self, path: &Path) -> Result<()> {
        let host = self.translate(path)?;
        let result = if host.is_dir() {
            std::fs::remove_dir_all(&host)
        } else {
            std::fs::remove_file(&host)
        };
        result.map_err(|e| OpenError::FileWriteError(e.to_string()))
    }

    fn copy(&mut self, from: &Path, to: &Path) -> Result<()> {
        let file = self.open(from)?;
        self.create_file(to, file)
    }

    fn rename(&mut self, from: &Path, to: &Path) -> Result<()> {
        let from_host = self.translate(from)?;
        let to_host = self.translate(to)?;
        std::fs::rename(from_host, to_host).map_err(|e| OpenError::FileWriteError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> Path {
        Path::new(s).unwrap()
    }

    #[test]
    fn test_disk_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut fs = DiskFilesystem::new(dir.path());

        fs.create_file(&p("/sub/hello.txt"), File::from_bytes(b"hi".to_vec()))
            .unwrap();
        assert!(fs.is_file(&p("/sub/hello.txt")));
        assert!(fs.is_directory(&p("/sub")));
        assert_eq!(
            fs.open(&p("/sub/hello.txt")).unwrap().bytes().unwrap().as_slice(),
            b"hi"
        );
    }

    #[test]
    fn test_walk_order_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let mut fs = DiskFilesystem::new(dir.path());
        for name in ["/b.txt", "/a.txt", "/c/d.txt"] {
            fs.create_file(&p(name), File::from_bytes(Vec::new())).unwrap();
        }

        let mut walker = fs.file_walker(&p("/")).unwrap();
        let mut paths = vec![walker.path().unwrap().to_string()];
        while walker.next() {
            paths.push(walker.path().unwrap().to_string());
        }
        assert_eq!(paths, ["/a.txt", "/b.txt", "/c", "/c/d.txt"]);
    }

    #[test]
    fn test_escaping_path_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let fs = DiskFilesystem::new(dir.path());
        assert!(fs.open(&p("../outside")).is_err());
    }
}
