use std::fmt;

use crate::error::{OpenError, Result};

/// A normalized path inside a container or on the host.
///
/// Parsing applies `.` and `..` eagerly, so two paths compare equal iff they
/// name the same location. A relative path may keep leading `..` segments
/// (`upwards`); an absolute path may not escape its root.
#[derive(Debug, Clone, Eq)]
pub struct Path {
    absolute: bool,
    upwards: u32,
    parts: Vec<String>,
    canon: String,
}

impl Path {
    /// The absolute root `/`.
    pub fn root() -> Self {
        Self::new("/").expect("root path")
    }

    /// Parse and normalize a path string.
    ///
    /// `..` past an absolute root is an [`OpenError::InvalidPath`].
    pub fn new(path: &str) -> Result<Self> {
        let absolute = path.starts_with('/');
        let mut result = Self {
            absolute,
            upwards: 0,
            parts: Vec::new(),
            canon: String::new(),
        };
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            match segment {
                "." => {}
                ".." => result.pop_segment()?,
                _ => result.parts.push(segment.to_string()),
            }
        }
        result.rebuild();
        Ok(result)
    }

    fn pop_segment(&mut self) -> Result<()> {
        if self.parts.pop().is_some() {
            Ok(())
        } else if self.absolute {
            Err(OpenError::InvalidPath(
                "'..' past an absolute root".to_string(),
            ))
        } else {
            self.upwards += 1;
            Ok(())
        }
    }

    fn rebuild(&mut self) {
        let mut canon = String::new();
        if self.absolute {
            canon.push('/');
        }
        let mut first = true;
        for _ in 0..self.upwards {
            if !first {
                canon.push('/');
            }
            canon.push_str("..");
            first = false;
        }
        for part in &self.parts {
            if !first {
                canon.push('/');
            }
            canon.push_str(part);
            first = false;
        }
        self.canon = canon;
    }

    /// `true` for the bare root (`/` or the empty relative path).
    pub fn is_root(&self) -> bool {
        self.upwards == 0 && self.parts.is_empty()
    }

    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    pub fn is_relative(&self) -> bool {
        !self.absolute
    }

    /// A relative path that still points above its origin.
    pub fn is_escaping(&self) -> bool {
        !self.absolute && self.upwards > 0
    }

    /// Count of named segments below the root.
    pub fn depth(&self) -> u32 {
        self.parts.len() as u32
    }

    /// The last named segment, or `""` for a root.
    pub fn basename(&self) -> &str {
        self.parts.last().map(String::as_str).unwrap_or("")
    }

    /// Everything after the first `.` of the basename, or `""`.
    pub fn extension(&self) -> &str {
        let name = self.basename();
        match name.find('.') {
            Some(pos) => &name[pos + 1..],
            None => "",
        }
    }

    /// The containing path. Errs when ascending past an absolute root.
    pub fn parent(&self) -> Result<Self> {
        let mut result = self.clone();
        result.pop_segment()?;
        result.rebuild();
        Ok(result)
    }

    /// Append a relative path, normalizing `..` segments against `self`.
    ///
    /// Joining an absolute path is an error.
    pub fn join(&self, other: &Path) -> Result<Self> {
        if other.absolute {
            return Err(OpenError::InvalidPath(
                "cannot join an absolute path".to_string(),
            ));
        }
        let mut result = self.clone();
        for _ in 0..other.upwards {
            result.pop_segment()?;
        }
        result.parts.extend(other.parts.iter().cloned());
        result.rebuild();
        Ok(result)
    }

    /// Append a single named segment.
    pub fn join_segment(&self, segment: &str) -> Result<Self> {
        self.join(&Path::new(segment)?)
    }

    /// `true` when `ancestor` is `self` or a prefix of `self`.
    pub fn starts_with(&self, ancestor: &Path) -> bool {
        self.absolute == ancestor.absolute
            && self.upwards == ancestor.upwards
            && self.parts.len() >= ancestor.parts.len()
            && self.parts[..ancestor.parts.len()] == ancestor.parts[..]
    }

    /// Strip an ancestor prefix, leaving the relative tail.
    pub fn rebase(&self, on: &Path) -> Result<Self> {
        if !self.starts_with(on) {
            return Err(OpenError::InvalidPath(format!(
                "cannot rebase {self} on non-ancestor {on}"
            )));
        }
        let mut result = Self {
            absolute: false,
            upwards: 0,
            parts: self.parts[on.parts.len()..].to_vec(),
            canon: String::new(),
        };
        result.rebuild();
        Ok(result)
    }

    /// The longest shared ancestor of two paths of the same origin.
    pub fn common_root(&self, other: &Path) -> Result<Self> {
        if self.absolute != other.absolute || self.upwards != other.upwards {
            return Err(OpenError::InvalidPath(
                "paths have no common origin".to_string(),
            ));
        }
        let shared = self
            .parts
            .iter()
            .zip(&other.parts)
            .take_while(|(a, b)| a == b)
            .count();
        let mut result = Self {
            absolute: self.absolute,
            upwards: self.upwards,
            parts: self.parts[..shared].to_vec(),
            canon: String::new(),
        };
        result.rebuild();
        Ok(result)
    }

    /// The same path without the leading `/`.
    pub fn as_relative(&self) -> Self {
        if !self.absolute {
            return self.clone();
        }
        let mut result = Self {
            absolute: false,
            upwards: 0,
            parts: self.parts.clone(),
            canon: String::new(),
        };
        result.rebuild();
        result
    }

    /// The same path anchored at `/`. Errs for escaping paths.
    pub fn as_absolute(&self) -> Result<Self> {
        if self.absolute {
            return Ok(self.clone());
        }
        if self.upwards > 0 {
            return Err(OpenError::InvalidPath(format!(
                "cannot anchor escaping path {self}"
            )));
        }
        let mut result = Self {
            absolute: true,
            upwards: 0,
            parts: self.parts.clone(),
            canon: String::new(),
        };
        result.rebuild();
        Ok(result)
    }

    /// The canonical string form.
    pub fn as_str(&self) -> &str {
        &self.canon
    }
}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        self.absolute == other.absolute
            && self.upwards == other.upwards
            && self.parts == other.parts
    }
}

impl std::hash::Hash for Path {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.absolute.hash(state);
        self.upwards.hash(state);
        self.parts.hash(state);
    }
}

impl PartialOrd for Path {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Path {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.absolute, std::cmp::Reverse(self.upwards), &self.parts).cmp(&(
            other.absolute,
            std::cmp::Reverse(other.upwards),
            &other.parts,
        ))
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canon)
    }
}

impl std::str::FromStr for Path {
    type Err = OpenError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> Path {
        Path::new(s).unwrap()
    }

    #[test]
    fn test_parse_normalizes() {
        assert_eq!(p("/a/./b/../c"), p("/a/c"));
        assert_eq!(p("a//b/"), p("a/b"));
        assert_eq!(p("./x"), p("x"));
        assert_eq!(p(""), p("."));
    }

    #[test]
    fn test_roundtrip_through_string() {
        for s in ["/", "", "/a/b", "a/b", "../x", "../../x/y", "a"] {
            let path = p(s);
            assert_eq!(path, p(path.as_str()));
        }
    }

    #[test]
    fn test_absolute_escape_is_error() {
        assert!(Path::new("/..").is_err());
        assert!(Path::new("/a/../..").is_err());
        assert!(p("/").parent().is_err());
    }

    #[test]
    fn test_join() {
        assert_eq!(p("/").join(&p("tmp")).unwrap(), p("/tmp"));
        assert_eq!(p("/a/b").join(&p("../c")).unwrap(), p("/a/c"));
        assert_eq!(p("a").join(&p("../../b")).unwrap(), p("../b"));
        assert!(p("a").join(&p("/b")).is_err());
    }

    #[test]
    fn test_rebase() {
        assert_eq!(
            p("../../other/directory").rebase(&p("../..")).unwrap(),
            p("other/directory")
        );
        assert_eq!(
            p("./ppt/media/image8.png").rebase(&p("ppt/media")).unwrap(),
            p("image8.png")
        );
        assert!(p("/a/b").rebase(&p("/c")).is_err());
    }

    #[test]
    fn test_join_then_rebase_identity() {
        let a = p("base/dir");
        let b = p("tail/file.txt");
        assert_eq!(a.join(&b).unwrap().rebase(&a).unwrap(), b);
    }

    #[test]
    fn test_common_root() {
        assert_eq!(p("/").common_root(&p("/mimetype")).unwrap(), p("/"));
        assert_eq!(p("/a/b/c").common_root(&p("/a/x")).unwrap(), p("/a"));
        assert!(p("/a").common_root(&p("a")).is_err());
    }

    #[test]
    fn test_basename_extension() {
        assert_eq!(p("/a/image8.png").basename(), "image8.png");
        assert_eq!(p("/a/image8.png").extension(), "png");
        assert_eq!(p("archive.tar.gz").extension(), "tar.gz");
        assert_eq!(p("/").basename(), "");
        assert_eq!(p("noext").extension(), "");
    }

    #[test]
    fn test_upwards_counting() {
        let path = p("../../x");
        assert!(path.is_escaping());
        assert_eq!(path.depth(), 1);
        assert_eq!(path.as_str(), "../../x");
    }
}
