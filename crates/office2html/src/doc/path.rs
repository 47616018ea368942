//! String-addressed locations inside a document tree.
//!
//! A path is a sequence of `/child:<n>`, `/column:<n>`, `/row:<n>`
//! components from the root. Format and parse are inverses on well-formed
//! input; parsing is strict.

use std::fmt;

use crate::error::{OpenError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    Child(u32),
    Column(u32),
    Row(u32),
}

impl Component {
    pub fn index(self) -> u32 {
        match self {
            Self::Child(n) | Self::Column(n) | Self::Row(n) => n,
        }
    }

    pub fn with_index(self, index: u32) -> Self {
        match self {
            Self::Child(_) => Self::Child(index),
            Self::Column(_) => Self::Column(index),
            Self::Row(_) => Self::Row(index),
        }
    }

    fn parse(text: &str) -> Result<Self> {
        let (prefix, number) = text
            .split_once(':')
            .ok_or_else(|| OpenError::InvalidPath(format!("missing ':' in '{text}'")))?;
        let index: u32 = number
            .parse()
            .map_err(|_| OpenError::InvalidPath(format!("bad index in '{text}'")))?;
        match prefix {
            "child" => Ok(Self::Child(index)),
            "column" => Ok(Self::Column(index)),
            "row" => Ok(Self::Row(index)),
            _ => Err(OpenError::InvalidPath(format!(
                "unknown component '{prefix}'"
            ))),
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Child(n) => write!(f, "child:{n}"),
            Self::Column(n) => write!(f, "column:{n}"),
            Self::Row(n) => write!(f, "row:{n}"),
        }
    }
}

/// An ordered component sequence identifying one element from the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DocumentPath {
    components: Vec<Component>,
}

impl DocumentPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a path string. The empty string is the root.
    pub fn parse(text: &str) -> Result<Self> {
        let mut components = Vec::new();
        if text.is_empty() {
            return Ok(Self { components });
        }
        if !text.starts_with('/') {
            return Err(OpenError::InvalidPath(format!("missing '/' in '{text}'")));
        }
        for part in text[1..].split('/') {
            components.push(Component::parse(part)?);
        }
        Ok(Self { components })
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn back(&self) -> Option<Component> {
        self.components.last().copied()
    }

    pub fn push(&mut self, component: Component) {
        self.components.push(component);
    }

    pub fn pop(&mut self) -> Option<Component> {
        self.components.pop()
    }

    /// Replace the final component's index.
    pub fn set_back_index(&mut self, index: u32) {
        if let Some(back) = self.components.last_mut() {
            *back = back.with_index(index);
        }
    }

    pub fn parent(&self) -> Result<Self> {
        if self.components.is_empty() {
            return Err(OpenError::InvalidPath("the root has no parent".to_string()));
        }
        Ok(Self {
            components: self.components[..self.components.len() - 1].to_vec(),
        })
    }

    pub fn join(&self, other: &Self) -> Self {
        let mut components = self.components.clone();
        components.extend_from_slice(&other.components);
        Self { components }
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for component in &self.components {
            write!(f, "/{component}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for DocumentPath {
    type Err = OpenError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format_inverse() {
        for text in ["", "/child:0", "/child:6/child:0", "/child:1/row:2/child:3"] {
            assert_eq!(DocumentPath::parse(text).unwrap().to_string(), text);
        }
    }

    #[test]
    fn test_component_kinds() {
        let path = DocumentPath::parse("/child:1/column:2/row:3").unwrap();
        assert_eq!(
            path.components(),
            [Component::Child(1), Component::Column(2), Component::Row(3)]
        );
    }

    #[test]
    fn test_strict_parse_errors() {
        for text in ["child:0", "/child", "/child:x", "/sibling:1", "/child:1/", "//child:1"] {
            assert!(DocumentPath::parse(text).is_err(), "{text} should fail");
        }
    }

    #[test]
    fn test_push_pop_and_back_index() {
        let mut path = DocumentPath::parse("/child:0").unwrap();
        path.push(Component::Row(4));
        path.set_back_index(5);
        assert_eq!(path.to_string(), "/child:0/row:5");
        assert_eq!(path.pop(), Some(Component::Row(5)));
        assert_eq!(path.to_string(), "/child:0");
    }

    #[test]
    fn test_parent_and_join() {
        let path = DocumentPath::parse("/child:1/child:2").unwrap();
        assert_eq!(path.parent().unwrap().to_string(), "/child:1");
        let tail = DocumentPath::parse("/row:0").unwrap();
        assert_eq!(path.join(&tail).to_string(), "/child:1/child:2/row:0");
        assert!(DocumentPath::new().parent().is_err());
    }
}
