//! OOXML relationship files: `_rels/.rels` next to each part maps
//! relationship ids to targets, which is how parts reference each other.

use std::collections::HashMap;

use crate::error::Result;
use crate::vfs::{Filesystem, Path};
use crate::xml::XmlDocument;

/// Relationship id to target, for one part.
#[derive(Debug, Clone, Default)]
pub struct Relationships {
    targets: HashMap<String, String>,
}

impl Relationships {
    /// Load the relationships of `part` (e.g. `/word/document.xml` reads
    /// `/word/_rels/document.xml.rels`). Missing rels are empty, not an
    /// error.
    pub fn for_part(filesystem: &dyn Filesystem, part: &Path) -> Result<Self> {
        let parent = part.parent()?;
        let rels_path = parent
            .join_segment("_rels")?
            .join_segment(&format!("{}.rels", part.basename()))?;
        let Ok(file) = filesystem.open(&rels_path) else {
            return Ok(Self::default());
        };
        let xml = XmlDocument::parse(&file.bytes()?)?;
        let mut targets = HashMap::new();
        for relationship in xml.children_by_name(xml.root(), "Relationship") {
            let (Some(id), Some(target)) = (
                xml.attribute(relationship, "Id"),
                xml.attribute(relationship, "Target"),
            ) else {
                continue;
            };
            targets.insert(id.to_string(), target.to_string());
        }
        Ok(Self { targets })
    }

    pub fn target(&self, id: &str) -> Option<&str> {
        self.targets.get(id).map(String::as_str)
    }

    /// Resolve a relationship target against the directory of the part
    /// that owns the rels.
    pub fn resolve(&self, base: &Path, id: &str) -> Option<Path> {
        let target = self.target(id)?;
        if let Some(absolute) = target.strip_prefix('/') {
            return Path::new(&format!("/{absolute}")).ok();
        }
        base.join(&Path::new(target).ok()?).ok()
    }
}
