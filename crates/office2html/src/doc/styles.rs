//! The style registry: default, named, and automatic styles keyed by
//! `(family, name)`, plus font faces and page layouts, with cached
//! inheritance resolution.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use super::elements::ElementType;
use super::style::{PageLayout, ResolvedStyle};

/// The style family a style or element belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleFamily {
    Text,
    Paragraph,
    Table,
    TableColumn,
    TableRow,
    TableCell,
    Graphic,
    Presentation,
    DrawingPage,
}

impl StyleFamily {
    /// Parse an ODF `style:family` attribute value.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "text" => Some(Self::Text),
            "paragraph" => Some(Self::Paragraph),
            "table" => Some(Self::Table),
            "table-column" => Some(Self::TableColumn),
            "table-row" => Some(Self::TableRow),
            "table-cell" => Some(Self::TableCell),
            "graphic" => Some(Self::Graphic),
            "presentation" => Some(Self::Presentation),
            "drawing-page" => Some(Self::DrawingPage),
            _ => None,
        }
    }

    /// The family an element's directly referenced style belongs to.
    pub fn of_element(element_type: ElementType) -> Self {
        match element_type {
            ElementType::Span | ElementType::Text | ElementType::Link => Self::Text,
            ElementType::Paragraph | ElementType::ListItem => Self::Paragraph,
            ElementType::Table | ElementType::Sheet => Self::Table,
            ElementType::TableColumn => Self::TableColumn,
            ElementType::TableRow => Self::TableRow,
            ElementType::TableCell => Self::TableCell,
            _ => Self::Graphic,
        }
    }
}

/// One named or automatic style definition.
#[derive(Debug, Clone, Default)]
pub struct StyleEntry {
    /// Parent style name within the same family.
    pub parent: Option<String>,
    /// The style attributes attached to this definition alone.
    pub partial: ResolvedStyle,
}

/// Per-document style pools and the resolution cache.
///
/// Population happens once while decoding; afterwards the registry is
/// read-mostly. Concurrent resolutions of the same style may race and both
/// compute the identical result; either insertion winning is fine.
#[derive(Debug, Default)]
pub struct StyleRegistry {
    defaults: HashMap<StyleFamily, ResolvedStyle>,
    named: HashMap<(StyleFamily, String), StyleEntry>,
    automatic: HashMap<(StyleFamily, String), StyleEntry>,
    /// Font face name to the font family it declares.
    font_faces: HashMap<String, String>,
    page_layouts: HashMap<String, PageLayout>,
    cache: RwLock<HashMap<(StyleFamily, String), Arc<ResolvedStyle>>>,
}

impl StyleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_default(&mut self, family: StyleFamily, partial: ResolvedStyle) {
        self.defaults.insert(family, partial);
    }

    pub fn insert_named(&mut self, family: StyleFamily, name: String, entry: StyleEntry) {
        self.named.insert((family, name), entry);
    }

    pub fn insert_automatic(&mut self, family: StyleFamily, name: String, entry: StyleEntry) {
        self.automatic.insert((family, name), entry);
    }

    pub fn insert_font_face(&mut self, name: String, font_family: String) {
        self.font_faces.insert(name, font_family);
    }

    pub fn font_face(&self, name: &str) -> Option<&str> {
        self.font_faces.get(name).map(String::as_str)
    }

    pub fn insert_page_layout(&mut self, name: String, layout: PageLayout) {
        self.page_layouts.insert(name, layout);
    }

    pub fn page_layout(&self, name: &str) -> Option<&PageLayout> {
        self.page_layouts.get(name)
    }

    pub fn has_named(&self, family: StyleFamily, name: &str) -> bool {
        self.named.contains_key(&(family, name.to_string()))
    }

    /// Resolve a named style: family default, then the ancestor chain top
    /// down, then the style's own attributes. Results are cached.
    pub fn resolve_named(&self, family: StyleFamily, name: &str) -> Arc<ResolvedStyle> {
        let key = (family, name.to_string());
        if let Some(cached) = self.cache.read().ok().and_then(|c| c.get(&key).cloned()) {
            return cached;
        }

        let mut chain: Vec<&StyleEntry> = Vec::new();
        let mut seen: Vec<&str> = Vec::new();
        let mut current = Some(name);
        while let Some(style_name) = current {
            if seen.contains(&style_name) {
                debug!(style = style_name, "style inheritance cycle, breaking");
                break;
            }
            let Some(entry) = self.named.get(&(family, style_name.to_string())) else {
                break;
            };
            seen.push(style_name);
            chain.push(entry);
            current = entry.parent.as_deref();
        }

        let mut resolved = self.defaults.get(&family).cloned().unwrap_or_default();
        for entry in chain.iter().rev() {
            resolved.apply(&entry.partial);
        }

        let resolved = Arc::new(resolved);
        if let Ok(mut cache) = self.cache.write() {
            cache.entry(key).or_insert_with(|| resolved.clone());
        }
        resolved
    }

    /// Resolve a style reference as attached to an element: automatic
    /// styles win over named ones; an automatic style chains to the named
    /// style its parent references.
    pub fn resolve(&self, family: StyleFamily, name: &str) -> Arc<ResolvedStyle> {
        if let Some(automatic) = self.automatic.get(&(family, name.to_string())) {
            let mut resolved = match &automatic.parent {
                Some(parent) => (*self.resolve_named(family, parent)).clone(),
                None => self.defaults.get(&family).cloned().unwrap_or_default(),
            };
            resolved.apply(&automatic.partial);
            return Arc::new(resolved);
        }
        self.resolve_named(family, name)
    }
}

impl Clone for StyleRegistry {
    fn clone(&self) -> Self {
        Self {
            defaults: self.defaults.clone(),
            named: self.named.clone(),
            automatic: self.automatic.clone(),
            font_faces: self.font_faces.clone(),
            page_layouts: self.page_layouts.clone(),
            cache: RwLock::new(HashMap::new()),
        }
    }
}
