//! Stateful navigation over the element tree.
//!
//! The cursor keeps an element stack and a style stack in lock step; the
//! style at the top is the cumulative override of every partial style on
//! the way down. Cursors are cheap to clone and are not shared across
//! threads; each thread clones its own.

use super::elements::{ElementId, ElementPayload, ElementType};
use super::path::{Component, DocumentPath};
use super::style::ResolvedStyle;
use super::Document;

#[derive(Clone)]
pub struct DocumentCursor<'a> {
    document: &'a Document,
    element_stack: Vec<ElementId>,
    style_stack: Vec<ResolvedStyle>,
    path: DocumentPath,
}

impl<'a> DocumentCursor<'a> {
    pub fn new(document: &'a Document) -> Self {
        let root = document.root;
        let style = document.partial_style(root);
        Self {
            document,
            element_stack: vec![root],
            style_stack: vec![style],
            path: DocumentPath::new(),
        }
    }

    pub fn document(&self) -> &'a Document {
        self.document
    }

    /// The element the cursor points at.
    pub fn element(&self) -> ElementId {
        *self.element_stack.last().expect("cursor stack is never empty")
    }

    pub fn element_type(&self) -> ElementType {
        self.document.registry.get(self.element()).element_type
    }

    /// The cumulative resolved style at the cursor.
    pub fn style(&self) -> &ResolvedStyle {
        self.style_stack.last().expect("cursor stack is never empty")
    }

    pub fn document_path(&self) -> &DocumentPath {
        &self.path
    }

    pub fn depth(&self) -> usize {
        self.element_stack.len()
    }

    fn push(&mut self, id: ElementId, component: Component) {
        let style = self.style().clone().applied(&self.document.partial_style(id));
        self.element_stack.push(id);
        self.style_stack.push(style);
        self.path.push(component);
    }

    fn replace_top(&mut self, id: ElementId, index: u32) {
        self.element_stack.pop();
        self.style_stack.pop();
        let style = self.style().clone().applied(&self.document.partial_style(id));
        self.element_stack.push(id);
        self.style_stack.push(style);
        self.path.set_back_index(index);
    }

    pub fn move_to_parent(&mut self) -> bool {
        if self.element_stack.len() <= 1 {
            return false;
        }
        self.element_stack.pop();
        self.style_stack.pop();
        self.path.pop();
        true
    }

    /// Move into the main child chain.
    ///
    /// Tables and sheets hide their rows behind [`Self::move_to_first_table_row`];
    /// plain descent on them reports no children.
    pub fn move_to_first_child(&mut self) -> bool {
        match self.element_type() {
            ElementType::Table | ElementType::Sheet => return false,
            _ => {}
        }
        let Some(child) = self.document.registry.get(self.element()).first_child else {
            return false;
        };
        self.push(child, Component::Child(0));
        true
    }

    pub fn move_to_next_sibling(&mut self) -> bool {
        if self.element_stack.len() <= 1 {
            return false;
        }
        let Some(next) = self.document.registry.get(self.element()).next_sibling else {
            return false;
        };
        let index = self.path.back().map(Component::index).unwrap_or(0) + 1;
        self.replace_top(next, index);
        true
    }

    pub fn move_to_previous_sibling(&mut self) -> bool {
        if self.element_stack.len() <= 1 {
            return false;
        }
        let Some(previous) = self.document.registry.get(self.element()).previous_sibling else {
            return false;
        };
        let Some(index) = self.path.back().map(Component::index).and_then(|i| i.checked_sub(1))
        else {
            return false;
        };
        self.replace_top(previous, index);
        true
    }

    /// Move onto the master page of the current slide or page.
    pub fn move_to_master_page(&mut self) -> bool {
        match self.element_type() {
            ElementType::Slide | ElementType::Page => {}
            _ => return false,
        }
        let Some(master) = self.document.master_page_of(self.element()) else {
            return false;
        };
        let index = self
            .document
            .master_pages
            .iter()
            .position(|&m| m == master)
            .unwrap_or(0) as u32;
        self.push(master, Component::Child(index));
        true
    }

    /// Move into a table's column chain.
    pub fn move_to_first_table_column(&mut self) -> bool {
        let Some(column) = self.document.registry.first_table_column(self.element()) else {
            return false;
        };
        self.push(column, Component::Column(0));
        true
    }

    /// Move into a table's row chain.
    pub fn move_to_first_table_row(&mut self) -> bool {
        match self.element_type() {
            ElementType::Table | ElementType::Sheet => {}
            _ => return false,
        }
        let Some(row) = self.document.registry.get(self.element()).first_child else {
            return false;
        };
        self.push(row, Component::Row(0));
        true
    }

    /// Move into a sheet's floating shapes.
    pub fn move_to_first_sheet_shape(&mut self) -> bool {
        let shape = match &self.document.registry.get(self.element()).payload {
            ElementPayload::Sheet(data) => data.first_shape,
            _ => None,
        };
        let Some(shape) = shape else {
            return false;
        };
        self.push(shape, Component::Child(0));
        true
    }

    /// Reset to the root and re-walk the given path.
    pub fn move_to(&mut self, path: &DocumentPath) -> bool {
        let saved_elements = self.element_stack.clone();
        let saved_styles = self.style_stack.clone();
        let saved_path = self.path.clone();

        self.element_stack.truncate(1);
        self.style_stack.truncate(1);
        self.path = DocumentPath::new();

        for component in path.components() {
            let entered = match component {
                Component::Child(_) => self.move_to_first_child(),
                Component::Column(_) => self.move_to_first_table_column(),
                Component::Row(_) => self.move_to_first_table_row(),
            };
            let mut ok = entered;
            if ok {
                for _ in 0..component.index() {
                    if !self.move_to_next_sibling() {
                        ok = false;
                        break;
                    }
                }
            }
            if !ok {
                self.element_stack = saved_elements;
                self.style_stack = saved_styles;
                self.path = saved_path;
                return false;
            }
        }
        true
    }

    /// Enter an element reached through an index (a sheet cell) rather
    /// than a sibling chain. The sheet renderer is the only caller.
    pub(crate) fn move_into(&mut self, element: ElementId, component: Component) {
        self.push(element, component);
    }

    fn for_each_entered(
        &mut self,
        entered: bool,
        visitor: &mut dyn FnMut(&mut Self, u32) -> bool,
    ) {
        if !entered {
            return;
        }
        let mut index = 0;
        loop {
            if !visitor(self, index) {
                break;
            }
            if !self.move_to_next_sibling() {
                break;
            }
            index += 1;
        }
        self.move_to_parent();
    }

    /// Visit every child; the visitor returns `false` to stop early. The
    /// cursor is restored to the parent afterwards.
    pub fn for_each_child(&mut self, mut visitor: impl FnMut(&mut Self, u32) -> bool) {
        let entered = self.move_to_first_child();
        self.for_each_entered(entered, &mut visitor);
    }

    pub fn for_each_table_column(&mut self, mut visitor: impl FnMut(&mut Self, u32) -> bool) {
        let entered = self.move_to_first_table_column();
        self.for_each_entered(entered, &mut visitor);
    }

    pub fn for_each_table_row(&mut self, mut visitor: impl FnMut(&mut Self, u32) -> bool) {
        let entered = self.move_to_first_table_row();
        self.for_each_entered(entered, &mut visitor);
    }

    /// Visit the cells of the current row.
    pub fn for_each_table_cell(&mut self, mut visitor: impl FnMut(&mut Self, u32) -> bool) {
        let entered = self.move_to_first_child();
        self.for_each_entered(entered, &mut visitor);
    }

    pub fn for_each_sheet_shape(&mut self, mut visitor: impl FnMut(&mut Self, u32) -> bool) {
        let entered = self.move_to_first_sheet_shape();
        self.for_each_entered(entered, &mut visitor);
    }
}

impl PartialEq for DocumentCursor<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.document, other.document)
            && self.element_stack == other.element_stack
            && self.path == other.path
    }
}

impl std::fmt::Debug for DocumentCursor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentCursor")
            .field("element", &self.element())
            .field("path", &self.path.to_string())
            .finish()
    }
}
