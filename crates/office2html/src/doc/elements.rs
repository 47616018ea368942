//! The element tree: an arena of typed nodes with doubly linked sibling
//! chains. Back-edges are indices, so the tree is acyclic by construction
//! and navigation is O(1).

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::xml::XmlNodeId;

use super::style::TableDimensions;

/// Index of an element inside an [`ElementRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Root,
    TextRoot,
    Slide,
    Sheet,
    Page,
    MasterPage,
    Paragraph,
    Span,
    Text,
    LineBreak,
    Link,
    Bookmark,
    List,
    ListItem,
    Table,
    TableColumn,
    TableRow,
    TableCell,
    Frame,
    Image,
    Rect,
    Line,
    Circle,
    CustomShape,
    Group,
}

/// Extra data for element kinds that need more than links.
#[derive(Debug, Clone, Default)]
pub enum ElementPayload {
    #[default]
    None,
    /// Tables carry their column chain separately from the row children.
    Table {
        first_column: Option<ElementId>,
        last_column: Option<ElementId>,
    },
    /// Spreadsheet sheets carry their expanded index and floating shapes.
    Sheet(Box<SheetData>),
    /// Table cells carry their span and cover state.
    Cell {
        column_span: u32,
        row_span: u32,
        covered: bool,
    },
    /// Slides and pages link their master page.
    MasterRef { master: Option<ElementId> },
    Link { href: String },
    Bookmark { name: String },
    Image { href: String },
}

/// The sparse expanded grid of one sheet.
#[derive(Debug, Clone, Default)]
pub struct SheetData {
    pub name: String,
    pub dimensions: TableDimensions,
    /// Physical column index to its column element.
    pub columns: BTreeMap<u32, ElementId>,
    /// Physical row index to its row element and populated cells.
    pub rows: BTreeMap<u32, SheetRow>,
    /// Positions `(column, row)` inside a span whose origin lies elsewhere.
    pub covered: BTreeSet<(u32, u32)>,
    pub first_shape: Option<ElementId>,
    pub last_shape: Option<ElementId>,
}

#[derive(Debug, Clone)]
pub struct SheetRow {
    pub element: ElementId,
    pub cells: BTreeMap<u32, ElementId>,
}

impl SheetData {
    pub fn cell(&self, column: u32, row: u32) -> Option<ElementId> {
        self.rows.get(&row)?.cells.get(&column).copied()
    }

    pub fn is_covered(&self, column: u32, row: u32) -> bool {
        self.covered.contains(&(column, row))
    }

    /// Full dimensions, clamped to an optional `(rows, columns)` limit.
    pub fn dimensions_clamped(&self, limit: Option<TableDimensions>) -> TableDimensions {
        match limit {
            Some(limit) => TableDimensions::new(
                self.dimensions.rows.min(limit.rows),
                self.dimensions.columns.min(limit.columns),
            ),
            None => self.dimensions,
        }
    }

    /// The smallest rectangle enclosing every cell with content, clamped.
    pub fn content_dimensions(
        &self,
        registry: &ElementRegistry,
        limit: Option<TableDimensions>,
    ) -> TableDimensions {
        let mut bounds = TableDimensions::default();
        for (&row, sheet_row) in &self.rows {
            for (&column, &cell) in &sheet_row.cells {
                if registry.get(cell).first_child.is_some() {
                    bounds.rows = bounds.rows.max(row + 1);
                    bounds.columns = bounds.columns.max(column + 1);
                }
            }
        }
        match limit {
            Some(limit) => TableDimensions::new(
                bounds.rows.min(limit.rows),
                bounds.columns.min(limit.columns),
            ),
            None => bounds,
        }
    }
}

/// One node of the document tree.
#[derive(Debug, Clone)]
pub struct Element {
    pub element_type: ElementType,
    pub parent: Option<ElementId>,
    pub first_child: Option<ElementId>,
    pub last_child: Option<ElementId>,
    pub previous_sibling: Option<ElementId>,
    pub next_sibling: Option<ElementId>,
    /// Backing XML node. Merged text runs keep a first/last pair.
    pub node: Option<XmlNodeId>,
    pub last_node: Option<XmlNodeId>,
    /// The style the element references directly (automatic or named).
    pub style_name: Option<String>,
    pub payload: ElementPayload,
}

/// Arena of document elements.
#[derive(Debug, Clone, Default)]
pub struct ElementRegistry {
    elements: Vec<Element>,
}

impl ElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn create(&mut self, element_type: ElementType, node: Option<XmlNodeId>) -> ElementId {
        let id = ElementId(self.elements.len() as u32);
        self.elements.push(Element {
            element_type,
            parent: None,
            first_child: None,
            last_child: None,
            previous_sibling: None,
            next_sibling: None,
            node,
            last_node: node,
            style_name: None,
            payload: ElementPayload::None,
        });
        id
    }

    pub fn get(&self, id: ElementId) -> &Element {
        &self.elements[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: ElementId) -> &mut Element {
        &mut self.elements[id.0 as usize]
    }

    /// Wire `child` as the new last child of `parent`.
    ///
    /// A child that already has a parent is a caller bug and aborts.
    pub fn append_child(&mut self, parent: ElementId, child: ElementId) {
        assert!(
            self.get(child).parent.is_none(),
            "element {child:?} already has a parent"
        );
        assert_ne!(parent, child, "element cannot parent itself");
        let previous = self.get(parent).last_child;
        {
            let parent_element = self.get_mut(parent);
            parent_element.last_child = Some(child);
            if parent_element.first_child.is_none() {
                parent_element.first_child = Some(child);
            }
        }
        {
            let child_element = self.get_mut(child);
            child_element.parent = Some(parent);
            child_element.previous_sibling = previous;
        }
        if let Some(previous) = previous {
            self.get_mut(previous).next_sibling = Some(child);
        }
    }

    /// Wire `column` into a table's column chain (separate from the rows).
    pub fn append_table_column(&mut self, table: ElementId, column: ElementId) {
        assert_eq!(self.get(column).element_type, ElementType::TableColumn);
        let previous = match &self.get(table).payload {
            ElementPayload::Table { last_column, .. } => *last_column,
            _ => None,
        };
        {
            let column_element = self.get_mut(column);
            column_element.parent = Some(table);
            column_element.previous_sibling = previous;
        }
        if let Some(previous) = previous {
            self.get_mut(previous).next_sibling = Some(column);
        }
        match &mut self.get_mut(table).payload {
            ElementPayload::Table {
                first_column,
                last_column,
            } => {
                if first_column.is_none() {
                    *first_column = Some(column);
                }
                *last_column = Some(column);
            }
            payload => {
                *payload = ElementPayload::Table {
                    first_column: Some(column),
                    last_column: Some(column),
                };
            }
        }
    }

    /// Wire a floating shape into a sheet's shape chain.
    pub fn append_sheet_shape(&mut self, sheet: ElementId, shape: ElementId) {
        let previous = match &self.get(sheet).payload {
            ElementPayload::Sheet(data) => data.last_shape,
            _ => None,
        };
        {
            let shape_element = self.get_mut(shape);
            shape_element.parent = Some(sheet);
            shape_element.previous_sibling = previous;
        }
        if let Some(previous) = previous {
            self.get_mut(previous).next_sibling = Some(shape);
        }
        if let ElementPayload::Sheet(data) = &mut self.get_mut(sheet).payload {
            if data.first_shape.is_none() {
                data.first_shape = Some(shape);
            }
            data.last_shape = Some(shape);
        }
    }

    pub fn first_table_column(&self, table: ElementId) -> Option<ElementId> {
        match &self.get(table).payload {
            ElementPayload::Table { first_column, .. } => *first_column,
            _ => None,
        }
    }

    pub fn sheet_data(&self, sheet: ElementId) -> Option<&SheetData> {
        match &self.get(sheet).payload {
            ElementPayload::Sheet(data) => Some(data),
            _ => None,
        }
    }

    /// Iterate the main child chain.
    pub fn children(&self, id: ElementId) -> Children<'_> {
        Children {
            registry: self,
            next: self.get(id).first_child,
        }
    }

    /// Index of `id` among its siblings.
    pub fn sibling_index(&self, id: ElementId) -> u32 {
        let mut index = 0;
        let mut current = id;
        while let Some(previous) = self.get(current).previous_sibling {
            index += 1;
            current = previous;
        }
        index
    }
}

pub struct Children<'a> {
    registry: &'a ElementRegistry,
    next: Option<ElementId>,
}

impl Iterator for Children<'_> {
    type Item = ElementId;

    fn next(&mut self) -> Option<ElementId> {
        let current = self.next?;
        self.next = self.registry.get(current).next_sibling;
        Some(current)
    }
}
