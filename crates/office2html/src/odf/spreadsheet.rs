//! Spreadsheet sheet expansion: repeats and spans become a sparse
//! `(column, row)` index, with a cursor that tracks the next free position
//! while spans reserve cells in later rows.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::doc::elements::{ElementId, ElementPayload, ElementType, SheetData, SheetRow};
use crate::doc::style::TableDimensions;
use crate::xml::{XmlDocument, XmlNodeId};

use super::parser::ParseContext;

/// Repeated empty rows/cells beyond this many positions are counted in the
/// dimensions but not materialized in the index.
const EMPTY_REPEAT_CAP: u32 = 16;
/// Hard cap on materialized positions per repeat run, guarding against
/// definitions repeated across the whole sheet width.
const REPEAT_CAP: u32 = 4096;

/// Tracks the next free position while cells are placed left to right.
///
/// Placing a spanning cell marks every other position inside the span as
/// covered; later placements (and later rows) skip those positions.
#[derive(Debug, Default)]
pub struct TableCursor {
    covered: BTreeSet<(u32, u32)>,
    row: u32,
    column: u32,
    max_column: u32,
}

impl TableCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row(&self) -> u32 {
        self.row
    }

    pub fn begin_row(&mut self) {
        self.column = 0;
    }

    pub fn end_row(&mut self, repeated: u32) {
        self.row += repeated.max(1);
    }

    /// Place a cell at the next free position and return that column.
    pub fn place_cell(&mut self, column_span: u32, row_span: u32) -> u32 {
        while self.covered.contains(&(self.row, self.column)) {
            self.column += 1;
        }
        let at = self.column;
        for row in self.row..self.row + row_span.max(1) {
            for column in at..at + column_span.max(1) {
                if row == self.row && column == at {
                    continue;
                }
                self.covered.insert((row, column));
            }
        }
        self.column = at + 1;
        self.max_column = self.max_column.max(at + column_span.max(1));
        at
    }

    /// Consume one position for an explicit covered-cell marker.
    pub fn skip_covered(&mut self) -> u32 {
        let at = self.column;
        self.covered.insert((self.row, at));
        self.column += 1;
        self.max_column = self.max_column.max(self.column);
        at
    }

    pub fn is_covered(&self, column: u32, row: u32) -> bool {
        self.covered.contains(&(row, column))
    }

    pub fn max_column(&self) -> u32 {
        self.max_column
    }

    fn covered_positions(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.covered.iter().map(|&(row, column)| (column, row))
    }
}

/// Parse a `table:table` node of a spreadsheet into a `Sheet` element with
/// an expanded index.
pub(crate) fn parse_sheet(ctx: &mut ParseContext<'_>, node: XmlNodeId) -> ElementId {
    let xml: &XmlDocument = ctx.xml;
    let sheet = ctx.registry.create(ElementType::Sheet, Some(node));
    ctx.registry.get_mut(sheet).style_name =
        xml.attribute(node, "table:style-name").map(str::to_string);

    let mut data = SheetData {
        name: xml
            .attribute(node, "table:name")
            .unwrap_or_default()
            .to_string(),
        ..Default::default()
    };

    // columns
    let mut column_index: u32 = 0;
    for column_node in xml.children_by_name(node, "table:table-column") {
        let repeated = repeat_of(xml, column_node, "table:number-columns-repeated");
        let element = ctx
            .registry
            .create(ElementType::TableColumn, Some(column_node));
        ctx.registry.get_mut(element).style_name = xml
            .attribute(column_node, "table:style-name")
            .map(str::to_string);
        ctx.registry.append_table_column(sheet, element);
        for offset in 0..repeated.min(REPEAT_CAP) {
            data.columns.insert(column_index + offset, element);
        }
        column_index += repeated;
    }

    // rows and cells
    let mut cursor = TableCursor::new();
    let row_nodes: Vec<XmlNodeId> = xml
        .children(node)
        .flat_map(|child| match xml.name(child) {
            "table:table-row" => vec![child],
            "table:table-header-rows" => {
                xml.children_by_name(child, "table:table-row").collect()
            }
            _ => Vec::new(),
        })
        .collect();

    for row_node in row_nodes {
        let repeated = repeat_of(xml, row_node, "table:number-rows-repeated");
        let row_element = ctx.registry.create(ElementType::TableRow, Some(row_node));
        ctx.registry.get_mut(row_element).style_name = xml
            .attribute(row_node, "table:style-name")
            .map(str::to_string);
        ctx.registry.append_child(sheet, row_element);

        cursor.begin_row();
        let mut cells = BTreeMap::new();
        for cell_node in xml.children(row_node) {
            match xml.name(cell_node) {
                "table:table-cell" => {
                    let cell_repeated =
                        repeat_of(xml, cell_node, "table:number-columns-repeated");
                    let column_span = repeat_of(xml, cell_node, "table:number-columns-spanned");
                    let row_span = repeat_of(xml, cell_node, "table:number-rows-spanned");
                    let element = ctx.registry.create(ElementType::TableCell, Some(cell_node));
                    ctx.registry.get_mut(element).style_name = xml
                        .attribute(cell_node, "table:style-name")
                        .map(str::to_string);
                    ctx.registry.get_mut(element).payload = ElementPayload::Cell {
                        column_span,
                        row_span,
                        covered: false,
                    };
                    ctx.registry.append_child(row_element, element);
                    ctx.parse_children(cell_node, element);

                    let populated = ctx.registry.get(element).first_child.is_some();
                    let materialize = if populated {
                        cell_repeated.min(REPEAT_CAP)
                    } else {
                        cell_repeated.min(EMPTY_REPEAT_CAP)
                    };
                    for offset in 0..cell_repeated.min(REPEAT_CAP) {
                        let column = cursor.place_cell(column_span, row_span);
                        if offset < materialize {
                            cells.insert(column, element);
                        }
                    }
                    if cell_repeated > REPEAT_CAP {
                        // positions beyond the cap only matter for the totals
                        cursor.column += cell_repeated - REPEAT_CAP;
                        cursor.max_column = cursor.max_column.max(cursor.column);
                    }
                }
                "table:covered-table-cell" => {
                    let cell_repeated =
                        repeat_of(xml, cell_node, "table:number-columns-repeated");
                    for _ in 0..cell_repeated.min(REPEAT_CAP) {
                        cursor.skip_covered();
                    }
                }
                _ => {}
            }
        }

        let materialize_rows = if cells.is_empty() {
            repeated.min(EMPTY_REPEAT_CAP)
        } else {
            repeated.min(REPEAT_CAP)
        };
        for offset in 0..materialize_rows {
            data.rows.insert(
                cursor.row() + offset,
                SheetRow {
                    element: row_element,
                    cells: cells.clone(),
                },
            );
        }
        cursor.end_row(repeated);
    }

    for (column, row) in cursor.covered_positions() {
        data.covered.insert((column, row));
    }
    data.dimensions = TableDimensions::new(cursor.row(), cursor.max_column().max(column_index));

    ctx.registry.get_mut(sheet).payload = ElementPayload::Sheet(Box::new(data));

    // floating shapes live in a table:shapes child
    if let Some(shapes) = xml.first_child_by_name(node, "table:shapes") {
        let shape_nodes: Vec<XmlNodeId> = xml.element_children(shapes).collect();
        for shape_node in shape_nodes {
            if let Some(shape) = ctx.parse_detached(shape_node) {
                ctx.registry.append_sheet_shape(sheet, shape);
            }
        }
    }

    sheet
}

fn repeat_of(xml: &XmlDocument, node: XmlNodeId, attribute: &str) -> u32 {
    xml.attribute(node, attribute)
        .and_then(|value| value.parse().ok())
        .unwrap_or(1)
        .max(1)
}
