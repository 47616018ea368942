//! SpreadsheetML (`/xl/workbook.xml` plus worksheet parts) into sheets
//! with expanded cell indexes.

use std::collections::BTreeMap;

use tracing::debug;

use crate::doc::elements::{
    ElementId, ElementPayload, ElementRegistry, ElementType, SheetData, SheetRow,
};
use crate::doc::style::{TableDimensions, TablePosition};
use crate::doc::styles::StyleRegistry;
use crate::doc::{Document, DocumentKind};
use crate::error::{OpenError, Result};
use crate::vfs::{Filesystem, Path};
use crate::xml::{XmlDocument, XmlNodeId};

use super::rels::Relationships;

/// Shared strings, each pointing at its `si` node in the arena.
fn load_shared_strings(
    filesystem: &dyn Filesystem,
    xml: &mut XmlDocument,
) -> Result<Vec<XmlNodeId>> {
    let Ok(file) = filesystem.open(&Path::new("/xl/sharedStrings.xml")?) else {
        return Ok(Vec::new());
    };
    let root = xml.append_tree(&file.bytes()?)?;
    Ok(xml.children_by_name(root, "si").collect())
}

fn parse_worksheet(
    xml: &XmlDocument,
    registry: &mut ElementRegistry,
    sheet_root: XmlNodeId,
    name: &str,
    shared_strings: &[XmlNodeId],
) -> ElementId {
    let sheet = registry.create(ElementType::Sheet, Some(sheet_root));
    let mut data = SheetData {
        name: name.to_string(),
        ..Default::default()
    };
    let mut dimensions = TableDimensions::default();

    if let Some(sheet_data) = xml.first_child_by_name(sheet_root, "sheetData") {
        let row_nodes: Vec<XmlNodeId> = xml.children_by_name(sheet_data, "row").collect();
        for row_node in row_nodes {
            let Some(row_index) = xml
                .attribute(row_node, "r")
                .and_then(|value| value.parse::<u32>().ok())
                .and_then(|value| value.checked_sub(1))
            else {
                continue;
            };
            let row_element = registry.create(ElementType::TableRow, Some(row_node));
            registry.append_child(sheet, row_element);
            let mut cells = BTreeMap::new();

            let cell_nodes: Vec<XmlNodeId> = xml.children_by_name(row_node, "c").collect();
            for cell_node in cell_nodes {
                let Some(position) = xml.attribute(cell_node, "r").and_then(TablePosition::parse)
                else {
                    continue;
                };
                let cell = registry.create(ElementType::TableCell, Some(cell_node));
                registry.get_mut(cell).payload = ElementPayload::Cell {
                    column_span: 1,
                    row_span: 1,
                    covered: false,
                };
                registry.append_child(row_element, cell);

                let content_node = match xml.attribute(cell_node, "t") {
                    Some("s") => xml
                        .first_child_by_name(cell_node, "v")
                        .and_then(|v| xml.text_content(v).trim().parse::<usize>().ok())
                        .and_then(|index| shared_strings.get(index).copied()),
                    Some("inlineStr") => xml.find(cell_node, "is"),
                    _ => xml.first_child_by_name(cell_node, "v"),
                };
                if let Some(content) = content_node {
                    let text = registry.create(ElementType::Text, Some(content));
                    registry.append_child(cell, text);
                }

                cells.insert(position.column, cell);
                dimensions.columns = dimensions.columns.max(position.column + 1);
            }

            dimensions.rows = dimensions.rows.max(row_index + 1);
            data.rows.insert(
                row_index,
                SheetRow {
                    element: row_element,
                    cells,
                },
            );
        }
    }

    // merged ranges become spans on the origin plus covered positions
    if let Some(merges) = xml.first_child_by_name(sheet_root, "mergeCells") {
        for merge in xml.children_by_name(merges, "mergeCell") {
            let Some((from, to)) = xml
                .attribute(merge, "ref")
                .and_then(|reference| reference.split_once(':'))
            else {
                continue;
            };
            let (Some(from), Some(to)) = (TablePosition::parse(from), TablePosition::parse(to))
            else {
                continue;
            };
            if let Some(origin) = data.cell(from.column, from.row) {
                registry.get_mut(origin).payload = ElementPayload::Cell {
                    column_span: to.column - from.column + 1,
                    row_span: to.row - from.row + 1,
                    covered: false,
                };
            }
            for row in from.row..=to.row {
                for column in from.column..=to.column {
                    if row == from.row && column == from.column {
                        continue;
                    }
                    data.covered.insert((column, row));
                }
            }
        }
    }

    data.dimensions = dimensions;
    registry.get_mut(sheet).payload = ElementPayload::Sheet(Box::new(data));
    sheet
}

/// Parse a SpreadsheetML package into a [`Document`].
pub fn parse_document(filesystem: &dyn Filesystem) -> Result<Document> {
    let part = Path::new("/xl/workbook.xml")?;
    let file = filesystem
        .open(&part)
        .map_err(|_| OpenError::NoOfficeOpenXmlFile)?;
    let mut xml = XmlDocument::parse(&file.bytes()?)?;
    let rels = Relationships::for_part(filesystem, &part)?;
    let base = part.parent()?;

    let shared_strings = load_shared_strings(filesystem, &mut xml)?;

    let mut sheet_refs = Vec::new();
    if let Some(sheets) = xml.find(xml.root(), "sheets") {
        for sheet in xml.children_by_name(sheets, "sheet") {
            let name = xml.attribute(sheet, "name").unwrap_or("").to_string();
            let Some(path) = xml
                .attribute(sheet, "r:id")
                .and_then(|id| rels.resolve(&base, id))
            else {
                continue;
            };
            sheet_refs.push((name, path));
        }
    }

    let mut registry = ElementRegistry::new();
    let root = registry.create(ElementType::Root, None);

    for (name, path) in sheet_refs {
        let Ok(sheet_file) = filesystem.open(&path) else {
            debug!(sheet = %path, "worksheet part missing, skipping");
            continue;
        };
        let sheet_root = xml.append_tree(&sheet_file.bytes()?)?;
        let sheet = parse_worksheet(&xml, &mut registry, sheet_root, &name, &shared_strings);
        registry.append_child(root, sheet);
    }

    Ok(Document {
        kind: DocumentKind::Spreadsheet,
        xml,
        registry,
        root,
        styles: StyleRegistry::new(),
        master_pages: Vec::new(),
        first_master_page: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::{File, MemoryFilesystem};

    fn package() -> MemoryFilesystem {
        let mut fs = MemoryFilesystem::new();
        fs.create_file(
            &Path::new("/xl/workbook.xml").unwrap(),
            File::from_bytes(
                br#"<workbook><sheets><sheet name="Data" sheetId="1" r:id="rId1"/></sheets></workbook>"#
                    .to_vec(),
            ),
        )
        .unwrap();
        fs.create_file(
            &Path::new("/xl/_rels/workbook.xml.rels").unwrap(),
            File::from_bytes(
                br#"<Relationships><Relationship Id="rId1" Type="t" Target="worksheets/sheet1.xml"/></Relationships>"#
                    .to_vec(),
            ),
        )
        .unwrap();
        fs.create_file(
            &Path::new("/xl/sharedStrings.xml").unwrap(),
            File::from_bytes(
                br#"<sst><si><t>Name</t></si><si><t>Value</t></si></sst>"#.to_vec(),
            ),
        )
        .unwrap();
        fs.create_file(
            &Path::new("/xl/worksheets/sheet1.xml").unwrap(),
            File::from_bytes(
                br#"<worksheet>
                      <sheetData>
                        <row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row>
                        <row r="2"><c r="A2"><v>42</v></c></row>
                      </sheetData>
                      <mergeCells count="1"><mergeCell ref="A3:B4"/></mergeCells>
                    </worksheet>"#
                    .to_vec(),
            ),
        )
        .unwrap();
        fs
    }

    #[test]
    fn test_sheet_index() {
        let document = parse_document(&package()).unwrap();
        assert_eq!(document.kind, DocumentKind::Spreadsheet);
        let sheet = document.registry.children(document.root).next().unwrap();
        let data = document.registry.sheet_data(sheet).unwrap();
        assert_eq!(data.name, "Data");
        assert_eq!(data.dimensions, TableDimensions::new(2, 2));

        let a1 = data.cell(0, 0).unwrap();
        assert_eq!(document.element_text(a1), "Name");
        let a2 = data.cell(0, 1).unwrap();
        assert_eq!(document.element_text(a2), "42");
        assert!(data.cell(1, 1).is_none());
    }

    #[test]
    fn test_merge_covers_positions() {
        let document = parse_document(&package()).unwrap();
        let sheet = document.registry.children(document.root).next().unwrap();
        let data = document.registry.sheet_data(sheet).unwrap();
        assert!(data.is_covered(1, 2));
        assert!(data.is_covered(0, 3));
        assert!(data.is_covered(1, 3));
        assert!(!data.is_covered(0, 2));
    }

    #[test]
    fn test_not_a_workbook() {
        let fs = MemoryFilesystem::new();
        assert!(matches!(
            parse_document(&fs),
            Err(OpenError::NoOfficeOpenXmlFile)
        ));
    }
}
