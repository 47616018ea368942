//! The sheet grid renderer: reconstruct a rectangular table from the
//! sparse expanded index, with spreadsheet-style headers, span attributes,
//! covered-cell skipping, and floating shapes anchored in the first cell.

use crate::doc::elements::{ElementPayload, SheetData};
use crate::doc::path::Component;
use crate::doc::style::{TableDimensions, TablePosition};
use crate::doc::{DocumentCursor, ElementType};
use crate::error::Result;

use super::document::Translator;
use super::style as css;
use super::writer::HtmlWriter;
use super::HtmlPage;

/// One page per sheet of a spreadsheet document.
pub(super) fn translate_sheets(translator: &mut Translator<'_>) -> Result<Vec<HtmlPage>> {
    let document = translator.document;
    let mut pages = Vec::new();
    let mut cursor = document.cursor();
    let mut collected: Vec<(String, String)> = Vec::new();
    cursor.for_each_child(|cursor, index| {
        if cursor.element_type() != ElementType::Sheet {
            return true;
        }
        let name = document
            .registry
            .sheet_data(cursor.element())
            .map(|data| data.name.clone())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| format!("sheet-{}", index + 1));
        let mut writer =
            HtmlWriter::new(translator.options.format_html, translator.options.html_indent);
        render_sheet(translator, &mut writer, cursor);
        collected.push((name, writer.finish()));
        true
    });
    for (name, html) in collected {
        pages.push(HtmlPage { name, html });
    }
    Ok(pages)
}

fn rendered_dimensions(translator: &Translator<'_>, data: &SheetData) -> TableDimensions {
    let limit = translator
        .options
        .spreadsheet_limit
        .map(|(rows, columns)| TableDimensions::new(rows, columns));
    if translator.options.spreadsheet_limit_by_content {
        data.content_dimensions(&translator.document.registry, limit)
    } else {
        data.dimensions_clamped(limit)
    }
}

/// Render one sheet as a `<table>`. The cursor points at the sheet.
pub(super) fn render_sheet(
    translator: &mut Translator<'_>,
    writer: &mut HtmlWriter,
    cursor: &mut DocumentCursor<'_>,
) {
    let document = translator.document;
    let sheet = cursor.element();
    let Some(data) = document.registry.sheet_data(sheet) else {
        return;
    };
    let dimensions = rendered_dimensions(translator, data);

    writer.open(
        "table",
        &[
            ("class", "sheet".to_string()),
            ("style", css::table_css(cursor.style())),
        ],
    );

    // column definitions: the corner column, then one per logical column
    writer.open("colgroup", &[]);
    writer.void("col", &[]);
    for column in 0..dimensions.columns {
        let style = data
            .columns
            .get(&column)
            .map(|&element| {
                css::table_column_css(&cursor.style().clone().applied(
                    &document.partial_style(element),
                ))
            })
            .unwrap_or_default();
        writer.void("col", &[("style", style)]);
    }
    writer.close();

    // header row with column letters
    writer.open("tr", &[]);
    writer.open_inline("th", &[]);
    writer.close();
    for column in 0..dimensions.columns {
        writer.open_inline("th", &[]);
        writer.text(&TablePosition::to_column_string(column));
        writer.close();
    }
    writer.close();

    for row in 0..dimensions.rows {
        let sheet_row = data.rows.get(&row);
        let row_style = sheet_row
            .map(|sheet_row| {
                css::table_row_css(&cursor.style().clone().applied(
                    &document.partial_style(sheet_row.element),
                ))
            })
            .unwrap_or_default();
        writer.open("tr", &[("style", row_style)]);

        // row number in the first column
        writer.open_inline("th", &[]);
        writer.text(&TablePosition::to_row_string(row));
        writer.close();

        for column in 0..dimensions.columns {
            if data.is_covered(column, row) {
                continue;
            }
            let cell = data.cell(column, row);
            let Some(cell) = cell else {
                // empty cells still occupy the grid
                writer.open_inline("td", &[]);
                writer.close();
                continue;
            };

            let mut attributes = Vec::new();
            if let ElementPayload::Cell {
                column_span,
                row_span,
                ..
            } = &document.registry.get(cell).payload
            {
                if *column_span > 1 {
                    attributes.push(("colspan", column_span.to_string()));
                }
                if *row_span > 1 {
                    attributes.push(("rowspan", row_span.to_string()));
                }
            }

            let row_element = sheet_row.map(|sheet_row| sheet_row.element);
            let style = {
                let mut cumulative = cursor.style().clone();
                if let Some(row_element) = row_element {
                    cumulative.apply(&document.partial_style(row_element));
                }
                cumulative.apply(&document.partial_style(cell));
                cumulative
            };
            attributes.push(("style", css::table_cell_css(&style)));

            writer.open("td", &attributes);
            if row == 0 && column == 0 {
                // floating shapes anchor inside the first cell
                cursor.for_each_sheet_shape(|cursor, _| {
                    translator.render_element(writer, cursor);
                    true
                });
            }
            if let Some(row_element) = row_element {
                cursor.move_into(row_element, Component::Row(row));
                cursor.move_into(cell, Component::Child(column));
                translator.render_children(writer, cursor);
                cursor.move_to_parent();
                cursor.move_to_parent();
            }
            writer.close();
        }
        writer.close();
    }
    writer.close();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HtmlOptions;
    use crate::vfs::{File, Filesystem, MemoryFilesystem, Path};

    const CONTENT: &str = r#"<?xml version="1.0"?>
<office:document-content xmlns:office="urn:o">
  <office:body>
    <office:spreadsheet>
      <table:table table:name="First">
        <table:table-column table:number-columns-repeated="2"/>
        <table:table-row>
          <table:table-cell><text:p>A1</text:p></table:table-cell>
          <table:table-cell><text:p>B1</text:p></table:table-cell>
        </table:table-row>
        <table:table-row>
          <table:table-cell table:number-columns-spanned="2" table:number-rows-spanned="1"><text:p>wide</text:p></table:table-cell>
          <table:covered-table-cell/>
        </table:table-row>
      </table:table>
    </office:spreadsheet>
  </office:body>
</office:document-content>"#;

    fn document() -> crate::doc::Document {
        let mut fs = MemoryFilesystem::new();
        fs.create_file(
            &Path::new("/content.xml").unwrap(),
            File::from_bytes(CONTENT.as_bytes().to_vec()),
        )
        .unwrap();
        crate::odf::parser::parse_document(&fs).unwrap()
    }

    #[test]
    fn test_sheet_page_grid() {
        let document = document();
        let options = HtmlOptions::default();
        let output = Translator::new(&document, None, &options).translate().unwrap();
        assert_eq!(output.pages.len(), 1);
        assert_eq!(output.pages[0].name, "First");
        let html = &output.pages[0].html;
        assert!(html.contains("<th>A</th>"));
        assert!(html.contains("<th>B</th>"));
        assert!(html.contains("<th>1</th>"));
        assert!(html.contains("A1"));
        assert!(html.contains("B1"));
        assert!(html.contains(r#"colspan="2""#));
    }

    #[test]
    fn test_covered_cells_not_emitted() {
        let document = document();
        let options = HtmlOptions::default();
        let output = Translator::new(&document, None, &options).translate().unwrap();
        let html = &output.pages[0].html;
        // the second row has one spanning cell, so exactly one td there;
        // count tds overall: 2 (row 1) + 1 (row 2)
        assert_eq!(html.matches("<td").count(), 3);
    }
}
