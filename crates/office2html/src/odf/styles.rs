//! Populate the style registry from `styles.xml` and `content.xml`:
//! font faces, default styles per family, named styles, automatic styles,
//! and page layouts.

use tracing::debug;

use crate::doc::style::{
    Color, DirectionalStyle, FontStyle, FontWeight, Measure, PageLayout, PrintOrientation,
    ResolvedStyle, TextAlign, TextWrap, VerticalAlign,
};
use crate::doc::styles::{StyleEntry, StyleFamily, StyleRegistry};
use crate::xml::{XmlDocument, XmlNodeId};

/// Read the style pools reachable from one document root (the root of
/// `styles.xml` or of `content.xml`).
pub fn index_styles(xml: &XmlDocument, root: XmlNodeId, registry: &mut StyleRegistry) {
    if let Some(faces) = xml.first_child_by_name(root, "office:font-face-decls") {
        for face in xml.children_by_name(faces, "style:font-face") {
            let Some(name) = xml.attribute(face, "style:name") else {
                continue;
            };
            let family = xml
                .attribute(face, "svg:font-family")
                .unwrap_or(name)
                .to_string();
            registry.insert_font_face(name.to_string(), family);
        }
    }

    if let Some(styles) = xml.first_child_by_name(root, "office:styles") {
        for node in xml.children(styles) {
            match xml.name(node) {
                "style:default-style" => {
                    if let Some(family) = xml
                        .attribute(node, "style:family")
                        .and_then(StyleFamily::parse)
                    {
                        registry.set_default(family, read_partial(xml, node));
                    }
                }
                "style:style" => insert_style(xml, node, registry, false),
                _ => {}
            }
        }
    }

    if let Some(automatic) = xml.first_child_by_name(root, "office:automatic-styles") {
        for node in xml.children(automatic) {
            match xml.name(node) {
                "style:style" => insert_style(xml, node, registry, true),
                "style:page-layout" => {
                    if let Some(name) = xml.attribute(node, "style:name") {
                        registry.insert_page_layout(name.to_string(), read_page_layout(xml, node));
                    }
                }
                _ => {}
            }
        }
    }
}

fn insert_style(xml: &XmlDocument, node: XmlNodeId, registry: &mut StyleRegistry, automatic: bool) {
    let Some(name) = xml.attribute(node, "style:name") else {
        return;
    };
    let Some(family) = xml
        .attribute(node, "style:family")
        .and_then(StyleFamily::parse)
    else {
        debug!(style = name, "style without usable family, skipping");
        return;
    };
    let entry = StyleEntry {
        parent: xml
            .attribute(node, "style:parent-style-name")
            .map(str::to_string),
        partial: read_partial(xml, node),
    };
    if automatic {
        registry.insert_automatic(family, name.to_string(), entry);
    } else {
        registry.insert_named(family, name.to_string(), entry);
    }
}

/// Read the property child nodes of a style definition into a partial
/// resolved style.
pub fn read_partial(xml: &XmlDocument, node: XmlNodeId) -> ResolvedStyle {
    let mut partial = ResolvedStyle::default();
    for child in xml.children(node) {
        match xml.name(child) {
            "style:text-properties" => read_text_properties(xml, child, &mut partial),
            "style:paragraph-properties" => read_paragraph_properties(xml, child, &mut partial),
            "style:table-properties" => {
                partial.table.width = measure_attribute(xml, child, "style:width");
            }
            "style:table-column-properties" => {
                partial.table_column.width = measure_attribute(xml, child, "style:column-width");
            }
            "style:table-row-properties" => {
                partial.table_row.height = measure_attribute(xml, child, "style:row-height");
            }
            "style:table-cell-properties" => read_cell_properties(xml, child, &mut partial),
            "style:graphic-properties" => read_graphic_properties(xml, child, &mut partial),
            _ => {}
        }
    }
    partial
}

fn read_text_properties(xml: &XmlDocument, node: XmlNodeId, partial: &mut ResolvedStyle) {
    let text = &mut partial.text;
    if let Some(name) = xml.attribute(node, "style:font-name") {
        text.font_name = Some(name.to_string());
    }
    if let Some(family) = xml.attribute(node, "fo:font-family") {
        text.font_name = Some(family.to_string());
    }
    text.font_size = measure_attribute(xml, node, "fo:font-size").or(text.font_size.take());
    if let Some(weight) = xml.attribute(node, "fo:font-weight") {
        text.font_weight = Some(if weight == "normal" {
            FontWeight::Normal
        } else {
            FontWeight::Bold
        });
    }
    if let Some(style) = xml.attribute(node, "fo:font-style") {
        text.font_style = Some(if style == "italic" {
            FontStyle::Italic
        } else {
            FontStyle::Normal
        });
    }
    if let Some(underline) = xml.attribute(node, "style:text-underline-style") {
        text.font_underline = Some(underline != "none");
    }
    if let Some(line_through) = xml.attribute(node, "style:text-line-through-style") {
        text.font_line_through = Some(line_through != "none");
    }
    if let Some(shadow) = xml.attribute(node, "fo:text-shadow") {
        text.font_shadow = Some(shadow.to_string());
    }
    if let Some(color) = xml.attribute(node, "fo:color").and_then(Color::parse) {
        text.font_color = Some(color);
    }
    if let Some(color) = xml
        .attribute(node, "fo:background-color")
        .and_then(Color::parse)
    {
        text.background_color = Some(color);
    }
}

fn read_paragraph_properties(xml: &XmlDocument, node: XmlNodeId, partial: &mut ResolvedStyle) {
    let paragraph = &mut partial.paragraph;
    if let Some(align) = xml.attribute(node, "fo:text-align") {
        paragraph.text_align = match align {
            "start" | "left" => Some(TextAlign::Left),
            "end" | "right" => Some(TextAlign::Right),
            "center" => Some(TextAlign::Center),
            "justify" => Some(TextAlign::Justify),
            _ => None,
        };
    }
    paragraph.margin.apply(&directional(xml, node, "fo:margin"));
    paragraph.line_height = measure_attribute(xml, node, "fo:line-height")
        .or(paragraph.line_height.take());
}

fn read_cell_properties(xml: &XmlDocument, node: XmlNodeId, partial: &mut ResolvedStyle) {
    let cell = &mut partial.table_cell;
    if let Some(color) = xml
        .attribute(node, "fo:background-color")
        .and_then(Color::parse)
    {
        cell.background_color = Some(color);
    }
    if let Some(align) = xml.attribute(node, "style:vertical-align") {
        cell.vertical_align = match align {
            "top" => Some(VerticalAlign::Top),
            "middle" => Some(VerticalAlign::Middle),
            "bottom" => Some(VerticalAlign::Bottom),
            _ => None,
        };
    }
    if let Some(rotation) = xml
        .attribute(node, "style:rotation-angle")
        .and_then(|a| a.parse().ok())
    {
        cell.text_rotation = Some(rotation);
    }
    cell.padding.apply(&directional(xml, node, "fo:padding"));
    let mut border = DirectionalStyle::default();
    if let Some(all) = xml.attribute(node, "fo:border") {
        border = DirectionalStyle::all(all.to_string());
    }
    for (side, attribute) in [
        ("right", "fo:border-right"),
        ("top", "fo:border-top"),
        ("left", "fo:border-left"),
        ("bottom", "fo:border-bottom"),
    ] {
        if let Some(value) = xml.attribute(node, attribute) {
            match side {
                "right" => border.right = Some(value.to_string()),
                "top" => border.top = Some(value.to_string()),
                "left" => border.left = Some(value.to_string()),
                _ => border.bottom = Some(value.to_string()),
            }
        }
    }
    cell.border.apply(&border);
}

fn read_graphic_properties(xml: &XmlDocument, node: XmlNodeId, partial: &mut ResolvedStyle) {
    let graphic = &mut partial.graphic;
    graphic.stroke_width =
        measure_attribute(xml, node, "svg:stroke-width").or(graphic.stroke_width.take());
    if let Some(color) = xml.attribute(node, "svg:stroke-color").and_then(Color::parse) {
        graphic.stroke_color = Some(color);
    }
    if let Some(color) = xml.attribute(node, "draw:fill-color").and_then(Color::parse) {
        graphic.fill_color = Some(color);
    }
    if let Some(align) = xml.attribute(node, "style:vertical-align") {
        graphic.vertical_align = match align {
            "top" => Some(VerticalAlign::Top),
            "middle" => Some(VerticalAlign::Middle),
            "bottom" => Some(VerticalAlign::Bottom),
            _ => None,
        };
    }
    if let Some(wrap) = xml.attribute(node, "style:wrap") {
        graphic.text_wrap = match wrap {
            "none" => Some(TextWrap::None),
            "left" => Some(TextWrap::Before),
            "right" => Some(TextWrap::After),
            "run-through" => Some(TextWrap::RunThrough),
            _ => None,
        };
    }
}

fn read_page_layout(xml: &XmlDocument, node: XmlNodeId) -> PageLayout {
    let mut layout = PageLayout::default();
    let Some(properties) = xml.first_child_by_name(node, "style:page-layout-properties") else {
        return layout;
    };
    layout.width = measure_attribute(xml, properties, "fo:page-width");
    layout.height = measure_attribute(xml, properties, "fo:page-height");
    layout.print_orientation = match xml.attribute(properties, "style:print-orientation") {
        Some("landscape") => Some(PrintOrientation::Landscape),
        Some("portrait") => Some(PrintOrientation::Portrait),
        _ => None,
    };
    layout.margin = directional(xml, properties, "fo:margin");
    layout
}

/// Read `fo:margin`-style attributes: the base name sets all four sides,
/// the `-left`/`-right`/`-top`/`-bottom` variants override per side.
fn directional(xml: &XmlDocument, node: XmlNodeId, base: &str) -> DirectionalStyle<Measure> {
    let mut result = match measure_attribute(xml, node, base) {
        Some(all) => DirectionalStyle::all(all),
        None => DirectionalStyle::default(),
    };
    if let Some(value) = measure_attribute(xml, node, &format!("{base}-right")) {
        result.right = Some(value);
    }
    if let Some(value) = measure_attribute(xml, node, &format!("{base}-top")) {
        result.top = Some(value);
    }
    if let Some(value) = measure_attribute(xml, node, &format!("{base}-left")) {
        result.left = Some(value);
    }
    if let Some(value) = measure_attribute(xml, node, &format!("{base}-bottom")) {
        result.bottom = Some(value);
    }
    result
}

fn measure_attribute(xml: &XmlDocument, node: XmlNodeId, name: &str) -> Option<Measure> {
    xml.attribute(node, name).and_then(Measure::parse)
}
