//! Resolved styles to CSS property strings.

use crate::doc::style::{
    DirectionalStyle, FontStyle, FontWeight, HorizontalAlign, Measure, PageLayout, ResolvedStyle,
    TextAlign, VerticalAlign,
};
use crate::doc::styles::StyleRegistry;

/// Accumulates `property: value` pairs into one `style` attribute value.
#[derive(Default)]
pub struct CssProperties {
    properties: Vec<(String, String)>,
}

impl CssProperties {
    pub fn push(&mut self, property: &str, value: impl Into<String>) {
        self.properties.push((property.to_string(), value.into()));
    }

    pub fn push_measure(&mut self, property: &str, value: &Option<Measure>) {
        if let Some(measure) = value {
            self.push(property, measure.to_string());
        }
    }

    /// Sides with identical values collapse to the shorthand property.
    pub fn push_directional<T: Clone + PartialEq + ToString>(
        &mut self,
        property: &str,
        value: &DirectionalStyle<T>,
    ) {
        if value.is_empty() {
            return;
        }
        if let Some(uniform) = value.uniform() {
            self.push(property, uniform.to_string());
            return;
        }
        for (side, side_value) in [
            ("right", &value.right),
            ("top", &value.top),
            ("left", &value.left),
            ("bottom", &value.bottom),
        ] {
            if let Some(side_value) = side_value {
                self.push(&format!("{property}-{side}"), side_value.to_string());
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn to_style_attribute(&self) -> String {
        self.properties
            .iter()
            .map(|(property, value)| format!("{property}:{value}"))
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// CSS for a text run or span.
pub fn text_css(style: &ResolvedStyle, registry: &StyleRegistry) -> String {
    let text = &style.text;
    let mut css = CssProperties::default();
    if let Some(name) = &text.font_name {
        // font face declarations map style names to real families
        let family = registry.font_face(name).unwrap_or(name);
        css.push("font-family", family);
    }
    css.push_measure("font-size", &text.font_size);
    if let Some(weight) = text.font_weight {
        css.push(
            "font-weight",
            match weight {
                FontWeight::Bold => "bold",
                FontWeight::Normal => "normal",
            },
        );
    }
    if let Some(font_style) = text.font_style {
        css.push(
            "font-style",
            match font_style {
                FontStyle::Italic => "italic",
                FontStyle::Normal => "normal",
            },
        );
    }
    let mut decorations = Vec::new();
    if text.font_underline == Some(true) {
        decorations.push("underline");
    }
    if text.font_line_through == Some(true) {
        decorations.push("line-through");
    }
    if !decorations.is_empty() {
        css.push("text-decoration", decorations.join(" "));
    }
    if let Some(shadow) = &text.font_shadow {
        css.push("text-shadow", shadow.clone());
    }
    if let Some(color) = text.font_color {
        css.push("color", color.to_css());
    }
    if let Some(color) = text.background_color {
        css.push("background-color", color.to_css());
    }
    css.to_style_attribute()
}

/// CSS for a paragraph, including its text properties.
pub fn paragraph_css(style: &ResolvedStyle, registry: &StyleRegistry) -> String {
    let mut css = CssProperties::default();
    if let Some(align) = style.paragraph.text_align {
        css.push(
            "text-align",
            match align {
                TextAlign::Left => "left",
                TextAlign::Right => "right",
                TextAlign::Center => "center",
                TextAlign::Justify => "justify",
            },
        );
    }
    css.push_directional("margin", &style.paragraph.margin);
    css.push_measure("line-height", &style.paragraph.line_height);
    let text = text_css(style, registry);
    let mut result = css.to_style_attribute();
    if !text.is_empty() {
        if !result.is_empty() {
            result.push(';');
        }
        result.push_str(&text);
    }
    result
}

pub fn table_css(style: &ResolvedStyle) -> String {
    let mut css = CssProperties::default();
    css.push_measure("width", &style.table.width);
    css.push("border-collapse", "collapse");
    css.to_style_attribute()
}

pub fn table_column_css(style: &ResolvedStyle) -> String {
    let mut css = CssProperties::default();
    css.push_measure("width", &style.table_column.width);
    css.to_style_attribute()
}

pub fn table_row_css(style: &ResolvedStyle) -> String {
    let mut css = CssProperties::default();
    css.push_measure("height", &style.table_row.height);
    css.to_style_attribute()
}

pub fn table_cell_css(style: &ResolvedStyle) -> String {
    let cell = &style.table_cell;
    let mut css = CssProperties::default();
    if let Some(align) = cell.horizontal_align {
        css.push(
            "text-align",
            match align {
                HorizontalAlign::Left => "left",
                HorizontalAlign::Center => "center",
                HorizontalAlign::Right => "right",
            },
        );
    }
    if let Some(align) = cell.vertical_align {
        css.push(
            "vertical-align",
            match align {
                VerticalAlign::Top => "top",
                VerticalAlign::Middle => "middle",
                VerticalAlign::Bottom => "bottom",
            },
        );
    }
    if let Some(color) = cell.background_color {
        css.push("background-color", color.to_css());
    }
    css.push_directional("padding", &cell.padding);
    css.push_directional("border", &cell.border);
    if let Some(rotation) = cell.text_rotation {
        css.push("transform", format!("rotate({}deg)", -rotation));
    }
    css.to_style_attribute()
}

pub fn graphic_css(style: &ResolvedStyle) -> String {
    let graphic = &style.graphic;
    let mut css = CssProperties::default();
    if let Some(width) = &graphic.stroke_width {
        css.push("border-width", width.to_string());
        css.push("border-style", "solid");
    }
    if let Some(color) = graphic.stroke_color {
        css.push("border-color", color.to_css());
    }
    if let Some(color) = graphic.fill_color {
        css.push("background-color", color.to_css());
    }
    css.to_style_attribute()
}

/// CSS for the outer page container.
pub fn page_css(layout: &PageLayout, with_margin: bool) -> String {
    let mut css = CssProperties::default();
    css.push_measure("width", &layout.width);
    if with_margin {
        css.push_measure("min-height", &layout.height);
    } else {
        css.push_measure("height", &layout.height);
    }
    css.to_style_attribute()
}

/// CSS for the inner content area carrying the page margins.
pub fn page_margin_css(layout: &PageLayout) -> String {
    let mut css = CssProperties::default();
    css.push_directional("padding", &layout.margin);
    css.to_style_attribute()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::style::{Color, TextStyle};

    #[test]
    fn test_directional_collapse() {
        let mut css = CssProperties::default();
        css.push_directional("margin", &DirectionalStyle::all(Measure::new(1.0, "cm")));
        assert_eq!(css.to_style_attribute(), "margin:1cm");
    }

    #[test]
    fn test_directional_per_side() {
        let mut css = CssProperties::default();
        let mut margin = DirectionalStyle::all(Measure::new(1.0, "cm"));
        margin.top = Some(Measure::new(2.0, "cm"));
        css.push_directional("margin", &margin);
        assert_eq!(
            css.to_style_attribute(),
            "margin-right:1cm;margin-top:2cm;margin-left:1cm;margin-bottom:1cm"
        );
    }

    #[test]
    fn test_text_css() {
        let style = ResolvedStyle {
            text: TextStyle {
                font_weight: Some(FontWeight::Bold),
                font_underline: Some(true),
                font_color: Some(Color::rgb(255, 0, 0)),
                ..Default::default()
            },
            ..Default::default()
        };
        let css = text_css(&style, &StyleRegistry::new());
        assert_eq!(css, "font-weight:bold;text-decoration:underline;color:#ff0000");
    }

    #[test]
    fn test_font_face_resolution() {
        let mut registry = StyleRegistry::new();
        registry.insert_font_face("F1".to_string(), "'Liberation Serif'".to_string());
        let style = ResolvedStyle {
            text: TextStyle {
                font_name: Some("F1".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(text_css(&style, &registry), "font-family:'Liberation Serif'");
    }

    #[test]
    fn test_page_css() {
        let layout = PageLayout {
            width: Some(Measure::new(21.0, "cm")),
            height: Some(Measure::new(29.7, "cm")),
            margin: DirectionalStyle::all(Measure::new(2.0, "cm")),
            ..Default::default()
        };
        assert_eq!(page_css(&layout, true), "width:21cm;min-height:29.7cm");
        assert_eq!(page_margin_css(&layout), "padding:2cm");
    }
}
