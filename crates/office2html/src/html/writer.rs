//! A small HTML writer with indentation, a close-tag stack, and an inline
//! mode that suppresses line breaks inside phrasing content.

const VOID_TAGS: &[&str] = &["br", "col", "img", "hr", "meta", "link"];

pub struct HtmlWriter {
    out: String,
    format: bool,
    indent: u8,
    stack: Vec<&'static str>,
    inline_depth: u32,
}

impl HtmlWriter {
    pub fn new(format: bool, indent: u8) -> Self {
        Self {
            out: String::new(),
            format,
            indent,
            stack: Vec::new(),
            inline_depth: 0,
        }
    }

    fn newline(&mut self) {
        if self.format && self.inline_depth == 0 {
            self.out.push('\n');
            for _ in 0..self.stack.len() * self.indent as usize {
                self.out.push(' ');
            }
        }
    }

    fn write_tag(&mut self, tag: &str, attributes: &[(&str, String)], close: bool) {
        self.out.push('<');
        self.out.push_str(tag);
        for (name, value) in attributes {
            if value.is_empty() && *name != "alt" {
                continue;
            }
            self.out.push(' ');
            self.out.push_str(name);
            self.out.push_str("=\"");
            self.out.push_str(&escape_attribute(value));
            self.out.push('"');
        }
        if close {
            self.out.push('/');
        }
        self.out.push('>');
    }

    /// Open a block element.
    pub fn open(&mut self, tag: &'static str, attributes: &[(&str, String)]) {
        debug_assert!(!VOID_TAGS.contains(&tag));
        self.newline();
        self.write_tag(tag, attributes, false);
        self.stack.push(tag);
    }

    /// Open an inline element: content up to the matching close stays on
    /// one line.
    pub fn open_inline(&mut self, tag: &'static str, attributes: &[(&str, String)]) {
        self.newline();
        self.write_tag(tag, attributes, false);
        self.stack.push(tag);
        self.inline_depth += 1;
    }

    pub fn close(&mut self) {
        let tag = self.stack.pop().expect("close without open");
        if self.inline_depth > 0 {
            self.inline_depth -= 1;
        } else {
            self.newline();
        }
        self.out.push_str("</");
        self.out.push_str(tag);
        self.out.push('>');
    }

    /// A self-closing element.
    pub fn void(&mut self, tag: &'static str, attributes: &[(&str, String)]) {
        if self.inline_depth == 0 {
            self.newline();
        }
        self.write_tag(tag, attributes, true);
    }

    pub fn text(&mut self, text: &str) {
        self.out.push_str(&escape_text(text));
    }

    /// Pre-escaped or intentionally raw markup.
    pub fn raw(&mut self, markup: &str) {
        self.out.push_str(markup);
    }

    pub fn finish(mut self) -> String {
        while !self.stack.is_empty() {
            self.close();
        }
        self.out
    }
}

pub fn escape_text(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            other => result.push(other),
        }
    }
    result
}

pub fn escape_attribute(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            other => result.push(other),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unformatted_output() {
        let mut writer = HtmlWriter::new(false, 0);
        writer.open("div", &[("class", "page".to_string())]);
        writer.open_inline("span", &[]);
        writer.text("a < b");
        writer.close();
        writer.close();
        assert_eq!(
            writer.finish(),
            r#"<div class="page"><span>a &lt; b</span></div>"#
        );
    }

    #[test]
    fn test_formatted_output_indents_blocks_only() {
        let mut writer = HtmlWriter::new(true, 2);
        writer.open("div", &[]);
        writer.open("p", &[]);
        writer.open_inline("span", &[]);
        writer.text("x");
        writer.void("br", &[]);
        writer.text("y");
        writer.close();
        writer.close();
        writer.close();
        let html = writer.finish();
        assert!(html.contains("\n  <p>"));
        // inline content stays on one line
        assert!(html.contains("<span>x<br/>y</span>"));
    }

    #[test]
    fn test_empty_attributes_skipped() {
        let mut writer = HtmlWriter::new(false, 0);
        writer.open("p", &[("style", String::new())]);
        writer.close();
        assert_eq!(writer.finish(), "<p></p>");
    }

    #[test]
    fn test_finish_closes_open_tags() {
        let mut writer = HtmlWriter::new(false, 0);
        writer.open("div", &[]);
        writer.open("p", &[]);
        assert_eq!(writer.finish(), "<div><p></p></div>");
    }

    #[test]
    fn test_attribute_escaping() {
        let mut writer = HtmlWriter::new(false, 0);
        writer.void("img", &[("alt", "a \"b\"".to_string())]);
        assert_eq!(writer.finish(), r#"<img alt="a &quot;b&quot;"/>"#);
    }
}
