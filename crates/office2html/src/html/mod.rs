//! HTML translation: document walks, the sheet grid renderer, style to
//! CSS, and the on-disk output layout (one directory per translated file,
//! one HTML document per logical page, `meta.json`, optional `resources/`).

pub mod document;
pub mod sheet;
pub mod style;
pub mod writer;

use crate::config::{FileType, HtmlOptions};
use crate::doc::Document;
use crate::error::{OpenError, Result};
use crate::meta::FileMeta;
use crate::text::{CsvFile, JsonFile, TextFile};
use crate::vfs::{File, Filesystem};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use writer::{HtmlWriter, escape_text};

/// One translated logical page.
#[derive(Debug, Clone)]
pub struct HtmlPage {
    /// Page stem used for the output file name.
    pub name: String,
    /// A complete HTML document.
    pub html: String,
}

/// Pages plus any staged external resources.
#[derive(Debug, Clone, Default)]
pub struct HtmlOutput {
    pub pages: Vec<HtmlPage>,
    /// Relative resource path to contents, staged under `resources/`.
    pub resources: Vec<(String, Vec<u8>)>,
}

/// The shared stylesheet; embedded or written to `resources/`.
pub const STYLESHEET: &str = "\
html { font-family: sans-serif; }\n\
body { margin: 0; background: #e5e5e5; }\n\
.page { background: #fff; margin: 8px auto; box-shadow: 0 1px 3px rgba(0,0,0,.3); box-sizing: border-box; }\n\
.content { box-sizing: border-box; }\n\
table { border-collapse: collapse; }\n\
table.sheet th { background: #f2f2f2; font-weight: normal; border: 1px solid #ccc; min-width: 2em; }\n\
table.sheet td { border: 1px solid #eee; }\n\
p { margin: 0; min-height: 1em; }\n";

const STYLESHEET_NAME: &str = "odf.css";

fn page_shell(title: &str, body: &str, options: &HtmlOptions) -> String {
    let head_style = if options.embed_resources {
        format!("<style>{STYLESHEET}</style>")
    } else {
        let base = if options.relative_resource_paths {
            "resources".to_string()
        } else {
            options.external_resource_path.clone()
        };
        format!(r#"<link rel="stylesheet" href="{base}/{STYLESHEET_NAME}"/>"#)
    };
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\"/>\n<title>{}</title>\n{}\n</head>\n<body>\n{}\n</body>\n</html>\n",
        escape_text(title),
        head_style,
        body
    )
}

fn wrap_pages(mut output: HtmlOutput, options: &HtmlOptions) -> HtmlOutput {
    for page in &mut output.pages {
        page.html = page_shell(&page.name, &page.html, options);
    }
    if !options.embed_resources {
        output
            .resources
            .push((STYLESHEET_NAME.to_string(), STYLESHEET.as_bytes().to_vec()));
    }
    output
}

/// Translate a decoded document into HTML pages.
pub fn translate_document(
    document: &Document,
    package: Option<&dyn Filesystem>,
    options: &HtmlOptions,
) -> Result<HtmlOutput> {
    let output = document::Translator::new(document, package, options).translate()?;
    Ok(wrap_pages(output, options))
}

/// Translate a plain text file.
pub fn translate_text(text: &TextFile, options: &HtmlOptions) -> HtmlOutput {
    let mut writer = HtmlWriter::new(options.format_html, options.html_indent);
    writer.open("div", &[("class", "page".to_string())]);
    writer.open("pre", &[]);
    writer.text(&text.content);
    writer.close();
    writer.close();
    wrap_pages(
        HtmlOutput {
            pages: vec![HtmlPage {
                name: "text".to_string(),
                html: writer.finish(),
            }],
            resources: Vec::new(),
        },
        options,
    )
}

/// Translate a CSV file as one table.
pub fn translate_csv(csv: &CsvFile, options: &HtmlOptions) -> HtmlOutput {
    let mut writer = HtmlWriter::new(options.format_html, options.html_indent);
    writer.open("div", &[("class", "page".to_string())]);
    writer.open("table", &[]);
    for row in &csv.rows {
        writer.open("tr", &[]);
        for field in row {
            writer.open_inline("td", &[]);
            writer.text(field);
            writer.close();
        }
        writer.close();
    }
    writer.close();
    writer.close();
    wrap_pages(
        HtmlOutput {
            pages: vec![HtmlPage {
                name: "sheet".to_string(),
                html: writer.finish(),
            }],
            resources: Vec::new(),
        },
        options,
    )
}

/// Translate a JSON file as a pretty-printed block.
pub fn translate_json(json: &JsonFile, options: &HtmlOptions) -> HtmlOutput {
    let pretty = serde_json::to_string_pretty(&json.value).unwrap_or_default();
    let mut writer = HtmlWriter::new(options.format_html, options.html_indent);
    writer.open("div", &[("class", "page".to_string())]);
    writer.open("pre", &[]);
    writer.text(&pretty);
    writer.close();
    writer.close();
    wrap_pages(
        HtmlOutput {
            pages: vec![HtmlPage {
                name: "data".to_string(),
                html: writer.finish(),
            }],
            resources: Vec::new(),
        },
        options,
    )
}

/// Translate an image file as a single page with the image inlined.
pub fn translate_image(file: &File, file_type: FileType, options: &HtmlOptions) -> Result<HtmlOutput> {
    let data = file.bytes()?;
    let mime = match file_type {
        FileType::PortableNetworkGraphics => "image/png",
        FileType::Jpeg => "image/jpeg",
        FileType::GraphicsInterchangeFormat => "image/gif",
        FileType::BitmapImageFile => "image/bmp",
        _ => "application/octet-stream",
    };
    let mut writer = HtmlWriter::new(options.format_html, options.html_indent);
    writer.open("div", &[("class", "page".to_string())]);
    writer.void(
        "img",
        &[
            (
                "src",
                format!("data:{mime};base64,{}", BASE64.encode(data.as_slice())),
            ),
            ("alt", String::new()),
        ],
    );
    writer.close();
    Ok(wrap_pages(
        HtmlOutput {
            pages: vec![HtmlPage {
                name: "image".to_string(),
                html: writer.finish(),
            }],
            resources: Vec::new(),
        },
        options,
    ))
}

/// Write pages, `meta.json`, and staged resources into a directory.
pub fn write_output(
    directory: &std::path::Path,
    output: &HtmlOutput,
    meta: &FileMeta,
) -> Result<()> {
    std::fs::create_dir_all(directory).map_err(|e| OpenError::FileWriteError(e.to_string()))?;
    for page in &output.pages {
        let file_name = format!("{}.html", sanitize_name(&page.name));
        std::fs::write(directory.join(file_name), &page.html)
            .map_err(|e| OpenError::FileWriteError(e.to_string()))?;
    }
    let meta_json =
        serde_json::to_vec_pretty(meta).map_err(|e| OpenError::FileWriteError(e.to_string()))?;
    std::fs::write(directory.join("meta.json"), meta_json)
        .map_err(|e| OpenError::FileWriteError(e.to_string()))?;
    for (name, data) in &output.resources {
        let target = directory.join("resources").join(name);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| OpenError::FileWriteError(e.to_string()))?;
        }
        std::fs::write(target, data).map_err(|e| OpenError::FileWriteError(e.to_string()))?;
    }
    Ok(())
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_shell_embeds_stylesheet() {
        let html = page_shell("t", "<p>x</p>", &HtmlOptions::default());
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<style>"));
        assert!(html.contains("<p>x</p>"));
    }

    #[test]
    fn test_page_shell_links_external_resources() {
        let options = HtmlOptions {
            embed_resources: false,
            ..Default::default()
        };
        let html = page_shell("t", "", &options);
        assert!(html.contains(r#"href="resources/odf.css""#));
    }

    #[test]
    fn test_translate_text_and_csv() {
        let text = TextFile {
            file_type: FileType::TextFile,
            content: "a < b".to_string(),
        };
        let output = translate_text(&text, &HtmlOptions::default());
        assert!(output.pages[0].html.contains("a &lt; b"));

        let csv = CsvFile {
            rows: vec![vec!["x".to_string(), "y".to_string()]],
        };
        let output = translate_csv(&csv, &HtmlOptions::default());
        assert!(output.pages[0].html.contains("<td>x</td><td>y</td>"));
    }

    #[test]
    fn test_write_output_layout() {
        let dir = tempfile::tempdir().unwrap();
        let output = HtmlOutput {
            pages: vec![HtmlPage {
                name: "Sheet 1".to_string(),
                html: "<html/>".to_string(),
            }],
            resources: vec![("odf.css".to_string(), b"css".to_vec())],
        };
        let meta = FileMeta::new(FileType::OpendocumentSpreadsheet);
        write_output(dir.path(), &output, &meta).unwrap();
        assert!(dir.path().join("Sheet_1.html").exists());
        assert!(dir.path().join("meta.json").exists());
        assert!(dir.path().join("resources/odf.css").exists());
    }
}
