//! Plain-text family decoders: charset-checked text, CSV, and JSON.

use encoding_rs::{UTF_8, UTF_16BE, UTF_16LE};

use crate::config::FileType;
use crate::error::{OpenError, Result};
use crate::vfs::File;

/// A text file with a decoded body.
#[derive(Debug, Clone)]
pub struct TextFile {
    pub file_type: FileType,
    pub content: String,
}

impl TextFile {
    /// Decode a byte stream as text. BOMs select UTF-16; otherwise the
    /// bytes must be valid UTF-8.
    pub fn open(file: &File, file_type: FileType) -> Result<Self> {
        let bytes = file.bytes()?;
        let content = decode_text(&bytes)?;
        Ok(Self { file_type, content })
    }
}

fn decode_text(bytes: &[u8]) -> Result<String> {
    let encoding = match bytes {
        [0xFF, 0xFE, ..] => UTF_16LE,
        [0xFE, 0xFF, ..] => UTF_16BE,
        _ => UTF_8,
    };
    let (decoded, _, malformed) = encoding.decode(bytes);
    if malformed {
        return Err(OpenError::UnknownCharset);
    }
    Ok(decoded.into_owned())
}

/// A CSV file split into rows and fields.
#[derive(Debug, Clone)]
pub struct CsvFile {
    pub rows: Vec<Vec<String>>,
}

impl CsvFile {
    pub fn open(file: &File) -> Result<Self> {
        let text = TextFile::open(file, FileType::CommaSeparatedValues)
            .map_err(|_| OpenError::NoCsvFile)?;
        Ok(Self {
            rows: parse_csv(&text.content),
        })
    }
}

/// Minimal CSV splitting with double-quote escaping.
fn parse_csv(content: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    quoted = false;
                }
            }
            '"' if field.is_empty() => quoted = true,
            ',' if !quoted => {
                row.push(std::mem::take(&mut field));
            }
            '\r' if !quoted => {}
            '\n' if !quoted => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            other => field.push(other),
        }
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }
    rows
}

/// A JSON file validated against the grammar.
#[derive(Debug, Clone)]
pub struct JsonFile {
    pub value: serde_json::Value,
}

impl JsonFile {
    pub fn open(file: &File) -> Result<Self> {
        let bytes = file.bytes()?;
        let value = serde_json::from_slice(&bytes).map_err(|_| OpenError::NoJsonFile)?;
        Ok(Self { value })
    }
}
