//! Magic-byte classification.
//!
//! Container formats (ZIP, CFB) are refined further by the open strategy,
//! which peeks inside; this module only answers what the leading bytes say.

use crate::config::FileType;
use crate::error::Result;
use crate::vfs::File;

/// A magic pattern: expected byte values, `None` for wildcard positions.
struct Pattern(&'static [Option<u8>]);

const fn b(value: u8) -> Option<u8> {
    Some(value)
}

const ANY: Option<u8> = None;

static PATTERNS: &[(FileType, Pattern)] = &[
    (FileType::Zip, Pattern(&[b(0x50), b(0x4B), b(0x03), b(0x04)])),
    (
        FileType::CompoundFileBinaryFormat,
        Pattern(&[
            b(0xD0),
            b(0xCF),
            b(0x11),
            b(0xE0),
            b(0xA1),
            b(0xB1),
            b(0x1A),
            b(0xE1),
        ]),
    ),
    (
        FileType::PortableDocumentFormat,
        Pattern(&[b(0x25), b(0x50), b(0x44), b(0x46), b(0x2D)]),
    ),
    (
        FileType::PortableNetworkGraphics,
        Pattern(&[
            b(0x89),
            b(0x50),
            b(0x4E),
            b(0x47),
            b(0x0D),
            b(0x0A),
            b(0x1A),
            b(0x0A),
        ]),
    ),
    (FileType::Jpeg, Pattern(&[b(0xFF), b(0xD8), b(0xFF), b(0xDB)])),
    (
        FileType::Jpeg,
        Pattern(&[
            b(0xFF),
            b(0xD8),
            b(0xFF),
            b(0xE0),
            b(0x00),
            b(0x10),
            b(0x4A),
            b(0x46),
            b(0x49),
            b(0x46),
            b(0x00),
            b(0x01),
        ]),
    ),
    (FileType::Jpeg, Pattern(&[b(0xFF), b(0xD8), b(0xFF), b(0xEE)])),
    (
        FileType::Jpeg,
        Pattern(&[
            b(0xFF),
            b(0xD8),
            b(0xFF),
            b(0xE1),
            ANY,
            ANY,
            b(0x45),
            b(0x78),
            b(0x69),
            b(0x66),
            b(0x00),
            b(0x00),
        ]),
    ),
    (FileType::BitmapImageFile, Pattern(&[b(0x42), b(0x4D)])),
    (
        FileType::GraphicsInterchangeFormat,
        Pattern(&[b(0x47), b(0x49), b(0x46), b(0x38), b(0x37), b(0x61)]),
    ),
    (
        FileType::GraphicsInterchangeFormat,
        Pattern(&[b(0x47), b(0x49), b(0x46), b(0x38), b(0x39), b(0x61)]),
    ),
    (
        FileType::StarviewMetafile,
        Pattern(&[b(0x56), b(0x43), b(0x4C), b(0x4D), b(0x54), b(0x46)]),
    ),
    (
        FileType::RichTextFormat,
        Pattern(&[b(0x7B), b(0x5C), b(0x72), b(0x74), b(0x66), b(0x31)]),
    ),
    (
        FileType::WordPerfect,
        Pattern(&[b(0xFF), b(0x57), b(0x50), b(0x43)]),
    ),
];

fn matches(head: &[u8], pattern: &Pattern) -> bool {
    pattern.0.len() <= head.len()
        && pattern
            .0
            .iter()
            .zip(head)
            .all(|(expected, actual)| expected.is_none_or(|value| value == *actual))
}

/// Classify leading bytes.
pub fn file_type(head: &[u8]) -> FileType {
    for (file_type, pattern) in PATTERNS {
        if matches(head, pattern) {
            return *file_type;
        }
    }
    FileType::Unknown
}

/// Classify a file by its first bytes.
pub fn file_type_of(file: &File) -> Result<FileType> {
    let data = file.bytes()?;
    let head = &data[..data.len().min(12)];
    Ok(file_type(head))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_magic() {
        assert_eq!(file_type(b"PK\x03\x04rest"), FileType::Zip);
        assert_eq!(
            file_type(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1, 0x00]),
            FileType::CompoundFileBinaryFormat
        );
        assert_eq!(file_type(b"%PDF-1.7"), FileType::PortableDocumentFormat);
    }

    #[test]
    fn test_image_magic() {
        assert_eq!(
            file_type(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]),
            FileType::PortableNetworkGraphics
        );
        assert_eq!(file_type(b"GIF89a..."), FileType::GraphicsInterchangeFormat);
        assert_eq!(file_type(b"BM...."), FileType::BitmapImageFile);
        assert_eq!(file_type(&[0xFF, 0xD8, 0xFF, 0xDB]), FileType::Jpeg);
    }

    #[test]
    fn test_jpeg_exif_wildcard_positions() {
        let head = [
            0xFF, 0xD8, 0xFF, 0xE1, 0x12, 0x34, 0x45, 0x78, 0x69, 0x66, 0x00, 0x00,
        ];
        assert_eq!(file_type(&head), FileType::Jpeg);
    }

    #[test]
    fn test_text_formats() {
        assert_eq!(file_type(b"{\\rtf1\\ansi"), FileType::RichTextFormat);
        assert_eq!(file_type(b"plain old text"), FileType::Unknown);
    }

    #[test]
    fn test_short_head() {
        assert_eq!(file_type(b"PK"), FileType::Unknown);
        assert_eq!(file_type(b""), FileType::Unknown);
    }
}
