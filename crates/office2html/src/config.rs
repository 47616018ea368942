use serde::Serialize;

/// Every file type the probe can emit.
///
/// The names are stable; `meta.json` serializes them in snake case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    Unknown,
    Zip,
    CompoundFileBinaryFormat,
    PortableDocumentFormat,
    OpendocumentText,
    OpendocumentPresentation,
    OpendocumentSpreadsheet,
    OpendocumentGraphics,
    OfficeOpenXmlDocument,
    OfficeOpenXmlPresentation,
    OfficeOpenXmlWorkbook,
    OfficeOpenXmlEncrypted,
    LegacyWordDocument,
    LegacyPowerpointPresentation,
    LegacyExcelWorksheets,
    RichTextFormat,
    TextFile,
    CommaSeparatedValues,
    JavascriptObjectNotation,
    Markdown,
    PortableNetworkGraphics,
    GraphicsInterchangeFormat,
    Jpeg,
    BitmapImageFile,
    StarviewMetafile,
    WordPerfect,
}

impl FileType {
    /// Detect a file type from a file extension.
    ///
    /// Both OpenDocument and the legacy StarOffice extensions map to the
    /// OpenDocument types (`odt`/`sxw`, `odp`/`sxi`, `ods`/`sxc`,
    /// `odg`/`sxd`).
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "zip" => Self::Zip,
            "cfb" => Self::CompoundFileBinaryFormat,
            "pdf" => Self::PortableDocumentFormat,
            "odt" | "sxw" => Self::OpendocumentText,
            "odp" | "sxi" => Self::OpendocumentPresentation,
            "ods" | "sxc" => Self::OpendocumentSpreadsheet,
            "odg" | "sxd" => Self::OpendocumentGraphics,
            "docx" => Self::OfficeOpenXmlDocument,
            "pptx" => Self::OfficeOpenXmlPresentation,
            "xlsx" => Self::OfficeOpenXmlWorkbook,
            "doc" => Self::LegacyWordDocument,
            "ppt" => Self::LegacyPowerpointPresentation,
            "xls" => Self::LegacyExcelWorksheets,
            "rtf" => Self::RichTextFormat,
            "txt" => Self::TextFile,
            "csv" => Self::CommaSeparatedValues,
            "json" => Self::JavascriptObjectNotation,
            "md" => Self::Markdown,
            "png" => Self::PortableNetworkGraphics,
            "gif" => Self::GraphicsInterchangeFormat,
            "jpg" | "jpeg" => Self::Jpeg,
            "bmp" => Self::BitmapImageFile,
            "svm" => Self::StarviewMetafile,
            "wpd" => Self::WordPerfect,
            _ => Self::Unknown,
        }
    }

    /// The broad category the type belongs to.
    pub fn category(self) -> FileCategory {
        match self {
            Self::Zip | Self::CompoundFileBinaryFormat => FileCategory::Archive,
            Self::OpendocumentText
            | Self::OpendocumentPresentation
            | Self::OpendocumentSpreadsheet
            | Self::OpendocumentGraphics
            | Self::OfficeOpenXmlDocument
            | Self::OfficeOpenXmlPresentation
            | Self::OfficeOpenXmlWorkbook
            | Self::OfficeOpenXmlEncrypted
            | Self::LegacyWordDocument
            | Self::LegacyPowerpointPresentation
            | Self::LegacyExcelWorksheets
            | Self::RichTextFormat
            | Self::PortableDocumentFormat => FileCategory::Document,
            Self::PortableNetworkGraphics
            | Self::GraphicsInterchangeFormat
            | Self::Jpeg
            | Self::BitmapImageFile
            | Self::StarviewMetafile => FileCategory::Image,
            Self::TextFile
            | Self::CommaSeparatedValues
            | Self::JavascriptObjectNotation
            | Self::Markdown => FileCategory::Text,
            Self::Unknown | Self::WordPerfect => FileCategory::Unknown,
        }
    }
}

/// Broad grouping of [`FileType`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCategory {
    Unknown,
    Archive,
    Document,
    Image,
    Text,
}

/// Which decoder engine an open call should use.
///
/// `Native` is the first-party decoder in this crate. The PDF and legacy
/// Word engines are external collaborators; selecting them for a file the
/// collaborator cannot handle yields `UnsupportedDecoderEngine`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodePreference {
    #[default]
    Native,
    Pdf2Htmlex,
    WvWare,
}

impl DecodePreference {
    /// Parse an engine name as given on the command line.
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_ascii_lowercase().as_str() {
            "native" => Ok(Self::Native),
            "pdf2htmlex" => Ok(Self::Pdf2Htmlex),
            "wvware" => Ok(Self::WvWare),
            _ => Err(format!("unknown decoder engine: {s}")),
        }
    }
}

/// Options controlling HTML translation.
#[derive(Debug, Clone)]
pub struct HtmlOptions {
    /// Inline all resources (stylesheet, images) into the emitted HTML.
    /// When `false`, a `resources/` directory is written next to the pages.
    pub embed_resources: bool,
    /// Root for shared resources when they are not embedded.
    pub external_resource_path: String,
    /// Reference external resources with relative instead of absolute paths.
    pub relative_resource_paths: bool,
    /// Emit `data-path` attributes so text edits can be diffed back.
    pub editable: bool,
    /// Clamp spreadsheet expansion to at most `(rows, columns)`.
    pub spreadsheet_limit: Option<(u32, u32)>,
    /// Shrink the rendered sheet to the bounding box of non-empty cells
    /// before applying `spreadsheet_limit`.
    pub spreadsheet_limit_by_content: bool,
    /// First logical page/slide/sheet to translate (0-based).
    pub entry_offset: u32,
    /// Number of logical pages to translate. `0` means all remaining.
    pub entry_count: u32,
    /// Render text-document page margins.
    pub text_document_margin: bool,
    /// Pretty-print the HTML output.
    pub format_html: bool,
    /// Indentation width used when `format_html` is set.
    pub html_indent: u8,
}

impl Default for HtmlOptions {
    fn default() -> Self {
        Self {
            embed_resources: true,
            external_resource_path: String::new(),
            relative_resource_paths: true,
            editable: false,
            spreadsheet_limit: Some((10_000, 500)),
            spreadsheet_limit_by_content: true,
            entry_offset: 0,
            entry_count: 0,
            text_document_margin: true,
            format_html: false,
            html_indent: 2,
        }
    }
}
