//! File-level metadata, serialized as `meta.json` next to the HTML output.

use serde::Serialize;

use crate::config::{FileCategory, FileType};
use crate::doc::DocumentKind;

/// Whether and how far a file's encryption has been dealt with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EncryptionState {
    Unknown,
    NotEncrypted,
    Encrypted,
    Decrypted,
}

/// Document-level facts, when the file is a document.
#[derive(Debug, Clone, Serialize, Default)]
pub struct DocumentMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_type: Option<DocumentKind>,
    /// Pages, slides, or sheets, when cheaply known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,
}

/// What the open strategy learned about a file.
#[derive(Debug, Clone, Serialize)]
pub struct FileMeta {
    pub file_type: FileType,
    pub file_category: FileCategory,
    pub password_encrypted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_meta: Option<DocumentMeta>,
}

impl FileMeta {
    pub fn new(file_type: FileType) -> Self {
        Self {
            file_type,
            file_category: file_type.category(),
            password_encrypted: false,
            document_meta: None,
        }
    }
}
