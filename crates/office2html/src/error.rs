use thiserror::Error;

use crate::config::{DecodePreference, FileType};

/// Errors that can occur while probing, decoding, decrypting, or translating
/// a document.
///
/// Codec-level "this is not my format" failures are the `No*File` variants;
/// the open strategy treats those as a failed probe and moves on to the next
/// candidate. Everything else bubbles out to the caller.
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("file not found")]
    FileNotFound,

    #[error("file read error: {0}")]
    FileReadError(#[from] std::io::Error),

    #[error("file write error: {0}")]
    FileWriteError(String),

    #[error("unsupported operation")]
    UnsupportedOperation,

    #[error("unknown file type")]
    UnknownFileType,

    #[error("unsupported file type: {0:?}")]
    UnsupportedFileType(FileType),

    #[error("unknown decoder engine: {0}")]
    UnknownDecoderEngine(String),

    #[error("unsupported decoder engine: {0:?}")]
    UnsupportedDecoderEngine(DecodePreference),

    #[error("no ZIP file")]
    NoZipFile,

    #[error("ZIP save error: {0}")]
    ZipSaveError(String),

    #[error("no CFB file")]
    NoCfbFile,

    #[error("CFB file corrupted: {0}")]
    CfbFileCorrupted(String),

    #[error("no OpenDocument file")]
    NoOpenDocumentFile,

    #[error("no Office Open XML file")]
    NoOfficeOpenXmlFile,

    #[error("no legacy Microsoft file")]
    NoLegacyMicrosoftFile,

    #[error("no PDF file")]
    NoPdfFile,

    #[error("no image file")]
    NoImageFile,

    #[error("no archive file")]
    NoArchiveFile,

    #[error("no document file")]
    NoDocumentFile,

    #[error("no XML file: {0}")]
    NoXmlFile(String),

    #[error("no CSV file")]
    NoCsvFile,

    #[error("no JSON file")]
    NoJsonFile,

    #[error("no text file")]
    NoTextFile,

    #[error("unknown charset")]
    UnknownCharset,

    #[error("unsupported crypto algorithm: {0}")]
    UnsupportedCryptoAlgorithm(String),

    #[error("unsupported endian")]
    UnsupportedEndian,

    #[error("wrong password")]
    WrongPassword,

    #[error("decryption failed")]
    DecryptionFailed,

    #[error("file is not encrypted")]
    NotEncrypted,

    #[error("file is encrypted; decrypt it first")]
    FileEncrypted,

    #[error("document is copy protected")]
    DocumentCopyProtected,

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("invalid prefix: {0}")]
    InvalidPrefix(String),

    #[error("prefix in use: {0}")]
    PrefixInUse(String),

    #[error("null pointer")]
    NullPointer,

    #[error("unsupported option: {0}")]
    UnsupportedOption(String),

    #[error("resource not accessible: {0}")]
    ResourceNotAccessible(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, OpenError>;
