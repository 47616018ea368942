//! Office Open XML package handling: part discovery, the encrypted-in-CFB
//! envelope, and per-kind document parsing.

pub mod crypto;
pub mod presentation;
pub mod rels;
pub mod spreadsheet;
pub mod text;

use std::sync::Arc;

use crate::archive::zip::read_archive;
use crate::config::FileType;
use crate::doc::Document;
use crate::error::{OpenError, Result};
use crate::meta::EncryptionState;
use crate::vfs::{File, Filesystem, Path};

/// An OOXML package, either plain (from a ZIP) or the encrypted envelope
/// (from a CFB wrapper).
#[derive(Clone)]
pub struct OfficeOpenXmlFile {
    filesystem: Arc<dyn Filesystem>,
    file_type: FileType,
    encryption_state: EncryptionState,
}

impl OfficeOpenXmlFile {
    /// Probe a filesystem for the OOXML part contract.
    pub fn open(filesystem: Arc<dyn Filesystem>) -> Result<Self> {
        let probes = [
            ("/word/document.xml", FileType::OfficeOpenXmlDocument),
            ("/ppt/presentation.xml", FileType::OfficeOpenXmlPresentation),
            ("/xl/workbook.xml", FileType::OfficeOpenXmlWorkbook),
        ];
        for (part, file_type) in probes {
            if filesystem.is_file(&Path::new(part)?) {
                return Ok(Self {
                    filesystem,
                    file_type,
                    encryption_state: EncryptionState::NotEncrypted,
                });
            }
        }
        // encrypted envelope inside a CFB container
        if filesystem.is_file(&Path::new("/EncryptionInfo")?)
            && filesystem.is_file(&Path::new("/EncryptedPackage")?)
        {
            return Ok(Self {
                filesystem,
                file_type: FileType::OfficeOpenXmlEncrypted,
                encryption_state: EncryptionState::Encrypted,
            });
        }
        Err(OpenError::NoOfficeOpenXmlFile)
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    pub fn password_encrypted(&self) -> bool {
        self.encryption_state != EncryptionState::NotEncrypted
    }

    pub fn encryption_state(&self) -> EncryptionState {
        self.encryption_state
    }

    pub fn filesystem(&self) -> &Arc<dyn Filesystem> {
        &self.filesystem
    }

    /// Decrypt the envelope and re-open the inner package.
    ///
    /// A password rejected by the verifier is [`OpenError::WrongPassword`].
    pub fn decrypt(&mut self, password: &str) -> Result<bool> {
        if self.encryption_state != EncryptionState::Encrypted {
            return Err(OpenError::NotEncrypted);
        }
        let info_bytes = self
            .filesystem
            .open(&Path::new("/EncryptionInfo")?)?
            .bytes()?;
        let parameters = crypto::Ecma376Standard::parse(&info_bytes)?;
        let key = parameters.derive_key(password);
        if !parameters.verify(&key) {
            return Err(OpenError::WrongPassword);
        }

        let package_bytes = self
            .filesystem
            .open(&Path::new("/EncryptedPackage")?)?
            .bytes()?;
        let plain = parameters.decrypt_package(&package_bytes, &key)?;
        let archive = read_archive(&File::from_bytes(plain))?;
        let filesystem: Arc<dyn Filesystem> = Arc::new(archive.filesystem());

        let reopened = Self::open(filesystem)?;
        self.filesystem = reopened.filesystem;
        self.file_type = reopened.file_type;
        self.encryption_state = EncryptionState::Decrypted;
        Ok(true)
    }

    /// Parse the package into a document tree.
    pub fn document(&self) -> Result<Document> {
        match self.encryption_state {
            EncryptionState::Encrypted => Err(OpenError::FileEncrypted),
            _ => match self.file_type {
                FileType::OfficeOpenXmlDocument => text::parse_document(self.filesystem.as_ref()),
                FileType::OfficeOpenXmlPresentation => {
                    presentation::parse_document(self.filesystem.as_ref())
                }
                FileType::OfficeOpenXmlWorkbook => {
                    spreadsheet::parse_document(self.filesystem.as_ref())
                }
                _ => Err(OpenError::NoOfficeOpenXmlFile),
            },
        }
    }
}
