//! Legacy Microsoft Office files (Word/PowerPoint/Excel in a CFB
//! container). Detection and metadata are native; content decoding is
//! delegated to an external engine, so `document()` is not available here.

use std::sync::Arc;

use crate::config::FileType;
use crate::error::{OpenError, Result};
use crate::meta::EncryptionState;
use crate::vfs::{Filesystem, Path};

#[derive(Clone)]
pub struct LegacyMicrosoftFile {
    filesystem: Arc<dyn Filesystem>,
    file_type: FileType,
}

impl LegacyMicrosoftFile {
    /// Probe a CFB-backed filesystem for the legacy Office streams.
    pub fn open(filesystem: Arc<dyn Filesystem>) -> Result<Self> {
        let probes = [
            ("/WordDocument", FileType::LegacyWordDocument),
            ("/PowerPoint Document", FileType::LegacyPowerpointPresentation),
            ("/Workbook", FileType::LegacyExcelWorksheets),
            ("/Book", FileType::LegacyExcelWorksheets),
        ];
        for (stream, file_type) in probes {
            if filesystem.is_file(&Path::new(stream)?) {
                return Ok(Self {
                    filesystem,
                    file_type,
                });
            }
        }
        Err(OpenError::NoLegacyMicrosoftFile)
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    /// Legacy containers do not announce encryption in a way this probe
    /// reads, so the state stays unknown until an engine looks closer.
    pub fn encryption_state(&self) -> EncryptionState {
        EncryptionState::Unknown
    }

    pub fn filesystem(&self) -> &Arc<dyn Filesystem> {
        &self.filesystem
    }

    /// Accepts a password but never claims success: decryption of the
    /// legacy variants is left to the delegated engine.
    pub fn decrypt(&mut self, _password: &str) -> Result<bool> {
        Ok(false)
    }
}
