//! `META-INF/manifest.xml` interpretation: per-entry encryption records
//! (checksum, cipher, key derivation, start key) plus tracking of the
//! smallest encrypted entry, which is the one a password is verified
//! against.

use std::collections::HashMap;

use crate::crypto;
use crate::error::Result;
use crate::vfs::Path;
use crate::xml::XmlDocument;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChecksumType {
    #[default]
    Unknown,
    Sha1,
    Sha1_1k,
    Sha256_1k,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlgorithmType {
    #[default]
    Unknown,
    Aes256Cbc,
    TripleDesCbc,
    BlowfishCfb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyDerivationType {
    #[default]
    Unknown,
    Pbkdf2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartKeyType {
    #[default]
    Unknown,
    Sha1,
    Sha256,
}

/// The encryption record of one manifest file entry.
#[derive(Debug, Clone, Default)]
pub struct ManifestEntry {
    pub size: u64,
    pub checksum_type: ChecksumType,
    pub checksum: Vec<u8>,
    pub algorithm: AlgorithmType,
    pub initialisation_vector: Vec<u8>,
    pub key_derivation: KeyDerivationType,
    pub key_size: usize,
    pub key_iteration_count: u32,
    pub key_salt: Vec<u8>,
    pub start_key_type: StartKeyType,
    pub start_key_size: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Manifest {
    pub encrypted: bool,
    pub entries: HashMap<Path, ManifestEntry>,
    /// The encrypted entry with the smallest plaintext size.
    pub smallest_entry: Option<Path>,
}

fn checksum_type(value: &str) -> ChecksumType {
    match value {
        "SHA1" => ChecksumType::Sha1,
        "SHA1/1K" => ChecksumType::Sha1_1k,
        "urn:oasis:names:tc:opendocument:xmlns:manifest:1.0#sha256-1k" => ChecksumType::Sha256_1k,
        _ => ChecksumType::Unknown,
    }
}

fn algorithm_type(value: &str) -> AlgorithmType {
    match value {
        "http://www.w3.org/2001/04/xmlenc#aes256-cbc" => AlgorithmType::Aes256Cbc,
        // legacy producers leave the algorithm name empty for 3DES
        "" => AlgorithmType::TripleDesCbc,
        "Blowfish CFB" => AlgorithmType::BlowfishCfb,
        _ => AlgorithmType::Unknown,
    }
}

fn key_derivation_type(value: &str) -> KeyDerivationType {
    match value {
        "PBKDF2" => KeyDerivationType::Pbkdf2,
        _ => KeyDerivationType::Unknown,
    }
}

fn start_key_type(value: &str) -> StartKeyType {
    match value {
        "SHA1" => StartKeyType::Sha1,
        "http://www.w3.org/2000/09/xmldsig#sha256" => StartKeyType::Sha256,
        _ => StartKeyType::Unknown,
    }
}

/// Collect the encryption records of a parsed manifest.
pub fn parse_manifest(xml: &XmlDocument) -> Result<Manifest> {
    let mut manifest = Manifest::default();
    let root = xml.root();
    let mut smallest_size = u64::MAX;

    for file_entry in xml.children_by_name(root, "manifest:file-entry") {
        let Some(full_path) = xml.attribute(file_entry, "manifest:full-path") else {
            continue;
        };
        let Some(encryption_data) = xml.first_child_by_name(file_entry, "manifest:encryption-data")
        else {
            continue;
        };
        manifest.encrypted = true;

        let mut entry = ManifestEntry {
            size: xml
                .attribute(file_entry, "manifest:size")
                .and_then(|value| value.parse().ok())
                .unwrap_or(0),
            checksum_type: checksum_type(
                xml.attribute(encryption_data, "manifest:checksum-type")
                    .unwrap_or(""),
            ),
            checksum: crypto::base64_decode(
                xml.attribute(encryption_data, "manifest:checksum").unwrap_or(""),
            )
            .unwrap_or_default(),
            ..Default::default()
        };

        if let Some(algorithm) = xml.first_child_by_name(encryption_data, "manifest:algorithm") {
            entry.algorithm = algorithm_type(
                xml.attribute(algorithm, "manifest:algorithm-name").unwrap_or(""),
            );
            entry.initialisation_vector = crypto::base64_decode(
                xml.attribute(algorithm, "manifest:initialisation-vector")
                    .unwrap_or(""),
            )
            .unwrap_or_default();
        }

        if let Some(key_derivation) =
            xml.first_child_by_name(encryption_data, "manifest:key-derivation")
        {
            entry.key_derivation = key_derivation_type(
                xml.attribute(key_derivation, "manifest:key-derivation-name")
                    .unwrap_or(""),
            );
            entry.key_size = xml
                .attribute(key_derivation, "manifest:key-size")
                .and_then(|value| value.parse().ok())
                .unwrap_or(16);
            entry.key_iteration_count = xml
                .attribute(key_derivation, "manifest:iteration-count")
                .and_then(|value| value.parse().ok())
                .unwrap_or(0);
            entry.key_salt = crypto::base64_decode(
                xml.attribute(key_derivation, "manifest:salt").unwrap_or(""),
            )
            .unwrap_or_default();
        } else {
            entry.key_size = 16;
        }

        match xml.first_child_by_name(encryption_data, "manifest:start-key-generation") {
            Some(start_key) => {
                entry.start_key_type = start_key_type(
                    xml.attribute(start_key, "manifest:start-key-generation-name")
                        .unwrap_or(""),
                );
                entry.start_key_size = xml
                    .attribute(start_key, "manifest:key-size")
                    .and_then(|value| value.parse().ok())
                    .unwrap_or(20);
            }
            None => {
                entry.start_key_type = StartKeyType::Sha1;
                entry.start_key_size = 20;
            }
        }

        let path = Path::root().join(&Path::new(full_path)?)?;
        if entry.size < smallest_size {
            smallest_size = entry.size;
            manifest.smallest_entry = Some(path.clone());
        }
        manifest.entries.insert(path, entry);
    }

    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"<?xml version="1.0"?>
<manifest:manifest xmlns:manifest="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0">
 <manifest:file-entry manifest:full-path="/" manifest:media-type="application/vnd.oasis.opendocument.spreadsheet"/>
 <manifest:file-entry manifest:full-path="content.xml" manifest:size="4096">
  <manifest:encryption-data manifest:checksum-type="SHA1/1K" manifest:checksum="QUJD">
   <manifest:algorithm manifest:algorithm-name="http://www.w3.org/2001/04/xmlenc#aes256-cbc" manifest:initialisation-vector="QUJDREVGR0hJSktMTU5PUA=="/>
   <manifest:key-derivation manifest:key-derivation-name="PBKDF2" manifest:key-size="32" manifest:iteration-count="100000" manifest:salt="c2FsdHNhbHRzYWx0c2FsdA=="/>
   <manifest:start-key-generation manifest:start-key-generation-name="http://www.w3.org/2000/09/xmldsig#sha256" manifest:key-size="32"/>
  </manifest:encryption-data>
 </manifest:file-entry>
 <manifest:file-entry manifest:full-path="styles.xml" manifest:size="512">
  <manifest:encryption-data manifest:checksum-type="SHA1/1K" manifest:checksum="QUJD">
   <manifest:algorithm manifest:algorithm-name="" manifest:initialisation-vector="QUJDREVGR0g="/>
   <manifest:key-derivation manifest:key-derivation-name="PBKDF2" manifest:key-size="24" manifest:iteration-count="1024" manifest:salt="c2FsdA=="/>
  </manifest:encryption-data>
 </manifest:file-entry>
</manifest:manifest>"#;

    #[test]
    fn test_parse_records() {
        let xml = XmlDocument::parse(MANIFEST.as_bytes()).unwrap();
        let manifest = parse_manifest(&xml).unwrap();
        assert!(manifest.encrypted);
        assert_eq!(manifest.entries.len(), 2);

        let content = &manifest.entries[&Path::new("/content.xml").unwrap()];
        assert_eq!(content.checksum_type, ChecksumType::Sha1_1k);
        assert_eq!(content.algorithm, AlgorithmType::Aes256Cbc);
        assert_eq!(content.key_derivation, KeyDerivationType::Pbkdf2);
        assert_eq!(content.key_size, 32);
        assert_eq!(content.key_iteration_count, 100_000);
        assert_eq!(content.initialisation_vector.len(), 16);
        assert_eq!(content.start_key_type, StartKeyType::Sha256);
        assert_eq!(content.start_key_size, 32);
    }

    #[test]
    fn test_empty_algorithm_name_means_triple_des() {
        let xml = XmlDocument::parse(MANIFEST.as_bytes()).unwrap();
        let manifest = parse_manifest(&xml).unwrap();
        let styles = &manifest.entries[&Path::new("/styles.xml").unwrap()];
        assert_eq!(styles.algorithm, AlgorithmType::TripleDesCbc);
        // defaults apply when start-key-generation is missing
        assert_eq!(styles.start_key_type, StartKeyType::Sha1);
        assert_eq!(styles.start_key_size, 20);
    }

    #[test]
    fn test_smallest_entry_tracked() {
        let xml = XmlDocument::parse(MANIFEST.as_bytes()).unwrap();
        let manifest = parse_manifest(&xml).unwrap();
        assert_eq!(manifest.smallest_entry, Some(Path::new("/styles.xml").unwrap()));
    }

    #[test]
    fn test_unencrypted_manifest() {
        let xml = XmlDocument::parse(
            br#"<manifest:manifest><manifest:file-entry manifest:full-path="content.xml"/></manifest:manifest>"#,
        )
        .unwrap();
        let manifest = parse_manifest(&xml).unwrap();
        assert!(!manifest.encrypted);
        assert!(manifest.entries.is_empty());
        assert!(manifest.smallest_entry.is_none());
    }
}
