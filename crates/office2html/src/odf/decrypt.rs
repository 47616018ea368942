//! Manifest-driven decryption of ODF package entries.
//!
//! Per entry: hash the password into a start key, PBKDF2 it with the entry
//! salt, decrypt with the declared cipher, then raw-inflate. The entry
//! checksum is computed over the deflated bytes minus the cipher padding,
//! which is why the inflater reports its trailing pad count.

use tracing::debug;

use crate::crypto;
use crate::error::{OpenError, Result};
use crate::vfs::{File, Filesystem, MemoryFilesystem, Path};

use super::manifest::{
    AlgorithmType, ChecksumType, KeyDerivationType, Manifest, ManifestEntry, StartKeyType,
};

/// Whether the declared parameters are ones the pipeline can execute.
///
/// Ciphers are never invoked with keys shorter than their declared size.
pub fn can_decrypt(entry: &ManifestEntry) -> bool {
    if entry.key_derivation != KeyDerivationType::Pbkdf2 {
        return false;
    }
    if entry.start_key_type == StartKeyType::Unknown {
        return false;
    }
    let start_key_available = match entry.start_key_type {
        StartKeyType::Sha1 => 20,
        StartKeyType::Sha256 => 32,
        StartKeyType::Unknown => 0,
    };
    if entry.start_key_size > start_key_available {
        return false;
    }
    match entry.algorithm {
        AlgorithmType::Aes256Cbc => entry.key_size == 32,
        AlgorithmType::TripleDesCbc => entry.key_size == 24,
        AlgorithmType::BlowfishCfb => entry.key_size >= 1 && entry.key_size <= 56,
        AlgorithmType::Unknown => false,
    }
}

fn start_key(entry: &ManifestEntry, password: &str) -> Vec<u8> {
    let hash: Vec<u8> = match entry.start_key_type {
        StartKeyType::Sha256 => crypto::sha256(password.as_bytes()).to_vec(),
        _ => crypto::sha1(password.as_bytes()).to_vec(),
    };
    hash[..entry.start_key_size.min(hash.len())].to_vec()
}

/// Decrypt and inflate one entry. The result is unverified; callers check
/// [`verify`] against the manifest checksum.
pub fn decrypt_entry(entry: &ManifestEntry, password: &str, ciphertext: &[u8]) -> Result<Vec<u8>> {
    if !can_decrypt(entry) {
        return Err(OpenError::UnsupportedCryptoAlgorithm(format!(
            "{:?}/{:?}",
            entry.algorithm, entry.key_derivation
        )));
    }
    let deflated = decrypt_deflated(entry, password, ciphertext)?;
    let (plaintext, _padding) = crypto::inflate_raw(&deflated)?;
    Ok(plaintext)
}

/// Check a decrypted-but-still-deflated body against the manifest checksum.
///
/// `deflated` must include the cipher padding; the padding length reported
/// by the inflater is subtracted before hashing.
pub fn verify(entry: &ManifestEntry, deflated: &[u8], padding: usize) -> bool {
    let body = &deflated[..deflated.len().saturating_sub(padding)];
    let digest: Vec<u8> = match entry.checksum_type {
        ChecksumType::Sha1 => crypto::sha1(body).to_vec(),
        ChecksumType::Sha1_1k => crypto::sha1(&body[..body.len().min(1024)]).to_vec(),
        ChecksumType::Sha256_1k => crypto::sha256(&body[..body.len().min(1024)]).to_vec(),
        ChecksumType::Unknown => return false,
    };
    digest == entry.checksum
}

fn decrypt_deflated(
    entry: &ManifestEntry,
    password: &str,
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    let start = start_key(entry, password);
    let key = crypto::pbkdf2_hmac_sha1(
        &start,
        &entry.key_salt,
        entry.key_iteration_count,
        entry.key_size,
    );
    match entry.algorithm {
        AlgorithmType::Aes256Cbc => {
            crypto::aes_cbc_decrypt(&key, &entry.initialisation_vector, ciphertext)
        }
        AlgorithmType::TripleDesCbc => {
            crypto::triple_des_cbc_decrypt(&key, &entry.initialisation_vector, ciphertext)
        }
        AlgorithmType::BlowfishCfb => {
            crypto::blowfish_cfb_decrypt(&key, &entry.initialisation_vector, ciphertext)
        }
        AlgorithmType::Unknown => Err(OpenError::UnsupportedCryptoAlgorithm(
            "unknown manifest algorithm".to_string(),
        )),
    }
}

/// Try a password against the archive's smallest encrypted entry.
///
/// `Ok(false)` means the password does not verify; errors are reserved for
/// unusable parameters and unreadable bodies.
pub fn password_verifies(
    filesystem: &dyn Filesystem,
    manifest: &Manifest,
    password: &str,
) -> Result<bool> {
    let Some(path) = &manifest.smallest_entry else {
        return Err(OpenError::NotEncrypted);
    };
    let entry = manifest.entries.get(path).ok_or(OpenError::NullPointer)?;
    if !can_decrypt(entry) {
        return Err(OpenError::UnsupportedCryptoAlgorithm(format!(
            "{:?}",
            entry.algorithm
        )));
    }
    let ciphertext = filesystem.open(path)?.bytes()?;
    let deflated = decrypt_deflated(entry, password, &ciphertext)?;
    let padding = match crypto::inflate_raw(&deflated) {
        Ok((_, padding)) => padding,
        // garbage after decryption means a wrong password
        Err(_) => return Ok(false),
    };
    Ok(verify(entry, &deflated, padding))
}

/// Decrypt a whole package into a fresh in-memory filesystem.
///
/// Entries without a manifest encryption record are copied through
/// unchanged. Returns `Ok(None)` when the password fails verification.
pub fn decrypt_filesystem(
    filesystem: &dyn Filesystem,
    manifest: &Manifest,
    password: &str,
) -> Result<Option<MemoryFilesystem>> {
    if !password_verifies(filesystem, manifest, password)? {
        return Ok(None);
    }

    let mut decrypted = MemoryFilesystem::new();
    let root = Path::root();
    let mut walker = filesystem.file_walker(&root)?;
    loop {
        let Some(current) = walker.current().cloned() else {
            break;
        };
        if current.is_file {
            let body = filesystem.open(&current.path)?.bytes()?;
            let file = match manifest.entries.get(&current.path) {
                Some(entry) => {
                    debug!(path = %current.path, "decrypting entry");
                    File::from_bytes(decrypt_entry(entry, password, &body)?)
                }
                None => File::from_bytes(body.as_ref().clone()),
            };
            decrypted.create_file(&current.path, file)?;
        }
        if !walker.next() {
            break;
        }
    }
    Ok(Some(decrypted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::odf::manifest::Manifest;
    use aes::Aes256;
    use cipher::{BlockEncryptMut, KeyIvInit, block_padding::NoPadding};
    use flate2::{Compress, Compression, FlushCompress};

    const PASSWORD: &str = "secret";

    /// Deflate + pad + encrypt a body the way a producer would, returning
    /// the manifest entry and the ciphertext.
    fn encrypt_fixture(body: &[u8]) -> (ManifestEntry, Vec<u8>) {
        let mut compress = Compress::new(Compression::default(), false);
        let mut deflated = Vec::with_capacity(body.len() + 64);
        compress
            .compress_vec(body, &mut deflated, FlushCompress::Finish)
            .unwrap();

        let checksum = crypto::sha1(&deflated[..deflated.len().min(1024)]).to_vec();

        let padding = 16 - deflated.len() % 16;
        let unpadded = deflated.len();
        deflated.resize(unpadded + padding, padding as u8);

        let entry = ManifestEntry {
            size: body.len() as u64,
            checksum_type: ChecksumType::Sha1_1k,
            checksum,
            algorithm: AlgorithmType::Aes256Cbc,
            initialisation_vector: vec![7u8; 16],
            key_derivation: KeyDerivationType::Pbkdf2,
            key_size: 32,
            key_iteration_count: 1024,
            key_salt: b"0123456789abcdef".to_vec(),
            start_key_type: StartKeyType::Sha256,
            start_key_size: 32,
        };

        let start = crypto::sha256(PASSWORD.as_bytes());
        let key = crypto::pbkdf2_hmac_sha1(&start, &entry.key_salt, 1024, 32);
        let mut ciphertext = deflated;
        let len = ciphertext.len();
        cbc::Encryptor::<Aes256>::new_from_slices(&key, &entry.initialisation_vector)
            .unwrap()
            .encrypt_padded_mut::<NoPadding>(&mut ciphertext, len)
            .unwrap();
        (entry, ciphertext)
    }

    #[test]
    fn test_entry_roundtrip() {
        let body = b"<office:document-content/> with some more text to compress";
        let (entry, ciphertext) = encrypt_fixture(body);
        assert!(can_decrypt(&entry));
        let plaintext = decrypt_entry(&entry, PASSWORD, &ciphertext).unwrap();
        assert_eq!(plaintext, body);
    }

    #[test]
    fn test_password_verification() {
        let body = b"verification body";
        let (entry, ciphertext) = encrypt_fixture(body);

        let mut fs = MemoryFilesystem::new();
        fs.create_file(
            &Path::new("/content.xml").unwrap(),
            File::from_bytes(ciphertext),
        )
        .unwrap();
        let mut manifest = Manifest {
            encrypted: true,
            smallest_entry: Some(Path::new("/content.xml").unwrap()),
            ..Default::default()
        };
        manifest
            .entries
            .insert(Path::new("/content.xml").unwrap(), entry);

        assert!(password_verifies(&fs, &manifest, PASSWORD).unwrap());
        assert!(!password_verifies(&fs, &manifest, "wrong").unwrap());
    }

    #[test]
    fn test_decrypt_filesystem_mirrors_plain_entries() {
        let body = b"the content body";
        let (entry, ciphertext) = encrypt_fixture(body);

        let mut fs = MemoryFilesystem::new();
        fs.create_file(
            &Path::new("/content.xml").unwrap(),
            File::from_bytes(ciphertext),
        )
        .unwrap();
        fs.create_file(
            &Path::new("/mimetype").unwrap(),
            File::from_bytes(b"application/vnd.oasis.opendocument.text".to_vec()),
        )
        .unwrap();
        let mut manifest = Manifest {
            encrypted: true,
            smallest_entry: Some(Path::new("/content.xml").unwrap()),
            ..Default::default()
        };
        manifest
            .entries
            .insert(Path::new("/content.xml").unwrap(), entry);

        let decrypted = decrypt_filesystem(&fs, &manifest, PASSWORD).unwrap().unwrap();
        assert_eq!(
            decrypted
                .open(&Path::new("/content.xml").unwrap())
                .unwrap()
                .bytes()
                .unwrap()
                .as_slice(),
            body
        );
        assert_eq!(
            decrypted
                .open(&Path::new("/mimetype").unwrap())
                .unwrap()
                .bytes()
                .unwrap()
                .as_slice(),
            b"application/vnd.oasis.opendocument.text"
        );
    }

    #[test]
    fn test_wrong_password_returns_none() {
        let (entry, ciphertext) = encrypt_fixture(b"body");
        let mut fs = MemoryFilesystem::new();
        fs.create_file(
            &Path::new("/content.xml").unwrap(),
            File::from_bytes(ciphertext),
        )
        .unwrap();
        let mut manifest = Manifest {
            encrypted: true,
            smallest_entry: Some(Path::new("/content.xml").unwrap()),
            ..Default::default()
        };
        manifest
            .entries
            .insert(Path::new("/content.xml").unwrap(), entry);

        assert!(decrypt_filesystem(&fs, &manifest, "nope").unwrap().is_none());
    }

    #[test]
    fn test_key_size_mismatch_is_unsupported() {
        let entry = ManifestEntry {
            algorithm: AlgorithmType::Aes256Cbc,
            key_derivation: KeyDerivationType::Pbkdf2,
            start_key_type: StartKeyType::Sha1,
            start_key_size: 20,
            key_size: 16, // AES-256 requires 32
            ..Default::default()
        };
        assert!(!can_decrypt(&entry));
        assert!(matches!(
            decrypt_entry(&entry, "pw", &[0u8; 16]),
            Err(OpenError::UnsupportedCryptoAlgorithm(_))
        ));
    }
}
