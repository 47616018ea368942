//! ECMA-376 Standard Encryption: parse the packed little-endian
//! `EncryptionInfo` stream, derive the key by iterated SHA-1, verify the
//! password against the encrypted verifier, and decrypt the package.

use subtle::ConstantTimeEq;

use crate::crypto;
use crate::error::{OpenError, Result};

const ITER_COUNT: u32 = 50_000;

const ALG_ID_AES128: u32 = 0x0000_660E;
const ALG_ID_AES192: u32 = 0x0000_660F;
const ALG_ID_AES256: u32 = 0x0000_6610;
const ALG_ID_HASH_SHA1: u32 = 0x0000_8004;

/// `EncryptionHeader` of the `EncryptionInfo` stream.
#[derive(Debug, Clone, Default)]
pub struct EncryptionHeader {
    pub flags: u32,
    pub size_extra: u32,
    pub alg_id: u32,
    pub alg_id_hash: u32,
    /// Key size in bits.
    pub key_size: u32,
    pub provider_type: u32,
    pub reserved1: u32,
    pub reserved2: u32,
    pub csp_name: String,
}

/// `EncryptionVerifier` of the `EncryptionInfo` stream.
#[derive(Debug, Clone, Default)]
pub struct EncryptionVerifier {
    pub salt: Vec<u8>,
    pub encrypted_verifier: Vec<u8>,
    pub verifier_hash_size: u32,
    pub encrypted_verifier_hash: Vec<u8>,
}

/// Parsed Standard-encryption parameters.
#[derive(Debug, Clone)]
pub struct Ecma376Standard {
    pub header: EncryptionHeader,
    pub verifier: EncryptionVerifier,
}

/// Little-endian reader over a packed wire stream.
struct Reader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8]> {
        let end = self
            .position
            .checked_add(count)
            .filter(|&end| end <= self.data.len())
            .ok_or(OpenError::DecryptionFailed)?;
        let slice = &self.data[self.position..end];
        self.position = end;
        Ok(slice)
    }

    fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.take(2)?.try_into().unwrap()))
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }
}

fn utf16le(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

fn utf16le_to_string(data: &[u8]) -> String {
    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|&unit| unit != 0)
        .collect();
    String::from_utf16_lossy(&units)
}

impl Ecma376Standard {
    /// Parse an `EncryptionInfo` stream.
    ///
    /// The wire format is little-endian and packed; a big-endian host has
    /// no native view of it and is rejected.
    pub fn parse(encryption_info: &[u8]) -> Result<Self> {
        if cfg!(target_endian = "big") {
            return Err(OpenError::UnsupportedEndian);
        }
        let mut reader = Reader::new(encryption_info);
        let version_major = reader.u16()?;
        let version_minor = reader.u16()?;
        // Standard encryption is versions 2..4 with minor 2; minor 4 is
        // Agile (XML descriptor), which this decoder does not speak
        if version_minor != 2 || !(2..=4).contains(&version_major) {
            return Err(OpenError::UnsupportedCryptoAlgorithm(format!(
                "EncryptionInfo version {version_major}.{version_minor}"
            )));
        }
        let _header_flags = reader.u32()?;
        let header_size = reader.u32()? as usize;
        let header_bytes = reader.take(header_size)?;

        let mut header_reader = Reader::new(header_bytes);
        let header = EncryptionHeader {
            flags: header_reader.u32()?,
            size_extra: header_reader.u32()?,
            alg_id: header_reader.u32()?,
            alg_id_hash: header_reader.u32()?,
            key_size: header_reader.u32()?,
            provider_type: header_reader.u32()?,
            reserved1: header_reader.u32()?,
            reserved2: header_reader.u32()?,
            csp_name: utf16le_to_string(&header_bytes[32.min(header_bytes.len())..]),
        };

        let salt_size = reader.u32()? as usize;
        let verifier = EncryptionVerifier {
            salt: reader.take(16)?[..salt_size.min(16)].to_vec(),
            encrypted_verifier: reader.take(16)?.to_vec(),
            verifier_hash_size: reader.u32()?,
            encrypted_verifier_hash: reader.data[reader.position..].to_vec(),
        };

        match header.alg_id {
            ALG_ID_AES128 | ALG_ID_AES192 | ALG_ID_AES256 => {}
            other => {
                return Err(OpenError::UnsupportedCryptoAlgorithm(format!(
                    "encryption algorithm id {other:#x}"
                )));
            }
        }
        if header.alg_id_hash != ALG_ID_HASH_SHA1 {
            return Err(OpenError::UnsupportedCryptoAlgorithm(format!(
                "hash algorithm id {:#x}",
                header.alg_id_hash
            )));
        }
        let declared = header.key_size as usize / 8;
        if !matches!(declared, 16 | 24 | 32) {
            return Err(OpenError::UnsupportedCryptoAlgorithm(format!(
                "key size {} bits",
                header.key_size
            )));
        }

        Ok(Self { header, verifier })
    }

    /// Iterated-SHA1 key derivation.
    ///
    /// `h0 = sha1(salt || password_utf16le)`, then fifty thousand rounds of
    /// `h = sha1(le32(i) || h)`, a final `h = sha1(h || le32(0))`, and the
    /// ipad/opad-style split whose concatenation is cut to the key size.
    pub fn derive_key(&self, password: &str) -> Vec<u8> {
        let mut concatenated = self.verifier.salt.clone();
        concatenated.extend_from_slice(&utf16le(password));
        let mut hash = crypto::sha1(&concatenated).to_vec();

        for iteration in 0..ITER_COUNT {
            let mut input = iteration.to_le_bytes().to_vec();
            input.extend_from_slice(&hash);
            hash = crypto::sha1(&input).to_vec();
        }
        let mut input = hash;
        input.extend_from_slice(&0u32.to_le_bytes());
        let final_hash = crypto::sha1(&input);

        let mut buffer1 = [0x36u8; 64];
        let mut buffer2 = [0x5Cu8; 64];
        for (index, byte) in final_hash.iter().enumerate() {
            buffer1[index] ^= byte;
            buffer2[index] ^= byte;
        }
        let mut derived = crypto::sha1(&buffer1).to_vec();
        derived.extend_from_slice(&crypto::sha1(&buffer2));
        derived.truncate(self.header.key_size as usize / 8);
        derived
    }

    /// Check a derived key against the encrypted verifier pair.
    pub fn verify(&self, key: &[u8]) -> bool {
        let Ok(verifier) = crypto::aes_ecb_decrypt(key, &self.verifier.encrypted_verifier) else {
            return false;
        };
        let Ok(verifier_hash) = crypto::aes_ecb_decrypt(key, &self.verifier.encrypted_verifier_hash)
        else {
            return false;
        };
        let expected = crypto::sha1(&verifier);
        let size = (self.verifier.verifier_hash_size as usize)
            .min(expected.len())
            .min(verifier_hash.len());
        expected[..size].ct_eq(&verifier_hash[..size]).into()
    }

    /// Decrypt `/EncryptedPackage`: a little-endian plaintext size prefix
    /// followed by the AES-ECB encrypted ZIP.
    pub fn decrypt_package(&self, encrypted_package: &[u8], key: &[u8]) -> Result<Vec<u8>> {
        if encrypted_package.len() < 8 {
            return Err(OpenError::DecryptionFailed);
        }
        let size = u64::from_le_bytes(encrypted_package[..8].try_into().unwrap()) as usize;
        let body = &encrypted_package[8..];
        let mut plaintext = crypto::aes_ecb_decrypt(key, &body[..body.len() - body.len() % 16])?;
        if size > plaintext.len() {
            return Err(OpenError::DecryptionFailed);
        }
        plaintext.truncate(size);
        Ok(plaintext)
    }
}
