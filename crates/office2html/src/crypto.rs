//! Cryptographic primitives shared by the ODF and OOXML decryption paths:
//! hashes, key derivation, the cipher suite the formats require, and a raw
//! inflate that reports trailing padding.

use aes::{Aes128, Aes192, Aes256};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use blowfish::Blowfish;
use cipher::{BlockDecryptMut, KeyInit, KeyIvInit, block_padding::NoPadding};
use des::TdesEde3;
use flate2::{Decompress, FlushDecompress, Status};
use sha1::{Digest, Sha1};
use sha2::Sha256;

use crate::error::{OpenError, Result};

pub fn base64_encode(data: &[u8]) -> String {
    BASE64.encode(data)
}

pub fn base64_decode(data: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(data.trim())
        .map_err(|e| OpenError::InvalidPath(format!("invalid base64: {e}")))
}

pub fn sha1(data: &[u8]) -> [u8; 20] {
    Sha1::digest(data).into()
}

pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// PBKDF2-HMAC-SHA1 with an explicit output size.
pub fn pbkdf2_hmac_sha1(start_key: &[u8], salt: &[u8], iterations: u32, key_size: usize) -> Vec<u8> {
    let mut key = vec![0u8; key_size];
    pbkdf2::pbkdf2_hmac::<Sha1>(start_key, salt, iterations, &mut key);
    key
}

fn check_block_multiple(input: &[u8], block: usize) -> Result<()> {
    if input.len() % block != 0 {
        return Err(OpenError::DecryptionFailed);
    }
    Ok(())
}

/// AES in ECB mode without padding. The key length selects the variant.
pub fn aes_ecb_decrypt(key: &[u8], input: &[u8]) -> Result<Vec<u8>> {
    check_block_multiple(input, 16)?;
    let mut data = input.to_vec();
    match key.len() {
        16 => ecb::Decryptor::<Aes128>::new_from_slice(key)
            .map_err(|_| OpenError::DecryptionFailed)?
            .decrypt_padded_mut::<NoPadding>(&mut data)
            .map_err(|_| OpenError::DecryptionFailed)?,
        24 => ecb::Decryptor::<Aes192>::new_from_slice(key)
            .map_err(|_| OpenError::DecryptionFailed)?
            .decrypt_padded_mut::<NoPadding>(&mut data)
            .map_err(|_| OpenError::DecryptionFailed)?,
        32 => ecb::Decryptor::<Aes256>::new_from_slice(key)
            .map_err(|_| OpenError::DecryptionFailed)?
            .decrypt_padded_mut::<NoPadding>(&mut data)
            .map_err(|_| OpenError::DecryptionFailed)?,
        n => {
            return Err(OpenError::UnsupportedCryptoAlgorithm(format!(
                "AES key size {n}"
            )));
        }
    };
    Ok(data)
}

/// AES in CBC mode without padding. The key length selects the variant.
pub fn aes_cbc_decrypt(key: &[u8], iv: &[u8], input: &[u8]) -> Result<Vec<u8>> {
    check_block_multiple(input, 16)?;
    if iv.len() != 16 {
        return Err(OpenError::DecryptionFailed);
    }
    let mut data = input.to_vec();
    match key.len() {
        16 => cbc::Decryptor::<Aes128>::new_from_slices(key, iv)
            .map_err(|_| OpenError::DecryptionFailed)?
            .decrypt_padded_mut::<NoPadding>(&mut data)
            .map_err(|_| OpenError::DecryptionFailed)?,
        24 => cbc::Decryptor::<Aes192>::new_from_slices(key, iv)
            .map_err(|_| OpenError::DecryptionFailed)?
            .decrypt_padded_mut::<NoPadding>(&mut data)
            .map_err(|_| OpenError::DecryptionFailed)?,
        32 => cbc::Decryptor::<Aes256>::new_from_slices(key, iv)
            .map_err(|_| OpenError::DecryptionFailed)?
            .decrypt_padded_mut::<NoPadding>(&mut data)
            .map_err(|_| OpenError::DecryptionFailed)?,
        n => {
            return Err(OpenError::UnsupportedCryptoAlgorithm(format!(
                "AES key size {n}"
            )));
        }
    };
    Ok(data)
}

/// Triple DES (EDE3) in CBC mode without padding.
pub fn triple_des_cbc_decrypt(key: &[u8], iv: &[u8], input: &[u8]) -> Result<Vec<u8>> {
    check_block_multiple(input, 8)?;
    let mut data = input.to_vec();
    cbc::Decryptor::<TdesEde3>::new_from_slices(key, iv)
        .map_err(|_| OpenError::DecryptionFailed)?
        .decrypt_padded_mut::<NoPadding>(&mut data)
        .map_err(|_| OpenError::DecryptionFailed)?;
    Ok(data)
}

/// Blowfish in full-block CFB mode.
pub fn blowfish_cfb_decrypt(key: &[u8], iv: &[u8], input: &[u8]) -> Result<Vec<u8>> {
    use cipher::AsyncStreamCipher;
    let mut data = input.to_vec();
    let cipher: cfb_mode::Decryptor<Blowfish> =
        cfb_mode::Decryptor::new_from_slices(key, iv).map_err(|_| OpenError::DecryptionFailed)?;
    cipher.decrypt(&mut data);
    Ok(data)
}

/// Inflate a raw deflate stream.
///
/// Returns the decompressed bytes and the count of input bytes left over
/// after the final block. Encrypted ODF entries are padded to the cipher
/// block size, and the checksum step needs to know how much padding the
/// deflate stream did not consume.
pub fn inflate_raw(input: &[u8]) -> Result<(Vec<u8>, usize)> {
    let mut decompress = Decompress::new(false);
    let mut output = Vec::with_capacity(input.len().saturating_mul(3).max(1024));
    let mut stalls = 0;
    loop {
        let consumed = decompress.total_in();
        let produced = decompress.total_out();
        if output.len() == output.capacity() {
            output.reserve(32 * 1024);
        }
        let status = decompress
            .decompress_vec(&input[consumed as usize..], &mut output, FlushDecompress::Finish)
            .map_err(|_| OpenError::DecryptionFailed)?;
        if status == Status::StreamEnd {
            break;
        }
        if decompress.total_in() == consumed && decompress.total_out() == produced {
            // no forward progress: either a truncated stream or a stall
            if consumed as usize >= input.len() || stalls > 1 {
                return Err(OpenError::DecryptionFailed);
            }
            stalls += 1;
        } else {
            stalls = 0;
        }
    }
    let padding = input.len() - decompress.total_in() as usize;
    Ok((output, padding))
}
