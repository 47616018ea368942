//! Decryption end to end: encrypted packages are produced inside the test
//! with the same primitives a real producer uses, then opened through the
//! public API.

mod common;

use std::io::{Cursor, Write};

use cipher::{BlockEncryptMut, KeyIvInit, KeyInit, block_padding::NoPadding};
use flate2::{Compress, Compression, FlushCompress};
use zip::write::SimpleFileOptions;

use office2html::doc::DocumentKind;
use office2html::{DecodedFile, FileType, HtmlOptions, OpenError, crypto};

use common::*;

const PASSWORD: &str = "pages";

fn deflate_raw(body: &[u8]) -> Vec<u8> {
    let mut compress = Compress::new(Compression::default(), false);
    let mut out = Vec::with_capacity(body.len() + 64);
    compress
        .compress_vec(body, &mut out, FlushCompress::Finish)
        .unwrap();
    out
}

/// Encrypt one ODF entry body; returns (ciphertext, manifest encryption XML).
fn encrypt_odf_entry(body: &[u8], path: &str) -> (Vec<u8>, String) {
    let salt = b"0123456789abcdef";
    let iv = [0x24u8; 16];
    let iterations = 4096;

    let mut deflated = deflate_raw(body);
    let checksum = crypto::sha256(&deflated[..deflated.len().min(1024)]);
    let padding = 16 - deflated.len() % 16;
    let unpadded = deflated.len();
    deflated.resize(unpadded + padding, padding as u8);

    let start_key = crypto::sha256(PASSWORD.as_bytes());
    let key = crypto::pbkdf2_hmac_sha1(&start_key, salt, iterations, 32);
    let mut ciphertext = deflated;
    let length = ciphertext.len();
    cbc::Encryptor::<aes::Aes256>::new_from_slices(&key, &iv)
        .unwrap()
        .encrypt_padded_mut::<NoPadding>(&mut ciphertext, length)
        .unwrap();

    let manifest_entry = format!(
        r#"<manifest:file-entry manifest:full-path="{path}" manifest:size="{size}">
  <manifest:encryption-data manifest:checksum-type="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0#sha256-1k" manifest:checksum="{checksum}">
   <manifest:algorithm manifest:algorithm-name="http://www.w3.org/2001/04/xmlenc#aes256-cbc" manifest:initialisation-vector="{iv}"/>
   <manifest:key-derivation manifest:key-derivation-name="PBKDF2" manifest:key-size="32" manifest:iteration-count="{iterations}" manifest:salt="{salt}"/>
   <manifest:start-key-generation manifest:start-key-generation-name="http://www.w3.org/2000/09/xmldsig#sha256" manifest:key-size="32"/>
  </manifest:encryption-data>
 </manifest:file-entry>"#,
        size = body.len(),
        checksum = crypto::base64_encode(&checksum),
        iv = crypto::base64_encode(&iv),
        salt = crypto::base64_encode(salt),
    );
    (ciphertext, manifest_entry)
}

fn build_encrypted_ods(sheets: &[(&str, Vec<Vec<&str>>)]) -> Vec<u8> {
    let content = spreadsheet_content_xml(sheets);
    let (ciphertext, manifest_entry) = encrypt_odf_entry(content.as_bytes(), "content.xml");
    let manifest = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<manifest:manifest xmlns:manifest="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0">
 <manifest:file-entry manifest:full-path="/" manifest:media-type="{ODS_MIME}"/>
 {manifest_entry}
</manifest:manifest>"#
    );

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file(
            "mimetype",
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored),
        )
        .unwrap();
    writer.write_all(ODS_MIME.as_bytes()).unwrap();
    // the encrypted body is already deflated, so store it as-is
    writer
        .start_file(
            "content.xml",
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored),
        )
        .unwrap();
    writer.write_all(&ciphertext).unwrap();
    writer
        .start_file("META-INF/manifest.xml", SimpleFileOptions::default())
        .unwrap();
    writer.write_all(manifest.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}

#[test]
fn encrypted_ods_decrypts_and_parses() {
    let bytes = build_encrypted_ods(&[
        ("Sheet1", vec![vec!["Page 1"]]),
        ("Sheet2", vec![vec!["Page 2"]]),
    ]);
    let DecodedFile::Document(mut document) = office2html::open_bytes(bytes).unwrap() else {
        panic!("expected a document");
    };
    assert_eq!(document.file_type(), FileType::OpendocumentSpreadsheet);
    assert!(document.password_encrypted());
    assert!(matches!(
        document.document(),
        Err(OpenError::FileEncrypted)
    ));

    assert!(document.decrypt(PASSWORD).unwrap());
    let tree = document.document().unwrap();
    assert_eq!(tree.document_type(), DocumentKind::Spreadsheet);

    // each sheet holds its label at (0, 0)
    for (index, sheet) in tree.registry.children(tree.root).enumerate() {
        let data = tree.registry.sheet_data(sheet).unwrap();
        let cell = data.cell(0, 0).unwrap();
        assert_eq!(tree.element_text(cell), format!("Page {}", index + 1));
    }
}

#[test]
fn encrypted_ods_translates_after_decryption() {
    let bytes = build_encrypted_ods(&[
        ("Sheet1", vec![vec!["Page 1"]]),
        ("Sheet2", vec![vec!["Page 2"]]),
        ("Sheet3", vec![vec!["Page 3"]]),
    ]);
    let mut decoded = office2html::open_bytes(bytes).unwrap();
    if let DecodedFile::Document(document) = &mut decoded {
        assert!(document.decrypt(PASSWORD).unwrap());
    }
    let output = office2html::translate(&decoded, &HtmlOptions::default()).unwrap();
    assert_eq!(output.pages.len(), 3);
    for (index, page) in output.pages.iter().enumerate() {
        assert!(page.html.contains("<table"));
        assert!(page.html.contains(&format!("Page {}", index + 1)));
    }
}

#[test]
fn wrong_password_returns_false() {
    let bytes = build_encrypted_ods(&[("Sheet1", vec![vec!["Page 1"]])]);
    let DecodedFile::Document(mut document) = office2html::open_bytes(bytes).unwrap() else {
        panic!("expected a document");
    };
    assert!(!document.decrypt("not-the-password").unwrap());
    // still encrypted, so the tree stays unavailable
    assert!(matches!(
        document.document(),
        Err(OpenError::FileEncrypted)
    ));
}

// --- OOXML Standard encryption ---

const ALG_ID_AES128: u32 = 0x0000_660E;
const ALG_ID_HASH_SHA1: u32 = 0x0000_8004;

fn aes128_ecb_encrypt(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut buffer = data.to_vec();
    let length = buffer.len();
    ecb::Encryptor::<aes::Aes128>::new_from_slice(key)
        .unwrap()
        .encrypt_padded_mut::<NoPadding>(&mut buffer, length)
        .unwrap();
    buffer
}

/// Standard key derivation, forward direction, to build fixtures.
fn derive_standard_key(password: &str, salt: &[u8]) -> Vec<u8> {
    let mut concatenated = salt.to_vec();
    concatenated.extend(password.encode_utf16().flat_map(u16::to_le_bytes));
    let mut hash = crypto::sha1(&concatenated).to_vec();
    for iteration in 0u32..50_000 {
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
    derived.truncate(16);
    derived
}

fn build_encrypted_docx(password: &str) -> Vec<u8> {
    // the inner plain DOCX
    let mut inner = zip::ZipWriter::new(Cursor::new(Vec::new()));
    inner
        .start_file("word/document.xml", SimpleFileOptions::default())
        .unwrap();
    inner
        .write_all(
            br#"<w:document xmlns:w="urn:w"><w:body><w:p><w:r><w:t>secret body</w:t></w:r></w:p></w:body></w:document>"#,
        )
        .unwrap();
    let plain = inner.finish().unwrap().into_inner();

    let salt = [0x5Au8; 16];
    let key = derive_standard_key(password, &salt);

    // EncryptionInfo
    let csp: Vec<u8> = "Microsoft Enhanced RSA and AES Cryptographic Provider\0"
        .encode_utf16()
        .flat_map(u16::to_le_bytes)
        .collect();
    let mut header = Vec::new();
    header.extend_from_slice(&0x24u32.to_le_bytes());
    header.extend_from_slice(&0u32.to_le_bytes());
    header.extend_from_slice(&ALG_ID_AES128.to_le_bytes());
    header.extend_from_slice(&ALG_ID_HASH_SHA1.to_le_bytes());
    header.extend_from_slice(&128u32.to_le_bytes());
    header.extend_from_slice(&0x18u32.to_le_bytes());
    header.extend_from_slice(&0u32.to_le_bytes());
    header.extend_from_slice(&0u32.to_le_bytes());
    header.extend_from_slice(&csp);

    let verifier_plain = [0x17u8; 16];
    let verifier_hash = crypto::sha1(&verifier_plain);
    let mut hash_padded = verifier_hash.to_vec();
    hash_padded.resize(32, 0);

    let mut info = Vec::new();
    info.extend_from_slice(&4u16.to_le_bytes());
    info.extend_from_slice(&2u16.to_le_bytes());
    info.extend_from_slice(&0x24u32.to_le_bytes());
    info.extend_from_slice(&(header.len() as u32).to_le_bytes());
    info.extend_from_slice(&header);
    info.extend_from_slice(&16u32.to_le_bytes());
    info.extend_from_slice(&salt);
    info.extend_from_slice(&aes128_ecb_encrypt(&key, &verifier_plain));
    info.extend_from_slice(&20u32.to_le_bytes());
    info.extend_from_slice(&aes128_ecb_encrypt(&key, &hash_padded));

    // EncryptedPackage
    let mut padded = plain.clone();
    padded.resize(plain.len().div_ceil(16) * 16, 0);
    let mut package = (plain.len() as u64).to_le_bytes().to_vec();
    package.extend_from_slice(&aes128_ecb_encrypt(&key, &padded));

    // CFB envelope
    let mut compound = cfb::CompoundFile::create(Cursor::new(Vec::new())).unwrap();
    compound
        .create_stream("EncryptionInfo")
        .unwrap()
        .write_all(&info)
        .unwrap();
    compound
        .create_stream("EncryptedPackage")
        .unwrap()
        .write_all(&package)
        .unwrap();
    compound.flush().unwrap();
    compound.into_inner().into_inner()
}

#[test]
fn encrypted_docx_verifier_and_package() {
    let bytes = build_encrypted_docx("Password1234_");
    let DecodedFile::Document(mut document) = office2html::open_bytes(bytes).unwrap() else {
        panic!("expected a document");
    };
    assert_eq!(document.file_type(), FileType::OfficeOpenXmlEncrypted);
    assert!(document.password_encrypted());

    assert!(document.decrypt("Password1234_").unwrap());
    assert_eq!(document.file_type(), FileType::OfficeOpenXmlDocument);
    let tree = document.document().unwrap();
    let first = tree.registry.children(tree.root).next().unwrap();
    assert_eq!(tree.element_text(first), "secret body");
}

#[test]
fn encrypted_docx_wrong_password_is_rejected_by_verifier() {
    let bytes = build_encrypted_docx("Password1234_");
    let DecodedFile::Document(mut document) = office2html::open_bytes(bytes).unwrap() else {
        panic!("expected a document");
    };
    assert!(matches!(
        document.decrypt("wrong"),
        Err(OpenError::WrongPassword)
    ));
}
