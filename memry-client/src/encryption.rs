use base64::prelude::{Engine, BASE64_STANDARD};
use crypto_secretbox::aead::{AeadCore, AeadInPlace, Nonce, OsRng};
use crypto_secretbox::{Key, KeyInit, XSalsa20Poly1305};
use eyre::{bail, ensure, eyre, Context, Result};
use fs_err as fs;
use std::io::Write;
use std::path::Path;

/// Sealed payload as written to disk. The nonce is generated fresh for
/// every write.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct SealedBlob {
    pub ciphertext: Vec<u8>,
    pub nonce: Nonce<XSalsa20Poly1305>,
}

pub fn generate_encoded_key() -> Result<(Key, String)> {
    let key = XSalsa20Poly1305::generate_key(&mut OsRng);
    let encoded = encode_key(&key);
    Ok((key, encoded))
}

pub fn create_key(path: &Path) -> Result<Key> {
    if path.exists() {
        bail!("key already exists. not allowed to overwrite");
    }

    let (key, encoded) = generate_encoded_key()?;
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let mut file = fs::File::create(path)?;
    file.write_all(encoded.as_bytes())?;

    Ok(key)
}

pub fn read_key(path: &Path) -> Result<Key> {
    let encoded = fs::read_to_string(path)?;
    decode_key(encoded)
}

/// Load the device key, creating one on first use.
pub fn load_key(path: &Path) -> Result<Key> {
    let key = if path.exists() {
        read_key(path)?
    } else {
        create_key(path)?
    };

    Ok(key)
}

fn encode_key(key: &Key) -> String {
    BASE64_STANDARD.encode(key)
}

pub fn decode_key(encoded: String) -> Result<Key> {
    let buf = BASE64_STANDARD
        .decode(encoded.trim_end())
        .context("Failed to decode key from base64")?;
    ensure!(buf.len() == 32, "encryption key is not the correct size");

    let mut key = Key::default();
    key.copy_from_slice(&buf);

    Ok(key)
}

pub fn seal(plaintext: &[u8], key: &Key) -> Result<SealedBlob> {
    let mut buf = plaintext.to_vec();

    let nonce = XSalsa20Poly1305::generate_nonce(&mut OsRng);
    XSalsa20Poly1305::new(key)
        .encrypt_in_place(&nonce, &[], &mut buf)
        .map_err(|_| eyre!("Failed to encrypt data"))?;

    Ok(SealedBlob {
        ciphertext: buf,
        nonce,
    })
}

pub fn open(blob: SealedBlob, key: &Key) -> Result<Vec<u8>> {
    let mut buf = blob.ciphertext;
    XSalsa20Poly1305::new(key)
        .decrypt_in_place(&blob.nonce, &[], &mut buf)
        .map_err(|_| eyre!("Failed to decrypt data"))?;

    Ok(buf)
}
