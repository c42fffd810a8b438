/// Passphrase-protected master key sidecar
///
/// The master key never touches disk in the clear: it is wrapped with a
/// key derived from the passphrase via Argon2id and persisted as a small
/// JSON file next to the encrypted tree.

use std::fs;
use std::path::Path;

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use argon2::Argon2;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::{cipher::MasterKey, Error, Result};

const KEY_FILE_VERSION: u32 = 1;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;

/// On-disk format: only the wrapped key, never plaintext.
#[derive(Serialize, Deserialize)]
struct PersistedKeyFile {
    version: u32,
    /// Argon2id salt, base64
    salt: String,
    /// AES-GCM nonce for the key wrap, base64
    nonce: String,
    /// Wrapped (ciphertext) master key, base64
    wrapped_key: String,
}

fn derive_wrapping_key(passphrase: &str, salt: &[u8]) -> Result<[u8; 32]> {
    let mut key = [0u8; 32];
    Argon2::default()
        .hash_password_into(passphrase.as_bytes(), salt, &mut key)
        .map_err(|e| Error::KeyFile(format!("passphrase derivation failed: {}", e)))?;
    Ok(key)
}

fn random_bytes<const N: usize>() -> Result<[u8; N]> {
    let mut bytes = [0u8; N];
    getrandom::getrandom(&mut bytes)
        .map_err(|e| Error::KeyFile(format!("random generation failed: {}", e)))?;
    Ok(bytes)
}

/// Generate a fresh master key and persist it at `path`, wrapped under
/// `passphrase`.
pub fn create(path: impl AsRef<Path>, passphrase: &str) -> Result<MasterKey> {
    let master = MasterKey::generate();

    let salt = random_bytes::<SALT_LEN>()?;
    let nonce_bytes = random_bytes::<NONCE_LEN>()?;

    let mut wrapping = derive_wrapping_key(passphrase, &salt)?;
    let cipher = Aes256Gcm::new((&wrapping).into());
    wrapping.zeroize();

    let wrapped = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), master.as_bytes().as_slice())
        .map_err(|e| Error::KeyFile(format!("master key wrap failed: {}", e)))?;

    let persisted = PersistedKeyFile {
        version: KEY_FILE_VERSION,
        salt: BASE64.encode(salt),
        nonce: BASE64.encode(nonce_bytes),
        wrapped_key: BASE64.encode(&wrapped),
    };
    let json = serde_json::to_vec_pretty(&persisted)
        .map_err(|e| Error::KeyFile(format!("serialize failed: {}", e)))?;
    fs::write(path, json).map_err(|e| Error::KeyFile(format!("write failed: {}", e)))?;

    Ok(master)
}

/// Load and unwrap the master key persisted at `path`.
pub fn load(path: impl AsRef<Path>, passphrase: &str) -> Result<MasterKey> {
    let data = fs::read(path).map_err(|e| Error::KeyFile(format!("read failed: {}", e)))?;
    let persisted: PersistedKeyFile = serde_json::from_slice(&data)
        .map_err(|e| Error::KeyFile(format!("parse failed: {}", e)))?;
    if persisted.version != KEY_FILE_VERSION {
        return Err(Error::KeyFile(format!(
            "unsupported key file version: {}",
            persisted.version
        )));
    }

    let decode = |field: &str, value: &str| -> Result<Vec<u8>> {
        BASE64
            .decode(value)
            .map_err(|e| Error::KeyFile(format!("malformed {}: {}", field, e)))
    };
    let salt = decode("salt", &persisted.salt)?;
    let nonce = decode("nonce", &persisted.nonce)?;
    let wrapped = decode("wrapped_key", &persisted.wrapped_key)?;
    if nonce.len() != NONCE_LEN {
        return Err(Error::KeyFile("malformed nonce length".to_string()));
    }

    let mut wrapping = derive_wrapping_key(passphrase, &salt)?;
    let cipher = Aes256Gcm::new((&wrapping).into());
    wrapping.zeroize();

    let master = cipher
        .decrypt(Nonce::from_slice(&nonce), wrapped.as_slice())
        .map_err(|_| Error::KeyFile("master key unwrap failed (wrong passphrase?)".to_string()))?;

    let bytes: [u8; 32] = master
        .as_slice()
        .try_into()
        .map_err(|_| Error::KeyFile("malformed wrapped key".to_string()))?;
    Ok(MasterKey::from_bytes(bytes))
}
