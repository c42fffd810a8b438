/// Per-block encryption for the overlay
///
/// Each plaintext block is sealed independently with AES-256-GCM. The
/// nonce is derived from the block number, so a ciphertext block only
/// authenticates at the position it was written for.

use std::fmt;

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{Error, Result};

/// GCM tag length - the fixed per-block ciphertext overhead.
const TAG_LEN: usize = 16;

/// A 256-bit master key. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    bytes: [u8; 32],
}

impl MasterKey {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        getrandom::getrandom(&mut bytes).expect("getrandom failed");
        Self { bytes }
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey(***)")
    }
}

/// Stateless per-block cipher. Shared read-only across any number of open
/// files.
pub struct BlockCipher {
    cipher: Aes256Gcm,
}

impl BlockCipher {
    pub fn new(key: &MasterKey) -> Self {
        Self {
            cipher: Aes256Gcm::new(key.as_bytes().into()),
        }
    }

    /// Ciphertext bytes added to every plaintext block.
    pub fn block_overhead() -> usize {
        TAG_LEN
    }

    /// Encrypt one plaintext block into one ciphertext block.
    pub fn encrypt_block(&self, plain: &[u8], block_no: u64) -> Result<Vec<u8>> {
        if plain.is_empty() {
            return Ok(Vec::new());
        }
        let nonce_bytes = block_nonce(block_no);
        let nonce = Nonce::from_slice(&nonce_bytes);
        self.cipher
            .encrypt(nonce, plain)
            .map_err(|e| Error::Encrypt(format!("block {} encryption failed: {}", block_no, e)))
    }

    /// Decrypt and authenticate one ciphertext block.
    ///
    /// An empty input is a zero-length file tail, not a cipher call.
    pub fn decrypt_block(&self, cipher_block: &[u8], block_no: u64) -> Result<Vec<u8>> {
        if cipher_block.is_empty() {
            return Ok(Vec::new());
        }
        let nonce_bytes = block_nonce(block_no);
        let nonce = Nonce::from_slice(&nonce_bytes);
        self.cipher
            .decrypt(nonce, cipher_block)
            .map_err(|_| Error::Decrypt { block: block_no })
    }
}

/// Deterministic nonce from the block number (low 8 bytes, little-endian).
fn block_nonce(block_no: u64) -> [u8; 12] {
    let mut nonce = [0u8; 12];
    nonce[0..8].copy_from_slice(&block_no.to_le_bytes());
    nonce
}
