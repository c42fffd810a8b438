use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("store open failed: {0}")]
    StoreOpen(#[source] io::Error),

    #[error("store read failed: {0}")]
    StoreRead(#[source] io::Error),

    #[error("store write failed: {0}")]
    StoreWrite(#[source] io::Error),

    #[error("attribute fetch failed: {0}")]
    AttrFetch(#[source] io::Error),

    #[error("block {block} failed decryption")]
    Decrypt { block: u64 },

    #[error("encryption error: {0}")]
    Encrypt(String),

    #[error("key file error: {0}")]
    KeyFile(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// Returns a stable error code for this error variant.
    /// These codes are stable and can be used by clients for error classification.
    pub fn code(&self) -> &'static str {
        match self {
            Error::StoreOpen(_) => "STORE_OPEN",
            Error::StoreRead(_) => "STORE_READ",
            Error::StoreWrite(_) => "STORE_WRITE",
            Error::AttrFetch(_) => "ATTR_FETCH",
            Error::Decrypt { .. } => "DECRYPT",
            Error::Encrypt(_) => "ENCRYPT",
            Error::KeyFile(_) => "KEY_FILE",
            Error::InvalidArgument(_) => "INVALID_ARGUMENT",
        }
    }

    /// Returns true if this error is potentially retryable.
    ///
    /// Store I/O errors are transient from the adapter's point of view;
    /// a block that fails authentication will keep failing until its
    /// ciphertext changes, so decryption failures are permanent.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::StoreOpen(_) => true,
            Error::StoreRead(_) => true,
            Error::StoreWrite(_) => true,
            Error::AttrFetch(_) => true,

            Error::Decrypt { .. } => false,
            Error::Encrypt(_) => false,
            Error::KeyFile(_) => false,
            Error::InvalidArgument(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
