/// Test utilities and helpers for VeilFS testing
///
/// This module provides common fixtures to simplify writing integration
/// tests against real files on disk.

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;
use veilfs_core::{EncryptedFile, FsContext, FsStore, MasterKey, OpenFlags, OverlayConfig};

/// Test vault that manages a temporary directory and a shared crypto
/// context.
pub struct TestVault {
    pub ctx: Arc<FsContext>,
    dir: TempDir,
}

impl TestVault {
    /// Create a vault with a fixed key and the default block size.
    pub fn new() -> Self {
        Self::with_config(OverlayConfig::default())
    }

    /// Create a vault with a custom configuration.
    pub fn with_config(config: OverlayConfig) -> Self {
        config.validate().expect("invalid test config");
        let key = MasterKey::from_bytes([42u8; 32]);
        Self {
            ctx: Arc::new(FsContext::new(&key, &config)),
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    /// Create a vault sharing this vault's directory but using a different
    /// master key (for wrong-key scenarios).
    pub fn with_key(&self, key: MasterKey) -> TestVaultView {
        TestVaultView {
            ctx: Arc::new(FsContext::new(&key, &OverlayConfig::default())),
            dir: self.dir.path().to_path_buf(),
        }
    }

    /// Path of a file inside the vault directory.
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Open (creating if needed) a read-write encrypted file.
    pub fn open_rw(&self, name: &str) -> EncryptedFile<FsStore> {
        self.open_flags(name, OpenFlags::read_write().with_create())
            .expect("Failed to open encrypted file")
    }

    /// Open with explicit flags.
    pub fn open_flags(
        &self,
        name: &str,
        flags: OpenFlags,
    ) -> veilfs_core::Result<EncryptedFile<FsStore>> {
        EncryptedFile::open(self.ctx.clone(), self.path(name), flags)
    }

    /// Raw (ciphertext) size of a stored file, zero if absent.
    pub fn raw_len(&self, name: &str) -> u64 {
        std::fs::metadata(self.path(name))
            .map(|m| m.len())
            .unwrap_or(0)
    }
}

impl Default for TestVault {
    fn default() -> Self {
        Self::new()
    }
}

/// A second context over an existing vault directory.
pub struct TestVaultView {
    pub ctx: Arc<FsContext>,
    dir: PathBuf,
}

impl TestVaultView {
    pub fn open_flags(
        &self,
        name: &str,
        flags: OpenFlags,
    ) -> veilfs_core::Result<EncryptedFile<FsStore>> {
        EncryptedFile::open(self.ctx.clone(), self.dir.join(name), flags)
    }
}
