/// Encrypted file adapter
///
/// The stateful handle bound to one open file. Splits logical byte ranges
/// onto the block grid, delegates raw I/O to the store handle and block
/// transforms to the cipher, and reports translated sizes on attribute
/// queries.

use std::cmp;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::debug;

use crate::{
    cipher::{BlockCipher, MasterKey},
    config::OverlayConfig,
    flags::{normalize_flags, OpenFlags},
    geometry::BlockLayout,
    store::{FsStore, RawAttr, Store},
    Error, Result,
};

/// Immutable cipher-and-geometry context shared by every open file.
///
/// Constructed once from the master key and configuration, then passed by
/// shared reference; never reached through ambient global state.
pub struct FsContext {
    cipher: BlockCipher,
    layout: BlockLayout,
}

impl FsContext {
    pub fn new(key: &MasterKey, config: &OverlayConfig) -> Self {
        Self {
            cipher: BlockCipher::new(key),
            layout: BlockLayout::new(config.block_size, BlockCipher::block_overhead()),
        }
    }

    pub fn layout(&self) -> &BlockLayout {
        &self.layout
    }

    pub fn cipher(&self) -> &BlockCipher {
        &self.cipher
    }
}

/// One open file in the encrypted overlay.
///
/// Owns its store handle exclusively; the context is shared. A handle
/// serves one caller at a time: the read-modify-write sequence in
/// [`write`](EncryptedFile::write) is not atomic against a concurrent
/// writer to the same block.
pub struct EncryptedFile<S: Store> {
    store: S,
    ctx: Arc<FsContext>,
    /// Whether the file was originally requested write-only
    write_only: bool,
}

impl EncryptedFile<FsStore> {
    /// Open `path` through the filesystem store.
    ///
    /// Requested flags are normalized first (write-only becomes
    /// read-write, append is cleared); the underlying open uses the
    /// rewritten flags. No cryptographic work happens at open time.
    pub fn open(ctx: Arc<FsContext>, path: impl AsRef<Path>, flags: OpenFlags) -> Result<Self> {
        let (flags, write_only) = normalize_flags(flags);
        let store = FsStore::open(path, flags).map_err(Error::StoreOpen)?;
        Ok(Self::from_store(ctx, store, write_only))
    }
}

impl<S: Store> fmt::Debug for EncryptedFile<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedFile")
            .field("write_only", &self.write_only)
            .finish_non_exhaustive()
    }
}

impl<S: Store> EncryptedFile<S> {
    /// Wrap an already-open store handle.
    pub fn from_store(ctx: Arc<FsContext>, store: S, write_only: bool) -> Self {
        Self {
            store,
            ctx,
            write_only,
        }
    }

    /// Whether the original open intent was write-only.
    pub fn is_write_only(&self) -> bool {
        self.write_only
    }

    /// Read `length` plaintext bytes at logical `offset`.
    ///
    /// Returns fewer bytes when the range extends past end-of-file. Each
    /// touched block is fetched and decrypted exactly once per call;
    /// nothing is cached. The first store or decryption failure aborts the
    /// whole read.
    pub fn read(&mut self, offset: u64, length: usize) -> Result<Bytes> {
        debug!(offset, length, "read");
        let layout = self.ctx.layout;
        let mut out = BytesMut::with_capacity(length);

        for span in layout.split(offset, length) {
            let (c_offset, c_len) = layout.ciphertext_range(&span);
            let mut cipher_block = vec![0u8; c_len];
            let n = self
                .store
                .read_at(&mut cipher_block, c_offset)
                .map_err(Error::StoreRead)?;
            if n == 0 {
                break;
            }
            cipher_block.truncate(n);

            let plain = self.ctx.cipher.decrypt_block(&cipher_block, span.block_no)?;
            let cropped = layout.crop(&span, &plain);
            let at_eof = cropped.len() < span.len;
            out.put_slice(&cropped);
            if at_eof {
                break;
            }
        }
        Ok(out.freeze())
    }

    /// Write `data` at logical `offset`.
    ///
    /// Returns the number of bytes consumed from `data`, which equals
    /// `data.len()` unless an error aborts the call. Partial-block writes
    /// go through a read-modify-write cycle so bytes outside the written
    /// sub-range survive; a block whose current content fails decryption
    /// aborts the write before anything is stored for it. Blocks are
    /// committed in ascending order; on error, blocks already written stay
    /// committed and the error is returned.
    ///
    /// A write whose first touched block lies past the current last block
    /// leaves the intervening blocks as holes; holes do not decrypt.
    pub fn write(&mut self, offset: u64, data: &[u8]) -> Result<usize> {
        debug!(offset, length = data.len(), "write");
        let layout = self.ctx.layout;
        let plain_bs = layout.plain_block_size();
        let mut consumed = 0usize;

        for span in layout.split(offset, data.len()) {
            let chunk = &data[consumed..consumed + span.len];

            let block = if layout.is_partial(&span) {
                // RMW: fetch the block's current content before overlaying
                let (p_offset, p_len) = layout.plaintext_range(&span);
                let current = self.read(p_offset, p_len)?;

                let mut block = vec![0u8; plain_bs];
                block[..current.len()].copy_from_slice(&current);
                block[span.skip..span.skip + span.len].copy_from_slice(chunk);
                // A write may extend a short last block but never shrinks
                // one with more trailing data than it touches.
                block.truncate(cmp::max(current.len(), span.skip + span.len));
                block
            } else {
                chunk.to_vec()
            };

            let cipher_block = self.ctx.cipher.encrypt_block(&block, span.block_no)?;
            let (c_offset, _) = layout.ciphertext_range(&span);
            self.store
                .write_at(&cipher_block, c_offset)
                .map_err(Error::StoreWrite)?;
            consumed += span.len;
        }
        Ok(consumed)
    }

    /// Raw attributes with the size field rewritten to the logical
    /// (plaintext) size. Other fields pass through untouched.
    pub fn attr(&mut self) -> Result<RawAttr> {
        let mut attr = self.store.raw_attr().map_err(Error::AttrFetch)?;
        attr.size = self.ctx.layout.plain_size(attr.size);
        Ok(attr)
    }
}
