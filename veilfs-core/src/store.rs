/// Underlying byte store
///
/// All raw I/O goes through the `Store` trait: byte-range reads and writes
/// against ciphertext storage plus raw attribute queries. `FsStore` is the
/// filesystem-backed implementation; tests substitute their own.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::time::SystemTime;

use crate::flags::OpenFlags;

/// Raw attributes of the stored (ciphertext) file.
///
/// `size` is the on-disk size; the file adapter rewrites it to the logical
/// size before attributes reach callers. Other fields pass through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawAttr {
    /// On-disk size in bytes
    pub size: u64,
    /// Whether the underlying file is read-only
    pub readonly: bool,
    /// Last modification time
    pub modified: SystemTime,
}

/// Byte-range access to ciphertext storage.
///
/// A store handle is exclusively owned by one file adapter; concurrent use
/// requires external synchronization.
pub trait Store {
    /// Read up to `buf.len()` bytes at `offset`. Returns the number of
    /// bytes read; a short count means end-of-file was reached.
    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<usize>;

    /// Write all of `buf` at `offset`, extending the file if needed.
    /// Returns the number of bytes written.
    fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize>;

    /// Fetch raw attributes, including the on-disk size.
    fn raw_attr(&mut self) -> io::Result<RawAttr>;
}

/// Filesystem-backed store over a `std::fs::File`.
pub struct FsStore {
    file: File,
}

impl FsStore {
    /// Open a file with already-normalized flags.
    pub fn open(path: impl AsRef<Path>, flags: OpenFlags) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(flags.readable())
            .write(flags.writable())
            .create(flags.is_create())
            .truncate(flags.is_truncate())
            .open(path)?;
        Ok(Self { file })
    }

    /// Wrap an already-open file.
    pub fn from_file(file: File) -> Self {
        Self { file }
    }
}

impl Store for FsStore {
    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        self.file.seek(SeekFrom::Start(offset))?;
        let mut filled = 0;
        while filled < buf.len() {
            match self.file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }

    fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn raw_attr(&mut self) -> io::Result<RawAttr> {
        let meta = self.file.metadata()?;
        Ok(RawAttr {
            size: meta.len(),
            readonly: meta.permissions().readonly(),
            modified: meta.modified()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::normalize_flags;
    use tempfile::TempDir;

    fn open_rw(dir: &TempDir) -> FsStore {
        let (flags, _) = normalize_flags(OpenFlags::read_write().with_create());
        FsStore::open(dir.path().join("store.bin"), flags).unwrap()
    }

    #[test]
    fn test_write_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut store = open_rw(&dir);

        assert_eq!(store.write_at(b"hello world", 0).unwrap(), 11);

        let mut buf = [0u8; 5];
        assert_eq!(store.read_at(&mut buf, 6).unwrap(), 5);
        assert_eq!(&buf, b"world");
    }

    #[test]
    fn test_short_read_at_eof() {
        let dir = TempDir::new().unwrap();
        let mut store = open_rw(&dir);

        store.write_at(b"abc", 0).unwrap();

        let mut buf = [0u8; 16];
        assert_eq!(store.read_at(&mut buf, 0).unwrap(), 3);
        assert_eq!(&buf[..3], b"abc");

        assert_eq!(store.read_at(&mut buf, 100).unwrap(), 0);
    }

    #[test]
    fn test_write_past_end_extends() {
        let dir = TempDir::new().unwrap();
        let mut store = open_rw(&dir);

        store.write_at(b"xy", 10).unwrap();
        assert_eq!(store.raw_attr().unwrap().size, 12);

        // The gap reads back as zeros
        let mut buf = [0xFFu8; 12];
        assert_eq!(store.read_at(&mut buf, 0).unwrap(), 12);
        assert_eq!(&buf[..10], &[0u8; 10]);
        assert_eq!(&buf[10..], b"xy");
    }

    #[test]
    fn test_raw_attr_size_tracks_writes() {
        let dir = TempDir::new().unwrap();
        let mut store = open_rw(&dir);

        assert_eq!(store.raw_attr().unwrap().size, 0);
        store.write_at(&[0u8; 100], 0).unwrap();
        assert_eq!(store.raw_attr().unwrap().size, 100);
        store.write_at(&[0u8; 10], 50).unwrap();
        assert_eq!(store.raw_attr().unwrap().size, 100);
    }

    #[test]
    fn test_open_missing_file_fails_without_create() {
        let dir = TempDir::new().unwrap();
        let (flags, _) = normalize_flags(OpenFlags::read_write());
        assert!(FsStore::open(dir.path().join("absent.bin"), flags).is_err());
    }
}
