/// Open-intent flags and their normalization
///
/// Every open handle needs read access for read-modify-write cycles, and
/// append mode is incompatible with offset-addressed block writes. Callers
/// hand us whatever they were asked for; `normalize_flags` rewrites that
/// intent into something the block layer can actually service.

use tracing::debug;

/// Open flags with a POSIX-flavored bit layout.
///
/// The low two bits form the access mode (read-only / write-only /
/// read-write); the remaining bits are independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFlags(u32);

impl OpenFlags {
    pub const READ_ONLY: u32 = 0o0;
    pub const WRITE_ONLY: u32 = 0o1;
    pub const READ_WRITE: u32 = 0o2;
    const ACCESS_MODE: u32 = 0o3;

    pub const CREATE: u32 = 0o100;
    pub const TRUNCATE: u32 = 0o1000;
    pub const APPEND: u32 = 0o2000;

    pub fn new(bits: u32) -> Self {
        Self(bits)
    }

    pub fn read_only() -> Self {
        Self(Self::READ_ONLY)
    }

    pub fn write_only() -> Self {
        Self(Self::WRITE_ONLY)
    }

    pub fn read_write() -> Self {
        Self(Self::READ_WRITE)
    }

    pub fn with_create(mut self) -> Self {
        self.0 |= Self::CREATE;
        self
    }

    pub fn with_truncate(mut self) -> Self {
        self.0 |= Self::TRUNCATE;
        self
    }

    pub fn with_append(mut self) -> Self {
        self.0 |= Self::APPEND;
        self
    }

    fn access_mode(&self) -> u32 {
        self.0 & Self::ACCESS_MODE
    }

    pub fn is_read_only(&self) -> bool {
        self.access_mode() == Self::READ_ONLY
    }

    pub fn is_write_only(&self) -> bool {
        self.access_mode() == Self::WRITE_ONLY
    }

    pub fn is_read_write(&self) -> bool {
        self.access_mode() == Self::READ_WRITE
    }

    pub fn is_append(&self) -> bool {
        self.0 & Self::APPEND != 0
    }

    pub fn is_create(&self) -> bool {
        self.0 & Self::CREATE != 0
    }

    pub fn is_truncate(&self) -> bool {
        self.0 & Self::TRUNCATE != 0
    }

    /// Whether the handle can be read from.
    pub fn readable(&self) -> bool {
        !self.is_write_only()
    }

    /// Whether the handle can be written to.
    pub fn writable(&self) -> bool {
        !self.is_read_only()
    }

    pub fn bits(&self) -> u32 {
        self.0
    }
}

/// Rewrite requested open flags for block-layer use.
///
/// Write-only access becomes read-write (the RMW pre-read would fail
/// otherwise) and the append bit is cleared (block writes address exact
/// offsets). Returns the rewritten flags and whether the original intent
/// was write-only.
pub fn normalize_flags(flags: OpenFlags) -> (OpenFlags, bool) {
    let mut bits = flags.bits();
    let write_only = flags.is_write_only();

    if write_only {
        bits = (bits & !OpenFlags::ACCESS_MODE) | OpenFlags::READ_WRITE;
    }
    bits &= !OpenFlags::APPEND;

    let normalized = OpenFlags::new(bits);
    debug!(
        before = flags.bits(),
        after = normalized.bits(),
        write_only,
        "normalized open flags"
    );
    (normalized, write_only)
}
