pub mod error;
pub mod flags;
pub mod geometry;
pub mod cipher;
pub mod keyfile; // passphrase-wrapped master key sidecar
pub mod store;
pub mod file;
pub mod config;

pub use error::{Error, Result};
pub use cipher::{BlockCipher, MasterKey};
pub use config::OverlayConfig;
pub use file::{EncryptedFile, FsContext};
pub use flags::{normalize_flags, OpenFlags};
pub use geometry::{BlockLayout, BlockSpan, DEFAULT_BLOCK_SIZE};
pub use store::{FsStore, RawAttr, Store};
