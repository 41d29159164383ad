use thiserror::Error;

use fdb_core::SchemaError;

#[derive(Debug, Error)]
pub enum CatalogueError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to acquire lock on {0}")]
    Lock(std::path::PathBuf),

    #[error("TOC record at offset {offset} has bad magic 0x{magic:04x}")]
    BadMagic { offset: u64, magic: u16 },

    #[error("TOC record at offset {0} has unsupported version {1}")]
    UnsupportedVersion(u64, u8),

    #[error("SubToc at {0} is missing")]
    MissingSubToc(std::path::PathBuf),

    #[error("index file is corrupt: {0}")]
    Corrupt(String),

    #[error("index file at load factor limit, capacity {0} exceeded")]
    CapacityExceeded(usize),

    #[error("failed to encode/decode TOC record: {0}")]
    Codec(#[from] Box<bincode::ErrorKind>),

    #[error("database at {0} does not exist")]
    NoSuchDatabase(std::path::PathBuf),

    #[error("wipe refused: request matches {0} databases, set unsafe_wipe_all to allow")]
    AmbiguousWipe(usize),
}
