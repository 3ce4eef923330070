use scribe_types::{Digest, ErrorKind};
use thiserror::Error;

/// Errors from the storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying SQLite failure.
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    /// Filesystem failure in the object store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The requested row does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller handed in something unusable.
    #[error("invalid argument: {0}")]
    InvalidArg(String),

    /// The requested object is not in the object store.
    #[error("object missing: {0}")]
    ObjectMissing(Digest),

    /// Stored data could not be decoded (bad hex, bad operation tag).
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Db(_) => ErrorKind::Db,
            Self::Io(_) => ErrorKind::Io,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidArg(_) => ErrorKind::InvalidArg,
            Self::ObjectMissing(_) => ErrorKind::ObjectMissing,
            Self::Corrupt(_) => ErrorKind::RepoCorrupt,
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
