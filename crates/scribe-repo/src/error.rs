use scribe_types::ErrorKind;
use thiserror::Error;

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepoError {
    /// No `.scribe` directory between the start path and the filesystem root.
    #[error("not a scribe repository (or any parent): {0}")]
    NotARepo(String),

    /// `init` was asked to create a repository where one already exists.
    #[error("repository already exists at {0}")]
    RepoExists(String),

    /// The repository layout or schema is unusable.
    #[error("repository corrupt: {0}")]
    Corrupt(String),

    /// Storage-layer failure.
    #[error(transparent)]
    Store(#[from] scribe_store::StoreError),

    /// Envelope finalize/verify failure.
    #[error(transparent)]
    Envelope(#[from] scribe_envelope::EnvelopeError),

    /// Filesystem failure outside the stores.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `config.json` could not be parsed.
    #[error("config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

impl RepoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotARepo(_) => ErrorKind::NotARepo,
            Self::RepoExists(_) => ErrorKind::RepoExists,
            Self::Corrupt(_) => ErrorKind::RepoCorrupt,
            Self::Store(e) => e.kind(),
            Self::Envelope(e) => e.kind(),
            Self::Io(_) => ErrorKind::Io,
            Self::ConfigParse(_) => ErrorKind::JsonParse,
        }
    }
}
