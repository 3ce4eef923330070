use scribe_types::ErrorKind;
use thiserror::Error;

/// Top-level CLI error: anything a command can surface.
///
/// Rendered on stderr as `error: <KIND>: <detail>` with exit code 1.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Repo(#[from] scribe_repo::RepoError),

    #[error(transparent)]
    Store(#[from] scribe_store::StoreError),

    #[error(transparent)]
    Envelope(#[from] scribe_envelope::EnvelopeError),

    #[error(transparent)]
    Cdc(#[from] scribe_cdc::CdcError),

    #[error(transparent)]
    Types(#[from] scribe_types::TypeError),

    #[error("invalid argument: {0}")]
    InvalidArg(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),
}

impl CliError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Repo(e) => e.kind(),
            Self::Store(e) => e.kind(),
            Self::Envelope(e) => e.kind(),
            Self::Cdc(e) => e.kind(),
            Self::Types(e) => e.kind(),
            Self::InvalidArg(_) => ErrorKind::InvalidArg,
            Self::Io(_) => ErrorKind::Io,
            Self::Signal(_) => ErrorKind::Io,
        }
    }
}
