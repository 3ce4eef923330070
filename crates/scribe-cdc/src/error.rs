use scribe_types::ErrorKind;
use thiserror::Error;

/// Errors from the CDC subsystem.
#[derive(Debug, Error)]
pub enum CdcError {
    /// Could not establish (or lost) the upstream connection.
    #[error("postgres connection failed: {0}")]
    Connect(#[source] postgres::Error),

    /// A query or command against the upstream failed.
    #[error("postgres query failed: {0}")]
    Query(#[source] postgres::Error),

    /// Logical-replication prerequisite or operation failed.
    #[error("replication error: {0}")]
    Replication(String),

    /// No connection is open where one is required.
    #[error("not connected to postgres")]
    NotConnected,

    /// The caller handed in something unusable (bad identifier, bad mode).
    #[error("invalid argument: {0}")]
    InvalidArg(String),

    /// An upstream row could not be decoded into a change.
    #[error("cannot decode captured row: {0}")]
    Decode(String),

    /// Failure while committing a captured change into the repository.
    #[error(transparent)]
    Repo(#[from] scribe_repo::RepoError),
}

impl CdcError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connect(_) | Self::NotConnected => ErrorKind::PgConnect,
            Self::Query(_) => ErrorKind::PgQuery,
            Self::Replication(_) => ErrorKind::PgReplication,
            Self::InvalidArg(_) => ErrorKind::InvalidArg,
            Self::Decode(_) => ErrorKind::JsonSchema,
            Self::Repo(e) => e.kind(),
        }
    }
}
