use std::fmt;

use thiserror::Error;

/// The stable error taxonomy shared by every Scribe subsystem.
///
/// Each crate defines its own error enum carrying detail and source errors;
/// all of them classify into one of these kinds via a `kind()` accessor so
/// callers (and the CLI) can react to the category without matching on every
/// concrete type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Nomem,
    InvalidArg,
    NotFound,
    NotARepo,
    RepoExists,
    RepoCorrupt,
    Io,
    Db,
    ObjectMissing,
    HashMismatch,
    Crypto,
    PgConnect,
    PgQuery,
    PgReplication,
    JsonParse,
    JsonSchema,
}

impl ErrorKind {
    /// The stable textual token for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nomem => "NOMEM",
            Self::InvalidArg => "INVALID_ARG",
            Self::NotFound => "NOT_FOUND",
            Self::NotARepo => "NOT_A_REPO",
            Self::RepoExists => "REPO_EXISTS",
            Self::RepoCorrupt => "REPO_CORRUPT",
            Self::Io => "IO",
            Self::Db => "DB",
            Self::ObjectMissing => "OBJECT_MISSING",
            Self::HashMismatch => "HASH_MISMATCH",
            Self::Crypto => "CRYPTO",
            Self::PgConnect => "PG_CONNECT",
            Self::PgQuery => "PG_QUERY",
            Self::PgReplication => "PG_REPLICATION",
            Self::JsonParse => "JSON_PARSE",
            Self::JsonSchema => "JSON_SCHEMA",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced by the foundation types themselves.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid length: expected {expected} hex digits, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("unknown operation: {0:?}")]
    UnknownOperation(String),

    #[error("unknown object kind: {0:?}")]
    UnknownObjectKind(String),
}

impl TypeError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidArg
    }
}
