use scribe_types::ErrorKind;
use thiserror::Error;

/// Errors from envelope construction and verification.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// A required field is absent at finalize time.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// The stored commit id does not match the recomputed one.
    #[error("commit id mismatch: stored {stored}, computed {computed}")]
    HashMismatch { stored: String, computed: String },

    /// Canonical JSON could not be produced or parsed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EnvelopeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingField(_) => ErrorKind::InvalidArg,
            Self::HashMismatch { .. } => ErrorKind::HashMismatch,
            Self::Json(_) => ErrorKind::JsonParse,
        }
    }
}
