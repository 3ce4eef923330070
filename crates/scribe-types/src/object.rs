use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The kind of an auxiliary content-addressed object.
///
/// Objects live outside the commit index (in the `objects` table or the
/// filesystem object store) and are addressed by a digest computed over a
/// Git-style `"<kind> <size>\0"` header plus the content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// Raw data blob.
    Blob,
    /// Collection of blob references.
    Tree,
    /// Serialized commit envelope.
    Commit,
}

impl ObjectKind {
    /// The textual form used in storage and object headers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blob" => Ok(Self::Blob),
            "tree" => Ok(Self::Tree),
            "commit" => Ok(Self::Commit),
            other => Err(TypeError::UnknownObjectKind(other.to_string())),
        }
    }
}
