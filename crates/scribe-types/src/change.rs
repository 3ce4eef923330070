use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::digest::Digest;
use crate::error::TypeError;

/// The kind of row mutation a [`Change`] describes.
///
/// Stored and serialized as the uppercase SQL verb; in memory it is a sum
/// type so invalid operations cannot circulate past the parse boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Insert,
    Update,
    Delete,
}

impl Operation {
    /// The textual form used in storage and canonical JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INSERT" => Ok(Self::Insert),
            "UPDATE" => Ok(Self::Update),
            "DELETE" => Ok(Self::Delete),
            other => Err(TypeError::UnknownOperation(other.to_string())),
        }
    }
}

impl Serialize for Operation {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Operation {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A single row-level mutation.
///
/// Digest invariants follow the operation: an INSERT has a zero
/// `before_digest`, a DELETE has a zero `after_digest`, and a well-formed
/// UPDATE carries both. The serde field names are the canonical commit-JSON
/// keys, so this struct serializes directly into the hashed form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// Source table (or collection) name.
    #[serde(rename = "table")]
    pub table_name: String,
    /// What happened to the row.
    pub operation: Operation,
    /// JSON-encoded primary key of the affected row.
    #[serde(rename = "pk")]
    pub primary_key: String,
    /// Digest of the row image before the change. Zero for INSERT.
    #[serde(
        rename = "before_hash",
        default,
        skip_serializing_if = "Digest::is_zero"
    )]
    pub before_digest: Digest,
    /// Digest of the row image after the change. Zero for DELETE.
    #[serde(
        rename = "after_hash",
        default,
        skip_serializing_if = "Digest::is_zero"
    )]
    pub after_digest: Digest,
}

impl Change {
    pub fn new(
        table_name: impl Into<String>,
        operation: Operation,
        primary_key: impl Into<String>,
        before_digest: Digest,
        after_digest: Digest,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            operation,
            primary_key: primary_key.into(),
            before_digest,
            after_digest,
        }
    }
}

/// Who made a change: a human or automated actor.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Actor identifier, e.g. `user:alice` or `service:etl-worker`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Actor role, e.g. `data_engineer` or `automated`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// What process executed a change.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInfo {
    /// Process name, e.g. `monthly_reconciliation.py`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Version token, e.g. `git:v2.1.0`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Invocation parameters, e.g. `--dry-run`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<String>,
    /// Source file path or URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}
