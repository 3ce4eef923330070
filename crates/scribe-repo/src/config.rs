use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::RepoError;

/// Repository configuration, persisted as `.scribe/config.json`.
///
/// Unknown keys in the file are ignored on read, so configs written by newer
/// versions stay loadable.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Default commit author, e.g. `user:alice`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    /// Default author role, e.g. `data_engineer`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_role: Option<String>,
    /// PostgreSQL connection string for the CDC monitor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pg_connection_string: Option<String>,
    /// Tables the CDC monitor watches.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub watched_tables: Vec<String>,
}

impl Config {
    /// The configuration a fresh repository starts with.
    pub fn initial() -> Self {
        Self {
            author_id: Some("user:anonymous".into()),
            author_role: Some("developer".into()),
            pg_connection_string: None,
            watched_tables: Vec::new(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, RepoError> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), RepoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn initial_defaults() {
        let config = Config::initial();
        assert_eq!(config.author_id.as_deref(), Some("user:anonymous"));
        assert_eq!(config.author_role.as_deref(), Some("developer"));
        assert!(config.pg_connection_string.is_none());
        assert!(config.watched_tables.is_empty());
    }

    #[test]
    fn save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let config = Config {
            author_id: Some("user:alice".into()),
            author_role: Some("data_engineer".into()),
            pg_connection_string: Some("host=localhost dbname=prod".into()),
            watched_tables: vec!["orders".into(), "customers".into()],
        };
        config.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"author_id":"user:x","future_knob":true,"watched_tables":[]}"#,
        )
        .unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.author_id.as_deref(), Some("user:x"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, RepoError::Io(_)));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            Config::load(&path).unwrap_err(),
            RepoError::ConfigParse(_)
        ));
    }
}
