use std::str::FromStr;

use scribe_types::Operation;

use crate::error::CdcError;

/// A normalized row event captured from the upstream database.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowChange {
    /// Source table.
    pub table_name: String,
    pub operation: Operation,
    /// JSON-encoded primary key.
    pub primary_key_json: String,
    /// Full row image before the change. `None` for INSERT.
    pub before_json: Option<String>,
    /// Full row image after the change. `None` for DELETE.
    pub after_json: Option<String>,
    /// Upstream transaction id.
    pub txid: i64,
    /// Log sequence number (0 in trigger mode).
    pub lsn: i64,
}

/// Which capture mechanism the monitor drives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CdcMode {
    /// Audit-table triggers, polled.
    Trigger,
    /// Logical-replication slot.
    #[default]
    Logical,
}

impl FromStr for CdcMode {
    type Err = CdcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trigger" => Ok(Self::Trigger),
            "logical" => Ok(Self::Logical),
            other => Err(CdcError::InvalidArg(format!(
                "unknown mode {other:?}, use 'trigger' or 'logical'"
            ))),
        }
    }
}

/// Monitor configuration.
#[derive(Clone, Debug)]
pub struct MonitorConfig {
    pub connection_string: String,
    pub mode: CdcMode,
    /// Tables to watch.
    pub tables: Vec<String>,
    /// Idle sleep between polls, in milliseconds.
    pub poll_interval_ms: u64,
    pub slot_name: String,
    pub publication_name: String,
    /// Upper bound on rows claimed per poll.
    pub batch_size: i64,
}

impl MonitorConfig {
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            mode: CdcMode::default(),
            tables: Vec::new(),
            poll_interval_ms: 1000,
            slot_name: "scribe_slot".into(),
            publication_name: "scribe_pub".into(),
            batch_size: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parses() {
        assert_eq!("trigger".parse::<CdcMode>().unwrap(), CdcMode::Trigger);
        assert_eq!("logical".parse::<CdcMode>().unwrap(), CdcMode::Logical);
        assert!("streaming".parse::<CdcMode>().is_err());
    }

    #[test]
    fn default_mode_is_logical() {
        assert_eq!(CdcMode::default(), CdcMode::Logical);
    }

    #[test]
    fn config_defaults() {
        let config = MonitorConfig::new("host=localhost");
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.slot_name, "scribe_slot");
        assert_eq!(config.publication_name, "scribe_pub");
        assert_eq!(config.batch_size, 100);
        assert!(config.tables.is_empty());
    }
}
