use postgres::types::ToSql;
use postgres::{Client, NoTls, Row};
use tracing::debug;

use crate::error::CdcError;

/// Blocking PostgreSQL connection with explicit connect/disconnect state.
///
/// The monitor loop disconnects and reconnects on failure, so the connection
/// is held as an `Option` rather than established in the constructor.
pub struct PgClient {
    connection_string: String,
    client: Option<Client>,
}

impl PgClient {
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            client: None,
        }
    }

    /// Open a fresh connection, replacing any existing one.
    pub fn connect(&mut self) -> Result<(), CdcError> {
        self.client = None;
        let client =
            Client::connect(&self.connection_string, NoTls).map_err(CdcError::Connect)?;
        debug!("connected to postgres");
        self.client = Some(client);
        Ok(())
    }

    pub fn disconnect(&mut self) {
        self.client = None;
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// Connect if no connection is open.
    pub fn ensure_connected(&mut self) -> Result<(), CdcError> {
        if self.client.is_none() {
            self.connect()?;
        }
        Ok(())
    }

    fn client(&mut self) -> Result<&mut Client, CdcError> {
        self.client.as_mut().ok_or(CdcError::NotConnected)
    }

    /// Run one or more commands, no results expected.
    pub fn execute_batch(&mut self, sql: &str) -> Result<(), CdcError> {
        self.client()?.batch_execute(sql).map_err(CdcError::Query)
    }

    pub fn execute(&mut self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64, CdcError> {
        self.client()?.execute(sql, params).map_err(CdcError::Query)
    }

    pub fn query(
        &mut self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, CdcError> {
        self.client()?.query(sql, params).map_err(CdcError::Query)
    }

    pub fn query_one(
        &mut self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Row, CdcError> {
        self.client()?.query_one(sql, params).map_err(CdcError::Query)
    }
}

/// Validate a SQL identifier (optionally schema-qualified) before it is
/// interpolated into DDL. Bind parameters cannot stand in for identifiers,
/// so anything else is rejected outright.
pub(crate) fn validate_identifier(name: &str) -> Result<(), CdcError> {
    let valid_part = |part: &str| {
        !part.is_empty()
            && part
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && part
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
    };

    let mut parts = name.split('.');
    let ok = match (parts.next(), parts.next(), parts.next()) {
        (Some(first), None, _) => valid_part(first),
        (Some(first), Some(second), None) => valid_part(first) && valid_part(second),
        _ => false,
    };

    if ok {
        Ok(())
    } else {
        Err(CdcError::InvalidArg(format!("invalid identifier {name:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_identifiers_pass() {
        for name in ["orders", "order_items", "_private", "t$1", "public.orders"] {
            assert!(validate_identifier(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn hostile_identifiers_fail() {
        for name in [
            "",
            "1orders",
            "orders; DROP TABLE users",
            "orders--",
            "a.b.c",
            "a..b",
            ".orders",
            "orders ",
            "ord ers",
            "orders\"",
        ] {
            assert!(validate_identifier(name).is_err(), "{name:?}");
        }
    }

    #[test]
    fn unconnected_client_reports_not_connected() {
        let mut client = PgClient::new("host=localhost");
        assert!(!client.is_connected());
        let err = client.execute_batch("SELECT 1").unwrap_err();
        assert!(matches!(err, CdcError::NotConnected));
    }

    #[test]
    fn disconnect_is_idempotent() {
        let mut client = PgClient::new("host=localhost");
        client.disconnect();
        client.disconnect();
        assert!(!client.is_connected());
    }
}
