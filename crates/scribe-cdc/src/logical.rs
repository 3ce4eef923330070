//! Logical-replication capture: a `pgoutput` slot plus a publication over
//! the watched tables.
//!
//! The adapter owns slot and publication lifecycle and drains the slot in
//! bounded batches so it cannot pin WAL indefinitely. The `pgoutput` frames
//! themselves are not decoded here; trigger mode is the path that
//! materializes full row images.

use tracing::{debug, info};

use crate::client::{validate_identifier, PgClient};
use crate::error::CdcError;

/// Whether the server is configured for logical replication.
pub fn available(client: &mut PgClient) -> Result<bool, CdcError> {
    let row = client.query_one("SHOW wal_level", &[])?;
    let level: String = row.get(0);
    Ok(level == "logical")
}

/// Create the replication slot if it does not already exist.
pub fn ensure_slot(client: &mut PgClient, slot_name: &str) -> Result<(), CdcError> {
    let existing = client.query(
        "SELECT 1 FROM pg_replication_slots WHERE slot_name = $1",
        &[&slot_name],
    )?;
    if !existing.is_empty() {
        return Ok(());
    }

    client
        .query_one(
            "SELECT pg_create_logical_replication_slot($1, 'pgoutput')",
            &[&slot_name],
        )
        .map_err(|e| CdcError::Replication(format!("cannot create slot {slot_name:?}: {e}")))?;
    info!(slot = slot_name, "created replication slot");
    Ok(())
}

/// Drop and recreate the publication over the watched tables. With no tables
/// the publication covers all of them.
pub fn ensure_publication(
    client: &mut PgClient,
    publication_name: &str,
    tables: &[String],
) -> Result<(), CdcError> {
    validate_identifier(publication_name)?;
    for table in tables {
        validate_identifier(table)?;
    }

    client.execute_batch(&format!("DROP PUBLICATION IF EXISTS {publication_name};"))?;

    let create = if tables.is_empty() {
        format!("CREATE PUBLICATION {publication_name} FOR ALL TABLES;")
    } else {
        format!(
            "CREATE PUBLICATION {publication_name} FOR TABLE {};",
            tables.join(", ")
        )
    };
    client
        .execute_batch(&create)
        .map_err(|e| CdcError::Replication(format!("cannot create publication: {e}")))?;
    info!(publication = publication_name, "created publication");
    Ok(())
}

/// Drop the replication slot.
pub fn drop_slot(client: &mut PgClient, slot_name: &str) -> Result<(), CdcError> {
    client
        .query_one("SELECT pg_drop_replication_slot($1)", &[&slot_name])
        .map_err(|e| CdcError::Replication(format!("cannot drop slot {slot_name:?}: {e}")))?;
    Ok(())
}

/// UPDATE/DELETE only expose a before-image when the table's replica
/// identity covers it; FULL exposes the whole row.
pub fn set_replica_identity(
    client: &mut PgClient,
    table: &str,
    identity: &str,
) -> Result<(), CdcError> {
    validate_identifier(table)?;
    if !matches!(identity, "DEFAULT" | "FULL" | "NOTHING") {
        return Err(CdcError::InvalidArg(format!(
            "invalid replica identity {identity:?}"
        )));
    }
    client.execute_batch(&format!("ALTER TABLE {table} REPLICA IDENTITY {identity};"))
}

/// Peek at pending slot content, then advance past it in the same bounded
/// batch. Returns the number of WAL records consumed.
///
/// A `pgoutput` slot only speaks the binary protocol and requires the
/// publication to be named in the options.
pub fn drain(
    client: &mut PgClient,
    slot_name: &str,
    publication_name: &str,
    batch_size: i64,
) -> Result<usize, CdcError> {
    let pending = client
        .query(
            "SELECT lsn::text, xid::text FROM pg_logical_slot_peek_binary_changes($1, NULL, $2,
                 'proto_version', '1', 'publication_names', $3)",
            &[&slot_name, &batch_size, &publication_name],
        )
        .map_err(|e| CdcError::Replication(format!("cannot peek slot {slot_name:?}: {e}")))?;

    if pending.is_empty() {
        return Ok(0);
    }

    let count = pending.len();
    client
        .query(
            "SELECT lsn::text FROM pg_logical_slot_get_binary_changes($1, NULL, $2,
                 'proto_version', '1', 'publication_names', $3)",
            &[&slot_name, &batch_size, &publication_name],
        )
        .map_err(|e| CdcError::Replication(format!("cannot advance slot {slot_name:?}: {e}")))?;
    debug!(slot = slot_name, count, "advanced replication slot");
    Ok(count)
}
