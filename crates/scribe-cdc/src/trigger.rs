//! Trigger-based capture: an append-only audit table fed by row triggers on
//! the watched tables, polled in bounded batches.

use tracing::{debug, warn};

use scribe_types::Operation;

use crate::change::RowChange;
use crate::client::{validate_identifier, PgClient};
use crate::error::CdcError;

/// Audit table plus a partial index covering the unprocessed backlog.
const CREATE_AUDIT_TABLE_SQL: &str = "
CREATE TABLE IF NOT EXISTS scribe_audit (
    id BIGSERIAL PRIMARY KEY,
    table_name TEXT NOT NULL,
    operation TEXT NOT NULL,
    row_pk JSONB NOT NULL,
    old_data JSONB,
    new_data JSONB,
    changed_at TIMESTAMPTZ DEFAULT now(),
    transaction_id BIGINT DEFAULT txid_current(),
    processed BOOLEAN DEFAULT FALSE
);
CREATE INDEX IF NOT EXISTS idx_scribe_audit_unprocessed
ON scribe_audit(processed) WHERE NOT processed;
";

/// Trigger function: discovers the primary-key columns of the firing table
/// and records old/new row images as JSONB.
const CREATE_TRIGGER_FUNCTION_SQL: &str = "
CREATE OR REPLACE FUNCTION scribe_audit_trigger()
RETURNS TRIGGER AS $$
DECLARE
    pk_columns TEXT[];
    pk_values JSONB;
BEGIN
    SELECT array_agg(a.attname) INTO pk_columns
    FROM pg_index i
    JOIN pg_attribute a ON a.attrelid = i.indrelid AND a.attnum = ANY(i.indkey)
    WHERE i.indrelid = TG_RELID AND i.indisprimary;

    IF pk_columns IS NULL THEN
        pk_columns := ARRAY['id'];
    END IF;

    IF TG_OP = 'DELETE' THEN
        pk_values := to_jsonb(OLD);
    ELSE
        pk_values := to_jsonb(NEW);
    END IF;

    INSERT INTO scribe_audit (table_name, operation, row_pk, old_data, new_data)
    VALUES (
        TG_TABLE_NAME,
        TG_OP,
        pk_values,
        CASE WHEN TG_OP IN ('UPDATE', 'DELETE') THEN to_jsonb(OLD) END,
        CASE WHEN TG_OP IN ('INSERT', 'UPDATE') THEN to_jsonb(NEW) END
    );

    RETURN COALESCE(NEW, OLD);
END;
$$ LANGUAGE plpgsql;
";

/// Claim a batch of unprocessed rows and mark them processed in the same
/// statement, so a crash between read and mark cannot replay them.
const POLL_SQL: &str = "
WITH claimed AS (
    UPDATE scribe_audit SET processed = TRUE
    WHERE id IN (
        SELECT id FROM scribe_audit WHERE NOT processed ORDER BY id LIMIT $1
    )
    RETURNING id, table_name, operation, row_pk::text, old_data::text,
              new_data::text, transaction_id
)
SELECT table_name, operation, row_pk, old_data, new_data, transaction_id
FROM claimed ORDER BY id
";

fn audit_trigger_sql(table: &str) -> String {
    format!(
        "DROP TRIGGER IF EXISTS scribe_audit_{table} ON {table};\n\
         CREATE TRIGGER scribe_audit_{table}\n\
         AFTER INSERT OR UPDATE OR DELETE ON {table}\n\
         FOR EACH ROW EXECUTE FUNCTION scribe_audit_trigger();"
    )
}

fn drop_trigger_sql(table: &str) -> String {
    format!("DROP TRIGGER IF EXISTS scribe_audit_{table} ON {table};")
}

/// Create the audit table, the trigger function, and one trigger per table.
pub fn setup(client: &mut PgClient, tables: &[String]) -> Result<(), CdcError> {
    if tables.is_empty() {
        return Err(CdcError::InvalidArg("no tables to watch".into()));
    }
    for table in tables {
        validate_identifier(table)?;
    }

    client.execute_batch(CREATE_AUDIT_TABLE_SQL)?;
    client.execute_batch(CREATE_TRIGGER_FUNCTION_SQL)?;

    for table in tables {
        client.execute_batch(&audit_trigger_sql(table))?;
        debug!(table = %table, "installed audit trigger");
    }
    Ok(())
}

/// Claim up to `batch_size` unprocessed audit rows.
pub fn poll(client: &mut PgClient, batch_size: i64) -> Result<Vec<RowChange>, CdcError> {
    let rows = client.query(POLL_SQL, &[&batch_size])?;

    let mut changes = Vec::with_capacity(rows.len());
    for row in rows {
        let op: String = row.get(1);
        let operation: Operation = op
            .parse()
            .map_err(|_| CdcError::Decode(format!("unknown audit operation {op:?}")))?;
        changes.push(RowChange {
            table_name: row.get(0),
            operation,
            primary_key_json: row.get(2),
            before_json: row.get(3),
            after_json: row.get(4),
            txid: row.get::<_, Option<i64>>(5).unwrap_or(0),
            lsn: 0,
        });
    }
    Ok(changes)
}

/// Drop the per-table triggers. The audit table is left in place so history
/// survives a cleanup/setup cycle.
pub fn cleanup(client: &mut PgClient, tables: &[String]) -> Result<(), CdcError> {
    for table in tables {
        validate_identifier(table)?;
        if let Err(e) = client.execute_batch(&drop_trigger_sql(table)) {
            warn!(table = %table, error = %e, "failed to drop audit trigger");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_sql_names_the_table() {
        let sql = audit_trigger_sql("orders");
        assert!(sql.contains("DROP TRIGGER IF EXISTS scribe_audit_orders ON orders;"));
        assert!(sql.contains("CREATE TRIGGER scribe_audit_orders"));
        assert!(sql.contains("AFTER INSERT OR UPDATE OR DELETE ON orders"));
        assert!(sql.contains("EXECUTE FUNCTION scribe_audit_trigger()"));
    }

    #[test]
    fn drop_sql_names_the_table() {
        assert_eq!(
            drop_trigger_sql("orders"),
            "DROP TRIGGER IF EXISTS scribe_audit_orders ON orders;"
        );
    }

    #[test]
    fn poll_sql_claims_and_returns_in_one_statement() {
        assert!(POLL_SQL.contains("UPDATE scribe_audit SET processed = TRUE"));
        assert!(POLL_SQL.contains("RETURNING"));
        assert!(POLL_SQL.contains("ORDER BY id LIMIT $1"));
    }

    #[test]
    fn setup_rejects_empty_table_list() {
        let mut client = PgClient::new("host=localhost");
        let err = setup(&mut client, &[]).unwrap_err();
        assert!(matches!(err, CdcError::InvalidArg(_)));
    }

    #[test]
    fn setup_rejects_hostile_table_names() {
        let mut client = PgClient::new("host=localhost");
        let tables = vec!["orders; DROP TABLE users".to_string()];
        let err = setup(&mut client, &tables).unwrap_err();
        assert!(matches!(err, CdcError::InvalidArg(_)));
    }
}
