//! Turning captured row changes into lineage commits.

use tracing::debug;

use scribe_crypto::hash_bytes;
use scribe_envelope::Envelope;
use scribe_repo::{Config, Repository};
use scribe_types::Digest;

use crate::change::RowChange;
use crate::error::CdcError;

/// Author used when the repository config carries none.
const DEFAULT_AUTHOR_ID: &str = "service:scribe-watch";
const DEFAULT_AUTHOR_ROLE: &str = "automated";

/// Commit a single captured change, parented to the current `HEAD`.
///
/// The row images are hashed into the change's before/after digests; the
/// process name carries the upstream transaction id so commits remain
/// traceable back to the source transaction.
pub fn record_change(
    repo: &mut Repository,
    config: &Config,
    change: &RowChange,
) -> Result<Digest, CdcError> {
    let mut env = Envelope::new();

    env.set_author(
        config.author_id.as_deref().unwrap_or(DEFAULT_AUTHOR_ID),
        config.author_role.as_deref().unwrap_or(DEFAULT_AUTHOR_ROLE),
    );
    env.set_process(
        format!("pg_txid:{}", change.txid),
        Some("postgresql-cdc".into()),
        None,
    );
    env.set_message(format!("{} on {}", change.operation, change.table_name));

    let head = repo.get_head()?;
    if !head.is_zero() {
        env.set_parent(head);
    }

    let before = digest_of(change.before_json.as_deref());
    let after = digest_of(change.after_json.as_deref());
    env.add_change(
        change.table_name.clone(),
        change.operation,
        change.primary_key_json.clone(),
        before,
        after,
    );

    let id = repo.store_commit(&mut env)?;
    debug!(
        commit = %id.short_hex(),
        table = %change.table_name,
        operation = %change.operation,
        "recorded change"
    );
    Ok(id)
}

fn digest_of(json: Option<&str>) -> Digest {
    match json {
        Some(s) if !s.is_empty() => hash_bytes(s.as_bytes()),
        _ => Digest::zero(),
    }
}
