//! The commit envelope: the primary unit of the Scribe lineage DAG.
//!
//! An [`Envelope`] records who changed what: actor, process, parent commit,
//! an ordered list of row-level [`Change`]s, and a Merkle root over the
//! change digests. Finalizing an envelope computes its content-addressed
//! `commit_id` from the canonical JSON serialization — with the id itself
//! excluded from its own preimage — after which the envelope is immutable by
//! convention and verifiable forever.
//!
//! [`Change`]: scribe_types::Change

mod envelope;
mod error;

pub use envelope::Envelope;
pub use error::EnvelopeError;
