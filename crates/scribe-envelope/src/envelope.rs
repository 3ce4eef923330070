use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use scribe_crypto::{hash_bytes, MerkleTree};
use scribe_types::{Author, Change, Digest, Operation, ProcessInfo};

use crate::error::EnvelopeError;

/// An immutable commit record.
///
/// Serde field order is the canonical key order for hashing — do not reorder
/// fields. Digests and absent optionals are omitted from the serialized form;
/// `author`, `process`, and `timestamp` are always present.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Content-addressed id of this commit. Zero until [`finalize`] runs.
    ///
    /// [`finalize`]: Envelope::finalize
    #[serde(default, skip_serializing_if = "Digest::is_zero")]
    pub commit_id: Digest,
    /// Parent commit id. Zero for a root commit.
    #[serde(default, skip_serializing_if = "Digest::is_zero")]
    pub parent_id: Digest,
    /// Merkle root over the change digests.
    #[serde(default, skip_serializing_if = "Digest::is_zero")]
    pub tree_hash: Digest,
    #[serde(default)]
    pub author: Author,
    #[serde(default)]
    pub process: ProcessInfo,
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Ordered changes; insertion order is significant to hashing.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<Change>,
}

impl Envelope {
    /// Create an empty envelope stamped with the current time.
    pub fn new() -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        Self {
            commit_id: Digest::zero(),
            parent_id: Digest::zero(),
            tree_hash: Digest::zero(),
            author: Author::default(),
            process: ProcessInfo::default(),
            timestamp: now,
            message: None,
            changes: Vec::new(),
        }
    }

    // -- builders; setters replace, add_change appends --

    pub fn set_parent(&mut self, parent: Digest) {
        self.parent_id = parent;
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    pub fn set_author(&mut self, id: impl Into<String>, role: impl Into<String>) {
        self.author.id = Some(id.into());
        self.author.role = Some(role.into());
    }

    pub fn set_author_email(&mut self, email: impl Into<String>) {
        self.author.email = Some(email.into());
    }

    pub fn set_process(
        &mut self,
        name: impl Into<String>,
        version: Option<String>,
        params: Option<String>,
    ) {
        self.process.name = Some(name.into());
        self.process.version = version;
        self.process.params = params;
    }

    pub fn set_process_source(&mut self, source: impl Into<String>) {
        self.process.source = Some(source.into());
    }

    /// Override the Merkle root instead of deriving it from the changes.
    pub fn set_tree_hash(&mut self, tree_hash: Digest) {
        self.tree_hash = tree_hash;
    }

    pub fn add_change(
        &mut self,
        table_name: impl Into<String>,
        operation: Operation,
        primary_key: impl Into<String>,
        before_digest: Digest,
        after_digest: Digest,
    ) {
        self.changes.push(Change::new(
            table_name,
            operation,
            primary_key,
            before_digest,
            after_digest,
        ));
    }

    /// The canonical JSON form of this envelope — compact, with fields in
    /// declaration order and zero/absent values omitted. This exact string is
    /// the hashing preimage (with `commit_id` zeroed) and the `--json`
    /// export format.
    pub fn to_canonical_json(&self) -> Result<String, EnvelopeError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse an envelope back from its canonical JSON form.
    pub fn from_canonical_json(json: &str) -> Result<Self, EnvelopeError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Compute `tree_hash` (if unset) and `commit_id`.
    ///
    /// The Merkle tree is built over the non-zero change digests in change
    /// order, before-image first. The commit id is the SHA-256 of the
    /// canonical serialization with `commit_id` zeroed, so the id is never
    /// part of its own preimage.
    pub fn finalize(&mut self) -> Result<(), EnvelopeError> {
        if self.author.id.is_none() {
            return Err(EnvelopeError::MissingField("author.id"));
        }
        if self.process.name.is_none() {
            return Err(EnvelopeError::MissingField("process.name"));
        }

        if self.tree_hash.is_zero() && !self.changes.is_empty() {
            let mut tree = MerkleTree::new();
            for change in &self.changes {
                if !change.before_digest.is_zero() {
                    let _ = tree.add_digest(change.before_digest);
                }
                if !change.after_digest.is_zero() {
                    let _ = tree.add_digest(change.after_digest);
                }
            }
            if tree.leaf_count() > 0 {
                tree.build();
                self.tree_hash = tree.root();
            }
        }

        self.commit_id = Digest::zero();
        let json = self.to_canonical_json()?;
        self.commit_id = hash_bytes(json.as_bytes());
        Ok(())
    }

    /// Recompute the commit id and compare it against the stored one.
    pub fn verify(&self) -> Result<(), EnvelopeError> {
        let mut copy = self.clone();
        copy.commit_id = Digest::zero();
        let json = copy.to_canonical_json()?;
        let computed = hash_bytes(json.as_bytes());
        if computed != self.commit_id {
            return Err(EnvelopeError::HashMismatch {
                stored: self.commit_id.to_hex(),
                computed: computed.to_hex(),
            });
        }
        Ok(())
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_crypto::hash_internal;

    fn sample() -> Envelope {
        let mut env = Envelope::new();
        env.set_author("user:alice", "data_engineer");
        env.set_process("etl.py", Some("v1".into()), Some("--dry-run".into()));
        env.set_message("seed");
        env.timestamp = 1_700_000_000;
        env
    }

    #[test]
    fn canonical_json_is_pinned() {
        let env = sample();
        assert_eq!(
            env.to_canonical_json().unwrap(),
            concat!(
                r#"{"author":{"id":"user:alice","role":"data_engineer"},"#,
                r#""process":{"name":"etl.py","version":"v1","params":"--dry-run"},"#,
                r#""timestamp":1700000000,"message":"seed"}"#
            )
        );
    }

    #[test]
    fn finalize_sets_deterministic_commit_id() {
        let mut a = sample();
        a.add_change(
            "orders",
            Operation::Insert,
            r#"{"id":1}"#,
            Digest::zero(),
            hash_bytes(b"{a:1}"),
        );
        let mut b = a.clone();

        a.finalize().unwrap();
        b.finalize().unwrap();

        assert!(!a.commit_id.is_zero());
        assert_eq!(a.commit_id.to_hex().len(), 64);
        assert_eq!(a.commit_id, b.commit_id);
    }

    #[test]
    fn commit_id_matches_hash_of_zeroed_serialization() {
        let mut env = sample();
        env.add_change(
            "orders",
            Operation::Insert,
            r#"{"id":1}"#,
            Digest::zero(),
            hash_bytes(b"{a:1}"),
        );
        env.finalize().unwrap();

        let mut preimage = env.clone();
        preimage.commit_id = Digest::zero();
        let json = preimage.to_canonical_json().unwrap();
        assert_eq!(env.commit_id, hash_bytes(json.as_bytes()));
    }

    #[test]
    fn hashing_preimage_excludes_commit_id() {
        let mut env = sample();
        env.finalize().unwrap();

        let mut preimage = env.clone();
        preimage.commit_id = Digest::zero();
        let json = preimage.to_canonical_json().unwrap();
        assert!(!json.contains("commit_id"));

        // The exported form, by contrast, carries it.
        let exported = env.to_canonical_json().unwrap();
        assert!(exported.contains("commit_id"));
    }

    #[test]
    fn change_order_changes_commit_id() {
        let before = hash_bytes(b"before");
        let after = hash_bytes(b"after");

        let mut a = sample();
        a.add_change("t1", Operation::Update, "{}", before, after);
        a.add_change("t2", Operation::Update, "{}", after, before);

        let mut b = sample();
        b.add_change("t2", Operation::Update, "{}", after, before);
        b.add_change("t1", Operation::Update, "{}", before, after);

        a.finalize().unwrap();
        b.finalize().unwrap();
        assert_ne!(a.commit_id, b.commit_id);
    }

    #[test]
    fn tree_hash_is_merkle_over_nonzero_digests() {
        // Changes [before=A, after=B] and [before=C, after=D]: the leaves are
        // the four digests unchanged, so the root is
        // internal(internal(A, B), internal(C, D)).
        let (a, b, c, d) = (
            hash_bytes(b"A"),
            hash_bytes(b"B"),
            hash_bytes(b"C"),
            hash_bytes(b"D"),
        );

        let mut env = sample();
        env.add_change("t", Operation::Update, "{}", a, b);
        env.add_change("t", Operation::Update, "{}", c, d);
        env.finalize().unwrap();

        let expected = hash_internal(&hash_internal(&a, &b), &hash_internal(&c, &d));
        assert_eq!(env.tree_hash, expected);
    }

    #[test]
    fn insert_contributes_single_leaf() {
        let after = hash_bytes(b"row");
        let mut env = sample();
        env.add_change("t", Operation::Insert, "{}", Digest::zero(), after);
        env.finalize().unwrap();
        // One leaf: the root is that digest itself.
        assert_eq!(env.tree_hash, after);
    }

    #[test]
    fn explicit_tree_hash_is_not_overwritten() {
        let forced = hash_bytes(b"forced");
        let mut env = sample();
        env.set_tree_hash(forced);
        env.add_change(
            "t",
            Operation::Insert,
            "{}",
            Digest::zero(),
            hash_bytes(b"x"),
        );
        env.finalize().unwrap();
        assert_eq!(env.tree_hash, forced);
    }

    #[test]
    fn no_changes_leaves_tree_hash_zero() {
        let mut env = sample();
        env.finalize().unwrap();
        assert!(env.tree_hash.is_zero());
        assert!(!env.commit_id.is_zero());
    }

    #[test]
    fn finalize_requires_author_and_process() {
        let mut env = Envelope::new();
        env.set_process("p", None, None);
        assert!(matches!(
            env.finalize(),
            Err(EnvelopeError::MissingField("author.id"))
        ));

        let mut env = Envelope::new();
        env.set_author("user:x", "r");
        assert!(matches!(
            env.finalize(),
            Err(EnvelopeError::MissingField("process.name"))
        ));
    }

    #[test]
    fn verify_accepts_untampered() {
        let mut env = sample();
        env.add_change(
            "orders",
            Operation::Insert,
            r#"{"id":1}"#,
            Digest::zero(),
            hash_bytes(b"{a:1}"),
        );
        env.finalize().unwrap();
        env.verify().unwrap();
    }

    #[test]
    fn verify_detects_tampering() {
        let mut env = sample();
        env.finalize().unwrap();

        let mut tampered = env.clone();
        tampered.message = Some("rewritten history".into());
        let err = tampered.verify().unwrap_err();
        assert!(matches!(err, EnvelopeError::HashMismatch { .. }));

        let mut tampered = env.clone();
        tampered.timestamp += 1;
        assert!(tampered.verify().is_err());
    }

    #[test]
    fn refinalize_after_mutation_restores_verifiability() {
        let mut env = sample();
        env.finalize().unwrap();
        env.set_message("amended");
        assert!(env.verify().is_err());
        env.finalize().unwrap();
        env.verify().unwrap();
    }

    #[test]
    fn parent_changes_commit_id() {
        let mut root = sample();
        root.finalize().unwrap();

        let mut child = sample();
        child.set_parent(root.commit_id);
        child.finalize().unwrap();
        assert_ne!(child.commit_id, root.commit_id);
    }

    #[test]
    fn canonical_json_roundtrip() {
        let mut env = sample();
        env.set_author_email("alice@example.com");
        env.set_process_source("s3://jobs/etl.py");
        env.set_parent(hash_bytes(b"parent"));
        env.add_change(
            "orders",
            Operation::Update,
            r#"{"id":7}"#,
            hash_bytes(b"old"),
            hash_bytes(b"new"),
        );
        env.finalize().unwrap();

        let json = env.to_canonical_json().unwrap();
        let parsed = Envelope::from_canonical_json(&json).unwrap();
        assert_eq!(parsed, env);
        parsed.verify().unwrap();
    }

    #[test]
    fn from_canonical_json_rejects_garbage() {
        assert!(Envelope::from_canonical_json("not json").is_err());
        assert!(Envelope::from_canonical_json(r#"{"timestamp":"late"}"#).is_err());
    }
}
