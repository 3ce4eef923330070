use scribe_types::{Digest, ObjectKind};
use sha2::{Digest as _, Sha256};

/// Domain prefix for Merkle leaf hashes.
const LEAF_PREFIX: u8 = 0x00;
/// Domain prefix for Merkle internal-node hashes.
const INTERNAL_PREFIX: u8 = 0x01;

/// Plain SHA-256 of `data`.
pub fn hash_bytes(data: &[u8]) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(data);
    Digest::from_raw(hasher.finalize().into())
}

/// Leaf hash: `SHA256(0x00 ∥ data)`.
///
/// The prefix separates the leaf domain from the internal-node domain so a
/// crafted pair of child hashes cannot masquerade as leaf content.
pub fn hash_leaf(data: &[u8]) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update([LEAF_PREFIX]);
    hasher.update(data);
    Digest::from_raw(hasher.finalize().into())
}

/// Internal-node hash: `SHA256(0x01 ∥ left ∥ right)`.
pub fn hash_internal(left: &Digest, right: &Digest) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update([INTERNAL_PREFIX]);
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    Digest::from_raw(hasher.finalize().into())
}

/// Git-style object digest: `SHA256("<kind> <size>\0" ∥ content)`.
pub fn hash_object(kind: ObjectKind, content: &[u8]) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(kind.as_str().as_bytes());
    hasher.update(b" ");
    hasher.update(content.len().to_string().as_bytes());
    hasher.update([0u8]);
    hasher.update(content);
    Digest::from_raw(hasher.finalize().into())
}
