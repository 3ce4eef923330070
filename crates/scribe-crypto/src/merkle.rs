use serde::{Deserialize, Serialize};
use scribe_types::Digest;

use crate::hasher::{hash_internal, hash_leaf};

/// Errors from Merkle tree construction.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MerkleError {
    /// Leaves cannot be added once the tree has been built.
    #[error("tree is already built")]
    AlreadyBuilt,
}

/// Side of a sibling along a proof path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

/// Binary Merkle tree over change digests.
///
/// Leaves are added first — either as raw bytes (hashed with the `0x00` leaf
/// prefix) or as pre-computed digests (inserted as the leaf hash unchanged) —
/// then the tree is built bottom-up with `0x01`-prefixed internal hashes. A
/// node without a partner at any level is paired with itself, which keeps the
/// shape deterministic for every leaf count.
///
/// Nodes are held as level-by-level digest vectors (level 0 = leaves, last
/// level = root), so no per-node allocation or parent pointers are needed.
#[derive(Clone, Debug, Default)]
pub struct MerkleTree {
    leaves: Vec<Digest>,
    levels: Vec<Vec<Digest>>,
    built: bool,
}

impl MerkleTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a leaf from raw bytes; the leaf hash is `SHA256(0x00 ∥ data)`.
    pub fn add_bytes(&mut self, data: &[u8]) -> Result<(), MerkleError> {
        if self.built {
            return Err(MerkleError::AlreadyBuilt);
        }
        self.leaves.push(hash_leaf(data));
        Ok(())
    }

    /// Add a pre-computed digest directly as a leaf hash (no re-prefixing).
    pub fn add_digest(&mut self, digest: Digest) -> Result<(), MerkleError> {
        if self.built {
            return Err(MerkleError::AlreadyBuilt);
        }
        self.leaves.push(digest);
        Ok(())
    }

    /// Build the tree. Idempotent; further adds are rejected.
    pub fn build(&mut self) {
        if self.built {
            return;
        }
        self.built = true;

        if self.leaves.is_empty() {
            return;
        }

        self.levels.push(self.leaves.clone());
        while self.levels.last().map_or(0, Vec::len) > 1 {
            let current = self.levels.last().expect("at least one level");
            let mut next = Vec::with_capacity((current.len() + 1) / 2);
            for pair in current.chunks(2) {
                let parent = if pair.len() == 2 {
                    hash_internal(&pair[0], &pair[1])
                } else {
                    // Odd node: paired with itself, not promoted.
                    hash_internal(&pair[0], &pair[0])
                };
                next.push(parent);
            }
            self.levels.push(next);
        }
    }

    /// Whether `build` has run.
    pub fn is_built(&self) -> bool {
        self.built
    }

    /// The root digest. Zero for an empty tree; a single leaf is its own root.
    pub fn root(&self) -> Digest {
        self.levels
            .last()
            .and_then(|level| level.first())
            .copied()
            .unwrap_or_else(Digest::zero)
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// The stored hash of leaf `index`.
    pub fn leaf(&self, index: usize) -> Option<Digest> {
        self.leaves.get(index).copied()
    }

    /// Inclusion proof for leaf `index`: one sibling digest and side per
    /// level from leaf to root. `None` if the tree is unbuilt or the index is
    /// out of range.
    pub fn proof(&self, index: usize) -> Option<MerkleProof> {
        if !self.built || index >= self.leaves.len() {
            return None;
        }

        let mut path = Vec::new();
        let mut idx = index;
        for level in &self.levels[..self.levels.len().saturating_sub(1)] {
            let sibling_idx = if idx % 2 == 0 { idx + 1 } else { idx - 1 };
            // A missing sibling means this node was paired with itself.
            let sibling = level.get(sibling_idx).copied().unwrap_or(level[idx]);
            let side = if idx % 2 == 0 { Side::Right } else { Side::Left };
            path.push((sibling, side));
            idx /= 2;
        }

        Some(MerkleProof { path })
    }
}

/// Merkle inclusion proof: the sibling chain from a leaf up to the root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// `(sibling_digest, sibling_side)` per level, leaf first.
    pub path: Vec<(Digest, Side)>,
}

impl MerkleProof {
    /// Fold the path from `leaf` and compare the result against `root`.
    pub fn verify(&self, leaf: &Digest, root: &Digest) -> bool {
        let mut current = *leaf;
        for (sibling, side) in &self.path {
            current = match side {
                Side::Left => hash_internal(sibling, &current),
                Side::Right => hash_internal(&current, sibling),
            };
        }
        current == *root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::hash_bytes;

    fn digest(seed: u8) -> Digest {
        hash_bytes(&[seed])
    }

    fn built(leaves: &[Digest]) -> MerkleTree {
        let mut tree = MerkleTree::new();
        for leaf in leaves {
            tree.add_digest(*leaf).unwrap();
        }
        tree.build();
        tree
    }

    #[test]
    fn empty_tree_has_zero_root() {
        let mut tree = MerkleTree::new();
        tree.build();
        assert!(tree.root().is_zero());
        assert_eq!(tree.leaf_count(), 0);
    }

    #[test]
    fn single_leaf_is_root() {
        let leaf = digest(1);
        let tree = built(&[leaf]);
        assert_eq!(tree.root(), leaf);
    }

    #[test]
    fn single_raw_leaf_root_is_prefixed_hash() {
        let mut tree = MerkleTree::new();
        tree.add_bytes(b"payload").unwrap();
        tree.build();
        assert_eq!(tree.root(), hash_leaf(b"payload"));
    }

    #[test]
    fn two_leaves_root_is_internal_hash() {
        let (a, b) = (digest(1), digest(2));
        let tree = built(&[a, b]);
        assert_eq!(tree.root(), hash_internal(&a, &b));
    }

    #[test]
    fn four_leaf_shape_is_fixed() {
        // leaves [la, lb, lc, ld] must produce
        // internal(internal(la, lb), internal(lc, ld)).
        let leaves: Vec<Digest> = (1..=4).map(digest).collect();
        let tree = built(&leaves);
        let left = hash_internal(&leaves[0], &leaves[1]);
        let right = hash_internal(&leaves[2], &leaves[3]);
        assert_eq!(tree.root(), hash_internal(&left, &right));
    }

    #[test]
    fn odd_leaf_is_paired_with_itself() {
        let leaves: Vec<Digest> = (1..=3).map(digest).collect();
        let tree = built(&leaves);
        let left = hash_internal(&leaves[0], &leaves[1]);
        let right = hash_internal(&leaves[2], &leaves[2]);
        assert_eq!(tree.root(), hash_internal(&left, &right));
    }

    #[test]
    fn add_after_build_is_rejected() {
        let mut tree = built(&[digest(1)]);
        assert_eq!(tree.add_digest(digest(2)), Err(MerkleError::AlreadyBuilt));
        assert_eq!(tree.add_bytes(b"x"), Err(MerkleError::AlreadyBuilt));
    }

    #[test]
    fn build_is_idempotent() {
        let mut tree = built(&[digest(1), digest(2)]);
        let root = tree.root();
        tree.build();
        assert_eq!(tree.root(), root);
    }

    #[test]
    fn deterministic_root() {
        let leaves: Vec<Digest> = (0..10).map(digest).collect();
        assert_eq!(built(&leaves).root(), built(&leaves).root());
    }

    #[test]
    fn leaf_order_matters() {
        let forward: Vec<Digest> = (1..=4).map(digest).collect();
        let mut reversed = forward.clone();
        reversed.reverse();
        assert_ne!(built(&forward).root(), built(&reversed).root());
    }

    #[test]
    fn proof_verifies_for_all_leaves() {
        for n in 1..=9 {
            let leaves: Vec<Digest> = (0..n).map(digest).collect();
            let tree = built(&leaves);
            for (i, leaf) in leaves.iter().enumerate() {
                let proof = tree.proof(i).expect("proof exists");
                assert!(proof.verify(leaf, &tree.root()), "n={n} i={i}");
            }
        }
    }

    #[test]
    fn proof_out_of_bounds_is_none() {
        let tree = built(&[digest(1), digest(2)]);
        assert!(tree.proof(2).is_none());
    }

    #[test]
    fn proof_before_build_is_none() {
        let mut tree = MerkleTree::new();
        tree.add_digest(digest(1)).unwrap();
        assert!(tree.proof(0).is_none());
    }

    #[test]
    fn tampered_proof_fails() {
        let leaves: Vec<Digest> = (0..5).map(digest).collect();
        let tree = built(&leaves);
        let root = tree.root();

        // Wrong leaf.
        let proof = tree.proof(2).unwrap();
        assert!(!proof.verify(&digest(99), &root));

        // Corrupted sibling.
        let mut proof = tree.proof(2).unwrap();
        proof.path[0].0 = digest(77);
        assert!(!proof.verify(&leaves[2], &root));

        // Flipped side.
        let mut proof = tree.proof(0).unwrap();
        proof.path[0].1 = Side::Left;
        assert!(!proof.verify(&leaves[0], &root));
    }

    #[test]
    fn proof_depth_matches_log2_for_powers_of_two() {
        let leaves: Vec<Digest> = (0..8).map(digest).collect();
        let tree = built(&leaves);
        for i in 0..8 {
            assert_eq!(tree.proof(i).unwrap().path.len(), 3);
        }
    }

    #[test]
    fn proof_serde_roundtrip() {
        let leaves: Vec<Digest> = (0..4).map(digest).collect();
        let tree = built(&leaves);
        let proof = tree.proof(1).unwrap();
        let json = serde_json::to_string(&proof).unwrap();
        let parsed: MerkleProof = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, proof);
        assert!(parsed.verify(&leaves[1], &tree.root()));
    }
}
