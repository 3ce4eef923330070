//! Cryptographic primitives for Scribe.
//!
//! Provides SHA-256 hashing with the domain-separated leaf (`0x00`) and
//! internal (`0x01`) prefixes, Git-style object digests, and binary Merkle
//! trees with inclusion proofs.
//!
//! All hashing wraps the `sha2` implementation — no custom cryptography.

pub mod hasher;
pub mod merkle;

pub use hasher::{hash_bytes, hash_internal, hash_leaf, hash_object};
pub use merkle::{MerkleError, MerkleProof, MerkleTree, Side};
