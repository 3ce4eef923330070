//! Foundation types for Scribe.
//!
//! This crate provides the core identity and data-model types used throughout
//! the Scribe system. Every other Scribe crate depends on `scribe-types`.
//!
//! # Key Types
//!
//! - [`Digest`] — 32-byte SHA-256 value with a zero "absent" sentinel
//! - [`Change`] — a single row-level mutation (table, operation, pk, digests)
//! - [`Operation`] — the INSERT/UPDATE/DELETE sum type
//! - [`ObjectKind`] — blob/tree/commit tag for auxiliary objects
//! - [`ErrorKind`] — the stable error taxonomy shared by all subsystems

pub mod change;
pub mod digest;
pub mod error;
pub mod object;

pub use change::{Author, Change, Operation, ProcessInfo};
pub use digest::Digest;
pub use error::{ErrorKind, TypeError};
pub use object::ObjectKind;
