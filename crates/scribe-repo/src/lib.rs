//! Repository facade for Scribe.
//!
//! A [`Repository`] owns the on-disk layout under `.scribe/` — the SQLite
//! commit store, the filesystem object store, and `config.json` — and is the
//! single writer through which commits enter the DAG. [`Repository::open`]
//! discovers the layout by walking upward from a starting directory;
//! [`Repository::init`] creates it.

mod config;
mod error;
mod repository;

pub use config::Config;
pub use error::RepoError;
pub use repository::Repository;
