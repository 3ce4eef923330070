//! PostgreSQL change-data-capture for Scribe.
//!
//! Watches an upstream database for row mutations and turns each one into a
//! commit in the lineage DAG. Two interchangeable capture mechanisms:
//!
//! - **Trigger mode** — an audit table populated by row-level triggers,
//!   polled in bounded batches; rows are claimed and marked processed in a
//!   single statement.
//! - **Logical mode** — a logical-replication slot plus publication; the
//!   adapter manages slot, publication, and replica identity, and drives the
//!   slot forward in bounded batches.
//!
//! The [`Monitor`] runs a blocking poll loop with reconnect-and-backoff on
//! connection failures; [`ingest::record_change`] maps a captured
//! [`RowChange`] onto a single-change commit parented to `HEAD`.

pub mod change;
pub mod client;
pub mod error;
pub mod ingest;
pub mod logical;
pub mod monitor;
pub mod trigger;

pub use change::{CdcMode, MonitorConfig, RowChange};
pub use client::PgClient;
pub use error::CdcError;
pub use monitor::{Monitor, StopHandle};
