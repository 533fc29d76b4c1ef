//! Continuous replication of tick-oriented time-series records into ClickHouse.
//!
//! The crate translates polymorphic, nested record schemas of a tick store into
//! ClickHouse table declarations, reconciles them against pre-existing tables,
//! and streams records into parameterized batch inserts with bounded latency
//! and bounded memory.

pub mod concurrency;
pub mod error;
mod macros;
pub mod replicator;
pub mod schema;
pub mod source;
pub mod target;
pub mod types;
pub mod writer;
