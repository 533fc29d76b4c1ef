//! Configuration management for tick replication services.
//!
//! Provides environment detection, hierarchical configuration loading from
//! YAML files with environment variable overrides, secret handling, and the
//! shared configuration types consumed by the replicator binary.

mod environment;
mod load;
mod secret;
pub mod shared;

pub use environment::*;
pub use load::*;
pub use secret::*;
