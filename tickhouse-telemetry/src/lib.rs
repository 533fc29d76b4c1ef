//! Telemetry setup for tick replication services.
//!
//! Provides tracing initialization with environment-appropriate output and a
//! panic hook that routes panics through the logging system.

mod tracing;

pub use crate::tracing::*;
