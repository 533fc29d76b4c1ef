use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// At least one replication job must be configured.
    #[error("`jobs` cannot be empty")]
    NoJobs,
    /// Job keys identify running replications and cannot be empty.
    #[error("`key` cannot be empty")]
    EmptyJobKey,
    /// Job keys must be unique within a single replicator instance.
    #[error("duplicate job key: `{0}`")]
    DuplicateJobKey(String),
    /// Flushing after every zero rows would never flush at all.
    #[error("`flush_row_count` cannot be zero for job `{0}`")]
    FlushRowCountZero(String),
    /// A zero flush interval would busy-loop the streaming task.
    #[error("`flush_interval_ms` cannot be zero for job `{0}`")]
    FlushIntervalZero(String),
}
