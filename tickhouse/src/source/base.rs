use std::future::Future;
use std::sync::Arc;

use tokio::sync::Notify;

use crate::error::TickResult;
use crate::types::{Record, RecordType};

/// What a replication run reads: a named live stream or an ad hoc query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicationSpec {
    Stream(String),
    Query(String),
}

impl ReplicationSpec {
    /// A short description for logging.
    pub fn describe(&self) -> &str {
        match self {
            ReplicationSpec::Stream(name) => name,
            ReplicationSpec::Query(sql) => sql,
        }
    }
}

/// Outcome of one non-blocking cursor poll.
#[derive(Debug, Clone, PartialEq)]
pub enum CursorPoll {
    /// A record is available.
    Record(Record),
    /// No record right now; more may arrive.
    Pending,
    /// The source has no further records.
    Exhausted,
}

/// A provider of record schemas and cursors for one stream or query.
pub trait Source {
    type Cursor: Cursor + Send;

    /// Resolves the record types of the stream or query. The returned order
    /// defines the type indices records carry.
    fn record_types(
        &self,
        spec: &ReplicationSpec,
    ) -> impl Future<Output = TickResult<Vec<RecordType>>> + Send;

    /// Opens a cursor, optionally resuming from a timestamp: records strictly
    /// before `resume_timestamp` are skipped, records at or after it are
    /// replayed.
    fn open_cursor(
        &self,
        spec: &ReplicationSpec,
        resume_timestamp: Option<i64>,
    ) -> impl Future<Output = TickResult<Self::Cursor>> + Send;
}

/// A non-blocking record cursor.
pub trait Cursor {
    fn try_next(&mut self) -> TickResult<CursorPoll>;

    /// Notified when new data may be available after a `Pending` poll.
    fn data_available(&self) -> Arc<Notify>;
}
