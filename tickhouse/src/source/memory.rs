use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::error::TickResult;
use crate::source::base::{Cursor, CursorPoll, ReplicationSpec, Source};
use crate::types::{Record, RecordType};

#[derive(Debug, Default)]
struct Inner {
    records: VecDeque<Record>,
    closed: bool,
}

/// An in-memory source used by tests: records are pushed from the outside
/// and become visible to an open cursor through the data-ready notification.
#[derive(Debug, Clone)]
pub struct MemorySource {
    record_types: Vec<RecordType>,
    inner: Arc<Mutex<Inner>>,
    notify: Arc<Notify>,
}

impl MemorySource {
    pub fn new(record_types: Vec<RecordType>) -> Self {
        Self {
            record_types,
            inner: Arc::new(Mutex::new(Inner::default())),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Makes a record available to the cursor and wakes a pending poller.
    pub fn push(&self, record: Record) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.records.push_back(record);
        }
        self.notify.notify_one();
    }

    /// Marks the stream as finished; the cursor reports `Exhausted` once the
    /// remaining records are drained.
    pub fn close(&self) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.closed = true;
        }
        self.notify.notify_one();
    }
}

pub struct MemoryCursor {
    inner: Arc<Mutex<Inner>>,
    notify: Arc<Notify>,
    resume_timestamp: Option<i64>,
}

impl Cursor for MemoryCursor {
    fn try_next(&mut self) -> TickResult<CursorPoll> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            match inner.records.pop_front() {
                Some(record) => {
                    if let Some(resume) = self.resume_timestamp {
                        if record.timestamp < resume {
                            continue;
                        }
                    }
                    return Ok(CursorPoll::Record(record));
                }
                None if inner.closed => return Ok(CursorPoll::Exhausted),
                None => return Ok(CursorPoll::Pending),
            }
        }
    }

    fn data_available(&self) -> Arc<Notify> {
        self.notify.clone()
    }
}

impl Source for MemorySource {
    type Cursor = MemoryCursor;

    async fn record_types(&self, _spec: &ReplicationSpec) -> TickResult<Vec<RecordType>> {
        Ok(self.record_types.clone())
    }

    async fn open_cursor(
        &self,
        _spec: &ReplicationSpec,
        resume_timestamp: Option<i64>,
    ) -> TickResult<Self::Cursor> {
        Ok(MemoryCursor {
            inner: self.inner.clone(),
            notify: self.notify.clone(),
            resume_timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TickValue;

    fn record(timestamp: i64) -> Record {
        Record::new(0, timestamp, "AAPL", vec![TickValue::Int64(1)])
    }

    #[tokio::test]
    async fn test_poll_states() {
        let source = MemorySource::new(vec![]);
        let spec = ReplicationSpec::Stream("ticks".to_string());
        let mut cursor = source.open_cursor(&spec, None).await.unwrap();

        assert_eq!(cursor.try_next().unwrap(), CursorPoll::Pending);
        source.push(record(1));
        assert_eq!(cursor.try_next().unwrap(), CursorPoll::Record(record(1)));
        source.close();
        assert_eq!(cursor.try_next().unwrap(), CursorPoll::Exhausted);
    }

    #[tokio::test]
    async fn test_resume_skips_older_records() {
        let source = MemorySource::new(vec![]);
        source.push(record(1));
        source.push(record(2));
        source.push(record(3));
        source.close();

        let spec = ReplicationSpec::Stream("ticks".to_string());
        let mut cursor = source.open_cursor(&spec, Some(2)).await.unwrap();
        assert_eq!(cursor.try_next().unwrap(), CursorPoll::Record(record(2)));
        assert_eq!(cursor.try_next().unwrap(), CursorPoll::Record(record(3)));
        assert_eq!(cursor.try_next().unwrap(), CursorPoll::Exhausted);
    }
}
