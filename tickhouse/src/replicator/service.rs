use futures::future::join_all;
use tracing::{error, info};

use crate::concurrency::StopTx;
use crate::error::{TickError, TickResult};
use crate::replicator::ReplicatorHandle;

/// Supervises a set of running replications.
///
/// The service owns the handles; it forwards stop requests and collects run
/// outcomes. It performs no restarts: a failed run stays failed until an
/// operator intervenes.
#[derive(Default)]
pub struct ReplicatorService {
    handles: Vec<ReplicatorHandle>,
}

impl ReplicatorService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handle: ReplicatorHandle) {
        info!(key = handle.key(), "registered replication");
        self.handles.push(handle);
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Returns clonable stop triggers for every registered run.
    pub fn stop_txs(&self) -> Vec<StopTx> {
        self.handles.iter().map(|handle| handle.stop_tx()).collect()
    }

    /// Requests a cooperative stop of every registered run.
    pub fn stop_all(&self) {
        for handle in &self.handles {
            info!(key = handle.key(), "stopping replication");
            handle.stop();
        }
    }

    /// Waits for every run to terminate; aggregates failures.
    pub async fn wait_all(self) -> TickResult<()> {
        let waits = self.handles.into_iter().map(|handle| async move {
            let key = handle.key().to_string();
            (key, handle.wait().await)
        });

        let mut errors: Vec<TickError> = Vec::new();
        for (key, outcome) in join_all(waits).await {
            match outcome {
                Ok(()) => info!(key, "replication completed"),
                Err(err) => {
                    error!(key, error = %err, "replication failed");
                    errors.push(err);
                }
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::replicator::{ReplicationOptions, Replicator};
    use crate::source::{MemorySource, ReplicationSpec};
    use crate::target::MemoryTarget;
    use crate::types::{FieldDescriptor, FieldKind, NamingScheme, RecordType, SchemaOptions};

    fn start_one(key: &str, source: MemorySource) -> crate::replicator::ReplicatorHandle {
        let options = ReplicationOptions {
            key: key.to_string(),
            spec: ReplicationSpec::Stream("ticks".to_string()),
            schema: SchemaOptions::new("ticks", key).with_naming(NamingScheme::Name),
            flush_rows: 10,
            flush_interval: Duration::from_millis(20),
        };
        Replicator::new(options, source, MemoryTarget::new())
            .start()
            .unwrap()
    }

    fn record_types() -> Vec<RecordType> {
        vec![RecordType::new(
            "md.Trade",
            vec![FieldDescriptor::new(
                "size",
                FieldKind::Int { width: 8 },
                false,
            )],
        )]
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_stop_all_then_wait_all() {
        let first = MemorySource::new(record_types());
        let second = MemorySource::new(record_types());

        let mut service = ReplicatorService::new();
        service.register(start_one("a", first));
        service.register(start_one("b", second));
        assert!(!service.is_empty());

        service.stop_all();
        service.wait_all().await.unwrap();
    }
}
