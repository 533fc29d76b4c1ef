//! The replication state machine.
//!
//! One [`Replicator`] owns one run: schema preparation (translation,
//! reconciliation, resume computation), the streaming loop, and teardown.
//! Runs are independent; a [`ReplicatorHandle`] is the only way to observe
//! or stop a running replication.

mod service;

pub use service::*;

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::bail;
use crate::concurrency::{create_stop_channel, StopRx, StopTx};
use crate::error::{ErrorKind, TickError, TickResult};
use crate::schema::{translate, TableSchemaMerger};
use crate::source::{Cursor, CursorPoll, ReplicationSpec, Source};
use crate::target::TargetClient;
use crate::types::{SchemaOptions, TableDeclaration, WriteMode};
use crate::writer::TableWriter;

/// Options of one replication run.
#[derive(Debug, Clone)]
pub struct ReplicationOptions {
    /// Identifies the run in logs and in the supervising service.
    pub key: String,
    pub spec: ReplicationSpec,
    pub schema: SchemaOptions,
    /// Flush once this many rows are buffered.
    pub flush_rows: usize,
    /// Flush once this much time has passed since the last flush.
    pub flush_interval: Duration,
}

/// Externally observable state of a replication run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicatorState {
    Init,
    SchemaPrep,
    Streaming,
    Stopping,
    Stopped,
    Error,
}

/// A replication run, ready to start.
pub struct Replicator<S, T> {
    options: ReplicationOptions,
    source: S,
    target: T,
}

impl<S, T> Replicator<S, T>
where
    S: Source + Send + Sync + 'static,
    S::Cursor: Send,
    T: TargetClient + Send + Sync + 'static,
{
    pub fn new(options: ReplicationOptions, source: S, target: T) -> Self {
        Self {
            options,
            source,
            target,
        }
    }

    /// Spawns the run and returns its handle.
    pub fn start(self) -> TickResult<ReplicatorHandle> {
        if self.options.flush_rows == 0 {
            bail!(
                ErrorKind::ConfigError,
                "Invalid replication options",
                "flush_rows must be greater than zero"
            );
        }
        if self.options.flush_interval.is_zero() {
            bail!(
                ErrorKind::ConfigError,
                "Invalid replication options",
                "flush_interval must be greater than zero"
            );
        }

        let (stop_tx, stop_rx) = create_stop_channel();
        let (state_tx, state_rx) = watch::channel(ReplicatorState::Init);
        let key = self.options.key.clone();

        let join = tokio::spawn(run(self.options, self.source, self.target, stop_rx, state_tx));

        Ok(ReplicatorHandle {
            key,
            stop_tx,
            state_rx,
            join,
        })
    }
}

/// Handle to a running replication.
#[derive(Debug)]
pub struct ReplicatorHandle {
    key: String,
    stop_tx: StopTx,
    state_rx: watch::Receiver<ReplicatorState>,
    join: JoinHandle<TickResult<()>>,
}

impl ReplicatorHandle {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn state(&self) -> ReplicatorState {
        *self.state_rx.borrow()
    }

    /// Requests a cooperative stop; the in-flight iteration completes first.
    pub fn stop(&self) {
        let _ = self.stop_tx.stop();
    }

    /// Returns a clonable stop trigger for this run.
    pub fn stop_tx(&self) -> StopTx {
        self.stop_tx.clone()
    }

    /// Resolves when the run has terminated, with its outcome.
    pub async fn wait(self) -> TickResult<()> {
        match self.join.await {
            Ok(result) => result,
            Err(join_error) => Err(TickError::from((
                ErrorKind::Unknown,
                "Replication task terminated abnormally",
                join_error.to_string(),
            ))),
        }
    }
}

async fn run<S, T>(
    options: ReplicationOptions,
    source: S,
    target: T,
    stop_rx: StopRx,
    state_tx: watch::Sender<ReplicatorState>,
) -> TickResult<()>
where
    S: Source,
    T: TargetClient,
{
    let key = options.key.clone();
    info!(key, spec = options.spec.describe(), "replication starting");

    let result = run_inner(&options, &source, &target, stop_rx, &state_tx).await;
    match &result {
        Ok(()) => {
            info!(key, "replication stopped");
            let _ = state_tx.send(ReplicatorState::Stopped);
        }
        Err(err) => {
            // Runtime failures are fatal for the run; restart policy belongs
            // to the supervisor.
            error!(key, error = %err, "replication failed");
            let _ = state_tx.send(ReplicatorState::Error);
        }
    }
    result
}

async fn run_inner<S, T>(
    options: &ReplicationOptions,
    source: &S,
    target: &T,
    mut stop_rx: StopRx,
    state_tx: &watch::Sender<ReplicatorState>,
) -> TickResult<()>
where
    S: Source,
    T: TargetClient,
{
    let _ = state_tx.send(ReplicatorState::SchemaPrep);

    let record_types = source.record_types(&options.spec).await?;
    let translated = translate(&record_types, &options.schema)?;

    let (tables, resume) = prepare_tables(options, target, translated.tables).await?;

    let mut writer = TableWriter::new(
        record_types.iter().map(|t| t.name.clone()).collect(),
        translated.types,
        tables,
    );

    let _ = state_tx.send(ReplicatorState::Streaming);
    let cursor = source.open_cursor(&options.spec, resume).await?;

    let outcome = stream(options, target, &mut writer, cursor, &mut stop_rx).await;

    let _ = state_tx.send(ReplicatorState::Stopping);
    writer.close();
    outcome
}

/// Reconciles target tables and computes the APPEND resume position.
async fn prepare_tables<T>(
    options: &ReplicationOptions,
    target: &T,
    expected: BTreeMap<String, TableDeclaration>,
) -> TickResult<(BTreeMap<String, TableDeclaration>, Option<i64>)>
where
    T: TargetClient,
{
    let mut tables = BTreeMap::new();
    let mut resume: Option<i64> = None;

    for (name, table) in expected {
        match options.schema.write_mode {
            WriteMode::Rewrite => {
                target.drop_table(&table).await?;
                target.create_table(&table).await?;
                tables.insert(name, table);
            }
            WriteMode::Append => match target.describe_table(&table).await? {
                None => {
                    target.create_table(&table).await?;
                    tables.insert(name, table);
                }
                Some(actual) => {
                    let (filtered, changed) = TableSchemaMerger::merge(&table, &actual)?;
                    if changed {
                        info!(
                            key = options.key,
                            table = filtered.qualified_name(),
                            "replicating into a narrowed column set"
                        );
                    }
                    if let Some(max) = target.max_timestamp(&filtered).await? {
                        resume = Some(resume.map_or(max, |r| r.max(max)));
                    }
                    tables.insert(name, filtered);
                }
            },
        }
    }

    // A partially flushed final batch from a prior crash may have left an
    // incomplete set of rows at the boundary timestamp. Delete them; the
    // cursor replays from the same timestamp.
    if let Some(resume_timestamp) = resume {
        info!(
            key = options.key,
            resume_timestamp, "resuming from the maximum replicated timestamp"
        );
        for table in tables.values() {
            target.delete_at_timestamp(table, resume_timestamp).await?;
        }
    }

    Ok((tables, resume))
}

async fn stream<T, C>(
    options: &ReplicationOptions,
    target: &T,
    writer: &mut TableWriter,
    mut cursor: C,
    stop_rx: &mut StopRx,
) -> TickResult<()>
where
    T: TargetClient,
    C: Cursor,
{
    let notify = cursor.data_available();
    let mut last_flush = Instant::now();

    loop {
        if stop_rx.stop_requested() {
            // Pending rows are deliberately left unflushed; the next APPEND
            // run deletes and replays the boundary timestamp.
            info!(key = options.key, pending = writer.row_count(), "stop requested");
            return Ok(());
        }

        if writer.row_count() > 0
            && (writer.row_count() >= options.flush_rows
                || last_flush.elapsed() >= options.flush_interval)
        {
            writer.flush(target).await?;
            last_flush = Instant::now();
        }

        match cursor.try_next()? {
            CursorPoll::Record(record) => {
                debug!(
                    key = options.key,
                    timestamp = record.timestamp,
                    "encoding record"
                );
                writer.send(&record)?;
            }
            CursorPoll::Exhausted => {
                if writer.row_count() > 0 {
                    writer.flush(target).await?;
                }
                info!(key = options.key, "source exhausted");
                return Ok(());
            }
            CursorPoll::Pending => {
                let remaining = if writer.row_count() == 0 {
                    options.flush_interval
                } else {
                    options.flush_interval.saturating_sub(last_flush.elapsed())
                };
                tokio::select! {
                    _ = notify.notified() => {}
                    _ = stop_rx.stopped() => {}
                    _ = tokio::time::sleep(remaining) => {}
                }
            }
        }
    }
}
