use std::time::Duration;

use secrecy::ExposeSecret;
use tickhouse::replicator::{ReplicationOptions, Replicator, ReplicatorService};
use tickhouse::source::{FileSource, MemorySource, ReplicationSpec, Source};
use tickhouse::target::{ClickHouseClient, MemoryTarget, TargetClient};
use tickhouse::types::{NamingScheme, SchemaOptions, WriteMode};
use tickhouse_config::shared::{
    JobConfig, NamingSchemeConfig, ReplicatorConfig, SourceConfig, SpecConfig, TargetConfig,
    WriteModeConfig,
};
use tokio::signal::unix::{SignalKind, signal};
use tracing::{debug, info};

/// Starts the replicator service with the provided configuration.
///
/// Creates the configured source and target, starts one replication run per
/// configured job, and waits for all of them to finish. Handles both memory
/// and ClickHouse targets with proper initialization and error handling.
pub async fn start_replicator_with_config(
    replicator_config: ReplicatorConfig,
) -> anyhow::Result<()> {
    info!("starting replicator service");

    log_config(&replicator_config);

    // For each source and target pair, we start the jobs. This is more verbose due to static
    // dispatch, but we prefer more performance at the cost of ergonomics.
    match (&replicator_config.source, &replicator_config.target) {
        (SourceConfig::Memory, target) => {
            let source = MemorySource::new(vec![]);
            match target {
                TargetConfig::Memory { .. } => {
                    run_jobs(source, MemoryTarget::new(), &replicator_config).await?;
                }
                TargetConfig::ClickHouse { .. } => {
                    let target = clickhouse_client(target);
                    run_jobs(source, target, &replicator_config).await?;
                }
            }
        }
        (
            SourceConfig::File {
                schema_path,
                records_path,
            },
            target,
        ) => {
            let source = FileSource::new(schema_path, records_path);
            match target {
                TargetConfig::Memory { .. } => {
                    run_jobs(source, MemoryTarget::new(), &replicator_config).await?;
                }
                TargetConfig::ClickHouse { .. } => {
                    let target = clickhouse_client(target);
                    run_jobs(source, target, &replicator_config).await?;
                }
            }
        }
    }

    info!("replicator service completed");

    Ok(())
}

/// Builds a [`ClickHouseClient`] from a ClickHouse target configuration.
///
/// # Panics
/// Panics if called with a non-ClickHouse target configuration.
fn clickhouse_client(config: &TargetConfig) -> ClickHouseClient {
    let TargetConfig::ClickHouse {
        url,
        database,
        username,
        password,
    } = config
    else {
        unreachable!("clickhouse_client called with a non-ClickHouse target");
    };

    match (username, password) {
        (Some(username), Some(password)) => ClickHouseClient::new_with_credentials(
            url,
            database.clone(),
            username,
            password.expose_secret(),
        ),
        _ => ClickHouseClient::new(url, database.clone()),
    }
}

/// Starts one replication run per job and waits for all of them.
///
/// Sets up signal handlers for SIGTERM and SIGINT that request a cooperative
/// stop of every run. Runs that finish naturally, for example from an
/// exhausted file source, resolve without a signal.
async fn run_jobs<S, T>(source: S, target: T, config: &ReplicatorConfig) -> anyhow::Result<()>
where
    S: Source + Clone + Send + Sync + 'static,
    S::Cursor: Send,
    T: TargetClient + Clone + Send + Sync + 'static,
{
    let mut service = ReplicatorService::new();
    for job in &config.jobs {
        let options = replication_options(job, config.target.database());
        let replicator = Replicator::new(options, source.clone(), target.clone());
        service.register(replicator.start()?);
    }

    // Spawn a task to listen for shutdown signals and trigger a stop.
    let stop_txs = service.stop_txs();
    let shutdown_handle = tokio::spawn(async move {
        // Listen for SIGTERM, sent by Kubernetes before SIGKILL during pod termination.
        //
        // A cooperative stop lets the in-flight read or flush complete, but pending
        // unflushed rows are dropped and replayed on the next run.
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to register SIGTERM handler");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("SIGINT (Ctrl+C) received, stopping replications");
            }
            _ = sigterm.recv() => {
                info!("SIGTERM received, stopping replications");
            }
        }

        for stop_tx in stop_txs {
            let _ = stop_tx.stop();
        }
    });

    // Wait for all runs to finish (either normally or via a stop request).
    let result = service.wait_all().await;

    // Ensure the shutdown task is finished before returning. If the runs finished
    // before a signal arrived, the task is still waiting and must be aborted.
    shutdown_handle.abort();
    let _ = shutdown_handle.await;

    // Propagate any replication error as anyhow error.
    result?;

    Ok(())
}

fn replication_options(job: &JobConfig, database: &str) -> ReplicationOptions {
    let naming = match job.naming {
        NamingSchemeConfig::TypeAndName => NamingScheme::TypeAndName,
        NamingSchemeConfig::Name => NamingScheme::Name,
        NamingSchemeConfig::NameAndDatatype => NamingScheme::NameAndDatatype,
    };
    let write_mode = match job.write_mode {
        WriteModeConfig::Append => WriteMode::Append,
        WriteModeConfig::Rewrite => WriteMode::Rewrite,
    };
    let spec = match &job.spec {
        SpecConfig::Stream(name) => ReplicationSpec::Stream(name.clone()),
        SpecConfig::Query(query) => ReplicationSpec::Query(query.clone()),
    };

    let mut schema = SchemaOptions::new(database, &job.table)
        .with_naming(naming)
        .with_write_mode(write_mode)
        .with_partition_column(job.include_partition_column)
        .with_split_by_type(job.split_by_type);
    for (type_name, table) in &job.type_tables {
        schema = schema.with_type_table(type_name, table);
    }

    ReplicationOptions {
        key: job.key.clone(),
        spec,
        schema,
        flush_rows: job.flush_row_count,
        flush_interval: Duration::from_millis(job.flush_interval_ms),
    }
}

fn log_config(config: &ReplicatorConfig) {
    match &config.source {
        SourceConfig::Memory => debug!("using memory source config"),
        SourceConfig::File {
            schema_path,
            records_path,
        } => debug!(schema_path, records_path, "using file source config"),
    }

    match &config.target {
        TargetConfig::Memory { database } => debug!(database, "using memory target config"),
        TargetConfig::ClickHouse { url, database, .. } => {
            debug!(url, database, "using clickhouse target config")
        }
    }

    for job in &config.jobs {
        let spec = match &job.spec {
            SpecConfig::Stream(name) => format!("stream {name}"),
            SpecConfig::Query(query) => format!("query {query}"),
        };
        debug!(
            key = job.key,
            spec,
            table = job.table,
            flush_row_count = job.flush_row_count,
            flush_interval_ms = job.flush_interval_ms,
            "job config"
        );
    }
}
