use crate::config::load_replicator_config;
use crate::core::start_replicator_with_config;
use tickhouse_config::shared::ReplicatorConfig;
use tickhouse_telemetry::init_tracing;
use tracing::error;

mod config;
mod core;

fn main() -> anyhow::Result<()> {
    // Load replicator config
    let replicator_config = load_replicator_config()?;

    // Initialize tracing
    let _log_flusher = init_tracing(env!("CARGO_BIN_NAME"))?;

    // We start the runtime.
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(replicator_config))?;

    Ok(())
}

async fn async_main(replicator_config: ReplicatorConfig) -> anyhow::Result<()> {
    // We start the replicator and catch any errors.
    if let Err(err) = start_replicator_with_config(replicator_config).await {
        error!("an error occurred in the replicator: {err}");

        return Err(err);
    }

    Ok(())
}
