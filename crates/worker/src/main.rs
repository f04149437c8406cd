//! CineGrid shard worker
//!
//! Loads one ratings partition into memory and answers similarity queries
//! from the coordinator over framed-JSON TCP.

use anyhow::Context;
use cinegrid_core::config::{load_dotenv, ConfigLoader, WorkerConfig};
use cinegrid_core::observability;
use cinegrid_shard::ShardStore;
use cinegrid_worker::WorkerService;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    observability::init_tracing(true);

    let config = WorkerConfig::from_env()?;
    config.validate()?;

    info!(
        worker_id = %config.worker_id,
        partition = %config.partition_path.display(),
        "starting CineGrid worker"
    );

    let store = tokio::task::spawn_blocking({
        let partition = config.partition_path.clone();
        move || ShardStore::load(&partition)
    })
    .await
    .context("shard load task failed")??;

    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;

    let service = WorkerService::new(Arc::new(store), config.worker_id);
    service.serve(listener).await
}
