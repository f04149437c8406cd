//! CineGrid coordinator
//!
//! Builds the coordinator context (catalog, user table, cache, worker
//! fleet), restores the optional snapshot, spawns the health prober and the
//! cache sweeper, and serves the HTTP API.

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use chrono::Utc;
use cinegrid_api::snapshot::{self, Snapshot};
use cinegrid_api::{routes, CoordinatorContext, MovieCatalog, UserTable};
use cinegrid_core::config::{load_dotenv, ConfigLoader, CoordinatorConfig};
use cinegrid_core::observability;
use std::time::Duration;
use tracing::{error, info, warn};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    observability::init_tracing(true);

    let config = CoordinatorConfig::from_env()?;
    config.validate()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        api_addr = %config.api_addr,
        workers = config.workers.len(),
        "starting CineGrid coordinator"
    );

    // An unreadable catalog degrades every title to "Unknown" but is not
    // fatal; a missing ratings partition is.
    let mut catalog = match MovieCatalog::load(&config.movies_path) {
        Ok(catalog) => catalog,
        Err(e) => {
            warn!(error = %e, "failed to load movie catalog; titles will be Unknown");
            MovieCatalog::default()
        }
    };

    let users = UserTable::load(&config.partitions).context("failed to build user table")?;
    if users.is_empty() {
        anyhow::bail!("user table is empty after scanning all partitions");
    }

    let restored_cache = match &config.snapshot_path {
        Some(path) => match snapshot::load(path).context("failed to restore snapshot")? {
            Some(snap) => {
                catalog.merge(snap.movies);
                Some(snap.cache)
            }
            None => {
                info!(snapshot = %path.display(), "no snapshot found, starting empty");
                None
            }
        },
        None => None,
    };

    let context = CoordinatorContext::new(config.clone(), catalog, users);
    let data = web::Data::new(context);

    if let Some(entries) = restored_cache {
        data.cache.restore(entries).await;
    }

    data.health.clone().spawn_prober(config.probe_interval);
    spawn_cache_sweeper(data.clone(), config.cache_sweep_interval);

    info!(api_addr = %config.api_addr, "coordinator ready");

    let server_data = data.clone();
    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header();

        App::new()
            .app_data(server_data.clone())
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .configure(routes::configure)
    })
    .workers(config.http_workers)
    .bind(&config.api_addr)
    .with_context(|| format!("failed to bind {}", config.api_addr))?
    .run()
    .await?;

    Ok(())
}

/// Periodically evict aged cache entries and persist the snapshot.
fn spawn_cache_sweeper(data: web::Data<CoordinatorContext>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The immediate first tick would sweep an empty cache.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let removed = data.cache.sweep().await;
            info!(entries_removed = removed, "cache sweep tick");

            if let Some(path) = &data.config.snapshot_path {
                let snap = Snapshot {
                    movies: data.catalog.titles().clone(),
                    cache: data.cache.export_entries().await,
                    updated: Utc::now(),
                };
                if let Err(e) = snapshot::save(path, &snap) {
                    error!(error = %e, "failed to persist snapshot");
                }
            }
        }
    });
}
