//! Rerouting engine daemon - watches for road hazards and reroutes active
//! missions around them.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aegis_engine::config::Config;
use aegis_engine::coordinator::MissionRerouteCoordinator;
use aegis_engine::loops::hazard_loop;
use aegis_engine::orchestrator::ReroutingOrchestrator;
use aegis_engine::persistence::{init_database, SqliteMissionStore};
use aegis_osrm::{OsrmClient, OsrmConfig, RouteCache};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("aegis_engine=debug".parse()?),
        )
        .init();

    tracing::info!("Starting rerouting engine...");

    let config = Config::from_env();
    let db = init_database(&config.db_path, 5).await?;

    let cache = Arc::new(RouteCache::default());
    let provider = Arc::new(OsrmClient::new(
        OsrmConfig {
            base_url: config.osrm_url.clone(),
            ..OsrmConfig::default()
        },
        cache,
    ));
    let store = SqliteMissionStore::new(db.pool().clone());
    let coordinator = Arc::new(MissionRerouteCoordinator::new(
        store,
        ReroutingOrchestrator::new(provider),
    ));

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let watcher = tokio::spawn(hazard_loop::run_hazard_loop(
        db,
        coordinator,
        config,
        shutdown_rx,
    ));

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");
    let _ = shutdown_tx.send(());
    let _ = watcher.await;

    Ok(())
}
