//! Hazard watcher loop.
//!
//! Polls for pending road-hazard reports, claims them one at a time, and
//! runs a reroute pass over the active missions for each. A pass that
//! errors marks its report and keeps the loop alive.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::interval;

use crate::config::Config;
use crate::coordinator::{MissionRerouteCoordinator, MissionStore};
use crate::persistence::{hazards, Database};
use aegis_core::models::HazardPoint;
use aegis_core::provider::RouteProvider;

pub async fn run_hazard_loop<S, P>(
    db: Database,
    coordinator: Arc<MissionRerouteCoordinator<S, P>>,
    config: Config,
    mut shutdown: broadcast::Receiver<()>,
) where
    S: MissionStore,
    P: RouteProvider,
{
    let mut ticker = interval(Duration::from_secs(config.poll_interval_secs.max(1)));

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Hazard loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                if let Err(err) = process_next_hazard(&db, &coordinator, &config).await {
                    tracing::error!(error = %err, "hazard poll failed");
                }
            }
        }
    }
}

async fn process_next_hazard<S, P>(
    db: &Database,
    coordinator: &MissionRerouteCoordinator<S, P>,
    config: &Config,
) -> anyhow::Result<()>
where
    S: MissionStore,
    P: RouteProvider,
{
    let Some(report) = hazards::claim_pending_hazard(db.pool()).await? else {
        return Ok(());
    };

    tracing::info!(hazard = %report.id, "processing hazard report");
    let hazard = HazardPoint {
        id: report.id.clone(),
        location: report.location,
        radius_m: report
            .radius_m
            .filter(|r| *r > 0.0)
            .unwrap_or(config.default_hazard_radius_m),
    };

    match coordinator.handle_hazard_reported(&hazard).await {
        Ok(summary) => {
            hazards::mark_processed(db.pool(), &report.id, &summary).await?;
        }
        Err(err) => {
            // A failed mission fetch zeroes this pass; the report keeps the
            // error for inspection.
            tracing::error!(hazard = %report.id, error = %err, "reroute pass failed");
            hazards::mark_error(db.pool(), &report.id, &err.to_string()).await?;
        }
    }
    Ok(())
}
