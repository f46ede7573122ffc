//! Applies the reroute search across all active missions for a hazard.

use crate::orchestrator::{RerouteRequest, ReroutingOrchestrator, SearchOutcome};
use aegis_core::models::{HazardPoint, Mission, MissionRouteSegment, RerouteSummary};
use aegis_core::provider::RouteProvider;
use aegis_core::proximity::is_near;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::future::Future;

/// Mission persistence seam.
///
/// The store is the sole owner of mission state; writes are targeted per
/// mission so concurrent unrelated updates are never clobbered.
pub trait MissionStore: Send + Sync {
    fn find_active(&self) -> impl Future<Output = Result<Vec<Mission>>> + Send;

    /// Persist one mission's segment list and reroute stamp in a single
    /// atomic update.
    fn update_mission_routes(
        &self,
        mission_id: &str,
        segments: &[MissionRouteSegment],
        rerouted_at: DateTime<Utc>,
        reason: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Scans active missions when a hazard is reported and swaps affected
/// segments for safe alternatives where the search finds one.
pub struct MissionRerouteCoordinator<S, P> {
    store: S,
    orchestrator: ReroutingOrchestrator<P>,
    profile: String,
}

impl<S: MissionStore, P: RouteProvider> MissionRerouteCoordinator<S, P> {
    pub fn new(store: S, orchestrator: ReroutingOrchestrator<P>) -> Self {
        Self {
            store,
            orchestrator,
            profile: "driving".to_string(),
        }
    }

    /// Run one hazard pass over the currently active missions.
    ///
    /// The only hard failure is the initial mission fetch, surfaced as
    /// `Err` for the caller to report; everything downstream (unroutable
    /// segments, per-mission persistence failures) is absorbed into the
    /// returned counters and the log.
    pub async fn handle_hazard_reported(&self, hazard: &HazardPoint) -> Result<RerouteSummary> {
        let missions = self
            .store
            .find_active()
            .await
            .context("loading active missions")?;
        tracing::info!(
            hazard = %hazard.id,
            missions = missions.len(),
            "hazard reported, scanning active missions"
        );

        // Missions are independent: evaluate them concurrently. Segments
        // inside a mission stay sequential so each mission gets exactly one
        // write.
        let passes = missions
            .into_iter()
            .map(|mission| self.process_mission(mission, hazard));
        let mut summary = RerouteSummary::default();
        for pass in join_all(passes).await {
            summary.merge(pass);
        }

        tracing::info!(
            hazard = %hazard.id,
            affected = summary.affected,
            rerouted = summary.rerouted,
            failed = summary.failed,
            "hazard pass complete"
        );
        Ok(summary)
    }

    async fn process_mission(&self, mut mission: Mission, hazard: &HazardPoint) -> RerouteSummary {
        let mut summary = RerouteSummary::default();
        let reason = format!("road hazard {}", hazard.id);

        for segment in &mut mission.segments {
            if !is_near(hazard.location, &segment.geometry, hazard.radius_m) {
                continue;
            }
            summary.affected += 1;

            let (Some(origin), Some(destination)) = (segment.origin(), segment.destination())
            else {
                continue;
            };
            let request = RerouteRequest {
                origin,
                destination,
                hazard: hazard.clone(),
                blocked_geometry: segment.geometry.clone(),
                profile: self.profile.clone(),
            };

            match self.orchestrator.find_safe_route(&request).await {
                SearchOutcome::Found { route, stage } => {
                    segment.apply_replacement(&route, &reason, Utc::now());
                    summary.rerouted += 1;
                    tracing::info!(
                        mission = %mission.id,
                        vehicle = segment.vehicle_id,
                        stage = stage.as_str(),
                        "segment rerouted"
                    );
                }
                SearchOutcome::Exhausted => {
                    segment.reroute_warning =
                        Some(format!("no safe alternative found around hazard {}", hazard.id));
                    segment.reroute_checked_at = Some(Utc::now());
                    summary.failed += 1;
                    tracing::warn!(
                        mission = %mission.id,
                        vehicle = segment.vehicle_id,
                        "segment kept on hazardous route"
                    );
                }
            }
        }

        if summary.affected == 0 {
            return summary;
        }

        if let Err(err) = self
            .store
            .update_mission_routes(&mission.id, &mission.segments, Utc::now(), &reason)
            .await
        {
            // Skipped, not fatal: the next hazard event retries this
            // mission from stored state.
            tracing::error!(
                mission = %mission.id,
                error = %err,
                "failed to persist rerouted mission"
            );
        }
        summary
    }
}
