//! Escalating search for a safe replacement route.
//!
//! Stages run in a fixed order, each costlier and more circuitous than the
//! last: the provider's own alternatives first, then perpendicular detours
//! at 500 m, then at 1000 m. The near stage pools candidates from both
//! sides and ranks them; the far stage takes the first safe route it sees.

use aegis_core::detour::{detour_waypoints, FAR_OFFSET_M, NEAR_OFFSET_M};
use aegis_core::models::{GeoPoint, HazardPoint, Route, RouteOptions};
use aegis_core::provider::RouteProvider;
use aegis_core::proximity::is_near;
use std::cmp::Ordering;
use std::sync::Arc;

/// Everything one search needs to build and judge candidate routes.
#[derive(Debug, Clone)]
pub struct RerouteRequest {
    pub origin: GeoPoint,
    pub destination: GeoPoint,
    pub hazard: HazardPoint,
    /// Geometry of the route being replaced, used to derive the local road
    /// bearing for detour placement.
    pub blocked_geometry: Vec<GeoPoint>,
    pub profile: String,
}

/// Search stages, in escalation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RerouteStage {
    DirectAlternatives,
    NearDetour,
    FarDetour,
}

impl RerouteStage {
    pub const ORDERED: [RerouteStage; 3] =
        [Self::DirectAlternatives, Self::NearDetour, Self::FarDetour];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DirectAlternatives => "direct_alternatives",
            Self::NearDetour => "near_detour",
            Self::FarDetour => "far_detour",
        }
    }
}

/// Result of a full search.
#[derive(Debug, Clone)]
pub enum SearchOutcome {
    Found { route: Route, stage: RerouteStage },
    Exhausted,
}

pub struct ReroutingOrchestrator<P> {
    provider: Arc<P>,
}

impl<P: RouteProvider> ReroutingOrchestrator<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }

    /// Try each stage in order; the first stage to produce a safe route
    /// wins. Provider failures inside a stage are logged and treated as
    /// "this stage found nothing" so the search escalates instead of
    /// aborting.
    pub async fn find_safe_route(&self, request: &RerouteRequest) -> SearchOutcome {
        for stage in RerouteStage::ORDERED {
            tracing::debug!(
                hazard = %request.hazard.id,
                stage = stage.as_str(),
                "trying reroute stage"
            );
            if let Some(route) = self.attempt(stage, request).await {
                tracing::info!(
                    hazard = %request.hazard.id,
                    stage = stage.as_str(),
                    duration_s = route.duration_s,
                    "safe route found"
                );
                return SearchOutcome::Found { route, stage };
            }
            tracing::debug!(
                hazard = %request.hazard.id,
                stage = stage.as_str(),
                "stage produced no safe route"
            );
        }
        tracing::warn!(hazard = %request.hazard.id, "all reroute stages exhausted");
        SearchOutcome::Exhausted
    }

    /// Run a single stage. Public so each stage can be tested in isolation.
    pub async fn attempt(&self, stage: RerouteStage, request: &RerouteRequest) -> Option<Route> {
        match stage {
            RerouteStage::DirectAlternatives => self.try_direct_alternatives(request).await,
            RerouteStage::NearDetour => self.try_detour_pooled(request, NEAR_OFFSET_M).await,
            RerouteStage::FarDetour => self.try_detour_first_safe(request, FAR_OFFSET_M).await,
        }
    }

    async fn try_direct_alternatives(&self, request: &RerouteRequest) -> Option<Route> {
        let options = RouteOptions {
            profile: request.profile.clone(),
            alternatives: true,
        };
        let routes = match self
            .provider
            .fetch_routes(&[request.origin, request.destination], &options)
            .await
        {
            Ok(routes) => routes,
            Err(err) => {
                tracing::warn!(error = %err, "direct alternatives query failed");
                return None;
            }
        };
        // Routes arrive ranked ascending by duration; the first safe one is
        // the best safe one.
        routes.into_iter().find(|route| self.is_safe(route, request))
    }

    /// Query both detour sides and rank the pooled safe candidates: minimum
    /// duration, then distance. Iteration order makes the left side win
    /// full ties.
    async fn try_detour_pooled(&self, request: &RerouteRequest, offset_m: f64) -> Option<Route> {
        let options = RouteOptions {
            profile: request.profile.clone(),
            alternatives: false,
        };
        let mut pool: Vec<Route> = Vec::new();
        for waypoint in self.detour_candidates(request, offset_m) {
            match self
                .provider
                .fetch_routes(&[request.origin, waypoint, request.destination], &options)
                .await
            {
                Ok(routes) => {
                    pool.extend(routes.into_iter().filter(|route| self.is_safe(route, request)))
                }
                Err(err) => {
                    tracing::warn!(error = %err, offset_m, "detour side query failed");
                }
            }
        }
        pool.into_iter().min_by(|a, b| {
            a.duration_s
                .partial_cmp(&b.duration_s)
                .unwrap_or(Ordering::Equal)
                .then_with(|| {
                    a.distance_m
                        .partial_cmp(&b.distance_m)
                        .unwrap_or(Ordering::Equal)
                })
        })
    }

    /// Scan left then right and short-circuit on the first safe route. At
    /// this offset any safe route is acceptable, so no cross-side pooling.
    async fn try_detour_first_safe(&self, request: &RerouteRequest, offset_m: f64) -> Option<Route> {
        let options = RouteOptions {
            profile: request.profile.clone(),
            alternatives: false,
        };
        for waypoint in self.detour_candidates(request, offset_m) {
            match self
                .provider
                .fetch_routes(&[request.origin, waypoint, request.destination], &options)
                .await
            {
                Ok(routes) => {
                    if let Some(route) =
                        routes.into_iter().find(|route| self.is_safe(route, request))
                    {
                        return Some(route);
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, offset_m, "detour side query failed");
                }
            }
        }
        None
    }

    fn detour_candidates(&self, request: &RerouteRequest, offset_m: f64) -> [GeoPoint; 2] {
        detour_waypoints(
            request.hazard.location,
            &request.blocked_geometry,
            request.origin,
            request.destination,
            offset_m,
        )
    }

    fn is_safe(&self, route: &Route, request: &RerouteRequest) -> bool {
        !is_near(
            request.hazard.location,
            &route.geometry,
            request.hazard.radius_m,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_core::provider::ProviderError;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    fn pt(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon)
    }

    fn hazard() -> HazardPoint {
        HazardPoint {
            id: "hz-1".to_string(),
            location: pt(18.52, 73.82),
            radius_m: 100.0,
        }
    }

    fn request() -> RerouteRequest {
        RerouteRequest {
            origin: pt(18.50, 73.80),
            destination: pt(18.55, 73.85),
            hazard: hazard(),
            blocked_geometry: vec![pt(18.50, 73.80), pt(18.52, 73.82), pt(18.55, 73.85)],
            profile: "driving".to_string(),
        }
    }

    /// A route passing straight through the hazard point.
    fn hazardous_route(duration_s: f64) -> Route {
        Route {
            geometry: vec![pt(18.50, 73.80), pt(18.52, 73.82), pt(18.55, 73.85)],
            distance_m: duration_s * 10.0,
            duration_s,
            is_fallback: false,
        }
    }

    /// A route staying well clear of the hazard (~1 km offset).
    fn safe_route(duration_s: f64, distance_m: f64) -> Route {
        Route {
            geometry: vec![pt(18.50, 73.80), pt(18.51, 73.84), pt(18.55, 73.85)],
            distance_m,
            duration_s,
            is_fallback: false,
        }
    }

    /// Replays a scripted response per provider call, in call order, and
    /// records every call's waypoints.
    struct ScriptedProvider {
        script: Mutex<VecDeque<Result<Vec<Route>, ProviderError>>>,
        calls: Mutex<Vec<Vec<GeoPoint>>>,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Result<Vec<Route>, ProviderError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl RouteProvider for ScriptedProvider {
        async fn fetch_routes(
            &self,
            waypoints: &[GeoPoint],
            _options: &RouteOptions,
        ) -> Result<Vec<Route>, ProviderError> {
            self.calls.lock().unwrap().push(waypoints.to_vec());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(Vec::new()))
        }
    }

    #[tokio::test]
    async fn second_direct_alternative_wins_when_first_is_hazardous() {
        let provider = ScriptedProvider::new(vec![Ok(vec![
            hazardous_route(500.0),
            safe_route(600.0, 9000.0),
        ])]);
        let orchestrator = ReroutingOrchestrator::new(provider.clone());

        match orchestrator.find_safe_route(&request()).await {
            SearchOutcome::Found { route, stage } => {
                assert_eq!(stage, RerouteStage::DirectAlternatives);
                assert_eq!(route.duration_s, 600.0);
            }
            SearchOutcome::Exhausted => panic!("expected a safe direct alternative"),
        }
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn near_left_success_never_reaches_far_stage() {
        let provider = ScriptedProvider::new(vec![
            // Direct alternatives: all hazardous.
            Ok(vec![hazardous_route(500.0), hazardous_route(520.0)]),
            // Near detour, left side: one safe route.
            Ok(vec![safe_route(650.0, 9500.0)]),
            // Near detour, right side: still hazardous.
            Ok(vec![hazardous_route(630.0)]),
        ]);
        let orchestrator = ReroutingOrchestrator::new(provider.clone());

        match orchestrator.find_safe_route(&request()).await {
            SearchOutcome::Found { route, stage } => {
                assert_eq!(stage, RerouteStage::NearDetour);
                assert_eq!(route.duration_s, 650.0);
            }
            SearchOutcome::Exhausted => panic!("expected the near-left route"),
        }
        // One direct call plus both near sides; the far stage never runs.
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn near_detour_pools_both_sides_and_takes_fastest() {
        let provider = ScriptedProvider::new(vec![
            Ok(vec![safe_route(700.0, 9000.0)]), // left
            Ok(vec![safe_route(640.0, 9800.0)]), // right, faster
        ]);
        let orchestrator = ReroutingOrchestrator::new(provider.clone());

        let route = orchestrator
            .attempt(RerouteStage::NearDetour, &request())
            .await
            .expect("pooled stage must pick a route");
        assert_eq!(route.duration_s, 640.0);
    }

    #[tokio::test]
    async fn near_detour_full_tie_prefers_left() {
        let provider = ScriptedProvider::new(vec![
            Ok(vec![Route {
                geometry: vec![pt(18.50, 73.80), pt(18.51, 73.84), pt(18.55, 73.85)],
                distance_m: 9000.0,
                duration_s: 700.0,
                is_fallback: false,
            }]),
            Ok(vec![Route {
                geometry: vec![pt(18.50, 73.80), pt(18.53, 73.80), pt(18.55, 73.85)],
                distance_m: 9000.0,
                duration_s: 700.0,
                is_fallback: false,
            }]),
        ]);
        let orchestrator = ReroutingOrchestrator::new(provider.clone());

        let route = orchestrator
            .attempt(RerouteStage::NearDetour, &request())
            .await
            .unwrap();
        // Left side was queried first, so its geometry wins the tie.
        assert_eq!(route.geometry[1], pt(18.51, 73.84));
    }

    #[tokio::test]
    async fn far_detour_short_circuits_on_first_safe_side() {
        let provider = ScriptedProvider::new(vec![
            Ok(vec![hazardous_route(500.0)]), // direct
            Ok(vec![]),                       // near left: no route
            Ok(vec![]),                       // near right: no route
            Ok(vec![safe_route(800.0, 12000.0)]), // far left
        ]);
        let orchestrator = ReroutingOrchestrator::new(provider.clone());

        match orchestrator.find_safe_route(&request()).await {
            SearchOutcome::Found { route, stage } => {
                assert_eq!(stage, RerouteStage::FarDetour);
                assert_eq!(route.duration_s, 800.0);
            }
            SearchOutcome::Exhausted => panic!("expected the far-left route"),
        }
        // The right far side is never queried once the left succeeds.
        assert_eq!(provider.call_count(), 4);
    }

    #[tokio::test]
    async fn all_stages_hazardous_exhausts_the_search() {
        let provider = ScriptedProvider::new(vec![
            Ok(vec![hazardous_route(500.0)]),
            Ok(vec![hazardous_route(650.0)]),
            Ok(vec![hazardous_route(630.0)]),
            Ok(vec![hazardous_route(800.0)]),
            Ok(vec![hazardous_route(820.0)]),
        ]);
        let orchestrator = ReroutingOrchestrator::new(provider.clone());

        assert!(matches!(
            orchestrator.find_safe_route(&request()).await,
            SearchOutcome::Exhausted
        ));
        assert_eq!(provider.call_count(), 5);
    }

    #[tokio::test]
    async fn provider_errors_escalate_instead_of_aborting() {
        let provider = ScriptedProvider::new(vec![
            Err(ProviderError::Timeout),     // direct
            Err(ProviderError::RateLimited), // near left
            Ok(vec![safe_route(700.0, 9500.0)]), // near right
        ]);
        let orchestrator = ReroutingOrchestrator::new(provider.clone());

        match orchestrator.find_safe_route(&request()).await {
            SearchOutcome::Found { stage, .. } => assert_eq!(stage, RerouteStage::NearDetour),
            SearchOutcome::Exhausted => panic!("surviving side should carry the stage"),
        }
    }

    #[tokio::test]
    async fn errors_on_every_call_exhaust_cleanly() {
        let provider = ScriptedProvider::new(vec![
            Err(ProviderError::Network("connection refused".to_string())),
            Err(ProviderError::Network("connection refused".to_string())),
            Err(ProviderError::Network("connection refused".to_string())),
            Err(ProviderError::Network("connection refused".to_string())),
            Err(ProviderError::Network("connection refused".to_string())),
        ]);
        let orchestrator = ReroutingOrchestrator::new(provider.clone());

        assert!(matches!(
            orchestrator.find_safe_route(&request()).await,
            SearchOutcome::Exhausted
        ));
        assert_eq!(provider.call_count(), 5);
    }
}
