//! End-to-end reroute passes over the SQLite mission store.

use aegis_core::models::{
    GeoPoint, HazardPoint, Mission, MissionRouteSegment, MissionStatus, Route, RouteOptions,
};
use aegis_core::provider::{ProviderError, RouteProvider};
use aegis_engine::config::Config;
use aegis_engine::coordinator::MissionRerouteCoordinator;
use aegis_engine::loops::hazard_loop;
use aegis_engine::orchestrator::ReroutingOrchestrator;
use aegis_engine::persistence::{hazards, init_database, missions, Database, SqliteMissionStore};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

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

fn blocked_mission(id: &str) -> Mission {
    Mission {
        id: id.to_string(),
        status: MissionStatus::Active,
        segments: vec![MissionRouteSegment {
            vehicle_id: 0,
            geometry: vec![pt(18.50, 73.80), pt(18.52, 73.82), pt(18.55, 73.85)],
            distance_m: 8000.0,
            duration_s: 600.0,
            rerouted: false,
            rerouted_reason: None,
            rerouted_at: None,
            original_distance_m: None,
            original_duration_s: None,
            reroute_warning: None,
            reroute_checked_at: None,
        }],
        station: None,
        last_rerouted_at: None,
        last_rerouted_reason: None,
        created_at: Utc::now(),
    }
}

fn safe_route() -> Route {
    Route {
        geometry: vec![pt(18.50, 73.80), pt(18.51, 73.84), pt(18.55, 73.85)],
        distance_m: 9200.0,
        duration_s: 660.0,
        is_fallback: false,
    }
}

fn hazardous_route() -> Route {
    Route {
        geometry: vec![pt(18.50, 73.80), pt(18.52, 73.82), pt(18.55, 73.85)],
        distance_m: 8000.0,
        duration_s: 600.0,
        is_fallback: false,
    }
}

/// Every query yields the same routes.
struct ConstantProvider {
    routes: Vec<Route>,
}

impl RouteProvider for ConstantProvider {
    async fn fetch_routes(
        &self,
        _waypoints: &[GeoPoint],
        _options: &RouteOptions,
    ) -> Result<Vec<Route>, ProviderError> {
        Ok(self.routes.clone())
    }
}

fn engine(
    db: &Database,
    routes: Vec<Route>,
) -> MissionRerouteCoordinator<SqliteMissionStore, ConstantProvider> {
    MissionRerouteCoordinator::new(
        SqliteMissionStore::new(db.pool().clone()),
        ReroutingOrchestrator::new(Arc::new(ConstantProvider { routes })),
    )
}

#[tokio::test]
async fn hazard_pass_replaces_segment_and_stamps_mission() {
    let db = init_database(":memory:", 1).await.unwrap();
    missions::upsert_mission(db.pool(), &blocked_mission("m-1"))
        .await
        .unwrap();
    let coordinator = engine(&db, vec![hazardous_route(), safe_route()]);

    let summary = coordinator.handle_hazard_reported(&hazard()).await.unwrap();
    assert_eq!((summary.affected, summary.rerouted, summary.failed), (1, 1, 0));

    let stored = missions::load_mission(db.pool(), "m-1")
        .await
        .unwrap()
        .unwrap();
    let segment = &stored.segments[0];
    assert!(segment.rerouted);
    assert_eq!(segment.geometry, safe_route().geometry);
    assert_eq!(segment.original_distance_m, Some(8000.0));
    assert_eq!(segment.original_duration_s, Some(600.0));
    assert_eq!(stored.last_rerouted_reason.as_deref(), Some("road hazard hz-1"));
    assert!(stored.last_rerouted_at.is_some());
}

#[tokio::test]
async fn unroutable_segment_keeps_geometry_and_is_flagged() {
    let db = init_database(":memory:", 1).await.unwrap();
    missions::upsert_mission(db.pool(), &blocked_mission("m-1"))
        .await
        .unwrap();
    // The provider only ever answers with routes through the hazard.
    let coordinator = engine(&db, vec![hazardous_route()]);

    let summary = coordinator.handle_hazard_reported(&hazard()).await.unwrap();
    assert_eq!((summary.affected, summary.rerouted, summary.failed), (1, 0, 1));

    let stored = missions::load_mission(db.pool(), "m-1")
        .await
        .unwrap()
        .unwrap();
    let segment = &stored.segments[0];
    assert!(!segment.rerouted);
    assert_eq!(segment.geometry, blocked_mission("m-1").segments[0].geometry);
    assert!(segment.reroute_warning.is_some());
}

#[tokio::test]
async fn clear_mission_is_left_unstamped() {
    let db = init_database(":memory:", 1).await.unwrap();
    let mut mission = blocked_mission("m-1");
    mission.segments[0].geometry = vec![pt(18.60, 73.90), pt(18.65, 73.95)];
    missions::upsert_mission(db.pool(), &mission).await.unwrap();
    let coordinator = engine(&db, vec![safe_route()]);

    let summary = coordinator.handle_hazard_reported(&hazard()).await.unwrap();
    assert_eq!(summary, Default::default());

    let stored = missions::load_mission(db.pool(), "m-1")
        .await
        .unwrap()
        .unwrap();
    assert!(stored.last_rerouted_at.is_none());
    assert!(!stored.segments[0].rerouted);
}

#[tokio::test]
async fn watcher_loop_claims_and_settles_pending_reports() {
    let db = init_database(":memory:", 1).await.unwrap();
    missions::upsert_mission(db.pool(), &blocked_mission("m-1"))
        .await
        .unwrap();
    // Radius omitted: the configured default must apply.
    hazards::insert_hazard(
        db.pool(),
        &hazards::HazardReport {
            id: "hz-1".to_string(),
            location: pt(18.52, 73.82),
            radius_m: None,
            description: Some("bridge flooded".to_string()),
            status: hazards::HazardStatus::Pending,
            reported_at: Utc::now(),
        },
    )
    .await
    .unwrap();

    let coordinator = Arc::new(engine(&db, vec![safe_route()]));
    let config = Config {
        db_path: ":memory:".to_string(),
        osrm_url: "http://localhost:5000".to_string(),
        poll_interval_secs: 1,
        default_hazard_radius_m: 100.0,
    };
    let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);
    let watcher = tokio::spawn(hazard_loop::run_hazard_loop(
        db.clone(),
        coordinator,
        config,
        shutdown_rx,
    ));

    // The first tick fires immediately; give the pass a moment to land.
    let mut status = String::new();
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let row: (String,) =
            sqlx::query_as("SELECT status FROM road_hazards WHERE id = 'hz-1'")
                .fetch_one(db.pool())
                .await
                .unwrap();
        status = row.0;
        if status == "Processed" {
            break;
        }
    }
    let _ = shutdown_tx.send(());
    let _ = watcher.await;

    assert_eq!(status, "Processed");
    let row: (i64, i64, i64) =
        sqlx::query_as("SELECT affected, rerouted, failed FROM road_hazards WHERE id = 'hz-1'")
            .fetch_one(db.pool())
            .await
            .unwrap();
    assert_eq!(row, (1, 1, 0));

    let stored = missions::load_mission(db.pool(), "m-1")
        .await
        .unwrap()
        .unwrap();
    assert!(stored.segments[0].rerouted);
}
