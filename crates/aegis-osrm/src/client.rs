//! OSRM route service HTTP client.
//!
//! The wire format ([lon, lat] pairs, GeoJSON geometries) stays inside this
//! module; everything else speaks `GeoPoint`.

use crate::cache::{signature, RouteCache};
use aegis_core::geo::haversine_distance;
use aegis_core::models::{GeoPoint, Route, RouteOptions};
use aegis_core::provider::{ProviderError, RouteProvider};
use serde::Deserialize;
use std::cmp::Ordering;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

/// Assumed average speed for synthesized fallback routes (~50 km/h).
const FALLBACK_SPEED_MPS: f64 = 13.89;

#[derive(Debug, Clone)]
pub struct OsrmConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            timeout_secs: 10,
        }
    }
}

/// HTTP client for an OSRM-compatible route service.
pub struct OsrmClient {
    client: reqwest::Client,
    base_url: String,
    cache: Arc<RouteCache>,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig, cache: Arc<RouteCache>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: config.base_url,
            cache,
        }
    }

    /// Route through the given waypoints, serving repeats from the cache.
    ///
    /// Provider failures and "no route" answers degrade to a straight-line
    /// estimate flagged `is_fallback`. Fallbacks are never cached, so the
    /// next identical query retries the provider. This never fails: mission
    /// dispatch must not block on provider availability.
    pub async fn fetch_single_route(&self, waypoints: &[GeoPoint], options: &RouteOptions) -> Route {
        let key = signature(&options.profile, waypoints);
        if let Some(route) = self.cache.get(&key) {
            tracing::debug!(key = %key, "route cache hit");
            return route;
        }

        match self.fetch_routes(waypoints, options).await {
            Ok(routes) => match routes.into_iter().next() {
                Some(fastest) => {
                    self.cache.put(&key, fastest.clone());
                    fastest
                }
                None => {
                    tracing::warn!(key = %key, "provider found no route, using straight-line fallback");
                    fallback_route(waypoints)
                }
            },
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "provider unavailable, using straight-line fallback");
                fallback_route(waypoints)
            }
        }
    }

    fn route_url(&self, waypoints: &[GeoPoint], options: &RouteOptions) -> String {
        let mut coords = String::new();
        for (i, point) in waypoints.iter().enumerate() {
            if i > 0 {
                coords.push(';');
            }
            let _ = write!(coords, "{:.6},{:.6}", point.lon, point.lat);
        }
        format!(
            "{}/route/v1/{}/{}?alternatives={}&geometries=geojson&overview=full",
            self.base_url, options.profile, coords, options.alternatives
        )
    }
}

impl RouteProvider for OsrmClient {
    async fn fetch_routes(
        &self,
        waypoints: &[GeoPoint],
        options: &RouteOptions,
    ) -> Result<Vec<Route>, ProviderError> {
        let url = self.route_url(waypoints, options);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ProviderError::RateLimited);
        }
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let payload: OsrmRouteResponse = response
            .json()
            .await
            .map_err(|err| ProviderError::Malformed(err.to_string()))?;

        Ok(routes_from_response(payload))
    }
}

/// Straight-line route through the waypoints at an assumed average speed.
pub fn fallback_route(waypoints: &[GeoPoint]) -> Route {
    let distance_m: f64 = waypoints
        .windows(2)
        .map(|leg| haversine_distance(leg[0], leg[1]))
        .sum();
    Route {
        geometry: waypoints.to_vec(),
        distance_m,
        duration_s: distance_m / FALLBACK_SPEED_MPS,
        is_fallback: true,
    }
}

fn classify_transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Network(err.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct OsrmRouteResponse {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: OsrmGeometry,
    distance: f64,
    duration: f64,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<[f64; 2]>,
}

/// Normalize a provider payload: a non-"Ok" code is "no route", geometries
/// flip to lat/lon order, and results are ranked ascending by duration.
/// Routes with degenerate geometry (under two points) are dropped.
fn routes_from_response(payload: OsrmRouteResponse) -> Vec<Route> {
    if payload.code != "Ok" {
        return Vec::new();
    }
    let mut routes: Vec<Route> = payload
        .routes
        .into_iter()
        .filter_map(|raw| {
            if raw.geometry.coordinates.len() < 2 {
                return None;
            }
            Some(Route {
                geometry: raw
                    .geometry
                    .coordinates
                    .iter()
                    .map(|&[lon, lat]| GeoPoint { lat, lon })
                    .collect(),
                distance_m: raw.distance,
                duration_s: raw.duration,
                is_fallback: false,
            })
        })
        .collect();
    rank_routes(&mut routes);
    routes
}

/// Ascending duration, ties broken by distance. The sort is stable, so full
/// ties keep discovery order.
fn rank_routes(routes: &mut [Route]) {
    routes.sort_by(|a, b| {
        a.duration_s
            .partial_cmp(&b.duration_s)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                a.distance_m
                    .partial_cmp(&b.distance_m)
                    .unwrap_or(Ordering::Equal)
            })
    });
}
