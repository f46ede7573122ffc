//! Perpendicular detour waypoint generation.
//!
//! Deterministic and network-free: given a hazard sitting on a route, emit
//! candidate waypoints offset perpendicular to the local road direction so
//! the provider is forced to route around the obstruction.

use crate::geo::{bearing_degrees, haversine_distance, translate};
use crate::models::GeoPoint;

/// Offset for the first detour attempt.
pub const NEAR_OFFSET_M: f64 = 500.0;
/// Offset for the escalated detour attempt.
pub const FAR_OFFSET_M: f64 = 1000.0;

/// Two candidate waypoints perpendicular to the road at the hazard,
/// `offset_m` away on each side. Left (local bearing + 90°) comes first.
pub fn detour_waypoints(
    hazard: GeoPoint,
    route_geometry: &[GeoPoint],
    origin: GeoPoint,
    destination: GeoPoint,
    offset_m: f64,
) -> [GeoPoint; 2] {
    let local = local_bearing(hazard, route_geometry)
        .unwrap_or_else(|| bearing_degrees(origin, destination));
    let left = (local + 90.0) % 360.0;
    let right = (local + 270.0) % 360.0;
    [
        translate(hazard, offset_m, left),
        translate(hazard, offset_m, right),
    ]
}

/// Bearing of the road where it passes the hazard: the bearing between the
/// clamped immediate neighbors of the vertex nearest the hazard. None when
/// the geometry has fewer than two points.
fn local_bearing(hazard: GeoPoint, geometry: &[GeoPoint]) -> Option<f64> {
    if geometry.len() < 2 {
        return None;
    }
    let nearest = geometry
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            haversine_distance(hazard, **a)
                .partial_cmp(&haversine_distance(hazard, **b))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(index, _)| index)?;

    let prev = geometry[nearest.saturating_sub(1)];
    let next = geometry[(nearest + 1).min(geometry.len() - 1)];
    Some(bearing_degrees(prev, next))
}
