//! Core data models for the rerouting engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A WGS84 coordinate.
///
/// The single point representation used everywhere outside the provider
/// wire boundary (which speaks `[lon, lat]` pairs).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// A drivable route, either returned by the provider or synthesized as a
/// straight-line fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    /// Ordered vertices, at least two.
    pub geometry: Vec<GeoPoint>,
    pub distance_m: f64,
    pub duration_s: f64,
    /// True when the provider was unavailable and this is a synthesized
    /// straight-line estimate.
    #[serde(default)]
    pub is_fallback: bool,
}

/// A reported road obstruction with a clearance radius.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HazardPoint {
    pub id: String,
    pub location: GeoPoint,
    /// Clearance radius in meters, always positive.
    pub radius_m: f64,
}

/// Options for a provider route query.
#[derive(Debug, Clone)]
pub struct RouteOptions {
    pub profile: String,
    pub alternatives: bool,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            profile: "driving".to_string(),
            alternatives: false,
        }
    }
}

/// Dispatch station a mission departs from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    pub name: String,
    /// Station kind: police, hospital, fire, rescue.
    pub kind: String,
    pub location: GeoPoint,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissionStatus {
    #[default]
    Active,
    Completed,
    Cancelled,
}

/// One vehicle's route within a mission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionRouteSegment {
    pub vehicle_id: u32,
    pub geometry: Vec<GeoPoint>,
    pub distance_m: f64,
    pub duration_s: f64,
    #[serde(default)]
    pub rerouted: bool,
    #[serde(default)]
    pub rerouted_reason: Option<String>,
    #[serde(default)]
    pub rerouted_at: Option<DateTime<Utc>>,
    /// Pre-replacement distance, kept as provenance once a segment is
    /// swapped for a safe alternative.
    #[serde(default)]
    pub original_distance_m: Option<f64>,
    #[serde(default)]
    pub original_duration_s: Option<f64>,
    /// Set when no safe alternative exists and the segment stays on its
    /// original route.
    #[serde(default)]
    pub reroute_warning: Option<String>,
    #[serde(default)]
    pub reroute_checked_at: Option<DateTime<Utc>>,
}

impl MissionRouteSegment {
    pub fn origin(&self) -> Option<GeoPoint> {
        self.geometry.first().copied()
    }

    pub fn destination(&self) -> Option<GeoPoint> {
        self.geometry.last().copied()
    }

    /// Swap in a replacement route. The pre-replacement distance and
    /// duration are preserved the first time the segment is replaced.
    pub fn apply_replacement(&mut self, route: &Route, reason: &str, at: DateTime<Utc>) {
        if self.original_distance_m.is_none() {
            self.original_distance_m = Some(self.distance_m);
            self.original_duration_s = Some(self.duration_s);
        }
        self.geometry = route.geometry.clone();
        self.distance_m = route.distance_m;
        self.duration_s = route.duration_s;
        self.rerouted = true;
        self.rerouted_reason = Some(reason.to_string());
        self.rerouted_at = Some(at);
        self.reroute_warning = None;
    }
}

/// A dispatch mission holding one or more vehicle routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mission {
    pub id: String,
    pub status: MissionStatus,
    pub segments: Vec<MissionRouteSegment>,
    #[serde(default)]
    pub station: Option<Station>,
    #[serde(default)]
    pub last_rerouted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_rerouted_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Counters returned by one hazard pass over the active missions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RerouteSummary {
    /// Segments that passed within the hazard radius.
    pub affected: u32,
    /// Affected segments replaced with a safe alternative.
    pub rerouted: u32,
    /// Affected segments left on their original route with a warning.
    pub failed: u32,
}

impl RerouteSummary {
    pub fn merge(&mut self, other: RerouteSummary) {
        self.affected += other.affected;
        self.rerouted += other.rerouted;
        self.failed += other.failed;
    }
}
