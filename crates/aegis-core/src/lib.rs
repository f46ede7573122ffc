pub mod detour;
pub mod geo;
pub mod models;
pub mod provider;
pub mod proximity;

pub use detour::{detour_waypoints, FAR_OFFSET_M, NEAR_OFFSET_M};
pub use geo::{bearing_degrees, haversine_distance, translate};
pub use models::{
    GeoPoint, HazardPoint, Mission, MissionRouteSegment, MissionStatus, RerouteSummary, Route,
    RouteOptions, Station,
};
pub use provider::{ProviderError, RouteProvider};
pub use proximity::is_near;
