//! Routing-provider seam.

use crate::models::{GeoPoint, Route, RouteOptions};
use std::future::Future;
use thiserror::Error;

/// Failures talking to the external directions provider.
///
/// All of these are recoverable: callers either degrade to a straight-line
/// fallback or escalate to the next reroute stage. None abort a hazard pass.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider request timed out")]
    Timeout,
    #[error("provider rate limit hit")]
    RateLimited,
    #[error("provider returned HTTP {0}")]
    Status(u16),
    #[error("network error: {0}")]
    Network(String),
    #[error("malformed provider response: {0}")]
    Malformed(String),
}

/// A turn-by-turn directions source.
pub trait RouteProvider: Send + Sync {
    /// Fetch routes through at least two waypoints, sorted ascending by
    /// duration (ties broken by distance, then discovery order).
    ///
    /// A provider "no route" answer is `Ok` with an empty vec, not an error.
    fn fetch_routes(
        &self,
        waypoints: &[GeoPoint],
        options: &RouteOptions,
    ) -> impl Future<Output = Result<Vec<Route>, ProviderError>> + Send;
}
