//! OSRM-compatible directions client for the rerouting engine.
//!
//! Owns the provider wire format, the straight-line fallback used when the
//! provider is unavailable, and the bounded TTL cache that shields the
//! provider from redundant load.

pub mod cache;
pub mod client;

pub use cache::{signature, Clock, RouteCache, SystemClock, DEFAULT_MAX_SIZE, DEFAULT_TTL};
pub use client::{fallback_route, OsrmClient, OsrmConfig};
