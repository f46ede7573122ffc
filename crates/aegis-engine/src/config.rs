//! Engine configuration from environment.

use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub osrm_url: String,
    pub poll_interval_secs: u64,
    /// Clearance radius applied to hazard reports that omit one.
    pub default_hazard_radius_m: f64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            db_path: env::var("AEGIS_DB_PATH").unwrap_or_else(|_| "data/aegis.db".to_string()),
            osrm_url: env::var("AEGIS_OSRM_URL")
                .unwrap_or_else(|_| "http://localhost:5000".to_string()),
            poll_interval_secs: env::var("AEGIS_POLL_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            default_hazard_radius_m: env::var("AEGIS_HAZARD_RADIUS_M")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(100.0),
        }
    }
}
