//! Persistence layer for the rerouting engine.
//!
//! SQLite-backed storage for missions and road-hazard reports. All updates
//! are targeted per row; the engine never rewrites whole tables.

pub mod db;
pub mod hazards;
pub mod missions;

pub use db::{init_database, Database};
pub use missions::SqliteMissionStore;
