//! Mission persistence operations.

use crate::coordinator::MissionStore;
use aegis_core::models::{Mission, MissionRouteSegment, MissionStatus, Station};
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

/// Upsert a mission into the database.
pub async fn upsert_mission(pool: &SqlitePool, mission: &Mission) -> Result<()> {
    let segments_json = serde_json::to_string(&mission.segments)?;
    let station_json = match &mission.station {
        Some(station) => Some(serde_json::to_string(station)?),
        None => None,
    };
    let status = format!("{:?}", mission.status);

    sqlx::query(
        r#"
        INSERT INTO missions (
            id, status, segments, station,
            last_rerouted_at, last_rerouted_reason, created_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(id) DO UPDATE SET
            status = ?2, segments = ?3, station = ?4,
            last_rerouted_at = ?5, last_rerouted_reason = ?6
        "#,
    )
    .bind(&mission.id)
    .bind(&status)
    .bind(&segments_json)
    .bind(&station_json)
    .bind(mission.last_rerouted_at.map(|t| t.to_rfc3339()))
    .bind(&mission.last_rerouted_reason)
    .bind(mission.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Load all missions currently marked Active.
pub async fn load_active_missions(pool: &SqlitePool) -> Result<Vec<Mission>> {
    let rows = sqlx::query_as::<_, MissionRow>(
        "SELECT id, status, segments, station, last_rerouted_at, last_rerouted_reason, created_at FROM missions WHERE status = 'Active'",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(|r| r.try_into()).collect()
}

/// Load a single mission by ID.
pub async fn load_mission(pool: &SqlitePool, mission_id: &str) -> Result<Option<Mission>> {
    let row = sqlx::query_as::<_, MissionRow>(
        "SELECT id, status, segments, station, last_rerouted_at, last_rerouted_reason, created_at FROM missions WHERE id = ?1",
    )
    .bind(mission_id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(r) => Ok(Some(r.try_into()?)),
        None => Ok(None),
    }
}

/// Replace one mission's segment list and reroute stamp. Targeted single-row
/// update; returns false when the mission no longer exists.
pub async fn update_mission_routes(
    pool: &SqlitePool,
    mission_id: &str,
    segments: &[MissionRouteSegment],
    rerouted_at: DateTime<Utc>,
    reason: &str,
) -> Result<bool> {
    let segments_json = serde_json::to_string(segments)?;
    let result = sqlx::query(
        "UPDATE missions SET segments = ?2, last_rerouted_at = ?3, last_rerouted_reason = ?4 WHERE id = ?1",
    )
    .bind(mission_id)
    .bind(&segments_json)
    .bind(rerouted_at.to_rfc3339())
    .bind(reason)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// `MissionStore` backed by the SQLite pool.
#[derive(Clone)]
pub struct SqliteMissionStore {
    pool: SqlitePool,
}

impl SqliteMissionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl MissionStore for SqliteMissionStore {
    async fn find_active(&self) -> Result<Vec<Mission>> {
        load_active_missions(&self.pool).await
    }

    async fn update_mission_routes(
        &self,
        mission_id: &str,
        segments: &[MissionRouteSegment],
        rerouted_at: DateTime<Utc>,
        reason: &str,
    ) -> Result<()> {
        let updated =
            update_mission_routes(&self.pool, mission_id, segments, rerouted_at, reason).await?;
        if !updated {
            anyhow::bail!("mission {} not found", mission_id);
        }
        Ok(())
    }
}

// Internal row type for SQLx
#[derive(sqlx::FromRow)]
struct MissionRow {
    id: String,
    status: String,
    segments: String,
    station: Option<String>,
    last_rerouted_at: Option<String>,
    last_rerouted_reason: Option<String>,
    created_at: String,
}

impl TryFrom<MissionRow> for Mission {
    type Error = anyhow::Error;

    fn try_from(row: MissionRow) -> Result<Self> {
        let status = match row.status.as_str() {
            "Active" => MissionStatus::Active,
            "Completed" => MissionStatus::Completed,
            "Cancelled" => MissionStatus::Cancelled,
            _ => MissionStatus::Active,
        };

        let segments: Vec<MissionRouteSegment> = serde_json::from_str(&row.segments)?;
        let station: Option<Station> = match row.station {
            Some(raw) => Some(serde_json::from_str(&raw)?),
            None => None,
        };

        let last_rerouted_at = row
            .last_rerouted_at
            .as_ref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        let created_at = DateTime::parse_from_rfc3339(&row.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(Mission {
            id: row.id,
            status,
            segments,
            station,
            last_rerouted_at,
            last_rerouted_reason: row.last_rerouted_reason,
            created_at,
        })
    }
}
