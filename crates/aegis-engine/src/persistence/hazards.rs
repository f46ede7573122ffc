//! Road-hazard report persistence.
//!
//! Reports arrive from the hazard-reporting subsystem in `Pending` status.
//! The watcher loop claims one at a time with a status-guarded update, so
//! concurrent engine instances never process the same report twice.

use aegis_core::models::{GeoPoint, RerouteSummary};
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

#[derive(Debug, Clone)]
pub struct HazardReport {
    pub id: String,
    pub location: GeoPoint,
    /// Clearance radius; reports may omit it, in which case the engine's
    /// configured default applies.
    pub radius_m: Option<f64>,
    pub description: Option<String>,
    pub status: HazardStatus,
    pub reported_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HazardStatus {
    Pending,
    Processing,
    Processed,
    Error,
}

/// Insert a new hazard report in `Pending` status.
pub async fn insert_hazard(pool: &SqlitePool, report: &HazardReport) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO road_hazards (id, lat, lon, radius_m, description, status, reported_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&report.id)
    .bind(report.location.lat)
    .bind(report.location.lon)
    .bind(report.radius_m)
    .bind(&report.description)
    .bind(status_str(report.status))
    .bind(report.reported_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Claim the oldest pending report, if any.
///
/// The claim is a status-guarded update: if another worker grabbed the row
/// between the select and the update, zero rows change and this returns
/// None instead of double-processing.
pub async fn claim_pending_hazard(pool: &SqlitePool) -> Result<Option<HazardReport>> {
    let row = sqlx::query_as::<_, HazardRow>(
        "SELECT id, lat, lon, radius_m, description, status, reported_at FROM road_hazards WHERE status = 'Pending' ORDER BY reported_at LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let claimed =
        sqlx::query("UPDATE road_hazards SET status = 'Processing' WHERE id = ?1 AND status = 'Pending'")
            .bind(&row.id)
            .execute(pool)
            .await?;
    if claimed.rows_affected() == 0 {
        return Ok(None);
    }

    let mut report: HazardReport = row.try_into()?;
    report.status = HazardStatus::Processing;
    Ok(Some(report))
}

/// Record a completed reroute pass on the claimed report.
pub async fn mark_processed(
    pool: &SqlitePool,
    hazard_id: &str,
    summary: &RerouteSummary,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE road_hazards
        SET status = 'Processed', affected = ?2, rerouted = ?3, failed = ?4, processed_at = ?5
        WHERE id = ?1
        "#,
    )
    .bind(hazard_id)
    .bind(summary.affected as i64)
    .bind(summary.rerouted as i64)
    .bind(summary.failed as i64)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Record a failed reroute pass; the report keeps its data for inspection.
pub async fn mark_error(pool: &SqlitePool, hazard_id: &str, message: &str) -> Result<()> {
    sqlx::query(
        "UPDATE road_hazards SET status = 'Error', error_message = ?2, processed_at = ?3 WHERE id = ?1",
    )
    .bind(hazard_id)
    .bind(message)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

fn status_str(status: HazardStatus) -> &'static str {
    match status {
        HazardStatus::Pending => "Pending",
        HazardStatus::Processing => "Processing",
        HazardStatus::Processed => "Processed",
        HazardStatus::Error => "Error",
    }
}

// Internal row type for SQLx
#[derive(sqlx::FromRow)]
struct HazardRow {
    id: String,
    lat: f64,
    lon: f64,
    radius_m: Option<f64>,
    description: Option<String>,
    status: String,
    reported_at: String,
}

impl TryFrom<HazardRow> for HazardReport {
    type Error = anyhow::Error;

    fn try_from(row: HazardRow) -> Result<Self> {
        let status = match row.status.as_str() {
            "Processing" => HazardStatus::Processing,
            "Processed" => HazardStatus::Processed,
            "Error" => HazardStatus::Error,
            _ => HazardStatus::Pending,
        };

        let reported_at = DateTime::parse_from_rfc3339(&row.reported_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(HazardReport {
            id: row.id,
            location: GeoPoint::new(row.lat, row.lon),
            radius_m: row.radius_m,
            description: row.description,
            status,
            reported_at,
        })
    }
}
