//! Indicator persistence

use accredify_common::time::{from_db_date, from_db_timestamp, to_db_date, to_db_timestamp};
use accredify_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use super::parse_uuid;
use crate::models::{ComplianceStatus, Frequency, Indicator, IndicatorEvidenceType, ScheduleType};

/// Insert a new indicator
///
/// A missing `indicator_key` is computed from the indicator's own fields
/// before writing; the stored key is written back into `indicator`.
pub async fn insert(conn: &mut SqliteConnection, indicator: &mut Indicator) -> Result<()> {
    indicator.ensure_key();

    sqlx::query(
        r#"
        INSERT INTO indicators (
            id, project_id, section, standard, indicator, description, score,
            responsible_person, assignee, frequency, status, notes, last_updated,
            evidence_type, schedule_type, next_due_date, indicator_key, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(indicator.id.to_string())
    .bind(indicator.project_id.to_string())
    .bind(&indicator.section)
    .bind(&indicator.standard)
    .bind(&indicator.indicator)
    .bind(&indicator.description)
    .bind(indicator.score)
    .bind(&indicator.responsible_person)
    .bind(&indicator.assignee)
    .bind(indicator.frequency.map(|f| f.as_str()))
    .bind(indicator.status.as_str())
    .bind(&indicator.notes)
    .bind(indicator.last_updated.as_ref().map(to_db_timestamp))
    .bind(indicator.evidence_type.as_str())
    .bind(indicator.schedule_type.as_str())
    .bind(indicator.next_due_date.as_ref().map(to_db_date))
    .bind(&indicator.indicator_key)
    .bind(to_db_timestamp(&indicator.created_at))
    .execute(conn)
    .await?;

    tracing::debug!(indicator_id = %indicator.id, project_id = %indicator.project_id, "Inserted indicator");
    Ok(())
}

/// Write every mutable field of an existing indicator
///
/// `indicator_key` is only written when the stored key is still NULL, so a
/// key never changes once set.
pub async fn update(conn: &mut SqliteConnection, indicator: &Indicator) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE indicators SET
            section = ?, standard = ?, indicator = ?, description = ?, score = ?,
            responsible_person = ?, assignee = ?, frequency = ?, status = ?, notes = ?,
            last_updated = ?, evidence_type = ?, schedule_type = ?, next_due_date = ?,
            indicator_key = COALESCE(indicator_key, ?)
        WHERE id = ?
        "#,
    )
    .bind(&indicator.section)
    .bind(&indicator.standard)
    .bind(&indicator.indicator)
    .bind(&indicator.description)
    .bind(indicator.score)
    .bind(&indicator.responsible_person)
    .bind(&indicator.assignee)
    .bind(indicator.frequency.map(|f| f.as_str()))
    .bind(indicator.status.as_str())
    .bind(&indicator.notes)
    .bind(indicator.last_updated.as_ref().map(to_db_timestamp))
    .bind(indicator.evidence_type.as_str())
    .bind(indicator.schedule_type.as_str())
    .bind(indicator.next_due_date.as_ref().map(to_db_date))
    .bind(&indicator.indicator_key)
    .bind(indicator.id.to_string())
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Indicator {} not found", indicator.id)));
    }
    Ok(())
}

fn indicator_from_row(row: &SqliteRow) -> Result<Indicator> {
    let id: String = row.try_get("id")?;
    let project_id: String = row.try_get("project_id")?;
    let frequency: Option<String> = row.try_get("frequency")?;
    let status: String = row.try_get("status")?;
    let last_updated: Option<String> = row.try_get("last_updated")?;
    let evidence_type: String = row.try_get("evidence_type")?;
    let schedule_type: String = row.try_get("schedule_type")?;
    let next_due_date: Option<String> = row.try_get("next_due_date")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(Indicator {
        id: parse_uuid(&id)?,
        project_id: parse_uuid(&project_id)?,
        section: row.try_get("section")?,
        standard: row.try_get("standard")?,
        indicator: row.try_get("indicator")?,
        description: row.try_get("description")?,
        score: row.try_get("score")?,
        responsible_person: row.try_get("responsible_person")?,
        assignee: row.try_get("assignee")?,
        frequency: frequency.as_deref().map(Frequency::from_db).transpose()?,
        status: ComplianceStatus::from_db(&status)?,
        notes: row.try_get("notes")?,
        last_updated: last_updated.as_deref().map(from_db_timestamp).transpose()?,
        evidence_type: IndicatorEvidenceType::from_db(&evidence_type)?,
        schedule_type: ScheduleType::from_db(&schedule_type)?,
        next_due_date: next_due_date.as_deref().map(from_db_date).transpose()?,
        indicator_key: row.try_get("indicator_key")?,
        created_at: from_db_timestamp(&created_at)?,
    })
}

/// Load an indicator by id; `None` if absent
pub async fn load(conn: &mut SqliteConnection, indicator_id: Uuid) -> Result<Option<Indicator>> {
    let row = sqlx::query("SELECT * FROM indicators WHERE id = ?")
        .bind(indicator_id.to_string())
        .fetch_optional(conn)
        .await?;

    row.as_ref().map(indicator_from_row).transpose()
}

/// Load an indicator by id, failing with `NotFound` if absent
pub async fn require(conn: &mut SqliteConnection, indicator_id: Uuid) -> Result<Indicator> {
    load(conn, indicator_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Indicator {} not found", indicator_id)))
}

/// Look up an indicator by its idempotency key
pub async fn find_by_key(conn: &mut SqliteConnection, key: &str) -> Result<Option<Indicator>> {
    let row = sqlx::query("SELECT * FROM indicators WHERE indicator_key = ?")
        .bind(key)
        .fetch_optional(conn)
        .await?;

    row.as_ref().map(indicator_from_row).transpose()
}

/// Indicators of a project in checklist order
pub async fn list_for_project(conn: &mut SqliteConnection, project_id: Uuid) -> Result<Vec<Indicator>> {
    let rows = sqlx::query(
        "SELECT * FROM indicators WHERE project_id = ? ORDER BY section, standard, created_at, indicator",
    )
    .bind(project_id.to_string())
    .fetch_all(conn)
    .await?;

    rows.iter().map(indicator_from_row).collect()
}

pub async fn count_for_project(conn: &mut SqliteConnection, project_id: Uuid) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM indicators WHERE project_id = ?")
        .bind(project_id.to_string())
        .fetch_one(conn)
        .await?;
    Ok(count)
}
