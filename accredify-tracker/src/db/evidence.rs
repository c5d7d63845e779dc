//! Evidence persistence

use accredify_common::time::{from_db_timestamp, to_db_timestamp};
use accredify_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use super::parse_uuid;
use crate::models::{DriveLink, Evidence, EvidenceKind, ReviewState, UserId};

pub async fn insert(conn: &mut SqliteConnection, evidence: &Evidence) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO evidence (
            id, indicator_id, kind, file_name, file_url, content,
            drive_file_id, drive_view_link, drive_name, drive_mime_type,
            drive_web_view_link, drive_parent_folder_id, file_size, date_uploaded,
            review_state, review_reason, reviewed_by, reviewed_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(evidence.id.to_string())
    .bind(evidence.indicator_id.to_string())
    .bind(evidence.kind.as_str())
    .bind(&evidence.file_name)
    .bind(&evidence.file_url)
    .bind(&evidence.content)
    .bind(&evidence.drive.file_id)
    .bind(&evidence.drive.view_link)
    .bind(&evidence.drive.name)
    .bind(&evidence.drive.mime_type)
    .bind(&evidence.drive.web_view_link)
    .bind(&evidence.drive.parent_folder_id)
    .bind(&evidence.file_size)
    .bind(to_db_timestamp(&evidence.date_uploaded))
    .bind(evidence.review_state.as_str())
    .bind(&evidence.review_reason)
    .bind(evidence.reviewed_by.map(|u| u.to_string()))
    .bind(evidence.reviewed_at.as_ref().map(to_db_timestamp))
    .execute(conn)
    .await?;

    tracing::debug!(
        evidence_id = %evidence.id,
        indicator_id = %evidence.indicator_id,
        kind = evidence.kind.as_str(),
        "Inserted evidence"
    );
    Ok(())
}

fn evidence_from_row(row: &SqliteRow) -> Result<Evidence> {
    let id: String = row.try_get("id")?;
    let indicator_id: String = row.try_get("indicator_id")?;
    let kind: String = row.try_get("kind")?;
    let date_uploaded: String = row.try_get("date_uploaded")?;
    let review_state: String = row.try_get("review_state")?;
    let reviewed_by: Option<String> = row.try_get("reviewed_by")?;
    let reviewed_at: Option<String> = row.try_get("reviewed_at")?;

    Ok(Evidence {
        id: parse_uuid(&id)?,
        indicator_id: parse_uuid(&indicator_id)?,
        kind: EvidenceKind::from_db(&kind)?,
        file_name: row.try_get("file_name")?,
        file_url: row.try_get("file_url")?,
        content: row.try_get("content")?,
        drive: DriveLink {
            file_id: row.try_get("drive_file_id")?,
            view_link: row.try_get("drive_view_link")?,
            name: row.try_get("drive_name")?,
            mime_type: row.try_get("drive_mime_type")?,
            web_view_link: row.try_get("drive_web_view_link")?,
            parent_folder_id: row.try_get("drive_parent_folder_id")?,
        },
        file_size: row.try_get("file_size")?,
        date_uploaded: from_db_timestamp(&date_uploaded)?,
        review_state: ReviewState::from_db(&review_state)?,
        review_reason: row.try_get("review_reason")?,
        reviewed_by: reviewed_by.as_deref().map(parse_uuid).transpose()?.map(UserId),
        reviewed_at: reviewed_at.as_deref().map(from_db_timestamp).transpose()?,
    })
}

/// Load an evidence item by id; `None` if absent
pub async fn load(conn: &mut SqliteConnection, evidence_id: Uuid) -> Result<Option<Evidence>> {
    let row = sqlx::query("SELECT * FROM evidence WHERE id = ?")
        .bind(evidence_id.to_string())
        .fetch_optional(conn)
        .await?;

    row.as_ref().map(evidence_from_row).transpose()
}

/// Load an evidence item by id, failing with `NotFound` if absent
pub async fn require(conn: &mut SqliteConnection, evidence_id: Uuid) -> Result<Evidence> {
    load(conn, evidence_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Evidence {} not found", evidence_id)))
}

/// Live evidence snapshot of one indicator, oldest first
pub async fn list_for_indicator(conn: &mut SqliteConnection, indicator_id: Uuid) -> Result<Vec<Evidence>> {
    let rows = sqlx::query("SELECT * FROM evidence WHERE indicator_id = ? ORDER BY date_uploaded, id")
        .bind(indicator_id.to_string())
        .fetch_all(conn)
        .await?;

    rows.iter().map(evidence_from_row).collect()
}

/// Whether the indicator already has a note with exactly this content
pub async fn note_exists(conn: &mut SqliteConnection, indicator_id: Uuid, content: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM evidence WHERE indicator_id = ? AND kind = 'note' AND content = ?",
    )
    .bind(indicator_id.to_string())
    .bind(content)
    .fetch_one(conn)
    .await?;

    Ok(count > 0)
}

/// Persist a review transition, compare-and-set on the prior state
///
/// Writes `evidence`'s review fields only if the stored row is still in
/// `expected`. Returns false when another actor moved it first.
pub async fn update_review_state(
    conn: &mut SqliteConnection,
    evidence: &Evidence,
    expected: ReviewState,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE evidence
        SET review_state = ?, review_reason = ?, reviewed_by = ?, reviewed_at = ?
        WHERE id = ? AND review_state = ?
        "#,
    )
    .bind(evidence.review_state.as_str())
    .bind(&evidence.review_reason)
    .bind(evidence.reviewed_by.map(|u| u.to_string()))
    .bind(evidence.reviewed_at.as_ref().map(to_db_timestamp))
    .bind(evidence.id.to_string())
    .bind(expected.as_str())
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}
