//! Test Helper Utilities
//!
//! Shared utilities for accredify-tracker integration tests

#![allow(dead_code)]

use accredify_tracker::db;
use accredify_tracker::models::{
    Evidence, EvidenceKind, Indicator, IndicatorEvidenceType, NewEvidence, Project, UserId,
};
use accredify_tracker::services::review_workflow;
use sqlx::SqlitePool;
use tempfile::TempDir;
use uuid::Uuid;

/// Full header row of a checklist export
pub const FULL_HEADER: &str = "Section,Standard,Indicator,Description,Evidence Required,Responsible Person,Frequency,Assigned to,Compliance Evidence,Score";

/// Create a temporary database with the full schema
///
/// The TempDir must be kept alive for the duration of the test.
pub async fn create_test_db() -> (TempDir, SqlitePool) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test_accredify.db");
    let pool = accredify_common::db::init_database(&db_path)
        .await
        .expect("Failed to initialize test database");
    (temp_dir, pool)
}

pub async fn create_project(pool: &SqlitePool, name: &str) -> Project {
    let project = Project::new(name, "test project");
    let mut conn = pool.acquire().await.unwrap();
    db::projects::create(&mut conn, &project).await.unwrap();
    project
}

pub async fn create_indicator(
    pool: &SqlitePool,
    project_id: Uuid,
    evidence_type: IndicatorEvidenceType,
) -> Indicator {
    let mut indicator = Indicator::new(project_id, "Safety", "S1", format!("Fire drill {}", Uuid::new_v4()));
    indicator.evidence_type = evidence_type;

    let mut conn = pool.acquire().await.unwrap();
    db::indicators::insert(&mut conn, &mut indicator).await.unwrap();
    indicator
}

pub async fn load_indicator(pool: &SqlitePool, indicator_id: Uuid) -> Indicator {
    let mut conn = pool.acquire().await.unwrap();
    db::indicators::require(&mut conn, indicator_id).await.unwrap()
}

pub async fn indicators_of(pool: &SqlitePool, project_id: Uuid) -> Vec<Indicator> {
    let mut conn = pool.acquire().await.unwrap();
    db::indicators::list_for_project(&mut conn, project_id).await.unwrap()
}

pub async fn evidence_of(pool: &SqlitePool, indicator_id: Uuid) -> Vec<Evidence> {
    let mut conn = pool.acquire().await.unwrap();
    db::evidence::list_for_indicator(&mut conn, indicator_id).await.unwrap()
}

pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .unwrap()
}

pub fn reviewer() -> UserId {
    UserId(Uuid::new_v4())
}

pub fn note(content: &str) -> NewEvidence {
    NewEvidence {
        kind: EvidenceKind::Note,
        file_name: Some("note".to_string()),
        file_url: None,
        content: Some(content.to_string()),
        drive: Default::default(),
        file_size: None,
    }
}

/// Add a note and drive it through submit + accept
pub async fn add_accepted_note(pool: &SqlitePool, indicator_id: Uuid, content: &str) -> Evidence {
    let evidence = review_workflow::add_evidence(pool, indicator_id, note(content)).await.unwrap();
    review_workflow::submit(pool, evidence.id).await.unwrap();
    review_workflow::accept(pool, evidence.id, reviewer()).await.unwrap()
}

/// CSV text from a header line and data lines
pub fn csv(header: &str, rows: &[&str]) -> String {
    let mut text = String::from(header);
    text.push('\n');
    for row in rows {
        text.push_str(row);
        text.push('\n');
    }
    text
}
