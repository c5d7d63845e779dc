//! Database initialization
//!
//! Opens (or creates) the SQLite database and brings the schema up to date.
//! Every statement is idempotent, so calling [`init_database`] on an existing
//! database is safe.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Current schema version
///
/// Increment when the table definitions below change.
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// Busy timeout applied to every connection (ms)
const BUSY_TIMEOUT_MS: u32 = 5000;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        // Pragmas are per-connection; foreign keys must be on for every one
        // of them or cascades silently stop working.
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA foreign_keys = ON")
                    .execute(&mut *conn)
                    .await?;
                sqlx::query(&format!("PRAGMA busy_timeout = {}", BUSY_TIMEOUT_MS))
                    .execute(&mut *conn)
                    .await?;
                Ok(())
            })
        })
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL allows readers alongside the single writer
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_projects_table(pool).await?;
    create_project_members_table(pool).await?;
    create_indicators_table(pool).await?;
    create_evidence_table(pool).await?;

    if get_schema_version(pool).await? < CURRENT_SCHEMA_VERSION {
        set_schema_version(pool, CURRENT_SCHEMA_VERSION).await?;
        info!("Schema version set to {}", CURRENT_SCHEMA_VERSION);
    }

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Latest recorded schema version, 0 for a fresh database
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i64> {
    let version: Option<i64> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i64) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_projects_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            owner_id TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_projects_name ON projects(name)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_project_members_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS project_members (
            project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
            user_id TEXT NOT NULL,
            PRIMARY KEY (project_id, user_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_indicators_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS indicators (
            id TEXT PRIMARY KEY,
            project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
            section TEXT NOT NULL,
            standard TEXT NOT NULL,
            indicator TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            score INTEGER NOT NULL DEFAULT 10,
            responsible_person TEXT,
            assignee TEXT,
            frequency TEXT,
            status TEXT NOT NULL DEFAULT 'Not Started',
            notes TEXT,
            last_updated TEXT,
            evidence_type TEXT NOT NULL DEFAULT 'text',
            schedule_type TEXT NOT NULL DEFAULT 'one_time',
            next_due_date TEXT,
            indicator_key TEXT UNIQUE,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_indicators_project ON indicators(project_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_indicators_status ON indicators(status)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_evidence_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS evidence (
            id TEXT PRIMARY KEY,
            indicator_id TEXT NOT NULL REFERENCES indicators(id) ON DELETE CASCADE,
            kind TEXT NOT NULL,
            file_name TEXT,
            file_url TEXT,
            content TEXT,
            drive_file_id TEXT,
            drive_view_link TEXT,
            drive_name TEXT,
            drive_mime_type TEXT,
            drive_web_view_link TEXT,
            drive_parent_folder_id TEXT,
            file_size TEXT,
            date_uploaded TEXT NOT NULL,
            review_state TEXT NOT NULL DEFAULT 'draft',
            review_reason TEXT,
            reviewed_by TEXT,
            reviewed_at TEXT,
            CHECK (review_state IN ('draft', 'under_review', 'accepted', 'rejected')),
            CHECK (review_state <> 'rejected'
                   OR (review_reason IS NOT NULL AND length(trim(review_reason)) > 0)),
            CHECK (review_state NOT IN ('accepted', 'rejected')
                   OR (reviewed_by IS NOT NULL AND reviewed_at IS NOT NULL))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_evidence_indicator ON evidence(indicator_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_evidence_review_state ON evidence(review_state)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_evidence_drive_file ON evidence(drive_file_id)")
        .execute(pool)
        .await?;

    Ok(())
}
