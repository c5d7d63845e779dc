//! Project persistence

use accredify_common::time::{from_db_timestamp, to_db_timestamp};
use accredify_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use super::parse_uuid;
use crate::models::{Project, UserId};

/// Insert a project together with its member set
pub async fn create(conn: &mut SqliteConnection, project: &Project) -> Result<()> {
    if project.name.trim().is_empty() {
        return Err(Error::Validation("Project name must not be empty".to_string()));
    }

    sqlx::query(
        r#"
        INSERT INTO projects (id, name, description, owner_id, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(project.id.to_string())
    .bind(&project.name)
    .bind(&project.description)
    .bind(project.owner.map(|o| o.to_string()))
    .bind(to_db_timestamp(&project.created_at))
    .execute(&mut *conn)
    .await?;

    for member in &project.members {
        add_member(conn, project.id, *member).await?;
    }

    tracing::info!(project_id = %project.id, name = %project.name, "Created project");
    Ok(())
}

fn project_from_row(row: &SqliteRow) -> Result<Project> {
    let id: String = row.try_get("id")?;
    let owner: Option<String> = row.try_get("owner_id")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(Project {
        id: parse_uuid(&id)?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        owner: owner.as_deref().map(parse_uuid).transpose()?.map(UserId),
        members: Vec::new(),
        created_at: from_db_timestamp(&created_at)?,
    })
}

async fn attach_members(conn: &mut SqliteConnection, project: &mut Project) -> Result<()> {
    project.members = members(conn, project.id).await?;
    Ok(())
}

/// Load a project by id; `None` if absent
pub async fn load(conn: &mut SqliteConnection, project_id: Uuid) -> Result<Option<Project>> {
    let row = sqlx::query("SELECT * FROM projects WHERE id = ?")
        .bind(project_id.to_string())
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => {
            let mut project = project_from_row(&row)?;
            attach_members(conn, &mut project).await?;
            Ok(Some(project))
        }
        None => Ok(None),
    }
}

/// Load a project by id, failing with `NotFound` if absent
pub async fn require(conn: &mut SqliteConnection, project_id: Uuid) -> Result<Project> {
    load(conn, project_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Project {} not found", project_id)))
}

/// Oldest project with exactly this name
pub async fn find_by_name(conn: &mut SqliteConnection, name: &str) -> Result<Option<Project>> {
    let row = sqlx::query("SELECT * FROM projects WHERE name = ? ORDER BY created_at ASC LIMIT 1")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => {
            let mut project = project_from_row(&row)?;
            attach_members(conn, &mut project).await?;
            Ok(Some(project))
        }
        None => Ok(None),
    }
}

/// Find a project by name or create it
///
/// An existing project whose description differs from a non-empty
/// `description` gets the new description.
pub async fn get_or_create(
    conn: &mut SqliteConnection,
    name: &str,
    description: &str,
) -> Result<Project> {
    if let Some(mut project) = find_by_name(conn, name).await? {
        if !description.is_empty() && project.description != description {
            sqlx::query("UPDATE projects SET description = ? WHERE id = ?")
                .bind(description)
                .bind(project.id.to_string())
                .execute(&mut *conn)
                .await?;
            project.description = description.to_string();
            tracing::info!(project_id = %project.id, "Updated project description");
        }
        return Ok(project);
    }

    let project = Project::new(name, description);
    create(conn, &project).await?;
    Ok(project)
}

/// All projects, newest first
pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<Project>> {
    let rows = sqlx::query("SELECT * FROM projects ORDER BY created_at DESC, name ASC")
        .fetch_all(&mut *conn)
        .await?;

    let mut projects = rows.iter().map(project_from_row).collect::<Result<Vec<_>>>()?;
    for project in &mut projects {
        attach_members(conn, project).await?;
    }
    Ok(projects)
}

pub async fn add_member(conn: &mut SqliteConnection, project_id: Uuid, user: UserId) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO project_members (project_id, user_id) VALUES (?, ?)")
        .bind(project_id.to_string())
        .bind(user.to_string())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn members(conn: &mut SqliteConnection, project_id: Uuid) -> Result<Vec<UserId>> {
    let ids: Vec<String> =
        sqlx::query_scalar("SELECT user_id FROM project_members WHERE project_id = ? ORDER BY user_id")
            .bind(project_id.to_string())
            .fetch_all(&mut *conn)
            .await?;

    ids.iter().map(|id| parse_uuid(id).map(UserId)).collect()
}

/// Delete a project; indicators and their evidence cascade
///
/// Returns false if no such project existed.
pub async fn delete(conn: &mut SqliteConnection, project_id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM projects WHERE id = ?")
        .bind(project_id.to_string())
        .execute(&mut *conn)
        .await?;

    let deleted = result.rows_affected() > 0;
    if deleted {
        tracing::info!(project_id = %project_id, "Deleted project");
    }
    Ok(deleted)
}
