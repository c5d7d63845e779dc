//! Project model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserId;

/// Accreditation project; owns indicators (cascade delete)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub owner: Option<UserId>,
    #[serde(default)]
    pub members: Vec<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Project {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            owner: None,
            members: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

/// Request body for creating a project
#[derive(Debug, Clone, Deserialize)]
pub struct NewProject {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub owner: Option<UserId>,
    #[serde(default)]
    pub members: Vec<UserId>,
}

impl NewProject {
    pub fn into_project(self) -> Project {
        let mut project = Project::new(self.name.trim(), self.description);
        project.owner = self.owner;
        project.members = self.members;
        project
    }
}
