//! Evidence model and review state machine
//!
//! Review lifecycle:
//! `draft --submit--> under_review --accept--> accepted`,
//! `under_review --reject--> rejected`, `draft --reject--> rejected`.
//! `accepted` and `rejected` are terminal; re-review needs new evidence.

use accredify_common::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque reference to the acting user
///
/// The core never inspects roles; authorization happens upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceKind {
    Document,
    Image,
    Certificate,
    Note,
    Link,
}

impl EvidenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceKind::Document => "document",
            EvidenceKind::Image => "image",
            EvidenceKind::Certificate => "certificate",
            EvidenceKind::Note => "note",
            EvidenceKind::Link => "link",
        }
    }

    pub fn from_db(raw: &str) -> Result<Self> {
        match raw {
            "document" => Ok(EvidenceKind::Document),
            "image" => Ok(EvidenceKind::Image),
            "certificate" => Ok(EvidenceKind::Certificate),
            "note" => Ok(EvidenceKind::Note),
            "link" => Ok(EvidenceKind::Link),
            other => Err(Error::Internal(format!("Invalid evidence kind in database: {}", other))),
        }
    }

    /// Kinds whose `content` counts as text evidence
    pub fn carries_text(&self) -> bool {
        matches!(self, EvidenceKind::Note | EvidenceKind::Document)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    #[default]
    Draft,
    UnderReview,
    Accepted,
    Rejected,
}

impl ReviewState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewState::Draft => "draft",
            ReviewState::UnderReview => "under_review",
            ReviewState::Accepted => "accepted",
            ReviewState::Rejected => "rejected",
        }
    }

    pub fn from_db(raw: &str) -> Result<Self> {
        match raw {
            "draft" => Ok(ReviewState::Draft),
            "under_review" => Ok(ReviewState::UnderReview),
            "accepted" => Ok(ReviewState::Accepted),
            "rejected" => Ok(ReviewState::Rejected),
            other => Err(Error::Internal(format!("Invalid review state in database: {}", other))),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ReviewState::Accepted | ReviewState::Rejected)
    }

    /// Still waiting on the reviewer
    pub fn is_pending(&self) -> bool {
        matches!(self, ReviewState::Draft | ReviewState::UnderReview)
    }
}

impl fmt::Display for ReviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External-storage (Google Drive) linkage of an evidence item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveLink {
    pub file_id: Option<String>,
    pub view_link: Option<String>,
    pub name: Option<String>,
    pub mime_type: Option<String>,
    pub web_view_link: Option<String>,
    pub parent_folder_id: Option<String>,
}

/// Artifact supporting an indicator's compliance claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub id: Uuid,
    pub indicator_id: Uuid,
    pub kind: EvidenceKind,
    pub file_name: Option<String>,
    pub file_url: Option<String>,
    pub content: Option<String>,
    #[serde(default)]
    pub drive: DriveLink,
    pub file_size: Option<String>,
    pub date_uploaded: DateTime<Utc>,
    pub review_state: ReviewState,
    /// Required when rejected
    pub review_reason: Option<String>,
    pub reviewed_by: Option<UserId>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

fn non_blank(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

impl Evidence {
    /// New draft evidence item
    pub fn new(indicator_id: Uuid, kind: EvidenceKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            indicator_id,
            kind,
            file_name: None,
            file_url: None,
            content: None,
            drive: DriveLink::default(),
            file_size: None,
            date_uploaded: Utc::now(),
            review_state: ReviewState::Draft,
            review_reason: None,
            reviewed_by: None,
            reviewed_at: None,
        }
    }

    /// Draft note carrying `content`
    pub fn note(indicator_id: Uuid, file_name: impl Into<String>, content: impl Into<String>) -> Self {
        let mut evidence = Self::new(indicator_id, EvidenceKind::Note);
        evidence.file_name = Some(file_name.into());
        evidence.content = Some(content.into());
        evidence
    }

    /// Note/document with non-blank content
    pub fn has_text_content(&self) -> bool {
        self.kind.carries_text() && non_blank(&self.content)
    }

    /// Linked to a stored file, either on Drive or by URL
    pub fn has_file_reference(&self) -> bool {
        non_blank(&self.drive.file_id) || non_blank(&self.file_url)
    }

    /// `draft -> under_review`
    pub fn submit(&mut self) -> Result<()> {
        match self.review_state {
            ReviewState::Draft => {
                self.review_state = ReviewState::UnderReview;
                Ok(())
            }
            other => Err(invalid_transition("submit", other)),
        }
    }

    /// `under_review -> accepted`, stamping the reviewer
    pub fn accept(&mut self, reviewer: UserId, at: DateTime<Utc>) -> Result<()> {
        match self.review_state {
            ReviewState::UnderReview => {
                self.review_state = ReviewState::Accepted;
                self.review_reason = None;
                self.reviewed_by = Some(reviewer);
                self.reviewed_at = Some(at);
                Ok(())
            }
            other => Err(invalid_transition("accept", other)),
        }
    }

    /// `draft | under_review -> rejected`; the reason must be non-blank
    pub fn reject(&mut self, reviewer: UserId, reason: &str, at: DateTime<Utc>) -> Result<()> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(Error::Validation(
                "A reason is required to reject evidence".to_string(),
            ));
        }

        match self.review_state {
            ReviewState::Draft | ReviewState::UnderReview => {
                self.review_state = ReviewState::Rejected;
                self.review_reason = Some(reason.to_string());
                self.reviewed_by = Some(reviewer);
                self.reviewed_at = Some(at);
                Ok(())
            }
            other => Err(invalid_transition("reject", other)),
        }
    }
}

fn invalid_transition(action: &str, from: ReviewState) -> Error {
    Error::Conflict(format!("Cannot {} evidence in state '{}'", action, from))
}

/// Fields accepted when attaching new evidence to an indicator
#[derive(Debug, Clone, Deserialize)]
pub struct NewEvidence {
    pub kind: EvidenceKind,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub drive: DriveLink,
    #[serde(default)]
    pub file_size: Option<String>,
}

impl NewEvidence {
    /// Shape check per kind: notes need content, links need a URL
    pub fn validate(&self) -> Result<()> {
        match self.kind {
            EvidenceKind::Note if !non_blank(&self.content) => Err(Error::Validation(
                "Note evidence requires content".to_string(),
            )),
            EvidenceKind::Link if !non_blank(&self.file_url) => Err(Error::Validation(
                "Link evidence requires a file_url".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Draft evidence item for `indicator_id`
    pub fn into_evidence(self, indicator_id: Uuid) -> Evidence {
        let mut evidence = Evidence::new(indicator_id, self.kind);
        evidence.file_name = self.file_name;
        evidence.file_url = self.file_url;
        evidence.content = self.content;
        evidence.drive = self.drive;
        evidence.file_size = self.file_size;
        evidence
    }
}
