//! Data models for the compliance tracker
//!
//! - Projects own indicators; indicators own evidence
//! - Evidence state is derived, never stored

pub mod evidence;
pub mod evidence_state;
pub mod import_result;
pub mod indicator;
pub mod project;

pub use evidence::{DriveLink, Evidence, EvidenceKind, NewEvidence, ReviewState, UserId};
pub use evidence_state::{CompletionVerdict, EvidenceState};
pub use import_result::{ImportOptions, ImportResult, ImportRowError};
pub use indicator::{
    ComplianceStatus, Frequency, Indicator, IndicatorEvidenceType, IndicatorPatch, NewIndicator, ScheduleType,
    DEFAULT_SCORE,
};
pub use project::{NewProject, Project};
