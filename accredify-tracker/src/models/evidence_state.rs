//! Indicator-level evidence verdicts
//!
//! Computed from the live evidence rows on every read; never persisted.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Aggregate completeness verdict for one indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceState {
    NoEvidence,
    PartialEvidence,
    ReviewPending,
    Accepted,
    Rejected,
}

impl EvidenceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceState::NoEvidence => "no_evidence",
            EvidenceState::PartialEvidence => "partial_evidence",
            EvidenceState::ReviewPending => "review_pending",
            EvidenceState::Accepted => "accepted",
            EvidenceState::Rejected => "rejected",
        }
    }
}

impl fmt::Display for EvidenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of asking whether an indicator may be marked compliant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionVerdict {
    pub allowed: bool,
    pub evidence_state: EvidenceState,
    /// Why completion is blocked; `None` exactly when allowed
    pub reason: Option<String>,
}
