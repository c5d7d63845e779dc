//! Completion Gate
//!
//! Decides whether an indicator may move to `Compliant`. A blocked completion
//! is a normal outcome carrying a user-facing reason, not an error.

use accredify_common::{time, Result};
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db;
use crate::models::{ComplianceStatus, CompletionVerdict, Evidence, EvidenceState, Indicator};
use crate::services::evidence_evaluator::evaluate;
use crate::services::scheduling::DueDateScheduler;
use crate::utils::begin_monitored;

pub const REASON_NO_EVIDENCE: &str = "This indicator requires evidence before it can be completed.";
pub const REASON_REJECTED: &str = "Evidence has been rejected. Please add new evidence before completing.";
pub const REASON_INCOMPLETE: &str =
    "Evidence is incomplete or pending review. Please ensure all evidence is accepted.";

/// Gate verdict for `indicator` given its live evidence
pub fn can_complete(indicator: &Indicator, evidence: &[Evidence]) -> CompletionVerdict {
    let evidence_state = evaluate(indicator, evidence);

    let reason = match evidence_state {
        EvidenceState::Accepted => None,
        EvidenceState::NoEvidence => Some(REASON_NO_EVIDENCE),
        EvidenceState::Rejected => Some(REASON_REJECTED),
        EvidenceState::PartialEvidence | EvidenceState::ReviewPending => Some(REASON_INCOMPLETE),
    };

    CompletionVerdict {
        allowed: reason.is_none(),
        evidence_state,
        reason: reason.map(str::to_string),
    }
}

/// Result of [`mark_compliant`]
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CompletionOutcome {
    /// Gate refused; nothing was written
    Blocked(CompletionVerdict),
    /// Status set to `Compliant`; scheduling advanced for recurring work
    Completed { indicator: Indicator },
}

/// Mark an indicator compliant if its evidence allows it
///
/// Reads the indicator and its evidence and writes the new status inside one
/// transaction. For a recurring indicator with a frequency, `next_due_date`
/// advances from the current due date (or `today` when none is set).
pub async fn mark_compliant(
    pool: &SqlitePool,
    indicator_id: Uuid,
    today: NaiveDate,
    scheduler: &dyn DueDateScheduler,
) -> Result<CompletionOutcome> {
    let mut tx = begin_monitored(pool, "completion_gate::mark_compliant").await?;

    let mut indicator = db::indicators::require(tx.conn()?, indicator_id).await?;
    let evidence = db::evidence::list_for_indicator(tx.conn()?, indicator_id).await?;

    let verdict = can_complete(&indicator, &evidence);
    if !verdict.allowed {
        tx.rollback().await?;
        tracing::info!(
            indicator_id = %indicator_id,
            evidence_state = %verdict.evidence_state,
            "Completion blocked"
        );
        return Ok(CompletionOutcome::Blocked(verdict));
    }

    indicator.status = ComplianceStatus::Compliant;
    indicator.last_updated = Some(time::now());

    if indicator.is_recurring() {
        if let Some(frequency) = indicator.frequency {
            let from = indicator.next_due_date.unwrap_or(today);
            // One-time work has no next date; keep whatever is stored
            if let Some(next) = scheduler.next_due_date(frequency, from) {
                indicator.next_due_date = Some(next);
            }
        }
    }

    db::indicators::update(tx.conn()?, &indicator).await?;
    tx.commit().await?;

    tracing::info!(
        indicator_id = %indicator_id,
        next_due_date = ?indicator.next_due_date,
        "Indicator marked compliant"
    );

    Ok(CompletionOutcome::Completed { indicator })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserId;
    use chrono::Utc;

    fn indicator() -> Indicator {
        Indicator::new(Uuid::new_v4(), "Safety", "S1", "Fire drill")
    }

    #[test]
    fn test_no_evidence_reason() {
        let verdict = can_complete(&indicator(), &[]);
        assert!(!verdict.allowed);
        assert_eq!(verdict.evidence_state, EvidenceState::NoEvidence);
        assert_eq!(verdict.reason.as_deref(), Some(REASON_NO_EVIDENCE));
    }

    #[test]
    fn test_rejected_reason() {
        let ind = indicator();
        let mut note = Evidence::note(ind.id, "note", "Old log");
        note.reject(UserId(Uuid::new_v4()), "Expired", Utc::now()).unwrap();

        let verdict = can_complete(&ind, &[note]);
        assert!(!verdict.allowed);
        assert_eq!(verdict.reason.as_deref(), Some(REASON_REJECTED));
    }

    #[test]
    fn test_pending_and_partial_share_reason() {
        let ind = indicator();
        let draft = Evidence::note(ind.id, "note", "Draft log");
        let pending = can_complete(&ind, &[draft]);
        assert_eq!(pending.evidence_state, EvidenceState::ReviewPending);
        assert_eq!(pending.reason.as_deref(), Some(REASON_INCOMPLETE));

        let mut blank = Evidence::note(ind.id, "note", " ");
        blank.submit().unwrap();
        blank.accept(UserId(Uuid::new_v4()), Utc::now()).unwrap();
        let partial = can_complete(&ind, &[blank]);
        assert_eq!(partial.evidence_state, EvidenceState::PartialEvidence);
        assert_eq!(partial.reason.as_deref(), Some(REASON_INCOMPLETE));
    }

    #[test]
    fn test_allowed_exactly_when_accepted() {
        let ind = indicator();
        let mut note = Evidence::note(ind.id, "note", "Signed drill log");
        note.submit().unwrap();
        note.accept(UserId(Uuid::new_v4()), Utc::now()).unwrap();

        let verdict = can_complete(&ind, &[note]);
        assert!(verdict.allowed);
        assert_eq!(verdict.evidence_state, EvidenceState::Accepted);
        assert!(verdict.reason.is_none());
    }
}
