//! Evidence State Evaluator
//!
//! Collapses an indicator's evidence snapshot into one [`EvidenceState`].
//! Pure and order-independent; callers pass the live rows on every read.
//!
//! Precedence:
//! 1. no items → `NoEvidence`
//! 2. any rejected → `Rejected`
//! 3. any draft/under review → `ReviewPending` (accepted items notwithstanding)
//! 4. accepted items checked against the indicator's evidence type
//! 5. otherwise `PartialEvidence`

use crate::models::{Evidence, EvidenceState, Indicator, IndicatorEvidenceType, ReviewState};

pub fn evaluate(indicator: &Indicator, evidence: &[Evidence]) -> EvidenceState {
    if evidence.is_empty() {
        return EvidenceState::NoEvidence;
    }

    if evidence.iter().any(|e| e.review_state == ReviewState::Rejected) {
        return EvidenceState::Rejected;
    }

    if evidence.iter().any(|e| e.review_state.is_pending()) {
        return EvidenceState::ReviewPending;
    }

    let mut accepted = evidence.iter().filter(|e| e.review_state == ReviewState::Accepted);

    let satisfied = match indicator.evidence_type {
        IndicatorEvidenceType::Text => accepted.any(|e| e.has_text_content()),
        IndicatorEvidenceType::File => accepted.any(|e| e.has_file_reference()),
        // Any accepted item counts for the current cycle
        IndicatorEvidenceType::Frequency => accepted.next().is_some(),
    };

    if satisfied {
        EvidenceState::Accepted
    } else {
        EvidenceState::PartialEvidence
    }
}
