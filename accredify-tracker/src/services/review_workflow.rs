//! Evidence Review Workflow
//!
//! Each transition is a read-then-write inside one transaction. The write is
//! a compare-and-set on the state that was read, so two reviewers racing on
//! the same item cannot both win: the loser gets `Conflict`.

use accredify_common::{time, Error, Result};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db;
use crate::models::{Evidence, NewEvidence, UserId};
use crate::utils::begin_monitored;

/// Attach a new draft evidence item to an existing indicator
pub async fn add_evidence(pool: &SqlitePool, indicator_id: Uuid, new: NewEvidence) -> Result<Evidence> {
    new.validate()?;

    let mut tx = begin_monitored(pool, "review_workflow::add_evidence").await?;

    db::indicators::require(tx.conn()?, indicator_id).await?;

    let evidence = new.into_evidence(indicator_id);
    db::evidence::insert(tx.conn()?, &evidence).await?;
    tx.commit().await?;

    tracing::info!(
        evidence_id = %evidence.id,
        indicator_id = %indicator_id,
        kind = evidence.kind.as_str(),
        "Evidence added"
    );
    Ok(evidence)
}

/// `draft -> under_review`
pub async fn submit(pool: &SqlitePool, evidence_id: Uuid) -> Result<Evidence> {
    transition(pool, evidence_id, "review_workflow::submit", |evidence| evidence.submit()).await
}

/// `under_review -> accepted`, attributed to `reviewer`
pub async fn accept(pool: &SqlitePool, evidence_id: Uuid, reviewer: UserId) -> Result<Evidence> {
    let at = time::now();
    transition(pool, evidence_id, "review_workflow::accept", |evidence| {
        evidence.accept(reviewer, at)
    })
    .await
}

/// `draft | under_review -> rejected` with a mandatory reason
///
/// A blank reason fails with `Validation` before the item is even looked up.
pub async fn reject(pool: &SqlitePool, evidence_id: Uuid, reviewer: UserId, reason: &str) -> Result<Evidence> {
    if reason.trim().is_empty() {
        return Err(Error::Validation(
            "A reason is required to reject evidence".to_string(),
        ));
    }

    let at = time::now();
    transition(pool, evidence_id, "review_workflow::reject", |evidence| {
        evidence.reject(reviewer, reason, at)
    })
    .await
}

async fn transition<F>(
    pool: &SqlitePool,
    evidence_id: Uuid,
    caller: &'static str,
    apply: F,
) -> Result<Evidence>
where
    F: FnOnce(&mut Evidence) -> Result<()>,
{
    let mut tx = begin_monitored(pool, caller).await?;

    let mut evidence = db::evidence::require(tx.conn()?, evidence_id).await?;
    let from = evidence.review_state;

    apply(&mut evidence)?;

    let written = db::evidence::update_review_state(tx.conn()?, &evidence, from).await?;
    if !written {
        tracing::warn!(
            evidence_id = %evidence_id,
            expected_state = %from,
            "Evidence changed state concurrently"
        );
        return Err(Error::Conflict(format!(
            "Evidence {} was modified by another reviewer",
            evidence_id
        )));
    }

    tx.commit().await?;

    tracing::info!(
        evidence_id = %evidence_id,
        from = %from,
        to = %evidence.review_state,
        reviewed_by = ?evidence.reviewed_by.map(|u| u.to_string()),
        "Evidence review state changed"
    );
    Ok(evidence)
}
